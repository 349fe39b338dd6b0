//! Tests for claiming runs from the queue with FOR UPDATE SKIP LOCKED.

use std::sync::Arc;

use data_model_hunt::{
    db,
    models::{RunStatus, ScrapingRun},
    test_helpers::{TestDbGuard, clean_test_db, create_test_run, get_run_by_id, test_db_pool},
};
use tokio::sync::{Mutex, Semaphore};
use worker_hunt::{Error, next_run_in_queue};

static TEST_MUTEX: Mutex<()> = Mutex::const_new(());

async fn next_run(pool: &db::DbPool) -> Result<ScrapingRun, Error> {
    next_run_in_queue(pool, Arc::new(Semaphore::new(1))).await.map(|x| x.0)
}

#[tokio::test]
async fn test_claims_queued_run() {
    let _db = TestDbGuard::acquire().await;
    let pool = test_db_pool().await;
    let _guard = TEST_MUTEX.lock().await;
    clean_test_db(&pool).await;

    let run = create_test_run(&pool, &["Acme"], RunStatus::Queued).await;

    let claimed = next_run(&pool).await.unwrap();
    assert_eq!(claimed.id, run.id);
    assert_eq!(claimed.status, RunStatus::Running);
    assert!(claimed.started_at.is_some());

    let stored = get_run_by_id(&pool, run.id).await.unwrap();
    assert_eq!(stored.status, RunStatus::Running);
    assert!(stored.started_at.is_some());
}

#[tokio::test]
async fn test_empty_queue_is_record_not_found() {
    let _db = TestDbGuard::acquire().await;
    let pool = test_db_pool().await;
    let _guard = TEST_MUTEX.lock().await;
    clean_test_db(&pool).await;

    assert!(matches!(next_run(&pool).await, Err(Error::RecordNotFound)));
}

#[tokio::test]
async fn test_ignores_running_and_finished_runs() {
    let _db = TestDbGuard::acquire().await;
    let pool = test_db_pool().await;
    let _guard = TEST_MUTEX.lock().await;
    clean_test_db(&pool).await;

    create_test_run(&pool, &["A"], RunStatus::Running).await;
    create_test_run(&pool, &["B"], RunStatus::Completed).await;
    create_test_run(&pool, &["C"], RunStatus::Failed).await;

    assert!(next_run(&pool).await.is_err(), "Only queued runs are claimed");
}

#[tokio::test]
async fn test_claims_oldest_first() {
    let _db = TestDbGuard::acquire().await;
    let pool = test_db_pool().await;
    let _guard = TEST_MUTEX.lock().await;
    clean_test_db(&pool).await;

    let first = create_test_run(&pool, &["First"], RunStatus::Queued).await;
    let second = create_test_run(&pool, &["Second"], RunStatus::Queued).await;

    assert_eq!(next_run(&pool).await.unwrap().id, first.id);
    assert_eq!(next_run(&pool).await.unwrap().id, second.id);
    assert!(next_run(&pool).await.is_err());
}

#[tokio::test]
async fn test_concurrent_claims_take_distinct_runs() {
    let _db = TestDbGuard::acquire().await;
    let pool = test_db_pool().await;
    let _guard = TEST_MUTEX.lock().await;
    clean_test_db(&pool).await;

    for name in ["A", "B", "C", "D"] {
        create_test_run(&pool, &[name], RunStatus::Queued).await;
    }

    let semaphore = Arc::new(Semaphore::new(4));
    let mut handles = Vec::new();
    for _ in 0..4 {
        let pool = pool.clone();
        let semaphore = semaphore.clone();
        handles.push(tokio::spawn(async move {
            next_run_in_queue(&pool, semaphore).await.map(|(run, _permit)| run.id)
        }));
    }

    let mut claimed = Vec::new();
    for handle in handles {
        if let Ok(id) = handle.await.unwrap() {
            claimed.push(id);
        }
    }
    let before = claimed.len();
    claimed.sort();
    claimed.dedup();
    assert_eq!(claimed.len(), before, "No run may be claimed twice");
    assert!(!claimed.is_empty());
}

#[tokio::test]
async fn test_permit_is_released_when_queue_is_empty() {
    let _db = TestDbGuard::acquire().await;
    let pool = test_db_pool().await;
    let _guard = TEST_MUTEX.lock().await;
    clean_test_db(&pool).await;

    let semaphore = Arc::new(Semaphore::new(1));
    assert!(next_run_in_queue(&pool, semaphore.clone()).await.is_err());
    assert_eq!(semaphore.available_permits(), 1);

    create_test_run(&pool, &["Acme"], RunStatus::Queued).await;
    let (_run, permit) = next_run_in_queue(&pool, semaphore.clone()).await.unwrap();
    assert_eq!(semaphore.available_permits(), 0);
    drop(permit);
    assert_eq!(semaphore.available_permits(), 1);
}
