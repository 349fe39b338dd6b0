//! Tests for executing claimed runs against a mock job board.

use std::sync::Arc;
use std::time::Duration;

use core_hunt::scraper::{MockJobBoard, RawPosting};
use data_model_hunt::{
    models::{RunPhase, RunStatus, SearchAnalytics},
    test_helpers::{
        TestDbGuard, clean_test_db, count_scraped_jobs, create_test_company, create_test_run, get_company_by_name,
        get_run_by_id, test_db_pool,
    },
};
use tokio::sync::{Mutex, Semaphore};
use worker_hunt::{WorkerConfig, handle_run, next_run_in_queue, store_jobs};

static TEST_MUTEX: Mutex<()> = Mutex::const_new(());

fn config() -> WorkerConfig {
    WorkerConfig {
        poll_interval: Duration::from_millis(10),
        max_concurrency: 1,
        company_timeout: Duration::from_secs(5),
        request_delay: Duration::ZERO,
    }
}

fn posting(title: &str, company: &str, url: &str) -> RawPosting {
    let mut p = RawPosting::new(title, company);
    p.job_url = Some(url.to_string());
    p.description = Some("Minimum 2 years of experience".to_string());
    p
}

#[tokio::test]
async fn test_run_stores_jobs_and_completes() {
    let _db = TestDbGuard::acquire().await;
    let pool = test_db_pool().await;
    let _guard = TEST_MUTEX.lock().await;
    clean_test_db(&pool).await;

    create_test_company(&pool, "Acme", &["analyst"]).await;
    create_test_run(&pool, &["Acme"], RunStatus::Queued).await;
    let (run, _permit) = next_run_in_queue(&pool, Arc::new(Semaphore::new(1))).await.unwrap();

    let board = MockJobBoard::with_postings(vec![
        posting("Analyst", "Acme", "https://acme.com/1"),
        posting("Manager", "Acme Inc", "https://acme.com/2"),
        posting("Chef", "Globex", "https://globex.com/1"),
    ]);
    handle_run(&pool, &board, &run, &config()).await.unwrap();

    let stored = get_run_by_id(&pool, run.id).await.unwrap();
    assert_eq!(stored.status, RunStatus::Completed);
    assert_eq!(stored.total_jobs_found, 2);
    assert_eq!(stored.new_jobs_added, 2);
    assert_eq!(stored.duplicate_jobs_skipped, 0);
    assert!(stored.completed_at.is_some());
    assert!(stored.duration_seconds.is_some());
    assert_eq!(stored.progress().unwrap().phase, RunPhase::Completed);

    let analytics: SearchAnalytics = serde_json::from_value(stored.search_analytics).unwrap();
    assert_eq!(analytics["Acme"]["analyst@USA"], 2);

    let company = get_company_by_name(&pool, "Acme").await.unwrap();
    assert!(company.last_scraped.is_some());
    assert_eq!(company.total_jobs_found, 2);
    assert_eq!(count_scraped_jobs(&pool).await, 2);
}

#[tokio::test]
async fn test_rescrape_counts_duplicates() {
    let _db = TestDbGuard::acquire().await;
    let pool = test_db_pool().await;
    let _guard = TEST_MUTEX.lock().await;
    clean_test_db(&pool).await;

    let board = MockJobBoard::with_postings(vec![posting("Analyst", "Acme", "https://acme.com/1")]);

    for _ in 0..2 {
        create_test_run(&pool, &["Acme"], RunStatus::Queued).await;
        let (run, _permit) = next_run_in_queue(&pool, Arc::new(Semaphore::new(1))).await.unwrap();
        handle_run(&pool, &board, &run, &config()).await.unwrap();
    }

    assert_eq!(count_scraped_jobs(&pool).await, 1);
    // The company did not exist, so the run created it.
    assert!(get_company_by_name(&pool, "Acme").await.is_some());
}

#[tokio::test]
async fn test_store_jobs_skips_known_hashes() {
    let _db = TestDbGuard::acquire().await;
    let pool = test_db_pool().await;
    let _guard = TEST_MUTEX.lock().await;
    clean_test_db(&pool).await;

    let company = create_test_company(&pool, "Acme", &[]).await;
    let run = create_test_run(&pool, &["Acme"], RunStatus::Running).await;
    let postings = vec![
        posting("Analyst", "Acme", "https://acme.com/1"),
        posting("Analyst", "Acme", "HTTPS://ACME.COM/1"),
        posting("Manager", "Acme", "https://acme.com/2"),
    ];

    let mut conn = pool.get().await.unwrap();
    let (new_jobs, duplicates) = store_jobs(&mut conn, &postings, company.id, run.id).await.unwrap();
    assert_eq!((new_jobs, duplicates), (2, 1));

    let (new_jobs, duplicates) = store_jobs(&mut conn, &postings, company.id, run.id).await.unwrap();
    assert_eq!((new_jobs, duplicates), (0, 3));

    // Same role reposted under a new URL
    let mut repost = posting("Manager", "Acme", "https://boards.example.com/acme/77");
    repost.site = "linkedin".to_string();
    let (new_jobs, duplicates) = store_jobs(&mut conn, &[repost], company.id, run.id).await.unwrap();
    assert_eq!((new_jobs, duplicates), (0, 1));
}

#[tokio::test]
async fn test_unsupported_site_fails_run() {
    let _db = TestDbGuard::acquire().await;
    let pool = test_db_pool().await;
    let _guard = TEST_MUTEX.lock().await;
    clean_test_db(&pool).await;

    let mut run = create_test_run(&pool, &["Acme"], RunStatus::Running).await;
    run.search_parameters["sites"] = serde_json::json!(["monster"]);

    handle_run(&pool, &MockJobBoard::new(), &run, &config()).await.unwrap();

    let stored = get_run_by_id(&pool, run.id).await.unwrap();
    assert_eq!(stored.status, RunStatus::Failed);
    assert!(stored.error_message.as_deref().unwrap().contains("monster"));
    assert_eq!(stored.progress().unwrap().phase, RunPhase::Failed);
}

#[tokio::test]
async fn test_company_timeout_moves_on() {
    let _db = TestDbGuard::acquire().await;
    let pool = test_db_pool().await;
    let _guard = TEST_MUTEX.lock().await;
    clean_test_db(&pool).await;

    create_test_run(&pool, &["Slowco"], RunStatus::Queued).await;
    let (run, _permit) = next_run_in_queue(&pool, Arc::new(Semaphore::new(1))).await.unwrap();

    let mut board = MockJobBoard::with_postings(vec![posting("Analyst", "Slowco", "https://slow.co/1")]);
    board.set_delay(Duration::from_millis(500));
    let config = WorkerConfig {
        company_timeout: Duration::from_millis(50),
        ..config()
    };
    handle_run(&pool, &board, &run, &config).await.unwrap();

    let stored = get_run_by_id(&pool, run.id).await.unwrap();
    assert_eq!(stored.status, RunStatus::Completed);
    assert_eq!(stored.total_jobs_found, 0);
    assert_eq!(count_scraped_jobs(&pool).await, 0);
}
