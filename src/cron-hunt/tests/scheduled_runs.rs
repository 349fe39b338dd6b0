//! Daily and targeted scraping against a mocked API server and the test database.

use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use core_hunt::report::{Notification, Notifier};
use core_hunt::schedule::SchedulerConfig;
use cron_hunt::{AuthenticatedClient, Error, RunWait, Scheduler};
use data_model_hunt::{
    db,
    models::{RunProgressResponse, RunStatus, ScrapingRun},
    schema::target_companies,
    test_helpers::{
        TestDbGuard, clean_test_db, create_test_company, create_test_run, insert_scraped_job, sample_scraped_job,
        test_db_pool,
    },
};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use serde_json::json;
use tokio::sync::Mutex;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

static TEST_MUTEX: Mutex<()> = Mutex::const_new(());

#[derive(Default)]
struct RecordingNotifier {
    sent: StdMutex<Vec<Notification>>,
}

impl RecordingNotifier {
    fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), core_hunt::Error> {
        self.sent.lock().unwrap().push(notification.clone());
        Ok(())
    }
}

fn scheduler(pool: db::DbPool, server: &MockServer, notifier: Arc<RecordingNotifier>) -> Scheduler {
    let api = Arc::new(AuthenticatedClient::new(
        reqwest::Client::new(),
        &server.uri(),
        "cron".to_string(),
        "secret".to_string(),
    ));
    let config = SchedulerConfig {
        trigger_file: std::env::temp_dir().join(format!("hunt-trigger-{}", uuid::Uuid::new_v4())),
        ..SchedulerConfig::default()
    };
    Scheduler::new(pool, api, config)
        .with_notifier(notifier)
        .with_run_wait(RunWait {
            poll_interval: Duration::from_millis(10),
            timeout: Duration::from_secs(2),
        })
}

async fn mount_run(server: &MockServer, run: &ScrapingRun, final_run: &ScrapingRun, expected_body: serde_json::Value) {
    Mock::given(method("POST"))
        .and(path("/api/admin/scrape-bulk"))
        .and(body_partial_json(expected_body))
        .respond_with(ResponseTemplate::new(201).set_body_json(run))
        .expect(1)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/api/scraping-runs/{}/progress", run.id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(RunProgressResponse::from_run(final_run, Utc::now())))
        .mount(server)
        .await;
}

fn completed(mut run: ScrapingRun) -> ScrapingRun {
    run.status = RunStatus::Completed;
    run.total_jobs_found = 3;
    run.new_jobs_added = 2;
    run.duplicate_jobs_skipped = 1;
    run.completed_at = Some(Utc::now());
    run
}

#[tokio::test]
async fn test_daily_scraping_reports_completed_run() {
    let _db = TestDbGuard::acquire().await;
    let pool = test_db_pool().await;
    let _guard = TEST_MUTEX.lock().await;
    clean_test_db(&pool).await;

    create_test_company(&pool, "Pfizer", &["clinical"]).await;
    create_test_company(&pool, "Moderna", &[]).await;
    let run = create_test_run(&pool, &["Moderna", "Pfizer"], RunStatus::Queued).await;
    for (title, url) in [("Clinical Analyst", "https://jobs/1"), ("Research Manager", "https://jobs/2")] {
        let mut job = sample_scraped_job(title, "Pfizer", url);
        job.scraping_run_id = Some(run.id);
        insert_scraped_job(&pool, job).await;
    }

    let server = MockServer::start().await;
    let expected = json!({
        "company_names": ["Moderna", "Pfizer"],
        "sites": ["indeed", "linkedin"],
        "locations": ["USA"],
        "hours_old": 168,
        "run_type": "scheduled"
    });
    mount_run(&server, &run, &completed(run.clone()), expected).await;
    Mock::given(method("POST"))
        .and(path("/api/daily-review/create"))
        .and(body_partial_json(json!({"force_recreate": true})))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"error": "no_qualifying_jobs"})))
        .expect(1)
        .mount(&server)
        .await;

    let notifier = Arc::new(RecordingNotifier::default());
    let scheduler = scheduler(pool.clone(), &server, notifier.clone());

    let finished = scheduler.run_daily_scraping(Utc::now()).await.unwrap().unwrap();
    assert_eq!(finished.run_id, run.id);
    assert_eq!(finished.status, RunStatus::Completed);

    let sent = notifier.sent();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].subject.contains("2 new jobs"));
    assert!(sent[0].body.starts_with("Job Hunt Daily Scraping Report"));
    assert!(sent[0].body.contains("Pfizer: 2 jobs"));
    assert!(sent[0].body.contains("Moderna: 0 jobs"));

    let (name, csv) = sent[0].attachment.clone().unwrap();
    assert!(name.starts_with("JobHunt_Daily_Jobs_"));
    let csv = String::from_utf8(csv).unwrap();
    assert_eq!(csv.lines().count(), 3);
    assert!(csv.contains("Clinical Analyst"));
}

#[tokio::test]
async fn test_daily_scraping_skips_recently_scraped_companies() {
    let _db = TestDbGuard::acquire().await;
    let pool = test_db_pool().await;
    let _guard = TEST_MUTEX.lock().await;
    clean_test_db(&pool).await;

    let company = create_test_company(&pool, "Pfizer", &[]).await;
    {
        let mut conn = pool.get().await.unwrap();
        diesel::update(target_companies::table.find(company.id))
            .set(target_companies::last_scraped.eq(Some(Utc::now() - chrono::Duration::hours(2))))
            .execute(&mut conn)
            .await
            .unwrap();
    }

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/admin/scrape-bulk"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let notifier = Arc::new(RecordingNotifier::default());
    let scheduler = scheduler(pool.clone(), &server, notifier.clone());

    assert!(scheduler.run_daily_scraping(Utc::now()).await.unwrap().is_none());
    assert!(notifier.sent().is_empty());
}

#[tokio::test]
async fn test_failed_run_sends_failure_notification() {
    let _db = TestDbGuard::acquire().await;
    let pool = test_db_pool().await;
    let _guard = TEST_MUTEX.lock().await;
    clean_test_db(&pool).await;

    create_test_company(&pool, "Pfizer", &[]).await;
    let run = create_test_run(&pool, &["Pfizer"], RunStatus::Queued).await;
    let mut failed = run.clone();
    failed.status = RunStatus::Failed;
    failed.error_message = Some("scraper service unavailable".to_string());

    let server = MockServer::start().await;
    let expected = json!({"company_names": ["Pfizer"], "search_terms": ["chemist"], "run_type": "targeted"});
    mount_run(&server, &run, &failed, expected).await;

    let notifier = Arc::new(RecordingNotifier::default());
    let scheduler = scheduler(pool.clone(), &server, notifier.clone());

    let finished = scheduler
        .run_targeted_scraping(&["pfizer".to_string()], Some(&["chemist".to_string()]))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(finished.status, RunStatus::Failed);

    let sent = notifier.sent();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].subject.contains("failed"));
    assert!(sent[0].body.contains("scraper service unavailable"));
    assert!(sent[0].attachment.is_none());
}

#[tokio::test]
async fn test_targeted_scraping_without_matches_does_nothing() {
    let _db = TestDbGuard::acquire().await;
    let pool = test_db_pool().await;
    let _guard = TEST_MUTEX.lock().await;
    clean_test_db(&pool).await;

    create_test_company(&pool, "Pfizer", &[]).await;
    let server = MockServer::start().await;
    let notifier = Arc::new(RecordingNotifier::default());
    let scheduler = scheduler(pool.clone(), &server, notifier.clone());

    let result = scheduler
        .run_targeted_scraping(&["Unknown Corp".to_string()], None)
        .await
        .unwrap();
    assert!(result.is_none());
    assert!(server.received_requests().await.unwrap_or_default().is_empty());
}

#[tokio::test]
async fn test_run_that_never_finishes_times_out() {
    let _db = TestDbGuard::acquire().await;
    let pool = test_db_pool().await;
    let _guard = TEST_MUTEX.lock().await;
    clean_test_db(&pool).await;

    create_test_company(&pool, "Pfizer", &[]).await;
    let run = create_test_run(&pool, &["Pfizer"], RunStatus::Running).await;

    let server = MockServer::start().await;
    mount_run(&server, &run, &run, json!({"run_type": "targeted"})).await;

    let notifier = Arc::new(RecordingNotifier::default());
    let api = Arc::new(AuthenticatedClient::new(
        reqwest::Client::new(),
        &server.uri(),
        "cron".to_string(),
        "secret".to_string(),
    ));
    let scheduler = Scheduler::new(pool.clone(), api, SchedulerConfig::default())
        .with_notifier(notifier.clone())
        .with_run_wait(RunWait {
            poll_interval: Duration::from_millis(10),
            timeout: Duration::from_millis(50),
        });

    let err = scheduler
        .run_targeted_scraping(&["Pfizer".to_string()], None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::RunTimeout(id) if id == run.id));
    assert_eq!(notifier.sent().len(), 1);
}

#[tokio::test]
async fn test_malformed_trigger_file_does_not_block_daily_run() {
    let _db = TestDbGuard::acquire().await;
    let pool = test_db_pool().await;
    let _guard = TEST_MUTEX.lock().await;
    clean_test_db(&pool).await;

    create_test_company(&pool, "Pfizer", &[]).await;
    let run = create_test_run(&pool, &["Pfizer"], RunStatus::Queued).await;

    let server = MockServer::start().await;
    mount_run(
        &server,
        &run,
        &completed(run.clone()),
        json!({"company_names": ["Pfizer"], "run_type": "scheduled"}),
    )
    .await;
    Mock::given(method("POST"))
        .and(path("/api/daily-review/create"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"error": "no_qualifying_jobs"})))
        .mount(&server)
        .await;

    let notifier = Arc::new(RecordingNotifier::default());
    let scheduler = scheduler(pool.clone(), &server, notifier.clone());
    let trigger_file = scheduler.config().trigger_file.clone();
    tokio::fs::write(&trigger_file, "{not json").await.unwrap();

    let now = Utc::now().date_naive().and_time(scheduler.config().time).and_utc() + chrono::Duration::minutes(1);
    scheduler.tick(now - chrono::Duration::minutes(2), now).await.unwrap();

    assert!(!trigger_file.exists());
    assert_eq!(notifier.sent().len(), 1);
}
