use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use core_hunt::report::{
    CompanyCount, Notification, Notifier, RunReport, csv_attachment_name, failure_body, jobs_csv,
};
use core_hunt::schedule::{
    SCHEDULED_HOURS_OLD, SCHEDULED_LOCATION, SCHEDULED_SITES, SchedulerConfig, is_due, match_companies,
    search_terms_for, select_companies, should_scrape_company, targeted_request,
};
use data_model_hunt::{
    db,
    models::{
        BulkScrapingRequest, CreateDailyReviewRequest, DailyReviewListResponse, RunProgressResponse, RunStatus,
        RunType, ScrapedJob, ScrapingDefaults, ScrapingRun, ScrapingSetting, TargetCompany, TriggerRequest,
        setting_keys,
    },
    schema::{scraped_jobs, scraping_settings, target_companies},
};
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use reqwest::StatusCode;
use uuid::Uuid;

use crate::auth_client::{AuthenticatedClient, json_or_error};
use crate::errors::Error;

/// How often and for how long to watch an enqueued run.
#[derive(Debug, Clone, Copy)]
pub struct RunWait {
    pub poll_interval: Duration,
    pub timeout: Duration,
}

impl Default for RunWait {
    fn default() -> Self {
        RunWait {
            poll_interval: Duration::from_secs(10),
            timeout: Duration::from_secs(6 * 60 * 60),
        }
    }
}

/// Runs the daily schedule: picks companies, enqueues runs through the API and
/// reports on them.
pub struct Scheduler {
    pool: db::DbPool,
    api: Arc<AuthenticatedClient>,
    config: SchedulerConfig,
    notifier: Option<Arc<dyn Notifier>>,
    wait: RunWait,
}

impl Scheduler {
    pub fn new(pool: db::DbPool, api: Arc<AuthenticatedClient>, config: SchedulerConfig) -> Self {
        Scheduler {
            pool,
            api,
            config,
            notifier: None,
            wait: RunWait::default(),
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn with_run_wait(mut self, wait: RunWait) -> Self {
        self.wait = wait;
        self
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// One pass of the cron loop: honour the trigger file, then start the daily
    /// scrape if its time fell between the two ticks. A bad trigger file is
    /// logged and does not hold back the daily scrape.
    pub async fn tick(&self, last_tick: DateTime<Utc>, now: DateTime<Utc>) -> Result<(), Error> {
        match check_trigger_file(&self.config.trigger_file).await {
            Ok(Some(trigger)) => {
                tracing::info!("Manual trigger found: {:?}", trigger);
                if trigger.company_names.is_empty() {
                    self.run_daily_scraping(now).await?;
                } else {
                    self.run_targeted_scraping(&trigger.company_names, trigger.search_terms.as_deref())
                        .await?;
                }
            }
            Ok(None) => {}
            Err(e) => tracing::error!("Ignoring trigger file {}: {}", self.config.trigger_file.display(), e),
        }

        if self.config.enabled && is_due(last_tick, now, self.config.time) {
            tracing::info!("Daily scraping is due ({} UTC)", self.config.schedule_time());
            self.run_daily_scraping(now).await?;
        }
        Ok(())
    }

    /// Scrapes the default companies that are due. `None` when nothing was due.
    pub async fn run_daily_scraping(&self, now: DateTime<Utc>) -> Result<Option<RunProgressResponse>, Error> {
        let (active, defaults) = {
            let mut conn = self.pool.get().await?;
            (active_companies(&mut conn).await?, scraping_defaults(&mut conn).await?)
        };

        let selected = select_companies(defaults.companies.as_deref().unwrap_or_default(), &active);
        let due: Vec<TargetCompany> = selected
            .into_iter()
            .filter(|c| should_scrape_company(c.last_scraped, now))
            .collect();
        if due.is_empty() {
            tracing::info!("No companies due for scraping ({} active)", active.len());
            return Ok(None);
        }

        let search_terms = search_terms_for(
            defaults.search_terms.as_deref().unwrap_or_default(),
            &due,
            &self.config.search_terms,
        );
        let request = BulkScrapingRequest {
            company_names: due.iter().map(|c| c.name.clone()).collect(),
            search_terms,
            sites: SCHEDULED_SITES.iter().map(|s| s.to_string()).collect(),
            locations: defaults
                .locations
                .clone()
                .filter(|l| !l.is_empty())
                .unwrap_or_else(|| vec![SCHEDULED_LOCATION.to_string()]),
            results_per_company: defaults.results_per_company.unwrap_or(self.config.max_results),
            hours_old: defaults.hours_old.unwrap_or(SCHEDULED_HOURS_OLD),
            is_remote: None,
            run_type: Some(RunType::Scheduled),
            comprehensive_terms: Vec::new(),
        };

        tracing::info!(
            "Starting daily scraping of {} companies with {} search terms",
            request.company_names.len(),
            request.search_terms.len()
        );
        self.scrape_and_report(request).await.map(Some)
    }

    /// Scrapes the named active companies. `None` when no name matched.
    pub async fn run_targeted_scraping(
        &self,
        company_names: &[String],
        search_terms: Option<&[String]>,
    ) -> Result<Option<RunProgressResponse>, Error> {
        let active = {
            let mut conn = self.pool.get().await?;
            active_companies(&mut conn).await?
        };

        let matched = match_companies(company_names, active);
        if matched.is_empty() {
            tracing::warn!("No active companies match {:?}", company_names);
            return Ok(None);
        }

        let request = targeted_request(&matched, search_terms, &self.config);

        tracing::info!("Starting targeted scraping of {:?}", request.company_names);
        self.scrape_and_report(request).await.map(Some)
    }

    async fn scrape_and_report(&self, request: BulkScrapingRequest) -> Result<RunProgressResponse, Error> {
        let run = self.enqueue_run(&request).await?;
        let finished = match self.wait_for_run(run.id).await {
            Ok(finished) => finished,
            Err(error) => {
                self.notify(failure_notification(&run.id.to_string(), &request.company_names, &error.to_string()))
                    .await;
                return Err(error);
            }
        };

        match finished.status {
            RunStatus::Completed => self.report_completion(&finished, &request).await?,
            _ => {
                let error = finished.error_message.as_deref().unwrap_or("unknown error");
                tracing::error!("Run {} failed: {}", finished.run_id, error);
                self.notify(failure_notification(&finished.run_id.to_string(), &request.company_names, error))
                    .await;
            }
        }
        Ok(finished)
    }

    /// POST /api/admin/scrape-bulk
    pub async fn enqueue_run(&self, request: &BulkScrapingRequest) -> Result<ScrapingRun, Error> {
        tracing::debug!("API request: POST /api/admin/scrape-bulk");
        let run: ScrapingRun = self.api.post_json("/api/admin/scrape-bulk", request).await?;
        tracing::info!("Enqueued {:?} run {}", run.run_type, run.id);
        Ok(run)
    }

    /// Polls the run's progress until it completes or fails.
    pub async fn wait_for_run(&self, run_id: Uuid) -> Result<RunProgressResponse, Error> {
        let started = tokio::time::Instant::now();
        let path = format!("/api/scraping-runs/{}/progress", run_id);
        loop {
            let progress: RunProgressResponse = self.api.get_json(&path).await?;
            if progress.status.is_terminal() {
                return Ok(progress);
            }
            if let Some(p) = &progress.progress {
                tracing::debug!(
                    "Run {}: {}/{} companies, now {:?}",
                    run_id,
                    p.completed_companies,
                    p.total_companies,
                    p.current_company
                );
            }
            if started.elapsed() >= self.wait.timeout {
                return Err(Error::RunTimeout(run_id));
            }
            tokio::time::sleep(self.wait.poll_interval).await;
        }
    }

    /// POST /api/daily-review/create for today, replacing any existing list.
    /// Returns the number of jobs on the list, `None` if none qualified.
    pub async fn create_review_list(&self) -> Result<Option<usize>, Error> {
        let request = CreateDailyReviewRequest {
            target_date: None,
            force_recreate: true,
            config: None,
        };
        let response = self.api.post("/api/daily-review/create", &request).await?;
        if response.status() == StatusCode::NOT_FOUND {
            tracing::info!("No jobs qualified for today's review list");
            return Ok(None);
        }
        let list: DailyReviewListResponse = json_or_error(response).await?;
        tracing::info!("Review list for {} has {} jobs", list.date, list.jobs.len());
        Ok(Some(list.jobs.len()))
    }

    async fn report_completion(&self, run: &RunProgressResponse, request: &BulkScrapingRequest) -> Result<(), Error> {
        let jobs = {
            let mut conn = self.pool.get().await?;
            jobs_for_run(&mut conn, run.run_id).await?
        };
        tracing::info!(
            "Run {} completed: {} found, {} new, {} duplicates",
            run.run_id,
            run.total_jobs_found,
            run.new_jobs_added,
            run.duplicate_jobs_skipped
        );

        let review_jobs = if jobs.is_empty() {
            None
        } else {
            match self.create_review_list().await {
                Ok(count) => count,
                Err(e) => {
                    tracing::warn!("Could not create the daily review list: {}", e);
                    None
                }
            }
        };

        let now = Utc::now();
        let report = RunReport {
            run_id: run.run_id.to_string(),
            started_at: run.started_at.unwrap_or(now),
            completed_at: run.completed_at.unwrap_or(now),
            companies: company_counts(&request.company_names, &jobs),
            search_terms: request.search_terms.clone(),
            total_jobs_found: run.total_jobs_found,
            new_jobs_added: run.new_jobs_added,
            duplicate_jobs_skipped: run.duplicate_jobs_skipped,
            review_jobs,
        };
        let attachment = if jobs.is_empty() {
            None
        } else {
            Some((csv_attachment_name(report.completed_at.date_naive()), jobs_csv(&jobs)?))
        };

        self.notify(Notification {
            subject: report.subject(),
            body: report.body(),
            attachment,
        })
        .await;
        Ok(())
    }

    /// Delivery failures are logged, never fatal.
    async fn notify(&self, notification: Notification) {
        let Some(notifier) = &self.notifier else {
            tracing::debug!("Notifications disabled, not sending '{}'", notification.subject);
            return;
        };
        if let Err(e) = notifier.send(&notification).await {
            tracing::error!("Failed to send '{}': {}", notification.subject, e);
        }
    }
}

fn failure_notification(run_id: &str, companies: &[String], error: &str) -> Notification {
    let now = Utc::now();
    Notification {
        subject: format!("Job Hunt Daily Report {}: scraping failed", now.format("%Y-%m-%d")),
        body: failure_body(run_id, companies, error, now),
        attachment: None,
    }
}

/// Jobs stored by the run for each requested company, in request order. A job
/// counts for the first company whose name its company contains, ignoring case,
/// so "Pfizer Inc." counts for Pfizer.
pub fn company_counts(company_names: &[String], jobs: &[ScrapedJob]) -> Vec<CompanyCount> {
    let needles: Vec<String> = company_names.iter().map(|n| n.trim().to_lowercase()).collect();
    let mut counts = vec![0usize; company_names.len()];
    let mut other = 0;
    for job in jobs {
        let company = job.company.to_lowercase();
        match needles.iter().position(|n| !n.is_empty() && company.contains(n.as_str())) {
            Some(i) => counts[i] += 1,
            None => other += 1,
        }
    }

    let mut result: Vec<CompanyCount> = company_names
        .iter()
        .zip(counts)
        .map(|(name, jobs)| CompanyCount {
            company: name.clone(),
            jobs,
        })
        .collect();
    if other > 0 {
        result.push(CompanyCount {
            company: "Other".to_string(),
            jobs: other,
        });
    }
    result
}

/// Reads and removes the manual trigger file. An empty file means "run the
/// daily scrape now".
pub async fn check_trigger_file(path: &Path) -> Result<Option<TriggerRequest>, Error> {
    let contents = match tokio::fs::read_to_string(path).await {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(Error::TriggerFile(e.to_string())),
    };
    tokio::fs::remove_file(path)
        .await
        .map_err(|e| Error::TriggerFile(e.to_string()))?;

    if contents.trim().is_empty() {
        return Ok(Some(TriggerRequest::default()));
    }
    serde_json::from_str(&contents)
        .map(Some)
        .map_err(|e| Error::TriggerFile(e.to_string()))
}

async fn active_companies(conn: &mut AsyncPgConnection) -> Result<Vec<TargetCompany>, Error> {
    target_companies::table
        .filter(target_companies::is_active.eq(true))
        .order(target_companies::name.asc())
        .select(TargetCompany::as_select())
        .load(conn)
        .await
        .map_err(Error::from)
}

async fn scraping_defaults(conn: &mut AsyncPgConnection) -> Result<ScrapingDefaults, Error> {
    let setting: Option<ScrapingSetting> = scraping_settings::table
        .find(setting_keys::SCRAPING_DEFAULTS)
        .select(ScrapingSetting::as_select())
        .first(conn)
        .await
        .optional()?;

    Ok(match setting {
        Some(setting) => serde_json::from_value(setting.value).unwrap_or_else(|e| {
            tracing::warn!("Ignoring malformed {} setting: {}", setting_keys::SCRAPING_DEFAULTS, e);
            ScrapingDefaults::default()
        }),
        None => ScrapingDefaults::default(),
    })
}

async fn jobs_for_run(conn: &mut AsyncPgConnection, run_id: Uuid) -> Result<Vec<ScrapedJob>, Error> {
    scraped_jobs::table
        .filter(scraped_jobs::scraping_run_id.eq(run_id))
        .order((scraped_jobs::company.asc(), scraped_jobs::title.asc()))
        .select(ScrapedJob::as_select())
        .load(conn)
        .await
        .map_err(Error::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use data_model_hunt::test_helpers::sample_scraped_job;

    fn names(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_company_counts_in_request_order() {
        let jobs = vec![
            sample_scraped_job("Analyst", "Moderna", "https://a/1"),
            sample_scraped_job("Scientist", "moderna", "https://a/2"),
            sample_scraped_job("Director", "Pfizer", "https://a/3"),
        ];
        let counts = company_counts(&names(&["Pfizer", "Moderna", "Amgen"]), &jobs);
        assert_eq!(
            counts,
            vec![
                CompanyCount { company: "Pfizer".into(), jobs: 1 },
                CompanyCount { company: "Moderna".into(), jobs: 2 },
                CompanyCount { company: "Amgen".into(), jobs: 0 },
            ]
        );
    }

    #[test]
    fn test_company_counts_matches_longer_spellings() {
        let jobs = vec![
            sample_scraped_job("Analyst", "Pfizer Inc.", "https://a/1"),
            sample_scraped_job("Chemist", "PFIZER", "https://a/2"),
            sample_scraped_job("Chef", "Diner", "https://a/3"),
        ];
        let counts = company_counts(&names(&["Pfizer"]), &jobs);
        assert_eq!(
            counts,
            vec![
                CompanyCount { company: "Pfizer".into(), jobs: 2 },
                CompanyCount { company: "Other".into(), jobs: 1 },
            ]
        );
    }

    #[tokio::test]
    async fn test_trigger_file_missing() {
        let dir = tempfile::tempdir().unwrap();
        let found = check_trigger_file(&dir.path().join("trigger")).await.unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_trigger_file_is_consumed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trigger");
        std::fs::write(&path, r#"{"company_names": ["Pfizer"], "search_terms": ["clinical"]}"#).unwrap();

        let trigger = check_trigger_file(&path).await.unwrap().unwrap();
        assert_eq!(trigger.company_names, vec!["Pfizer"]);
        assert_eq!(trigger.search_terms, Some(vec!["clinical".to_string()]));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_empty_trigger_file_means_daily_run() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trigger");
        std::fs::write(&path, "\n").unwrap();

        let trigger = check_trigger_file(&path).await.unwrap().unwrap();
        assert!(trigger.company_names.is_empty());
        assert!(trigger.search_terms.is_none());
    }

    #[tokio::test]
    async fn test_malformed_trigger_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trigger");
        std::fs::write(&path, "not json").unwrap();

        assert!(matches!(check_trigger_file(&path).await, Err(Error::TriggerFile(_))));
        assert!(!path.exists());
    }
}
