use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use core_hunt::collect::{CollectParams, collect_company_jobs};
use core_hunt::dedup::{content_hash, job_hash};
use core_hunt::experience::extract_experience_years;
use core_hunt::scraper::{JobBoard, RawPosting, parse_sites};
use core_hunt::terms::expand_search_terms;
use core_hunt::{TimeUnit, get_duration, get_max_concurrency};
use data_model_hunt::{
    db,
    models::{
        BulkScrapingRequest, ComprehensiveTerms, RunPhase, RunProgress, RunStatus, ScrapedJob, ScrapingRun,
        ScrapingSetting, SearchAnalytics, TargetCompany, TargetCompanyCreate, is_unique_violation, setting_keys,
    },
    schema,
};
use diesel::prelude::*;
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use uuid::Uuid;

use crate::errors::Error;

/// Worker settings, read once at startup.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub poll_interval: Duration,
    pub max_concurrency: usize,
    /// Upper bound on collecting one company's postings.
    pub company_timeout: Duration,
    /// Pause between two job board requests.
    pub request_delay: Duration,
}

impl WorkerConfig {
    /// Reads WORKER_POLL_INTERVAL_MS, WORKER_MAX_CONCURRENCY, COMPANY_TIMEOUT_SECONDS and REQUEST_DELAY_MS.
    /// WARNING: Panics on malformed values.
    pub fn from_env() -> Self {
        WorkerConfig {
            poll_interval: get_duration(TimeUnit::Milliseconds, "WORKER_POLL_INTERVAL_MS", 1000),
            max_concurrency: get_max_concurrency(None),
            company_timeout: get_duration(TimeUnit::Seconds, "COMPANY_TIMEOUT_SECONDS", 900),
            request_delay: get_duration(TimeUnit::Milliseconds, "REQUEST_DELAY_MS", 500),
        }
    }
}

/// Counts accumulated over a run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunTotals {
    pub total_jobs_found: usize,
    pub new_jobs_added: usize,
    pub duplicate_jobs_skipped: usize,
    pub search_analytics: SearchAnalytics,
}

/// Query the DB for a run to be performed.
/// The semaphore controls the maximum number of runs the worker executes at once.
pub async fn next_run_in_queue(
    pool: &db::DbPool,
    semaphore: Arc<Semaphore>,
) -> Result<(ScrapingRun, OwnedSemaphorePermit), Error> {
    let mut conn = pool.get().await?;

    let run_permit: (ScrapingRun, OwnedSemaphorePermit) = conn
        .transaction::<_, Error, _>(|conn| {
            Box::pin(async move {
                // Blocks while max_concurrency runs are in flight.
                tracing::debug!("Acquiring semaphore before checking for a queued run.");
                let permit = semaphore.clone().acquire_owned().await?;
                // NOTE: returning an Err drops the permit. It is only handed out with a run.

                // Oldest first, ties broken by id, so no run starves.
                let mut run: ScrapingRun = schema::scraping_runs::table
                    .filter(schema::scraping_runs::status.eq(RunStatus::Queued))
                    .for_update()
                    .skip_locked()
                    .order((schema::scraping_runs::created_at.asc(), schema::scraping_runs::id.asc()))
                    .select(ScrapingRun::as_select())
                    .first(conn)
                    .await?;

                let now = Utc::now();
                diesel::update(schema::scraping_runs::table.find(run.id))
                    .set((
                        schema::scraping_runs::status.eq(RunStatus::Running),
                        schema::scraping_runs::started_at.eq(now),
                    ))
                    .execute(conn)
                    .await?;

                run.status = RunStatus::Running;
                run.started_at = Some(now);
                Ok((run, permit))
            })
        })
        .await?;

    Ok(run_permit)
}

/// Executes a claimed run and records the outcome: `completed` with totals, or
/// `failed` with the error message.
pub async fn handle_run<B>(pool: &db::DbPool, board: &B, run: &ScrapingRun, config: &WorkerConfig) -> Result<(), Error>
where
    B: JobBoard + ?Sized,
{
    let started = Instant::now();
    match execute_run(pool, board, run, config).await {
        Ok(totals) => {
            tracing::info!(
                "[run: {}] Completed: {} found, {} new, {} duplicates",
                run.id,
                totals.total_jobs_found,
                totals.new_jobs_added,
                totals.duplicate_jobs_skipped
            );
            finish_run(pool, run, &totals, started.elapsed()).await
        }
        Err(error) => {
            tracing::error!("[run: {}] Failed: {}", run.id, error);
            fail_run(pool, run, &error.to_string(), started.elapsed()).await
        }
    }
}

/// Scrapes every company of the run, storing postings as it goes.
pub async fn execute_run<B>(
    pool: &db::DbPool,
    board: &B,
    run: &ScrapingRun,
    config: &WorkerConfig,
) -> Result<RunTotals, Error>
where
    B: JobBoard + ?Sized,
{
    let request = run.request()?;
    let sites = parse_sites(&request.sites)?;
    let mut conn = pool.get().await?;

    let comprehensive = if request.comprehensive_terms.is_empty() {
        stored_comprehensive_terms(&mut conn).await?
    } else {
        request.comprehensive_terms.clone()
    };

    let mut totals = RunTotals::default();
    let mut progress = RunProgress {
        phase: RunPhase::ProcessingCompany,
        total_companies: request.company_names.len(),
        ..Default::default()
    };

    for company_name in &request.company_names {
        let company_started = Instant::now();
        progress.phase = RunPhase::ProcessingCompany;
        progress.current_company = Some(company_name.clone());
        progress.jobs_found_current_company = 0;
        progress.company_elapsed_seconds = None;
        set_progress(&mut conn, run.id, &progress).await?;

        let company = get_or_create_company(&mut conn, company_name, &request).await?;
        let base_terms = if request.search_terms.is_empty() {
            &company.search_terms
        } else {
            &request.search_terms
        };
        let params = CollectParams {
            search_terms: expand_search_terms(base_terms, &company.name, &comprehensive),
            locations: request.locations.clone(),
            sites: sites.clone(),
            results_wanted: request.results_per_company.max(1) as u32,
            hours_old: request.hours_old.max(1) as u32,
            is_remote: request.is_remote,
            request_delay: config.request_delay,
        };
        tracing::debug!("[run: {}] {} with terms {:?}", run.id, company.name, params.search_terms);

        let collection =
            match tokio::time::timeout(config.company_timeout, collect_company_jobs(board, &company.name, &params)).await
            {
                Ok(collection) => collection,
                Err(_) => {
                    tracing::warn!(
                        "[run: {}] Timed out after {:?} collecting {}",
                        run.id,
                        config.company_timeout,
                        company.name
                    );
                    progress.phase = RunPhase::CompanyTimeout;
                    progress.completed_companies += 1;
                    progress.company_elapsed_seconds = Some(company_started.elapsed().as_secs_f64());
                    set_progress(&mut conn, run.id, &progress).await?;
                    continue;
                }
            };

        let found = collection.postings.len();
        let (new_jobs, duplicates) = store_jobs(&mut conn, &collection.postings, company.id, run.id).await?;
        refresh_company_stats(&mut conn, company.id).await?;

        totals.total_jobs_found += found;
        totals.new_jobs_added += new_jobs;
        totals.duplicate_jobs_skipped += duplicates;
        totals
            .search_analytics
            .insert(company.name.clone(), collection.analytics);
        record_totals(&mut conn, run.id, &totals).await?;

        progress.phase = RunPhase::CompanyCompleted;
        progress.completed_companies += 1;
        progress.jobs_found_current_company = found;
        progress.company_elapsed_seconds = Some(company_started.elapsed().as_secs_f64());
        set_progress(&mut conn, run.id, &progress).await?;
        tracing::info!(
            "[run: {}] {}: {} found, {} new, {} duplicates",
            run.id,
            company.name,
            found,
            new_jobs,
            duplicates
        );
    }

    Ok(totals)
}

/// Inserts the postings that are not yet stored. A posting whose `job_hash` or
/// `content_hash` is already in `scraped_jobs` counts as a duplicate, so the same
/// role reposted under another URL is skipped. Returns `(new, duplicates)`.
pub async fn store_jobs(
    conn: &mut AsyncPgConnection,
    postings: &[RawPosting],
    target_company_id: Uuid,
    scraping_run_id: Uuid,
) -> Result<(usize, usize), Error> {
    let mut new_jobs = 0;
    let mut duplicates = 0;
    let now = Utc::now();

    for posting in postings {
        let job = scraped_job_from_posting(posting, target_company_id, scraping_run_id, now);

        let exists: i64 = schema::scraped_jobs::table
            .filter(
                schema::scraped_jobs::job_hash
                    .eq(&job.job_hash)
                    .or(schema::scraped_jobs::content_hash.eq(&job.content_hash)),
            )
            .count()
            .get_result(conn)
            .await?;
        if exists > 0 {
            duplicates += 1;
            continue;
        }

        match diesel::insert_into(schema::scraped_jobs::table)
            .values(&job)
            .execute(conn)
            .await
        {
            Ok(_) => new_jobs += 1,
            Err(e) if is_unique_violation(&e) => duplicates += 1,
            Err(e) => return Err(e.into()),
        }
    }

    Ok((new_jobs, duplicates))
}

/// The row stored for a scraped posting.
pub fn scraped_job_from_posting(
    posting: &RawPosting,
    target_company_id: Uuid,
    scraping_run_id: Uuid,
    now: DateTime<Utc>,
) -> ScrapedJob {
    let job_url = posting.preferred_url();
    let location = posting.location.clone().unwrap_or_default();
    let (min_years, max_years) = extract_experience_years(posting.description.as_deref());

    ScrapedJob {
        id: Uuid::new_v4(),
        job_hash: job_hash(&job_url, &posting.title, &posting.company, &location),
        content_hash: content_hash(&posting.title, &posting.company, &location),
        job_url,
        title: posting.title.clone(),
        company: posting.company.clone(),
        location: posting.location.clone(),
        site: posting.site.clone(),
        description: posting.description.clone(),
        job_type: posting.job_type.clone(),
        is_remote: posting.is_remote,
        min_amount: posting.min_amount,
        max_amount: posting.max_amount,
        salary_interval: Some(posting.interval.clone().unwrap_or_else(|| "yearly".to_string())),
        currency: Some(posting.currency.clone().unwrap_or_else(|| "USD".to_string())),
        date_posted: posting
            .date_posted
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|d| d.and_utc()),
        date_scraped: now,
        is_active: true,
        min_experience_years: min_years.map(|y| y as i32),
        max_experience_years: max_years.map(|y| y as i32),
        target_company_id: Some(target_company_id),
        scraping_run_id: Some(scraping_run_id),
    }
}

/// Exact case-insensitive name first, then any company whose name contains it.
/// Unknown companies are created with the run's sites, terms and locations.
async fn get_or_create_company(
    conn: &mut AsyncPgConnection,
    name: &str,
    request: &BulkScrapingRequest,
) -> Result<TargetCompany, Error> {
    let name = name.trim();
    if let Some(company) = find_company(conn, name).await? {
        return Ok(company);
    }

    let company = TargetCompany::from_request(TargetCompanyCreate {
        name: name.to_string(),
        display_name: None,
        preferred_sites: request.sites.clone(),
        search_terms: request.search_terms.clone(),
        location_filters: if request.locations.is_empty() {
            vec!["USA".to_string()]
        } else {
            request.locations.clone()
        },
    });

    match diesel::insert_into(schema::target_companies::table)
        .values(&company)
        .execute(conn)
        .await
    {
        Ok(_) => {
            tracing::info!("Created target company {}", company.name);
            Ok(company)
        }
        // Another run created it in the meantime.
        Err(e) if is_unique_violation(&e) => find_company(conn, name).await?.ok_or(Error::RecordNotFound),
        Err(e) => Err(e.into()),
    }
}

async fn find_company(conn: &mut AsyncPgConnection, name: &str) -> Result<Option<TargetCompany>, Error> {
    let exact: Option<TargetCompany> = schema::target_companies::table
        .filter(schema::target_companies::name.ilike(name))
        .select(TargetCompany::as_select())
        .first(conn)
        .await
        .optional()?;
    if exact.is_some() {
        return Ok(exact);
    }

    let partial: Option<TargetCompany> = schema::target_companies::table
        .filter(schema::target_companies::name.ilike(format!("%{}%", name)))
        .order(schema::target_companies::created_at.asc())
        .select(TargetCompany::as_select())
        .first(conn)
        .await
        .optional()?;
    Ok(partial)
}

/// Sets `last_scraped` and recounts the company's active jobs.
async fn refresh_company_stats(conn: &mut AsyncPgConnection, company_id: Uuid) -> Result<(), Error> {
    let active_jobs: i64 = schema::scraped_jobs::table
        .filter(schema::scraped_jobs::target_company_id.eq(company_id))
        .filter(schema::scraped_jobs::is_active.eq(true))
        .count()
        .get_result(conn)
        .await?;

    let now = Utc::now();
    diesel::update(schema::target_companies::table.find(company_id))
        .set((
            schema::target_companies::last_scraped.eq(now),
            schema::target_companies::total_jobs_found.eq(active_jobs as i32),
            schema::target_companies::updated_at.eq(now),
        ))
        .execute(conn)
        .await?;
    Ok(())
}

/// The stored comprehensive term list, empty if none was saved.
async fn stored_comprehensive_terms(conn: &mut AsyncPgConnection) -> Result<Vec<String>, Error> {
    let setting: Option<ScrapingSetting> = schema::scraping_settings::table
        .find(setting_keys::COMPREHENSIVE_TERMS)
        .select(ScrapingSetting::as_select())
        .first(conn)
        .await
        .optional()?;

    Ok(match setting {
        Some(setting) => match serde_json::from_value::<ComprehensiveTerms>(setting.value) {
            Ok(terms) => terms.terms,
            Err(e) => {
                tracing::warn!("Ignoring malformed {} setting: {}", setting_keys::COMPREHENSIVE_TERMS, e);
                Vec::new()
            }
        },
        None => Vec::new(),
    })
}

async fn set_progress(conn: &mut AsyncPgConnection, run_id: Uuid, progress: &RunProgress) -> Result<(), Error> {
    diesel::update(schema::scraping_runs::table.find(run_id))
        .set(schema::scraping_runs::current_progress.eq(serde_json::to_value(progress)?))
        .execute(conn)
        .await?;
    Ok(())
}

async fn record_totals(conn: &mut AsyncPgConnection, run_id: Uuid, totals: &RunTotals) -> Result<(), Error> {
    diesel::update(schema::scraping_runs::table.find(run_id))
        .set((
            schema::scraping_runs::total_jobs_found.eq(totals.total_jobs_found as i32),
            schema::scraping_runs::new_jobs_added.eq(totals.new_jobs_added as i32),
            schema::scraping_runs::duplicate_jobs_skipped.eq(totals.duplicate_jobs_skipped as i32),
            schema::scraping_runs::search_analytics.eq(serde_json::to_value(&totals.search_analytics)?),
        ))
        .execute(conn)
        .await?;
    Ok(())
}

/// Marks the run `completed` with its final totals.
pub async fn finish_run(
    pool: &db::DbPool,
    run: &ScrapingRun,
    totals: &RunTotals,
    elapsed: Duration,
) -> Result<(), Error> {
    let mut conn = pool.get().await?;
    let progress = RunProgress {
        phase: RunPhase::Completed,
        total_companies: run.companies_scraped.len(),
        completed_companies: run.companies_scraped.len(),
        ..Default::default()
    };
    let progress = serde_json::to_value(&progress)?;
    let analytics = serde_json::to_value(&totals.search_analytics)?;

    conn.transaction::<_, diesel::result::Error, _>(|conn| {
        Box::pin(async move {
            diesel::update(schema::scraping_runs::table.find(run.id))
                .set((
                    schema::scraping_runs::status.eq(RunStatus::Completed),
                    schema::scraping_runs::completed_at.eq(Utc::now()),
                    schema::scraping_runs::duration_seconds.eq(elapsed.as_secs_f64()),
                    schema::scraping_runs::total_jobs_found.eq(totals.total_jobs_found as i32),
                    schema::scraping_runs::new_jobs_added.eq(totals.new_jobs_added as i32),
                    schema::scraping_runs::duplicate_jobs_skipped.eq(totals.duplicate_jobs_skipped as i32),
                    schema::scraping_runs::search_analytics.eq(analytics),
                    schema::scraping_runs::current_progress.eq(progress),
                ))
                .execute(conn)
                .await?;
            Ok(())
        })
    })
    .await?;

    tracing::debug!("[run: {}] Marked completed", run.id);
    Ok(())
}

/// Marks the run `failed`, keeping whatever totals were recorded so far.
pub async fn fail_run(pool: &db::DbPool, run: &ScrapingRun, message: &str, elapsed: Duration) -> Result<(), Error> {
    let mut conn = pool.get().await?;
    let progress = RunProgress {
        phase: RunPhase::Failed,
        total_companies: run.companies_scraped.len(),
        error: Some(message.to_string()),
        ..Default::default()
    };

    diesel::update(schema::scraping_runs::table.find(run.id))
        .set((
            schema::scraping_runs::status.eq(RunStatus::Failed),
            schema::scraping_runs::completed_at.eq(Utc::now()),
            schema::scraping_runs::duration_seconds.eq(elapsed.as_secs_f64()),
            schema::scraping_runs::error_message.eq(message),
            schema::scraping_runs::current_progress.eq(serde_json::to_value(&progress)?),
        ))
        .execute(&mut conn)
        .await?;

    tracing::debug!("[run: {}] Marked failed", run.id);
    Ok(())
}
