//! Daily review lists: the best scoring postings of a day, ranked for triage.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl, scoped_futures::ScopedFutureExt};
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, info};
use uuid::Uuid;

use core_hunt::review_config::ReviewConfig;
use data_model_hunt::{
    db::DbPool,
    models::{
        CreateDailyReviewRequest, DailyReviewItem, DailyReviewItemResponse, DailyReviewList, DailyReviewListResponse,
        DailyReviewSummary, ReviewError, ReviewStatus, ScrapedJob, UpdateReviewItemRequest,
    },
    schema::{daily_job_review_items, daily_job_review_lists, scraped_jobs},
};

use super::{AppState, date_days_before};

fn default_limit() -> i64 {
    30
}

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
}

pub fn parse_review_date(value: &str) -> Result<NaiveDate, ReviewError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| ReviewError::InvalidDate(value.to_string()))
}

fn review_date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Scrape-time window for a review of `date`: midnight `days_lookback` days
/// before it up to the following midnight.
pub fn review_window(date: NaiveDate, days_lookback: i64) -> Result<(DateTime<Utc>, DateTime<Utc>), ReviewError> {
    let start = date_days_before(date, days_lookback.max(0)).ok_or(ReviewError::InvalidLookback(days_lookback))?;
    let end = date.succ_opt().ok_or_else(|| ReviewError::InvalidDate(review_date_key(date)))?;
    Ok((
        start.and_time(chrono::NaiveTime::MIN).and_utc(),
        end.and_time(chrono::NaiveTime::MIN).and_utc(),
    ))
}

/// Active postings scraped inside `window`, narrowed by the configured
/// companies, locations and job types.
pub async fn get_jobs_for_review(
    conn: &mut AsyncPgConnection,
    (start, end): (DateTime<Utc>, DateTime<Utc>),
    config: &ReviewConfig,
) -> Result<Vec<ScrapedJob>, diesel::result::Error> {

    let mut query = scraped_jobs::table
        .filter(scraped_jobs::is_active.eq(true))
        .filter(scraped_jobs::date_scraped.ge(start))
        .filter(scraped_jobs::date_scraped.lt(end))
        .into_boxed();

    if let Some(predicate) = ilike_any!(scraped_jobs::table, scraped_jobs::company, config.companies) {
        query = query.filter(predicate);
    }
    if let Some(predicate) = ilike_any!(scraped_jobs::table, scraped_jobs::location, config.location_preference) {
        query = query.filter(predicate);
    }
    if let Some(predicate) = ilike_any!(scraped_jobs::table, scraped_jobs::job_type, config.job_types) {
        query = query.filter(predicate);
    }

    query
        .order(scraped_jobs::date_scraped.desc())
        .select(ScrapedJob::as_select())
        .load(conn)
        .await
}

/// Scores the candidates and keeps the best `max_jobs_per_day` at or above the
/// minimum score, highest first.
pub fn rank_candidates(jobs: Vec<ScrapedJob>, config: &ReviewConfig, now: DateTime<Utc>) -> Vec<(ScrapedJob, f64)> {
    let scorer = config.scorer(now);
    let mut scored: Vec<(ScrapedJob, f64)> = jobs
        .into_iter()
        .map(|job| {
            let score = scorer.score(&job, &config.search_terms);
            (job, score)
        })
        .filter(|(_, score)| *score >= config.min_relevance_score)
        .collect();
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));
    scored.truncate(config.max_jobs_per_day);
    scored
}

/// The list for `date` with its items and postings, ordered by rank.
pub async fn get_daily_review_list(
    conn: &mut AsyncPgConnection,
    date: NaiveDate,
) -> Result<Option<DailyReviewListResponse>, diesel::result::Error> {
    let list = daily_job_review_lists::table
        .filter(daily_job_review_lists::review_date.eq(review_date_key(date)))
        .select(DailyReviewList::as_select())
        .first(conn)
        .await
        .optional()?;
    let Some(list) = list else {
        return Ok(None);
    };

    let jobs = daily_job_review_items::table
        .inner_join(scraped_jobs::table)
        .filter(daily_job_review_items::review_list_id.eq(list.id))
        .order(daily_job_review_items::final_rank.asc())
        .select((DailyReviewItem::as_select(), ScrapedJob::as_select()))
        .load::<(DailyReviewItem, ScrapedJob)>(conn)
        .await?
        .into_iter()
        .map(|(item, job)| DailyReviewItemResponse { item, job })
        .collect();

    Ok(Some(DailyReviewListResponse::new(list, jobs)))
}

/// Builds the review list for `date`. An existing list is returned as is unless
/// `force` is set, in which case it is replaced. `None` when no posting qualifies.
pub async fn create_daily_review_list(
    pool: &DbPool,
    date: NaiveDate,
    config: &ReviewConfig,
    force: bool,
) -> Result<Option<DailyReviewListResponse>, ReviewError> {
    let now = Utc::now();
    let window = review_window(date, config.days_lookback)?;
    let review_date = review_date_key(date);
    let filter_config = serde_json::to_value(config)?;
    let mut conn = pool.get().await?;

    let review_date = &review_date;
    conn.transaction::<_, ReviewError, _>(|conn| {
        async move {
            let existing: Option<Uuid> = daily_job_review_lists::table
                .filter(daily_job_review_lists::review_date.eq(review_date))
                .select(daily_job_review_lists::id)
                .first(conn)
                .await
                .optional()?;
            if existing.is_some() && !force {
                debug!("Review list for {} already exists", review_date);
                return Ok(get_daily_review_list(conn, date).await?);
            }

            let candidates = get_jobs_for_review(conn, window, config).await?;
            let total_jobs_reviewed = candidates.len();
            let ranked = rank_candidates(candidates, config, now);
            if ranked.is_empty() {
                info!(
                    "No jobs for {} reached a relevance score of {}",
                    review_date, config.min_relevance_score
                );
                return Ok(None);
            }

            if let Some(id) = existing {
                diesel::delete(daily_job_review_lists::table.find(id)).execute(conn).await?;
            }

            let list = DailyReviewList {
                id: Uuid::new_v4(),
                review_date: review_date.clone(),
                filter_config,
                total_jobs_reviewed: total_jobs_reviewed as i32,
                jobs_selected_count: ranked.len() as i32,
                auto_generated: true,
                status: ReviewStatus::Pending,
                created_at: now,
                updated_at: now,
            };
            diesel::insert_into(daily_job_review_lists::table)
                .values(&list)
                .execute(conn)
                .await?;

            let items: Vec<DailyReviewItem> = ranked
                .iter()
                .enumerate()
                .map(|(i, (job, score))| DailyReviewItem::ranked(list.id, job.id, *score, i as i32 + 1))
                .collect();
            diesel::insert_into(daily_job_review_items::table)
                .values(&items)
                .execute(conn)
                .await?;

            info!(
                "Created review list for {} with {} of {} jobs",
                review_date,
                items.len(),
                total_jobs_reviewed
            );
            let jobs = items
                .into_iter()
                .zip(ranked)
                .map(|(item, (job, _))| DailyReviewItemResponse { item, job })
                .collect();
            Ok(Some(DailyReviewListResponse::new(list, jobs)))
        }
        .scope_boxed()
    })
    .await
}

/// GET /api/daily-review/dates
pub async fn get_dates(
    State(pool): State<DbPool>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<Vec<String>>, ReviewError> {
    let mut conn = pool.get().await?;
    let dates = daily_job_review_lists::table
        .order(daily_job_review_lists::review_date.desc())
        .limit(query.limit.max(0))
        .select(daily_job_review_lists::review_date)
        .load(&mut conn)
        .await?;

    Ok(Json(dates))
}

/// GET /api/daily-review/summaries
pub async fn get_summaries(
    State(pool): State<DbPool>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<Vec<DailyReviewSummary>>, ReviewError> {
    let mut conn = pool.get().await?;
    let lists: Vec<DailyReviewList> = daily_job_review_lists::table
        .order(daily_job_review_lists::review_date.desc())
        .limit(query.limit.max(0))
        .select(DailyReviewList::as_select())
        .load(&mut conn)
        .await?;

    let list_ids: Vec<Uuid> = lists.iter().map(|l| l.id).collect();
    let flags: Vec<(Uuid, bool, bool)> = daily_job_review_items::table
        .filter(daily_job_review_items::review_list_id.eq_any(&list_ids))
        .select((
            daily_job_review_items::review_list_id,
            daily_job_review_items::is_selected,
            daily_job_review_items::is_dismissed,
        ))
        .load(&mut conn)
        .await?;

    // (jobs, selected, dismissed) per list
    let mut counts: HashMap<Uuid, (i64, i64, i64)> = HashMap::new();
    for (list_id, selected, dismissed) in flags {
        let entry = counts.entry(list_id).or_default();
        entry.0 += 1;
        entry.1 += selected as i64;
        entry.2 += dismissed as i64;
    }

    let summaries = lists
        .into_iter()
        .map(|list| {
            let (jobs_count, selected_count, dismissed_count) = counts.get(&list.id).copied().unwrap_or_default();
            DailyReviewSummary {
                id: list.id,
                date: list.review_date,
                status: list.status,
                total_jobs_reviewed: list.total_jobs_reviewed,
                jobs_selected_count: list.jobs_selected_count,
                jobs_count,
                selected_count,
                dismissed_count,
                created_at: list.created_at,
            }
        })
        .collect();

    Ok(Json(summaries))
}

/// GET /api/daily-review/{date}
pub async fn get_list(
    State(pool): State<DbPool>,
    Path(date): Path<String>,
) -> Result<Json<DailyReviewListResponse>, ReviewError> {
    let date = parse_review_date(&date)?;
    let mut conn = pool.get().await?;
    get_daily_review_list(&mut conn, date)
        .await?
        .map(Json)
        .ok_or(ReviewError::NotFound)
}

/// POST /api/daily-review/create
pub async fn post_create(
    State(state): State<AppState>,
    Json(request): Json<CreateDailyReviewRequest>,
) -> Result<Json<DailyReviewListResponse>, ReviewError> {
    let date = match request.target_date.as_deref() {
        Some(date) => parse_review_date(date)?,
        None => Utc::now().date_naive(),
    };
    let config = match &request.config {
        Some(overrides) => state.review.as_ref().clone().with_overrides(overrides),
        None => state.review.as_ref().clone(),
    };

    create_daily_review_list(&state.pool, date, &config, request.force_recreate)
        .await?
        .map(Json)
        .ok_or(ReviewError::NoQualifyingJobs)
}

/// PUT /api/daily-review/item/{id}
/// Any field present marks the item reviewed. An empty body changes nothing.
pub async fn put_item(
    State(pool): State<DbPool>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateReviewItemRequest>,
) -> Result<Json<DailyReviewItem>, ReviewError> {
    if !request.has_rating_in_range() {
        return Err(ReviewError::InvalidRating(request.user_rating.unwrap_or_default()));
    }

    let mut conn = pool.get().await?;
    if request.is_empty() {
        let item = daily_job_review_items::table
            .find(id)
            .select(DailyReviewItem::as_select())
            .first(&mut conn)
            .await?;
        return Ok(Json(item));
    }

    let item = diesel::update(daily_job_review_items::table.find(id))
        .set(&request.into_changeset(Utc::now()))
        .returning(DailyReviewItem::as_returning())
        .get_result(&mut conn)
        .await?;

    Ok(Json(item))
}

#[cfg(test)]
mod tests {
    use super::*;
    use data_model_hunt::test_helpers::sample_scraped_job;

    #[test]
    fn test_parse_review_date() {
        assert_eq!(
            parse_review_date("2025-03-01").unwrap(),
            NaiveDate::from_ymd_opt(2025, 3, 1).unwrap()
        );
        assert_eq!(
            parse_review_date("03/01/2025"),
            Err(ReviewError::InvalidDate("03/01/2025".to_string()))
        );
    }

    #[test]
    fn test_review_window() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        let (start, end) = review_window(date, 2).unwrap();
        assert_eq!(start.date_naive(), NaiveDate::from_ymd_opt(2025, 3, 8).unwrap());
        assert_eq!(end.date_naive(), NaiveDate::from_ymd_opt(2025, 3, 11).unwrap());

        // negative lookback covers the day itself
        let (start, _) = review_window(date, -4).unwrap();
        assert_eq!(start.date_naive(), date);

        assert_eq!(
            review_window(date, 100_000_000),
            Err(ReviewError::InvalidLookback(100_000_000))
        );
    }

    #[test]
    fn test_rank_candidates_filters_sorts_and_truncates() {
        let config = ReviewConfig {
            search_terms: vec!["analyst".to_string()],
            min_relevance_score: 20.0,
            max_jobs_per_day: 2,
            ..ReviewConfig::default()
        };
        let mut remote = sample_scraped_job("Senior Analyst", "Acme", "https://jobs/1");
        remote.is_remote = Some(true);
        let plain = sample_scraped_job("Analyst", "Globex", "https://jobs/2");
        let other = sample_scraped_job("Data Analyst", "Initech", "https://jobs/3");
        let unrelated = sample_scraped_job("Chef", "Diner", "https://jobs/4");

        let ranked = rank_candidates(vec![plain, unrelated, remote, other], &config, Utc::now());
        assert_eq!(ranked.len(), 2);
        assert!(ranked[0].1 >= ranked[1].1);
        assert_eq!(ranked[0].0.title, "Senior Analyst");
        assert!(ranked.iter().all(|(job, _)| job.title != "Chef"));
    }
}
