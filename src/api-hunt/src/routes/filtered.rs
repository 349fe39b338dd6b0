//! Per-user filtered views of the scraped postings, scored by keyword match.

use axum::{
    Extension, Json,
    extract::{Query, State},
};
use chrono::{DateTime, NaiveDate, Utc};
use diesel::dsl::count_star;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use core_hunt::relevance::RelevanceScorer;
use core_hunt::terms::{DEFAULT_FILTER_TERMS, dedup_terms, to_strings};
use data_model_hunt::{
    db::DbPool,
    models::{
        ApiError, AutoscrapingConfig, FilteredDateCount, FilteredJobSearchRequest, FilteredJobSearchResponse,
        FilteredJobView, FilteredJobViewResponse, FilteredSortBy, ProcessExistingRequest, ProcessExistingResponse,
        ScrapedJob, SortOrder, split_comma_list,
    },
    schema::{filtered_job_views, scraped_jobs, user_autoscraping_configs},
};

use super::{date_days_before, days_before};
use crate::auth::AuthUser;

const AVAILABLE_DATES_LIMIT: i64 = 30;

/// The request's terms, else the user's autoscraping target roles, else its
/// search terms, else the built-in filter terms.
pub fn filter_terms(requested: Option<&[String]>, config: Option<&AutoscrapingConfig>) -> Vec<String> {
    let candidates = [
        requested.map(dedup_terms),
        config.map(|c| dedup_terms(&c.target_roles)),
        config.map(|c| dedup_terms(&c.search_terms)),
    ];
    candidates
        .into_iter()
        .flatten()
        .find(|terms| !terms.is_empty())
        .unwrap_or_else(|| to_strings(&DEFAULT_FILTER_TERMS))
}

/// Views for the postings whose best keyword scores at least `min_score`.
pub fn build_views(
    user_id: Uuid,
    jobs: &[ScrapedJob],
    terms: &[String],
    min_score: f64,
    now: DateTime<Utc>,
) -> Vec<FilteredJobView> {
    let scorer = RelevanceScorer::new(now);
    let filter_date = now.date_naive();
    let filter_criteria = json!({"search_terms": terms, "min_relevance_score": min_score});

    jobs.iter()
        .filter_map(|job| {
            let matched = scorer.match_keywords(job, terms, min_score)?;
            Some(FilteredJobView {
                id: Uuid::new_v4(),
                user_id,
                scraped_job_id: job.id,
                scraping_run_id: job.scraping_run_id,
                filter_date,
                relevance_score: matched.score,
                enhanced_score: matched.enhanced_score,
                best_matching_keyword: Some(matched.keyword),
                ai_relevance: Some(matched.relevance.as_str().to_string()),
                filter_criteria: filter_criteria.clone(),
                created_at: now,
            })
        })
        .collect()
}

/// POST /api/filtered-jobs/process-existing
/// Scores the recent postings for the user and stores today's views.
pub async fn post_process_existing(
    State(pool): State<DbPool>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Json(request): Json<ProcessExistingRequest>,
) -> Result<Json<ProcessExistingResponse>, ApiError> {
    if request.days_back < 0 {
        return Err(ApiError::BadRequest("days_back must not be negative".to_string()));
    }
    let now = Utc::now();
    let mut conn = pool.get().await?;

    let config = user_autoscraping_configs::table
        .filter(user_autoscraping_configs::user_id.eq(user.id))
        .select(AutoscrapingConfig::as_select())
        .first(&mut conn)
        .await
        .optional()?;
    let terms = filter_terms(request.search_terms.as_deref(), config.as_ref());

    let since = days_before(now, request.days_back)
        .ok_or_else(|| ApiError::BadRequest(format!("days_back {} is out of range", request.days_back)))?;
    let jobs: Vec<ScrapedJob> = scraped_jobs::table
        .filter(scraped_jobs::is_active.eq(true))
        .filter(scraped_jobs::date_scraped.ge(since))
        .select(ScrapedJob::as_select())
        .load(&mut conn)
        .await?;

    let views = build_views(user.id, &jobs, &terms, request.min_relevance_score, now);
    for view in &views {
        diesel::insert_into(filtered_job_views::table)
            .values(view)
            .on_conflict((
                filtered_job_views::user_id,
                filtered_job_views::scraped_job_id,
                filtered_job_views::filter_date,
            ))
            .do_update()
            .set(view.scores())
            .execute(&mut conn)
            .await?;
    }

    info!(
        user = %user.username,
        "Filtered {} of {} recent jobs with {} terms",
        views.len(),
        jobs.len(),
        terms.len()
    );
    Ok(Json(ProcessExistingResponse {
        jobs_considered: jobs.len(),
        jobs_kept: views.len(),
        search_terms: terms,
        filter_date: now.date_naive(),
    }))
}

fn parse_date(value: &str) -> Result<NaiveDate, ApiError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| ApiError::BadRequest(format!("'{}' is not a YYYY-MM-DD date", value)))
}

/// Inclusive `filter_date` window: the explicit dates where given, otherwise
/// `days_back` days ending `today`.
pub fn date_window(request: &FilteredJobSearchRequest, today: NaiveDate) -> Result<(NaiveDate, NaiveDate), ApiError> {
    let end = match request.end_date.as_deref() {
        Some(end) => parse_date(end)?,
        None => today,
    };
    let start = match request.start_date.as_deref() {
        Some(start) => parse_date(start)?,
        None => date_days_before(end, request.days_back.max(0))
            .ok_or_else(|| ApiError::BadRequest(format!("days_back {} is out of range", request.days_back)))?,
    };
    Ok((start, end))
}

/// GET /api/filtered-jobs
pub async fn get_filtered_jobs(
    State(pool): State<DbPool>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Query(request): Query<FilteredJobSearchRequest>,
) -> Result<Json<FilteredJobSearchResponse>, ApiError> {
    let (start, end) = date_window(&request, Utc::now().date_naive())?;
    let relevance = request
        .ai_relevance
        .as_deref()
        .map(split_comma_list)
        .filter(|labels| !labels.is_empty());

    let build = || {
        let mut query = filtered_job_views::table
            .inner_join(scraped_jobs::table)
            .filter(filtered_job_views::user_id.eq(user.id))
            .filter(filtered_job_views::filter_date.ge(start))
            .filter(filtered_job_views::filter_date.le(end))
            .into_boxed();

        if let Some(min_score) = request.min_enhanced_score {
            query = query.filter(filtered_job_views::enhanced_score.ge(min_score));
        }
        if let Some(labels) = relevance.clone() {
            query = query.filter(filtered_job_views::ai_relevance.eq_any(labels));
        }
        if let Some(company) = request.company_filter.as_deref().filter(|c| !c.trim().is_empty()) {
            query = query.filter(scraped_jobs::company.ilike(format!("%{}%", company.trim())));
        }
        if let Some(location) = request.location_filter.as_deref().filter(|l| !l.trim().is_empty()) {
            query = query.filter(scraped_jobs::location.ilike(format!("%{}%", location.trim())));
        }
        if let Some(job_type) = request.job_type_filter.as_deref().filter(|j| !j.trim().is_empty()) {
            query = query.filter(scraped_jobs::job_type.ilike(format!("%{}%", job_type.trim())));
        }
        if let Some(is_remote) = request.is_remote {
            query = query.filter(scraped_jobs::is_remote.eq(is_remote));
        }
        query
    };

    let mut conn = pool.get().await?;
    let total_count: i64 = build().count().get_result(&mut conn).await?;

    let query = match (request.sort_by, request.sort_order) {
        (FilteredSortBy::EnhancedScore, SortOrder::Desc) => build().order(filtered_job_views::enhanced_score.desc()),
        (FilteredSortBy::EnhancedScore, SortOrder::Asc) => build().order(filtered_job_views::enhanced_score.asc()),
        (FilteredSortBy::FilterDate, SortOrder::Desc) => build().order(filtered_job_views::filter_date.desc()),
        (FilteredSortBy::FilterDate, SortOrder::Asc) => build().order(filtered_job_views::filter_date.asc()),
        (FilteredSortBy::DatePosted, SortOrder::Desc) => build().order(scraped_jobs::date_posted.desc().nulls_last()),
        (FilteredSortBy::DatePosted, SortOrder::Asc) => build().order(scraped_jobs::date_posted.asc().nulls_last()),
    };
    let filtered_jobs = query
        .offset(request.offset.max(0))
        .limit(request.limit.max(0))
        .select((FilteredJobView::as_select(), ScrapedJob::as_select()))
        .load::<(FilteredJobView, ScrapedJob)>(&mut conn)
        .await?
        .into_iter()
        .map(|(view, scraped_job)| FilteredJobViewResponse { view, scraped_job })
        .collect();

    let available_dates = filtered_job_views::table
        .filter(filtered_job_views::user_id.eq(user.id))
        .select(filtered_job_views::filter_date)
        .distinct()
        .order(filtered_job_views::filter_date.desc())
        .limit(AVAILABLE_DATES_LIMIT)
        .load::<NaiveDate>(&mut conn)
        .await?;

    Ok(Json(FilteredJobSearchResponse {
        success: true,
        total_count,
        filtered_jobs,
        available_dates,
        timestamp: Utc::now(),
    }))
}

/// GET /api/filtered-jobs/dates
pub async fn get_dates(
    State(pool): State<DbPool>,
    Extension(AuthUser(user)): Extension<AuthUser>,
) -> Result<Json<Vec<FilteredDateCount>>, ApiError> {
    let mut conn = pool.get().await?;
    let dates = filtered_job_views::table
        .filter(filtered_job_views::user_id.eq(user.id))
        .group_by(filtered_job_views::filter_date)
        .select((filtered_job_views::filter_date, count_star()))
        .order(filtered_job_views::filter_date.desc())
        .limit(AVAILABLE_DATES_LIMIT)
        .load::<(NaiveDate, i64)>(&mut conn)
        .await?
        .into_iter()
        .map(|(filter_date, job_count)| FilteredDateCount { filter_date, job_count })
        .collect();

    Ok(Json(dates))
}
