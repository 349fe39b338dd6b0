use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use core_hunt::scraper::parse_sites;
use data_model_hunt::{
    db::DbPool,
    models::{ApiError, BulkScrapingRequest, RunProgressResponse, ScrapingRun},
    schema::scraping_runs,
};

const MAX_RESULTS_PER_COMPANY: i32 = 1000;

fn default_runs_limit() -> i64 {
    50
}

#[derive(Debug, Deserialize)]
pub struct RunsQuery {
    #[serde(default = "default_runs_limit")]
    pub limit: i64,
}

/// Checks a bulk request before it is queued.
pub fn validate_bulk_request(request: &BulkScrapingRequest) -> Result<(), ApiError> {
    if request.company_names.iter().all(|n| n.trim().is_empty()) {
        return Err(ApiError::BadRequest("company_names must not be empty".to_string()));
    }
    parse_sites(&request.sites).map_err(|e| ApiError::BadRequest(e.to_string()))?;
    if !(1..=MAX_RESULTS_PER_COMPANY).contains(&request.results_per_company) {
        return Err(ApiError::BadRequest(format!(
            "results_per_company must be between 1 and {}",
            MAX_RESULTS_PER_COMPANY
        )));
    }
    Ok(())
}

/// Inserts a `queued` run for the worker to pick up.
pub async fn enqueue_run(pool: &DbPool, request: &BulkScrapingRequest) -> Result<ScrapingRun, ApiError> {
    let run = ScrapingRun::queued(request)?;
    let mut conn = pool.get().await?;
    diesel::insert_into(scraping_runs::table)
        .values(&run)
        .execute(&mut conn)
        .await?;

    info!(
        "Queued {} run {} for {} companies",
        run.run_type.as_str(),
        run.id,
        run.companies_scraped.len()
    );
    Ok(run)
}

/// POST /api/admin/scrape-bulk
pub async fn post_scrape_bulk(
    State(pool): State<DbPool>,
    Json(mut request): Json<BulkScrapingRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_bulk_request(&request)?;
    request.company_names = request
        .company_names
        .into_iter()
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .collect();

    let run = enqueue_run(&pool, &request).await?;
    Ok((StatusCode::CREATED, Json(run)))
}

/// GET /api/admin/scraping-runs
pub async fn get_runs(
    State(pool): State<DbPool>,
    Query(query): Query<RunsQuery>,
) -> Result<Json<Vec<ScrapingRun>>, ApiError> {
    let mut conn = pool.get().await?;
    let runs = scraping_runs::table
        .order(scraping_runs::created_at.desc())
        .limit(query.limit.max(0))
        .select(ScrapingRun::as_select())
        .load(&mut conn)
        .await?;

    Ok(Json(runs))
}

async fn find_run(pool: &DbPool, id: Uuid) -> Result<ScrapingRun, ApiError> {
    let mut conn = pool.get().await?;
    Ok(scraping_runs::table
        .find(id)
        .select(ScrapingRun::as_select())
        .first(&mut conn)
        .await?)
}

/// GET /api/admin/scraping-runs/{id}
pub async fn get_run(State(pool): State<DbPool>, Path(id): Path<Uuid>) -> Result<Json<ScrapingRun>, ApiError> {
    Ok(Json(find_run(&pool, id).await?))
}

/// GET /api/scraping-runs/{id}/progress
pub async fn get_run_progress(
    State(pool): State<DbPool>,
    Path(id): Path<Uuid>,
) -> Result<Json<RunProgressResponse>, ApiError> {
    let run = find_run(&pool, id).await?;
    Ok(Json(RunProgressResponse::from_run(&run, Utc::now())))
}
