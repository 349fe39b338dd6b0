use axum::{
    Json,
    extract::{Path, Query, State},
};
use chrono::{DateTime, Duration, Utc};
use diesel::dsl::count_star;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use serde::Deserialize;
use std::collections::HashSet;
use tracing::info;
use uuid::Uuid;

use data_model_hunt::{
    db::DbPool,
    models::{ApiError, AppError, CompanyJobCount, DatabaseStats, DeletedCount, RunStatus},
    schema::{scraped_jobs, scraping_runs, target_companies},
};

use super::days_before;

const TOP_COMPANIES: i64 = 10;

fn default_max_age_days() -> i64 {
    30
}

#[derive(Debug, Deserialize)]
pub struct RemoveOldQuery {
    #[serde(default = "default_max_age_days")]
    pub days: i64,
}

/// GET /api/admin/database-stats
pub async fn get_database_stats(State(pool): State<DbPool>) -> Result<Json<DatabaseStats>, AppError> {
    let mut conn = pool.get().await?;

    let total_jobs: i64 = scraped_jobs::table.count().get_result(&mut conn).await?;
    let jobs_last_30_days: i64 = scraped_jobs::table
        .filter(scraped_jobs::date_scraped.ge(Utc::now() - Duration::days(30)))
        .count()
        .get_result(&mut conn)
        .await?;
    let total_companies: i64 = target_companies::table.count().get_result(&mut conn).await?;
    let total_runs: i64 = scraping_runs::table.count().get_result(&mut conn).await?;
    let successful_runs: i64 = scraping_runs::table
        .filter(scraping_runs::status.eq(RunStatus::Completed))
        .count()
        .get_result(&mut conn)
        .await?;

    let top_companies = scraped_jobs::table
        .group_by(scraped_jobs::company)
        .select((scraped_jobs::company, count_star()))
        .order_by(count_star().desc())
        .limit(TOP_COMPANIES)
        .load::<(String, i64)>(&mut conn)
        .await?
        .into_iter()
        .map(|(company, job_count)| CompanyJobCount { company, job_count })
        .collect();

    Ok(Json(DatabaseStats {
        total_jobs,
        jobs_last_30_days,
        total_companies,
        total_runs,
        successful_runs,
        success_rate: success_rate(successful_runs, total_runs),
        top_companies,
    }))
}

/// Percentage of runs that completed, 0 when there are none.
pub fn success_rate(successful: i64, total: i64) -> f64 {
    if total == 0 {
        0.0
    } else {
        successful as f64 / total as f64 * 100.0
    }
}

/// DELETE /api/admin/jobs/{id}
pub async fn delete_job(State(pool): State<DbPool>, Path(id): Path<Uuid>) -> Result<Json<DeletedCount>, ApiError> {
    let mut conn = pool.get().await?;
    let deleted = diesel::delete(scraped_jobs::table.find(id)).execute(&mut conn).await?;
    if deleted == 0 {
        return Err(ApiError::NotFound);
    }
    Ok(Json(DeletedCount { deleted }))
}

/// Escapes `LIKE` wildcards so `value` only matches itself.
pub fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// DELETE /api/admin/companies/{name}/jobs
/// Deletes postings whose company contains `name`, ignoring case.
pub async fn delete_company_jobs(
    State(pool): State<DbPool>,
    Path(name): Path<String>,
) -> Result<Json<DeletedCount>, ApiError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ApiError::BadRequest("company name is required".to_string()));
    }
    let pattern = format!("%{}%", escape_like(name));

    let mut conn = pool.get().await?;
    let deleted = diesel::delete(scraped_jobs::table.filter(scraped_jobs::company.ilike(pattern)))
        .execute(&mut conn)
        .await?;
    if deleted == 0 {
        return Err(ApiError::NotFound);
    }

    info!("Deleted {} jobs of {}", deleted, name);
    Ok(Json(DeletedCount { deleted }))
}

/// Ids of postings that repeat an earlier URL. Rows must be ordered newest first,
/// so the first posting seen for each URL is the one kept.
pub fn duplicate_ids(rows: &[(Uuid, String, DateTime<Utc>)]) -> Vec<Uuid> {
    let mut seen = HashSet::new();
    rows.iter()
        .filter(|(_, url, _)| !url.is_empty() && !seen.insert(url.as_str()))
        .map(|(id, _, _)| *id)
        .collect()
}

/// POST /api/admin/jobs/remove-duplicates
/// Keeps the most recently scraped posting for each job URL.
pub async fn post_remove_duplicates(State(pool): State<DbPool>) -> Result<Json<DeletedCount>, ApiError> {
    let mut conn = pool.get().await?;
    let rows: Vec<(Uuid, String, DateTime<Utc>)> = scraped_jobs::table
        .filter(scraped_jobs::job_url.ne(""))
        .order((scraped_jobs::date_scraped.desc(), scraped_jobs::id.asc()))
        .select((scraped_jobs::id, scraped_jobs::job_url, scraped_jobs::date_scraped))
        .load(&mut conn)
        .await?;

    let duplicates = duplicate_ids(&rows);
    let deleted = match duplicates.is_empty() {
        true => 0,
        false => {
            diesel::delete(scraped_jobs::table.filter(scraped_jobs::id.eq_any(&duplicates)))
                .execute(&mut conn)
                .await?
        }
    };

    info!("Removed {} duplicate jobs", deleted);
    Ok(Json(DeletedCount { deleted }))
}

/// POST /api/admin/jobs/remove-old
/// Deletes active postings published more than `days` (default 30) ago.
pub async fn post_remove_old(
    State(pool): State<DbPool>,
    Query(query): Query<RemoveOldQuery>,
) -> Result<Json<DeletedCount>, ApiError> {
    if query.days < 1 {
        return Err(ApiError::BadRequest("days must be at least 1".to_string()));
    }
    let cutoff = days_before(Utc::now(), query.days)
        .ok_or_else(|| ApiError::BadRequest(format!("days {} is out of range", query.days)))?;

    let mut conn = pool.get().await?;
    let deleted = diesel::delete(
        scraped_jobs::table
            .filter(scraped_jobs::is_active.eq(true))
            .filter(scraped_jobs::date_posted.lt(cutoff)),
    )
    .execute(&mut conn)
    .await?;

    info!("Removed {} jobs posted before {}", deleted, cutoff);
    Ok(Json(DeletedCount { deleted }))
}
