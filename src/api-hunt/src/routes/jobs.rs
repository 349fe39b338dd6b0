use axum::{Extension, Json, extract::State};
use chrono::Utc;
use diesel::pg::Pg;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use tracing::{debug, warn};
use uuid::Uuid;

use core_hunt::scraper::supported_sites;
use data_model_hunt::{
    db::DbPool,
    models::{
        ApiError, ScrapedJob, ScrapedJobSearchRequest, ScrapedJobSearchResponse, SearchHistoryEntry,
        SupportedSitesResponse,
    },
    schema::{scraped_jobs, search_history},
};

use super::days_before;
use crate::auth::AuthUser;

/// GET /api/supported-sites
pub async fn get_supported_sites() -> Json<SupportedSitesResponse> {
    Json(SupportedSitesResponse {
        supported_sites: supported_sites(),
    })
}

/// Active postings matching every filter of the request, without ordering or paging.
/// Fails when `days_old` reaches past the representable time range.
pub fn search_query(request: &ScrapedJobSearchRequest) -> Result<scraped_jobs::BoxedQuery<'static, Pg>, ApiError> {
    let cutoff = days_before(Utc::now(), request.days_old.max(0))
        .ok_or_else(|| ApiError::BadRequest(format!("days_old {} is out of range", request.days_old)))?;

    let mut query = scraped_jobs::table
        .filter(scraped_jobs::is_active.eq(true))
        .filter(
            scraped_jobs::date_posted
                .ge(cutoff)
                .or(scraped_jobs::date_posted.is_null().nullable()),
        )
        .into_boxed();

    if let Some(term) = request.search_term.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        let pattern = format!("%{}%", term);
        query = query.filter(
            scraped_jobs::title
                .ilike(pattern.clone())
                .nullable()
                .or(scraped_jobs::description.ilike(pattern.clone()))
                .or(scraped_jobs::company.ilike(pattern).nullable()),
        );
    }
    if let Some(companies) = &request.company_names
        && let Some(predicate) = ilike_any!(scraped_jobs::table, scraped_jobs::company, companies)
    {
        query = query.filter(predicate);
    }
    if let Some(locations) = &request.locations
        && let Some(predicate) = ilike_any!(scraped_jobs::table, scraped_jobs::location, locations)
    {
        query = query.filter(predicate);
    }
    if let Some(job_types) = request.job_types.clone().filter(|t| !t.is_empty()) {
        query = query.filter(scraped_jobs::job_type.eq_any(job_types));
    }
    if let Some(is_remote) = request.is_remote {
        query = query.filter(scraped_jobs::is_remote.eq(is_remote));
    }
    if let Some(min_salary) = request.min_salary {
        query = query.filter(
            scraped_jobs::min_amount
                .ge(min_salary)
                .or(scraped_jobs::max_amount.ge(min_salary)),
        );
    }
    if let Some(max_salary) = request.max_salary {
        query = query.filter(
            scraped_jobs::min_amount
                .le(max_salary)
                .or(scraped_jobs::max_amount.le(max_salary)),
        );
    }
    if let Some(max_experience) = request.max_experience_years {
        query = query.filter(
            scraped_jobs::min_experience_years
                .le(max_experience)
                .or(scraped_jobs::min_experience_years.is_null().nullable()),
        );
    }
    if let Some(sites) = request.sites.clone().filter(|s| !s.is_empty()) {
        query = query.filter(scraped_jobs::site.eq_any(sites));
    }
    for keyword in request.exclude_keyword_list() {
        query = query.filter(scraped_jobs::title.not_ilike(format!("%{}%", keyword)));
    }

    Ok(query)
}

/// POST /api/jobs/search
/// Searches the stored postings and records the search in the user's history.
pub async fn post_search(
    State(pool): State<DbPool>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Json(request): Json<ScrapedJobSearchRequest>,
) -> Result<Json<ScrapedJobSearchResponse>, ApiError> {
    let mut conn = pool.get().await?;

    let total_count: i64 = search_query(&request)?.count().get_result(&mut conn).await?;

    let jobs: Vec<ScrapedJob> = search_query(&request)?
        .order((
            scraped_jobs::date_posted.desc().nulls_last(),
            scraped_jobs::date_scraped.desc(),
        ))
        .offset(request.offset.max(0))
        .limit(request.limit.max(0))
        .select(ScrapedJob::as_select())
        .load(&mut conn)
        .await?;

    let search_params = serde_json::to_value(&request)?;
    let entry = SearchHistoryEntry {
        id: Uuid::new_v4(),
        user_id: user.id,
        search_params: search_params.clone(),
        results_count: jobs.len() as i32,
        searched_at: Utc::now(),
    };
    if let Err(e) = diesel::insert_into(search_history::table)
        .values(&entry)
        .execute(&mut conn)
        .await
    {
        warn!("Failed to record search history for {}: {:?}", user.username, e);
    }

    debug!(total_count, returned = jobs.len(), "Job search");

    Ok(Json(ScrapedJobSearchResponse {
        success: true,
        message: format!("Found {} jobs", total_count),
        total_count,
        jobs,
        search_params,
        timestamp: Utc::now(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_query_rejects_out_of_range_age() {
        let request: ScrapedJobSearchRequest = serde_json::from_str(r#"{"days_old": 9000000000000000}"#).unwrap();
        assert!(matches!(search_query(&request), Err(ApiError::BadRequest(_))));

        let request = ScrapedJobSearchRequest {
            days_old: 7,
            ..Default::default()
        };
        assert!(search_query(&request).is_ok());
    }
}
