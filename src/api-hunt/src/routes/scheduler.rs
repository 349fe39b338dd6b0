use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use core_hunt::schedule::{match_companies, next_run_after, targeted_request};
use data_model_hunt::{
    models::{ApiError, RunType, SchedulerStatus, ScrapingRun, TargetCompany, TriggerRequest},
    schema::{scraping_runs, target_companies},
};

use super::AppState;
use super::runs::enqueue_run;

/// GET /api/admin/scheduler/status
pub async fn get_status(State(state): State<AppState>) -> Result<Json<SchedulerStatus>, ApiError> {
    let config = &state.scheduler;
    let mut conn = state.pool.get().await?;

    let active_companies_count: i64 = target_companies::table
        .filter(target_companies::is_active.eq(true))
        .count()
        .get_result(&mut conn)
        .await?;
    let last_run = scraping_runs::table
        .filter(scraping_runs::run_type.ne(RunType::Manual))
        .order(scraping_runs::created_at.desc())
        .select(ScrapingRun::as_select())
        .first(&mut conn)
        .await
        .optional()?;

    Ok(Json(SchedulerStatus {
        enabled: config.enabled,
        schedule_time: config.schedule_time(),
        next_run: config.enabled.then(|| next_run_after(Utc::now(), config.time)),
        active_companies_count,
        max_results_per_company: config.max_results,
        default_search_terms: config.search_terms.clone(),
        last_run,
    }))
}

/// POST /api/admin/scheduler/trigger
/// Queues a targeted run for the named active companies.
pub async fn post_trigger(
    State(state): State<AppState>,
    Json(request): Json<TriggerRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if request.company_names.iter().all(|n| n.trim().is_empty()) {
        return Err(ApiError::BadRequest("company_names must not be empty".to_string()));
    }

    let active: Vec<TargetCompany> = {
        let mut conn = state.pool.get().await?;
        target_companies::table
            .filter(target_companies::is_active.eq(true))
            .select(TargetCompany::as_select())
            .load(&mut conn)
            .await?
    };
    let matched = match_companies(&request.company_names, active);
    if matched.is_empty() {
        return Err(ApiError::BadRequest(format!(
            "no active target company matches {:?}",
            request.company_names
        )));
    }

    let bulk = targeted_request(&matched, request.search_terms.as_deref(), &state.scheduler);
    let run = enqueue_run(&state.pool, &bulk).await?;
    Ok((StatusCode::CREATED, Json(run)))
}
