use axum::{
    Router,
    extract::FromRef,
    middleware,
    routing::{delete, get, post, put},
};
use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use core_hunt::review_config::ReviewConfig;
use core_hunt::schedule::SchedulerConfig;
use core_hunt::{AuthConfig, health_router};
use data_model_hunt::db::DbPool;

use crate::auth;

/// OR of `column ILIKE '%value%'` over the non-blank values, as a boxed
/// `Nullable<Bool>` predicate on `$table`. `None` when there is nothing to match.
macro_rules! ilike_any {
    ($table:ty, $column:expr, $values:expr) => {{
        let mut predicate: Option<
            Box<
                dyn diesel::BoxableExpression<
                        $table,
                        diesel::pg::Pg,
                        SqlType = diesel::sql_types::Nullable<diesel::sql_types::Bool>,
                    >,
            >,
        > = None;
        for value in $values.iter().map(|v| v.trim()).filter(|v| !v.is_empty()) {
            let next = $column.ilike(format!("%{}%", value)).nullable();
            predicate = Some(match predicate {
                Some(acc) => Box::new(acc.or(next)),
                None => Box::new(next),
            });
        }
        predicate
    }};
}

pub mod admin;
pub mod companies;
pub mod filtered;
pub mod jobs;
pub mod logging_middleware;
pub mod review;
pub mod runs;
pub mod scheduler;
pub mod settings;
pub mod users;

/// Everything a handler may need, read once at startup.
#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub auth: Arc<AuthConfig>,
    pub review: Arc<ReviewConfig>,
    pub scheduler: Arc<SchedulerConfig>,
}

impl AppState {
    pub fn new(pool: DbPool, auth: AuthConfig, review: ReviewConfig, scheduler: SchedulerConfig) -> Self {
        AppState {
            pool,
            auth: Arc::new(auth),
            review: Arc::new(review),
            scheduler: Arc::new(scheduler),
        }
    }
}

impl FromRef<AppState> for DbPool {
    fn from_ref(state: &AppState) -> Self {
        state.pool.clone()
    }
}

/// `at` moved back `days` whole days. `None` when that leaves chrono's range.
pub fn days_before(at: DateTime<Utc>, days: i64) -> Option<DateTime<Utc>> {
    TimeDelta::try_days(days).and_then(|delta| at.checked_sub_signed(delta))
}

/// Same as [`days_before`] for calendar dates.
pub fn date_days_before(date: NaiveDate, days: i64) -> Option<NaiveDate> {
    TimeDelta::try_days(days).and_then(|delta| date.checked_sub_signed(delta))
}

//
// Router
//

pub fn router(state: AppState) -> Router {
    // Public routes (no authentication required)
    let public_routes = Router::new()
        .route("/api/auth/register", post(auth::post_register))
        .route("/api/auth/login", post(auth::post_login))
        .route("/api/auth/logout", post(auth::post_logout))
        .route("/api/supported-sites", get(jobs::get_supported_sites));

    let user_routes = Router::new()
        .route("/api/auth/me", get(auth::get_me))
        .route(
            "/api/user/preferences",
            get(users::get_preferences).put(users::put_preferences),
        )
        .route(
            "/api/user/saved-jobs",
            get(users::get_saved_jobs).post(users::post_saved_job),
        )
        .route("/api/user/saved-jobs/categorized", get(users::get_categorized_saved_jobs))
        .route(
            "/api/user/saved-jobs/{id}",
            put(users::put_saved_job).delete(users::delete_saved_job),
        )
        .route("/api/user/search-history", get(users::get_search_history))
        .route(
            "/api/user/saved-searches",
            get(users::get_saved_searches).post(users::post_saved_search),
        )
        .route(
            "/api/user/saved-searches/{id}",
            put(users::put_saved_search).delete(users::delete_saved_search),
        )
        .route(
            "/api/user/autoscraping-config",
            get(users::get_autoscraping_config).put(users::put_autoscraping_config),
        )
        .route("/api/jobs/search", post(jobs::post_search));

    let admin_routes = Router::new()
        .route(
            "/api/admin/target-companies",
            get(companies::get_companies).post(companies::post_company),
        )
        .route(
            "/api/admin/target-companies/{id}",
            put(companies::put_company).delete(companies::delete_company),
        )
        .route("/api/admin/scrape-bulk", post(runs::post_scrape_bulk))
        .route("/api/admin/scraping-runs", get(runs::get_runs))
        .route("/api/admin/scraping-runs/{id}", get(runs::get_run))
        .route("/api/scraping-runs/{id}/progress", get(runs::get_run_progress))
        .route("/api/admin/database-stats", get(admin::get_database_stats))
        .route("/api/admin/jobs/{id}", delete(admin::delete_job))
        .route("/api/admin/companies/{name}/jobs", delete(admin::delete_company_jobs))
        .route("/api/admin/jobs/remove-duplicates", post(admin::post_remove_duplicates))
        .route("/api/admin/jobs/remove-old", post(admin::post_remove_old))
        .route(
            "/api/admin/scraping-defaults",
            get(settings::get_scraping_defaults).put(settings::put_scraping_defaults),
        )
        .route(
            "/api/admin/comprehensive-terms",
            get(settings::get_comprehensive_terms).put(settings::put_comprehensive_terms),
        )
        .route("/api/admin/scheduler/status", get(scheduler::get_status))
        .route("/api/admin/scheduler/trigger", post(scheduler::post_trigger));

    let review_routes = Router::new()
        .route("/api/daily-review/dates", get(review::get_dates))
        .route("/api/daily-review/summaries", get(review::get_summaries))
        .route("/api/daily-review/create", post(review::post_create))
        .route("/api/daily-review/item/{id}", put(review::put_item))
        .route("/api/daily-review/{date}", get(review::get_list))
        .route("/api/filtered-jobs", get(filtered::get_filtered_jobs))
        .route("/api/filtered-jobs/dates", get(filtered::get_dates))
        .route("/api/filtered-jobs/process-existing", post(filtered::post_process_existing));

    let protected_routes = user_routes
        .merge(admin_routes)
        .merge(review_routes)
        .route_layer(middleware::from_fn_with_state(state.clone(), auth::require_auth));

    Router::new()
        .merge(health_router())
        .merge(public_routes)
        .merge(protected_routes)
        // Custom route access logging
        .layer(middleware::from_fn(logging_middleware::log_route_access))
        // Tracing middleware
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_days_before_in_range() {
        let at = DateTime::parse_from_rfc3339("2025-03-10T12:00:00Z").unwrap().to_utc();
        assert_eq!(
            days_before(at, 9),
            Some(DateTime::parse_from_rfc3339("2025-03-01T12:00:00Z").unwrap().to_utc())
        );
        let date = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        assert_eq!(date_days_before(date, 1), NaiveDate::from_ymd_opt(2025, 2, 28));
    }

    #[test]
    fn test_days_before_out_of_range() {
        let at = Utc::now();
        assert_eq!(days_before(at, 9_000_000_000_000_000), None);
        assert_eq!(days_before(at, 100_000_000), None);
        assert_eq!(date_days_before(at.date_naive(), 100_000_000), None);
        assert_eq!(date_days_before(at.date_naive(), i64::MIN), None);
    }
}
