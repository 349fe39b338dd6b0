use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use tracing::{debug, info};
use uuid::Uuid;

use data_model_hunt::{
    db::DbPool,
    models::{
        ApiError, AutoscrapingConfig, AutoscrapingSettings, CategorizedSavedJobs, PreferencesUpdate, SaveJobError,
        SaveJobRequest, SavedJob, SavedJobUpdate, SavedSearch, SavedSearchCreate, SavedSearchUpdate,
        SearchHistoryEntry, UserPreferences, categorize, is_same_job,
    },
    schema::{saved_searches, search_history, user_autoscraping_configs, user_preferences, user_saved_jobs},
};

use crate::auth::AuthUser;

const SEARCH_HISTORY_LIMIT: i64 = 50;

//
// Preferences
//

async fn preferences_or_default(
    conn: &mut diesel_async::AsyncPgConnection,
    user_id: Uuid,
) -> Result<UserPreferences, ApiError> {
    let existing = user_preferences::table
        .filter(user_preferences::user_id.eq(user_id))
        .select(UserPreferences::as_select())
        .first(conn)
        .await
        .optional()?;

    match existing {
        Some(preferences) => Ok(preferences),
        None => {
            debug!("Creating default preferences for {}", user_id);
            let preferences = UserPreferences::defaults_for(user_id);
            diesel::insert_into(user_preferences::table)
                .values(&preferences)
                .execute(conn)
                .await?;
            Ok(preferences)
        }
    }
}

/// GET /api/user/preferences
pub async fn get_preferences(
    State(pool): State<DbPool>,
    Extension(AuthUser(user)): Extension<AuthUser>,
) -> Result<Json<UserPreferences>, ApiError> {
    let mut conn = pool.get().await?;
    Ok(Json(preferences_or_default(&mut conn, user.id).await?))
}

/// PUT /api/user/preferences
/// Only the fields present in the body change.
pub async fn put_preferences(
    State(pool): State<DbPool>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Json(mut update): Json<PreferencesUpdate>,
) -> Result<Json<UserPreferences>, ApiError> {
    let mut conn = pool.get().await?;
    preferences_or_default(&mut conn, user.id).await?;

    update.updated_at = Some(Utc::now());
    let preferences = diesel::update(user_preferences::table.filter(user_preferences::user_id.eq(user.id)))
        .set(&update)
        .returning(UserPreferences::as_returning())
        .get_result(&mut conn)
        .await?;

    Ok(Json(preferences))
}

//
// Saved jobs
//

async fn saved_jobs_of(pool: &DbPool, user_id: Uuid) -> Result<Vec<SavedJob>, ApiError> {
    let mut conn = pool.get().await?;
    Ok(user_saved_jobs::table
        .filter(user_saved_jobs::user_id.eq(user_id))
        .order(user_saved_jobs::saved_at.desc())
        .select(SavedJob::as_select())
        .load(&mut conn)
        .await?)
}

/// POST /api/user/saved-jobs
/// Rejects a posting the user already saved with 409 `already_saved`.
pub async fn post_saved_job(
    State(pool): State<DbPool>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Json(request): Json<SaveJobRequest>,
) -> Result<impl IntoResponse, SaveJobError> {
    let mut conn = pool.get().await?;

    let existing: Vec<serde_json::Value> = user_saved_jobs::table
        .filter(user_saved_jobs::user_id.eq(user.id))
        .select(user_saved_jobs::job_data)
        .load(&mut conn)
        .await?;
    if existing.iter().any(|saved| is_same_job(saved, &request.job_data)) {
        return Err(SaveJobError::AlreadySaved);
    }

    let saved = SavedJob::from_request(user.id, request);
    diesel::insert_into(user_saved_jobs::table)
        .values(&saved)
        .execute(&mut conn)
        .await?;

    info!(user = %user.username, "Saved job {}", saved.id);
    Ok((StatusCode::CREATED, Json(saved)))
}

/// GET /api/user/saved-jobs
pub async fn get_saved_jobs(
    State(pool): State<DbPool>,
    Extension(AuthUser(user)): Extension<AuthUser>,
) -> Result<Json<Vec<SavedJob>>, ApiError> {
    Ok(Json(saved_jobs_of(&pool, user.id).await?))
}

/// GET /api/user/saved-jobs/categorized
pub async fn get_categorized_saved_jobs(
    State(pool): State<DbPool>,
    Extension(AuthUser(user)): Extension<AuthUser>,
) -> Result<Json<CategorizedSavedJobs>, ApiError> {
    Ok(Json(categorize(saved_jobs_of(&pool, user.id).await?)))
}

/// PUT /api/user/saved-jobs/{id}
pub async fn put_saved_job(
    State(pool): State<DbPool>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(update): Json<SavedJobUpdate>,
) -> Result<Json<SavedJob>, ApiError> {
    let mut conn = pool.get().await?;
    let saved = diesel::update(
        user_saved_jobs::table
            .filter(user_saved_jobs::id.eq(id))
            .filter(user_saved_jobs::user_id.eq(user.id)),
    )
    .set(&update.stamped(Utc::now()))
    .returning(SavedJob::as_returning())
    .get_result(&mut conn)
    .await?;

    Ok(Json(saved))
}

/// DELETE /api/user/saved-jobs/{id}
pub async fn delete_saved_job(
    State(pool): State<DbPool>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let mut conn = pool.get().await?;
    let deleted = diesel::delete(
        user_saved_jobs::table
            .filter(user_saved_jobs::id.eq(id))
            .filter(user_saved_jobs::user_id.eq(user.id)),
    )
    .execute(&mut conn)
    .await?;

    if deleted == 0 {
        return Err(ApiError::NotFound);
    }
    Ok(StatusCode::NO_CONTENT)
}

//
// Search history & saved searches
//

/// GET /api/user/search-history
pub async fn get_search_history(
    State(pool): State<DbPool>,
    Extension(AuthUser(user)): Extension<AuthUser>,
) -> Result<Json<Vec<SearchHistoryEntry>>, ApiError> {
    let mut conn = pool.get().await?;
    let history = search_history::table
        .filter(search_history::user_id.eq(user.id))
        .order(search_history::searched_at.desc())
        .limit(SEARCH_HISTORY_LIMIT)
        .select(SearchHistoryEntry::as_select())
        .load(&mut conn)
        .await?;

    Ok(Json(history))
}

/// POST /api/user/saved-searches
pub async fn post_saved_search(
    State(pool): State<DbPool>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Json(request): Json<SavedSearchCreate>,
) -> Result<impl IntoResponse, ApiError> {
    if request.name.trim().is_empty() {
        return Err(ApiError::BadRequest("name must not be empty".to_string()));
    }

    let mut conn = pool.get().await?;
    let search = SavedSearch::from_request(user.id, request);
    diesel::insert_into(saved_searches::table)
        .values(&search)
        .execute(&mut conn)
        .await?;

    Ok((StatusCode::CREATED, Json(search)))
}

/// GET /api/user/saved-searches
pub async fn get_saved_searches(
    State(pool): State<DbPool>,
    Extension(AuthUser(user)): Extension<AuthUser>,
) -> Result<Json<Vec<SavedSearch>>, ApiError> {
    let mut conn = pool.get().await?;
    let searches = saved_searches::table
        .filter(saved_searches::user_id.eq(user.id))
        .order(saved_searches::created_at.desc())
        .select(SavedSearch::as_select())
        .load(&mut conn)
        .await?;

    Ok(Json(searches))
}

/// PUT /api/user/saved-searches/{id}
pub async fn put_saved_search(
    State(pool): State<DbPool>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(mut update): Json<SavedSearchUpdate>,
) -> Result<Json<SavedSearch>, ApiError> {
    update.updated_at = Some(Utc::now());

    let mut conn = pool.get().await?;
    let search = diesel::update(
        saved_searches::table
            .filter(saved_searches::id.eq(id))
            .filter(saved_searches::user_id.eq(user.id)),
    )
    .set(&update)
    .returning(SavedSearch::as_returning())
    .get_result(&mut conn)
    .await?;

    Ok(Json(search))
}

/// DELETE /api/user/saved-searches/{id}
pub async fn delete_saved_search(
    State(pool): State<DbPool>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let mut conn = pool.get().await?;
    let deleted = diesel::delete(
        saved_searches::table
            .filter(saved_searches::id.eq(id))
            .filter(saved_searches::user_id.eq(user.id)),
    )
    .execute(&mut conn)
    .await?;

    if deleted == 0 {
        return Err(ApiError::NotFound);
    }
    Ok(StatusCode::NO_CONTENT)
}

//
// Autoscraping configuration
//

/// GET /api/user/autoscraping-config
/// The stored configuration, or the defaults addressed to the user's e-mail.
pub async fn get_autoscraping_config(
    State(pool): State<DbPool>,
    Extension(AuthUser(user)): Extension<AuthUser>,
) -> Result<Json<AutoscrapingSettings>, ApiError> {
    let mut conn = pool.get().await?;
    let stored = user_autoscraping_configs::table
        .filter(user_autoscraping_configs::user_id.eq(user.id))
        .select(AutoscrapingConfig::as_select())
        .first(&mut conn)
        .await
        .optional()?;

    let settings = match stored {
        Some(config) => AutoscrapingSettings::from(config),
        None => AutoscrapingSettings {
            notification_email: Some(user.email.clone()),
            ..AutoscrapingSettings::default()
        },
    };
    Ok(Json(settings))
}

/// PUT /api/user/autoscraping-config
pub async fn put_autoscraping_config(
    State(pool): State<DbPool>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Json(mut settings): Json<AutoscrapingSettings>,
) -> Result<Json<AutoscrapingSettings>, ApiError> {
    settings.validate().map_err(ApiError::BadRequest)?;
    if settings.notification_email.as_deref().is_none_or(|e| e.trim().is_empty()) {
        settings.notification_email = Some(user.email.clone());
    }

    let upsert = settings.into_upsert(user.id, Utc::now());
    let mut conn = pool.get().await?;
    let config = diesel::insert_into(user_autoscraping_configs::table)
        .values(&upsert)
        .on_conflict(user_autoscraping_configs::user_id)
        .do_update()
        .set(&upsert)
        .returning(AutoscrapingConfig::as_returning())
        .get_result(&mut conn)
        .await?;

    info!(user = %user.username, enabled = config.enabled, "Saved autoscraping config");
    Ok(Json(AutoscrapingSettings::from(config)))
}
