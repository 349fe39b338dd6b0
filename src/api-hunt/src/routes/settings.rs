//! Scraping settings persisted in `scraping_settings`, one JSON document per key.

use axum::{Json, extract::State};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::info;

use core_hunt::terms::{COMPREHENSIVE_TERMS, dedup_terms, to_strings};
use data_model_hunt::{
    db::DbPool,
    models::{
        ApiError, ComprehensiveTerms, ComprehensiveTermsResponse, ScrapingDefaults, ScrapingDefaultsResponse,
        ScrapingSetting, setting_keys,
    },
    schema::scraping_settings,
};

/// The stored value of `key`, decoded, with the time it was written.
pub async fn load_setting<T: DeserializeOwned>(
    conn: &mut AsyncPgConnection,
    key: &str,
) -> Result<Option<(T, DateTime<Utc>)>, ApiError> {
    let setting = scraping_settings::table
        .find(key)
        .select(ScrapingSetting::as_select())
        .first(conn)
        .await
        .optional()?;

    match setting {
        Some(setting) => Ok(Some((serde_json::from_value(setting.value)?, setting.updated_at))),
        None => Ok(None),
    }
}

async fn store_setting<T: Serialize>(pool: &DbPool, key: &str, value: &T) -> Result<DateTime<Utc>, ApiError> {
    let setting = ScrapingSetting {
        key: key.to_string(),
        value: serde_json::to_value(value)?,
        updated_at: Utc::now(),
    };

    let mut conn = pool.get().await?;
    diesel::insert_into(scraping_settings::table)
        .values(&setting)
        .on_conflict(scraping_settings::key)
        .do_update()
        .set(&setting)
        .execute(&mut conn)
        .await?;

    info!("Updated scraping setting {}", key);
    Ok(setting.updated_at)
}

/// GET /api/admin/scraping-defaults
pub async fn get_scraping_defaults(State(pool): State<DbPool>) -> Result<Json<ScrapingDefaultsResponse>, ApiError> {
    let mut conn = pool.get().await?;
    let response = match load_setting::<ScrapingDefaults>(&mut conn, setting_keys::SCRAPING_DEFAULTS).await? {
        Some((defaults, updated_at)) => ScrapingDefaultsResponse {
            defaults,
            updated_at: Some(updated_at),
        },
        None => ScrapingDefaultsResponse {
            defaults: ScrapingDefaults::default(),
            updated_at: None,
        },
    };
    Ok(Json(response))
}

/// PUT /api/admin/scraping-defaults
pub async fn put_scraping_defaults(
    State(pool): State<DbPool>,
    Json(defaults): Json<ScrapingDefaults>,
) -> Result<Json<ScrapingDefaultsResponse>, ApiError> {
    if defaults.results_per_company.is_some_and(|n| !(1..=1000).contains(&n)) {
        return Err(ApiError::BadRequest(
            "results_per_company must be between 1 and 1000".to_string(),
        ));
    }
    if defaults.hours_old.is_some_and(|h| h < 1) {
        return Err(ApiError::BadRequest("hours_old must be positive".to_string()));
    }

    let updated_at = store_setting(&pool, setting_keys::SCRAPING_DEFAULTS, &defaults).await?;
    Ok(Json(ScrapingDefaultsResponse {
        defaults,
        updated_at: Some(updated_at),
    }))
}

/// GET /api/admin/comprehensive-terms
/// Falls back to the built-in list when nothing is stored.
pub async fn get_comprehensive_terms(
    State(pool): State<DbPool>,
) -> Result<Json<ComprehensiveTermsResponse>, ApiError> {
    let mut conn = pool.get().await?;
    let response = match load_setting::<ComprehensiveTerms>(&mut conn, setting_keys::COMPREHENSIVE_TERMS).await? {
        Some((stored, updated_at)) => ComprehensiveTermsResponse {
            terms: stored.terms,
            updated_at: Some(updated_at),
        },
        None => ComprehensiveTermsResponse {
            terms: to_strings(&COMPREHENSIVE_TERMS),
            updated_at: None,
        },
    };
    Ok(Json(response))
}

/// PUT /api/admin/comprehensive-terms
pub async fn put_comprehensive_terms(
    State(pool): State<DbPool>,
    Json(request): Json<ComprehensiveTerms>,
) -> Result<Json<ComprehensiveTermsResponse>, ApiError> {
    let terms = dedup_terms(&request.terms);
    if terms.is_empty() {
        return Err(ApiError::BadRequest("terms must not be empty".to_string()));
    }

    let stored = ComprehensiveTerms { terms };
    let updated_at = store_setting(&pool, setting_keys::COMPREHENSIVE_TERMS, &stored).await?;
    Ok(Json(ComprehensiveTermsResponse {
        terms: stored.terms,
        updated_at: Some(updated_at),
    }))
}
