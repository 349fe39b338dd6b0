use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use tracing::info;
use uuid::Uuid;

use data_model_hunt::{
    db::DbPool,
    models::{ApiError, TargetCompany, TargetCompanyCreate, TargetCompanyUpdate, is_unique_violation},
    schema::target_companies,
};

fn duplicate_name(name: &str) -> ApiError {
    ApiError::Conflict(format!("target company '{}' already exists", name))
}

/// POST /api/admin/target-companies
pub async fn post_company(
    State(pool): State<DbPool>,
    Json(request): Json<TargetCompanyCreate>,
) -> Result<impl IntoResponse, ApiError> {
    if request.name.trim().is_empty() {
        return Err(ApiError::BadRequest("name must not be empty".to_string()));
    }

    let company = TargetCompany::from_request(request);
    let mut conn = pool.get().await?;
    diesel::insert_into(target_companies::table)
        .values(&company)
        .execute(&mut conn)
        .await
        .map_err(|e| match is_unique_violation(&e) {
            true => duplicate_name(&company.name),
            false => ApiError::from(e),
        })?;

    info!("Added target company {}", company.name);
    Ok((StatusCode::CREATED, Json(company)))
}

/// GET /api/admin/target-companies
pub async fn get_companies(State(pool): State<DbPool>) -> Result<Json<Vec<TargetCompany>>, ApiError> {
    let mut conn = pool.get().await?;
    let companies = target_companies::table
        .order(target_companies::name.asc())
        .select(TargetCompany::as_select())
        .load(&mut conn)
        .await?;

    Ok(Json(companies))
}

/// PUT /api/admin/target-companies/{id}
pub async fn put_company(
    State(pool): State<DbPool>,
    Path(id): Path<Uuid>,
    Json(mut update): Json<TargetCompanyUpdate>,
) -> Result<Json<TargetCompany>, ApiError> {
    update.name = update.name.map(|n| n.trim().to_string());
    if update.name.as_deref().is_some_and(str::is_empty) {
        return Err(ApiError::BadRequest("name must not be empty".to_string()));
    }
    update.updated_at = Some(Utc::now());

    let mut conn = pool.get().await?;
    let company = diesel::update(target_companies::table.find(id))
        .set(&update)
        .returning(TargetCompany::as_returning())
        .get_result(&mut conn)
        .await
        .map_err(|e| match is_unique_violation(&e) {
            true => duplicate_name(update.name.as_deref().unwrap_or_default()),
            false => ApiError::from(e),
        })?;

    Ok(Json(company))
}

/// DELETE /api/admin/target-companies/{id}
/// Postings keep their data; their company link is cleared.
pub async fn delete_company(State(pool): State<DbPool>, Path(id): Path<Uuid>) -> Result<StatusCode, ApiError> {
    let mut conn = pool.get().await?;
    let deleted = diesel::delete(target_companies::table.find(id))
        .execute(&mut conn)
        .await?;

    if deleted == 0 {
        return Err(ApiError::NotFound);
    }
    Ok(StatusCode::NO_CONTENT)
}
