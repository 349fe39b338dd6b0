use axum::Json;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::db::PoolError;

// API Error Types

/// General error for CRUD endpoints
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "error", content = "details")]
pub enum ApiError {
    /// The requested record does not exist
    #[serde(rename = "not_found")]
    NotFound,
    /// The request failed validation
    #[serde(rename = "bad_request")]
    BadRequest(String),
    /// The request clashes with an existing record
    #[serde(rename = "conflict")]
    Conflict(String),
    /// Unknown error occurred
    #[serde(rename = "unknown")]
    Unknown(String),
}

/// Error for POST /api/auth/register
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "error", content = "details")]
pub enum RegisterError {
    #[serde(rename = "username_taken")]
    UsernameTaken,
    #[serde(rename = "email_taken")]
    EmailTaken,
    /// The request failed validation
    #[serde(rename = "invalid")]
    Invalid(String),
    /// Unknown error occurred
    #[serde(rename = "unknown")]
    Unknown(String),
}

/// Error for POST /api/user/saved-jobs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "error", content = "details")]
pub enum SaveJobError {
    /// The user already saved this posting
    #[serde(rename = "already_saved")]
    AlreadySaved,
    /// Unknown error occurred
    #[serde(rename = "unknown")]
    Unknown(String),
}

/// Error for the /api/daily-review endpoints
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "error", content = "details")]
pub enum ReviewError {
    /// No job scored high enough to build a list
    #[serde(rename = "no_qualifying_jobs")]
    NoQualifyingJobs,
    /// Date is not `YYYY-MM-DD`
    #[serde(rename = "invalid_date")]
    InvalidDate(String),
    /// Rating outside 1 to 5
    #[serde(rename = "invalid_rating")]
    InvalidRating(i32),
    /// Lookback reaches past the supported date range
    #[serde(rename = "invalid_lookback")]
    InvalidLookback(i64),
    #[serde(rename = "not_found")]
    NotFound,
    /// Unknown error occurred
    #[serde(rename = "unknown")]
    Unknown(String),
}

pub struct AppError(anyhow::Error);

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({
                "error": self.0.to_string()
            })),
        )
            .into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

macro_rules! from_error {
    ($lib_err:path, $err_type:tt) => {
        /// Converts a `$lib_err` into an `$err_type::Unknown`.
        impl From<$lib_err> for $err_type {
            fn from(e: $lib_err) -> Self {
                $err_type::Unknown(format!("{:?}", e))
            }
        }
    };
}

macro_rules! from_diesel_not_found_error {
    ($err_type:tt, $not_found:expr) => {
        /// Converts a `diesel::result::Error::NotFound` into the type's not-found variant,
        /// otherwise it's a `$err_type::Unknown(diesel::result::Error)`.
        impl From<diesel::result::Error> for $err_type {
            fn from(e: diesel::result::Error) -> Self {
                match e {
                    diesel::result::Error::NotFound => $not_found,
                    _ => $err_type::Unknown(format!("{:?}", e)),
                }
            }
        }
    };
}

/// True if `err` is a Postgres unique constraint violation.
pub fn is_unique_violation(err: &diesel::result::Error) -> bool {
    matches!(
        err,
        diesel::result::Error::DatabaseError(diesel::result::DatabaseErrorKind::UniqueViolation, _)
    )
}

// ApiError

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self {
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Unknown(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

from_error!(PoolError, ApiError);
from_error!(serde_json::Error, ApiError);
from_diesel_not_found_error!(ApiError, ApiError::NotFound);

// RegisterError

impl IntoResponse for RegisterError {
    fn into_response(self) -> axum::response::Response {
        let status = match self {
            RegisterError::UsernameTaken | RegisterError::EmailTaken | RegisterError::Invalid(_) => {
                StatusCode::BAD_REQUEST
            }
            RegisterError::Unknown(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

from_error!(PoolError, RegisterError);
from_error!(diesel::result::Error, RegisterError);

// SaveJobError

impl IntoResponse for SaveJobError {
    fn into_response(self) -> axum::response::Response {
        let status = match self {
            SaveJobError::AlreadySaved => StatusCode::CONFLICT,
            SaveJobError::Unknown(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

from_error!(PoolError, SaveJobError);
from_error!(diesel::result::Error, SaveJobError);

// ReviewError

impl IntoResponse for ReviewError {
    fn into_response(self) -> axum::response::Response {
        let status = match self {
            ReviewError::NoQualifyingJobs | ReviewError::NotFound => StatusCode::NOT_FOUND,
            ReviewError::InvalidDate(_) | ReviewError::InvalidRating(_) | ReviewError::InvalidLookback(_) => {
                StatusCode::BAD_REQUEST
            }
            ReviewError::Unknown(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

from_error!(PoolError, ReviewError);
from_error!(serde_json::Error, ReviewError);
from_diesel_not_found_error!(ReviewError, ReviewError::NotFound);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_wire_format() {
        let body = serde_json::to_value(ApiError::Conflict("name".to_string())).unwrap();
        assert_eq!(body, json!({"error": "conflict", "details": "name"}));

        let body = serde_json::to_value(SaveJobError::AlreadySaved).unwrap();
        assert_eq!(body, json!({"error": "already_saved"}));

        let body = serde_json::to_value(RegisterError::UsernameTaken).unwrap();
        assert_eq!(body, json!({"error": "username_taken"}));
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(ApiError::NotFound.into_response().status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::BadRequest("x".into()).into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(SaveJobError::AlreadySaved.into_response().status(), StatusCode::CONFLICT);
        assert_eq!(RegisterError::EmailTaken.into_response().status(), StatusCode::BAD_REQUEST);
        assert_eq!(ReviewError::NoQualifyingJobs.into_response().status(), StatusCode::NOT_FOUND);
        assert_eq!(ReviewError::InvalidRating(9).into_response().status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ReviewError::InvalidLookback(i64::MAX).into_response().status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_diesel_not_found_maps_to_not_found() {
        assert_eq!(ApiError::from(diesel::result::Error::NotFound), ApiError::NotFound);
        assert_eq!(ReviewError::from(diesel::result::Error::NotFound), ReviewError::NotFound);
        assert!(matches!(
            ApiError::from(diesel::result::Error::RollbackTransaction),
            ApiError::Unknown(_)
        ));
    }
}
