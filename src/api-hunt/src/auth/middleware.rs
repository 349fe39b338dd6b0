use axum::{
    Json,
    extract::{Request, State},
    http::{HeaderMap, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use tracing::{debug, error};
use uuid::Uuid;

use core_hunt::AuthConfig;
use data_model_hunt::{models::User, schema::users};

use super::session::{parse_bearer_token, parse_session_cookie, validate_session_token};
use crate::routes::AppState;

/// The logged-in user, placed in the request extensions by [`require_auth`].
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

/// Session token from the session cookie, else from `Authorization: Bearer`.
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::COOKIE)
        .and_then(|h| h.to_str().ok())
        .and_then(parse_session_cookie)
        .or_else(|| {
            headers
                .get(header::AUTHORIZATION)
                .and_then(|h| h.to_str().ok())
                .and_then(parse_bearer_token)
        })
}

/// User id of a valid, unexpired session token in the request headers.
pub fn authenticated_user_id(headers: &HeaderMap, config: &AuthConfig) -> Option<Uuid> {
    let token = session_token(headers)?;
    validate_session_token(&token, &config.session_secret, config.session_duration_seconds)
        .ok()
        .flatten()
}

/// Middleware that requires a valid session belonging to an active user.
pub async fn require_auth(State(state): State<AppState>, mut request: Request, next: Next) -> Result<Response, Response> {
    let Some(user_id) = authenticated_user_id(request.headers(), &state.auth) else {
        debug!("Request not authenticated, returning 401");
        return Err(unauthorized_response());
    };

    let mut conn = state.pool.get().await.map_err(|e| {
        error!("Failed to get database connection: {:?}", e);
        StatusCode::INTERNAL_SERVER_ERROR.into_response()
    })?;

    let user = users::table
        .find(user_id)
        .select(User::as_select())
        .first(&mut conn)
        .await
        .optional()
        .map_err(|e| {
            error!("Failed to load session user {}: {:?}", user_id, e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        })?;

    match user {
        Some(user) if user.is_active => {
            debug!(user = %user.username, "Request authenticated");
            request.extensions_mut().insert(AuthUser(user));
            Ok(next.run(request).await)
        }
        _ => {
            debug!("Session user {} is missing or inactive, returning 401", user_id);
            Err(unauthorized_response())
        }
    }
}

fn unauthorized_response() -> Response {
    let body = Json(serde_json::json!({
        "error": "Authentication required"
    }));

    (StatusCode::UNAUTHORIZED, body).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::session::generate_session_token;
    use axum::http::HeaderValue;

    fn config() -> AuthConfig {
        AuthConfig {
            session_secret: "middleware-secret".to_string(),
            session_duration_seconds: 600,
            secure_cookie: false,
        }
    }

    #[test]
    fn test_token_from_cookie_or_bearer() {
        let user_id = Uuid::new_v4();
        let token = generate_session_token(user_id, "middleware-secret").unwrap();

        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_str(&format!("job_hunt_session={token}")).unwrap(),
        );
        assert_eq!(authenticated_user_id(&headers, &config()), Some(user_id));

        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
        );
        assert_eq!(authenticated_user_id(&headers, &config()), Some(user_id));
    }

    #[test]
    fn test_missing_or_forged_token() {
        assert_eq!(authenticated_user_id(&HeaderMap::new(), &config()), None);

        let token = generate_session_token(Uuid::new_v4(), "other-secret").unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
        );
        assert_eq!(authenticated_user_id(&headers, &config()), None);
    }
}
