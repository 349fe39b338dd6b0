use axum::{
    Extension, Json,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use diesel::prelude::*;
use diesel_async::{AsyncConnection, RunQueryDsl, scoped_futures::ScopedFutureExt};
use std::time::Instant;
use tokio::time::{Duration, sleep};
use tracing::{debug, info, warn};

use data_model_hunt::{
    db::PoolError,
    models::{LoginRequest, RegisterError, RegisterRequest, TokenResponse, User, UserPreferences, UserResponse},
    schema::{user_preferences, users},
};

use super::middleware::AuthUser;
use super::password::{hash_password, verify_password};
use super::session::{create_logout_cookie, create_session_cookie, generate_session_token};
use crate::routes::AppState;

/// Floor on the login response time, so unknown users and wrong passwords look alike.
const MIN_LOGIN_DURATION: Duration = Duration::from_secs(1);

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Inactive user")]
    InactiveUser,

    #[error("Session error: {0}")]
    SessionError(String),

    #[error("Password error: {0}")]
    PasswordError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AuthError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "Invalid credentials"),
            AuthError::InactiveUser => (StatusCode::UNAUTHORIZED, "Inactive user"),
            AuthError::SessionError(_) | AuthError::PasswordError(_) | AuthError::DatabaseError(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Authentication error")
            }
        };

        let body = Json(serde_json::json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

impl From<PoolError> for AuthError {
    fn from(e: PoolError) -> Self {
        AuthError::DatabaseError(format!("{:?}", e))
    }
}

impl From<diesel::result::Error> for AuthError {
    fn from(e: diesel::result::Error) -> Self {
        AuthError::DatabaseError(format!("{:?}", e))
    }
}

/// POST /api/auth/register
/// Creates an active user along with their default preferences.
pub async fn post_register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<impl IntoResponse, RegisterError> {
    request.validate().map_err(RegisterError::Invalid)?;

    let username = request.username.trim().to_string();
    let email = request.email.trim().to_lowercase();

    let mut conn = state.pool.get().await?;

    let username_taken: i64 = users::table
        .filter(users::username.eq(&username))
        .count()
        .get_result(&mut conn)
        .await?;
    if username_taken > 0 {
        return Err(RegisterError::UsernameTaken);
    }

    let email_taken: i64 = users::table
        .filter(users::email.eq(&email))
        .count()
        .get_result(&mut conn)
        .await?;
    if email_taken > 0 {
        return Err(RegisterError::EmailTaken);
    }

    let hashed_password = hash_password(&request.password).map_err(|e| RegisterError::Unknown(e.to_string()))?;
    let user = User::new(username, email, hashed_password, request.full_name);
    let preferences = UserPreferences::defaults_for(user.id);

    let new_user = &user;
    conn.transaction::<_, diesel::result::Error, _>(|conn| {
        async move {
            diesel::insert_into(users::table).values(new_user).execute(conn).await?;
            diesel::insert_into(user_preferences::table)
                .values(&preferences)
                .execute(conn)
                .await?;
            Ok(())
        }
        .scope_boxed()
    })
    .await?;

    info!(user = %user.username, "Registered user");
    Ok((StatusCode::CREATED, Json(UserResponse::from(&user))))
}

/// POST /api/auth/login
/// Authenticates user with password, enforces minimum 1-second response time
pub async fn post_login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<impl IntoResponse, AuthError> {
    let start = Instant::now();

    let mut conn = state.pool.get().await?;
    let user = users::table
        .filter(users::username.eq(request.username.trim()))
        .select(User::as_select())
        .first(&mut conn)
        .await
        .optional()?;

    let is_valid = match &user {
        Some(user) => verify_password(&request.password, &user.hashed_password)
            .map_err(|e| AuthError::PasswordError(e.to_string()))?,
        None => false,
    };

    let elapsed = start.elapsed();
    if elapsed < MIN_LOGIN_DURATION {
        sleep(MIN_LOGIN_DURATION - elapsed).await;
    }

    let user = match user {
        Some(user) if is_valid => user,
        _ => {
            warn!("Failed login attempt");
            return Err(AuthError::InvalidCredentials);
        }
    };
    if !user.is_active {
        warn!(user = %user.username, "Login attempt by inactive user");
        return Err(AuthError::InactiveUser);
    }

    let token = generate_session_token(user.id, &state.auth.session_secret)
        .map_err(|e| AuthError::SessionError(e.to_string()))?;
    let cookie = create_session_cookie(&token, state.auth.session_duration_seconds, state.auth.secure_cookie);

    debug!(user = %user.username, "Successful login");

    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, cookie.to_string())],
        Json(TokenResponse {
            access_token: token,
            token_type: "bearer".to_string(),
            user: UserResponse::from(&user),
        }),
    ))
}

/// POST /api/auth/logout
/// Clears the session cookie
pub async fn post_logout(State(state): State<AppState>) -> impl IntoResponse {
    let cookie = create_logout_cookie(state.auth.secure_cookie);

    debug!("User logged out");

    (
        StatusCode::OK,
        [(header::SET_COOKIE, cookie.to_string())],
        Json(serde_json::json!({"success": true})),
    )
}

/// GET /api/auth/me
pub async fn get_me(Extension(AuthUser(user)): Extension<AuthUser>) -> Json<UserResponse> {
    Json(UserResponse::from(&user))
}
