use base64::{Engine as _, engine::general_purpose};
use cookie::{Cookie, SameSite};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

pub const COOKIE_NAME: &str = "job_hunt_session";

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Invalid token format")]
    InvalidFormat,

    #[error("HMAC error: {0}")]
    HmacError(String),

    #[error("System time error: {0}")]
    SystemTimeError(#[from] std::time::SystemTimeError),
}

/// Generate a session token with format: user_id:timestamp:nonce:signature
/// The signature is HMAC-SHA256(user_id:timestamp:nonce, secret)
pub fn generate_session_token(user_id: Uuid, secret: &str) -> Result<String, SessionError> {
    let timestamp = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs();

    let nonce: [u8; 16] = rand::random();
    let nonce_b64 = general_purpose::URL_SAFE_NO_PAD.encode(nonce);

    let payload = format!("{}:{}:{}", user_id, timestamp, nonce_b64);
    let signature = general_purpose::URL_SAFE_NO_PAD.encode(mac_for(&payload, secret)?.finalize().into_bytes());

    Ok(format!("{}:{}", payload, signature))
}

/// Validate a session token.
/// Returns the user id if the signature matches and the token is younger than `max_age_secs`,
/// `Ok(None)` if it is expired or forged, and an error if it is not a token at all.
pub fn validate_session_token(token: &str, secret: &str, max_age_secs: u64) -> Result<Option<Uuid>, SessionError> {
    let parts: Vec<&str> = token.split(':').collect();
    if parts.len() != 4 {
        return Err(SessionError::InvalidFormat);
    }

    let user_id = Uuid::parse_str(parts[0]).map_err(|_| SessionError::InvalidFormat)?;
    let timestamp: u64 = parts[1].parse().map_err(|_| SessionError::InvalidFormat)?;

    let current_time = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs();
    if current_time.saturating_sub(timestamp) > max_age_secs {
        return Ok(None);
    }

    let Ok(provided_signature) = general_purpose::URL_SAFE_NO_PAD.decode(parts[3]) else {
        return Ok(None);
    };

    // verify_slice compares in constant time
    let payload = format!("{}:{}:{}", parts[0], parts[1], parts[2]);
    match mac_for(&payload, secret)?.verify_slice(&provided_signature) {
        Ok(()) => Ok(Some(user_id)),
        Err(_) => Ok(None),
    }
}

/// Create a session cookie with the token
pub fn create_session_cookie(token: &str, max_age_secs: u64, secure: bool) -> Cookie<'static> {
    Cookie::build((COOKIE_NAME, token.to_string()))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(cookie::time::Duration::seconds(max_age_secs as i64))
        .path("/")
        .build()
}

/// Create a cookie to clear the session (for logout)
pub fn create_logout_cookie(secure: bool) -> Cookie<'static> {
    Cookie::build((COOKIE_NAME, ""))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(cookie::time::Duration::seconds(0))
        .path("/")
        .build()
}

/// Parse session token from Cookie header
pub fn parse_session_cookie(cookie_header: &str) -> Option<String> {
    cookie_header
        .split(';')
        .filter_map(|pair| Cookie::parse(pair.trim()).ok())
        .find(|cookie| cookie.name() == COOKIE_NAME)
        .map(|cookie| cookie.value().to_string())
}

/// Token of an `Authorization: Bearer <token>` header
pub fn parse_bearer_token(authorization: &str) -> Option<String> {
    let (scheme, token) = authorization.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then(|| token.to_string())
}

fn mac_for(payload: &str, secret: &str) -> Result<HmacSha256, SessionError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).map_err(|e| SessionError::HmacError(e.to_string()))?;
    mac.update(payload.as_bytes());
    Ok(mac)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;
    use std::time::Duration;

    const TEST_SECRET: &str = "test_secret_key_for_hmac_signing";

    #[test]
    fn test_generate_and_validate_token() {
        let user_id = Uuid::new_v4();
        let token = generate_session_token(user_id, TEST_SECRET).unwrap();
        assert_eq!(validate_session_token(&token, TEST_SECRET, 3600).unwrap(), Some(user_id));
    }

    #[test]
    fn test_validate_token_wrong_secret() {
        let token = generate_session_token(Uuid::new_v4(), TEST_SECRET).unwrap();
        assert_eq!(validate_session_token(&token, "wrong_secret", 3600).unwrap(), None);
    }

    #[test]
    fn test_validate_token_tampered_user() {
        let token = generate_session_token(Uuid::new_v4(), TEST_SECRET).unwrap();
        let (_, rest) = token.split_once(':').unwrap();
        let forged = format!("{}:{}", Uuid::new_v4(), rest);
        assert_eq!(validate_session_token(&forged, TEST_SECRET, 3600).unwrap(), None);
    }

    #[test]
    fn test_validate_token_expired() {
        let token = generate_session_token(Uuid::new_v4(), TEST_SECRET).unwrap();
        sleep(Duration::from_secs(2));
        // Token with max_age of 1 second should be expired
        assert_eq!(validate_session_token(&token, TEST_SECRET, 1).unwrap(), None);
    }

    #[test]
    fn test_validate_token_invalid_format() {
        assert!(validate_session_token("invalid", TEST_SECRET, 3600).is_err());
        assert!(validate_session_token("not-a-uuid:1:nonce:sig", TEST_SECRET, 3600).is_err());
    }

    #[test]
    fn test_parse_session_cookie() {
        let token = parse_session_cookie("job_hunt_session=abc123; Path=/; HttpOnly");
        assert_eq!(token, Some("abc123".to_string()));
    }

    #[test]
    fn test_parse_session_cookie_multiple() {
        let token = parse_session_cookie("other=value; job_hunt_session=abc123; another=test");
        assert_eq!(token, Some("abc123".to_string()));
    }

    #[test]
    fn test_parse_session_cookie_missing() {
        assert_eq!(parse_session_cookie("other=value; another=test"), None);
    }

    #[test]
    fn test_parse_bearer_token() {
        assert_eq!(parse_bearer_token("Bearer abc"), Some("abc".to_string()));
        assert_eq!(parse_bearer_token("bearer  abc "), Some("abc".to_string()));
        assert_eq!(parse_bearer_token("Basic abc"), None);
        assert_eq!(parse_bearer_token("Bearer"), None);
    }

    #[test]
    fn test_create_session_cookie() {
        let cookie = create_session_cookie("test_token", 86400, true);
        assert_eq!(cookie.name(), COOKIE_NAME);
        assert_eq!(cookie.value(), "test_token");
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
    }
}
