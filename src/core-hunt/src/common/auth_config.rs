use std::env;

/// Default lifetime of a session token: 30 minutes.
pub const DEFAULT_SESSION_DURATION_SECONDS: u64 = 1800;

#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Key for the HMAC-SHA256 signature on session tokens.
    pub session_secret: String,
    pub session_duration_seconds: u64,
    /// Mark the session cookie `Secure`. Enabled whenever TLS is.
    pub secure_cookie: bool,
}

/// Reads SESSION_SECRET, SESSION_DURATION_SECONDS and ENABLE_TLS.
/// Panics if SESSION_SECRET is missing or empty.
pub fn get_auth_config() -> AuthConfig {
    let session_secret = env::var("SESSION_SECRET")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .expect(
            "SESSION_SECRET environment variable is required. \
             Generate a secret with: openssl rand -base64 32",
        );

    AuthConfig {
        session_secret,
        session_duration_seconds: session_duration_seconds(),
        secure_cookie: is_flag_set("ENABLE_TLS"),
    }
}

/// SESSION_DURATION_SECONDS, or 30 minutes when unset or unparsable.
pub fn session_duration_seconds() -> u64 {
    env::var("SESSION_DURATION_SECONDS")
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(DEFAULT_SESSION_DURATION_SECONDS)
}

/// True if the env var is present and is one of "1", "true", "yes", or "y".
pub fn is_flag_set(var_name: &str) -> bool {
    env::var(var_name)
        .map(|v| {
            let v = v.trim().to_lowercase();
            v == "1" || v == "true" || v == "yes" || v == "y"
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Use a mutex to ensure tests that modify env vars run serially
    static TEST_MUTEX: Mutex<()> = Mutex::new(());

    #[test]
    fn test_is_flag_set() {
        let _guard = TEST_MUTEX.lock().unwrap();
        unsafe {
            env::remove_var("HUNT_TEST_FLAG");
        }
        assert!(!is_flag_set("HUNT_TEST_FLAG"));
        for value in ["1", "true", "YES", " y "] {
            unsafe {
                env::set_var("HUNT_TEST_FLAG", value);
            }
            assert!(is_flag_set("HUNT_TEST_FLAG"), "{value}");
        }
        unsafe {
            env::set_var("HUNT_TEST_FLAG", "false");
        }
        assert!(!is_flag_set("HUNT_TEST_FLAG"));
        unsafe {
            env::remove_var("HUNT_TEST_FLAG");
        }
    }

    #[test]
    fn test_session_duration() {
        let _guard = TEST_MUTEX.lock().unwrap();
        unsafe {
            env::remove_var("SESSION_DURATION_SECONDS");
        }
        assert_eq!(session_duration_seconds(), 1800);
        unsafe {
            env::set_var("SESSION_DURATION_SECONDS", "60");
        }
        assert_eq!(session_duration_seconds(), 60);
        unsafe {
            env::set_var("SESSION_DURATION_SECONDS", "soon");
        }
        assert_eq!(session_duration_seconds(), 1800);
        unsafe {
            env::remove_var("SESSION_DURATION_SECONDS");
        }
    }

    #[test]
    fn test_get_auth_config() {
        let _guard = TEST_MUTEX.lock().unwrap();
        unsafe {
            env::set_var("SESSION_SECRET", "abc123");
            env::remove_var("ENABLE_TLS");
        }
        let config = get_auth_config();
        assert_eq!(config.session_secret, "abc123");
        assert!(!config.secure_cookie);
        unsafe {
            env::remove_var("SESSION_SECRET");
        }
    }
}
