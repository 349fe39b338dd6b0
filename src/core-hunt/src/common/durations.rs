use std::{num::ParseIntError, time::Duration};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Seconds,
    Milliseconds,
}

/// Same as `duration_from_env` but panics on error.
pub fn get_duration(units: TimeUnit, env_var_name: &str, default: u64) -> Duration {
    duration_from_env(units, env_var_name, default)
        .unwrap_or_else(|_| panic!("{} must be a valid number", env_var_name))
}

/// Reads a whole number of `units` from the env var, or `default` when it is unset.
pub fn duration_from_env(units: TimeUnit, env_var_name: &str, default: u64) -> Result<Duration, ParseIntError> {
    let amount = match std::env::var(env_var_name) {
        Ok(v) => v.trim().parse::<u64>()?,
        Err(_) => default,
    };

    Ok(match units {
        TimeUnit::Seconds => Duration::from_secs(amount),
        TimeUnit::Milliseconds => Duration::from_millis(amount),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static TEST_MUTEX: Mutex<()> = Mutex::new(());

    #[test]
    fn test_default_when_unset() {
        let _guard = TEST_MUTEX.lock().unwrap();
        unsafe {
            std::env::remove_var("HUNT_TEST_INTERVAL");
        }
        assert_eq!(
            get_duration(TimeUnit::Milliseconds, "HUNT_TEST_INTERVAL", 1000),
            Duration::from_secs(1)
        );
    }

    #[test]
    fn test_reads_units() {
        let _guard = TEST_MUTEX.lock().unwrap();
        unsafe {
            std::env::set_var("HUNT_TEST_INTERVAL", " 15 ");
        }
        assert_eq!(
            get_duration(TimeUnit::Seconds, "HUNT_TEST_INTERVAL", 1),
            Duration::from_secs(15)
        );
        assert_eq!(
            get_duration(TimeUnit::Milliseconds, "HUNT_TEST_INTERVAL", 1),
            Duration::from_millis(15)
        );
        unsafe {
            std::env::set_var("HUNT_TEST_INTERVAL", "fast");
        }
        assert!(duration_from_env(TimeUnit::Seconds, "HUNT_TEST_INTERVAL", 1).is_err());
        unsafe {
            std::env::remove_var("HUNT_TEST_INTERVAL");
        }
    }
}
