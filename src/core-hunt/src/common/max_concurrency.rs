use std::env::VarError;
use std::num::ParseIntError;

/// Runs executed at once when WORKER_MAX_CONCURRENCY is unset.
pub const DEFAULT: usize = 2;

/// Same as max_concurrency but panics on a malformed value.
pub fn get_max_concurrency(override_default: Option<usize>) -> usize {
    match max_concurrency() {
        Ok(v) => v,
        Err(MaxConcurrencyError::MissingEnvVar(_)) => override_default.unwrap_or(DEFAULT),
        Err(e) => panic!("{}", e),
    }
}

/// Retrieves WORKER_MAX_CONCURRENCY as a semaphore permit count.
pub fn max_concurrency() -> Result<usize, MaxConcurrencyError> {
    let value = std::env::var("WORKER_MAX_CONCURRENCY")?.trim().parse::<usize>()?;
    if value == 0 {
        return Err(MaxConcurrencyError::NonPositive);
    }
    Ok(value)
}

#[derive(Debug)]
pub enum MaxConcurrencyError {
    ParseIntError(ParseIntError),
    NonPositive,
    MissingEnvVar(VarError),
}

impl std::error::Error for MaxConcurrencyError {}

impl From<ParseIntError> for MaxConcurrencyError {
    fn from(error: ParseIntError) -> Self {
        Self::ParseIntError(error)
    }
}

impl From<VarError> for MaxConcurrencyError {
    fn from(error: VarError) -> Self {
        Self::MissingEnvVar(error)
    }
}

impl std::fmt::Display for MaxConcurrencyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        match self {
            Self::ParseIntError(e) => write!(f, "WORKER_MAX_CONCURRENCY is not an integer: {}", e),
            Self::NonPositive => write!(f, "WORKER_MAX_CONCURRENCY must be a positive number"),
            Self::MissingEnvVar(e) => write!(f, "Environment variable WORKER_MAX_CONCURRENCY is missing: {}", e),
        }
    }
}
