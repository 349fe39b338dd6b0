#[derive(Debug)]
pub enum Error {
    RecordNotFound,
    DbError(diesel::result::Error),
    DbPoolError(String),
    InvalidUrl(url::ParseError),
    HttpError(reqwest::Error),
    CoreError(core_hunt::Error),
    AuthError(String),
    /// The API answered with an unexpected status.
    ApiError { status: u16, body: String },
    /// The run did not reach a final state in time.
    RunTimeout(uuid::Uuid),
    TriggerFile(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RecordNotFound => write!(f, "Record not found in database"),
            Self::DbError(e) => write!(f, "Database error: {}", e),
            Self::DbPoolError(s) => write!(f, "Database pool error: {}", s),
            Self::InvalidUrl(e) => write!(f, "Invalid URL: {}", e),
            Self::HttpError(e) => write!(f, "HTTP error: {}", e),
            Self::CoreError(e) => write!(f, "Core error: {}", e),
            Self::AuthError(s) => write!(f, "Authentication error: {}", s),
            Self::ApiError { status, body } => write!(f, "API error ({}): {}", status, body),
            Self::RunTimeout(id) => write!(f, "Scraping run {} did not finish in time", id),
            Self::TriggerFile(s) => write!(f, "Invalid trigger file: {}", s),
        }
    }
}

impl std::error::Error for Error {}

impl From<diesel::result::Error> for Error {
    fn from(error: diesel::result::Error) -> Self {
        match error {
            diesel::result::Error::NotFound => Self::RecordNotFound,
            _ => Self::DbError(error),
        }
    }
}

impl<E: std::fmt::Debug> From<deadpool::managed::PoolError<E>> for Error {
    fn from(error: deadpool::managed::PoolError<E>) -> Self {
        Self::DbPoolError(format!("{:?}", error))
    }
}

impl From<url::ParseError> for Error {
    fn from(error: url::ParseError) -> Self {
        Self::InvalidUrl(error)
    }
}

impl From<reqwest::Error> for Error {
    fn from(error: reqwest::Error) -> Self {
        Self::HttpError(error)
    }
}

impl From<core_hunt::Error> for Error {
    fn from(error: core_hunt::Error) -> Self {
        Self::CoreError(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = Error::RecordNotFound;
        assert_eq!(error.to_string(), "Record not found in database");

        let error = Error::ApiError {
            status: 409,
            body: "conflict".to_string(),
        };
        assert_eq!(error.to_string(), "API error (409): conflict");

        let error = Error::DbPoolError("connection failed".to_string());
        assert_eq!(error.to_string(), "Database pool error: connection failed");
    }

    #[test]
    fn test_error_from_diesel_not_found() {
        let error: Error = diesel::result::Error::NotFound.into();
        assert!(matches!(error, Error::RecordNotFound));
    }

    #[test]
    fn test_error_from_url_parse_error() {
        let error: Error = url::Url::parse("not a valid url").unwrap_err().into();
        assert!(matches!(error, Error::InvalidUrl(_)));
    }
}
