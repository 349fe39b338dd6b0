/// Custom error type for scraping, collection & reporting.
#[derive(Debug)]
pub enum Error {
    /// The scraper service URL is not a valid URL.
    InvalidUrl(url::ParseError),

    /// Could not reach the scraper service, or it sent back something unreadable.
    ScraperRequest(reqwest::Error),

    /// The scraper service answered with a non-success status.
    ScraperService(String),

    /// A site name that no job board backend knows about.
    UnsupportedSite(String),

    /// Writing the CSV report failed.
    Csv(csv::Error),

    /// Building or sending the notification e-mail failed.
    Email(String),

    Io(std::io::Error),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::InvalidUrl(err) => write!(f, "Not a valid URL: {}", err),
            Error::ScraperRequest(err) => write!(f, "Scraper request error: {}", err),
            Error::ScraperService(msg) => write!(f, "Scraper service error: {}", msg),
            Error::UnsupportedSite(site) => write!(f, "Unsupported job site: {}", site),
            Error::Csv(err) => write!(f, "CSV error: {}", err),
            Error::Email(msg) => write!(f, "E-mail error: {}", msg),
            Error::Io(err) => write!(f, "I/O error: {}", err),
        }
    }
}

impl std::error::Error for Error {}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::ScraperRequest(err)
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error::InvalidUrl(err)
    }
}

impl From<csv::Error> for Error {
    fn from(err: csv::Error) -> Self {
        Error::Csv(err)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

/// The CSV writer hands back its buffer wrapped in this error.
impl<W> From<csv::IntoInnerError<W>> for Error {
    fn from(err: csv::IntoInnerError<W>) -> Self {
        Error::Io(err.into_error())
    }
}

impl From<lettre::error::Error> for Error {
    fn from(err: lettre::error::Error) -> Self {
        Error::Email(err.to_string())
    }
}

impl From<lettre::transport::smtp::Error> for Error {
    fn from(err: lettre::transport::smtp::Error) -> Self {
        Error::Email(err.to_string())
    }
}

impl From<lettre::address::AddressError> for Error {
    fn from(err: lettre::address::AddressError) -> Self {
        Error::Email(err.to_string())
    }
}
