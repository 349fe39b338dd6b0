//! The seam between this application and whatever actually scrapes job boards.

mod mock;
mod remote;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub use mock::MockJobBoard;
pub use remote::HttpJobBoard;

use crate::Error;

/// Job boards the scraper backend can search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Site {
    Indeed,
    Linkedin,
    Glassdoor,
    ZipRecruiter,
}

impl Site {
    pub const ALL: [Site; 4] = [Site::Indeed, Site::Linkedin, Site::Glassdoor, Site::ZipRecruiter];

    pub fn as_str(&self) -> &'static str {
        match self {
            Site::Indeed => "indeed",
            Site::Linkedin => "linkedin",
            Site::Glassdoor => "glassdoor",
            Site::ZipRecruiter => "zip_recruiter",
        }
    }
}

impl std::fmt::Display for Site {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Site {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Site::ALL
            .into_iter()
            .find(|site| site.as_str() == wanted)
            .ok_or_else(|| Error::UnsupportedSite(s.to_string()))
    }
}

pub fn supported_sites() -> Vec<String> {
    Site::ALL.iter().map(|s| s.as_str().to_string()).collect()
}

/// Parses every site name, failing on the first unknown one.
pub fn parse_sites<S: AsRef<str>>(names: &[S]) -> Result<Vec<Site>, Error> {
    names.iter().map(|n| n.as_ref().parse()).collect()
}

/// One search against the job boards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardQuery {
    pub sites: Vec<Site>,
    pub search_term: String,
    pub location: String,
    pub results_wanted: u32,
    pub hours_old: u32,
    pub country: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_remote: Option<bool>,
}

/// A posting as the scraper returns it, before hashing and storage.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawPosting {
    pub title: String,
    pub company: String,
    pub location: Option<String>,
    pub site: String,
    pub job_url: Option<String>,
    pub job_url_direct: Option<String>,
    pub description: Option<String>,
    pub job_type: Option<String>,
    pub is_remote: Option<bool>,
    pub min_amount: Option<f64>,
    pub max_amount: Option<f64>,
    pub interval: Option<String>,
    pub currency: Option<String>,
    pub date_posted: Option<NaiveDate>,
}

impl RawPosting {
    pub fn new(title: &str, company: &str) -> Self {
        RawPosting {
            title: title.to_string(),
            company: company.to_string(),
            site: Site::Indeed.as_str().to_string(),
            ..Default::default()
        }
    }

    /// The URL to store: the employer's own page when known, else the board's.
    pub fn preferred_url(&self) -> String {
        self.job_url_direct
            .as_deref()
            .filter(|u| !u.trim().is_empty())
            .or(self.job_url.as_deref())
            .unwrap_or_default()
            .trim()
            .to_string()
    }
}

/// Interface to a job board scraper that lets us run a search and await its postings.
#[async_trait]
pub trait JobBoard: Send + Sync {
    async fn search(&self, query: &BoardQuery) -> Result<Vec<RawPosting>, Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sites() {
        assert_eq!(
            parse_sites(&["indeed", " LinkedIn", "zip_recruiter"]).unwrap(),
            vec![Site::Indeed, Site::Linkedin, Site::ZipRecruiter]
        );
        assert!(matches!(parse_sites(&["monster"]), Err(Error::UnsupportedSite(s)) if s == "monster"));
        assert_eq!(supported_sites(), vec!["indeed", "linkedin", "glassdoor", "zip_recruiter"]);
    }

    #[test]
    fn test_preferred_url() {
        let mut posting = RawPosting::new("Analyst", "Acme");
        assert_eq!(posting.preferred_url(), "");
        posting.job_url = Some("https://board.com/1".to_string());
        assert_eq!(posting.preferred_url(), "https://board.com/1");
        posting.job_url_direct = Some("https://acme.com/jobs/1".to_string());
        assert_eq!(posting.preferred_url(), "https://acme.com/jobs/1");
    }

    #[test]
    fn test_raw_posting_tolerates_missing_fields() {
        let posting: RawPosting = serde_json::from_str(r#"{"title": "Analyst", "company": "Acme"}"#).unwrap();
        assert_eq!(posting.title, "Analyst");
        assert!(posting.date_posted.is_none());
    }
}
