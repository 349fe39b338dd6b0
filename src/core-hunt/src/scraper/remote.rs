use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::{BoardQuery, JobBoard, RawPosting};
use crate::Error;

/// Talks to the scraping service over HTTP: `POST {base}/scrape` with a
/// [`BoardQuery`] body, answered with `{"jobs": [...]}`.
#[derive(Debug, Clone)]
pub struct HttpJobBoard {
    client: reqwest::Client,
    scrape_url: url::Url,
}

#[derive(Debug, Deserialize)]
struct ScrapeResponse {
    #[serde(default)]
    jobs: Vec<RawPosting>,
}

impl HttpJobBoard {
    pub fn new(base_url: &str) -> Result<Self, Error> {
        let base = url::Url::parse(&format!("{}/", base_url.trim().trim_end_matches('/')))?;
        Ok(HttpJobBoard {
            client: reqwest::Client::new(),
            scrape_url: base.join("scrape")?,
        })
    }

    /// Uses SCRAPER_SERVICE_URL.
    /// WARNING: Panics if it is not set or is not a URL.
    pub fn from_env() -> Self {
        let base = std::env::var("SCRAPER_SERVICE_URL").expect("SCRAPER_SERVICE_URL must be set");
        HttpJobBoard::new(&base).unwrap_or_else(|e| panic!("Invalid SCRAPER_SERVICE_URL: {}", e))
    }
}

#[async_trait]
impl JobBoard for HttpJobBoard {
    async fn search(&self, query: &BoardQuery) -> Result<Vec<RawPosting>, Error> {
        debug!("Scraping '{}' in {}", query.search_term, query.location);
        let response = self.client.post(self.scrape_url.clone()).json(query).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::ScraperService(format!("{}: {}", status, body)));
        }

        let body: ScrapeResponse = response.json().await?;
        Ok(body.jobs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scraper::Site;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn query() -> BoardQuery {
        BoardQuery {
            sites: vec![Site::Indeed, Site::Linkedin],
            search_term: "analyst Acme".to_string(),
            location: "USA".to_string(),
            results_wanted: 50,
            hours_old: 72,
            country: "USA".to_string(),
            job_type: None,
            is_remote: None,
        }
    }

    #[tokio::test]
    async fn test_search_posts_query_and_parses_jobs() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/scrape"))
            .and(body_partial_json(json!({"search_term": "analyst Acme", "sites": ["indeed", "linkedin"]})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jobs": [
                    {"title": "Data Analyst", "company": "Acme", "site": "indeed",
                     "job_url": "https://indeed.com/1", "date_posted": "2025-01-02", "min_amount": 90000.0},
                    {"title": "Analyst II", "company": "Acme Corp"}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let board = HttpJobBoard::new(&server.uri()).unwrap();
        let jobs = board.search(&query()).await.unwrap();

        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].job_url.as_deref(), Some("https://indeed.com/1"));
        assert_eq!(jobs[0].min_amount, Some(90000.0));
        assert_eq!(jobs[0].date_posted, chrono::NaiveDate::from_ymd_opt(2025, 1, 2));
        assert_eq!(jobs[1].company, "Acme Corp");
    }

    #[tokio::test]
    async fn test_service_error_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/scrape"))
            .respond_with(ResponseTemplate::new(502).set_body_string("rate limited"))
            .mount(&server)
            .await;

        let board = HttpJobBoard::new(&format!("{}/", server.uri())).unwrap();
        let err = board.search(&query()).await.unwrap_err();
        assert!(matches!(err, Error::ScraperService(msg) if msg.contains("rate limited")));
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(matches!(HttpJobBoard::new("not a url"), Err(Error::InvalidUrl(_))));
    }
}
