//! Mock job board for testing
//!
//! Returns canned postings per search term, or fails for chosen terms,
//! without calling a scraper service.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use super::{BoardQuery, JobBoard, RawPosting};
use crate::Error;

#[derive(Default)]
pub struct MockJobBoard {
    /// Postings returned when the query's search term contains the key
    responses: HashMap<String, Vec<RawPosting>>,
    /// Postings for any other query
    default_postings: Vec<RawPosting>,
    /// Search terms (substrings) that fail
    failing_terms: HashSet<String>,
    /// Sleep before answering
    delay: Option<Duration>,
    /// Every query received, in order
    queries: Mutex<Vec<BoardQuery>>,
}

impl MockJobBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `postings` for every query.
    pub fn with_postings(postings: Vec<RawPosting>) -> Self {
        Self {
            default_postings: postings,
            ..Self::default()
        }
    }

    /// Returns `postings` when the search term contains `term_contains`.
    pub fn add_response(&mut self, term_contains: &str, postings: Vec<RawPosting>) {
        self.responses.insert(term_contains.to_string(), postings);
    }

    pub fn fail_on(&mut self, term_contains: &str) {
        self.failing_terms.insert(term_contains.to_string());
    }

    pub fn set_delay(&mut self, delay: Duration) {
        self.delay = Some(delay);
    }

    /// Queries seen so far.
    pub fn queries(&self) -> Vec<BoardQuery> {
        self.queries.lock().map(|q| q.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl JobBoard for MockJobBoard {
    async fn search(&self, query: &BoardQuery) -> Result<Vec<RawPosting>, Error> {
        if let Ok(mut queries) = self.queries.lock() {
            queries.push(query.clone());
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing_terms.iter().any(|t| query.search_term.contains(t.as_str())) {
            return Err(Error::ScraperService(format!(
                "Mock job board configured to fail for '{}'",
                query.search_term
            )));
        }
        let postings = self
            .responses
            .iter()
            .find(|(term, _)| query.search_term.contains(term.as_str()))
            .map(|(_, postings)| postings.clone())
            .unwrap_or_else(|| self.default_postings.clone());
        Ok(postings)
    }
}
