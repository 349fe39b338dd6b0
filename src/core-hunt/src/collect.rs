//! Runs every (location, term) search for one company and merges the results.

use std::collections::{BTreeMap, HashSet};
use std::time::Duration;

use tracing::{debug, warn};

use crate::dedup::dedup_key;
use crate::scraper::{BoardQuery, JobBoard, RawPosting, Site};
use crate::terms::DEFAULT_LOCATIONS;

#[derive(Debug, Clone)]
pub struct CollectParams {
    /// Already expanded, see [`crate::terms::expand_search_terms`].
    pub search_terms: Vec<String>,
    /// Empty means [`DEFAULT_LOCATIONS`].
    pub locations: Vec<String>,
    pub sites: Vec<Site>,
    pub results_wanted: u32,
    pub hours_old: u32,
    pub is_remote: Option<bool>,
    /// Pause between two board requests.
    pub request_delay: Duration,
}

#[derive(Debug, Clone, Default)]
pub struct CompanyCollection {
    pub postings: Vec<RawPosting>,
    /// "term@location" -> postings from that search that belong to the company
    pub analytics: BTreeMap<String, i32>,
    pub failed_searches: usize,
}

/// True if the posting's company contains any word of the target company's name.
pub fn matches_company(posting_company: &str, target_company: &str) -> bool {
    let posting_company = posting_company.to_lowercase();
    target_company
        .to_lowercase()
        .split_whitespace()
        .any(|word| posting_company.contains(word))
}

fn board_query_text(term: &str, company: &str) -> String {
    let term = term.trim();
    if term.is_empty() || term.eq_ignore_ascii_case(company.trim()) {
        company.trim().to_string()
    } else {
        format!("{} {}", term, company.trim())
    }
}

/// Searches the board for every location and term, keeping only postings of
/// `company`, each posting once. A failing search is logged, recorded as 0 and skipped.
pub async fn collect_company_jobs<B>(board: &B, company: &str, params: &CollectParams) -> CompanyCollection
where
    B: JobBoard + ?Sized,
{
    let locations: Vec<String> = if params.locations.is_empty() {
        DEFAULT_LOCATIONS.iter().map(|l| l.to_string()).collect()
    } else {
        params.locations.clone()
    };

    let mut collection = CompanyCollection::default();
    let mut seen = HashSet::new();
    let mut first_request = true;

    for location in &locations {
        for term in &params.search_terms {
            if !first_request && !params.request_delay.is_zero() {
                tokio::time::sleep(params.request_delay).await;
            }
            first_request = false;

            let query = BoardQuery {
                sites: params.sites.clone(),
                search_term: board_query_text(term, company),
                location: location.clone(),
                results_wanted: params.results_wanted,
                hours_old: params.hours_old,
                country: "USA".to_string(),
                job_type: None,
                is_remote: params.is_remote,
            };
            let analytics_key = format!("{}@{}", term, location);

            match board.search(&query).await {
                Ok(postings) => {
                    let mut found = 0;
                    for posting in postings {
                        if !matches_company(&posting.company, company) {
                            continue;
                        }
                        found += 1;
                        if seen.insert(dedup_key(&posting)) {
                            collection.postings.push(posting);
                        }
                    }
                    debug!("{} '{}' in {}: {} postings", company, term, location, found);
                    *collection.analytics.entry(analytics_key).or_insert(0) += found;
                }
                Err(e) => {
                    warn!("Search '{}' in {} failed for {}: {}", term, location, company, e);
                    collection.analytics.entry(analytics_key).or_insert(0);
                    collection.failed_searches += 1;
                }
            }
        }
    }

    collection
}
