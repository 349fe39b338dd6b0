use data_model_hunt::models::{ReviewConfigOverrides, split_comma_list};
use serde::{Deserialize, Serialize};

use crate::relevance::RelevanceScorer;

/// How a daily review list is built. Stored with each list as `filter_config`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewConfig {
    pub search_terms: Vec<String>,
    pub companies: Vec<String>,
    pub min_relevance_score: f64,
    pub max_jobs_per_day: usize,
    pub expected_salary: Option<f64>,
    pub exclude_keywords: Vec<String>,
    pub location_preference: Vec<String>,
    pub job_types: Vec<String>,
    pub days_lookback: i64,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        let strings = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        ReviewConfig {
            search_terms: strings(&["analyst", "manager", "business", "commercial", "strategy", "finance"]),
            companies: Vec::new(),
            min_relevance_score: 20.0,
            max_jobs_per_day: 50,
            expected_salary: None,
            exclude_keywords: strings(&["intern", "internship", "student", "entry level"]),
            location_preference: strings(&["US", "United States"]),
            job_types: Vec::new(),
            days_lookback: 1,
        }
    }
}

impl ReviewConfig {
    /// Defaults, overridden by DAILY_REVIEW_SEARCH_TERMS (comma list),
    /// DAILY_REVIEW_MIN_SCORE and DAILY_REVIEW_MAX_JOBS. Unparsable values are ignored.
    pub fn from_env() -> Self {
        let mut config = ReviewConfig::default();
        if let Ok(terms) = std::env::var("DAILY_REVIEW_SEARCH_TERMS") {
            let terms = split_comma_list(&terms);
            if !terms.is_empty() {
                config.search_terms = terms;
            }
        }
        if let Some(score) = std::env::var("DAILY_REVIEW_MIN_SCORE")
            .ok()
            .and_then(|v| v.trim().parse::<f64>().ok())
        {
            config.min_relevance_score = score;
        }
        if let Some(max) = std::env::var("DAILY_REVIEW_MAX_JOBS")
            .ok()
            .and_then(|v| v.trim().parse::<usize>().ok())
        {
            config.max_jobs_per_day = max;
        }
        config
    }

    pub fn with_overrides(mut self, overrides: &ReviewConfigOverrides) -> Self {
        let o = overrides.clone();
        if let Some(v) = o.search_terms {
            self.search_terms = v;
        }
        if let Some(v) = o.companies {
            self.companies = v;
        }
        if let Some(v) = o.min_relevance_score {
            self.min_relevance_score = v;
        }
        if let Some(v) = o.max_jobs_per_day {
            self.max_jobs_per_day = v;
        }
        if o.expected_salary.is_some() {
            self.expected_salary = o.expected_salary;
        }
        if let Some(v) = o.exclude_keywords {
            self.exclude_keywords = v;
        }
        if let Some(v) = o.location_preference {
            self.location_preference = v;
        }
        if let Some(v) = o.job_types {
            self.job_types = v;
        }
        if let Some(v) = o.days_lookback {
            self.days_lookback = v.max(0);
        }
        self
    }

    pub fn scorer(&self, now: chrono::DateTime<chrono::Utc>) -> RelevanceScorer {
        RelevanceScorer::new(now)
            .with_expected_salary(self.expected_salary)
            .with_exclude_keywords(self.exclude_keywords.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static TEST_MUTEX: Mutex<()> = Mutex::new(());

    fn clear() {
        unsafe {
            std::env::remove_var("DAILY_REVIEW_SEARCH_TERMS");
            std::env::remove_var("DAILY_REVIEW_MIN_SCORE");
            std::env::remove_var("DAILY_REVIEW_MAX_JOBS");
        }
    }

    #[test]
    fn test_defaults() {
        let _guard = TEST_MUTEX.lock().unwrap();
        clear();
        let config = ReviewConfig::from_env();
        assert_eq!(config, ReviewConfig::default());
        assert_eq!(config.min_relevance_score, 20.0);
        assert_eq!(config.max_jobs_per_day, 50);
        assert_eq!(config.days_lookback, 1);
        assert_eq!(config.search_terms.len(), 6);
    }

    #[test]
    fn test_env_overrides() {
        let _guard = TEST_MUTEX.lock().unwrap();
        clear();
        unsafe {
            std::env::set_var("DAILY_REVIEW_SEARCH_TERMS", "nurse, pharmacist");
            std::env::set_var("DAILY_REVIEW_MIN_SCORE", "35.5");
            std::env::set_var("DAILY_REVIEW_MAX_JOBS", "many");
        }
        let config = ReviewConfig::from_env();
        assert_eq!(config.search_terms, vec!["nurse", "pharmacist"]);
        assert_eq!(config.min_relevance_score, 35.5);
        assert_eq!(config.max_jobs_per_day, 50);
        clear();
    }

    #[test]
    fn test_request_overrides() {
        let overrides = ReviewConfigOverrides {
            companies: Some(vec!["Acme".to_string()]),
            max_jobs_per_day: Some(5),
            expected_salary: Some(100_000.0),
            days_lookback: Some(3),
            ..Default::default()
        };
        let config = ReviewConfig::default().with_overrides(&overrides);
        assert_eq!(config.companies, vec!["Acme"]);
        assert_eq!(config.max_jobs_per_day, 5);
        assert_eq!(config.expected_salary, Some(100_000.0));
        assert_eq!(config.days_lookback, 3);
        assert_eq!(config.min_relevance_score, 20.0);
    }
}
