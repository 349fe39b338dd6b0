//! When the daily scrape runs and what it covers.

use chrono::{DateTime, Duration as ChronoDuration, NaiveTime, Utc};
use data_model_hunt::models::{BulkScrapingRequest, RunType, TargetCompany};
use std::path::PathBuf;
use std::time::Duration;

use crate::common::auth_config::is_flag_set;
use crate::common::durations::{TimeUnit, get_duration};
use crate::terms::{dedup_terms, to_strings};

pub const DEFAULT_SCHEDULE_TIME: &str = "20:55";
pub const DEFAULT_MAX_RESULTS: i32 = 100;

/// Terms used for companies that have none of their own.
pub const DEFAULT_AUTO_SCRAPING_TERMS: [&str; 10] = [
    "clinical",
    "medical",
    "research",
    "regulatory",
    "quality",
    "scientist",
    "manager",
    "director",
    "analyst",
    "biomedical",
];

/// A company counts as freshly scraped for this long.
pub const RESCRAPE_AFTER_HOURS: i64 = 23;

/// Sites, location and look-back of scheduled and targeted runs.
pub const SCHEDULED_SITES: [&str; 2] = ["indeed", "linkedin"];
pub const SCHEDULED_LOCATION: &str = "USA";
pub const SCHEDULED_HOURS_OLD: i32 = 7 * 24;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("invalid schedule time '{0}', expected HH:MM")]
pub struct ScheduleTimeError(pub String);

/// Parses `HH:MM` (24 hour clock).
pub fn parse_schedule_time(value: &str) -> Result<NaiveTime, ScheduleTimeError> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M").map_err(|_| ScheduleTimeError(value.to_string()))
}

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub enabled: bool,
    /// Time of day, UTC.
    pub time: NaiveTime,
    pub max_results: i32,
    pub search_terms: Vec<String>,
    pub poll_interval: Duration,
    pub trigger_file: PathBuf,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        SchedulerConfig {
            enabled: true,
            time: NaiveTime::from_hms_opt(20, 55, 0).unwrap_or_default(),
            max_results: DEFAULT_MAX_RESULTS,
            search_terms: to_strings(&DEFAULT_AUTO_SCRAPING_TERMS),
            poll_interval: Duration::from_secs(60),
            trigger_file: std::env::temp_dir().join("trigger_scraping"),
        }
    }
}

impl SchedulerConfig {
    /// Reads AUTO_SCRAPING_ENABLED, AUTO_SCRAPING_TIME, AUTO_SCRAPING_MAX_RESULTS,
    /// AUTO_SCRAPING_SEARCH_TERMS, CRON_POLL_INTERVAL_S and TRIGGER_FILE.
    ///
    /// Panics on a malformed time or number.
    pub fn from_env() -> Self {
        let defaults = SchedulerConfig::default();
        let var = |name: &str| std::env::var(name).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let enabled = match var("AUTO_SCRAPING_ENABLED") {
            Some(_) => is_flag_set("AUTO_SCRAPING_ENABLED"),
            None => defaults.enabled,
        };
        let time = match var("AUTO_SCRAPING_TIME") {
            Some(t) => parse_schedule_time(&t).unwrap_or_else(|e| panic!("AUTO_SCRAPING_TIME: {}", e)),
            None => defaults.time,
        };
        let max_results = match var("AUTO_SCRAPING_MAX_RESULTS") {
            Some(n) => n
                .parse::<i32>()
                .unwrap_or_else(|_| panic!("AUTO_SCRAPING_MAX_RESULTS must be a whole number, got '{}'", n)),
            None => defaults.max_results,
        };
        let search_terms = match var("AUTO_SCRAPING_SEARCH_TERMS") {
            Some(terms) => dedup_terms(terms.split(',')),
            None => defaults.search_terms,
        };
        let trigger_file = var("TRIGGER_FILE").map(PathBuf::from).unwrap_or(defaults.trigger_file);

        SchedulerConfig {
            enabled,
            time,
            max_results,
            search_terms,
            poll_interval: get_duration(TimeUnit::Seconds, "CRON_POLL_INTERVAL_S", 60),
            trigger_file,
        }
    }

    pub fn schedule_time(&self) -> String {
        self.time.format("%H:%M").to_string()
    }
}

/// The first instant strictly after `now` whose time of day is `time`.
pub fn next_run_after(now: DateTime<Utc>, time: NaiveTime) -> DateTime<Utc> {
    let today = now.date_naive().and_time(time).and_utc();
    if today > now { today } else { today + ChronoDuration::days(1) }
}

/// True when the daily `time` falls in `(last_tick, now]`.
pub fn is_due(last_tick: DateTime<Utc>, now: DateTime<Utc>, time: NaiveTime) -> bool {
    next_run_after(last_tick, time) <= now
}

pub fn should_scrape_company(last_scraped: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    match last_scraped {
        None => true,
        Some(at) => now - at > ChronoDuration::hours(RESCRAPE_AFTER_HOURS),
    }
}

/// The companies named in `defaults`, or every active company if none of the
/// names match. Each name matches a company exactly (ignoring case), or failing
/// that the first company whose name contains it.
pub fn select_companies(defaults: &[String], active: &[TargetCompany]) -> Vec<TargetCompany> {
    let mut selected: Vec<TargetCompany> = Vec::new();
    for name in defaults.iter().map(|n| n.trim().to_lowercase()).filter(|n| !n.is_empty()) {
        let found = active
            .iter()
            .find(|c| c.name.to_lowercase() == name)
            .or_else(|| active.iter().find(|c| c.name.to_lowercase().contains(&name)));
        if let Some(company) = found {
            if !selected.iter().any(|s| s.id == company.id) {
                selected.push(company.clone());
            }
        }
    }

    if selected.is_empty() { active.to_vec() } else { selected }
}

/// Stored default terms if there are any, else the union of the companies'
/// own terms (`builtin` for a company without terms).
pub fn search_terms_for(defaults: &[String], companies: &[TargetCompany], builtin: &[String]) -> Vec<String> {
    let defaults = dedup_terms(defaults);
    if !defaults.is_empty() {
        return defaults;
    }
    dedup_terms(companies.iter().flat_map(|c| {
        if c.search_terms.is_empty() {
            builtin.iter()
        } else {
            c.search_terms.iter()
        }
    }))
}

/// Active companies whose name equals one of `names`, ignoring case.
pub fn match_companies(names: &[String], active: Vec<TargetCompany>) -> Vec<TargetCompany> {
    active
        .into_iter()
        .filter(|c| names.iter().any(|n| n.trim().eq_ignore_ascii_case(&c.name)))
        .collect()
}

/// A `targeted` run over `companies`: the given terms, else the companies' own
/// terms with the configured defaults filling in.
pub fn targeted_request(
    companies: &[TargetCompany],
    search_terms: Option<&[String]>,
    config: &SchedulerConfig,
) -> BulkScrapingRequest {
    let search_terms = match search_terms {
        Some(terms) if !dedup_terms(terms).is_empty() => dedup_terms(terms),
        _ => search_terms_for(&[], companies, &config.search_terms),
    };
    let mut request = BulkScrapingRequest::for_companies(companies.iter().map(|c| c.name.clone()).collect());
    request.search_terms = search_terms;
    request.sites = to_strings(&SCHEDULED_SITES);
    request.locations = vec![SCHEDULED_LOCATION.to_string()];
    request.results_per_company = config.max_results;
    request.hours_old = SCHEDULED_HOURS_OLD;
    request.run_type = Some(RunType::Targeted);
    request
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::sync::Mutex;

    static TEST_MUTEX: Mutex<()> = Mutex::new(());

    fn at(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn company(name: &str, terms: &[&str]) -> TargetCompany {
        let mut c = TargetCompany::named(name);
        c.search_terms = to_strings(terms);
        c
    }

    #[test]
    fn test_parse_schedule_time() {
        assert_eq!(parse_schedule_time("02:30"), Ok(at(2, 30)));
        assert_eq!(parse_schedule_time(" 20:55 "), Ok(at(20, 55)));
        assert!(parse_schedule_time("25:00").is_err());
        assert!(parse_schedule_time("noon").is_err());
    }

    #[test]
    fn test_next_run_after() {
        let morning = Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap();
        assert_eq!(
            next_run_after(morning, at(20, 55)),
            Utc.with_ymd_and_hms(2025, 3, 1, 20, 55, 0).unwrap()
        );

        let late = Utc.with_ymd_and_hms(2025, 3, 1, 21, 0, 0).unwrap();
        assert_eq!(
            next_run_after(late, at(20, 55)),
            Utc.with_ymd_and_hms(2025, 3, 2, 20, 55, 0).unwrap()
        );

        let exactly = Utc.with_ymd_and_hms(2025, 3, 1, 20, 55, 0).unwrap();
        assert_eq!(
            next_run_after(exactly, at(20, 55)),
            Utc.with_ymd_and_hms(2025, 3, 2, 20, 55, 0).unwrap()
        );
    }

    #[test]
    fn test_is_due_only_when_crossing_the_time() {
        let time = at(20, 55);
        let before = Utc.with_ymd_and_hms(2025, 3, 1, 20, 54, 30).unwrap();
        let after = Utc.with_ymd_and_hms(2025, 3, 1, 20, 55, 30).unwrap();
        let later = Utc.with_ymd_and_hms(2025, 3, 1, 20, 56, 30).unwrap();

        assert!(is_due(before, after, time));
        assert!(!is_due(after, later, time));
        assert!(!is_due(Utc.with_ymd_and_hms(2025, 3, 1, 10, 0, 0).unwrap(), before, time));
    }

    #[test]
    fn test_is_due_across_midnight() {
        let time = at(0, 0);
        let before = Utc.with_ymd_and_hms(2025, 3, 1, 23, 59, 30).unwrap();
        let after = Utc.with_ymd_and_hms(2025, 3, 2, 0, 0, 30).unwrap();
        assert!(is_due(before, after, time));
    }

    #[test]
    fn test_should_scrape_company() {
        let now = Utc.with_ymd_and_hms(2025, 3, 2, 21, 0, 0).unwrap();
        assert!(should_scrape_company(None, now));
        assert!(should_scrape_company(Some(now - ChronoDuration::hours(24)), now));
        assert!(!should_scrape_company(Some(now - ChronoDuration::hours(23)), now));
        assert!(!should_scrape_company(Some(now - ChronoDuration::hours(2)), now));
    }

    #[test]
    fn test_select_companies_exact_then_substring() {
        let active = vec![
            company("Pfizer Inc", &[]),
            company("Moderna", &[]),
            company("Modernatx Labs", &[]),
        ];

        let selected = select_companies(&to_strings(&["MODERNA", "pfizer"]), &active);
        let names: Vec<_> = selected.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Moderna", "Pfizer Inc"]);
    }

    #[test]
    fn test_select_companies_falls_back_to_all_active() {
        let active = vec![company("Pfizer", &[]), company("Moderna", &[])];
        assert_eq!(select_companies(&to_strings(&["Unknown"]), &active).len(), 2);
        assert_eq!(select_companies(&[], &active).len(), 2);
    }

    #[test]
    fn test_search_terms_for() {
        let builtin = to_strings(&["analyst", "manager"]);
        let companies = vec![
            company("Pfizer", &["Clinical", "analyst"]),
            company("Moderna", &[]),
        ];

        assert_eq!(
            search_terms_for(&to_strings(&["director"]), &companies, &builtin),
            vec!["director"]
        );
        assert_eq!(
            search_terms_for(&[], &companies, &builtin),
            vec!["Clinical", "analyst", "manager"]
        );
    }

    #[test]
    fn test_scheduler_config_from_env() {
        let _guard = TEST_MUTEX.lock().unwrap();
        let vars = [
            "AUTO_SCRAPING_ENABLED",
            "AUTO_SCRAPING_TIME",
            "AUTO_SCRAPING_MAX_RESULTS",
            "AUTO_SCRAPING_SEARCH_TERMS",
            "CRON_POLL_INTERVAL_S",
            "TRIGGER_FILE",
        ];
        unsafe {
            for v in vars {
                std::env::remove_var(v);
            }
        }

        let config = SchedulerConfig::from_env();
        assert!(config.enabled);
        assert_eq!(config.schedule_time(), "20:55");
        assert_eq!(config.max_results, 100);
        assert_eq!(config.search_terms.len(), 10);
        assert_eq!(config.poll_interval, Duration::from_secs(60));
        assert!(config.trigger_file.ends_with("trigger_scraping"));

        unsafe {
            std::env::set_var("AUTO_SCRAPING_ENABLED", "false");
            std::env::set_var("AUTO_SCRAPING_TIME", "02:00");
            std::env::set_var("AUTO_SCRAPING_MAX_RESULTS", "250");
            std::env::set_var("AUTO_SCRAPING_SEARCH_TERMS", "nurse, pharmacist,Nurse");
            std::env::set_var("CRON_POLL_INTERVAL_S", "5");
            std::env::set_var("TRIGGER_FILE", "/tmp/hunt-trigger");
        }
        let config = SchedulerConfig::from_env();
        assert!(!config.enabled);
        assert_eq!(config.time, at(2, 0));
        assert_eq!(config.max_results, 250);
        assert_eq!(config.search_terms, vec!["nurse", "pharmacist"]);
        assert_eq!(config.poll_interval, Duration::from_secs(5));
        assert_eq!(config.trigger_file, PathBuf::from("/tmp/hunt-trigger"));

        unsafe {
            for v in vars {
                std::env::remove_var(v);
            }
        }
    }

    #[test]
    fn test_match_companies_ignores_case_but_not_substrings() {
        let active = vec![company("Pfizer", &[]), company("Moderna", &[]), company("Pfizer Labs", &[])];
        let matched = match_companies(&to_strings(&["pfizer ", "BioNTech"]), active);
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].name, "Pfizer");
    }

    #[test]
    fn test_targeted_request() {
        let config = SchedulerConfig::default();
        let companies = vec![company("Pfizer", &["chemist"]), company("Moderna", &[])];

        let request = targeted_request(&companies, None, &config);
        assert_eq!(request.company_names, to_strings(&["Pfizer", "Moderna"]));
        assert_eq!(request.search_terms[0], "chemist");
        assert_eq!(request.search_terms.len(), 1 + DEFAULT_AUTO_SCRAPING_TERMS.len());
        assert_eq!(request.sites, to_strings(&SCHEDULED_SITES));
        assert_eq!(request.hours_old, SCHEDULED_HOURS_OLD);
        assert_eq!(request.results_per_company, DEFAULT_MAX_RESULTS);
        assert_eq!(request.run_type, Some(RunType::Targeted));

        let custom = to_strings(&["biologist"]);
        let request = targeted_request(&companies, Some(&custom), &config);
        assert_eq!(request.search_terms, custom);

        let request = targeted_request(&companies, Some(&[]), &config);
        assert_eq!(request.search_terms[0], "chemist");
    }
}
