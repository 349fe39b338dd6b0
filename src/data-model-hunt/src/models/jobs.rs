use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use uuid::Uuid;

use super::{RunStatus, RunType};

// target_companies table model
#[derive(Debug, Clone, Queryable, Selectable, Insertable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::target_companies)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct TargetCompany {
    pub id: Uuid,
    pub name: String,
    pub display_name: String,
    pub is_active: bool,
    pub preferred_sites: Vec<String>,
    pub search_terms: Vec<String>,
    pub location_filters: Vec<String>,
    pub last_scraped: Option<DateTime<Utc>>,
    pub total_jobs_found: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TargetCompany {
    /// A new active company with the stock site and location settings.
    pub fn named(name: &str) -> Self {
        TargetCompany::from_request(TargetCompanyCreate {
            name: name.to_string(),
            display_name: None,
            preferred_sites: default_sites(),
            search_terms: Vec::new(),
            location_filters: default_location_filters(),
        })
    }

    pub fn from_request(request: TargetCompanyCreate) -> Self {
        let now = Utc::now();
        let name = request.name.trim().to_string();
        TargetCompany {
            id: Uuid::new_v4(),
            display_name: request.display_name.unwrap_or_else(|| name.clone()),
            name,
            is_active: true,
            preferred_sites: request.preferred_sites,
            search_terms: request.search_terms,
            location_filters: request.location_filters,
            last_scraped: None,
            total_jobs_found: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

fn default_sites() -> Vec<String> {
    vec!["indeed".to_string()]
}

fn default_location_filters() -> Vec<String> {
    vec!["USA".to_string()]
}

/// Input payload for POST /api/admin/target-companies
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetCompanyCreate {
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default = "default_sites")]
    pub preferred_sites: Vec<String>,
    #[serde(default)]
    pub search_terms: Vec<String>,
    #[serde(default = "default_location_filters")]
    pub location_filters: Vec<String>,
}

/// Partial update for PUT /api/admin/target-companies/{id}
#[derive(Debug, Clone, Default, AsChangeset, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::target_companies)]
pub struct TargetCompanyUpdate {
    pub name: Option<String>,
    pub display_name: Option<String>,
    pub is_active: Option<bool>,
    pub preferred_sites: Option<Vec<String>>,
    pub search_terms: Option<Vec<String>>,
    pub location_filters: Option<Vec<String>>,
    #[serde(skip_deserializing)]
    pub updated_at: Option<DateTime<Utc>>,
}

// scraped_jobs table model
#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Insertable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::scraped_jobs)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ScrapedJob {
    pub id: Uuid,
    pub job_url: String,
    pub job_hash: String,
    pub content_hash: String,
    pub title: String,
    pub company: String,
    pub location: Option<String>,
    pub site: String,
    pub description: Option<String>,
    pub job_type: Option<String>,
    pub is_remote: Option<bool>,
    pub min_amount: Option<f64>,
    pub max_amount: Option<f64>,
    pub salary_interval: Option<String>,
    pub currency: Option<String>,
    pub date_posted: Option<DateTime<Utc>>,
    pub date_scraped: DateTime<Utc>,
    pub is_active: bool,
    pub min_experience_years: Option<i32>,
    pub max_experience_years: Option<i32>,
    pub target_company_id: Option<Uuid>,
    pub scraping_run_id: Option<Uuid>,
}

fn default_days_old() -> i64 {
    30
}

fn default_search_limit() -> i64 {
    10_000
}

/// Input payload for POST /api/jobs/search (search over already scraped jobs).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScrapedJobSearchRequest {
    #[serde(default)]
    pub search_term: Option<String>,
    #[serde(default)]
    pub company_names: Option<Vec<String>>,
    #[serde(default)]
    pub locations: Option<Vec<String>>,
    #[serde(default)]
    pub job_types: Option<Vec<String>>,
    #[serde(default)]
    pub is_remote: Option<bool>,
    #[serde(default)]
    pub min_salary: Option<f64>,
    #[serde(default)]
    pub max_salary: Option<f64>,
    #[serde(default)]
    pub max_experience_years: Option<i32>,
    #[serde(default)]
    pub sites: Option<Vec<String>>,
    #[serde(default = "default_days_old")]
    pub days_old: i64,
    #[serde(default = "default_search_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
    /// Comma separated keywords that must not appear in the title.
    #[serde(default)]
    pub exclude_keywords: Option<String>,
}

impl ScrapedJobSearchRequest {
    pub fn exclude_keyword_list(&self) -> Vec<String> {
        split_comma_list(self.exclude_keywords.as_deref().unwrap_or_default())
    }
}

/// Splits `"a, b,,c "` into `["a", "b", "c"]`.
pub fn split_comma_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Response payload for POST /api/jobs/search
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapedJobSearchResponse {
    pub success: bool,
    pub message: String,
    pub total_count: i64,
    pub jobs: Vec<ScrapedJob>,
    pub search_params: Value,
    pub timestamp: DateTime<Utc>,
}

/// company -> "term@location" -> postings kept
pub type SearchAnalytics = BTreeMap<String, BTreeMap<String, i32>>;

// scraping_runs table model
#[derive(Debug, Clone, Queryable, Selectable, Insertable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::scraping_runs)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ScrapingRun {
    pub id: Uuid,
    pub run_type: RunType,
    pub status: RunStatus,
    pub companies_scraped: Vec<String>,
    pub sites_used: Vec<String>,
    pub search_parameters: Value,
    pub total_jobs_found: i32,
    pub new_jobs_added: i32,
    pub duplicate_jobs_skipped: i32,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub duration_seconds: Option<f64>,
    pub error_message: Option<String>,
    pub search_analytics: Value,
    pub current_progress: Option<Value>,
}

impl ScrapingRun {
    /// A run waiting in the queue for `request`.
    pub fn queued(request: &BulkScrapingRequest) -> Result<Self, serde_json::Error> {
        let run_type = request.run_type.unwrap_or_default();
        let progress = RunProgress {
            phase: RunPhase::Queued,
            total_companies: request.company_names.len(),
            ..Default::default()
        };
        Ok(ScrapingRun {
            id: Uuid::new_v4(),
            run_type,
            status: RunStatus::Queued,
            companies_scraped: request.company_names.clone(),
            sites_used: request.sites.clone(),
            search_parameters: serde_json::to_value(request)?,
            total_jobs_found: 0,
            new_jobs_added: 0,
            duplicate_jobs_skipped: 0,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            duration_seconds: None,
            error_message: None,
            search_analytics: Value::Object(Default::default()),
            current_progress: Some(serde_json::to_value(progress)?),
        })
    }

    /// Parses the bulk request this run was enqueued with.
    pub fn request(&self) -> Result<BulkScrapingRequest, serde_json::Error> {
        serde_json::from_value(self.search_parameters.clone())
    }

    pub fn progress(&self) -> Option<RunProgress> {
        self.current_progress
            .as_ref()
            .and_then(|p| serde_json::from_value(p.clone()).ok())
    }
}

fn default_bulk_sites() -> Vec<String> {
    vec!["indeed".to_string()]
}

fn default_results_per_company() -> i32 {
    100
}

fn default_hours_old() -> i32 {
    72
}

/// Input payload for POST /api/admin/scrape-bulk. Stored verbatim as a run's
/// `search_parameters` and read back by the worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkScrapingRequest {
    pub company_names: Vec<String>,
    #[serde(default)]
    pub search_terms: Vec<String>,
    #[serde(default = "default_bulk_sites")]
    pub sites: Vec<String>,
    #[serde(default)]
    pub locations: Vec<String>,
    #[serde(default = "default_results_per_company")]
    pub results_per_company: i32,
    #[serde(default = "default_hours_old")]
    pub hours_old: i32,
    #[serde(default)]
    pub is_remote: Option<bool>,
    #[serde(default)]
    pub run_type: Option<RunType>,
    /// Overrides the stored comprehensive term list for this run.
    #[serde(default)]
    pub comprehensive_terms: Vec<String>,
}

impl BulkScrapingRequest {
    pub fn for_companies(company_names: Vec<String>) -> Self {
        BulkScrapingRequest {
            company_names,
            search_terms: Vec::new(),
            sites: default_bulk_sites(),
            locations: Vec::new(),
            results_per_company: default_results_per_company(),
            hours_old: default_hours_old(),
            is_remote: None,
            run_type: None,
            comprehensive_terms: Vec::new(),
        }
    }
}

/// Where a run currently is. Stored in `scraping_runs.current_progress`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    #[default]
    Queued,
    ProcessingCompany,
    CompanyCompleted,
    CompanyTimeout,
    Completed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RunProgress {
    pub phase: RunPhase,
    pub total_companies: usize,
    pub completed_companies: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_company: Option<String>,
    #[serde(default)]
    pub jobs_found_current_company: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_elapsed_seconds: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Response payload for GET /api/scraping-runs/{id}/progress
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunProgressResponse {
    pub run_id: Uuid,
    pub status: RunStatus,
    pub total_jobs_found: i32,
    pub new_jobs_added: i32,
    pub duplicate_jobs_skipped: i32,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub elapsed_seconds: Option<f64>,
    pub progress: Option<RunProgress>,
    pub error_message: Option<String>,
}

impl RunProgressResponse {
    pub fn from_run(run: &ScrapingRun, now: DateTime<Utc>) -> Self {
        let elapsed_seconds = run.duration_seconds.or_else(|| {
            run.started_at
                .map(|started| (now - started).num_milliseconds() as f64 / 1000.0)
        });
        RunProgressResponse {
            run_id: run.id,
            status: run.status,
            total_jobs_found: run.total_jobs_found,
            new_jobs_added: run.new_jobs_added,
            duplicate_jobs_skipped: run.duplicate_jobs_skipped,
            started_at: run.started_at,
            completed_at: run.completed_at,
            elapsed_seconds,
            progress: run.progress(),
            error_message: run.error_message.clone(),
        }
    }
}

// scraping_settings table model
#[derive(Debug, Clone, Queryable, Selectable, Insertable, AsChangeset, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::scraping_settings)]
#[diesel(primary_key(key))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ScrapingSetting {
    pub key: String,
    pub value: Value,
    pub updated_at: DateTime<Utc>,
}

/// Keys of the rows in `scraping_settings`.
pub mod setting_keys {
    pub const SCRAPING_DEFAULTS: &str = "scraping_defaults";
    pub const COMPREHENSIVE_TERMS: &str = "comprehensive_terms";
}

/// Defaults applied by the scheduler and the admin UI.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ScrapingDefaults {
    #[serde(default)]
    pub companies: Option<Vec<String>>,
    #[serde(default)]
    pub search_terms: Option<Vec<String>>,
    #[serde(default)]
    pub locations: Option<Vec<String>>,
    #[serde(default)]
    pub results_per_company: Option<i32>,
    #[serde(default)]
    pub hours_old: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapingDefaultsResponse {
    #[serde(flatten)]
    pub defaults: ScrapingDefaults,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComprehensiveTerms {
    pub terms: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComprehensiveTermsResponse {
    pub terms: Vec<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Response payload for GET /api/supported-sites
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupportedSitesResponse {
    pub supported_sites: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanyJobCount {
    pub company: String,
    pub job_count: i64,
}

/// Response payload for GET /api/admin/database-stats
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseStats {
    pub total_jobs: i64,
    pub jobs_last_30_days: i64,
    pub total_companies: i64,
    pub total_runs: i64,
    pub successful_runs: i64,
    pub success_rate: f64,
    pub top_companies: Vec<CompanyJobCount>,
}

/// Response payload for the admin cleanup endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeletedCount {
    pub deleted: usize,
}

/// Response payload for GET /api/admin/scheduler/status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerStatus {
    pub enabled: bool,
    pub schedule_time: String,
    pub next_run: Option<DateTime<Utc>>,
    pub active_companies_count: i64,
    pub max_results_per_company: i32,
    pub default_search_terms: Vec<String>,
    pub last_run: Option<ScrapingRun>,
}

/// Input payload for POST /api/admin/scheduler/trigger
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TriggerRequest {
    #[serde(default)]
    pub company_names: Vec<String>,
    #[serde(default)]
    pub search_terms: Option<Vec<String>>,
}
