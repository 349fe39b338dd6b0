use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

// users table model (database representation)
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = crate::schema::users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub hashed_password: String,
    pub full_name: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(username: String, email: String, hashed_password: String, full_name: Option<String>) -> Self {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            username,
            email,
            hashed_password,
            full_name,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Public view of a user. Never carries the password hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub full_name: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        UserResponse {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            full_name: user.full_name.clone(),
            is_active: user.is_active,
            created_at: user.created_at,
        }
    }
}

/// Input payload for POST /api/auth/register
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub full_name: Option<String>,
}

impl RegisterRequest {
    /// Checks the shape of the request before touching the database.
    pub fn validate(&self) -> Result<(), String> {
        let username = self.username.trim();
        if username.len() < 3 || username.len() > 50 {
            return Err("username must be between 3 and 50 characters".to_string());
        }
        let email = self.email.trim();
        match email.split_once('@') {
            Some((local, domain)) if !local.is_empty() && domain.contains('.') => {}
            _ => return Err("email is not a valid address".to_string()),
        }
        if self.password.len() < 6 {
            return Err("password must be at least 6 characters".to_string());
        }
        Ok(())
    }
}

/// Input payload for POST /api/auth/login
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Response payload for POST /api/auth/login
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub user: UserResponse,
}

// user_preferences table model
#[derive(Debug, Clone, Queryable, Selectable, Insertable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::user_preferences)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct UserPreferences {
    pub id: Uuid,
    pub user_id: Uuid,
    pub default_search_term: Option<String>,
    pub default_company_filter: Option<String>,
    pub default_location: String,
    pub default_distance: i32,
    pub default_job_type: Option<String>,
    pub default_remote: Option<bool>,
    pub default_results_wanted: i32,
    pub default_hours_old: i32,
    pub default_country: String,
    pub default_max_experience: Option<i32>,
    pub default_exclude_keywords: Option<String>,
    pub default_sites: Vec<String>,
    pub min_salary: Option<i32>,
    pub max_salary: Option<i32>,
    pub salary_currency: String,
    pub email_notifications: bool,
    pub job_alert_frequency: String,
    pub jobs_per_page: i32,
    pub default_sort: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserPreferences {
    /// The preferences a freshly registered user starts with.
    pub fn defaults_for(user_id: Uuid) -> Self {
        let now = Utc::now();
        UserPreferences {
            id: Uuid::new_v4(),
            user_id,
            default_search_term: None,
            default_company_filter: None,
            default_location: "USA".to_string(),
            default_distance: 50,
            default_job_type: None,
            default_remote: None,
            default_results_wanted: 100,
            default_hours_old: 168,
            default_country: "USA".to_string(),
            default_max_experience: None,
            default_exclude_keywords: None,
            default_sites: vec!["indeed".to_string()],
            min_salary: None,
            max_salary: None,
            salary_currency: "USD".to_string(),
            email_notifications: true,
            job_alert_frequency: "daily".to_string(),
            jobs_per_page: 20,
            default_sort: "date_posted".to_string(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update for PUT /api/user/preferences. Absent fields are left untouched.
#[derive(Debug, Clone, Default, AsChangeset, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::user_preferences)]
pub struct PreferencesUpdate {
    pub default_search_term: Option<String>,
    pub default_company_filter: Option<String>,
    pub default_location: Option<String>,
    pub default_distance: Option<i32>,
    pub default_job_type: Option<String>,
    pub default_remote: Option<bool>,
    pub default_results_wanted: Option<i32>,
    pub default_hours_old: Option<i32>,
    pub default_country: Option<String>,
    pub default_max_experience: Option<i32>,
    pub default_exclude_keywords: Option<String>,
    pub default_sites: Option<Vec<String>>,
    pub min_salary: Option<i32>,
    pub max_salary: Option<i32>,
    pub salary_currency: Option<String>,
    pub email_notifications: Option<bool>,
    pub job_alert_frequency: Option<String>,
    pub jobs_per_page: Option<i32>,
    pub default_sort: Option<String>,
    #[serde(skip_deserializing)]
    pub updated_at: Option<DateTime<Utc>>,
}

// user_saved_jobs table model
#[derive(Debug, Clone, Queryable, Selectable, Insertable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::user_saved_jobs)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct SavedJob {
    pub id: Uuid,
    pub user_id: Uuid,
    pub job_data: Value,
    pub notes: Option<String>,
    pub tags: Vec<String>,
    pub applied: bool,
    pub applied_at: Option<DateTime<Utc>>,
    pub save_for_later: bool,
    pub not_interested: bool,
    pub interview_scheduled: bool,
    pub interview_date: Option<DateTime<Utc>>,
    pub application_status: Option<String>,
    pub application_notes: Option<String>,
    pub follow_up_date: Option<DateTime<Utc>>,
    pub saved_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input payload for POST /api/user/saved-jobs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveJobRequest {
    pub job_data: Value,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl SavedJob {
    pub fn from_request(user_id: Uuid, request: SaveJobRequest) -> Self {
        let now = Utc::now();
        SavedJob {
            id: Uuid::new_v4(),
            user_id,
            job_data: request.job_data,
            notes: request.notes,
            tags: request.tags,
            applied: false,
            applied_at: None,
            save_for_later: false,
            not_interested: false,
            interview_scheduled: false,
            interview_date: None,
            application_status: None,
            application_notes: None,
            follow_up_date: None,
            saved_at: now,
            updated_at: now,
        }
    }

    fn is_pending(&self) -> bool {
        !(self.applied || self.save_for_later || self.not_interested || self.interview_scheduled)
    }
}

/// Partial update for PUT /api/user/saved-jobs/{id}.
#[derive(Debug, Clone, Default, AsChangeset, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::user_saved_jobs)]
pub struct SavedJobUpdate {
    pub notes: Option<String>,
    pub tags: Option<Vec<String>>,
    pub applied: Option<bool>,
    #[serde(skip_deserializing)]
    pub applied_at: Option<DateTime<Utc>>,
    pub save_for_later: Option<bool>,
    pub not_interested: Option<bool>,
    pub interview_scheduled: Option<bool>,
    pub interview_date: Option<DateTime<Utc>>,
    pub application_status: Option<String>,
    pub application_notes: Option<String>,
    pub follow_up_date: Option<DateTime<Utc>>,
    #[serde(skip_deserializing)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl SavedJobUpdate {
    /// Stamps the bookkeeping columns. Marking a job as applied records when.
    pub fn stamped(mut self, now: DateTime<Utc>) -> Self {
        if self.applied == Some(true) {
            self.applied_at = Some(now);
        }
        self.updated_at = Some(now);
        self
    }
}

fn job_field<'a>(job_data: &'a Value, key: &str) -> Option<&'a str> {
    job_data.get(key).and_then(Value::as_str).filter(|s| !s.is_empty())
}

/// True if `new` refers to the same posting as an already saved `existing` one.
///
/// When both carry a `job_url` only the URLs are compared. Otherwise the
/// postings match on identical title and company.
pub fn is_same_job(existing: &Value, new: &Value) -> bool {
    match (job_field(existing, "job_url"), job_field(new, "job_url")) {
        (Some(a), Some(b)) => a == b,
        _ => match (
            job_field(new, "title"),
            job_field(new, "company"),
            job_field(existing, "title"),
            job_field(existing, "company"),
        ) {
            (Some(title), Some(company), Some(existing_title), Some(existing_company)) => {
                title == existing_title && company == existing_company
            }
            _ => false,
        },
    }
}

/// Response payload for GET /api/user/saved-jobs/categorized
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CategorizedSavedJobs {
    pub all: Vec<SavedJob>,
    pub applied: Vec<SavedJob>,
    pub save_for_later: Vec<SavedJob>,
    pub not_interested: Vec<SavedJob>,
    pub interview_scheduled: Vec<SavedJob>,
    pub pending: Vec<SavedJob>,
}

/// Buckets saved jobs by their triage flags. A job may appear in several buckets;
/// `pending` holds the ones with no flag set.
pub fn categorize(jobs: Vec<SavedJob>) -> CategorizedSavedJobs {
    let mut out = CategorizedSavedJobs::default();
    for job in &jobs {
        if job.applied {
            out.applied.push(job.clone());
        }
        if job.save_for_later {
            out.save_for_later.push(job.clone());
        }
        if job.not_interested {
            out.not_interested.push(job.clone());
        }
        if job.interview_scheduled {
            out.interview_scheduled.push(job.clone());
        }
        if job.is_pending() {
            out.pending.push(job.clone());
        }
    }
    out.all = jobs;
    out
}

// search_history table model
#[derive(Debug, Clone, Queryable, Selectable, Insertable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::search_history)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct SearchHistoryEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub search_params: Value,
    pub results_count: i32,
    pub searched_at: DateTime<Utc>,
}

// saved_searches table model
#[derive(Debug, Clone, Queryable, Selectable, Insertable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::saved_searches)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct SavedSearch {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub search_params: Value,
    pub is_alert_active: bool,
    pub alert_frequency: String,
    pub last_alert_sent: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_alert_frequency() -> String {
    "daily".to_string()
}

/// Input payload for POST /api/user/saved-searches
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedSearchCreate {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub search_params: Value,
    #[serde(default)]
    pub is_alert_active: bool,
    #[serde(default = "default_alert_frequency")]
    pub alert_frequency: String,
}

impl SavedSearch {
    pub fn from_request(user_id: Uuid, request: SavedSearchCreate) -> Self {
        let now = Utc::now();
        SavedSearch {
            id: Uuid::new_v4(),
            user_id,
            name: request.name,
            description: request.description,
            search_params: request.search_params,
            is_alert_active: request.is_alert_active,
            alert_frequency: request.alert_frequency,
            last_alert_sent: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update for PUT /api/user/saved-searches/{id}
#[derive(Debug, Clone, Default, AsChangeset, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::saved_searches)]
pub struct SavedSearchUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub search_params: Option<Value>,
    pub is_alert_active: Option<bool>,
    pub alert_frequency: Option<String>,
    #[serde(skip_deserializing)]
    pub updated_at: Option<DateTime<Utc>>,
}

// user_autoscraping_configs table model
#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::user_autoscraping_configs)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct AutoscrapingConfig {
    pub id: Uuid,
    pub user_id: Uuid,
    pub enabled: bool,
    pub schedule_time: String,
    pub max_results: i32,
    pub days_old: i32,
    pub sites: Vec<String>,
    pub search_terms: Vec<String>,
    pub exclude_keywords: Vec<String>,
    pub location: String,
    pub distance: i32,
    pub companies: Vec<String>,
    pub min_relevance_score: i32,
    pub target_roles: Vec<String>,
    pub email_enabled: bool,
    pub notification_email: Option<String>,
    pub email_on_success: bool,
    pub email_on_failure: bool,
    pub last_run_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Body of GET/PUT /api/user/autoscraping-config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoscrapingSettings {
    pub enabled: bool,
    pub schedule_time: String,
    pub max_results: i32,
    pub days_old: i32,
    pub sites: Vec<String>,
    pub search_terms: Vec<String>,
    pub exclude_keywords: Vec<String>,
    pub location: String,
    pub distance: i32,
    pub companies: Vec<String>,
    pub min_relevance_score: i32,
    pub target_roles: Vec<String>,
    pub email_enabled: bool,
    pub notification_email: Option<String>,
    pub email_on_success: bool,
    pub email_on_failure: bool,
}

impl Default for AutoscrapingSettings {
    fn default() -> Self {
        AutoscrapingSettings {
            enabled: false,
            schedule_time: "02:00".to_string(),
            max_results: 100,
            days_old: 7,
            sites: vec!["indeed".to_string(), "linkedin".to_string()],
            search_terms: Vec::new(),
            exclude_keywords: Vec::new(),
            location: "USA".to_string(),
            distance: 25,
            companies: Vec::new(),
            min_relevance_score: 60,
            target_roles: Vec::new(),
            email_enabled: true,
            notification_email: None,
            email_on_success: true,
            email_on_failure: true,
        }
    }
}

impl AutoscrapingSettings {
    pub fn validate(&self) -> Result<(), String> {
        if !is_valid_hh_mm(&self.schedule_time) {
            return Err(format!("schedule_time must be HH:MM, got '{}'", self.schedule_time));
        }
        if !(10..=1000).contains(&self.max_results) {
            return Err("max_results must be between 10 and 1000".to_string());
        }
        Ok(())
    }

    pub fn into_upsert(self, user_id: Uuid, now: DateTime<Utc>) -> AutoscrapingConfigUpsert {
        AutoscrapingConfigUpsert {
            user_id,
            enabled: self.enabled,
            schedule_time: self.schedule_time,
            max_results: self.max_results,
            days_old: self.days_old,
            sites: self.sites,
            search_terms: self.search_terms,
            exclude_keywords: self.exclude_keywords,
            location: self.location,
            distance: self.distance,
            companies: self.companies,
            min_relevance_score: self.min_relevance_score,
            target_roles: self.target_roles,
            email_enabled: self.email_enabled,
            notification_email: self.notification_email,
            email_on_success: self.email_on_success,
            email_on_failure: self.email_on_failure,
            updated_at: now,
        }
    }
}

impl From<AutoscrapingConfig> for AutoscrapingSettings {
    fn from(config: AutoscrapingConfig) -> Self {
        AutoscrapingSettings {
            enabled: config.enabled,
            schedule_time: config.schedule_time,
            max_results: config.max_results,
            days_old: config.days_old,
            sites: config.sites,
            search_terms: config.search_terms,
            exclude_keywords: config.exclude_keywords,
            location: config.location,
            distance: config.distance,
            companies: config.companies,
            min_relevance_score: config.min_relevance_score,
            target_roles: config.target_roles,
            email_enabled: config.email_enabled,
            notification_email: config.notification_email,
            email_on_success: config.email_on_success,
            email_on_failure: config.email_on_failure,
        }
    }
}

/// Insert-or-update row for `user_autoscraping_configs`, keyed on `user_id`.
#[derive(Debug, Clone, Insertable, AsChangeset)]
#[diesel(table_name = crate::schema::user_autoscraping_configs)]
pub struct AutoscrapingConfigUpsert {
    pub user_id: Uuid,
    pub enabled: bool,
    pub schedule_time: String,
    pub max_results: i32,
    pub days_old: i32,
    pub sites: Vec<String>,
    pub search_terms: Vec<String>,
    pub exclude_keywords: Vec<String>,
    pub location: String,
    pub distance: i32,
    pub companies: Vec<String>,
    pub min_relevance_score: i32,
    pub target_roles: Vec<String>,
    pub email_enabled: bool,
    pub notification_email: Option<String>,
    pub email_on_success: bool,
    pub email_on_failure: bool,
    pub updated_at: DateTime<Utc>,
}

/// `HH:MM` on a 24 hour clock.
pub fn is_valid_hh_mm(value: &str) -> bool {
    match value.split_once(':') {
        Some((h, m)) if h.len() == 2 && m.len() == 2 => matches!(
            (h.parse::<u32>(), m.parse::<u32>()),
            (Ok(h), Ok(m)) if h < 24 && m < 60
        ),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_user_response_strips_password() {
        let user = User::new(
            "alice".to_string(),
            "alice@example.com".to_string(),
            "$2b$12$hash".to_string(),
            None,
        );
        let body = serde_json::to_value(UserResponse::from(&user)).unwrap();
        assert_eq!(body["username"], "alice");
        assert!(body.get("hashed_password").is_none());
    }

    #[test]
    fn test_register_validation() {
        let mut request = RegisterRequest {
            username: "bob".to_string(),
            email: "bob@example.com".to_string(),
            password: "secret123".to_string(),
            full_name: None,
        };
        assert!(request.validate().is_ok());

        request.email = "not-an-email".to_string();
        assert!(request.validate().is_err());

        request.email = "bob@example.com".to_string();
        request.username = "b".to_string();
        assert!(request.validate().is_err());

        request.username = "bob".to_string();
        request.password = "123".to_string();
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_is_same_job_prefers_url() {
        let saved = json!({"job_url": "https://a.com/1", "title": "Engineer", "company": "Acme"});
        let same_url = json!({"job_url": "https://a.com/1", "title": "Other", "company": "Other"});
        let other_url = json!({"job_url": "https://a.com/2", "title": "Engineer", "company": "Acme"});
        assert!(is_same_job(&saved, &same_url));
        // Both have URLs, so identical title/company does not matter.
        assert!(!is_same_job(&saved, &other_url));
    }

    #[test]
    fn test_is_same_job_falls_back_to_title_and_company() {
        let saved = json!({"title": "Engineer", "company": "Acme"});
        let new = json!({"job_url": "https://a.com/1", "title": "Engineer", "company": "Acme"});
        let different = json!({"title": "Engineer", "company": "Globex"});
        assert!(is_same_job(&saved, &new));
        assert!(!is_same_job(&saved, &different));
        assert!(!is_same_job(&json!({}), &json!({})));
    }

    #[test]
    fn test_categorize() {
        let user_id = Uuid::new_v4();
        let mut applied = SavedJob::from_request(
            user_id,
            SaveJobRequest {
                job_data: json!({"title": "A"}),
                notes: None,
                tags: vec![],
            },
        );
        applied.applied = true;
        applied.interview_scheduled = true;
        let pending = SavedJob::from_request(
            user_id,
            SaveJobRequest {
                job_data: json!({"title": "B"}),
                notes: None,
                tags: vec![],
            },
        );

        let out = categorize(vec![applied, pending]);
        assert_eq!(out.all.len(), 2);
        assert_eq!(out.applied.len(), 1);
        assert_eq!(out.interview_scheduled.len(), 1);
        assert_eq!(out.pending.len(), 1);
        assert_eq!(out.pending[0].job_data["title"], "B");
        assert!(out.save_for_later.is_empty());
    }

    #[test]
    fn test_saved_job_update_stamps_applied_at() {
        let now = Utc::now();
        let update = SavedJobUpdate {
            applied: Some(true),
            ..Default::default()
        }
        .stamped(now);
        assert_eq!(update.applied_at, Some(now));
        assert_eq!(update.updated_at, Some(now));

        let update = SavedJobUpdate {
            applied: Some(false),
            ..Default::default()
        }
        .stamped(now);
        assert_eq!(update.applied_at, None);
    }

    #[test]
    fn test_autoscraping_settings_validation() {
        let mut settings = AutoscrapingSettings::default();
        assert!(settings.validate().is_ok());

        settings.schedule_time = "25:00".to_string();
        assert!(settings.validate().is_err());

        settings.schedule_time = "07:30".to_string();
        settings.max_results = 5;
        assert!(settings.validate().is_err());

        settings.max_results = 1000;
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_autoscraping_settings_partial_body_uses_defaults() {
        let settings: AutoscrapingSettings = serde_json::from_value(json!({"enabled": true})).unwrap();
        assert!(settings.enabled);
        assert_eq!(settings.schedule_time, "02:00");
        assert_eq!(settings.sites, vec!["indeed", "linkedin"]);
    }

    #[test]
    fn test_is_valid_hh_mm() {
        assert!(is_valid_hh_mm("00:00"));
        assert!(is_valid_hh_mm("23:59"));
        assert!(!is_valid_hh_mm("9:00"));
        assert!(!is_valid_hh_mm("12:60"));
        assert!(!is_valid_hh_mm("noon"));
    }
}
