use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::{ReviewStatus, ScrapedJob};

// daily_job_review_lists table model
#[derive(Debug, Clone, Queryable, Selectable, Insertable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::daily_job_review_lists)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct DailyReviewList {
    pub id: Uuid,
    /// `YYYY-MM-DD`
    pub review_date: String,
    pub filter_config: Value,
    pub total_jobs_reviewed: i32,
    pub jobs_selected_count: i32,
    pub auto_generated: bool,
    pub status: ReviewStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// daily_job_review_items table model
#[derive(Debug, Clone, Queryable, Selectable, Insertable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::daily_job_review_items)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct DailyReviewItem {
    pub id: Uuid,
    pub review_list_id: Uuid,
    pub scraped_job_id: Uuid,
    pub relevance_score: f64,
    pub ai_score: Option<f64>,
    pub final_rank: i32,
    pub user_rating: Option<i32>,
    pub user_notes: Option<String>,
    pub is_selected: bool,
    pub is_dismissed: bool,
    pub added_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
}

impl DailyReviewItem {
    pub fn ranked(review_list_id: Uuid, scraped_job_id: Uuid, relevance_score: f64, final_rank: i32) -> Self {
        DailyReviewItem {
            id: Uuid::new_v4(),
            review_list_id,
            scraped_job_id,
            relevance_score,
            ai_score: None,
            final_rank,
            user_rating: None,
            user_notes: None,
            is_selected: false,
            is_dismissed: false,
            added_at: Utc::now(),
            reviewed_at: None,
        }
    }
}

/// A review item with the posting it points at.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyReviewItemResponse {
    #[serde(flatten)]
    pub item: DailyReviewItem,
    pub job: ScrapedJob,
}

/// Response payload for GET /api/daily-review/{date}
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyReviewListResponse {
    pub id: Uuid,
    pub date: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub filter_config: Value,
    pub total_jobs_reviewed: i32,
    pub jobs_selected_count: i32,
    pub auto_generated: bool,
    pub status: ReviewStatus,
    pub jobs: Vec<DailyReviewItemResponse>,
}

impl DailyReviewListResponse {
    pub fn new(list: DailyReviewList, jobs: Vec<DailyReviewItemResponse>) -> Self {
        DailyReviewListResponse {
            id: list.id,
            date: list.review_date,
            created_at: list.created_at,
            updated_at: list.updated_at,
            filter_config: list.filter_config,
            total_jobs_reviewed: list.total_jobs_reviewed,
            jobs_selected_count: list.jobs_selected_count,
            auto_generated: list.auto_generated,
            status: list.status,
            jobs,
        }
    }
}

/// Row of GET /api/daily-review/summaries
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyReviewSummary {
    pub id: Uuid,
    pub date: String,
    pub status: ReviewStatus,
    pub total_jobs_reviewed: i32,
    pub jobs_selected_count: i32,
    pub jobs_count: i64,
    pub selected_count: i64,
    pub dismissed_count: i64,
    pub created_at: DateTime<Utc>,
}

/// Input payload for PUT /api/daily-review/item/{id}
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateReviewItemRequest {
    #[serde(default)]
    pub is_selected: Option<bool>,
    #[serde(default)]
    pub is_dismissed: Option<bool>,
    #[serde(default)]
    pub user_rating: Option<i32>,
    #[serde(default)]
    pub user_notes: Option<String>,
}

impl UpdateReviewItemRequest {
    pub fn has_rating_in_range(&self) -> bool {
        self.user_rating.is_none_or(|r| (1..=5).contains(&r))
    }

    pub fn is_empty(&self) -> bool {
        self.is_selected.is_none()
            && self.is_dismissed.is_none()
            && self.user_rating.is_none()
            && self.user_notes.is_none()
    }

    /// The changeset to apply. Any field present marks the item reviewed at `now`.
    pub fn into_changeset(self, now: DateTime<Utc>) -> ReviewItemChangeset {
        let reviewed_at = if self.is_empty() { None } else { Some(now) };
        ReviewItemChangeset {
            is_selected: self.is_selected,
            is_dismissed: self.is_dismissed,
            user_rating: self.user_rating,
            user_notes: self.user_notes,
            reviewed_at,
        }
    }
}

#[derive(Debug, Clone, Default, AsChangeset)]
#[diesel(table_name = crate::schema::daily_job_review_items)]
pub struct ReviewItemChangeset {
    pub is_selected: Option<bool>,
    pub is_dismissed: Option<bool>,
    pub user_rating: Option<i32>,
    pub user_notes: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
}

/// Per-request overrides of the daily review configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReviewConfigOverrides {
    #[serde(default)]
    pub search_terms: Option<Vec<String>>,
    #[serde(default)]
    pub companies: Option<Vec<String>>,
    #[serde(default)]
    pub min_relevance_score: Option<f64>,
    #[serde(default)]
    pub max_jobs_per_day: Option<usize>,
    #[serde(default)]
    pub expected_salary: Option<f64>,
    #[serde(default)]
    pub exclude_keywords: Option<Vec<String>>,
    #[serde(default)]
    pub location_preference: Option<Vec<String>>,
    #[serde(default)]
    pub job_types: Option<Vec<String>>,
    #[serde(default)]
    pub days_lookback: Option<i64>,
}

/// Input payload for POST /api/daily-review/create
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateDailyReviewRequest {
    /// `YYYY-MM-DD`, today when absent
    #[serde(default)]
    pub target_date: Option<String>,
    #[serde(default)]
    pub force_recreate: bool,
    #[serde(default)]
    pub config: Option<ReviewConfigOverrides>,
}

// filtered_job_views table model
#[derive(Debug, Clone, Queryable, Selectable, Insertable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::filtered_job_views)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct FilteredJobView {
    pub id: Uuid,
    pub user_id: Uuid,
    pub scraped_job_id: Uuid,
    pub scraping_run_id: Option<Uuid>,
    pub filter_date: NaiveDate,
    pub relevance_score: f64,
    pub enhanced_score: f64,
    pub best_matching_keyword: Option<String>,
    pub ai_relevance: Option<String>,
    pub filter_criteria: Value,
    pub created_at: DateTime<Utc>,
}

/// Scores written back when a view for the same (user, job, date) already exists.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = crate::schema::filtered_job_views)]
pub struct FilteredJobScores {
    pub relevance_score: f64,
    pub enhanced_score: f64,
    pub best_matching_keyword: Option<String>,
    pub ai_relevance: Option<String>,
    pub filter_criteria: Value,
}

impl FilteredJobView {
    pub fn scores(&self) -> FilteredJobScores {
        FilteredJobScores {
            relevance_score: self.relevance_score,
            enhanced_score: self.enhanced_score,
            best_matching_keyword: self.best_matching_keyword.clone(),
            ai_relevance: self.ai_relevance.clone(),
            filter_criteria: self.filter_criteria.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilteredJobViewResponse {
    #[serde(flatten)]
    pub view: FilteredJobView,
    pub scraped_job: ScrapedJob,
}

fn default_days_back() -> i64 {
    1
}

fn default_filtered_limit() -> i64 {
    100
}

/// Sort column of GET /api/filtered-jobs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilteredSortBy {
    #[default]
    EnhancedScore,
    FilterDate,
    DatePosted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

/// Query parameters of GET /api/filtered-jobs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilteredJobSearchRequest {
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default = "default_days_back")]
    pub days_back: i64,
    #[serde(default)]
    pub min_enhanced_score: Option<f64>,
    /// Comma separated labels, e.g. `high,medium`
    #[serde(default)]
    pub ai_relevance: Option<String>,
    #[serde(default)]
    pub company_filter: Option<String>,
    #[serde(default)]
    pub location_filter: Option<String>,
    #[serde(default)]
    pub job_type_filter: Option<String>,
    #[serde(default)]
    pub is_remote: Option<bool>,
    #[serde(default = "default_filtered_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
    #[serde(default)]
    pub sort_by: FilteredSortBy,
    #[serde(default)]
    pub sort_order: SortOrder,
}

impl Default for FilteredJobSearchRequest {
    fn default() -> Self {
        FilteredJobSearchRequest {
            start_date: None,
            end_date: None,
            days_back: default_days_back(),
            min_enhanced_score: None,
            ai_relevance: None,
            company_filter: None,
            location_filter: None,
            job_type_filter: None,
            is_remote: None,
            limit: default_filtered_limit(),
            offset: 0,
            sort_by: FilteredSortBy::default(),
            sort_order: SortOrder::default(),
        }
    }
}

/// Response payload for GET /api/filtered-jobs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilteredJobSearchResponse {
    pub success: bool,
    pub total_count: i64,
    pub filtered_jobs: Vec<FilteredJobViewResponse>,
    pub available_dates: Vec<NaiveDate>,
    pub timestamp: DateTime<Utc>,
}

/// Row of GET /api/filtered-jobs/dates
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilteredDateCount {
    pub filter_date: NaiveDate,
    pub job_count: i64,
}

fn default_process_days_back() -> i64 {
    7
}

fn default_process_min_score() -> f64 {
    60.0
}

/// Input payload for POST /api/filtered-jobs/process-existing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessExistingRequest {
    #[serde(default = "default_process_days_back")]
    pub days_back: i64,
    #[serde(default = "default_process_min_score")]
    pub min_relevance_score: f64,
    #[serde(default)]
    pub search_terms: Option<Vec<String>>,
}

impl Default for ProcessExistingRequest {
    fn default() -> Self {
        ProcessExistingRequest {
            days_back: default_process_days_back(),
            min_relevance_score: default_process_min_score(),
            search_terms: None,
        }
    }
}

/// Response payload for POST /api/filtered-jobs/process-existing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessExistingResponse {
    pub jobs_considered: usize,
    pub jobs_kept: usize,
    pub search_terms: Vec<String>,
    pub filter_date: NaiveDate,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rating_range() {
        let mut request = UpdateReviewItemRequest::default();
        assert!(request.has_rating_in_range());
        request.user_rating = Some(5);
        assert!(request.has_rating_in_range());
        request.user_rating = Some(0);
        assert!(!request.has_rating_in_range());
        request.user_rating = Some(6);
        assert!(!request.has_rating_in_range());
    }

    #[test]
    fn test_changeset_marks_reviewed_only_when_something_changes() {
        let now = Utc::now();
        let empty = UpdateReviewItemRequest::default().into_changeset(now);
        assert!(empty.reviewed_at.is_none());

        let selected = UpdateReviewItemRequest {
            is_selected: Some(true),
            ..Default::default()
        }
        .into_changeset(now);
        assert_eq!(selected.reviewed_at, Some(now));
        assert_eq!(selected.is_selected, Some(true));
    }

    #[test]
    fn test_filtered_search_defaults() {
        let request: FilteredJobSearchRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(request.days_back, 1);
        assert_eq!(request.limit, 100);
        assert_eq!(request.sort_by, FilteredSortBy::EnhancedScore);
        assert_eq!(request.sort_order, SortOrder::Desc);

        let request: FilteredJobSearchRequest =
            serde_json::from_str(r#"{"sort_by": "date_posted", "sort_order": "asc"}"#).unwrap();
        assert_eq!(request.sort_by, FilteredSortBy::DatePosted);
        assert_eq!(request.sort_order, SortOrder::Asc);
    }

    #[test]
    fn test_process_existing_defaults() {
        let request: ProcessExistingRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(request.days_back, 7);
        assert_eq!(request.min_relevance_score, 60.0);
        assert!(request.search_terms.is_none());
    }
}
