use diesel::deserialize::{self, FromSql, FromSqlRow};
use diesel::expression::AsExpression;
use diesel::pg::{Pg, PgValue};
use diesel::serialize::{self, IsNull, Output, ToSql};
use diesel::sql_types::SqlType;
use serde::{Deserialize, Serialize};
use std::io::Write;

mod errors;
mod jobs;
mod review;
mod users;

pub use errors::*;
pub use jobs::*;
pub use review::*;
pub use users::*;

// SQL type definitions for custom enums
// Note: These types use snake_case to match PostgreSQL type names
#[allow(non_camel_case_types)]
#[derive(SqlType, diesel::query_builder::QueryId, Debug, Clone, Copy)]
#[diesel(postgres_type(name = "run_status"))]
pub struct Run_status;

#[allow(non_camel_case_types)]
#[derive(SqlType, diesel::query_builder::QueryId, Debug, Clone, Copy)]
#[diesel(postgres_type(name = "run_type"))]
pub struct Run_type;

#[allow(non_camel_case_types)]
#[derive(SqlType, diesel::query_builder::QueryId, Debug, Clone, Copy)]
#[diesel(postgres_type(name = "review_status"))]
pub struct Review_status;

/// Lifecycle of a scraping run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsExpression, FromSqlRow)]
#[diesel(sql_type = Run_status)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Accepted by the API, waiting for a worker
    Queued,
    /// Claimed by a worker
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    /// True once a worker will no longer touch the run.
    pub fn is_terminal(&self) -> bool {
        match self {
            Self::Queued | Self::Running => false,
            Self::Completed | Self::Failed => true,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Queued => "queued",
            RunStatus::Running => "running",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
        }
    }
}

impl ToSql<Run_status, Pg> for RunStatus {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
        out.write_all(self.as_str().as_bytes())?;
        Ok(IsNull::No)
    }
}

impl FromSql<Run_status, Pg> for RunStatus {
    fn from_sql(bytes: PgValue) -> deserialize::Result<Self> {
        match bytes.as_bytes() {
            b"queued" => Ok(RunStatus::Queued),
            b"running" => Ok(RunStatus::Running),
            b"completed" => Ok(RunStatus::Completed),
            b"failed" => Ok(RunStatus::Failed),
            _ => Err("Unrecognized enum variant".into()),
        }
    }
}

/// What started a scraping run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, AsExpression, FromSqlRow)]
#[diesel(sql_type = Run_type)]
#[serde(rename_all = "snake_case")]
pub enum RunType {
    /// Requested by an admin through the API
    #[default]
    Manual,
    /// Daily automatic scrape
    Scheduled,
    /// Scheduler run restricted to named companies
    Targeted,
}

impl RunType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunType::Manual => "manual",
            RunType::Scheduled => "scheduled",
            RunType::Targeted => "targeted",
        }
    }
}

impl ToSql<Run_type, Pg> for RunType {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
        out.write_all(self.as_str().as_bytes())?;
        Ok(IsNull::No)
    }
}

impl FromSql<Run_type, Pg> for RunType {
    fn from_sql(bytes: PgValue) -> deserialize::Result<Self> {
        match bytes.as_bytes() {
            b"manual" => Ok(RunType::Manual),
            b"scheduled" => Ok(RunType::Scheduled),
            b"targeted" => Ok(RunType::Targeted),
            _ => Err("Unrecognized enum variant".into()),
        }
    }
}

/// Triage state of a daily review list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, AsExpression, FromSqlRow)]
#[diesel(sql_type = Review_status)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    #[default]
    Pending,
    Reviewed,
    Archived,
}

impl ToSql<Review_status, Pg> for ReviewStatus {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
        let s = match self {
            ReviewStatus::Pending => "pending",
            ReviewStatus::Reviewed => "reviewed",
            ReviewStatus::Archived => "archived",
        };
        out.write_all(s.as_bytes())?;
        Ok(IsNull::No)
    }
}

impl FromSql<Review_status, Pg> for ReviewStatus {
    fn from_sql(bytes: PgValue) -> deserialize::Result<Self> {
        match bytes.as_bytes() {
            b"pending" => Ok(ReviewStatus::Pending),
            b"reviewed" => Ok(ReviewStatus::Reviewed),
            b"archived" => Ok(ReviewStatus::Archived),
            _ => Err("Unrecognized enum variant".into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_status_terminal() {
        assert!(!RunStatus::Queued.is_terminal());
        assert!(!RunStatus::Running.is_terminal());
        assert!(RunStatus::Completed.is_terminal());
        assert!(RunStatus::Failed.is_terminal());
    }

    #[test]
    fn test_enums_serialize_snake_case() {
        assert_eq!(serde_json::to_string(&RunStatus::Completed).unwrap(), "\"completed\"");
        assert_eq!(serde_json::to_string(&RunType::Targeted).unwrap(), "\"targeted\"");
        assert_eq!(serde_json::to_string(&ReviewStatus::Pending).unwrap(), "\"pending\"");
        let parsed: RunType = serde_json::from_str("\"scheduled\"").unwrap();
        assert_eq!(parsed, RunType::Scheduled);
    }

    #[test]
    fn test_as_str_matches_serde_names() {
        for run_type in [RunType::Manual, RunType::Scheduled, RunType::Targeted] {
            assert_eq!(
                serde_json::to_string(&run_type).unwrap(),
                format!("\"{}\"", run_type.as_str())
            );
        }
        for status in [RunStatus::Queued, RunStatus::Running, RunStatus::Completed, RunStatus::Failed] {
            assert_eq!(
                serde_json::to_string(&status).unwrap(),
                format!("\"{}\"", status.as_str())
            );
        }
    }
}
