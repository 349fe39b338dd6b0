mod common;

pub mod collect;
pub mod dedup;
pub mod errors;
pub mod experience;
pub mod relevance;
pub mod report;
pub mod review_config;
pub mod schedule;
pub mod scraper;
pub mod terms;

pub use common::auth_config::{AuthConfig, get_auth_config, is_flag_set, session_duration_seconds};
pub use common::db_env::{get_database_url, get_db_pool};
pub use common::durations::{TimeUnit, duration_from_env, get_duration};
pub use common::env_check::{check_non_empty_env_vars, missing_env_vars};
pub use common::health::{health_check, health_router};
pub use common::hostname::{HostPortError, get_api_base_url, get_api_url};
pub use common::logging::setup_logging;
pub use common::max_concurrency::{MaxConcurrencyError, get_max_concurrency, max_concurrency};
pub use common::tls_config::get_tls_config;
pub use errors::Error;
