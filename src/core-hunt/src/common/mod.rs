pub mod auth_config;
pub mod db_env;
pub mod durations;
pub mod env_check;
pub mod health;
pub mod hostname;
pub mod logging;
pub mod max_concurrency;
pub mod tls_config;
