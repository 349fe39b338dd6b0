use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use core_hunt::report::{EmailConfig, SmtpNotifier};
use core_hunt::schedule::{SchedulerConfig, next_run_after};
use core_hunt::{check_non_empty_env_vars, get_api_url, get_db_pool, setup_logging};
use cron_hunt::{AuthenticatedClient, Scheduler};

#[tokio::main]
async fn main() {
    // Load environment variables from .env file, if it exists
    dotenvy::dotenv().ok();

    setup_logging("cron_hunt=debug,core_hunt=debug");

    check_non_empty_env_vars(&["DATABASE_URL", "CRON_USERNAME", "CRON_PASSWORD"]);

    let pool = get_db_pool().await;
    let config = SchedulerConfig::from_env();

    let http_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .expect("Failed to build HTTP client");

    let api_base_url = get_api_url().unwrap_or_else(|e| panic!("Invalid API address: {}", e));
    tracing::info!("API server URL: {}", api_base_url);

    let api = Arc::new(AuthenticatedClient::new(
        http_client,
        &api_base_url,
        std::env::var("CRON_USERNAME").unwrap_or_default(),
        std::env::var("CRON_PASSWORD").unwrap_or_default(),
    ));
    if let Err(e) = api.authenticate().await {
        tracing::warn!("Initial login failed, will retry on first request: {}", e);
    }

    let mut scheduler = Scheduler::new(pool, api, config.clone());
    let email = EmailConfig::from_env();
    if email.can_send() {
        match SmtpNotifier::new(email) {
            Ok(notifier) => scheduler = scheduler.with_notifier(Arc::new(notifier)),
            Err(e) => tracing::error!("E-mail notifications disabled: {}", e),
        }
    } else {
        tracing::info!("E-mail notifications disabled");
    }

    tracing::info!(
        "Cron scheduler started: enabled={}, daily at {} UTC (next {}), polling every {:?}, trigger file {}",
        config.enabled,
        config.schedule_time(),
        next_run_after(Utc::now(), config.time),
        config.poll_interval,
        config.trigger_file.display()
    );

    // Cron polling loop
    let mut last_tick = Utc::now();
    loop {
        tokio::time::sleep(config.poll_interval).await;
        let now = Utc::now();
        tracing::debug!("Starting cron poll cycle");

        if let Err(e) = scheduler.tick(last_tick, now).await {
            tracing::error!("Error during poll cycle: {}", e);
        }
        last_tick = now;
    }
}
