use std::sync::Arc;

use core_hunt::{get_db_pool, scraper::HttpJobBoard, setup_logging};
use tokio::sync::Semaphore;
use worker_hunt::{Error, WorkerConfig, handle_run, next_run_in_queue};

#[tokio::main]
async fn main() {
    // Load environment variables from .env file, if it exists
    dotenvy::dotenv().ok();

    setup_logging("worker_hunt=debug,core_hunt=debug");

    let config = Arc::new(WorkerConfig::from_env());
    let board = Arc::new(HttpJobBoard::from_env());
    let pool = get_db_pool().await;
    let semaphore = Arc::new(Semaphore::new(config.max_concurrency));

    tracing::info!(
        "Worker started: max {} concurrent runs, polling every {:?}",
        config.max_concurrency,
        config.poll_interval
    );

    // Worker polling loop
    loop {
        match next_run_in_queue(&pool, semaphore.clone()).await {
            Ok((run, permit)) => {
                tokio::spawn({
                    let pool = pool.clone();
                    let board = board.clone();
                    let config = config.clone();
                    async move {
                        tracing::info!(
                            "Received run {} ({:?}) for {} companies",
                            run.id,
                            run.run_type,
                            run.companies_scraped.len()
                        );
                        if let Err(error) = handle_run(&pool, board.as_ref(), &run, &config).await {
                            tracing::error!("[SKIP] Failed to record outcome of run {}: {}", run.id, error);
                        }
                        drop(permit);
                    }
                });
            }
            Err(error) => match error {
                Error::RecordNotFound => {}
                _ => {
                    tracing::error!("[SKIP] Error getting next run from DB queue: {}", error);
                }
            },
        }
        tracing::debug!("Waiting to poll for next run");
        tokio::time::sleep(config.poll_interval).await;
    }
}
