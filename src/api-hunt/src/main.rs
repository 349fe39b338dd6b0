use core_hunt::review_config::ReviewConfig;
use core_hunt::schedule::SchedulerConfig;
use core_hunt::{check_non_empty_env_vars, get_api_base_url, get_auth_config, get_db_pool, get_tls_config, setup_logging};

use api_hunt::routes::{AppState, router};

#[tokio::main]
async fn main() {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    setup_logging("api_hunt=debug,tower_http=debug");
    check_non_empty_env_vars(&["DATABASE_URL", "SESSION_SECRET"]);

    let state = AppState::new(
        get_db_pool().await,
        get_auth_config(),
        ReviewConfig::from_env(),
        SchedulerConfig::from_env(),
    );
    let app = router(state);

    let addr = get_api_base_url().expect("Invalid HOST or PORT");

    match get_tls_config().await {
        Some(tls_config) => {
            tracing::info!("Serving HTTPS on {}", addr);
            axum_server::bind_rustls(addr, tls_config)
                .serve(app.into_make_service())
                .await
                .expect("HTTPS server failed");
        }
        None => {
            tracing::info!("Serving HTTP on {}", addr);
            let listener = tokio::net::TcpListener::bind(addr)
                .await
                .unwrap_or_else(|e| panic!("Failed to bind to address {}: {}", addr, e));
            axum::serve(listener, app).await.expect("HTTP server failed");
        }
    }
}
