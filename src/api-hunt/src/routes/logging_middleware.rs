use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;

/// Logs each route access with its status: info for success and redirects,
/// warn for client errors, error for server errors.
pub async fn log_route_access(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    let response = next.run(request).await;

    let duration_ms = start.elapsed().as_millis();
    let status = response.status().as_u16();

    match status {
        400..=499 => tracing::warn!(%method, %path, status, duration_ms, "request rejected"),
        500..=599 => tracing::error!(%method, %path, status, duration_ms, "request failed"),
        _ => tracing::info!(%method, %path, status, duration_ms, "request served"),
    }

    response
}
