use axum_server::tls_rustls::RustlsConfig;
use std::env;
use std::path::PathBuf;

use super::auth_config::is_flag_set;

/// TLS settings for the API server when ENABLE_TLS is set, otherwise `None`.
/// Panics if TLS is enabled but TLS_CERT_PATH / TLS_KEY_PATH are missing or unreadable.
pub async fn get_tls_config() -> Option<RustlsConfig> {
    if !is_flag_set("ENABLE_TLS") {
        return None;
    }

    let cert_path = required_path("TLS_CERT_PATH");
    let key_path = required_path("TLS_KEY_PATH");

    // Both aws-lc-rs and ring may be linked; pick one explicitly.
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

    let config = RustlsConfig::from_pem_file(cert_path, key_path)
        .await
        .expect("Failed to load TLS certificate and key");
    Some(config)
}

fn required_path(var_name: &str) -> PathBuf {
    let path = env::var(var_name).map(PathBuf::from).unwrap_or_else(|_| {
        panic!(
            "{} environment variable is required when ENABLE_TLS=true. \
             Generate certificates with: cargo run --bin generate-tls-cert",
            var_name
        )
    });
    if !path.exists() {
        panic!(
            "{} does not exist: {}\n\
             Generate certificates with: cargo run --bin generate-tls-cert",
            var_name,
            path.display()
        );
    }
    path
}
