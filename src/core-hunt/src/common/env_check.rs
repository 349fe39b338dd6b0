/// Ensures that the listed environment variables exist and are non-empty.
/// Panics on error.
pub fn check_non_empty_env_vars(required_vars: &[&str]) {
    let missing = missing_env_vars(required_vars);
    for var_name in &missing {
        if *var_name == "SESSION_SECRET" {
            eprintln!("Generate a secret with: openssl rand -base64 32");
        }
        eprintln!("FATAL: {} environment variable is required and must be non-empty.", var_name);
    }
    if !missing.is_empty() {
        panic!("{} environment variables failed checks.", missing.len());
    }
}

/// The subset of `required_vars` that is unset or blank.
pub fn missing_env_vars<'a>(required_vars: &[&'a str]) -> Vec<&'a str> {
    required_vars
        .iter()
        .copied()
        .filter(|name| std::env::var(name).map(|v| v.trim().is_empty()).unwrap_or(true))
        .collect()
}
