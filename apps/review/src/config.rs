use std::time::Duration;

use anyhow::{ensure, Context, Result};

use crate::gateway::http::MAX_ATTEMPTS;

/// Client configuration loaded from environment variables.
/// Only the gateway and logging read it; the session core is unconfigured.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: String,
    /// Fixed employee id. When set the identity endpoint is never called.
    pub employee_id: Option<String>,
    pub http_timeout: Duration,
    pub max_retries: u32,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let api_url = lookup("REVIEW_API_URL")
            .context("Required environment variable 'REVIEW_API_URL' is not set")?;

        let max_retries = lookup("REVIEW_MAX_RETRIES")
            .unwrap_or_else(|| "3".to_string())
            .parse::<u32>()
            .context("REVIEW_MAX_RETRIES must be a non-negative integer")?;
        ensure!(
            max_retries <= MAX_ATTEMPTS,
            "REVIEW_MAX_RETRIES must be at most {MAX_ATTEMPTS}, got {max_retries}"
        );

        Ok(Config {
            api_url: api_url.trim_end_matches('/').to_string(),
            employee_id: lookup("REVIEW_EMPLOYEE_ID").filter(|v| !v.trim().is_empty()),
            http_timeout: Duration::from_secs(
                lookup("REVIEW_HTTP_TIMEOUT_SECS")
                    .unwrap_or_else(|| "30".to_string())
                    .parse::<u64>()
                    .context("REVIEW_HTTP_TIMEOUT_SECS must be a whole number of seconds")?,
            ),
            max_retries,
            rust_log: lookup("RUST_LOG").unwrap_or_else(|| "info".to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_applied() {
        let config = Config::from_lookup(lookup_from(&[("REVIEW_API_URL", "http://localhost:5000/")]))
            .unwrap();
        assert_eq!(config.api_url, "http://localhost:5000");
        assert_eq!(config.employee_id, None);
        assert_eq!(config.http_timeout, Duration::from_secs(30));
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.rust_log, "info");
    }

    #[test]
    fn test_missing_api_url_is_an_error() {
        let err = Config::from_lookup(lookup_from(&[])).unwrap_err();
        assert!(err.to_string().contains("REVIEW_API_URL"));
    }

    #[test]
    fn test_blank_employee_id_is_ignored() {
        let config = Config::from_lookup(lookup_from(&[
            ("REVIEW_API_URL", "http://api"),
            ("REVIEW_EMPLOYEE_ID", "  "),
        ]))
        .unwrap();
        assert_eq!(config.employee_id, None);
    }

    #[test]
    fn test_bad_retry_count_names_the_variable() {
        let err = Config::from_lookup(lookup_from(&[
            ("REVIEW_API_URL", "http://api"),
            ("REVIEW_MAX_RETRIES", "many"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("REVIEW_MAX_RETRIES"));
    }

    #[test]
    fn test_retry_count_is_bounded() {
        let err = Config::from_lookup(lookup_from(&[
            ("REVIEW_API_URL", "http://api"),
            ("REVIEW_MAX_RETRIES", "20"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("REVIEW_MAX_RETRIES"));

        let config = Config::from_lookup(lookup_from(&[
            ("REVIEW_API_URL", "http://api"),
            ("REVIEW_MAX_RETRIES", "10"),
        ]))
        .unwrap();
        assert_eq!(config.max_retries, MAX_ATTEMPTS);
    }
}
