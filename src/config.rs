//! Configuration types.

use std::time::Duration;

use crate::error::ConfigError;

/// Default backend location (the inference service's dev server).
pub const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:5000";

/// Quiet interval before a typed query is sent for suggestions.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

/// Queries shorter than this never reach the backend.
pub const DEFAULT_MIN_QUERY_LEN: usize = 2;

/// Intake engine configuration.
#[derive(Debug, Clone)]
pub struct IntakeConfig {
    /// Base URL of the inference backend, without trailing slash.
    pub backend_url: String,
    /// Debounce interval for symptom suggestion lookups.
    pub debounce: Duration,
    /// Minimum normalized query length before suggestions are looked up.
    pub min_query_len: usize,
    /// Upper bound on answered follow-up questions per loop. `None` lets the
    /// backend decide when the loop is complete.
    pub max_followup_rounds: Option<u32>,
    /// Advance past the sex step as soon as a choice is made.
    pub auto_advance_on_gender: bool,
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            debounce: DEFAULT_DEBOUNCE,
            min_query_len: DEFAULT_MIN_QUERY_LEN,
            max_followup_rounds: None,
            auto_advance_on_gender: true,
        }
    }
}

impl IntakeConfig {
    /// Build config from environment variables.
    ///
    /// Unset or unparseable numeric values fall back to their defaults. The
    /// backend URL must be an http(s) URL.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let backend_url = lookup("INTAKE_BACKEND_URL")
            .map(|s| s.trim().trim_end_matches('/').to_string())
            .unwrap_or(defaults.backend_url);

        if backend_url.is_empty() {
            return Err(ConfigError::MissingRequired {
                key: "INTAKE_BACKEND_URL".to_string(),
                hint: "Set it to the inference backend, e.g. http://127.0.0.1:5000".to_string(),
            });
        }
        if !(backend_url.starts_with("http://") || backend_url.starts_with("https://")) {
            return Err(ConfigError::InvalidValue {
                key: "INTAKE_BACKEND_URL".to_string(),
                message: format!("expected an http(s) URL, got '{backend_url}'"),
            });
        }

        let debounce = lookup("INTAKE_DEBOUNCE_MS")
            .and_then(|s| s.trim().parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or(defaults.debounce);

        let min_query_len = lookup("INTAKE_MIN_QUERY_LEN")
            .and_then(|s| s.trim().parse::<usize>().ok())
            .filter(|n| *n > 0)
            .unwrap_or(defaults.min_query_len);

        let max_followup_rounds = lookup("INTAKE_MAX_FOLLOWUP_ROUNDS")
            .and_then(|s| s.trim().parse::<u32>().ok())
            .filter(|n| *n > 0);

        let auto_advance_on_gender = lookup("INTAKE_AUTO_ADVANCE_ON_SEX")
            .map(|s| !matches!(s.trim().to_lowercase().as_str(), "0" | "false" | "no" | "off"))
            .unwrap_or(defaults.auto_advance_on_gender);

        Ok(Self {
            backend_url,
            debounce,
            min_query_len,
            max_followup_rounds,
            auto_advance_on_gender,
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
    fn defaults_when_nothing_set() {
        let config = IntakeConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config.backend_url, DEFAULT_BACKEND_URL);
        assert_eq!(config.debounce, Duration::from_millis(300));
        assert_eq!(config.min_query_len, 2);
        assert!(config.max_followup_rounds.is_none());
        assert!(config.auto_advance_on_gender);
    }

    #[test]
    fn reads_overrides() {
        let config = IntakeConfig::from_lookup(lookup_from(&[
            ("INTAKE_BACKEND_URL", "https://triage.example.org/"),
            ("INTAKE_DEBOUNCE_MS", "50"),
            ("INTAKE_MAX_FOLLOWUP_ROUNDS", "5"),
            ("INTAKE_AUTO_ADVANCE_ON_SEX", "false"),
        ]))
        .unwrap();
        assert_eq!(config.backend_url, "https://triage.example.org");
        assert_eq!(config.debounce, Duration::from_millis(50));
        assert_eq!(config.max_followup_rounds, Some(5));
        assert!(!config.auto_advance_on_gender);
    }

    #[test]
    fn bad_numbers_fall_back() {
        let config = IntakeConfig::from_lookup(lookup_from(&[
            ("INTAKE_DEBOUNCE_MS", "soon"),
            ("INTAKE_MIN_QUERY_LEN", "0"),
            ("INTAKE_MAX_FOLLOWUP_ROUNDS", "-3"),
        ]))
        .unwrap();
        assert_eq!(config.debounce, DEFAULT_DEBOUNCE);
        assert_eq!(config.min_query_len, DEFAULT_MIN_QUERY_LEN);
        assert!(config.max_followup_rounds.is_none());
    }

    #[test]
    fn rejects_non_http_backend() {
        let err = IntakeConfig::from_lookup(lookup_from(&[("INTAKE_BACKEND_URL", "ftp://x")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));

        let err = IntakeConfig::from_lookup(lookup_from(&[("INTAKE_BACKEND_URL", "  ")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::MissingRequired { .. }));
    }
}
