use std::path::PathBuf;
use std::time::Duration;

use serde::{
    Deserialize,
    Serialize,
};
use thiserror::Error;

use crate::types::Locale;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Configuration error in '{field_path}': {message}")]
pub struct ValidationError {
    /// JSON path to the field (e.g., "backfill.maxConcurrent")
    pub field_path: String,
    pub message: String,
}

impl ValidationError {
    #[must_use]
    pub fn new(field_path: impl Into<String>, message: impl Into<String>) -> Self {
        Self { field_path: field_path.into(), message: message.into() }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration validation failed:\n{}", format_validation_errors(.0))]
    ValidationErrors(Vec<ValidationError>),

    #[error("Failed to load configuration file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] serde_json::Error),
}

/// Renders one numbered line per validation error.
fn format_validation_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .enumerate()
        .map(|(i, err)| format!("  {}. {} - {}", i + 1, err.field_path, err.message))
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SyncSettings {
    /// Source-of-truth language, fixed for the process lifetime.
    pub baseline_locale: Locale,

    /// JSON file with the baseline texts, relative to the workspace root.
    pub baseline_file: PathBuf,

    /// Directory of the JSON file store, relative to the workspace root.
    pub store_dir: PathBuf,

    /// Separator used to flatten nested baseline objects.
    pub key_separator: String,

    pub backfill: BackfillConfig,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BackfillConfig {
    /// Translation requests allowed in flight at once.
    /// Default: 80% of CPU cores (minimum 1).
    pub max_concurrent: Option<usize>,

    /// Per-request timeout for the translation service.
    pub timeout_ms: u64,

    /// Skip scheduling a backfill for a pair that already has one in flight.
    pub dedupe: bool,
}

impl Default for BackfillConfig {
    fn default() -> Self {
        Self { max_concurrent: None, timeout_ms: 10_000, dedupe: true }
    }
}

impl BackfillConfig {
    /// Resolved concurrency limit.
    #[must_use]
    pub fn concurrency(&self) -> usize {
        self.max_concurrent.unwrap_or_else(|| (num_cpus::get() * 4 / 5).max(1))
    }

    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl SyncSettings {
    /// # Errors
    /// - Required field is empty
    /// - Zero concurrency or timeout
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if self.baseline_locale.code.trim().is_empty() {
            errors.push(ValidationError::new(
                "baselineLocale.code",
                "The locale code cannot be empty. Example: \"en\"",
            ));
        }

        if self.baseline_file.as_os_str().is_empty() {
            errors.push(ValidationError::new(
                "baselineFile",
                "The baseline file path cannot be empty. Example: \"locales/en.json\"",
            ));
        }

        if self.key_separator.is_empty() {
            errors.push(ValidationError::new(
                "keySeparator",
                "The separator cannot be empty. Please specify a separator, for example: \".\" (dot)",
            ));
        }

        if self.backfill.max_concurrent == Some(0) {
            errors.push(ValidationError::new(
                "backfill.maxConcurrent",
                "At least one concurrent request is required. Remove the field to use the default",
            ));
        }

        if self.backfill.timeout_ms == 0 {
            errors.push(ValidationError::new(
                "backfill.timeoutMs",
                "The timeout must be greater than zero",
            ));
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            baseline_locale: Locale::new("en", "English"),
            baseline_file: PathBuf::from("locales/en.json"),
            store_dir: PathBuf::from(".locale-sync/store"),
            key_separator: ".".to_string(),
            backfill: BackfillConfig::default(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::expect_used, clippy::panic)]
mod tests {
    use googletest::prelude::*;
    use rstest::*;

    use super::*;

    #[rstest]
    fn validate_valid_settings() {
        let settings = SyncSettings::default();

        assert_that!(settings.validate(), ok(anything()));
    }

    #[rstest]
    fn deserialize_partial_settings() {
        let json = r#"{"baselineLocale": {"code": "ja", "displayName": "日本語"}, "backfill": {"dedupe": false}}"#;

        let settings: SyncSettings = serde_json::from_str(json).unwrap();

        assert_that!(settings.baseline_locale.code, eq("ja"));
        assert_that!(settings.baseline_locale.display_name, eq("日本語"));
        assert_that!(settings.backfill.dedupe, eq(false));
        assert_that!(settings.backfill.timeout_ms, eq(10_000));
        assert_that!(settings.key_separator, eq("."));
    }

    #[rstest]
    fn deserialize_empty_settings() {
        let settings: SyncSettings = serde_json::from_str("{}").unwrap();

        assert_that!(settings.baseline_locale.code, eq("en"));
        assert_eq!(settings.baseline_file, PathBuf::from("locales/en.json"));
        assert_that!(settings.backfill.max_concurrent, none());
        assert_that!(settings.backfill.dedupe, eq(true));
    }

    #[rstest]
    #[case::default_is_positive(None)]
    #[case::explicit(Some(3))]
    fn concurrency_is_at_least_one(#[case] max_concurrent: Option<usize>) {
        let config = BackfillConfig { max_concurrent, ..BackfillConfig::default() };

        assert_that!(config.concurrency(), ge(1));
        if let Some(n) = max_concurrent {
            assert_that!(config.concurrency(), eq(n));
        }
    }

    #[rstest]
    fn validate_collects_all_errors() {
        let mut settings = SyncSettings::default();
        settings.baseline_locale.code = " ".to_string();
        settings.key_separator = String::new();
        settings.backfill.max_concurrent = Some(0);
        settings.backfill.timeout_ms = 0;

        let errors = settings.validate().unwrap_err();

        let paths: Vec<&str> = errors.iter().map(|e| e.field_path.as_str()).collect();
        assert_that!(
            paths,
            unordered_elements_are![
                eq(&"baselineLocale.code"),
                eq(&"keySeparator"),
                eq(&"backfill.maxConcurrent"),
                eq(&"backfill.timeoutMs")
            ]
        );
    }

    #[rstest]
    fn config_error_lists_validation_errors() {
        let error = ConfigError::ValidationErrors(vec![
            ValidationError::new("keySeparator", "empty"),
            ValidationError::new("backfill.timeoutMs", "zero"),
        ]);

        let message = error.to_string();

        assert_that!(message, contains_substring("1. keySeparator - empty"));
        assert_that!(message, contains_substring("2. backfill.timeoutMs - zero"));
    }
}
