// Unit tests for MessagingConfig load/save/validate

use crate::config::{CONFIG_FILE_NAME, MessagingConfig};
use crate::error::ConfigError;

use tempfile::TempDir;

#[test]
fn given_missing_file_when_loading_then_returns_defaults() {
    let dir = TempDir::new().expect("temp dir");

    let config = MessagingConfig::load(dir.path()).expect("missing file is not an error");

    assert_eq!(config, MessagingConfig::default());
    assert_eq!(config.calls.slow_sync_call_ms, 16);
    assert_eq!(config.batch.max_requests, 256);
}

/// **VALUE**: Verifies a saved config loads back unchanged and leaves no temp file.
///
/// **WHY THIS MATTERS**: Save goes through a temp file and a rename. A leftover temp file
/// or a partially written target would mean the atomic-write path is broken.
///
/// **BUG THIS CATCHES**: Would catch the rename being skipped or pointed at the wrong path.
#[test]
fn given_custom_config_when_saving_and_loading_then_values_survive() {
    // GIVEN: A config with non-default values
    let dir = TempDir::new().expect("temp dir");
    let mut config = MessagingConfig::default();
    config.calls.slow_sync_call_ms = 40;
    config.batch.max_requests = 8;

    // WHEN: Saving and loading
    config.save(dir.path()).expect("save");
    let loaded = MessagingConfig::load(dir.path()).expect("load");

    // THEN: Same values, only the final file on disk
    assert_eq!(loaded, config);
    assert!(dir.path().join(CONFIG_FILE_NAME).exists());
    assert!(!dir.path().join(format!("{CONFIG_FILE_NAME}.tmp")).exists());
}

#[test]
fn given_partial_file_when_loading_then_fills_missing_sections_with_defaults() {
    let dir = TempDir::new().expect("temp dir");
    std::fs::write(
        dir.path().join(CONFIG_FILE_NAME),
        r#"{"batch": {"max_requests": 3}}"#,
    )
    .expect("write");

    let config = MessagingConfig::load(dir.path()).expect("load");

    assert_eq!(config.batch.max_requests, 3);
    assert_eq!(config.calls.slow_sync_call_ms, 16);
    assert_eq!(config.version, 1);
}

/// **VALUE**: Verifies a corrupt file is reported instead of silently replaced by defaults.
///
/// **BUG THIS CATCHES**: Would catch parse errors being swallowed, which hides a user's
/// broken config and makes later saves overwrite it.
#[test]
fn given_corrupt_file_when_loading_then_returns_parse_error() {
    let dir = TempDir::new().expect("temp dir");
    std::fs::write(dir.path().join(CONFIG_FILE_NAME), "{ not json").expect("write");

    let result = MessagingConfig::load(dir.path());

    assert!(matches!(result, Err(ConfigError::Parse { .. })));
}

#[test]
fn given_out_of_range_values_when_validating_then_returns_validation_error() {
    let mut zero_batch = MessagingConfig::default();
    zero_batch.batch.max_requests = 0;
    assert!(matches!(
        zero_batch.validate(),
        Err(ConfigError::Validation { .. })
    ));

    let mut future_version = MessagingConfig::default();
    future_version.version = 99;
    assert!(matches!(
        future_version.validate(),
        Err(ConfigError::Validation { .. })
    ));

    let mut zero_threshold = MessagingConfig::default();
    zero_threshold.calls.slow_sync_call_ms = 0;
    let dir = TempDir::new().expect("temp dir");
    assert!(
        zero_threshold.save(dir.path()).is_err(),
        "Save validates before writing"
    );
    assert!(!dir.path().join(CONFIG_FILE_NAME).exists());
}
