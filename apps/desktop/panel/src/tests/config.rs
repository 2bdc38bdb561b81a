// Unit tests for panel path detection and messaging config loading

use crate::config::{CONFIG_DIR_ENV_VAR, PathSource, detect_paths, load_messaging_config};
use crate::error::PanelError;

use ipc_core::MessagingConfig;
use ipc_core::config::CONFIG_FILE_NAME;

use std::env;

use serial_test::serial;
use tempfile::TempDir;

/// **VALUE**: Verifies the config directory override wins over the platform default.
///
/// **WHY THIS MATTERS**: Tests and portable installs point the panel at their own
/// directory. Ignoring the override would read and write the user's real settings.
///
/// **BUG THIS CATCHES**: Would catch the platform lookup running before the override.
#[test]
#[serial]
fn given_config_dir_override_when_detecting_paths_then_uses_it() {
    // GIVEN: PANEL_CONFIG_DIR points at a temp dir
    let dir = TempDir::new().unwrap();
    // SAFETY: serialized with every other test touching the environment
    unsafe { env::set_var(CONFIG_DIR_ENV_VAR, dir.path()) };

    // WHEN
    let paths = detect_paths();
    unsafe { env::remove_var(CONFIG_DIR_ENV_VAR) };

    // THEN: Config and log dirs live under the override
    let paths = paths.expect("override always resolves");
    assert_eq!(paths.source, PathSource::EnvVar);
    assert_eq!(paths.config_dir, dir.path());
    assert!(paths.log_dir.starts_with(dir.path()));
}

#[test]
fn given_no_config_file_when_loading_then_defaults() {
    let dir = TempDir::new().unwrap();

    let config = load_messaging_config(dir.path()).unwrap();

    assert_eq!(config, MessagingConfig::default());
}

/// **VALUE**: Verifies a broken config file surfaces as a Config error.
///
/// **WHY THIS MATTERS**: Silently falling back to defaults would hide a typo in a
/// limit the user set on purpose.
///
/// **BUG THIS CATCHES**: Would catch the error being mapped to the wrong variant or
/// swallowed.
#[test]
fn given_invalid_config_file_when_loading_then_returns_config_error() {
    // GIVEN: A config file that is not JSON
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join(CONFIG_FILE_NAME), "max_requests = 3").unwrap();

    // WHEN
    let result = load_messaging_config(dir.path());

    // THEN
    assert!(
        matches!(result, Err(PanelError::Config { .. })),
        "Expected Config error, got {result:?}"
    );
}
