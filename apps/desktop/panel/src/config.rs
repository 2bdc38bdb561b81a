//! Where the panel keeps its files, and loading its messaging settings.

use crate::error::PanelError;

use ipc_core::MessagingConfig;

use common::ErrorLocation;

use std::env;
use std::fmt::{Display, Formatter, Result as FormatResult};
use std::panic::Location;
use std::path::{Path, PathBuf};

use log::{debug, error, info, warn};

/// Overrides the config directory.
pub const CONFIG_DIR_ENV_VAR: &str = "PANEL_CONFIG_DIR";

const APP_DIR_NAME: &str = "control-panel";
const LOG_DIR_NAME: &str = "logs";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathSource {
    EnvVar,
    PlatformDefault,
}

impl Display for PathSource {
    fn fmt(&self, f: &mut Formatter<'_>) -> FormatResult {
        match self {
            PathSource::EnvVar => write!(f, "environment variable"),
            PathSource::PlatformDefault => write!(f, "platform default"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PanelPaths {
    pub config_dir: PathBuf,
    pub log_dir: PathBuf,
    pub source: PathSource,
}

/// Detect the panel's directories.
///
/// `PANEL_CONFIG_DIR` wins; otherwise `<platform config dir>/control-panel`.
///
/// # Errors
///
/// [`PanelError::Config`] if neither is available.
#[track_caller]
pub fn detect_paths() -> Result<PanelPaths, PanelError> {
    if let Ok(custom_dir) = env::var(CONFIG_DIR_ENV_VAR)
        && !custom_dir.trim().is_empty()
    {
        let config_dir = PathBuf::from(custom_dir.trim());
        info!("Using {CONFIG_DIR_ENV_VAR} override: {}", config_dir.display());
        return Ok(paths_in(config_dir, PathSource::EnvVar));
    }

    match dirs::config_dir() {
        Some(base) => {
            let config_dir = base.join(APP_DIR_NAME);
            debug!("Platform config dir: {}", config_dir.display());
            Ok(paths_in(config_dir, PathSource::PlatformDefault))
        }
        None => Err(PanelError::Config {
            message: format!("No config directory: set {CONFIG_DIR_ENV_VAR}"),
            location: ErrorLocation::from(Location::caller()),
        }),
    }
}

fn paths_in(config_dir: PathBuf, source: PathSource) -> PanelPaths {
    let log_dir = config_dir.join(LOG_DIR_NAME);
    PanelPaths {
        config_dir,
        log_dir,
        source,
    }
}

/// Load `.env` from the working directory, if there is one.
pub fn load_dotenv() -> Option<PathBuf> {
    match dotenvy::dotenv() {
        Ok(path) => Some(path),
        Err(e) if e.not_found() => None,
        Err(e) => {
            warn!("Failed to parse .env: {e}");
            None
        }
    }
}

/// Load messaging settings from `config_dir`, defaults when absent.
#[track_caller]
pub fn load_messaging_config(config_dir: &Path) -> Result<MessagingConfig, PanelError> {
    MessagingConfig::load(config_dir).map_err(|e| {
        error!("Failed to load messaging config: {e}");
        PanelError::Config {
            message: e.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    })
}
