use crate::error::ConfigError;

use std::path::Path;
use std::time::Duration;

use log::{info, warn};
use serde::{Deserialize, Serialize};

pub const CONFIG_FILE_NAME: &str = "messaging.json";
const CONFIG_VERSION: u32 = 1;

const MAX_SLOW_SYNC_CALL_MS: u64 = 60_000;
const MAX_BATCH_REQUESTS: usize = 65_536;

// ============================================
// CONFIG STRUCTS
// ============================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallConfig {
    /// A synchronous call that blocks longer than this is logged as a warning.
    #[serde(default = "default_slow_sync_call_ms")]
    pub slow_sync_call_ms: u64,
}

impl Default for CallConfig {
    fn default() -> Self {
        Self {
            slow_sync_call_ms: default_slow_sync_call_ms(),
        }
    }
}

impl CallConfig {
    pub fn slow_sync_call(&self) -> Duration {
        Duration::from_millis(self.slow_sync_call_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchConfig {
    #[serde(default = "default_max_requests")]
    pub max_requests: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_requests: default_max_requests(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessagingConfig {
    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default)]
    pub calls: CallConfig,

    #[serde(default)]
    pub batch: BatchConfig,
}

impl Default for MessagingConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            calls: CallConfig::default(),
            batch: BatchConfig::default(),
        }
    }
}

// ============================================
// DEFAULT FUNCTIONS
// ============================================

fn default_version() -> u32 {
    CONFIG_VERSION
}
fn default_slow_sync_call_ms() -> u64 {
    16
}
fn default_max_requests() -> usize {
    256
}

// ============================================
// IMPLEMENTATION
// ============================================

impl MessagingConfig {
    /// Load config from `{config_dir}/messaging.json`.
    ///
    /// # Returns
    ///
    /// Defaults if the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file exists but cannot be read, parsed or validated.
    pub fn load(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join(CONFIG_FILE_NAME);

        if !config_path.exists() {
            info!(
                "Messaging config not found at {}, using defaults",
                config_path.display()
            );
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path).map_err(|e| {
            warn!("Failed to read messaging config: {e}");
            ConfigError::read(&config_path, e)
        })?;

        let config: MessagingConfig = serde_json::from_str(&contents).map_err(|e| {
            warn!("Failed to parse messaging config: {e}");
            ConfigError::parse(&config_path, e.to_string())
        })?;

        config.validate()?;

        info!("Messaging config loaded from {}", config_path.display());
        Ok(config)
    }

    /// Save config to `{config_dir}/messaging.json`.
    ///
    /// Writes a temp file and renames it over the target.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        self.validate()?;

        std::fs::create_dir_all(config_dir).map_err(|e| ConfigError::write(config_dir, e))?;

        let config_path = config_dir.join(CONFIG_FILE_NAME);
        let temp_path = config_dir.join(format!("{CONFIG_FILE_NAME}.tmp"));

        let json = serde_json::to_string_pretty(self).map_err(|e| ConfigError::serialize(e.to_string()))?;

        std::fs::write(&temp_path, json).map_err(|e| ConfigError::write(&temp_path, e))?;
        std::fs::rename(&temp_path, &config_path)
            .map_err(|e| ConfigError::write(&config_path, e))?;

        info!("Messaging config saved to {}", config_path.display());
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] if any value is out of range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version == 0 || self.version > CONFIG_VERSION {
            return Err(ConfigError::validation(format!(
                "Invalid version: {} (expected 1-{CONFIG_VERSION})",
                self.version
            )));
        }

        if self.calls.slow_sync_call_ms == 0 || self.calls.slow_sync_call_ms > MAX_SLOW_SYNC_CALL_MS
        {
            return Err(ConfigError::validation(format!(
                "Invalid slow_sync_call_ms: {} (must be 1-{MAX_SLOW_SYNC_CALL_MS})",
                self.calls.slow_sync_call_ms
            )));
        }

        if self.batch.max_requests == 0 || self.batch.max_requests > MAX_BATCH_REQUESTS {
            return Err(ConfigError::validation(format!(
                "Invalid batch max_requests: {} (must be 1-{MAX_BATCH_REQUESTS})",
                self.batch.max_requests
            )));
        }

        Ok(())
    }
}
