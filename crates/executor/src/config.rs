//! Bridge configuration via `bridge.toml`
//!
//! Every field has a default, so an empty file (or none at all) is a valid
//! configuration. Values are validated when a file is loaded.

use std::path::Path;
use std::time::Duration;

use bridge_session::SessionOptions;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Config file name.
pub const CONFIG_FILE_NAME: &str = "bridge.toml";

/// Logging section of `bridge.toml`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogConfig {
    /// Tracing level filter used when `RUST_LOG` is not set
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Bridge configuration loaded from `bridge.toml`.
///
/// # Example
///
/// ```toml
/// url = "ws://127.0.0.1:8080/waapi"
/// call_timeout_ms = 1000
/// transaction_label = "Automation Plan"
///
/// [log]
/// level = "debug"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BridgeConfig {
    /// Endpoint of the authoring session.
    #[serde(default = "default_url")]
    pub url: String,
    /// Per-call timeout in milliseconds.
    #[serde(default = "default_call_timeout_ms")]
    pub call_timeout_ms: u64,
    /// Undo-history label of committed plans.
    #[serde(default = "default_transaction_label")]
    pub transaction_label: String,
    /// Game object used by runtime commands that name none.
    #[serde(default = "default_game_object")]
    pub default_game_object: String,
    /// Engine id of the default listener.
    #[serde(default = "default_listener_id")]
    pub listener_id: u64,
    /// Sample spacing of RTPC ramps, in milliseconds.
    #[serde(default = "default_rtpc_step_ms")]
    pub rtpc_step_ms: u64,
    /// Sample spacing of position ramps, in milliseconds.
    #[serde(default = "default_position_step_ms")]
    pub position_step_ms: u64,
    /// Logging.
    #[serde(default)]
    pub log: LogConfig,
}

fn default_url() -> String {
    "ws://127.0.0.1:8080/waapi".to_string()
}

fn default_call_timeout_ms() -> u64 {
    1000
}

fn default_transaction_label() -> String {
    "Automation Plan".to_string()
}

fn default_game_object() -> String {
    "Global".to_string()
}

fn default_listener_id() -> u64 {
    1
}

fn default_rtpc_step_ms() -> u64 {
    50
}

fn default_position_step_ms() -> u64 {
    100
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            call_timeout_ms: default_call_timeout_ms(),
            transaction_label: default_transaction_label(),
            default_game_object: default_game_object(),
            listener_id: default_listener_id(),
            rtpc_step_ms: default_rtpc_step_ms(),
            position_step_ms: default_position_step_ms(),
            log: LogConfig::default(),
        }
    }
}

impl BridgeConfig {
    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// Returns `Config` on a zero timeout or step, or an empty label.
    pub fn validate(&self) -> Result<()> {
        let fail = |reason: &str| {
            Err(Error::Config {
                reason: reason.to_string(),
            })
        };
        if self.call_timeout_ms == 0 {
            return fail("call_timeout_ms must be greater than 0");
        }
        if self.rtpc_step_ms == 0 || self.position_step_ms == 0 {
            return fail("ramp step sizes must be greater than 0");
        }
        if self.transaction_label.trim().is_empty() {
            return fail("transaction_label must not be empty");
        }
        if self.default_game_object.trim().is_empty() {
            return fail("default_game_object must not be empty");
        }
        Ok(())
    }

    /// Connection parameters handed to the connector.
    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            url: self.url.clone(),
            call_timeout: Duration::from_millis(self.call_timeout_ms),
        }
    }

    /// Spacing of RTPC ramp samples.
    pub fn rtpc_step(&self) -> Duration {
        Duration::from_millis(self.rtpc_step_ms)
    }

    /// Spacing of position ramp samples.
    pub fn position_step(&self) -> Duration {
        Duration::from_millis(self.position_step_ms)
    }

    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# Authoring bridge configuration
#
# Endpoint of the authoring session
url = "ws://127.0.0.1:8080/waapi"

# Per-call timeout in milliseconds. A command whose call times out fails,
# and a mutating plan is rolled back.
call_timeout_ms = 1000

# Undo-history label of every committed plan
transaction_label = "Automation Plan"

# Runtime commands without a game object use this one
default_game_object = "Global"

# Engine id of the default listener
listener_id = 1

# Sample spacing of RTPC and position ramps, in milliseconds
rtpc_step_ms = 50
position_step_ms = 100

[log]
# Overridden by RUST_LOG when set
level = "info"
"#
    }

    /// Read and parse config from a file path.
    ///
    /// # Errors
    ///
    /// Returns `Config` if the file cannot be read, parsed or validated.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::Config {
            reason: format!("Failed to read config file '{}': {}", path.display(), e),
        })?;
        let config: BridgeConfig = toml::from_str(&content).map_err(|e| Error::Config {
            reason: format!("Failed to parse config file '{}': {}", path.display(), e),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Write the default config file if it does not already exist.
    ///
    /// Returns `Ok(())` whether the file was created or already existed.
    pub fn write_default_if_missing(path: &Path) -> Result<()> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml()).map_err(|e| Error::Config {
                reason: format!(
                    "Failed to write default config file '{}': {}",
                    path.display(),
                    e
                ),
            })?;
        }
        Ok(())
    }

    /// Serialize this config to TOML and write it to the given path.
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).map_err(|e| Error::Config {
            reason: format!("Failed to serialize config: {}", e),
        })?;
        std::fs::write(path, content).map_err(|e| Error::Config {
            reason: format!("Failed to write config file '{}': {}", path.display(), e),
        })
    }
}
