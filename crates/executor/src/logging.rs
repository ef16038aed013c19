//! Tracing subscriber setup.
//!
//! Library code only emits `tracing` events; installing a subscriber is left
//! to the embedding process, which may call [`init_logging`] once at start.

use tracing_subscriber::EnvFilter;

use crate::{Error, LogConfig, Result};

/// Map a configured level to a filter directive, falling back to `info`.
fn level_directive(level: &str) -> &'static str {
    match level.trim().to_ascii_lowercase().as_str() {
        "trace" => "trace",
        "debug" => "debug",
        "info" => "info",
        "warn" => "warn",
        "error" => "error",
        "off" => "off",
        _ => "info",
    }
}

/// Install a fmt subscriber filtered by `RUST_LOG`, or by the configured
/// level when `RUST_LOG` is unset.
///
/// Returns `Ok(false)` when a global subscriber was already installed.
pub fn init_logging(config: &LogConfig) -> Result<bool> {
    let directive = level_directive(&config.level);
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(directive))
        .map_err(|e| Error::Config {
            reason: format!("invalid log filter '{}': {}", directive, e),
        })?;
    Ok(tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_directive() {
        assert_eq!(level_directive("DEBUG"), "debug");
        assert_eq!(level_directive(" warn "), "warn");
        assert_eq!(level_directive("loud"), "info");
    }

    #[test]
    fn test_init_is_idempotent() {
        let config = LogConfig::default();
        init_logging(&config).unwrap();
        assert!(!init_logging(&config).unwrap());
    }
}
