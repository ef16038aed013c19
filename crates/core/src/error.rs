//! Error types for the bridge
//!
//! This module defines the internal error taxonomy shared by the session,
//! index and executor layers. We use `thiserror` for automatic `Display` and
//! `Error` trait implementations.
//!
//! ## Categories
//!
//! | Category | Variants | Treatment |
//! |----------|----------|-----------|
//! | Connectivity | `Connection`, `NotConnected` | fatal to the current plan |
//! | Resolution | `NotFound`, `Resolution` | reported per command, triggers rollback |
//! | Remote | `Remote`, `Timeout` | reported per command, triggers rollback |
//! | Validation | `InvalidInput`, `InvalidProperty` | rejected before dispatch |
//! | Transaction | `TransactionAlreadyActive`, `TransactionNotActive` | session misuse |
//! | System | `Serialization`, `Internal` | bugs or malformed payloads |

use thiserror::Error;

/// Result type alias for bridge operations
pub type BridgeResult<T> = std::result::Result<T, BridgeError>;

/// Internal error type for the bridge
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BridgeError {
    /// The remote session could not be reached
    #[error("connection error: {reason}")]
    Connection {
        /// What went wrong while connecting or communicating
        reason: String,
    },

    /// No session is connected
    #[error("not connected to an authoring session")]
    NotConnected,

    /// A path does not exist in the remote project
    #[error("object not found: {path}")]
    NotFound {
        /// The path that failed to resolve
        path: String,
    },

    /// A path could not be resolved for a reason other than absence
    #[error("cannot resolve '{path}': {reason}")]
    Resolution {
        /// The path being resolved
        path: String,
        /// Why resolution failed
        reason: String,
    },

    /// The remote session rejected a call
    #[error("remote call {method} failed: {reason}")]
    Remote {
        /// Remote method name
        method: String,
        /// Rejection message from the remote session
        reason: String,
    },

    /// A remote call did not answer in time
    #[error("remote call {method} timed out after {timeout_ms}ms")]
    Timeout {
        /// Remote method name
        method: String,
        /// Timeout that elapsed
        timeout_ms: u64,
    },

    /// Command payload failed validation
    #[error("invalid input: {reason}")]
    InvalidInput {
        /// Validation failure description
        reason: String,
    },

    /// A property name or value is not in the known property table
    #[error("invalid property '{property}': {reason}")]
    InvalidProperty {
        /// Property name
        property: String,
        /// Why the property was rejected
        reason: String,
    },

    /// A transaction is already open on this session
    #[error("transaction already active")]
    TransactionAlreadyActive,

    /// No transaction is open on this session
    #[error("no active transaction")]
    TransactionNotActive,

    /// A remote payload could not be decoded
    #[error("serialization error: {reason}")]
    Serialization {
        /// Decoding failure description
        reason: String,
    },

    /// Invariant violation inside the bridge
    #[error("internal error: {reason}")]
    Internal {
        /// Description of the violated invariant
        reason: String,
    },
}

impl BridgeError {
    /// Create an `InvalidInput` error
    pub fn invalid_input(reason: impl Into<String>) -> Self {
        BridgeError::InvalidInput {
            reason: reason.into(),
        }
    }

    /// Create a `NotFound` error
    pub fn not_found(path: impl Into<String>) -> Self {
        BridgeError::NotFound { path: path.into() }
    }

    /// Create a `Remote` error
    pub fn remote(method: impl Into<String>, reason: impl Into<String>) -> Self {
        BridgeError::Remote {
            method: method.into(),
            reason: reason.into(),
        }
    }

    /// Create an `Internal` error
    pub fn internal(reason: impl Into<String>) -> Self {
        BridgeError::Internal {
            reason: reason.into(),
        }
    }

    /// Whether this error means the session itself is unusable.
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            BridgeError::Connection { .. } | BridgeError::NotConnected
        )
    }
}

impl From<serde_json::Error> for BridgeError {
    fn from(e: serde_json::Error) -> Self {
        BridgeError::Serialization {
            reason: e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_not_found() {
        let err = BridgeError::not_found("\\Actor-Mixer Hierarchy\\Missing");
        let msg = err.to_string();
        assert!(msg.contains("object not found"));
        assert!(msg.contains("Missing"));
    }

    #[test]
    fn test_error_display_timeout() {
        let err = BridgeError::Timeout {
            method: "ak.wwise.core.object.create".to_string(),
            timeout_ms: 1000,
        };
        assert_eq!(
            err.to_string(),
            "remote call ak.wwise.core.object.create timed out after 1000ms"
        );
    }

    #[test]
    fn test_connection_classification() {
        assert!(BridgeError::NotConnected.is_connection_error());
        assert!(BridgeError::Connection {
            reason: "refused".into()
        }
        .is_connection_error());
        assert!(!BridgeError::remote("m", "r").is_connection_error());
    }

    #[test]
    fn test_from_serde_json() {
        let err: BridgeError = serde_json::from_str::<u32>("nope").unwrap_err().into();
        assert!(matches!(err, BridgeError::Serialization { .. }));
    }
}
