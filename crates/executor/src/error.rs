//! Error types for plan execution.
//!
//! All errors surfaced to the calling agent are represented by the [`Error`]
//! enum. These errors are:
//! - **Structured**: Each variant has typed fields for error details
//! - **Serializable**: Can be converted to/from JSON
//! - **Lossless**: No information is lost in conversion from internal errors

use serde::{Deserialize, Serialize};

/// Plan and command errors.
///
/// # Categories
///
/// | Category | Variants | Description |
/// |----------|----------|-------------|
/// | Not Found | `NotFound`, `Resolution`, `GameObjectNotFound`, `SubscriptionNotFound` | Target doesn't exist |
/// | Validation | `InvalidInput`, `InvalidProperty`, `NoPreviousResults` | Bad command payload |
/// | Remote | `Remote`, `Timeout` | The authoring session rejected or dropped a call |
/// | Connection | `Connection`, `NotConnected` | No usable session |
/// | Transaction | `TransactionAlreadyActive`, `TransactionNotActive`, `RollbackFailed` | Undo-group state |
/// | System | `Config`, `Serialization`, `Internal` | Infrastructure errors |
///
/// # Example
///
/// ```ignore
/// match ctx.execute(plan) {
///     Ok(outcome) if outcome.is_success() => { /* all applied */ }
///     Ok(outcome) => { /* rolled back, see outcome.failure */ }
///     Err(Error::RollbackFailed { reason, .. }) => {
///         eprintln!("project may hold partial changes: {}", reason);
///     }
///     Err(e) => eprintln!("plan not run: {}", e),
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
pub enum Error {
    // ==================== Not Found ====================
    /// Path does not exist in the remote project
    #[error("object not found: {path}")]
    NotFound {
        /// Path that does not exist
        path: String,
    },

    /// Path could not be resolved
    #[error("cannot resolve {path}: {reason}")]
    Resolution {
        /// Path being resolved
        path: String,
        /// Why resolution failed
        reason: String,
    },

    /// No game object with this name is registered
    #[error("game object not found: {name}")]
    GameObjectNotFound {
        /// Game object name as given
        name: String,
    },

    /// Subscription id is unknown to this session
    #[error("subscription not found: {id}")]
    SubscriptionNotFound {
        /// Subscription id as given
        id: String,
    },

    // ==================== Validation Errors ====================
    /// Invalid command payload
    #[error("invalid input: {reason}")]
    InvalidInput {
        /// What is wrong with the payload
        reason: String,
    },

    /// Property name or value rejected by the property table
    #[error("invalid property '{property}': {reason}")]
    InvalidProperty {
        /// Property name
        property: String,
        /// Why the name or value was rejected
        reason: String,
    },

    /// A command asked for previous results but none are cached
    #[error("no previous results to reuse")]
    NoPreviousResults,

    // ==================== Remote Errors ====================
    /// The authoring session rejected a call
    #[error("{method} failed: {reason}")]
    Remote {
        /// Remote method name
        method: String,
        /// Message returned by the session
        reason: String,
    },

    /// The authoring session did not reply in time
    #[error("{method} timed out after {timeout_ms}ms")]
    Timeout {
        /// Remote method name
        method: String,
        /// Timeout that elapsed
        timeout_ms: u64,
    },

    // ==================== Connection Errors ====================
    /// The authoring session could not be reached
    #[error("connection error: {reason}")]
    Connection {
        /// Why the session is unreachable
        reason: String,
    },

    /// The session context has been disconnected
    #[error("not connected to an authoring session")]
    NotConnected,

    // ==================== Transaction Errors ====================
    /// An undo group is already open
    #[error("transaction already active")]
    TransactionAlreadyActive,

    /// No undo group is open
    #[error("no active transaction")]
    TransactionNotActive,

    /// Cancelling the undo group failed after command `failed_command`
    /// failed; the remote project may hold partially applied changes.
    #[error("rollback failed after command {failed_command} ({cause}): {reason}")]
    RollbackFailed {
        /// Index of the command that triggered the rollback
        failed_command: usize,
        /// Error of that command
        cause: String,
        /// Why the cancel failed
        reason: String,
    },

    // ==================== System Errors ====================
    /// Configuration could not be read or is invalid
    #[error("config error: {reason}")]
    Config {
        /// What is wrong with the configuration
        reason: String,
    },

    /// Malformed payload
    #[error("serialization error: {reason}")]
    Serialization {
        /// Decoder message
        reason: String,
    },

    /// Internal error (bug)
    #[error("internal error: {reason}")]
    Internal {
        /// Description of the failure
        reason: String,
    },
}

impl Error {
    /// Shorthand for [`Error::InvalidInput`].
    pub fn invalid_input(reason: impl Into<String>) -> Self {
        Error::InvalidInput {
            reason: reason.into(),
        }
    }

    /// Whether the error means the session itself is unusable.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::Connection { .. } | Error::NotConnected | Error::RollbackFailed { .. }
        )
    }
}
