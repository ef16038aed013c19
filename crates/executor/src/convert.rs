//! Error conversion from internal error types.

use bridge_core::BridgeError;

use crate::Error;

/// Convert a BridgeError to an executor Error, field for field.
impl From<BridgeError> for Error {
    fn from(err: BridgeError) -> Self {
        match err {
            BridgeError::Connection { reason } => Error::Connection { reason },
            BridgeError::NotConnected => Error::NotConnected,
            BridgeError::NotFound { path } => Error::NotFound { path },
            BridgeError::Resolution { path, reason } => Error::Resolution { path, reason },
            BridgeError::Remote { method, reason } => Error::Remote { method, reason },
            BridgeError::Timeout { method, timeout_ms } => Error::Timeout { method, timeout_ms },
            BridgeError::InvalidInput { reason } => Error::InvalidInput { reason },
            BridgeError::InvalidProperty { property, reason } => {
                Error::InvalidProperty { property, reason }
            }
            BridgeError::TransactionAlreadyActive => Error::TransactionAlreadyActive,
            BridgeError::TransactionNotActive => Error::TransactionNotActive,
            BridgeError::Serialization { reason } => Error::Serialization { reason },
            BridgeError::Internal { reason } => Error::Internal { reason },
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization {
            reason: err.to_string(),
        }
    }
}

/// Convert a `BridgeResult<T>` to `Result<T>`.
pub(crate) fn convert_result<T>(r: bridge_core::BridgeResult<T>) -> crate::Result<T> {
    r.map_err(Error::from)
}
