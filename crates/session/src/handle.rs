//! The session handle contract

use std::time::Duration;

use bridge_core::BridgeResult;
use serde_json::Value as JsonValue;

use crate::subscription::{Subscription, SubscriptionId};

/// Connection parameters for a session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionOptions {
    /// Endpoint of the authoring session
    pub url: String,
    /// Upper bound on a single request/response call
    pub call_timeout: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            url: "ws://127.0.0.1:8080/waapi".to_string(),
            call_timeout: Duration::from_millis(1000),
        }
    }
}

/// Lifecycle of the single undo-group slot of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransactionState {
    /// No group is open and none has completed
    #[default]
    NotOpen,
    /// A group is open
    Open,
    /// The last group was committed
    Committed,
    /// The last group was cancelled and its changes reverted
    Cancelled,
}

/// A live connection to the authoring session.
///
/// Implementations must be `Send` so a session context can be moved across
/// threads, but calls are issued from one thread at a time.
pub trait SessionHandle: Send {
    /// Send one request and wait for its reply, bounded by the call timeout.
    ///
    /// `args` carries the method arguments and `options` the return-field
    /// selection; either may be an empty object.
    ///
    /// # Errors
    ///
    /// `NotConnected` after disconnect, `Timeout` when no reply arrives in
    /// time, `Remote` when the session rejects the call.
    fn call(&mut self, method: &str, args: JsonValue, options: JsonValue) -> BridgeResult<JsonValue>;

    /// Queue a request to be issued `due_in` from now without waiting for its
    /// reply. Failures of the request itself are not reported.
    ///
    /// # Errors
    ///
    /// `NotConnected` after disconnect.
    fn schedule(&mut self, method: &str, args: JsonValue, due_in: Duration) -> BridgeResult<()>;

    /// Subscribe to a change topic.
    fn subscribe(&mut self, topic: &str, options: JsonValue) -> BridgeResult<Subscription>;

    /// Cancel a subscription. Returns false if `id` was not subscribed.
    fn unsubscribe(&mut self, id: SubscriptionId) -> BridgeResult<bool>;

    /// Open an undo group.
    ///
    /// # Errors
    ///
    /// `TransactionAlreadyActive` if a group is already open.
    fn begin_transaction(&mut self) -> BridgeResult<()>;

    /// Close the open undo group under `label`, keeping its changes.
    ///
    /// # Errors
    ///
    /// `TransactionNotActive` if no group is open.
    fn commit_transaction(&mut self, label: &str) -> BridgeResult<()>;

    /// Close the open undo group, reverting its changes.
    ///
    /// # Errors
    ///
    /// `TransactionNotActive` if no group is open; `Remote` if the session
    /// could not revert.
    fn cancel_transaction(&mut self) -> BridgeResult<()>;

    /// State of the undo-group slot.
    fn transaction_state(&self) -> TransactionState;

    /// Whether the handle is still connected.
    fn is_connected(&self) -> bool;

    /// Close the connection. Idempotent.
    fn disconnect(&mut self);
}

/// Factory for session handles.
pub trait Connector: Send + Sync {
    /// Open a new session.
    ///
    /// # Errors
    ///
    /// `Connection` if the endpoint cannot be reached.
    fn connect(&self, options: &SessionOptions) -> BridgeResult<Box<dyn SessionHandle>>;
}
