//! Session handle contract for the authoring-session bridge
//!
//! The remote authoring application is an external collaborator. This crate
//! defines what the bridge needs from it and nothing more:
//!
//! - [`SessionHandle`]: request/response calls, fire-and-forget scheduling,
//!   topic subscriptions and the single undo-group transaction slot
//! - [`Connector`]: how a handle is obtained
//! - [`Subscription`]/[`ChangeEvent`]: non-blocking change delivery
//!
//! [`MemorySession`] implements the contract over an in-memory project tree.
//! It backs the test suites and offline dry runs of plans.

#![warn(missing_docs)]

mod handle;
pub mod memory;
pub mod methods;
mod subscription;

pub use handle::{Connector, SessionHandle, SessionOptions, TransactionState};
pub use memory::{EngineCall, Fault, FaultKind, MemoryConnector, MemoryProject, MemorySession};
pub use subscription::{ChangeEvent, Subscription, SubscriptionId};
