//! # Bridge Executor
//!
//! The public API of the authoring-session bridge.
//!
//! A calling agent hands over a [`Plan`]: an ordered batch of typed
//! [`Command`]s. The executor classifies the plan, wraps mutating plans in a
//! single undo group on the remote session, resolves paths through the
//! [`PathIndex`](bridge_index::PathIndex), chains results through the
//! [`ResultCache`](bridge_index::ResultCache), and returns one
//! [`PlanOutcome`] per plan.
//!
//! ## Quick Start
//!
//! ```text
//! use authoring_bridge::{BridgeConfig, Command, Plan, Selector, SessionContext};
//!
//! let mut ctx = SessionContext::connect(&connector, BridgeConfig::default())?;
//!
//! let outcome = ctx.execute(Plan::new(vec![
//!     Command::CreateObjects {
//!         parent: Selector::path("\\Actor-Mixer Hierarchy\\Default Work Unit")?,
//!         names: vec!["Footsteps".into()],
//!         object_types: vec!["ActorMixer".into()],
//!     },
//!     Command::SetProperty {
//!         targets: Selector::Previous,
//!         property: "Volume".into(),
//!         value: PropertyValue::Real(-6.0),
//!     },
//! ]))?;
//! assert!(outcome.is_success());
//! ```
//!
//! ## Plan semantics
//!
//! | Plan | Transaction | On command failure |
//! |------|-------------|--------------------|
//! | read-only | none | reported per command, siblings still run |
//! | mutating | one undo group | group cancelled, remaining commands skipped |
//!
//! A failed cancel is the only plan-level error: it is returned as
//! [`Error::RollbackFailed`] because the remote project may hold partial
//! changes.

#![warn(missing_docs)]

mod bridge;
mod classify;
mod command;
mod config;
mod convert;
mod error;
mod executor;
pub mod logging;
mod outcome;
mod output;
mod session;
mod types;

// Handler modules
mod handlers;

// Test modules
#[cfg(test)]
mod tests;

// =============================================================================
// Public API
// =============================================================================

pub use classify::{classify, Classification};
pub use command::{Command, Plan, Selector};
pub use config::{BridgeConfig, LogConfig, CONFIG_FILE_NAME};
pub use error::Error;
pub use executor::Executor;
pub use outcome::{PlanFailure, PlanOutcome, PlanStatus, RollbackStatus, StepReport};
pub use output::Output;
pub use session::SessionContext;
pub use types::*;

// Re-export the data model so callers need only this crate
pub use bridge_core::{
    BridgeError, EventAction, ObjectId, ObjectPath, ObjectRef, PropertyValue, ResultSet, Vec3,
};
pub use bridge_index::{IndexEntry, IndexStats};
pub use bridge_session::{
    ChangeEvent, Connector, MemoryConnector, MemoryProject, SessionHandle, SessionOptions,
    SubscriptionId,
};

/// Result type for executor operations
pub type Result<T> = std::result::Result<T, Error>;
