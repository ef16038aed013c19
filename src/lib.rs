//! Authoring Bridge - transactional automation of remote audio-authoring sessions
//!
//! A planning agent describes the project edits and sound-engine calls it
//! wants as a [`Plan`] of typed [`Command`]s. The bridge runs the plan against
//! one authoring session, inside a single undo group when anything mutates.
//!
//! # Quick Start
//!
//! ```ignore
//! use authoring_bridge::{BridgeConfig, Command, MemoryProject, Plan, Selector, SessionContext};
//!
//! let project = MemoryProject::new();
//! let mut ctx = SessionContext::connect(&project.connector(), BridgeConfig::default())?;
//!
//! let outcome = ctx.execute(Plan::new(vec![
//!     Command::CreateObjects {
//!         parent: Selector::path("\\Actor-Mixer Hierarchy\\Default Work Unit")?,
//!         names: vec!["Footsteps".into()],
//!         object_types: vec!["ActorMixer".into()],
//!     },
//! ]))?;
//! assert!(outcome.is_success());
//! ```
//!
//! # Architecture
//!
//! Every plan goes through the [`Executor`]. The [`SessionContext`] owns the
//! session handle, the path index and the result cache for one connection.
//!
//! The session, index and core crates are internal layers; everything a
//! caller needs is re-exported here.

// Re-export the public API from bridge-executor
pub use bridge_executor::*;
