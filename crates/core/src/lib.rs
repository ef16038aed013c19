//! Core types for the authoring-session bridge
//!
//! This crate defines the data model shared by every layer of the bridge:
//! - ObjectPath: normalized hierarchical path into the remote project
//! - ObjectId / ObjectRef / ResultSet: identifiers and produced-object sets
//! - PropertyValue: tagged property payloads validated against a closed table
//! - BridgeError: internal error taxonomy
//! - ramp: linear interpolation schedules for runtime parameter ramps
//! - action: event action kinds and the source types they may target

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod action;
pub mod error;
pub mod object;
pub mod path;
pub mod property;
pub mod ramp;

pub use action::EventAction;
pub use error::{BridgeError, BridgeResult};
pub use object::{ObjectId, ObjectRef, ResultSet};
pub use path::ObjectPath;
pub use property::{PropertyKind, PropertySpec, PropertyValue};
pub use ramp::Vec3;
