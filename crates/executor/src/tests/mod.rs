//! Test modules for the executor crate.
//!
//! Every test runs plans against an in-memory project.

pub mod queries;

use bridge_core::ObjectPath;
use bridge_session::MemoryProject;

use crate::{BridgeConfig, Command, PlanOutcome, SessionContext};

pub(crate) const UNIT: &str = "\\Actor-Mixer Hierarchy\\Default Work Unit";

/// Connect a session context to `project` with the default configuration.
pub(crate) fn connect(project: &MemoryProject) -> SessionContext {
    SessionContext::connect(&project.connector(), BridgeConfig::default()).unwrap()
}

pub(crate) fn path(raw: &str) -> ObjectPath {
    ObjectPath::parse(raw).unwrap()
}

/// `\Actor-Mixer Hierarchy\Default Work Unit\<name>`
pub(crate) fn under_unit(name: &str) -> String {
    format!("{}\\{}", UNIT, name)
}

/// CreateObjects of one type under one parent.
pub(crate) fn create(parent: &str, names: &[&str], object_type: &str) -> Command {
    Command::CreateObjects {
        parent: crate::Selector::path(parent).unwrap(),
        names: names.iter().map(|n| n.to_string()).collect(),
        object_types: vec![object_type.to_string(); names.len()],
    }
}

/// Assert an outcome succeeded, printing the failure otherwise.
pub(crate) fn assert_success(outcome: &PlanOutcome) {
    assert!(outcome.is_success(), "plan failed: {:?}", outcome.failure);
}
