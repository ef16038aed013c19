//! Common test utilities for plan execution tests

use authoring_bridge::{
    BridgeConfig, Command, MemoryProject, ObjectPath, Output, PlanOutcome, Selector, SessionContext,
};

pub const UNIT: &str = "\\Actor-Mixer Hierarchy\\Default Work Unit";

/// `\Actor-Mixer Hierarchy\Default Work Unit\Root\A`, the parent most
/// scenarios create under.
pub fn root_a() -> String {
    format!("{}\\Root\\A", UNIT)
}

/// A project with an empty `Root\A` folder under the default work unit
pub fn create_project() -> MemoryProject {
    let project = MemoryProject::new();
    project.add_path(&root_a(), "Folder").unwrap();
    project
}

/// Connect a session context with the default configuration
pub fn connect(project: &MemoryProject) -> SessionContext {
    SessionContext::connect(&project.connector(), BridgeConfig::default()).unwrap()
}

pub fn path(raw: &str) -> ObjectPath {
    ObjectPath::parse(raw).unwrap()
}

/// CreateObjects of `object_type` for every name under `parent`
pub fn create(parent: &str, names: &[&str], object_type: &str) -> Command {
    Command::CreateObjects {
        parent: Selector::path(parent).unwrap(),
        names: names.iter().map(|n| n.to_string()).collect(),
        object_types: vec![object_type.to_string(); names.len()],
    }
}

/// Extract the count from Output::Count
#[allow(dead_code)]
pub fn extract_count(output: Option<&Output>) -> u64 {
    match output {
        Some(Output::Count(n)) => *n,
        other => panic!("Expected Output::Count, got {:?}", other),
    }
}

/// Panic with the failure if the plan did not succeed
pub fn assert_success(outcome: &PlanOutcome) {
    assert!(outcome.is_success(), "plan failed: {:?}", outcome.failure);
}
