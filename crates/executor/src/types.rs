//! Supporting types for commands and outputs.
//!
//! These types are used in [`Command`](crate::Command) payloads and
//! [`Output`](crate::Output) results.

use bridge_core::{ObjectId, ObjectPath, ObjectRef};
use serde::{Deserialize, Serialize};

// =============================================================================
// Object creation payloads
// =============================================================================

/// One game parameter to create.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GameParameterSpec {
    /// Object name
    pub name: String,
    /// Lower bound of the range
    #[serde(default)]
    pub min: f64,
    /// Upper bound of the range
    #[serde(default = "default_parameter_max")]
    pub max: f64,
    /// Value the parameter starts at
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_value: Option<f64>,
}

fn default_parameter_max() -> f64 {
    100.0
}

/// Kind of game sync object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameSyncKind {
    /// Container of switches
    SwitchGroup,
    /// One switch inside a switch group
    Switch,
    /// Container of states
    StateGroup,
    /// One state inside a state group
    State,
}

impl GameSyncKind {
    /// Remote object type created for this kind.
    pub fn object_type(self) -> &'static str {
        match self {
            GameSyncKind::SwitchGroup => "SwitchGroup",
            GameSyncKind::Switch => "Switch",
            GameSyncKind::StateGroup => "StateGroup",
            GameSyncKind::State => "State",
        }
    }

    /// Type the parent must have, for kinds that live inside a group.
    pub fn required_parent_type(self) -> Option<&'static str> {
        match self {
            GameSyncKind::Switch => Some("SwitchGroup"),
            GameSyncKind::State => Some("StateGroup"),
            GameSyncKind::SwitchGroup | GameSyncKind::StateGroup => None,
        }
    }

    /// Work unit groups are created under when no parent is given.
    pub fn default_parent(self) -> Option<&'static str> {
        match self {
            GameSyncKind::SwitchGroup => Some("\\Switches\\Default Work Unit"),
            GameSyncKind::StateGroup => Some("\\States\\Default Work Unit"),
            GameSyncKind::Switch | GameSyncKind::State => None,
        }
    }
}

/// One audio file and the object path it is imported to.
///
/// Segments of `object_path` may carry a `<Type>` prefix naming the type of
/// an object that has to be created, e.g.
/// `\Actor-Mixer Hierarchy\Default Work Unit\<Sound SFX>Step`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ImportItem {
    /// Absolute path of the audio file on the machine running the session
    pub file: String,
    /// Destination object path
    pub object_path: String,
}

/// What an import does when the destination object already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportOperation {
    /// Reuse the existing object and replace its audio file
    #[default]
    UseExisting,
    /// Always create a new object, renaming on conflict
    CreateNew,
    /// Replace the audio of the existing object
    ReplaceExisting,
}

impl ImportOperation {
    /// Remote `importOperation` value.
    pub fn as_remote(self) -> &'static str {
        match self {
            ImportOperation::UseExisting => "useExisting",
            ImportOperation::CreateNew => "createNew",
            ImportOperation::ReplaceExisting => "replaceExisting",
        }
    }
}

// =============================================================================
// List filters
// =============================================================================

/// Filter accepted by the list commands.
///
/// Parsed from the free-form filter string of a command:
/// empty or absent lists everything, a string starting with `\` lists the
/// descendants of that path, anything else is a name fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListFilter {
    /// Everything under the hierarchy root
    All,
    /// Descendants of a path
    Under(ObjectPath),
    /// Names containing a fragment, case-insensitive
    Name(String),
}

impl ListFilter {
    /// Parse an optional filter string.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if the string starts with `\` but is not a
    /// valid path.
    pub fn parse(raw: Option<&str>) -> crate::Result<Self> {
        let spec = raw.map(str::trim).unwrap_or_default();
        if spec.is_empty() {
            Ok(ListFilter::All)
        } else if spec.starts_with('\\') {
            Ok(ListFilter::Under(ObjectPath::parse(spec)?))
        } else {
            Ok(ListFilter::Name(spec.to_string()))
        }
    }
}

// =============================================================================
// Output payloads
// =============================================================================

/// A game object registered with the sound engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameObjectInfo {
    /// Engine id
    pub id: u64,
    /// Display name
    pub name: String,
}

/// A switch or state group and the names of its members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSyncGroup {
    /// The group object
    pub group: ObjectRef,
    /// Member names in project order
    pub members: Vec<String>,
}

/// Project summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectInfo {
    /// Project name
    pub name: String,
    /// Project file on the authoring machine
    pub path: String,
    /// Platform names
    pub platforms: Vec<String>,
    /// Language names
    pub languages: Vec<String>,
}

/// One settable property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyInfo {
    /// Remote property identifier
    pub name: String,
    /// UI label
    pub label: String,
    /// Accepted values
    pub accepts: String,
}

/// Per-path result of a batch resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    /// Path as requested
    pub path: ObjectPath,
    /// Remote id when found
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_id: Option<ObjectId>,
    /// Object kind when found
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_type: Option<String>,
    /// Why the path did not resolve
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<crate::Error>,
}

impl Resolution {
    /// Whether the path resolved.
    pub fn is_found(&self) -> bool {
        self.object_id.is_some()
    }
}
