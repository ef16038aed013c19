//! Command enum defining every bridge operation, and the plan that batches
//! commands.
//!
//! Commands are:
//! - **Self-contained**: All parameters needed for execution are in the variant
//! - **Serializable**: A planning agent produces them as JSON
//! - **Typed**: No generic fallback, every operation has explicit types
//! - **Statically classified**: whether a command mutates the remote session
//!   follows from its variant alone, never from its arguments

use bridge_core::{EventAction, ObjectPath, PropertyValue, Vec3};
use bridge_session::SubscriptionId;
use serde::{Deserialize, Serialize};

use crate::types::*;

/// Where a command takes its target objects from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Selector {
    /// Explicit paths, resolved through the path index
    Paths(Vec<ObjectPath>),
    /// The objects produced by the most recent producing command
    Previous,
}

impl Selector {
    /// Selector for a single path.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if `raw` is not a valid path.
    pub fn path(raw: &str) -> crate::Result<Self> {
        Ok(Selector::Paths(vec![ObjectPath::parse(raw)?]))
    }

    /// Selector for several paths.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if any entry is not a valid path.
    pub fn paths<'a>(raw: impl IntoIterator<Item = &'a str>) -> crate::Result<Self> {
        let paths = raw
            .into_iter()
            .map(ObjectPath::parse)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Selector::Paths(paths))
    }

    /// Whether the selector reads the result cache, given the plan's
    /// `reuse_previous` flag. An empty path list defers to the flag.
    pub fn uses_previous(&self, reuse_previous: bool) -> bool {
        match self {
            Selector::Previous => true,
            Selector::Paths(paths) => paths.is_empty() && reuse_previous,
        }
    }
}

/// A command is a self-contained, serializable operation against the
/// authoring session.
///
/// # Command Categories
///
/// | Category | Mutating | Commands |
/// |----------|----------|----------|
/// | Authoring | yes | create, rename, move, set property, import |
/// | Soundbanks | yes | inclusion, generation |
/// | Runtime | yes | game objects, post event, RTPC, switch, state, position, stop |
/// | Index | no | build, resolve |
/// | Query | no | list, selection, project info, properties |
/// | Subscriptions | no | subscribe, unsubscribe, poll |
///
/// # Example
///
/// ```ignore
/// let cmd = Command::RenameObjects {
///     targets: Selector::Previous,
///     new_names: vec!["Footsteps_Grass".into()],
/// };
/// assert!(cmd.is_mutating());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub enum Command {
    // ==================== Authoring (8) ====================
    /// Create objects. A single parent receives every name; otherwise the
    /// selected parents, `names` and `object_types` are parallel.
    /// Returns: `Output::Objects`
    CreateObjects {
        /// One parent for the batch, or one per name
        parent: Selector,
        /// Names of the new objects
        names: Vec<String>,
        /// Object type of each new object
        object_types: Vec<String>,
    },

    /// Create one event per target, each holding a single action on that
    /// target. An empty `names` list derives names as `<Action>_<Target>`.
    /// Returns: `Output::Objects`
    CreateEvents {
        /// Objects the actions play, stop or otherwise drive
        targets: Selector,
        /// Event names, parallel to the targets
        #[serde(default)]
        names: Vec<String>,
        /// One action for every event, or one per target
        actions: Vec<EventAction>,
        /// Destination of every event, or one per target. Empty means the
        /// default event work unit.
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        parents: Vec<ObjectPath>,
    },

    /// Create game parameters with their ranges.
    /// Returns: `Output::Objects`
    CreateGameParameters {
        /// Name, range and initial value of each parameter
        parameters: Vec<GameParameterSpec>,
        /// Destination; defaults to the game parameter work unit
        #[serde(default, skip_serializing_if = "Option::is_none")]
        parent: Option<ObjectPath>,
    },

    /// Create switch groups, switches, state groups or states. A single
    /// parent receives every name; otherwise parents and names are parallel.
    /// Returns: `Output::Objects`
    CreateGameSyncs {
        /// What to create
        kind: GameSyncKind,
        /// Parent groups or work units; groups default to the kind's work unit
        #[serde(default, skip_serializing_if = "Option::is_none")]
        parent: Option<Selector>,
        /// Names of the new objects
        names: Vec<String>,
    },

    /// Rename each target to the parallel entry of `new_names`.
    /// Returns: `Output::Objects`
    RenameObjects {
        /// Objects to rename
        targets: Selector,
        /// New names, parallel to the targets
        new_names: Vec<String>,
    },

    /// Move every target under `new_parent`.
    /// Returns: `Output::Objects`
    MoveObject {
        /// Objects to move
        targets: Selector,
        /// Destination parent
        new_parent: ObjectPath,
    },

    /// Set one property on every target.
    /// Returns: `Output::Count`
    SetProperty {
        /// Objects to change
        targets: Selector,
        /// Property name from the known property table
        property: String,
        /// Typed value, checked against the property's kind and range
        value: PropertyValue,
    },

    /// Import audio files to object paths.
    /// Returns: `Output::Objects`
    ImportAudio {
        /// File and destination object path pairs
        items: Vec<ImportItem>,
        /// Type of the leaf object; defaults to `Sound`
        #[serde(default, skip_serializing_if = "Option::is_none")]
        object_type: Option<String>,
        /// Voice language; absent imports as SFX
        #[serde(default, skip_serializing_if = "Option::is_none")]
        language: Option<String>,
        /// Behavior when the destination exists
        #[serde(default)]
        operation: ImportOperation,
    },

    // ==================== Soundbanks (2) ====================
    /// Add the targets to a soundbank's inclusion list.
    /// Returns: `Output::Count`
    IncludeInSoundbank {
        /// The soundbank object
        soundbank: ObjectPath,
        /// Objects to include
        targets: Selector,
        /// Inclusion filter; absent includes events, structures and media
        #[serde(default, skip_serializing_if = "Option::is_none")]
        filter: Option<Vec<String>>,
    },

    /// Generate soundbanks. `languages: None` generates every language.
    /// Returns: `Output::Generated`
    GenerateSoundbanks {
        /// Soundbank names
        soundbanks: Vec<String>,
        /// Platform names
        platforms: Vec<String>,
        /// Language names
        #[serde(default, skip_serializing_if = "Option::is_none")]
        languages: Option<Vec<String>>,
    },

    // ==================== Runtime (8) ====================
    /// Register game objects by name, reusing existing ones, and place
    /// each at its position when positions are given.
    /// Returns: `Output::GameObjects`
    RegisterGameObjects {
        /// Game object names
        names: Vec<String>,
        /// Positions parallel to `names`; empty leaves objects unplaced
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        positions: Vec<Vec3>,
    },

    /// Unregister a game object by name.
    /// Returns: `Output::Unit`
    UnregisterGameObject {
        /// Registered game object name
        name: String,
    },

    /// Post an event on a game object, now or after `delay_ms`.
    /// Returns: `Output::Posted`
    PostEvent {
        /// Event name
        event: String,
        /// Target game object; defaults to the configured one
        #[serde(default, skip_serializing_if = "Option::is_none")]
        game_object: Option<String>,
        /// Delay before posting
        #[serde(default)]
        delay_ms: i64,
    },

    /// Set an RTPC, ramping linearly from `from` to `to` over `duration_ms`.
    /// No game object means the global scope.
    /// Returns: `Output::Scheduled`
    SetRtpc {
        /// Game parameter name
        rtpc: String,
        /// Start value
        #[serde(default)]
        from: f64,
        /// End value
        to: f64,
        /// Ramp length; zero sets `to` once
        #[serde(default)]
        duration_ms: u64,
        /// Target game object
        #[serde(default, skip_serializing_if = "Option::is_none")]
        game_object: Option<String>,
    },

    /// Set a switch on a game object.
    /// Returns: `Output::Unit`
    SetSwitch {
        /// Switch group name
        switch_group: String,
        /// Switch name within the group
        switch: String,
        /// Target game object; defaults to the configured one
        #[serde(default, skip_serializing_if = "Option::is_none")]
        game_object: Option<String>,
    },

    /// Set a global state.
    /// Returns: `Output::Unit`
    SetState {
        /// State group name
        state_group: String,
        /// State name within the group
        state: String,
    },

    /// Move a game object from `from` to `to` over `duration_ms`.
    /// Returns: `Output::Scheduled`
    MoveGameObject {
        /// Game object name
        game_object: String,
        /// Start position
        from: Vec3,
        /// End position
        to: Vec3,
        /// Ramp length; zero places the object once
        #[serde(default)]
        duration_ms: u64,
        /// Front orientation
        #[serde(default, skip_serializing_if = "Option::is_none")]
        front: Option<Vec3>,
        /// Top orientation
        #[serde(default, skip_serializing_if = "Option::is_none")]
        top: Option<Vec3>,
    },

    /// Stop every sound, or every sound of one game object.
    /// Returns: `Output::Unit`
    StopAllSounds {
        /// Game object to silence
        #[serde(default, skip_serializing_if = "Option::is_none")]
        game_object: Option<String>,
    },

    // ==================== Index (2) ====================
    /// Scan a subtree into the path index.
    /// Returns: `Output::Indexed`
    IndexSubtree {
        /// Subtree root
        root: ObjectPath,
        /// Merge with the existing index instead of replacing it
        #[serde(default)]
        extend: bool,
    },

    /// Resolve paths to ids, reporting per path.
    /// Returns: `Output::Resolved`
    ResolvePaths {
        /// Paths to resolve
        paths: Vec<ObjectPath>,
    },

    // ==================== Query (8) ====================
    /// List events.
    /// Returns: `Output::Listing`
    ListEvents {
        /// Absolute path or name fragment
        #[serde(default, skip_serializing_if = "Option::is_none")]
        filter: Option<String>,
    },

    /// List game parameters.
    /// Returns: `Output::Listing`
    ListGameParameters {
        /// Absolute path or name fragment
        #[serde(default, skip_serializing_if = "Option::is_none")]
        filter: Option<String>,
    },

    /// List switch groups with their switches.
    /// Returns: `Output::Groups`
    ListSwitchGroups {
        /// Absolute path or name fragment
        #[serde(default, skip_serializing_if = "Option::is_none")]
        filter: Option<String>,
    },

    /// List state groups with their states.
    /// Returns: `Output::Groups`
    ListStateGroups {
        /// Absolute path or name fragment
        #[serde(default, skip_serializing_if = "Option::is_none")]
        filter: Option<String>,
    },

    /// List game objects registered with the sound engine.
    /// Returns: `Output::GameObjects`
    ListGameObjects,

    /// Objects selected in the authoring UI.
    /// Returns: `Output::Objects`
    GetSelection,

    /// Project name, platforms and languages.
    /// Returns: `Output::ProjectInfo`
    GetProjectInfo,

    /// Properties accepted by `SetProperty`.
    /// Returns: `Output::Properties`
    ListProperties,

    // ==================== Subscriptions (3) ====================
    /// Subscribe to a change topic.
    /// Returns: `Output::Subscribed`
    Subscribe {
        /// Topic name
        topic: String,
    },

    /// Cancel a subscription made with `Subscribe`.
    /// Returns: `Output::Bool`
    Unsubscribe {
        /// Subscription to cancel
        id: SubscriptionId,
    },

    /// Drain buffered events from one subscription, or from all.
    /// Returns: `Output::ChangeEvents`
    PollEvents {
        /// Subscription to drain; absent drains all
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<SubscriptionId>,
        /// Upper bound on returned events
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max: Option<usize>,
    },
}

impl Command {
    /// Whether this command alters remote project state or registered
    /// runtime objects. Derived from the variant alone.
    pub fn is_mutating(&self) -> bool {
        matches!(
            self,
            Command::CreateObjects { .. }
                | Command::CreateEvents { .. }
                | Command::CreateGameParameters { .. }
                | Command::CreateGameSyncs { .. }
                | Command::RenameObjects { .. }
                | Command::MoveObject { .. }
                | Command::SetProperty { .. }
                | Command::ImportAudio { .. }
                | Command::IncludeInSoundbank { .. }
                | Command::GenerateSoundbanks { .. }
                | Command::RegisterGameObjects { .. }
                | Command::UnregisterGameObject { .. }
                | Command::PostEvent { .. }
                | Command::SetRtpc { .. }
                | Command::SetSwitch { .. }
                | Command::SetState { .. }
                | Command::MoveGameObject { .. }
                | Command::StopAllSounds { .. }
        )
    }

    /// Returns the variant name as a static string.
    ///
    /// Used in step reports and logs.
    pub fn name(&self) -> &'static str {
        match self {
            Command::CreateObjects { .. } => "CreateObjects",
            Command::CreateEvents { .. } => "CreateEvents",
            Command::CreateGameParameters { .. } => "CreateGameParameters",
            Command::CreateGameSyncs { .. } => "CreateGameSyncs",
            Command::RenameObjects { .. } => "RenameObjects",
            Command::MoveObject { .. } => "MoveObject",
            Command::SetProperty { .. } => "SetProperty",
            Command::ImportAudio { .. } => "ImportAudio",
            Command::IncludeInSoundbank { .. } => "IncludeInSoundbank",
            Command::GenerateSoundbanks { .. } => "GenerateSoundbanks",
            Command::RegisterGameObjects { .. } => "RegisterGameObjects",
            Command::UnregisterGameObject { .. } => "UnregisterGameObject",
            Command::PostEvent { .. } => "PostEvent",
            Command::SetRtpc { .. } => "SetRtpc",
            Command::SetSwitch { .. } => "SetSwitch",
            Command::SetState { .. } => "SetState",
            Command::MoveGameObject { .. } => "MoveGameObject",
            Command::StopAllSounds { .. } => "StopAllSounds",
            Command::IndexSubtree { .. } => "IndexSubtree",
            Command::ResolvePaths { .. } => "ResolvePaths",
            Command::ListEvents { .. } => "ListEvents",
            Command::ListGameParameters { .. } => "ListGameParameters",
            Command::ListSwitchGroups { .. } => "ListSwitchGroups",
            Command::ListStateGroups { .. } => "ListStateGroups",
            Command::ListGameObjects => "ListGameObjects",
            Command::GetSelection => "GetSelection",
            Command::GetProjectInfo => "GetProjectInfo",
            Command::ListProperties => "ListProperties",
            Command::Subscribe { .. } => "Subscribe",
            Command::Unsubscribe { .. } => "Unsubscribe",
            Command::PollEvents { .. } => "PollEvents",
        }
    }
}

/// An ordered batch of commands submitted as one unit of work.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Plan {
    /// Commands in execution order
    pub commands: Vec<Command>,
    /// Treat empty path selectors as "the previous results"
    #[serde(default)]
    pub reuse_previous: bool,
}

impl Plan {
    /// Plan over `commands` with explicit selectors.
    pub fn new(commands: Vec<Command>) -> Self {
        Self {
            commands,
            reuse_previous: false,
        }
    }

    /// Set the `reuse_previous` flag.
    pub fn reusing_previous(mut self) -> Self {
        self.reuse_previous = true;
        self
    }

    /// Number of commands.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Whether the plan has no commands.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}
