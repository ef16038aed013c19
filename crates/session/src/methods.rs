//! Remote method and topic names used by the bridge.

/// Query objects
pub const OBJECT_GET: &str = "ak.wwise.core.object.get";
/// Create an object
pub const OBJECT_CREATE: &str = "ak.wwise.core.object.create";
/// Rename an object
pub const OBJECT_SET_NAME: &str = "ak.wwise.core.object.setName";
/// Move an object under a new parent
pub const OBJECT_MOVE: &str = "ak.wwise.core.object.move";
/// Set an object property
pub const OBJECT_SET_PROPERTY: &str = "ak.wwise.core.object.setProperty";
/// Delete an object
pub const OBJECT_DELETE: &str = "ak.wwise.core.object.delete";
/// Set a game parameter's range
pub const GAME_PARAMETER_SET_RANGE: &str = "ak.wwise.core.gameParameter.setRange";
/// Edit a soundbank's inclusion list
pub const SOUNDBANK_SET_INCLUSIONS: &str = "ak.wwise.core.soundbank.setInclusions";
/// Generate soundbanks
pub const SOUNDBANK_GENERATE: &str = "ak.wwise.core.soundbank.generate";
/// Import audio files
pub const AUDIO_IMPORT: &str = "ak.wwise.core.audio.import";
/// Project metadata
pub const PROJECT_INFO: &str = "ak.wwise.core.getProjectInfo";
/// Objects selected in the authoring UI
pub const SELECTED_OBJECTS: &str = "ak.wwise.ui.getSelectedObjects";
/// Game objects known to the profiler
pub const PROFILER_GAME_OBJECTS: &str = "ak.wwise.core.profiler.getGameObjects";

/// Open an undo group
pub const UNDO_BEGIN: &str = "ak.wwise.core.undo.beginGroup";
/// Close an undo group, keeping its changes
pub const UNDO_END: &str = "ak.wwise.core.undo.endGroup";
/// Close an undo group, reverting its changes
pub const UNDO_CANCEL: &str = "ak.wwise.core.undo.cancelGroup";

/// Register a game object
pub const REGISTER_GAME_OBJECT: &str = "ak.soundengine.registerGameObj";
/// Unregister a game object
pub const UNREGISTER_GAME_OBJECT: &str = "ak.soundengine.unregisterGameObj";
/// Set the default listeners
pub const SET_DEFAULT_LISTENERS: &str = "ak.soundengine.setDefaultListeners";
/// Route an emitter to listeners
pub const SET_LISTENERS: &str = "ak.soundengine.setListeners";
/// Post an event
pub const POST_EVENT: &str = "ak.soundengine.postEvent";
/// Set an RTPC value
pub const SET_RTPC_VALUE: &str = "ak.soundengine.setRTPCValue";
/// Set a switch
pub const SET_SWITCH: &str = "ak.soundengine.setSwitch";
/// Set a state
pub const SET_STATE: &str = "ak.soundengine.setState";
/// Set a game object's position
pub const SET_POSITION: &str = "ak.soundengine.setPosition";
/// Stop all sounds on a game object
pub const STOP_ALL: &str = "ak.soundengine.stopAll";

/// An object was created
pub const TOPIC_CREATED: &str = "ak.wwise.core.object.created";
/// An object was renamed
pub const TOPIC_NAME_CHANGED: &str = "ak.wwise.core.object.nameChanged";
/// A child was attached to a parent
pub const TOPIC_CHILD_ADDED: &str = "ak.wwise.core.object.childAdded";
/// A child was detached from a parent
pub const TOPIC_CHILD_REMOVED: &str = "ak.wwise.core.object.childRemoved";
/// An object was deleted
pub const TOPIC_POST_DELETED: &str = "ak.wwise.core.object.postDeleted";

/// Topics that signal a structural change of the project hierarchy.
pub const STRUCTURAL_TOPICS: [&str; 5] = [
    TOPIC_CREATED,
    TOPIC_NAME_CHANGED,
    TOPIC_CHILD_ADDED,
    TOPIC_CHILD_REMOVED,
    TOPIC_POST_DELETED,
];

/// Whether `method` changes project or sound-engine state.
pub fn is_mutating_method(method: &str) -> bool {
    matches!(
        method,
        OBJECT_CREATE
            | OBJECT_SET_NAME
            | OBJECT_MOVE
            | OBJECT_SET_PROPERTY
            | OBJECT_DELETE
            | GAME_PARAMETER_SET_RANGE
            | SOUNDBANK_SET_INCLUSIONS
            | SOUNDBANK_GENERATE
            | AUDIO_IMPORT
            | REGISTER_GAME_OBJECT
            | UNREGISTER_GAME_OBJECT
            | SET_DEFAULT_LISTENERS
            | SET_LISTENERS
            | POST_EVENT
            | SET_RTPC_VALUE
            | SET_SWITCH
            | SET_STATE
            | SET_POSITION
            | STOP_ALL
    )
}
