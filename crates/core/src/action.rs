//! Event action kinds
//!
//! An event is a container of actions; the bridge creates one action per
//! event, targeting a source object. Not every action makes sense on every
//! source type, e.g. an actor-mixer cannot be played directly.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::BridgeError;

/// Action placed inside a newly created event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventAction {
    /// Start playback
    Play,
    /// Stop playback
    Stop,
    /// Pause playback
    Pause,
    /// Resume paused playback
    Resume,
    /// Break out of a loop
    Break,
    /// Seek within the source
    Seek,
}

impl EventAction {
    /// All actions in declaration order.
    pub const ALL: [EventAction; 6] = [
        EventAction::Play,
        EventAction::Stop,
        EventAction::Pause,
        EventAction::Resume,
        EventAction::Break,
        EventAction::Seek,
    ];

    /// Remote `@ActionType` code.
    pub fn code(self) -> i64 {
        match self {
            EventAction::Play => 1,
            EventAction::Stop => 2,
            EventAction::Pause => 7,
            EventAction::Resume => 9,
            EventAction::Break => 34,
            EventAction::Seek => 36,
        }
    }

    /// Lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            EventAction::Play => "play",
            EventAction::Stop => "stop",
            EventAction::Pause => "pause",
            EventAction::Resume => "resume",
            EventAction::Break => "break",
            EventAction::Seek => "seek",
        }
    }

    /// Whether this action may target an object of `source_type`.
    ///
    /// Unknown source types are allowed; the remote session has the final say.
    pub fn allowed_on(self, source_type: &str) -> bool {
        match source_type {
            "RandomSequenceContainer" | "SwitchContainer" | "BlendContainer" | "Sound" => true,
            "ActorMixer" | "Bus" => self != EventAction::Play,
            "AuxBus" => self == EventAction::Seek,
            "WorkUnit" | "SoundBank" | "Folder" => false,
            _ => true,
        }
    }
}

impl fmt::Display for EventAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventAction {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        EventAction::ALL
            .iter()
            .copied()
            .find(|a| a.as_str() == lower)
            .ok_or_else(|| {
                BridgeError::invalid_input(format!(
                    "invalid event action '{}', valid actions: break, pause, play, resume, seek, stop",
                    s
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_case_insensitive() {
        assert_eq!("Play".parse::<EventAction>().unwrap(), EventAction::Play);
        assert_eq!(" SEEK ".parse::<EventAction>().unwrap(), EventAction::Seek);
        assert!("explode".parse::<EventAction>().is_err());
    }

    #[test]
    fn test_allowed_sources() {
        assert!(EventAction::Play.allowed_on("Sound"));
        assert!(!EventAction::Play.allowed_on("ActorMixer"));
        assert!(EventAction::Stop.allowed_on("Bus"));
        assert!(EventAction::Seek.allowed_on("AuxBus"));
        assert!(!EventAction::Stop.allowed_on("AuxBus"));
        assert!(!EventAction::Play.allowed_on("Folder"));
        assert!(EventAction::Play.allowed_on("SomethingNew"));
    }

    #[test]
    fn test_codes() {
        assert_eq!(EventAction::Play.code(), 1);
        assert_eq!(EventAction::Seek.code(), 36);
    }
}
