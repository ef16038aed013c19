//! Output enum for command results.
//!
//! Every command produces exactly one output variant on success.

use bridge_core::{ObjectRef, ResultSet};
use bridge_index::IndexEntry;
use bridge_session::{ChangeEvent, SubscriptionId};
use serde::{Deserialize, Serialize};

use crate::types::*;

/// Successful command result.
///
/// The variant depends on the command; see the `Returns:` line of each
/// [`Command`](crate::Command) variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Output {
    /// No return value
    Unit,

    /// Objects produced by the command
    Objects(ResultSet),

    /// Number of objects affected
    Count(u64),

    /// Boolean result
    Bool(bool),

    // ==================== Index ====================
    /// Subtree scanned into the index
    Indexed {
        /// Number of entries scanned
        count: usize,
        /// The scanned entries, root first
        entries: Vec<IndexEntry>,
    },

    /// Per-path resolution results
    Resolved(Vec<Resolution>),

    // ==================== Query ====================
    /// Objects matching a list query
    Listing(Vec<ObjectRef>),

    /// Game sync groups with their members
    Groups(Vec<GameSyncGroup>),

    /// Registered game objects
    GameObjects(Vec<GameObjectInfo>),

    /// Project summary
    ProjectInfo(ProjectInfo),

    /// Settable properties
    Properties(Vec<PropertyInfo>),

    // ==================== Runtime ====================
    /// Event posted; no playing id when the post was scheduled
    Posted {
        /// Game object the event was posted on
        game_object: GameObjectInfo,
        /// Engine playing id of a direct post
        playing_id: Option<u64>,
    },

    /// Samples issued for a value or position ramp
    Scheduled {
        /// Samples sent, the first directly and the rest scheduled
        samples: usize,
    },

    // ==================== Soundbanks ====================
    /// Soundbanks generated, with the generator's log lines
    Generated {
        /// Generated soundbank names
        soundbanks: Vec<String>,
        /// Generator log lines
        log: Vec<String>,
    },

    // ==================== Subscriptions ====================
    /// Subscription opened
    Subscribed {
        /// Id for `PollEvents` and `Unsubscribe`
        id: SubscriptionId,
        /// Subscribed topic
        topic: String,
    },

    /// Buffered change events
    ChangeEvents(Vec<ChangeEvent>),
}

impl Output {
    /// The objects this output contributes to the result cache, if any.
    pub fn produced(&self) -> Option<ResultSet> {
        match self {
            Output::Objects(set) => Some(set.clone()),
            Output::Indexed { entries, .. } => {
                Some(entries.iter().map(IndexEntry::to_object_ref).collect())
            }
            _ => None,
        }
    }
}
