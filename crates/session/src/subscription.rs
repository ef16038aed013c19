//! Change notifications delivered by the session
//!
//! Delivery never blocks the session: the producer pushes into a shared
//! buffer and the bridge drains it when it next looks.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use bridge_core::{ObjectId, ObjectPath};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of one subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriptionId(Uuid);

impl SubscriptionId {
    /// Fresh random id.
    pub fn new() -> Self {
        SubscriptionId(Uuid::new_v4())
    }
}

impl Default for SubscriptionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One change notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    /// Topic the event was published on
    pub topic: String,
    /// Object the event is about
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_id: Option<ObjectId>,
    /// Path of the object before the change (after it, for creations)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<ObjectPath>,
    /// Path after a rename or move
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_path: Option<ObjectPath>,
}

impl ChangeEvent {
    /// Event about `object_id` at `path`.
    pub fn new(topic: impl Into<String>, object_id: Option<ObjectId>, path: Option<ObjectPath>) -> Self {
        Self {
            topic: topic.into(),
            object_id,
            path,
            new_path: None,
        }
    }

    /// Attach the post-change path.
    pub fn with_new_path(mut self, new_path: ObjectPath) -> Self {
        self.new_path = Some(new_path);
        self
    }
}

pub(crate) type EventBuffer = Arc<Mutex<VecDeque<ChangeEvent>>>;

/// Receiving end of a topic subscription.
#[derive(Debug, Clone)]
pub struct Subscription {
    id: SubscriptionId,
    topic: String,
    buffer: EventBuffer,
}

impl Subscription {
    /// New subscription on `topic` with an empty buffer.
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            id: SubscriptionId::new(),
            topic: topic.into(),
            buffer: Arc::new(Mutex::new(VecDeque::new())),
        }
    }

    /// Subscription id.
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Subscribed topic.
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Number of buffered events.
    pub fn pending(&self) -> usize {
        self.buffer.lock().len()
    }

    /// Push an event into the buffer.
    pub fn deliver(&self, event: ChangeEvent) {
        self.buffer.lock().push_back(event);
    }

    /// Take up to `max` buffered events, oldest first.
    pub fn drain(&self, max: usize) -> Vec<ChangeEvent> {
        let mut buffer = self.buffer.lock();
        let n = max.min(buffer.len());
        buffer.drain(..n).collect()
    }

    /// Take every buffered event.
    pub fn drain_all(&self) -> Vec<ChangeEvent> {
        self.buffer.lock().drain(..).collect()
    }
}
