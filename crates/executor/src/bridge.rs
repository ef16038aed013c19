//! Bridge module: what a handler may touch while a command runs.
//!
//! [`Remote`] borrows the parts of a [`SessionContext`](crate::SessionContext)
//! for the duration of one command:
//!
//! - the session handle, for calls and scheduled calls
//! - the path index, for resolution and bookkeeping
//! - the result cache (read-only; the executor writes it)
//! - the set of objects touched by the running plan
//!
//! It also holds the helpers shared by every handler: selector resolution,
//! remote reply decoding and name validation.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use bridge_core::{ObjectId, ObjectPath, ObjectRef};
use bridge_index::{IndexEntry, PathIndex, ResultCache};
use bridge_session::{SessionHandle, Subscription, SubscriptionId};
use serde_json::{json, Value as JsonValue};
use tracing::debug;

use crate::convert::convert_result;
use crate::{BridgeConfig, Error, Result, Selector};

/// Borrowed session state for one command.
pub(crate) struct Remote<'a> {
    pub session: &'a mut dyn SessionHandle,
    pub index: &'a mut PathIndex,
    pub cache: &'a ResultCache,
    pub config: &'a BridgeConfig,
    pub subscriptions: &'a mut HashMap<SubscriptionId, Subscription>,
    pub touched: &'a mut HashSet<ObjectId>,
    pub reuse_previous: bool,
}

impl Remote<'_> {
    // =========================================================================
    // Calls
    // =========================================================================

    /// Call `method` with an empty option set.
    pub fn call(&mut self, method: &str, args: JsonValue) -> Result<JsonValue> {
        self.call_with(method, args, json!({}))
    }

    /// Call `method` with explicit options.
    pub fn call_with(&mut self, method: &str, args: JsonValue, options: JsonValue) -> Result<JsonValue> {
        debug!(target: "bridge::session", method, "Remote call");
        convert_result(self.session.call(method, args, options))
    }

    /// Issue `method` after `due_in` without waiting.
    pub fn schedule(&mut self, method: &str, args: JsonValue, due_in: Duration) -> Result<()> {
        convert_result(self.session.schedule(method, args, due_in))
    }

    // =========================================================================
    // Target resolution
    // =========================================================================

    /// Objects a selector names.
    ///
    /// Explicit paths go through the index as one batch; the first path
    /// that does not resolve fails the whole selection.
    ///
    /// # Errors
    ///
    /// `NoPreviousResults` when the selector reads an empty cache,
    /// `NotFound` for a missing path.
    pub fn select(&mut self, selector: &Selector) -> Result<Vec<ObjectRef>> {
        if selector.uses_previous(self.reuse_previous) {
            return match self.cache.get() {
                Some(set) if !set.is_empty() => Ok(set.iter().cloned().collect()),
                _ => Err(Error::NoPreviousResults),
            };
        }
        let Selector::Paths(paths) = selector else {
            return Err(Error::NoPreviousResults);
        };
        if paths.is_empty() {
            return Err(Error::invalid_input("selector names no objects"));
        }
        self.index
            .resolve_entries(&mut *self.session, paths)
            .into_iter()
            .map(|r| convert_result(r).map(|e| e.to_object_ref()))
            .collect()
    }

    /// Resolve one path through the index.
    pub fn resolve(&mut self, path: &ObjectPath) -> Result<IndexEntry> {
        convert_result(self.index.resolve_entry(&mut *self.session, path))
    }

    /// Resolve `path`, or `fallback` when no path is given.
    pub fn resolve_or(&mut self, path: Option<&ObjectPath>, fallback: &str) -> Result<IndexEntry> {
        match path {
            Some(path) => self.resolve(path),
            None => self.resolve(&ObjectPath::parse(fallback)?),
        }
    }

    // =========================================================================
    // Bookkeeping
    // =========================================================================

    /// Mark an object as changed by the running plan.
    pub fn touch(&mut self, id: &ObjectId) {
        self.touched.insert(id.clone());
    }

    /// Record an object created under `parent` and return its reference.
    pub fn record_created(
        &mut self,
        parent: &ObjectPath,
        id: ObjectId,
        name: &str,
        object_type: &str,
    ) -> Result<ObjectRef> {
        let path = parent.join(name)?;
        self.index
            .record(path.clone(), id.clone(), object_type, Some(parent.clone()));
        self.touch(&id);
        Ok(ObjectRef::new(path, id, object_type))
    }
}

// =============================================================================
// Reply decoding
// =============================================================================

/// The `id` and `name` of a create/move reply.
pub(crate) fn id_and_name(method: &str, reply: &JsonValue) -> Result<(ObjectId, String)> {
    let field = |key: &str| {
        reply
            .get(key)
            .and_then(JsonValue::as_str)
            .ok_or_else(|| Error::Serialization {
                reason: format!("{} reply has no '{}': {}", method, key, reply),
            })
    };
    Ok((ObjectId::new(field("id")?), field("name")?.to_string()))
}

/// The array under `key` of a reply.
pub(crate) fn reply_list<'r>(method: &str, reply: &'r JsonValue, key: &str) -> Result<&'r Vec<JsonValue>> {
    reply
        .get(key)
        .and_then(JsonValue::as_array)
        .ok_or_else(|| Error::Serialization {
            reason: format!("{} reply has no '{}' list: {}", method, key, reply),
        })
}

// =============================================================================
// Validation helpers
// =============================================================================

/// Reject empty names and names containing the path separator.
pub(crate) fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::invalid_input("object names must not be empty"));
    }
    if name.contains('\\') || name.contains('/') {
        return Err(Error::invalid_input(format!(
            "object name '{}' must not contain a path separator",
            name
        )));
    }
    Ok(())
}

/// Reject batches whose parallel lists differ in length.
pub(crate) fn require_parallel(what: &str, left: usize, right: usize) -> Result<()> {
    if left != right {
        return Err(Error::invalid_input(format!(
            "{}: expected {} entries, got {}",
            what, left, right
        )));
    }
    Ok(())
}

/// Spread `items` over a batch of `count` entries. A single item applies to
/// every entry; otherwise the lists must be parallel.
pub(crate) fn spread<'t, T>(what: &str, items: &'t [T], count: usize) -> Result<Vec<&'t T>> {
    if let [single] = items {
        return Ok(vec![single; count]);
    }
    require_parallel(what, count, items.len())?;
    Ok(items.iter().collect())
}

/// Reject an empty batch.
pub(crate) fn require_non_empty<T>(what: &str, items: &[T]) -> Result<()> {
    if items.is_empty() {
        return Err(Error::invalid_input(format!("{} must not be empty", what)));
    }
    Ok(())
}
