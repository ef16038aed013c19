//! Hierarchical object paths
//!
//! Remote objects are addressed by backslash-separated paths rooted at one of
//! the project's top-level hierarchies, e.g.
//! `\Actor-Mixer Hierarchy\Default Work Unit\Footsteps`.
//!
//! `ObjectPath` stores the normalized form so that two spellings of the same
//! path always compare equal and hash to the same index slot.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{BridgeError, BridgeResult};

/// Path separator used by the remote project hierarchy.
pub const SEPARATOR: char = '\\';

/// A normalized hierarchical path.
///
/// Normalization:
/// - surrounding whitespace is trimmed
/// - `/` is accepted as an alternate separator
/// - repeated separators collapse to one
/// - exactly one leading separator, no trailing separator
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectPath(String);

impl ObjectPath {
    /// Parse and normalize a path.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if the path has no segments.
    pub fn parse(raw: &str) -> BridgeResult<Self> {
        let segments: Vec<&str> = raw
            .trim()
            .split(|c| c == SEPARATOR || c == '/')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();
        if segments.is_empty() {
            return Err(BridgeError::invalid_input(format!(
                "path '{}' has no segments",
                raw
            )));
        }
        let mut normalized = String::with_capacity(raw.len() + 1);
        for segment in segments {
            normalized.push(SEPARATOR);
            normalized.push_str(segment);
        }
        Ok(ObjectPath(normalized))
    }

    /// The normalized string form.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Last segment of the path.
    pub fn name(&self) -> &str {
        match self.0.rfind(SEPARATOR) {
            Some(pos) => &self.0[pos + 1..],
            None => &self.0,
        }
    }

    /// Parent path, or `None` for a top-level hierarchy.
    pub fn parent(&self) -> Option<ObjectPath> {
        let pos = self.0.rfind(SEPARATOR)?;
        if pos == 0 {
            None
        } else {
            Some(ObjectPath(self.0[..pos].to_string()))
        }
    }

    /// Number of segments.
    pub fn depth(&self) -> usize {
        self.0.matches(SEPARATOR).count()
    }

    /// Append a child segment.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if `name` is empty or contains a separator.
    pub fn join(&self, name: &str) -> BridgeResult<ObjectPath> {
        let name = name.trim();
        if name.is_empty() || name.contains(SEPARATOR) || name.contains('/') {
            return Err(BridgeError::invalid_input(format!(
                "'{}' is not a valid object name",
                name
            )));
        }
        Ok(ObjectPath(format!("{}{}{}", self.0, SEPARATOR, name)))
    }

    /// True if `self` lies strictly below `ancestor`.
    pub fn is_descendant_of(&self, ancestor: &ObjectPath) -> bool {
        self.0.len() > ancestor.0.len()
            && self.0.starts_with(&ancestor.0)
            && self.0[ancestor.0.len()..].starts_with(SEPARATOR)
    }

    /// True if `self` equals `other` or lies below it.
    pub fn is_within(&self, other: &ObjectPath) -> bool {
        self == other || self.is_descendant_of(other)
    }

    /// Replace the `old_prefix` portion of this path with `new_prefix`.
    ///
    /// Returns `None` if `self` is not within `old_prefix`.
    pub fn rebase(&self, old_prefix: &ObjectPath, new_prefix: &ObjectPath) -> Option<ObjectPath> {
        if !self.is_within(old_prefix) {
            return None;
        }
        let suffix = &self.0[old_prefix.0.len()..];
        Some(ObjectPath(format!("{}{}", new_prefix.0, suffix)))
    }
}

impl fmt::Display for ObjectPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for ObjectPath {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ObjectPath::parse(s)
    }
}

impl AsRef<str> for ObjectPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Serialize for ObjectPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ObjectPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        ObjectPath::parse(&raw).map_err(serde::de::Error::custom)
    }
}
