//! Remote object identifiers and produced-object sets

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::{BridgeError, BridgeResult};
use crate::path::ObjectPath;

/// Opaque remote identifier, stable for the object's lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(String);

impl ObjectId {
    /// Wrap a remote identifier string.
    pub fn new(id: impl Into<String>) -> Self {
        ObjectId(id.into())
    }

    /// The identifier as sent over the wire.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ObjectId {
    fn from(s: &str) -> Self {
        ObjectId(s.to_string())
    }
}

/// One remote object: where it lives, what it is called remotely, its kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectRef {
    /// Normalized path
    pub path: ObjectPath,
    /// Remote identifier
    pub id: ObjectId,
    /// Object kind, e.g. `ActorMixer`, `Event`, `Bus`
    #[serde(rename = "type")]
    pub object_type: String,
}

impl ObjectRef {
    /// Build a reference from its parts.
    pub fn new(path: ObjectPath, id: ObjectId, object_type: impl Into<String>) -> Self {
        Self {
            path,
            id,
            object_type: object_type.into(),
        }
    }

    /// Decode an object from a remote JSON record carrying `id`, `path`
    /// and `type` fields.
    ///
    /// # Errors
    ///
    /// Returns `Serialization` if a required field is missing.
    pub fn from_remote(record: &JsonValue) -> BridgeResult<Self> {
        let field = |name: &str| -> BridgeResult<&str> {
            record
                .get(name)
                .and_then(JsonValue::as_str)
                .ok_or_else(|| BridgeError::Serialization {
                    reason: format!("remote object is missing '{}': {}", name, record),
                })
        };
        Ok(Self {
            path: ObjectPath::parse(field("path")?)?,
            id: ObjectId::new(field("id")?),
            object_type: field("type")?.to_string(),
        })
    }
}

/// Ordered set of objects produced by one command.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResultSet(Vec<ObjectRef>);

impl ResultSet {
    /// Empty set.
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Number of objects.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if no objects were produced.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate in production order.
    pub fn iter(&self) -> std::slice::Iter<'_, ObjectRef> {
        self.0.iter()
    }

    /// Paths in production order.
    pub fn paths(&self) -> Vec<ObjectPath> {
        self.0.iter().map(|o| o.path.clone()).collect()
    }

    /// Ids in production order.
    pub fn ids(&self) -> Vec<ObjectId> {
        self.0.iter().map(|o| o.id.clone()).collect()
    }

    /// Borrow the underlying objects.
    pub fn as_slice(&self) -> &[ObjectRef] {
        &self.0
    }

    /// Append an object.
    pub fn push(&mut self, object: ObjectRef) {
        self.0.push(object);
    }
}

impl From<Vec<ObjectRef>> for ResultSet {
    fn from(objects: Vec<ObjectRef>) -> Self {
        Self(objects)
    }
}

impl FromIterator<ObjectRef> for ResultSet {
    fn from_iter<I: IntoIterator<Item = ObjectRef>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for ResultSet {
    type Item = ObjectRef;
    type IntoIter = std::vec::IntoIter<ObjectRef>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_remote() {
        let record = json!({"id": "{A1}", "path": "\\Root\\A", "type": "Folder", "name": "A"});
        let obj = ObjectRef::from_remote(&record).unwrap();
        assert_eq!(obj.id.as_str(), "{A1}");
        assert_eq!(obj.path.as_str(), "\\Root\\A");
        assert_eq!(obj.object_type, "Folder");
    }

    #[test]
    fn test_from_remote_missing_field() {
        let record = json!({"id": "{A1}", "type": "Folder"});
        assert!(matches!(
            ObjectRef::from_remote(&record),
            Err(BridgeError::Serialization { .. })
        ));
    }

    #[test]
    fn test_result_set_serializes_type_field() {
        let set: ResultSet = vec![ObjectRef::new(
            ObjectPath::parse("\\Root\\A").unwrap(),
            ObjectId::from("{A1}"),
            "Folder",
        )]
        .into();
        let json = serde_json::to_value(&set).unwrap();
        assert_eq!(json[0]["type"], "Folder");
        assert_eq!(set.paths(), vec![ObjectPath::parse("\\Root\\A").unwrap()]);
    }
}
