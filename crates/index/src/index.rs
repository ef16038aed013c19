//! Bidirectional path/id index over scanned subtrees
//!
//! Entries live in an ordered map keyed by path so that a subtree is one
//! contiguous range: every descendant of `\A\B` shares the textual prefix
//! `\A\B`. A reverse map from id to path serves move/rename bookkeeping and
//! change events that only carry an id.
//!
//! Invariants:
//! - `by_id` and `entries` describe the same set of objects
//! - an entry's `parent_path`, when set, names an indexed entry
//! - a stale entry is never served without a remote lookup

use std::collections::{BTreeMap, HashMap};

use bridge_core::{BridgeError, BridgeResult, ObjectId, ObjectPath, ObjectRef};
use bridge_session::{methods, SessionHandle};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};
use tracing::debug;

/// One remote object known to the index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    /// Normalized path, unique within the index
    pub path: ObjectPath,
    /// Remote identifier
    pub object_id: ObjectId,
    /// Object kind
    #[serde(rename = "type")]
    pub object_type: String,
    /// Parent entry, if the parent is indexed
    pub parent_path: Option<ObjectPath>,
    /// Set when an external change may have invalidated the entry
    #[serde(default)]
    pub stale: bool,
}

impl IndexEntry {
    /// The entry as a produced-object record.
    pub fn to_object_ref(&self) -> ObjectRef {
        ObjectRef::new(self.path.clone(), self.object_id.clone(), self.object_type.clone())
    }
}

/// Lookup counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStats {
    /// Resolutions served from the index
    pub hits: u64,
    /// Resolutions that needed the remote session
    pub misses: u64,
    /// Remote lookup requests issued (a batch counts once)
    pub remote_lookups: u64,
}

/// Undo record for one entry-level mutation.
#[derive(Debug, Clone)]
enum JournalOp {
    /// `path` was written; `previous` is what it held before
    Put {
        path: ObjectPath,
        previous: Option<IndexEntry>,
    },
    /// `entry` was removed
    Take { entry: IndexEntry },
    /// The scanned-root list was replaced
    Roots { previous: Vec<ObjectPath> },
}

/// Path index.
#[derive(Debug, Default)]
pub struct PathIndex {
    entries: BTreeMap<ObjectPath, IndexEntry>,
    by_id: HashMap<ObjectId, ObjectPath>,
    roots: Vec<ObjectPath>,
    journal: Option<Vec<JournalOp>>,
    stats: IndexStats,
}

const LOOKUP_FIELDS: [&str; 3] = ["id", "type", "path"];

fn fetch(session: &mut dyn SessionHandle, args: JsonValue) -> BridgeResult<Vec<ObjectRef>> {
    let reply = session.call(methods::OBJECT_GET, args, json!({ "return": LOOKUP_FIELDS }))?;
    reply
        .get("return")
        .and_then(JsonValue::as_array)
        .ok_or_else(|| BridgeError::Serialization {
            reason: format!("object query reply has no 'return' list: {}", reply),
        })?
        .iter()
        .map(ObjectRef::from_remote)
        .collect()
}

impl PathIndex {
    /// Empty index.
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------
    // Entry-level mutation; every change to `entries` goes through here so
    // the journal and the reverse map stay in step.
    // ------------------------------------------------------------------

    fn log(&mut self, op: JournalOp) {
        if let Some(journal) = self.journal.as_mut() {
            journal.push(op);
        }
    }

    fn put(&mut self, mut entry: IndexEntry) {
        if let Some(old_path) = self.by_id.get(&entry.object_id).cloned() {
            if old_path != entry.path {
                // the object moved; its indexed descendants go with it
                if entry.path.is_within(&old_path) {
                    self.remove_subtree(&old_path);
                } else {
                    self.relocate(&old_path, &entry.path);
                }
                entry.parent_path = entry.parent_path.filter(|p| self.entries.contains_key(p));
            }
        }
        let path = entry.path.clone();
        self.by_id.insert(entry.object_id.clone(), path.clone());
        let previous = self.entries.insert(path.clone(), entry);
        if let Some(prev) = &previous {
            if self.by_id.get(&prev.object_id) == Some(&path)
                && self.entries.get(&path).map(|e| &e.object_id) != Some(&prev.object_id)
            {
                self.by_id.remove(&prev.object_id);
            }
        }
        self.log(JournalOp::Put { path, previous });
    }

    fn take(&mut self, path: &ObjectPath) -> Option<IndexEntry> {
        let entry = self.entries.remove(path)?;
        if self.by_id.get(&entry.object_id) == Some(path) {
            self.by_id.remove(&entry.object_id);
        }
        self.log(JournalOp::Take { entry: entry.clone() });
        Some(entry)
    }

    fn set_roots(&mut self, roots: Vec<ObjectPath>) {
        let previous = std::mem::replace(&mut self.roots, roots);
        self.log(JournalOp::Roots { previous });
    }

    fn subtree_paths(&self, root: &ObjectPath) -> Vec<ObjectPath> {
        self.entries
            .range(root.clone()..)
            .take_while(|(path, _)| path.as_str().starts_with(root.as_str()))
            .filter(|(path, _)| path.is_within(root))
            .map(|(path, _)| path.clone())
            .collect()
    }

    /// Parent link for `path`: its parent if that parent is indexed.
    fn parent_link(&self, path: &ObjectPath) -> Option<ObjectPath> {
        path.parent().filter(|p| self.entries.contains_key(p))
    }

    fn insert_remote(&mut self, object: ObjectRef) -> IndexEntry {
        let entry = IndexEntry {
            parent_path: self.parent_link(&object.path),
            path: object.path,
            object_id: object.id,
            object_type: object.object_type,
            stale: false,
        };
        self.put(entry.clone());
        entry
    }

    // ------------------------------------------------------------------
    // Scanning
    // ------------------------------------------------------------------

    fn scan(&mut self, session: &mut dyn SessionHandle, root: &ObjectPath) -> BridgeResult<Vec<ObjectRef>> {
        self.stats.remote_lookups += 1;
        let found = fetch(session, json!({ "from": { "path": [root.as_str()] } }))?;
        let Some(root_ref) = found.into_iter().next() else {
            return Err(BridgeError::Resolution {
                path: root.to_string(),
                reason: "scan root does not exist".to_string(),
            });
        };
        self.stats.remote_lookups += 1;
        let descendants = fetch(
            session,
            json!({
                "from": { "path": [root.as_str()] },
                "transform": [{ "select": ["descendants"] }],
            }),
        )?;
        let mut objects = Vec::with_capacity(descendants.len() + 1);
        objects.push(root_ref);
        objects.extend(descendants);
        Ok(objects)
    }

    fn load(&mut self, objects: Vec<ObjectRef>) -> usize {
        let mut sorted = objects;
        // parents before children so parent links resolve
        sorted.sort_by_key(|o| o.path.depth());
        let count = sorted.len();
        for object in sorted {
            self.insert_remote(object);
        }
        count
    }

    /// Scan `root` and replace the index with its subtree.
    ///
    /// Returns the number of entries, the root included.
    ///
    /// # Errors
    ///
    /// `Resolution` if `root` does not exist remotely; session errors as-is.
    /// The index is untouched on error.
    pub fn build(&mut self, session: &mut dyn SessionHandle, root: &ObjectPath) -> BridgeResult<usize> {
        let objects = self.scan(session, root)?;
        let stale_paths: Vec<ObjectPath> = self.entries.keys().cloned().collect();
        for path in stale_paths {
            self.take(&path);
        }
        self.set_roots(vec![root.clone()]);
        let count = self.load(objects);
        debug!(target: "bridge::index", root = %root, count, "Built index");
        Ok(count)
    }

    /// Scan `root` and merge its subtree into the index.
    ///
    /// # Errors
    ///
    /// Same as [`PathIndex::build`].
    pub fn extend(&mut self, session: &mut dyn SessionHandle, root: &ObjectPath) -> BridgeResult<usize> {
        let objects = self.scan(session, root)?;
        for path in self.subtree_paths(root) {
            self.take(&path);
        }
        if !self.roots.iter().any(|r| root.is_within(r)) {
            let mut roots: Vec<ObjectPath> = self.roots.iter().filter(|r| !r.is_within(root)).cloned().collect();
            roots.push(root.clone());
            self.set_roots(roots);
        }
        let count = self.load(objects);
        debug!(target: "bridge::index", root = %root, count, "Extended index");
        Ok(count)
    }

    // ------------------------------------------------------------------
    // Resolution
    // ------------------------------------------------------------------

    fn forget_missing(&mut self, path: &ObjectPath) {
        let removed = self.remove_subtree(path);
        if removed > 0 {
            debug!(target: "bridge::index", path = %path, removed, "Dropped entries that no longer exist");
        }
    }

    /// Resolve `path` to its entry, from the index when fresh, otherwise
    /// with one remote lookup whose result is cached.
    ///
    /// # Errors
    ///
    /// `NotFound` if the path does not exist remotely. A stale entry that
    /// turns out to be gone is removed with its descendants.
    pub fn resolve_entry(&mut self, session: &mut dyn SessionHandle, path: &ObjectPath) -> BridgeResult<IndexEntry> {
        if let Some(entry) = self.entries.get(path).filter(|e| !e.stale) {
            self.stats.hits += 1;
            return Ok(entry.clone());
        }
        self.stats.misses += 1;
        self.stats.remote_lookups += 1;
        let found = fetch(session, json!({ "from": { "path": [path.as_str()] } }))?;
        match found.into_iter().find(|o| &o.path == path) {
            Some(object) => Ok(self.insert_remote(object)),
            None => {
                self.forget_missing(path);
                Err(BridgeError::not_found(path.as_str()))
            }
        }
    }

    /// Resolve `path` to its remote id.
    ///
    /// # Errors
    ///
    /// See [`PathIndex::resolve_entry`].
    pub fn resolve(&mut self, session: &mut dyn SessionHandle, path: &ObjectPath) -> BridgeResult<ObjectId> {
        self.resolve_entry(session, path).map(|e| e.object_id)
    }

    /// Resolve a batch of paths. Fresh entries are served from the index;
    /// all misses go out as one remote lookup. Results are parallel to
    /// `paths` and fail per item.
    pub fn resolve_entries(
        &mut self,
        session: &mut dyn SessionHandle,
        paths: &[ObjectPath],
    ) -> Vec<BridgeResult<IndexEntry>> {
        let mut results: Vec<Option<BridgeResult<IndexEntry>>> = Vec::with_capacity(paths.len());
        let mut misses: Vec<ObjectPath> = Vec::new();
        for path in paths {
            match self.entries.get(path).filter(|e| !e.stale) {
                Some(entry) => {
                    self.stats.hits += 1;
                    results.push(Some(Ok(entry.clone())));
                }
                None => {
                    self.stats.misses += 1;
                    if !misses.contains(path) {
                        misses.push(path.clone());
                    }
                    results.push(None);
                }
            }
        }

        if !misses.is_empty() {
            self.stats.remote_lookups += 1;
            let wanted: Vec<&str> = misses.iter().map(ObjectPath::as_str).collect();
            match fetch(session, json!({ "from": { "path": wanted } })) {
                Ok(found) => {
                    let mut by_path: HashMap<ObjectPath, IndexEntry> = HashMap::new();
                    for object in found {
                        let entry = self.insert_remote(object);
                        by_path.insert(entry.path.clone(), entry);
                    }
                    for path in &misses {
                        if !by_path.contains_key(path) {
                            self.forget_missing(path);
                        }
                    }
                    for (slot, path) in results.iter_mut().zip(paths) {
                        if slot.is_none() {
                            *slot = Some(
                                by_path
                                    .get(path)
                                    .cloned()
                                    .ok_or_else(|| BridgeError::not_found(path.as_str())),
                            );
                        }
                    }
                }
                Err(e) => {
                    for slot in results.iter_mut().filter(|s| s.is_none()) {
                        *slot = Some(Err(e.clone()));
                    }
                }
            }
        }

        results
            .into_iter()
            .map(|r| r.unwrap_or_else(|| Err(BridgeError::internal("unresolved batch slot"))))
            .collect()
    }

    /// Batch variant of [`PathIndex::resolve`].
    pub fn resolve_many(&mut self, session: &mut dyn SessionHandle, paths: &[ObjectPath]) -> Vec<BridgeResult<ObjectId>> {
        self.resolve_entries(session, paths)
            .into_iter()
            .map(|r| r.map(|e| e.object_id))
            .collect()
    }

    // ------------------------------------------------------------------
    // Local bookkeeping
    // ------------------------------------------------------------------

    /// Record an object the bridge just created or relocated, without a
    /// remote round trip. A `parent_path` that is not indexed is dropped.
    pub fn record(
        &mut self,
        path: ObjectPath,
        object_id: ObjectId,
        object_type: impl Into<String>,
        parent_path: Option<ObjectPath>,
    ) {
        let parent_path = parent_path.filter(|p| self.entries.contains_key(p));
        self.put(IndexEntry {
            path,
            object_id,
            object_type: object_type.into(),
            parent_path,
            stale: false,
        });
    }

    fn relocate(&mut self, old: &ObjectPath, new: &ObjectPath) -> usize {
        let moved: Vec<IndexEntry> = self
            .subtree_paths(old)
            .iter()
            .filter_map(|p| self.take(p))
            .collect();
        let count = moved.len();
        for mut entry in moved {
            if let Some(rebased) = entry.path.rebase(old, new) {
                entry.path = rebased;
            }
            entry.parent_path = if &entry.path == new {
                None
            } else {
                entry.parent_path.and_then(|p| p.rebase(old, new))
            };
            self.put(entry);
        }
        if let Some(mut top) = self.entries.get(new).cloned() {
            let link = self.parent_link(new);
            if top.parent_path != link {
                top.parent_path = link;
                self.put(top);
            }
        }
        count
    }

    /// Rewrite `old` and every descendant key to live under `new`.
    ///
    /// Returns the number of entries rewritten; zero if `old` was not indexed.
    pub fn rename_subtree(&mut self, old: &ObjectPath, new: &ObjectPath) -> usize {
        let count = self.relocate(old, new);
        debug!(target: "bridge::index", from = %old, to = %new, count, "Renamed subtree");
        count
    }

    /// Rewrite `old` and its descendants to live under `new_parent`, keeping
    /// the name.
    ///
    /// # Errors
    ///
    /// `InvalidInput` if the object would move under itself.
    pub fn move_subtree(&mut self, old: &ObjectPath, new_parent: &ObjectPath) -> BridgeResult<usize> {
        if new_parent.is_within(old) {
            return Err(BridgeError::invalid_input(format!(
                "cannot move {} under its own descendant {}",
                old, new_parent
            )));
        }
        let new = new_parent.join(old.name())?;
        let count = self.relocate(old, &new);
        debug!(target: "bridge::index", from = %old, to = %new, count, "Moved subtree");
        Ok(count)
    }

    /// Remove `path` and its descendants. Returns how many entries went.
    pub fn remove_subtree(&mut self, path: &ObjectPath) -> usize {
        let doomed = self.subtree_paths(path);
        let count = doomed.len();
        for p in doomed {
            self.take(&p);
        }
        count
    }

    /// Mark `path` and its descendants stale. Returns how many entries were
    /// marked.
    pub fn invalidate(&mut self, path: &ObjectPath) -> usize {
        let targets: Vec<IndexEntry> = self
            .subtree_paths(path)
            .iter()
            .filter_map(|p| self.entries.get(p))
            .filter(|e| !e.stale)
            .cloned()
            .collect();
        let count = targets.len();
        for mut entry in targets {
            entry.stale = true;
            self.put(entry);
        }
        if count > 0 {
            debug!(target: "bridge::index", path = %path, count, "Invalidated entries");
        }
        count
    }

    /// Mark the entry for `id` and its descendants stale.
    pub fn invalidate_id(&mut self, id: &ObjectId) -> usize {
        match self.by_id.get(id).cloned() {
            Some(path) => self.invalidate(&path),
            None => 0,
        }
    }

    /// Mark every entry stale.
    pub fn invalidate_all(&mut self) -> usize {
        let paths: Vec<ObjectPath> = self.entries.keys().cloned().collect();
        let count = paths.iter().map(|p| self.invalidate(p)).sum();
        debug!(target: "bridge::index", count, "Invalidated whole index");
        count
    }

    /// Drop every entry and the scanned roots.
    pub fn clear(&mut self) {
        let paths: Vec<ObjectPath> = self.entries.keys().cloned().collect();
        for path in paths {
            self.take(&path);
        }
        self.set_roots(Vec::new());
    }

    // ------------------------------------------------------------------
    // Journal
    // ------------------------------------------------------------------

    /// Start recording undo information. A journal already open is kept.
    pub fn begin_journal(&mut self) {
        if self.journal.is_none() {
            self.journal = Some(Vec::new());
        }
    }

    /// Stop recording and keep all changes.
    pub fn commit_journal(&mut self) {
        self.journal = None;
    }

    /// Undo every change since [`PathIndex::begin_journal`]. Returns the
    /// number of undone operations.
    pub fn rollback_journal(&mut self) -> usize {
        let Some(journal) = self.journal.take() else {
            return 0;
        };
        let count = journal.len();
        for op in journal.into_iter().rev() {
            match op {
                JournalOp::Put { path, previous } => {
                    if let Some(current) = self.entries.remove(&path) {
                        if self.by_id.get(&current.object_id) == Some(&path) {
                            self.by_id.remove(&current.object_id);
                        }
                    }
                    if let Some(prev) = previous {
                        self.by_id.insert(prev.object_id.clone(), path.clone());
                        self.entries.insert(path, prev);
                    }
                }
                JournalOp::Take { entry } => {
                    self.by_id.insert(entry.object_id.clone(), entry.path.clone());
                    self.entries.insert(entry.path.clone(), entry);
                }
                JournalOp::Roots { previous } => self.roots = previous,
            }
        }
        debug!(target: "bridge::index", count, "Rolled back index journal");
        count
    }

    /// Whether a journal is open.
    pub fn journal_open(&self) -> bool {
        self.journal.is_some()
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Entry at `path`, stale or not.
    pub fn get(&self, path: &ObjectPath) -> Option<&IndexEntry> {
        self.entries.get(path)
    }

    /// Whether `path` has an entry.
    pub fn contains(&self, path: &ObjectPath) -> bool {
        self.entries.contains_key(path)
    }

    /// Whether the entry at `path` is stale. False if absent.
    pub fn is_stale(&self, path: &ObjectPath) -> bool {
        self.entries.get(path).map_or(false, |e| e.stale)
    }

    /// Path of the object with `id`.
    pub fn lookup_id(&self, id: &ObjectId) -> Option<&ObjectPath> {
        self.by_id.get(id)
    }

    /// Flattened subtree rooted at `root`, in path order.
    pub fn entries_under(&self, root: &ObjectPath) -> Vec<IndexEntry> {
        self.subtree_paths(root)
            .iter()
            .filter_map(|p| self.entries.get(p).cloned())
            .collect()
    }

    /// Every entry in path order.
    pub fn entries(&self) -> impl Iterator<Item = &IndexEntry> {
        self.entries.values()
    }

    /// Scanned roots.
    pub fn roots(&self) -> &[ObjectPath] {
        &self.roots
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if the index holds nothing.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Lookup counters.
    pub fn stats(&self) -> IndexStats {
        self.stats
    }

    /// Zero the lookup counters.
    pub fn reset_stats(&mut self) {
        self.stats = IndexStats::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_session::MemoryProject;
    use proptest::prelude::*;

    const UNIT: &str = "\\Actor-Mixer Hierarchy\\Default Work Unit";

    fn p(s: &str) -> ObjectPath {
        ObjectPath::parse(s).unwrap()
    }

    fn setup() -> (MemoryProject, bridge_session::MemorySession) {
        let project = MemoryProject::new();
        project.add_path(&format!("{}\\Root\\A\\Leaf", UNIT), "Sound").unwrap();
        project.add_path(&format!("{}\\Root\\B", UNIT), "ActorMixer").unwrap();
        let session = project.session();
        (project, session)
    }

    #[test]
    fn test_build_indexes_subtree() {
        let (_project, mut session) = setup();
        let mut index = PathIndex::new();
        let root = p(&format!("{}\\Root", UNIT));
        let count = index.build(&mut session, &root).unwrap();
        assert_eq!(count, 4);
        let leaf = index.get(&p(&format!("{}\\Root\\A\\Leaf", UNIT))).unwrap();
        assert_eq!(leaf.object_type, "Sound");
        assert_eq!(leaf.parent_path, Some(p(&format!("{}\\Root\\A", UNIT))));
        assert_eq!(index.get(&root).unwrap().parent_path, None);
        assert_eq!(index.roots(), &[root]);
    }

    #[test]
    fn test_build_missing_root() {
        let (_project, mut session) = setup();
        let mut index = PathIndex::new();
        let err = index.build(&mut session, &p("\\Nowhere")).unwrap_err();
        assert!(matches!(err, BridgeError::Resolution { .. }));
        assert!(index.is_empty());
    }

    #[test]
    fn test_build_replaces_and_extend_merges() {
        let (_project, mut session) = setup();
        let mut index = PathIndex::new();
        index.build(&mut session, &p(&format!("{}\\Root\\A", UNIT))).unwrap();
        index.build(&mut session, &p(&format!("{}\\Root\\B", UNIT))).unwrap();
        assert_eq!(index.len(), 1);
        index.extend(&mut session, &p(&format!("{}\\Root\\A", UNIT))).unwrap();
        assert_eq!(index.len(), 3);
        assert_eq!(index.roots().len(), 2);
    }

    #[test]
    fn test_build_is_idempotent() {
        let (_project, mut session) = setup();
        let mut index = PathIndex::new();
        let root = p(&format!("{}\\Root", UNIT));
        index.build(&mut session, &root).unwrap();
        let first = index.entries_under(&root);
        index.build(&mut session, &root).unwrap();
        assert_eq!(index.entries_under(&root), first);
    }

    #[test]
    fn test_resolve_hits_cache_after_record() {
        let (_project, mut session) = setup();
        let mut index = PathIndex::new();
        let path = p(&format!("{}\\Root\\New", UNIT));
        index.record(path.clone(), ObjectId::from("{NEW}"), "Sound", None);
        let before = index.stats().remote_lookups;
        assert_eq!(index.resolve(&mut session, &path).unwrap(), ObjectId::from("{NEW}"));
        assert_eq!(index.stats().remote_lookups, before);
        assert_eq!(index.stats().hits, 1);
    }

    #[test]
    fn test_invalidate_forces_one_lookup() {
        let (project, mut session) = setup();
        let mut index = PathIndex::new();
        let root = p(&format!("{}\\Root", UNIT));
        index.build(&mut session, &root).unwrap();
        let leaf = p(&format!("{}\\Root\\A\\Leaf", UNIT));

        assert_eq!(index.invalidate(&p(&format!("{}\\Root\\A", UNIT))), 2);
        assert!(index.is_stale(&leaf));
        project.reset_counters();
        index.resolve(&mut session, &leaf).unwrap();
        assert_eq!(project.call_count(methods::OBJECT_GET), 1);
        index.resolve(&mut session, &leaf).unwrap();
        assert_eq!(project.call_count(methods::OBJECT_GET), 1);
    }

    #[test]
    fn test_stale_entry_gone_remotely_is_removed() {
        let (project, mut session) = setup();
        let mut index = PathIndex::new();
        index.build(&mut session, &p(&format!("{}\\Root", UNIT))).unwrap();
        project.delete(&format!("{}\\Root\\A", UNIT)).unwrap();
        let a = p(&format!("{}\\Root\\A", UNIT));
        index.invalidate(&a);
        assert!(matches!(index.resolve(&mut session, &a), Err(BridgeError::NotFound { .. })));
        assert!(!index.contains(&a));
        assert!(!index.contains(&p(&format!("{}\\Root\\A\\Leaf", UNIT))));
    }

    #[test]
    fn test_resolve_many_batches_misses() {
        let (project, mut session) = setup();
        let mut index = PathIndex::new();
        let a = p(&format!("{}\\Root\\A", UNIT));
        let b = p(&format!("{}\\Root\\B", UNIT));
        let missing = p(&format!("{}\\Root\\Missing", UNIT));
        index.record(a.clone(), ObjectId::from("{A}"), "Folder", None);
        project.reset_counters();

        let results = index.resolve_many(&mut session, &[a.clone(), missing.clone(), b.clone()]);
        assert_eq!(results[0], Ok(ObjectId::from("{A}")));
        assert!(matches!(results[1], Err(BridgeError::NotFound { .. })));
        assert!(results[2].is_ok());
        assert_eq!(project.call_count(methods::OBJECT_GET), 1);
    }

    #[test]
    fn test_rename_subtree_rewrites_descendants() {
        let (_project, mut session) = setup();
        let mut index = PathIndex::new();
        index.build(&mut session, &p(&format!("{}\\Root", UNIT))).unwrap();
        let leaf_id = index.get(&p(&format!("{}\\Root\\A\\Leaf", UNIT))).unwrap().object_id.clone();

        let count = index.rename_subtree(&p(&format!("{}\\Root\\A", UNIT)), &p(&format!("{}\\Root\\Z", UNIT)));
        assert_eq!(count, 2);
        let moved = index.get(&p(&format!("{}\\Root\\Z\\Leaf", UNIT))).unwrap();
        assert_eq!(moved.object_id, leaf_id);
        assert_eq!(moved.parent_path, Some(p(&format!("{}\\Root\\Z", UNIT))));
        assert_eq!(index.lookup_id(&leaf_id), Some(&p(&format!("{}\\Root\\Z\\Leaf", UNIT))));
        assert!(!index.contains(&p(&format!("{}\\Root\\A", UNIT))));
    }

    #[test]
    fn test_move_subtree() {
        let (_project, mut session) = setup();
        let mut index = PathIndex::new();
        index.build(&mut session, &p(&format!("{}\\Root", UNIT))).unwrap();
        let a = p(&format!("{}\\Root\\A", UNIT));
        let b = p(&format!("{}\\Root\\B", UNIT));
        assert_eq!(index.move_subtree(&a, &b).unwrap(), 2);
        let moved = index.get(&p(&format!("{}\\Root\\B\\A", UNIT))).unwrap();
        assert_eq!(moved.parent_path, Some(b.clone()));
        assert!(index.contains(&p(&format!("{}\\Root\\B\\A\\Leaf", UNIT))));
        assert!(index.move_subtree(&b, &p(&format!("{}\\Root\\B\\A", UNIT))).is_err());
    }

    #[test]
    fn test_journal_rollback_restores_entries() {
        let (_project, mut session) = setup();
        let mut index = PathIndex::new();
        let root = p(&format!("{}\\Root", UNIT));
        index.build(&mut session, &root).unwrap();
        let before = index.entries_under(&root);

        index.begin_journal();
        index.record(p(&format!("{}\\Root\\New", UNIT)), ObjectId::from("{NEW}"), "Sound", Some(root.clone()));
        index.rename_subtree(&p(&format!("{}\\Root\\A", UNIT)), &p(&format!("{}\\Root\\Q", UNIT)));
        index.invalidate(&p(&format!("{}\\Root\\B", UNIT)));
        assert!(index.rollback_journal() > 0);

        assert_eq!(index.entries_under(&root), before);
        assert_eq!(index.lookup_id(&ObjectId::from("{NEW}")), None);
        assert!(!index.journal_open());
    }

    #[test]
    fn test_record_drops_dangling_parent() {
        let mut index = PathIndex::new();
        index.record(p("\\X\\Y"), ObjectId::from("{Y}"), "Folder", Some(p("\\X")));
        assert_eq!(index.get(&p("\\X\\Y")).unwrap().parent_path, None);
    }

    #[test]
    fn test_record_same_id_new_path_replaces() {
        let mut index = PathIndex::new();
        index.record(p("\\X\\Old"), ObjectId::from("{1}"), "Folder", None);
        index.record(p("\\X\\New"), ObjectId::from("{1}"), "Folder", None);
        assert!(!index.contains(&p("\\X\\Old")));
        assert_eq!(index.lookup_id(&ObjectId::from("{1}")), Some(&p("\\X\\New")));
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_record_same_id_carries_descendants() {
        let mut index = PathIndex::new();
        index.record(p("\\X"), ObjectId::from("{X}"), "Folder", None);
        index.record(p("\\X\\Old"), ObjectId::from("{1}"), "Folder", Some(p("\\X")));
        index.record(p("\\X\\Old\\Leaf"), ObjectId::from("{2}"), "Sound", Some(p("\\X\\Old")));

        index.record(p("\\X\\New"), ObjectId::from("{1}"), "Folder", Some(p("\\X")));

        let leaf = index.get(&p("\\X\\New\\Leaf")).unwrap();
        assert_eq!(leaf.object_id, ObjectId::from("{2}"));
        assert_eq!(leaf.parent_path, Some(p("\\X\\New")));
        assert!(!index.contains(&p("\\X\\Old\\Leaf")));
        assert_eq!(index.lookup_id(&ObjectId::from("{2}")), Some(&p("\\X\\New\\Leaf")));
    }

    #[test]
    fn test_external_rename_then_lookup_keeps_parents_indexed() {
        let (project, mut session) = setup();
        let mut index = PathIndex::new();
        index.build(&mut session, &p(&format!("{}\\Root", UNIT))).unwrap();

        project.rename(&format!("{}\\Root\\A", UNIT), "A2").unwrap();
        let renamed = p(&format!("{}\\Root\\A2", UNIT));
        index.resolve(&mut session, &renamed).unwrap();

        assert!(index.contains(&p(&format!("{}\\Root\\A2\\Leaf", UNIT))));
        assert!(!index.contains(&p(&format!("{}\\Root\\A\\Leaf", UNIT))));
        for entry in index.entries() {
            if let Some(parent) = &entry.parent_path {
                assert!(index.contains(parent), "{} has unindexed parent {}", entry.path, parent);
            }
        }
    }

    #[test]
    fn test_invalidate_id_and_all() {
        let (_project, mut session) = setup();
        let mut index = PathIndex::new();
        let root = p(&format!("{}\\Root", UNIT));
        index.build(&mut session, &root).unwrap();
        let b_id = index.get(&p(&format!("{}\\Root\\B", UNIT))).unwrap().object_id.clone();
        assert_eq!(index.invalidate_id(&b_id), 1);
        assert_eq!(index.invalidate_all(), 3);
        assert!(index.entries().all(|e| e.stale));
    }

    #[test]
    fn test_sibling_prefix_not_in_subtree() {
        let mut index = PathIndex::new();
        index.record(p("\\R\\A"), ObjectId::from("{A}"), "Folder", None);
        index.record(p("\\R\\AB"), ObjectId::from("{AB}"), "Folder", None);
        index.record(p("\\R\\A\\C"), ObjectId::from("{C}"), "Folder", None);
        let under: Vec<ObjectPath> = index.entries_under(&p("\\R\\A")).into_iter().map(|e| e.path).collect();
        assert_eq!(under, vec![p("\\R\\A"), p("\\R\\A\\C")]);
    }

    #[derive(Debug, Clone)]
    enum Op {
        Record(usize, usize),
        Rename(usize, usize),
        Remove(usize),
        Invalidate(usize),
    }

    const NAMES: [&str; 4] = ["A", "B", "C", "D"];

    /// One of a small set of overlapping paths, so ops collide often.
    fn op_path(i: usize) -> ObjectPath {
        let depth = i % 3 + 1;
        let mut raw = String::from("\\R");
        for level in 0..depth {
            raw.push('\\');
            raw.push_str(NAMES[(i / (level + 1)) % NAMES.len()]);
        }
        p(&raw)
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0usize..24, 0usize..8).prop_map(|(a, b)| Op::Record(a, b)),
            (0usize..24, 0usize..24).prop_map(|(a, b)| Op::Rename(a, b)),
            (0usize..24).prop_map(Op::Remove),
            (0usize..24).prop_map(Op::Invalidate),
        ]
    }

    fn state(index: &PathIndex) -> Vec<(IndexEntry, Option<ObjectPath>)> {
        index
            .entries()
            .map(|e| (e.clone(), index.lookup_id(&e.object_id).cloned()))
            .collect()
    }

    proptest! {
        #[test]
        fn prop_rollback_restores_any_history(
            seed in proptest::collection::vec(0usize..24, 0..8),
            ops in proptest::collection::vec(op_strategy(), 0..16),
        ) {
            let mut index = PathIndex::new();
            for (n, i) in seed.iter().enumerate() {
                index.record(op_path(*i), ObjectId::new(format!("{{S{}}}", n)), "Folder", None);
            }
            let before = state(&index);

            index.begin_journal();
            for op in &ops {
                match op {
                    Op::Record(i, id) => {
                        index.record(op_path(*i), ObjectId::new(format!("{{N{}}}", id)), "Sound", None)
                    }
                    Op::Rename(a, b) => {
                        let (from, to) = (op_path(*a), op_path(*b));
                        if !to.is_within(&from) {
                            index.rename_subtree(&from, &to);
                        }
                    }
                    Op::Remove(i) => {
                        index.remove_subtree(&op_path(*i));
                    }
                    Op::Invalidate(i) => {
                        index.invalidate(&op_path(*i));
                    }
                }
            }
            for entry in index.entries() {
                if let Some(parent) = &entry.parent_path {
                    prop_assert!(index.contains(parent));
                }
            }
            index.rollback_journal();

            prop_assert_eq!(state(&index), before);
        }
    }
}
