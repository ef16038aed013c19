//! In-memory authoring session
//!
//! [`MemoryProject`] owns a project tree and a sound-engine model behind a
//! shared lock. Any number of [`MemorySession`] handles can be opened on it;
//! the project handle itself stays with the test as a probe (call counters,
//! state dumps) and as an "external editor" that changes the project the way
//! a human in the authoring UI would.
//!
//! Transactions are snapshot based: opening a group clones the project state
//! and cancelling restores the clone. Change events are published for every
//! structural change, including those later reverted by a cancel; a cancel
//! itself publishes nothing.
//!
//! Faults can be injected per method: the n-th call of a method is rejected
//! or times out. A timed-out call has already been applied when the timeout
//! is reported, like a reply lost in transit.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use bridge_core::{BridgeError, BridgeResult, ObjectId, ObjectPath};
use parking_lot::Mutex;
use serde_json::{json, Map, Value as JsonValue};
use tracing::debug;
use uuid::Uuid;

use crate::handle::{Connector, SessionHandle, SessionOptions, TransactionState};
use crate::methods;
use crate::subscription::{ChangeEvent, Subscription, SubscriptionId};

/// Top-level hierarchies present in every new project, each holding a
/// `Default Work Unit`.
pub const SEEDED_ROOTS: [&str; 7] = [
    "Actor-Mixer Hierarchy",
    "Events",
    "Game Parameters",
    "Switches",
    "States",
    "SoundBanks",
    "Master-Mixer Hierarchy",
];

/// What an injected fault does.
#[derive(Debug, Clone, PartialEq)]
pub enum FaultKind {
    /// Fail with `Remote` carrying this reason
    Reject(String),
    /// Apply the call, then fail with `Timeout`
    Timeout,
}

/// A fault armed on the `nth` (1-based, counted since the project was
/// created or counters were reset) call of `method`.
#[derive(Debug, Clone, PartialEq)]
pub struct Fault {
    /// Remote method name
    pub method: String,
    /// Which call fires the fault
    pub nth: u64,
    /// Effect
    pub kind: FaultKind,
}

/// One sound-engine request as received by the session.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineCall {
    /// Remote method name
    pub method: String,
    /// Arguments as sent
    pub args: JsonValue,
    /// Scheduling offset; zero for direct calls
    pub due_in: Duration,
}

#[derive(Debug, Clone)]
struct SimObject {
    name: String,
    object_type: String,
    parent: Option<ObjectId>,
    children: Vec<ObjectId>,
    properties: BTreeMap<String, JsonValue>,
    inclusions: Vec<(ObjectId, Vec<String>)>,
}

/// Everything a cancelled undo group restores.
#[derive(Debug, Clone)]
struct ProjectState {
    name: String,
    platforms: Vec<String>,
    languages: Vec<String>,
    objects: HashMap<ObjectId, SimObject>,
    roots: Vec<ObjectId>,
    selection: Vec<ObjectId>,
    generated: Vec<String>,
    game_objects: BTreeMap<u64, String>,
    default_listeners: Vec<u64>,
    listener_routes: BTreeMap<u64, Vec<u64>>,
    engine_log: Vec<EngineCall>,
    next_playing_id: u64,
}

type Events = Vec<ChangeEvent>;
type OpResult<T> = Result<T, String>;

fn new_object_id() -> ObjectId {
    ObjectId::new(format!("{{{}}}", Uuid::new_v4().to_string().to_uppercase()))
}

fn segments(path: &ObjectPath) -> impl Iterator<Item = &str> {
    path.as_str().split('\\').filter(|s| !s.is_empty())
}

impl ProjectState {
    fn seeded(name: &str) -> Self {
        let mut state = Self {
            name: name.to_string(),
            platforms: vec!["Windows".to_string(), "Mac".to_string()],
            languages: vec!["English(US)".to_string(), "French(France)".to_string()],
            objects: HashMap::new(),
            roots: Vec::new(),
            selection: Vec::new(),
            generated: Vec::new(),
            game_objects: BTreeMap::new(),
            default_listeners: Vec::new(),
            listener_routes: BTreeMap::new(),
            engine_log: Vec::new(),
            next_playing_id: 1,
        };
        for root in SEEDED_ROOTS {
            let root_id = state.insert(None, root, "Folder", BTreeMap::new());
            let unit = state.insert(Some(&root_id), "Default Work Unit", "WorkUnit", BTreeMap::new());
            if root == "Master-Mixer Hierarchy" {
                state.insert(Some(&unit), "Master Audio Bus", "Bus", BTreeMap::new());
            }
        }
        state
    }

    fn get(&self, id: &ObjectId) -> OpResult<&SimObject> {
        self.objects.get(id).ok_or_else(|| format!("object {} does not exist", id))
    }

    fn path_of(&self, id: &ObjectId) -> Option<ObjectPath> {
        let mut names = Vec::new();
        let mut cursor = Some(id.clone());
        while let Some(current) = cursor {
            let object = self.objects.get(&current)?;
            names.push(object.name.as_str());
            cursor = object.parent.clone();
        }
        names.reverse();
        ObjectPath::parse(&names.join("\\")).ok()
    }

    fn children_of(&self, parent: Option<&ObjectId>) -> &[ObjectId] {
        match parent {
            Some(p) => self.objects.get(p).map(|o| o.children.as_slice()).unwrap_or(&[]),
            None => &self.roots,
        }
    }

    fn find_child(&self, parent: Option<&ObjectId>, name: &str) -> Option<ObjectId> {
        self.children_of(parent)
            .iter()
            .find(|c| self.objects.get(*c).map_or(false, |o| o.name == name))
            .cloned()
    }

    fn find_by_path(&self, path: &ObjectPath) -> Option<ObjectId> {
        let mut cursor: Option<ObjectId> = None;
        for segment in segments(path) {
            cursor = Some(self.find_child(cursor.as_ref(), segment)?);
        }
        cursor
    }

    /// Accepts `{GUID}` identifiers and `\`-rooted paths.
    fn resolve_ref(&self, value: &JsonValue) -> Option<ObjectId> {
        let raw = value.as_str()?;
        if raw.starts_with('{') {
            let id = ObjectId::new(raw);
            self.objects.contains_key(&id).then_some(id)
        } else {
            self.find_by_path(&ObjectPath::parse(raw).ok()?)
        }
    }

    fn find_named(&self, object_type: &str, name: &str) -> Option<ObjectId> {
        let mut matches: Vec<(ObjectPath, ObjectId)> = self
            .objects
            .iter()
            .filter(|(_, o)| o.object_type == object_type && o.name == name)
            .filter_map(|(id, _)| Some((self.path_of(id)?, id.clone())))
            .collect();
        matches.sort();
        matches.into_iter().next().map(|(_, id)| id)
    }

    fn descendants(&self, id: &ObjectId, out: &mut Vec<ObjectId>) {
        if let Some(object) = self.objects.get(id) {
            for child in &object.children {
                out.push(child.clone());
                self.descendants(child, out);
            }
        }
    }

    fn insert(
        &mut self,
        parent: Option<&ObjectId>,
        name: &str,
        object_type: &str,
        properties: BTreeMap<String, JsonValue>,
    ) -> ObjectId {
        let id = new_object_id();
        self.objects.insert(
            id.clone(),
            SimObject {
                name: name.to_string(),
                object_type: object_type.to_string(),
                parent: parent.cloned(),
                children: Vec::new(),
                properties,
                inclusions: Vec::new(),
            },
        );
        match parent.and_then(|p| self.objects.get_mut(p)) {
            Some(p) => p.children.push(id.clone()),
            None => self.roots.push(id.clone()),
        }
        id
    }

    fn unique_name(&self, parent: &ObjectId, base: &str) -> String {
        if self.find_child(Some(parent), base).is_none() {
            return base.to_string();
        }
        (1..)
            .map(|n| format!("{}_{:02}", base, n))
            .find(|candidate| self.find_child(Some(parent), candidate).is_none())
            .unwrap_or_else(|| base.to_string())
    }

    fn create(
        &mut self,
        parent: &ObjectId,
        spec: &JsonValue,
        on_conflict: &str,
        events: &mut Events,
    ) -> OpResult<(ObjectId, String)> {
        let object_type = spec
            .get("type")
            .and_then(JsonValue::as_str)
            .ok_or("missing 'type'")?;
        let requested = spec
            .get("name")
            .and_then(JsonValue::as_str)
            .ok_or("missing 'name'")?;
        if (requested.is_empty() && object_type != "Action") || requested.contains('\\') {
            return Err(format!("invalid object name '{}'", requested));
        }
        self.get(parent)?;

        let properties: BTreeMap<String, JsonValue> = spec
            .as_object()
            .map(|m| {
                m.iter()
                    .filter(|(k, _)| k.starts_with('@'))
                    .map(|(k, v)| (k.trim_start_matches('@').to_string(), v.clone()))
                    .collect()
            })
            .unwrap_or_default();

        // nameless actions get a generated, unique name so paths stay distinct
        let generated;
        let requested = if requested.is_empty() {
            generated = self.unique_name(parent, object_type);
            generated.as_str()
        } else {
            requested
        };
        let existing = self.find_child(Some(parent), requested);
        let (id, name) = match (existing, on_conflict) {
            (None, _) => (self.insert(Some(parent), requested, object_type, properties), requested.to_string()),
            (Some(_), "rename") => {
                let name = self.unique_name(parent, requested);
                (self.insert(Some(parent), &name, object_type, properties), name)
            }
            (Some(old), "replace") => {
                self.remove_subtree(&old, events);
                (self.insert(Some(parent), requested, object_type, properties), requested.to_string())
            }
            (Some(old), "merge") => {
                if let Some(object) = self.objects.get_mut(&old) {
                    object.properties.extend(properties);
                }
                (old, requested.to_string())
            }
            (Some(_), _) => {
                return Err(format!("an object named '{}' already exists under the parent", requested));
            }
        };
        events.push(ChangeEvent::new(methods::TOPIC_CREATED, Some(id.clone()), self.path_of(&id)));

        if let Some(children) = spec.get("children").and_then(JsonValue::as_array) {
            for child in children {
                self.create(&id, child, on_conflict, events)?;
            }
        }
        Ok((id, name))
    }

    fn detach(&mut self, id: &ObjectId) {
        let parent = self.objects.get(id).and_then(|o| o.parent.clone());
        match parent.and_then(|p| self.objects.get_mut(&p)) {
            Some(p) => p.children.retain(|c| c != id),
            None => self.roots.retain(|c| c != id),
        }
    }

    fn remove_subtree(&mut self, id: &ObjectId, events: &mut Events) {
        let path = self.path_of(id);
        let mut doomed = vec![id.clone()];
        self.descendants(id, &mut doomed);
        self.detach(id);
        for gone in &doomed {
            self.objects.remove(gone);
        }
        self.selection.retain(|s| !doomed.contains(s));
        events.push(ChangeEvent::new(methods::TOPIC_POST_DELETED, Some(id.clone()), path));
    }

    fn rename(&mut self, id: &ObjectId, new_name: &str, events: &mut Events) -> OpResult<()> {
        if new_name.is_empty() || new_name.contains('\\') {
            return Err(format!("invalid object name '{}'", new_name));
        }
        let parent = self.get(id)?.parent.clone();
        if parent.is_none() {
            return Err("top-level hierarchies cannot be renamed".to_string());
        }
        if let Some(other) = self.find_child(parent.as_ref(), new_name) {
            if &other != id {
                return Err(format!("an object named '{}' already exists under the parent", new_name));
            }
        }
        let old_path = self.path_of(id);
        if let Some(object) = self.objects.get_mut(id) {
            object.name = new_name.to_string();
        }
        let mut event = ChangeEvent::new(methods::TOPIC_NAME_CHANGED, Some(id.clone()), old_path);
        event.new_path = self.path_of(id);
        events.push(event);
        Ok(())
    }

    fn reparent(
        &mut self,
        id: &ObjectId,
        new_parent: &ObjectId,
        on_conflict: &str,
        events: &mut Events,
    ) -> OpResult<String> {
        let current_name = self.get(id)?.name.clone();
        if self.get(id)?.parent.is_none() {
            return Err("top-level hierarchies cannot be moved".to_string());
        }
        self.get(new_parent)?;
        let mut below = vec![id.clone()];
        self.descendants(id, &mut below);
        if below.contains(new_parent) {
            return Err("cannot move an object under itself".to_string());
        }
        let name = match self.find_child(Some(new_parent), &current_name) {
            Some(other) if &other == id => current_name,
            Some(_) if on_conflict == "rename" => self.unique_name(new_parent, &current_name),
            Some(_) => {
                return Err(format!("an object named '{}' already exists under the parent", current_name));
            }
            None => current_name,
        };
        let old_path = self.path_of(id);
        self.detach(id);
        if let Some(object) = self.objects.get_mut(id) {
            object.parent = Some(new_parent.clone());
            object.name = name.clone();
        }
        if let Some(p) = self.objects.get_mut(new_parent) {
            p.children.push(id.clone());
        }
        let new_path = self.path_of(id);
        let mut removed = ChangeEvent::new(methods::TOPIC_CHILD_REMOVED, Some(id.clone()), old_path);
        removed.new_path = new_path.clone();
        events.push(removed);
        events.push(ChangeEvent::new(methods::TOPIC_CHILD_ADDED, Some(id.clone()), new_path));
        Ok(name)
    }

    fn record(&self, id: &ObjectId, fields: &[String]) -> JsonValue {
        let mut out = Map::new();
        let Some(object) = self.objects.get(id) else {
            return JsonValue::Object(out);
        };
        for field in fields {
            let value = match field.as_str() {
                "id" => json!(id.as_str()),
                "name" => json!(object.name),
                "type" => json!(object.object_type),
                "path" => self.path_of(id).map_or(JsonValue::Null, |p| json!(p.as_str())),
                "parent" => match object.parent.as_ref().and_then(|p| Some((p, self.objects.get(p)?))) {
                    Some((pid, p)) => json!({"id": pid.as_str(), "name": p.name}),
                    None => JsonValue::Null,
                },
                "childrenCount" => json!(object.children.len()),
                other if other.starts_with('@') => object
                    .properties
                    .get(other.trim_start_matches('@'))
                    .cloned()
                    .unwrap_or(JsonValue::Null),
                _ => continue,
            };
            out.insert(field.clone(), value);
        }
        JsonValue::Object(out)
    }

    fn push_engine(&mut self, method: &str, args: &JsonValue, due_in: Duration) {
        self.engine_log.push(EngineCall {
            method: method.to_string(),
            args: args.clone(),
            due_in,
        });
    }

    fn require_game_object(&self, args: &JsonValue, key: &str) -> OpResult<u64> {
        let id = args
            .get(key)
            .and_then(JsonValue::as_u64)
            .ok_or_else(|| format!("missing '{}'", key))?;
        if self.game_objects.contains_key(&id) {
            Ok(id)
        } else {
            Err(format!("game object {} is not registered", id))
        }
    }

    fn find_by_name_or_id(&self, value: Option<&JsonValue>, object_type: &str) -> OpResult<ObjectId> {
        let raw = value.and_then(JsonValue::as_str).ok_or("missing object reference")?;
        let found = if raw.starts_with('{') || raw.starts_with('\\') {
            self.resolve_ref(&json!(raw))
                .filter(|id| self.objects.get(id).map_or(false, |o| o.object_type == object_type))
        } else {
            self.find_named(object_type, raw)
        };
        found.ok_or_else(|| format!("{} '{}' does not exist", object_type, raw))
    }
}

fn return_fields(args: &JsonValue, options: &JsonValue) -> Vec<String> {
    options
        .get("return")
        .or_else(|| args.get("options").and_then(|o| o.get("return")))
        .and_then(JsonValue::as_array)
        .map(|fields| fields.iter().filter_map(|f| f.as_str().map(str::to_string)).collect())
        .unwrap_or_else(|| vec!["id".to_string(), "name".to_string()])
}

fn str_arg<'a>(args: &'a JsonValue, key: &str) -> OpResult<&'a str> {
    args.get(key)
        .and_then(JsonValue::as_str)
        .ok_or_else(|| format!("missing '{}'", key))
}

fn ref_arg(state: &ProjectState, args: &JsonValue, key: &str) -> OpResult<ObjectId> {
    let value = args.get(key).ok_or_else(|| format!("missing '{}'", key))?;
    state
        .resolve_ref(value)
        .ok_or_else(|| format!("object {} does not exist", value))
}

#[derive(Debug)]
struct Shared {
    project: ProjectState,
    snapshot: Option<ProjectState>,
    transaction: TransactionState,
    undo_history: Vec<String>,
    calls: HashMap<String, u64>,
    faults: Vec<Fault>,
    subscribers: Vec<Subscription>,
    refuse_connections: bool,
}

enum Reply {
    Ok(JsonValue),
    Rejected(String),
}

impl Shared {
    fn count(&mut self, method: &str) -> u64 {
        let n = self.calls.entry(method.to_string()).or_insert(0);
        *n += 1;
        *n
    }

    fn armed_fault(&mut self, method: &str, nth: u64) -> Option<FaultKind> {
        let pos = self.faults.iter().position(|f| f.method == method && f.nth == nth)?;
        Some(self.faults.remove(pos).kind)
    }

    fn publish(&self, events: Events) {
        for event in events {
            for sub in self.subscribers.iter().filter(|s| s.topic() == event.topic) {
                sub.deliver(event.clone());
            }
        }
    }

    fn apply(&mut self, method: &str, args: &JsonValue, options: &JsonValue, due_in: Duration) -> Reply {
        let mut events = Events::new();
        let result = dispatch(&mut self.project, method, args, options, due_in, &mut events);
        self.publish(events);
        match result {
            Ok(value) => Reply::Ok(value),
            Err(reason) => Reply::Rejected(reason),
        }
    }
}

fn dispatch(
    state: &mut ProjectState,
    method: &str,
    args: &JsonValue,
    options: &JsonValue,
    due_in: Duration,
    events: &mut Events,
) -> OpResult<JsonValue> {
    match method {
        methods::OBJECT_GET => object_get(state, args, options),
        methods::OBJECT_CREATE => {
            let parent = ref_arg(state, args, "parent")?;
            let on_conflict = args.get("onNameConflict").and_then(JsonValue::as_str).unwrap_or("fail");
            let (id, name) = state.create(&parent, args, on_conflict, events)?;
            Ok(json!({"id": id.as_str(), "name": name}))
        }
        methods::OBJECT_SET_NAME => {
            let id = ref_arg(state, args, "object")?;
            state.rename(&id, str_arg(args, "value")?, events)?;
            Ok(json!({}))
        }
        methods::OBJECT_MOVE => {
            let id = ref_arg(state, args, "object")?;
            let parent = ref_arg(state, args, "parent")?;
            let on_conflict = args.get("onNameConflict").and_then(JsonValue::as_str).unwrap_or("fail");
            let name = state.reparent(&id, &parent, on_conflict, events)?;
            Ok(json!({"id": id.as_str(), "name": name}))
        }
        methods::OBJECT_SET_PROPERTY => {
            let id = ref_arg(state, args, "object")?;
            let property = str_arg(args, "property")?.trim_start_matches('@').to_string();
            let value = args.get("value").cloned().ok_or("missing 'value'")?;
            if let Some(object) = state.objects.get_mut(&id) {
                object.properties.insert(property, value);
            }
            Ok(json!({}))
        }
        methods::OBJECT_DELETE => {
            let id = ref_arg(state, args, "object")?;
            if state.get(&id)?.parent.is_none() {
                return Err("top-level hierarchies cannot be deleted".to_string());
            }
            state.remove_subtree(&id, events);
            Ok(json!({}))
        }
        methods::GAME_PARAMETER_SET_RANGE => {
            let id = ref_arg(state, args, "object")?;
            let min = args.get("min").and_then(JsonValue::as_f64).ok_or("missing 'min'")?;
            let max = args.get("max").and_then(JsonValue::as_f64).ok_or("missing 'max'")?;
            if state.get(&id)?.object_type != "GameParameter" {
                return Err("object is not a game parameter".to_string());
            }
            if min > max {
                return Err(format!("min {} is greater than max {}", min, max));
            }
            if let Some(object) = state.objects.get_mut(&id) {
                object.properties.insert("Min".to_string(), json!(min));
                object.properties.insert("Max".to_string(), json!(max));
            }
            Ok(json!({}))
        }
        methods::SOUNDBANK_SET_INCLUSIONS => set_inclusions(state, args),
        methods::SOUNDBANK_GENERATE => generate(state, args),
        methods::AUDIO_IMPORT => import(state, args, events),
        methods::PROJECT_INFO => Ok(json!({
            "name": state.name,
            "path": format!("C:\\Projects\\{0}\\{0}.wproj", state.name),
            "platforms": state.platforms.iter().map(|p| json!({"name": p})).collect::<Vec<_>>(),
            "languages": state.languages.iter().map(|l| json!({"name": l})).collect::<Vec<_>>(),
        })),
        methods::SELECTED_OBJECTS => {
            let fields = return_fields(args, options);
            let objects: Vec<JsonValue> = state.selection.iter().map(|id| state.record(id, &fields)).collect();
            Ok(json!({"objects": objects}))
        }
        methods::PROFILER_GAME_OBJECTS => {
            let objects: Vec<JsonValue> = state
                .game_objects
                .iter()
                .map(|(id, name)| json!({"id": id, "name": name}))
                .collect();
            Ok(json!({"return": objects}))
        }
        _ => engine(state, method, args, due_in),
    }
}

fn object_get(state: &ProjectState, args: &JsonValue, options: &JsonValue) -> OpResult<JsonValue> {
    let from = args.get("from").ok_or("missing 'from'")?;
    let mut set: Vec<ObjectId> = if let Some(paths) = from.get("path").and_then(JsonValue::as_array) {
        paths.iter().filter_map(|p| state.resolve_ref(p)).collect()
    } else if let Some(ids) = from.get("id").and_then(JsonValue::as_array) {
        ids.iter().filter_map(|p| state.resolve_ref(p)).collect()
    } else if let Some(types) = from.get("ofType").and_then(JsonValue::as_array) {
        let wanted: Vec<&str> = types.iter().filter_map(JsonValue::as_str).collect();
        let mut found: Vec<(ObjectPath, ObjectId)> = state
            .objects
            .iter()
            .filter(|(_, o)| wanted.contains(&o.object_type.as_str()))
            .filter_map(|(id, _)| Some((state.path_of(id)?, id.clone())))
            .collect();
        found.sort();
        found.into_iter().map(|(_, id)| id).collect()
    } else {
        return Err("'from' must name path, id or ofType".to_string());
    };

    for step in args.get("transform").and_then(JsonValue::as_array).into_iter().flatten() {
        if let Some(select) = step.get("select").and_then(JsonValue::as_array) {
            let mut next: Vec<ObjectId> = Vec::new();
            for id in &set {
                for kind in select.iter().filter_map(JsonValue::as_str) {
                    match kind {
                        "descendants" => state.descendants(id, &mut next),
                        "children" => next.extend(state.children_of(Some(id)).iter().cloned()),
                        "parent" => next.extend(state.objects.get(id).and_then(|o| o.parent.clone())),
                        other => return Err(format!("unsupported select '{}'", other)),
                    }
                }
            }
            let mut seen = std::collections::HashSet::new();
            next.retain(|id| seen.insert(id.clone()));
            set = next;
        } else if let Some(clause) = step.get("where").and_then(JsonValue::as_array) {
            let op = clause.first().and_then(JsonValue::as_str).unwrap_or_default();
            let operand = clause.get(1).cloned().unwrap_or(JsonValue::Null);
            set.retain(|id| {
                let Some(object) = state.objects.get(id) else { return false };
                match op {
                    "type:isIn" => operand
                        .as_array()
                        .map_or(false, |types| types.iter().any(|t| t.as_str() == Some(object.object_type.as_str()))),
                    "name:contains" => operand.as_str().map_or(false, |s| object.name.contains(s)),
                    "name:matches" => operand
                        .as_str()
                        .map_or(false, |s| object.name.to_lowercase().contains(&s.to_lowercase())),
                    _ => false,
                }
            });
        }
    }

    let fields = return_fields(args, options);
    let records: Vec<JsonValue> = set.iter().map(|id| state.record(id, &fields)).collect();
    Ok(json!({"return": records}))
}

fn set_inclusions(state: &mut ProjectState, args: &JsonValue) -> OpResult<JsonValue> {
    let bank = ref_arg(state, args, "soundbank")?;
    if state.get(&bank)?.object_type != "SoundBank" {
        return Err("target is not a soundbank".to_string());
    }
    let operation = args.get("operation").and_then(JsonValue::as_str).unwrap_or("add");
    let mut incoming = Vec::new();
    for inclusion in args.get("inclusions").and_then(JsonValue::as_array).into_iter().flatten() {
        let object = ref_arg(state, inclusion, "object")?;
        let filter: Vec<String> = inclusion
            .get("filter")
            .and_then(JsonValue::as_array)
            .map(|f| f.iter().filter_map(|x| x.as_str().map(str::to_string)).collect())
            .unwrap_or_default();
        incoming.push((object, filter));
    }
    let Some(target) = state.objects.get_mut(&bank) else {
        return Err("target is not a soundbank".to_string());
    };
    match operation {
        "add" => {
            for (object, filter) in incoming {
                target.inclusions.retain(|(existing, _)| existing != &object);
                target.inclusions.push((object, filter));
            }
        }
        "remove" => target
            .inclusions
            .retain(|(existing, _)| !incoming.iter().any(|(o, _)| o == existing)),
        "replace" => target.inclusions = incoming,
        other => return Err(format!("unknown inclusion operation '{}'", other)),
    }
    Ok(json!({}))
}

fn generate(state: &mut ProjectState, args: &JsonValue) -> OpResult<JsonValue> {
    let mut names = Vec::new();
    for bank in args.get("soundbanks").and_then(JsonValue::as_array).into_iter().flatten() {
        let name = str_arg(bank, "name")?;
        if state.find_named("SoundBank", name).is_none() {
            return Err(format!("soundbank '{}' does not exist", name));
        }
        names.push(name.to_string());
    }
    if names.is_empty() {
        return Err("no soundbanks to generate".to_string());
    }
    for platform in args.get("platforms").and_then(JsonValue::as_array).into_iter().flatten() {
        let platform = platform.as_str().unwrap_or_default();
        if !state.platforms.iter().any(|p| p == platform) {
            return Err(format!("unknown platform '{}'", platform));
        }
    }
    let logs: Vec<JsonValue> = names
        .iter()
        .map(|n| json!({"severity": "Message", "message": format!("Generated {}", n)}))
        .collect();
    state.generated.extend(names);
    Ok(json!({"logs": logs}))
}

/// Segments may carry a `<Type>` prefix naming the type to create when the
/// segment does not exist yet.
fn split_typed(segment: &str) -> (Option<&str>, &str) {
    match segment.strip_prefix('<').and_then(|rest| rest.split_once('>')) {
        Some((ty, name)) => (Some(ty), name),
        None => (None, segment),
    }
}

fn import(state: &mut ProjectState, args: &JsonValue, events: &mut Events) -> OpResult<JsonValue> {
    let operation = args.get("importOperation").and_then(JsonValue::as_str).unwrap_or("useExisting");
    let default_type = args
        .get("default")
        .and_then(|d| d.get("objectType"))
        .and_then(JsonValue::as_str)
        .unwrap_or("Sound");
    let language = args
        .get("default")
        .and_then(|d| d.get("importLanguage"))
        .and_then(JsonValue::as_str)
        .unwrap_or("SFX")
        .to_string();

    let mut produced = Vec::new();
    for item in args.get("imports").and_then(JsonValue::as_array).into_iter().flatten() {
        let file = str_arg(item, "audioFile")?;
        let raw_path = str_arg(item, "objectPath")?;
        let parts: Vec<&str> = raw_path.split('\\').filter(|s| !s.is_empty()).collect();
        let Some((leaf, ancestors)) = parts.split_last() else {
            return Err("empty objectPath".to_string());
        };
        let Some(root) = ancestors.first() else {
            return Err(format!("objectPath '{}' names no parent", raw_path));
        };
        let (_, root_name) = split_typed(root);
        let mut cursor = state
            .find_child(None, root_name)
            .ok_or_else(|| format!("'{}' is not a top-level hierarchy", root_name))?;
        for segment in ancestors.iter().skip(1) {
            let (ty, name) = split_typed(segment);
            cursor = match state.find_child(Some(&cursor), name) {
                Some(existing) => existing,
                None => {
                    let spec = json!({"type": ty.unwrap_or("Folder"), "name": name});
                    state.create(&cursor, &spec, "fail", events)?.0
                }
            };
        }
        let (leaf_type, leaf_name) = split_typed(leaf);
        let leaf_type = leaf_type.unwrap_or(default_type);
        let spec = json!({
            "type": leaf_type,
            "name": leaf_name,
            "@AudioFile": file,
            "@Language": language,
        });
        let id = match (state.find_child(Some(&cursor), leaf_name), operation) {
            (Some(existing), "useExisting") | (Some(existing), "replaceExisting") => {
                if let Some(object) = state.objects.get_mut(&existing) {
                    object.properties.insert("AudioFile".to_string(), json!(file));
                }
                existing
            }
            (_, "createNew") => state.create(&cursor, &spec, "rename", events)?.0,
            _ => state.create(&cursor, &spec, "fail", events)?.0,
        };
        produced.push(state.record(
            &id,
            &["id".to_string(), "name".to_string(), "type".to_string(), "path".to_string()],
        ));
    }
    Ok(json!({"objects": produced}))
}

fn engine(state: &mut ProjectState, method: &str, args: &JsonValue, due_in: Duration) -> OpResult<JsonValue> {
    let reply = match method {
        methods::REGISTER_GAME_OBJECT => {
            let id = args.get("gameObject").and_then(JsonValue::as_u64).ok_or("missing 'gameObject'")?;
            let name = str_arg(args, "name")?;
            state.game_objects.insert(id, name.to_string());
            json!({})
        }
        methods::UNREGISTER_GAME_OBJECT => {
            let id = state.require_game_object(args, "gameObject")?;
            state.game_objects.remove(&id);
            state.listener_routes.remove(&id);
            state.default_listeners.retain(|l| *l != id);
            json!({})
        }
        methods::SET_DEFAULT_LISTENERS => {
            let listeners: Vec<u64> = args
                .get("listeners")
                .and_then(JsonValue::as_array)
                .ok_or("missing 'listeners'")?
                .iter()
                .filter_map(JsonValue::as_u64)
                .collect();
            if let Some(missing) = listeners.iter().find(|l| !state.game_objects.contains_key(*l)) {
                return Err(format!("listener {} is not registered", missing));
            }
            state.default_listeners = listeners;
            json!({})
        }
        methods::SET_LISTENERS => {
            let emitter = state.require_game_object(args, "emitter")?;
            let listeners: Vec<u64> = args
                .get("listeners")
                .and_then(JsonValue::as_array)
                .ok_or("missing 'listeners'")?
                .iter()
                .filter_map(JsonValue::as_u64)
                .collect();
            state.listener_routes.insert(emitter, listeners);
            json!({})
        }
        methods::POST_EVENT => {
            state.find_by_name_or_id(args.get("event"), "Event")?;
            state.require_game_object(args, "gameObject")?;
            let playing_id = state.next_playing_id;
            state.next_playing_id += 1;
            json!({"playingId": playing_id})
        }
        methods::SET_RTPC_VALUE => {
            state.find_by_name_or_id(args.get("rtpc"), "GameParameter")?;
            args.get("value").and_then(JsonValue::as_f64).ok_or("missing 'value'")?;
            if args.get("gameObject").is_some() {
                state.require_game_object(args, "gameObject")?;
            }
            json!({})
        }
        methods::SET_SWITCH => {
            let group = state.find_by_name_or_id(args.get("switchGroup"), "SwitchGroup")?;
            let value = str_arg(args, "switchState")?;
            if state.find_child(Some(&group), value).is_none() {
                return Err(format!("switch '{}' does not exist in the group", value));
            }
            state.require_game_object(args, "gameObject")?;
            json!({})
        }
        methods::SET_STATE => {
            let group = state.find_by_name_or_id(args.get("stateGroup"), "StateGroup")?;
            let value = str_arg(args, "state")?;
            if state.find_child(Some(&group), value).is_none() {
                return Err(format!("state '{}' does not exist in the group", value));
            }
            json!({})
        }
        methods::SET_POSITION => {
            state.require_game_object(args, "gameObject")?;
            args.get("position").ok_or("missing 'position'")?;
            json!({})
        }
        methods::STOP_ALL => {
            if args.get("gameObject").is_some() {
                state.require_game_object(args, "gameObject")?;
            }
            json!({})
        }
        other => return Err(format!("unknown method '{}'", other)),
    };
    state.push_engine(method, args, due_in);
    Ok(reply)
}

/// Shared in-memory project: probe and external editor for tests.
#[derive(Debug, Clone)]
pub struct MemoryProject {
    shared: Arc<Mutex<Shared>>,
}

impl Default for MemoryProject {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryProject {
    /// A project named `Sim` with the seeded hierarchies.
    pub fn new() -> Self {
        Self::named("Sim")
    }

    /// A project with the seeded hierarchies and the given name.
    pub fn named(name: &str) -> Self {
        Self {
            shared: Arc::new(Mutex::new(Shared {
                project: ProjectState::seeded(name),
                snapshot: None,
                transaction: TransactionState::NotOpen,
                undo_history: Vec::new(),
                calls: HashMap::new(),
                faults: Vec::new(),
                subscribers: Vec::new(),
                refuse_connections: false,
            })),
        }
    }

    /// Connector opening sessions on this project.
    pub fn connector(&self) -> MemoryConnector {
        MemoryConnector { project: self.clone() }
    }

    /// A connected session with default options.
    pub fn session(&self) -> MemorySession {
        MemorySession {
            shared: Arc::clone(&self.shared),
            options: SessionOptions::default(),
            connected: true,
        }
    }

    /// Make the connector fail with `Connection`.
    pub fn refuse_connections(&self, refuse: bool) {
        self.shared.lock().refuse_connections = refuse;
    }

    // ------------------------------------------------------------------
    // Probe
    // ------------------------------------------------------------------

    /// Number of calls received for `method`, including scheduled ones and
    /// the undo-group methods.
    pub fn call_count(&self, method: &str) -> u64 {
        self.shared.lock().calls.get(method).copied().unwrap_or(0)
    }

    /// Number of calls received across all methods.
    pub fn total_calls(&self) -> u64 {
        self.shared.lock().calls.values().sum()
    }

    /// Number of calls received for methods that change state.
    pub fn mutating_calls(&self) -> u64 {
        self.shared
            .lock()
            .calls
            .iter()
            .filter(|(m, _)| methods::is_mutating_method(m))
            .map(|(_, n)| n)
            .sum()
    }

    /// Reset every call counter. Armed faults keep their absolute `nth`.
    pub fn reset_counters(&self) {
        self.shared.lock().calls.clear();
    }

    /// Arm a fault.
    pub fn inject(&self, fault: Fault) {
        self.shared.lock().faults.push(fault);
    }

    /// Reject the next call of `method`.
    pub fn fail_next(&self, method: &str, reason: &str) {
        let mut shared = self.shared.lock();
        let nth = shared.calls.get(method).copied().unwrap_or(0) + 1;
        shared.faults.push(Fault {
            method: method.to_string(),
            nth,
            kind: FaultKind::Reject(reason.to_string()),
        });
    }

    /// Time out the next call of `method`.
    pub fn time_out_next(&self, method: &str) {
        let mut shared = self.shared.lock();
        let nth = shared.calls.get(method).copied().unwrap_or(0) + 1;
        shared.faults.push(Fault {
            method: method.to_string(),
            nth,
            kind: FaultKind::Timeout,
        });
    }

    /// Make the next undo-group cancel fail without reverting anything.
    pub fn fail_next_cancel(&self) {
        self.fail_next(methods::UNDO_CANCEL, "undo history is locked");
    }

    /// Current undo-group state.
    pub fn transaction_state(&self) -> TransactionState {
        self.shared.lock().transaction
    }

    /// Labels of committed undo groups, oldest first.
    pub fn undo_history(&self) -> Vec<String> {
        self.shared.lock().undo_history.clone()
    }

    /// Whether an object exists at `path`.
    pub fn exists(&self, path: &str) -> bool {
        self.id_of(path).is_some()
    }

    /// Id of the object at `path`.
    pub fn id_of(&self, path: &str) -> Option<ObjectId> {
        let path = ObjectPath::parse(path).ok()?;
        self.shared.lock().project.find_by_path(&path)
    }

    /// Current path of object `id`.
    pub fn path_of(&self, id: &ObjectId) -> Option<ObjectPath> {
        self.shared.lock().project.path_of(id)
    }

    /// Type of the object at `path`.
    pub fn object_type(&self, path: &str) -> Option<String> {
        let shared = self.shared.lock();
        let id = shared.project.find_by_path(&ObjectPath::parse(path).ok()?)?;
        shared.project.objects.get(&id).map(|o| o.object_type.clone())
    }

    /// Property `name` of the object at `path`.
    pub fn property(&self, path: &str, name: &str) -> Option<JsonValue> {
        let shared = self.shared.lock();
        let id = shared.project.find_by_path(&ObjectPath::parse(path).ok()?)?;
        shared.project.objects.get(&id)?.properties.get(name).cloned()
    }

    /// Names of the children of the object at `path`, in creation order.
    pub fn children(&self, path: &str) -> Vec<String> {
        let shared = self.shared.lock();
        let Some(id) = ObjectPath::parse(path).ok().and_then(|p| shared.project.find_by_path(&p)) else {
            return Vec::new();
        };
        shared
            .project
            .children_of(Some(&id))
            .iter()
            .filter_map(|c| shared.project.objects.get(c).map(|o| o.name.clone()))
            .collect()
    }

    /// Objects included in the soundbank at `path`.
    pub fn inclusions(&self, path: &str) -> Vec<ObjectId> {
        let shared = self.shared.lock();
        ObjectPath::parse(path)
            .ok()
            .and_then(|p| shared.project.find_by_path(&p))
            .and_then(|id| shared.project.objects.get(&id))
            .map(|bank| bank.inclusions.iter().map(|(id, _)| id.clone()).collect())
            .unwrap_or_default()
    }

    /// Names of generated soundbanks, in generation order.
    pub fn generated_banks(&self) -> Vec<String> {
        self.shared.lock().project.generated.clone()
    }

    /// Registered game objects.
    pub fn game_objects(&self) -> BTreeMap<u64, String> {
        self.shared.lock().project.game_objects.clone()
    }

    /// Default listeners.
    pub fn default_listeners(&self) -> Vec<u64> {
        self.shared.lock().project.default_listeners.clone()
    }

    /// Listeners an emitter is routed to.
    pub fn listeners_of(&self, emitter: u64) -> Vec<u64> {
        self.shared
            .lock()
            .project
            .listener_routes
            .get(&emitter)
            .cloned()
            .unwrap_or_default()
    }

    /// Sound-engine calls received, in arrival order.
    pub fn engine_log(&self) -> Vec<EngineCall> {
        self.shared.lock().project.engine_log.clone()
    }

    /// Comparable dump of the observable project state: every object by path
    /// with its type and properties, plus registered game objects.
    pub fn dump(&self) -> JsonValue {
        let shared = self.shared.lock();
        let project = &shared.project;
        let mut objects = Map::new();
        for (id, object) in &project.objects {
            if let Some(path) = project.path_of(id) {
                let inclusions: Vec<&str> = object.inclusions.iter().map(|(i, _)| i.as_str()).collect();
                objects.insert(
                    path.to_string(),
                    json!({
                        "type": object.object_type,
                        "properties": object.properties,
                        "inclusions": inclusions,
                    }),
                );
            }
        }
        let game_objects: Map<String, JsonValue> = project
            .game_objects
            .iter()
            .map(|(id, name)| (id.to_string(), json!(name)))
            .collect();
        json!({
            "objects": objects,
            "game_objects": game_objects,
            "default_listeners": project.default_listeners,
            "generated": project.generated,
        })
    }

    // ------------------------------------------------------------------
    // External editor
    // ------------------------------------------------------------------

    fn edit<T>(&self, op: impl FnOnce(&mut ProjectState, &mut Events) -> OpResult<T>) -> BridgeResult<T> {
        let mut shared = self.shared.lock();
        let mut events = Events::new();
        let result = op(&mut shared.project, &mut events);
        shared.publish(events);
        result.map_err(|reason| BridgeError::remote("external edit", reason))
    }

    fn locate(state: &ProjectState, path: &str) -> OpResult<ObjectId> {
        let parsed = ObjectPath::parse(path).map_err(|e| e.to_string())?;
        state
            .find_by_path(&parsed)
            .ok_or_else(|| format!("{} does not exist", parsed))
    }

    /// Create `name` of `object_type` under `parent`, creating nothing else.
    pub fn add_object(&self, parent: &str, name: &str, object_type: &str) -> BridgeResult<ObjectId> {
        self.edit(|state, events| {
            let parent = Self::locate(state, parent)?;
            let spec = json!({"type": object_type, "name": name});
            Ok(state.create(&parent, &spec, "fail", events)?.0)
        })
    }

    /// Create every missing segment of `path`; the leaf gets `leaf_type`,
    /// intermediate segments are folders.
    pub fn add_path(&self, path: &str, leaf_type: &str) -> BridgeResult<ObjectId> {
        self.edit(|state, events| {
            let parsed = ObjectPath::parse(path).map_err(|e| e.to_string())?;
            let parts: Vec<&str> = segments(&parsed).collect();
            let (first, rest) = parts.split_first().ok_or("empty path")?;
            let mut cursor = state
                .find_child(None, first)
                .ok_or_else(|| format!("'{}' is not a top-level hierarchy", first))?;
            for (i, name) in rest.iter().enumerate() {
                cursor = match state.find_child(Some(&cursor), name) {
                    Some(existing) => existing,
                    None => {
                        let ty = if i + 1 == rest.len() { leaf_type } else { "Folder" };
                        state.create(&cursor, &json!({"type": ty, "name": name}), "fail", events)?.0
                    }
                };
            }
            Ok(cursor)
        })
    }

    /// Rename the object at `path`.
    pub fn rename(&self, path: &str, new_name: &str) -> BridgeResult<()> {
        self.edit(|state, events| {
            let id = Self::locate(state, path)?;
            state.rename(&id, new_name, events)
        })
    }

    /// Move the object at `path` under `new_parent`.
    pub fn move_object(&self, path: &str, new_parent: &str) -> BridgeResult<()> {
        self.edit(|state, events| {
            let id = Self::locate(state, path)?;
            let parent = Self::locate(state, new_parent)?;
            state.reparent(&id, &parent, "fail", events).map(|_| ())
        })
    }

    /// Delete the object at `path` and its descendants.
    pub fn delete(&self, path: &str) -> BridgeResult<()> {
        self.edit(|state, events| {
            let id = Self::locate(state, path)?;
            state.remove_subtree(&id, events);
            Ok(())
        })
    }

    /// Replace the UI selection.
    pub fn select(&self, paths: &[&str]) -> BridgeResult<()> {
        self.edit(|state, _| {
            let ids = paths
                .iter()
                .map(|p| Self::locate(state, p))
                .collect::<OpResult<Vec<_>>>()?;
            state.selection = ids;
            Ok(())
        })
    }

    /// Register a game object as if the running game did it.
    pub fn register_game_object(&self, id: u64, name: &str) {
        self.shared.lock().project.game_objects.insert(id, name.to_string());
    }
}

/// [`Connector`] for a [`MemoryProject`].
#[derive(Debug, Clone)]
pub struct MemoryConnector {
    project: MemoryProject,
}

impl MemoryConnector {
    /// The project sessions are opened on.
    pub fn project(&self) -> &MemoryProject {
        &self.project
    }
}

impl Connector for MemoryConnector {
    fn connect(&self, options: &SessionOptions) -> BridgeResult<Box<dyn SessionHandle>> {
        if self.project.shared.lock().refuse_connections {
            return Err(BridgeError::Connection {
                reason: format!("connection to {} refused", options.url),
            });
        }
        debug!(target: "bridge::session", url = %options.url, "Connected to in-memory session");
        Ok(Box::new(MemorySession {
            shared: Arc::clone(&self.project.shared),
            options: options.clone(),
            connected: true,
        }))
    }
}

/// Session handle over a [`MemoryProject`].
#[derive(Debug)]
pub struct MemorySession {
    shared: Arc<Mutex<Shared>>,
    options: SessionOptions,
    connected: bool,
}

impl MemorySession {
    fn ensure_connected(&self) -> BridgeResult<()> {
        if self.connected {
            Ok(())
        } else {
            Err(BridgeError::NotConnected)
        }
    }

    fn timeout(&self, method: &str) -> BridgeError {
        BridgeError::Timeout {
            method: method.to_string(),
            timeout_ms: self.options.call_timeout.as_millis() as u64,
        }
    }

    /// Count the call and consult armed faults for the undo-group methods.
    fn undo_call(&self, shared: &mut Shared, method: &str) -> BridgeResult<()> {
        let nth = shared.count(method);
        match shared.armed_fault(method, nth) {
            Some(FaultKind::Reject(reason)) => Err(BridgeError::remote(method, reason)),
            Some(FaultKind::Timeout) => Err(self.timeout(method)),
            None => Ok(()),
        }
    }
}

impl SessionHandle for MemorySession {
    fn call(&mut self, method: &str, args: JsonValue, options: JsonValue) -> BridgeResult<JsonValue> {
        self.ensure_connected()?;
        let mut shared = self.shared.lock();
        let nth = shared.count(method);
        let fault = shared.armed_fault(method, nth);
        if let Some(FaultKind::Reject(reason)) = &fault {
            return Err(BridgeError::remote(method, reason.as_str()));
        }
        let reply = shared.apply(method, &args, &options, Duration::ZERO);
        if fault == Some(FaultKind::Timeout) {
            return Err(self.timeout(method));
        }
        match reply {
            Reply::Ok(value) => Ok(value),
            Reply::Rejected(reason) => Err(BridgeError::remote(method, reason)),
        }
    }

    fn schedule(&mut self, method: &str, args: JsonValue, due_in: Duration) -> BridgeResult<()> {
        self.ensure_connected()?;
        let mut shared = self.shared.lock();
        let nth = shared.count(method);
        if let Some(FaultKind::Reject(reason)) = shared.armed_fault(method, nth) {
            debug!(target: "bridge::session", method, %reason, "Scheduled call rejected");
            return Ok(());
        }
        if let Reply::Rejected(reason) = shared.apply(method, &args, &JsonValue::Null, due_in) {
            debug!(target: "bridge::session", method, %reason, "Scheduled call rejected");
        }
        Ok(())
    }

    fn subscribe(&mut self, topic: &str, _options: JsonValue) -> BridgeResult<Subscription> {
        self.ensure_connected()?;
        let subscription = Subscription::new(topic);
        self.shared.lock().subscribers.push(subscription.clone());
        Ok(subscription)
    }

    fn unsubscribe(&mut self, id: SubscriptionId) -> BridgeResult<bool> {
        self.ensure_connected()?;
        let mut shared = self.shared.lock();
        let before = shared.subscribers.len();
        shared.subscribers.retain(|s| s.id() != id);
        Ok(shared.subscribers.len() != before)
    }

    fn begin_transaction(&mut self) -> BridgeResult<()> {
        self.ensure_connected()?;
        let mut shared = self.shared.lock();
        self.undo_call(&mut shared, methods::UNDO_BEGIN)?;
        if shared.transaction == TransactionState::Open {
            return Err(BridgeError::TransactionAlreadyActive);
        }
        shared.snapshot = Some(shared.project.clone());
        shared.transaction = TransactionState::Open;
        Ok(())
    }

    fn commit_transaction(&mut self, label: &str) -> BridgeResult<()> {
        self.ensure_connected()?;
        let mut shared = self.shared.lock();
        self.undo_call(&mut shared, methods::UNDO_END)?;
        if shared.transaction != TransactionState::Open {
            return Err(BridgeError::TransactionNotActive);
        }
        shared.snapshot = None;
        shared.transaction = TransactionState::Committed;
        shared.undo_history.push(label.to_string());
        Ok(())
    }

    fn cancel_transaction(&mut self) -> BridgeResult<()> {
        self.ensure_connected()?;
        let mut shared = self.shared.lock();
        if shared.transaction != TransactionState::Open {
            return Err(BridgeError::TransactionNotActive);
        }
        if let Err(e) = self.undo_call(&mut shared, methods::UNDO_CANCEL) {
            // The group is closed but nothing was reverted.
            shared.snapshot = None;
            shared.transaction = TransactionState::NotOpen;
            return Err(e);
        }
        if let Some(snapshot) = shared.snapshot.take() {
            shared.project = snapshot;
        }
        shared.transaction = TransactionState::Cancelled;
        Ok(())
    }

    fn transaction_state(&self) -> TransactionState {
        self.shared.lock().transaction
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn disconnect(&mut self) {
        self.connected = false;
    }
}
