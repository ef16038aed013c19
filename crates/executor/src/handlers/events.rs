//! Event creation handler.

use bridge_core::{EventAction, ObjectPath, ResultSet};
use bridge_index::IndexEntry;
use bridge_session::methods;
use serde_json::json;

use crate::bridge::{id_and_name, require_non_empty, require_parallel, spread, validate_name, Remote};
use crate::{Error, Output, Result, Selector};

const DEFAULT_EVENT_PARENT: &str = "\\Events\\Default Work Unit";

/// Name of an event derived from its action and target, e.g. `Play_Footsteps`.
fn derived_name(action: EventAction, target: &str) -> String {
    let verb = action.as_str();
    let mut chars = verb.chars();
    let capitalized = match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
        None => String::new(),
    };
    format!("{}_{}", capitalized, target)
}

/// Handle CreateEvents command.
///
/// `actions` and `parents` each hold one entry for the whole batch or one
/// per target; no `parents` means the default event work unit. Each event is
/// created with `onNameConflict = rename` and receives one action child
/// carrying `@ActionType` and `@Target`.
pub fn create_events(
    r: &mut Remote<'_>,
    targets: Selector,
    names: Vec<String>,
    actions: Vec<EventAction>,
    parents: Vec<ObjectPath>,
) -> Result<Output> {
    require_non_empty("actions", &actions)?;
    let sources = r.select(&targets)?;
    let actions = spread("actions", &actions, sources.len())?;
    let names = if names.is_empty() {
        sources
            .iter()
            .zip(&actions)
            .map(|(s, action)| derived_name(**action, s.path.name()))
            .collect()
    } else {
        require_parallel("names", sources.len(), names.len())?;
        names
    };
    for name in &names {
        validate_name(name)?;
    }
    for (source, action) in sources.iter().zip(&actions) {
        if !action.allowed_on(&source.object_type) {
            return Err(Error::invalid_input(format!(
                "action '{}' cannot target {} of type {}",
                action, source.path, source.object_type
            )));
        }
    }
    let destinations = if parents.is_empty() {
        vec![r.resolve_or(None, DEFAULT_EVENT_PARENT)?]
    } else {
        parents
            .iter()
            .map(|p| r.resolve(p))
            .collect::<Result<Vec<IndexEntry>>>()?
    };
    let destinations = spread("parents", &destinations, sources.len())?;

    let mut produced = ResultSet::new();
    for (((source, name), action), parent) in sources.iter().zip(&names).zip(actions).zip(destinations) {
        let reply = r.call(
            methods::OBJECT_CREATE,
            json!({
                "parent": parent.object_id.as_str(),
                "type": "Event",
                "name": name,
                "onNameConflict": "rename",
            }),
        )?;
        let (event_id, event_name) = id_and_name(methods::OBJECT_CREATE, &reply)?;
        let event = r.record_created(&parent.path, event_id, &event_name, "Event")?;

        let reply = r.call(
            methods::OBJECT_CREATE,
            json!({
                "parent": event.id.as_str(),
                "type": "Action",
                "name": event_name,
                "@ActionType": action.code(),
                "@Target": source.id.as_str(),
            }),
        )?;
        let (action_id, action_name) = id_and_name(methods::OBJECT_CREATE, &reply)?;
        r.record_created(&event.path, action_id, &action_name, "Action")?;
        produced.push(event);
    }
    Ok(Output::Objects(produced))
}
