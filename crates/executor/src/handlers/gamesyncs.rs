//! Game sync handlers: game parameters, switch groups and state groups.

use std::collections::HashMap;

use bridge_core::{ObjectPath, ObjectRef, ResultSet};
use bridge_session::methods;
use serde_json::{json, Value as JsonValue};

use crate::bridge::{require_non_empty, spread, validate_name, Remote};
use crate::handlers::objects::create_child;
use crate::handlers::query::{list_objects, object_query};
use crate::types::{GameParameterSpec, GameSyncGroup, GameSyncKind, ListFilter};
use crate::{Error, Output, Result, Selector};

const GAME_PARAMETER_ROOT: &str = "\\Game Parameters";
const DEFAULT_GAME_PARAMETER_PARENT: &str = "\\Game Parameters\\Default Work Unit";
const SWITCH_ROOT: &str = "\\Switches";
const STATE_ROOT: &str = "\\States";

/// Handle CreateGameParameters command.
pub fn create_game_parameters(
    r: &mut Remote<'_>,
    parameters: Vec<GameParameterSpec>,
    parent: Option<ObjectPath>,
) -> Result<Output> {
    require_non_empty("parameters", &parameters)?;
    for spec in &parameters {
        validate_name(&spec.name)?;
        if spec.min > spec.max {
            return Err(Error::invalid_input(format!(
                "game parameter '{}': min {} is greater than max {}",
                spec.name, spec.min, spec.max
            )));
        }
        if let Some(initial) = spec.initial_value {
            if initial < spec.min || initial > spec.max {
                return Err(Error::invalid_input(format!(
                    "game parameter '{}': initial value {} is outside [{}, {}]",
                    spec.name, initial, spec.min, spec.max
                )));
            }
        }
    }
    let parent = r.resolve_or(parent.as_ref(), DEFAULT_GAME_PARAMETER_PARENT)?;
    let parent = parent.to_object_ref();

    let mut produced = ResultSet::new();
    for spec in &parameters {
        let object = create_child(r, &parent, &spec.name, "GameParameter")?;
        r.call(
            methods::GAME_PARAMETER_SET_RANGE,
            json!({
                "object": object.id.as_str(),
                "min": spec.min,
                "max": spec.max,
                "onCurveUpdate": "stretch",
            }),
        )?;
        if let Some(initial) = spec.initial_value {
            r.call(
                methods::OBJECT_SET_PROPERTY,
                json!({
                    "object": object.id.as_str(),
                    "property": "InitialValue",
                    "value": initial,
                }),
            )?;
        }
        produced.push(object);
    }
    Ok(Output::Objects(produced))
}

/// Handle CreateGameSyncs command.
pub fn create_game_syncs(
    r: &mut Remote<'_>,
    kind: GameSyncKind,
    parent: Option<Selector>,
    names: Vec<String>,
) -> Result<Output> {
    require_non_empty("names", &names)?;
    for name in &names {
        validate_name(name)?;
    }
    let parents = match (parent, kind.default_parent()) {
        (Some(selector), _) => r.select(&selector)?,
        (None, Some(fallback)) => vec![r.resolve(&ObjectPath::parse(fallback)?)?.to_object_ref()],
        (None, None) => {
            return Err(Error::invalid_input(format!(
                "{} objects need a parent group",
                kind.object_type()
            )))
        }
    };
    if let Some(required) = kind.required_parent_type() {
        if let Some(wrong) = parents.iter().find(|p| p.object_type != required) {
            return Err(Error::invalid_input(format!(
                "{} is a {}, expected a {}",
                wrong.path, wrong.object_type, required
            )));
        }
    }

    let parents = spread("parent", &parents, names.len())?;

    let mut produced = ResultSet::new();
    for (parent, name) in parents.into_iter().zip(&names) {
        produced.push(create_child(r, parent, name, kind.object_type())?);
    }
    Ok(Output::Objects(produced))
}

/// Handle ListGameParameters command.
pub fn list_game_parameters(r: &mut Remote<'_>, filter: Option<String>) -> Result<Output> {
    let filter = ListFilter::parse(filter.as_deref())?;
    let found = list_objects(r, GAME_PARAMETER_ROOT, &["GameParameter"], &filter)?;
    Ok(Output::Listing(found))
}

/// Handle ListSwitchGroups command.
pub fn list_switch_groups(r: &mut Remote<'_>, filter: Option<String>) -> Result<Output> {
    list_groups(r, SWITCH_ROOT, "SwitchGroup", "Switch", filter)
}

/// Handle ListStateGroups command.
pub fn list_state_groups(r: &mut Remote<'_>, filter: Option<String>) -> Result<Output> {
    list_groups(r, STATE_ROOT, "StateGroup", "State", filter)
}

/// Groups matching `filter` with the names of their members. Members are
/// fetched with one descendants query over all matched groups.
fn list_groups(
    r: &mut Remote<'_>,
    root: &str,
    group_type: &str,
    member_type: &str,
    filter: Option<String>,
) -> Result<Output> {
    let filter = ListFilter::parse(filter.as_deref())?;
    let groups: Vec<ObjectRef> = list_objects(r, root, &[group_type], &filter)?;
    if groups.is_empty() {
        return Ok(Output::Groups(Vec::new()));
    }

    let ids: Vec<&str> = groups.iter().map(|g| g.id.as_str()).collect();
    let members = object_query(
        r,
        json!({
            "from": { "id": ids },
            "transform": [
                { "select": ["children"] },
                { "where": ["type:isIn", [member_type]] },
            ],
        }),
        &["name", "parent"],
    )?;

    let mut by_group: HashMap<String, Vec<String>> = HashMap::new();
    for member in &members {
        let parent_id = member
            .get("parent")
            .and_then(|p| p.get("id"))
            .and_then(JsonValue::as_str);
        let name = member.get("name").and_then(JsonValue::as_str);
        if let (Some(parent_id), Some(name)) = (parent_id, name) {
            by_group
                .entry(parent_id.to_string())
                .or_default()
                .push(name.to_string());
        }
    }

    Ok(Output::Groups(
        groups
            .into_iter()
            .map(|group| GameSyncGroup {
                members: by_group.remove(group.id.as_str()).unwrap_or_default(),
                group,
            })
            .collect(),
    ))
}
