//! Read-only query handlers.

use bridge_core::{property, BridgeResult, ObjectRef, ResultSet};
use bridge_session::methods;
use serde_json::{json, Value as JsonValue};

use crate::bridge::{reply_list, Remote};
use crate::types::{ListFilter, ProjectInfo, PropertyInfo};
use crate::{Error, Output, Result};

const EVENT_ROOT: &str = "\\Events";
const REF_FIELDS: [&str; 3] = ["id", "path", "type"];

/// Run an object query and return its records.
pub(crate) fn object_query(r: &mut Remote<'_>, args: JsonValue, fields: &[&str]) -> Result<Vec<JsonValue>> {
    let reply = r.call_with(methods::OBJECT_GET, args, json!({ "return": fields }))?;
    Ok(reply_list(methods::OBJECT_GET, &reply, "return")?.clone())
}

/// Objects of `types` under `root`, narrowed by `filter`.
///
/// One remote query: descendants of the start path, an optional name match,
/// then the type filter.
pub(crate) fn list_objects(
    r: &mut Remote<'_>,
    root: &str,
    types: &[&str],
    filter: &ListFilter,
) -> Result<Vec<ObjectRef>> {
    let (start, name) = match filter {
        ListFilter::All => (root.to_string(), None),
        ListFilter::Under(path) => (path.as_str().to_string(), None),
        ListFilter::Name(fragment) => (root.to_string(), Some(fragment.as_str())),
    };
    let mut transform = vec![json!({ "select": ["descendants"] })];
    if let Some(fragment) = name {
        transform.push(json!({ "where": ["name:matches", fragment] }));
    }
    transform.push(json!({ "where": ["type:isIn", types] }));

    object_query(
        r,
        json!({ "from": { "path": [start] }, "transform": transform }),
        &REF_FIELDS,
    )?
    .iter()
    .map(|record| ObjectRef::from_remote(record).map_err(Error::from))
    .collect()
}

/// Handle ListEvents command.
pub fn list_events(r: &mut Remote<'_>, filter: Option<String>) -> Result<Output> {
    let filter = ListFilter::parse(filter.as_deref())?;
    Ok(Output::Listing(list_objects(r, EVENT_ROOT, &["Event"], &filter)?))
}

/// Handle GetSelection command.
pub fn get_selection(r: &mut Remote<'_>) -> Result<Output> {
    let reply = r.call_with(
        methods::SELECTED_OBJECTS,
        json!({}),
        json!({ "return": REF_FIELDS }),
    )?;
    let selected = reply_list(methods::SELECTED_OBJECTS, &reply, "objects")?
        .iter()
        .map(ObjectRef::from_remote)
        .collect::<BridgeResult<ResultSet>>()?;
    Ok(Output::Objects(selected))
}

/// Handle GetProjectInfo command.
pub fn get_project_info(r: &mut Remote<'_>) -> Result<Output> {
    let reply = r.call(methods::PROJECT_INFO, json!({}))?;
    let text = |key: &str| {
        reply
            .get(key)
            .and_then(JsonValue::as_str)
            .unwrap_or_default()
            .to_string()
    };
    let names = |key: &str| -> Vec<String> {
        reply
            .get(key)
            .and_then(JsonValue::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|i| i.get("name").and_then(JsonValue::as_str))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    };
    Ok(Output::ProjectInfo(ProjectInfo {
        name: text("name"),
        path: text("path"),
        platforms: names("platforms"),
        languages: names("languages"),
    }))
}

/// Handle ListProperties command.
pub fn list_properties() -> Result<Output> {
    Ok(Output::Properties(
        property::PROPERTY_TABLE
            .iter()
            .map(|spec| PropertyInfo {
                name: spec.name.to_string(),
                label: spec.label.to_string(),
                accepts: property::describe(spec),
            })
            .collect(),
    ))
}
