//! Object authoring handlers.
//!
//! Every handler resolves its targets first and validates its payload before
//! the first mutating call, so a bad command usually fails without touching
//! the project. A failure partway through a batch fails the whole command.

use bridge_core::{property, ObjectPath, ObjectRef, PropertyValue, ResultSet};
use bridge_session::methods;
use serde_json::json;
use tracing::debug;

use crate::bridge::{
    id_and_name, reply_list, require_non_empty, require_parallel, spread, validate_name, Remote,
};
use crate::types::{ImportItem, ImportOperation};
use crate::{Error, Output, Result, Selector};

/// Create `name` of `object_type` under `parent`, renaming on conflict.
pub(crate) fn create_child(
    r: &mut Remote<'_>,
    parent: &ObjectRef,
    name: &str,
    object_type: &str,
) -> Result<ObjectRef> {
    let reply = r.call(
        methods::OBJECT_CREATE,
        json!({
            "parent": parent.id.as_str(),
            "type": object_type,
            "name": name,
            "onNameConflict": "rename",
        }),
    )?;
    let (id, actual) = id_and_name(methods::OBJECT_CREATE, &reply)?;
    r.record_created(&parent.path, id, &actual, object_type)
}

/// Handle CreateObjects command.
pub fn create_objects(
    r: &mut Remote<'_>,
    parent: Selector,
    names: Vec<String>,
    object_types: Vec<String>,
) -> Result<Output> {
    require_non_empty("names", &names)?;
    require_parallel("object_types", names.len(), object_types.len())?;
    for name in &names {
        validate_name(name)?;
    }
    let parents = r.select(&parent)?;
    let parents = spread("parent", &parents, names.len())?;

    let mut produced = ResultSet::new();
    for ((parent, name), object_type) in parents.into_iter().zip(&names).zip(&object_types) {
        produced.push(create_child(r, parent, name, object_type)?);
    }
    debug!(target: "bridge::plan", count = produced.len(), "Created objects");
    Ok(Output::Objects(produced))
}

/// Handle RenameObjects command.
pub fn rename_objects(r: &mut Remote<'_>, targets: Selector, new_names: Vec<String>) -> Result<Output> {
    for name in &new_names {
        validate_name(name)?;
    }
    let objects = r.select(&targets)?;
    require_parallel("new_names", objects.len(), new_names.len())?;

    let mut produced = ResultSet::new();
    for (object, new_name) in objects.into_iter().zip(new_names) {
        let parent = object.path.parent().ok_or_else(|| {
            Error::invalid_input(format!("top-level object {} cannot be renamed", object.path))
        })?;
        r.call(
            methods::OBJECT_SET_NAME,
            json!({ "object": object.id.as_str(), "value": new_name }),
        )?;
        let new_path = parent.join(&new_name)?;
        if r.index.rename_subtree(&object.path, &new_path) == 0 {
            r.index.record(
                new_path.clone(),
                object.id.clone(),
                object.object_type.as_str(),
                Some(parent),
            );
        }
        r.touch(&object.id);
        produced.push(ObjectRef::new(new_path, object.id, object.object_type));
    }
    Ok(Output::Objects(produced))
}

/// Handle MoveObject command.
pub fn move_object(r: &mut Remote<'_>, targets: Selector, new_parent: ObjectPath) -> Result<Output> {
    let objects = r.select(&targets)?;
    let parent = r.resolve(&new_parent)?;
    for object in &objects {
        if parent.path.is_within(&object.path) {
            return Err(Error::invalid_input(format!(
                "cannot move {} under itself ({})",
                object.path, parent.path
            )));
        }
    }

    let mut produced = ResultSet::new();
    for object in objects {
        let reply = r.call(
            methods::OBJECT_MOVE,
            json!({
                "object": object.id.as_str(),
                "parent": parent.object_id.as_str(),
                "onNameConflict": "fail",
            }),
        )?;
        let (_, name) = id_and_name(methods::OBJECT_MOVE, &reply)?;
        let new_path = parent.path.join(&name)?;
        if r.index.rename_subtree(&object.path, &new_path) == 0 {
            r.index.record(
                new_path.clone(),
                object.id.clone(),
                object.object_type.as_str(),
                Some(parent.path.clone()),
            );
        }
        r.touch(&object.id);
        produced.push(ObjectRef::new(new_path, object.id, object.object_type));
    }
    Ok(Output::Objects(produced))
}

/// Handle SetProperty command.
pub fn set_property(
    r: &mut Remote<'_>,
    targets: Selector,
    property: String,
    value: PropertyValue,
) -> Result<Output> {
    let wire = property::validate(&property, &value)?;
    let objects = r.select(&targets)?;
    for object in &objects {
        r.call(
            methods::OBJECT_SET_PROPERTY,
            json!({
                "object": object.id.as_str(),
                "property": property,
                "value": wire,
            }),
        )?;
        r.touch(&object.id);
    }
    Ok(Output::Count(objects.len() as u64))
}

/// Handle ImportAudio command.
pub fn import_audio(
    r: &mut Remote<'_>,
    items: Vec<ImportItem>,
    object_type: Option<String>,
    language: Option<String>,
    operation: ImportOperation,
) -> Result<Output> {
    require_non_empty("items", &items)?;
    for item in &items {
        if item.file.trim().is_empty() {
            return Err(Error::invalid_input("import file must not be empty"));
        }
        if !item.object_path.trim_start().starts_with('\\') {
            return Err(Error::invalid_input(format!(
                "import object path '{}' must be absolute",
                item.object_path
            )));
        }
    }
    let imports: Vec<_> = items
        .iter()
        .map(|item| json!({ "audioFile": item.file, "objectPath": item.object_path }))
        .collect();
    let reply = r.call(
        methods::AUDIO_IMPORT,
        json!({
            "importOperation": operation.as_remote(),
            "default": {
                "importLanguage": language.as_deref().unwrap_or("SFX"),
                "objectType": object_type.as_deref().unwrap_or("Sound"),
            },
            "imports": imports,
        }),
    )?;

    let mut produced = ResultSet::new();
    for record in reply_list(methods::AUDIO_IMPORT, &reply, "objects")? {
        let object = ObjectRef::from_remote(record)?;
        r.index.record(
            object.path.clone(),
            object.id.clone(),
            object.object_type.as_str(),
            object.path.parent(),
        );
        r.touch(&object.id);
        produced.push(object);
    }
    Ok(Output::Objects(produced))
}
