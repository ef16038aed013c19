//! Sound engine handlers.
//!
//! Game objects are addressed by name. A name is looked up
//! case-insensitively among the registered game objects; when absent the
//! object is registered with a fresh random id and routed to the default
//! listener, which is registered first if needed.
//!
//! Ramps send their first sample as a direct call, so a bad RTPC or game
//! object fails the command, and schedule the remaining samples.

use std::time::Duration;

use bridge_core::ramp::{self, Sample};
use bridge_core::Vec3;
use bridge_session::methods;
use rand::Rng;
use serde_json::{json, Value as JsonValue};
use tracing::debug;

use crate::bridge::{reply_list, require_non_empty, require_parallel, Remote};
use crate::types::GameObjectInfo;
use crate::{Error, Output, Result};

const LISTENER_NAME: &str = "Listener";
const MAX_ID_ATTEMPTS: usize = 64;

// =============================================================================
// Game object lookup
// =============================================================================

/// Game objects currently registered with the engine.
pub(crate) fn game_objects(r: &mut Remote<'_>) -> Result<Vec<GameObjectInfo>> {
    let reply = r.call(methods::PROFILER_GAME_OBJECTS, json!({ "time": "capture" }))?;
    Ok(reply_list(methods::PROFILER_GAME_OBJECTS, &reply, "return")?
        .iter()
        .filter_map(|go| {
            Some(GameObjectInfo {
                id: go.get("id").and_then(JsonValue::as_u64)?,
                name: go.get("name").and_then(JsonValue::as_str)?.to_string(),
            })
        })
        .collect())
}

fn find_named<'a>(objects: &'a [GameObjectInfo], name: &str) -> Option<&'a GameObjectInfo> {
    let wanted = name.trim().to_lowercase();
    objects
        .iter()
        .find(|go| !go.name.trim().is_empty() && go.name.trim().to_lowercase() == wanted)
}

/// Registered game object called `name`.
fn find_game_object(r: &mut Remote<'_>, name: &str) -> Result<GameObjectInfo> {
    let objects = game_objects(r)?;
    find_named(&objects, name)
        .cloned()
        .ok_or_else(|| Error::GameObjectNotFound {
            name: name.to_string(),
        })
}

/// Game object called `name`, registering it when absent.
pub(crate) fn ensure_game_object(r: &mut Remote<'_>, name: &str) -> Result<GameObjectInfo> {
    if name.trim().is_empty() {
        return Err(Error::invalid_input("game object names must not be empty"));
    }
    let objects = game_objects(r)?;
    if let Some(found) = find_named(&objects, name) {
        return Ok(found.clone());
    }

    let listener = r.config.listener_id;
    if !objects.iter().any(|go| go.id == listener) {
        r.call(
            methods::REGISTER_GAME_OBJECT,
            json!({ "gameObject": listener, "name": LISTENER_NAME }),
        )?;
        r.call(
            methods::SET_DEFAULT_LISTENERS,
            json!({ "listeners": [listener] }),
        )?;
    }

    let mut rng = rand::thread_rng();
    let id = (0..MAX_ID_ATTEMPTS)
        .map(|_| u64::from(rng.gen::<u32>() >> 1))
        .find(|candidate| {
            *candidate != 0 && *candidate != listener && !objects.iter().any(|go| go.id == *candidate)
        })
        .ok_or_else(|| Error::Internal {
            reason: "could not allocate a unique game object id".to_string(),
        })?;
    r.call(
        methods::REGISTER_GAME_OBJECT,
        json!({ "gameObject": id, "name": name }),
    )?;
    r.call(
        methods::SET_LISTENERS,
        json!({ "emitter": id, "listeners": [listener] }),
    )?;
    debug!(target: "bridge::plan", id, name, "Registered game object");
    Ok(GameObjectInfo {
        id,
        name: name.to_string(),
    })
}

/// `name`, or the configured default game object.
fn target_name(r: &Remote<'_>, name: Option<String>) -> String {
    name.filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| r.config.default_game_object.clone())
}

// =============================================================================
// Individual Handlers
// =============================================================================

/// Handle ListGameObjects command.
pub fn list_game_objects(r: &mut Remote<'_>) -> Result<Output> {
    Ok(Output::GameObjects(game_objects(r)?))
}

/// A position payload as the engine expects it.
fn placement(position: Vec3, front: Vec3, top: Vec3) -> JsonValue {
    json!({
        "position": position.to_json(),
        "orientationFront": front.to_json(),
        "orientationTop": top.to_json(),
    })
}

fn is_finite(v: Vec3) -> bool {
    v.x.is_finite() && v.y.is_finite() && v.z.is_finite()
}

/// Handle RegisterGameObjects command.
pub fn register_game_objects(
    r: &mut Remote<'_>,
    names: Vec<String>,
    positions: Vec<Vec3>,
) -> Result<Output> {
    require_non_empty("names", &names)?;
    if !positions.is_empty() {
        require_parallel("positions", names.len(), positions.len())?;
        if !positions.iter().all(|p| is_finite(*p)) {
            return Err(Error::invalid_input("positions must be finite"));
        }
    }
    let mut registered = Vec::with_capacity(names.len());
    for (i, name) in names.iter().enumerate() {
        let go = ensure_game_object(r, name)?;
        if let Some(position) = positions.get(i) {
            r.call(
                methods::SET_POSITION,
                json!({
                    "gameObject": go.id,
                    "position": placement(*position, Vec3::FRONT, Vec3::TOP),
                }),
            )?;
        }
        registered.push(go);
    }
    Ok(Output::GameObjects(registered))
}

/// Handle UnregisterGameObject command.
pub fn unregister_game_object(r: &mut Remote<'_>, name: String) -> Result<Output> {
    let target = find_game_object(r, &name)?;
    r.call(
        methods::UNREGISTER_GAME_OBJECT,
        json!({ "gameObject": target.id }),
    )?;
    Ok(Output::Unit)
}

/// Handle PostEvent command.
pub fn post_event(
    r: &mut Remote<'_>,
    event: String,
    game_object: Option<String>,
    delay_ms: i64,
) -> Result<Output> {
    if delay_ms < 0 {
        return Err(Error::invalid_input("delay_ms must be >= 0"));
    }
    if event.trim().is_empty() {
        return Err(Error::invalid_input("event name must not be empty"));
    }
    let name = target_name(r, game_object);
    let target = ensure_game_object(r, &name)?;
    let args = json!({ "event": event, "gameObject": target.id });

    let playing_id = if delay_ms == 0 {
        let reply = r.call(methods::POST_EVENT, args)?;
        reply.get("playingId").and_then(JsonValue::as_u64)
    } else {
        r.schedule(methods::POST_EVENT, args, Duration::from_millis(delay_ms as u64))?;
        None
    };
    Ok(Output::Posted {
        game_object: target,
        playing_id,
    })
}

/// Send the first sample directly and schedule the rest.
fn issue_samples<T: Copy>(
    r: &mut Remote<'_>,
    method: &str,
    samples: &[Sample<T>],
    args: impl Fn(T) -> JsonValue,
) -> Result<Output> {
    let Some((first, rest)) = samples.split_first() else {
        return Ok(Output::Scheduled { samples: 0 });
    };
    r.call(method, args(first.value))?;
    for sample in rest {
        r.schedule(method, args(sample.value), sample.due_in)?;
    }
    Ok(Output::Scheduled {
        samples: samples.len(),
    })
}

/// Handle SetRtpc command.
pub fn set_rtpc(
    r: &mut Remote<'_>,
    rtpc: String,
    from: f64,
    to: f64,
    duration_ms: u64,
    game_object: Option<String>,
) -> Result<Output> {
    if rtpc.trim().is_empty() {
        return Err(Error::invalid_input("rtpc name must not be empty"));
    }
    if !from.is_finite() || !to.is_finite() {
        return Err(Error::invalid_input("rtpc values must be finite"));
    }
    let target = match game_object.filter(|n| !n.trim().is_empty()) {
        Some(name) => Some(ensure_game_object(r, &name)?),
        None => None,
    };
    let samples = ramp::scalar_ramp(from, to, Duration::from_millis(duration_ms), r.config.rtpc_step());
    issue_samples(r, methods::SET_RTPC_VALUE, &samples, |value| match &target {
        Some(go) => json!({ "rtpc": rtpc, "value": value, "gameObject": go.id }),
        None => json!({ "rtpc": rtpc, "value": value }),
    })
}

/// Handle SetSwitch command.
pub fn set_switch(
    r: &mut Remote<'_>,
    switch_group: String,
    switch: String,
    game_object: Option<String>,
) -> Result<Output> {
    let name = target_name(r, game_object);
    let target = ensure_game_object(r, &name)?;
    r.call(
        methods::SET_SWITCH,
        json!({
            "switchGroup": switch_group,
            "switchState": switch,
            "gameObject": target.id,
        }),
    )?;
    Ok(Output::Unit)
}

/// Handle SetState command.
pub fn set_state(r: &mut Remote<'_>, state_group: String, state: String) -> Result<Output> {
    r.call(
        methods::SET_STATE,
        json!({ "stateGroup": state_group, "state": state }),
    )?;
    Ok(Output::Unit)
}

/// Handle MoveGameObject command.
#[allow(clippy::too_many_arguments)]
pub fn move_game_object(
    r: &mut Remote<'_>,
    game_object: String,
    from: Vec3,
    to: Vec3,
    duration_ms: u64,
    front: Option<Vec3>,
    top: Option<Vec3>,
) -> Result<Output> {
    if !is_finite(from) || !is_finite(to) {
        return Err(Error::invalid_input("positions must be finite"));
    }
    let (front, top) = ramp::orthonormalize(front.unwrap_or(Vec3::FRONT), top.unwrap_or(Vec3::TOP));
    let target = ensure_game_object(r, &game_object)?;
    let samples = ramp::position_ramp(from, to, Duration::from_millis(duration_ms), r.config.position_step());
    issue_samples(r, methods::SET_POSITION, &samples, |position| {
        json!({
            "gameObject": target.id,
            "position": placement(position, front, top),
        })
    })
}

/// Handle StopAllSounds command.
pub fn stop_all_sounds(r: &mut Remote<'_>, game_object: Option<String>) -> Result<Output> {
    let args = match game_object.filter(|n| !n.trim().is_empty()) {
        Some(name) => json!({ "gameObject": find_game_object(r, &name)?.id }),
        None => json!({}),
    };
    r.call(methods::STOP_ALL, args)?;
    Ok(Output::Unit)
}
