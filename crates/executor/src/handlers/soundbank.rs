//! Soundbank handlers.

use bridge_core::ObjectPath;
use bridge_session::methods;
use serde_json::{json, Value as JsonValue};
use tracing::info;

use crate::bridge::{reply_list, require_non_empty, Remote};
use crate::{Error, Output, Result, Selector};

/// Inclusion filter used when a command gives none.
const DEFAULT_INCLUSION_FILTER: [&str; 3] = ["events", "structures", "media"];

/// Handle IncludeInSoundbank command.
pub fn include_in_soundbank(
    r: &mut Remote<'_>,
    soundbank: ObjectPath,
    targets: Selector,
    filter: Option<Vec<String>>,
) -> Result<Output> {
    let filter: Vec<String> = match filter {
        Some(f) if f.is_empty() => {
            return Err(Error::invalid_input("inclusion filter must not be empty"))
        }
        Some(f) => f,
        None => DEFAULT_INCLUSION_FILTER.iter().map(|s| s.to_string()).collect(),
    };
    if let Some(bad) = filter
        .iter()
        .find(|f| !DEFAULT_INCLUSION_FILTER.contains(&f.as_str()))
    {
        return Err(Error::invalid_input(format!(
            "unknown inclusion filter '{}', expected one of events, structures, media",
            bad
        )));
    }
    let bank = r.resolve(&soundbank)?;
    if bank.object_type != "SoundBank" {
        return Err(Error::invalid_input(format!(
            "{} is a {}, not a SoundBank",
            bank.path, bank.object_type
        )));
    }
    let objects = r.select(&targets)?;

    let inclusions: Vec<JsonValue> = objects
        .iter()
        .map(|o| json!({ "object": o.id.as_str(), "filter": filter }))
        .collect();
    r.call(
        methods::SOUNDBANK_SET_INCLUSIONS,
        json!({
            "soundbank": bank.object_id.as_str(),
            "operation": "add",
            "inclusions": inclusions,
        }),
    )?;
    r.touch(&bank.object_id);
    Ok(Output::Count(objects.len() as u64))
}

/// Handle GenerateSoundbanks command.
///
/// `languages: None` leaves the language list out of the request, which
/// generates every language.
pub fn generate_soundbanks(
    r: &mut Remote<'_>,
    soundbanks: Vec<String>,
    platforms: Vec<String>,
    languages: Option<Vec<String>>,
) -> Result<Output> {
    require_non_empty("soundbanks", &soundbanks)?;
    require_non_empty("platforms", &platforms)?;
    if let Some(languages) = &languages {
        require_non_empty("languages", languages)?;
    }

    let banks: Vec<JsonValue> = soundbanks.iter().map(|n| json!({ "name": n })).collect();
    let mut args = json!({
        "soundbanks": banks,
        "platforms": platforms,
        "writeToDisk": true,
    });
    if let (Some(languages), Some(map)) = (&languages, args.as_object_mut()) {
        map.insert("languages".to_string(), json!(languages));
    }
    let reply = r.call(methods::SOUNDBANK_GENERATE, args)?;
    let log: Vec<String> = reply_list(methods::SOUNDBANK_GENERATE, &reply, "logs")?
        .iter()
        .filter_map(|entry| entry.get("message").and_then(JsonValue::as_str))
        .map(str::to_string)
        .collect();

    info!(target: "bridge::plan", count = soundbanks.len(), "Generated soundbanks");
    Ok(Output::Generated { soundbanks, log })
}
