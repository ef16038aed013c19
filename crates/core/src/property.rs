//! Object property values and the closed table of known properties
//!
//! Property payloads arriving from the planning agent are loosely typed. They
//! are modelled as a tagged [`PropertyValue`] and checked against
//! [`PROPERTY_TABLE`] before anything is sent to the remote session, so a bad
//! name or out-of-range value fails the command without a round trip.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::{BridgeError, BridgeResult};

/// A property value as supplied by a command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum PropertyValue {
    /// Boolean flag
    Bool(bool),
    /// Integer
    Int(i64),
    /// Floating point
    Real(f64),
    /// Text; for enumerated properties this may name one of the choices
    Text(String),
}

impl PropertyValue {
    /// Short kind name for error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            PropertyValue::Bool(_) => "bool",
            PropertyValue::Int(_) => "int",
            PropertyValue::Real(_) => "real",
            PropertyValue::Text(_) => "text",
        }
    }
}

/// Expected value kind of a known property.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PropertyKind {
    /// Boolean
    Bool,
    /// Integer within an inclusive range
    Int {
        /// Lower bound
        min: i64,
        /// Upper bound
        max: i64,
    },
    /// Real within an inclusive range
    Real {
        /// Lower bound
        min: f64,
        /// Upper bound
        max: f64,
    },
    /// Enumeration encoded as integers
    Choice(&'static [(i64, &'static str)]),
}

/// One row of the property table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PropertySpec {
    /// Remote property identifier
    pub name: &'static str,
    /// Label shown in the authoring UI
    pub label: &'static str,
    /// Expected kind
    pub kind: PropertyKind,
}

const PLAY_TYPE: &[(i64, &str)] = &[(0, "Sequence"), (1, "Random")];
const RANDOM_TYPE: &[(i64, &str)] = &[(0, "Shuffle"), (1, "Standard")];
const PLAY_MODE: &[(i64, &str)] = &[(0, "Continuous"), (1, "Step")];
const LOOP_MODE: &[(i64, &str)] = &[(0, "No. of Loops"), (1, "Infinite")];
const TRANSITION_TYPE: &[(i64, &str)] = &[
    (0, "Xfade (amp)"),
    (1, "Delay"),
    (2, "Sample accurate"),
    (3, "Trigger rate"),
    (4, "Xfade (power)"),
];
const END_OF_PLAYLIST: &[(i64, &str)] = &[(0, "Play in reverse order"), (1, "Restart")];

/// Every property the bridge is allowed to set.
pub const PROPERTY_TABLE: &[PropertySpec] = &[
    // Random / sequence containers
    PropertySpec { name: "RandomOrSequence", label: "Play Type", kind: PropertyKind::Choice(PLAY_TYPE) },
    PropertySpec { name: "NormalOrShuffle", label: "Random Type", kind: PropertyKind::Choice(RANDOM_TYPE) },
    PropertySpec { name: "PlayMechanismStepOrContinuous", label: "Play Mode", kind: PropertyKind::Choice(PLAY_MODE) },
    PropertySpec { name: "PlayMechanismLoop", label: "Loop", kind: PropertyKind::Bool },
    PropertySpec { name: "PlayMechanismInfiniteOrNumberOfLoops", label: "Infinite Looping", kind: PropertyKind::Choice(LOOP_MODE) },
    PropertySpec { name: "PlayMechanismLoopCount", label: "No. of Loops", kind: PropertyKind::Int { min: 1, max: 32767 } },
    PropertySpec { name: "PlayMechanismResetPlaylistEachPlay", label: "Always Reset Playlist", kind: PropertyKind::Bool },
    PropertySpec { name: "PlayMechanismSpecialTransitions", label: "Transitions", kind: PropertyKind::Bool },
    PropertySpec { name: "PlayMechanismSpecialTransitionsType", label: "Transition Type", kind: PropertyKind::Choice(TRANSITION_TYPE) },
    PropertySpec { name: "PlayMechanismSpecialTransitionsValue", label: "Transition Duration (s)", kind: PropertyKind::Real { min: 0.0, max: 3600.0 } },
    PropertySpec { name: "RestartBeginningOrBackward", label: "At End of Playlist", kind: PropertyKind::Choice(END_OF_PLAYLIST) },
    PropertySpec { name: "RandomAvoidRepeating", label: "Limit Repetition", kind: PropertyKind::Bool },
    PropertySpec { name: "RandomAvoidRepeatingCount", label: "Limit Repetition To", kind: PropertyKind::Int { min: 1, max: 999 } },
    // Core mixing
    PropertySpec { name: "Volume", label: "Volume (dB)", kind: PropertyKind::Real { min: -200.0, max: 200.0 } },
    PropertySpec { name: "Pitch", label: "Pitch (cents)", kind: PropertyKind::Real { min: -2400.0, max: 2400.0 } },
    PropertySpec { name: "Lowpass", label: "Low-pass", kind: PropertyKind::Int { min: 0, max: 100 } },
    PropertySpec { name: "Highpass", label: "High-pass", kind: PropertyKind::Int { min: 0, max: 100 } },
    // Sound flags
    PropertySpec { name: "IsStreamingEnabled", label: "Stream", kind: PropertyKind::Bool },
    PropertySpec { name: "IsLoopingEnabled", label: "Loop", kind: PropertyKind::Bool },
    PropertySpec { name: "UseGameAuxSends", label: "Use game-defined auxiliary sends", kind: PropertyKind::Bool },
];

/// Look up a property by its remote identifier.
pub fn lookup(name: &str) -> Option<&'static PropertySpec> {
    PROPERTY_TABLE.iter().find(|spec| spec.name == name)
}

/// Validate `value` for property `name` and produce the wire value.
///
/// Integers are accepted for real-valued properties. Text is accepted for
/// enumerated properties when it matches a choice label (case-insensitive).
///
/// # Errors
///
/// Returns `InvalidProperty` if the name is unknown, the kind does not match,
/// or the value is out of range.
pub fn validate(name: &str, value: &PropertyValue) -> BridgeResult<JsonValue> {
    let spec = lookup(name).ok_or_else(|| BridgeError::InvalidProperty {
        property: name.to_string(),
        reason: "unknown property".to_string(),
    })?;
    let reject = |reason: String| BridgeError::InvalidProperty {
        property: name.to_string(),
        reason,
    };

    match (spec.kind, value) {
        (PropertyKind::Bool, PropertyValue::Bool(b)) => Ok(JsonValue::Bool(*b)),
        (PropertyKind::Int { min, max }, PropertyValue::Int(v)) => {
            if *v < min || *v > max {
                Err(reject(format!("{} is outside {}..={}", v, min, max)))
            } else {
                Ok(JsonValue::from(*v))
            }
        }
        (PropertyKind::Real { min, max }, PropertyValue::Real(v)) => {
            check_real(*v, min, max).map_err(reject)
        }
        (PropertyKind::Real { min, max }, PropertyValue::Int(v)) => {
            check_real(*v as f64, min, max).map_err(reject)
        }
        (PropertyKind::Choice(choices), PropertyValue::Int(v)) => {
            if choices.iter().any(|(code, _)| code == v) {
                Ok(JsonValue::from(*v))
            } else {
                Err(reject(format!("{} is not one of {}", v, describe_choices(choices))))
            }
        }
        (PropertyKind::Choice(choices), PropertyValue::Text(label)) => choices
            .iter()
            .find(|(_, l)| l.eq_ignore_ascii_case(label.trim()))
            .map(|(code, _)| JsonValue::from(*code))
            .ok_or_else(|| {
                reject(format!("'{}' is not one of {}", label, describe_choices(choices)))
            }),
        (kind, value) => Err(reject(format!(
            "expected {}, got {}",
            describe_kind(kind),
            value.kind_name()
        ))),
    }
}

fn check_real(v: f64, min: f64, max: f64) -> Result<JsonValue, String> {
    if !v.is_finite() || v < min || v > max {
        Err(format!("{} is outside {}..={}", v, min, max))
    } else {
        Ok(JsonValue::from(v))
    }
}

fn describe_choices(choices: &[(i64, &str)]) -> String {
    choices
        .iter()
        .map(|(code, label)| format!("{}={}", code, label))
        .collect::<Vec<_>>()
        .join(", ")
}

fn describe_kind(kind: PropertyKind) -> String {
    match kind {
        PropertyKind::Bool => "bool".to_string(),
        PropertyKind::Int { min, max } => format!("int {}..={}", min, max),
        PropertyKind::Real { min, max } => format!("real {}..={}", min, max),
        PropertyKind::Choice(choices) => format!("one of {}", describe_choices(choices)),
    }
}

/// Human-readable help line for one property.
pub fn describe(spec: &PropertySpec) -> String {
    format!("{} - {} ({})", spec.label, spec.name, describe_kind(spec.kind))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_property_rejected() {
        let err = validate("NotAProperty", &PropertyValue::Bool(true)).unwrap_err();
        assert!(matches!(err, BridgeError::InvalidProperty { .. }));
    }

    #[test]
    fn test_bool_property() {
        assert_eq!(
            validate("PlayMechanismLoop", &PropertyValue::Bool(true)).unwrap(),
            JsonValue::Bool(true)
        );
        assert!(validate("PlayMechanismLoop", &PropertyValue::Int(1)).is_err());
    }

    #[test]
    fn test_int_range() {
        assert!(validate("Lowpass", &PropertyValue::Int(50)).is_ok());
        assert!(validate("Lowpass", &PropertyValue::Int(101)).is_err());
        assert!(validate("Lowpass", &PropertyValue::Real(5.0)).is_err());
    }

    #[test]
    fn test_real_accepts_int() {
        assert_eq!(
            validate("Volume", &PropertyValue::Int(-6)).unwrap(),
            JsonValue::from(-6.0)
        );
        assert!(validate("Volume", &PropertyValue::Real(f64::NAN)).is_err());
        assert!(validate("Pitch", &PropertyValue::Real(5000.0)).is_err());
    }

    #[test]
    fn test_choice_by_code_and_label() {
        assert_eq!(
            validate("RandomOrSequence", &PropertyValue::Int(1)).unwrap(),
            JsonValue::from(1)
        );
        assert_eq!(
            validate("RandomOrSequence", &PropertyValue::Text("sequence".into())).unwrap(),
            JsonValue::from(0)
        );
        assert!(validate("RandomOrSequence", &PropertyValue::Int(7)).is_err());
        assert!(validate("RandomOrSequence", &PropertyValue::Text("Loud".into())).is_err());
    }

    #[test]
    fn test_tagged_serde() {
        let value: PropertyValue =
            serde_json::from_str(r#"{"kind":"real","value":-3.5}"#).unwrap();
        assert_eq!(value, PropertyValue::Real(-3.5));
    }

    #[test]
    fn test_table_names_unique() {
        for (i, a) in PROPERTY_TABLE.iter().enumerate() {
            for b in &PROPERTY_TABLE[i + 1..] {
                assert_ne!(a.name, b.name);
            }
        }
    }
}
