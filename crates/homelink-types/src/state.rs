//! Canonical device state and the presentation-layer field vocabulary.

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::types::{DeviceFamily, LockState, TemperatureUnit};

/// One presentation-layer field of a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Field {
    /// Temperature in degrees Celsius.
    Temperature,
    /// Relative humidity percentage (0-100).
    Humidity,
    /// Battery level percentage (0-100).
    Battery,
    /// Motion detected flag.
    MotionDetected,
    /// Ambient light level in lux.
    LightLevel,
    /// Lock bolt state.
    LockState,
    /// Primary actuator state (on/secured).
    On,
    /// Normalized firmware version string.
    FirmwareVersion,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Temperature => write!(f, "temperature"),
            Field::Humidity => write!(f, "humidity"),
            Field::Battery => write!(f, "battery"),
            Field::MotionDetected => write!(f, "motion_detected"),
            Field::LightLevel => write!(f, "light_level"),
            Field::LockState => write!(f, "lock_state"),
            Field::On => write!(f, "on"),
            Field::FirmwareVersion => write!(f, "firmware_version"),
        }
    }
}

/// Value written into a presentation-layer field.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "snake_case"))]
pub enum FieldValue {
    /// Boolean field.
    Bool { value: bool },
    /// Numeric field.
    Float { value: f64 },
    /// Textual field.
    Text { value: String },
    /// Error marker: a transport call failed and the field's real value is
    /// unknown. Replaces a stale value rather than leaving it in place.
    Fault,
}

impl FieldValue {
    /// Boolean constructor.
    pub fn bool(value: bool) -> Self {
        Self::Bool { value }
    }

    /// Numeric constructor.
    pub fn float(value: impl Into<f64>) -> Self {
        Self::Float {
            value: value.into(),
        }
    }

    /// Text constructor.
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text {
            value: value.into(),
        }
    }
}

/// Canonical, unit-consistent state of one device, independent of which
/// transport produced it.
///
/// A `None` field means the transport did not report that field; the
/// previously exposed value is retained. A fresh record supersedes the old
/// one wholesale; there is no field-by-field merging beyond that rule.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "family", rename_all = "snake_case"))]
pub enum CanonicalState {
    /// Temperature/humidity sensor.
    Meter {
        /// Degrees Celsius.
        temperature: Option<f64>,
        /// Relative humidity, clamped to 0-100.
        humidity: Option<u8>,
        /// Battery percentage, clamped to 0-100.
        battery: Option<u8>,
    },
    /// Motion sensor.
    Motion {
        /// Motion currently detected.
        detected: Option<bool>,
        /// Ambient light estimate in lux.
        light_level: Option<f64>,
        /// Battery percentage, clamped to 0-100.
        battery: Option<u8>,
    },
    /// Deadbolt lock.
    Lock {
        /// Bolt state.
        state: Option<LockState>,
        /// Battery percentage, clamped to 0-100.
        battery: Option<u8>,
    },
    /// On/off actuator (plug or momentary latch).
    Switch {
        /// Actuator state.
        on: Option<bool>,
    },
}

impl CanonicalState {
    /// An empty record for a family (every field unreported).
    #[must_use]
    pub fn empty(family: DeviceFamily) -> Self {
        match family {
            DeviceFamily::Meter => CanonicalState::Meter {
                temperature: None,
                humidity: None,
                battery: None,
            },
            DeviceFamily::Motion => CanonicalState::Motion {
                detected: None,
                light_level: None,
                battery: None,
            },
            DeviceFamily::Lock => CanonicalState::Lock {
                state: None,
                battery: None,
            },
            DeviceFamily::Plug | DeviceFamily::Latch => CanonicalState::Switch { on: None },
        }
    }

    /// The battery level, if this family reports one and the record has it.
    #[must_use]
    pub fn battery(&self) -> Option<u8> {
        match self {
            CanonicalState::Meter { battery, .. }
            | CanonicalState::Motion { battery, .. }
            | CanonicalState::Lock { battery, .. } => *battery,
            CanonicalState::Switch { .. } => None,
        }
    }

    /// The reported fields as `(field, value)` pairs, ready to be written
    /// into the presentation layer. Unreported (`None`) fields are absent.
    #[must_use]
    pub fn reported_fields(&self) -> Vec<(Field, FieldValue)> {
        let mut out = Vec::new();
        match self {
            CanonicalState::Meter {
                temperature,
                humidity,
                battery,
            } => {
                if let Some(t) = temperature {
                    out.push((Field::Temperature, FieldValue::float(*t)));
                }
                if let Some(h) = humidity {
                    out.push((Field::Humidity, FieldValue::float(*h)));
                }
                if let Some(b) = battery {
                    out.push((Field::Battery, FieldValue::float(*b)));
                }
            }
            CanonicalState::Motion {
                detected,
                light_level,
                battery,
            } => {
                if let Some(d) = detected {
                    out.push((Field::MotionDetected, FieldValue::bool(*d)));
                }
                if let Some(l) = light_level {
                    out.push((Field::LightLevel, FieldValue::float(*l)));
                }
                if let Some(b) = battery {
                    out.push((Field::Battery, FieldValue::float(*b)));
                }
            }
            CanonicalState::Lock { state, battery } => {
                if let Some(s) = state {
                    out.push((Field::LockState, FieldValue::text(s.to_string())));
                }
                if let Some(b) = battery {
                    out.push((Field::Battery, FieldValue::float(*b)));
                }
            }
            CanonicalState::Switch { on } => {
                if let Some(o) = on {
                    out.push((Field::On, FieldValue::bool(*o)));
                }
            }
        }
        out
    }

}

/// Warning raised while parsing a payload. Warnings do not fail the parse;
/// the caller decides how to report them.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "snake_case"))]
#[non_exhaustive]
pub enum ParseWarning {
    /// A webhook payload carried a non-default temperature scale but no
    /// conversion target is configured; the value was applied unconverted.
    UnconvertedTemperatureScale {
        /// The scale the payload reported.
        scale: TemperatureUnit,
    },
    /// A reported value was outside its declared range and was clamped.
    ValueClamped {
        /// The field that was clamped.
        field: Field,
        /// The raw value before clamping.
        raw: f64,
    },
}

impl fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseWarning::UnconvertedTemperatureScale { scale } => write!(
                f,
                "temperature reported in {scale} but no conversion target is configured; applied unconverted"
            ),
            ParseWarning::ValueClamped { field, raw } => {
                write!(f, "{field} value {raw} outside valid range, clamped")
            }
        }
    }
}

/// The full result of parsing one payload: the canonical state plus any
/// auxiliary data the payload carried.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StatusUpdate {
    /// Parsed canonical state.
    pub state: CanonicalState,
    /// Normalized firmware version, when the payload reported one.
    pub firmware: Option<String>,
    /// Warnings raised during parsing.
    pub warnings: Vec<ParseWarning>,
}

impl StatusUpdate {
    /// An update with no firmware info and no warnings.
    #[must_use]
    pub fn new(state: CanonicalState) -> Self {
        Self {
            state,
            firmware: None,
            warnings: Vec::new(),
        }
    }
}
