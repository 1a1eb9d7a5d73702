//! Device identity, families and supporting enums.

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::ParseError;
use crate::state::Field;

/// Supported device family.
///
/// Each family has a one-byte model tag that radio advertisements carry as
/// their first byte. The set is closed: the parser is the only code allowed
/// to construct a [`crate::CanonicalState`], and it dispatches on this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(u8)]
pub enum DeviceFamily {
    /// Temperature/humidity sensor with battery reporting.
    Meter = 0x54,
    /// Motion sensor with ambient light level and battery reporting.
    Motion = 0x73,
    /// Deadbolt lock with battery reporting.
    Lock = 0x6F,
    /// Mains-powered on/off plug.
    Plug = 0x67,
    /// Momentary press actuator (simulates a finger on a physical button).
    Latch = 0x48,
}

impl DeviceFamily {
    /// The model tag this family uses in radio advertisements.
    #[must_use]
    pub fn model_tag(&self) -> u8 {
        *self as u8
    }

    /// Resolve a family from a radio model tag.
    pub fn from_model_tag(tag: u8) -> Result<Self, ParseError> {
        match tag {
            0x54 => Ok(DeviceFamily::Meter),
            0x73 => Ok(DeviceFamily::Motion),
            0x6F => Ok(DeviceFamily::Lock),
            0x67 => Ok(DeviceFamily::Plug),
            0x48 => Ok(DeviceFamily::Latch),
            other => Err(ParseError::UnknownModelTag(other)),
        }
    }

    /// Whether this family's actuator is momentary: a successful push leaves
    /// no persistent "on" state on the physical device.
    #[must_use]
    pub fn is_momentary(&self) -> bool {
        matches!(self, DeviceFamily::Latch)
    }

    /// The presentation-layer fields this family exposes.
    ///
    /// Used to write fault markers: when a transport call fails with an
    /// exception, every field of the family is marked rather than left stale.
    #[must_use]
    pub fn fields(&self) -> &'static [Field] {
        match self {
            DeviceFamily::Meter => &[Field::Temperature, Field::Humidity, Field::Battery],
            DeviceFamily::Motion => &[Field::MotionDetected, Field::LightLevel, Field::Battery],
            DeviceFamily::Lock => &[Field::LockState, Field::Battery],
            DeviceFamily::Plug => &[Field::On],
            DeviceFamily::Latch => &[Field::On, Field::Battery],
        }
    }
}

impl fmt::Display for DeviceFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceFamily::Meter => write!(f, "Meter"),
            DeviceFamily::Motion => write!(f, "Motion"),
            DeviceFamily::Lock => write!(f, "Lock"),
            DeviceFamily::Plug => write!(f, "Plug"),
            DeviceFamily::Latch => write!(f, "Latch"),
        }
    }
}

/// How a device is reachable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ConnectionType {
    /// Short-range radio only; the cloud is never used for this device.
    RadioOnly,
    /// Cloud only; radio is never used for this device.
    CloudOnly,
    /// Radio preferred, cloud used as fallback when radio fails.
    RadioWithCloudFallback,
}

impl ConnectionType {
    /// Whether radio is part of this device's transport set.
    #[must_use]
    pub fn uses_radio(&self) -> bool {
        matches!(
            self,
            ConnectionType::RadioOnly | ConnectionType::RadioWithCloudFallback
        )
    }

    /// Whether the cloud is part of this device's transport set.
    #[must_use]
    pub fn uses_cloud(&self) -> bool {
        matches!(
            self,
            ConnectionType::CloudOnly | ConnectionType::RadioWithCloudFallback
        )
    }

    /// Whether the device cannot function without cloud access.
    #[must_use]
    pub fn requires_cloud(&self) -> bool {
        matches!(self, ConnectionType::CloudOnly)
    }

    /// Whether a failed radio operation may retry via the cloud.
    #[must_use]
    pub fn has_cloud_fallback(&self) -> bool {
        matches!(self, ConnectionType::RadioWithCloudFallback)
    }
}

/// Temperature display unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "UPPERCASE"))]
pub enum TemperatureUnit {
    /// Degrees Celsius (the canonical unit).
    Celsius,
    /// Degrees Fahrenheit.
    Fahrenheit,
}

impl TemperatureUnit {
    /// Convert a value expressed in `self` into degrees Celsius.
    #[must_use]
    pub fn to_celsius(&self, value: f64) -> f64 {
        match self {
            TemperatureUnit::Celsius => value,
            TemperatureUnit::Fahrenheit => (value - 32.0) * 5.0 / 9.0,
        }
    }

    /// Parse a webhook scale tag (`"CELSIUS"` / `"FAHRENHEIT"`).
    #[must_use]
    pub fn from_scale_tag(tag: &str) -> Option<Self> {
        match tag.to_ascii_uppercase().as_str() {
            "CELSIUS" | "C" => Some(TemperatureUnit::Celsius),
            "FAHRENHEIT" | "F" => Some(TemperatureUnit::Fahrenheit),
            _ => None,
        }
    }
}

impl fmt::Display for TemperatureUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemperatureUnit::Celsius => write!(f, "°C"),
            TemperatureUnit::Fahrenheit => write!(f, "°F"),
        }
    }
}

/// State of a lock bolt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "UPPERCASE"))]
pub enum LockState {
    /// Bolt retracted.
    Unlocked,
    /// Bolt extended and secured.
    Locked,
    /// Bolt neither fully extended nor retracted.
    Jammed,
}

impl LockState {
    /// Parse a cloud/webhook lock state string.
    #[must_use]
    pub fn from_report(value: &str) -> Option<Self> {
        match value.to_ascii_uppercase().as_str() {
            "LOCKED" => Some(LockState::Locked),
            "UNLOCKED" => Some(LockState::Unlocked),
            "JAMMED" => Some(LockState::Jammed),
            _ => None,
        }
    }
}

impl fmt::Display for LockState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockState::Unlocked => write!(f, "unlocked"),
            LockState::Locked => write!(f, "locked"),
            LockState::Jammed => write!(f, "jammed"),
        }
    }
}

/// Immutable identity of one bridged device.
///
/// Built once at device registration and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DeviceIdentity {
    /// Unique device id (radio MAC or vendor cloud id).
    pub id: String,
    /// Device family.
    pub family: DeviceFamily,
    /// Configured transport set.
    pub connection_type: ConnectionType,
    /// The hub this device reports through, if any. A hub id equal to the
    /// device's own id (or the all-zero placeholder) means the device is its
    /// own hub.
    pub hub_device_id: Option<String>,
}

impl DeviceIdentity {
    /// Create a new identity.
    pub fn new(id: impl Into<String>, family: DeviceFamily, connection_type: ConnectionType) -> Self {
        Self {
            id: id.into(),
            family,
            connection_type,
            hub_device_id: None,
        }
    }

    /// Set the hub device id.
    #[must_use]
    pub fn with_hub(mut self, hub_device_id: impl Into<String>) -> Self {
        self.hub_device_id = Some(hub_device_id.into());
        self
    }
}
