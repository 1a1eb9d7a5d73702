//! Payload parsing for all three transports.
//!
//! Each transport has its own native shape for the same physical state:
//! radio advertisements are compact byte payloads with a leading model tag,
//! cloud poll bodies are JSON in canonical units, and webhook bodies are
//! JSON with an explicit temperature scale tag. Every parser here is pure:
//! it maps a payload to a [`StatusUpdate`] (or a [`ParseError`]) and leaves
//! application to the reconciliation controller.
//!
//! # Radio wire format
//!
//! All families share a two-byte header followed by family-specific fields,
//! little-endian:
//!
//! | Family | Layout after `[model_tag][flags]` |
//! |--------|-----------------------------------|
//! | Meter  | temperature `i16` (×0.1 °C), humidity `u8`, battery `u8` |
//! | Motion | motion `u8`, light code `u8`, battery `u8` |
//! | Lock   | bolt state `u8`, battery `u8` |
//! | Plug   | on `u8` |
//! | Latch  | on `u8`, battery `u8` |

use bytes::Buf;
use serde::Deserialize;

use homelink_types::{
    CanonicalState, DeviceFamily, Field, LockState, ParseError, ParseWarning, StatusUpdate,
    TemperatureUnit, normalize_firmware,
};

use crate::config::LuxTuning;

/// Minimum radio payload length per family (header included).
fn radio_min_len(family: DeviceFamily) -> usize {
    match family {
        DeviceFamily::Meter => 6,
        DeviceFamily::Motion => 5,
        DeviceFamily::Lock => 4,
        DeviceFamily::Plug => 3,
        DeviceFamily::Latch => 4,
    }
}

/// Clamp a reported percentage into 0-100, recording a warning on clamp.
fn clamp_percent(raw: f64, field: Field, warnings: &mut Vec<ParseWarning>) -> u8 {
    if !(0.0..=100.0).contains(&raw) {
        warnings.push(ParseWarning::ValueClamped { field, raw });
    }
    raw.clamp(0.0, 100.0).round() as u8
}

/// Parse a radio advertisement payload.
///
/// The leading model tag must match the expected family; a mismatch means
/// the payload belongs to some other nearby device and the caller must treat
/// this device as unreachable via radio for this attempt.
pub fn parse_radio(
    data: &[u8],
    family: DeviceFamily,
    lux: &LuxTuning,
) -> Result<StatusUpdate, ParseError> {
    let min_len = radio_min_len(family);
    if data.len() < min_len {
        return Err(ParseError::Truncated {
            expected: min_len,
            actual: data.len(),
        });
    }

    let tag = data[0];
    let found = DeviceFamily::from_model_tag(tag)?;
    if found != family {
        return Err(ParseError::ModelMismatch {
            found: tag,
            expected: family_name(family),
        });
    }

    let mut warnings = Vec::new();
    // Skip model tag and flags.
    let mut buf = &data[2..];

    let state = match family {
        DeviceFamily::Meter => {
            let temperature = f64::from(buf.get_i16_le()) * 0.1;
            let humidity = clamp_percent(f64::from(buf.get_u8()), Field::Humidity, &mut warnings);
            let battery = clamp_percent(f64::from(buf.get_u8()), Field::Battery, &mut warnings);
            CanonicalState::Meter {
                temperature: Some(temperature),
                humidity: Some(humidity),
                battery: Some(battery),
            }
        }
        DeviceFamily::Motion => {
            let detected = buf.get_u8() != 0;
            let light_level = lux.code_to_lux(buf.get_u8());
            let battery = clamp_percent(f64::from(buf.get_u8()), Field::Battery, &mut warnings);
            CanonicalState::Motion {
                detected: Some(detected),
                light_level: Some(light_level),
                battery: Some(battery),
            }
        }
        DeviceFamily::Lock => {
            let state = match buf.get_u8() {
                0 => LockState::Unlocked,
                1 => LockState::Locked,
                2 => LockState::Jammed,
                other => {
                    return Err(ParseError::invalid_value(format!(
                        "unknown lock state byte: 0x{other:02X}"
                    )));
                }
            };
            let battery = clamp_percent(f64::from(buf.get_u8()), Field::Battery, &mut warnings);
            CanonicalState::Lock {
                state: Some(state),
                battery: Some(battery),
            }
        }
        DeviceFamily::Plug | DeviceFamily::Latch => {
            let on = buf.get_u8() != 0;
            CanonicalState::Switch { on: Some(on) }
        }
    };

    Ok(StatusUpdate {
        state,
        firmware: None,
        warnings,
    })
}

fn family_name(family: DeviceFamily) -> &'static str {
    match family {
        DeviceFamily::Meter => "Meter",
        DeviceFamily::Motion => "Motion",
        DeviceFamily::Lock => "Lock",
        DeviceFamily::Plug => "Plug",
        DeviceFamily::Latch => "Latch",
    }
}

/// Cloud poll status body. Fields the device does not support are absent;
/// units are already canonical (°C, %RH, lux).
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct CloudStatusBody {
    temperature: Option<f64>,
    humidity: Option<f64>,
    battery: Option<f64>,
    move_detected: Option<bool>,
    light_level: Option<f64>,
    lock_state: Option<String>,
    power: Option<String>,
    version: Option<String>,
}

/// Parse a cloud poll status body.
pub fn parse_cloud_status(
    body: &serde_json::Value,
    family: DeviceFamily,
) -> Result<StatusUpdate, ParseError> {
    let parsed: CloudStatusBody = serde_json::from_value(body.clone())
        .map_err(|e| ParseError::invalid_value(format!("status body: {e}")))?;

    let mut warnings = Vec::new();
    let battery = parsed
        .battery
        .map(|b| clamp_percent(b, Field::Battery, &mut warnings));

    let state = match family {
        DeviceFamily::Meter => CanonicalState::Meter {
            temperature: parsed.temperature,
            humidity: parsed
                .humidity
                .map(|h| clamp_percent(h, Field::Humidity, &mut warnings)),
            battery,
        },
        DeviceFamily::Motion => CanonicalState::Motion {
            detected: parsed.move_detected,
            light_level: parsed.light_level,
            battery,
        },
        DeviceFamily::Lock => {
            let state = match parsed.lock_state.as_deref() {
                Some(raw) => Some(
                    LockState::from_report(raw)
                        .ok_or_else(|| ParseError::invalid_value(format!("lock state: {raw}")))?,
                ),
                None => None,
            };
            CanonicalState::Lock { state, battery }
        }
        DeviceFamily::Plug | DeviceFamily::Latch => CanonicalState::Switch {
            on: parsed.power.as_deref().map(|p| p.eq_ignore_ascii_case("on")),
        },
    };

    Ok(StatusUpdate {
        state,
        firmware: parsed.version.as_deref().map(normalize_firmware),
        warnings,
    })
}

/// Webhook event body. The interesting payload sits under `context`;
/// temperatures carry an explicit scale tag.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct WebhookBody {
    context: WebhookContext,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct WebhookContext {
    temperature: Option<f64>,
    scale: Option<String>,
    humidity: Option<f64>,
    battery: Option<f64>,
    detection_state: Option<String>,
    lock_state: Option<String>,
    power_state: Option<String>,
}

/// Parse a webhook push body.
///
/// The body's temperature scale tag is honored: a non-default scale is
/// converted to the configured display unit, and when no conversion target
/// is configured the value is applied unconverted with a warning — a
/// reportable condition, not a hard error.
pub fn parse_webhook(
    body: &serde_json::Value,
    family: DeviceFamily,
    temperature_unit: Option<TemperatureUnit>,
) -> Result<StatusUpdate, ParseError> {
    let parsed: WebhookBody = serde_json::from_value(body.clone())
        .map_err(|e| ParseError::invalid_value(format!("webhook body: {e}")))?;
    let ctx = parsed.context;

    let mut warnings = Vec::new();

    let temperature = match (ctx.temperature, ctx.scale.as_deref()) {
        (Some(value), Some(tag)) => {
            let scale = TemperatureUnit::from_scale_tag(tag)
                .ok_or_else(|| ParseError::invalid_value(format!("temperature scale: {tag}")))?;
            match scale {
                TemperatureUnit::Celsius => Some(value),
                TemperatureUnit::Fahrenheit => match temperature_unit {
                    Some(_) => Some(TemperatureUnit::Fahrenheit.to_celsius(value)),
                    None => {
                        warnings.push(ParseWarning::UnconvertedTemperatureScale { scale });
                        Some(value)
                    }
                },
            }
        }
        // No scale tag means the value is already canonical.
        (Some(value), None) => Some(value),
        (None, _) => None,
    };

    let battery = ctx
        .battery
        .map(|b| clamp_percent(b, Field::Battery, &mut warnings));

    let state = match family {
        DeviceFamily::Meter => CanonicalState::Meter {
            temperature,
            humidity: ctx
                .humidity
                .map(|h| clamp_percent(h, Field::Humidity, &mut warnings)),
            battery,
        },
        DeviceFamily::Motion => CanonicalState::Motion {
            detected: ctx
                .detection_state
                .as_deref()
                .map(|d| d.eq_ignore_ascii_case("DETECTED")),
            light_level: None,
            battery,
        },
        DeviceFamily::Lock => {
            let state = match ctx.lock_state.as_deref() {
                Some(raw) => Some(
                    LockState::from_report(raw)
                        .ok_or_else(|| ParseError::invalid_value(format!("lock state: {raw}")))?,
                ),
                None => None,
            };
            CanonicalState::Lock { state, battery }
        }
        DeviceFamily::Plug | DeviceFamily::Latch => CanonicalState::Switch {
            on: ctx
                .power_state
                .as_deref()
                .map(|p| p.eq_ignore_ascii_case("ON")),
        },
    };

    Ok(StatusUpdate {
        state,
        firmware: None,
        warnings,
    })
}

/// Encode the radio command payload for a target actuator state.
pub fn radio_command_payload(family: DeviceFamily, on: bool) -> Vec<u8> {
    // 0x57: write command marker, 0x01: actuator opcode.
    match family {
        // A latch press carries no target bit; the device pulses regardless.
        DeviceFamily::Latch => vec![0x57, 0x01, 0x00],
        _ => vec![0x57, 0x01, if on { 0x01 } else { 0x00 }],
    }
}
