//! Device and platform configuration resolution.
//!
//! Tunables are read from two layers: per-device overrides and platform-wide
//! defaults, with hard-coded defaults underneath. Resolution happens once at
//! device registration and produces an immutable [`ResolvedSettings`]; the
//! engine never re-reads configuration mid-flight.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use homelink_types::TemperatureUnit;

use crate::retry::RetryBudget;

fn default_refresh_interval_secs() -> f64 {
    120.0
}

fn default_push_debounce_secs() -> f64 {
    0.1
}

fn default_max_attempts() -> u32 {
    2
}

fn default_retry_delay_ms() -> u64 {
    3000
}

fn default_min_lux() -> f64 {
    1.0
}

fn default_max_lux() -> f64 {
    6500.0
}

fn default_lux_steps() -> u8 {
    10
}

fn default_battery_low_threshold() -> u8 {
    15
}

/// Platform-wide defaults, applied to every device that does not override
/// them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformDefaults {
    /// Seconds between scheduled background refreshes.
    pub refresh_interval_secs: f64,
    /// Debounce window for outbound change requests, in seconds.
    pub push_debounce_secs: f64,
    /// Total radio command attempts per push (first try included).
    pub max_attempts: u32,
    /// Fixed delay between radio command attempts, in milliseconds.
    pub retry_delay_ms: u64,
    /// Display unit webhook temperatures are converted into. When unset,
    /// readings in a non-default scale are applied unconverted (with a
    /// warning).
    pub temperature_unit: Option<TemperatureUnit>,
    /// Lux estimate for the lowest raw light-level code.
    pub min_lux: f64,
    /// Lux estimate for the highest raw light-level code.
    pub max_lux: f64,
    /// Number of discrete raw light-level codes.
    pub lux_steps: u8,
    /// Battery percentage at or below which a low-battery event is emitted.
    pub battery_low_threshold: u8,
}

impl Default for PlatformDefaults {
    fn default() -> Self {
        Self {
            refresh_interval_secs: default_refresh_interval_secs(),
            push_debounce_secs: default_push_debounce_secs(),
            max_attempts: default_max_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
            temperature_unit: None,
            min_lux: default_min_lux(),
            max_lux: default_max_lux(),
            lux_steps: default_lux_steps(),
            battery_low_threshold: default_battery_low_threshold(),
        }
    }
}

/// Per-device configuration. Every field is optional; unset fields fall
/// through to the platform defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceOverrides {
    /// Seconds between scheduled background refreshes.
    pub refresh_interval_secs: Option<f64>,
    /// Debounce window for outbound change requests, in seconds.
    pub push_debounce_secs: Option<f64>,
    /// Total radio command attempts per push.
    pub max_attempts: Option<u32>,
    /// Fixed delay between radio command attempts, in milliseconds.
    pub retry_delay_ms: Option<u64>,
    /// Display unit for webhook temperature conversion.
    pub temperature_unit: Option<TemperatureUnit>,
    /// Lux estimate for the lowest raw light-level code.
    pub min_lux: Option<f64>,
    /// Lux estimate for the highest raw light-level code.
    pub max_lux: Option<f64>,
    /// Number of discrete raw light-level codes.
    pub lux_steps: Option<u8>,
    /// Battery percentage at or below which a low-battery event is emitted.
    pub battery_low_threshold: Option<u8>,
    /// Never push "on" commands for this device.
    pub disable_push_on: bool,
    /// Never push "off" commands for this device.
    pub disable_push_off: bool,
    /// Cloud command name overriding the generic `turnOn`.
    pub custom_on: Option<String>,
    /// Cloud command name overriding the generic `turnOff`.
    pub custom_off: Option<String>,
    /// The hub this device reports through.
    pub hub_device_id: Option<String>,
}

/// Lux mapping tuning for radio light-level codes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LuxTuning {
    /// Lux estimate for code 1.
    pub min_lux: f64,
    /// Lux estimate for the highest code.
    pub max_lux: f64,
    /// Number of discrete codes.
    pub steps: u8,
}

impl LuxTuning {
    /// Map a raw light-level code onto the configured lux range.
    ///
    /// Codes are `1..=steps`; out-of-range codes clamp to the nearest bound.
    #[must_use]
    pub fn code_to_lux(&self, code: u8) -> f64 {
        let steps = self.steps.max(2);
        let code = code.clamp(1, steps);
        let span = self.max_lux - self.min_lux;
        self.min_lux + span * f64::from(code - 1) / f64::from(steps - 1)
    }
}

/// Immutable, fully resolved settings for one device.
#[derive(Debug, Clone)]
pub struct ResolvedSettings {
    /// Interval between scheduled background refreshes.
    pub refresh_interval: Duration,
    /// Debounce window for outbound change requests.
    pub push_debounce: Duration,
    /// Retry budget for radio pushes.
    pub retry: RetryBudget,
    /// Display unit for webhook temperature conversion.
    pub temperature_unit: Option<TemperatureUnit>,
    /// Lux mapping tuning.
    pub lux: LuxTuning,
    /// Battery percentage at or below which a low-battery event is emitted.
    pub battery_low_threshold: u8,
    /// Never push "on" commands.
    pub disable_push_on: bool,
    /// Never push "off" commands.
    pub disable_push_off: bool,
    /// Cloud command name overriding the generic `turnOn`.
    pub custom_on: Option<String>,
    /// Cloud command name overriding the generic `turnOff`.
    pub custom_off: Option<String>,
    /// The hub this device reports through.
    pub hub_device_id: Option<String>,
}

impl ResolvedSettings {
    /// Resolve settings for one device: device override, else platform
    /// default, else hard default (already baked into `PlatformDefaults`).
    #[must_use]
    pub fn resolve(overrides: &DeviceOverrides, platform: &PlatformDefaults) -> Self {
        Self {
            refresh_interval: Duration::from_secs_f64(
                overrides
                    .refresh_interval_secs
                    .unwrap_or(platform.refresh_interval_secs),
            ),
            push_debounce: Duration::from_secs_f64(
                overrides
                    .push_debounce_secs
                    .unwrap_or(platform.push_debounce_secs),
            ),
            retry: RetryBudget {
                max_attempts: overrides.max_attempts.unwrap_or(platform.max_attempts),
                delay: Duration::from_millis(
                    overrides.retry_delay_ms.unwrap_or(platform.retry_delay_ms),
                ),
                jitter: false,
            },
            temperature_unit: overrides.temperature_unit.or(platform.temperature_unit),
            lux: LuxTuning {
                min_lux: overrides.min_lux.unwrap_or(platform.min_lux),
                max_lux: overrides.max_lux.unwrap_or(platform.max_lux),
                steps: overrides.lux_steps.unwrap_or(platform.lux_steps),
            },
            battery_low_threshold: overrides
                .battery_low_threshold
                .unwrap_or(platform.battery_low_threshold),
            disable_push_on: overrides.disable_push_on,
            disable_push_off: overrides.disable_push_off,
            custom_on: overrides.custom_on.clone(),
            custom_off: overrides.custom_off.clone(),
            hub_device_id: overrides.hub_device_id.clone(),
        }
    }
}

impl Default for ResolvedSettings {
    fn default() -> Self {
        Self::resolve(&DeviceOverrides::default(), &PlatformDefaults::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hard_defaults() {
        let settings = ResolvedSettings::default();
        assert_eq!(settings.refresh_interval, Duration::from_secs(120));
        assert_eq!(settings.push_debounce, Duration::from_millis(100));
        assert_eq!(settings.retry.max_attempts, 2);
        assert_eq!(settings.retry.delay, Duration::from_millis(3000));
        assert_eq!(settings.temperature_unit, None);
        assert_eq!(settings.lux.steps, 10);
        assert!(!settings.disable_push_on);
    }

    #[test]
    fn test_device_overrides_win_over_platform() {
        let platform = PlatformDefaults {
            max_attempts: 5,
            retry_delay_ms: 1000,
            ..Default::default()
        };
        let overrides = DeviceOverrides {
            max_attempts: Some(3),
            ..Default::default()
        };
        let settings = ResolvedSettings::resolve(&overrides, &platform);
        // Device override wins where set, platform value where not.
        assert_eq!(settings.retry.max_attempts, 3);
        assert_eq!(settings.retry.delay, Duration::from_millis(1000));
    }

    #[test]
    fn test_overrides_deserialize_with_defaults() {
        let overrides: DeviceOverrides =
            serde_json::from_str(r#"{"custom_on": "pressSceneA", "disable_push_off": true}"#)
                .unwrap();
        assert_eq!(overrides.custom_on.as_deref(), Some("pressSceneA"));
        assert!(overrides.disable_push_off);
        assert!(overrides.max_attempts.is_none());
    }

    #[test]
    fn test_lux_mapping_bounds() {
        let lux = LuxTuning {
            min_lux: 1.0,
            max_lux: 6500.0,
            steps: 10,
        };
        assert_eq!(lux.code_to_lux(1), 1.0);
        assert_eq!(lux.code_to_lux(10), 6500.0);
        // Out-of-range codes clamp.
        assert_eq!(lux.code_to_lux(0), 1.0);
        assert_eq!(lux.code_to_lux(200), 6500.0);
        // Interior codes interpolate monotonically.
        assert!(lux.code_to_lux(5) > lux.code_to_lux(4));
    }

    #[test]
    fn test_lux_mapping_is_linear() {
        let lux = LuxTuning {
            min_lux: 0.0,
            max_lux: 90.0,
            steps: 10,
        };
        assert_eq!(lux.code_to_lux(4), 30.0);
        assert_eq!(lux.code_to_lux(7), 60.0);
    }
}
