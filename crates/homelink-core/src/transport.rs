//! Transport contracts.
//!
//! The engine talks to the outside world through two narrow trait seams: a
//! radio transport (discover, single-shot advertisement monitor, command
//! write) and a cloud transport (status query, command request). Concrete
//! implementations live in [`crate::radio`] and [`crate::cloud`]; mock
//! implementations for tests live in [`crate::mock`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use homelink_types::DeviceFamily;

use crate::config::ResolvedSettings;
use crate::error::Result;

/// Which transport produced or carried a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    /// Short-range radio broadcast.
    Radio,
    /// Cloud request/response polling.
    CloudPoll,
    /// Cloud push webhook.
    Webhook,
}

impl std::fmt::Display for TransportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportKind::Radio => write!(f, "radio"),
            TransportKind::CloudPoll => write!(f, "cloud-poll"),
            TransportKind::Webhook => write!(f, "webhook"),
        }
    }
}

/// A discovered, addressable radio device.
#[async_trait]
pub trait RadioHandle: Send + Sync {
    /// Listen for one advertisement from this device and return its raw
    /// payload. The monitoring window is time-bounded by the transport;
    /// expiry surfaces as a timeout error.
    async fn monitor_advertisement(&self) -> Result<Vec<u8>>;

    /// Deliver one command payload to the device.
    async fn command(&self, payload: &[u8]) -> Result<()>;
}

/// Short-range radio transport.
#[async_trait]
pub trait RadioTransport: Send + Sync {
    /// Discover the device with the given family's model tag and device id.
    async fn discover(&self, family: DeviceFamily, device_id: &str) -> Result<Box<dyn RadioHandle>>;
}

/// One cloud command request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudCommand {
    /// Command name.
    pub command: String,
    /// Command parameter.
    pub parameter: String,
    /// `"command"` for generic commands, `"customize"` for device-specific
    /// command names configured by the user.
    pub command_type: String,
}

impl CloudCommand {
    /// Resolve the command for a target actuator state.
    ///
    /// User-configured command names (`custom_on` / `custom_off`) override
    /// the generic `turnOn` / `turnOff` and are sent as customized commands.
    #[must_use]
    pub fn for_target(settings: &ResolvedSettings, on: bool) -> Self {
        let (custom, generic) = if on {
            (settings.custom_on.as_deref(), "turnOn")
        } else {
            (settings.custom_off.as_deref(), "turnOff")
        };
        match custom {
            Some(name) => Self {
                command: name.to_string(),
                parameter: "default".to_string(),
                command_type: "customize".to_string(),
            },
            None => Self {
                command: generic.to_string(),
                parameter: "default".to_string(),
                command_type: "command".to_string(),
            },
        }
    }
}

/// Response envelope from the cloud service.
#[derive(Debug, Clone)]
pub struct CloudResponse {
    /// Envelope status code (see [`crate::classify`]).
    pub status_code: i64,
    /// Device payload carried in the envelope body.
    pub body: serde_json::Value,
}

/// Cloud request/response transport.
#[async_trait]
pub trait CloudTransport: Send + Sync {
    /// Whether credentials are configured; unauthenticated cloud transports
    /// are never selected.
    fn is_authenticated(&self) -> bool;

    /// Query the current status of a device.
    async fn get_status(&self, device_id: &str) -> Result<CloudResponse>;

    /// Send a command to a device.
    async fn control_device(&self, device_id: &str, command: &CloudCommand) -> Result<CloudResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::config::{DeviceOverrides, PlatformDefaults, ResolvedSettings};

    #[test]
    fn test_generic_commands() {
        let settings = ResolvedSettings::default();
        let on = CloudCommand::for_target(&settings, true);
        assert_eq!(on.command, "turnOn");
        assert_eq!(on.command_type, "command");
        let off = CloudCommand::for_target(&settings, false);
        assert_eq!(off.command, "turnOff");
        assert_eq!(off.parameter, "default");
    }

    #[test]
    fn test_custom_commands_override() {
        let overrides = DeviceOverrides {
            custom_on: Some("pressSceneA".to_string()),
            ..Default::default()
        };
        let settings = ResolvedSettings::resolve(&overrides, &PlatformDefaults::default());
        let on = CloudCommand::for_target(&settings, true);
        assert_eq!(on.command, "pressSceneA");
        assert_eq!(on.command_type, "customize");
        // Off direction has no override and stays generic.
        let off = CloudCommand::for_target(&settings, false);
        assert_eq!(off.command, "turnOff");
        assert_eq!(off.command_type, "command");
    }

    #[test]
    fn test_command_serializes_camel_case() {
        let cmd = CloudCommand {
            command: "turnOn".to_string(),
            parameter: "default".to_string(),
            command_type: "command".to_string(),
        };
        let json = serde_json::to_value(&cmd).unwrap();
        assert_eq!(json["commandType"], "command");
    }
}
