//! Short-range radio transport over Bluetooth Low Energy.
//!
//! Implements [`RadioTransport`] with btleplug: a bounded scan window
//! discovers the peripheral whose manufacturer data carries the expected
//! family model tag and whose address (or advertised name) matches the
//! device id; advertisements are read from the peripheral's properties; and
//! commands are written to the vendor's command characteristic.

use std::time::Duration;

use async_trait::async_trait;
use btleplug::api::{Central, Manager as _, Peripheral as _, ScanFilter, WriteType};
use btleplug::platform::{Adapter, Manager, Peripheral};
use tokio::time::{sleep, timeout};
use tracing::{debug, warn};
use uuid::{Uuid, uuid};

use homelink_types::DeviceFamily;

use crate::error::{Error, Result};
use crate::transport::{RadioHandle, RadioTransport};

/// Manufacturer id carried in device advertisements.
pub const MANUFACTURER_ID: u16 = 0x0969;

/// GATT service exposing the command characteristic.
pub const COMMAND_SERVICE: Uuid = uuid!("cba20d00-224d-11e6-9fb8-0002a5d5c51b");

/// Characteristic commands are written to.
pub const COMMAND_CHARACTERISTIC: Uuid = uuid!("cba20002-224d-11e6-9fb8-0002a5d5c51b");

/// Tuning for the BLE transport.
#[derive(Debug, Clone)]
pub struct RadioOptions {
    /// How long one discovery scan runs.
    pub scan_window: Duration,
    /// Time bound on connecting for a command write.
    pub connection_timeout: Duration,
}

impl Default for RadioOptions {
    fn default() -> Self {
        Self {
            scan_window: Duration::from_secs(4),
            connection_timeout: Duration::from_secs(10),
        }
    }
}

/// BLE implementation of [`RadioTransport`].
pub struct BtleRadio {
    adapter: Adapter,
    options: RadioOptions,
}

impl BtleRadio {
    /// Create a transport on the first available Bluetooth adapter.
    pub async fn new() -> Result<Self> {
        let manager = Manager::new().await?;
        let adapter = manager
            .adapters()
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| {
                Error::TransportFailure(crate::error::TransportFailureReason::Radio(
                    "no Bluetooth adapter available".to_string(),
                ))
            })?;
        Ok(Self {
            adapter,
            options: RadioOptions::default(),
        })
    }

    /// Create a transport on a specific adapter.
    pub fn with_adapter(adapter: Adapter, options: RadioOptions) -> Self {
        Self { adapter, options }
    }

    /// Scan one window and return the matching peripheral.
    async fn find_peripheral(&self, family: DeviceFamily, device_id: &str) -> Result<Peripheral> {
        self.adapter.start_scan(ScanFilter::default()).await?;
        sleep(self.options.scan_window).await;
        self.adapter.stop_scan().await?;

        for peripheral in self.adapter.peripherals().await? {
            let Ok(Some(props)) = peripheral.properties().await else {
                continue;
            };

            let id_matches = props.address.to_string().eq_ignore_ascii_case(device_id)
                || props
                    .local_name
                    .as_deref()
                    .is_some_and(|name| name.eq_ignore_ascii_case(device_id));
            if !id_matches {
                continue;
            }

            let tag_matches = props
                .manufacturer_data
                .get(&MANUFACTURER_ID)
                .and_then(|data| data.first())
                .is_some_and(|&tag| tag == family.model_tag());
            if !tag_matches {
                debug!(device_id, "peripheral id matched but model tag did not");
                continue;
            }

            return Ok(peripheral);
        }

        Err(Error::device_not_found(device_id))
    }
}

#[async_trait]
impl RadioTransport for BtleRadio {
    async fn discover(&self, family: DeviceFamily, device_id: &str) -> Result<Box<dyn RadioHandle>> {
        let peripheral = self.find_peripheral(family, device_id).await?;
        debug!(device_id, "radio peripheral discovered");
        Ok(Box::new(BtleHandle {
            peripheral,
            connection_timeout: self.options.connection_timeout,
        }))
    }
}

struct BtleHandle {
    peripheral: Peripheral,
    connection_timeout: Duration,
}

#[async_trait]
impl RadioHandle for BtleHandle {
    async fn monitor_advertisement(&self) -> Result<Vec<u8>> {
        let props = self
            .peripheral
            .properties()
            .await?
            .ok_or_else(|| Error::device_not_found(format!("{:?}", self.peripheral.id())))?;

        props
            .manufacturer_data
            .get(&MANUFACTURER_ID)
            .cloned()
            .ok_or_else(|| {
                Error::TransportFailure(crate::error::TransportFailureReason::Radio(
                    "advertisement carries no manufacturer data".to_string(),
                ))
            })
    }

    async fn command(&self, payload: &[u8]) -> Result<()> {
        if !self.peripheral.is_connected().await.unwrap_or(false) {
            timeout(self.connection_timeout, self.peripheral.connect())
                .await
                .map_err(|_| Error::timeout("radio connect", self.connection_timeout))??;
        }
        self.peripheral.discover_services().await?;

        let characteristic = self
            .peripheral
            .characteristics()
            .into_iter()
            .find(|c| c.uuid == COMMAND_CHARACTERISTIC)
            .ok_or_else(|| {
                Error::TransportFailure(crate::error::TransportFailureReason::Radio(format!(
                    "command characteristic {COMMAND_CHARACTERISTIC} not found"
                )))
            })?;

        self.peripheral
            .write(&characteristic, payload, WriteType::WithResponse)
            .await?;

        if let Err(e) = self.peripheral.disconnect().await {
            warn!(error = %e, "failed to disconnect after command write");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_radio_options_default() {
        let options = RadioOptions::default();
        assert_eq!(options.scan_window, Duration::from_secs(4));
        assert_eq!(options.connection_timeout, Duration::from_secs(10));
    }
}
