//! Process-wide routing of incoming webhook and radio events.
//!
//! The two registries map device ids to their controllers. Registration is
//! an explicit, idempotent subscribe call made once per device at startup;
//! nothing mutates the maps afterwards, so dispatch is effectively
//! contention-free. Handler failures are contained inside the controller —
//! a bad event never breaks the registration for subsequent events.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;

use crate::controller::DeviceController;

/// Routing table from device ids to per-device event handlers.
#[derive(Default)]
pub struct EventRouter {
    webhook: RwLock<HashMap<String, Arc<DeviceController>>>,
    radio: RwLock<HashMap<String, Arc<DeviceController>>>,
}

impl EventRouter {
    /// Create an empty router.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a device's webhook handler. Idempotent: re-subscribing the
    /// same device replaces the entry.
    pub async fn subscribe_webhook(&self, device_id: &str, controller: Arc<DeviceController>) {
        self.webhook
            .write()
            .await
            .insert(device_id.to_string(), controller);
        debug!(device_id, "webhook handler registered");
    }

    /// Register a device's radio event handler. Idempotent.
    pub async fn subscribe_radio(&self, device_id: &str, controller: Arc<DeviceController>) {
        self.radio
            .write()
            .await
            .insert(device_id.to_string(), controller);
        debug!(device_id, "radio event handler registered");
    }

    /// Route one webhook event to its device. Events for unknown devices are
    /// logged at debug and dropped.
    pub async fn dispatch_webhook(&self, device_id: &str, body: &serde_json::Value) {
        let controller = self.webhook.read().await.get(device_id).cloned();
        match controller {
            Some(controller) => controller.handle_webhook_event(body).await,
            None => debug!(device_id, "webhook event for unregistered device"),
        }
    }

    /// Route one radio advertisement to its device. Events for unknown
    /// devices are logged at debug and dropped.
    pub async fn dispatch_radio(&self, device_id: &str, payload: &[u8]) {
        let controller = self.radio.read().await.get(device_id).cloned();
        match controller {
            Some(controller) => controller.handle_radio_event(payload).await,
            None => debug!(device_id, "radio event for unregistered device"),
        }
    }

    /// Number of registered webhook handlers.
    pub async fn webhook_count(&self) -> usize {
        self.webhook.read().await.len()
    }

    /// Number of registered radio handlers.
    pub async fn radio_count(&self) -> usize {
        self.radio.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use homelink_types::{ConnectionType, DeviceFamily, DeviceIdentity, Field, FieldValue};

    use crate::mock::RecordingPresenter;

    fn controller(presenter: Arc<RecordingPresenter>) -> Arc<DeviceController> {
        Arc::new(
            DeviceController::builder(
                DeviceIdentity::new("meter-1", DeviceFamily::Meter, ConnectionType::CloudOnly),
                presenter,
            )
            .build(),
        )
    }

    #[tokio::test]
    async fn test_subscribe_is_idempotent() {
        let router = EventRouter::new();
        let presenter = Arc::new(RecordingPresenter::default());
        let controller = controller(presenter);

        router.subscribe_webhook("meter-1", Arc::clone(&controller)).await;
        router.subscribe_webhook("meter-1", Arc::clone(&controller)).await;
        assert_eq!(router.webhook_count().await, 1);
    }

    #[tokio::test]
    async fn test_dispatch_routes_to_handler() {
        let router = EventRouter::new();
        let presenter = Arc::new(RecordingPresenter::default());
        router.subscribe_webhook("meter-1", controller(presenter.clone())).await;

        router
            .dispatch_webhook(
                "meter-1",
                &serde_json::json!({ "context": { "temperature": 17.5 } }),
            )
            .await;
        assert_eq!(
            presenter.value_of(Field::Temperature),
            Some(FieldValue::float(17.5))
        );
    }

    #[tokio::test]
    async fn test_dispatch_unknown_device_is_dropped() {
        let router = EventRouter::new();
        // Must not panic or error.
        router
            .dispatch_webhook("ghost", &serde_json::json!({ "context": {} }))
            .await;
        router.dispatch_radio("ghost", &[0x54, 0x00]).await;
    }

    #[tokio::test]
    async fn test_radio_dispatch_applies_state() {
        let router = EventRouter::new();
        let presenter = Arc::new(RecordingPresenter::default());
        router.subscribe_radio("meter-1", controller(presenter.clone())).await;

        // 21.5 C, 45% RH, 80% battery.
        router
            .dispatch_radio("meter-1", &[0x54, 0x00, 0xD7, 0x00, 45, 80])
            .await;
        assert_eq!(
            presenter.value_of(Field::Humidity),
            Some(FieldValue::float(45.0))
        );
    }
}
