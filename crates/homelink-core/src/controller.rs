//! Per-device state reconciliation.
//!
//! A [`DeviceController`] owns everything mutable about one device: the last
//! applied canonical state, the pending outbound intent, and the in-flight
//! gate. It decides which transport to use per operation, parses whatever
//! that transport produced, and writes the result into the presentation
//! layer. Exactly one controller exists per device, so no cross-device
//! locking is needed.
//!
//! Refresh follows a fixed transport precedence; failures on the preferred
//! transport fall back to the secondary one when the device is configured
//! for it. Event-driven updates (webhooks, unsolicited radio broadcasts)
//! arrive through [`crate::router::EventRouter`] and are applied
//! independently of the refresh schedule.

use std::sync::Arc;
use std::sync::Mutex as StdMutex;
use std::sync::atomic::{AtomicBool, Ordering};

use time::OffsetDateTime;
use tokio::sync::Notify;
use tokio::time::{MissedTickBehavior, interval_at, sleep};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use homelink_types::{
    CanonicalState, DeviceIdentity, Field, FieldValue, LockState, StatusUpdate,
};

use crate::classify::classify;
use crate::config::ResolvedSettings;
use crate::error::{Error, Result, TransportUnavailableReason};
use crate::events::{BridgeEvent, EventDispatcher};
use crate::parse::{parse_cloud_status, parse_radio, parse_webhook};
use crate::present::Presenter;
use crate::push::PendingIntent;
use crate::transport::{CloudTransport, RadioTransport, TransportKind};

/// Last successfully applied state, kept for the offline no-op refresh.
#[derive(Debug, Clone)]
pub struct CachedContext {
    /// The state that was applied.
    pub state: CanonicalState,
    /// When it was received.
    pub received_at: OffsetDateTime,
}

/// Lock a std mutex, tolerating poisoning: the engine's critical sections
/// only move plain data, so a poisoned guard's contents are still valid.
pub(crate) fn lock<T>(mutex: &StdMutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

pub(crate) struct Inner {
    pub(crate) identity: DeviceIdentity,
    pub(crate) settings: ResolvedSettings,
    pub(crate) radio: Option<Arc<dyn RadioTransport>>,
    pub(crate) cloud: Option<Arc<dyn CloudTransport>>,
    pub(crate) presenter: Arc<dyn Presenter>,
    pub(crate) events: EventDispatcher,
    /// Last applied state, for offline fallback.
    pub(crate) cached: StdMutex<Option<CachedContext>>,
    /// Last actuator value a transport confirmed (applied or pushed).
    pub(crate) last_confirmed: StdMutex<Option<bool>>,
    /// Latest not-yet-sent intent; last write wins within a debounce window.
    pub(crate) pending: StdMutex<Option<PendingIntent>>,
    pub(crate) intent_notify: Notify,
    /// At most one push and one worker-driven refresh in flight per device.
    pub(crate) update_in_flight: AtomicBool,
    /// Cancellation for the currently scheduled post-push verification.
    pub(crate) verify_guard: StdMutex<Option<CancellationToken>>,
}

/// Which transport a selection pass chose.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SelectedTransport {
    Radio,
    Cloud,
    /// No transport is usable; refresh degrades to the cached context.
    None,
}

/// Builder for [`DeviceController`].
pub struct DeviceControllerBuilder {
    identity: DeviceIdentity,
    presenter: Arc<dyn Presenter>,
    settings: ResolvedSettings,
    radio: Option<Arc<dyn RadioTransport>>,
    cloud: Option<Arc<dyn CloudTransport>>,
    events: EventDispatcher,
}

impl DeviceControllerBuilder {
    /// Attach a radio transport.
    #[must_use]
    pub fn radio(mut self, radio: Arc<dyn RadioTransport>) -> Self {
        self.radio = Some(radio);
        self
    }

    /// Attach a cloud transport.
    #[must_use]
    pub fn cloud(mut self, cloud: Arc<dyn CloudTransport>) -> Self {
        self.cloud = Some(cloud);
        self
    }

    /// Use resolved settings other than the defaults.
    #[must_use]
    pub fn settings(mut self, settings: ResolvedSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Share an event dispatcher with other controllers.
    #[must_use]
    pub fn events(mut self, events: EventDispatcher) -> Self {
        self.events = events;
        self
    }

    /// Build the controller.
    #[must_use]
    pub fn build(self) -> DeviceController {
        DeviceController {
            inner: Arc::new(Inner {
                identity: self.identity,
                settings: self.settings,
                radio: self.radio,
                cloud: self.cloud,
                presenter: self.presenter,
                events: self.events,
                cached: StdMutex::new(None),
                last_confirmed: StdMutex::new(None),
                pending: StdMutex::new(None),
                intent_notify: Notify::new(),
                update_in_flight: AtomicBool::new(false),
                verify_guard: StdMutex::new(None),
            }),
        }
    }
}

/// Reconciliation controller for one device.
///
/// Cheap to clone; clones share the same device state.
#[derive(Clone)]
pub struct DeviceController {
    pub(crate) inner: Arc<Inner>,
}

impl DeviceController {
    /// Start building a controller for a device.
    pub fn builder(identity: DeviceIdentity, presenter: Arc<dyn Presenter>) -> DeviceControllerBuilder {
        DeviceControllerBuilder {
            identity,
            presenter,
            settings: ResolvedSettings::default(),
            radio: None,
            cloud: None,
            events: EventDispatcher::default(),
        }
    }

    /// The device's identity.
    pub fn identity(&self) -> &DeviceIdentity {
        &self.inner.identity
    }

    /// The device's resolved settings.
    pub fn settings(&self) -> &ResolvedSettings {
        &self.inner.settings
    }

    /// The event dispatcher this controller emits on.
    pub fn events(&self) -> &EventDispatcher {
        &self.inner.events
    }

    /// The last successfully applied state, if any.
    pub fn last_known(&self) -> Option<CachedContext> {
        lock(&self.inner.cached).clone()
    }

    /// Whether a push or worker-driven refresh is currently in flight.
    pub fn is_update_in_flight(&self) -> bool {
        self.inner.update_in_flight.load(Ordering::SeqCst)
    }

    pub(crate) fn cloud_ready(&self) -> bool {
        self.inner
            .cloud
            .as_ref()
            .is_some_and(|c| c.is_authenticated())
    }

    /// Choose exactly one transport for the next operation.
    ///
    /// Precedence: a cloud-only device without usable cloud access is a
    /// configuration error; otherwise radio when configured and attached;
    /// otherwise authenticated cloud when the device's transport set allows
    /// it; otherwise nothing.
    pub(crate) fn select_transport(&self) -> Result<SelectedTransport> {
        let connection = self.inner.identity.connection_type;

        if connection.requires_cloud() && !self.cloud_ready() {
            return Err(Error::configuration_incomplete(
                "cloud access is required for this device but is not configured",
            ));
        }
        if connection.uses_radio() && self.inner.radio.is_some() {
            return Ok(SelectedTransport::Radio);
        }
        if connection.uses_cloud() && self.cloud_ready() {
            return Ok(SelectedTransport::Cloud);
        }
        Ok(SelectedTransport::None)
    }

    /// Refresh the device's exposed state through exactly one transport.
    ///
    /// When no transport is usable the last-known cached context is
    /// re-applied and the refresh is reported as deliberately skipped — that
    /// is not an error.
    pub async fn refresh_status(&self) -> Result<()> {
        let device_id = self.inner.identity.id.as_str();

        match self.select_transport()? {
            SelectedTransport::Radio => match self.refresh_via_radio().await {
                Ok(update) => {
                    self.apply_update(update, TransportKind::Radio);
                    Ok(())
                }
                Err(e) if self.should_fall_back(&e) => {
                    warn!(device_id, error = %e, "radio refresh failed, falling back to cloud");
                    self.inner.events.send(BridgeEvent::FallbackEngaged {
                        device_id: device_id.to_string(),
                        from: TransportKind::Radio,
                        to: TransportKind::CloudPoll,
                    });
                    match self.refresh_via_cloud().await {
                        Ok(Some(update)) => {
                            self.apply_update(update, TransportKind::CloudPoll);
                            Ok(())
                        }
                        Ok(None) => Ok(()),
                        Err(e) => {
                            self.note_transport_failure(&e);
                            Err(e)
                        }
                    }
                }
                Err(e) => {
                    self.note_transport_failure(&e);
                    Err(e)
                }
            },
            SelectedTransport::Cloud => match self.refresh_via_cloud().await {
                Ok(Some(update)) => {
                    self.apply_update(update, TransportKind::CloudPoll);
                    Ok(())
                }
                // Non-success status code: logged by the classifier, stale
                // state retained.
                Ok(None) => Ok(()),
                Err(e) => {
                    self.note_transport_failure(&e);
                    Err(e)
                }
            },
            SelectedTransport::None => {
                self.apply_cached();
                info!(device_id, "no usable transport, refresh will not happen");
                self.inner.events.send(BridgeEvent::RefreshSkipped {
                    device_id: device_id.to_string(),
                    reason: "no usable transport, applied last-known state".to_string(),
                });
                Ok(())
            }
        }
    }

    /// Whether a failed radio operation should be retried via the cloud.
    pub(crate) fn should_fall_back(&self, error: &Error) -> bool {
        error.triggers_fallback()
            && self.inner.identity.connection_type.has_cloud_fallback()
            && self.cloud_ready()
    }

    async fn refresh_via_radio(&self) -> Result<StatusUpdate> {
        let radio = self
            .inner
            .radio
            .as_ref()
            .ok_or(Error::TransportUnavailable(
                TransportUnavailableReason::RadioMissing,
            ))?;

        let identity = &self.inner.identity;
        let handle = radio.discover(identity.family, &identity.id).await?;
        let payload = handle.monitor_advertisement().await?;
        let update = parse_radio(&payload, identity.family, &self.inner.settings.lux)?;
        Ok(update)
    }

    /// One cloud status request. `Ok(None)` means the remote answered with a
    /// non-success code; the caller keeps the stale state.
    async fn refresh_via_cloud(&self) -> Result<Option<StatusUpdate>> {
        let cloud = self
            .inner
            .cloud
            .as_ref()
            .ok_or(Error::TransportUnavailable(
                TransportUnavailableReason::CloudMissing,
            ))?;

        let identity = &self.inner.identity;
        let response = cloud.get_status(&identity.id).await?;
        let classification = classify(
            response.status_code,
            &identity.id,
            self.inner.settings.hub_device_id.as_deref(),
        );
        classification.log(&identity.id);
        if !classification.is_success() {
            return Ok(None);
        }

        let update = parse_cloud_status(&response.body, identity.family)?;
        Ok(Some(update))
    }

    /// Apply one parsed update to the presentation layer.
    ///
    /// Idempotent: re-applying an identical update produces the same
    /// observable output. Unreported fields retain their previous exposed
    /// value.
    pub(crate) fn apply_update(&self, update: StatusUpdate, transport: TransportKind) {
        let device_id = self.inner.identity.id.as_str();

        for warning in &update.warnings {
            warn!(device_id, %transport, "{warning}");
        }

        for (field, value) in update.state.reported_fields() {
            self.inner.presenter.apply_state(field, value);
        }
        if let Some(firmware) = &update.firmware {
            self.inner
                .presenter
                .apply_state(Field::FirmwareVersion, FieldValue::text(firmware.clone()));
        }

        if let Some(level) = update.state.battery()
            && level <= self.inner.settings.battery_low_threshold
        {
            self.inner.events.send(BridgeEvent::BatteryLow {
                device_id: device_id.to_string(),
                level,
            });
        }

        if let Some(confirmed) = confirmed_target(&update.state) {
            *lock(&self.inner.last_confirmed) = Some(confirmed);
        }

        *lock(&self.inner.cached) = Some(CachedContext {
            state: update.state,
            received_at: OffsetDateTime::now_utc(),
        });

        debug!(device_id, %transport, "applied state update");
        self.inner.events.send(BridgeEvent::StateApplied {
            device_id: device_id.to_string(),
            transport,
        });
    }

    /// Re-apply the cached context (the deliberate offline no-op).
    fn apply_cached(&self) {
        let cached = lock(&self.inner.cached).clone();
        if let Some(context) = cached {
            for (field, value) in context.state.reported_fields() {
                self.inner.presenter.apply_state(field, value);
            }
        }
    }

    /// Write fault markers for a transport-level failure and report it.
    /// Classified rejections and configuration problems are logged without
    /// disturbing the exposed state.
    pub(crate) fn note_transport_failure(&self, error: &Error) {
        let device_id = self.inner.identity.id.as_str();
        error!(device_id, error = %error, "transport call failed");

        if matches!(error, Error::TransportFailure(_) | Error::Timeout { .. }) {
            for field in self.inner.identity.family.fields() {
                self.inner.presenter.apply_state(*field, FieldValue::Fault);
            }
            self.inner.events.send(BridgeEvent::DeviceFault {
                device_id: device_id.to_string(),
                error: error.to_string(),
            });
        }
    }

    /// Handle one webhook push event. Never fails: bad events are logged and
    /// dropped so the registration keeps working for subsequent events.
    pub async fn handle_webhook_event(&self, body: &serde_json::Value) {
        let identity = &self.inner.identity;
        match parse_webhook(body, identity.family, self.inner.settings.temperature_unit) {
            Ok(update) => self.apply_update(update, TransportKind::Webhook),
            Err(e) => {
                warn!(device_id = %identity.id, error = %e, "discarding webhook event");
            }
        }
    }

    /// Handle one unsolicited radio advertisement. Never fails; see
    /// [`Self::handle_webhook_event`].
    pub async fn handle_radio_event(&self, payload: &[u8]) {
        let identity = &self.inner.identity;
        match parse_radio(payload, identity.family, &self.inner.settings.lux) {
            Ok(update) => self.apply_update(update, TransportKind::Radio),
            Err(e) => {
                warn!(device_id = %identity.id, error = %e, "discarding radio event");
            }
        }
    }

    /// Run a refresh under the in-flight gate; skip it (not queue it) when
    /// another update is already running.
    pub(crate) async fn gated_refresh(&self, context: &'static str) {
        let device_id = self.inner.identity.id.as_str();

        if self
            .inner
            .update_in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!(device_id, "{context} skipped: update already in flight");
            self.inner.events.send(BridgeEvent::RefreshSkipped {
                device_id: device_id.to_string(),
                reason: format!("{context} skipped: update in flight"),
            });
            return;
        }

        if let Err(e) = self.refresh_status().await {
            warn!(device_id, error = %e, "{context} failed");
        }
        self.inner.update_in_flight.store(false, Ordering::SeqCst);
    }

    /// Start the background worker: the periodic refresh schedule and the
    /// debounced push pipeline, in one task.
    ///
    /// The task runs until the cancellation token fires. The first scheduled
    /// refresh happens one full interval after start.
    pub fn start(&self, cancel: CancellationToken) -> tokio::task::JoinHandle<()> {
        let controller = self.clone();

        tokio::spawn(async move {
            let period = controller.inner.settings.refresh_interval;
            let mut ticker = interval_at(tokio::time::Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        debug!(device_id = %controller.inner.identity.id, "device worker cancelled");
                        break;
                    }
                    _ = ticker.tick() => {
                        controller.gated_refresh("scheduled refresh").await;
                    }
                    _ = controller.inner.intent_notify.notified() => {
                        // Debounce: intents arriving inside the window
                        // overwrite the pending one; only the latest is sent.
                        sleep(controller.inner.settings.push_debounce).await;
                        controller.run_push_cycle().await;
                    }
                }
            }
        })
    }
}

/// Refresh several devices in parallel.
///
/// Each controller refreshes through its own transport selection; one
/// device's failure does not affect the others. Results are returned in
/// input order.
pub async fn refresh_all(controllers: &[DeviceController]) -> Vec<Result<()>> {
    futures::future::join_all(controllers.iter().map(|c| c.refresh_status())).await
}

/// The actuator value a state record confirms, if the family has one.
fn confirmed_target(state: &CanonicalState) -> Option<bool> {
    match state {
        CanonicalState::Switch { on } => *on,
        CanonicalState::Lock { state, .. } => state.map(|s| s == LockState::Locked),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use homelink_types::{ConnectionType, DeviceFamily};

    use crate::mock::{MockCloud, MockRadio, RecordingPresenter};

    fn meter_identity(connection: ConnectionType) -> DeviceIdentity {
        DeviceIdentity::new("F1:23:45:67:89:AB", DeviceFamily::Meter, connection)
    }

    #[tokio::test]
    async fn test_cloud_only_without_credentials_is_config_error() {
        let presenter = Arc::new(RecordingPresenter::default());
        let cloud = Arc::new(MockCloud::new().authenticated(false));
        let controller = DeviceController::builder(
            meter_identity(ConnectionType::CloudOnly),
            presenter.clone(),
        )
        .cloud(cloud.clone())
        .build();

        let err = controller.refresh_status().await.unwrap_err();
        assert!(matches!(err, Error::ConfigurationIncomplete(_)));
        // Nothing was attempted and nothing was written.
        assert_eq!(cloud.status_calls(), 0);
        assert!(presenter.writes().is_empty());
    }

    #[tokio::test]
    async fn test_offline_refresh_reapplies_cached_state() {
        let presenter = Arc::new(RecordingPresenter::default());
        // Radio-with-fallback device with no radio attached and an
        // unauthenticated cloud: no usable transport.
        let cloud = Arc::new(MockCloud::new().authenticated(false));
        let controller = DeviceController::builder(
            meter_identity(ConnectionType::RadioWithCloudFallback),
            presenter.clone(),
        )
        .cloud(cloud)
        .build();

        // Seed a cached context through a webhook event.
        controller
            .handle_webhook_event(&serde_json::json!({
                "context": { "temperature": 19.0, "scale": "CELSIUS", "humidity": 55 }
            }))
            .await;
        presenter.clear();

        controller.refresh_status().await.unwrap();
        assert_eq!(
            presenter.value_of(Field::Temperature),
            Some(FieldValue::float(19.0))
        );
        assert_eq!(
            presenter.value_of(Field::Humidity),
            Some(FieldValue::float(55.0))
        );
    }

    #[tokio::test]
    async fn test_cloud_refresh_applies_state() {
        let presenter = Arc::new(RecordingPresenter::default());
        let cloud = Arc::new(MockCloud::new().status_body(serde_json::json!({
            "temperature": 23.0,
            "humidity": 48,
            "battery": 91,
        })));
        let controller =
            DeviceController::builder(meter_identity(ConnectionType::CloudOnly), presenter.clone())
                .cloud(cloud.clone())
                .build();

        controller.refresh_status().await.unwrap();
        assert_eq!(cloud.status_calls(), 1);
        assert_eq!(
            presenter.value_of(Field::Temperature),
            Some(FieldValue::float(23.0))
        );
    }

    #[tokio::test]
    async fn test_cloud_refresh_non_success_keeps_stale_state() {
        let presenter = Arc::new(RecordingPresenter::default());
        let cloud = Arc::new(MockCloud::new().status_body(serde_json::json!({
            "temperature": 23.0,
        })));
        let controller =
            DeviceController::builder(meter_identity(ConnectionType::CloudOnly), presenter.clone())
                .cloud(cloud.clone())
                .build();

        controller.refresh_status().await.unwrap();
        assert_eq!(
            presenter.value_of(Field::Temperature),
            Some(FieldValue::float(23.0))
        );

        // Remote starts answering with "device offline"; state must not change.
        cloud.set_status_code(161);
        cloud.set_status_body(serde_json::json!({ "temperature": 99.0 }));
        controller.refresh_status().await.unwrap();
        assert_eq!(
            presenter.value_of(Field::Temperature),
            Some(FieldValue::float(23.0))
        );
    }

    #[tokio::test]
    async fn test_model_mismatch_falls_back_to_cloud() {
        let presenter = Arc::new(RecordingPresenter::default());
        // Radio advertises a Motion payload for a Meter device.
        let radio = Arc::new(MockRadio::new().advertisement(vec![0x73, 0x00, 0x01, 5, 80]));
        let cloud = Arc::new(MockCloud::new().status_body(serde_json::json!({
            "temperature": 20.0,
        })));
        let controller = DeviceController::builder(
            meter_identity(ConnectionType::RadioWithCloudFallback),
            presenter.clone(),
        )
        .radio(radio)
        .cloud(cloud.clone())
        .build();

        controller.refresh_status().await.unwrap();
        assert_eq!(cloud.status_calls(), 1);
        assert_eq!(
            presenter.value_of(Field::Temperature),
            Some(FieldValue::float(20.0))
        );
    }

    #[tokio::test]
    async fn test_model_mismatch_without_fallback_is_an_error() {
        let presenter = Arc::new(RecordingPresenter::default());
        let radio = Arc::new(MockRadio::new().advertisement(vec![0x73, 0x00, 0x01, 5, 80]));
        // Cloud attached and authenticated, but the device is radio-only:
        // fallback must not engage.
        let cloud = Arc::new(MockCloud::new());
        let controller =
            DeviceController::builder(meter_identity(ConnectionType::RadioOnly), presenter.clone())
                .radio(radio)
                .cloud(cloud.clone())
                .build();

        let err = controller.refresh_status().await.unwrap_err();
        assert!(matches!(err, Error::ParseMismatch(_)));
        assert_eq!(cloud.status_calls(), 0);
    }

    #[tokio::test]
    async fn test_radio_connection_failure_marks_fault() {
        let presenter = Arc::new(RecordingPresenter::default());
        let radio = Arc::new(MockRadio::new().fail_discover(true));
        let controller =
            DeviceController::builder(meter_identity(ConnectionType::RadioOnly), presenter.clone())
                .radio(radio)
                .build();

        assert!(controller.refresh_status().await.is_err());
        assert_eq!(presenter.value_of(Field::Temperature), Some(FieldValue::Fault));
        assert_eq!(presenter.value_of(Field::Humidity), Some(FieldValue::Fault));
        assert_eq!(presenter.value_of(Field::Battery), Some(FieldValue::Fault));
    }

    #[tokio::test]
    async fn test_applying_same_update_twice_is_idempotent() {
        let presenter = Arc::new(RecordingPresenter::default());
        let cloud = Arc::new(MockCloud::new().status_body(serde_json::json!({
            "temperature": 21.0,
            "humidity": 40,
        })));
        let controller =
            DeviceController::builder(meter_identity(ConnectionType::CloudOnly), presenter.clone())
                .cloud(cloud)
                .build();

        controller.refresh_status().await.unwrap();
        let first = presenter.snapshot();
        controller.refresh_status().await.unwrap();
        assert_eq!(presenter.snapshot(), first);
    }

    #[tokio::test]
    async fn test_malformed_webhook_event_is_dropped_not_fatal() {
        let presenter = Arc::new(RecordingPresenter::default());
        let controller =
            DeviceController::builder(meter_identity(ConnectionType::CloudOnly), presenter.clone())
                .cloud(Arc::new(MockCloud::new()))
                .build();

        controller
            .handle_webhook_event(&serde_json::json!({ "context": { "scale": "KELVIN", "temperature": 1.0 } }))
            .await;
        assert!(presenter.writes().is_empty());

        // A good event afterwards still applies: the registration survived.
        controller
            .handle_webhook_event(&serde_json::json!({ "context": { "temperature": 18.0 } }))
            .await;
        assert_eq!(
            presenter.value_of(Field::Temperature),
            Some(FieldValue::float(18.0))
        );
    }

    #[tokio::test]
    async fn test_refresh_all_runs_every_controller() {
        let cloud = Arc::new(MockCloud::new().status_body(serde_json::json!({
            "temperature": 20.0,
        })));
        let controllers: Vec<DeviceController> = ["meter-1", "meter-2", "meter-3"]
            .into_iter()
            .map(|id| {
                DeviceController::builder(
                    DeviceIdentity::new(id, DeviceFamily::Meter, ConnectionType::CloudOnly),
                    Arc::new(RecordingPresenter::default()),
                )
                .cloud(Arc::clone(&cloud) as Arc<dyn crate::transport::CloudTransport>)
                .build()
            })
            .collect();

        let results = refresh_all(&controllers).await;
        assert!(results.iter().all(Result::is_ok));
        assert_eq!(cloud.status_calls(), 3);
    }

    #[tokio::test]
    async fn test_battery_low_event() {
        let presenter = Arc::new(RecordingPresenter::default());
        let cloud = Arc::new(MockCloud::new().status_body(serde_json::json!({
            "temperature": 21.0,
            "battery": 7,
        })));
        let controller =
            DeviceController::builder(meter_identity(ConnectionType::CloudOnly), presenter)
                .cloud(cloud)
                .build();
        let mut events = controller.events().subscribe();

        controller.refresh_status().await.unwrap();

        let mut saw_battery_low = false;
        while let Ok(event) = events.try_recv() {
            if let BridgeEvent::BatteryLow { level, .. } = event {
                assert_eq!(level, 7);
                saw_battery_low = true;
            }
        }
        assert!(saw_battery_low);
    }
}
