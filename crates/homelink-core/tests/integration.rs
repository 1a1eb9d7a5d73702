//! End-to-end scenarios over mock transports.
//!
//! All timing behavior (debounce windows, retry spacing, the delayed
//! verification refresh, the momentary latch reset) runs under tokio's
//! paused test clock, so these tests are deterministic and fast.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use homelink_core::config::{DeviceOverrides, PlatformDefaults, ResolvedSettings};
use homelink_core::{
    BridgeEvent, ConnectionType, DeviceController, DeviceFamily, DeviceIdentity, EventReceiver,
    Field, FieldValue, MockCloud, MockRadio, RecordingPresenter, TransportKind,
};

/// Route engine logs through the test harness (`--nocapture` to see them).
fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn identity(id: &str, family: DeviceFamily, connection: ConnectionType) -> DeviceIdentity {
    DeviceIdentity::new(id, family, connection)
}

fn settings(overrides: DeviceOverrides) -> ResolvedSettings {
    ResolvedSettings::resolve(&overrides, &PlatformDefaults::default())
}

/// Wait for the next push outcome event, skipping unrelated events.
async fn next_push_outcome(events: &mut EventReceiver) -> BridgeEvent {
    loop {
        match events.recv().await.unwrap() {
            event @ (BridgeEvent::PushSucceeded { .. } | BridgeEvent::PushFailed { .. }) => {
                return event;
            }
            _ => {}
        }
    }
}

#[tokio::test(start_paused = true)]
async fn debounce_coalesces_burst_to_one_push_of_last_value() {
    init_tracing();
    let presenter = Arc::new(RecordingPresenter::default());
    let cloud = Arc::new(MockCloud::new());
    let controller = DeviceController::builder(
        identity("plug-1", DeviceFamily::Plug, ConnectionType::CloudOnly),
        presenter,
    )
    .cloud(cloud.clone())
    .build();
    let cancel = CancellationToken::new();
    let _worker = controller.start(cancel.clone());
    let mut events = controller.events().subscribe();

    // A burst of intents inside one debounce window.
    controller.request_change(true);
    controller.request_change(false);
    controller.request_change(true);
    controller.request_change(false);

    match next_push_outcome(&mut events).await {
        BridgeEvent::PushSucceeded { target, .. } => assert!(!target),
        other => panic!("unexpected event: {other:?}"),
    }

    // Exactly one command, carrying only the last value.
    let calls = cloud.control_calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].command, "turnOff");

    cancel.cancel();
}

#[tokio::test(start_paused = true)]
async fn sequential_intents_push_sequentially() {
    let presenter = Arc::new(RecordingPresenter::default());
    let cloud = Arc::new(MockCloud::new());
    let controller = DeviceController::builder(
        identity("plug-1", DeviceFamily::Plug, ConnectionType::CloudOnly),
        presenter,
    )
    .cloud(cloud.clone())
    .build();
    let cancel = CancellationToken::new();
    let _worker = controller.start(cancel.clone());
    let mut events = controller.events().subscribe();

    controller.request_change(true);
    assert!(matches!(
        next_push_outcome(&mut events).await,
        BridgeEvent::PushSucceeded { target: true, .. }
    ));

    controller.request_change(false);
    assert!(matches!(
        next_push_outcome(&mut events).await,
        BridgeEvent::PushSucceeded { target: false, .. }
    ));

    let calls = cloud.control_calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].command, "turnOn");
    assert_eq!(calls[1].command, "turnOff");

    cancel.cancel();
}

#[tokio::test(start_paused = true)]
async fn radio_push_retries_with_configured_spacing() {
    init_tracing();
    let presenter = Arc::new(RecordingPresenter::default());
    // First two command attempts fail; the third succeeds.
    let radio = Arc::new(MockRadio::new().fail_commands(2));
    let controller = DeviceController::builder(
        identity("plug-1", DeviceFamily::Plug, ConnectionType::RadioOnly),
        presenter,
    )
    .radio(radio.clone())
    .settings(settings(DeviceOverrides {
        max_attempts: Some(3),
        retry_delay_ms: Some(3000),
        ..Default::default()
    }))
    .build();
    let cancel = CancellationToken::new();
    let _worker = controller.start(cancel.clone());
    let mut events = controller.events().subscribe();

    controller.request_change(true);
    match next_push_outcome(&mut events).await {
        BridgeEvent::PushSucceeded { transport, .. } => {
            assert_eq!(transport, TransportKind::Radio);
        }
        other => panic!("unexpected event: {other:?}"),
    }

    // Exactly three attempts, spaced by the configured fixed delay.
    let times = radio.command_times();
    assert_eq!(times.len(), 3);
    assert_eq!(times[1] - times[0], Duration::from_millis(3000));
    assert_eq!(times[2] - times[1], Duration::from_millis(3000));
    assert_eq!(
        radio.command_payloads(),
        vec![vec![0x57, 0x01, 0x01]]
    );

    cancel.cancel();
}

#[tokio::test(start_paused = true)]
async fn exhausted_radio_push_falls_back_to_cloud() {
    let presenter = Arc::new(RecordingPresenter::default());
    let radio = Arc::new(MockRadio::new().fail_commands(u32::MAX));
    let cloud = Arc::new(MockCloud::new());
    let controller = DeviceController::builder(
        identity(
            "plug-1",
            DeviceFamily::Plug,
            ConnectionType::RadioWithCloudFallback,
        ),
        presenter,
    )
    .radio(radio.clone())
    .cloud(cloud.clone())
    .build();
    let cancel = CancellationToken::new();
    let _worker = controller.start(cancel.clone());
    let mut events = controller.events().subscribe();

    controller.request_change(true);
    match next_push_outcome(&mut events).await {
        BridgeEvent::PushSucceeded { transport, .. } => {
            assert_eq!(transport, TransportKind::CloudPoll);
        }
        other => panic!("unexpected event: {other:?}"),
    }

    // Default budget: two radio attempts, then one cloud request.
    assert_eq!(radio.command_times().len(), 2);
    assert_eq!(cloud.control_calls().len(), 1);

    cancel.cancel();
}

#[tokio::test(start_paused = true)]
async fn exhausted_radio_push_without_fallback_fails() {
    let presenter = Arc::new(RecordingPresenter::default());
    let radio = Arc::new(MockRadio::new().fail_commands(u32::MAX));
    // Cloud attached and authenticated, but the device is radio-only.
    let cloud = Arc::new(MockCloud::new());
    let controller = DeviceController::builder(
        identity("plug-1", DeviceFamily::Plug, ConnectionType::RadioOnly),
        presenter.clone(),
    )
    .radio(radio)
    .cloud(cloud.clone())
    .build();
    let cancel = CancellationToken::new();
    let _worker = controller.start(cancel.clone());
    let mut events = controller.events().subscribe();

    controller.request_change(true);
    assert!(matches!(
        next_push_outcome(&mut events).await,
        BridgeEvent::PushFailed { .. }
    ));
    assert!(cloud.control_calls().is_empty());
    // A transport exception writes fault markers.
    assert_eq!(presenter.value_of(Field::On), Some(FieldValue::Fault));

    cancel.cancel();
}

#[tokio::test(start_paused = true)]
async fn latch_push_resets_displayed_state_without_pushing_again() {
    let presenter = Arc::new(RecordingPresenter::default());
    let radio = Arc::new(MockRadio::new());
    let controller = DeviceController::builder(
        identity("latch-1", DeviceFamily::Latch, ConnectionType::RadioOnly),
        presenter.clone(),
    )
    .radio(radio.clone())
    .build();
    let cancel = CancellationToken::new();
    let _worker = controller.start(cancel.clone());
    let mut events = controller.events().subscribe();

    controller.request_change(true);
    assert!(matches!(
        next_push_outcome(&mut events).await,
        BridgeEvent::PushSucceeded { .. }
    ));

    // Displayed state reads true immediately after the push...
    assert_eq!(presenter.value_of(Field::On), Some(FieldValue::bool(true)));

    // ...and false again after the fixed reset delay.
    sleep(Duration::from_millis(600)).await;
    assert_eq!(presenter.value_of(Field::On), Some(FieldValue::bool(false)));

    // The auto-reset must not have triggered a second push.
    assert_eq!(radio.command_payloads().len(), 1);

    cancel.cancel();
}

#[tokio::test(start_paused = true)]
async fn verification_refresh_fires_after_fixed_delay() {
    let presenter = Arc::new(RecordingPresenter::default());
    let cloud = Arc::new(MockCloud::new().status_body(serde_json::json!({ "power": "on" })));
    let controller = DeviceController::builder(
        identity("plug-1", DeviceFamily::Plug, ConnectionType::CloudOnly),
        presenter,
    )
    .cloud(cloud.clone())
    .build();
    let cancel = CancellationToken::new();
    let _worker = controller.start(cancel.clone());
    let mut events = controller.events().subscribe();

    controller.request_change(true);
    assert!(matches!(
        next_push_outcome(&mut events).await,
        BridgeEvent::PushSucceeded { .. }
    ));
    assert_eq!(cloud.status_calls(), 0);

    // The one-shot verification refresh reconciles requested vs actual.
    sleep(Duration::from_secs(16)).await;
    assert_eq!(cloud.status_calls(), 1);

    cancel.cancel();
}

#[tokio::test(start_paused = true)]
async fn scheduled_refresh_runs_on_the_configured_interval() {
    let presenter = Arc::new(RecordingPresenter::default());
    let cloud = Arc::new(MockCloud::new().status_body(serde_json::json!({
        "temperature": 20.0,
        "humidity": 40,
    })));
    let controller = DeviceController::builder(
        identity("meter-1", DeviceFamily::Meter, ConnectionType::CloudOnly),
        presenter.clone(),
    )
    .cloud(cloud.clone())
    .settings(settings(DeviceOverrides {
        refresh_interval_secs: Some(30.0),
        ..Default::default()
    }))
    .build();
    let cancel = CancellationToken::new();
    let _worker = controller.start(cancel.clone());

    sleep(Duration::from_secs(31)).await;
    assert_eq!(cloud.status_calls(), 1);
    assert_eq!(
        presenter.value_of(Field::Temperature),
        Some(FieldValue::float(20.0))
    );

    sleep(Duration::from_secs(30)).await;
    assert_eq!(cloud.status_calls(), 2);

    cancel.cancel();
}

#[tokio::test(start_paused = true)]
async fn webhook_events_apply_between_scheduled_refreshes() {
    let presenter = Arc::new(RecordingPresenter::default());
    let cloud = Arc::new(MockCloud::new());
    let controller = DeviceController::builder(
        identity("meter-1", DeviceFamily::Meter, ConnectionType::CloudOnly),
        presenter.clone(),
    )
    .cloud(cloud)
    .build();
    let cancel = CancellationToken::new();
    let _worker = controller.start(cancel.clone());

    controller
        .handle_webhook_event(&serde_json::json!({
            "eventType": "changeReport",
            "context": { "temperature": 22.5, "scale": "CELSIUS", "humidity": 47, "battery": 93 }
        }))
        .await;

    assert_eq!(
        presenter.value_of(Field::Temperature),
        Some(FieldValue::float(22.5))
    );
    assert_eq!(
        presenter.value_of(Field::Humidity),
        Some(FieldValue::float(47.0))
    );

    cancel.cancel();
}
