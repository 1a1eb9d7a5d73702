//! The change-push half of [`DeviceController`].
//!
//! User intents enter through [`DeviceController::request_change`] and leave
//! through exactly one transport per debounce window. The pipeline coalesces
//! bursts of intents (last write wins), skips pushes that would be no-ops,
//! retries radio commands under the device's budget, falls back to the cloud
//! once where configured, and schedules a delayed verification refresh so
//! requested and actual state converge without the caller polling.

use std::sync::atomic::Ordering;
use std::time::Duration;

use tokio::time::{Instant, sleep};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use homelink_types::{DeviceFamily, Field, FieldValue};

use crate::classify::classify;
use crate::controller::{DeviceController, SelectedTransport, lock};
use crate::error::{Error, Result, TransportUnavailableReason};
use crate::events::BridgeEvent;
use crate::parse::radio_command_payload;
use crate::retry::with_retry;
use crate::transport::{CloudCommand, TransportKind};

/// Delay before the post-push verification refresh.
pub const VERIFY_DELAY: Duration = Duration::from_secs(15);

/// Delay before a momentary latch resets its displayed state.
pub const LATCH_RESET_DELAY: Duration = Duration::from_millis(500);

/// One not-yet-sent outbound intent. Only the most recent intent within a
/// debounce window survives.
#[derive(Debug, Clone, Copy)]
pub struct PendingIntent {
    /// Requested actuator state.
    pub target: bool,
    /// When the request arrived.
    pub requested_at: Instant,
}

/// How a push cycle ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum PushOutcome {
    /// Nothing was sent, deliberately.
    Skipped(&'static str),
    /// A command was delivered.
    Pushed {
        /// Transport that carried the command.
        transport: TransportKind,
    },
}

impl DeviceController {
    /// Request a state change. Fire-and-forget: the intent is recorded, the
    /// debounce stream is signaled, and the call returns immediately. Any
    /// number of requests arriving within one debounce window collapse into
    /// a single push of the most recent value.
    pub fn request_change(&self, target: bool) {
        *lock(&self.inner.pending) = Some(PendingIntent {
            target,
            requested_at: Instant::now(),
        });
        self.inner.intent_notify.notify_one();
        debug!(device_id = %self.inner.identity.id, target, "change requested");
    }

    /// Run one debounced push cycle: take the latest intent, push it, and
    /// schedule the follow-up verification.
    pub(crate) async fn run_push_cycle(&self) {
        let Some(intent) = lock(&self.inner.pending).take() else {
            return;
        };

        if self
            .inner
            .update_in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            // Another update holds the gate. Keep the intent (unless a newer
            // one already replaced it) and go around again after the next
            // debounce window.
            let mut pending = lock(&self.inner.pending);
            if pending.is_none() {
                *pending = Some(intent);
            }
            drop(pending);
            self.inner.intent_notify.notify_one();
            return;
        }

        let outcome = self.push_changes(intent.target).await;
        self.inner.update_in_flight.store(false, Ordering::SeqCst);

        let device_id = self.inner.identity.id.as_str();
        match outcome {
            Ok(PushOutcome::Skipped(reason)) => {
                debug!(device_id, target = intent.target, "push skipped: {reason}");
            }
            Ok(PushOutcome::Pushed { transport }) => {
                info!(device_id, %transport, target = intent.target, "push succeeded");
                self.inner.events.send(BridgeEvent::PushSucceeded {
                    device_id: device_id.to_string(),
                    transport,
                    target: intent.target,
                });
                self.after_push();
            }
            Err(e) => {
                error!(device_id, error = %e, "push failed");
                self.inner.events.send(BridgeEvent::PushFailed {
                    device_id: device_id.to_string(),
                    error: e.to_string(),
                });
                self.note_transport_failure(&e);
                self.after_push();
            }
        }
    }

    /// Post-push duties shared by the success and failure paths.
    fn after_push(&self) {
        self.schedule_verification();
        if self.inner.identity.family.is_momentary() {
            self.schedule_latch_reset();
        }
    }

    /// Push one target value through the selected transport.
    async fn push_changes(&self, target: bool) -> Result<PushOutcome> {
        let settings = &self.inner.settings;
        let identity = &self.inner.identity;

        if target && settings.disable_push_on {
            info!(device_id = %identity.id, "push-on is disabled for this device");
            return Ok(PushOutcome::Skipped("push-on disabled"));
        }
        if !target && settings.disable_push_off {
            info!(device_id = %identity.id, "push-off is disabled for this device");
            return Ok(PushOutcome::Skipped("push-off disabled"));
        }

        // Momentary actuators always push; for everything else a push to the
        // last-confirmed value is a no-op. Not a cache: if the transport
        // later reports differently, the next refresh corrects the display.
        if !identity.family.is_momentary() && *lock(&self.inner.last_confirmed) == Some(target) {
            return Ok(PushOutcome::Skipped("target already matches confirmed state"));
        }

        match self.select_transport()? {
            SelectedTransport::Radio => match self.push_via_radio(target).await {
                Ok(()) => {
                    self.confirm_push(target);
                    Ok(PushOutcome::Pushed {
                        transport: TransportKind::Radio,
                    })
                }
                Err(e) if self.should_fall_back(&e) => {
                    warn!(device_id = %identity.id, error = %e, "radio push failed, retrying via cloud");
                    self.inner.events.send(BridgeEvent::FallbackEngaged {
                        device_id: identity.id.clone(),
                        from: TransportKind::Radio,
                        to: TransportKind::CloudPoll,
                    });
                    self.push_via_cloud(target).await?;
                    self.confirm_push(target);
                    Ok(PushOutcome::Pushed {
                        transport: TransportKind::CloudPoll,
                    })
                }
                Err(e) => Err(e),
            },
            SelectedTransport::Cloud => {
                self.push_via_cloud(target).await?;
                self.confirm_push(target);
                Ok(PushOutcome::Pushed {
                    transport: TransportKind::CloudPoll,
                })
            }
            SelectedTransport::None => Err(Error::TransportUnavailable(
                TransportUnavailableReason::NoUsableTransport,
            )),
        }
    }

    /// Deliver a command over radio: discover the device, then attempt the
    /// write under the device's retry budget.
    async fn push_via_radio(&self, target: bool) -> Result<()> {
        let radio = self
            .inner
            .radio
            .as_ref()
            .ok_or(Error::TransportUnavailable(
                TransportUnavailableReason::RadioMissing,
            ))?;

        let identity = &self.inner.identity;
        let handle = radio.discover(identity.family, &identity.id).await?;
        let payload = radio_command_payload(identity.family, target);

        with_retry(&self.inner.settings.retry, "radio command", || {
            handle.command(&payload)
        })
        .await
    }

    /// Deliver a command over the cloud: a single request, classified by the
    /// status-code table. Unknown codes are informational and do not fail
    /// the push; the verification refresh reconciles any divergence.
    async fn push_via_cloud(&self, target: bool) -> Result<()> {
        let cloud = self
            .inner
            .cloud
            .as_ref()
            .ok_or(Error::TransportUnavailable(
                TransportUnavailableReason::CloudMissing,
            ))?;

        let identity = &self.inner.identity;
        let command = CloudCommand::for_target(&self.inner.settings, target);
        let response = cloud.control_device(&identity.id, &command).await?;

        let classification = classify(
            response.status_code,
            &identity.id,
            self.inner.settings.hub_device_id.as_deref(),
        );
        classification.log(&identity.id);
        if classification.is_failure() {
            return Err(Error::remote_rejected(
                classification.code,
                classification.message.to_string(),
            ));
        }
        Ok(())
    }

    /// Reflect a delivered push in the presentation layer and remember the
    /// confirmed value.
    fn confirm_push(&self, target: bool) {
        match self.inner.identity.family {
            DeviceFamily::Lock => {
                let state = if target { "locked" } else { "unlocked" };
                self.inner
                    .presenter
                    .apply_state(Field::LockState, FieldValue::text(state));
            }
            _ => {
                self.inner
                    .presenter
                    .apply_state(Field::On, FieldValue::bool(target));
            }
        }
        *lock(&self.inner.last_confirmed) = Some(target);
    }

    /// Schedule the one-shot verification refresh, superseding any
    /// previously scheduled one. At fire time the refresh is skipped if
    /// another update is already in flight.
    fn schedule_verification(&self) {
        let token = CancellationToken::new();
        if let Some(previous) = lock(&self.inner.verify_guard).replace(token.clone()) {
            previous.cancel();
        }

        let controller = self.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = sleep(VERIFY_DELAY) => {
                    controller.gated_refresh("post-push verification").await;
                }
            }
        });
    }

    /// Reset a momentary latch's displayed state after the fixed delay.
    /// Display-only: no push is triggered by the reset.
    fn schedule_latch_reset(&self) {
        let controller = self.clone();
        tokio::spawn(async move {
            sleep(LATCH_RESET_DELAY).await;
            controller
                .inner
                .presenter
                .apply_state(Field::On, FieldValue::bool(false));
            *lock(&controller.inner.last_confirmed) = Some(false);
        });
    }
}
