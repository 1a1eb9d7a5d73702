//! Mock transports and presenter for testing.
//!
//! These implement the same trait seams as the real btleplug and reqwest
//! adapters, so engine code can be exercised without hardware or network.
//!
//! # Features
//!
//! - **Failure injection**: fail discovery outright, or fail the next N
//!   command attempts before succeeding
//! - **Scripted payloads**: set the advertisement bytes, status body and
//!   status codes the transports answer with
//! - **Call recording**: commands, attempt timestamps and presenter writes
//!   are captured for assertions

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex as StdMutex;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU32, Ordering};

use async_trait::async_trait;
use tokio::time::Instant;

use homelink_types::{DeviceFamily, Field, FieldValue};

use crate::error::{Error, Result, TransportFailureReason};
use crate::present::Presenter;
use crate::transport::{CloudCommand, CloudResponse, CloudTransport, RadioHandle, RadioTransport};

fn lock<T>(mutex: &StdMutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

#[derive(Default)]
struct RadioState {
    advertisement: StdMutex<Vec<u8>>,
    fail_discover: AtomicBool,
    fail_monitor: AtomicBool,
    /// Command attempts that fail before one succeeds.
    command_failures: AtomicU32,
    discover_calls: AtomicU32,
    command_payloads: StdMutex<Vec<Vec<u8>>>,
    command_times: StdMutex<Vec<Instant>>,
}

/// A mock radio transport.
///
/// Discovery hands out handles that share the transport's scripted state, so
/// injected failures and recorded calls stay visible through the transport
/// after the handle is dropped.
#[derive(Default)]
pub struct MockRadio {
    state: Arc<RadioState>,
}

impl MockRadio {
    /// Create a mock radio with an empty advertisement.
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the advertisement payload returned by monitoring.
    #[must_use]
    pub fn advertisement(self, payload: Vec<u8>) -> Self {
        *lock(&self.state.advertisement) = payload;
        self
    }

    /// Make discovery fail.
    #[must_use]
    pub fn fail_discover(self, fail: bool) -> Self {
        self.state.fail_discover.store(fail, Ordering::Relaxed);
        self
    }

    /// Make advertisement monitoring fail.
    #[must_use]
    pub fn fail_monitor(self, fail: bool) -> Self {
        self.state.fail_monitor.store(fail, Ordering::Relaxed);
        self
    }

    /// Fail the next `count` command attempts, then succeed.
    #[must_use]
    pub fn fail_commands(self, count: u32) -> Self {
        self.state.command_failures.store(count, Ordering::Relaxed);
        self
    }

    /// Number of discovery calls so far.
    pub fn discover_calls(&self) -> u32 {
        self.state.discover_calls.load(Ordering::Relaxed)
    }

    /// Recorded payloads of successful commands.
    pub fn command_payloads(&self) -> Vec<Vec<u8>> {
        lock(&self.state.command_payloads).clone()
    }

    /// Timestamps of every command attempt, successful or not.
    pub fn command_times(&self) -> Vec<Instant> {
        lock(&self.state.command_times).clone()
    }
}

struct MockRadioHandle {
    state: Arc<RadioState>,
}

#[async_trait]
impl RadioTransport for MockRadio {
    async fn discover(&self, _family: DeviceFamily, device_id: &str) -> Result<Box<dyn RadioHandle>> {
        self.state.discover_calls.fetch_add(1, Ordering::Relaxed);
        if self.state.fail_discover.load(Ordering::Relaxed) {
            return Err(Error::device_not_found(device_id));
        }
        Ok(Box::new(MockRadioHandle {
            state: Arc::clone(&self.state),
        }))
    }
}

#[async_trait]
impl RadioHandle for MockRadioHandle {
    async fn monitor_advertisement(&self) -> Result<Vec<u8>> {
        if self.state.fail_monitor.load(Ordering::Relaxed) {
            return Err(Error::TransportFailure(
                TransportFailureReason::ConnectionFailed("mock monitor failure".to_string()),
            ));
        }
        Ok(lock(&self.state.advertisement).clone())
    }

    async fn command(&self, payload: &[u8]) -> Result<()> {
        lock(&self.state.command_times).push(Instant::now());

        let remaining = self.state.command_failures.load(Ordering::Relaxed);
        if remaining > 0 {
            self.state
                .command_failures
                .store(remaining - 1, Ordering::Relaxed);
            return Err(Error::TransportFailure(
                TransportFailureReason::CommandFailed("mock command failure".to_string()),
            ));
        }

        lock(&self.state.command_payloads).push(payload.to_vec());
        Ok(())
    }
}

/// A mock cloud transport.
#[derive(Default)]
pub struct MockCloud {
    unauthenticated: AtomicBool,
    status_code: AtomicI64,
    control_status_code: AtomicI64,
    status_body: StdMutex<serde_json::Value>,
    fail_requests: AtomicBool,
    status_calls: AtomicU32,
    control_calls: StdMutex<Vec<CloudCommand>>,
}

impl MockCloud {
    /// Create an authenticated mock cloud answering code 100 with an empty
    /// body.
    pub fn new() -> Self {
        let cloud = Self::default();
        cloud.status_code.store(100, Ordering::Relaxed);
        cloud.control_status_code.store(100, Ordering::Relaxed);
        *lock(&cloud.status_body) = serde_json::json!({});
        cloud
    }

    /// Set whether the transport reports credentials.
    #[must_use]
    pub fn authenticated(self, authenticated: bool) -> Self {
        self.unauthenticated.store(!authenticated, Ordering::Relaxed);
        self
    }

    /// Script the status body answered by `get_status`.
    #[must_use]
    pub fn status_body(self, body: serde_json::Value) -> Self {
        *lock(&self.status_body) = body;
        self
    }

    /// Script the envelope code answered by `control_device`.
    #[must_use]
    pub fn control_status_code(self, code: i64) -> Self {
        self.control_status_code.store(code, Ordering::Relaxed);
        self
    }

    /// Make every request fail at the HTTP level.
    #[must_use]
    pub fn fail_requests(self, fail: bool) -> Self {
        self.fail_requests.store(fail, Ordering::Relaxed);
        self
    }

    /// Change the status envelope code mid-test.
    pub fn set_status_code(&self, code: i64) {
        self.status_code.store(code, Ordering::Relaxed);
    }

    /// Change the status body mid-test.
    pub fn set_status_body(&self, body: serde_json::Value) {
        *lock(&self.status_body) = body;
    }

    /// Number of status queries so far.
    pub fn status_calls(&self) -> u32 {
        self.status_calls.load(Ordering::Relaxed)
    }

    /// Recorded control commands.
    pub fn control_calls(&self) -> Vec<CloudCommand> {
        lock(&self.control_calls).clone()
    }
}

#[async_trait]
impl CloudTransport for MockCloud {
    fn is_authenticated(&self) -> bool {
        !self.unauthenticated.load(Ordering::Relaxed)
    }

    async fn get_status(&self, _device_id: &str) -> Result<CloudResponse> {
        self.status_calls.fetch_add(1, Ordering::Relaxed);
        if self.fail_requests.load(Ordering::Relaxed) {
            return Err(Error::TransportFailure(TransportFailureReason::Http(
                "mock request failure".to_string(),
            )));
        }
        Ok(CloudResponse {
            status_code: self.status_code.load(Ordering::Relaxed),
            body: lock(&self.status_body).clone(),
        })
    }

    async fn control_device(&self, _device_id: &str, command: &CloudCommand) -> Result<CloudResponse> {
        if self.fail_requests.load(Ordering::Relaxed) {
            return Err(Error::TransportFailure(TransportFailureReason::Http(
                "mock request failure".to_string(),
            )));
        }
        lock(&self.control_calls).push(command.clone());
        Ok(CloudResponse {
            status_code: self.control_status_code.load(Ordering::Relaxed),
            body: serde_json::json!({}),
        })
    }
}

/// A presenter that records every write for assertions.
#[derive(Default)]
pub struct RecordingPresenter {
    writes: StdMutex<Vec<(Field, FieldValue)>>,
    current: StdMutex<HashMap<Field, FieldValue>>,
}

impl RecordingPresenter {
    /// Every write in order.
    pub fn writes(&self) -> Vec<(Field, FieldValue)> {
        lock(&self.writes).clone()
    }

    /// The writes that touched one field, in order.
    pub fn writes_of(&self, field: Field) -> Vec<FieldValue> {
        lock(&self.writes)
            .iter()
            .filter(|(f, _)| *f == field)
            .map(|(_, v)| v.clone())
            .collect()
    }

    /// The current (latest) value of a field.
    pub fn value_of(&self, field: Field) -> Option<FieldValue> {
        lock(&self.current).get(&field).cloned()
    }

    /// The current value of every field.
    pub fn snapshot(&self) -> HashMap<Field, FieldValue> {
        lock(&self.current).clone()
    }

    /// Forget recorded writes (current values are kept).
    pub fn clear(&self) {
        lock(&self.writes).clear();
    }
}

impl Presenter for RecordingPresenter {
    fn apply_state(&self, field: Field, value: FieldValue) {
        lock(&self.writes).push((field, value.clone()));
        lock(&self.current).insert(field, value);
    }
}
