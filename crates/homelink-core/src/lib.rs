//! Multi-transport state reconciliation and command dispatch for smart-home
//! devices.
//!
//! A physical device can report its state through up to three independent,
//! asynchronous transports — a short-range radio broadcast, a cloud polling
//! API, and a cloud push webhook. This crate reconciles whichever transport
//! is active into one consistent exposed state and pushes user-initiated
//! changes back out through the correct transport, with retry and
//! transport-to-transport fallback.
//!
//! # Architecture
//!
//! - [`DeviceController`] — one per device; selects a transport per
//!   operation, parses its payloads, applies canonical state to the
//!   [`Presenter`] seam, and runs the debounced change-push pipeline
//! - [`parse`] — pure per-transport parsers producing
//!   [`homelink_types::StatusUpdate`]
//! - [`classify`] — the fixed remote status-code table
//! - [`retry`] — the bounded retry combinator used by radio pushes
//! - [`EventRouter`] — process-wide routing of webhook and radio events to
//!   the right device
//! - [`radio::BtleRadio`] / [`cloud::CloudClient`] — concrete transport
//!   adapters over btleplug and reqwest
//! - [`mock`] — scriptable transports and a recording presenter for tests
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use homelink_core::{DeviceController, cloud::CloudClient};
//! use homelink_types::{ConnectionType, DeviceFamily, DeviceIdentity, Field, FieldValue};
//! use tokio_util::sync::CancellationToken;
//!
//! struct Accessory;
//!
//! impl homelink_core::Presenter for Accessory {
//!     fn apply_state(&self, field: Field, value: FieldValue) {
//!         println!("{field} = {value:?}");
//!     }
//! }
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let cloud = Arc::new(CloudClient::new("https://api.example-vendor.com")?.with_token("token"));
//! let identity = DeviceIdentity::new("plug-1", DeviceFamily::Plug, ConnectionType::CloudOnly);
//!
//! let controller = DeviceController::builder(identity, Arc::new(Accessory))
//!     .cloud(cloud)
//!     .build();
//!
//! let cancel = CancellationToken::new();
//! let _worker = controller.start(cancel.clone());
//!
//! controller.refresh_status().await?;
//! controller.request_change(true);
//! # Ok(())
//! # }
//! ```

pub mod classify;
pub mod cloud;
pub mod config;
pub mod controller;
pub mod error;
pub mod events;
pub mod mock;
pub mod parse;
pub mod present;
pub mod push;
pub mod radio;
pub mod retry;
pub mod router;
pub mod transport;

// Core exports
pub use classify::{Classification, StatusCategory, classify as classify_status_code};
pub use config::{DeviceOverrides, LuxTuning, PlatformDefaults, ResolvedSettings};
pub use controller::{CachedContext, DeviceController, DeviceControllerBuilder, refresh_all};
pub use error::{Error, Result, TransportFailureReason, TransportUnavailableReason};
pub use events::{BridgeEvent, EventDispatcher, EventReceiver, EventSender};
pub use mock::{MockCloud, MockRadio, RecordingPresenter};
pub use present::Presenter;
pub use push::{LATCH_RESET_DELAY, PendingIntent, VERIFY_DELAY};
pub use retry::{RetryBudget, with_retry};
pub use router::EventRouter;
pub use transport::{
    CloudCommand, CloudResponse, CloudTransport, RadioHandle, RadioTransport, TransportKind,
};

// Re-export from homelink-types
pub use homelink_types::{
    CanonicalState, ConnectionType, DeviceFamily, DeviceIdentity, Field, FieldValue, LockState,
    ParseError, ParseWarning, StatusUpdate, TemperatureUnit, normalize_firmware,
};
