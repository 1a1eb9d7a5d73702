//! Platform-agnostic types for the homelink bridge.
//!
//! This crate defines the data model shared by every transport and by the
//! reconciliation engine: device identity and capability flags, the closed
//! set of supported device families, the canonical state records produced by
//! payload parsing, and the field/value vocabulary used to write state into
//! the host's presentation layer.
//!
//! Nothing in this crate performs I/O; the engine lives in `homelink-core`.

pub mod error;
pub mod state;
pub mod types;
pub mod version;

pub use error::ParseError;
pub use state::{CanonicalState, Field, FieldValue, ParseWarning, StatusUpdate};
pub use types::{ConnectionType, DeviceFamily, DeviceIdentity, LockState, TemperatureUnit};
pub use version::normalize_firmware;
