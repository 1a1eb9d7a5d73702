//! Remote status code classification.
//!
//! The cloud service answers every request with a numeric status code in its
//! response envelope. The table here is fixed: two success codes, a closed
//! set of known failure codes each with a fixed human-readable meaning, and
//! everything else reported as "unknown". Unknown codes are informational,
//! not errors — "the remote told us something bad happened" and "we don't
//! understand the remote" are different conditions and are logged at
//! different levels.

use std::borrow::Cow;

use tracing::{debug, error, info};

/// Hub id placeholder meaning "this device is its own hub".
pub const SELF_HUB_PLACEHOLDER: &str = "000000000000";

/// Status code for "device is offline".
pub const CODE_DEVICE_OFFLINE: i64 = 161;

/// Status code for "hub is offline".
pub const CODE_HUB_OFFLINE: i64 = 171;

/// Category of a remote status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCategory {
    /// Request succeeded.
    Success,
    /// Command was accepted for asynchronous execution.
    CommandAccepted,
    /// The request itself was rejected.
    ClientError,
    /// The target device is unreachable.
    DeviceOffline,
    /// The hub the device reports through is unreachable.
    HubOffline,
    /// Code not in the known table.
    Unknown,
}

/// The outcome of classifying one remote status code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    /// The code after any rewrite (see [`classify`]).
    pub code: i64,
    /// Category.
    pub category: StatusCategory,
    /// Fixed human-readable meaning.
    pub message: Cow<'static, str>,
}

impl Classification {
    /// Whether the remote reported success (including accepted-for-execution).
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(
            self.category,
            StatusCategory::Success | StatusCategory::CommandAccepted
        )
    }

    /// Whether this classification represents a known failure. Unknown codes
    /// are not failures; they are conditions we do not understand.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(
            self.category,
            StatusCategory::ClientError | StatusCategory::DeviceOffline | StatusCategory::HubOffline
        )
    }

    /// Log this classification at the severity its category calls for:
    /// success at debug, known failures at error, unknown codes at info.
    pub fn log(&self, device_id: &str) {
        match self.category {
            StatusCategory::Success | StatusCategory::CommandAccepted => {
                debug!(device_id, code = self.code, "{}", self.message);
            }
            StatusCategory::Unknown => {
                info!(device_id, code = self.code, "{}", self.message);
            }
            _ => {
                error!(device_id, code = self.code, "{}", self.message);
            }
        }
    }
}

/// Fixed meaning of a known status code.
fn known_message(code: i64) -> Option<(&'static str, StatusCategory)> {
    let entry = match code {
        100 => ("request successful", StatusCategory::Success),
        200 => ("request successfully accepted", StatusCategory::CommandAccepted),
        151 => ("device type error", StatusCategory::ClientError),
        152 => ("device not found", StatusCategory::ClientError),
        160 => ("command is not supported", StatusCategory::ClientError),
        161 => ("device is offline", StatusCategory::DeviceOffline),
        171 => ("hub device is offline", StatusCategory::HubOffline),
        190 => (
            "device internal error due to device states not synchronized with server, \
             or command format is invalid",
            StatusCategory::ClientError,
        ),
        400 => (
            "bad request: the request was invalid or cannot be otherwise served",
            StatusCategory::ClientError,
        ),
        401 => (
            "unauthorized: authorization header missing or token invalid",
            StatusCategory::ClientError,
        ),
        403 => (
            "forbidden: the request is understood but has been refused",
            StatusCategory::ClientError,
        ),
        404 => (
            "not found: the requested resource does not exist",
            StatusCategory::ClientError,
        ),
        406 => (
            "not acceptable: requested media type not available",
            StatusCategory::ClientError,
        ),
        415 => (
            "unsupported media type: request media type not supported",
            StatusCategory::ClientError,
        ),
        422 => (
            "unprocessable entity: request body format error",
            StatusCategory::ClientError,
        ),
        429 => (
            "too many requests: rate limit exceeded",
            StatusCategory::ClientError,
        ),
        500 => (
            "internal server error: an unexpected condition was encountered",
            StatusCategory::ClientError,
        ),
        _ => return None,
    };
    Some(entry)
}

/// Classify a remote status code for a device.
///
/// A "hub offline" code is rewritten to "device offline" when the device's
/// configured hub id equals its own id or the all-zero placeholder: such a
/// device is its own hub, and reporting its hub as a separate offline party
/// would be misleading.
#[must_use]
pub fn classify(code: i64, device_id: &str, hub_device_id: Option<&str>) -> Classification {
    let code = if code == CODE_HUB_OFFLINE && is_own_hub(device_id, hub_device_id) {
        CODE_DEVICE_OFFLINE
    } else {
        code
    };

    match known_message(code) {
        Some((message, category)) => Classification {
            code,
            category,
            message: Cow::Borrowed(message),
        },
        None => Classification {
            code,
            category: StatusCategory::Unknown,
            message: Cow::Owned(format!("unknown status code: {code}")),
        },
    }
}

fn is_own_hub(device_id: &str, hub_device_id: Option<&str>) -> bool {
    match hub_device_id {
        Some(hub) => hub == device_id || hub == SELF_HUB_PLACEHOLDER,
        None => false,
    }
}
