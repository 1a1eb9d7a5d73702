//! The seam to the host's presentation layer.

use homelink_types::{Field, FieldValue};

/// Writes canonical state into the host's exposed accessory model.
///
/// Implementations must be idempotent: writing the same value twice produces
/// the same observable output and is always safe to repeat. The engine calls
/// this for every successful parse and for fault markers; it never reads
/// back through this trait.
pub trait Presenter: Send + Sync {
    /// Write one canonical field.
    fn apply_state(&self, field: Field, value: FieldValue);
}
