//! Firmware version normalization.
//!
//! Devices report firmware versions in two shapes: `"V<major.minor...>"`
//! with an optional `-suffix` (`"V1.2-beta"`), or a bare digit run
//! (`"123"`). Both normalize to a plain dotted version string.

/// Normalize a reported firmware version string.
///
/// Rules:
/// - a leading `V`/`v` is stripped;
/// - anything from the first `-` on (a build/channel suffix) is dropped;
/// - a digit run without a `.` separator expands one digit per component
///   (`"123"` → `"1.2.3"`);
/// - malformed or empty input normalizes to `"0.0.0"`.
///
/// # Examples
///
/// ```
/// use homelink_types::normalize_firmware;
///
/// assert_eq!(normalize_firmware("V1.2-beta"), "1.2");
/// assert_eq!(normalize_firmware("123"), "1.2.3");
/// assert_eq!(normalize_firmware(""), "0.0.0");
/// ```
#[must_use]
pub fn normalize_firmware(raw: &str) -> String {
    const FALLBACK: &str = "0.0.0";

    let trimmed = raw.trim();
    let body = trimmed
        .strip_prefix('V')
        .or_else(|| trimmed.strip_prefix('v'))
        .unwrap_or(trimmed);
    let body = body.split('-').next().unwrap_or("");

    if body.is_empty() {
        return FALLBACK.to_string();
    }

    if body.contains('.') {
        let dotted_ok = body
            .split('.')
            .all(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_digit()));
        if dotted_ok {
            return body.to_string();
        }
        return FALLBACK.to_string();
    }

    if body.chars().all(|c| c.is_ascii_digit()) {
        let components: Vec<String> = body.chars().map(|c| c.to_string()).collect();
        return components.join(".");
    }

    FALLBACK.to_string()
}
