//! Time formatting helpers.

use std::time::Duration;

/// Format a duration to a short human-readable string: `45s`, `10m`,
/// `6h 30m`, `2d 3h`. Zero-valued trailing units are omitted.
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    let (major, major_unit, minor, minor_unit) = if secs < 60 {
        return format!("{secs}s");
    } else if secs < 3600 {
        (secs / 60, "m", secs % 60, "s")
    } else if secs < 86400 {
        (secs / 3600, "h", (secs % 3600) / 60, "m")
    } else {
        (secs / 86400, "d", (secs % 86400) / 3600, "h")
    };
    if minor == 0 {
        format!("{major}{major_unit}")
    } else {
        format!("{major}{major_unit} {minor}{minor_unit}")
    }
}
