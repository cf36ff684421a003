//! Timestamp helpers: epoch-to-RFC3339 for output rows and wall-clock strings for status lines.

use serde_json::{Map, Value};
use std::time::Duration;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::OffsetDateTime;

/// Convert Reddit's (possibly fractional) epoch seconds to RFC3339. `None` when out of range.
pub fn rfc3339_from_epoch(secs: f64) -> Option<String> {
    if !secs.is_finite() {
        return None;
    }
    let dt = OffsetDateTime::from_unix_timestamp(secs.trunc() as i64).ok()?;
    dt.format(&Rfc3339).ok()
}

/// Rewrite a numeric timestamp field of a JSON object as an RFC3339 string, in place.
pub fn apply_human_timestamp_in_place(map: &mut Map<String, Value>, key: &str) {
    if let Some(v) = map.get_mut(key) {
        if let Some(s) = v.as_f64().and_then(rfc3339_from_epoch) {
            *v = Value::String(s);
        }
    }
}

/// Current UTC time as `HH:MM:SS`.
pub fn clock_now() -> String {
    let fmt = format_description!("[hour]:[minute]:[second]");
    OffsetDateTime::now_utc()
        .format(&fmt)
        .unwrap_or_else(|_| "??:??:??".to_string())
}

/// Elapsed time in hours, for the end-of-run status line.
pub fn as_hours(elapsed: Duration) -> f64 {
    elapsed.as_secs_f64() / 3600.0
}
