use chrono::{DateTime, Local, TimeZone};

/// Display format for history timestamps (wall clock, local zone).
pub const DISPLAY_FORMAT: &str = "%H:%M:%S";

/// Resolve the instant an entry is stamped with.
/// Source-supplied epoch seconds win; anything missing or out of range falls
/// back to receipt time.
pub fn resolve_instant(epoch_seconds: Option<f64>) -> DateTime<Local> {
    epoch_seconds
        .filter(|secs| secs.is_finite())
        .and_then(|secs| {
            let millis = (secs * 1000.0).round();
            if millis.abs() > i64::MAX as f64 {
                return None;
            }
            Local.timestamp_millis_opt(millis as i64).single()
        })
        .unwrap_or_else(Local::now)
}

pub fn display_time(epoch_seconds: Option<f64>) -> String {
    resolve_instant(epoch_seconds).format(DISPLAY_FORMAT).to_string()
}
