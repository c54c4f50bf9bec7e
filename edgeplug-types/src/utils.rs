use std::time::{SystemTime, UNIX_EPOCH};

/// Get the current time in milliseconds since the Unix epoch, UTC.
pub fn timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_millis() as u64)
}
