use std::time::{SystemTime, UNIX_EPOCH};

pub fn get_current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Byte rate to megabits per second, for log readability.
pub fn bytes_per_sec_to_mbps(rate: f64) -> f64 {
    rate * 8.0 / 1_000_000.0
}
