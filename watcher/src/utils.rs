use std::time::{Duration, SystemTime, UNIX_EPOCH};

// Get current timestamp in milliseconds
pub fn get_timestamp() -> i64 {
    since_epoch().as_millis() as i64
}

// Get current timestamp in nanoseconds, used for observation ids
pub fn get_timestamp_nanos() -> i64 {
    since_epoch().as_nanos() as i64
}

fn since_epoch() -> Duration {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
}
