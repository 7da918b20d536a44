use std::time::Duration;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

/// Duration since the unix epoch; zero if the clock is before the epoch.
pub fn get_duration_since_epoch() -> Duration {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default()
}

/// return millisecond
pub fn now_millis() -> u64 {
    get_duration_since_epoch().as_millis() as u64
}

/// Millis elapsed since `earlier`, or `-1` when `earlier` is unknown (0) or in the future.
pub fn millis_since(earlier: u64) -> i64 {
    if earlier == 0 {
        return -1;
    }
    now_millis().checked_sub(earlier).map(|d| d as i64).unwrap_or(-1)
}
