use chrono::Utc;
use tokio::time::Instant;

pub fn now_i64() -> i64 {
    Utc::now().timestamp()
}

pub fn get_instant() -> Instant {
    Instant::now()
}

/// A token is valid strictly before its expiry; `now == exp` counts as expired.
pub fn is_valid_at(exp_unix_ts: i64, now_unix_ts: i64) -> bool {
    now_unix_ts < exp_unix_ts
}
