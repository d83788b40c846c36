use chrono::{DateTime, FixedOffset, TimeZone, Utc};
use serde::{Deserialize, Serialize};

const KST_OFFSET_SECS: i32 = 9 * 3600;

/// Service launch: start of the 2026 spring semester, Korea time.
pub fn launch_at() -> DateTime<Utc> {
    FixedOffset::east_opt(KST_OFFSET_SECS)
        .and_then(|kst| kst.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).single())
        .map(|at| at.with_timezone(&Utc))
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Countdown {
    pub days: i64,
    pub hours: i64,
    pub minutes: i64,
    pub seconds: i64,
}

impl Countdown {
    /// Time left until `target`, or `None` once it has passed.
    pub fn until(target: DateTime<Utc>, now: DateTime<Utc>) -> Option<Self> {
        let remaining = target.signed_duration_since(now).num_seconds();
        if remaining < 0 {
            return None;
        }
        Some(Self {
            days: remaining / 86_400,
            hours: remaining % 86_400 / 3_600,
            minutes: remaining % 3_600 / 60,
            seconds: remaining % 60,
        })
    }
}
