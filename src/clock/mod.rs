// Wall clock with local offset

use chrono::{DateTime, Duration, FixedOffset, Local, NaiveTime, Offset, TimeZone, Utc};
use std::sync::Mutex;

/// Source of "now" for scheduling decisions
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<FixedOffset>;
}

/// System clock in the host's local timezone
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Local::now().fixed_offset()
    }
}

/// Manually driven clock
pub struct FixedClock {
    now: Mutex<DateTime<FixedOffset>>,
}

impl FixedClock {
    pub fn new(now: DateTime<FixedOffset>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// Clock at `hour:minute` local time on 2024-03-15, at the given UTC offset (hours)
    pub fn at_local(offset_hours: i32, hour: u32, minute: u32) -> Self {
        let offset = FixedOffset::east_opt(offset_hours * 3600).unwrap_or(Utc.fix());
        // 2024-03-15T00:00:00Z
        let utc = 1_710_460_800 + i64::from(hour) * 3600 + i64::from(minute) * 60
            - i64::from(offset.local_minus_utc());
        let now = DateTime::from_timestamp(utc, 0)
            .unwrap_or_default()
            .with_timezone(&offset);
        Self::new(now)
    }

    pub fn set(&self, now: DateTime<FixedOffset>) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = now;
    }

    pub fn advance(&self, seconds: i64) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += Duration::seconds(seconds);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<FixedOffset> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Unix seconds of the next `hour:00:00` local time strictly after `now`
pub fn next_local_hour(now: &DateTime<FixedOffset>, hour: u32) -> i64 {
    let time = NaiveTime::from_hms_opt(hour % 24, 0, 0).unwrap_or(NaiveTime::MIN);
    let candidate = now.date_naive().and_time(time);
    let mut ts = match now.offset().from_local_datetime(&candidate).single() {
        Some(dt) => dt.timestamp(),
        None => now.timestamp(),
    };
    if ts <= now.timestamp() {
        ts += 24 * 3600;
    }
    ts
}

/// Unix seconds of the coming local midnight
pub fn next_midnight(now: &DateTime<FixedOffset>) -> i64 {
    next_local_hour(now, 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_midnight() {
        let clock = FixedClock::at_local(2, 23, 0);
        let now = clock.now();
        assert_eq!(next_midnight(&now) - now.timestamp(), 3600);
    }

    #[test]
    fn test_next_local_hour_wraps_past_midnight() {
        let now = FixedClock::at_local(0, 23, 0).now();
        assert_eq!(next_local_hour(&now, 6) - now.timestamp(), 7 * 3600);

        let now = FixedClock::at_local(0, 4, 30).now();
        assert_eq!(next_local_hour(&now, 6) - now.timestamp(), 90 * 60);
    }

    #[test]
    fn test_fixed_clock_advance() {
        let clock = FixedClock::at_local(0, 12, 0);
        let start = clock.now().timestamp();
        clock.advance(90);
        assert_eq!(clock.now().timestamp(), start + 90);
    }
}
