use crate::clock::next_local_hour;
use chrono::{DateTime, FixedOffset, Timelike};

/// Minutes kept between an idle instruction and the end of the sleep window
const WINDOW_MARGIN_MINUTES: i64 = 2;

/// Nightly sleep window from `start` (inclusive) to `end` (exclusive) local hour.
///
/// Equal hours disable the window. A start after the end wraps past midnight.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SleepWindow {
    pub start: u8,
    pub end: u8,
}

impl SleepWindow {
    pub fn new(start: u8, end: u8) -> Self {
        Self {
            start: start % 24,
            end: end % 24,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.start != self.end
    }

    pub fn contains(&self, now: &DateTime<FixedOffset>) -> bool {
        let hour = now.hour() as u8;
        if !self.is_enabled() {
            false
        } else if self.start < self.end {
            hour >= self.start && hour < self.end
        } else {
            hour >= self.start || hour < self.end
        }
    }

    /// Idle minutes that carry a tag to just before the window ends
    pub fn minutes_to_end(&self, now: &DateTime<FixedOffset>) -> i64 {
        let end = next_local_hour(now, self.end as u32);
        (end - now.timestamp()) / 60 - WINDOW_MARGIN_MINUTES
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{Clock, FixedClock};

    #[test]
    fn test_window_wraps_midnight() {
        let window = SleepWindow::new(22, 6);
        assert!(window.contains(&FixedClock::at_local(0, 23, 0).now()));
        assert!(window.contains(&FixedClock::at_local(0, 2, 30).now()));
        assert!(!window.contains(&FixedClock::at_local(0, 6, 0).now()));
        assert!(!window.contains(&FixedClock::at_local(0, 12, 0).now()));
    }

    #[test]
    fn test_daytime_window() {
        let window = SleepWindow::new(9, 17);
        assert!(window.contains(&FixedClock::at_local(1, 9, 0).now()));
        assert!(!window.contains(&FixedClock::at_local(1, 17, 0).now()));
    }

    #[test]
    fn test_equal_hours_disable_window() {
        let window = SleepWindow::new(5, 5);
        assert!(!window.is_enabled());
        assert!(!window.contains(&FixedClock::at_local(0, 5, 0).now()));
    }

    #[test]
    fn test_minutes_to_end() {
        let window = SleepWindow::new(22, 6);
        let now = FixedClock::at_local(0, 23, 0).now();
        assert_eq!(window.minutes_to_end(&now), 7 * 60 - 2);

        let now = FixedClock::at_local(2, 5, 30).now();
        assert_eq!(window.minutes_to_end(&now), 28);
    }
}
