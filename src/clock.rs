use chrono::{DateTime, FixedOffset, Local};

/// Source of wall-clock time, already converted to local calendar time.
pub trait Clock {
    fn now(&self) -> DateTime<FixedOffset>;
}

/// The system clock in the host's local time zone.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Local::now().into()
    }
}

/// Formats `time` the way `asctime(3)` does, trailing newline included:
/// `Tue Jul  4 09:05:03 2023\n`.
pub fn asctime(time: &DateTime<FixedOffset>) -> String {
    time.format("%a %b %e %H:%M:%S %Y\n").to_string()
}
