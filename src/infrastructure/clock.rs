use crate::domain::ports::Clock;
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Offset, Utc};
use std::sync::RwLock;

/// Wall-clock time; "today" is taken in a fixed UTC offset.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    offset: FixedOffset,
}

impl SystemClock {
    /// Creates a clock whose local date is taken at `offset` from UTC.
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    /// Creates a clock whose local date is the UTC date.
    pub fn utc() -> Self {
        Self::new(Utc.fix())
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.offset).date_naive()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct FixedClock {
    now: RwLock<DateTime<Utc>>,
}

impl FixedClock {
    /// Creates a clock standing at `now`.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: RwLock::new(now),
        }
    }

    /// A clock standing at noon UTC of `date`.
    pub fn on(date: NaiveDate) -> Self {
        Self::new(date.and_hms_opt(12, 0, 0).unwrap_or_default().and_utc())
    }

    /// Moves the clock to `now`, backwards or forwards.
    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.write().unwrap_or_else(|e| e.into_inner()) = now;
    }

    /// Moves the clock forward by `by`.
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.write().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.read().unwrap_or_else(|e| e.into_inner())
    }

    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_clock_advances() {
        let date = NaiveDate::from_ymd_opt(2024, 5, 31).unwrap();
        let clock = FixedClock::on(date);
        assert_eq!(clock.today(), date);

        clock.advance(Duration::hours(13));
        assert_eq!(clock.today(), date.succ_opt().unwrap());
    }

    #[test]
    fn test_system_clock_offset() {
        let east = SystemClock::new(FixedOffset::east_opt(14 * 3600).unwrap());
        let west = SystemClock::new(FixedOffset::west_opt(12 * 3600).unwrap());
        assert!(east.today() > west.today());
    }
}
