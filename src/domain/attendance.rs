use super::offering::{DayOfWeek, OfferingId};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Headcount reported for one offering on one calendar date.
///
/// There is at most one record per `(offering_id, recording_date)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub offering_id: OfferingId,
    pub attend_count: u32,
    pub recording_date: NaiveDate,
    /// Always `DayOfWeek::of(recording_date)`.
    pub recording_day: DayOfWeek,
    pub created_date: DateTime<Utc>,
    pub update_date: DateTime<Utc>,
}

impl AttendanceRecord {
    pub fn new(
        offering_id: OfferingId,
        recording_date: NaiveDate,
        attend_count: u32,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            offering_id,
            attend_count,
            recording_date,
            recording_day: DayOfWeek::of(recording_date),
            created_date: now,
            update_date: now,
        }
    }

    /// Overwrites the count, keeping `created_date`.
    pub fn update(&mut self, attend_count: u32, now: DateTime<Utc>) {
        self.attend_count = attend_count;
        self.recording_day = DayOfWeek::of(self.recording_date);
        self.update_date = now;
    }
}

impl fmt::Display for AttendanceRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} attended on {} ({})",
            self.attend_count, self.recording_date, self.recording_day
        )
    }
}
