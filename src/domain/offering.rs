use super::pricing::PricingTier;
use super::trainer::TrainerId;
use crate::error::PayrollError;
use chrono::{Datelike, NaiveDate, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub type OfferingId = u32;
pub type SlotId = u32;

/// Day of the week, named by its three-letter lowercase English abbreviation.
///
/// Schedule slots and attendance records share this enumeration so that
/// attendance can be correlated with the slot it was reported for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayOfWeek {
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
    Sat,
    Sun,
}

impl DayOfWeek {
    pub const ALL: [DayOfWeek; 7] = [
        DayOfWeek::Mon,
        DayOfWeek::Tue,
        DayOfWeek::Wed,
        DayOfWeek::Thu,
        DayOfWeek::Fri,
        DayOfWeek::Sat,
        DayOfWeek::Sun,
    ];

    pub fn of(date: NaiveDate) -> Self {
        date.weekday().into()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DayOfWeek::Mon => "mon",
            DayOfWeek::Tue => "tue",
            DayOfWeek::Wed => "wed",
            DayOfWeek::Thu => "thu",
            DayOfWeek::Fri => "fri",
            DayOfWeek::Sat => "sat",
            DayOfWeek::Sun => "sun",
        }
    }
}

impl From<Weekday> for DayOfWeek {
    fn from(weekday: Weekday) -> Self {
        match weekday {
            Weekday::Mon => DayOfWeek::Mon,
            Weekday::Tue => DayOfWeek::Tue,
            Weekday::Wed => DayOfWeek::Wed,
            Weekday::Thu => DayOfWeek::Thu,
            Weekday::Fri => DayOfWeek::Fri,
            Weekday::Sat => DayOfWeek::Sat,
            Weekday::Sun => DayOfWeek::Sun,
        }
    }
}

impl fmt::Display for DayOfWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DayOfWeek {
    type Err = PayrollError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        DayOfWeek::ALL
            .into_iter()
            .find(|day| day.as_str() == needle)
            .ok_or_else(|| PayrollError::validation(format!("unknown day of week '{s}'")))
    }
}

/// A recurring class taught by a trainer over a date range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassOffering {
    pub id: OfferingId,
    pub name: String,
    /// `None` once the trainer has been removed.
    pub trainer_id: Option<TrainerId>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// At most one tier per offering.
    pub pricing: Option<PricingTier>,
}

impl ClassOffering {
    /// Whether `date` lies inside the offering's validity window.
    pub fn is_active_on(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOffering {
    pub name: String,
    pub trainer_id: Option<TrainerId>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl NewOffering {
    pub fn new(
        name: impl Into<String>,
        trainer_id: Option<TrainerId>,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Self, PayrollError> {
        let name = name.into().trim().to_string();
        if name.is_empty() {
            return Err(PayrollError::validation("offering name must not be empty"));
        }
        if start_date > end_date {
            return Err(PayrollError::validation(format!(
                "start date {start_date} is after end date {end_date}"
            )));
        }
        Ok(Self {
            name,
            trainer_id,
            start_date,
            end_date,
        })
    }

    pub fn into_offering(self, id: OfferingId) -> ClassOffering {
        ClassOffering {
            id,
            name: self.name,
            trainer_id: self.trainer_id,
            start_date: self.start_date,
            end_date: self.end_date,
            pricing: None,
        }
    }
}

/// One weekly recurrence of an offering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleSlot {
    pub id: SlotId,
    pub offering_id: OfferingId,
    pub day_of_week: DayOfWeek,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

impl ScheduleSlot {
    /// Whether `other` occupies the same (offering, day, start) key.
    pub fn same_key(&self, other: &NewSlot) -> bool {
        self.offering_id == other.offering_id
            && self.day_of_week == other.day_of_week
            && self.start_time == other.start_time
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSlot {
    pub offering_id: OfferingId,
    pub day_of_week: DayOfWeek,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

impl NewSlot {
    pub fn new(
        offering_id: OfferingId,
        day_of_week: DayOfWeek,
        start_time: NaiveTime,
        end_time: NaiveTime,
    ) -> Result<Self, PayrollError> {
        if start_time >= end_time {
            return Err(PayrollError::validation(format!(
                "slot start {start_time} must be before end {end_time}"
            )));
        }
        Ok(Self {
            offering_id,
            day_of_week,
            start_time,
            end_time,
        })
    }

    pub fn into_slot(self, id: SlotId) -> ScheduleSlot {
        ScheduleSlot {
            id,
            offering_id: self.offering_id,
            day_of_week: self.day_of_week,
            start_time: self.start_time,
            end_time: self.end_time,
        }
    }
}

/// A schedule slot joined with the name of its offering, as shown to trainers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotView {
    pub slot: ScheduleSlot,
    pub offering_name: String,
}

impl fmt::Display for SlotView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}-{}",
            self.offering_name,
            self.slot.start_time.format("%H:%M"),
            self.slot.end_time.format("%H:%M")
        )
    }
}
