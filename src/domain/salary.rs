use super::attendance::AttendanceRecord;
use super::offering::{ClassOffering, DayOfWeek, OfferingId};
use super::pricing::{Money, price_for_session};
use super::trainer::TrainerId;
use crate::error::PayrollError;
use chrono::{Datelike, Days, Months, NaiveDate};
use serde::Serialize;
use std::fmt;

/// An inclusive range of calendar dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Period {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", self.start, self.end)
    }
}

impl Period {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, PayrollError> {
        if end < start {
            return Err(PayrollError::validation(format!(
                "end date {end} is before start date {start}"
            )));
        }
        Ok(Self { start, end })
    }

    /// The calendar month containing `date`.
    pub fn month_of(date: NaiveDate) -> Self {
        let start = date.with_day(1).unwrap_or(date);
        let end = start
            .checked_add_months(Months::new(1))
            .and_then(|next| next.checked_sub_days(Days::new(1)))
            .unwrap_or(NaiveDate::MAX);
        Self { start, end }
    }

    /// The month named `year`-`month`.
    pub fn month(year: i32, month: u32) -> Result<Self, PayrollError> {
        NaiveDate::from_ymd_opt(year, month, 1)
            .map(Self::month_of)
            .ok_or_else(|| PayrollError::validation(format!("invalid month {year}-{month:02}")))
    }

    /// Parses a `YYYY-MM` month.
    pub fn parse_month(s: &str) -> Result<Self, PayrollError> {
        let invalid = || PayrollError::validation(format!("'{s}' is not a YYYY-MM month"));
        let (year, month) = s.trim().split_once('-').ok_or_else(invalid)?;
        let year = year.parse().map_err(|_| invalid())?;
        let month = month.parse().map_err(|_| invalid())?;
        Self::month(year, month)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// What one recorded session earned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionPay {
    pub offering_id: OfferingId,
    pub offering_name: String,
    pub recording_date: NaiveDate,
    pub recording_day: DayOfWeek,
    pub attend_count: u32,
    pub amount: Money,
}

impl SessionPay {
    pub fn new(offering: &ClassOffering, record: &AttendanceRecord) -> Self {
        Self {
            offering_id: offering.id,
            offering_name: offering.name.clone(),
            recording_date: record.recording_date,
            recording_day: record.recording_day,
            attend_count: record.attend_count,
            amount: price_for_session(record.attend_count, offering.pricing.as_ref()),
        }
    }
}

/// Per-session breakdown of a trainer's salary over a period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SalaryStatement {
    pub trainer_id: TrainerId,
    pub trainer_name: String,
    pub period: Period,
    pub sessions: Vec<SessionPay>,
    pub total: Money,
}

impl SalaryStatement {
    pub fn new(
        trainer_id: TrainerId,
        trainer_name: String,
        period: Period,
        mut sessions: Vec<SessionPay>,
    ) -> Self {
        sessions.sort_by(|a, b| {
            a.recording_date
                .cmp(&b.recording_date)
                .then(a.offering_id.cmp(&b.offering_id))
        });
        let total = sessions.iter().map(|s| s.amount).sum();
        Self {
            trainer_id,
            trainer_name,
            period,
            sessions,
            total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::offering::NewOffering;
    use crate::domain::pricing::PricingTier;
    use chrono::Utc;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_period_validation() {
        assert!(Period::new(date(2024, 5, 1), date(2024, 5, 1)).is_ok());
        assert!(matches!(
            Period::new(date(2024, 5, 2), date(2024, 5, 1)),
            Err(PayrollError::ValidationError(_))
        ));
    }

    #[test]
    fn test_month_bounds() {
        let may = Period::month_of(date(2024, 5, 17));
        assert_eq!(may.start, date(2024, 5, 1));
        assert_eq!(may.end, date(2024, 5, 31));

        let feb = Period::month(2024, 2).unwrap();
        assert_eq!(feb.end, date(2024, 2, 29));

        let dec = Period::month_of(date(2023, 12, 31));
        assert_eq!(dec.start, date(2023, 12, 1));
        assert_eq!(dec.end, date(2023, 12, 31));

        assert!(Period::month(2024, 13).is_err());
    }

    #[test]
    fn test_parse_month() {
        assert_eq!(
            Period::parse_month("2024-02").unwrap(),
            Period::month(2024, 2).unwrap()
        );
        for bad in ["2024", "2024-00", "May 2024", "2024-5x"] {
            assert!(matches!(
                Period::parse_month(bad),
                Err(PayrollError::ValidationError(_))
            ));
        }
    }

    #[test]
    fn test_period_contains() {
        let may = Period::month(2024, 5).unwrap();
        assert!(may.contains(date(2024, 5, 1)));
        assert!(may.contains(date(2024, 5, 31)));
        assert!(!may.contains(date(2024, 6, 1)));
    }

    #[test]
    fn test_statement_totals_sessions() {
        let mut offering = NewOffering::new("Boxing", Some(1), date(2024, 5, 1), date(2024, 5, 31))
            .unwrap()
            .into_offering(2);
        offering.pricing = Some(PricingTier::new(5, 100, 6, 90));
        let now = Utc::now();

        let sessions = vec![
            SessionPay::new(&offering, &AttendanceRecord::new(2, date(2024, 5, 8), 6, now)),
            SessionPay::new(&offering, &AttendanceRecord::new(2, date(2024, 5, 6), 5, now)),
        ];
        let statement = SalaryStatement::new(
            1,
            "Aida Bekova".to_string(),
            Period::month(2024, 5).unwrap(),
            sessions,
        );

        assert_eq!(statement.total, Money::new(1040));
        assert_eq!(statement.sessions[0].recording_date, date(2024, 5, 6));
        assert_eq!(statement.sessions[1].amount, Money::new(540));
    }
}
