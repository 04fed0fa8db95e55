use crate::domain::salary::SalaryStatement;
use crate::error::Result;
use serde::Serialize;
use std::io::Write;

#[derive(Serialize)]
struct SummaryRow<'a> {
    trainer: u32,
    name: &'a str,
    sessions: usize,
    total: u64,
}

#[derive(Serialize)]
struct SessionRow<'a> {
    date: String,
    day: &'a str,
    offering: &'a str,
    attendance: u32,
    amount: u64,
}

/// Writes salary statements as CSV.
///
/// The `total` column is the statement total, so the export always agrees
/// with the salary computed for the same trainer and period.
pub struct SalaryWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> SalaryWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    /// One `trainer,name,sessions,total` row per statement.
    pub fn write_summary(&mut self, statements: &[SalaryStatement]) -> Result<()> {
        if statements.is_empty() {
            self.writer
                .write_record(["trainer", "name", "sessions", "total"])?;
        }
        for statement in statements {
            self.writer.serialize(SummaryRow {
                trainer: statement.trainer_id,
                name: &statement.trainer_name,
                sessions: statement.sessions.len(),
                total: statement.total.value(),
            })?;
        }
        self.writer.flush()?;
        Ok(())
    }

    /// One `date,day,offering,attendance,amount` row per session.
    pub fn write_sessions(&mut self, statement: &SalaryStatement) -> Result<()> {
        if statement.sessions.is_empty() {
            self.writer
                .write_record(["date", "day", "offering", "attendance", "amount"])?;
        }
        for session in &statement.sessions {
            self.writer.serialize(SessionRow {
                date: session.recording_date.format("%Y-%m-%d").to_string(),
                day: session.recording_day.as_str(),
                offering: &session.offering_name,
                attendance: session.attend_count,
                amount: session.amount.value(),
            })?;
        }
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::attendance::AttendanceRecord;
    use crate::domain::offering::NewOffering;
    use crate::domain::pricing::PricingTier;
    use crate::domain::salary::{Period, SessionPay};
    use chrono::{NaiveDate, Utc};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn statement() -> SalaryStatement {
        let mut offering = NewOffering::new("Yoga", Some(1), date(2024, 1, 1), date(2024, 12, 31))
            .unwrap()
            .into_offering(1);
        offering.pricing = Some(PricingTier::new(5, 100, 6, 120));
        let now = Utc::now();
        let sessions = vec![
            SessionPay::new(&offering, &AttendanceRecord::new(1, date(2024, 5, 6), 5, now)),
            SessionPay::new(&offering, &AttendanceRecord::new(1, date(2024, 5, 13), 6, now)),
        ];
        SalaryStatement::new(
            1,
            "Aida Bekova".into(),
            Period::month(2024, 5).unwrap(),
            sessions,
        )
    }

    #[test]
    fn test_write_summary() {
        let mut out = Vec::new();
        SalaryWriter::new(&mut out)
            .write_summary(&[statement()])
            .unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, "trainer,name,sessions,total\n1,Aida Bekova,2,1220\n");
    }

    #[test]
    fn test_write_sessions() {
        let mut out = Vec::new();
        SalaryWriter::new(&mut out)
            .write_sessions(&statement())
            .unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "date,day,offering,attendance,amount\n\
             2024-05-06,mon,Yoga,5,500\n\
             2024-05-13,mon,Yoga,6,720\n"
        );
    }

    #[test]
    fn test_empty_report_still_has_header() {
        let mut out = Vec::new();
        SalaryWriter::new(&mut out).write_summary(&[]).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "trainer,name,sessions,total\n");
    }
}
