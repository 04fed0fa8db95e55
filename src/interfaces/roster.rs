//! JSON roster import.
//!
//! A roster describes trainers with their offerings, slots, pricing and any
//! already-known attendance. Importing goes through the application services,
//! so every validation and uniqueness rule applies to roster data too.

use crate::application::calculator::CompensationCalculator;
use crate::application::directory::Directory;
use crate::domain::offering::DayOfWeek;
use crate::domain::pricing::PricingTier;
use crate::domain::trainer::TrainerId;
use crate::error::Result;
use chrono::{NaiveDate, NaiveTime};
use log::info;
use serde::Deserialize;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

#[derive(Debug, Deserialize)]
pub struct Roster {
    #[serde(default)]
    pub trainers: Vec<TrainerEntry>,
    /// Offerings without a trainer.
    #[serde(default)]
    pub unassigned: Vec<OfferingEntry>,
}

#[derive(Debug, Deserialize)]
pub struct TrainerEntry {
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub phone_number: String,
    #[serde(default)]
    pub offerings: Vec<OfferingEntry>,
}

#[derive(Debug, Deserialize)]
pub struct OfferingEntry {
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub pricing: Option<PricingTier>,
    #[serde(default)]
    pub slots: Vec<SlotEntry>,
    #[serde(default)]
    pub attendance: Vec<AttendanceEntry>,
}

#[derive(Debug, Deserialize)]
pub struct SlotEntry {
    pub day_of_week: DayOfWeek,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

#[derive(Debug, Deserialize)]
pub struct AttendanceEntry {
    pub date: NaiveDate,
    pub count: u32,
}

/// Counts of what an import created.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ImportSummary {
    pub trainers: usize,
    pub offerings: usize,
    pub slots: usize,
    pub attendance: usize,
}

impl Roster {
    pub fn from_reader<R: Read>(source: R) -> Result<Self> {
        Ok(serde_json::from_reader(source)?)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_reader(BufReader::new(File::open(path)?))
    }

    /// Creates every entry in order. Stops at the first rejected entry.
    ///
    /// A store that already holds trainers is left untouched and the summary is
    /// empty, so a persistent store can be restarted with the same roster.
    pub async fn import(
        self,
        directory: &Directory,
        calculator: &CompensationCalculator,
    ) -> Result<ImportSummary> {
        let mut summary = ImportSummary::default();
        let existing = directory.trainers().await?.len();
        if existing > 0 {
            info!("store already holds {existing} trainer(s), roster not imported");
            return Ok(summary);
        }
        for entry in self.trainers {
            let trainer = directory
                .create_trainer(&entry.first_name, &entry.last_name, &entry.phone_number)
                .await?;
            summary.trainers += 1;
            for offering in entry.offerings {
                import_offering(directory, calculator, Some(trainer.id), offering, &mut summary)
                    .await?;
            }
        }
        for offering in self.unassigned {
            import_offering(directory, calculator, None, offering, &mut summary).await?;
        }
        info!(
            "imported {} trainer(s), {} offering(s), {} slot(s), {} attendance record(s)",
            summary.trainers, summary.offerings, summary.slots, summary.attendance
        );
        Ok(summary)
    }
}

async fn import_offering(
    directory: &Directory,
    calculator: &CompensationCalculator,
    trainer_id: Option<TrainerId>,
    entry: OfferingEntry,
    summary: &mut ImportSummary,
) -> Result<()> {
    let offering = directory
        .create_offering(&entry.name, trainer_id, entry.start_date, entry.end_date)
        .await?;
    summary.offerings += 1;
    if let Some(tier) = entry.pricing {
        directory.set_pricing(offering.id, tier).await?;
    }
    for slot in entry.slots {
        directory
            .add_slot(offering.id, slot.day_of_week, slot.start_time, slot.end_time)
            .await?;
        summary.slots += 1;
    }
    for record in entry.attendance {
        calculator
            .record_offering_attendance(offering.id, record.date, record.count)
            .await?;
        summary.attendance += 1;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::Storage;
    use crate::domain::pricing::Money;
    use crate::domain::salary::Period;
    use crate::error::PayrollError;
    use crate::infrastructure::clock::SystemClock;
    use std::sync::Arc;

    const ROSTER: &str = r#"{
        "trainers": [
            {
                "first_name": "Aida",
                "last_name": "Bekova",
                "phone_number": "+996700000001",
                "offerings": [
                    {
                        "name": "Yoga",
                        "start_date": "2024-01-01",
                        "end_date": "2024-12-31",
                        "pricing": {"quantity_to": 5, "price_to": 100, "quantity_from": 6, "price_from": 120},
                        "slots": [
                            {"day_of_week": "mon", "start_time": "18:00:00", "end_time": "19:00:00"},
                            {"day_of_week": "thu", "start_time": "18:00:00", "end_time": "19:00:00"}
                        ],
                        "attendance": [
                            {"date": "2024-05-06", "count": 5},
                            {"date": "2024-05-09", "count": 8}
                        ]
                    }
                ]
            }
        ],
        "unassigned": [
            {"name": "Stretching", "start_date": "2024-01-01", "end_date": "2024-03-31"}
        ]
    }"#;

    fn services() -> (Directory, CompensationCalculator) {
        let storage = Storage::in_memory();
        (
            Directory::new(storage.clone()),
            CompensationCalculator::new(storage, Arc::new(SystemClock::utc())),
        )
    }

    #[tokio::test]
    async fn test_import_roster() {
        let (directory, calculator) = services();
        let summary = Roster::from_reader(ROSTER.as_bytes())
            .unwrap()
            .import(&directory, &calculator)
            .await
            .unwrap();

        assert_eq!(
            summary,
            ImportSummary {
                trainers: 1,
                offerings: 2,
                slots: 2,
                attendance: 2,
            }
        );
        let may = Period::month(2024, 5).unwrap();
        let total = calculator
            .salary_for_period(1, may.start, may.end)
            .await
            .unwrap();
        assert_eq!(total, Money::new(500 + 960));
    }

    #[tokio::test]
    async fn test_import_into_populated_store_is_skipped() {
        let (directory, calculator) = services();
        for _ in 0..2 {
            Roster::from_reader(ROSTER.as_bytes())
                .unwrap()
                .import(&directory, &calculator)
                .await
                .unwrap();
        }
        let again = Roster::from_reader(ROSTER.as_bytes())
            .unwrap()
            .import(&directory, &calculator)
            .await
            .unwrap();

        assert_eq!(again, ImportSummary::default());
        assert_eq!(directory.trainers().await.unwrap().len(), 1);
        let may = Period::month(2024, 5).unwrap();
        let total = calculator
            .salary_for_period(1, may.start, may.end)
            .await
            .unwrap();
        assert_eq!(total, Money::new(500 + 960));
    }

    #[tokio::test]
    async fn test_import_rejects_invalid_tier() {
        let (directory, calculator) = services();
        let roster = r#"{"trainers": [{
            "first_name": "Aida", "phone_number": "996700000001",
            "offerings": [{
                "name": "Yoga", "start_date": "2024-01-01", "end_date": "2024-12-31",
                "pricing": {"quantity_to": 9, "price_to": 100, "quantity_from": 6, "price_from": 120}
            }]
        }]}"#;
        let result = Roster::from_reader(roster.as_bytes())
            .unwrap()
            .import(&directory, &calculator)
            .await;
        assert!(matches!(result, Err(PayrollError::ValidationError(_))));
    }
}
