use crate::domain::attendance::AttendanceRecord;
use crate::domain::offering::{OfferingId, SlotId};
use crate::domain::ports::{ClockRef, Storage};
use crate::domain::pricing::{Money, PricingTier, price_for_session};
use crate::domain::salary::{Period, SalaryStatement, SessionPay};
use crate::domain::trainer::{Trainer, TrainerId};
use crate::error::{PayrollError, Result};
use chrono::NaiveDate;
use log::{debug, info};

/// Turns attendance and pricing into trainer compensation.
///
/// The calculator owns no state of its own: stores and the clock are handed
/// in at construction.
#[derive(Clone)]
pub struct CompensationCalculator {
    storage: Storage,
    clock: ClockRef,
}

impl CompensationCalculator {
    pub fn new(storage: Storage, clock: ClockRef) -> Self {
        Self { storage, clock }
    }

    /// Amount owed for one session. See [`PricingTier::price`].
    pub fn price_for_session(attend_count: u32, tier: Option<&PricingTier>) -> Money {
        price_for_session(attend_count, tier)
    }

    /// Total owed to the trainer for sessions recorded in `[start_date, end_date]`.
    pub async fn salary_for_period(
        &self,
        trainer_id: TrainerId,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Money> {
        Ok(self
            .statement_for_period(trainer_id, start_date, end_date)
            .await?
            .total)
    }

    /// Per-session breakdown of [`CompensationCalculator::salary_for_period`].
    pub async fn statement_for_period(
        &self,
        trainer_id: TrainerId,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<SalaryStatement> {
        let period = Period::new(start_date, end_date)?;
        let trainer = self
            .storage
            .trainers
            .get(trainer_id)
            .await?
            .ok_or_else(|| PayrollError::not_found("trainer", trainer_id))?;
        self.statement(&trainer, period).await
    }

    /// Salary for the calendar month containing today.
    pub async fn monthly_salary(&self, trainer_id: TrainerId) -> Result<SalaryStatement> {
        let month = Period::month_of(self.clock.today());
        self.statement_for_period(trainer_id, month.start, month.end)
            .await
    }

    /// One statement per trainer, ordered by trainer id.
    pub async fn payroll_report(
        &self,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<SalaryStatement>> {
        let period = Period::new(start_date, end_date)?;
        let mut statements = Vec::new();
        for trainer in self.storage.trainers.all().await? {
            statements.push(self.statement(&trainer, period).await?);
        }
        Ok(statements)
    }

    /// Records the headcount of the session behind `slot_id` on `recording_date`.
    pub async fn record_attendance(
        &self,
        slot_id: SlotId,
        recording_date: NaiveDate,
        attend_count: u32,
    ) -> Result<AttendanceRecord> {
        let slot = self
            .storage
            .offerings
            .slot(slot_id)
            .await?
            .ok_or_else(|| PayrollError::not_found("schedule slot", slot_id))?;
        self.record_offering_attendance(slot.offering_id, recording_date, attend_count)
            .await
    }

    /// Records a headcount directly against an offering.
    pub async fn record_offering_attendance(
        &self,
        offering_id: OfferingId,
        recording_date: NaiveDate,
        attend_count: u32,
    ) -> Result<AttendanceRecord> {
        if self.storage.offerings.get(offering_id).await?.is_none() {
            return Err(PayrollError::not_found("offering", offering_id));
        }
        let record = self
            .storage
            .attendance
            .upsert(offering_id, recording_date, attend_count, self.clock.now())
            .await?;
        info!(
            "recorded {} attendee(s) for offering {} on {}",
            record.attend_count, offering_id, record.recording_date
        );
        Ok(record)
    }

    async fn statement(&self, trainer: &Trainer, period: Period) -> Result<SalaryStatement> {
        let mut sessions = Vec::new();
        for offering in self.storage.offerings.by_trainer(trainer.id).await? {
            let records = self
                .storage
                .attendance
                .in_range(offering.id, period.start, period.end)
                .await?;
            sessions.extend(records.iter().map(|r| SessionPay::new(&offering, r)));
        }
        let statement = SalaryStatement::new(trainer.id, trainer.full_name(), period, sessions);
        debug!(
            "trainer {} earned {} over {} session(s) from {} to {}",
            trainer.id,
            statement.total,
            statement.sessions.len(),
            period.start,
            period.end
        );
        Ok(statement)
    }
}
