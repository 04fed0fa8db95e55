use crate::domain::offering::{
    ClassOffering, DayOfWeek, NewOffering, NewSlot, OfferingId, ScheduleSlot, SlotId, SlotView,
};
use crate::domain::ports::{LinkOutcome, Storage};
use crate::domain::pricing::PricingTier;
use crate::domain::trainer::{NewTrainer, Trainer, TrainerId, normalize_phone};
use crate::error::{PayrollError, Result};
use chrono::{NaiveDate, NaiveTime};
use log::{debug, info};

/// Trainers, offerings and schedules: the administrative side of the system
/// plus the lookups the chat front-end needs.
#[derive(Clone)]
pub struct Directory {
    storage: Storage,
}

impl Directory {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    pub async fn create_trainer(
        &self,
        first_name: &str,
        last_name: &str,
        phone_number: &str,
    ) -> Result<Trainer> {
        let trainer = self
            .storage
            .trainers
            .insert(NewTrainer::new(first_name, last_name, phone_number)?)
            .await?;
        info!("created trainer {} ({})", trainer.id, trainer.full_name());
        Ok(trainer)
    }

    /// Removes the trainer; their offerings stay, without a trainer.
    pub async fn remove_trainer(&self, id: TrainerId) -> Result<()> {
        if !self.storage.trainers.remove(id).await? {
            return Err(PayrollError::not_found("trainer", id));
        }
        let orphaned = self.storage.offerings.detach_trainer(id).await?;
        info!("removed trainer {id}, {orphaned} offering(s) left without a trainer");
        Ok(())
    }

    pub async fn trainer(&self, id: TrainerId) -> Result<Trainer> {
        self.storage
            .trainers
            .get(id)
            .await?
            .ok_or_else(|| PayrollError::not_found("trainer", id))
    }

    pub async fn trainers(&self) -> Result<Vec<Trainer>> {
        self.storage.trainers.all().await
    }

    pub async fn create_offering(
        &self,
        name: &str,
        trainer_id: Option<TrainerId>,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<ClassOffering> {
        let offering = NewOffering::new(name, trainer_id, start_date, end_date)?;
        if let Some(id) = trainer_id {
            self.trainer(id).await?;
        }
        let offering = self.storage.offerings.insert(offering).await?;
        info!("created offering {} '{}'", offering.id, offering.name);
        Ok(offering)
    }

    pub async fn offering(&self, id: OfferingId) -> Result<ClassOffering> {
        self.storage
            .offerings
            .get(id)
            .await?
            .ok_or_else(|| PayrollError::not_found("offering", id))
    }

    pub async fn add_slot(
        &self,
        offering_id: OfferingId,
        day_of_week: DayOfWeek,
        start_time: NaiveTime,
        end_time: NaiveTime,
    ) -> Result<ScheduleSlot> {
        let slot = NewSlot::new(offering_id, day_of_week, start_time, end_time)?;
        self.storage.offerings.add_slot(slot).await
    }

    /// The slot and its offering, provided the offering is taught by `trainer_id`.
    ///
    /// A slot of another trainer's offering is reported as not found.
    pub async fn trainer_slot(
        &self,
        trainer_id: TrainerId,
        slot_id: SlotId,
    ) -> Result<(ScheduleSlot, ClassOffering)> {
        let not_found = || PayrollError::not_found("schedule slot", slot_id);
        let slot = self
            .storage
            .offerings
            .slot(slot_id)
            .await?
            .ok_or_else(not_found)?;
        let offering = self.offering(slot.offering_id).await?;
        if offering.trainer_id != Some(trainer_id) {
            debug!("slot {slot_id} is not taught by trainer {trainer_id}");
            return Err(not_found());
        }
        Ok((slot, offering))
    }

    /// Attaches the offering's pricing tier; an offering carries at most one.
    pub async fn set_pricing(&self, offering_id: OfferingId, tier: PricingTier) -> Result<()> {
        tier.validate()?;
        self.storage.offerings.set_pricing(offering_id, tier).await?;
        info!("priced offering {offering_id}: {tier}");
        Ok(())
    }

    pub async fn replace_pricing(&self, offering_id: OfferingId, tier: PricingTier) -> Result<()> {
        tier.validate()?;
        self.storage
            .offerings
            .replace_pricing(offering_id, tier)
            .await?;
        info!("repriced offering {offering_id}: {tier}");
        Ok(())
    }

    /// Finds the trainer registered under `number`.
    pub async fn verify_phone(&self, number: &str) -> Result<Trainer> {
        let phone = normalize_phone(number)?;
        debug!("verifying phone {phone}");
        self.storage
            .trainers
            .find_by_phone(&phone)
            .await?
            .ok_or_else(|| PayrollError::not_found("trainer with phone", phone))
    }

    /// Binds an external chat identity to the trainer, once.
    pub async fn link_identity(&self, trainer: &Trainer, external_id: &str) -> Result<LinkOutcome> {
        let outcome = self
            .storage
            .trainers
            .bind_chat_id(trainer.id, external_id)
            .await?;
        if outcome == LinkOutcome::Linked {
            info!("linked chat {external_id} to trainer {}", trainer.id);
        }
        Ok(outcome)
    }

    pub async fn trainer_by_chat_id(&self, chat_id: &str) -> Result<Option<Trainer>> {
        self.storage.trainers.find_by_chat_id(chat_id).await
    }

    /// The trainer's slots on `day`, ordered by start time.
    pub async fn slots_for_weekday(
        &self,
        trainer_id: TrainerId,
        day: DayOfWeek,
    ) -> Result<Vec<SlotView>> {
        self.collect_slots(trainer_id, day, |_| true).await
    }

    /// Like [`Directory::slots_for_weekday`], restricted to offerings running on `date`.
    pub async fn slots_for_date(
        &self,
        trainer_id: TrainerId,
        date: NaiveDate,
    ) -> Result<Vec<SlotView>> {
        self.collect_slots(trainer_id, DayOfWeek::of(date), |offering| {
            offering.is_active_on(date)
        })
        .await
    }

    async fn collect_slots<F>(
        &self,
        trainer_id: TrainerId,
        day: DayOfWeek,
        keep: F,
    ) -> Result<Vec<SlotView>>
    where
        F: Fn(&ClassOffering) -> bool,
    {
        let mut views = Vec::new();
        for offering in self.storage.offerings.by_trainer(trainer_id).await? {
            if !keep(&offering) {
                continue;
            }
            for slot in self.storage.offerings.slots_of(offering.id).await? {
                if slot.day_of_week == day {
                    views.push(SlotView {
                        slot,
                        offering_name: offering.name.clone(),
                    });
                }
            }
        }
        views.sort_by_key(|v| (v.slot.start_time, v.slot.id));
        debug!("trainer {trainer_id} has {} slot(s) on {day}", views.len());
        Ok(views)
    }
}
