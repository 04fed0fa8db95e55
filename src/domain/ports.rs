use super::attendance::AttendanceRecord;
use super::offering::{ClassOffering, NewOffering, NewSlot, OfferingId, ScheduleSlot, SlotId};
use super::pricing::PricingTier;
use super::trainer::{NewTrainer, Trainer, TrainerId};
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::sync::Arc;

/// Result of binding a chat identity to a trainer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkOutcome {
    /// The identity was bound just now.
    Linked,
    /// The trainer already carried this identity.
    AlreadyLinked,
}

#[async_trait]
pub trait TrainerStore: Send + Sync {
    /// Stores a new trainer. Fails with `ConflictError` if the phone number is taken.
    async fn insert(&self, trainer: NewTrainer) -> Result<Trainer>;
    /// Retrieves a trainer by id.
    async fn get(&self, id: TrainerId) -> Result<Option<Trainer>>;
    /// Looks a trainer up by normalised phone number.
    async fn find_by_phone(&self, phone_number: &str) -> Result<Option<Trainer>>;
    /// Looks a trainer up by the chat identity bound to them.
    async fn find_by_chat_id(&self, chat_id: &str) -> Result<Option<Trainer>>;
    /// Binds `chat_id` to the trainer in one atomic step.
    ///
    /// Fails with `ConflictError` if the identity belongs to another trainer or
    /// the trainer is already bound to a different identity.
    async fn bind_chat_id(&self, id: TrainerId, chat_id: &str) -> Result<LinkOutcome>;
    /// Deletes the trainer. Returns whether one existed.
    async fn remove(&self, id: TrainerId) -> Result<bool>;
    /// All trainers ordered by id.
    async fn all(&self) -> Result<Vec<Trainer>>;
}

#[async_trait]
pub trait OfferingStore: Send + Sync {
    /// Stores a new offering under a fresh id.
    async fn insert(&self, offering: NewOffering) -> Result<ClassOffering>;
    /// Retrieves an offering, with its tier, by id.
    async fn get(&self, id: OfferingId) -> Result<Option<ClassOffering>>;
    /// Offerings taught by the trainer, ordered by id.
    async fn by_trainer(&self, trainer_id: TrainerId) -> Result<Vec<ClassOffering>>;
    /// Clears the trainer of every offering they teach. Returns how many changed.
    async fn detach_trainer(&self, trainer_id: TrainerId) -> Result<usize>;
    /// Fails with `ConflictError` on a duplicate (offering, day, start time).
    async fn add_slot(&self, slot: NewSlot) -> Result<ScheduleSlot>;
    /// Retrieves a schedule slot by id.
    async fn slot(&self, id: SlotId) -> Result<Option<ScheduleSlot>>;
    /// Slots of one offering ordered by day, then start time.
    async fn slots_of(&self, offering_id: OfferingId) -> Result<Vec<ScheduleSlot>>;
    /// Attaches the offering's only tier. Fails with `ConflictError` if one exists.
    async fn set_pricing(&self, offering_id: OfferingId, tier: PricingTier) -> Result<()>;
    /// Overwrites the offering's tier, whether or not one exists.
    async fn replace_pricing(&self, offering_id: OfferingId, tier: PricingTier) -> Result<()>;
}

#[async_trait]
pub trait AttendanceStore: Send + Sync {
    /// Inserts or overwrites the record for `(offering_id, recording_date)`.
    ///
    /// The existence check and the write happen under one lock, so two
    /// concurrent reports for the same key never produce two records.
    async fn upsert(
        &self,
        offering_id: OfferingId,
        recording_date: NaiveDate,
        attend_count: u32,
        now: DateTime<Utc>,
    ) -> Result<AttendanceRecord>;
    /// Retrieves the record of one session, if it was reported.
    async fn get(
        &self,
        offering_id: OfferingId,
        recording_date: NaiveDate,
    ) -> Result<Option<AttendanceRecord>>;
    /// Records of one offering with `start <= recording_date <= end`, ordered by date.
    async fn in_range(
        &self,
        offering_id: OfferingId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<AttendanceRecord>>;
}

/// Source of the current time.
pub trait Clock: Send + Sync {
    /// The current instant, used to stamp records.
    fn now(&self) -> DateTime<Utc>;
    /// The local calendar date.
    fn today(&self) -> NaiveDate;
}

pub type TrainerStoreRef = Arc<dyn TrainerStore>;
pub type OfferingStoreRef = Arc<dyn OfferingStore>;
pub type AttendanceStoreRef = Arc<dyn AttendanceStore>;
pub type ClockRef = Arc<dyn Clock>;

/// The store handles shared by the application services.
#[derive(Clone)]
pub struct Storage {
    pub trainers: TrainerStoreRef,
    pub offerings: OfferingStoreRef,
    pub attendance: AttendanceStoreRef,
}
