use crate::domain::attendance::AttendanceRecord;
use crate::domain::offering::{
    ClassOffering, NewOffering, NewSlot, OfferingId, ScheduleSlot, SlotId,
};
use crate::domain::ports::{AttendanceStore, LinkOutcome, OfferingStore, Storage, TrainerStore};
use crate::domain::pricing::PricingTier;
use crate::domain::trainer::{NewTrainer, Trainer, TrainerId};
use crate::error::{PayrollError, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

impl Storage {
    /// Fresh, empty in-memory stores.
    pub fn in_memory() -> Self {
        Self {
            trainers: Arc::new(InMemoryTrainerStore::new()),
            offerings: Arc::new(InMemoryOfferingStore::new()),
            attendance: Arc::new(InMemoryAttendanceStore::new()),
        }
    }
}

#[derive(Default)]
struct TrainerTable {
    last_id: TrainerId,
    rows: BTreeMap<TrainerId, Trainer>,
}

/// A thread-safe in-memory store for trainers.
///
/// Every check-then-write runs under a single write lock, which is what makes
/// the uniqueness constraints hold under concurrent callers.
#[derive(Default, Clone)]
pub struct InMemoryTrainerStore {
    table: Arc<RwLock<TrainerTable>>,
}

impl InMemoryTrainerStore {
    /// Creates a new, empty in-memory trainer store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TrainerStore for InMemoryTrainerStore {
    async fn insert(&self, trainer: NewTrainer) -> Result<Trainer> {
        let mut table = self.table.write().await;
        if table
            .rows
            .values()
            .any(|t| t.phone_number == trainer.phone_number)
        {
            return Err(PayrollError::conflict(format!(
                "phone number {} is already registered",
                trainer.phone_number
            )));
        }
        table.last_id += 1;
        let trainer = trainer.into_trainer(table.last_id);
        table.rows.insert(trainer.id, trainer.clone());
        Ok(trainer)
    }

    async fn get(&self, id: TrainerId) -> Result<Option<Trainer>> {
        let table = self.table.read().await;
        Ok(table.rows.get(&id).cloned())
    }

    async fn find_by_phone(&self, phone_number: &str) -> Result<Option<Trainer>> {
        let table = self.table.read().await;
        Ok(table
            .rows
            .values()
            .find(|t| t.phone_number == phone_number)
            .cloned())
    }

    async fn find_by_chat_id(&self, chat_id: &str) -> Result<Option<Trainer>> {
        let table = self.table.read().await;
        Ok(table
            .rows
            .values()
            .find(|t| t.chat_id.as_deref() == Some(chat_id))
            .cloned())
    }

    async fn bind_chat_id(&self, id: TrainerId, chat_id: &str) -> Result<LinkOutcome> {
        let mut table = self.table.write().await;
        if let Some(owner) = table
            .rows
            .values()
            .find(|t| t.chat_id.as_deref() == Some(chat_id))
            && owner.id != id
        {
            return Err(PayrollError::conflict(format!(
                "chat identity {chat_id} is bound to another trainer"
            )));
        }
        let trainer = table
            .rows
            .get_mut(&id)
            .ok_or_else(|| PayrollError::not_found("trainer", id))?;
        match trainer.chat_id.as_deref() {
            Some(existing) if existing == chat_id => Ok(LinkOutcome::AlreadyLinked),
            Some(_) => Err(PayrollError::conflict(format!(
                "trainer {id} is already bound to another chat identity"
            ))),
            None => {
                trainer.chat_id = Some(chat_id.to_string());
                Ok(LinkOutcome::Linked)
            }
        }
    }

    async fn remove(&self, id: TrainerId) -> Result<bool> {
        let mut table = self.table.write().await;
        Ok(table.rows.remove(&id).is_some())
    }

    async fn all(&self) -> Result<Vec<Trainer>> {
        let table = self.table.read().await;
        Ok(table.rows.values().cloned().collect())
    }
}

#[derive(Default)]
struct OfferingTables {
    last_offering_id: OfferingId,
    last_slot_id: SlotId,
    offerings: BTreeMap<OfferingId, ClassOffering>,
    slots: BTreeMap<SlotId, ScheduleSlot>,
}

impl OfferingTables {
    fn offering_mut(&mut self, id: OfferingId) -> Result<&mut ClassOffering> {
        self.offerings
            .get_mut(&id)
            .ok_or_else(|| PayrollError::not_found("offering", id))
    }
}

/// A thread-safe in-memory store for offerings, their slots and pricing.
#[derive(Default, Clone)]
pub struct InMemoryOfferingStore {
    tables: Arc<RwLock<OfferingTables>>,
}

impl InMemoryOfferingStore {
    /// Creates a new, empty in-memory offering store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OfferingStore for InMemoryOfferingStore {
    async fn insert(&self, offering: NewOffering) -> Result<ClassOffering> {
        let mut tables = self.tables.write().await;
        tables.last_offering_id += 1;
        let offering = offering.into_offering(tables.last_offering_id);
        tables.offerings.insert(offering.id, offering.clone());
        Ok(offering)
    }

    async fn get(&self, id: OfferingId) -> Result<Option<ClassOffering>> {
        let tables = self.tables.read().await;
        Ok(tables.offerings.get(&id).cloned())
    }

    async fn by_trainer(&self, trainer_id: TrainerId) -> Result<Vec<ClassOffering>> {
        let tables = self.tables.read().await;
        Ok(tables
            .offerings
            .values()
            .filter(|o| o.trainer_id == Some(trainer_id))
            .cloned()
            .collect())
    }

    async fn detach_trainer(&self, trainer_id: TrainerId) -> Result<usize> {
        let mut tables = self.tables.write().await;
        let mut detached = 0;
        for offering in tables.offerings.values_mut() {
            if offering.trainer_id == Some(trainer_id) {
                offering.trainer_id = None;
                detached += 1;
            }
        }
        Ok(detached)
    }

    async fn add_slot(&self, slot: NewSlot) -> Result<ScheduleSlot> {
        let mut tables = self.tables.write().await;
        tables.offering_mut(slot.offering_id)?;
        if tables.slots.values().any(|s| s.same_key(&slot)) {
            return Err(PayrollError::conflict(format!(
                "offering {} already has a slot on {} at {}",
                slot.offering_id, slot.day_of_week, slot.start_time
            )));
        }
        tables.last_slot_id += 1;
        let slot = slot.into_slot(tables.last_slot_id);
        tables.slots.insert(slot.id, slot.clone());
        Ok(slot)
    }

    async fn slot(&self, id: SlotId) -> Result<Option<ScheduleSlot>> {
        let tables = self.tables.read().await;
        Ok(tables.slots.get(&id).cloned())
    }

    async fn slots_of(&self, offering_id: OfferingId) -> Result<Vec<ScheduleSlot>> {
        let tables = self.tables.read().await;
        let mut slots: Vec<ScheduleSlot> = tables
            .slots
            .values()
            .filter(|s| s.offering_id == offering_id)
            .cloned()
            .collect();
        slots.sort_by_key(|s| (s.day_of_week, s.start_time));
        Ok(slots)
    }

    async fn set_pricing(&self, offering_id: OfferingId, tier: PricingTier) -> Result<()> {
        let mut tables = self.tables.write().await;
        let offering = tables.offering_mut(offering_id)?;
        if offering.pricing.is_some() {
            return Err(PayrollError::conflict(format!(
                "offering {offering_id} already has a pricing tier"
            )));
        }
        offering.pricing = Some(tier);
        Ok(())
    }

    async fn replace_pricing(&self, offering_id: OfferingId, tier: PricingTier) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.offering_mut(offering_id)?.pricing = Some(tier);
        Ok(())
    }
}

/// A thread-safe in-memory store for attendance records.
///
/// Keyed by `(offering, date)` so a period query is a single range scan.
#[derive(Default, Clone)]
pub struct InMemoryAttendanceStore {
    records: Arc<RwLock<BTreeMap<(OfferingId, NaiveDate), AttendanceRecord>>>,
}

impl InMemoryAttendanceStore {
    /// Creates a new, empty in-memory attendance store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AttendanceStore for InMemoryAttendanceStore {
    async fn upsert(
        &self,
        offering_id: OfferingId,
        recording_date: NaiveDate,
        attend_count: u32,
        now: DateTime<Utc>,
    ) -> Result<AttendanceRecord> {
        let mut records = self.records.write().await;
        let record = records
            .entry((offering_id, recording_date))
            .and_modify(|r| r.update(attend_count, now))
            .or_insert_with(|| AttendanceRecord::new(offering_id, recording_date, attend_count, now));
        Ok(record.clone())
    }

    async fn get(
        &self,
        offering_id: OfferingId,
        recording_date: NaiveDate,
    ) -> Result<Option<AttendanceRecord>> {
        let records = self.records.read().await;
        Ok(records.get(&(offering_id, recording_date)).cloned())
    }

    async fn in_range(
        &self,
        offering_id: OfferingId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<AttendanceRecord>> {
        if end < start {
            return Ok(Vec::new());
        }
        let records = self.records.read().await;
        Ok(records
            .range((offering_id, start)..=(offering_id, end))
            .map(|(_, r)| r.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::offering::DayOfWeek;
    use chrono::{Duration, NaiveTime};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn time(h: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_trainer_phone_is_unique() {
        let store = InMemoryTrainerStore::new();
        let first = store
            .insert(NewTrainer::new("Aida", "Bekova", "996700000001").unwrap())
            .await
            .unwrap();
        assert_eq!(first.id, 1);

        let duplicate = store
            .insert(NewTrainer::new("Other", "Person", "+996700000001").unwrap())
            .await;
        assert!(matches!(duplicate, Err(PayrollError::ConflictError(_))));

        let found = store.find_by_phone("996700000001").await.unwrap().unwrap();
        assert_eq!(found, first);
        assert_eq!(store.all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_bind_chat_id_once() {
        let store = InMemoryTrainerStore::new();
        let aida = store
            .insert(NewTrainer::new("Aida", "Bekova", "996700000001").unwrap())
            .await
            .unwrap();
        let timur = store
            .insert(NewTrainer::new("Timur", "Asanov", "996700000002").unwrap())
            .await
            .unwrap();

        assert_eq!(
            store.bind_chat_id(aida.id, "100").await.unwrap(),
            LinkOutcome::Linked
        );
        assert_eq!(
            store.bind_chat_id(aida.id, "100").await.unwrap(),
            LinkOutcome::AlreadyLinked
        );
        assert!(matches!(
            store.bind_chat_id(aida.id, "200").await,
            Err(PayrollError::ConflictError(_))
        ));
        assert!(matches!(
            store.bind_chat_id(timur.id, "100").await,
            Err(PayrollError::ConflictError(_))
        ));
        assert!(matches!(
            store.bind_chat_id(99, "300").await,
            Err(PayrollError::NotFound { .. })
        ));

        let found = store.find_by_chat_id("100").await.unwrap().unwrap();
        assert_eq!(found.id, aida.id);
    }

    #[tokio::test]
    async fn test_slots_unique_and_ordered() {
        let store = InMemoryOfferingStore::new();
        let offering = store
            .insert(NewOffering::new("Yoga", Some(1), date(2024, 1, 1), date(2024, 12, 31)).unwrap())
            .await
            .unwrap();

        store
            .add_slot(NewSlot::new(offering.id, DayOfWeek::Wed, time(18), time(19)).unwrap())
            .await
            .unwrap();
        store
            .add_slot(NewSlot::new(offering.id, DayOfWeek::Mon, time(19), time(20)).unwrap())
            .await
            .unwrap();
        store
            .add_slot(NewSlot::new(offering.id, DayOfWeek::Mon, time(8), time(9)).unwrap())
            .await
            .unwrap();

        let duplicate = store
            .add_slot(NewSlot::new(offering.id, DayOfWeek::Mon, time(8), time(10)).unwrap())
            .await;
        assert!(matches!(duplicate, Err(PayrollError::ConflictError(_))));

        let missing = store
            .add_slot(NewSlot::new(42, DayOfWeek::Mon, time(8), time(10)).unwrap())
            .await;
        assert!(matches!(missing, Err(PayrollError::NotFound { .. })));

        let slots = store.slots_of(offering.id).await.unwrap();
        let keys: Vec<_> = slots.iter().map(|s| (s.day_of_week, s.start_time)).collect();
        assert_eq!(
            keys,
            vec![
                (DayOfWeek::Mon, time(8)),
                (DayOfWeek::Mon, time(19)),
                (DayOfWeek::Wed, time(18)),
            ]
        );
    }

    #[tokio::test]
    async fn test_single_pricing_tier() {
        let store = InMemoryOfferingStore::new();
        let offering = store
            .insert(NewOffering::new("Yoga", Some(1), date(2024, 1, 1), date(2024, 12, 31)).unwrap())
            .await
            .unwrap();

        let tier = PricingTier::new(5, 100, 6, 120);
        store.set_pricing(offering.id, tier).await.unwrap();
        assert!(matches!(
            store.set_pricing(offering.id, tier).await,
            Err(PayrollError::ConflictError(_))
        ));

        let cheaper = PricingTier::new(5, 80, 6, 100);
        store.replace_pricing(offering.id, cheaper).await.unwrap();
        let stored = store.get(offering.id).await.unwrap().unwrap();
        assert_eq!(stored.pricing, Some(cheaper));
    }

    #[tokio::test]
    async fn test_detach_trainer() {
        let store = InMemoryOfferingStore::new();
        for name in ["Yoga", "Pilates"] {
            store
                .insert(NewOffering::new(name, Some(1), date(2024, 1, 1), date(2024, 12, 31)).unwrap())
                .await
                .unwrap();
        }
        store
            .insert(NewOffering::new("Boxing", Some(2), date(2024, 1, 1), date(2024, 12, 31)).unwrap())
            .await
            .unwrap();

        assert_eq!(store.detach_trainer(1).await.unwrap(), 2);
        assert!(store.by_trainer(1).await.unwrap().is_empty());
        assert_eq!(store.by_trainer(2).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_attendance_upsert_and_range() {
        let store = InMemoryAttendanceStore::new();
        let t0 = Utc::now();
        let t1 = t0 + Duration::minutes(5);

        store.upsert(1, date(2024, 5, 6), 4, t0).await.unwrap();
        let updated = store.upsert(1, date(2024, 5, 6), 7, t1).await.unwrap();
        assert_eq!(updated.attend_count, 7);
        assert_eq!(updated.created_date, t0);
        assert_eq!(updated.update_date, t1);
        assert_eq!(
            store.get(1, date(2024, 5, 6)).await.unwrap(),
            Some(updated.clone())
        );
        assert!(store.get(1, date(2024, 5, 7)).await.unwrap().is_none());

        store.upsert(1, date(2024, 5, 31), 3, t0).await.unwrap();
        store.upsert(1, date(2024, 6, 1), 3, t0).await.unwrap();
        store.upsert(2, date(2024, 5, 10), 3, t0).await.unwrap();

        let may = store
            .in_range(1, date(2024, 5, 1), date(2024, 5, 31))
            .await
            .unwrap();
        let dates: Vec<_> = may.iter().map(|r| r.recording_date).collect();
        assert_eq!(dates, vec![date(2024, 5, 6), date(2024, 5, 31)]);

        assert!(store
            .in_range(1, date(2024, 5, 31), date(2024, 5, 1))
            .await
            .unwrap()
            .is_empty());
    }
}
