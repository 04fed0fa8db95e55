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
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, Direction, IteratorMode, Options, WriteBatch};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Column Family for trainers, keyed by id.
pub const CF_TRAINERS: &str = "trainers";
/// Column Family for class offerings (with their pricing tier), keyed by id.
pub const CF_OFFERINGS: &str = "offerings";
/// Column Family for schedule slots, keyed by id.
pub const CF_SLOTS: &str = "slots";
/// Column Family for attendance, keyed by offering id followed by the ISO date.
pub const CF_ATTENDANCE: &str = "attendance";
/// Column Family for id counters.
pub const CF_META: &str = "meta";

const TRAINER_SEQ: &str = "trainer_seq";
const OFFERING_SEQ: &str = "offering_seq";
const SLOT_SEQ: &str = "slot_seq";

/// A persistent store implementation using RocksDB.
///
/// Each entity lives in its own Column Family as JSON. Writes that depend on a
/// prior read go through `write_lock` and land in one `WriteBatch`, so
/// uniqueness checks, id allocation and attendance upserts are atomic within
/// the process.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
    write_lock: Arc<Mutex<()>>,
}

impl Storage {
    /// All stores backed by one RocksDB instance at `path`.
    pub fn rocksdb<P: AsRef<Path>>(path: P) -> Result<Self> {
        let store = RocksDBStore::open(path)?;
        Ok(Self {
            trainers: Arc::new(store.clone()),
            offerings: Arc::new(store.clone()),
            attendance: Arc::new(store),
        })
    }
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at the specified path, creating
    /// any missing column families.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cfs = [CF_TRAINERS, CF_OFFERINGS, CF_SLOTS, CF_ATTENDANCE, CF_META]
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()));

        let db = DB::open_cf_descriptors(&opts, path, cfs)?;

        Ok(Self {
            db: Arc::new(db),
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    fn cf(&self, name: &str) -> Result<&ColumnFamily> {
        self.db.cf_handle(name).ok_or_else(|| {
            PayrollError::InternalError(Box::new(std::io::Error::other(format!(
                "{name} column family not found"
            ))))
        })
    }

    fn get_json<T: DeserializeOwned>(&self, cf: &str, key: &[u8]) -> Result<Option<T>> {
        match self.db.get_cf(self.cf(cf)?, key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn put_json<T: Serialize>(
        &self,
        batch: &mut WriteBatch,
        cf: &str,
        key: &[u8],
        value: &T,
    ) -> Result<()> {
        batch.put_cf(self.cf(cf)?, key, serde_json::to_vec(value)?);
        Ok(())
    }

    fn scan_json<T: DeserializeOwned>(&self, cf: &str) -> Result<Vec<T>> {
        let mut rows = Vec::new();
        for item in self.db.iterator_cf(self.cf(cf)?, IteratorMode::Start) {
            let (_key, value) = item?;
            rows.push(serde_json::from_slice(&value)?);
        }
        Ok(rows)
    }

    /// Allocates the next id of `seq`, staging the new counter in `batch`.
    fn next_id(&self, batch: &mut WriteBatch, seq: &str) -> Result<u32> {
        let last: u32 = self.get_json(CF_META, seq.as_bytes())?.unwrap_or(0);
        let next = last + 1;
        self.put_json(batch, CF_META, seq.as_bytes(), &next)?;
        Ok(next)
    }

    fn write(&self, batch: WriteBatch) -> Result<()> {
        self.db.write(batch)?;
        Ok(())
    }

    fn update_offering<F>(&self, id: OfferingId, apply: F) -> Result<()>
    where
        F: FnOnce(&mut ClassOffering) -> Result<()>,
    {
        let mut offering: ClassOffering = self
            .get_json(CF_OFFERINGS, &id.to_be_bytes())?
            .ok_or_else(|| PayrollError::not_found("offering", id))?;
        apply(&mut offering)?;
        let mut batch = WriteBatch::default();
        self.put_json(&mut batch, CF_OFFERINGS, &id.to_be_bytes(), &offering)?;
        self.write(batch)
    }
}

fn attendance_key(offering_id: OfferingId, date: NaiveDate) -> Vec<u8> {
    let mut key = offering_id.to_be_bytes().to_vec();
    key.extend_from_slice(date.format("%Y-%m-%d").to_string().as_bytes());
    key
}

#[async_trait]
impl TrainerStore for RocksDBStore {
    async fn insert(&self, trainer: NewTrainer) -> Result<Trainer> {
        let _guard = self.write_lock.lock().await;
        if self.find_by_phone(&trainer.phone_number).await?.is_some() {
            return Err(PayrollError::conflict(format!(
                "phone number {} is already registered",
                trainer.phone_number
            )));
        }
        let mut batch = WriteBatch::default();
        let trainer = trainer.into_trainer(self.next_id(&mut batch, TRAINER_SEQ)?);
        self.put_json(&mut batch, CF_TRAINERS, &trainer.id.to_be_bytes(), &trainer)?;
        self.write(batch)?;
        Ok(trainer)
    }

    async fn get(&self, id: TrainerId) -> Result<Option<Trainer>> {
        self.get_json(CF_TRAINERS, &id.to_be_bytes())
    }

    async fn find_by_phone(&self, phone_number: &str) -> Result<Option<Trainer>> {
        Ok(self
            .scan_json::<Trainer>(CF_TRAINERS)?
            .into_iter()
            .find(|t| t.phone_number == phone_number))
    }

    async fn find_by_chat_id(&self, chat_id: &str) -> Result<Option<Trainer>> {
        Ok(self
            .scan_json::<Trainer>(CF_TRAINERS)?
            .into_iter()
            .find(|t| t.chat_id.as_deref() == Some(chat_id)))
    }

    async fn bind_chat_id(&self, id: TrainerId, chat_id: &str) -> Result<LinkOutcome> {
        let _guard = self.write_lock.lock().await;
        if let Some(owner) = self.find_by_chat_id(chat_id).await?
            && owner.id != id
        {
            return Err(PayrollError::conflict(format!(
                "chat identity {chat_id} is bound to another trainer"
            )));
        }
        let mut trainer: Trainer = self
            .get_json(CF_TRAINERS, &id.to_be_bytes())?
            .ok_or_else(|| PayrollError::not_found("trainer", id))?;
        match trainer.chat_id.as_deref() {
            Some(existing) if existing == chat_id => Ok(LinkOutcome::AlreadyLinked),
            Some(_) => Err(PayrollError::conflict(format!(
                "trainer {id} is already bound to another chat identity"
            ))),
            None => {
                trainer.chat_id = Some(chat_id.to_string());
                let mut batch = WriteBatch::default();
                self.put_json(&mut batch, CF_TRAINERS, &id.to_be_bytes(), &trainer)?;
                self.write(batch)?;
                Ok(LinkOutcome::Linked)
            }
        }
    }

    async fn remove(&self, id: TrainerId) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        let existed = TrainerStore::get(self, id).await?.is_some();
        if existed {
            self.db.delete_cf(self.cf(CF_TRAINERS)?, id.to_be_bytes())?;
        }
        Ok(existed)
    }

    async fn all(&self) -> Result<Vec<Trainer>> {
        self.scan_json(CF_TRAINERS)
    }
}

#[async_trait]
impl OfferingStore for RocksDBStore {
    async fn insert(&self, offering: NewOffering) -> Result<ClassOffering> {
        let _guard = self.write_lock.lock().await;
        let mut batch = WriteBatch::default();
        let offering = offering.into_offering(self.next_id(&mut batch, OFFERING_SEQ)?);
        self.put_json(&mut batch, CF_OFFERINGS, &offering.id.to_be_bytes(), &offering)?;
        self.write(batch)?;
        Ok(offering)
    }

    async fn get(&self, id: OfferingId) -> Result<Option<ClassOffering>> {
        self.get_json(CF_OFFERINGS, &id.to_be_bytes())
    }

    async fn by_trainer(&self, trainer_id: TrainerId) -> Result<Vec<ClassOffering>> {
        Ok(self
            .scan_json::<ClassOffering>(CF_OFFERINGS)?
            .into_iter()
            .filter(|o| o.trainer_id == Some(trainer_id))
            .collect())
    }

    async fn detach_trainer(&self, trainer_id: TrainerId) -> Result<usize> {
        let _guard = self.write_lock.lock().await;
        let offerings = self.by_trainer(trainer_id).await?;
        let mut batch = WriteBatch::default();
        let mut detached = 0;
        for mut offering in offerings {
            offering.trainer_id = None;
            self.put_json(&mut batch, CF_OFFERINGS, &offering.id.to_be_bytes(), &offering)?;
            detached += 1;
        }
        self.write(batch)?;
        Ok(detached)
    }

    async fn add_slot(&self, slot: NewSlot) -> Result<ScheduleSlot> {
        let _guard = self.write_lock.lock().await;
        if OfferingStore::get(self, slot.offering_id).await?.is_none() {
            return Err(PayrollError::not_found("offering", slot.offering_id));
        }
        if self
            .scan_json::<ScheduleSlot>(CF_SLOTS)?
            .iter()
            .any(|s| s.same_key(&slot))
        {
            return Err(PayrollError::conflict(format!(
                "offering {} already has a slot on {} at {}",
                slot.offering_id, slot.day_of_week, slot.start_time
            )));
        }
        let mut batch = WriteBatch::default();
        let slot = slot.into_slot(self.next_id(&mut batch, SLOT_SEQ)?);
        self.put_json(&mut batch, CF_SLOTS, &slot.id.to_be_bytes(), &slot)?;
        self.write(batch)?;
        Ok(slot)
    }

    async fn slot(&self, id: SlotId) -> Result<Option<ScheduleSlot>> {
        self.get_json(CF_SLOTS, &id.to_be_bytes())
    }

    async fn slots_of(&self, offering_id: OfferingId) -> Result<Vec<ScheduleSlot>> {
        let mut slots: Vec<ScheduleSlot> = self
            .scan_json::<ScheduleSlot>(CF_SLOTS)?
            .into_iter()
            .filter(|s| s.offering_id == offering_id)
            .collect();
        slots.sort_by_key(|s| (s.day_of_week, s.start_time));
        Ok(slots)
    }

    async fn set_pricing(&self, offering_id: OfferingId, tier: PricingTier) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.update_offering(offering_id, |offering| {
            if offering.pricing.is_some() {
                return Err(PayrollError::conflict(format!(
                    "offering {offering_id} already has a pricing tier"
                )));
            }
            offering.pricing = Some(tier);
            Ok(())
        })
    }

    async fn replace_pricing(&self, offering_id: OfferingId, tier: PricingTier) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.update_offering(offering_id, |offering| {
            offering.pricing = Some(tier);
            Ok(())
        })
    }
}

#[async_trait]
impl AttendanceStore for RocksDBStore {
    async fn upsert(
        &self,
        offering_id: OfferingId,
        recording_date: NaiveDate,
        attend_count: u32,
        now: DateTime<Utc>,
    ) -> Result<AttendanceRecord> {
        let _guard = self.write_lock.lock().await;
        let key = attendance_key(offering_id, recording_date);
        let record = match self.get_json::<AttendanceRecord>(CF_ATTENDANCE, &key)? {
            Some(mut record) => {
                record.update(attend_count, now);
                record
            }
            None => AttendanceRecord::new(offering_id, recording_date, attend_count, now),
        };
        let mut batch = WriteBatch::default();
        self.put_json(&mut batch, CF_ATTENDANCE, &key, &record)?;
        self.write(batch)?;
        Ok(record)
    }

    async fn get(
        &self,
        offering_id: OfferingId,
        recording_date: NaiveDate,
    ) -> Result<Option<AttendanceRecord>> {
        self.get_json(CF_ATTENDANCE, &attendance_key(offering_id, recording_date))
    }

    async fn in_range(
        &self,
        offering_id: OfferingId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<AttendanceRecord>> {
        let from = attendance_key(offering_id, start);
        let to = attendance_key(offering_id, end);
        let mut records = Vec::new();
        let iter = self.db.iterator_cf(
            self.cf(CF_ATTENDANCE)?,
            IteratorMode::From(&from, Direction::Forward),
        );
        for item in iter {
            let (key, value) = item?;
            if key.as_ref() > to.as_slice() {
                break;
            }
            records.push(serde_json::from_slice(&value)?);
        }
        Ok(records)
    }
}
