use crate::domain::ports::{ClockRef, Storage};
use crate::error::{PayrollError, Result};
use crate::infrastructure::clock::{FixedClock, SystemClock};
use chrono::{FixedOffset, NaiveDate};
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;

/// Process-wide settings, from flags or the environment.
#[derive(Debug, Clone, Args)]
pub struct Settings {
    /// JSON roster of trainers, offerings and attendance to import at start-up
    #[arg(long, env = "PAYROLL_ROSTER", global = true)]
    pub roster: Option<PathBuf>,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long, env = "PAYROLL_DB_PATH", global = true)]
    pub db_path: Option<PathBuf>,

    /// Local time zone as whole hours east of UTC
    #[arg(
        long,
        env = "PAYROLL_UTC_OFFSET",
        default_value_t = 0,
        allow_negative_numbers = true,
        global = true
    )]
    pub utc_offset: i32,

    /// Pin "today" to a date instead of reading the system clock
    #[arg(long, env = "PAYROLL_TODAY", global = true)]
    pub today: Option<NaiveDate>,

    /// Currency label used in chat replies
    #[arg(long, env = "PAYROLL_CURRENCY", default_value = "som", global = true)]
    pub currency: String,
}

impl Settings {
    pub fn offset(&self) -> Result<FixedOffset> {
        if !(-12..=14).contains(&self.utc_offset) {
            return Err(PayrollError::validation(format!(
                "UTC offset {} is outside -12..=14",
                self.utc_offset
            )));
        }
        FixedOffset::east_opt(self.utc_offset * 3600)
            .ok_or_else(|| PayrollError::validation("invalid UTC offset"))
    }

    pub fn clock(&self) -> Result<ClockRef> {
        let clock: ClockRef = match self.today {
            Some(today) => Arc::new(FixedClock::on(today)),
            None => Arc::new(SystemClock::new(self.offset()?)),
        };
        Ok(clock)
    }

    /// RocksDB when a database path is configured, in-memory otherwise.
    pub fn open_storage(&self) -> Result<Storage> {
        match &self.db_path {
            #[cfg(feature = "storage-rocksdb")]
            Some(path) => Storage::rocksdb(path),
            #[cfg(not(feature = "storage-rocksdb"))]
            Some(_) => Err(PayrollError::validation(
                "--db-path needs a build with the storage-rocksdb feature",
            )),
            None => Ok(Storage::in_memory()),
        }
    }
}
