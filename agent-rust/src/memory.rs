use crate::storage::{Storage, StorageError, WEEKLY_LOG_FILE};
use chrono::{Datelike, Days, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// Items worn on one calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklyLogEntry {
    pub date: NaiveDate,
    #[serde(rename = "outfitIds")]
    pub worn_item_ids: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredLog {
    week_key: NaiveDate,
    logs: Vec<WeeklyLogEntry>,
}

#[derive(Debug, Error)]
pub enum MemoryError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("Weekly log serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Clock = Arc<dyn Fn() -> NaiveDate + Send + Sync>;

/// Monday on or before `date`.
#[must_use]
pub fn week_key(date: NaiveDate) -> NaiveDate {
    let offset = u64::from(date.weekday().num_days_from_monday());
    date.checked_sub_days(Days::new(offset)).unwrap_or(date)
}

/// Record of worn items for the current week, backed by `weekly-log.json`.
///
/// The read-modify-write in [`WeeklyMemory::append`] is not serialized; two
/// concurrent appends race and the last writer wins.
pub struct WeeklyMemory {
    storage: Arc<dyn Storage>,
    clock: Clock,
}

impl WeeklyMemory {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self::with_clock(storage, Arc::new(|| Local::now().date_naive()))
    }

    pub fn with_clock(storage: Arc<dyn Storage>, clock: Clock) -> Self {
        Self { storage, clock }
    }

    /// Local calendar day according to the clock.
    #[must_use]
    pub fn today(&self) -> NaiveDate {
        (self.clock)()
    }

    #[must_use]
    pub fn week_key(&self) -> NaiveDate {
        week_key(self.today())
    }

    /// Entries for the current week. A log from an earlier week reads as empty
    /// but is left in storage until the next reset or append.
    pub async fn get(&self) -> Vec<WeeklyLogEntry> {
        match self.load().await {
            Some(stored) if stored.week_key == self.week_key() => stored.logs,
            _ => Vec::new(),
        }
    }

    /// Union `item_ids` into the entry for `date`, creating it if needed.
    pub async fn append(&self, date: NaiveDate, item_ids: &[String]) -> Result<(), MemoryError> {
        let week_key = self.week_key();
        let mut logs = match self.load().await {
            Some(stored) if stored.week_key == week_key => stored.logs,
            _ => Vec::new(),
        };

        if let Some(entry) = logs.iter_mut().find(|entry| entry.date == date) {
            for id in item_ids {
                if !entry.worn_item_ids.contains(id) {
                    entry.worn_item_ids.push(id.clone());
                }
            }
        } else {
            let mut worn_item_ids: Vec<String> = Vec::with_capacity(item_ids.len());
            for id in item_ids {
                if !worn_item_ids.contains(id) {
                    worn_item_ids.push(id.clone());
                }
            }
            logs.push(WeeklyLogEntry {
                date,
                worn_item_ids,
            });
        }
        logs.sort_by_key(|entry| entry.date);

        self.save(&StoredLog { week_key, logs }).await
    }

    /// Replace a log left over from an earlier week with an empty one.
    /// Returns whether a reset happened.
    pub async fn reset_if_new_week(&self) -> Result<bool, MemoryError> {
        let week_key = self.week_key();
        match self.load().await {
            Some(stored) if stored.week_key != week_key => {
                self.save(&StoredLog {
                    week_key,
                    logs: Vec::new(),
                })
                .await?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn load(&self) -> Option<StoredLog> {
        let bytes = match self.storage.read(WEEKLY_LOG_FILE).await {
            Ok(bytes) => bytes,
            Err(StorageError::NotFound(_)) => return None,
            Err(error) => {
                tracing::warn!(%error, "failed to read weekly log");
                return None;
            }
        };
        match serde_json::from_slice(&bytes) {
            Ok(stored) => Some(stored),
            Err(error) => {
                tracing::warn!(%error, "malformed weekly log, treating as empty");
                None
            }
        }
    }

    async fn save(&self, stored: &StoredLog) -> Result<(), MemoryError> {
        let bytes = serde_json::to_vec_pretty(stored)?;
        self.storage.write(WEEKLY_LOG_FILE, &bytes).await?;
        Ok(())
    }
}
