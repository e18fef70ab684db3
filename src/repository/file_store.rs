//! Flat-file record store.
//!
//! Every collection lives in `<data_dir>/<collection>.json` as a JSON array of
//! objects. Each record always carries `id`, `createdAt` and `updatedAt`.
//!
//! Every write is a full read-modify-write of the collection file. In the
//! default [`WriteMode::LastWriterWins`] mode two concurrent writers to the same
//! collection can race and the earlier write is silently lost.
//! [`WriteMode::Serialized`] takes a per-collection async mutex around every
//! write cycle and closes that window for writers inside this process.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use rand::Rng;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};
use tokio::sync::OwnedMutexGuard;
use tracing::{debug, error, info, instrument, warn};

use crate::repository::repository_error::{RepositoryError, RepositoryResult};

/// A single stored record: field name to JSON value.
pub type Record = Map<String, Value>;

pub const ID_FIELD: &str = "id";
pub const CREATED_AT_FIELD: &str = "createdAt";
pub const UPDATED_AT_FIELD: &str = "updatedAt";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteMode {
    #[default]
    LastWriterWins,
    Serialized,
}

impl FromStr for WriteMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "last-writer-wins" | "lww" | "unlocked" => Ok(WriteMode::LastWriterWins),
            "serialized" | "locked" => Ok(WriteMode::Serialized),
            other => Err(format!(
                "unknown store write mode '{}', expected last-writer-wins or serialized",
                other
            )),
        }
    }
}

pub struct FileStore {
    data_dir: PathBuf,
    write_mode: WriteMode,
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl FileStore {
    pub fn new(data_dir: impl Into<PathBuf>, write_mode: WriteMode) -> Self {
        FileStore {
            data_dir: data_dir.into(),
            write_mode,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn write_mode(&self) -> WriteMode {
        self.write_mode
    }

    /// Create the data directory and an empty file for each missing collection.
    #[instrument(skip(self), fields(data_dir = %self.data_dir.display()))]
    pub async fn init(&self, collections: &[&str]) -> RepositoryResult<()> {
        tokio::fs::create_dir_all(&self.data_dir).await?;
        for collection in collections {
            let path = self.collection_path(collection);
            if tokio::fs::try_exists(&path).await? {
                continue;
            }
            self.write_collection(collection, &[]).await?;
            info!("Created empty collection file {}", path.display());
        }
        Ok(())
    }

    pub fn collection_path(&self, collection: &str) -> PathBuf {
        self.data_dir.join(format!("{}.json", collection))
    }

    /// All records of a collection. A missing or unreadable file reads as empty.
    pub async fn list_all(&self, collection: &str) -> Vec<Record> {
        self.read_collection(collection).await
    }

    /// Like [`FileStore::list_all`], but an unreadable or corrupt file is an error.
    pub async fn try_list_all(&self, collection: &str) -> RepositoryResult<Vec<Record>> {
        self.try_read_collection(collection).await
    }

    pub async fn get_by_id(&self, collection: &str, id: &str) -> Option<Record> {
        self.read_collection(collection)
            .await
            .into_iter()
            .find(|record| record_id(record) == Some(id))
    }

    /// First record whose `field` equals `value` exactly.
    pub async fn get_by_field(&self, collection: &str, field: &str, value: &Value) -> Option<Record> {
        self.read_collection(collection)
            .await
            .into_iter()
            .find(|record| record.get(field) == Some(value))
    }

    /// Append a new record with a fresh id. Caller fields are merged after the
    /// timestamps are stamped, so supplied `createdAt`/`updatedAt` win; a
    /// supplied `id` never does.
    #[instrument(skip(self, fields), fields(collection = %collection))]
    pub async fn create(&self, collection: &str, fields: Record) -> RepositoryResult<Record> {
        let _guard = self.lock(collection).await;
        let mut records = self.try_read_collection(collection).await?;

        let now = now_timestamp();
        let mut record = Record::new();
        record.insert(ID_FIELD.to_string(), Value::String(generate_id()));
        record.insert(CREATED_AT_FIELD.to_string(), Value::String(now.clone()));
        record.insert(UPDATED_AT_FIELD.to_string(), Value::String(now));
        for (key, value) in fields {
            if key != ID_FIELD {
                record.insert(key, value);
            }
        }

        records.push(record.clone());
        self.write_collection(collection, &records).await?;
        debug!(id = ?record_id(&record), "Record created");
        Ok(record)
    }

    /// Merge `partial` onto the record with `id` and advance `updatedAt`.
    /// Returns `Ok(None)` without writing when the id is unknown.
    #[instrument(skip(self, partial), fields(collection = %collection, id = %id))]
    pub async fn update(&self, collection: &str, id: &str, partial: Record) -> RepositoryResult<Option<Record>> {
        let _guard = self.lock(collection).await;
        let mut records = self.try_read_collection(collection).await?;

        let Some(record) = records.iter_mut().find(|record| record_id(record) == Some(id)) else {
            debug!("No record to update");
            return Ok(None);
        };
        merge_partial(record, partial);
        let updated = record.clone();

        self.write_collection(collection, &records).await?;
        debug!("Record updated");
        Ok(Some(updated))
    }

    /// Remove by id. The collection is rewritten either way; the flag reports
    /// whether a record was actually removed.
    #[instrument(skip(self), fields(collection = %collection, id = %id))]
    pub async fn remove(&self, collection: &str, id: &str) -> RepositoryResult<bool> {
        let _guard = self.lock(collection).await;
        let mut records = self.try_read_collection(collection).await?;
        let before = records.len();
        records.retain(|record| record_id(record) != Some(id));
        let removed = records.len() != before;
        self.write_collection(collection, &records).await?;
        debug!(removed, "Record removal finished");
        Ok(removed)
    }

    /// Replace the entire collection.
    #[instrument(skip(self, records), fields(collection = %collection, count = records.len()))]
    pub async fn bulk_persist(&self, collection: &str, records: Vec<Record>) -> RepositoryResult<()> {
        let _guard = self.lock(collection).await;
        self.write_collection(collection, &records).await
    }

    /// Run `f` over the full collection inside one read-modify-write cycle.
    pub async fn modify<T, F>(&self, collection: &str, f: F) -> RepositoryResult<T>
    where
        F: FnOnce(&mut Vec<Record>) -> T + Send,
        T: Send,
    {
        let _guard = self.lock(collection).await;
        let mut records = self.try_read_collection(collection).await?;
        let result = f(&mut records);
        self.write_collection(collection, &records).await?;
        Ok(result)
    }

    async fn lock(&self, collection: &str) -> Option<OwnedMutexGuard<()>> {
        if self.write_mode != WriteMode::Serialized {
            return None;
        }
        let mutex = {
            let mut locks = self.locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            locks
                .entry(collection.to_string())
                .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
                .clone()
        };
        Some(mutex.lock_owned().await)
    }

    /// Degrading read for query paths: any failure reads as empty.
    async fn read_collection(&self, collection: &str) -> Vec<Record> {
        self.try_read_collection(collection).await.unwrap_or_else(|e| {
            warn!("Reading collection '{}' as empty: {}", collection, e);
            Vec::new()
        })
    }

    /// Strict read for write cycles. Only a missing file reads as empty.
    async fn try_read_collection(&self, collection: &str) -> RepositoryResult<Vec<Record>> {
        let path = self.collection_path(collection);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("Collection file {} missing, reading as empty", path.display());
                return Ok(Vec::new());
            }
            Err(e) => {
                error!("Failed to read {}: {}", path.display(), e);
                return Err(RepositoryError::io(format!("Failed to read collection '{}': {}", collection, e)));
            }
        };
        let values = serde_json::from_slice::<Vec<Value>>(&bytes).map_err(|e| {
            error!("Failed to parse {}: {}", path.display(), e);
            RepositoryError::serialization(format!("Collection '{}' is not a JSON array: {}", collection, e))
        })?;
        Ok(values
            .into_iter()
            .filter_map(|value| match value {
                Value::Object(record) => Some(record),
                other => {
                    warn!("Skipping non-object entry in {}: {}", collection, other);
                    None
                }
            })
            .collect())
    }

    async fn write_collection(&self, collection: &str, records: &[Record]) -> RepositoryResult<()> {
        let path = self.collection_path(collection);
        let body = serde_json::to_vec_pretty(records)?;
        let tmp = self
            .data_dir
            .join(format!(".{}.json.{}.tmp", collection, uuid::Uuid::new_v4().simple()));

        if let Err(e) = tokio::fs::write(&tmp, &body).await {
            error!("Failed to write {}: {}", tmp.display(), e);
            return Err(RepositoryError::io(format!("Failed to write collection '{}': {}", collection, e)));
        }
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            error!("Failed to swap {} into place: {}", path.display(), e);
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(RepositoryError::io(format!("Failed to write collection '{}': {}", collection, e)));
        }
        Ok(())
    }
}

pub fn record_id(record: &Record) -> Option<&str> {
    record.get(ID_FIELD).and_then(Value::as_str)
}

/// Merge `partial` onto `record` (never touching `id`) and advance `updatedAt`.
pub fn merge_partial(record: &mut Record, partial: Record) {
    let next = next_timestamp(record.get(UPDATED_AT_FIELD));
    for (key, value) in partial {
        if key != ID_FIELD {
            record.insert(key, value);
        }
    }
    record.insert(UPDATED_AT_FIELD.to_string(), Value::String(next));
}

pub fn now_timestamp() -> String {
    format_timestamp(Utc::now())
}

fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Current time, nudged past `previous` when the clock has not moved on.
fn next_timestamp(previous: Option<&Value>) -> String {
    let now = Utc::now();
    let previous = previous
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc));
    match previous {
        Some(prev) if now <= prev => format_timestamp(prev + Duration::microseconds(1)),
        _ => format_timestamp(now),
    }
}

const ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Short lowercase alphanumeric id: ten random characters followed by the
/// tail of the base-36 millisecond clock.
pub fn generate_id() -> String {
    let mut rng = rand::thread_rng();
    let mut id: String = (0..10)
        .map(|_| ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())] as char)
        .collect();

    let mut millis = Utc::now().timestamp_millis().unsigned_abs();
    let mut clock = Vec::new();
    while millis > 0 {
        clock.push(ID_ALPHABET[(millis % 36) as usize]);
        millis /= 36;
    }
    let tail: String = clock.iter().take(6).rev().map(|b| *b as char).collect();
    id.push_str(&tail);
    id
}

pub fn to_record<T: Serialize>(value: &T) -> RepositoryResult<Record> {
    match serde_json::to_value(value)? {
        Value::Object(record) => Ok(record),
        other => Err(RepositoryError::serialization(format!(
            "expected an object, got {}",
            other
        ))),
    }
}

pub fn from_record<T: DeserializeOwned>(record: Record) -> RepositoryResult<T> {
    Ok(serde_json::from_value(Value::Object(record))?)
}

/// Decode every record of `collection`, skipping (and logging) records that no
/// longer match the expected shape.
pub fn decode_records<T: DeserializeOwned>(collection: &str, records: Vec<Record>) -> Vec<T> {
    records
        .into_iter()
        .filter_map(|record| {
            let id = record_id(&record).unwrap_or("<missing>").to_string();
            match from_record(record) {
                Ok(value) => Some(value),
                Err(e) => {
                    warn!(collection, id = %id, "Skipping malformed record: {}", e);
                    None
                }
            }
        })
        .collect()
}
