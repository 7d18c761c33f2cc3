//! JSON-file record store.
//!
//! All records live in one document keyed by symbol. Writes go to a
//! sibling temp file which is then renamed over the original, so a crash
//! mid-write leaves the previous state intact.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{Error, NotificationRecord, RecordStore, Result};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, warn};

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreDocument {
    #[serde(default)]
    records: BTreeMap<String, NotificationRecord>,
}

/// Durable store backed by a single JSON file.
#[derive(Debug)]
pub struct FileRecordStore {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process.
    lock: Mutex<()>,
}

impl FileRecordStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<StoreDocument> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(StoreDocument::default()),
            Err(e) => {
                return Err(Error::StoreUnavailable(format!(
                    "read {}: {}",
                    self.path.display(),
                    e
                )))
            }
        };

        if raw.trim().is_empty() {
            return Ok(StoreDocument::default());
        }

        match serde_json::from_str::<StoreDocument>(&raw) {
            Ok(doc) => Ok(doc),
            Err(e) => {
                warn!(
                    "Record store {} is unreadable, starting empty: {}",
                    self.path.display(),
                    e
                );
                Ok(StoreDocument::default())
            }
        }
    }

    async fn persist(&self, doc: &StoreDocument) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::StoreUnavailable(format!("create {}: {}", parent.display(), e)))?;
        }

        let data = serde_json::to_string_pretty(doc)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, data.as_bytes())
            .await
            .map_err(|e| Error::StoreUnavailable(format!("write {}: {}", tmp.display(), e)))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| Error::StoreUnavailable(format!("rename {}: {}", tmp.display(), e)))?;
        Ok(())
    }

    /// Lookup as of `now`.
    pub async fn get_at(
        &self,
        symbol: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<NotificationRecord>> {
        let _guard = self.lock.lock().await;
        let doc = self.load().await?;
        Ok(doc
            .records
            .get(symbol)
            .filter(|r| !r.is_expired(now))
            .cloned())
    }

    /// Upsert as of `now`, dropping any other records that have expired.
    pub async fn put_at(&self, record: NotificationRecord, now: DateTime<Utc>) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut doc = self.load().await?;

        let before = doc.records.len();
        doc.records.retain(|_, r| !r.is_expired(now));
        let pruned = before - doc.records.len();
        if pruned > 0 {
            debug!("Pruned {} expired notification records", pruned);
        }

        doc.records.insert(record.symbol.clone(), record);
        self.persist(&doc).await
    }
}

#[async_trait]
impl RecordStore for FileRecordStore {
    async fn get(&self, symbol: &str) -> Result<Option<NotificationRecord>> {
        self.get_at(symbol, Utc::now()).await
    }

    async fn put(&self, record: NotificationRecord) -> Result<()> {
        self.put_at(record, Utc::now()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate, TimeZone};
    use rust_decimal_macros::dec;

    fn scratch_path() -> PathBuf {
        std::env::temp_dir()
            .join(format!("record-store-{}", uuid::Uuid::new_v4()))
            .join("records.json")
    }

    fn record(symbol: &str, expires_at: DateTime<Utc>) -> NotificationRecord {
        NotificationRecord {
            symbol: symbol.into(),
            last_notified_date: NaiveDate::from_ymd_opt(2025, 3, 5),
            last_percent_diff: Some(dec!(2.1)),
            expires_at,
        }
    }

    fn at(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 5, h, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_missing_file_reads_empty() {
        let store = FileRecordStore::new(scratch_path());
        assert_eq!(store.get_at("BMW.DE", at(10)).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_round_trip_survives_reopen() {
        let path = scratch_path();
        let midnight = Utc.with_ymd_and_hms(2025, 3, 6, 0, 0, 0).unwrap();
        let rec = record("BMW.DE", midnight);

        FileRecordStore::new(&path).put_at(rec.clone(), at(10)).await.unwrap();

        let reopened = FileRecordStore::new(&path);
        assert_eq!(reopened.get_at("BMW.DE", at(11)).await.unwrap(), Some(rec));
        assert!(!path.with_extension("json.tmp").exists());

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[tokio::test]
    async fn test_expired_record_is_absent() {
        let path = scratch_path();
        let store = FileRecordStore::new(&path);
        store.put_at(record("VOD.L", at(12)), at(10)).await.unwrap();

        assert!(store.get_at("VOD.L", at(11)).await.unwrap().is_some());
        // Expiry is exclusive: a record expiring exactly now is gone.
        assert_eq!(store.get_at("VOD.L", at(12)).await.unwrap(), None);

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[tokio::test]
    async fn test_put_prunes_expired_entries() {
        let path = scratch_path();
        let store = FileRecordStore::new(&path);
        store.put_at(record("VOD.L", at(11)), at(10)).await.unwrap();
        store.put_at(record("AIR.PA", at(20)), at(12)).await.unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        let doc: StoreDocument = serde_json::from_str(&raw).unwrap();
        assert!(doc.records.contains_key("AIR.PA"));
        assert!(!doc.records.contains_key("VOD.L"));

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_treated_as_empty() {
        let path = scratch_path();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{not json").unwrap();

        let store = FileRecordStore::new(&path);
        assert_eq!(store.get_at("BMW.DE", at(10)).await.unwrap(), None);
        store
            .put_at(record("BMW.DE", at(20)), at(10))
            .await
            .unwrap();
        assert!(store.get_at("BMW.DE", at(10)).await.unwrap().is_some());

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[tokio::test]
    async fn test_trait_get_uses_wall_clock() {
        let path = scratch_path();
        let store = FileRecordStore::new(&path);
        store
            .put(record("BMW.DE", Utc::now() + Duration::hours(1)))
            .await
            .unwrap();
        assert!(store.get("BMW.DE").await.unwrap().is_some());

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }
}
