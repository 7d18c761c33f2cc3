//! In-process record store.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{NotificationRecord, RecordStore, Result};
use dashmap::DashMap;

/// Records held in a shared `DashMap`. Lost when the process exits.
#[derive(Debug, Clone, Default)]
pub struct MemoryRecordStore {
    records: Arc<DashMap<String, NotificationRecord>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lookup as of `now`. Expired entries are evicted on read.
    pub fn get_at(&self, symbol: &str, now: DateTime<Utc>) -> Option<NotificationRecord> {
        let record = self.records.get(symbol).map(|r| r.value().clone())?;
        if record.is_expired(now) {
            self.records.remove_if(symbol, |_, r| r.is_expired(now));
            return None;
        }
        Some(record)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn get(&self, symbol: &str) -> Result<Option<NotificationRecord>> {
        Ok(self.get_at(symbol, Utc::now()))
    }

    async fn put(&self, record: NotificationRecord) -> Result<()> {
        self.records.insert(record.symbol.clone(), record);
        Ok(())
    }
}
