//! Collaborator interfaces used by the sweep.
//!
//! Each trait is a narrow seam over external I/O so the decision engine and
//! its caller can be exercised without a network or a database.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::types::{NotificationRecord, PriceSeries};
use crate::Result;

/// Source of intraday prices.
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Fetch prices for `symbol` over `period` (e.g. "1d") sampled every
    /// `interval` (e.g. "1m"). Fails with `Error::DataUnavailable`.
    async fn fetch(&self, symbol: &str, period: &str, interval: &str) -> Result<PriceSeries>;
}

/// Per-symbol notification state with TTL-style expiry.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Current record for `symbol`, or `None` when missing or expired.
    async fn get(&self, symbol: &str) -> Result<Option<NotificationRecord>>;

    /// Upsert the record keyed by `record.symbol`.
    async fn put(&self, record: NotificationRecord) -> Result<()>;
}

/// Delivery channel for alerts.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, symbol: &str, subject: &str, body: &str) -> Result<()>;
}

/// Gate deciding whether a sweep should run at all.
pub trait MarketClock: Send + Sync {
    fn is_open(&self, now: DateTime<Utc>) -> bool;
}
