//! Domain types shared across the bot.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// ── Market Data ───────────────────────────────────────────────────────

/// One sampled price for a symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceObservation {
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    pub price: Decimal,
}

/// Intraday price samples for one symbol over one session.
///
/// Observations are kept in ascending timestamp order. The first
/// observation is the session baseline, the last is the current price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceSeries {
    symbol: String,
    observations: Vec<PriceObservation>,
}

impl PriceSeries {
    pub fn new(symbol: impl Into<String>, mut observations: Vec<PriceObservation>) -> Self {
        observations.sort_by_key(|o| o.timestamp);
        Self {
            symbol: symbol.into(),
            observations,
        }
    }

    /// Build a series from `(timestamp, price)` pairs.
    pub fn from_points(
        symbol: impl Into<String>,
        points: impl IntoIterator<Item = (DateTime<Utc>, Decimal)>,
    ) -> Self {
        let symbol = symbol.into();
        let observations = points
            .into_iter()
            .map(|(timestamp, price)| PriceObservation {
                symbol: symbol.clone(),
                timestamp,
                price,
            })
            .collect();
        Self::new(symbol, observations)
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn first(&self) -> Option<&PriceObservation> {
        self.observations.first()
    }

    pub fn last(&self) -> Option<&PriceObservation> {
        self.observations.last()
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn observations(&self) -> &[PriceObservation] {
        &self.observations
    }
}

// ── Notification State ────────────────────────────────────────────────

/// Last-alert state persisted per symbol.
///
/// Upserted on every alert, never on a quiet invocation. Stores treat the
/// record as absent once `expires_at` has passed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub symbol: String,
    #[serde(default)]
    pub last_notified_date: Option<NaiveDate>,
    #[serde(default)]
    pub last_percent_diff: Option<Decimal>,
    pub expires_at: DateTime<Utc>,
}

impl NotificationRecord {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

// ── Decisions ─────────────────────────────────────────────────────────

/// Why the engine reached its verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DecisionReason {
    /// Absolute move is under the alert threshold.
    BelowThreshold,
    /// No alert has been sent for this symbol today.
    FirstAlertOfDay,
    /// Already alerted today, and the move grew by at least the increment.
    Escalated { delta: Decimal },
    /// Already alerted today, and the move has not grown enough.
    Suppressed { delta: Decimal },
}

/// Result of evaluating one symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertDecision {
    pub fire: bool,
    /// Percent move from baseline; positive when the price rose.
    pub percent_change: Decimal,
    pub baseline_price: Decimal,
    pub current_price: Decimal,
    pub reason: DecisionReason,
}

impl AlertDecision {
    pub fn is_up(&self) -> bool {
        self.percent_change > Decimal::ZERO
    }
}
