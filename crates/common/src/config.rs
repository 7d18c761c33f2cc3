//! Bot configuration types.

use chrono::NaiveTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::Error;

/// Top-level bot configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    /// Tickers to watch (Yahoo Finance notation, e.g. "BMW.DE").
    #[serde(default = "default_symbols")]
    pub symbols: Vec<String>,

    /// Alert thresholds.
    #[serde(default)]
    pub alert: AlertConfig,

    /// Market data request parameters.
    #[serde(default)]
    pub quotes: QuoteConfig,

    /// Trading session used to gate sweeps.
    #[serde(default)]
    pub market_hours: MarketHoursConfig,

    /// Notification record persistence.
    #[serde(default)]
    pub store: StoreConfig,

    /// Alert delivery.
    #[serde(default)]
    pub notifier: NotifierConfig,
}

/// Thresholds for the alert-decision engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertConfig {
    /// Minimum absolute percent move since the session open to alert.
    #[serde(default = "default_threshold_percent")]
    pub threshold_percent: Decimal,

    /// Additional magnitude required to re-alert on the same UTC day.
    #[serde(default = "default_min_percent_increase")]
    pub min_percent_increase: Decimal,

    /// Skip a symbol whose latest sample is older than this. `None` disables.
    #[serde(default)]
    pub max_data_age_secs: Option<u64>,
}

/// Market data request parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteConfig {
    /// Lookback range (e.g. "1d").
    #[serde(default = "default_period")]
    pub period: String,

    /// Sampling interval (e.g. "1m").
    #[serde(default = "default_interval")]
    pub interval: String,

    /// Deadline for a single price fetch.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Outbound request budget for the quote API.
    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: u32,
}

/// Trading session, expressed in the exchange's fixed UTC offset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketHoursConfig {
    /// When false, sweeps run regardless of the time of day.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Session open, "HH:MM" local exchange time.
    #[serde(default = "default_open")]
    pub open: String,

    /// Session close, "HH:MM" local exchange time (inclusive).
    #[serde(default = "default_close")]
    pub close: String,

    /// Exchange offset from UTC in minutes (e.g. 60 for CET).
    #[serde(default)]
    pub utc_offset_minutes: i32,
}

/// Where notification records live.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    File,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_backend")]
    pub backend: StoreBackend,

    /// JSON document used by the file backend.
    #[serde(default = "default_store_path")]
    pub path: String,
}

/// How alerts are delivered.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NotifierKind {
    Log,
    Webhook,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifierConfig {
    #[serde(default = "default_notifier_kind")]
    pub kind: NotifierKind,

    /// Target URL for the webhook notifier.
    #[serde(default)]
    pub webhook_url: String,
}

impl MarketHoursConfig {
    pub fn open_time(&self) -> Result<NaiveTime, Error> {
        parse_hhmm(&self.open, "market_hours.open")
    }

    pub fn close_time(&self) -> Result<NaiveTime, Error> {
        parse_hhmm(&self.close, "market_hours.close")
    }
}

/// Parse an "HH:MM" wall-clock time.
pub fn parse_hhmm(raw: &str, field: &str) -> Result<NaiveTime, Error> {
    NaiveTime::parse_from_str(raw.trim(), "%H:%M")
        .map_err(|_| Error::Config(format!("{field} must be HH:MM, got {raw:?}")))
}

// ── Defaults ──────────────────────────────────────────────────────────

fn default_true() -> bool {
    true
}

fn default_symbols() -> Vec<String> {
    vec!["BMW.DE".into(), "AIR.PA".into(), "VOD.L".into()]
}

fn default_threshold_percent() -> Decimal {
    Decimal::new(20, 1)
}
fn default_min_percent_increase() -> Decimal {
    Decimal::new(10, 1)
}

fn default_period() -> String {
    "1d".into()
}
fn default_interval() -> String {
    "1m".into()
}
fn default_request_timeout() -> u64 {
    15
}
fn default_requests_per_second() -> u32 {
    5
}

fn default_open() -> String {
    "08:00".into()
}
fn default_close() -> String {
    "16:30".into()
}

fn default_store_backend() -> StoreBackend {
    StoreBackend::File
}
fn default_store_path() -> String {
    "state/notification-records.json".into()
}

fn default_notifier_kind() -> NotifierKind {
    NotifierKind::Log
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            threshold_percent: default_threshold_percent(),
            min_percent_increase: default_min_percent_increase(),
            max_data_age_secs: None,
        }
    }
}

impl Default for QuoteConfig {
    fn default() -> Self {
        Self {
            period: default_period(),
            interval: default_interval(),
            request_timeout_secs: default_request_timeout(),
            requests_per_second: default_requests_per_second(),
        }
    }
}

impl Default for MarketHoursConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            open: default_open(),
            close: default_close(),
            utc_offset_minutes: 0,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_store_backend(),
            path: default_store_path(),
        }
    }
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            kind: default_notifier_kind(),
            webhook_url: String::new(),
        }
    }
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            symbols: default_symbols(),
            alert: AlertConfig::default(),
            quotes: QuoteConfig::default(),
            market_hours: MarketHoursConfig::default(),
            store: StoreConfig::default(),
            notifier: NotifierConfig::default(),
        }
    }
}
