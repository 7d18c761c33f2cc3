//! Yahoo Finance chart API client.
//!
//! Fetches intraday bars from `/v8/finance/chart/{symbol}` and turns the
//! close column into a [`PriceSeries`] for the alert engine.

pub mod rate_limit;

use std::error::Error as StdError;
use std::time::Duration;

use async_trait::async_trait;
use chrono::DateTime;
use common::config::QuoteConfig;
use common::{Error, PriceSeries, PriceSource, Result};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{debug, warn};

pub use rate_limit::RateLimiter;

pub const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com";

/// Prices are kept to four decimal places.
const PRICE_DP: u32 = 4;

// ── Chart response types ──────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ChartResponse {
    pub chart: Chart,
}

#[derive(Debug, Deserialize)]
pub struct Chart {
    #[serde(default)]
    pub result: Option<Vec<ChartResult>>,
    #[serde(default)]
    pub error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
pub struct ChartError {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct ChartResult {
    #[serde(default)]
    pub meta: Option<ChartMeta>,
    #[serde(default)]
    pub timestamp: Vec<i64>,
    pub indicators: Indicators,
}

#[derive(Debug, Deserialize)]
pub struct ChartMeta {
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(rename = "exchangeTimezoneName", default)]
    pub exchange_timezone_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Indicators {
    #[serde(default)]
    pub quote: Vec<QuoteColumns>,
}

#[derive(Debug, Deserialize)]
pub struct QuoteColumns {
    #[serde(default)]
    pub close: Vec<Option<f64>>,
}

/// Convert a chart payload into a price series.
///
/// Bars with a null or non-finite close are dropped. A payload carrying
/// `chart.error`, or one with no usable bars, is `DataUnavailable`.
pub fn parse_chart(symbol: &str, payload: ChartResponse) -> Result<PriceSeries> {
    if let Some(err) = payload.chart.error {
        return Err(Error::data_unavailable(
            symbol,
            format!("{}: {}", err.code, err.description),
        ));
    }

    let result = payload
        .chart
        .result
        .and_then(|r| r.into_iter().next())
        .ok_or_else(|| Error::data_unavailable(symbol, "empty chart result"))?;

    let closes = result
        .indicators
        .quote
        .into_iter()
        .next()
        .map(|q| q.close)
        .unwrap_or_default();

    if closes.len() != result.timestamp.len() {
        warn!(
            symbol,
            timestamps = result.timestamp.len(),
            closes = closes.len(),
            "Chart columns differ in length, truncating to the shorter"
        );
    }

    let points: Vec<_> = result
        .timestamp
        .iter()
        .zip(closes)
        .filter_map(|(ts, close)| {
            let at = DateTime::from_timestamp(*ts, 0)?;
            let price = close
                .filter(|c| c.is_finite())
                .and_then(Decimal::from_f64)?
                .round_dp(PRICE_DP);
            Some((at, price))
        })
        .collect();

    if points.is_empty() {
        return Err(Error::data_unavailable(symbol, "no price bars in range"));
    }

    Ok(PriceSeries::from_points(symbol, points))
}

fn format_reqwest_error(err: &reqwest::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();

    while let Some(cause) = source {
        let cause_msg = cause.to_string();
        if !cause_msg.is_empty() && !message.contains(&cause_msg) {
            message.push_str(": ");
            message.push_str(&cause_msg);
        }
        source = cause.source();
    }

    message
}

// ── Client ────────────────────────────────────────────────────────────

/// Chart API client with a shared request budget.
#[derive(Debug, Clone)]
pub struct YahooChartClient {
    client: reqwest::Client,
    base_url: String,
    limiter: RateLimiter,
}

impl YahooChartClient {
    pub fn new(config: &QuoteConfig) -> Result<Self> {
        Self::with_base_url(config, resolve_base_url())
    }

    pub fn with_base_url(config: &QuoteConfig, base_url: impl Into<String>) -> Result<Self> {
        // The endpoint rejects requests without a browser-like agent.
        let client = reqwest::Client::builder()
            .user_agent("Mozilla/5.0 (compatible; stock-alert-bot/0.1)")
            .pool_max_idle_per_host(4)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| Error::Http(format!("failed to build quote HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            limiter: RateLimiter::per_second(config.requests_per_second),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn chart_url(&self, symbol: &str) -> String {
        format!("{}/v8/finance/chart/{}", self.base_url, symbol)
    }

    /// Fetch the raw chart payload for a symbol.
    pub async fn fetch_chart(
        &self,
        symbol: &str,
        period: &str,
        interval: &str,
    ) -> Result<ChartResponse> {
        let url = self.chart_url(symbol);

        self.limiter.wait().await;
        debug!("Fetching chart: {} range={} interval={}", url, period, interval);

        let resp = self
            .client
            .get(&url)
            .query(&[("range", period), ("interval", interval)])
            .send()
            .await
            .map_err(|e| Error::data_unavailable(symbol, format_reqwest_error(&e)))?;

        let status = resp.status().as_u16();
        if status != 200 {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::data_unavailable(
                symbol,
                format!(
                    "quote API returned {}: {}",
                    status,
                    body.chars().take(500).collect::<String>()
                ),
            ));
        }

        resp.json()
            .await
            .map_err(|e| Error::data_unavailable(symbol, format!("JSON parse error: {e}")))
    }
}

#[async_trait]
impl PriceSource for YahooChartClient {
    async fn fetch(&self, symbol: &str, period: &str, interval: &str) -> Result<PriceSeries> {
        let payload = self.fetch_chart(symbol, period, interval).await?;
        let series = parse_chart(symbol, payload)?;
        debug!("Got {} bars for {}", series.len(), symbol);
        Ok(series)
    }
}

fn resolve_base_url() -> String {
    std::env::var("QUOTE_API_BASE_URL")
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
}
