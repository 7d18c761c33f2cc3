//! Per-tick sweep over the watched symbols.
//!
//! For each symbol: fetch prices, read the notification record, decide,
//! notify, persist. Every failure is contained to its symbol and reported
//! as a `SymbolOutcome`; the sweep itself never fails.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use common::config::BotConfig;
use common::{AlertDecision, DecisionReason, MarketClock, Notifier, PriceSource, RecordStore};
use futures_util::future::join_all;
use notifier::AlertMessage;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::engine::{next_record, AlertDecisionEngine, EvaluationError};

/// Why a symbol was not evaluated this tick.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SkipReason {
    #[error(transparent)]
    Evaluation(#[from] EvaluationError),

    #[error("market data unavailable: {0}")]
    DataUnavailable(String),
}

/// Result of processing one symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SymbolOutcome {
    /// The decision fired. `notified`/`persisted` report collaborator success.
    Alerted {
        decision: AlertDecision,
        notified: bool,
        persisted: bool,
    },
    BelowThreshold {
        decision: AlertDecision,
    },
    /// Over threshold, but already alerted today without enough growth.
    Suppressed {
        decision: AlertDecision,
    },
    Skipped {
        reason: SkipReason,
    },
}

impl SymbolOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Alerted { .. } => "alerted",
            Self::BelowThreshold { .. } => "below_threshold",
            Self::Suppressed { .. } => "suppressed",
            Self::Skipped { .. } => "skipped",
        }
    }

    pub fn decision(&self) -> Option<&AlertDecision> {
        match self {
            Self::Alerted { decision, .. }
            | Self::BelowThreshold { decision }
            | Self::Suppressed { decision } => Some(decision),
            Self::Skipped { .. } => None,
        }
    }
}

/// Everything one sweep did.
#[derive(Debug, Clone)]
pub struct SweepSummary {
    pub started_at: DateTime<Utc>,
    pub market_open: bool,
    pub outcomes: Vec<(String, SymbolOutcome)>,
    /// Alerts whose notifier call succeeded.
    pub notifications_sent: usize,
    /// Alerts that fired, delivered or not.
    pub alerts_fired: usize,
}

impl SweepSummary {
    pub fn count(&self, label: &str) -> usize {
        summary_count(&self.outcomes, label)
    }
}

fn summary_count(outcomes: &[(String, SymbolOutcome)], label: &str) -> usize {
    outcomes.iter().filter(|(_, o)| o.label() == label).count()
}

/// Response returned to whatever triggered the invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationResponse {
    pub status_code: u16,
    pub notifications_sent: usize,
    pub body: String,
}

impl InvocationResponse {
    pub fn from_summary(summary: &SweepSummary) -> Self {
        let body = if summary.market_open {
            format!(
                "Analysis complete. {} notifications sent.",
                summary.notifications_sent
            )
        } else {
            "Market is closed. No analysis.".to_string()
        };

        Self {
            status_code: 200,
            notifications_sent: summary.notifications_sent,
            body,
        }
    }
}

/// Sweep parameters drawn from the bot config.
#[derive(Debug, Clone)]
pub struct SweepConfig {
    pub symbols: Vec<String>,
    pub period: String,
    pub interval: String,
}

impl SweepConfig {
    pub fn from_bot_config(config: &BotConfig) -> Self {
        Self {
            symbols: config.symbols.clone(),
            period: config.quotes.period.clone(),
            interval: config.quotes.interval.clone(),
        }
    }
}

/// Caller of the decision engine, wired to explicit collaborators.
pub struct Sweeper {
    config: SweepConfig,
    engine: AlertDecisionEngine,
    source: Arc<dyn PriceSource>,
    store: Arc<dyn RecordStore>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn MarketClock>,
}

impl Sweeper {
    pub fn new(
        config: SweepConfig,
        engine: AlertDecisionEngine,
        source: Arc<dyn PriceSource>,
        store: Arc<dyn RecordStore>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn MarketClock>,
    ) -> Self {
        Self {
            config,
            engine,
            source,
            store,
            notifier,
            clock,
        }
    }

    /// Symbols to process: trimmed, upper-cased, de-duplicated, in
    /// configured order.
    pub fn symbols(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.config
            .symbols
            .iter()
            .map(|s| s.trim().to_ascii_uppercase())
            .filter(|s| !s.is_empty())
            .filter(|s| seen.insert(s.clone()))
            .collect()
    }

    /// Run one sweep as of `now`.
    pub async fn run(&self, now: DateTime<Utc>) -> SweepSummary {
        if !self.clock.is_open(now) {
            info!("Market is closed at {}; skipping sweep", now);
            return SweepSummary {
                started_at: now,
                market_open: false,
                outcomes: Vec::new(),
                notifications_sent: 0,
                alerts_fired: 0,
            };
        }

        let symbols = self.symbols();
        let today = now.date_naive();
        info!("Sweeping {} symbols for {}", symbols.len(), today);

        let results = join_all(
            symbols
                .iter()
                .map(|symbol| self.process_symbol(symbol, now, today)),
        )
        .await;
        let outcomes: Vec<(String, SymbolOutcome)> = symbols.into_iter().zip(results).collect();

        let notifications_sent = outcomes
            .iter()
            .filter(|(_, o)| matches!(o, SymbolOutcome::Alerted { notified: true, .. }))
            .count();
        let alerts_fired = summary_count(&outcomes, "alerted");

        SweepSummary {
            started_at: now,
            market_open: true,
            outcomes,
            notifications_sent,
            alerts_fired,
        }
    }

    async fn process_symbol(
        &self,
        symbol: &str,
        now: DateTime<Utc>,
        today: NaiveDate,
    ) -> SymbolOutcome {
        // 1. Prices.
        let series = match self
            .source
            .fetch(symbol, &self.config.period, &self.config.interval)
            .await
        {
            Ok(s) => s,
            Err(e) => {
                warn!("{}: failed to fetch prices: {}", symbol, e);
                return SymbolOutcome::Skipped {
                    reason: SkipReason::DataUnavailable(e.to_string()),
                };
            }
        };

        if let Err(e) = self.engine.check_freshness(&series, now) {
            warn!("{}: {}", symbol, e);
            return SymbolOutcome::Skipped { reason: e.into() };
        }

        // 2. Prior record. A store outage degrades to "no prior alert".
        let prior = match self.store.get(symbol).await {
            Ok(r) => r,
            Err(e) => {
                warn!("{}: record lookup failed, evaluating without it: {}", symbol, e);
                None
            }
        };

        // 3. Decide.
        let decision = match self.engine.evaluate(&series, prior.as_ref(), today) {
            Ok(d) => d,
            Err(e) => {
                warn!("{}: {}", symbol, e);
                return SymbolOutcome::Skipped { reason: e.into() };
            }
        };

        info!(
            "{}: {:.2}% since open ({} → {})",
            symbol, decision.percent_change, decision.baseline_price, decision.current_price
        );

        if !decision.fire {
            return match decision.reason {
                DecisionReason::Suppressed { delta } => {
                    info!(
                        "{}: no new significant change ({:.2}%), skipping",
                        symbol, delta
                    );
                    SymbolOutcome::Suppressed { decision }
                }
                _ => SymbolOutcome::BelowThreshold { decision },
            };
        }

        // 4. Notify. Delivery failure does not block the record update.
        let message = AlertMessage::compose(
            symbol,
            &decision,
            self.engine.config.threshold_percent,
            self.engine.config.min_percent_increase,
        );
        let notified = match self
            .notifier
            .send(symbol, &message.subject, &message.body)
            .await
        {
            Ok(()) => {
                info!("🔔 ALERT sent: {}", message.subject);
                true
            }
            Err(e) => {
                error!("{}: notification failed: {}", symbol, e);
                false
            }
        };

        // 5. Persist.
        let persisted = match next_record(symbol, &decision, today) {
            Some(record) => match self.store.put(record).await {
                Ok(()) => true,
                Err(e) => {
                    warn!("{}: failed to store notification record: {}", symbol, e);
                    false
                }
            },
            None => false,
        };

        SymbolOutcome::Alerted {
            decision,
            notified,
            persisted,
        }
    }
}

/// Run one sweep and build the invocation response. Always status 200.
pub async fn handle_invocation(
    sweeper: &Sweeper,
    now: DateTime<Utc>,
) -> (SweepSummary, InvocationResponse) {
    let summary = sweeper.run(now).await;
    let response = InvocationResponse::from_summary(&summary);
    info!(
        "Sweep finished: {} notifications sent ({} alerted, {} suppressed, {} skipped)",
        summary.notifications_sent,
        summary.alerts_fired,
        summary.count("suppressed"),
        summary.count("skipped"),
    );
    (summary, response)
}
