//! Stock-alert-bot: intraday price-move notifier.
//!
//! One invocation performs one sweep:
//! 1. Checks the trading session
//! 2. Fetches intraday prices for each watched symbol
//! 3. Decides whether the move since the open warrants an alert
//! 4. Notifies and records the alert so the same move is not repeated
//!
//! Scheduling is left to whatever runs the binary (cron, a timer, a
//! serverless trigger).

mod config;
mod journal;

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use clap::Parser;
use serde_json::json;
use tracing::{error, info, warn};

use alert_engine::{handle_invocation, AlertDecisionEngine, SessionClock, SweepConfig, Sweeper};
use common::config::{BotConfig, NotifierKind, StoreBackend};
use common::{MarketClock, Notifier, PriceSource, RecordStore};
use journal::{now_iso, resolve_alerts_dir, AlertJournal};
use notifier::{LogNotifier, WebhookNotifier};
use quote_client::YahooChartClient;
use record_store::{FileRecordStore, MemoryRecordStore};

/// Intraday stock move alerts
#[derive(Parser)]
#[command(name = "stock-alert-bot", about = "Alert on large intraday stock moves")]
struct Cli {
    /// Path to a TOML config file (defaults to ./config.toml when present).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log alerts instead of delivering them, and keep state in memory.
    #[arg(long)]
    dry_run: bool,

    /// Run the sweep even outside the configured trading session.
    #[arg(long)]
    ignore_market_hours: bool,

    /// Do not write the JSONL alert journal.
    #[arg(long)]
    no_journal: bool,

    /// Print the resolved configuration as JSON and exit.
    #[arg(long)]
    print_config: bool,
}

fn build_store(cfg: &BotConfig, dry_run: bool) -> Arc<dyn RecordStore> {
    if dry_run || cfg.store.backend == StoreBackend::Memory {
        return Arc::new(MemoryRecordStore::new());
    }
    Arc::new(FileRecordStore::new(&cfg.store.path))
}

fn build_notifier(cfg: &BotConfig, dry_run: bool) -> Arc<dyn Notifier> {
    if dry_run {
        return Arc::new(LogNotifier::new());
    }
    match cfg.notifier.kind {
        NotifierKind::Log => Arc::new(LogNotifier::new()),
        NotifierKind::Webhook => Arc::new(WebhookNotifier::new(cfg.notifier.webhook_url.trim())),
    }
}

fn build_clock(cfg: &BotConfig, ignore_market_hours: bool) -> Result<Arc<dyn MarketClock>, common::Error> {
    if ignore_market_hours {
        return Ok(Arc::new(SessionClock::always_open()));
    }
    Ok(Arc::new(SessionClock::new(&cfg.market_hours)?))
}

#[tokio::main]
async fn main() {
    // Initialize logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "stock_alert_bot=info,alert_engine=info,quote_client=info,record_store=info,notifier=info"
                    .into()
            }),
        )
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // Load configuration.
    let cfg = match config::load_config(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            error!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    if cli.print_config {
        match serde_json::to_string_pretty(&cfg) {
            Ok(out) => println!("{}", out),
            Err(e) => {
                error!("Failed to serialize config: {}", e);
                std::process::exit(1);
            }
        }
        return;
    }

    info!("📈 Stock alert bot starting up...");
    info!("Symbols: {:?}", cfg.symbols);
    info!(
        "Alerting: threshold={}%, re-alert step={}%, max_age={:?}",
        cfg.alert.threshold_percent, cfg.alert.min_percent_increase, cfg.alert.max_data_age_secs,
    );
    info!(
        "Session: {}-{} (UTC{:+} min), enforced={}",
        cfg.market_hours.open,
        cfg.market_hours.close,
        cfg.market_hours.utc_offset_minutes,
        cfg.market_hours.enabled && !cli.ignore_market_hours,
    );

    let mut journal = if cli.no_journal {
        None
    } else {
        match AlertJournal::open(resolve_alerts_dir()) {
            Ok(j) => {
                info!("Alert journal path: {}", j.dir().display());
                Some(j)
            }
            Err(e) => {
                warn!("Alert journal disabled: {}", e);
                None
            }
        }
    };

    let store_label = match (cli.dry_run, cfg.store.backend) {
        (false, StoreBackend::File) => "file",
        _ => "memory",
    };
    if let Some(j) = journal.as_mut() {
        j.write_event(json!({
            "ts": now_iso(),
            "kind": "invocation_start",
            "bot": "stock-alert-bot",
            "mode": if cli.dry_run { "dry_run" } else { "live" },
            "symbols": cfg.symbols,
            "alert": {
                "threshold_percent": cfg.alert.threshold_percent,
                "min_percent_increase": cfg.alert.min_percent_increase,
                "max_data_age_secs": cfg.alert.max_data_age_secs,
            },
            "store": store_label,
        }));
    }

    // ── Collaborators ────────────────────────────────────────────────
    let source: Arc<dyn PriceSource> = match YahooChartClient::new(&cfg.quotes) {
        Ok(c) => {
            info!("Quote API: {}", c.base_url());
            Arc::new(c)
        }
        Err(e) => {
            error!("Quote client initialization failed: {}", e);
            std::process::exit(1);
        }
    };
    let clock = match build_clock(&cfg, cli.ignore_market_hours) {
        Ok(c) => c,
        Err(e) => {
            error!("Market hours configuration error: {}", e);
            std::process::exit(1);
        }
    };
    let store = build_store(&cfg, cli.dry_run);
    let notifier = build_notifier(&cfg, cli.dry_run);

    if cli.dry_run {
        info!("🧪 Dry run: alerts are logged, records are not persisted");
    }

    let sweeper = Sweeper::new(
        SweepConfig::from_bot_config(&cfg),
        AlertDecisionEngine::new(cfg.alert.clone()),
        source,
        store,
        notifier,
        clock,
    );

    // ── Sweep ────────────────────────────────────────────────────────
    let (summary, response) = handle_invocation(&sweeper, Utc::now()).await;

    if let Some(j) = journal.as_mut() {
        j.record_sweep(&summary);
    }

    match serde_json::to_string(&response) {
        Ok(out) => println!("{}", out),
        Err(e) => error!("Failed to serialize response: {}", e),
    }
}
