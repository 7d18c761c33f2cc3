//! Append-only JSONL alert journal, one file per UTC day.

use std::fs::{create_dir_all, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{json, Value};
use tracing::warn;

use alert_engine::{SweepSummary, SymbolOutcome};

const BOT_ALERT_DIR: &str = "stock-alert-bot";

pub fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn resolve_repo_root() -> Option<PathBuf> {
    let mut cursor = std::env::current_dir().ok()?;
    loop {
        if cursor.join(".git").is_dir() {
            return Some(cursor);
        }
        if !cursor.pop() {
            return None;
        }
    }
}

pub fn resolve_alerts_dir() -> PathBuf {
    if let Ok(raw) = std::env::var("ALERTS_DIR") {
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            return PathBuf::from(trimmed).join(BOT_ALERT_DIR);
        }
    }

    if let Some(root) = resolve_repo_root() {
        return root.join("ALERTS").join(BOT_ALERT_DIR);
    }

    PathBuf::from("ALERTS").join(BOT_ALERT_DIR)
}

pub struct AlertJournal {
    dir: PathBuf,
    day_key: String,
    file: File,
}

impl AlertJournal {
    pub fn open(dir: PathBuf) -> std::io::Result<Self> {
        create_dir_all(&dir)?;
        let day_key = Utc::now().format("%Y-%m-%d").to_string();
        let file = Self::open_day_file(&dir, &day_key)?;
        Ok(Self { dir, day_key, file })
    }

    fn open_day_file(dir: &Path, day_key: &str) -> std::io::Result<File> {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(dir.join(format!("alerts-{}.jsonl", day_key)))
    }

    fn rotate_if_needed(&mut self) -> std::io::Result<()> {
        let today = Utc::now().format("%Y-%m-%d").to_string();
        if today != self.day_key {
            self.file = Self::open_day_file(&self.dir, &today)?;
            self.day_key = today;
        }
        Ok(())
    }

    pub fn write_event(&mut self, event: Value) {
        let write_result = (|| -> std::io::Result<()> {
            self.rotate_if_needed()?;
            let line = serde_json::to_string(&event).unwrap_or_else(|_| "{}".to_string());
            writeln!(self.file, "{}", line)?;
            self.file.flush()?;
            Ok(())
        })();

        if let Err(e) = write_result {
            warn!("Alert journal write failed: {}", e);
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn current_file(&self) -> PathBuf {
        self.dir.join(format!("alerts-{}.jsonl", self.day_key))
    }

    /// Journal every per-symbol outcome plus a closing summary line.
    pub fn record_sweep(&mut self, summary: &SweepSummary) {
        if !summary.market_open {
            self.write_event(json!({
                "ts": now_iso(),
                "kind": "market_closed",
                "at": summary.started_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            }));
        }

        for (symbol, outcome) in &summary.outcomes {
            self.write_event(outcome_event(symbol, outcome, summary.started_at));
        }

        self.write_event(json!({
            "ts": now_iso(),
            "kind": "invocation_summary",
            "market_open": summary.market_open,
            "symbols": summary.outcomes.len(),
            "alerted": summary.count("alerted"),
            "suppressed": summary.count("suppressed"),
            "below_threshold": summary.count("below_threshold"),
            "skipped": summary.count("skipped"),
            "notifications_sent": summary.notifications_sent,
            "alerts_fired": summary.alerts_fired,
        }));
    }
}

pub fn outcome_event(symbol: &str, outcome: &SymbolOutcome, at: DateTime<Utc>) -> Value {
    let mut event = json!({
        "ts": now_iso(),
        "kind": "symbol_outcome",
        "at": at.to_rfc3339_opts(SecondsFormat::Secs, true),
        "symbol": symbol,
        "outcome": outcome.label(),
    });

    if let Some(decision) = outcome.decision() {
        event["decision"] = serde_json::to_value(decision).unwrap_or(Value::Null);
    }

    match outcome {
        SymbolOutcome::Alerted {
            notified,
            persisted,
            ..
        } => {
            event["alert_id"] = json!(uuid::Uuid::new_v4().to_string());
            event["notified"] = json!(notified);
            event["persisted"] = json!(persisted);
        }
        SymbolOutcome::Skipped { reason } => {
            event["reason"] = json!(reason.to_string());
        }
        _ => {}
    }

    event
}
