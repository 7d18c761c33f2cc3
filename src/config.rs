//! Configuration loader: merges env vars, .env file, and config.toml.

use std::path::Path;
use std::str::FromStr;

use common::config::{BotConfig, NotifierKind, StoreBackend};
use common::Error;
use rust_decimal::Decimal;

const DEFAULT_CONFIG_FILE: &str = "config.toml";

fn parse_non_negative_decimal(raw: &str, env_name: &str) -> Result<Decimal, Error> {
    let parsed = Decimal::from_str(raw.trim())
        .map_err(|_| Error::Config(format!("{env_name} must be a number >= 0")))?;
    if parsed.is_sign_negative() {
        return Err(Error::Config(format!("{env_name} must be a number >= 0")));
    }
    Ok(parsed)
}

fn parse_u64(raw: &str, env_name: &str) -> Result<u64, Error> {
    raw.trim()
        .parse::<u64>()
        .map_err(|_| Error::Config(format!("{env_name} must be an integer >= 0")))
}

fn parse_bool(raw: &str) -> bool {
    let lowered = raw.trim().to_ascii_lowercase();
    lowered != "0" && lowered != "false" && lowered != "no" && lowered != "off"
}

fn parse_symbols(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn validate_config(config: &BotConfig) -> Result<(), Error> {
    let mut issues: Vec<String> = Vec::new();

    if config.symbols.iter().all(|s| s.trim().is_empty()) {
        issues.push("symbols must contain at least one symbol".into());
    }

    if config.alert.threshold_percent.is_sign_negative() {
        issues.push("alert.threshold_percent must be >= 0".into());
    }
    if config.alert.min_percent_increase.is_sign_negative() {
        issues.push("alert.min_percent_increase must be >= 0".into());
    }

    if config.quotes.period.trim().is_empty() {
        issues.push("quotes.period must not be empty".into());
    }
    if config.quotes.interval.trim().is_empty() {
        issues.push("quotes.interval must not be empty".into());
    }
    if config.quotes.request_timeout_secs == 0 {
        issues.push("quotes.request_timeout_secs must be > 0".into());
    }
    if config.quotes.requests_per_second == 0 {
        issues.push("quotes.requests_per_second must be > 0".into());
    }

    match (
        config.market_hours.open_time(),
        config.market_hours.close_time(),
    ) {
        (Ok(open), Ok(close)) => {
            if close <= open {
                issues.push("market_hours.close must be after market_hours.open".into());
            }
        }
        (open, close) => {
            for err in [open.err(), close.err()].into_iter().flatten() {
                issues.push(err.to_string());
            }
        }
    }
    if config.market_hours.utc_offset_minutes.unsigned_abs() >= 24 * 60 {
        issues.push("market_hours.utc_offset_minutes must be within +/- 1439".into());
    }

    if config.store.backend == StoreBackend::File && config.store.path.trim().is_empty() {
        issues.push("store.path is required for the file backend".into());
    }

    if config.notifier.kind == NotifierKind::Webhook {
        match url::Url::parse(config.notifier.webhook_url.trim()) {
            Ok(u) if u.scheme() == "http" || u.scheme() == "https" => {}
            Ok(u) => issues.push(format!(
                "notifier.webhook_url must be http(s), got scheme {:?}",
                u.scheme()
            )),
            Err(e) => issues.push(format!(
                "NOTIFY_WEBHOOK_URL is required for the webhook notifier ({e})"
            )),
        }
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(Error::Config(format!(
            "Invalid config:\n - {}",
            issues.join("\n - ")
        )))
    }
}

/// Apply environment overrides using `lookup` to read variables.
fn apply_env_overrides<F>(config: &mut BotConfig, lookup: F) -> Result<(), Error>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(raw) = lookup("STOCK_SYMBOLS") {
        config.symbols = parse_symbols(&raw);
    }
    if let Some(raw) = lookup("THRESHOLD_PERCENT") {
        config.alert.threshold_percent = parse_non_negative_decimal(&raw, "THRESHOLD_PERCENT")?;
    }
    if let Some(raw) = lookup("MIN_PERCENT_INCREASE") {
        config.alert.min_percent_increase =
            parse_non_negative_decimal(&raw, "MIN_PERCENT_INCREASE")?;
    }
    if let Some(raw) = lookup("MAX_DATA_AGE_SECS") {
        let secs = parse_u64(&raw, "MAX_DATA_AGE_SECS")?;
        config.alert.max_data_age_secs = (secs > 0).then_some(secs);
    }
    if let Some(raw) = lookup("QUOTE_PERIOD") {
        config.quotes.period = raw.trim().to_string();
    }
    if let Some(raw) = lookup("QUOTE_INTERVAL") {
        config.quotes.interval = raw.trim().to_string();
    }
    if let Some(raw) = lookup("QUOTE_TIMEOUT_SECS") {
        config.quotes.request_timeout_secs = parse_u64(&raw, "QUOTE_TIMEOUT_SECS")?;
    }
    if let Some(raw) = lookup("MARKET_HOURS_ENABLED") {
        config.market_hours.enabled = parse_bool(&raw);
    }
    if let Some(raw) = lookup("MARKET_OPEN") {
        config.market_hours.open = raw.trim().to_string();
    }
    if let Some(raw) = lookup("MARKET_CLOSE") {
        config.market_hours.close = raw.trim().to_string();
    }
    if let Some(raw) = lookup("MARKET_UTC_OFFSET_MINUTES") {
        config.market_hours.utc_offset_minutes = raw.trim().parse::<i32>().map_err(|_| {
            Error::Config("MARKET_UTC_OFFSET_MINUTES must be an integer".into())
        })?;
    }
    if let Some(raw) = lookup("STORE_BACKEND") {
        config.store.backend = match raw.trim().to_ascii_lowercase().as_str() {
            "file" => StoreBackend::File,
            "memory" => StoreBackend::Memory,
            _ => {
                return Err(Error::Config(
                    "STORE_BACKEND must be one of: file, memory".into(),
                ));
            }
        };
    }
    if let Some(raw) = lookup("STATE_PATH") {
        config.store.path = raw.trim().to_string();
    }
    if let Some(raw) = lookup("NOTIFIER") {
        config.notifier.kind = match raw.trim().to_ascii_lowercase().as_str() {
            "log" => NotifierKind::Log,
            "webhook" => NotifierKind::Webhook,
            _ => {
                return Err(Error::Config(
                    "NOTIFIER must be one of: log, webhook".into(),
                ));
            }
        };
    }
    if let Some(raw) = lookup("NOTIFY_WEBHOOK_URL") {
        config.notifier.webhook_url = raw.trim().to_string();
    }

    Ok(())
}

fn read_config_file(path: &Path) -> Result<BotConfig, Error> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?;
    toml::from_str(&contents)
        .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))
}

/// Load bot configuration from environment and optional config file.
///
/// An explicit `path` must exist; the default `config.toml` is optional.
pub fn load_config(path: Option<&Path>) -> Result<BotConfig, Error> {
    // 1. Load .env file from project root or parent directories.
    if let Err(e) = dotenvy::dotenv() {
        tracing::debug!("No .env file loaded: {}", e);
    }

    // 2. Defaults, replaced by the config file if there is one.
    let config_path = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));
    let mut config = if path.is_some() || config_path.exists() {
        read_config_file(config_path)?
    } else {
        BotConfig::default()
    };

    // 3. Override with environment variables (highest priority).
    apply_env_overrides(&mut config, |name| std::env::var(name).ok())?;

    validate_config(&config)?;

    Ok(config)
}
