//! Unified error type for the stock-alert-bot.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Market data unavailable for {symbol}: {message}")]
    DataUnavailable { symbol: String, message: String },

    #[error("Record store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Notification failed for {symbol}: {message}")]
    NotifyFailed { symbol: String, message: String },

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    pub fn data_unavailable(symbol: &str, message: impl Into<String>) -> Self {
        Self::DataUnavailable {
            symbol: symbol.to_string(),
            message: message.into(),
        }
    }

    pub fn notify_failed(symbol: &str, message: impl Into<String>) -> Self {
        Self::NotifyFailed {
            symbol: symbol.to_string(),
            message: message.into(),
        }
    }
}
