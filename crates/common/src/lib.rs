//! Shared types, collaborator traits, config, and error definitions for the
//! stock-alert-bot.

pub mod config;
pub mod error;
pub mod ports;
pub mod types;

pub use config::BotConfig;
pub use error::Error;
pub use ports::{MarketClock, Notifier, PriceSource, RecordStore};
pub use types::*;

/// Convenience Result alias.
pub type Result<T> = std::result::Result<T, Error>;
