//! Alert delivery.
//!
//! Formats decisions into human-readable messages and ships them through a
//! `common::Notifier` implementation.

pub mod log;
pub mod message;
pub mod webhook;

pub use log::LogNotifier;
pub use message::AlertMessage;
pub use webhook::WebhookNotifier;
