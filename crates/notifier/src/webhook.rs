//! Webhook notifier.
//!
//! POSTs a small JSON document to a configured URL. Works with chat
//! incoming-webhooks that accept a `text` field.

use std::error::Error as StdError;

use async_trait::async_trait;
use common::{Error, Notifier, Result};
use serde::Serialize;
use tracing::debug;

#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    symbol: &'a str,
    subject: &'a str,
    text: String,
}

/// HTTP webhook delivery.
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
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

impl WebhookNotifier {
    pub fn new(url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .user_agent("stock-alert-bot/0.1")
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .expect("failed to build webhook HTTP client");

        Self {
            client,
            url: url.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn send(&self, symbol: &str, subject: &str, body: &str) -> Result<()> {
        let payload = WebhookPayload {
            symbol,
            subject,
            text: format!("*{}*\n{}", subject, body),
        };

        debug!("Posting alert for {} to webhook", symbol);

        let resp = self
            .client
            .post(&self.url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| Error::notify_failed(symbol, format_reqwest_error(&e)))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::notify_failed(
                symbol,
                format!(
                    "webhook returned {}: {}",
                    status.as_u16(),
                    body.chars().take(500).collect::<String>()
                ),
            ));
        }

        Ok(())
    }
}
