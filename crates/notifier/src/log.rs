//! Notifier that writes alerts to the tracing log.

use async_trait::async_trait;
use common::{Notifier, Result};
use tracing::info;

/// Emits alerts as log lines. Used for dry runs and as the default channel.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

impl LogNotifier {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, symbol: &str, subject: &str, body: &str) -> Result<()> {
        info!(target: "notifier", symbol, "{}\n{}", subject, body);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_log_notifier_always_succeeds() {
        let n = LogNotifier::new();
        assert!(n.send("VOD.L", "subject", "body").await.is_ok());
    }
}
