//! Alert message formatting.

use common::{AlertDecision, DecisionReason};
use rust_decimal::Decimal;

/// Subject and body for one alert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertMessage {
    pub subject: String,
    pub body: String,
}

impl AlertMessage {
    pub fn compose(
        symbol: &str,
        decision: &AlertDecision,
        threshold_percent: Decimal,
        min_percent_increase: Decimal,
    ) -> Self {
        let (trend, action) = if decision.is_up() {
            ("UP", "consider selling")
        } else {
            ("DOWN", "consider buying")
        };
        let magnitude = decision.percent_change.abs();

        let subject = format!(
            "Stock Alert: {} is {} {:.2}% since start of day",
            symbol, trend, magnitude
        );

        let mut body = format!(
            "{symbol} has moved {trend} {magnitude:.2}% since open.\n\n\
             Symbol: {symbol}\n\
             Start Price: ${baseline:.2}\n\
             Current Price: ${current:.2}\n\
             Change since open: {change:.2}%\n\
             Threshold: {threshold}%, re-alert step: {step}%\n",
            baseline = decision.baseline_price,
            current = decision.current_price,
            change = decision.percent_change,
            threshold = threshold_percent,
            step = min_percent_increase,
        );
        if let DecisionReason::Escalated { delta } = decision.reason {
            body.push_str(&format!(
                "The move grew by {:.2}% since the last alert today.\n",
                delta
            ));
        }
        body.push_str(&format!(
            "\nThis move exceeds your threshold and may indicate it's time to {}.\n\n\
             Disclaimer: This is an automated notification and not financial advice.",
            action
        ));

        Self { subject, body }
    }
}
