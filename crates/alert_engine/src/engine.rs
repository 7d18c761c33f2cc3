//! Alert-decision engine.
//!
//! Pure evaluation of one symbol's session move against the alert
//! threshold and the same-day notification record. No I/O happens here;
//! the sweep fetches inputs and persists the record this module builds.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use common::config::AlertConfig;
use common::{AlertDecision, DecisionReason, NotificationRecord, PriceSeries};
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::debug;

/// Reasons a series cannot be evaluated. The caller skips the symbol.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvaluationError {
    #[error("no price data for {symbol}")]
    NoData { symbol: String },

    #[error("baseline price for {symbol} is zero")]
    InvalidBaseline { symbol: String },

    #[error("percent change for {symbol} is out of decimal range")]
    Overflow { symbol: String },

    #[error("latest price for {symbol} is {age_secs}s old (max {max_age_secs}s)")]
    StaleData {
        symbol: String,
        age_secs: i64,
        max_age_secs: u64,
    },
}

/// Evaluate a session move against the threshold and the prior record.
///
/// `percent_change = (last - first) / first * 100`. Returns `fire = true`
/// when the move is at least `threshold_percent` in magnitude and either no
/// alert went out on `today`, or the magnitude grew by at least
/// `min_incremental_percent` since that alert.
pub fn evaluate(
    series: &PriceSeries,
    threshold_percent: Decimal,
    min_incremental_percent: Decimal,
    prior: Option<&NotificationRecord>,
    today: NaiveDate,
) -> Result<AlertDecision, EvaluationError> {
    let (Some(first), Some(last)) = (series.first(), series.last()) else {
        return Err(EvaluationError::NoData {
            symbol: series.symbol().to_string(),
        });
    };

    let baseline = first.price;
    let current = last.price;
    if baseline.is_zero() {
        return Err(EvaluationError::InvalidBaseline {
            symbol: series.symbol().to_string(),
        });
    }

    let percent_change = current
        .checked_sub(baseline)
        .and_then(|diff| diff.checked_div(baseline))
        .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
        .ok_or_else(|| EvaluationError::Overflow {
            symbol: series.symbol().to_string(),
        })?;
    let decision = |fire: bool, reason: DecisionReason| AlertDecision {
        fire,
        percent_change,
        baseline_price: baseline,
        current_price: current,
        reason,
    };

    if percent_change.abs() < threshold_percent {
        return Ok(decision(false, DecisionReason::BelowThreshold));
    }

    let notified_today = prior.filter(|r| r.last_notified_date == Some(today));
    let Some(record) = notified_today else {
        return Ok(decision(true, DecisionReason::FirstAlertOfDay));
    };

    let last_diff = record.last_percent_diff.unwrap_or(Decimal::ZERO);
    let delta = percent_change.abs() - last_diff.abs();
    debug!(
        "{}: already alerted today at {}%, now {}% (delta {})",
        series.symbol(),
        last_diff,
        percent_change,
        delta
    );

    if delta < min_incremental_percent {
        Ok(decision(false, DecisionReason::Suppressed { delta }))
    } else {
        Ok(decision(true, DecisionReason::Escalated { delta }))
    }
}

/// The record to persist after `decision`, or `None` when nothing fired.
pub fn next_record(
    symbol: &str,
    decision: &AlertDecision,
    today: NaiveDate,
) -> Option<NotificationRecord> {
    if !decision.fire {
        return None;
    }
    Some(NotificationRecord {
        symbol: symbol.to_string(),
        last_notified_date: Some(today),
        last_percent_diff: Some(decision.percent_change),
        expires_at: expiry_for(today),
    })
}

/// Midnight at the start of the UTC day after `today`.
pub fn expiry_for(today: NaiveDate) -> DateTime<Utc> {
    today
        .succ_opt()
        .unwrap_or(today)
        .and_time(NaiveTime::MIN)
        .and_utc()
}

/// Engine bound to configured thresholds.
#[derive(Debug, Clone)]
pub struct AlertDecisionEngine {
    pub config: AlertConfig,
}

impl AlertDecisionEngine {
    pub fn new(config: AlertConfig) -> Self {
        Self { config }
    }

    pub fn evaluate(
        &self,
        series: &PriceSeries,
        prior: Option<&NotificationRecord>,
        today: NaiveDate,
    ) -> Result<AlertDecision, EvaluationError> {
        evaluate(
            series,
            self.config.threshold_percent,
            self.config.min_percent_increase,
            prior,
            today,
        )
    }

    /// Reject a series whose latest sample is older than
    /// `max_data_age_secs`. Always passes when no limit is configured.
    pub fn check_freshness(
        &self,
        series: &PriceSeries,
        now: DateTime<Utc>,
    ) -> Result<(), EvaluationError> {
        let Some(max_age_secs) = self.config.max_data_age_secs else {
            return Ok(());
        };
        let Some(last) = series.last() else {
            return Err(EvaluationError::NoData {
                symbol: series.symbol().to_string(),
            });
        };

        let age_secs = (now - last.timestamp).num_seconds();
        if age_secs > i64::try_from(max_age_secs).unwrap_or(i64::MAX) {
            return Err(EvaluationError::StaleData {
                symbol: series.symbol().to_string(),
                age_secs,
                max_age_secs,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use rust_decimal_macros::dec;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
    }

    fn series(prices: &[Decimal]) -> PriceSeries {
        let start = Utc.with_ymd_and_hms(2025, 3, 3, 8, 0, 0).unwrap();
        PriceSeries::from_points(
            "X",
            prices
                .iter()
                .enumerate()
                .map(|(i, p)| (start + Duration::minutes(i as i64), *p)),
        )
    }

    fn record(date: NaiveDate, diff: Decimal) -> NotificationRecord {
        NotificationRecord {
            symbol: "X".into(),
            last_notified_date: Some(date),
            last_percent_diff: Some(diff),
            expires_at: expiry_for(date),
        }
    }

    #[test]
    fn test_percent_change_sign_and_value() {
        let up = evaluate(&series(&[dec!(100), dec!(103)]), dec!(2), dec!(1), None, day(3)).unwrap();
        assert_eq!(up.percent_change, dec!(3));
        assert_eq!(up.baseline_price, dec!(100));
        assert_eq!(up.current_price, dec!(103));
        assert!(up.is_up());

        let down =
            evaluate(&series(&[dec!(80), dec!(101), dec!(78)]), dec!(2), dec!(1), None, day(3))
                .unwrap();
        assert_eq!(down.percent_change, dec!(-2.5));
        assert!(down.fire);
        assert!(!down.is_up());
    }

    #[test]
    fn test_percent_change_matches_formula() {
        let cases = [
            (dec!(187.42), dec!(190.01)),
            (dec!(3.1), dec!(2.9)),
            (dec!(1), dec!(1)),
            (dec!(0.0001), dec!(12345.6789)),
        ];
        for (p0, p1) in cases {
            let d = evaluate(&series(&[p0, p1]), dec!(1000000), dec!(1), None, day(3)).unwrap();
            assert_eq!(d.percent_change, (p1 - p0) / p0 * dec!(100));
        }
    }

    #[test]
    fn test_below_threshold_never_fires() {
        let prior = record(day(2), dec!(10));
        for prior in [None, Some(&prior)] {
            let d = evaluate(&series(&[dec!(100), dec!(101.99)]), dec!(2), dec!(1), prior, day(3))
                .unwrap();
            assert!(!d.fire);
            assert_eq!(d.reason, DecisionReason::BelowThreshold);
        }

        let down = evaluate(&series(&[dec!(100), dec!(98.5)]), dec!(2), dec!(1), None, day(3)).unwrap();
        assert!(!down.fire);
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let d = evaluate(&series(&[dec!(100), dec!(98)]), dec!(2), dec!(1), None, day(3)).unwrap();
        assert!(d.fire);
        assert_eq!(d.reason, DecisionReason::FirstAlertOfDay);
    }

    #[test]
    fn test_first_ever_alert_fires() {
        let d = evaluate(&series(&[dec!(100), dec!(102.5)]), dec!(2.0), dec!(1.0), None, day(3))
            .unwrap();
        assert_eq!(d.percent_change, dec!(2.5));
        assert!(d.fire);
    }

    #[test]
    fn test_same_day_small_growth_is_suppressed() {
        let prior = record(day(3), dec!(3.0));
        let d = evaluate(&series(&[dec!(100), dec!(103.5)]), dec!(2), dec!(1.0), Some(&prior), day(3))
            .unwrap();
        assert!(!d.fire);
        assert_eq!(d.reason, DecisionReason::Suppressed { delta: dec!(0.5) });
    }

    #[test]
    fn test_same_day_escalation_fires() {
        let prior = record(day(3), dec!(3.0));
        let d = evaluate(&series(&[dec!(100), dec!(104.2)]), dec!(2), dec!(1.0), Some(&prior), day(3))
            .unwrap();
        assert!(d.fire);
        assert_eq!(d.reason, DecisionReason::Escalated { delta: dec!(1.2) });
    }

    #[test]
    fn test_escalation_compares_magnitudes() {
        // Was up 3%, now down 4.1%: magnitude grew by 1.1.
        let prior = record(day(3), dec!(3.0));
        let d = evaluate(&series(&[dec!(100), dec!(95.9)]), dec!(2), dec!(1), Some(&prior), day(3))
            .unwrap();
        assert!(d.fire);

        // Was down 3%, now down 2.5%: shrinking moves stay quiet.
        let prior = record(day(3), dec!(-3.0));
        let d = evaluate(&series(&[dec!(100), dec!(97.5)]), dec!(2), dec!(1), Some(&prior), day(3))
            .unwrap();
        assert!(!d.fire);
    }

    #[test]
    fn test_exact_increment_refires() {
        let prior = record(day(3), dec!(3.0));
        let d = evaluate(&series(&[dec!(100), dec!(104)]), dec!(2), dec!(1), Some(&prior), day(3))
            .unwrap();
        assert!(d.fire);
    }

    #[test]
    fn test_prior_from_other_day_is_ignored() {
        let prior = record(day(2), dec!(9.0));
        let d = evaluate(&series(&[dec!(100), dec!(103)]), dec!(2), dec!(1), Some(&prior), day(3))
            .unwrap();
        assert!(d.fire);
        assert_eq!(d.reason, DecisionReason::FirstAlertOfDay);
    }

    #[test]
    fn test_prior_without_percent_counts_as_zero() {
        let prior = NotificationRecord {
            symbol: "X".into(),
            last_notified_date: Some(day(3)),
            last_percent_diff: None,
            expires_at: expiry_for(day(3)),
        };
        let d = evaluate(&series(&[dec!(100), dec!(102)]), dec!(2), dec!(1), Some(&prior), day(3))
            .unwrap();
        assert_eq!(d.reason, DecisionReason::Escalated { delta: dec!(2) });
    }

    #[test]
    fn test_out_of_range_move_is_overflow_not_panic() {
        let err = evaluate(
            &series(&[dec!(0.0001), dec!(10000000000000000000000000)]),
            dec!(2),
            dec!(1),
            None,
            day(3),
        )
        .unwrap_err();
        assert_eq!(err, EvaluationError::Overflow { symbol: "X".into() });
    }

    #[test]
    fn test_zero_baseline_is_invalid() {
        let err = evaluate(&series(&[dec!(0), dec!(5)]), dec!(2), dec!(1), None, day(3)).unwrap_err();
        assert_eq!(err, EvaluationError::InvalidBaseline { symbol: "X".into() });
    }

    #[test]
    fn test_empty_series_is_no_data() {
        let err = evaluate(&series(&[]), dec!(2), dec!(1), None, day(3)).unwrap_err();
        assert_eq!(err, EvaluationError::NoData { symbol: "X".into() });
    }

    #[test]
    fn test_evaluate_is_idempotent() {
        let s = series(&[dec!(100), dec!(101), dec!(103.4)]);
        let prior = record(day(3), dec!(3.0));
        let a = evaluate(&s, dec!(2), dec!(1), Some(&prior), day(3));
        let b = evaluate(&s, dec!(2), dec!(1), Some(&prior), day(3));
        assert_eq!(a, b);
    }

    #[test]
    fn test_next_record_only_when_fired() {
        let fired = evaluate(&series(&[dec!(100), dec!(103)]), dec!(2), dec!(1), None, day(3)).unwrap();
        let rec = next_record("X", &fired, day(3)).expect("fired decision yields a record");
        assert_eq!(rec.last_notified_date, Some(day(3)));
        assert_eq!(rec.last_percent_diff, Some(dec!(3)));
        assert_eq!(rec.expires_at, Utc.with_ymd_and_hms(2025, 3, 4, 0, 0, 0).unwrap());

        let quiet = evaluate(&series(&[dec!(100), dec!(101)]), dec!(2), dec!(1), None, day(3)).unwrap();
        assert!(next_record("X", &quiet, day(3)).is_none());
    }

    #[test]
    fn test_expiry_rolls_over_month_end() {
        let end = NaiveDate::from_ymd_opt(2025, 12, 31).unwrap();
        assert_eq!(expiry_for(end), Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_freshness_check() {
        let engine = AlertDecisionEngine::new(AlertConfig {
            max_data_age_secs: Some(300),
            ..AlertConfig::default()
        });
        let s = series(&[dec!(100), dec!(103)]);
        let last_ts = s.last().unwrap().timestamp;

        assert!(engine.check_freshness(&s, last_ts + Duration::seconds(300)).is_ok());
        assert_eq!(
            engine.check_freshness(&s, last_ts + Duration::seconds(301)),
            Err(EvaluationError::StaleData {
                symbol: "X".into(),
                age_secs: 301,
                max_age_secs: 300,
            })
        );

        let lenient = AlertDecisionEngine::new(AlertConfig::default());
        assert!(lenient.check_freshness(&s, last_ts + Duration::days(3)).is_ok());
    }

    #[test]
    fn test_huge_max_age_never_stale() {
        let engine = AlertDecisionEngine::new(AlertConfig {
            max_data_age_secs: Some(u64::MAX),
            ..AlertConfig::default()
        });
        let s = series(&[dec!(100), dec!(103)]);
        let last_ts = s.last().unwrap().timestamp;
        assert!(engine.check_freshness(&s, last_ts + Duration::days(30)).is_ok());
    }

    #[test]
    fn test_engine_uses_configured_thresholds() {
        let engine = AlertDecisionEngine::new(AlertConfig {
            threshold_percent: dec!(5),
            min_percent_increase: dec!(1),
            max_data_age_secs: None,
        });
        let d = engine.evaluate(&series(&[dec!(100), dec!(104)]), None, day(3)).unwrap();
        assert!(!d.fire);
    }
}
