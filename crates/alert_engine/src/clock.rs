//! Trading-session gate.

use chrono::{DateTime, Datelike, FixedOffset, NaiveTime, Offset, Utc, Weekday};
use common::config::MarketHoursConfig;
use common::{Error, MarketClock};

/// Weekday session between `open` and `close` (both inclusive) at a fixed
/// UTC offset.
#[derive(Debug, Clone)]
pub struct SessionClock {
    enabled: bool,
    open: NaiveTime,
    close: NaiveTime,
    offset: FixedOffset,
}

impl SessionClock {
    pub fn new(config: &MarketHoursConfig) -> Result<Self, Error> {
        let open = config.open_time()?;
        let close = config.close_time()?;
        let offset = config
            .utc_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| {
                Error::Config(format!(
                    "market_hours.utc_offset_minutes out of range: {}",
                    config.utc_offset_minutes
                ))
            })?;

        Ok(Self {
            enabled: config.enabled,
            open,
            close,
            offset,
        })
    }

    /// A clock that is always open.
    pub fn always_open() -> Self {
        Self {
            enabled: false,
            open: NaiveTime::MIN,
            close: NaiveTime::MIN,
            offset: Utc.fix(),
        }
    }
}

impl MarketClock for SessionClock {
    fn is_open(&self, now: DateTime<Utc>) -> bool {
        if !self.enabled {
            return true;
        }

        let local = now.with_timezone(&self.offset);
        if matches!(local.weekday(), Weekday::Sat | Weekday::Sun) {
            return false;
        }

        let time = local.time();
        self.open <= time && time <= self.close
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn clock(open: &str, close: &str, offset_minutes: i32) -> SessionClock {
        SessionClock::new(&MarketHoursConfig {
            enabled: true,
            open: open.into(),
            close: close.into(),
            utc_offset_minutes: offset_minutes,
        })
        .expect("valid market hours")
    }

    #[test]
    fn test_open_during_weekday_session() {
        let c = clock("08:00", "16:30", 0);
        // 2025-03-05 is a Wednesday.
        assert!(c.is_open(Utc.with_ymd_and_hms(2025, 3, 5, 12, 0, 0).unwrap()));
        assert!(!c.is_open(Utc.with_ymd_and_hms(2025, 3, 5, 7, 59, 59).unwrap()));
        assert!(!c.is_open(Utc.with_ymd_and_hms(2025, 3, 5, 16, 31, 0).unwrap()));
    }

    #[test]
    fn test_boundaries_are_inclusive() {
        let c = clock("08:00", "16:30", 0);
        assert!(c.is_open(Utc.with_ymd_and_hms(2025, 3, 5, 8, 0, 0).unwrap()));
        assert!(c.is_open(Utc.with_ymd_and_hms(2025, 3, 5, 16, 30, 0).unwrap()));
    }

    #[test]
    fn test_closed_on_weekends() {
        let c = clock("08:00", "16:30", 0);
        assert!(!c.is_open(Utc.with_ymd_and_hms(2025, 3, 8, 12, 0, 0).unwrap()));
        assert!(!c.is_open(Utc.with_ymd_and_hms(2025, 3, 9, 12, 0, 0).unwrap()));
    }

    #[test]
    fn test_offset_shifts_session() {
        // 09:00-17:30 CET is 08:00-16:30 UTC in winter.
        let c = clock("09:00", "17:30", 60);
        assert!(c.is_open(Utc.with_ymd_and_hms(2025, 3, 5, 8, 0, 0).unwrap()));
        assert!(!c.is_open(Utc.with_ymd_and_hms(2025, 3, 5, 16, 45, 0).unwrap()));
    }

    #[test]
    fn test_offset_can_change_weekday() {
        // Friday 23:30 UTC is already Saturday at UTC+2.
        let c = clock("00:00", "23:59", 120);
        assert!(!c.is_open(Utc.with_ymd_and_hms(2025, 3, 7, 23, 30, 0).unwrap()));
    }

    #[test]
    fn test_disabled_clock_is_always_open() {
        let c = SessionClock::new(&MarketHoursConfig {
            enabled: false,
            ..MarketHoursConfig::default()
        })
        .unwrap();
        assert!(c.is_open(Utc.with_ymd_and_hms(2025, 3, 9, 3, 0, 0).unwrap()));
        assert!(SessionClock::always_open().is_open(Utc.with_ymd_and_hms(2025, 3, 8, 3, 0, 0).unwrap()));
    }

    #[test]
    fn test_rejects_bad_offset() {
        let err = SessionClock::new(&MarketHoursConfig {
            utc_offset_minutes: 24 * 60,
            ..MarketHoursConfig::default()
        });
        assert!(err.is_err());

        for minutes in [i32::MIN, i32::MAX] {
            let err = SessionClock::new(&MarketHoursConfig {
                utc_offset_minutes: minutes,
                ..MarketHoursConfig::default()
            });
            assert!(matches!(err, Err(Error::Config(_))));
        }
    }
}
