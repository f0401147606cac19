use crate::domain::model::{DailyAggregation, DateRange, Granularity};
use crate::utils::error::{EtlError, Result};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

pub const DEFAULT_TIMEZONE: &str = "America/New_York";
pub const DEFAULT_HOURLY_CUTOFF_YEAR: i32 = 2023;
pub const MIN_CUTOFF_YEAR: i32 = 1970;
pub const MAX_CUTOFF_YEAR: i32 = 9999;

/// Linear calibration `pm25 * pm2.5_atm - humidity * humidity + intercept`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CorrectionCoefficients {
    pub pm25: f64,
    pub humidity: f64,
    pub intercept: f64,
}

impl Default for CorrectionCoefficients {
    fn default() -> Self {
        Self {
            pm25: 0.524,
            humidity: 0.0862,
            intercept: 5.75,
        }
    }
}

/// Rows whose local year is `<=` the configured year are dropped after resampling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CutoffPolicy {
    pub hourly_min_year_exclusive: Option<i32>,
    pub daily_min_year_exclusive: Option<i32>,
}

impl Default for CutoffPolicy {
    fn default() -> Self {
        Self {
            hourly_min_year_exclusive: Some(DEFAULT_HOURLY_CUTOFF_YEAR),
            daily_min_year_exclusive: None,
        }
    }
}

impl CutoffPolicy {
    pub fn disabled() -> Self {
        Self {
            hourly_min_year_exclusive: None,
            daily_min_year_exclusive: None,
        }
    }

    pub fn for_granularity(&self, granularity: Granularity) -> Option<i32> {
        match granularity {
            Granularity::Hourly => self.hourly_min_year_exclusive,
            Granularity::Daily => self.daily_min_year_exclusive,
        }
    }
}

/// Everything one run needs; the same settings apply to every file of a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSettings {
    pub granularity: Granularity,
    pub timezone: Tz,
    pub correction: CorrectionCoefficients,
    pub cutoff: CutoffPolicy,
    pub daily_aggregation: DailyAggregation,
    pub date_range: DateRange,
}

impl PipelineSettings {
    pub fn new(granularity: Granularity) -> Self {
        Self {
            granularity,
            timezone: chrono_tz::America::New_York,
            correction: CorrectionCoefficients::default(),
            cutoff: CutoffPolicy::default(),
            daily_aggregation: DailyAggregation::default(),
            date_range: DateRange::default(),
        }
    }

    pub fn hourly() -> Self {
        Self::new(Granularity::Hourly)
    }

    pub fn daily() -> Self {
        Self::new(Granularity::Daily)
    }

    pub fn with_timezone_name(mut self, name: &str) -> Result<Self> {
        self.timezone = parse_timezone(name)?;
        Ok(self)
    }

    pub fn cutoff_year(&self) -> Option<i32> {
        self.cutoff.for_granularity(self.granularity)
    }
}

pub fn parse_timezone(name: &str) -> Result<Tz> {
    name.trim()
        .parse::<Tz>()
        .map_err(|_| EtlError::UnknownTimezoneError {
            name: name.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_follow_hourly_cutoff_policy() {
        let hourly = PipelineSettings::hourly();
        assert_eq!(hourly.cutoff_year(), Some(2023));
        assert_eq!(hourly.timezone, chrono_tz::America::New_York);

        let daily = PipelineSettings::daily();
        assert_eq!(daily.cutoff_year(), None);
    }

    #[test]
    fn test_parse_timezone() {
        assert!(parse_timezone("Europe/Berlin").is_ok());
        assert!(matches!(
            parse_timezone("Eastern"),
            Err(EtlError::UnknownTimezoneError { .. })
        ));
    }
}
