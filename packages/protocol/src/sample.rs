//! Weather samples and their mapping onto the holding register layout.

use chrono::{Datelike, NaiveDateTime, Timelike};
use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};

use crate::storage::{BankError, RegisterBank};

/// Registers written by one refresh: six timestamp fields and five readings.
pub const SAMPLE_REGISTER_COUNT: usize = 11;

/// One reading of the weather station.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorSample {
    pub timestamp: NaiveDateTime,
    pub temperature: f64,
    pub humidity: f64,
    pub wind_speed: f64,
    pub wind_direction: f64,
    pub rainfall: f64,
}

/// Multipliers applied before a reading is rounded into a register.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SampleScaling {
    pub temperature: f64,
    pub humidity: f64,
    pub wind_speed: f64,
    pub wind_direction: f64,
    pub rainfall: f64,
}

impl Default for SampleScaling {
    fn default() -> Self {
        Self {
            temperature: 10.0,
            humidity: 100.0,
            wind_speed: 100.0,
            wind_direction: 10.0,
            rainfall: 100.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Error)]
pub enum SampleError {
    #[display("{field} is not a finite number")]
    NotFinite { field: &'static str },
}

impl SensorSample {
    /// Register values in bank order, before clamping.
    pub fn to_register_values(
        &self,
        scaling: &SampleScaling,
    ) -> Result<[i64; SAMPLE_REGISTER_COUNT], SampleError> {
        let scaled = |field: &'static str, value: f64, factor: f64| {
            let value = (value * factor).round();
            if value.is_finite() {
                Ok(value as i64)
            } else {
                Err(SampleError::NotFinite { field })
            }
        };

        let ts = self.timestamp;
        Ok([
            ts.year() as i64,
            ts.month() as i64,
            ts.day() as i64,
            ts.hour() as i64,
            ts.minute() as i64,
            ts.second() as i64,
            scaled("temperature", self.temperature, scaling.temperature)?,
            scaled("humidity", self.humidity, scaling.humidity)?,
            scaled("wind_speed", self.wind_speed, scaling.wind_speed)?,
            scaled("wind_direction", self.wind_direction, scaling.wind_direction)?,
            scaled("rainfall", self.rainfall, scaling.rainfall)?,
        ])
    }
}

/// Result of one refresh cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    Written(Vec<u16>),
    SampleUnavailable,
    Rejected(SampleError),
}

/// Write `sample` into the bank starting at register 0.
///
/// Without a usable sample the bank keeps its previous values.
pub fn refresh(
    bank: &RegisterBank,
    sample: Option<&SensorSample>,
    scaling: &SampleScaling,
) -> Result<RefreshOutcome, BankError> {
    let Some(sample) = sample else {
        return Ok(RefreshOutcome::SampleUnavailable);
    };
    let values = match sample.to_register_values(scaling) {
        Ok(values) => values,
        Err(err) => return Ok(RefreshOutcome::Rejected(err)),
    };

    bank.write(0, &values)?;
    Ok(RefreshOutcome::Written(bank.read(0, SAMPLE_REGISTER_COUNT as u16)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sample() -> SensorSample {
        SensorSample {
            timestamp: NaiveDate::from_ymd_opt(2024, 1, 15)
                .unwrap()
                .and_hms_opt(10, 30, 0)
                .unwrap(),
            temperature: 20.5,
            humidity: 6.21,
            wind_speed: 1.34,
            wind_direction: 180.0,
            rainfall: 0.12,
        }
    }

    #[test]
    fn test_register_layout() {
        let values = sample()
            .to_register_values(&SampleScaling::default())
            .unwrap();
        assert_eq!(values, [2024, 1, 15, 10, 30, 0, 205, 621, 134, 1800, 12]);
    }

    #[test]
    fn test_rounding_not_truncation() {
        let sample = SensorSample {
            // 0.29 * 100 is 28.999999999999996 in binary floating point
            rainfall: 0.29,
            temperature: -0.04,
            ..sample()
        };
        let values = sample.to_register_values(&SampleScaling::default()).unwrap();
        assert_eq!(values[10], 29);
        assert_eq!(values[6], 0);
    }

    #[test]
    fn test_refresh_writes_and_clamps() {
        let bank = RegisterBank::new(12);
        let sample = SensorSample {
            temperature: -12.0,
            humidity: 1000.0,
            ..sample()
        };
        let outcome = refresh(&bank, Some(&sample), &SampleScaling::default()).unwrap();
        let expected = vec![2024, 1, 15, 10, 30, 0, 0, 65_535, 134, 1800, 12];
        assert_eq!(outcome, RefreshOutcome::Written(expected.clone()));
        assert_eq!(&bank.snapshot()[..11], expected.as_slice());
        assert_eq!(bank.snapshot()[11], 0);
    }

    #[test]
    fn test_refresh_without_sample_is_idempotent() {
        let bank = RegisterBank::new(12);
        refresh(&bank, Some(&sample()), &SampleScaling::default()).unwrap();
        let before = bank.snapshot();
        for _ in 0..10 {
            assert_eq!(
                refresh(&bank, None, &SampleScaling::default()).unwrap(),
                RefreshOutcome::SampleUnavailable
            );
        }
        assert_eq!(bank.snapshot(), before);
    }

    #[test]
    fn test_refresh_rejects_non_finite_readings() {
        let bank = RegisterBank::new(12);
        refresh(&bank, Some(&sample()), &SampleScaling::default()).unwrap();
        let before = bank.snapshot();

        let broken = SensorSample {
            wind_speed: f64::NAN,
            ..sample()
        };
        assert_eq!(
            refresh(&bank, Some(&broken), &SampleScaling::default()).unwrap(),
            RefreshOutcome::Rejected(SampleError::NotFinite {
                field: "wind_speed"
            })
        );
        assert_eq!(bank.snapshot(), before);
    }

    #[test]
    fn test_refresh_needs_room_for_layout() {
        let bank = RegisterBank::new(6);
        assert!(refresh(&bank, Some(&sample()), &SampleScaling::default()).is_err());
        assert_eq!(bank.snapshot(), vec![0; 6]);
    }

    #[test]
    fn test_scaling_defaults_from_partial_config() {
        let scaling: SampleScaling = serde_json::from_str(r#"{"temperature": 100.0}"#).unwrap();
        assert_eq!(scaling.temperature, 100.0);
        assert_eq!(scaling.humidity, 100.0);
        assert_eq!(scaling.wind_direction, 10.0);
    }
}
