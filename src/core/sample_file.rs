//! Sensor samples read from the station's parameter log.
//!
//! The logger appends one line per reading:
//!
//! ```text
//! 2024-01-15 10:30:00,20.5,6.21,1.34,180.0,0.12
//! ```
//!
//! (timestamp, temperature, humidity, wind speed, wind direction, rainfall).
//! Only the last non-empty line is used.
use anyhow::{anyhow, Context, Result};
use chrono::NaiveDateTime;
use std::path::{Path, PathBuf};

use kaze_protocol::SensorSample;

use crate::api::modbus::SampleSource;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const FIELD_COUNT: usize = 6;

pub struct FileSampleSource {
    path: PathBuf,
}

impl FileSampleSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and parse the latest line of the file.
    pub fn read_latest(&self) -> Result<SensorSample> {
        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Error reading file {}", self.path.display()))?;
        let line = content
            .lines()
            .map(str::trim)
            .rfind(|line| !line.is_empty())
            .ok_or_else(|| anyhow!("File {} is empty", self.path.display()))?;
        parse_sample_line(line)
    }
}

impl SampleSource for FileSampleSource {
    fn latest_sample(&mut self) -> Option<SensorSample> {
        match self.read_latest() {
            Ok(sample) => Some(sample),
            Err(err) => {
                log::warn!("No sensor sample this cycle: {err:#}");
                None
            }
        }
    }
}

/// Parse one `timestamp,temp,humidity,wind_speed,wind_dir,rainfall` line.
pub fn parse_sample_line(line: &str) -> Result<SensorSample> {
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    if fields.len() != FIELD_COUNT {
        return Err(anyhow!(
            "Invalid data format: expected {FIELD_COUNT} fields, found {}",
            fields.len()
        ));
    }

    let number = |index: usize, name: &str| -> Result<f64> {
        fields[index]
            .parse::<f64>()
            .with_context(|| format!("Invalid {name} value '{}'", fields[index]))
    };

    Ok(SensorSample {
        timestamp: NaiveDateTime::parse_from_str(fields[0], TIMESTAMP_FORMAT)
            .with_context(|| format!("Invalid timestamp '{}'", fields[0]))?,
        temperature: number(1, "temperature")?,
        humidity: number(2, "humidity")?,
        wind_speed: number(3, "wind speed")?,
        wind_direction: number(4, "wind direction")?,
        rainfall: number(5, "rainfall")?,
    })
}
