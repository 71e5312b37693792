pub mod control;
pub mod request;
pub mod refresh;
pub mod slave;
pub mod traits;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::{sync::Arc, time::Duration};

use kaze_protocol::{modbus::MAX_READ_REGISTERS, sample::SAMPLE_REGISTER_COUNT, SampleScaling};

pub use control::SlaveControl;
pub use request::{DropReason, RequestActor, RequestOutcome, TransportError};
pub use refresh::run_refresh_loop;
pub use slave::{run_request_loop, ModbusSlave};
pub use traits::{LoggingHook, ModbusHook, ModbusTransport, SampleSource};

/// Static configuration of the slave, fixed at construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlaveConfig {
    pub unit_id: u8,
    /// Number of holding registers in the bank.
    pub register_count: u16,
    pub refresh_interval_ms: u64,
    /// How long a partial frame may wait for its remaining bytes.
    pub frame_timeout_ms: u64,
    /// Pause after a transport failure before the next attempt.
    pub error_recovery_delay_ms: u64,
    /// Consecutive transport failures after which the slave gives up.
    pub max_transport_failures: u32,
    pub scaling: SampleScaling,
}

impl Default for SlaveConfig {
    fn default() -> Self {
        Self {
            unit_id: 1,
            register_count: 12,
            refresh_interval_ms: 60_000,
            frame_timeout_ms: 1000,
            error_recovery_delay_ms: 300,
            max_transport_failures: 3,
            scaling: SampleScaling::default(),
        }
    }
}

impl SlaveConfig {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms)
    }

    pub fn frame_timeout(&self) -> Duration {
        Duration::from_millis(self.frame_timeout_ms)
    }

    pub fn error_recovery_delay(&self) -> Duration {
        Duration::from_millis(self.error_recovery_delay_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if !(1..=247).contains(&self.unit_id) {
            return Err(anyhow!(
                "Unit id {} is outside the addressable range 1..=247",
                self.unit_id
            ));
        }
        let min_registers = SAMPLE_REGISTER_COUNT as u16;
        if !(min_registers..=MAX_READ_REGISTERS).contains(&self.register_count) {
            return Err(anyhow!(
                "Register count {} must be between {min_registers} and {MAX_READ_REGISTERS}",
                self.register_count
            ));
        }
        if self.refresh_interval_ms == 0 || self.frame_timeout_ms == 0 {
            return Err(anyhow!("Refresh interval and frame timeout must be non-zero"));
        }
        if self.max_transport_failures == 0 {
            return Err(anyhow!("max_transport_failures must be at least 1"));
        }
        Ok(())
    }
}

/// Builder for the slave configuration and its hook chain.
///
/// ```no_run
/// use kaze::api::modbus::{LoggingHook, ModbusSlaveBuilder};
/// use std::sync::Arc;
///
/// let builder = ModbusSlaveBuilder::new(1)
///     .with_register_count(12)
///     .with_refresh_interval(60_000)
///     .add_hook(Arc::new(LoggingHook));
/// # Ok::<(), anyhow::Error>(())
/// ```
pub struct ModbusSlaveBuilder {
    config: SlaveConfig,
    hooks: Vec<Arc<dyn ModbusHook>>,
}

impl ModbusSlaveBuilder {
    pub fn new(unit_id: u8) -> Self {
        Self {
            config: SlaveConfig {
                unit_id,
                ..SlaveConfig::default()
            },
            hooks: Vec::new(),
        }
    }

    pub fn from_config(config: SlaveConfig) -> Self {
        Self {
            config,
            hooks: Vec::new(),
        }
    }

    pub fn with_register_count(mut self, count: u16) -> Self {
        self.config.register_count = count;
        self
    }

    /// Set the refresh period in milliseconds.
    pub fn with_refresh_interval(mut self, interval_ms: u64) -> Self {
        self.config.refresh_interval_ms = interval_ms;
        self
    }

    pub fn with_frame_timeout(mut self, timeout_ms: u64) -> Self {
        self.config.frame_timeout_ms = timeout_ms;
        self
    }

    /// Set the pause after a transport failure, in milliseconds.
    pub fn with_error_recovery_delay(mut self, delay_ms: u64) -> Self {
        self.config.error_recovery_delay_ms = delay_ms;
        self
    }

    pub fn with_max_transport_failures(mut self, failures: u32) -> Self {
        self.config.max_transport_failures = failures;
        self
    }

    pub fn with_scaling(mut self, scaling: SampleScaling) -> Self {
        self.config.scaling = scaling;
        self
    }

    /// Add a hook to the chain. Hooks are called in the order they are added.
    pub fn add_hook(mut self, hook: Arc<dyn ModbusHook>) -> Self {
        self.hooks.push(hook);
        self
    }

    /// Validate and return the configuration.
    pub fn build(self) -> Result<SlaveConfig> {
        self.config.validate()?;
        Ok(self.config)
    }

    /// Validate the configuration and start both actors.
    pub fn build_slave<T, S>(self, transport: T, source: S) -> Result<ModbusSlave>
    where
        T: ModbusTransport + 'static,
        S: SampleSource + 'static,
    {
        ModbusSlave::start(self.config, transport, source, self.hooks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let config = ModbusSlaveBuilder::new(7).build().unwrap();
        assert_eq!(config.unit_id, 7);
        assert_eq!(config.register_count, 12);
        assert_eq!(config.refresh_interval(), Duration::from_secs(60));
        assert_eq!(config.max_transport_failures, 3);
    }

    #[test]
    fn test_validation() {
        assert!(ModbusSlaveBuilder::new(0).build().is_err());
        assert!(ModbusSlaveBuilder::new(248).build().is_err());
        assert!(ModbusSlaveBuilder::new(1)
            .with_register_count(10)
            .build()
            .is_err());
        assert!(ModbusSlaveBuilder::new(1)
            .with_register_count(126)
            .build()
            .is_err());
        assert!(ModbusSlaveBuilder::new(1)
            .with_register_count(125)
            .build()
            .is_ok());
        assert!(ModbusSlaveBuilder::new(1)
            .with_max_transport_failures(0)
            .build()
            .is_err());
        assert!(ModbusSlaveBuilder::new(1)
            .with_refresh_interval(0)
            .build()
            .is_err());
    }

    #[test]
    fn test_config_from_partial_toml() {
        let config: SlaveConfig = toml::from_str(
            r#"
            unit_id = 3
            refresh_interval_ms = 5000

            [scaling]
            temperature = 100.0
            "#,
        )
        .unwrap();
        assert_eq!(config.unit_id, 3);
        assert_eq!(config.register_count, 12);
        assert_eq!(config.refresh_interval_ms, 5000);
        assert_eq!(config.scaling.temperature, 100.0);
        assert_eq!(config.scaling.humidity, 100.0);
    }
}
