use anyhow::{Context, Result};
use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use std::time::Duration;

/// Open `port` as an 8N1 line without flow control.
///
/// `timeout` bounds every blocking read, so it is also how long the request
/// actor may take to notice a stop request. On Unix the port is opened in
/// exclusive mode so a second slave cannot share the line.
pub fn open_serial_port(
    port: &str,
    baud_rate: u32,
    timeout: Duration,
) -> Result<Box<dyn SerialPort>> {
    let builder = serialport::new(port, baud_rate)
        .data_bits(DataBits::Eight)
        .parity(Parity::None)
        .stop_bits(StopBits::One)
        .flow_control(FlowControl::None)
        .timeout(timeout);

    #[cfg(unix)]
    let handle: Box<dyn SerialPort> = {
        let mut native = builder
            .open_native()
            .with_context(|| format!("Failed to open serial port {port}"))?;
        native
            .set_exclusive(true)
            .with_context(|| format!("Serial port {port} is already in use"))?;
        Box::new(native)
    };

    #[cfg(not(unix))]
    let handle = builder
        .open()
        .with_context(|| format!("Failed to open serial port {port}"))?;

    log::info!("Opened {port} at {baud_rate} baud (8N1)");
    Ok(handle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_port_is_an_error() {
        let err = open_serial_port("/dev/kaze-no-such-port", 9600, Duration::from_millis(10))
            .err()
            .unwrap();
        assert!(err.to_string().contains("kaze-no-such-port"));
    }
}
