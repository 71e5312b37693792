//! Seams between the protocol engine and the outside world.
//!
//! The slave only needs a byte pipe and a source of sensor readings. Both are
//! traits so tests can drive the actors with in-memory doubles while the
//! binary plugs in a serial port and a sample file.
use std::io::{self, Read, Write};

use kaze_protocol::{
    modbus::{RequestFrame, SlaveReply},
    SensorSample,
};

use super::request::{DropReason, TransportError};

/// Byte-oriented duplex channel to the Modbus master.
pub trait ModbusTransport: Send {
    /// Read whatever is available into `buf`.
    ///
    /// Blocks until at least one byte arrives or the transport's own read
    /// timeout passes, in which case `Ok(0)` is returned.
    fn read_bytes(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Write one complete frame.
    fn write_frame(&mut self, frame: &[u8]) -> io::Result<()>;
}

impl ModbusTransport for Box<dyn serialport::SerialPort> {
    fn read_bytes(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.read(buf) {
            Ok(n) => Ok(n),
            Err(e) if e.kind() == io::ErrorKind::TimedOut => Ok(0),
            Err(e) => Err(e),
        }
    }

    fn write_frame(&mut self, frame: &[u8]) -> io::Result<()> {
        self.write_all(frame)?;
        self.flush()
    }
}

/// Pull interface for the latest weather reading, called once per refresh.
pub trait SampleSource: Send {
    /// `None` when no usable reading is available this cycle.
    fn latest_sample(&mut self) -> Option<SensorSample>;
}

/// Observer for request actor events. All methods default to no-ops.
pub trait ModbusHook: Send + Sync {
    fn on_after_response(&self, _request: &RequestFrame, _reply: &SlaveReply) {}
    fn on_frame_dropped(&self, _reason: &DropReason) {}
    fn on_error(&self, _error: &TransportError) {}
}

/// Hook that logs every event
pub struct LoggingHook;

impl ModbusHook for LoggingHook {
    fn on_after_response(&self, request: &RequestFrame, reply: &SlaveReply) {
        match reply {
            SlaveReply::Registers(frame) => log::info!(
                "Served unit={}, address={}, values={:?}",
                request.unit_id,
                request.start_address,
                frame.values
            ),
            SlaveReply::Exception(frame) => log::info!(
                "Exception reply: unit={}, function=0x{:02X}, code={:?}",
                frame.unit_id,
                frame.function_code,
                frame.exception_code
            ),
        }
    }

    fn on_frame_dropped(&self, reason: &DropReason) {
        log::debug!("Dropped frame: {reason}");
    }

    fn on_error(&self, error: &TransportError) {
        log::warn!("Transport error: {error}");
    }
}
