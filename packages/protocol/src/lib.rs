//! Modbus RTU protocol engine for the kaze weather-station slave.
//!
//! Everything in here is free of I/O: CRC handling, request decoding, reply
//! encoding, the RTU framer, the shared register bank and the mapping from a
//! sensor sample onto registers. The `kaze` crate wires these pieces to a
//! serial transport and a sample source.

pub mod modbus;
pub mod sample;
pub mod storage;

pub use sample::{refresh, RefreshOutcome, SampleError, SampleScaling, SensorSample};
pub use storage::{BankError, RegisterBank};
