//! Kaze: Modbus RTU slave for a weather station
//!
//! The protocol engine (CRC, framing, request processing, register bank) lives
//! in the `kaze_protocol` package and is re-exported as [`protocol`]. This
//! crate adds the two actors that share the register bank, the seams they use
//! to reach the outside world, and the pieces the `kaze` binary is assembled
//! from.

pub mod api;
#[doc(hidden)]
pub mod boot;
#[doc(hidden)]
pub mod cli;
pub mod core;

pub use kaze_protocol as protocol;
