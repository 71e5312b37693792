mod crc;
mod frame;
mod header;
mod response;
mod slave_holdings;

pub use crc::{append_crc, crc16_modbus, verify_crc};
pub use frame::FrameAssembler;
pub use header::{decode_request, DecodeError, RequestFrame};
pub use response::{ExceptionCode, ExceptionFrame, ResponseDecodeError, ResponseFrame, SlaveReply};
pub use slave_holdings::build_slave_holdings_reply;

/// The only function code served by this slave.
pub const READ_HOLDING_REGISTERS: u8 = 0x03;

/// High bit set on the function code of an exception reply.
pub const EXCEPTION_FLAG: u8 = 0x80;

/// Address + function + start (2) + count (2) + CRC (2)
pub const MIN_REQUEST_LEN: usize = 8;

/// RTU ADU limit: address + 253 byte PDU + CRC
pub const MAX_FRAME_LEN: usize = 256;

/// Registers that fit in one Read Holding Registers reply: (253 - 2) / 2
pub const MAX_READ_REGISTERS: u16 = 125;
