use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};

use super::{crc::verify_crc, MIN_REQUEST_LEN};

/// A decoded master request. The CRC has already been checked and is not kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestFrame {
    pub unit_id: u8,
    pub function_code: u8,
    pub start_address: u16,
    pub register_count: u16,
}

/// Reasons a raw byte sequence is not a usable request. Neither is answered on
/// the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Error)]
pub enum DecodeError {
    #[display("frame too short: {len} bytes")]
    FrameTooShort { len: usize },
    #[display("CRC mismatch: computed {computed:#06x}, received {received:#06x}")]
    CrcMismatch { computed: u16, received: u16 },
}

/// Decode one RTU request frame (address, function, start, count, CRC).
pub fn decode_request(raw: &[u8]) -> Result<RequestFrame, DecodeError> {
    if raw.len() < MIN_REQUEST_LEN {
        return Err(DecodeError::FrameTooShort { len: raw.len() });
    }

    let (body, crc) = raw.split_at(raw.len() - 2);
    let received = u16::from_le_bytes([crc[0], crc[1]]);
    if !verify_crc(body, received) {
        return Err(DecodeError::CrcMismatch {
            computed: super::crc16_modbus(body),
            received,
        });
    }

    Ok(RequestFrame {
        unit_id: body[0],
        function_code: body[1],
        start_address: u16::from_be_bytes([body[2], body[3]]),
        register_count: u16::from_be_bytes([body[4], body[5]]),
    })
}

impl RequestFrame {
    /// Encode this request the way a master would put it on the wire.
    pub fn encode(&self) -> bytes::Bytes {
        use bytes::BufMut;

        let mut buf = bytes::BytesMut::with_capacity(MIN_REQUEST_LEN);
        buf.put_u8(self.unit_id);
        buf.put_u8(self.function_code);
        buf.put_u16(self.start_address);
        buf.put_u16(self.register_count);
        super::append_crc(&mut buf);
        buf.freeze()
    }
}
