use bytes::{BufMut, Bytes, BytesMut};
use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{Deserialize, Serialize};

use super::{
    append_crc, header::DecodeError, verify_crc, EXCEPTION_FLAG, MAX_READ_REGISTERS,
};

/// Exception codes this slave can answer with.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive, Serialize, Deserialize,
)]
#[repr(u8)]
pub enum ExceptionCode {
    IllegalFunction = 0x01,
    IllegalDataAddress = 0x02,
}

/// Successful Read Holding Registers reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseFrame {
    pub unit_id: u8,
    pub function_code: u8,
    pub values: Vec<u16>,
}

/// Exception reply. `function_code` already carries the 0x80 flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExceptionFrame {
    pub unit_id: u8,
    pub function_code: u8,
    pub exception_code: ExceptionCode,
}

/// What the slave puts on the wire for an addressed request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SlaveReply {
    Registers(ResponseFrame),
    Exception(ExceptionFrame),
}

impl ResponseFrame {
    /// Payload length in bytes. Callers keep `values` within
    /// `MAX_READ_REGISTERS`, which always fits the one-byte field.
    pub fn byte_count(&self) -> u8 {
        debug_assert!(self.values.len() <= MAX_READ_REGISTERS as usize);
        u8::try_from(self.values.len() * 2).unwrap_or(u8::MAX)
    }

    /// `[unit, function, byte_count] ++ values (big-endian) ++ crc (little-endian)`
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(3 + self.values.len() * 2 + 2);
        buf.put_u8(self.unit_id);
        buf.put_u8(self.function_code);
        buf.put_u8(self.byte_count());
        for value in &self.values {
            buf.put_u16(*value);
        }
        append_crc(&mut buf);
        buf.freeze()
    }

    /// Parse a slave reply the way a master does, checking CRC and byte count.
    pub fn decode(raw: &[u8]) -> Result<Self, ResponseDecodeError> {
        if raw.len() < 5 {
            return Err(DecodeError::FrameTooShort { len: raw.len() }.into());
        }
        let (body, crc) = raw.split_at(raw.len() - 2);
        let received = u16::from_le_bytes([crc[0], crc[1]]);
        if !verify_crc(body, received) {
            return Err(DecodeError::CrcMismatch {
                computed: super::crc16_modbus(body),
                received,
            }
            .into());
        }
        if body[1] & EXCEPTION_FLAG != 0 {
            return Err(ResponseDecodeError::Exception {
                function_code: body[1],
                code: body[2],
            });
        }

        let byte_count = body[2] as usize;
        let payload = &body[3..];
        if payload.len() != byte_count || byte_count % 2 != 0 {
            return Err(ResponseDecodeError::ByteCount {
                declared: byte_count,
                actual: payload.len(),
            });
        }

        Ok(Self {
            unit_id: body[0],
            function_code: body[1],
            values: payload
                .chunks_exact(2)
                .map(|chunk| u16::from_be_bytes([chunk[0], chunk[1]]))
                .collect(),
        })
    }
}

impl ExceptionFrame {
    pub fn new(unit_id: u8, request_function: u8, exception_code: ExceptionCode) -> Self {
        Self {
            unit_id,
            function_code: request_function | EXCEPTION_FLAG,
            exception_code,
        }
    }

    /// `[unit, function | 0x80, exception_code] ++ crc (little-endian)`
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(5);
        buf.put_u8(self.unit_id);
        buf.put_u8(self.function_code | EXCEPTION_FLAG);
        buf.put_u8(self.exception_code.into());
        append_crc(&mut buf);
        buf.freeze()
    }
}

impl SlaveReply {
    pub fn encode(&self) -> Bytes {
        match self {
            SlaveReply::Registers(frame) => frame.encode(),
            SlaveReply::Exception(frame) => frame.encode(),
        }
    }
}

/// Failures when a master parses a slave reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum ResponseDecodeError {
    #[display("{_0}")]
    Frame(DecodeError),
    #[display("exception reply: function {function_code:#04x}, code {code:#04x}")]
    Exception { function_code: u8, code: u8 },
    #[display("byte count {declared} does not match {actual} payload bytes")]
    ByteCount { declared: usize, actual: usize },
}

impl From<DecodeError> for ResponseDecodeError {
    fn from(err: DecodeError) -> Self {
        ResponseDecodeError::Frame(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_registers() {
        let frame = ResponseFrame {
            unit_id: 0x01,
            function_code: 0x03,
            values: vec![0x07E8, 0x0001],
        };
        let raw = frame.encode();
        assert_eq!(&raw[..7], &[0x01, 0x03, 0x04, 0x07, 0xE8, 0x00, 0x01]);
        assert_eq!(raw.len(), 9);
        let crc = super::super::crc16_modbus(&raw[..7]);
        assert_eq!(&raw[7..], &crc.to_le_bytes());
    }

    #[test]
    fn test_encode_exception_frames() {
        let illegal_address = ExceptionFrame::new(0x01, 0x03, ExceptionCode::IllegalDataAddress);
        assert_eq!(illegal_address.function_code, 0x83);
        assert_eq!(
            illegal_address.encode().as_ref(),
            &[0x01, 0x83, 0x02, 0xC0, 0xF1]
        );

        let illegal_function = ExceptionFrame::new(0x01, 0x06, ExceptionCode::IllegalFunction);
        assert_eq!(
            illegal_function.encode().as_ref(),
            &[0x01, 0x86, 0x01, 0x83, 0xA0]
        );
    }

    #[test]
    fn test_response_round_trip() {
        let frame = ResponseFrame {
            unit_id: 7,
            function_code: 3,
            values: vec![0, 1, 0x7FFF, 0x8000, 0xFFFF],
        };
        let decoded = ResponseFrame::decode(&frame.encode()).unwrap();
        assert_eq!(decoded, frame);
        assert_eq!(decoded.byte_count(), 10);
    }

    #[test]
    fn test_decode_reports_exception_reply() {
        let raw = ExceptionFrame::new(1, 3, ExceptionCode::IllegalDataAddress).encode();
        assert_eq!(
            ResponseFrame::decode(&raw),
            Err(ResponseDecodeError::Exception {
                function_code: 0x83,
                code: 0x02
            })
        );
    }

    #[test]
    fn test_decode_rejects_bad_byte_count() {
        let mut buf = BytesMut::new();
        buf.put_slice(&[0x01, 0x03, 0x04, 0x00, 0x01]);
        append_crc(&mut buf);
        assert_eq!(
            ResponseFrame::decode(&buf),
            Err(ResponseDecodeError::ByteCount {
                declared: 4,
                actual: 2
            })
        );
    }

    #[test]
    fn test_exception_code_conversion() {
        assert_eq!(u8::from(ExceptionCode::IllegalFunction), 0x01);
        assert_eq!(
            ExceptionCode::try_from(0x02u8).unwrap(),
            ExceptionCode::IllegalDataAddress
        );
        assert!(ExceptionCode::try_from(0x03u8).is_err());
    }
}
