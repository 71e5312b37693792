use bytes::{Buf, Bytes, BytesMut};
use std::time::{Duration, Instant};

use super::{crc::verify_crc, MAX_FRAME_LEN, MIN_REQUEST_LEN};

/// Accumulates raw serial bytes into candidate request frames.
///
/// A partial frame is only kept until `timeout` has passed since its first
/// byte arrived; after that the buffer is dropped and framing restarts.
#[derive(Debug)]
pub struct FrameAssembler {
    buffer: BytesMut,
    started_at: Option<Instant>,
    timeout: Duration,
}

impl FrameAssembler {
    pub fn new(timeout: Duration) -> Self {
        Self {
            buffer: BytesMut::with_capacity(MAX_FRAME_LEN),
            started_at: None,
            timeout,
        }
    }

    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    pub fn push(&mut self, data: &[u8], now: Instant) {
        if data.is_empty() {
            return;
        }
        if self.buffer.is_empty() {
            self.started_at = Some(now);
        }
        self.buffer.extend_from_slice(data);

        if self.buffer.len() > MAX_FRAME_LEN {
            log::debug!(
                "Discarding {} buffered bytes: exceeds RTU frame size",
                self.buffer.len()
            );
            self.reset();
        }
    }

    /// Take the next complete candidate frame, if enough bytes are buffered.
    pub fn next_frame(&mut self) -> Option<Bytes> {
        let len = expected_request_len(&self.buffer)?;
        if self.buffer.len() < len {
            return None;
        }
        let frame = self.buffer.split_to(len).freeze();
        // leftover bytes start a new frame window
        self.started_at = if self.buffer.is_empty() {
            None
        } else {
            Some(Instant::now())
        };
        Some(frame)
    }

    /// Drop a stale partial frame. Returns the number of bytes discarded.
    pub fn expire(&mut self, now: Instant) -> Option<usize> {
        let started = self.started_at?;
        if now.saturating_duration_since(started) <= self.timeout {
            return None;
        }
        let dropped = self.buffer.len();
        self.reset();
        Some(dropped)
    }

    /// Hand back a candidate that failed to decode.
    ///
    /// Its first byte is discarded and the rest is put back in front of the
    /// buffer. If a CRC-valid request is already buffered further on, the bytes
    /// before it are skipped too. Returns the number of bytes discarded.
    pub fn resync(&mut self, rejected: &[u8]) -> usize {
        let mut rebuilt = BytesMut::with_capacity(MAX_FRAME_LEN);
        rebuilt.extend_from_slice(rejected.get(1..).unwrap_or(&[]));
        rebuilt.extend_from_slice(&self.buffer);
        self.buffer = rebuilt;

        let skipped = salvage_offset(&self.buffer).unwrap_or(0);
        self.buffer.advance(skipped);
        if self.buffer.is_empty() {
            self.started_at = None;
        } else if self.started_at.is_none() {
            self.started_at = Some(Instant::now());
        }
        1 + skipped
    }

    pub fn reset(&mut self) {
        self.buffer.advance(self.buffer.len());
        self.started_at = None;
    }
}

/// Length of the request starting at `buf[0]`, judged by its function code.
fn expected_request_len(buf: &[u8]) -> Option<usize> {
    let function_code = *buf.get(1)?;
    match function_code {
        // Write Multiple Coils / Registers carry a byte count at offset 6
        0x0F | 0x10 => {
            let byte_count = *buf.get(6)? as usize;
            Some((9 + byte_count).min(MAX_FRAME_LEN))
        }
        _ => Some(MIN_REQUEST_LEN),
    }
}

/// Offset of the first buffered request whose CRC checks out.
fn salvage_offset(buf: &[u8]) -> Option<usize> {
    (0..buf.len()).find(|&start| {
        let slice = &buf[start..];
        match expected_request_len(slice) {
            Some(len) if len <= slice.len() => {
                let (body, crc) = slice[..len].split_at(len - 2);
                verify_crc(body, u16::from_le_bytes([crc[0], crc[1]]))
            }
            _ => false,
        }
    })
}
