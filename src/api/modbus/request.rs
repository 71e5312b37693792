//! Request actor: turns transport bytes into replies.
//!
//! `RequestActor::poll_once` is one step of the actor. It never sleeps and
//! never loops on its own, which keeps it easy to drive from tests; the
//! long-running loop lives in `slave.rs`.
use bytes::Bytes;
use derive_more::{Display, Error};
use std::{io, time::Instant};

use kaze_protocol::{
    modbus::{
        build_slave_holdings_reply, decode_request, DecodeError, FrameAssembler, RequestFrame,
        SlaveReply, MAX_FRAME_LEN,
    },
    RegisterBank,
};

use super::{traits::ModbusTransport, SlaveConfig};

/// Read or write failure on the transport.
#[derive(Debug, Display, Error)]
pub enum TransportError {
    #[display("read failed: {_0}")]
    Read(#[error(source)] io::Error),
    #[display("write failed: {_0}")]
    Write(#[error(source)] io::Error),
}

/// Why a frame produced no output.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum DropReason {
    #[display("{_0}")]
    Malformed(DecodeError),
    #[display("addressed to unit {_0}")]
    UnitIdMismatch(u8),
    #[display("partial frame of {buffered} bytes timed out")]
    PartialFrameExpired { buffered: usize },
}

/// Result of one `poll_once` step.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestOutcome {
    /// No complete frame yet.
    Idle,
    Responded {
        request: RequestFrame,
        reply: SlaveReply,
        raw: Bytes,
    },
    Dropped(DropReason),
}

pub struct RequestActor<T> {
    transport: T,
    bank: RegisterBank,
    unit_id: u8,
    assembler: FrameAssembler,
    read_buf: [u8; MAX_FRAME_LEN],
}

impl<T: ModbusTransport> RequestActor<T> {
    pub fn new(transport: T, bank: RegisterBank, config: &SlaveConfig) -> Self {
        Self {
            transport,
            bank,
            unit_id: config.unit_id,
            assembler: FrameAssembler::new(config.frame_timeout()),
            read_buf: [0; MAX_FRAME_LEN],
        }
    }

    /// Serve an already buffered frame, or read once from the transport and
    /// serve the frame that read completed.
    pub fn poll_once(&mut self) -> Result<RequestOutcome, TransportError> {
        if let Some(frame) = self.assembler.next_frame() {
            return self.handle_frame(&frame);
        }

        let n = self
            .transport
            .read_bytes(&mut self.read_buf)
            .map_err(TransportError::Read)?;
        let now = Instant::now();

        if let Some(buffered) = self.assembler.expire(now) {
            // bytes just read belong to a fresh frame, not the stale one
            self.assembler.push(&self.read_buf[..n], now);
            return Ok(RequestOutcome::Dropped(DropReason::PartialFrameExpired {
                buffered,
            }));
        }
        self.assembler.push(&self.read_buf[..n], now);

        match self.assembler.next_frame() {
            Some(frame) => self.handle_frame(&frame),
            None => Ok(RequestOutcome::Idle),
        }
    }

    fn handle_frame(&mut self, frame: &[u8]) -> Result<RequestOutcome, TransportError> {
        let request = match decode_request(frame) {
            Ok(request) => request,
            Err(err) => {
                // the real frame may start anywhere after the first byte
                let skipped = self.assembler.resync(frame);
                log::debug!("Skipped {skipped} bytes to regain frame sync");
                return Ok(RequestOutcome::Dropped(DropReason::Malformed(err)));
            }
        };

        let Some(reply) = build_slave_holdings_reply(&request, &self.bank, self.unit_id) else {
            return Ok(RequestOutcome::Dropped(DropReason::UnitIdMismatch(
                request.unit_id,
            )));
        };

        let raw = reply.encode();
        self.transport
            .write_frame(&raw)
            .map_err(TransportError::Write)?;
        log::debug!("Sent response: {:02X?}", raw.as_ref());

        Ok(RequestOutcome::Responded {
            request,
            reply,
            raw,
        })
    }
}
