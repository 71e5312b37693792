//! Holding register storage shared between the refresh and request actors.

use derive_more::{Display, Error};
use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Error)]
#[display("register range {start}..{start}+{count} outside bank of {len}")]
pub struct BankError {
    pub start: u16,
    pub count: usize,
    pub len: usize,
}

/// Fixed-size bank of 16-bit holding registers.
///
/// Cloning yields another handle to the same registers. Every operation takes
/// the lock for the in-memory copy only, so a reader sees either all or none
/// of a concurrent write.
#[derive(Debug, Clone)]
pub struct RegisterBank {
    registers: Arc<Mutex<Vec<u16>>>,
}

impl RegisterBank {
    /// A bank of `len` registers, all zero.
    pub fn new(len: usize) -> Self {
        Self {
            registers: Arc::new(Mutex::new(vec![0; len])),
        }
    }

    pub fn len(&self) -> usize {
        self.registers.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy out `count` registers starting at `start`.
    pub fn read(&self, start: u16, count: u16) -> Result<Vec<u16>, BankError> {
        let registers = self.registers.lock();
        let range = checked_range(start, count as usize, registers.len())?;
        Ok(registers[range].to_vec())
    }

    /// Store `values` from `start`, clamping each one into `0..=65535`.
    pub fn write(&self, start: u16, values: &[i64]) -> Result<(), BankError> {
        let clamped: Vec<u16> = values
            .iter()
            .map(|value| (*value).clamp(0, u16::MAX as i64) as u16)
            .collect();

        let mut registers = self.registers.lock();
        let range = checked_range(start, clamped.len(), registers.len())?;
        registers[range].copy_from_slice(&clamped);
        Ok(())
    }

    /// Copy of the whole bank.
    pub fn snapshot(&self) -> Vec<u16> {
        self.registers.lock().clone()
    }
}

fn checked_range(
    start: u16,
    count: usize,
    len: usize,
) -> Result<std::ops::Range<usize>, BankError> {
    let begin = start as usize;
    let end = begin + count;
    if count == 0 || end > len {
        return Err(BankError { start, count, len });
    }
    Ok(begin..end)
}
