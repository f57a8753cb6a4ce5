//! The rolling extranonce2 counter.

use std::fmt;

use thiserror::Error;

/// Errors from extranonce2 construction.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Extranonce2Error {
    /// The pool asked for a width outside what the job pipeline supports.
    #[error("unsupported extranonce2 size {0} (expected 1-8 bytes)")]
    InvalidSize(u8),
}

/// A fixed-width extranonce2 value.
///
/// The pool allocates each connection a window inside the coinbase scriptsig
/// and announces its width (`extranonce2_size` from `mining.subscribe`). The
/// counter is held as a `u32` and rendered zero-padded to exactly
/// `2 * size` hex digits, so every dispatched job carries a well-formed
/// coinbase regardless of how small the window is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Extranonce2 {
    value: u32,
    size: u8,
}

impl Extranonce2 {
    /// Narrowest window a pool may announce.
    pub const MIN_SIZE: u8 = 1;

    /// Widest window a pool may announce.
    pub const MAX_SIZE: u8 = 8;

    /// Create a value of the given byte width.
    ///
    /// Counters wider than the window wrap into it, keeping the rendered
    /// hex at its exact width.
    pub fn new(value: u32, size: u8) -> Result<Self, Extranonce2Error> {
        if !(Self::MIN_SIZE..=Self::MAX_SIZE).contains(&size) {
            return Err(Extranonce2Error::InvalidSize(size));
        }
        Ok(Self {
            value: value & Self::window_mask(size),
            size,
        })
    }

    fn window_mask(size: u8) -> u32 {
        if size >= 4 {
            u32::MAX
        } else {
            (1u32 << (size * 8)) - 1
        }
    }

    /// Advance to the next value, wrapping within the window.
    ///
    /// Returns true when the counter wrapped back to zero.
    pub fn increment(&mut self) -> bool {
        self.value = self.value.wrapping_add(1) & Self::window_mask(self.size);
        self.value == 0
    }

    pub fn value(&self) -> u32 {
        self.value
    }

    pub fn size(&self) -> u8 {
        self.size
    }

    /// Render as big-endian bytes, zero-padded to the window width.
    ///
    /// These are the bytes spliced into the coinbase between the pool's
    /// extranonce1 and coinbase2. They decode from the hex form produced by
    /// [`fmt::Display`].
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = vec![0u8; self.size as usize];
        let be = self.value.to_be_bytes();
        let used = (self.size as usize).min(4);
        bytes[self.size as usize - used..].copy_from_slice(&be[4 - used..]);
        bytes
    }
}

impl fmt::Display for Extranonce2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:0width$x}", self.value, width = self.size as usize * 2)
    }
}
