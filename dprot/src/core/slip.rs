//! SLIP byte-stuffing over a [`Link`].
//!
//! Frames are delimited by `END` (0xC0). An `END` or `ESC` (0xDB) inside the
//! data is sent as `ESC` followed by `ESC_END` (0xDC) or `ESC_ESC` (0xDD).
//!
//! ```text
//! | END | stuffed bytes ...                                  | END |
//! ```
//!
//! The codec never reports errors: anything malformed is passed upwards and
//! left to the checking byte of the message.

use crate::link::{Link, ReadMode};

/// Frame delimiter.
pub const END: u8 = 0xC0;

/// Escape prefix.
pub const ESC: u8 = 0xDB;

/// Escaped `END` (follows `ESC`).
pub const ESC_END: u8 = 0xDC;

/// Escaped `ESC` (follows `ESC`).
pub const ESC_ESC: u8 = 0xDD;

/// Which delimiters an [`encode`] call emits.
///
/// A message may be streamed over several calls: `START` once, `MIDDLE`
/// any number of times, `END` once. `REGULAR` sends a whole frame at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Stage(u8);

impl Stage {
    /// Neither delimiter.
    pub const MIDDLE: Self = Self(0);

    /// Leading delimiter, flushing line noise out of the receiver.
    pub const START: Self = Self(1 << 0);

    /// Trailing delimiter, terminating the frame.
    pub const END: Self = Self(1 << 1);

    /// Both delimiters.
    pub const REGULAR: Self = Self::START.union(Self::END);

    /// Creates a stage from raw bits.
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits & Self::REGULAR.0)
    }

    /// Returns the raw bits.
    pub const fn bits(&self) -> u8 {
        self.0
    }

    /// Checks if all stages in `other` are set.
    pub const fn contains(&self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }

    /// Combines two stages.
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}

/// Stuffs `data` onto the link.
///
/// Returns the number of logical bytes sent, which is always `data.len()`.
pub fn encode<L: Link + ?Sized>(link: &mut L, data: &[u8], stage: Stage) -> usize {
    if stage.contains(Stage::START) {
        link.put_byte(END);
    }

    for &byte in data {
        match byte {
            END => {
                link.put_byte(ESC);
                link.put_byte(ESC_END);
            }
            ESC => {
                link.put_byte(ESC);
                link.put_byte(ESC_ESC);
            }
            _ => link.put_byte(byte),
        }
    }

    if stage.contains(Stage::END) {
        link.put_byte(END);
        link.flush();
    }

    data.len()
}

/// Receives one frame into `buf`.
///
/// Returns the number of bytes stored. Empty frames (back-to-back
/// delimiters) are skipped. Bytes that do not fit into `buf` are dropped
/// while the rest of the frame is still consumed, keeping the stream in
/// sync. If a read times out, or the link is closed, whatever was gathered
/// so far is returned.
pub fn decode<L: Link + ?Sized>(link: &mut L, mode: ReadMode, buf: &mut [u8]) -> usize {
    let mut received = 0;

    loop {
        let Some(mut byte) = read(link, mode) else {
            return received;
        };

        match byte {
            END if received > 0 => return received,
            END => continue,
            ESC => {
                let Some(escaped) = read(link, mode) else {
                    return received;
                };
                // Anything other than the two escape codes is a protocol
                // violation; it is stored as is.
                byte = match escaped {
                    ESC_END => END,
                    ESC_ESC => ESC,
                    other => other,
                };
            }
            _ => {}
        }

        if received < buf.len() {
            buf[received] = byte;
            received += 1;
        }
    }
}

#[inline]
fn read<L: Link + ?Sized>(link: &mut L, mode: ReadMode) -> Option<u8> {
    match mode {
        ReadMode::Blocking => link.get_byte(),
        ReadMode::Timeout(timeout_ms) => link.get_byte_timeout(timeout_ms),
    }
}
