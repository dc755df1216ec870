//! 8-bit integrity checking for dProt messages.
//!
//! Three interchangeable algorithms are available. A session fixes one of
//! them through [`Config`](crate::Config); the choice never travels on the
//! wire, so both peers must be configured alike.
//!
//! # Example
//!
//! ```rust
//! use dprot::{Checker, Checking};
//!
//! let mut checker = Checker::new(Checking::Crc8);
//! checker.update(b"123456789");
//! assert_eq!(checker.value(), 0xF4);
//! ```

/// CRC-8 generator polynomial (x^8 + x^2 + x + 1, MSB-first).
const CRC8_POLYNOMIAL: u8 = 0x07;

/// Pre-computed CRC-8 lookup table.
const CRC8_TABLE: [u8; 256] = generate_crc8_table();

/// Generates the CRC-8 lookup table at compile time.
const fn generate_crc8_table() -> [u8; 256] {
    let mut table = [0u8; 256];
    let mut i = 0;

    while i < 256 {
        let mut crc = i as u8;
        let mut j = 0;

        while j < 8 {
            if crc & 0x80 != 0 {
                crc = (crc << 1) ^ CRC8_POLYNOMIAL;
            } else {
                crc <<= 1;
            }
            j += 1;
        }

        table[i] = crc;
        i += 1;
    }

    table
}

/// Returns the CRC-8 lookup table.
///
/// The table is built at compile time, so there is no initialization step
/// to forget before the first message.
#[inline]
pub const fn crc8_table() -> &'static [u8; 256] {
    &CRC8_TABLE
}

/// Checking algorithm used to compute the trailing byte of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Checking {
    /// Table-driven CRC-8, polynomial 0x07.
    #[default]
    Crc8,
    /// Sum of all bytes modulo 256.
    Checksum8,
    /// XOR of all bytes.
    Xor8,
}

impl Checking {
    /// Folds one byte into the accumulator.
    #[inline]
    pub const fn accumulate(self, acc: u8, byte: u8) -> u8 {
        match self {
            Self::Crc8 => CRC8_TABLE[(acc ^ byte) as usize],
            Self::Checksum8 => acc.wrapping_add(byte),
            Self::Xor8 => acc ^ byte,
        }
    }

    /// Computes the checking byte of `data` in one call.
    pub fn compute(self, data: &[u8]) -> u8 {
        data.iter().fold(0, |acc, &byte| self.accumulate(acc, byte))
    }
}

/// Incremental checking calculator.
///
/// A message is checked over non-contiguous parts (header, then payload),
/// so the state can be fed slice by slice.
#[derive(Debug, Clone, Copy)]
pub struct Checker {
    algorithm: Checking,
    state: u8,
}

impl Checker {
    /// Creates a calculator with a zero accumulator.
    #[inline]
    pub const fn new(algorithm: Checking) -> Self {
        Self { algorithm, state: 0 }
    }

    /// Folds a single byte.
    #[inline]
    pub fn push(&mut self, byte: u8) {
        self.state = self.algorithm.accumulate(self.state, byte);
    }

    /// Folds every byte of `data`.
    #[inline]
    pub fn update(&mut self, data: &[u8]) {
        for &byte in data {
            self.push(byte);
        }
    }

    /// Returns the checking byte of everything fed so far.
    #[inline]
    pub const fn value(&self) -> u8 {
        self.state
    }

    /// Returns the configured algorithm.
    #[inline]
    pub const fn algorithm(&self) -> Checking {
        self.algorithm
    }

    /// Computes the checking byte over multiple slices without copying.
    pub fn compute_slices(algorithm: Checking, slices: &[&[u8]]) -> u8 {
        let mut checker = Self::new(algorithm);
        for slice in slices {
            checker.update(slice);
        }
        checker.value()
    }

    /// Resets the accumulator.
    #[inline]
    pub fn reset(&mut self) {
        self.state = 0;
    }
}
