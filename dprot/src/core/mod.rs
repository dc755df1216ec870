//! Core building blocks of the protocol.
//!
//! This module contains the pieces that do not depend on a role:
//! - Checking: 8-bit CRC / checksum / XOR integrity byte
//! - Message: Type, sequence parity and length header layout
//! - Slip: Byte-stuffing framer over a byte link

mod checking;
mod message;
pub mod slip;

pub use checking::{crc8_table, Checker, Checking};
pub use message::{Frame, Header, Message, MessageType, Parity, HEADER_SIZE};
pub use slip::Stage;
