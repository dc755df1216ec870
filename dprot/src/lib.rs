//! # dProt - A Minimal Reliable Transport for Serial Links
//!
//! dProt is a `no_std` compatible stop-and-wait transport that runs over an
//! unreliable, unframed byte stream (typically a UART) and provides:
//!
//! - **SLIP framing**: Byte-stuffed frames delimited by `0xC0`
//! - **8-bit checking**: CRC-8, additive checksum or XOR over every message
//! - **Alternating-bit ARQ**: A single parity bit suppresses duplicates
//! - **Bounded retries**: The master retransmits until ACK or attempts run out
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                    Application Layer                     │
//! ├─────────────────────────────────────────────────────────┤
//! │                    Protocol Layer                        │
//! │  ┌─────────────┐ ┌─────────────┐ ┌─────────────────┐   │
//! │  │   Master    │ │    Slave    │ │   Statistics    │   │
//! │  └─────────────┘ └─────────────┘ └─────────────────┘   │
//! ├─────────────────────────────────────────────────────────┤
//! │                    Message Layer                         │
//! │  ┌─────────────┐ ┌─────────────┐ ┌─────────────────┐   │
//! │  │  Type/Seq   │ │  Checking   │ │  SLIP Framing   │   │
//! │  └─────────────┘ └─────────────┘ └─────────────────┘   │
//! ├─────────────────────────────────────────────────────────┤
//! │                    Link Layer                            │
//! │  ┌─────────────────────────────────────────────────┐   │
//! │  │       Byte capabilities (put / get / get_to)     │   │
//! │  └─────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use dprot::{Config, Master, Reply};
//!
//! let mut master = Master::new(uart, Config::default());
//!
//! master.advance_parity();
//! match master.send_data(b"Hello")? {
//!     Reply::Ack => log::info!("delivered"),
//!     Reply::Nack => log::warn!("peer kept rejecting the message"),
//! }
//! ```

#![no_std]
#![deny(unsafe_code)]
#![warn(missing_docs)]

#[cfg(feature = "std")]
extern crate std;

pub mod core;
pub mod buffer;
pub mod link;
pub mod channel;
pub mod config;
pub mod error;
pub mod protocol;

// Re-export commonly used types
pub use crate::core::{Checker, Checking, Header, Message, MessageType, Parity, Stage};
pub use channel::{Channel, ReadMode};
pub use config::Config;
pub use error::{Error, ErrorKind, Result, Status};
pub use link::Link;
pub use protocol::{Inbound, Master, MasterStats, Reply, Slave, SlaveStats};

/// Maximal size of a message before framing (header + payload + checking).
pub const MAX_MESSAGE_SIZE: usize = 256;

/// Bytes taken by the protocol itself: type/parity, length and checking.
pub const PROTOCOL_OVERHEAD: usize = 3;

/// Maximal payload carried by a single message.
pub const MAX_PAYLOAD: usize = MAX_MESSAGE_SIZE - PROTOCOL_OVERHEAD;

/// Default number of transmission attempts per logical message.
pub const DEFAULT_MAX_ATTEMPTS: u8 = 5;

/// Default per-byte receive timeout in milliseconds.
pub const DEFAULT_RX_TIMEOUT_MS: u32 = 50;
