//! Master and slave state machines.
//!
//! The master owns the retry policy: every logical message is sent up to
//! `max_attempts` times until it is ACKed. The slave never retries; it
//! answers each inbound frame once with ACK, NACK or nothing, and uses the
//! parity bit to recognize retransmissions of a message it already
//! accepted.

mod master;
mod slave;
mod stats;

pub use master::Master;
pub use slave::Slave;
pub use stats::{MasterStats, SlaveStats};

use crate::channel::Channel;
use crate::core::{Message, Stage};
use crate::link::Link;

/// Control reply received by the master.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reply {
    /// The slave accepted the message.
    Ack,
    /// The slave received the message corrupted.
    Nack,
}

/// What the slave made of an inbound frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Inbound<'a> {
    /// A new data message; the payload is handed to the application.
    Data(&'a [u8]),

    /// A new ping; it has been ACKed.
    Ping,

    /// A new SYNC; accepted without a reply.
    Sync,

    /// A retransmission of the last accepted message; ACKed again,
    /// payload withheld.
    Duplicate,
}

impl<'a> Inbound<'a> {
    /// Returns the delivered payload, if this is new data.
    pub fn payload(&self) -> Option<&'a [u8]> {
        match *self {
            Inbound::Data(payload) => Some(payload),
            _ => None,
        }
    }
}

/// Streams a message as one frame in three stages: header, payload and
/// checking byte.
fn send_staged<L: Link>(channel: &mut Channel<L>, message: &Message<'_>, checking: u8) {
    channel.send(&message.header().to_bytes(), Stage::START);
    channel.send(message.payload(), Stage::MIDDLE);
    channel.send(&[checking], Stage::END);
}
