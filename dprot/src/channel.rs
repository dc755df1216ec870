//! Channel handle binding a role to its link.
//!
//! A channel owns the link and remembers which read capability the role
//! uses. It is created once when a role is initialized and must be driven by
//! one thread at a time.

use crate::core::slip;
use crate::core::Stage;
use crate::link::Link;

pub use crate::link::ReadMode;

/// A SLIP-framed view of a byte link.
#[derive(Debug)]
pub struct Channel<L> {
    link: L,
    mode: ReadMode,
}

impl<L: Link> Channel<L> {
    /// Creates a channel reading with the given mode.
    pub fn new(link: L, mode: ReadMode) -> Self {
        Self { link, mode }
    }

    /// Returns the read mode.
    pub fn mode(&self) -> ReadMode {
        self.mode
    }

    /// Stuffs `data` onto the link, emitting delimiters per `stage`.
    pub fn send(&mut self, data: &[u8], stage: Stage) -> usize {
        slip::encode(&mut self.link, data, stage)
    }

    /// Receives one frame into `buf`, returning the number of bytes stored.
    pub fn recv(&mut self, buf: &mut [u8]) -> usize {
        slip::decode(&mut self.link, self.mode, buf)
    }

    /// Returns a reference to the link.
    pub fn link(&self) -> &L {
        &self.link
    }

    /// Returns a mutable reference to the link.
    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }

    /// Consumes the channel and returns the link.
    pub fn into_inner(self) -> L {
        self.link
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::ScriptedLink;

    #[test]
    fn test_send_then_recv() {
        let mut tx = Channel::new(ScriptedLink::<64, 64>::new(), ReadMode::Blocking);
        tx.send(&[0xC0, 0x01], Stage::REGULAR);
        assert_eq!(tx.link().flushes(), 1);

        let sent = tx.into_inner();
        let mut rx = Channel::new(
            ScriptedLink::<64, 64>::with_inbound(sent.sent()),
            ReadMode::Timeout(50),
        );
        let mut buf = [0u8; 8];
        let n = rx.recv(&mut buf);
        assert_eq!(&buf[..n], &[0xC0, 0x01]);
        assert_eq!(rx.mode(), ReadMode::Timeout(50));
    }
}
