//! Slave side of the protocol.

use log::{debug, trace, warn};

use super::{send_staged, Inbound, SlaveStats};
use crate::channel::{Channel, ReadMode};
use crate::config::Config;
use crate::core::{Frame, Message, MessageType, Parity, Stage};
use crate::error::{Error, ErrorKind, Result};
use crate::link::Link;
use crate::PROTOCOL_OVERHEAD;

/// Slave (responder) role.
///
/// The slave blocks on its link until a frame arrives and answers it at
/// most once. A frame carrying the parity of the last accepted message is a
/// retransmission: it is acknowledged again but its payload is not handed
/// out a second time.
#[derive(Debug)]
pub struct Slave<L> {
    channel: Channel<L>,
    config: Config,
    last_accepted: Parity,
    stats: SlaveStats,
}

impl<L: Link> Slave<L> {
    /// Binds the slave to `link`. Only the blocking read capability is used.
    pub fn new(link: L, config: Config) -> Self {
        Self {
            channel: Channel::new(link, ReadMode::Blocking),
            config,
            last_accepted: Parity::Even,
            stats: SlaveStats::new(),
        }
    }

    /// Returns to the freshly initialized state.
    pub fn reset(&mut self) {
        self.last_accepted = Parity::Even;
        self.stats.reset();
    }

    /// Returns the parity of the last message accepted.
    pub fn last_accepted_parity(&self) -> Parity {
        self.last_accepted
    }

    /// Returns the configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns statistics.
    pub fn stats(&self) -> &SlaveStats {
        &self.stats
    }

    /// Returns a reference to the link.
    pub fn link(&self) -> &L {
        self.channel.link()
    }

    /// Returns a mutable reference to the link.
    pub fn link_mut(&mut self) -> &mut L {
        self.channel.link_mut()
    }

    /// Consumes the slave and returns the link.
    pub fn into_inner(self) -> L {
        self.channel.into_inner()
    }

    /// Receives and answers one frame.
    ///
    /// `buf` must hold a whole message including the three protocol bytes;
    /// a delivered payload is borrowed from it.
    ///
    /// # Errors
    ///
    /// - `Framing`: the frame was cut short, nothing is sent
    /// - `Logical`: bad length (NACKed) or a type the slave does not accept
    ///   (not answered)
    /// - `Data`: checking mismatch, NACKed
    pub fn wait_for_msg<'b>(&mut self, buf: &'b mut [u8]) -> Result<Inbound<'b>> {
        let received = self.channel.recv(buf);
        let data: &'b [u8] = buf;
        self.stats.frames_received += 1;

        let frame = match Frame::parse(&data[..received]) {
            Some(frame) if received >= PROTOCOL_OVERHEAD => frame,
            _ => {
                self.stats.rejected += 1;
                warn!("Slave dropped short frame: {} bytes", received);
                return Err(Error::new(ErrorKind::Framing));
            }
        };

        let parity = frame.header.parity;
        if parity == self.last_accepted {
            self.stats.duplicates += 1;
            debug!("Slave got retransmission: parity={}", parity.bit());
            self.send_ack();
            return Ok(Inbound::Duplicate);
        }

        if !frame.header.length_valid() {
            warn!("Slave got invalid length {}", frame.header.length);
            self.send_nack();
            return Err(Error::new(ErrorKind::Logical));
        }

        if !frame.verify(self.config.checking) {
            debug!(
                "Slave got corrupted frame: parity={}, len={}",
                parity.bit(),
                frame.payload.len()
            );
            self.send_nack();
            return Err(Error::new(ErrorKind::Data));
        }

        self.last_accepted = parity;

        match frame.header.message_type() {
            Some(MessageType::Data) => {
                self.stats.delivered += 1;
                trace!("Slave accepted data: parity={}, len={}", parity.bit(), frame.payload.len());
                self.send_ack();
                Ok(Inbound::Data(frame.payload))
            }
            Some(MessageType::Arp) => {
                self.stats.pings += 1;
                trace!("Slave accepted ping: parity={}", parity.bit());
                self.send_ack();
                Ok(Inbound::Ping)
            }
            Some(MessageType::Sync) => {
                self.stats.syncs += 1;
                trace!("Slave accepted sync: parity={}", parity.bit());
                Ok(Inbound::Sync)
            }
            _ => {
                self.stats.rejected += 1;
                warn!("Slave ignored frame with tag 0x{:02X}", frame.header.tag);
                Err(Error::new(ErrorKind::Logical))
            }
        }
    }

    /// Sends an ACK carrying the last accepted parity.
    pub fn send_ack(&mut self) {
        self.send_control(MessageType::Ack);
    }

    /// Sends a NACK carrying the last accepted parity.
    pub fn send_nack(&mut self) {
        self.stats.nacks_sent += 1;
        self.send_control(MessageType::Nack);
    }

    /// Sends a data message once, tagged with the last accepted parity.
    ///
    /// There is no retry; the master repeats its request if the answer is
    /// lost.
    pub fn send_data_msg(&mut self, payload: &[u8]) -> Result<()> {
        let message = Message::data(self.last_accepted, payload)?;
        let checking = message.checking(self.config.checking);

        trace!(
            "Slave data message: parity={}, len={}",
            self.last_accepted.bit(),
            payload.len()
        );
        send_staged(&mut self.channel, &message, checking);
        Ok(())
    }

    fn send_control(&mut self, msg_type: MessageType) {
        let frame = Message::control(msg_type, self.last_accepted).to_bytes(self.config.checking);
        trace!("Slave sending {:?}: parity={}", msg_type, self.last_accepted.bit());
        self.channel.send(&frame, Stage::REGULAR);
    }
}
