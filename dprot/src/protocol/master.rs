//! Master side of the protocol.
//!
//! The master initiates every exchange and reads with the timeout-bounded
//! capability, so an unresponsive slave costs at most
//! `max_attempts × frame size × rx_timeout_ms`.

use log::{debug, trace, warn};

use super::{send_staged, MasterStats, Reply};
use crate::channel::{Channel, ReadMode};
use crate::config::Config;
use crate::core::{Checker, Frame, Header, Message, MessageType, Parity, Stage, HEADER_SIZE};
use crate::error::{Error, ErrorKind, Result};
use crate::link::Link;
use crate::PROTOCOL_OVERHEAD;

/// Master (initiator) role.
///
/// # Parity
///
/// [`send_ping`](Master::send_ping) always starts a new logical message and
/// advances the parity itself. [`send_data`](Master::send_data) does not:
/// the caller decides whether a call is a new message (call
/// [`advance_parity`](Master::advance_parity) first) or a deliberate resend
/// of the previous one (leave the parity alone, and the slave will ACK it
/// without delivering it again).
#[derive(Debug)]
pub struct Master<L> {
    channel: Channel<L>,
    config: Config,
    parity: Parity,
    stats: MasterStats,
}

impl<L: Link> Master<L> {
    /// Binds the master to `link`, starting with even parity.
    pub fn new(link: L, config: Config) -> Self {
        Self {
            channel: Channel::new(link, ReadMode::Timeout(config.rx_timeout_ms)),
            config,
            parity: Parity::Even,
            stats: MasterStats::new(),
        }
    }

    /// Returns to the freshly initialized state.
    pub fn reset(&mut self) {
        self.parity = Parity::Even;
        self.stats.reset();
    }

    /// Returns the parity of the message currently being sent.
    pub fn parity(&self) -> Parity {
        self.parity
    }

    /// Starts a new logical message for the next `send_data` call.
    ///
    /// Returns the new parity.
    pub fn advance_parity(&mut self) -> Parity {
        self.parity = self.parity.flipped();
        self.parity
    }

    /// Returns the configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns statistics.
    pub fn stats(&self) -> &MasterStats {
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

    /// Consumes the master and returns the link.
    pub fn into_inner(self) -> L {
        self.channel.into_inner()
    }

    /// Sends a data message and waits for it to be acknowledged.
    ///
    /// The identical frame is sent up to `max_attempts` times; the first ACK
    /// ends the exchange. Otherwise the outcome of the last attempt is
    /// returned, which is a NACK or an error.
    pub fn send_data(&mut self, payload: &[u8]) -> Result<Reply> {
        let message = Message::data(self.parity, payload)?;
        let checking = message.checking(self.config.checking);

        trace!(
            "Master data message: parity={}, len={}",
            self.parity.bit(),
            payload.len()
        );
        self.exchange(|channel| send_staged(channel, &message, checking))
    }

    /// Sends a ping as a new logical message and waits for the ACK.
    pub fn send_ping(&mut self) -> Result<Reply> {
        let parity = self.advance_parity();
        let frame = Message::control(MessageType::Arp, parity).to_bytes(self.config.checking);

        trace!("Master ping: parity={}", parity.bit());
        self.exchange(|channel| {
            channel.send(&frame, Stage::REGULAR);
        })
    }

    /// Reserved for auto-baud synchronization. Sends nothing.
    pub fn send_sync(&mut self) -> Result<()> {
        Ok(())
    }

    /// Waits for the slave's reply to the current message.
    ///
    /// Anything other than a complete, well-formed ACK or NACK carrying the
    /// current parity is a data error; a reply with the other parity belongs
    /// to an earlier message.
    pub fn wait_ack_nack(&mut self) -> Result<Reply> {
        let mut buf = [0u8; PROTOCOL_OVERHEAD];
        let received = self.channel.recv(&mut buf);

        if received != PROTOCOL_OVERHEAD {
            return self.reject_reply("short reply", received);
        }

        let header = Header::from_bytes([buf[0], buf[1]]);
        if header.parity != self.parity {
            return self.reject_reply("stale parity", received);
        }

        let reply = match header.message_type() {
            Some(MessageType::Ack) => Reply::Ack,
            Some(MessageType::Nack) => Reply::Nack,
            _ => return self.reject_reply("unexpected type", received),
        };

        if header.length != 0 {
            return self.reject_reply("non-zero length", received);
        }

        if Checker::compute_slices(self.config.checking, &[&buf[..HEADER_SIZE]]) != buf[2] {
            return self.reject_reply("checking mismatch", received);
        }

        match reply {
            Reply::Ack => self.stats.acks_received += 1,
            Reply::Nack => self.stats.nacks_received += 1,
        }
        trace!("Master received {:?}: parity={}", reply, header.parity.bit());
        Ok(reply)
    }

    /// Waits for a data message from the slave, typically the answer to a
    /// request the master just sent.
    ///
    /// `buf` must hold the whole message including the three protocol
    /// bytes. Returns the payload, borrowed from `buf`.
    pub fn wait_for_data<'b>(&mut self, buf: &'b mut [u8]) -> Result<&'b [u8]> {
        let received = self.channel.recv(buf);
        let data: &'b [u8] = buf;

        let frame = match Frame::parse(&data[..received]) {
            Some(frame) if received >= PROTOCOL_OVERHEAD => frame,
            _ => {
                debug!("Master data frame too short: {} bytes", received);
                return Err(Error::new(ErrorKind::Framing));
            }
        };

        if !frame.header.length_valid() {
            debug!("Master data frame declares length {}", frame.header.length);
            return Err(Error::new(ErrorKind::Logical));
        }

        if frame.header.parity != self.parity {
            debug!("Master data frame has stale parity");
            return Err(Error::new(ErrorKind::Data));
        }

        if !frame.verify(self.config.checking) {
            debug!("Master data frame failed checking");
            return Err(Error::new(ErrorKind::Data));
        }

        if frame.header.message_type() != Some(MessageType::Data) {
            debug!("Master expected data, got tag 0x{:02X}", frame.header.tag);
            return Err(Error::new(ErrorKind::Logical));
        }

        trace!("Master received data: len={}", frame.payload.len());
        Ok(frame.payload)
    }

    /// Runs the retry loop for one logical message.
    fn exchange<F>(&mut self, mut transmit: F) -> Result<Reply>
    where
        F: FnMut(&mut Channel<L>),
    {
        let attempts = self.config.max_attempts.max(1);
        let mut last = Err(Error::new(ErrorKind::Data));

        self.stats.messages_sent += 1;
        for attempt in 1..=attempts {
            if attempt > 1 {
                self.stats.retransmissions += 1;
                debug!(
                    "Master retransmitting: attempt {}/{}, last={:?}",
                    attempt, attempts, last
                );
            }

            transmit(&mut self.channel);
            self.stats.transmissions += 1;

            last = self.wait_ack_nack();
            if last == Ok(Reply::Ack) {
                self.stats.messages_acked += 1;
                return last;
            }
        }

        self.stats.messages_failed += 1;
        warn!(
            "Master gave up after {} attempts: parity={}, last={:?}",
            attempts,
            self.parity.bit(),
            last
        );
        last
    }

    fn reject_reply(&mut self, reason: &str, received: usize) -> Result<Reply> {
        self.stats.replies_rejected += 1;
        debug!("Master rejected reply ({}): {} bytes", reason, received);
        Err(Error::new(ErrorKind::Data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::slip;
    use crate::core::Checking;
    use crate::link::{NullLink, ScriptedLink};
    use crate::MAX_PAYLOAD;

    type TestLink = ScriptedLink<2048, 4096>;

    fn framed(message: &Message<'_>) -> heapless::Vec<u8, 600> {
        let mut link: ScriptedLink<1, 600> = ScriptedLink::new();
        slip::encode(&mut link, &message.to_bytes(Checking::Crc8), Stage::REGULAR);
        heapless::Vec::from_slice(link.sent()).unwrap()
    }

    fn reply(msg_type: MessageType, parity: Parity) -> heapless::Vec<u8, 600> {
        framed(&Message::control(msg_type, parity))
    }

    #[test]
    fn test_data_frame_layout() {
        let link = TestLink::with_inbound(&reply(MessageType::Ack, Parity::Even));
        let mut master = Master::new(link, Config::default());
        assert_eq!(master.send_data(&[1, 2, 3]), Ok(Reply::Ack));

        let expected = framed(&Message::data(Parity::Even, &[1, 2, 3]).unwrap());
        assert_eq!(master.link().sent(), &expected[..]);
        assert_eq!(master.stats().transmissions, 1);
        assert_eq!(master.stats().messages_acked, 1);
    }

    #[test]
    fn test_send_data_does_not_advance_parity() {
        let mut master = Master::new(TestLink::new(), Config::default());
        let _ = master.send_data(b"x");
        assert_eq!(master.parity(), Parity::Even);

        master.advance_parity();
        let _ = master.send_data(b"x");
        assert_eq!(master.parity(), Parity::Odd);
    }

    #[test]
    fn test_oversize_rejected_without_io() {
        let mut master = Master::new(NullLink::new(), Config::default());
        let payload = [0u8; MAX_PAYLOAD + 1];
        let err = master.send_data(&payload).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MsgSize);
        assert_eq!(master.link().bytes_written(), 0);
        assert_eq!(master.stats().messages_sent, 0);
    }

    #[test]
    fn test_nack_exhausts_attempts() {
        let mut link = TestLink::new();
        for _ in 0..5 {
            link.feed(&reply(MessageType::Nack, Parity::Even));
        }
        let mut master = Master::new(link, Config::default());

        assert_eq!(master.send_data(b"abc"), Ok(Reply::Nack));
        assert_eq!(master.link().flushes(), 5);
        assert_eq!(master.stats().retransmissions, 4);
        assert_eq!(master.stats().nacks_received, 5);
        assert_eq!(master.stats().messages_failed, 1);
    }

    #[test]
    fn test_ack_after_nack_stops_retrying() {
        let mut link = TestLink::new();
        link.feed(&reply(MessageType::Nack, Parity::Even));
        link.feed(&reply(MessageType::Ack, Parity::Even));
        link.feed(&reply(MessageType::Ack, Parity::Even));
        let mut master = Master::new(link, Config::default());

        assert_eq!(master.send_data(b"abc"), Ok(Reply::Ack));
        assert_eq!(master.link().flushes(), 2);
        assert_eq!(master.link().pending(), reply(MessageType::Ack, Parity::Even).len());
    }

    #[test]
    fn test_silence_returns_data_error() {
        let mut master = Master::new(TestLink::new(), Config::default().with_max_attempts(3));
        let err = master.send_data(b"abc").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Data);
        assert_eq!(master.link().flushes(), 3);
    }

    #[test]
    fn test_stale_ack_rejected() {
        let link = TestLink::with_inbound(&reply(MessageType::Ack, Parity::Odd));
        let mut master = Master::new(link, Config::default());
        assert_eq!(master.wait_ack_nack().unwrap_err().kind(), ErrorKind::Data);
        assert_eq!(master.stats().replies_rejected, 1);
    }

    #[test]
    fn test_reply_with_payload_rejected() {
        let message = Message::new(MessageType::Ack, Parity::Even, &[0x01]).unwrap();
        // Only the first three bytes are kept, so the length check trips
        let link = TestLink::with_inbound(&framed(&message));
        let mut master = Master::new(link, Config::default());
        assert_eq!(master.wait_ack_nack().unwrap_err().kind(), ErrorKind::Data);
    }

    #[test]
    fn test_corrupted_reply_rejected() {
        let mut bytes = Message::control(MessageType::Ack, Parity::Even).to_bytes(Checking::Crc8);
        bytes[2] ^= 0x01;
        let mut link = TestLink::new();
        slip::encode(&mut link, &bytes, Stage::REGULAR);
        let mut master = Master::new(TestLink::with_inbound(link.sent()), Config::default());
        assert_eq!(master.wait_ack_nack().unwrap_err().kind(), ErrorKind::Data);
    }

    #[test]
    fn test_ping_advances_parity_each_call() {
        let mut link = TestLink::new();
        link.feed(&reply(MessageType::Ack, Parity::Odd));
        link.feed(&reply(MessageType::Ack, Parity::Even));
        let mut master = Master::new(link, Config::default());

        assert_eq!(master.send_ping(), Ok(Reply::Ack));
        assert_eq!(master.parity(), Parity::Odd);
        assert_eq!(master.send_ping(), Ok(Reply::Ack));
        assert_eq!(master.parity(), Parity::Even);
    }

    fn unstuff(frame: &[u8]) -> heapless::Vec<u8, 600> {
        let mut link: ScriptedLink<600, 1> = ScriptedLink::with_inbound(frame);
        let mut buf = [0u8; 600];
        let len = slip::decode(&mut link, ReadMode::Blocking, &mut buf);
        heapless::Vec::from_slice(&buf[..len]).unwrap()
    }

    #[test]
    fn test_consecutive_pings_differ_only_in_parity() {
        let mut link = TestLink::new();
        link.feed(&reply(MessageType::Ack, Parity::Odd));
        link.feed(&reply(MessageType::Ack, Parity::Even));
        let mut master = Master::new(link, Config::default());

        assert_eq!(master.send_ping(), Ok(Reply::Ack));
        let first = unstuff(master.link().sent());
        master.link_mut().clear_sent();
        assert_eq!(master.send_ping(), Ok(Reply::Ack));
        let second = unstuff(master.link().sent());

        assert_eq!(first.len(), PROTOCOL_OVERHEAD);
        assert_eq!(second.len(), PROTOCOL_OVERHEAD);
        assert_eq!(first[0] ^ second[0], 0x01);
        assert_eq!(first[0] & 0x01, Parity::Odd.bit());
        assert_eq!(first[1], second[1]);
        assert_eq!(first[2], Checking::Crc8.compute(&first[..HEADER_SIZE]));
        assert_eq!(second[2], Checking::Crc8.compute(&second[..HEADER_SIZE]));
    }

    #[test]
    fn test_send_sync_is_silent() {
        let mut master = Master::new(NullLink::new(), Config::default());
        assert_eq!(master.send_sync(), Ok(()));
        assert_eq!(master.link().bytes_written(), 0);
    }

    #[test]
    fn test_wait_for_data() {
        let message = Message::data(Parity::Even, b"reply").unwrap();
        let mut master = Master::new(TestLink::with_inbound(&framed(&message)), Config::default());
        let mut buf = [0u8; 256];
        assert_eq!(master.wait_for_data(&mut buf), Ok(&b"reply"[..]));
    }

    #[test]
    fn test_wait_for_data_rejects_stale_parity() {
        let message = Message::data(Parity::Odd, b"reply").unwrap();
        let mut master = Master::new(TestLink::with_inbound(&framed(&message)), Config::default());
        let mut buf = [0u8; 256];
        assert_eq!(master.parity(), Parity::Even);
        assert_eq!(master.wait_for_data(&mut buf).unwrap_err().kind(), ErrorKind::Data);
    }

    #[test]
    fn test_wait_for_data_rejects_checking_mismatch() {
        let mut bytes = Message::data(Parity::Even, b"reply").unwrap().to_bytes(Checking::Crc8);
        let last = bytes.len() - 1;
        bytes[last] ^= 0x01;
        let mut link = TestLink::new();
        slip::encode(&mut link, &bytes, Stage::REGULAR);
        let mut master = Master::new(TestLink::with_inbound(link.sent()), Config::default());
        let mut buf = [0u8; 256];
        assert_eq!(master.wait_for_data(&mut buf).unwrap_err().kind(), ErrorKind::Data);
    }

    #[test]
    fn test_wait_for_data_rejects_ping() {
        let message = Message::control(MessageType::Arp, Parity::Even);
        let mut master = Master::new(TestLink::with_inbound(&framed(&message)), Config::default());
        let mut buf = [0u8; 256];
        assert_eq!(master.wait_for_data(&mut buf).unwrap_err().kind(), ErrorKind::Logical);
    }

    #[test]
    fn test_wait_for_data_rejects_bad_length() {
        let mut link = TestLink::new();
        slip::encode(&mut link, &[0x10, 0xFE, 0x00], Stage::REGULAR);
        let mut master = Master::new(TestLink::with_inbound(link.sent()), Config::default());
        let mut buf = [0u8; 256];
        assert_eq!(master.wait_for_data(&mut buf).unwrap_err().kind(), ErrorKind::Logical);
    }

    #[test]
    fn test_wait_for_data_short_frame() {
        let mut master = Master::new(TestLink::with_inbound(&[0xC0, 0x10]), Config::default());
        let mut buf = [0u8; 256];
        assert_eq!(master.wait_for_data(&mut buf).unwrap_err().kind(), ErrorKind::Framing);
    }
}
