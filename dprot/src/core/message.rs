//! dProt message layout.
//!
//! A message is the unit the transport layer hands to the SLIP framer.
//!
//! # Message Format
//!
//! ```text
//!  7             1   0
//! +-+-+-+-+-+-+-+-+---+
//! |     Type      |Seq|   byte 0
//! +-+-+-+-+-+-+-+-+---+
//! |      Length       |   byte 1      (0..=253)
//! +-+-+-+-+-+-+-+-+-+-+
//! |   Payload ...     |   bytes 2..N  (Length bytes)
//! +-+-+-+-+-+-+-+-+-+-+
//! |     Checking      |   byte N+1
//! +-+-+-+-+-+-+-+-+-+-+
//! ```
//!
//! The checking byte covers bytes 0 through N.

use heapless::Vec;

use super::checking::{Checker, Checking};
use crate::error::{Error, ErrorKind, Result};
use crate::{MAX_MESSAGE_SIZE, MAX_PAYLOAD};

/// Size of the type/parity and length bytes.
pub const HEADER_SIZE: usize = 2;

/// Bit of byte 0 holding the sequence parity.
const PARITY_MASK: u8 = 0x01;

/// Message type tag carried in the upper seven bits of byte 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageType {
    /// Application payload.
    Data = 0x10,

    /// ARP-like ping.
    Arp = 0x20,

    /// The message was accepted.
    Ack = 0x30,

    /// The message arrived corrupted.
    Nack = 0x40,

    /// Reserved for transmitter/receiver synchronization (auto-baud).
    Sync = 0xA0,
}

impl MessageType {
    /// Converts a type tag (parity bit cleared) to a MessageType.
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x10 => Some(Self::Data),
            0x20 => Some(Self::Arp),
            0x30 => Some(Self::Ack),
            0x40 => Some(Self::Nack),
            0xA0 => Some(Self::Sync),
            _ => None,
        }
    }

    /// Returns true for the two control replies.
    pub const fn is_reply(&self) -> bool {
        matches!(self, Self::Ack | Self::Nack)
    }
}

/// One-bit sequence number of the alternating-bit protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Parity {
    #[default]
    Even,
    Odd,
}

impl Parity {
    pub const fn from_bit(bit: u8) -> Self {
        if bit & PARITY_MASK == 0 { Self::Even } else { Self::Odd }
    }

    pub const fn bit(self) -> u8 {
        match self {
            Self::Even => 0,
            Self::Odd => 1,
        }
    }

    /// Returns the other parity.
    #[must_use]
    pub const fn flipped(self) -> Self {
        match self {
            Self::Even => Self::Odd,
            Self::Odd => Self::Even,
        }
    }
}

/// The two leading bytes of a message.
///
/// `tag` keeps the raw seven type bits so that unknown types survive
/// parsing and can be rejected at the protocol layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub tag: u8,
    pub parity: Parity,
    pub length: u8,
}

impl Header {
    pub const fn new(msg_type: MessageType, parity: Parity, length: u8) -> Self {
        Self {
            tag: msg_type as u8,
            parity,
            length,
        }
    }

    pub const fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        [(self.tag & !PARITY_MASK) | self.parity.bit(), self.length]
    }

    pub const fn from_bytes(bytes: [u8; HEADER_SIZE]) -> Self {
        Self {
            tag: bytes[0] & !PARITY_MASK,
            parity: Parity::from_bit(bytes[0]),
            length: bytes[1],
        }
    }

    pub const fn message_type(&self) -> Option<MessageType> {
        MessageType::from_u8(self.tag)
    }

    /// Returns true if the declared payload fits in a message.
    pub const fn length_valid(&self) -> bool {
        self.length as usize <= MAX_PAYLOAD
    }
}

/// A message ready to be checked and framed.
///
/// The payload never exceeds `MAX_PAYLOAD`, so the header length and the
/// serialized image are always exact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Message<'a> {
    msg_type: MessageType,
    parity: Parity,
    payload: &'a [u8],
}

impl<'a> Message<'a> {
    /// Creates a message of any type, failing if the payload cannot fit.
    pub fn new(msg_type: MessageType, parity: Parity, payload: &'a [u8]) -> Result<Self> {
        if payload.len() > MAX_PAYLOAD {
            return Err(Error::new(ErrorKind::MsgSize));
        }
        Ok(Self {
            msg_type,
            parity,
            payload,
        })
    }

    /// Creates a data message, failing if the payload cannot fit.
    pub fn data(parity: Parity, payload: &'a [u8]) -> Result<Self> {
        Self::new(MessageType::Data, parity, payload)
    }

    /// Creates a zero-length message of the given type.
    pub const fn control(msg_type: MessageType, parity: Parity) -> Self {
        Self {
            msg_type,
            parity,
            payload: &[],
        }
    }

    pub const fn msg_type(&self) -> MessageType {
        self.msg_type
    }

    pub const fn parity(&self) -> Parity {
        self.parity
    }

    pub const fn payload(&self) -> &'a [u8] {
        self.payload
    }

    pub const fn header(&self) -> Header {
        Header::new(self.msg_type, self.parity, self.payload.len() as u8)
    }

    /// Computes the checking byte over header and payload.
    pub fn checking(&self, algorithm: Checking) -> u8 {
        let mut checker = Checker::new(algorithm);
        checker.update(&self.header().to_bytes());
        checker.update(self.payload);
        checker.value()
    }

    /// Returns the size of the message before framing.
    pub fn wire_size(&self) -> usize {
        HEADER_SIZE + self.payload.len() + 1
    }

    /// Serializes the complete pre-framing image.
    pub fn to_bytes(&self, algorithm: Checking) -> Vec<u8, MAX_MESSAGE_SIZE> {
        let mut out = Vec::new();
        // Capacity holds, payloads are bounded at construction
        let _ = out.extend_from_slice(&self.header().to_bytes());
        let _ = out.extend_from_slice(self.payload);
        let _ = out.push(self.checking(algorithm));
        out
    }
}

/// A received message borrowed from the receive buffer.
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    pub header: Header,

    /// Payload bytes actually present, at most `header.length`.
    pub payload: &'a [u8],

    /// Trailing checking byte, `None` when the frame was cut short.
    pub checking: Option<u8>,
}

impl<'a> Frame<'a> {
    /// Splits a decoded frame into its parts.
    ///
    /// Returns `None` when there are not even two header bytes. Bytes past
    /// the checking byte are ignored.
    pub fn parse(buf: &'a [u8]) -> Option<Self> {
        if buf.len() < HEADER_SIZE {
            return None;
        }
        let header = Header::from_bytes([buf[0], buf[1]]);
        let body = &buf[HEADER_SIZE..];
        let len = core::cmp::min(header.length as usize, body.len());
        Some(Self {
            header,
            payload: &body[..len],
            checking: body.get(header.length as usize).copied(),
        })
    }

    /// Recomputes the checking byte and compares it with the received one.
    ///
    /// A truncated frame never verifies.
    pub fn verify(&self, algorithm: Checking) -> bool {
        if self.payload.len() != self.header.length as usize {
            return false;
        }
        let computed =
            Checker::compute_slices(algorithm, &[&self.header.to_bytes(), self.payload]);
        self.checking == Some(computed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_packing() {
        let header = Header::new(MessageType::Data, Parity::Odd, 3);
        assert_eq!(header.to_bytes(), [0x11, 3]);

        let decoded = Header::from_bytes([0x41, 0]);
        assert_eq!(decoded.message_type(), Some(MessageType::Nack));
        assert_eq!(decoded.parity, Parity::Odd);
        assert_eq!(decoded.length, 0);
    }

    #[test]
    fn test_unknown_tag_survives() {
        let header = Header::from_bytes([0x52, 0]);
        assert_eq!(header.tag, 0x52);
        assert_eq!(header.message_type(), None);
    }

    #[test]
    fn test_parity_flip() {
        assert_eq!(Parity::Even.flipped(), Parity::Odd);
        assert_eq!(Parity::Odd.flipped().bit(), 0);
        assert_eq!(Parity::from_bit(0x31), Parity::Odd);
    }

    #[test]
    fn test_message_to_bytes() {
        let msg = Message::data(Parity::Even, &[1, 2, 3]).unwrap();
        let bytes = msg.to_bytes(Checking::Xor8);
        assert_eq!(&bytes[..], &[0x10, 3, 1, 2, 3, 0x10 ^ 3 ^ 1 ^ 2 ^ 3]);
        assert_eq!(msg.wire_size(), 6);
    }

    #[test]
    fn test_oversize_payload_rejected() {
        let payload = [0u8; MAX_PAYLOAD + 1];
        let err = Message::data(Parity::Even, &payload).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MsgSize);

        let payload = [0u8; MAX_PAYLOAD];
        let msg = Message::data(Parity::Odd, &payload).unwrap();
        assert_eq!(msg.to_bytes(Checking::Crc8).len(), MAX_MESSAGE_SIZE);
    }

    #[test]
    fn test_oversize_message_of_any_type_rejected() {
        let payload = [7u8; 300];
        let err = Message::new(MessageType::Ack, Parity::Even, &payload).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MsgSize);

        let msg = Message::new(MessageType::Ack, Parity::Even, &payload[..MAX_PAYLOAD]).unwrap();
        assert_eq!(msg.header().length as usize, MAX_PAYLOAD);
        assert_eq!(msg.payload().len(), MAX_PAYLOAD);
        let bytes = msg.to_bytes(Checking::Crc8);
        assert_eq!(bytes.len(), msg.wire_size());
        assert!(Frame::parse(&bytes).unwrap().verify(Checking::Crc8));
    }

    #[test]
    fn test_frame_parse_and_verify() {
        let msg = Message::data(Parity::Odd, b"abc").unwrap();
        let bytes = msg.to_bytes(Checking::Crc8);

        let frame = Frame::parse(&bytes).unwrap();
        assert_eq!(frame.header.message_type(), Some(MessageType::Data));
        assert_eq!(frame.payload, b"abc");
        assert!(frame.verify(Checking::Crc8));

        let mut corrupted = bytes.clone();
        corrupted[3] ^= 0x01;
        assert!(!Frame::parse(&corrupted).unwrap().verify(Checking::Crc8));
    }

    #[test]
    fn test_truncated_frame_never_verifies() {
        let msg = Message::data(Parity::Even, b"abcdef").unwrap();
        let bytes = msg.to_bytes(Checking::Crc8);

        let frame = Frame::parse(&bytes[..5]).unwrap();
        assert_eq!(frame.payload, b"abc");
        assert_eq!(frame.checking, None);
        assert!(!frame.verify(Checking::Crc8));

        assert!(Frame::parse(&bytes[..1]).is_none());
    }
}
