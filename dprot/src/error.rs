use core::fmt;

use crate::protocol::{Inbound, Reply};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The frame ended before the protocol bytes were complete.
    Framing,
    /// Checking mismatch or an unexpected control frame.
    Data,
    /// Declared length out of range or a message type out of place.
    Logical,
    /// The caller asked to send more than a message can carry.
    MsgSize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Error {
    kind: ErrorKind,
}

impl Error {
    pub const fn new(kind: ErrorKind) -> Self {
        Error { kind }
    }

    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Error::new(kind)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ErrorKind::Framing => write!(f, "Incomplete frame"),
            ErrorKind::Data => write!(f, "Checking mismatch or unexpected control frame"),
            ErrorKind::Logical => write!(f, "Message length or type inconsistent with protocol"),
            ErrorKind::MsgSize => write!(f, "Payload exceeds message capacity"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

#[cfg(feature = "std")]
impl From<Error> for std::io::Error {
    fn from(err: Error) -> std::io::Error {
        let kind = match err.kind {
            ErrorKind::Framing => std::io::ErrorKind::UnexpectedEof,
            ErrorKind::MsgSize => std::io::ErrorKind::InvalidInput,
            _ => std::io::ErrorKind::InvalidData,
        };
        std::io::Error::new(kind, err)
    }
}

pub type Result<T> = core::result::Result<T, Error>;

/// Flat status codes, one per outcome of a role operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Status {
    NoError = 0x00,
    FramingError = 0x01,
    DataError = 0x02,
    LogicalError = 0x03,
    MsgSizeError = 0x04,
    AckAccepted = 0xA0,
    NackAccepted = 0xB0,
}

impl Status {
    pub const fn code(self) -> u8 {
        self as u8
    }

    pub const fn is_error(self) -> bool {
        matches!(
            self,
            Self::FramingError | Self::DataError | Self::LogicalError | Self::MsgSizeError
        )
    }
}

impl From<Error> for Status {
    fn from(err: Error) -> Self {
        match err.kind {
            ErrorKind::Framing => Status::FramingError,
            ErrorKind::Data => Status::DataError,
            ErrorKind::Logical => Status::LogicalError,
            ErrorKind::MsgSize => Status::MsgSizeError,
        }
    }
}

impl From<Reply> for Status {
    fn from(reply: Reply) -> Self {
        match reply {
            Reply::Ack => Status::AckAccepted,
            Reply::Nack => Status::NackAccepted,
        }
    }
}

impl From<Inbound<'_>> for Status {
    fn from(_: Inbound<'_>) -> Self {
        Status::NoError
    }
}

impl From<()> for Status {
    fn from(_: ()) -> Self {
        Status::NoError
    }
}

impl<T: Into<Status>> From<Result<T>> for Status {
    fn from(result: Result<T>) -> Self {
        match result {
            Ok(value) => value.into(),
            Err(err) => err.into(),
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Status::NoError => "NO_ERROR",
            Status::FramingError => "FRAMING_ERROR",
            Status::DataError => "DATA_ERROR",
            Status::LogicalError => "LOGICAL_ERROR",
            Status::MsgSizeError => "MSG_SIZE_ERROR",
            Status::AckAccepted => "ACK_ACCEPTED",
            Status::NackAccepted => "NACK_ACCEPTED",
        };
        write!(f, "{} (0x{:02X})", name, self.code())
    }
}
