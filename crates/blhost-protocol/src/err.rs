use thiserror::Error as TError;

use crate::{frame::SpecialKind, status::Status};

fn closing_status(status: &Option<u32>) -> String {
    status.map_or_else(String::new, |s| format!(", status {}", Status(s)))
}

/// Failure while reading or writing one frame.
#[derive(Debug, TError)]
pub enum FrameError {
    /// The link stayed quiet or delivered a partial frame
    #[error("timed out reading frame")]
    Timeout,

    /// First byte of the frame was not the start byte (link desync)
    #[error("bad start byte {0:#04x}")]
    BadStartByte(u8),

    /// Frame type marker doesn't fit the frame that was expected here
    #[error("unexpected frame marker {0:#04x}")]
    UnexpectedMarker(u8),

    /// Checksum mismatch. `payload` is what arrived and can't be trusted.
    #[error("CRC mismatch: computed {expected:#06x}, frame carried {found:#06x}")]
    BadCrc {
        expected: u16,
        found: u16,
        payload: Vec<u8>,
    },

    /// Payload doesn't fit the 16-bit length field
    #[error("payload of {0} bytes doesn't fit a frame")]
    Oversized(usize),

    /// Transport failure other than a timeout
    #[error("port error: {0}")]
    Port(blhost_port::err::Error),
}

impl From<blhost_port::err::Error> for FrameError {
    fn from(e: blhost_port::err::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else {
            Self::Port(e)
        }
    }
}

impl FrameError {
    /// Whether the link can no longer be trusted to carry the handshake.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Timeout | Self::Port(_))
    }
}

/// Failure while pulling parameters out of a response packet.
#[derive(Debug, TError)]
pub enum DecodeError {
    /// No decoding rule for this response tag
    #[error("unsupported response tag {0:#04x}")]
    UnsupportedTag(u8),

    /// Packet is shorter than its header says
    #[error("response truncated: need {needed} bytes, got {got}")]
    Truncated { needed: usize, got: usize },

    /// Packet carries bytes past its declared parameters
    #[error("response length {len} doesn't match {count} parameters")]
    LengthMismatch { count: u8, len: usize },

    /// Response has no status word
    #[error("response carries no status code")]
    MissingStatus,
}

#[derive(Debug, TError)]
pub enum Error {
    /// No or partial data within the read deadline, the transaction is over
    #[error("timed out waiting for the device")]
    Timeout,

    /// Frame-level failure that was reported while the handshake carried on
    #[error("frame error: {0}")]
    Frame(FrameError),

    /// Response packet couldn't be decoded
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Response tag doesn't belong to the command that was sent
    #[error("unexpected response tag: expected {expected:#04x}, got {found:#04x}")]
    UnexpectedTag { expected: u8, found: u8 },

    /// Device answered the command with something other than ACK
    #[error("device didn't accept the command ({0})")]
    NoResponse(SpecialKind),

    /// Device stopped the data phase
    #[error(
        "transfer aborted by device ({reason}) after chunk {sent} of {total}{}",
        closing_status(.status)
    )]
    TransferAborted {
        sent: usize,
        total: usize,
        reason: SpecialKind,
        /// Status of the response that closed the data phase
        status: Option<u32>,
    },

    /// Caller input the protocol can't express
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Transport failure other than a timeout
    #[error("port error: {0}")]
    Port(blhost_port::err::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<FrameError> for Error {
    fn from(e: FrameError) -> Self {
        match e {
            FrameError::Timeout => Self::Timeout,
            FrameError::Port(e) => Self::Port(e),
            e => Self::Frame(e),
        }
    }
}

impl From<blhost_port::err::Error> for Error {
    fn from(e: blhost_port::err::Error) -> Self {
        FrameError::from(e).into()
    }
}

impl Error {
    /// Whether the transaction has to stop instead of finishing the handshake.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Timeout | Self::Port(_) | Self::Io(_))
    }
}
