//! Wire frames.
//!
//! ```text
//! ping           5a a6
//! ping response  5a a7 | payload(6) | crc(u16)
//! special        5a a1/a2/a3
//! standard       5a a4/a5 | len(u16) | crc(u16) | payload(len)
//! ```
//!
//! All integers are little-endian. The CRC never covers itself.

use core::fmt;

use blhost_port::SimpleRead;
use derive_more::{Display, IsVariant};
use log::trace;

use crate::{
    consts::{
        ABORT, ACK, COMMAND, DATA, NACK, PING, PING_PAYLOAD_LEN, PING_RESPONSE, START_BYTE,
    },
    checksum::crc16_parts,
    err::FrameError,
};

type FrameResult<T> = Result<T, FrameError>;

/// Kind of a length-prefixed frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, IsVariant, Display)]
#[repr(u8)]
pub enum FrameKind {
    #[display("COMMAND")]
    Command = COMMAND,
    #[display("DATA")]
    Data = DATA,
}

impl TryFrom<u8> for FrameKind {
    type Error = FrameError;

    fn try_from(marker: u8) -> FrameResult<Self> {
        match marker {
            COMMAND => Ok(Self::Command),
            DATA => Ok(Self::Data),
            m => Err(FrameError::UnexpectedMarker(m)),
        }
    }
}

/// Flow-control signal carried by a 2-byte frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, IsVariant, Display)]
#[repr(u8)]
pub enum SpecialKind {
    #[display("ACK")]
    Ack = ACK,
    #[display("NACK")]
    Nack = NACK,
    #[display("ABORT")]
    Abort = ABORT,
}

impl TryFrom<u8> for SpecialKind {
    type Error = FrameError;

    fn try_from(marker: u8) -> FrameResult<Self> {
        match marker {
            ACK => Ok(Self::Ack),
            NACK => Ok(Self::Nack),
            ABORT => Ok(Self::Abort),
            m => Err(FrameError::UnexpectedMarker(m)),
        }
    }
}

/// Payload of a ping response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PingInfo([u8; PING_PAYLOAD_LEN]);

impl PingInfo {
    pub fn raw(&self) -> &[u8; PING_PAYLOAD_LEN] {
        &self.0
    }

    pub fn bugfix(&self) -> u8 {
        self.0[0]
    }

    pub fn minor(&self) -> u8 {
        self.0[1]
    }

    pub fn major(&self) -> u8 {
        self.0[2]
    }

    /// Protocol name, `'P'` on known devices.
    pub fn name(&self) -> u8 {
        self.0[3]
    }

    pub fn options(&self) -> u16 {
        u16::from_le_bytes([self.0[4], self.0[5]])
    }
}

impl fmt::Display for PingInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = if self.name().is_ascii_graphic() {
            self.name() as char
        } else {
            '?'
        };
        write!(
            f,
            "{name}{}.{}.{} options {:#06x}",
            self.major(),
            self.minor(),
            self.bugfix(),
            self.options()
        )
    }
}

/// A decoded standard frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StandardFrame {
    pub kind: FrameKind,
    pub payload: Vec<u8>,
}

pub fn encode_ping() -> [u8; 2] {
    [START_BYTE, PING]
}

pub fn encode_special(kind: SpecialKind) -> [u8; 2] {
    [START_BYTE, kind as u8]
}

/// Build `start | kind | len | crc | payload`.
pub fn encode_standard(kind: FrameKind, payload: &[u8]) -> FrameResult<Vec<u8>> {
    let len = u16::try_from(payload.len()).map_err(|_| FrameError::Oversized(payload.len()))?;
    let header = [START_BYTE, kind as u8];
    let len = len.to_le_bytes();
    let crc = crc16_parts(&[&header, &len, payload]);

    let mut frame = Vec::with_capacity(6 + payload.len());
    frame.extend_from_slice(&header);
    frame.extend_from_slice(&len);
    frame.extend_from_slice(&crc.to_le_bytes());
    frame.extend_from_slice(payload);
    Ok(frame)
}

/// Read the 2-byte frame header and check the start byte.
fn read_header<T: SimpleRead>(io: &mut T) -> FrameResult<[u8; 2]> {
    let mut header = [0; 2];
    io.read(&mut header)?;
    if header[0] != START_BYTE {
        trace!("<< {}", hex::encode(header));
        return Err(FrameError::BadStartByte(header[0]));
    }
    Ok(header)
}

pub fn decode_ping_response<T: SimpleRead>(io: &mut T) -> FrameResult<PingInfo> {
    let header = read_header(io)?;
    if header[1] != PING_RESPONSE {
        trace!("<< {}", hex::encode(header));
        return Err(FrameError::UnexpectedMarker(header[1]));
    }

    let mut payload = [0; PING_PAYLOAD_LEN];
    io.read(&mut payload)?;
    let found = io.read_u16_le()?;
    trace!(
        "<< {}{}{}",
        hex::encode(header),
        hex::encode(payload),
        hex::encode(found.to_le_bytes())
    );

    let expected = crc16_parts(&[&header, &payload]);
    if expected != found {
        return Err(FrameError::BadCrc {
            expected,
            found,
            payload: payload.to_vec(),
        });
    }

    Ok(PingInfo(payload))
}

pub fn decode_special<T: SimpleRead>(io: &mut T) -> FrameResult<SpecialKind> {
    let header = read_header(io)?;
    trace!("<< {}", hex::encode(header));
    SpecialKind::try_from(header[1])
}

/// Read one standard frame.
///
/// On a CRC mismatch the payload is still handed back inside
/// [`FrameError::BadCrc`] so the caller can keep its byte accounting in step
/// with the device.
pub fn decode_standard<T: SimpleRead>(io: &mut T) -> FrameResult<StandardFrame> {
    let header = read_header(io)?;
    let kind = FrameKind::try_from(header[1]).inspect_err(|_| {
        trace!("<< {}", hex::encode(header));
    })?;

    let len = io.read_u16_le()?;
    let found = io.read_u16_le()?;
    let payload = io.read_vec(len as usize)?;
    trace!(
        "<< {}{}{}{}",
        hex::encode(header),
        hex::encode(len.to_le_bytes()),
        hex::encode(found.to_le_bytes()),
        hex::encode(&payload)
    );

    let expected = crc16_parts(&[&header, &len.to_le_bytes(), &payload]);
    if expected != found {
        return Err(FrameError::BadCrc {
            expected,
            found,
            payload,
        });
    }

    Ok(StandardFrame { kind, payload })
}
