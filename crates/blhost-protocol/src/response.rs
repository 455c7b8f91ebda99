use derive_more::IsVariant;

use crate::{err::DecodeError, packet::PacketHeader};

/// Response tags with a known parameter layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, IsVariant)]
#[repr(u8)]
pub enum ResponseKind {
    /// `[status, command tag]`
    Generic = 0xa0,
    /// `[status, value, ...]`
    GetProperty = 0xa7,
    /// `[status, byte count]`
    ReadMemory = 0xa3,
}

impl TryFrom<u8> for ResponseKind {
    type Error = DecodeError;

    fn try_from(tag: u8) -> Result<Self, DecodeError> {
        match tag {
            0xa0 => Ok(Self::Generic),
            0xa7 => Ok(Self::GetProperty),
            0xa3 => Ok(Self::ReadMemory),
            t => Err(DecodeError::UnsupportedTag(t)),
        }
    }
}

impl ResponseKind {
    /// Pull the parameter words out of a response packet of this kind.
    pub fn decode(self, payload: &[u8]) -> Result<Vec<u32>, DecodeError> {
        match self {
            Self::Generic | Self::GetProperty | Self::ReadMemory => counted_words(payload),
        }
    }
}

/// `param_count` little-endian words right after the header, nothing after them.
fn counted_words(payload: &[u8]) -> Result<Vec<u32>, DecodeError> {
    let header = PacketHeader::parse(payload)?;
    let needed = header.packet_len();
    if payload.len() < needed {
        return Err(DecodeError::Truncated {
            needed,
            got: payload.len(),
        });
    } else if payload.len() > needed {
        return Err(DecodeError::LengthMismatch {
            count: header.param_count,
            len: payload.len(),
        });
    }

    Ok(payload[4..]
        .chunks_exact(4)
        .map(|w| u32::from_le_bytes([w[0], w[1], w[2], w[3]]))
        .collect())
}

/// Decode the parameters of a response packet using the rule for `tag`.
pub fn decode_response(tag: u8, payload: &[u8]) -> Result<Vec<u32>, DecodeError> {
    ResponseKind::try_from(tag)?.decode(payload)
}
