use derive_ctor::ctor;
use derive_more::IsVariant;

use crate::{
    Result,
    consts::PACKET_HEADER_LEN,
    err::{DecodeError, Error},
};

/// Command tags understood by the bootloader
#[derive(Debug, Clone, Copy, PartialEq, Eq, IsVariant)]
#[repr(u8)]
pub enum CommandTag {
    ReadMemory = 0x03,
    WriteMemory = 0x04,
    GetProperty = 0x07,
}

/// Host to device command: `tag | flags | 0 | count | params(count x u32)`.
#[derive(Debug, Clone, PartialEq, Eq, ctor)]
pub struct CommandPacket {
    pub tag: u8,
    pub flags: u8,
    pub params: Vec<u32>,
}

impl CommandPacket {
    pub fn encode(&self) -> Result<Vec<u8>> {
        let count = u8::try_from(self.params.len()).map_err(|_| {
            Error::InvalidArgument(format!(
                "command {:#04x} has {} parameters, at most 255 fit",
                self.tag,
                self.params.len()
            ))
        })?;

        let mut packet = Vec::with_capacity(PACKET_HEADER_LEN + 4 * self.params.len());
        packet.extend_from_slice(&[self.tag, self.flags, 0, count]);
        for param in &self.params {
            packet.extend_from_slice(&param.to_le_bytes());
        }
        Ok(packet)
    }
}

/// Header shared by command and response packets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketHeader {
    pub tag: u8,
    pub flags: u8,
    pub reserved: u8,
    pub param_count: u8,
}

impl PacketHeader {
    pub fn parse(payload: &[u8]) -> core::result::Result<Self, DecodeError> {
        match payload {
            [tag, flags, reserved, param_count, ..] => Ok(Self {
                tag: *tag,
                flags: *flags,
                reserved: *reserved,
                param_count: *param_count,
            }),
            _ => Err(DecodeError::Truncated {
                needed: PACKET_HEADER_LEN,
                got: payload.len(),
            }),
        }
    }

    /// Exact packet length this header announces.
    pub fn packet_len(&self) -> usize {
        PACKET_HEADER_LEN + 4 * self.param_count as usize
    }
}
