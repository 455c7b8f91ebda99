/// First byte of every frame in both directions.
pub const START_BYTE: u8 = 0x5a;

pub const PING: u8 = 0xa6;
pub const PING_RESPONSE: u8 = 0xa7;

pub const COMMAND: u8 = 0xa4;
pub const DATA: u8 = 0xa5;

pub const ACK: u8 = 0xa1;
pub const NACK: u8 = 0xa2;
pub const ABORT: u8 = 0xa3;

/// Ping response payload: version bugfix, minor, major, name, options (u16).
pub const PING_PAYLOAD_LEN: usize = 6;

/// tag, flags, reserved, parameter count
pub const PACKET_HEADER_LEN: usize = 4;

/// Chunk size used when the device can't tell its own.
pub const DEFAULT_MAX_CHUNK: usize = 512;
