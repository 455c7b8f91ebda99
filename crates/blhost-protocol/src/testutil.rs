//! Device-side frames for scripting a [`blhost_port::mock::MockPort`].

use crate::{
    checksum::crc16,
    consts::{ABORT, ACK, NACK, START_BYTE},
    frame::{FrameKind, encode_standard},
};

pub const ACK_FRAME: [u8; 2] = [START_BYTE, ACK];
pub const NACK_FRAME: [u8; 2] = [START_BYTE, NACK];
pub const ABORT_FRAME: [u8; 2] = [START_BYTE, ABORT];

pub fn ping_response() -> Vec<u8> {
    let mut frame = vec![START_BYTE, 0xa7, 0x00, 0x00, 0x02, b'P', 0x00, 0x00];
    let crc = crc16(&frame);
    frame.extend_from_slice(&crc.to_le_bytes());
    frame
}

pub fn response(tag: u8, params: &[u32]) -> Vec<u8> {
    let mut packet = vec![tag, 0, 0, params.len() as u8];
    for param in params {
        packet.extend_from_slice(&param.to_le_bytes());
    }
    encode_standard(FrameKind::Command, &packet).unwrap()
}

pub fn data(payload: &[u8]) -> Vec<u8> {
    encode_standard(FrameKind::Data, payload).unwrap()
}

/// Flip the CRC of a standard frame.
pub fn corrupt(mut frame: Vec<u8>) -> Vec<u8> {
    frame[4] ^= 0xff;
    frame
}

/// Split what the host wrote into `(marker, payload)` pairs.
pub fn host_frames(tx: &[u8]) -> Vec<(u8, Vec<u8>)> {
    let mut frames = vec![];
    let mut rest = tx;
    while !rest.is_empty() {
        assert_eq!(rest[0], START_BYTE, "host frame out of sync");
        match rest[1] {
            0xa4 | 0xa5 => {
                let len = u16::from_le_bytes([rest[2], rest[3]]) as usize;
                frames.push((rest[1], rest[6..6 + len].to_vec()));
                rest = &rest[6 + len..];
            }
            marker => {
                frames.push((marker, vec![]));
                rest = &rest[2..];
            }
        }
    }
    frames
}

pub fn markers(tx: &[u8]) -> Vec<u8> {
    host_frames(tx).into_iter().map(|(m, _)| m).collect()
}

/// Lengths of the DATA frames the host wrote.
pub fn data_lens(tx: &[u8]) -> Vec<usize> {
    host_frames(tx)
        .into_iter()
        .filter(|(m, _)| *m == 0xa5)
        .map(|(_, p)| p.len())
        .collect()
}
