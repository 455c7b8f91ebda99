use crc::{CRC_16_XMODEM, Crc};

const XMODEM: Crc<u16> = Crc::<u16>::new(&CRC_16_XMODEM);

/// CRC-16/XMODEM: poly 0x1021, init 0, no reflection, no final XOR.
pub fn crc16(bytes: &[u8]) -> u16 {
    XMODEM.checksum(bytes)
}

/// CRC over several slices as if they were one buffer.
pub(crate) fn crc16_parts(parts: &[&[u8]]) -> u16 {
    let mut digest = XMODEM.digest();
    for part in parts {
        digest.update(part);
    }
    digest.finalize()
}
