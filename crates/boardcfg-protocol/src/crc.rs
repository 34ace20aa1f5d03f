//! CRC-16 used to protect frame payloads.
//!
//! The board firmware computes the reflected CCITT polynomial (0x1021) with
//! an initial value and final XOR of 0xFFFF, which the `crc` catalogue lists
//! as CRC-16/IBM-SDLC (also known as X-25).

use crc::{Crc, CRC_16_IBM_SDLC};

const CRC16: Crc<u16> = Crc::<u16>::new(&CRC_16_IBM_SDLC);

/// Checksum of a frame payload.
pub fn crc16(payload: &[u8]) -> u16 {
    CRC16.checksum(payload)
}
