//! CRC-16/CCITT-FALSE as used by the EMV QR checksum field (tag 63).
//!
//! Parameters: poly 0x1021, init 0xFFFF, MSB-first, no reflection, no final XOR.

use crc::{Crc, CRC_16_IBM_3740};

// IBM-3740 is the catalogue name for CCITT-FALSE.
const CRC16: Crc<u16> = Crc::<u16>::new(&CRC_16_IBM_3740);

/// Compute the checksum over raw bytes.
pub fn crc16_ccitt_false(data: &[u8]) -> u16 {
    CRC16.checksum(data)
}

/// Checksum rendered the way the payload carries it: 4 uppercase hex digits.
pub fn checksum_hex(data: &str) -> String {
    format!("{:04X}", crc16_ccitt_false(data.as_bytes()))
}

/// Recompute the trailing checksum of a complete payload.
///
/// The last 4 characters must equal the CRC of everything before them, and
/// the 4 characters before those must be the checksum header `6304`.
pub fn verify_payload(payload: &str) -> bool {
    if payload.len() < 8 || !payload.is_ascii() {
        return false;
    }
    let (body, tail) = payload.split_at(payload.len() - 4);
    if !body.ends_with("6304") {
        return false;
    }
    checksum_hex(body).eq_ignore_ascii_case(tail)
}
