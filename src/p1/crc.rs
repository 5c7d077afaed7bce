//! CRC16 as used by DSMR-5.0 P1 telegrams: polynomial `0xA001` (the
//! bit-reflected form of `0x8005`), initial value `0`, no final XOR,
//! LSB-first bit processing (spec.md §4.2 step 1) — the CRC-16/ARC
//! profile.
//!
//! Grounded on the teacher's own use of the registry `crc16` crate
//! (`metering_oms/utils.rs`'s `State::<EN_13757>`) for its OMS telegram
//! checksum; `EN_13757` is a different profile (init `0xFFFF`), but the
//! same crate's `ARC` catalog entry is the DSMR profile bit-for-bit.

use crc16::{State, ARC};

/// Computes the CRC16 over `data`, matching the DSMR telegram checksum.
pub fn crc16(data: &[u8]) -> u16 {
    State::<ARC>::calculate(data)
}

/// Formats a CRC16 value the way the telegram encodes it: four uppercase
/// hex digits.
pub fn format_crc(crc: u16) -> [u8; 4] {
    let hex = format!("{:04X}", crc);
    let bytes = hex.as_bytes();
    [bytes[0], bytes[1], bytes[2], bytes[3]]
}
