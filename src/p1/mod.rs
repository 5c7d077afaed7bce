//! DSMR-5.0 P1 telegram framing and parsing (spec.md §4.1, §4.2).

pub mod crc;
pub mod frame;
pub mod obis;
pub mod parser;
