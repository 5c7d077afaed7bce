//! Byte-stream frame assembler (spec.md §4.1): reassembles complete DSMR
//! telegrams out of an arbitrarily-chunked byte stream, tolerating
//! interior non-telegram bytes and dropping silently on overflow.
//!
//! Grounded on the teacher's `metering_62056` ingest loop (`mod.rs`'s
//! `start_thread`, which hands whole messages to the parser one at a time)
//! generalized from line-buffered text into the framed, CRC-checked DSMR
//! wire format with an explicit bounded working buffer (§4.1).

use log::warn;

/// Capacity of the assembler's working buffer (spec.md §4.1).
pub const BUFFER_CAPACITY: usize = 1500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameState {
    Idle,
    Data,
    End,
}

/// Reassembles telegrams from a raw byte stream.
///
/// `feed` may be called with chunks of any size and any alignment relative
/// to telegram boundaries; it returns every telegram fully closed by the
/// bytes fed so far (often zero, sometimes more than one).
pub struct FrameAssembler {
    buf: Vec<u8>,
    state: FrameState,
}

impl FrameAssembler {
    pub fn new() -> Self {
        FrameAssembler {
            buf: Vec::with_capacity(BUFFER_CAPACITY),
            state: FrameState::Idle,
        }
    }

    fn reset(&mut self) {
        self.buf.clear();
        self.state = FrameState::Idle;
    }

    /// Feeds `bytes` into the assembler, returning every telegram (as a raw
    /// byte slice, `'/'..='!' + 4 hex digits + "\r\n"`) that this call
    /// closed.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<Vec<u8>> {
        let mut telegrams = Vec::new();

        for &byte in bytes {
            if self.buf.len() + 1 > BUFFER_CAPACITY {
                warn!("P1 frame buffer overflow, dropping in-progress telegram");
                self.reset();
                // The overflowing byte itself may be the start of the next
                // telegram; fall through to re-evaluate it against Idle.
            }

            match self.state {
                FrameState::Idle => {
                    if byte == b'/' {
                        self.buf.clear();
                        self.buf.push(byte);
                        self.state = FrameState::Data;
                    }
                    // Non-telegram bytes between frames are discarded.
                }
                FrameState::Data => {
                    self.buf.push(byte);
                    if byte == b'!' {
                        self.state = FrameState::End;
                    }
                }
                FrameState::End => {
                    self.buf.push(byte);
                    let n = self.buf.len();
                    if byte == b'\n' && n >= 2 && self.buf[n - 2] == b'\r' {
                        let mut telegram = self.buf.clone();
                        // Overwrite the trailing '\n' with NUL so the frame
                        // can be treated as a C-style string downstream
                        // (spec.md §4.1).
                        let last = telegram.len() - 1;
                        telegram[last] = 0;
                        telegrams.push(telegram);
                        self.reset();
                    }
                }
            }
        }

        telegrams
    }
}

impl Default for FrameAssembler {
    fn default() -> Self {
        Self::new()
    }
}
