//! P1 reader task (spec.md §5 "P1 reader"): drains the serial port,
//! reassembles telegrams via [`crate::p1::frame::FrameAssembler`], hands
//! each complete frame to the parser, and commits successfully-parsed
//! snapshots to the store.
//!
//! Grounded on the teacher's manager task shape (`metering_62056::Manager`:
//! a `start_thread` loop that owns one I/O source and forwards parsed
//! results onward) generalized from an mpsc-fed text channel to a real
//! serial port read loop.

use std::sync::Arc;
use std::time::Duration;

use log::{error, info, warn};
use tokio::io::AsyncReadExt;
use tokio_serial::SerialPortBuilderExt;

use crate::config::SerialConfig;
use crate::p1::frame::FrameAssembler;
use crate::p1::parser::{self, ParseError};
use crate::store::Store;

/// Driver-installed ring buffer size (spec.md §6 "Serial input").
const READ_CHUNK: usize = 1024;

/// Opens the configured serial port (8N1, configured baud, §6) and runs
/// the read loop until the port errors out, at which point it is reopened
/// after a short backoff — the data plane is "soft" (spec.md §7): transport
/// errors are logged and absorbed, never fatal.
pub async fn run(store: Arc<Store>, config: SerialConfig) {
    loop {
        match open_port(&config) {
            Ok(mut port) => {
                info!("P1 serial port {} opened at {} baud", config.device, config.baud_rate);
                let mut assembler = FrameAssembler::new();
                let mut buf = [0u8; READ_CHUNK];
                loop {
                    match port.read(&mut buf).await {
                        Ok(0) => {
                            warn!("P1 serial port returned EOF, reopening");
                            break;
                        }
                        Ok(n) => {
                            for frame in assembler.feed(&buf[..n]) {
                                handle_frame(&store, &frame).await;
                            }
                        }
                        Err(e) => {
                            error!("P1 serial read error: {e}, reopening port");
                            break;
                        }
                    }
                }
            }
            Err(e) => {
                error!("Failed to open P1 serial port {}: {e}", config.device);
            }
        }
        tokio::time::sleep(Duration::from_secs(5)).await;
    }
}

fn open_port(config: &SerialConfig) -> tokio_serial::Result<tokio_serial::SerialStream> {
    tokio_serial::new(&config.device, config.baud_rate)
        .data_bits(tokio_serial::DataBits::Eight)
        .parity(tokio_serial::Parity::None)
        .stop_bits(tokio_serial::StopBits::One)
        .open_native_async()
}

async fn handle_frame(store: &Store, frame: &[u8]) {
    match parser::parse_telegram(frame) {
        Ok(snapshot) => {
            // Committing fires the "telegram available" edge; the logger
            // task (spec.md §5 "Logger") does the ring-buffer appends once
            // it wakes on that edge.
            store.commit_snapshot(snapshot).await;
        }
        Err(ParseError::CrcMismatch) => {
            warn!("Dropping P1 telegram: CRC mismatch");
        }
        Err(ParseError::TooShort) => {
            warn!("Dropping P1 telegram: frame shorter than CRC trailer");
        }
    }
}
