//! P1 smart-meter ingest core: frame assembly + parsing, the telemetry
//! store, and the peak predictor, plus the local HTTP API, mDNS discovery
//! and Wi-Fi/configuration glue around them.

pub mod api;
pub mod config;
pub mod discovery;
pub mod models;
pub mod p1;
pub mod predictor;
pub mod serial;
pub mod store;
pub mod wifi;

pub use config::CONFIG;
pub use store::Store;

pub fn get_unix_ts() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::SystemTime::UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64
}
