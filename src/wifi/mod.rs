//! Wi-Fi bring-up (spec.md §1 "Out of scope" / §6 "Persistent
//! configuration"): an external collaborator whose interface spec.md
//! names but whose internals (AP/STA fallback, radio driver glue) are not
//! respecified here. This module reads the persisted configuration and
//! logs the intended bring-up; it does not drive any hardware.

use log::info;

use crate::config::WifiConfig;
use crate::models::WifiMode;

/// Logs the Wi-Fi bring-up this configuration would perform. A real
/// target brings the radio up in AP or STA mode here and falls back to AP
/// if STA association fails; that driver glue is out of this crate's
/// scope (spec.md §1).
pub fn bring_up(config: &WifiConfig) {
    match config.mode {
        WifiMode::Ap => info!(
            "Wi-Fi bring-up: AP mode, ssid='{}', channel={}",
            config.ap_ssid, config.ap_channel
        ),
        WifiMode::Sta => info!(
            "Wi-Fi bring-up: STA mode, ssid='{}', hostname='{}'",
            config.sta_ssid, config.hostname
        ),
    }
}
