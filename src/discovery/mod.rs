//! mDNS service discovery (spec.md §6 "Service discovery"): advertises
//! `_kwartiwi-p1._tcp` on port 80 with the configured hostname and
//! instance name.
//!
//! Not present in the teacher (`energy2mqtt` has no discovery layer at
//! all); grounded on `mdns-sd`, the crate
//! `ZilverZtream-OEC-Open_Energy_Controller` pulls in behind its
//! `discovery` feature for the same purpose.

use log::{error, info};
use mdns_sd::{ServiceDaemon, ServiceInfo};

use crate::config::{MdnsConfig, WifiConfig};

const SERVICE_TYPE: &str = "_kwartiwi-p1._tcp.local.";

/// Registers the mDNS service and returns the daemon handle; the service
/// stays advertised for as long as the handle (or its underlying daemon)
/// lives. Registration failures are logged and otherwise non-fatal — mDNS
/// is a convenience, not a requirement for the HTTP API to work.
pub fn advertise(wifi: &WifiConfig, mdns: &MdnsConfig, port: u16) -> Option<ServiceDaemon> {
    let daemon = match ServiceDaemon::new() {
        Ok(d) => d,
        Err(e) => {
            error!("Failed to start mDNS daemon: {e}");
            return None;
        }
    };

    let host = format!("{}.local.", wifi.hostname);
    let info = match ServiceInfo::new(
        SERVICE_TYPE,
        &mdns.instance_name,
        &host,
        "",
        port,
        None,
    ) {
        Ok(info) => info.enable_addr_auto(),
        Err(e) => {
            error!("Failed to build mDNS service info: {e}");
            return None;
        }
    };

    match daemon.register(info) {
        Ok(_) => {
            info!(
                "Advertising {} as '{}' on port {}",
                SERVICE_TYPE, mdns.instance_name, port
            );
            Some(daemon)
        }
        Err(e) => {
            error!("Failed to register mDNS service: {e}");
            None
        }
    }
}
