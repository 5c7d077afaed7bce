//! Persistent key/value configuration (spec.md §6 "Persistent
//! configuration"): Wi-Fi mode/credentials, hostname, mDNS instance name,
//! and the peak-prediction method, YAML-backed on disk.
//!
//! Grounded on the teacher's `ConfigHolder` (`lazy_static! RwLock<...>`
//! global, dirty-flag + periodic-save task, `tokio::sync::broadcast`
//! change notifications) generalized from the teacher's many per-protocol
//! config blocks down to the single P1-sensor configuration shape this
//! crate needs.

use lazy_static::lazy_static;
use log::{debug, error, info};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::prelude::*;
use std::sync::RwLock;

use crate::models::{PredictionMethod, WifiMode};

fn httpd_enabled_default() -> bool { true }
fn httpd_port_default() -> u16 { 80 }
fn httpd_w_max_ms_default() -> u64 { 250 }

/// `W_max` (spec.md §4.5, §5 "Cancellation and timeouts"): the bounded
/// timeout HTTP handlers allow for lock acquisition before answering 5xx.
#[derive(Deserialize, Serialize, Clone)]
pub struct HttpdConfig {
    #[serde(default = "httpd_enabled_default")]
    pub enabled: bool,
    #[serde(default = "httpd_port_default")]
    pub port: u16,
    #[serde(default = "httpd_w_max_ms_default")]
    pub w_max_ms: u64,
}

fn serial_device_default() -> String { "/dev/ttyUSB0".to_string() }
fn serial_baud_default() -> u32 { 115_200 }
fn serial_rx_inverted_default() -> bool { true }

/// Serial bring-up (spec.md §6 "Serial input"): 8N1 at a configurable
/// baud rate, on an inverted-polarity RX pin (the P1 port's idle-high
/// convention). `rx_inverted` is recorded for the driver-glue layer; this
/// crate's `tokio-serial` based reader does not itself invert the line.
#[derive(Deserialize, Serialize, Clone)]
pub struct SerialConfig {
    #[serde(default = "serial_device_default")]
    pub device: String,
    #[serde(default = "serial_baud_default")]
    pub baud_rate: u32,
    #[serde(default = "serial_rx_inverted_default")]
    pub rx_inverted: bool,
}

fn wifi_hostname_default() -> String { "kwartiwi-p1".to_string() }
fn wifi_ap_channel_default() -> u8 { 6 }

#[derive(Deserialize, Serialize, Clone)]
pub struct WifiConfig {
    #[serde(default)]
    pub mode: WifiMode,
    #[serde(default = "wifi_hostname_default")]
    pub hostname: String,
    pub ap_ssid: String,
    pub ap_password: String,
    #[serde(default = "wifi_ap_channel_default")]
    pub ap_channel: u8,
    pub sta_ssid: String,
    pub sta_password: String,
}

fn mdns_instance_name_default() -> String { "Kwartiwi P1 sensor".to_string() }

#[derive(Deserialize, Serialize, Clone)]
pub struct MdnsConfig {
    #[serde(default = "mdns_instance_name_default")]
    pub instance_name: String,
}

fn prediction_method_default() -> PredictionMethod { PredictionMethod::LinearRegression }

#[derive(Deserialize, Serialize, Clone)]
pub struct PredictorConfig {
    #[serde(default = "prediction_method_default")]
    pub method: PredictionMethod,
}

fn httpd_default() -> HttpdConfig {
    HttpdConfig {
        enabled: httpd_enabled_default(),
        port: httpd_port_default(),
        w_max_ms: httpd_w_max_ms_default(),
    }
}
fn serial_default() -> SerialConfig {
    SerialConfig {
        device: serial_device_default(),
        baud_rate: serial_baud_default(),
        rx_inverted: serial_rx_inverted_default(),
    }
}
fn predictor_default() -> PredictorConfig {
    PredictorConfig { method: prediction_method_default() }
}

#[derive(Deserialize, Serialize, Clone)]
pub struct Config {
    #[serde(default = "httpd_default")]
    pub httpd: HttpdConfig,
    #[serde(default = "serial_default")]
    pub serial: SerialConfig,
    pub wifi: WifiConfig,
    #[serde(default)]
    pub mdns: MdnsConfig,
    #[serde(default = "predictor_default")]
    pub predictor: PredictorConfig,
}

impl Default for MdnsConfig {
    fn default() -> Self {
        MdnsConfig { instance_name: mdns_instance_name_default() }
    }
}

#[derive(Deserialize, Serialize, Clone, PartialEq)]
pub enum ConfigOperation {
    Add,
    Delete,
    Change,
}

#[derive(Deserialize, Serialize, Clone)]
pub struct ConfigChange {
    pub operation: ConfigOperation,
    pub base: String,
}

pub struct Callbacks {
    sender: tokio::sync::broadcast::Sender<ConfigChange>,
}

pub struct ConfigHolder {
    pub config: Config,
    pub callbacks: Callbacks,
    pub dirty: bool,
    pub base_path: String,
}

impl ConfigHolder {
    pub fn load() -> Self {
        let mut bpath = "config/".to_string();
        let mut file = File::open("config/kwartiwi-p1.yaml");
        if file.is_err() {
            file = Ok(File::open("kwartiwi-p1.yaml")
                .expect("Unable to read the config on config/kwartiwi-p1.yaml or kwartiwi-p1.yaml"));
            bpath = "".to_string();
        }
        let mut file = file.unwrap();

        let mut contents = String::new();
        file.read_to_string(&mut contents).expect("Unable to read config file");
        let c: Config = serde_yaml::from_str(&contents).expect("Unable to parse config file");
        let (s, _) = tokio::sync::broadcast::channel(16);

        ConfigHolder {
            config: c,
            callbacks: Callbacks { sender: s },
            dirty: false,
            base_path: bpath,
        }
    }

    pub fn save(&mut self) {
        if !self.dirty {
            debug!("Config is not dirty, nothing to save");
            return;
        }

        let config_path = format!("{}kwartiwi-p1.yaml", self.base_path);
        let backup_path = format!("{}backup.yaml", self.base_path);

        if fs::copy(&config_path, &backup_path).is_err() {
            error!("Backing up config failed, not replacing it");
            return;
        }

        match serde_yaml::to_string(&self.config) {
            Ok(yaml) => match fs::write(&config_path, yaml.as_bytes()) {
                Ok(_) => {
                    info!("Configuration written to {config_path}");
                    self.dirty = false;
                }
                Err(e) => error!("Error writing config: {e:?}"),
            },
            Err(e) => error!("Error serializing config: {e:?}"),
        }
    }

    pub fn get_change_receiver(&self) -> tokio::sync::broadcast::Receiver<ConfigChange> {
        self.callbacks.sender.subscribe()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_dirty(&mut self, operation: ConfigOperation, base: &str) {
        self.dirty = true;
        let _ = self.callbacks.sender.send(ConfigChange { operation, base: base.to_string() });
    }

    pub fn get_complete_config(&self) -> Config {
        self.config.clone()
    }
}

lazy_static! {
    pub static ref CONFIG: RwLock<ConfigHolder> = RwLock::new(ConfigHolder::load());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_roundtrips_through_yaml() {
        let config = Config {
            httpd: httpd_default(),
            serial: serial_default(),
            wifi: WifiConfig {
                mode: WifiMode::Sta,
                hostname: "test".to_string(),
                ap_ssid: String::new(),
                ap_password: String::new(),
                ap_channel: 6,
                sta_ssid: "home".to_string(),
                sta_password: "secret".to_string(),
            },
            mdns: MdnsConfig::default(),
            predictor: predictor_default(),
        };
        let yaml = serde_yaml::to_string(&config).unwrap();
        let parsed: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed.wifi.sta_ssid, "home");
        assert_eq!(parsed.httpd.port, 80);
    }

    fn sample_config() -> Config {
        Config {
            httpd: httpd_default(),
            serial: serial_default(),
            wifi: WifiConfig {
                mode: WifiMode::Ap,
                hostname: "kwartiwi-p1".to_string(),
                ap_ssid: "kwartiwi".to_string(),
                ap_password: "changeme".to_string(),
                ap_channel: 6,
                sta_ssid: String::new(),
                sta_password: String::new(),
            },
            mdns: MdnsConfig::default(),
            predictor: predictor_default(),
        }
    }

    /// `save()` refuses to overwrite the config file unless a backup copy
    /// succeeds first; exercised against a real temp directory since both
    /// the original and the backup file have to exist on disk for that
    /// check to mean anything.
    #[test]
    fn save_is_a_no_op_when_not_dirty() {
        let dir = tempfile::tempdir().unwrap();
        let base_path = format!("{}/", dir.path().display());
        let config_path = format!("{base_path}kwartiwi-p1.yaml");
        fs::write(&config_path, serde_yaml::to_string(&sample_config()).unwrap()).unwrap();

        let (sender, _) = tokio::sync::broadcast::channel(16);
        let mut holder = ConfigHolder {
            config: sample_config(),
            callbacks: Callbacks { sender },
            dirty: false,
            base_path,
        };
        holder.save();
        assert!(!std::path::Path::new(&format!("{}backup.yaml", dir.path().display())).exists());
    }

    #[test]
    fn save_writes_config_and_backup_when_dirty() {
        let dir = tempfile::tempdir().unwrap();
        let base_path = format!("{}/", dir.path().display());
        let config_path = format!("{base_path}kwartiwi-p1.yaml");
        fs::write(&config_path, serde_yaml::to_string(&sample_config()).unwrap()).unwrap();

        let (sender, _) = tokio::sync::broadcast::channel(16);
        let mut config = sample_config();
        config.httpd.port = 8080;
        let mut holder = ConfigHolder {
            config,
            callbacks: Callbacks { sender },
            dirty: true,
            base_path: base_path.clone(),
        };
        holder.save();

        assert!(!holder.is_dirty());
        let written = fs::read_to_string(&config_path).unwrap();
        let parsed: Config = serde_yaml::from_str(&written).unwrap();
        assert_eq!(parsed.httpd.port, 8080);
        assert!(std::path::Path::new(&format!("{base_path}backup.yaml")).exists());
    }

    #[test]
    fn mark_dirty_broadcasts_the_change() {
        let (sender, mut receiver) = tokio::sync::broadcast::channel(16);
        let mut holder = ConfigHolder {
            config: sample_config(),
            callbacks: Callbacks { sender },
            dirty: false,
            base_path: String::new(),
        };
        holder.mark_dirty(ConfigOperation::Change, "wifi");
        assert!(holder.is_dirty());
        let change = receiver.try_recv().unwrap();
        assert_eq!(change.base, "wifi");
        assert!(change.operation == ConfigOperation::Change);
    }
}
