//! Plain-data types shared across the P1 ingest pipeline: the telegram
//! snapshot, the ring-buffer entry shapes, and the small enums the wire
//! format and the configuration layer both need.

use serde::{Deserialize, Serialize};

/// State of the meter's integrated load-limiting breaker (OBIS `0-0:96.3.10`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BreakerState {
    Disconnected,
    Connected,
    ReadyForConnection,
}

impl Default for BreakerState {
    fn default() -> Self {
        BreakerState::Disconnected
    }
}

impl BreakerState {
    pub fn from_code(code: u32) -> Self {
        match code {
            0 => BreakerState::Disconnected,
            2 => BreakerState::ReadyForConnection,
            _ => BreakerState::Connected,
        }
    }
}

/// One `{timestamp, demand}` sample, used for both the monthly peak and
/// the entries of the yearly peak history.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DemandPeak {
    pub timestamp: i64,
    pub demand: f64,
}

/// Up to 13 months of peak demand, terminated early by a zero-timestamp
/// sentinel per spec.md's documented convention (see Open Question #2 in
/// SPEC_FULL.md).
pub const MAX_DEMAND_YEAR_CAPACITY: usize = 13;

/// The authoritative, fully parsed current-state record (spec.md §3).
///
/// Fields keep the wire's own resolution; a freshly zeroed `TelegramSnapshot`
/// is the scratch record the parser fills in place before the store commits
/// it (spec.md §4.2 step 3, §9 "Auto-zero-on-reparse").
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelegramSnapshot {
    pub version_info: String,
    pub equipment_id: String,
    pub msg_timestamp: i64,

    pub electricity_delivered_tariff1: f64,
    pub electricity_delivered_tariff2: f64,
    pub electricity_returned_tariff1: f64,
    pub electricity_returned_tariff2: f64,
    pub tariff_indicator: u8,

    pub current_avg_demand: f64,
    pub max_demand_month: DemandPeak,
    pub max_demand_year: Vec<DemandPeak>,

    pub current_power_usage: f64,
    pub current_power_return: f64,
    pub current_power_usage_l1: f64,
    pub current_power_usage_l2: f64,
    pub current_power_usage_l3: f64,
    pub current_power_return_l1: f64,
    pub current_power_return_l2: f64,
    pub current_power_return_l3: f64,

    pub voltage_l1: f64,
    pub voltage_l2: f64,
    pub voltage_l3: f64,
    pub current_l1: f64,
    pub current_l2: f64,
    pub current_l3: f64,

    pub breaker_state: BreakerState,
    pub limiter_threshold: f64,
    pub fuse_supervision_threshold: f64,
}

/// Basic snapshot subset served by `/api/p1/data/basic` and embedded in
/// `/api/meter-data` (spec.md §4.3 `read_snapshot(complete: bool, ...)`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BasicSnapshot {
    pub msg_timestamp: i64,
    pub electricity_delivered_tariff1: f64,
    pub electricity_delivered_tariff2: f64,
    pub electricity_returned_tariff1: f64,
    pub electricity_returned_tariff2: f64,
    pub current_avg_demand: f64,
    pub current_power_usage: f64,
    pub current_power_return: f64,
}

impl From<&TelegramSnapshot> for BasicSnapshot {
    fn from(s: &TelegramSnapshot) -> Self {
        BasicSnapshot {
            msg_timestamp: s.msg_timestamp,
            electricity_delivered_tariff1: s.electricity_delivered_tariff1,
            electricity_delivered_tariff2: s.electricity_delivered_tariff2,
            electricity_returned_tariff1: s.electricity_returned_tariff1,
            electricity_returned_tariff2: s.electricity_returned_tariff2,
            current_avg_demand: s.current_avg_demand,
            current_power_usage: s.current_power_usage,
            current_power_return: s.current_power_return,
        }
    }
}

/// Short-term log entry (spec.md §3). Capacity `S = 900` (one entry per
/// second over a 15 minute window).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShortTermEntry {
    pub timestamp: i64,
    pub current_avg_demand: f64,
    pub current_power_usage: f64,
}

pub const SHORT_TERM_CAPACITY: usize = 900;

/// Long-term log entry (spec.md §3). Readings are scaled into integer
/// milli-kWh (`×1000, truncated`) so the ring holds no floating point state.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LongTermEntry {
    pub timestamp: i64,
    pub delivered_t1: i64,
    pub delivered_t2: i64,
    pub returned_t1: i64,
    pub returned_t2: i64,
}

/// ~24h of quarter-hour samples.
pub const LONG_TERM_CAPACITY: usize = 96;

/// Predicted-peak record (spec.md §3), overwritten as a whole.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictedPeak {
    pub value: f64,
    pub end_of_quarter_timestamp: i64,
}

/// Peak-prediction algorithm selector (spec.md §4.4 step 5, persisted in
/// configuration per §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PredictionMethod {
    LinearRegression,
    WeightedAverage,
}

impl Default for PredictionMethod {
    fn default() -> Self {
        PredictionMethod::LinearRegression
    }
}

/// Wi-Fi bring-up mode (spec.md §6 "Persistent configuration"). The radio
/// driver glue itself is out of the core's scope (spec.md §1); this enum is
/// the shape the configuration layer persists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WifiMode {
    Ap,
    Sta,
}

impl Default for WifiMode {
    fn default() -> Self {
        WifiMode::Sta
    }
}

impl TelegramSnapshot {
    pub fn to_short_term_entry(&self) -> ShortTermEntry {
        ShortTermEntry {
            timestamp: self.msg_timestamp,
            current_avg_demand: self.current_avg_demand,
            current_power_usage: self.current_power_usage,
        }
    }

    pub fn to_long_term_entry(&self) -> LongTermEntry {
        LongTermEntry {
            timestamp: self.msg_timestamp,
            delivered_t1: (self.electricity_delivered_tariff1 * 1000.0).trunc() as i64,
            delivered_t2: (self.electricity_delivered_tariff2 * 1000.0).trunc() as i64,
            returned_t1: (self.electricity_returned_tariff1 * 1000.0).trunc() as i64,
            returned_t2: (self.electricity_returned_tariff2 * 1000.0).trunc() as i64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn breaker_state_from_code() {
        assert_eq!(BreakerState::from_code(0), BreakerState::Disconnected);
        assert_eq!(BreakerState::from_code(1), BreakerState::Connected);
        assert_eq!(BreakerState::from_code(2), BreakerState::ReadyForConnection);
    }

    #[test]
    fn basic_snapshot_projects_complete() {
        let mut s = TelegramSnapshot::default();
        s.current_power_usage = 0.532;
        s.electricity_delivered_tariff1 = 11.111;
        let basic: BasicSnapshot = (&s).into();
        assert_eq!(basic.current_power_usage, 0.532);
        assert_eq!(basic.electricity_delivered_tariff1, 11.111);
    }

    #[test]
    fn long_term_entry_scales_to_milli_kwh() {
        let mut s = TelegramSnapshot::default();
        s.electricity_delivered_tariff1 = 11.1119;
        let e = s.to_long_term_entry();
        assert_eq!(e.delivered_t1, 11111);
    }
}
