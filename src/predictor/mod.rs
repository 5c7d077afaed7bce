//! Peak predictor (spec.md §4.4): a periodic task that reads the
//! short-term log and predicts the instantaneous power peak at the end of
//! the ongoing quarter-hour billing window, by one of two algorithms.
//!
//! Grounded on the teacher's periodic-task shape (`main.rs`'s uptime
//! publisher: a `tokio::time::interval` loop that reads shared state,
//! computes, and republishes) generalized from a fixed publish payload
//! into the regression/weighted-average computation this spec names.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, TimeZone, Timelike};
use log::{debug, warn};

use crate::models::{PredictedPeak, PredictionMethod, ShortTermEntry};
use crate::store::Store;

/// Predictor tick period (spec.md §4.4 `T = 5 s`).
pub const TICK_PERIOD: Duration = Duration::from_secs(5);

/// Runs the predictor loop forever, waking every [`TICK_PERIOD`] on a
/// tick-deadline basis (`tokio::time::interval`, which — like the spec's
/// deadline-based delay — does not let a long cycle push the next tick
/// later; missed ticks are simply coalesced).
pub async fn run(store: Arc<Store>, method: PredictionMethod) {
    let mut ticker = tokio::time::interval(TICK_PERIOD);
    loop {
        ticker.tick().await;
        tick(&store, method).await;
    }
}

/// Runs a single predictor cycle (spec.md §4.4 steps 1-6).
pub async fn tick(store: &Store, method: PredictionMethod) {
    let log = store.snapshot_short_term(usize::MAX).await;
    if log.len() <= 1 {
        return;
    }

    let k = alignment_index(&log);
    let Some(end_of_quarter) = end_of_quarter_timestamp(log[k].timestamp) else {
        warn!("Failed to compute end-of-quarter timestamp, skipping predictor cycle");
        return;
    };

    let prediction = match method {
        PredictionMethod::LinearRegression => linear_regression(&log[k..], end_of_quarter),
        PredictionMethod::WeightedAverage => weighted_average(&log, end_of_quarter),
    };

    debug!(
        "Predicted peak: {:.3} kW at {}",
        prediction.value, prediction.end_of_quarter_timestamp
    );
    store.set_predicted_peak(prediction).await;
}

/// The smallest index whose entry lands exactly on a quarter-hour boundary
/// (`minute % 15 == 0 && second == 0`); falls back to 0 if none qualifies
/// (spec.md §4.4 step 3).
pub fn alignment_index(log: &[ShortTermEntry]) -> usize {
    for (i, entry) in log.iter().enumerate() {
        if let Some(dt) = Local.timestamp_opt(entry.timestamp, 0).single() {
            if dt.minute() % 15 == 0 && dt.second() == 0 {
                return i;
            }
        }
    }
    0
}

/// Zeroes seconds and rounds minutes up to the next multiple of 15,
/// carrying into the hour on wraparound (spec.md §4.4 step 4).
fn end_of_quarter_timestamp(from: i64) -> Option<i64> {
    let dt = Local.timestamp_opt(from, 0).single()?;
    let minute = dt.minute();
    let rounded_minute = ((minute / 15) + 1) * 15;
    let (hour_carry, minute) = if rounded_minute >= 60 {
        (1, rounded_minute - 60)
    } else {
        (0, rounded_minute)
    };
    let truncated = dt
        .with_second(0)?
        .with_nanosecond(0)?
        .with_minute(minute)?;
    let truncated = truncated + chrono::Duration::hours(hour_carry);
    Some(truncated.timestamp())
}

/// Least squares over `current_avg_demand` vs. elapsed time, extrapolated
/// to `end_of_quarter` (spec.md §4.4 "Linear regression").
fn linear_regression(entries: &[ShortTermEntry], end_of_quarter: i64) -> PredictedPeak {
    let n = entries.len() as f64;
    let t0 = entries[0].timestamp;
    let last = entries.last().unwrap();

    let sum_x: f64 = entries.iter().map(|e| (e.timestamp - t0) as f64).sum();
    let sum_xx: f64 = entries.iter().map(|e| ((e.timestamp - t0) as f64).powi(2)).sum();
    let sum_y: f64 = entries.iter().map(|e| e.current_avg_demand).sum();
    let sum_xy: f64 = entries
        .iter()
        .map(|e| (e.timestamp - t0) as f64 * e.current_avg_demand)
        .sum();

    let x_bar = sum_x / n;
    let y_bar = sum_y / n;
    let denom = sum_xx - sum_x * x_bar;

    let slope = if denom.abs() < f64::EPSILON {
        0.0
    } else {
        (sum_xy - sum_x * y_bar) / denom
    };

    let value = last.current_avg_demand + slope * (end_of_quarter - last.timestamp) as f64;
    PredictedPeak {
        value,
        end_of_quarter_timestamp: end_of_quarter,
    }
}

/// Weighted average of `current_power_usage` over the whole log, weight
/// `w_i = (t_i - t_0) + 1` (spec.md §4.4 "Weighted average").
fn weighted_average(entries: &[ShortTermEntry], end_of_quarter: i64) -> PredictedPeak {
    let t0 = entries[0].timestamp;
    let mut weighted_sum = 0.0;
    let mut weight_sum = 0.0;
    for e in entries {
        let w = (e.timestamp - t0) as f64 + 1.0;
        weighted_sum += w * e.current_power_usage;
        weight_sum += w;
    }
    let value = if weight_sum == 0.0 { 0.0 } else { weighted_sum / weight_sum };
    PredictedPeak {
        value,
        end_of_quarter_timestamp: end_of_quarter,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(timestamp: i64, avg: f64, power: f64) -> ShortTermEntry {
        ShortTermEntry { timestamp, current_avg_demand: avg, current_power_usage: power }
    }

    #[test]
    fn constant_log_has_zero_slope_and_predicts_the_constant() {
        let log = vec![entry(0, 3.0, 0.0), entry(1, 3.0, 0.0), entry(2, 3.0, 0.0)];
        let p = linear_regression(&log, 900);
        assert!((p.value - 3.0).abs() < 1e-9);
    }

    #[test]
    fn linear_log_extrapolates_exactly() {
        // S4 in spec.md §8: avg demand [1,2,3] at t=[0,60,120], E=900.
        let log = vec![entry(0, 1.0, 0.0), entry(60, 2.0, 0.0), entry(120, 3.0, 0.0)];
        let p = linear_regression(&log, 900);
        assert!((p.value - 16.0).abs() < 1e-6);
        assert_eq!(p.end_of_quarter_timestamp, 900);
    }

    #[test]
    fn weighted_average_matches_worked_example() {
        // S5 in spec.md §8: power [2,4] at t=[0,30] -> (1*2+31*4)/32 = 3.9375
        let log = vec![entry(0, 0.0, 2.0), entry(30, 0.0, 4.0)];
        let p = weighted_average(&log, 900);
        assert!((p.value - 3.9375).abs() < 1e-9);
    }

    #[test]
    fn alignment_index_falls_back_to_zero_when_absent() {
        let log = vec![entry(1, 0.0, 0.0), entry(2, 0.0, 0.0)];
        assert_eq!(alignment_index(&log), 0);
    }

    #[tokio::test]
    async fn empty_or_singleton_log_suppresses_write() {
        let store = Store::new();
        tick(&store, PredictionMethod::LinearRegression).await;
        let peak = store.get_predicted_peak().await;
        assert_eq!(peak.value, 0.0);

        store
            .append_short_term(entry(0, 1.0, 1.0))
            .await;
        tick(&store, PredictionMethod::LinearRegression).await;
        let peak = store.get_predicted_peak().await;
        assert_eq!(peak.value, 0.0);
    }
}
