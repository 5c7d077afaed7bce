//! Telemetry store (spec.md §4.3): owns the latest snapshot, the two ring
//! buffers, and the predicted-peak cell, each behind its own lock per
//! spec.md §3 "Ownership".
//!
//! The module-level `lazy_static! RwLock<...>` global used by the teacher's
//! `config` module is generalized here into an owned, shareable `Store`
//! (spec.md §9 "Module-level mutable state": "package each store as an
//! owned aggregate with methods"). The "telegram available" event bit
//! becomes a `tokio::sync::Notify`, the closest async-native primitive to
//! a level-triggered, auto-clearing signal.

pub mod logger;
pub mod ring;

use std::sync::Arc;

use tokio::sync::{Mutex, Notify, RwLock};

use crate::models::{
    BasicSnapshot, LongTermEntry, PredictedPeak, ShortTermEntry, TelegramSnapshot,
    LONG_TERM_CAPACITY, SHORT_TERM_CAPACITY,
};
use ring::RingBuffer;

/// Quarter-hour bucket width in seconds (spec.md glossary).
pub const QUARTER_HOUR_SECONDS: i64 = 900;

pub struct Store {
    snapshot: RwLock<TelegramSnapshot>,
    short_term: Mutex<RingBuffer<ShortTermEntry, SHORT_TERM_CAPACITY>>,
    long_term: Mutex<RingBuffer<LongTermEntry, LONG_TERM_CAPACITY>>,
    predicted_peak: RwLock<PredictedPeak>,
    telegram_available: Notify,
}

impl Store {
    pub fn new() -> Arc<Self> {
        Arc::new(Store {
            snapshot: RwLock::new(TelegramSnapshot::default()),
            short_term: Mutex::new(RingBuffer::new()),
            long_term: Mutex::new(RingBuffer::new()),
            predicted_peak: RwLock::new(PredictedPeak::default()),
            telegram_available: Notify::new(),
        })
    }

    /// Commits a freshly parsed snapshot as the new current state and fires
    /// the "telegram available" edge (spec.md §4.2 step 3). Only ever
    /// called with a snapshot that already passed CRC validation.
    pub async fn commit_snapshot(&self, snapshot: TelegramSnapshot) {
        {
            let mut guard = self.snapshot.write().await;
            *guard = snapshot;
        }
        // `notify_one` buffers a single permit when no task is currently
        // waiting, so the logger task sees the edge even if it hasn't
        // called `wait_for_telegram` yet; multiple commits before the
        // logger wakes still coalesce into one wakeup, matching the
        // level-triggered, auto-clearing event bit of spec.md §4.3.
        self.telegram_available.notify_one();
    }

    /// Waits for the next "telegram available" edge. Auto-clears: a waiter
    /// parked before the edge fires wakes exactly once per edge.
    pub async fn wait_for_telegram(&self) {
        self.telegram_available.notified().await;
    }

    pub async fn get_snapshot_basic(&self) -> BasicSnapshot {
        let guard = self.snapshot.read().await;
        BasicSnapshot::from(&*guard)
    }

    pub async fn get_snapshot_complete(&self) -> TelegramSnapshot {
        self.snapshot.read().await.clone()
    }

    /// Appends to the short-term log (spec.md §4.3 `append_short_term`).
    pub async fn append_short_term(&self, entry: ShortTermEntry) {
        let mut guard = self.short_term.lock().await;
        guard.push(entry);
    }

    /// Appends to the long-term log with quarter-hour bucketing (spec.md
    /// §4.3 `append_long_term`): one slot per bucket, newest observation of
    /// a bucket wins.
    pub async fn append_long_term(&self, entry: LongTermEntry) {
        let mut guard = self.long_term.lock().await;
        let new_bucket = entry.timestamp / QUARTER_HOUR_SECONDS;

        if guard.is_empty() {
            guard.push(entry);
            return;
        }

        let head_bucket = guard.head_slot().timestamp / QUARTER_HOUR_SECONDS;
        if new_bucket > head_bucket {
            guard.push(entry);
        } else {
            guard.overwrite_head(entry);
        }
    }

    /// Copies up to `max` short-term entries in chronological order
    /// (spec.md §4.3 `snapshot_short_term`).
    pub async fn snapshot_short_term(&self, max: usize) -> Vec<ShortTermEntry> {
        self.short_term.lock().await.snapshot(max)
    }

    pub async fn snapshot_long_term(&self, max: usize) -> Vec<LongTermEntry> {
        self.long_term.lock().await.snapshot(max)
    }

    pub async fn get_predicted_peak(&self) -> PredictedPeak {
        *self.predicted_peak.read().await
    }

    pub async fn set_predicted_peak(&self, peak: PredictedPeak) {
        *self.predicted_peak.write().await = peak;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn commit_then_read_sees_new_snapshot() {
        let store = Store::new();
        let mut s = TelegramSnapshot::default();
        s.current_power_usage = 1.23;
        store.commit_snapshot(s).await;
        let basic = store.get_snapshot_basic().await;
        assert_eq!(basic.current_power_usage, 1.23);
    }

    #[tokio::test]
    async fn short_term_log_saturates_at_capacity() {
        let store = Store::new();
        for i in 0..(SHORT_TERM_CAPACITY + 10) {
            store
                .append_short_term(ShortTermEntry {
                    timestamp: i as i64,
                    current_avg_demand: 0.0,
                    current_power_usage: 0.0,
                })
                .await;
        }
        let all = store.snapshot_short_term(usize::MAX).await;
        assert_eq!(all.len(), SHORT_TERM_CAPACITY);
        // chronological: oldest surviving entry is index 10
        assert_eq!(all[0].timestamp, 10);
        assert_eq!(all.last().unwrap().timestamp, (SHORT_TERM_CAPACITY + 9) as i64);
    }

    #[tokio::test]
    async fn long_term_log_keeps_one_entry_per_bucket() {
        let store = Store::new();
        store
            .append_long_term(LongTermEntry { timestamp: 0, ..Default::default() })
            .await;
        store
            .append_long_term(LongTermEntry { timestamp: 100, delivered_t1: 5, ..Default::default() })
            .await;
        let all = store.snapshot_long_term(usize::MAX).await;
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].delivered_t1, 5);

        store
            .append_long_term(LongTermEntry { timestamp: 901, delivered_t1: 9, ..Default::default() })
            .await;
        let all = store.snapshot_long_term(usize::MAX).await;
        assert_eq!(all.len(), 2);
        assert_eq!(all[1].delivered_t1, 9);
    }

    #[tokio::test]
    async fn telegram_available_wakes_waiter() {
        let store = Store::new();
        let waiter_store = Arc::clone(&store);
        let waiter = tokio::spawn(async move {
            waiter_store.wait_for_telegram().await;
        });
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        store.commit_snapshot(TelegramSnapshot::default()).await;
        tokio::time::timeout(std::time::Duration::from_secs(1), waiter)
            .await
            .expect("waiter should wake")
            .unwrap();
    }
}
