//! Logger task (spec.md §5 "Logger"): waits for the "telegram available"
//! edge, then appends the current snapshot to the short-term and
//! long-term ring buffers.
//!
//! Grounded on the teacher's subscribe-and-forward task shape (e.g.
//! `api::ws_config_changes`, which loops on a receiver and reacts to each
//! item) adapted to the store's `Notify`-based signal instead of a
//! broadcast channel.

use std::sync::Arc;

use crate::store::Store;

/// Runs forever: wait for a telegram, append it to both ring buffers,
/// repeat. Appends are infallible and lock-bounded (spec.md §5), so this
/// task never needs to handle an error path.
pub async fn run(store: Arc<Store>) {
    loop {
        store.wait_for_telegram().await;
        let snapshot = store.get_snapshot_complete().await;
        store.append_short_term(snapshot.to_short_term_entry()).await;
        store.append_long_term(snapshot.to_long_term_entry()).await;
    }
}
