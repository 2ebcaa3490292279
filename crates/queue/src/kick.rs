//! Kick hub: an in-process, per-execution coalesced wakeup channel signaling
//! that an execution may be advanceable.
//!
//! This is purely an optimization over the database-driven sweeps — dedup at
//! the signal level must never be relied on for correctness. Each execution
//! gets a single-slot `watch` channel: a burst of kicks collapses to one
//! wakeup, and a kick that arrives with no listener is simply a no-op, since
//! the next `advance` will observe current state anyway.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::watch;

/// Coalesced per-execution kick channels.
#[derive(Clone, Default)]
pub struct KickHub {
    channels: Arc<DashMap<String, watch::Sender<u64>>>,
}

impl KickHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Notify that `execution_id` may be advanceable. Bumps the channel's
    /// generation counter; any outstanding `subscribe` wakes.
    pub fn kick(&self, execution_id: &str) {
        match self.channels.get(execution_id) {
            Some(tx) => {
                tx.send_modify(|gen| *gen = gen.wrapping_add(1));
            }
            None => {
                let (tx, _rx) = watch::channel(0u64);
                self.channels.insert(execution_id.to_string(), tx);
            }
        }
    }

    /// Subscribe to kicks for `execution_id`. The returned receiver's
    /// `changed()` resolves every time `kick` bumps the generation,
    /// coalescing any kicks that arrived before the awaiter polled.
    pub fn subscribe(&self, execution_id: &str) -> watch::Receiver<u64> {
        self.channels
            .entry(execution_id.to_string())
            .or_insert_with(|| watch::channel(0u64).0)
            .subscribe()
    }

    /// Drop the channel for an execution (e.g. once archived) so the map
    /// doesn't grow unbounded over the life of a long-running deployment.
    pub fn forget(&self, execution_id: &str) {
        self.channels.remove(execution_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn kick_wakes_a_subscriber() {
        let hub = KickHub::new();
        let mut rx = hub.subscribe("ex_1");
        hub.kick("ex_1");
        rx.changed().await.unwrap();
    }

    #[tokio::test]
    async fn bursts_of_kicks_coalesce() {
        let hub = KickHub::new();
        let mut rx = hub.subscribe("ex_1");
        hub.kick("ex_1");
        hub.kick("ex_1");
        hub.kick("ex_1");
        rx.changed().await.unwrap();
        // Only one pending change, regardless of how many kicks arrived.
        let timed_out = tokio::time::timeout(std::time::Duration::from_millis(10), rx.changed())
            .await
            .is_err();
        assert!(timed_out);
    }

    #[tokio::test]
    async fn kick_with_no_subscriber_is_a_no_op() {
        let hub = KickHub::new();
        hub.kick("ex_nobody_listening");
    }
}
