// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! WebSocket subscriber bookkeeping and fan-out.
//!
//! Each subscriber gets a dedicated unbounded sender; its WebSocket task
//! drains the other end. A send fails only when that task has ended, so
//! broadcast doubles as the pruning pass for dead connections.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{mpsc, RwLock};

use crate::state::now_iso;

/// Identifies one connected subscriber.
pub type SubscriberId = u64;

/// The set of connected WebSocket subscribers.
pub struct SubscriberSet {
    next_id: AtomicU64,
    senders: RwLock<HashMap<SubscriberId, mpsc::UnboundedSender<String>>>,
}

impl Default for SubscriberSet {
    fn default() -> Self {
        Self::new()
    }
}

impl SubscriberSet {
    pub fn new() -> Self {
        Self { next_id: AtomicU64::new(1), senders: RwLock::new(HashMap::new()) }
    }

    /// Register a subscriber; returns its id and the frame receiver.
    pub async fn add(&self) -> (SubscriberId, mpsc::UnboundedReceiver<String>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();
        self.senders.write().await.insert(id, tx);
        (id, rx)
    }

    /// Remove a subscriber.
    pub async fn remove(&self, id: SubscriberId) {
        self.senders.write().await.remove(&id);
    }

    /// Number of connected subscribers.
    pub async fn count(&self) -> usize {
        self.senders.read().await.len()
    }

    /// Send a frame to every subscriber, pruning any whose channel is
    /// closed. The payload is stamped with `server_time` and serialized
    /// once. Returns the number of subscribers that received it.
    pub async fn broadcast(&self, mut payload: serde_json::Value) -> usize {
        if let Some(map) = payload.as_object_mut() {
            map.insert("server_time".to_owned(), serde_json::Value::String(now_iso()));
        }
        let frame = payload.to_string();

        let mut senders = self.senders.write().await;
        let dead: Vec<SubscriberId> = senders
            .iter()
            .filter(|(_, tx)| tx.send(frame.clone()).is_err())
            .map(|(id, _)| *id)
            .collect();
        for id in &dead {
            senders.remove(id);
        }
        senders.len()
    }
}

#[cfg(test)]
#[path = "subscribers_tests.rs"]
mod tests;
