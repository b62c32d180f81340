// SPDX-License-Identifier: MIT
//! Single-flight coalescing for concurrent duplicate operations.
//!
//! When many tasks need "the same" operation at once — the canonical case
//! being several in-flight calls all hitting a 401 and each wanting to run
//! the logout flow — only the first caller actually executes it. Callers
//! arriving while it is in flight await the shared outcome; callers
//! arriving after completion start a fresh run.
//!
//! ```text
//! caller A ──► run(op) ── executes op ──► result ──┬──► A
//! caller B ──► run(op) ── joins A ─────────────────┤──► B
//! caller C ──► run(op) ── joins A ─────────────────┘──► C
//! caller D (later) ──► run(op) ── executes op again
//! ```
//!
//! # Example
//! ```rust,ignore
//! use tether::single_flight::SingleFlight;
//!
//! let flight: SingleFlight<bool> = SingleFlight::new();
//! let outcome = flight.run(|| async { do_logout().await }).await;
//! ```

use std::future::Future;
use std::sync::Mutex;
use tokio::sync::broadcast;
use tracing::debug;

/// Coalesces concurrent runs of one logical operation.
///
/// `T` is the shared outcome type; it must be `Clone` so every joined
/// caller gets a copy.
pub struct SingleFlight<T> {
    // Holds the broadcast sender while a run is in flight. The lock is
    // only ever held for slot inspection, never across an await.
    slot: Mutex<Option<broadcast::Sender<T>>>,
}

enum Role<T> {
    Leader(broadcast::Sender<T>),
    Joiner(broadcast::Receiver<T>),
}

impl<T: Clone + Send + 'static> SingleFlight<T> {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }

    /// Run `op`, or join an already-running execution of it.
    ///
    /// Exactly one concurrent caller (the leader) executes the operation;
    /// the rest receive a clone of its outcome. If the leader's task is
    /// dropped before publishing, waiting joiners restart the operation
    /// fresh rather than hanging.
    pub async fn run<F, Fut>(&self, op: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let mut op = Some(op);
        loop {
            let role = {
                let mut slot = self.slot.lock().expect("single-flight slot poisoned");
                match slot.as_ref() {
                    Some(tx) => Role::Joiner(tx.subscribe()),
                    None => {
                        let (tx, _) = broadcast::channel(1);
                        *slot = Some(tx.clone());
                        Role::Leader(tx)
                    }
                }
            };

            match role {
                Role::Leader(tx) => {
                    // Clear the slot even if this future is dropped mid-run,
                    // so joiners get a recv error and restart instead of
                    // waiting forever.
                    let _clear = ClearOnDrop { slot: &self.slot };
                    let run = op.take().expect("leader role taken twice");
                    let result = run().await;
                    let _ = tx.send(result.clone());
                    return result;
                }
                Role::Joiner(mut rx) => {
                    debug!("joining in-flight operation");
                    match rx.recv().await {
                        Ok(value) => return value,
                        // Leader abandoned without publishing — retry.
                        Err(_) => continue,
                    }
                }
            }
        }
    }
}

impl<T: Clone + Send + 'static> Default for SingleFlight<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for SingleFlight<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let in_flight = self
            .slot
            .lock()
            .map(|slot| slot.is_some())
            .unwrap_or(false);
        f.debug_struct("SingleFlight")
            .field("in_flight", &in_flight)
            .finish()
    }
}

struct ClearOnDrop<'a, T> {
    slot: &'a Mutex<Option<broadcast::Sender<T>>>,
}

impl<T> Drop for ClearOnDrop<'_, T> {
    fn drop(&mut self) {
        if let Ok(mut slot) = self.slot.lock() {
            slot.take();
        }
    }
}
