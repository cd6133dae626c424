// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Keyed asynchronous mutex: at most one holder per key, fair FIFO order.
//!
//! Built on `tokio::sync::Mutex` (FIFO-fair) instances held in a map that
//! prunes slots once the last interested party releases. Distinct keys never
//! contend.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::OwnedMutexGuard;

#[derive(Default)]
struct Slot {
    lock: Arc<tokio::sync::Mutex<()>>,
    interested: usize,
}

/// Map of named fair mutexes.
#[derive(Clone, Default)]
pub struct KeyedMutex {
    slots: Arc<Mutex<HashMap<String, Slot>>>,
}

impl KeyedMutex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the mutex for `key`, waiting FIFO behind earlier acquirers.
    pub async fn lock(&self, key: &str) -> KeyedGuard {
        let lock = {
            let mut slots = self.slots.lock();
            let slot = slots.entry(key.to_string()).or_default();
            slot.interested += 1;
            slot.lock.clone()
        };
        let guard = lock.lock_owned().await;
        KeyedGuard { slots: Arc::clone(&self.slots), key: key.to_string(), guard: Some(guard) }
    }

    /// Number of live slots; for tests.
    pub fn slot_count(&self) -> usize {
        self.slots.lock().len()
    }
}

pub struct KeyedGuard {
    slots: Arc<Mutex<HashMap<String, Slot>>>,
    key: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for KeyedGuard {
    fn drop(&mut self) {
        // Release the mutex before pruning so a queued waiter can proceed.
        self.guard.take();
        let mut slots = self.slots.lock();
        if let Some(slot) = slots.get_mut(&self.key) {
            slot.interested -= 1;
            if slot.interested == 0 {
                slots.remove(&self.key);
            }
        }
    }
}

#[cfg(test)]
#[path = "lockmap_tests.rs"]
mod tests;
