// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Registry of foreground report waiters and queued-start waiters.
//!
//! Report waiters resolve exactly once with the completed report (or a
//! rejection reason). Start waiters fire when a task flips queued->running,
//! which is what arms a waiter's own report timer: time spent queued does
//! not count against the report timeout.

use mux_core::{AgentReport, TaskId};
use parking_lot::Mutex;
use std::collections::HashMap;
use tokio::sync::oneshot;

/// Outcome delivered to a report waiter.
pub type WaitOutcome = Result<AgentReport, String>;

struct ReportWaiter {
    created_at_ms: u64,
    tx: oneshot::Sender<WaitOutcome>,
}

struct StartWaiter {
    created_at_ms: u64,
    tx: oneshot::Sender<()>,
}

#[derive(Default)]
struct Inner {
    report: HashMap<TaskId, Vec<ReportWaiter>>,
    start: HashMap<TaskId, Vec<StartWaiter>>,
}

#[derive(Default)]
pub struct WaiterRegistry {
    inner: Mutex<Inner>,
}

impl WaiterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, task: &TaskId, now_ms: u64) -> oneshot::Receiver<WaitOutcome> {
        let (tx, rx) = oneshot::channel();
        self.inner
            .lock()
            .report
            .entry(task.clone())
            .or_default()
            .push(ReportWaiter { created_at_ms: now_ms, tx });
        rx
    }

    pub fn register_start(&self, task: &TaskId, now_ms: u64) -> oneshot::Receiver<()> {
        let (tx, rx) = oneshot::channel();
        self.inner
            .lock()
            .start
            .entry(task.clone())
            .or_default()
            .push(StartWaiter { created_at_ms: now_ms, tx });
        rx
    }

    /// Resolve every report waiter with the completed report.
    pub fn resolve_all(&self, task: &TaskId, report: &AgentReport) -> usize {
        let waiters = self.inner.lock().report.remove(task).unwrap_or_default();
        let count = waiters.len();
        for waiter in waiters {
            let _ = waiter.tx.send(Ok(report.clone()));
        }
        count
    }

    /// Reject every report waiter and drop any pending start waiters.
    pub fn reject_all(&self, task: &TaskId, reason: &str) -> usize {
        let (report, _start) = {
            let mut inner = self.inner.lock();
            (inner.report.remove(task).unwrap_or_default(), inner.start.remove(task))
        };
        let count = report.len();
        for waiter in report {
            let _ = waiter.tx.send(Err(reason.to_string()));
        }
        count
    }

    /// Fire all start waiters for a task that just began running.
    pub fn fire_start(&self, task: &TaskId) -> usize {
        let waiters = self.inner.lock().start.remove(task).unwrap_or_default();
        let count = waiters.len();
        for waiter in waiters {
            let _ = waiter.tx.send(());
        }
        count
    }

    /// Whether any report waiter is still listening.
    pub fn has_report_waiters(&self, task: &TaskId) -> bool {
        self.prune(task);
        self.inner.lock().report.get(task).is_some_and(|w| !w.is_empty())
    }

    /// Drop waiters whose receiving side has gone away (timeout/abort).
    pub fn prune(&self, task: &TaskId) {
        let mut inner = self.inner.lock();
        if let Some(waiters) = inner.report.get_mut(task) {
            waiters.retain(|w| !w.tx.is_closed());
            if waiters.is_empty() {
                inner.report.remove(task);
            }
        }
        if let Some(waiters) = inner.start.get_mut(task) {
            waiters.retain(|w| !w.tx.is_closed());
            if waiters.is_empty() {
                inner.start.remove(task);
            }
        }
    }

    /// Oldest registration time among live report waiters; for diagnostics.
    pub fn oldest_report_waiter_ms(&self, task: &TaskId) -> Option<u64> {
        self.inner
            .lock()
            .report
            .get(task)
            .and_then(|w| w.iter().map(|w| w.created_at_ms).min())
    }

    /// Oldest registration time among start waiters; for diagnostics.
    pub fn oldest_start_waiter_ms(&self, task: &TaskId) -> Option<u64> {
        self.inner
            .lock()
            .start
            .get(task)
            .and_then(|w| w.iter().map(|w| w.created_at_ms).min())
    }

    /// Number of registered report waiters; for tests.
    pub fn report_waiter_count(&self, task: &TaskId) -> usize {
        self.inner.lock().report.get(task).map(Vec::len).unwrap_or(0)
    }
}

#[cfg(test)]
#[path = "waiters_tests.rs"]
mod tests;
