// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Queue drain: admit queued tasks in deterministic FIFO order while
//! capacity allows.

use super::AgentTaskService;
use crate::adapters::{HistoryStore, RuntimeProvider, StreamGateway, WorkspaceService};
use crate::index::TaskIndex;
use mux_core::Clock;

impl<R, W, G, H, C> AgentTaskService<R, W, G, H, C>
where
    R: RuntimeProvider,
    W: WorkspaceService,
    G: StreamGateway,
    H: HistoryStore,
    C: Clock,
{
    /// Start queued tasks until capacity runs out or the queue is empty.
    pub async fn maybe_start_queued_tasks(&self) {
        let _guard = self.service_lock().lock().await;
        self.drain_queue_locked().await;
    }

    /// Drain loop body. Caller must hold the service lock.
    ///
    /// Capacity is recomputed from a fresh snapshot after every awaited
    /// start so the limit is never over-admitted, and queued tasks whose
    /// start fails are rolled back so the queue cannot wedge.
    pub(crate) async fn drain_queue_locked(&self) {
        loop {
            let config = self.snapshot();
            let index = TaskIndex::build(&config);
            if !self.has_capacity(&index) {
                return;
            }
            let Some(task_id) = index.queued_in_order().into_iter().next() else {
                return;
            };

            match self.start_queued_task(&task_id).await {
                Ok(()) => {}
                Err(err) => {
                    tracing::warn!(task_id = %task_id, error = %err, "queued task start failed; dropping entry");
                    self.waiters().reject_all(&task_id, &err.to_string());
                    self.rollback_task(&task_id).await;
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
