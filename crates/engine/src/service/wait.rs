// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Foreground waits for agent reports.
//!
//! A wait registered while the task is queued does not start its report
//! timer until the task actually runs: the pre-start phase and the
//! post-start phase each get the full timeout. Waits from inside a running
//! task (foreground awaits) release that task's parallelism slot for the
//! duration, which is what lets a nested task dequeue under a low limit.

use super::{AgentTaskService, WaitParams};
use crate::adapters::{HistoryStore, RuntimeProvider, StreamGateway, WorkspaceService};
use crate::artifacts;
use crate::error::EngineError;
use crate::report_cache::CachedReport;
use crate::waiters::WaitOutcome;
use mux_core::{AgentReport, Clock, TaskEntry, TaskStatus, WorkspaceId};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

/// Releases a foreground-await slot on drop.
struct ForegroundGuard<R, W, G, H, C>
where
    R: RuntimeProvider,
    W: WorkspaceService,
    G: StreamGateway,
    H: HistoryStore,
    C: Clock,
{
    service: AgentTaskService<R, W, G, H, C>,
    workspace_id: WorkspaceId,
}

impl<R, W, G, H, C> Drop for ForegroundGuard<R, W, G, H, C>
where
    R: RuntimeProvider,
    W: WorkspaceService,
    G: StreamGateway,
    H: HistoryStore,
    C: Clock,
{
    fn drop(&mut self) {
        self.service.foreground_exit(&self.workspace_id);
    }
}

impl<R, W, G, H, C> AgentTaskService<R, W, G, H, C>
where
    R: RuntimeProvider,
    W: WorkspaceService,
    G: StreamGateway,
    H: HistoryStore,
    C: Clock,
{
    /// Wait for a task's completed report.
    pub async fn wait_for_agent_report(
        &self,
        params: WaitParams,
    ) -> Result<AgentReport, EngineError> {
        let task_id = params.task_id.clone();

        // Hot path: recently completed reports.
        if let Some(cached) = self.report_cache().get(&task_id) {
            return Ok(cached.report());
        }

        let config = self.snapshot();
        let entry = config.workspace(&task_id.workspace()).cloned().and_then(TaskEntry::from_record);
        let Some(entry) = entry else {
            // The task may have reported and been cleaned up already; its
            // artifact then lives in the requester's session directory.
            if let Some(requester) = &params.requesting_workspace_id {
                let session = self.config_store().session_dir(requester);
                if let Some(artifact) = artifacts::read_report(&session, &task_id)? {
                    return Ok(AgentReport {
                        report_markdown: artifact.report_markdown,
                        title: artifact.title,
                    });
                }
            }
            return Err(EngineError::TaskNotFound(task_id));
        };

        if entry.status() == TaskStatus::Reported {
            // Disk is the source of truth for completed reports.
            let session = self.config_store().session_dir(entry.parent_workspace_id());
            if let Some(artifact) = artifacts::read_report(&session, &task_id)? {
                self.report_cache().insert(
                    task_id.clone(),
                    CachedReport {
                        report_markdown: artifact.report_markdown.clone(),
                        title: artifact.title.clone(),
                        ancestor_workspace_ids: artifact.ancestor_workspace_ids.clone(),
                    },
                );
                return Ok(AgentReport {
                    report_markdown: artifact.report_markdown,
                    title: artifact.title,
                });
            }
        }

        let now_ms = self.clock().epoch_ms();
        let report_rx = self.waiters().register(&task_id, now_ms);
        let start_rx = (entry.status() == TaskStatus::Queued)
            .then(|| self.waiters().register_start(&task_id, now_ms));

        // Finalize caches the report before resolving waiters, so a
        // completion that slipped in between the snapshot above and the
        // registration is visible here.
        if let Some(cached) = self.report_cache().get(&task_id) {
            self.waiters().prune(&task_id);
            return Ok(cached.report());
        }

        let _foreground = params.requesting_workspace_id.clone().map(|ws| {
            self.foreground_enter(&ws);
            // The requester's slot just freed; queued work may now admit.
            let service = self.clone();
            tokio::spawn(async move { service.maybe_start_queued_tasks().await });
            ForegroundGuard { service: self.clone(), workspace_id: ws }
        });

        let timeout = params.timeout.unwrap_or(self.cfg().report_timeout);
        let abort = params.abort.clone().unwrap_or_default();
        let result = Self::await_report(report_rx, start_rx, timeout, &abort).await;
        self.waiters().prune(&task_id);
        result
    }

    async fn await_report(
        mut report_rx: oneshot::Receiver<WaitOutcome>,
        start_rx: Option<oneshot::Receiver<()>>,
        timeout: Duration,
        abort: &CancellationToken,
    ) -> Result<AgentReport, EngineError> {
        let timeout_ms = timeout.as_millis() as u64;

        // Pre-start phase: a queued task gets the full timeout to begin
        // running; queued time does not consume the report timer.
        if let Some(mut start_rx) = start_rx {
            tokio::select! {
                _ = abort.cancelled() => return Err(EngineError::WaitAborted),
                outcome = &mut report_rx => return Self::map_outcome(outcome),
                _ = &mut start_rx => {}
                _ = tokio::time::sleep(timeout) => {
                    return Err(EngineError::WaitTimeout { timeout_ms });
                }
            }
        }

        tokio::select! {
            _ = abort.cancelled() => Err(EngineError::WaitAborted),
            outcome = &mut report_rx => Self::map_outcome(outcome),
            _ = tokio::time::sleep(timeout) => Err(EngineError::WaitTimeout { timeout_ms }),
        }
    }

    fn map_outcome(
        outcome: Result<WaitOutcome, oneshot::error::RecvError>,
    ) -> Result<AgentReport, EngineError> {
        match outcome {
            Ok(Ok(report)) => Ok(report),
            Ok(Err(reason)) => Err(EngineError::TaskTerminated(reason)),
            // Sender dropped without resolving: the task is gone.
            Err(_) => Err(EngineError::TaskTerminated("Task terminated".to_string())),
        }
    }
}

#[cfg(test)]
#[path = "wait_tests.rs"]
mod tests;
