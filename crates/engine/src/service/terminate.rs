// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Termination cascades and reported-leaf cleanup.

use super::AgentTaskService;
use crate::adapters::{HistoryStore, RuntimeProvider, StreamGateway, WorkspaceService};
use crate::artifacts;
use crate::error::EngineError;
use crate::index::{TaskIndex, MAX_TASK_DEPTH};
use mux_core::{Clock, Config, TaskId, TaskStatus, WorkspaceId};

/// Waiter rejection reason for a targeted terminate.
const TERMINATED: &str = "Task terminated";
/// Waiter rejection reason for a hard-interrupt cascade.
const PARENT_INTERRUPTED: &str = "Parent workspace interrupted";

impl<R, W, G, H, C> AgentTaskService<R, W, G, H, C>
where
    R: RuntimeProvider,
    W: WorkspaceService,
    G: StreamGateway,
    H: HistoryStore,
    C: Clock,
{
    /// Terminate one task subtree. The target must be a descendant of
    /// `ancestor`. Returns the terminated ids, leaves first.
    pub async fn terminate_descendant_agent_task(
        &self,
        ancestor: &WorkspaceId,
        task_id: &TaskId,
    ) -> Result<Vec<TaskId>, EngineError> {
        let guard = self.service_lock().lock().await;
        let config = self.snapshot();
        let index = TaskIndex::build(&config);
        if index.entry(task_id).is_none() {
            return Err(EngineError::TaskNotFound(task_id.clone()));
        }
        let ancestors = index.ancestors_of(task_id)?;
        if !ancestors.contains(ancestor) {
            return Err(EngineError::NotADescendant {
                ancestor: ancestor.clone(),
                task: task_id.clone(),
            });
        }

        let mut subtree = vec![task_id.clone()];
        subtree.extend(index.descendants_of(&task_id.workspace()));
        let terminated = self.remove_tasks_leaves_first(&config, &index, subtree, TERMINATED).await?;

        self.drain_queue_locked().await;
        drop(guard);
        Ok(terminated)
    }

    /// Hard interrupt: terminate every descendant task of a workspace and
    /// suppress auto-resume until the next real user message.
    pub async fn terminate_all_descendant_agent_tasks(
        &self,
        workspace_id: &WorkspaceId,
    ) -> Result<Vec<TaskId>, EngineError> {
        self.mark_interrupted(workspace_id);
        let guard = self.service_lock().lock().await;
        let config = self.snapshot();
        let index = TaskIndex::build(&config);
        let subtree = index.descendants_of(workspace_id);
        let terminated =
            self.remove_tasks_leaves_first(&config, &index, subtree, PARENT_INTERRUPTED).await?;

        self.drain_queue_locked().await;
        drop(guard);

        if !terminated.is_empty() {
            tracing::info!(
                workspace_id = %workspace_id,
                count = terminated.len(),
                "terminated descendant tasks on hard interrupt"
            );
        }
        Ok(terminated)
    }

    /// Stop, reject, and remove a set of tasks, deepest first.
    async fn remove_tasks_leaves_first(
        &self,
        config: &Config,
        index: &TaskIndex,
        tasks: Vec<TaskId>,
        reason: &str,
    ) -> Result<Vec<TaskId>, EngineError> {
        let mut ordered: Vec<(usize, TaskId)> = Vec::with_capacity(tasks.len());
        for task in tasks {
            ordered.push((index.depth_of(&task)?, task));
        }
        ordered.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));

        let mut terminated = Vec::with_capacity(ordered.len());
        for (_, task) in ordered {
            let ws = task.workspace();
            if let Err(err) = self.deps().gateway.stop_stream(&ws, true).await {
                tracing::warn!(task_id = %task, error = %err, "stop stream failed during terminate");
            }
            self.waiters().reject_all(&task, reason);
            if let Some(record) = config.workspace(&ws) {
                if let Err(err) = self.deps().runtime.remove_workspace(record).await {
                    tracing::warn!(task_id = %task, error = %err, "workspace removal failed during terminate");
                }
            }
            self.config_store().remove_workspace(&ws)?;
            self.forget_task_flags(&task);
            self.deps().workspaces.emit_metadata(&ws, None);
            tracing::info!(task_id = %task, reason, "task terminated");
            terminated.push(task);
        }
        Ok(terminated)
    }

    /// Clean up a chain of reported leaves, walking upward from `start`.
    ///
    /// A task is eligible only when it is `reported`, a structural leaf (no
    /// child tasks at all), not streaming, its parent still exists, and no
    /// patch artifact for it is pending. Artifacts are rolled up into the
    /// parent session directory before removal so descendant history
    /// survives intermediate deletions.
    pub(crate) async fn cleanup_reported_chain(&self, start: WorkspaceId) {
        let _guard = self.service_lock().lock().await;
        let mut current = start;
        for _ in 0..MAX_TASK_DEPTH {
            let config = self.snapshot();
            let index = TaskIndex::build(&config);
            let Some(entry) = index.entry(&current.as_task()).cloned() else {
                return;
            };
            if entry.status() != TaskStatus::Reported {
                return;
            }
            if !index.children_of(&current).is_empty() {
                return;
            }
            if self.deps().gateway.is_streaming(&current) {
                return;
            }
            let parent = entry.parent_workspace_id().clone();
            if config.workspace(&parent).is_none() {
                return;
            }
            let parent_session = self.config_store().session_dir(&parent);
            if artifacts::patch_pending(&parent_session, &entry.id()) {
                tracing::debug!(task_id = %entry.id(), "cleanup deferred: patch pending");
                return;
            }

            let child_session = self.config_store().session_dir(&current);
            let task = entry.task();
            let ancestors = index.ancestors_of(&entry.id()).unwrap_or_default();
            if let Err(err) = artifacts::archive_transcripts(
                &child_session,
                &parent_session,
                &entry.id(),
                &parent,
                &ancestors,
                task.task_model_string.clone(),
                task.task_thinking_level,
                self.clock().epoch_ms(),
            ) {
                tracing::warn!(task_id = %entry.id(), error = %err, "transcript archive failed");
            }
            if let Err(err) =
                artifacts::roll_up(&child_session, &parent_session, &current, &parent)
            {
                tracing::warn!(task_id = %entry.id(), error = %err, "artifact roll-up failed");
            }
            self.report_cache().drop_workspace(&current, &parent);

            if let Some(record) = config.workspace(&current) {
                if let Err(err) = self.deps().runtime.remove_workspace(record).await {
                    tracing::warn!(task_id = %entry.id(), error = %err, "workspace removal failed during cleanup");
                }
            }
            if let Err(err) = self.config_store().remove_workspace(&current) {
                tracing::warn!(task_id = %entry.id(), error = %err, "config removal failed during cleanup");
                return;
            }
            self.forget_task_flags(&entry.id());
            self.deps().workspaces.emit_metadata(&current, None);
            tracing::info!(task_id = %entry.id(), "reported leaf cleaned up");

            current = parent;
        }
    }
}

#[cfg(test)]
#[path = "terminate_tests.rs"]
mod tests;
