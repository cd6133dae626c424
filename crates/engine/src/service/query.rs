// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Read-side façade operations.

use super::{AgentTaskService, DescendantTask};
use crate::adapters::{HistoryStore, RuntimeProvider, StreamGateway, WorkspaceService};
use crate::artifacts;
use crate::error::EngineError;
use crate::index::TaskIndex;
use mux_core::{Clock, TaskId, TaskStatus, WorkspaceId};

impl<R, W, G, H, C> AgentTaskService<R, W, G, H, C>
where
    R: RuntimeProvider,
    W: WorkspaceService,
    G: StreamGateway,
    H: HistoryStore,
    C: Clock,
{
    /// Current status of a task, or `None` once it has been cleaned up.
    pub fn get_agent_task_status(&self, task_id: &TaskId) -> Option<TaskStatus> {
        self.snapshot()
            .workspace(&task_id.workspace())
            .and_then(|r| r.task.as_ref())
            .map(|t| t.task_status)
    }

    /// Descendant tasks of a workspace, ordered by creation time (taskId
    /// tie-break), optionally filtered by status.
    pub fn list_descendant_agent_tasks(
        &self,
        workspace_id: &WorkspaceId,
        statuses: Option<&[TaskStatus]>,
    ) -> Result<Vec<DescendantTask>, EngineError> {
        let config = self.snapshot();
        let index = TaskIndex::build(&config);
        let mut rows = Vec::new();
        for task_id in index.descendants_of(workspace_id) {
            let Some(entry) = index.entry(&task_id) else {
                continue;
            };
            if let Some(filter) = statuses {
                if !filter.contains(&entry.status()) {
                    continue;
                }
            }
            let task = entry.task();
            rows.push(DescendantTask {
                task_id: entry.id(),
                status: entry.status(),
                parent_workspace_id: task.parent_workspace_id.clone(),
                agent_type: entry.agent_id().to_string(),
                workspace_name: entry.record().workspace_name.clone(),
                title: task.title.clone(),
                created_at: task.created_at.clone(),
                model_string: task.task_model_string.clone(),
                thinking_level: task.task_thinking_level,
                depth: index.depth_of(&entry.id())?,
            });
        }
        rows.sort_by(|a, b| {
            a.created_at.cmp(&b.created_at).then_with(|| a.task_id.cmp(&b.task_id))
        });
        Ok(rows)
    }

    /// Whether `task_id` is (or was) a descendant of `ancestor`.
    ///
    /// Falls back to persisted report artifacts and the report cache for
    /// tasks that already reported and were cleaned up.
    pub fn is_descendant_agent_task(&self, ancestor: &WorkspaceId, task_id: &TaskId) -> bool {
        let config = self.snapshot();
        let index = TaskIndex::build(&config);
        if index.entry(task_id).is_some() {
            return match index.ancestors_of(task_id) {
                Ok(ancestors) => ancestors.contains(ancestor),
                Err(err) => {
                    tracing::warn!(task_id = %task_id, error = %err, "ancestor walk failed");
                    false
                }
            };
        }

        if let Some(cached) = self.report_cache().get(task_id) {
            if cached.ancestor_workspace_ids.contains(ancestor) {
                return true;
            }
        }

        let session = self.config_store().session_dir(ancestor);
        matches!(artifacts::read_report(&session, task_id), Ok(Some(_)))
    }
}

#[cfg(test)]
#[path = "query_tests.rs"]
mod tests;
