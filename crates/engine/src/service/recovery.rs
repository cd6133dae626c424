// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Restart recovery: re-derive conservative state for tasks that were
//! mid-flight when the process died.

use super::AgentTaskService;
use crate::adapters::{
    HistoryStore, RuntimeProvider, SendOptions, StreamGateway, WorkspaceService,
};
use crate::artifacts;
use crate::index::TaskIndex;
use mux_core::{Clock, PatchStatus, TaskEntry, TaskStatus};

const RESTART_NUDGE: &str = "mux restarted while this task was in flight. \
     Continue working and call your completion tool when finished.";

impl<R, W, G, H, C> AgentTaskService<R, W, G, H, C>
where
    R: RuntimeProvider,
    W: WorkspaceService,
    G: StreamGateway,
    H: HistoryStore,
    C: Clock,
{
    /// Run restart recovery. Best-effort throughout: individual failures
    /// log and never block the remaining tasks.
    pub async fn initialize(&self) {
        // 1. Admit whatever queued work fits.
        self.maybe_start_queued_tasks().await;

        let config = self.snapshot();
        let index = TaskIndex::build(&config);
        let mut tasks: Vec<TaskEntry> = index.tasks().cloned().collect();
        tasks.sort_by(|a, b| a.created_at().cmp(b.created_at()).then_with(|| a.id().cmp(&b.id())));

        for entry in tasks {
            let task_id = entry.id();
            let ws = entry.workspace_id().clone();
            match entry.status() {
                // 2. Awaiting-report tasks with nothing live underneath get
                //    one forced-tool reminder; if even that cannot be sent,
                //    fall back to a synthetic report.
                TaskStatus::AwaitingReport => {
                    if !index.active_descendants(&ws).is_empty() {
                        continue;
                    }
                    self.mark_reminded(&task_id);
                    let tool = self.agents().completion_tool(entry.agent_id());
                    if let Err(err) = self.send_completion_reminder(&entry, tool).await {
                        tracing::warn!(task_id = %task_id, error = %err, "recovery reminder failed; posting fallback report");
                        let report = self.fallback_report(&entry, &[]).await;
                        if let Err(err) = self.finalize_report(&task_id, report).await {
                            tracing::warn!(task_id = %task_id, error = %err, "recovery fallback report failed");
                            continue;
                        }
                        self.cleanup_reported_chain(ws).await;
                    }
                }
                // 3. Running tasks with nothing live underneath get a nudge
                //    preserving their stored agent and model.
                TaskStatus::Running => {
                    if !index.active_descendants(&ws).is_empty()
                        || self.deps().gateway.is_streaming(&ws)
                    {
                        continue;
                    }
                    let task = entry.task();
                    let opts = SendOptions::synthetic()
                        .with_agent(entry.agent_id())
                        .with_model(task.task_model_string.clone(), task.task_thinking_level);
                    if let Err(err) =
                        self.deps().workspaces.send_message(&ws, RESTART_NUDGE, opts).await
                    {
                        tracing::warn!(task_id = %task_id, error = %err, "recovery nudge failed");
                    }
                }
                // 4. Reported tasks recover their patch pipeline, then get
                //    a cleanup attempt.
                TaskStatus::Reported => {
                    self.recover_patch(&entry, &index);
                    self.cleanup_reported_chain(ws).await;
                }
                TaskStatus::Queued | TaskStatus::Interrupted => {}
            }
        }
    }

    /// Re-trigger patch generation for a reported task whose artifact is
    /// missing or was left pending by a crash.
    fn recover_patch(&self, entry: &TaskEntry, index: &TaskIndex) {
        let task_id = entry.id();
        let Ok(ancestors) = index.ancestors_of(&task_id) else {
            return;
        };
        let Some(parent) = ancestors.first() else {
            return;
        };
        let parent_session = self.config_store().session_dir(parent);
        let needs_retrigger = match artifacts::patch_of(&parent_session, &task_id) {
            Ok(Some(artifact)) => artifact.status == PatchStatus::Pending,
            Ok(None) => true,
            Err(err) => {
                tracing::warn!(task_id = %task_id, error = %err, "patch index read failed");
                false
            }
        };
        if needs_retrigger {
            tracing::info!(task_id = %task_id, "re-triggering patch generation after restart");
            self.kick_patch_generation(entry, &ancestors);
        }
    }
}

#[cfg(test)]
#[path = "recovery_tests.rs"]
mod tests;
