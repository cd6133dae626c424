// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Report finalization: the reported transition, ancestor persistence,
//! parent delivery, waiter resolution, and parent auto-resume.

use super::stream_end::INTEGRATE_REPORTS_PROMPT;
use super::AgentTaskService;
use crate::adapters::{HistoryStore, RuntimeProvider, StreamGateway, WorkspaceService};
use crate::artifacts;
use crate::error::EngineError;
use crate::index::TaskIndex;
use crate::report_cache::CachedReport;
use mux_core::{
    subagent_report_envelope, AgentReport, ChatMessage, Clock, MessagePart, PatchArtifact,
    PatchStatus, ReportArtifact, SessionArtifact, TaskEntry, TaskId, TaskStatus, ToolState,
    WorkspaceId, WorkspaceRecord, TOOL_TASK,
};
use serde_json::json;
use std::path::PathBuf;

impl<R, W, G, H, C> AgentTaskService<R, W, G, H, C>
where
    R: RuntimeProvider,
    W: WorkspaceService,
    G: StreamGateway,
    H: HistoryStore,
    C: Clock,
{
    /// Transition a task to `reported` and propagate its report.
    ///
    /// Idempotent: a task already in `reported` is left untouched. Report
    /// artifacts reach every ancestor's session directory before the parent
    /// sees the report and before any waiter resolves. The stream is never
    /// aborted here; it ends naturally so usage accounting records.
    pub async fn finalize_report(
        &self,
        task_id: &TaskId,
        report: AgentReport,
    ) -> Result<(), EngineError> {
        let ws = task_id.workspace();
        let guard = self.service_lock().lock().await;

        let config = self.snapshot();
        let entry = config
            .workspace(&ws)
            .cloned()
            .and_then(TaskEntry::from_record)
            .ok_or_else(|| EngineError::TaskNotFound(task_id.clone()))?;
        if entry.status() == TaskStatus::Reported {
            return Ok(());
        }

        let reported_at = self.clock().iso_now();
        self.config_store().edit(|cfg| {
            if let Some(task) = cfg.workspace_mut(&ws).and_then(WorkspaceRecord::task_mut) {
                task.task_status = TaskStatus::Reported;
                task.reported_at = Some(reported_at.clone());
                task.task_prompt = None;
            }
        })?;
        self.emit_record_metadata(&ws);
        tracing::info!(task_id = %task_id, "task reported");

        // Persist into every ancestor before anything observes the report.
        let config = self.snapshot();
        let index = TaskIndex::build(&config);
        let ancestors = index.ancestors_of(task_id)?;
        let now_ms = self.clock().epoch_ms();
        let task = entry.task();
        let artifact = ReportArtifact {
            child_task_id: task_id.clone(),
            parent_workspace_id: ancestors[0].clone(),
            ancestor_workspace_ids: ancestors.clone(),
            report_markdown: report.report_markdown.clone(),
            title: report.title.clone(),
            model: task.task_model_string.clone(),
            thinking_level: task.task_thinking_level,
            created_at_ms: now_ms,
            updated_at_ms: now_ms,
        };
        for ancestor in &ancestors {
            artifacts::upsert_report(&self.config_store().session_dir(ancestor), &artifact)?;
        }
        self.report_cache().insert(
            task_id.clone(),
            CachedReport {
                report_markdown: report.report_markdown.clone(),
                title: report.title.clone(),
                ancestor_workspace_ids: ancestors.clone(),
            },
        );

        self.kick_patch_generation(&entry, &ancestors);

        let parent = ancestors[0].clone();
        self.deliver_report_to_parent(&entry, &parent, &report).await;

        self.waiters().resolve_all(task_id, &report);

        // A slot just freed; admit queued work before releasing the lock.
        self.drain_queue_locked().await;
        drop(guard);

        let index = self.index();
        // A parent that is itself a non-active task (reported, most often)
        // must never be resumed into a new stream.
        let parent_resumable = index
            .entry(&parent.as_task())
            .map(|e| e.status().is_active())
            .unwrap_or(true);
        if parent_resumable
            && index.active_descendants(&parent).is_empty()
            && !self.deps().gateway.is_streaming(&parent)
            && !self.is_interrupted(&parent)
        {
            if let Err(err) =
                self.auto_resume_workspace(&parent, None, INTEGRATE_REPORTS_PROMPT).await
            {
                tracing::warn!(workspace_id = %parent, error = %err, "parent auto-resume failed");
            }
        }
        Ok(())
    }

    /// Deliver a completed report to the parent workspace.
    ///
    /// Preference order: complete a pending `task` tool call inside the
    /// parent's partial message; skip synthetic delivery when foreground
    /// waiters will receive it; otherwise append a synthetic user message
    /// carrying the report envelope.
    async fn deliver_report_to_parent(
        &self,
        entry: &TaskEntry,
        parent: &WorkspaceId,
        report: &AgentReport,
    ) {
        let task_id = entry.id();
        if !self.deps().gateway.is_streaming(parent) {
            match self.complete_partial_task_call(parent, &task_id, report).await {
                Ok(true) => return,
                Ok(false) => {}
                Err(err) => {
                    tracing::warn!(task_id = %task_id, error = %err, "partial tool-call completion failed");
                }
            }
        }

        if self.waiters().has_report_waiters(&task_id) {
            return;
        }

        let envelope = subagent_report_envelope(
            task_id.as_str(),
            entry.agent_id(),
            report.title.as_deref(),
            &report.report_markdown,
        );
        let message = ChatMessage::user(self.new_message_id(), envelope).synthetic();
        if let Err(err) = self.deps().history.append(parent, &message).await {
            tracing::warn!(task_id = %task_id, error = %err, "report envelope append failed");
        }
    }

    /// If the parent's partial message holds exactly one `task` tool call in
    /// `input-available` state for this child, complete it in place.
    async fn complete_partial_task_call(
        &self,
        parent: &WorkspaceId,
        task_id: &TaskId,
        report: &AgentReport,
    ) -> Result<bool, EngineError> {
        let Some(mut partial) = self
            .deps()
            .history
            .read_partial(parent)
            .await
            .map_err(|err| EngineError::SendFailed(err.to_string()))?
        else {
            return Ok(false);
        };

        let matching: Vec<usize> = partial
            .parts
            .iter()
            .enumerate()
            .filter_map(|(i, part)| match part {
                MessagePart::DynamicTool { tool_name, state, input, .. }
                    if tool_name == TOOL_TASK
                        && *state == ToolState::InputAvailable
                        && input.get("taskId").and_then(|v| v.as_str())
                            == Some(task_id.as_str()) =>
                {
                    Some(i)
                }
                _ => None,
            })
            .collect();
        let [part_index] = matching.as_slice() else {
            return Ok(false);
        };

        let mut call_id = task_id.as_str().to_string();
        if let MessagePart::DynamicTool { state, output, tool_call_id, .. } =
            &mut partial.parts[*part_index]
        {
            *state = ToolState::OutputAvailable;
            *output = Some(json!({
                "success": true,
                "reportMarkdown": report.report_markdown,
                "title": report.title,
            }));
            if let Some(id) = tool_call_id {
                call_id = id.clone();
            }
        }
        self.deps()
            .history
            .write_partial(parent, &partial)
            .await
            .map_err(|err| EngineError::SendFailed(err.to_string()))?;
        self.deps().workspaces.notify_tool_call_end(parent, &call_id);
        tracing::debug!(task_id = %task_id, parent = %parent, "completed pending task tool call");
        Ok(true)
    }

    /// Record a pending patch artifact for the parent and generate the mbox
    /// in the background. Cleanup defers while the patch is pending; the
    /// spawned task retries cleanup once the patch settles.
    pub(crate) fn kick_patch_generation(&self, entry: &TaskEntry, ancestors: &[WorkspaceId]) {
        let Some(parent) = ancestors.first().cloned() else {
            return;
        };
        let task_id = entry.id();
        let parent_session = self.config_store().session_dir(&parent);
        let now_ms = self.clock().epoch_ms();
        let mbox_path =
            PathBuf::from(PatchArtifact::DIR).join(task_id.as_str()).join(artifacts::PATCH_FILE);
        let pending = PatchArtifact {
            child_task_id: task_id.clone(),
            parent_workspace_id: parent.clone(),
            ancestor_workspace_ids: ancestors.to_vec(),
            status: PatchStatus::Pending,
            mbox_path: mbox_path.clone(),
            error: None,
            created_at_ms: now_ms,
            updated_at_ms: now_ms,
        };
        if let Err(err) = artifacts::record_patch(&parent_session, &pending) {
            tracing::warn!(task_id = %task_id, error = %err, "failed to record pending patch");
            return;
        }

        let service = self.clone();
        let record = entry.record().clone();
        tokio::spawn(async move {
            let exported = service.deps().runtime.export_patch(&record).await;
            let mut settled = pending.clone();
            settled.updated_at_ms = service.clock().epoch_ms();
            match exported {
                Ok(mbox) => match std::fs::write(parent_session.join(&mbox_path), mbox) {
                    Ok(()) => settled.status = PatchStatus::Ready,
                    Err(err) => {
                        settled.status = PatchStatus::Failed;
                        settled.error = Some(err.to_string());
                    }
                },
                Err(err) => {
                    settled.status = PatchStatus::Failed;
                    settled.error = Some(err.to_string());
                }
            }
            {
                // Index writes happen under the service mutex.
                let _guard = service.service_lock().lock().await;
                if let Err(err) = artifacts::record_patch(&parent_session, &settled) {
                    tracing::warn!(task_id = %task_id, error = %err, "failed to settle patch artifact");
                }
            }
            tracing::debug!(task_id = %task_id, status = ?settled.status, "patch generation settled");
            service.cleanup_reported_chain(task_id.workspace()).await;
        });
    }
}

#[cfg(test)]
#[path = "finalize_tests.rs"]
mod tests;
