// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Stream-end handling: the per-task state machine driver.
//!
//! Every gateway stream-end is routed through the per-workspace mutex. For
//! root workspaces the handler decides whether to auto-resume a turn that
//! ended with live sub-agents; for task workspaces it detects the completion
//! tool, demotes tasks whose descendants are still live, reminds once, and
//! falls back to a synthetic report when the reminder goes unheeded.

use super::AgentTaskService;
use crate::adapters::{
    HistoryStore, RuntimeProvider, SendOptions, StreamEndEvent, StreamGateway, WorkspaceService,
};
use crate::error::EngineError;
use crate::index::TaskIndex;
use mux_core::{
    find_completion_call, last_text, parse_agent_report, plan_path_from_output, AgentReport, Clock,
    MessagePart, Role, TaskEntry, TaskStatus, WorkspaceId, WorkspaceRecord, TOOL_AGENT_REPORT,
    TOOL_PROPOSE_PLAN,
};

/// Sent to a parent whose turn ended while sub-agents are still live.
pub(crate) const WAIT_FOR_TASKS_PROMPT: &str = "Sub-agent tasks are still running. \
     Use task_await to wait for their reports before ending your turn.";

/// Sent to a parent after all sub-agents reported.
pub(crate) const INTEGRATE_REPORTS_PROMPT: &str = "All sub-agent tasks have reported. \
     Use task_await to collect the reports and integrate the results.";

impl<R, W, G, H, C> AgentTaskService<R, W, G, H, C>
where
    R: RuntimeProvider,
    W: WorkspaceService,
    G: StreamGateway,
    H: HistoryStore,
    C: Clock,
{
    /// Entry point for gateway stream-end events. Serialized per workspace;
    /// failures are logged, never propagated.
    pub async fn handle_stream_end(&self, event: StreamEndEvent) {
        let _guard = self.stream_locks().lock(event.workspace_id.as_str()).await;
        if let Err(err) = self.process_stream_end(&event).await {
            tracing::warn!(
                workspace_id = %event.workspace_id,
                error = %err,
                "stream-end handling failed"
            );
        }
    }

    async fn process_stream_end(&self, event: &StreamEndEvent) -> Result<(), EngineError> {
        let config = self.snapshot();
        let index = TaskIndex::build(&config);
        match index.entry(&event.workspace_id.as_task()).cloned() {
            None => self.root_stream_ended(event, &index).await,
            Some(entry) => self.task_stream_ended(event, entry, &index).await,
        }
    }

    /// Case A: a non-task workspace's turn ended.
    async fn root_stream_ended(
        &self,
        event: &StreamEndEvent,
        index: &TaskIndex,
    ) -> Result<(), EngineError> {
        let ws = &event.workspace_id;
        if index.active_descendants(ws).is_empty() {
            return Ok(());
        }
        if self.deps().gateway.is_streaming(ws) {
            return Ok(());
        }
        if self.is_interrupted(ws) {
            tracing::debug!(workspace_id = %ws, "auto-resume suppressed: hard-interrupted");
            return Ok(());
        }
        self.auto_resume_workspace(ws, event.metadata.agent_id.as_deref(), WAIT_FOR_TASKS_PROMPT)
            .await
    }

    /// Send a synthetic prompt keeping a workspace's turn alive, bounded by
    /// the consecutive auto-resume flood cap.
    pub(crate) async fn auto_resume_workspace(
        &self,
        ws: &WorkspaceId,
        event_agent: Option<&str>,
        prompt: &str,
    ) -> Result<(), EngineError> {
        if !self.take_auto_resume_credit(ws) {
            tracing::warn!(
                workspace_id = %ws,
                cap = self.cfg().max_consecutive_auto_resumes,
                "auto-resume flood cap reached; not resuming"
            );
            return Ok(());
        }
        let (agent, model, thinking) = self.resolve_active_agent(ws, event_agent).await;
        let opts = SendOptions::synthetic().with_agent(agent).with_model(model, thinking);
        self.deps()
            .workspaces
            .send_message(ws, prompt, opts)
            .await
            .map_err(|err| EngineError::SendFailed(err.to_string()))
    }

    /// Case B: a task workspace's turn ended.
    async fn task_stream_ended(
        &self,
        event: &StreamEndEvent,
        entry: TaskEntry,
        index: &TaskIndex,
    ) -> Result<(), EngineError> {
        let task_id = entry.id();
        let ws = entry.workspace_id().clone();

        if entry.status() == TaskStatus::Reported {
            self.cleanup_reported_chain(ws).await;
            return Ok(());
        }

        // A task must not finalize while any of its own sub-agents is live.
        if !index.active_descendants(&ws).is_empty() {
            if entry.status() == TaskStatus::AwaitingReport {
                self.config_store().edit(|cfg| {
                    if let Some(task) =
                        cfg.workspace_mut(&ws).and_then(WorkspaceRecord::task_mut)
                    {
                        task.task_status = TaskStatus::Running;
                    }
                })?;
                self.emit_record_metadata(&ws);
                tracing::debug!(task_id = %task_id, "demoted to running: descendants still active");
            }
            return Ok(());
        }

        // agent_report wins over propose_plan when both appear in one turn.
        if let Some(call) = find_completion_call(&event.parts, TOOL_AGENT_REPORT) {
            if let Some(report) = parse_agent_report(call.input) {
                self.finalize_report(&task_id, report).await?;
                self.cleanup_reported_chain(ws).await;
                return Ok(());
            }
        }

        let plan_like = self.agents().is_plan_like(entry.agent_id());
        if plan_like {
            if let Some(call) = find_completion_call(&event.parts, TOOL_PROPOSE_PLAN) {
                if let Some(plan_path) = plan_path_from_output(call.output) {
                    return self.plan_auto_handoff(&entry, plan_path).await;
                }
            }
        }

        // The stream ended without the required completion tool.
        if entry.status() == TaskStatus::AwaitingReport && self.was_reminded(&task_id) {
            let report = self.fallback_report(&entry, &event.parts).await;
            tracing::info!(task_id = %task_id, "posting fallback report after unheeded reminder");
            self.finalize_report(&task_id, report).await?;
            self.cleanup_reported_chain(ws).await;
            return Ok(());
        }

        self.config_store().edit(|cfg| {
            if let Some(task) = cfg.workspace_mut(&ws).and_then(WorkspaceRecord::task_mut) {
                task.task_status = TaskStatus::AwaitingReport;
            }
        })?;
        self.emit_record_metadata(&ws);
        self.mark_reminded(&task_id);
        let tool = if plan_like { TOOL_PROPOSE_PLAN } else { TOOL_AGENT_REPORT };
        self.send_completion_reminder(&entry, tool).await
    }

    /// One-shot synthetic message forcing the required completion tool.
    pub(crate) async fn send_completion_reminder(
        &self,
        entry: &TaskEntry,
        tool: &str,
    ) -> Result<(), EngineError> {
        let task = entry.task();
        let text = format!(
            "Your turn ended without calling {tool}. Call {tool} now to report your result."
        );
        let opts = SendOptions::synthetic()
            .with_agent(entry.agent_id())
            .with_model(task.task_model_string.clone(), task.task_thinking_level)
            .requiring_tool(tool);
        self.deps()
            .workspaces
            .send_message(entry.workspace_id(), &text, opts)
            .await
            .map_err(|err| EngineError::SendFailed(err.to_string()))
    }

    /// Assemble a fallback report from the task's last visible output.
    pub(crate) async fn fallback_report(
        &self,
        entry: &TaskEntry,
        parts: &[MessagePart],
    ) -> AgentReport {
        let ws = entry.workspace_id();
        let mut text = last_text(parts).map(str::to_string);
        if text.is_none() {
            text = self
                .deps()
                .history
                .read_partial(ws)
                .await
                .ok()
                .flatten()
                .map(|partial| partial.text())
                .filter(|t| !t.is_empty());
        }
        if text.is_none() {
            text = self
                .deps()
                .history
                .last_messages(ws, 20)
                .await
                .ok()
                .and_then(|messages| {
                    messages
                        .iter()
                        .rev()
                        .filter(|m| m.role == Role::Assistant)
                        .map(|m| m.text())
                        .find(|t| !t.is_empty())
                });
        }
        let text = text.unwrap_or_else(|| "(no output)".to_string());
        AgentReport {
            report_markdown: format!(
                "*(Note: the sub-agent finished without calling {TOOL_AGENT_REPORT}; \
                 this report was assembled from its last message as a fallback.)*\n\n{text}"
            ),
            title: Some(format!("Subagent ({}) report (fallback)", entry.agent_id())),
        }
    }
}

#[cfg(test)]
#[path = "stream_end_tests.rs"]
mod tests;
