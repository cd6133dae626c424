// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Plan auto-handoff: when a plan-like task proposes a plan, compact its
//! history to the plan summary, reroute the task to an execution agent, and
//! kick it off again.

use super::{AgentTaskService, PlanRouting};
use crate::adapters::{
    HistoryStore, RuntimeProvider, SendOptions, StreamGateway, WorkspaceService,
};
use crate::error::EngineError;
use mux_core::agent::{normalize_agent_id, AGENT_EXEC, AGENT_ORCHESTRATOR};
use mux_core::{ChatMessage, Clock, TaskEntry, TaskStatus, WorkspaceRecord};

const KICKOFF_PROMPT: &str = "Implement the plan.";
const CLASSIFYING_STATUS: &str = "Choosing next agent";

impl<R, W, G, H, C> AgentTaskService<R, W, G, H, C>
where
    R: RuntimeProvider,
    W: WorkspaceService,
    G: StreamGateway,
    H: HistoryStore,
    C: Clock,
{
    /// Hand a proposed plan off to an execution agent.
    ///
    /// On failure the task is left `running` so restart recovery can retry.
    pub(crate) async fn plan_auto_handoff(
        &self,
        entry: &TaskEntry,
        plan_path: &str,
    ) -> Result<(), EngineError> {
        let task_id = entry.id();
        if !self.handoff_begin(&task_id) {
            tracing::debug!(task_id = %task_id, "handoff already in progress");
            return Ok(());
        }
        let result = self.run_plan_handoff(entry, plan_path).await;
        self.handoff_end(&task_id);

        if let Err(err) = &result {
            tracing::warn!(task_id = %task_id, error = %err, "plan handoff failed; leaving task running");
            let ws = entry.workspace_id().clone();
            let _ = self.config_store().edit(|cfg| {
                if let Some(task) = cfg.workspace_mut(&ws).and_then(WorkspaceRecord::task_mut) {
                    task.task_status = TaskStatus::Running;
                }
            });
        }
        result
    }

    async fn run_plan_handoff(
        &self,
        entry: &TaskEntry,
        plan_path: &str,
    ) -> Result<(), EngineError> {
        let ws = entry.workspace_id().clone();
        let plan_file = entry.workspace_path().join(plan_path);
        let plan = std::fs::read_to_string(&plan_file).map_err(|err| {
            EngineError::HandoffFailed(format!("cannot read plan {}: {err}", plan_file.display()))
        })?;

        let target = self.route_plan(&ws, &plan).await;
        tracing::info!(task_id = %entry.id(), target = %target, "plan handoff routing decided");

        // Replace history with a single compaction-boundary summary.
        let epoch = self.next_compaction_epoch(&ws).await;
        let mut summary = ChatMessage::assistant(
            self.new_message_id(),
            format!("## Proposed plan\n\n{plan}"),
        );
        summary.metadata.agent_id = Some(target.clone());
        summary.metadata.compacted = Some("user".to_string());
        summary.metadata.compaction_epoch = Some(epoch);
        summary.metadata.compaction_boundary = true;
        self.deps()
            .workspaces
            .replace_history(&ws, summary)
            .await
            .map_err(|err| EngineError::HandoffFailed(err.to_string()))?;

        // The handed-off task keeps its model; only the agent changes.
        self.config_store().edit(|cfg| {
            if let Some(task) = cfg.workspace_mut(&ws).and_then(WorkspaceRecord::task_mut) {
                task.agent_id = target.clone();
                task.agent_type = Some(target.clone());
                task.task_status = TaskStatus::Running;
            }
        })?;
        self.emit_record_metadata(&ws);

        let task = entry.task();
        let opts = SendOptions::synthetic()
            .with_agent(target)
            .with_model(task.task_model_string.clone(), task.task_thinking_level);
        self.deps()
            .workspaces
            .send_message(&ws, KICKOFF_PROMPT, opts)
            .await
            .map_err(|err| EngineError::HandoffFailed(err.to_string()))
    }

    /// Resolve the handoff target agent. `auto` consults the classifier
    /// LLM, publishing a transient status while it runs; every failure
    /// path falls back to `exec`.
    async fn route_plan(&self, ws: &mux_core::WorkspaceId, plan: &str) -> String {
        let orchestrator_enabled = self.agents().has_orchestrator();
        match self.cfg().plan_handoff_target {
            PlanRouting::Exec => AGENT_EXEC.to_string(),
            PlanRouting::Orchestrator => {
                if orchestrator_enabled {
                    AGENT_ORCHESTRATOR.to_string()
                } else {
                    AGENT_EXEC.to_string()
                }
            }
            PlanRouting::Auto => {
                if !orchestrator_enabled {
                    return AGENT_EXEC.to_string();
                }
                self.deps()
                    .workspaces
                    .update_agent_status(ws, Some(CLASSIFYING_STATUS.to_string()))
                    .await;
                let routed = self.deps().gateway.classify_plan(plan).await;
                self.deps().workspaces.update_agent_status(ws, None).await;
                match routed {
                    Ok(agent) if normalize_agent_id(&agent) == AGENT_ORCHESTRATOR => {
                        AGENT_ORCHESTRATOR.to_string()
                    }
                    Ok(_) => AGENT_EXEC.to_string(),
                    Err(err) => {
                        tracing::warn!(workspace_id = %ws, error = %err, "plan classifier failed; routing to exec");
                        AGENT_EXEC.to_string()
                    }
                }
            }
        }
    }

    /// Next monotonically increasing compaction epoch for a workspace.
    async fn next_compaction_epoch(&self, ws: &mux_core::WorkspaceId) -> u64 {
        let previous = self
            .deps()
            .history
            .last_messages(ws, 50)
            .await
            .unwrap_or_default()
            .iter()
            .filter_map(|m| m.metadata.compaction_epoch)
            .max()
            .unwrap_or(0);
        previous + 1
    }
}

#[cfg(test)]
#[path = "handoff_tests.rs"]
mod tests;
