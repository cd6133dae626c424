// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task creation: validation, admission control, and queued-task startup.

use super::{AgentTaskService, CreateTaskParams, CreatedTask, TaskKind};
use crate::adapters::{
    HistoryStore, RuntimeProvider, SendOptions, StreamGateway, WorkspaceService,
};
use crate::error::EngineError;
use crate::index::TaskIndex;
use mux_core::agent::{normalize_agent_id, validate_model_string};
use mux_core::{slugify, Clock, RuntimeConfig, TaskEntry, TaskFields, TaskId, TaskStatus,
    WorkspaceRecord};
use std::path::PathBuf;

const SLUG_MAX_LEN: usize = 24;
const NAME_MAX_LEN: usize = 64;
const NAME_SUFFIX_LEN: usize = 6;

/// Derive a child workspace name from the agent, title (or prompt), and a
/// task-id suffix for uniqueness.
fn build_workspace_name(agent_id: &str, params: &CreateTaskParams, task_id: &TaskId) -> String {
    let seed = params
        .title
        .as_deref()
        .filter(|t| !t.trim().is_empty())
        .unwrap_or(params.prompt.as_str());
    let slug = slugify(seed, SLUG_MAX_LEN);
    let suffix = &task_id.as_str()[..NAME_SUFFIX_LEN.min(task_id.as_str().len())];
    if slug.is_empty() {
        format!("{agent_id}-{suffix}")
    } else {
        format!("{agent_id}-{slug}-{suffix}")
    }
}

fn validate_workspace_name(name: &str) -> Result<(), EngineError> {
    let valid = !name.is_empty()
        && name.len() <= NAME_MAX_LEN
        && !name.starts_with('-')
        && !name.ends_with('-')
        && name.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    if valid {
        Ok(())
    } else {
        Err(EngineError::InvalidWorkspaceName(name.to_string()))
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
    /// Spawn an agent task under a parent workspace.
    ///
    /// Queues the task when the global parallelism limit is reached,
    /// otherwise materializes its workspace and starts it immediately.
    pub async fn create(&self, params: CreateTaskParams) -> Result<CreatedTask, EngineError> {
        let _guard = self.service_lock().lock().await;

        let raw_agent = params
            .agent_id
            .clone()
            .or_else(|| params.agent_type.clone())
            .unwrap_or_default();
        let agent_id = normalize_agent_id(&raw_agent);
        if agent_id.is_empty() {
            return Err(EngineError::AgentIdRequired);
        }
        if !self.agents().contains(&agent_id) {
            return Err(EngineError::UnknownAgent(agent_id));
        }
        if params.prompt.trim().is_empty() {
            return Err(EngineError::PromptRequired);
        }
        if let Some(model) = &params.model_string {
            validate_model_string(model)?;
        }

        let config = self.snapshot();
        let parent = config
            .workspace(&params.parent_workspace_id)
            .ok_or_else(|| EngineError::ParentNotFound(params.parent_workspace_id.clone()))?
            .clone();
        if parent.task.as_ref().is_some_and(|t| t.task_status == TaskStatus::Reported) {
            return Err(EngineError::ParentAlreadyReported);
        }

        let index = TaskIndex::build(&config);
        let requested_depth = index.depth_of_workspace(&params.parent_workspace_id)? + 1;
        if requested_depth > self.cfg().max_task_nesting_depth {
            return Err(EngineError::NestingDepthExceeded {
                depth: requested_depth,
                max: self.cfg().max_task_nesting_depth,
            });
        }

        let task_id = TaskId::new(self.config_store().generate_stable_id());
        let workspace_name = build_workspace_name(&agent_id, &params, &task_id);
        validate_workspace_name(&workspace_name)?;

        let mut fields =
            TaskFields::new(params.parent_workspace_id.clone(), &agent_id, self.clock().iso_now());
        fields.title = params.title.clone();
        fields.task_prompt = Some(params.prompt.clone());
        fields.task_model_string = params.model_string.clone();
        fields.task_thinking_level = params.thinking_level;
        fields.task_experiments = params.experiments.clone();

        let record = WorkspaceRecord {
            id: task_id.workspace(),
            project_path: parent.project_path.clone(),
            workspace_name,
            workspace_path: PathBuf::new(),
            runtime_config: RuntimeConfig::Worktree,
            task: Some(fields),
        };
        self.config_store().edit(|cfg| cfg.insert(record.clone()))?;
        self.emit_record_metadata(&task_id.workspace());

        if !self.has_capacity(&index) {
            tracing::info!(task_id = %task_id, parent = %params.parent_workspace_id, "task queued at capacity");
            return Ok(CreatedTask { task_id, kind: TaskKind::Agent, status: TaskStatus::Queued });
        }

        match self.start_queued_task(&task_id).await {
            Ok(()) => {
                Ok(CreatedTask { task_id, kind: TaskKind::Agent, status: TaskStatus::Running })
            }
            Err(err) => {
                tracing::warn!(task_id = %task_id, error = %err, "task start failed; rolling back");
                self.rollback_task(&task_id).await;
                Err(err)
            }
        }
    }

    /// Start a queued task: materialize its workspace, send the persisted
    /// prompt, flip to running, and fire start waiters.
    ///
    /// Caller must hold the service lock.
    pub(crate) async fn start_queued_task(&self, task_id: &TaskId) -> Result<(), EngineError> {
        let ws = task_id.workspace();
        let config = self.snapshot();
        let entry = config
            .workspace(&ws)
            .cloned()
            .and_then(TaskEntry::from_record)
            .ok_or_else(|| EngineError::TaskNotFound(task_id.clone()))?;
        if entry.status() != TaskStatus::Queued {
            return Ok(());
        }

        // Re-validate the parent: it may have reported or been removed
        // while this task sat in the queue.
        let parent = config
            .workspace(entry.parent_workspace_id())
            .ok_or_else(|| EngineError::ParentNotFound(entry.parent_workspace_id().clone()))?
            .clone();
        if parent.task.as_ref().is_some_and(|t| t.task_status == TaskStatus::Reported) {
            return Err(EngineError::ParentAlreadyReported);
        }

        // Materialize the workspace on first start. Fork the parent's tree
        // when it has one, otherwise create fresh.
        if entry.record().workspace_path.as_os_str().is_empty() {
            let name = entry.record().workspace_name.clone();
            let materialized = if parent.workspace_path.as_os_str().is_empty() {
                self.deps().runtime.create_workspace(&entry.record().project_path, &name).await
            } else {
                self.deps().runtime.fork_workspace(&parent, &name).await
            }
            .map_err(|err| EngineError::ForkFailed(err.to_string()))?;

            self.config_store().edit(|cfg| {
                if let Some(record) = cfg.workspace_mut(&ws) {
                    record.workspace_path = materialized.workspace_path.clone();
                    if let Some(task) = record.task_mut() {
                        task.task_trunk_branch = materialized.trunk_branch.clone();
                        // Base commit is captured once and never overwritten.
                        if task.task_base_commit_sha.is_none() {
                            task.task_base_commit_sha = materialized.base_commit_sha.clone();
                        }
                    }
                }
            })?;
        }

        let record = self
            .record_of(&ws)
            .ok_or_else(|| EngineError::TaskNotFound(task_id.clone()))?;

        // Kick background init unless the agent suppresses it.
        if !self.agents().skip_workspace_init(entry.agent_id()) {
            let service = self.clone();
            let init_record = record.clone();
            tokio::spawn(async move {
                if let Err(err) = service.deps().runtime.init_workspace(&init_record).await {
                    tracing::warn!(workspace_id = %init_record.id, error = %err, "workspace init failed");
                }
            });
        }

        let task = entry.task();
        let opts = SendOptions {
            synthetic: true,
            skip_auto_resume_reset: true,
            allow_queued_agent_task: true,
            agent_id: Some(entry.agent_id().to_string()),
            model_string: task.task_model_string.clone(),
            thinking_level: task.task_thinking_level,
            ..SendOptions::default()
        };
        match &task.task_prompt {
            Some(prompt) => self
                .deps()
                .workspaces
                .send_message(&ws, prompt, opts)
                .await
                .map_err(|err| EngineError::SendFailed(err.to_string()))?,
            // Legacy queued entries persisted without a prompt: resume the
            // stream instead of re-sending.
            None => self
                .deps()
                .workspaces
                .resume_stream(&ws, opts)
                .await
                .map_err(|err| EngineError::SendFailed(err.to_string()))?,
        }

        self.config_store().edit(|cfg| {
            if let Some(task) = cfg.workspace_mut(&ws).and_then(WorkspaceRecord::task_mut) {
                task.task_status = TaskStatus::Running;
                task.task_prompt = None;
            }
        })?;
        self.emit_record_metadata(&ws);
        self.waiters().fire_start(task_id);
        tracing::info!(task_id = %task_id, agent = entry.agent_id(), "task started");
        Ok(())
    }

    /// Undo a failed start: remove the persisted entry, delete any partial
    /// workspace and session dir, and announce removal.
    pub(crate) async fn rollback_task(&self, task_id: &TaskId) {
        let ws = task_id.workspace();
        if let Some(record) = self.record_of(&ws) {
            if let Err(err) = self.deps().runtime.remove_workspace(&record).await {
                tracing::warn!(task_id = %task_id, error = %err, "rollback workspace removal failed");
            }
        }
        if let Err(err) = self.config_store().remove_workspace(&ws) {
            tracing::warn!(task_id = %task_id, error = %err, "rollback config removal failed");
        }
        self.forget_task_flags(task_id);
        self.deps().workspaces.emit_metadata(&ws, None);
    }
}

#[cfg(test)]
#[path = "create_tests.rs"]
mod tests;
