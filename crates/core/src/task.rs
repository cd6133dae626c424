// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Persisted task workspace entries and their lifecycle status.

use crate::agent::{normalize_agent_id, ThinkingLevel};
use crate::id::{TaskId, WorkspaceId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::path::PathBuf;

/// Lifecycle status of an agent task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Queued,
    Running,
    AwaitingReport,
    Reported,
    /// Legacy rows only: stream was user-stopped without termination.
    Interrupted,
}

impl TaskStatus {
    /// Whether the task still occupies a place in the tree's active set.
    pub fn is_active(self) -> bool {
        matches!(self, TaskStatus::Queued | TaskStatus::Running | TaskStatus::AwaitingReport)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskStatus::Queued => "queued",
            TaskStatus::Running => "running",
            TaskStatus::AwaitingReport => "awaiting_report",
            TaskStatus::Reported => "reported",
            TaskStatus::Interrupted => "interrupted",
        };
        write!(f, "{s}")
    }
}

/// Where a task workspace's files live and how its agent is executed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RuntimeConfig {
    #[default]
    Local,
    Worktree,
    Ssh {
        host: String,
    },
    Docker {
        image: String,
    },
}

/// A completed report as returned to waiters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentReport {
    pub report_markdown: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// The task-specific fields of a workspace record.
///
/// Present only on workspaces spawned as agent tasks. `task_prompt` is
/// non-empty iff the task is queued; `task_base_commit_sha` is captured once
/// the workspace exists and never changes afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskFields {
    pub parent_workspace_id: WorkspaceId,
    #[serde(default)]
    pub agent_id: String,
    /// Legacy alias of `agent_id`; kept in sync on write.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub created_at: String,
    pub task_status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_trunk_branch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_base_commit_sha: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_model_string: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_thinking_level: Option<ThinkingLevel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_experiments: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reported_at: Option<String>,
}

impl TaskFields {
    pub fn new(parent: WorkspaceId, agent_id: &str, created_at: String) -> Self {
        let agent_id = normalize_agent_id(agent_id);
        Self {
            parent_workspace_id: parent,
            agent_type: Some(agent_id.clone()),
            agent_id,
            title: None,
            created_at,
            task_status: TaskStatus::Queued,
            task_prompt: None,
            task_trunk_branch: None,
            task_base_commit_sha: None,
            task_model_string: None,
            task_thinking_level: None,
            task_experiments: None,
            reported_at: None,
        }
    }

    /// Effective agent id, falling back to the legacy `agent_type` alias.
    pub fn effective_agent_id(&self) -> &str {
        if !self.agent_id.is_empty() {
            &self.agent_id
        } else {
            self.agent_type.as_deref().unwrap_or_default()
        }
    }
}

/// One row of the persisted multi-project workspace table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceRecord {
    pub id: WorkspaceId,
    pub project_path: PathBuf,
    pub workspace_name: String,
    #[serde(default)]
    pub workspace_path: PathBuf,
    #[serde(default)]
    pub runtime_config: RuntimeConfig,
    #[serde(flatten, default, skip_serializing_if = "Option::is_none")]
    pub task: Option<TaskFields>,
}

impl WorkspaceRecord {
    pub fn root(id: WorkspaceId, project_path: PathBuf, name: &str, path: PathBuf) -> Self {
        Self {
            id,
            project_path,
            workspace_name: name.to_string(),
            workspace_path: path,
            runtime_config: RuntimeConfig::default(),
            task: None,
        }
    }

    pub fn is_task(&self) -> bool {
        self.task.is_some()
    }

    pub fn task_mut(&mut self) -> Option<&mut TaskFields> {
        self.task.as_mut()
    }
}

/// A workspace record known to carry task fields. Index-facing view.
#[derive(Debug, Clone)]
pub struct TaskEntry {
    record: WorkspaceRecord,
}

impl TaskEntry {
    /// Wrap a record, returning `None` for non-task workspaces.
    pub fn from_record(record: WorkspaceRecord) -> Option<Self> {
        record.is_task().then_some(Self { record })
    }

    pub fn id(&self) -> TaskId {
        self.record.id.as_task()
    }

    pub fn workspace_id(&self) -> &WorkspaceId {
        &self.record.id
    }

    pub fn record(&self) -> &WorkspaceRecord {
        &self.record
    }

    pub fn task(&self) -> &TaskFields {
        // Invariant: from_record rejects recordless wraps.
        match &self.record.task {
            Some(fields) => fields,
            None => unreachable!("TaskEntry built from non-task record"),
        }
    }

    pub fn status(&self) -> TaskStatus {
        self.task().task_status
    }

    pub fn parent_workspace_id(&self) -> &WorkspaceId {
        &self.task().parent_workspace_id
    }

    pub fn agent_id(&self) -> &str {
        self.task().effective_agent_id()
    }

    pub fn created_at(&self) -> &str {
        &self.task().created_at
    }

    pub fn workspace_path(&self) -> &PathBuf {
        &self.record.workspace_path
    }
}

#[cfg(test)]
#[path = "task_tests.rs"]
mod tests;
