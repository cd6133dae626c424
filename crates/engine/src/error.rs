// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine error taxonomy.
//!
//! Validation and capacity errors surface to the caller with no state
//! change; transient runtime errors are reported after rollback; tree
//! corruption (cycles, depth overflow) is fatal to the calling operation.

use crate::artifacts::ArtifactError;
use crate::config_store::ConfigError;
use mux_core::agent::InvalidModelString;
use mux_core::{TaskId, WorkspaceId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("parent workspace not found: {0}")]
    ParentNotFound(WorkspaceId),
    #[error("task prompt is required")]
    PromptRequired,
    #[error("agentId is required")]
    AgentIdRequired,
    #[error("unknown agentId: {0:?}")]
    UnknownAgent(String),
    #[error(transparent)]
    InvalidModel(#[from] InvalidModelString),
    #[error("maxTaskNestingDepth exceeded: depth {depth} > {max}")]
    NestingDepthExceeded { depth: usize, max: usize },
    #[error("cannot spawn new tasks after agent_report")]
    ParentAlreadyReported,
    #[error("generated workspace name invalid: {0:?}")]
    InvalidWorkspaceName(String),
    #[error("task not found: {0}")]
    TaskNotFound(TaskId),
    #[error("task {task} is not a descendant of {ancestor}")]
    NotADescendant { ancestor: WorkspaceId, task: TaskId },
    #[error("task tree corrupted: {0}")]
    TreeCorrupted(String),
    #[error("workspace fork failed: {0}")]
    ForkFailed(String),
    #[error("send failed: {0}")]
    SendFailed(String),
    #[error("plan handoff failed: {0}")]
    HandoffFailed(String),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Artifact(#[from] ArtifactError),
    #[error("timed out waiting for agent report after {timeout_ms}ms")]
    WaitTimeout { timeout_ms: u64 },
    #[error("wait for agent report aborted")]
    WaitAborted,
    #[error("{0}")]
    TaskTerminated(String),
}

impl EngineError {
    /// Whether the error indicates invalid caller input rather than an
    /// engine-side failure.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            EngineError::ParentNotFound(_)
                | EngineError::PromptRequired
                | EngineError::AgentIdRequired
                | EngineError::UnknownAgent(_)
                | EngineError::InvalidModel(_)
                | EngineError::NestingDepthExceeded { .. }
                | EngineError::ParentAlreadyReported
                | EngineError::InvalidWorkspaceName(_)
        )
    }
}
