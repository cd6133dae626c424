// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workspace service: the chat-facing surface of a workspace.

use super::AdapterError;
use async_trait::async_trait;
use mux_core::agent::ThinkingLevel;
use mux_core::{ChatMessage, WorkspaceId, WorkspaceRecord};

/// Constrain which tools the model may call for the next turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolPolicy {
    /// The named tool must be invoked before the turn may end.
    Require(String),
}

/// Options for sending a message into a workspace.
#[derive(Debug, Clone, Default)]
pub struct SendOptions {
    /// Message originates from the engine, not the user.
    pub synthetic: bool,
    /// Do not reset the consecutive auto-resume counter for this send.
    pub skip_auto_resume_reset: bool,
    /// Fail instead of queueing when the workspace is mid-stream.
    pub require_idle: bool,
    /// Permit sending into a workspace whose task is still queued.
    pub allow_queued_agent_task: bool,
    pub agent_id: Option<String>,
    pub model_string: Option<String>,
    pub thinking_level: Option<ThinkingLevel>,
    pub tool_policy: Option<ToolPolicy>,
}

impl SendOptions {
    pub fn synthetic() -> Self {
        Self { synthetic: true, skip_auto_resume_reset: true, ..Self::default() }
    }

    pub fn with_agent(mut self, agent_id: impl Into<String>) -> Self {
        self.agent_id = Some(agent_id.into());
        self
    }

    pub fn with_model(
        mut self,
        model_string: Option<String>,
        thinking_level: Option<ThinkingLevel>,
    ) -> Self {
        self.model_string = model_string;
        self.thinking_level = thinking_level;
        self
    }

    pub fn requiring_tool(mut self, tool: impl Into<String>) -> Self {
        self.tool_policy = Some(ToolPolicy::Require(tool.into()));
        self
    }
}

/// AI settings of a workspace, used as the tail of the agent resolution
/// precedence chain.
#[derive(Debug, Clone, Default)]
pub struct WorkspaceAiInfo {
    pub agent_id: Option<String>,
    pub model_string: Option<String>,
    pub thinking_level: Option<ThinkingLevel>,
}

#[async_trait]
pub trait WorkspaceService: Send + Sync + 'static {
    async fn send_message(
        &self,
        id: &WorkspaceId,
        text: &str,
        opts: SendOptions,
    ) -> Result<(), AdapterError>;

    /// Resume the workspace's stream without new input (legacy queued
    /// entries persisted before prompts were stored).
    async fn resume_stream(&self, id: &WorkspaceId, opts: SendOptions) -> Result<(), AdapterError>;

    /// Push a metadata update to UI listeners. `None` announces removal.
    fn emit_metadata(&self, id: &WorkspaceId, record: Option<&WorkspaceRecord>);

    async fn get_info(&self, id: &WorkspaceId) -> Result<WorkspaceAiInfo, AdapterError>;

    /// Publish (or clear, with `None`) a transient agent status line.
    async fn update_agent_status(&self, id: &WorkspaceId, status: Option<String>);

    /// Replace the workspace's history with a single summary message.
    async fn replace_history(
        &self,
        id: &WorkspaceId,
        summary: ChatMessage,
    ) -> Result<(), AdapterError>;

    /// Emit a synthetic tool-call-end after a partial tool part was
    /// completed in place.
    fn notify_tool_call_end(&self, id: &WorkspaceId, tool_call_id: &str);
}
