// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! AI stream gateway: stream state queries and the plan-routing classifier.
//!
//! Stream-end events flow the other way: the embedder subscribes to the
//! gateway and pushes each event into
//! [`AgentTaskService::handle_stream_end`](crate::service::AgentTaskService::handle_stream_end).

use super::AdapterError;
use async_trait::async_trait;
use mux_core::{MessagePart, WorkspaceId};

/// Payload of a gateway `stream-end` event.
#[derive(Debug, Clone)]
pub struct StreamEndEvent {
    pub workspace_id: WorkspaceId,
    pub parts: Vec<MessagePart>,
    pub metadata: StreamEndMetadata,
}

#[derive(Debug, Clone, Default)]
pub struct StreamEndMetadata {
    /// Agent that produced the stream, when the gateway knows it.
    pub agent_id: Option<String>,
    pub timestamp: Option<String>,
}

#[async_trait]
pub trait StreamGateway: Send + Sync + 'static {
    fn is_streaming(&self, id: &WorkspaceId) -> bool;

    async fn stop_stream(&self, id: &WorkspaceId, abandon_partial: bool)
        -> Result<(), AdapterError>;

    /// Classify a proposed plan for auto-handoff routing. Returns an agent
    /// id, normally `"exec"` or `"orchestrator"`.
    async fn classify_plan(&self, plan_markdown: &str) -> Result<String, AdapterError>;
}
