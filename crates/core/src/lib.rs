// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! mux-core: domain types for the mux agent task engine
//!
//! Pure data: typed ids, the clock abstraction, agent catalog, persisted
//! task/workspace records, chat messages with their tool-call parts, and the
//! on-disk artifact records. No IO lives here.

pub mod agent;
pub mod artifact;
pub mod clock;
pub mod config;
pub mod id;
pub mod message;
pub mod slug;
pub mod task;

pub use agent::{
    validate_model_string, AgentCatalog, AgentDef, InvalidModelString, ThinkingLevel, AGENT_COMPACT,
    AGENT_EXEC, AGENT_ORCHESTRATOR, AGENT_PLAN,
};
pub use artifact::{
    ArtifactIndex, PatchArtifact, PatchStatus, ReportArtifact, SessionArtifact, TranscriptArtifact,
};
pub use clock::{iso_from_epoch_ms, Clock, FakeClock, SystemClock};
pub use config::Config;
pub use id::{TaskId, WorkspaceId};
pub use message::{
    find_completion_call, last_text, parse_agent_report, plan_path_from_output,
    subagent_report_envelope, ChatMessage, CompletionCall, MessageMetadata, MessagePart, Role,
    ToolState, TOOL_AGENT_REPORT, TOOL_ASK_USER_QUESTION, TOOL_PROPOSE_PLAN, TOOL_TASK,
    TOOL_TASK_AWAIT,
};
pub use slug::slugify;
pub use task::{AgentReport, RuntimeConfig, TaskEntry, TaskFields, TaskStatus, WorkspaceRecord};
