// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Adapters for external collaborators.
//!
//! The engine talks to its runtime provider, workspace service, AI stream
//! gateway, and history store through these traits. Real implementations
//! live in the embedding orchestrator; a file-backed history store ships
//! here, and call-recording fakes are available behind `test-support`.

pub mod gateway;
pub mod history;
pub mod runtime;
pub mod workspace;

#[cfg(any(test, feature = "test-support"))]
pub mod fake;

pub use gateway::{StreamEndEvent, StreamEndMetadata, StreamGateway};
pub use history::{FsHistoryStore, HistoryStore};
pub use runtime::{MaterializedWorkspace, RuntimeProvider};
pub use workspace::{SendOptions, ToolPolicy, WorkspaceAiInfo, WorkspaceService};

#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeGateway, FakeHistory, FakeRuntime, FakeWorkspaces, SentMessage};

use thiserror::Error;

/// Errors from collaborator operations.
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("{0}")]
    Failed(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}
