// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runtime provider: creates, forks, and deletes workspace filesystems.

use super::AdapterError;
use async_trait::async_trait;
use mux_core::WorkspaceRecord;
use std::path::{Path, PathBuf};

/// Result of materializing a task workspace on disk.
#[derive(Debug, Clone)]
pub struct MaterializedWorkspace {
    pub workspace_path: PathBuf,
    pub trunk_branch: Option<String>,
    /// Head of the forked tree at creation time. Captured once; immutable.
    pub base_commit_sha: Option<String>,
}

#[async_trait]
pub trait RuntimeProvider: Send + Sync + 'static {
    /// Fork the parent workspace's source tree into a new child workspace.
    async fn fork_workspace(
        &self,
        parent: &WorkspaceRecord,
        name: &str,
    ) -> Result<MaterializedWorkspace, AdapterError>;

    /// Create a fresh workspace when the parent has no forkable tree.
    async fn create_workspace(
        &self,
        project_path: &Path,
        name: &str,
    ) -> Result<MaterializedWorkspace, AdapterError>;

    /// Delete a workspace's filesystem. Idempotent.
    async fn remove_workspace(&self, record: &WorkspaceRecord) -> Result<(), AdapterError>;

    /// Project init hook run in the background after a fork.
    async fn init_workspace(&self, record: &WorkspaceRecord) -> Result<(), AdapterError>;

    /// Render the workspace's changes against its base commit as a
    /// git-format-patch mbox.
    async fn export_patch(&self, record: &WorkspaceRecord) -> Result<String, AdapterError>;
}
