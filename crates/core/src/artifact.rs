// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! On-disk artifact records kept in per-workspace session directories.
//!
//! Reports, patches, and transcripts for a child task live under
//! `subagent-reports/`, `subagent-patches/`, `subagent-transcripts/` with an
//! `index.json` per kind: `{"artifactsByChildTaskId": {...}}`.

use crate::agent::ThinkingLevel;
use crate::id::{TaskId, WorkspaceId};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// An artifact kind that can live in a session-directory index.
pub trait SessionArtifact: Serialize + DeserializeOwned + Clone + Send + 'static {
    /// Session subdirectory this kind is stored under.
    const DIR: &'static str;

    fn updated_at_ms(&self) -> u64;

    /// Rewrite ownership after an intermediate workspace was deleted: the
    /// deleted id is dropped from the ancestor chain and the new parent is
    /// moved to position 0.
    fn reparent(&mut self, deleted: &WorkspaceId, new_parent: &WorkspaceId);
}

/// Drop `deleted` from an ancestor chain and move `new_parent` to the front.
pub fn reparent_chain(
    ancestors: &mut Vec<WorkspaceId>,
    deleted: &WorkspaceId,
    new_parent: &WorkspaceId,
) {
    ancestors.retain(|id| id != deleted && id != new_parent);
    ancestors.insert(0, new_parent.clone());
}

/// A completed report persisted into an ancestor's session directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportArtifact {
    pub child_task_id: TaskId,
    pub parent_workspace_id: WorkspaceId,
    pub ancestor_workspace_ids: Vec<WorkspaceId>,
    pub report_markdown: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thinking_level: Option<ThinkingLevel>,
    pub created_at_ms: u64,
    pub updated_at_ms: u64,
}

impl SessionArtifact for ReportArtifact {
    const DIR: &'static str = "subagent-reports";

    fn updated_at_ms(&self) -> u64 {
        self.updated_at_ms
    }

    fn reparent(&mut self, deleted: &WorkspaceId, new_parent: &WorkspaceId) {
        self.parent_workspace_id = new_parent.clone();
        reparent_chain(&mut self.ancestor_workspace_ids, deleted, new_parent);
    }
}

/// State of an asynchronously generated patch artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchStatus {
    Pending,
    Ready,
    Failed,
}

/// A git-format-patch artifact for a child task's changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchArtifact {
    pub child_task_id: TaskId,
    pub parent_workspace_id: WorkspaceId,
    pub ancestor_workspace_ids: Vec<WorkspaceId>,
    pub status: PatchStatus,
    pub mbox_path: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at_ms: u64,
    pub updated_at_ms: u64,
}

impl SessionArtifact for PatchArtifact {
    const DIR: &'static str = "subagent-patches";

    fn updated_at_ms(&self) -> u64 {
        self.updated_at_ms
    }

    fn reparent(&mut self, deleted: &WorkspaceId, new_parent: &WorkspaceId) {
        self.parent_workspace_id = new_parent.clone();
        reparent_chain(&mut self.ancestor_workspace_ids, deleted, new_parent);
    }
}

/// Archived chat transcript of a cleaned-up child task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptArtifact {
    pub child_task_id: TaskId,
    pub parent_workspace_id: WorkspaceId,
    pub ancestor_workspace_ids: Vec<WorkspaceId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partial_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thinking_level: Option<ThinkingLevel>,
    pub created_at_ms: u64,
    pub updated_at_ms: u64,
}

impl SessionArtifact for TranscriptArtifact {
    const DIR: &'static str = "subagent-transcripts";

    fn updated_at_ms(&self) -> u64 {
        self.updated_at_ms
    }

    fn reparent(&mut self, deleted: &WorkspaceId, new_parent: &WorkspaceId) {
        self.parent_workspace_id = new_parent.clone();
        reparent_chain(&mut self.ancestor_workspace_ids, deleted, new_parent);
    }
}

/// The `index.json` of one artifact kind within a session directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", bound = "T: Serialize + DeserializeOwned")]
pub struct ArtifactIndex<T> {
    #[serde(default = "BTreeMap::new")]
    pub artifacts_by_child_task_id: BTreeMap<TaskId, T>,
}

impl<T> Default for ArtifactIndex<T> {
    fn default() -> Self {
        Self { artifacts_by_child_task_id: BTreeMap::new() }
    }
}

impl<T: SessionArtifact> ArtifactIndex<T> {
    /// Merge `entry` in, retaining whichever side has the larger
    /// `updated_at_ms` (ties prefer the incoming entry).
    pub fn merge(&mut self, child: TaskId, entry: T) {
        match self.artifacts_by_child_task_id.get(&child) {
            Some(existing) if existing.updated_at_ms() > entry.updated_at_ms() => {}
            _ => {
                self.artifacts_by_child_task_id.insert(child, entry);
            }
        }
    }
}

#[cfg(test)]
#[path = "artifact_tests.rs"]
mod tests;
