// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The persisted multi-project workspace table.
//!
//! This is the authoritative source for the task tree. The engine rebuilds
//! its in-memory index from a snapshot of this table at every public
//! operation boundary.

use crate::id::WorkspaceId;
use crate::task::{TaskEntry, WorkspaceRecord};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// All workspaces across all projects, keyed by workspace id.
    #[serde(default)]
    pub workspaces: BTreeMap<WorkspaceId, WorkspaceRecord>,
}

impl Config {
    pub fn workspace(&self, id: &WorkspaceId) -> Option<&WorkspaceRecord> {
        self.workspaces.get(id)
    }

    pub fn workspace_mut(&mut self, id: &WorkspaceId) -> Option<&mut WorkspaceRecord> {
        self.workspaces.get_mut(id)
    }

    pub fn insert(&mut self, record: WorkspaceRecord) {
        self.workspaces.insert(record.id.clone(), record);
    }

    pub fn remove(&mut self, id: &WorkspaceId) -> Option<WorkspaceRecord> {
        self.workspaces.remove(id)
    }

    pub fn contains(&self, id: &WorkspaceId) -> bool {
        self.workspaces.contains_key(id)
    }

    /// All workspaces that are agent tasks, as index-facing entries.
    pub fn task_entries(&self) -> impl Iterator<Item = TaskEntry> + '_ {
        self.workspaces.values().filter_map(|r| TaskEntry::from_record(r.clone()))
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
