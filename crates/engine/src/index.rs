// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory projection of the persisted config into the task tree.
//!
//! Rebuilt from an authoritative config snapshot at every public operation
//! boundary; there is no incremental maintenance. Walks are bounded at
//! [`MAX_TASK_DEPTH`] and treat overflow (a cycle, in practice) as fatal.

use crate::error::EngineError;
use mux_core::{Config, TaskEntry, TaskId, TaskStatus, WorkspaceId};
use std::collections::HashMap;

/// Hard cap on parent-chain depth. Exceeding it is a tree-corruption error.
pub const MAX_TASK_DEPTH: usize = 32;

pub struct TaskIndex {
    entries: HashMap<TaskId, TaskEntry>,
    children: HashMap<WorkspaceId, Vec<TaskId>>,
}

impl TaskIndex {
    pub fn build(config: &Config) -> Self {
        let mut entries = HashMap::new();
        let mut children: HashMap<WorkspaceId, Vec<TaskId>> = HashMap::new();
        for entry in config.task_entries() {
            children.entry(entry.parent_workspace_id().clone()).or_default().push(entry.id());
            entries.insert(entry.id(), entry);
        }
        // Deterministic child order: createdAt ascending, taskId tie-break.
        for ids in children.values_mut() {
            ids.sort_by(|a, b| {
                let ka = entries.get(a).map(|e| e.created_at()).unwrap_or_default();
                let kb = entries.get(b).map(|e| e.created_at()).unwrap_or_default();
                ka.cmp(kb).then_with(|| a.cmp(b))
            });
        }
        Self { entries, children }
    }

    pub fn entry(&self, id: &TaskId) -> Option<&TaskEntry> {
        self.entries.get(id)
    }

    pub fn tasks(&self) -> impl Iterator<Item = &TaskEntry> {
        self.entries.values()
    }

    pub fn children_of(&self, id: &WorkspaceId) -> &[TaskId] {
        self.children.get(id).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn parent_of(&self, id: &TaskId) -> Option<&WorkspaceId> {
        self.entries.get(id).map(|e| e.parent_workspace_id())
    }

    /// Ancestor workspace ids from the direct parent up to (and including)
    /// the first non-task root. Bounded; fails on cycles.
    pub fn ancestors_of(&self, id: &TaskId) -> Result<Vec<WorkspaceId>, EngineError> {
        let mut ancestors = Vec::new();
        let mut current = self
            .entries
            .get(id)
            .ok_or_else(|| EngineError::TaskNotFound(id.clone()))?
            .parent_workspace_id()
            .clone();
        for _ in 0..MAX_TASK_DEPTH {
            let parent_entry = self.entries.get(&current.as_task());
            ancestors.push(current.clone());
            match parent_entry {
                Some(entry) => current = entry.parent_workspace_id().clone(),
                None => return Ok(ancestors),
            }
        }
        Err(EngineError::TreeCorrupted(format!(
            "ancestor walk from {id} exceeded {MAX_TASK_DEPTH} levels"
        )))
    }

    /// Number of task links between this task and its non-task root.
    pub fn depth_of(&self, id: &TaskId) -> Result<usize, EngineError> {
        Ok(self.ancestors_of(id)?.len())
    }

    /// Depth of an arbitrary workspace: 0 for roots, task depth otherwise.
    pub fn depth_of_workspace(&self, id: &WorkspaceId) -> Result<usize, EngineError> {
        if self.entries.contains_key(&id.as_task()) {
            self.depth_of(&id.as_task())
        } else {
            Ok(0)
        }
    }

    /// All transitive descendant tasks of a workspace, preorder DFS.
    pub fn descendants_of(&self, id: &WorkspaceId) -> Vec<TaskId> {
        let mut out = Vec::new();
        let mut stack: Vec<TaskId> = self.children_of(id).iter().rev().cloned().collect();
        while let Some(task) = stack.pop() {
            if out.contains(&task) {
                // Cycle guard; ancestor walks report the corruption.
                continue;
            }
            stack.extend(self.children_of(&task.workspace()).iter().rev().cloned());
            out.push(task);
        }
        out
    }

    /// Descendants that still hold a place in the active set.
    pub fn active_descendants(&self, id: &WorkspaceId) -> Vec<TaskId> {
        self.descendants_of(id)
            .into_iter()
            .filter(|t| self.entries.get(t).is_some_and(|e| e.status().is_active()))
            .collect()
    }

    /// Queued tasks in deterministic drain order: createdAt ascending,
    /// taskId tie-break.
    pub fn queued_in_order(&self) -> Vec<TaskId> {
        let mut queued: Vec<&TaskEntry> =
            self.entries.values().filter(|e| e.status() == TaskStatus::Queued).collect();
        queued.sort_by(|a, b| {
            a.created_at().cmp(b.created_at()).then_with(|| a.id().cmp(&b.id()))
        });
        queued.into_iter().map(|e| e.id()).collect()
    }
}

#[cfg(test)]
#[path = "index_tests.rs"]
mod tests;
