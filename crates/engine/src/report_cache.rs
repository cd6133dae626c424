// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded in-memory cache of recently completed reports.
//!
//! Hot-path fast return for `waitForReport`. Insertion order is retained;
//! when the cache overflows, the oldest-inserted entry is evicted. Disk
//! remains the source of truth.

use indexmap::IndexMap;
use mux_core::artifact::reparent_chain;
use mux_core::{AgentReport, TaskId, WorkspaceId};
use parking_lot::Mutex;

/// A completed report plus the ancestor chain it was persisted into.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedReport {
    pub report_markdown: String,
    pub title: Option<String>,
    pub ancestor_workspace_ids: Vec<WorkspaceId>,
}

impl CachedReport {
    pub fn report(&self) -> AgentReport {
        AgentReport { report_markdown: self.report_markdown.clone(), title: self.title.clone() }
    }
}

pub struct ReportCache {
    capacity: usize,
    entries: Mutex<IndexMap<TaskId, CachedReport>>,
}

impl ReportCache {
    pub fn new(capacity: usize) -> Self {
        Self { capacity: capacity.max(1), entries: Mutex::new(IndexMap::new()) }
    }

    pub fn insert(&self, task: TaskId, entry: CachedReport) {
        let mut entries = self.entries.lock();
        entries.insert(task, entry);
        while entries.len() > self.capacity {
            entries.shift_remove_index(0);
        }
    }

    pub fn get(&self, task: &TaskId) -> Option<CachedReport> {
        self.entries.lock().get(task).cloned()
    }

    /// Rewrite cached ancestor chains after an intermediate workspace was
    /// cleaned up, keeping descendant-scope queries correct.
    pub fn drop_workspace(&self, deleted: &WorkspaceId, new_parent: &WorkspaceId) {
        let mut entries = self.entries.lock();
        for entry in entries.values_mut() {
            if entry.ancestor_workspace_ids.iter().any(|id| id == deleted) {
                reparent_chain(&mut entry.ancestor_workspace_ids, deleted, new_parent);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

#[cfg(test)]
#[path = "report_cache_tests.rs"]
mod tests;
