// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn entry(md: &str, ancestors: &[&str]) -> CachedReport {
    CachedReport {
        report_markdown: md.to_string(),
        title: None,
        ancestor_workspace_ids: ancestors.iter().map(|a| WorkspaceId::new(*a)).collect(),
    }
}

#[test]
fn get_returns_inserted_report() {
    let cache = ReportCache::new(4);
    cache.insert(TaskId::new("t1"), entry("done", &["p", "root"]));
    let cached = cache.get(&TaskId::new("t1")).unwrap();
    assert_eq!(cached.report().report_markdown, "done");
    assert!(cache.get(&TaskId::new("t2")).is_none());
}

#[test]
fn overflow_evicts_oldest_inserted() {
    let cache = ReportCache::new(2);
    cache.insert(TaskId::new("t1"), entry("one", &[]));
    cache.insert(TaskId::new("t2"), entry("two", &[]));
    cache.insert(TaskId::new("t3"), entry("three", &[]));

    assert_eq!(cache.len(), 2);
    assert!(cache.get(&TaskId::new("t1")).is_none());
    assert!(cache.get(&TaskId::new("t2")).is_some());
    assert!(cache.get(&TaskId::new("t3")).is_some());
}

#[test]
fn reinsert_updates_in_place() {
    let cache = ReportCache::new(2);
    cache.insert(TaskId::new("t1"), entry("v1", &[]));
    cache.insert(TaskId::new("t1"), entry("v2", &[]));
    assert_eq!(cache.len(), 1);
    assert_eq!(cache.get(&TaskId::new("t1")).unwrap().report_markdown, "v2");
}

#[test]
fn drop_workspace_rewrites_ancestor_chains() {
    let cache = ReportCache::new(4);
    cache.insert(TaskId::new("t1"), entry("r", &["mid", "top", "root"]));
    cache.insert(TaskId::new("t2"), entry("r", &["other"]));

    cache.drop_workspace(&WorkspaceId::new("mid"), &WorkspaceId::new("top"));

    assert_eq!(
        cache.get(&TaskId::new("t1")).unwrap().ancestor_workspace_ids,
        vec![WorkspaceId::new("top"), WorkspaceId::new("root")]
    );
    // Untouched entries keep their chains.
    assert_eq!(
        cache.get(&TaskId::new("t2")).unwrap().ancestor_workspace_ids,
        vec![WorkspaceId::new("other")]
    );
}

#[test]
fn zero_capacity_is_clamped_to_one() {
    let cache = ReportCache::new(0);
    cache.insert(TaskId::new("t1"), entry("r", &[]));
    assert_eq!(cache.len(), 1);
}
