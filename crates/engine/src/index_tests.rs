// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use mux_core::task::{TaskFields, WorkspaceRecord};

fn root(config: &mut Config, id: &str) {
    config.insert(WorkspaceRecord::root(
        WorkspaceId::new(id),
        "/proj".into(),
        id,
        format!("/proj/{id}").into(),
    ));
}

fn task(config: &mut Config, id: &str, parent: &str, created_at: &str, status: TaskStatus) {
    let mut fields = TaskFields::new(WorkspaceId::new(parent), "exec", created_at.to_string());
    fields.task_status = status;
    fields.task_prompt = matches!(status, TaskStatus::Queued).then(|| "p".to_string());
    config.insert(WorkspaceRecord {
        id: WorkspaceId::new(id),
        project_path: "/proj".into(),
        workspace_name: id.to_string(),
        workspace_path: format!("/proj/{id}").into(),
        runtime_config: Default::default(),
        task: Some(fields),
    });
}

fn sample() -> Config {
    let mut config = Config::default();
    root(&mut config, "root");
    task(&mut config, "t1", "root", "2026-01-01T00:00:01.000Z", TaskStatus::Running);
    task(&mut config, "t2", "root", "2026-01-01T00:00:02.000Z", TaskStatus::Queued);
    task(&mut config, "t1a", "t1", "2026-01-01T00:00:03.000Z", TaskStatus::Running);
    task(&mut config, "t1a-x", "t1a", "2026-01-01T00:00:04.000Z", TaskStatus::Reported);
    config
}

#[test]
fn children_are_ordered_by_created_at() {
    let index = TaskIndex::build(&sample());
    let children = index.children_of(&WorkspaceId::new("root"));
    assert_eq!(children, &[TaskId::new("t1"), TaskId::new("t2")]);
}

#[test]
fn ancestors_walk_to_the_root() {
    let index = TaskIndex::build(&sample());
    let ancestors = index.ancestors_of(&TaskId::new("t1a-x")).unwrap();
    assert_eq!(
        ancestors,
        vec![WorkspaceId::new("t1a"), WorkspaceId::new("t1"), WorkspaceId::new("root")]
    );
}

#[test]
fn depth_counts_task_links() {
    let index = TaskIndex::build(&sample());
    assert_eq!(index.depth_of(&TaskId::new("t1")).unwrap(), 1);
    assert_eq!(index.depth_of(&TaskId::new("t1a-x")).unwrap(), 3);
    assert_eq!(index.depth_of_workspace(&WorkspaceId::new("root")).unwrap(), 0);
    assert_eq!(index.depth_of_workspace(&WorkspaceId::new("t1a")).unwrap(), 2);
}

#[test]
fn cycle_is_a_tree_corruption_error() {
    let mut config = Config::default();
    task(&mut config, "a", "b", "2026-01-01T00:00:01.000Z", TaskStatus::Running);
    task(&mut config, "b", "a", "2026-01-01T00:00:02.000Z", TaskStatus::Running);
    let index = TaskIndex::build(&config);
    let err = index.ancestors_of(&TaskId::new("a")).unwrap_err();
    assert!(matches!(err, EngineError::TreeCorrupted(_)));
}

#[test]
fn descendants_are_preorder_and_cycle_safe() {
    let index = TaskIndex::build(&sample());
    let descendants = index.descendants_of(&WorkspaceId::new("root"));
    assert_eq!(
        descendants,
        vec![TaskId::new("t1"), TaskId::new("t1a"), TaskId::new("t1a-x"), TaskId::new("t2")]
    );
    assert_eq!(index.descendants_of(&WorkspaceId::new("t1a-x")), Vec::<TaskId>::new());
}

#[test]
fn active_descendants_exclude_reported() {
    let index = TaskIndex::build(&sample());
    let active = index.active_descendants(&WorkspaceId::new("root"));
    assert_eq!(active, vec![TaskId::new("t1"), TaskId::new("t1a"), TaskId::new("t2")]);
}

#[test]
fn queued_order_breaks_ties_by_task_id() {
    let mut config = Config::default();
    root(&mut config, "root");
    task(&mut config, "zz", "root", "2026-01-01T00:00:01.000Z", TaskStatus::Queued);
    task(&mut config, "aa", "root", "2026-01-01T00:00:01.000Z", TaskStatus::Queued);
    task(&mut config, "mm", "root", "2026-01-01T00:00:00.000Z", TaskStatus::Queued);
    let index = TaskIndex::build(&config);
    assert_eq!(
        index.queued_in_order(),
        vec![TaskId::new("mm"), TaskId::new("aa"), TaskId::new("zz")]
    );
}

#[test]
fn missing_task_errors_on_ancestor_walk() {
    let index = TaskIndex::build(&Config::default());
    assert!(matches!(
        index.ancestors_of(&TaskId::new("ghost")),
        Err(EngineError::TaskNotFound(_))
    ));
}
