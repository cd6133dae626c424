// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

fn entry(status: TaskStatus) -> WorkspaceRecord {
    let mut fields =
        TaskFields::new(WorkspaceId::new("parent"), "Exec", "2026-01-01T00:00:00.000Z".into());
    fields.task_status = status;
    fields.task_prompt =
        matches!(status, TaskStatus::Queued).then(|| "do the thing".to_string());
    WorkspaceRecord {
        id: WorkspaceId::new("task-1"),
        project_path: "/proj".into(),
        workspace_name: "exec-do-thing-abc".into(),
        workspace_path: "/proj/worktrees/exec-do-thing-abc".into(),
        runtime_config: RuntimeConfig::Worktree,
        task: Some(fields),
    }
}

#[parameterized(
    queued = { TaskStatus::Queued, true },
    running = { TaskStatus::Running, true },
    awaiting = { TaskStatus::AwaitingReport, true },
    reported = { TaskStatus::Reported, false },
    interrupted = { TaskStatus::Interrupted, false },
)]
fn active_statuses(status: TaskStatus, active: bool) {
    assert_eq!(status.is_active(), active);
}

#[test]
fn status_serializes_snake_case() {
    assert_eq!(
        serde_json::to_string(&TaskStatus::AwaitingReport).unwrap(),
        "\"awaiting_report\""
    );
    assert_eq!(TaskStatus::AwaitingReport.to_string(), "awaiting_report");
}

#[test]
fn record_round_trips_with_flattened_task_fields() {
    let record = entry(TaskStatus::Queued);
    let value = serde_json::to_value(&record).unwrap();
    // Task fields are flattened onto the workspace row.
    assert_eq!(value["parentWorkspaceId"], "parent");
    assert_eq!(value["taskStatus"], "queued");
    assert_eq!(value["taskPrompt"], "do the thing");
    assert_eq!(value["agentId"], "exec");
    assert_eq!(value["agentType"], "exec");
    assert_eq!(value["runtimeConfig"]["type"], "worktree");

    let back: WorkspaceRecord = serde_json::from_value(value).unwrap();
    assert_eq!(back, record);
}

#[test]
fn root_record_has_no_task_fields() {
    let root = WorkspaceRecord::root(
        WorkspaceId::new("root"),
        "/proj".into(),
        "main",
        "/proj".into(),
    );
    let value = serde_json::to_value(&root).unwrap();
    assert!(value.get("taskStatus").is_none());
    let back: WorkspaceRecord = serde_json::from_value(value).unwrap();
    assert!(!back.is_task());
}

#[test]
fn legacy_rows_fall_back_to_agent_type() {
    let mut fields =
        TaskFields::new(WorkspaceId::new("p"), "exec", "2026-01-01T00:00:00.000Z".into());
    fields.agent_id = String::new();
    fields.agent_type = Some("plan".to_string());
    assert_eq!(fields.effective_agent_id(), "plan");
}

#[test]
fn agent_id_is_normalized_at_construction() {
    let fields =
        TaskFields::new(WorkspaceId::new("p"), "  EXEC ", "2026-01-01T00:00:00.000Z".into());
    assert_eq!(fields.agent_id, "exec");
    assert_eq!(fields.agent_type.as_deref(), Some("exec"));
}

#[test]
fn task_entry_rejects_non_task_records() {
    let root = WorkspaceRecord::root(
        WorkspaceId::new("root"),
        "/proj".into(),
        "main",
        "/proj".into(),
    );
    assert!(TaskEntry::from_record(root).is_none());

    let task = TaskEntry::from_record(entry(TaskStatus::Running)).unwrap();
    assert_eq!(task.id(), "task-1");
    assert_eq!(task.parent_workspace_id(), "parent");
    assert_eq!(task.agent_id(), "exec");
}
