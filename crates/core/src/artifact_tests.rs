// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn report(child: &str, updated: u64) -> ReportArtifact {
    ReportArtifact {
        child_task_id: TaskId::new(child),
        parent_workspace_id: WorkspaceId::new("mid"),
        ancestor_workspace_ids: vec![
            WorkspaceId::new("mid"),
            WorkspaceId::new("top"),
            WorkspaceId::new("root"),
        ],
        report_markdown: "done".into(),
        title: None,
        model: None,
        thinking_level: None,
        created_at_ms: 1,
        updated_at_ms: updated,
    }
}

#[test]
fn index_serde_uses_artifacts_by_child_task_id_key() {
    let mut index = ArtifactIndex::default();
    index.merge(TaskId::new("c1"), report("c1", 5));
    let value = serde_json::to_value(&index).unwrap();
    assert_eq!(value["artifactsByChildTaskId"]["c1"]["reportMarkdown"], "done");

    let back: ArtifactIndex<ReportArtifact> = serde_json::from_value(value).unwrap();
    assert_eq!(back, index);
}

#[test]
fn merge_retains_larger_updated_at() {
    let mut index = ArtifactIndex::default();
    index.merge(TaskId::new("c1"), report("c1", 10));
    index.merge(TaskId::new("c1"), report("c1", 5));
    assert_eq!(
        index.artifacts_by_child_task_id[&TaskId::new("c1")].updated_at_ms,
        10
    );

    index.merge(TaskId::new("c1"), report("c1", 20));
    assert_eq!(
        index.artifacts_by_child_task_id[&TaskId::new("c1")].updated_at_ms,
        20
    );
}

#[test]
fn merge_tie_prefers_incoming() {
    let mut index = ArtifactIndex::default();
    let mut old = report("c1", 10);
    old.report_markdown = "old".into();
    let mut new = report("c1", 10);
    new.report_markdown = "new".into();
    index.merge(TaskId::new("c1"), old);
    index.merge(TaskId::new("c1"), new);
    assert_eq!(index.artifacts_by_child_task_id[&TaskId::new("c1")].report_markdown, "new");
}

#[test]
fn reparent_drops_deleted_and_promotes_new_parent() {
    let mut artifact = report("c1", 1);
    artifact.reparent(&WorkspaceId::new("mid"), &WorkspaceId::new("top"));
    assert_eq!(artifact.parent_workspace_id, "top");
    assert_eq!(
        artifact.ancestor_workspace_ids,
        vec![WorkspaceId::new("top"), WorkspaceId::new("root")]
    );
}

#[test]
fn reparent_is_idempotent() {
    let mut artifact = report("c1", 1);
    artifact.reparent(&WorkspaceId::new("mid"), &WorkspaceId::new("top"));
    let once = artifact.clone();
    artifact.reparent(&WorkspaceId::new("mid"), &WorkspaceId::new("top"));
    assert_eq!(artifact, once);
}

#[test]
fn empty_index_deserializes_from_empty_object() {
    let index: ArtifactIndex<PatchArtifact> =
        serde_json::from_str("{\"artifactsByChildTaskId\": {}}").unwrap();
    assert!(index.artifacts_by_child_task_id.is_empty());
}
