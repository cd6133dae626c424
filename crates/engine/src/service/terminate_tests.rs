// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::service::test_helpers::*;
use crate::service::*;
use crate::artifacts;
use crate::error::EngineError;
use mux_core::{AgentCatalog, AgentReport, TaskStatus, WorkspaceId};

#[tokio::test]
async fn terminate_subtree_removes_leaves_first() {
    let ctx = setup();
    let parent = ctx.create_task("exec", "parent").await;
    let child = ctx.create_child(&parent.task_id.workspace(), "exec", "child").await;
    let grand = ctx.create_child(&child.task_id.workspace(), "exec", "grand").await;

    let terminated = ctx
        .service
        .terminate_descendant_agent_task(&ctx.root, &parent.task_id)
        .await
        .unwrap();

    assert_eq!(
        terminated,
        vec![grand.task_id.clone(), child.task_id.clone(), parent.task_id.clone()]
    );
    for task in &terminated {
        assert_eq!(ctx.status_of(task), None);
    }
    // Streams stopped with abandoned partials, deepest first.
    let stops = ctx.gateway.stops();
    assert_eq!(stops.len(), 3);
    assert!(stops.iter().all(|(_, abandon)| *abandon));
    assert_eq!(stops[0].0, grand.task_id.workspace());
}

#[tokio::test]
async fn terminate_validates_descendancy() {
    let ctx = setup();
    let task = ctx.create_task("exec", "work").await;

    let err = ctx
        .service
        .terminate_descendant_agent_task(&WorkspaceId::new("other-root"), &task.task_id)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::NotADescendant { .. }));

    let err = ctx
        .service
        .terminate_descendant_agent_task(&ctx.root, &mux_core::TaskId::new("ghost"))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::TaskNotFound(_)));
}

#[tokio::test]
async fn terminate_rejects_waiters_with_task_terminated() {
    let ctx = setup();
    let task = ctx.create_task("exec", "work").await;

    let service = ctx.service.clone();
    let task_id = task.task_id.clone();
    let waiter = tokio::spawn(async move {
        service.wait_for_agent_report(WaitParams::new(task_id)).await
    });
    ctx.settle().await;

    ctx.service.terminate_descendant_agent_task(&ctx.root, &task.task_id).await.unwrap();

    let err = waiter.await.unwrap().unwrap_err();
    assert_eq!(err.to_string(), "Task terminated");
}

#[tokio::test]
async fn cascade_rejects_with_parent_interrupted() {
    let mut cfg = EngineConfig::default();
    cfg.max_parallel_agent_tasks = 1;
    let ctx = setup_with(cfg, AgentCatalog::builtin());

    let running = ctx.create_task("exec", "running task").await;
    let queued = ctx.create_task("exec", "queued task").await;
    assert_eq!(running.status, TaskStatus::Running);
    assert_eq!(queued.status, TaskStatus::Queued);

    let service = ctx.service.clone();
    let task_id = running.task_id.clone();
    let waiter = tokio::spawn(async move {
        service.wait_for_agent_report(WaitParams::new(task_id)).await
    });
    ctx.settle().await;

    let terminated = ctx.service.terminate_all_descendant_agent_tasks(&ctx.root).await.unwrap();
    assert_eq!(terminated.len(), 2);
    assert_eq!(ctx.status_of(&running.task_id), None);
    assert_eq!(ctx.status_of(&queued.task_id), None);

    let err = waiter.await.unwrap().unwrap_err();
    assert_eq!(err.to_string(), "Parent workspace interrupted");
}

#[tokio::test]
async fn terminate_frees_capacity_for_queued_work() {
    let mut cfg = EngineConfig::default();
    cfg.max_parallel_agent_tasks = 1;
    let ctx = setup_with(cfg, AgentCatalog::builtin());

    let first = ctx.create_task("exec", "first").await;
    let second = ctx.create_task("exec", "second").await;
    assert_eq!(second.status, TaskStatus::Queued);

    ctx.service.terminate_descendant_agent_task(&ctx.root, &first.task_id).await.unwrap();
    ctx.settle().await;

    assert_eq!(ctx.status_of(&second.task_id), Some(TaskStatus::Running));
}

#[tokio::test]
async fn cleanup_requires_structural_leaf() {
    let ctx = setup();
    let parent = ctx.create_task("exec", "parent").await;
    let child = ctx.create_child(&parent.task_id.workspace(), "exec", "child").await;

    // Parent reports while its child is still alive (finalize directly).
    ctx.service
        .finalize_report(
            &parent.task_id,
            AgentReport { report_markdown: "done".into(), title: None },
        )
        .await
        .unwrap();
    ctx.settle().await;

    // Not a structural leaf: cleanup must leave it in place.
    assert_eq!(ctx.status_of(&parent.task_id), Some(TaskStatus::Reported));

    // Child reports and is cleaned; the parent chain follows.
    ctx.end_stream_with_report(&child.task_id, "child done").await;
    ctx.settle().await;
    assert_eq!(ctx.status_of(&child.task_id), None);
    assert_eq!(ctx.status_of(&parent.task_id), None);
}

#[tokio::test]
async fn cleanup_rolls_grandchild_artifacts_up_to_root() {
    let ctx = setup();
    let parent = ctx.create_task("exec", "parent").await;
    let child = ctx.create_child(&parent.task_id.workspace(), "exec", "child").await;

    // Child reports first; its report lands in parent and root sessions.
    ctx.end_stream_with_report(&child.task_id, "child done").await;
    ctx.settle().await;
    assert_eq!(ctx.status_of(&child.task_id), None);

    // Parent reports and is cleaned; its session artifacts (the child's
    // patch record among them) must survive in the root session.
    ctx.end_stream_with_report(&parent.task_id, "parent done").await;
    ctx.settle().await;
    assert_eq!(ctx.status_of(&parent.task_id), None);

    let root_session = ctx.session_dir(&ctx.root);
    let report = artifacts::read_report(&root_session, &child.task_id).unwrap().unwrap();
    assert_eq!(report.report_markdown, "child done");
    // Rewritten ownership: the root adopted the rolled-up artifact.
    assert_eq!(report.parent_workspace_id, ctx.root);
    assert_eq!(report.ancestor_workspace_ids[0], ctx.root);

    let patch = artifacts::patch_of(&root_session, &child.task_id).unwrap().unwrap();
    assert_eq!(patch.parent_workspace_id, ctx.root);

    // The parent's transcript was archived into the root session.
    let transcripts =
        artifacts::read_index::<mux_core::TranscriptArtifact>(&root_session).unwrap();
    assert!(transcripts.artifacts_by_child_task_id.contains_key(&parent.task_id));
}

#[tokio::test]
async fn cleanup_defers_while_patch_is_pending() {
    let ctx = setup();
    let task = ctx.create_task("exec", "work").await;
    let ws = task.task_id.workspace();

    // Finalize while streaming so the immediate cleanup is blocked, then
    // rewrite the patch record to pending to simulate an unsettled patch.
    ctx.gateway.set_streaming(&ws, true);
    ctx.service
        .finalize_report(&task.task_id, AgentReport { report_markdown: "done".into(), title: None })
        .await
        .unwrap();
    ctx.settle().await;
    ctx.gateway.set_streaming(&ws, false);

    let session = ctx.session_dir(&ctx.root);
    let mut patch = artifacts::patch_of(&session, &task.task_id).unwrap().unwrap();
    patch.status = mux_core::PatchStatus::Pending;
    artifacts::record_patch(&session, &patch).unwrap();

    ctx.end_stream(&ws, vec![]).await;
    ctx.settle().await;
    assert_eq!(ctx.status_of(&task.task_id), Some(TaskStatus::Reported));

    // Patch settles; the next trigger removes the task.
    patch.status = mux_core::PatchStatus::Ready;
    artifacts::record_patch(&session, &patch).unwrap();
    ctx.end_stream(&ws, vec![]).await;
    ctx.settle().await;
    assert_eq!(ctx.status_of(&task.task_id), None);
}
