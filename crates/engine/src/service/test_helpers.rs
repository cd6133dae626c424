// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for the service modules.

use super::{AgentTaskService, CreateTaskParams, CreatedTask, EngineConfig, ServiceDeps};
use crate::adapters::{FakeGateway, FakeHistory, FakeRuntime, FakeWorkspaces, StreamEndEvent,
    StreamEndMetadata};
use crate::config_store::ConfigStore;
use mux_core::{
    AgentCatalog, FakeClock, MessagePart, TaskId, TaskStatus, ToolState, WorkspaceId,
    WorkspaceRecord, TOOL_AGENT_REPORT, TOOL_PROPOSE_PLAN,
};
use serde_json::json;
use std::path::PathBuf;
use tempfile::tempdir;

pub(crate) type TestService =
    AgentTaskService<FakeRuntime, FakeWorkspaces, FakeGateway, FakeHistory, FakeClock>;

pub(crate) struct TestContext {
    pub service: TestService,
    pub runtime: FakeRuntime,
    pub workspaces: FakeWorkspaces,
    pub gateway: FakeGateway,
    pub history: FakeHistory,
    pub clock: FakeClock,
    pub state_dir: PathBuf,
    pub root: WorkspaceId,
}

pub(crate) fn setup() -> TestContext {
    setup_with(EngineConfig::default(), AgentCatalog::builtin())
}

pub(crate) fn setup_with(cfg: EngineConfig, agents: AgentCatalog) -> TestContext {
    let dir = tempdir().unwrap();
    let state_dir = dir.keep();

    let config_store = ConfigStore::load_or_default(&state_dir).unwrap();
    let root = WorkspaceId::new("root");
    config_store
        .edit(|cfg| {
            cfg.insert(WorkspaceRecord::root(
                WorkspaceId::new("root"),
                state_dir.clone(),
                "main",
                state_dir.join("main"),
            ))
        })
        .unwrap();
    std::fs::create_dir_all(state_dir.join("main")).unwrap();

    let runtime = FakeRuntime::new(&state_dir);
    let workspaces = FakeWorkspaces::default();
    let gateway = FakeGateway::default();
    let history = FakeHistory::default();
    let clock = FakeClock::new();

    let service = AgentTaskService::new(
        ServiceDeps {
            runtime: runtime.clone(),
            workspaces: workspaces.clone(),
            gateway: gateway.clone(),
            history: history.clone(),
        },
        config_store,
        clock.clone(),
        cfg,
        agents,
    );

    TestContext { service, runtime, workspaces, gateway, history, clock, state_dir, root }
}

impl TestContext {
    pub(crate) fn status_of(&self, task: &TaskId) -> Option<TaskStatus> {
        self.service.get_agent_task_status(task)
    }

    pub(crate) fn session_dir(&self, ws: &WorkspaceId) -> PathBuf {
        self.service.config_store().session_dir(ws)
    }

    /// Create a task under the root workspace, advancing the clock so
    /// creation order is reflected in `created_at`.
    pub(crate) async fn create_task(&self, agent: &str, prompt: &str) -> CreatedTask {
        self.create_child(&self.root.clone(), agent, prompt).await
    }

    pub(crate) async fn create_child(
        &self,
        parent: &WorkspaceId,
        agent: &str,
        prompt: &str,
    ) -> CreatedTask {
        self.clock.advance(std::time::Duration::from_millis(10));
        self.service
            .create(CreateTaskParams::new(parent.clone(), agent, prompt))
            .await
            .unwrap()
    }

    pub(crate) async fn end_stream(&self, ws: &WorkspaceId, parts: Vec<MessagePart>) {
        self.service
            .handle_stream_end(StreamEndEvent {
                workspace_id: ws.clone(),
                parts,
                metadata: StreamEndMetadata::default(),
            })
            .await;
    }

    pub(crate) async fn end_stream_with_report(&self, task: &TaskId, markdown: &str) {
        self.end_stream(&task.workspace(), report_parts(markdown, None)).await;
    }

    /// Let spawned background work (patch settle, deferred cleanup, init)
    /// run to completion.
    pub(crate) async fn settle(&self) {
        for _ in 0..20 {
            tokio::task::yield_now().await;
        }
    }
}

pub(crate) fn report_parts(markdown: &str, title: Option<&str>) -> Vec<MessagePart> {
    let mut input = json!({ "reportMarkdown": markdown });
    if let Some(title) = title {
        input["title"] = json!(title);
    }
    vec![
        MessagePart::text("wrapping up"),
        MessagePart::tool(TOOL_AGENT_REPORT, ToolState::InputAvailable, input)
            .with_output(json!({"success": true})),
    ]
}

pub(crate) fn plan_parts(plan_path: &str) -> Vec<MessagePart> {
    vec![MessagePart::tool(TOOL_PROPOSE_PLAN, ToolState::InputAvailable, json!({}))
        .with_output(json!({"success": true, "planPath": plan_path}))]
}
