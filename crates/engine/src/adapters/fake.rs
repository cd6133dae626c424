// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Call-recording fake collaborators for tests.

use super::gateway::StreamGateway;
use super::history::HistoryStore;
use super::runtime::{MaterializedWorkspace, RuntimeProvider};
use super::workspace::{SendOptions, WorkspaceAiInfo, WorkspaceService};
use super::AdapterError;
use async_trait::async_trait;
use mux_core::{ChatMessage, WorkspaceId, WorkspaceRecord};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Fake runtime provider. Workspaces are directories under a temp root.
#[derive(Clone, Default)]
pub struct FakeRuntime {
    inner: Arc<Mutex<FakeRuntimeInner>>,
}

#[derive(Default)]
struct FakeRuntimeInner {
    root: PathBuf,
    fail_fork: bool,
    fail_patch: bool,
    forked: Vec<String>,
    inited: Vec<WorkspaceId>,
    removed: Vec<WorkspaceId>,
    patches: HashMap<WorkspaceId, String>,
}

impl FakeRuntime {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let fake = Self::default();
        fake.inner.lock().root = root.into();
        fake
    }

    pub fn fail_fork(&self, fail: bool) {
        self.inner.lock().fail_fork = fail;
    }

    pub fn fail_patch(&self, fail: bool) {
        self.inner.lock().fail_patch = fail;
    }

    pub fn set_patch(&self, id: &WorkspaceId, mbox: &str) {
        self.inner.lock().patches.insert(id.clone(), mbox.to_string());
    }

    pub fn forked(&self) -> Vec<String> {
        self.inner.lock().forked.clone()
    }

    pub fn inited(&self) -> Vec<WorkspaceId> {
        self.inner.lock().inited.clone()
    }

    pub fn removed(&self) -> Vec<WorkspaceId> {
        self.inner.lock().removed.clone()
    }

    fn materialize(&self, name: &str) -> Result<MaterializedWorkspace, AdapterError> {
        let (root, fail) = {
            let inner = self.inner.lock();
            (inner.root.clone(), inner.fail_fork)
        };
        if fail {
            return Err(AdapterError::Failed("fork failed".into()));
        }
        let path = root.join("worktrees").join(name);
        std::fs::create_dir_all(&path)?;
        self.inner.lock().forked.push(name.to_string());
        Ok(MaterializedWorkspace {
            workspace_path: path,
            trunk_branch: Some("main".to_string()),
            base_commit_sha: Some("deadbeef00".to_string()),
        })
    }
}

#[async_trait]
impl RuntimeProvider for FakeRuntime {
    async fn fork_workspace(
        &self,
        _parent: &WorkspaceRecord,
        name: &str,
    ) -> Result<MaterializedWorkspace, AdapterError> {
        self.materialize(name)
    }

    async fn create_workspace(
        &self,
        _project_path: &Path,
        name: &str,
    ) -> Result<MaterializedWorkspace, AdapterError> {
        self.materialize(name)
    }

    async fn remove_workspace(&self, record: &WorkspaceRecord) -> Result<(), AdapterError> {
        if record.workspace_path.as_os_str().is_empty() {
            return Ok(());
        }
        let _ = std::fs::remove_dir_all(&record.workspace_path);
        self.inner.lock().removed.push(record.id.clone());
        Ok(())
    }

    async fn init_workspace(&self, record: &WorkspaceRecord) -> Result<(), AdapterError> {
        self.inner.lock().inited.push(record.id.clone());
        Ok(())
    }

    async fn export_patch(&self, record: &WorkspaceRecord) -> Result<String, AdapterError> {
        let inner = self.inner.lock();
        if inner.fail_patch {
            return Err(AdapterError::Failed("patch export failed".into()));
        }
        Ok(inner
            .patches
            .get(&record.id)
            .cloned()
            .unwrap_or_else(|| "From deadbeef00\n".to_string()))
    }
}

/// One recorded `send_message` call.
#[derive(Debug, Clone)]
pub struct SentMessage {
    pub workspace_id: WorkspaceId,
    pub text: String,
    pub opts: SendOptions,
}

/// Fake workspace service recording every chat-facing call.
#[derive(Clone, Default)]
pub struct FakeWorkspaces {
    inner: Arc<Mutex<FakeWorkspacesInner>>,
}

#[derive(Default)]
struct FakeWorkspacesInner {
    fail_send: bool,
    sent: Vec<SentMessage>,
    resumed: Vec<WorkspaceId>,
    metadata: Vec<(WorkspaceId, Option<WorkspaceRecord>)>,
    info: HashMap<WorkspaceId, WorkspaceAiInfo>,
    statuses: Vec<(WorkspaceId, Option<String>)>,
    replaced: Vec<(WorkspaceId, ChatMessage)>,
    tool_call_ends: Vec<(WorkspaceId, String)>,
}

impl FakeWorkspaces {
    pub fn fail_send(&self, fail: bool) {
        self.inner.lock().fail_send = fail;
    }

    pub fn set_info(&self, id: &WorkspaceId, info: WorkspaceAiInfo) {
        self.inner.lock().info.insert(id.clone(), info);
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.inner.lock().sent.clone()
    }

    pub fn sent_to(&self, id: &WorkspaceId) -> Vec<SentMessage> {
        self.inner.lock().sent.iter().filter(|m| &m.workspace_id == id).cloned().collect()
    }

    pub fn resumed(&self) -> Vec<WorkspaceId> {
        self.inner.lock().resumed.clone()
    }

    pub fn metadata_events(&self) -> Vec<(WorkspaceId, Option<WorkspaceRecord>)> {
        self.inner.lock().metadata.clone()
    }

    pub fn statuses(&self) -> Vec<(WorkspaceId, Option<String>)> {
        self.inner.lock().statuses.clone()
    }

    pub fn replaced_histories(&self) -> Vec<(WorkspaceId, ChatMessage)> {
        self.inner.lock().replaced.clone()
    }

    pub fn tool_call_ends(&self) -> Vec<(WorkspaceId, String)> {
        self.inner.lock().tool_call_ends.clone()
    }
}

#[async_trait]
impl WorkspaceService for FakeWorkspaces {
    async fn send_message(
        &self,
        id: &WorkspaceId,
        text: &str,
        opts: SendOptions,
    ) -> Result<(), AdapterError> {
        let mut inner = self.inner.lock();
        if inner.fail_send {
            return Err(AdapterError::Failed("send failed".into()));
        }
        inner.sent.push(SentMessage {
            workspace_id: id.clone(),
            text: text.to_string(),
            opts,
        });
        Ok(())
    }

    async fn resume_stream(&self, id: &WorkspaceId, _opts: SendOptions) -> Result<(), AdapterError> {
        let mut inner = self.inner.lock();
        if inner.fail_send {
            return Err(AdapterError::Failed("resume failed".into()));
        }
        inner.resumed.push(id.clone());
        Ok(())
    }

    fn emit_metadata(&self, id: &WorkspaceId, record: Option<&WorkspaceRecord>) {
        self.inner.lock().metadata.push((id.clone(), record.cloned()));
    }

    async fn get_info(&self, id: &WorkspaceId) -> Result<WorkspaceAiInfo, AdapterError> {
        Ok(self.inner.lock().info.get(id).cloned().unwrap_or_default())
    }

    async fn update_agent_status(&self, id: &WorkspaceId, status: Option<String>) {
        self.inner.lock().statuses.push((id.clone(), status));
    }

    async fn replace_history(
        &self,
        id: &WorkspaceId,
        summary: ChatMessage,
    ) -> Result<(), AdapterError> {
        self.inner.lock().replaced.push((id.clone(), summary));
        Ok(())
    }

    fn notify_tool_call_end(&self, id: &WorkspaceId, tool_call_id: &str) {
        self.inner.lock().tool_call_ends.push((id.clone(), tool_call_id.to_string()));
    }
}

/// Fake stream gateway with controllable streaming state and classifier.
#[derive(Clone, Default)]
pub struct FakeGateway {
    inner: Arc<Mutex<FakeGatewayInner>>,
}

#[derive(Default)]
struct FakeGatewayInner {
    streaming: HashSet<WorkspaceId>,
    stops: Vec<(WorkspaceId, bool)>,
    classify_result: Option<String>,
    fail_classify: bool,
    classify_calls: Vec<String>,
}

impl FakeGateway {
    pub fn set_streaming(&self, id: &WorkspaceId, streaming: bool) {
        let mut inner = self.inner.lock();
        if streaming {
            inner.streaming.insert(id.clone());
        } else {
            inner.streaming.remove(id);
        }
    }

    pub fn set_classify_result(&self, agent: &str) {
        self.inner.lock().classify_result = Some(agent.to_string());
    }

    pub fn fail_classify(&self, fail: bool) {
        self.inner.lock().fail_classify = fail;
    }

    pub fn stops(&self) -> Vec<(WorkspaceId, bool)> {
        self.inner.lock().stops.clone()
    }

    pub fn classify_calls(&self) -> Vec<String> {
        self.inner.lock().classify_calls.clone()
    }
}

#[async_trait]
impl StreamGateway for FakeGateway {
    fn is_streaming(&self, id: &WorkspaceId) -> bool {
        self.inner.lock().streaming.contains(id)
    }

    async fn stop_stream(
        &self,
        id: &WorkspaceId,
        abandon_partial: bool,
    ) -> Result<(), AdapterError> {
        let mut inner = self.inner.lock();
        inner.streaming.remove(id);
        inner.stops.push((id.clone(), abandon_partial));
        Ok(())
    }

    async fn classify_plan(&self, plan_markdown: &str) -> Result<String, AdapterError> {
        let mut inner = self.inner.lock();
        inner.classify_calls.push(plan_markdown.to_string());
        if inner.fail_classify {
            return Err(AdapterError::Failed("classifier unavailable".into()));
        }
        Ok(inner.classify_result.clone().unwrap_or_else(|| "exec".to_string()))
    }
}

/// In-memory history store.
#[derive(Clone, Default)]
pub struct FakeHistory {
    inner: Arc<Mutex<FakeHistoryInner>>,
}

#[derive(Default)]
struct FakeHistoryInner {
    messages: HashMap<WorkspaceId, Vec<ChatMessage>>,
    partials: HashMap<WorkspaceId, ChatMessage>,
}

impl FakeHistory {
    pub fn push(&self, id: &WorkspaceId, msg: ChatMessage) {
        self.inner.lock().messages.entry(id.clone()).or_default().push(msg);
    }

    pub fn set_partial(&self, id: &WorkspaceId, msg: ChatMessage) {
        self.inner.lock().partials.insert(id.clone(), msg);
    }

    pub fn clear_partial(&self, id: &WorkspaceId) {
        self.inner.lock().partials.remove(id);
    }

    pub fn messages(&self, id: &WorkspaceId) -> Vec<ChatMessage> {
        self.inner.lock().messages.get(id).cloned().unwrap_or_default()
    }

    pub fn partial(&self, id: &WorkspaceId) -> Option<ChatMessage> {
        self.inner.lock().partials.get(id).cloned()
    }
}

#[async_trait]
impl HistoryStore for FakeHistory {
    async fn last_messages(
        &self,
        id: &WorkspaceId,
        n: usize,
    ) -> Result<Vec<ChatMessage>, AdapterError> {
        let inner = self.inner.lock();
        let messages = inner.messages.get(id).cloned().unwrap_or_default();
        let skip = messages.len().saturating_sub(n);
        Ok(messages[skip..].to_vec())
    }

    async fn read_partial(&self, id: &WorkspaceId) -> Result<Option<ChatMessage>, AdapterError> {
        Ok(self.inner.lock().partials.get(id).cloned())
    }

    async fn write_partial(
        &self,
        id: &WorkspaceId,
        msg: &ChatMessage,
    ) -> Result<(), AdapterError> {
        self.inner.lock().partials.insert(id.clone(), msg.clone());
        Ok(())
    }

    async fn append(&self, id: &WorkspaceId, msg: &ChatMessage) -> Result<(), AdapterError> {
        self.inner.lock().messages.entry(id.clone()).or_default().push(msg.clone());
        Ok(())
    }
}
