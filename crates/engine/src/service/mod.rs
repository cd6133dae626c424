// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The agent task service façade.
//!
//! Public operations: `create`, `terminate_descendant_agent_task`,
//! `terminate_all_descendant_agent_tasks`, `wait_for_agent_report`,
//! `get_agent_task_status`, `list_descendant_agent_tasks`,
//! `is_descendant_agent_task`, `handle_stream_end`, `initialize`.
//!
//! Concurrency: one service-wide async mutex serializes create, terminate,
//! queue drain, and finalize (held across IO); a keyed per-workspace mutex
//! serializes stream-end handling so finalization, demotion, and cleanup
//! never interleave for the same workspace. Sticky per-workspace flags
//! (interrupt, auto-resume counter, handoff, reminded) are process-local
//! and reset on restart.

mod create;
mod finalize;
mod handoff;
mod query;
mod recovery;
mod scheduler;
mod stream_end;
mod terminate;
mod wait;

#[cfg(test)]
pub(crate) mod test_helpers;

use crate::adapters::{
    HistoryStore, RuntimeProvider, StreamGateway, WorkspaceAiInfo, WorkspaceService,
};
use crate::config_store::ConfigStore;
use crate::index::{TaskIndex, MAX_TASK_DEPTH};
use crate::lockmap::KeyedMutex;
use crate::report_cache::ReportCache;
use crate::waiters::WaiterRegistry;
use mux_core::agent::{normalize_agent_id, ThinkingLevel, AGENT_EXEC};
use mux_core::{AgentCatalog, Clock, Config, Role, TaskId, TaskStatus, WorkspaceId, WorkspaceRecord};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub use crate::adapters::{SendOptions, StreamEndEvent, StreamEndMetadata, ToolPolicy};

/// Routing policy for plan auto-handoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlanRouting {
    Exec,
    Orchestrator,
    #[default]
    Auto,
}

/// Engine tunables.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub max_parallel_agent_tasks: usize,
    /// Clamped to the hard cap of 32 at construction.
    pub max_task_nesting_depth: usize,
    /// Report timeout measured from the moment a task starts running.
    pub report_timeout: Duration,
    pub report_cache_capacity: usize,
    pub max_consecutive_auto_resumes: u32,
    pub plan_handoff_target: PlanRouting,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_parallel_agent_tasks: 3,
            max_task_nesting_depth: MAX_TASK_DEPTH,
            report_timeout: Duration::from_secs(600),
            report_cache_capacity: 128,
            max_consecutive_auto_resumes: 3,
            plan_handoff_target: PlanRouting::Auto,
        }
    }
}

/// Kind of spawned child. Only agent tasks exist today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TaskKind {
    #[default]
    Agent,
}

#[derive(Debug, Clone)]
pub struct CreateTaskParams {
    pub parent_workspace_id: WorkspaceId,
    pub agent_id: Option<String>,
    /// Legacy alias accepted when `agent_id` is absent.
    pub agent_type: Option<String>,
    pub prompt: String,
    pub title: Option<String>,
    pub model_string: Option<String>,
    pub thinking_level: Option<ThinkingLevel>,
    pub experiments: Option<Value>,
}

impl CreateTaskParams {
    pub fn new(parent: WorkspaceId, agent_id: &str, prompt: &str) -> Self {
        Self {
            parent_workspace_id: parent,
            agent_id: Some(agent_id.to_string()),
            agent_type: None,
            prompt: prompt.to_string(),
            title: None,
            model_string: None,
            thinking_level: None,
            experiments: None,
        }
    }

    pub fn with_title(mut self, title: &str) -> Self {
        self.title = Some(title.to_string());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedTask {
    pub task_id: TaskId,
    pub kind: TaskKind,
    pub status: TaskStatus,
}

/// One row of `list_descendant_agent_tasks`.
#[derive(Debug, Clone, PartialEq)]
pub struct DescendantTask {
    pub task_id: TaskId,
    pub status: TaskStatus,
    pub parent_workspace_id: WorkspaceId,
    pub agent_type: String,
    pub workspace_name: String,
    pub title: Option<String>,
    pub created_at: String,
    pub model_string: Option<String>,
    pub thinking_level: Option<ThinkingLevel>,
    pub depth: usize,
}

#[derive(Debug, Clone)]
pub struct WaitParams {
    pub task_id: TaskId,
    /// Defaults to the engine's report timeout.
    pub timeout: Option<Duration>,
    pub abort: Option<CancellationToken>,
    /// Workspace performing a foreground await; excluded from parallelism
    /// accounting for the duration of the wait.
    pub requesting_workspace_id: Option<WorkspaceId>,
}

impl WaitParams {
    pub fn new(task_id: TaskId) -> Self {
        Self { task_id, timeout: None, abort: None, requesting_workspace_id: None }
    }
}

/// Adapter dependencies of the service.
pub struct ServiceDeps<R, W, G, H> {
    pub runtime: R,
    pub workspaces: W,
    pub gateway: G,
    pub history: H,
}

struct Inner<R, W, G, H, C: Clock> {
    deps: ServiceDeps<R, W, G, H>,
    config_store: ConfigStore,
    clock: C,
    cfg: EngineConfig,
    agents: AgentCatalog,
    /// Serializes create/terminate/drain/finalize; held across IO awaits.
    service_lock: tokio::sync::Mutex<()>,
    /// Serializes stream-end handling per workspace.
    stream_locks: KeyedMutex,
    waiters: WaiterRegistry,
    report_cache: ReportCache,
    foreground_awaits: Mutex<HashMap<WorkspaceId, u32>>,
    interrupted_parents: Mutex<HashSet<WorkspaceId>>,
    consecutive_auto_resumes: Mutex<HashMap<WorkspaceId, u32>>,
    handoffs_in_progress: Mutex<HashSet<TaskId>>,
    reminded_awaiting_report: Mutex<HashSet<TaskId>>,
}

/// The engine façade. Cheap to clone; all clones share state.
pub struct AgentTaskService<R, W, G, H, C: Clock> {
    inner: Arc<Inner<R, W, G, H, C>>,
}

impl<R, W, G, H, C: Clock> Clone for AgentTaskService<R, W, G, H, C> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl<R, W, G, H, C> AgentTaskService<R, W, G, H, C>
where
    R: RuntimeProvider,
    W: WorkspaceService,
    G: StreamGateway,
    H: HistoryStore,
    C: Clock,
{
    pub fn new(
        deps: ServiceDeps<R, W, G, H>,
        config_store: ConfigStore,
        clock: C,
        mut cfg: EngineConfig,
        agents: AgentCatalog,
    ) -> Self {
        cfg.max_task_nesting_depth = cfg.max_task_nesting_depth.min(MAX_TASK_DEPTH);
        let report_cache = ReportCache::new(cfg.report_cache_capacity);
        Self {
            inner: Arc::new(Inner {
                deps,
                config_store,
                clock,
                cfg,
                agents,
                service_lock: tokio::sync::Mutex::new(()),
                stream_locks: KeyedMutex::new(),
                waiters: WaiterRegistry::new(),
                report_cache,
                foreground_awaits: Mutex::new(HashMap::new()),
                interrupted_parents: Mutex::new(HashSet::new()),
                consecutive_auto_resumes: Mutex::new(HashMap::new()),
                handoffs_in_progress: Mutex::new(HashSet::new()),
                reminded_awaiting_report: Mutex::new(HashSet::new()),
            }),
        }
    }

    pub fn config_store(&self) -> &ConfigStore {
        &self.inner.config_store
    }

    pub(crate) fn deps(&self) -> &ServiceDeps<R, W, G, H> {
        &self.inner.deps
    }

    pub(crate) fn clock(&self) -> &C {
        &self.inner.clock
    }

    pub(crate) fn cfg(&self) -> &EngineConfig {
        &self.inner.cfg
    }

    pub(crate) fn agents(&self) -> &AgentCatalog {
        &self.inner.agents
    }

    pub(crate) fn waiters(&self) -> &WaiterRegistry {
        &self.inner.waiters
    }

    pub(crate) fn report_cache(&self) -> &ReportCache {
        &self.inner.report_cache
    }

    pub(crate) fn service_lock(&self) -> &tokio::sync::Mutex<()> {
        &self.inner.service_lock
    }

    pub(crate) fn stream_locks(&self) -> &KeyedMutex {
        &self.inner.stream_locks
    }

    /// A user sent a real (non-synthetic) message to this workspace: clear
    /// the sticky hard-interrupt flag and reset the auto-resume counter.
    pub fn note_user_message(&self, id: &WorkspaceId) {
        self.inner.interrupted_parents.lock().remove(id);
        self.inner.consecutive_auto_resumes.lock().remove(id);
    }

    pub(crate) fn is_interrupted(&self, id: &WorkspaceId) -> bool {
        self.inner.interrupted_parents.lock().contains(id)
    }

    pub(crate) fn mark_interrupted(&self, id: &WorkspaceId) {
        self.inner.interrupted_parents.lock().insert(id.clone());
    }

    pub(crate) fn foreground_count(&self, id: &WorkspaceId) -> u32 {
        self.inner.foreground_awaits.lock().get(id).copied().unwrap_or(0)
    }

    pub(crate) fn foreground_enter(&self, id: &WorkspaceId) {
        *self.inner.foreground_awaits.lock().entry(id.clone()).or_insert(0) += 1;
    }

    pub(crate) fn foreground_exit(&self, id: &WorkspaceId) {
        let mut counts = self.inner.foreground_awaits.lock();
        if let Some(count) = counts.get_mut(id) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                counts.remove(id);
            }
        }
    }

    pub(crate) fn mark_reminded(&self, id: &TaskId) {
        self.inner.reminded_awaiting_report.lock().insert(id.clone());
    }

    pub(crate) fn was_reminded(&self, id: &TaskId) -> bool {
        self.inner.reminded_awaiting_report.lock().contains(id)
    }

    pub(crate) fn forget_task_flags(&self, id: &TaskId) {
        self.inner.reminded_awaiting_report.lock().remove(id);
        self.inner.handoffs_in_progress.lock().remove(id);
        let ws = id.workspace();
        self.inner.interrupted_parents.lock().remove(&ws);
        self.inner.consecutive_auto_resumes.lock().remove(&ws);
        self.inner.foreground_awaits.lock().remove(&ws);
    }

    pub(crate) fn handoff_begin(&self, id: &TaskId) -> bool {
        self.inner.handoffs_in_progress.lock().insert(id.clone())
    }

    pub(crate) fn handoff_end(&self, id: &TaskId) {
        self.inner.handoffs_in_progress.lock().remove(id);
    }

    /// Take one auto-resume credit for a workspace. Returns `false` once the
    /// flood cap is reached; credits reset on the next real user message.
    pub(crate) fn take_auto_resume_credit(&self, id: &WorkspaceId) -> bool {
        let mut counters = self.inner.consecutive_auto_resumes.lock();
        let count = counters.entry(id.clone()).or_insert(0);
        if *count >= self.inner.cfg.max_consecutive_auto_resumes {
            return false;
        }
        *count += 1;
        true
    }

    pub(crate) fn snapshot(&self) -> Config {
        self.inner.config_store.snapshot()
    }

    pub(crate) fn index(&self) -> TaskIndex {
        TaskIndex::build(&self.snapshot())
    }

    pub(crate) fn record_of(&self, id: &WorkspaceId) -> Option<WorkspaceRecord> {
        self.snapshot().workspace(id).cloned()
    }

    /// Push the current record (or its removal) to metadata listeners.
    pub(crate) fn emit_record_metadata(&self, id: &WorkspaceId) {
        let record = self.record_of(id);
        self.inner.deps.workspaces.emit_metadata(id, record.as_ref());
    }

    /// Global running-parallelism accounting.
    ///
    /// A task in a foreground await never counts. Otherwise a task counts
    /// while the gateway streams it (whatever its stored status), or while
    /// its status is running/awaiting_report.
    pub(crate) fn running_parallelism(&self, index: &TaskIndex) -> usize {
        index
            .tasks()
            .filter(|entry| {
                if self.foreground_count(entry.workspace_id()) > 0 {
                    return false;
                }
                if self.inner.deps.gateway.is_streaming(entry.workspace_id()) {
                    return true;
                }
                matches!(entry.status(), TaskStatus::Running | TaskStatus::AwaitingReport)
            })
            .count()
    }

    pub(crate) fn has_capacity(&self, index: &TaskIndex) -> bool {
        self.running_parallelism(index) < self.inner.cfg.max_parallel_agent_tasks
    }

    /// Resolve the active agent for a workspace by precedence: event
    /// metadata, most recent assistant message, workspace AI settings,
    /// fallback `exec`. Model and thinking level come from the workspace's
    /// AI settings.
    pub(crate) async fn resolve_active_agent(
        &self,
        id: &WorkspaceId,
        event_agent: Option<&str>,
    ) -> (String, Option<String>, Option<ThinkingLevel>) {
        let info: WorkspaceAiInfo =
            self.inner.deps.workspaces.get_info(id).await.unwrap_or_default();

        let from_event = event_agent
            .map(normalize_agent_id)
            .filter(|a| !a.is_empty());

        let agent = match from_event {
            Some(agent) => agent,
            None => match self.last_assistant_agent(id).await {
                Some(agent) => agent,
                None => info
                    .agent_id
                    .as_deref()
                    .map(normalize_agent_id)
                    .filter(|a| !a.is_empty())
                    .unwrap_or_else(|| AGENT_EXEC.to_string()),
            },
        };
        (agent, info.model_string, info.thinking_level)
    }

    async fn last_assistant_agent(&self, id: &WorkspaceId) -> Option<String> {
        let messages = self.inner.deps.history.last_messages(id, 20).await.ok()?;
        messages
            .iter()
            .rev()
            .find(|m| m.role == Role::Assistant)
            .and_then(|m| m.metadata.agent_id.as_deref())
            .map(normalize_agent_id)
            .filter(|a| !a.is_empty())
    }

    /// Fresh id for synthetic messages.
    pub(crate) fn new_message_id(&self) -> String {
        self.inner.config_store.generate_stable_id()
    }
}
