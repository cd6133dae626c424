// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent catalog: the set of agent definitions a task may run as.
//!
//! Agent ids are normalized to lowercase. A definition may inherit from
//! another; a task whose agent definition transitively inherits from `plan`
//! is "plan-like" and signals completion with `propose_plan` instead of
//! `agent_report`.

use crate::message::{TOOL_AGENT_REPORT, TOOL_PROPOSE_PLAN};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

pub const AGENT_COMPACT: &str = "compact";
pub const AGENT_PLAN: &str = "plan";
pub const AGENT_EXEC: &str = "exec";
pub const AGENT_ORCHESTRATOR: &str = "orchestrator";

/// Bound on `inherits` chain walks; deeper chains are treated as broken.
const MAX_INHERIT_HOPS: usize = 32;

/// Requested depth of reasoning for a task's model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThinkingLevel {
    Off,
    #[default]
    Normal,
    High,
}

/// A single agent definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentDef {
    pub id: String,
    /// Parent definition this agent derives from, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inherits: Option<String>,
    /// When true, `create` skips the background workspace init for this agent.
    #[serde(default)]
    pub skip_workspace_init: bool,
}

impl AgentDef {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: normalize_agent_id(&id.into()), inherits: None, skip_workspace_init: false }
    }

    pub fn inherits(mut self, parent: impl Into<String>) -> Self {
        self.inherits = Some(normalize_agent_id(&parent.into()));
        self
    }

    pub fn skip_init(mut self) -> Self {
        self.skip_workspace_init = true;
        self
    }
}

/// Lowercase and trim a raw agent id.
pub fn normalize_agent_id(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// The set of agents tasks may be created as.
#[derive(Debug, Clone)]
pub struct AgentCatalog {
    agents: BTreeMap<String, AgentDef>,
}

impl AgentCatalog {
    /// Catalog containing only the builtin agents.
    pub fn builtin() -> Self {
        let mut agents = BTreeMap::new();
        for def in [
            AgentDef::new(AGENT_EXEC),
            AgentDef::new(AGENT_PLAN),
            AgentDef::new(AGENT_ORCHESTRATOR),
            AgentDef::new(AGENT_COMPACT).skip_init(),
        ] {
            agents.insert(def.id.clone(), def);
        }
        Self { agents }
    }

    /// Add (or replace) a declared agent definition.
    pub fn with_agent(mut self, def: AgentDef) -> Self {
        self.agents.insert(def.id.clone(), def);
        self
    }

    /// Remove an agent from the catalog (used to disable `orchestrator`).
    pub fn without_agent(mut self, id: &str) -> Self {
        self.agents.remove(&normalize_agent_id(id));
        self
    }

    pub fn contains(&self, id: &str) -> bool {
        self.agents.contains_key(&normalize_agent_id(id))
    }

    pub fn get(&self, id: &str) -> Option<&AgentDef> {
        self.agents.get(&normalize_agent_id(id))
    }

    /// Whether the definition for `id` transitively inherits from `plan`.
    pub fn is_plan_like(&self, id: &str) -> bool {
        let mut current = normalize_agent_id(id);
        for _ in 0..MAX_INHERIT_HOPS {
            if current == AGENT_PLAN {
                return true;
            }
            match self.agents.get(&current).and_then(|d| d.inherits.clone()) {
                Some(parent) => current = parent,
                None => return false,
            }
        }
        false
    }

    /// The tool this agent must call to complete its task.
    pub fn completion_tool(&self, id: &str) -> &'static str {
        if self.is_plan_like(id) {
            TOOL_PROPOSE_PLAN
        } else {
            TOOL_AGENT_REPORT
        }
    }

    pub fn skip_workspace_init(&self, id: &str) -> bool {
        self.get(id).map(|d| d.skip_workspace_init).unwrap_or(false)
    }

    pub fn has_orchestrator(&self) -> bool {
        self.contains(AGENT_ORCHESTRATOR)
    }
}

impl Default for AgentCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

/// A model string that failed `provider:model` validation.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid model string: {0:?}")]
pub struct InvalidModelString(pub String);

/// Validate a `provider:model` string. Both halves must be non-empty.
pub fn validate_model_string(s: &str) -> Result<(), InvalidModelString> {
    match s.split_once(':') {
        Some((provider, model)) if !provider.is_empty() && !model.is_empty() => Ok(()),
        _ => Err(InvalidModelString(s.to_string())),
    }
}

#[cfg(test)]
#[path = "agent_tests.rs"]
mod tests;
