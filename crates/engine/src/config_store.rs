// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable workspace table with transactional edits.
//!
//! The table is a single JSON document under the state directory, rewritten
//! atomically (write-temp-then-rename) on every edit. The in-memory copy is
//! the read path; disk is only touched on mutation and startup.

use mux_core::{Config, WorkspaceId, WorkspaceRecord};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use thiserror::Error;

const CONFIG_FILE: &str = "config.json";
const SESSIONS_DIR: &str = "sessions";

/// Lowercase alphanumeric id alphabet; generated ids embed safely into
/// workspace names and filesystem paths.
const ID_ALPHABET: [char; 36] = [
    '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', 'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i',
    'j', 'k', 'l', 'm', 'n', 'o', 'p', 'q', 'r', 's', 't', 'u', 'v', 'w', 'x', 'y', 'z',
];

const ID_LEN: usize = 12;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config parse error: {0}")]
    Json(#[from] serde_json::Error),
}

pub struct ConfigStore {
    state_dir: PathBuf,
    config: Mutex<Config>,
}

impl ConfigStore {
    /// Load the persisted table, or start empty if none exists yet.
    pub fn load_or_default(state_dir: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let state_dir = state_dir.into();
        let path = state_dir.join(CONFIG_FILE);
        let config = match std::fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Config::default(),
            Err(err) => return Err(err.into()),
        };
        Ok(Self { state_dir, config: Mutex::new(config) })
    }

    pub fn state_dir(&self) -> &Path {
        &self.state_dir
    }

    /// Current table contents.
    pub fn snapshot(&self) -> Config {
        self.config.lock().clone()
    }

    /// Transactional edit: the mutation is applied to a copy, persisted, and
    /// only then made visible. A failed persist leaves the table unchanged.
    pub fn edit<T>(&self, mutate: impl FnOnce(&mut Config) -> T) -> Result<T, ConfigError> {
        let mut guard = self.config.lock();
        let mut next = guard.clone();
        let out = mutate(&mut next);
        self.persist(&next)?;
        *guard = next;
        Ok(out)
    }

    fn persist(&self, config: &Config) -> Result<(), ConfigError> {
        std::fs::create_dir_all(&self.state_dir)?;
        let path = self.state_dir.join(CONFIG_FILE);
        let tmp = self.state_dir.join(format!("{CONFIG_FILE}.tmp"));
        let json = serde_json::to_string_pretty(config)?;
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }

    /// Generate an opaque stable id.
    pub fn generate_stable_id(&self) -> String {
        nanoid::nanoid!(ID_LEN, &ID_ALPHABET)
    }

    /// Per-workspace session directory (chat history, artifacts).
    pub fn session_dir(&self, id: &WorkspaceId) -> PathBuf {
        self.state_dir.join(SESSIONS_DIR).join(id.as_str())
    }

    /// Remove a workspace row and delete its session directory.
    pub fn remove_workspace(
        &self,
        id: &WorkspaceId,
    ) -> Result<Option<WorkspaceRecord>, ConfigError> {
        let removed = self.edit(|cfg| cfg.remove(id))?;
        let session = self.session_dir(id);
        if let Err(err) = std::fs::remove_dir_all(&session) {
            if err.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(workspace_id = %id, error = %err, "failed to delete session dir");
            }
        }
        Ok(removed)
    }
}

#[cfg(test)]
#[path = "config_store_tests.rs"]
mod tests;
