// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! History store: append-only per-workspace message log plus the in-flight
//! partial message snapshot.

use super::AdapterError;
use async_trait::async_trait;
use mux_core::{ChatMessage, WorkspaceId};
use std::io::Write;
use std::path::PathBuf;

#[async_trait]
pub trait HistoryStore: Send + Sync + 'static {
    /// The last `n` messages of the workspace's history, oldest first.
    async fn last_messages(
        &self,
        id: &WorkspaceId,
        n: usize,
    ) -> Result<Vec<ChatMessage>, AdapterError>;

    async fn read_partial(&self, id: &WorkspaceId) -> Result<Option<ChatMessage>, AdapterError>;

    async fn write_partial(
        &self,
        id: &WorkspaceId,
        msg: &ChatMessage,
    ) -> Result<(), AdapterError>;

    async fn append(&self, id: &WorkspaceId, msg: &ChatMessage) -> Result<(), AdapterError>;
}

/// File-backed history store over the engine's session directory layout:
/// `<state_dir>/sessions/<workspace_id>/chat.jsonl` + `partial.json`.
#[derive(Debug, Clone)]
pub struct FsHistoryStore {
    state_dir: PathBuf,
}

impl FsHistoryStore {
    pub fn new(state_dir: impl Into<PathBuf>) -> Self {
        Self { state_dir: state_dir.into() }
    }

    fn session_dir(&self, id: &WorkspaceId) -> PathBuf {
        self.state_dir.join("sessions").join(id.as_str())
    }

    fn chat_path(&self, id: &WorkspaceId) -> PathBuf {
        self.session_dir(id).join("chat.jsonl")
    }

    fn partial_path(&self, id: &WorkspaceId) -> PathBuf {
        self.session_dir(id).join("partial.json")
    }
}

#[async_trait]
impl HistoryStore for FsHistoryStore {
    async fn last_messages(
        &self,
        id: &WorkspaceId,
        n: usize,
    ) -> Result<Vec<ChatMessage>, AdapterError> {
        let path = self.chat_path(id);
        let contents = match std::fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(vec![]),
            Err(err) => return Err(err.into()),
        };

        let mut messages: Vec<ChatMessage> = Vec::new();
        for line in contents.lines() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str(line) {
                Ok(msg) => messages.push(msg),
                Err(err) => {
                    tracing::warn!(workspace_id = %id, error = %err, "skipping malformed history line");
                }
            }
        }
        let skip = messages.len().saturating_sub(n);
        Ok(messages.split_off(skip))
    }

    async fn read_partial(&self, id: &WorkspaceId) -> Result<Option<ChatMessage>, AdapterError> {
        let path = self.partial_path(id);
        match std::fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(serde_json::from_str(&contents)?)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn write_partial(
        &self,
        id: &WorkspaceId,
        msg: &ChatMessage,
    ) -> Result<(), AdapterError> {
        std::fs::create_dir_all(self.session_dir(id))?;
        let json = serde_json::to_string(msg)?;
        std::fs::write(self.partial_path(id), json)?;
        Ok(())
    }

    async fn append(&self, id: &WorkspaceId, msg: &ChatMessage) -> Result<(), AdapterError> {
        std::fs::create_dir_all(self.session_dir(id))?;
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.chat_path(id))?;
        let json = serde_json::to_string(msg)?;
        writeln!(file, "{json}")?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "history_tests.rs"]
mod tests;
