// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Disk-backed artifact store over per-workspace session directories.
//!
//! Layout per session directory:
//!
//! ```text
//! <session>/chat.jsonl
//! <session>/partial.json
//! <session>/subagent-reports/<childTaskId>/report.md      + index.json
//! <session>/subagent-patches/<childTaskId>/patch.mbox     + index.json
//! <session>/subagent-transcripts/<childTaskId>/chat.jsonl + index.json
//! ```
//!
//! Paths recorded inside artifacts are relative to the owning session
//! directory so payloads stay addressable after a roll-up moves them.

use mux_core::agent::ThinkingLevel;
use mux_core::{
    ArtifactIndex, PatchArtifact, ReportArtifact, SessionArtifact, TaskId, TranscriptArtifact,
    WorkspaceId,
};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const REPORT_FILE: &str = "report.md";
pub const PATCH_FILE: &str = "patch.mbox";
pub const CHAT_FILE: &str = "chat.jsonl";
pub const PARTIAL_FILE: &str = "partial.json";
const INDEX_FILE: &str = "index.json";

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("artifact index parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("path traversal refused: {0:?}")]
    PathTraversal(String),
}

/// Reject child ids that would escape the session directory when joined.
fn assert_safe_component(id: &str) -> Result<(), ArtifactError> {
    let unsafe_id = id.is_empty()
        || id == "."
        || id == ".."
        || id.contains('/')
        || id.contains('\\')
        || id.contains('\0');
    if unsafe_id {
        return Err(ArtifactError::PathTraversal(id.to_string()));
    }
    Ok(())
}

fn index_path<T: SessionArtifact>(session_dir: &Path) -> PathBuf {
    session_dir.join(T::DIR).join(INDEX_FILE)
}

/// Read one kind's index; a missing file reads as empty.
pub fn read_index<T: SessionArtifact>(session_dir: &Path) -> Result<ArtifactIndex<T>, ArtifactError> {
    match std::fs::read_to_string(index_path::<T>(session_dir)) {
        Ok(contents) => Ok(serde_json::from_str(&contents)?),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(ArtifactIndex::default()),
        Err(err) => Err(err.into()),
    }
}

pub fn write_index<T: SessionArtifact>(
    session_dir: &Path,
    index: &ArtifactIndex<T>,
) -> Result<(), ArtifactError> {
    let path = index_path::<T>(session_dir);
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, serde_json::to_string_pretty(index)?)?;
    std::fs::rename(&tmp, &path)?;
    Ok(())
}

fn upsert_entry<T: SessionArtifact>(
    session_dir: &Path,
    child: &TaskId,
    entry: T,
) -> Result<(), ArtifactError> {
    let mut index = read_index::<T>(session_dir)?;
    index.artifacts_by_child_task_id.insert(child.clone(), entry);
    write_index(session_dir, &index)
}

/// Persist a completed report into a session directory. Idempotent on
/// `childTaskId`: re-running overwrites the payload and keeps the original
/// `createdAtMs`.
pub fn upsert_report(session_dir: &Path, artifact: &ReportArtifact) -> Result<(), ArtifactError> {
    let child = &artifact.child_task_id;
    assert_safe_component(child.as_str())?;

    let payload_dir = session_dir.join(ReportArtifact::DIR).join(child.as_str());
    std::fs::create_dir_all(&payload_dir)?;
    std::fs::write(payload_dir.join(REPORT_FILE), &artifact.report_markdown)?;

    let mut entry = artifact.clone();
    if let Some(existing) = read_index::<ReportArtifact>(session_dir)?
        .artifacts_by_child_task_id
        .get(child)
    {
        entry.created_at_ms = existing.created_at_ms;
    }
    upsert_entry(session_dir, child, entry)
}

pub fn read_report(
    session_dir: &Path,
    child: &TaskId,
) -> Result<Option<ReportArtifact>, ArtifactError> {
    Ok(read_index::<ReportArtifact>(session_dir)?.artifacts_by_child_task_id.get(child).cloned())
}

/// Record (or update) a patch artifact entry. The mbox payload is written by
/// the caller at `session_dir` + `mbox_path`.
pub fn record_patch(session_dir: &Path, artifact: &PatchArtifact) -> Result<(), ArtifactError> {
    assert_safe_component(artifact.child_task_id.as_str())?;
    std::fs::create_dir_all(
        session_dir.join(PatchArtifact::DIR).join(artifact.child_task_id.as_str()),
    )?;
    upsert_entry(session_dir, &artifact.child_task_id, artifact.clone())
}

pub fn patch_of(
    session_dir: &Path,
    child: &TaskId,
) -> Result<Option<PatchArtifact>, ArtifactError> {
    Ok(read_index::<PatchArtifact>(session_dir)?.artifacts_by_child_task_id.get(child).cloned())
}

/// Whether cleanup of `child` must be deferred for an unsettled patch.
pub fn patch_pending(session_dir: &Path, child: &TaskId) -> bool {
    matches!(
        patch_of(session_dir, child),
        Ok(Some(artifact)) if artifact.status == mux_core::PatchStatus::Pending
    )
}

/// Archive a child's own transcript files into the parent session directory
/// before the child session is deleted. Best-effort: a missing source file
/// is skipped, not an error.
#[allow(clippy::too_many_arguments)]
pub fn archive_transcripts(
    child_session: &Path,
    parent_session: &Path,
    child: &TaskId,
    parent_workspace_id: &WorkspaceId,
    ancestor_workspace_ids: &[WorkspaceId],
    model: Option<String>,
    thinking_level: Option<ThinkingLevel>,
    now_ms: u64,
) -> Result<TranscriptArtifact, ArtifactError> {
    assert_safe_component(child.as_str())?;
    let dest_dir = parent_session.join(TranscriptArtifact::DIR).join(child.as_str());
    std::fs::create_dir_all(&dest_dir)?;

    let mut chat_path = None;
    let mut partial_path = None;
    for (file, slot) in [(CHAT_FILE, &mut chat_path), (PARTIAL_FILE, &mut partial_path)] {
        let src = child_session.join(file);
        if src.exists() {
            std::fs::copy(&src, dest_dir.join(file))?;
            *slot = Some(PathBuf::from(TranscriptArtifact::DIR).join(child.as_str()).join(file));
        }
    }

    let artifact = TranscriptArtifact {
        child_task_id: child.clone(),
        parent_workspace_id: parent_workspace_id.clone(),
        ancestor_workspace_ids: ancestor_workspace_ids.to_vec(),
        chat_path,
        partial_path,
        model,
        thinking_level,
        created_at_ms: now_ms,
        updated_at_ms: now_ms,
    };
    upsert_entry(parent_session, child, artifact.clone())?;
    Ok(artifact)
}

/// Roll all nested subagent artifacts recorded in a child session directory
/// up into the parent session directory.
///
/// Payload directories are copied (skipped when the destination exists),
/// indexes merged retaining the entry with the larger `updatedAtMs`, and
/// ownership rewritten: `deleted` is dropped from ancestor chains and
/// `new_parent` moved to position 0. Idempotent.
pub fn roll_up(
    child_session: &Path,
    parent_session: &Path,
    deleted: &WorkspaceId,
    new_parent: &WorkspaceId,
) -> Result<(), ArtifactError> {
    roll_up_kind::<ReportArtifact>(child_session, parent_session, deleted, new_parent)?;
    roll_up_kind::<PatchArtifact>(child_session, parent_session, deleted, new_parent)?;
    roll_up_kind::<TranscriptArtifact>(child_session, parent_session, deleted, new_parent)?;
    Ok(())
}

fn roll_up_kind<T: SessionArtifact>(
    child_session: &Path,
    parent_session: &Path,
    deleted: &WorkspaceId,
    new_parent: &WorkspaceId,
) -> Result<(), ArtifactError> {
    let child_index = read_index::<T>(child_session)?;
    if child_index.artifacts_by_child_task_id.is_empty() {
        return Ok(());
    }

    let mut parent_index = read_index::<T>(parent_session)?;
    for (grand_id, mut entry) in child_index.artifacts_by_child_task_id {
        if let Err(err) = assert_safe_component(grand_id.as_str()) {
            tracing::warn!(child_task_id = %grand_id, error = %err, "refusing artifact roll-up");
            continue;
        }
        let src = child_session.join(T::DIR).join(grand_id.as_str());
        let dst = parent_session.join(T::DIR).join(grand_id.as_str());
        if src.is_dir() && !dst.exists() {
            copy_dir_recursive(&src, &dst)?;
        }
        entry.reparent(deleted, new_parent);
        parent_index.merge(grand_id, entry);
    }
    write_index(parent_session, &parent_index)
}

fn copy_dir_recursive(src: &Path, dst: &Path) -> Result<(), ArtifactError> {
    std::fs::create_dir_all(dst)?;
    for item in std::fs::read_dir(src)? {
        let item = item?;
        let dest = dst.join(item.file_name());
        if item.file_type()?.is_dir() {
            copy_dir_recursive(&item.path(), &dest)?;
        } else {
            std::fs::copy(item.path(), &dest)?;
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "artifacts_tests.rs"]
mod tests;
