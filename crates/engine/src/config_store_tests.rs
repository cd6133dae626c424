// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::tempdir;

fn record(id: &str) -> WorkspaceRecord {
    WorkspaceRecord::root(WorkspaceId::new(id), "/proj".into(), id, format!("/proj/{id}").into())
}

#[test]
fn edits_survive_reload() {
    let dir = tempdir().unwrap();
    {
        let store = ConfigStore::load_or_default(dir.path()).unwrap();
        store.edit(|cfg| cfg.insert(record("ws1"))).unwrap();
    }
    let store = ConfigStore::load_or_default(dir.path()).unwrap();
    assert!(store.snapshot().contains(&WorkspaceId::new("ws1")));
}

#[test]
fn edit_returns_mutator_output() {
    let dir = tempdir().unwrap();
    let store = ConfigStore::load_or_default(dir.path()).unwrap();
    let count = store
        .edit(|cfg| {
            cfg.insert(record("ws1"));
            cfg.workspaces.len()
        })
        .unwrap();
    assert_eq!(count, 1);
}

#[test]
fn no_tmp_file_left_behind() {
    let dir = tempdir().unwrap();
    let store = ConfigStore::load_or_default(dir.path()).unwrap();
    store.edit(|cfg| cfg.insert(record("ws1"))).unwrap();
    assert!(dir.path().join("config.json").exists());
    assert!(!dir.path().join("config.json.tmp").exists());
}

#[test]
fn generated_ids_are_lowercase_alphanumeric_and_unique() {
    let dir = tempdir().unwrap();
    let store = ConfigStore::load_or_default(dir.path()).unwrap();
    let a = store.generate_stable_id();
    let b = store.generate_stable_id();
    assert_ne!(a, b);
    for id in [&a, &b] {
        assert_eq!(id.len(), 12);
        assert!(id.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()), "{id}");
    }
}

#[test]
fn remove_workspace_deletes_session_dir() {
    let dir = tempdir().unwrap();
    let store = ConfigStore::load_or_default(dir.path()).unwrap();
    store.edit(|cfg| cfg.insert(record("ws1"))).unwrap();

    let ws = WorkspaceId::new("ws1");
    let session = store.session_dir(&ws);
    std::fs::create_dir_all(&session).unwrap();
    std::fs::write(session.join("chat.jsonl"), "{}\n").unwrap();

    let removed = store.remove_workspace(&ws).unwrap();
    assert_eq!(removed.unwrap().id, "ws1");
    assert!(!store.snapshot().contains(&ws));
    assert!(!session.exists());
}

#[test]
fn remove_missing_workspace_is_a_noop() {
    let dir = tempdir().unwrap();
    let store = ConfigStore::load_or_default(dir.path()).unwrap();
    assert!(store.remove_workspace(&WorkspaceId::new("ghost")).unwrap().is_none());
}
