// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::tempdir;

fn store() -> (tempfile::TempDir, FsHistoryStore) {
    let dir = tempdir().unwrap();
    let store = FsHistoryStore::new(dir.path());
    (dir, store)
}

#[tokio::test]
async fn missing_history_reads_as_empty() {
    let (_dir, store) = store();
    let ws = WorkspaceId::new("ws1");
    assert!(store.last_messages(&ws, 10).await.unwrap().is_empty());
    assert!(store.read_partial(&ws).await.unwrap().is_none());
}

#[tokio::test]
async fn append_then_read_last_n() {
    let (_dir, store) = store();
    let ws = WorkspaceId::new("ws1");
    for i in 0..5 {
        store.append(&ws, &ChatMessage::user(format!("m{i}"), format!("text {i}"))).await.unwrap();
    }
    let last = store.last_messages(&ws, 2).await.unwrap();
    assert_eq!(last.len(), 2);
    assert_eq!(last[0].id, "m3");
    assert_eq!(last[1].id, "m4");
}

#[tokio::test]
async fn malformed_lines_are_skipped() {
    let (dir, store) = store();
    let ws = WorkspaceId::new("ws1");
    store.append(&ws, &ChatMessage::user("m0", "ok")).await.unwrap();
    let chat = dir.path().join("sessions/ws1/chat.jsonl");
    let mut contents = std::fs::read_to_string(&chat).unwrap();
    contents.push_str("{not json\n");
    std::fs::write(&chat, contents).unwrap();
    store.append(&ws, &ChatMessage::user("m1", "also ok")).await.unwrap();

    let all = store.last_messages(&ws, 10).await.unwrap();
    assert_eq!(all.len(), 2);
}

#[tokio::test]
async fn partial_round_trips_and_overwrites() {
    let (_dir, store) = store();
    let ws = WorkspaceId::new("ws1");
    store.write_partial(&ws, &ChatMessage::assistant("p1", "first")).await.unwrap();
    store.write_partial(&ws, &ChatMessage::assistant("p2", "second")).await.unwrap();
    let partial = store.read_partial(&ws).await.unwrap().unwrap();
    assert_eq!(partial.id, "p2");
    assert_eq!(partial.text(), "second");
}
