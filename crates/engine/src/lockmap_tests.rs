// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

#[tokio::test]
async fn same_key_is_mutually_exclusive() {
    let mutex = KeyedMutex::new();
    let concurrent = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    let mut handles = Vec::new();
    for _ in 0..8 {
        let mutex = mutex.clone();
        let concurrent = Arc::clone(&concurrent);
        let peak = Arc::clone(&peak);
        handles.push(tokio::spawn(async move {
            let _guard = mutex.lock("ws1").await;
            let now = concurrent.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(1)).await;
            concurrent.fetch_sub(1, Ordering::SeqCst);
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }
    assert_eq!(peak.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn distinct_keys_do_not_contend() {
    let mutex = KeyedMutex::new();
    let guard_a = mutex.lock("a").await;
    // Would deadlock if keys shared a lock.
    let guard_b = mutex.lock("b").await;
    drop(guard_a);
    drop(guard_b);
}

#[tokio::test]
async fn waiters_acquire_in_fifo_order() {
    let mutex = KeyedMutex::new();
    let order = Arc::new(Mutex::new(Vec::new()));

    let first = mutex.lock("k").await;
    let mut handles = Vec::new();
    for i in 0..4 {
        let mutex = mutex.clone();
        let order = Arc::clone(&order);
        handles.push(tokio::spawn(async move {
            let _guard = mutex.lock("k").await;
            order.lock().push(i);
        }));
        // Let each task reach the lock queue before spawning the next.
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    drop(first);
    for handle in handles {
        handle.await.unwrap();
    }
    assert_eq!(*order.lock(), vec![0, 1, 2, 3]);
}

#[tokio::test]
async fn slots_are_pruned_after_release() {
    let mutex = KeyedMutex::new();
    {
        let _guard = mutex.lock("gone").await;
        assert_eq!(mutex.slot_count(), 1);
    }
    assert_eq!(mutex.slot_count(), 0);
}
