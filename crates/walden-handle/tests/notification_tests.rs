// SPDX-FileCopyrightText: 2026 Walden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the per-handle notification registry.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use walden_core::CheckpointMode;
use walden_handle::{BasicConfig, CheckpointOutcome, Handle, HookKind, Ignorable, PerformanceInfo};

fn wal_handle() -> (tempfile::TempDir, Handle) {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("notify.db");
    let mut handle = Handle::new(path.to_string_lossy().into_owned());
    handle.open().expect("open temp database");
    handle.install(&BasicConfig::default()).expect("enable WAL");
    handle.execute("CREATE TABLE t(v)").unwrap();
    (dir, handle)
}

fn committed_pages(handle: &mut Handle) -> Arc<Mutex<Vec<(String, u32)>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    handle
        .set_notification_when_committed(
            0,
            "pages",
            Arc::new(move |path: &str, pages: u32| {
                sink.lock().unwrap().push((path.to_string(), pages));
            }),
        )
        .unwrap();
    seen
}

// ---- Committed ----

#[test]
fn commit_reports_path_and_pages() {
    let (_dir, mut handle) = wal_handle();
    let seen = committed_pages(&mut handle);

    handle.begin_nested_transaction().unwrap();
    handle.execute("INSERT INTO t VALUES (randomblob(8192))").unwrap();
    handle.commit_or_rollback_nested_transaction().unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].0, handle.path());
    assert!(seen[0].1 >= 2, "an 8 KiB row spans several pages");
}

#[test]
fn savepoint_release_is_not_a_commit() {
    let (_dir, mut handle) = wal_handle();
    let seen = committed_pages(&mut handle);

    handle.begin_nested_transaction().unwrap();
    handle.begin_nested_transaction().unwrap();
    handle.execute("INSERT INTO t VALUES (1)").unwrap();
    handle.commit_or_rollback_nested_transaction().unwrap();
    assert!(seen.lock().unwrap().is_empty());

    handle.commit_or_rollback_nested_transaction().unwrap();
    assert_eq!(seen.lock().unwrap().len(), 1);
}

#[test]
fn every_committed_observer_runs_in_order() {
    let (_dir, mut handle) = wal_handle();
    let calls = Arc::new(Mutex::new(Vec::new()));
    for (order, name) in [(10, "second"), (-5, "first"), (10, "third")] {
        let calls = Arc::clone(&calls);
        handle
            .set_notification_when_committed(
                order,
                name,
                Arc::new(move |_path: &str, _pages: u32| calls.lock().unwrap().push(name)),
            )
            .unwrap();
    }

    handle.execute("INSERT INTO t VALUES (1)").unwrap();
    assert_eq!(*calls.lock().unwrap(), vec!["first", "second", "third"]);
}

#[test]
fn unset_committed_observer_stops_reports() {
    let (_dir, mut handle) = wal_handle();
    let seen = committed_pages(&mut handle);
    handle.execute("INSERT INTO t VALUES (1)").unwrap();
    assert!(handle.unset_notification(HookKind::Committed, "pages").unwrap());
    handle.execute("INSERT INTO t VALUES (2)").unwrap();
    assert_eq!(seen.lock().unwrap().len(), 1);
}

#[test]
fn commit_after_truncate_counts_every_new_page() {
    let (_dir, mut handle) = wal_handle();
    let seen = committed_pages(&mut handle);

    handle
        .execute("INSERT INTO t VALUES (randomblob(1000000))")
        .unwrap();
    let outcome = handle
        .checkpoint(CheckpointMode::Truncate)
        .unwrap()
        .expect("no veto installed");
    assert!(!outcome.busy);
    handle
        .execute("INSERT INTO t VALUES (randomblob(1100000))")
        .unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 2);
    assert!(seen[0].1 >= 100, "a 1 MB row spans hundreds of pages");
    assert!(
        seen[1].1 >= 100,
        "the log restarted, so the second commit is all new pages: {}",
        seen[1].1
    );
}

// ---- Checkpoint veto ----

fn commit_rows(handle: &mut Handle, count: usize) {
    for value in 0..count {
        handle
            .execute(&format!("INSERT INTO t VALUES ({value})"))
            .unwrap();
    }
}

#[test]
fn will_checkpoint_veto_blocks_checkpoint() {
    let (_dir, mut handle) = wal_handle();
    handle.execute("INSERT INTO t VALUES (1)").unwrap();
    handle
        .set_notification_when_will_checkpoint(0, "deny", Arc::new(|_path: &str| false))
        .unwrap();
    assert!(handle.checkpoint(CheckpointMode::Passive).unwrap().is_none());

    handle
        .set_notification_when_will_checkpoint(1, "allow", Arc::new(|_path: &str| true))
        .unwrap();
    assert!(handle.checkpoint(CheckpointMode::Passive).unwrap().is_none());

    handle
        .unset_notification(HookKind::WillCheckpoint, "deny")
        .unwrap();
    let outcome = handle
        .checkpoint(CheckpointMode::Passive)
        .unwrap()
        .expect("checkpoint runs once the veto is gone");
    assert!(outcome.log_frames >= 1);
    assert!(!outcome.busy);
}

#[test]
fn checkpointed_observers_receive_outcome() {
    let (_dir, mut handle) = wal_handle();
    handle.execute("INSERT INTO t VALUES (1)").unwrap();
    let outcomes: Arc<Mutex<Vec<(String, CheckpointOutcome)>>> = Arc::new(Mutex::new(Vec::new()));
    {
        let outcomes = Arc::clone(&outcomes);
        handle
            .set_notification_when_checkpointed(
                0,
                "record",
                Arc::new(move |path: &str, outcome: &CheckpointOutcome| {
                    outcomes.lock().unwrap().push((path.to_string(), *outcome));
                }),
            )
            .unwrap();
    }

    let outcome = handle
        .checkpoint(CheckpointMode::Truncate)
        .unwrap()
        .unwrap();
    let outcomes = outcomes.lock().unwrap();
    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].0, handle.path());
    assert_eq!(outcomes[0].1, outcome);
    assert_eq!(outcome.mode, CheckpointMode::Truncate);
    assert!(!outcome.busy);
}

#[test]
fn checkpoint_outside_wal_reports_no_frames() {
    let mut handle = Handle::new(":memory:");
    handle.open().unwrap();
    let outcome = handle
        .checkpoint(CheckpointMode::Passive)
        .unwrap()
        .unwrap();
    assert_eq!(outcome.log_frames, -1);
    assert_eq!(outcome.checkpointed_frames, -1);
}

#[test]
fn vetoed_checkpoint_fires_no_checkpointed_observer() {
    let (_dir, mut handle) = wal_handle();
    let fired = Arc::new(AtomicUsize::new(0));
    {
        let fired = Arc::clone(&fired);
        handle
            .set_notification_when_checkpointed(
                0,
                "count",
                Arc::new(move |_path: &str, _outcome: &CheckpointOutcome| {
                    fired.fetch_add(1, Ordering::SeqCst);
                }),
            )
            .unwrap();
    }
    handle
        .set_notification_when_will_checkpoint(0, "deny", Arc::new(|_path: &str| false))
        .unwrap();
    handle.checkpoint(CheckpointMode::Full).unwrap();
    assert_eq!(fired.load(Ordering::SeqCst), 0);
}

#[test]
fn will_checkpoint_veto_blocks_autocheckpoint() {
    let (_dir, mut handle) = wal_handle();
    handle
        .set_notification_when_will_checkpoint(0, "deny", Arc::new(|_path: &str| false))
        .unwrap();

    // Past the engine's 1000-frame autocheckpoint threshold.
    commit_rows(&mut handle, 1100);

    handle
        .unset_notification(HookKind::WillCheckpoint, "deny")
        .unwrap();
    let outcome = handle
        .checkpoint(CheckpointMode::Passive)
        .unwrap()
        .expect("veto removed");
    assert!(
        outcome.log_frames >= 1100,
        "no autocheckpoint restarted the log: {} frames",
        outcome.log_frames
    );
}

#[test]
fn allowed_autocheckpoint_reaches_checkpointed_observers() {
    let (_dir, mut handle) = wal_handle();
    let fired = Arc::new(AtomicUsize::new(0));
    {
        let fired = Arc::clone(&fired);
        handle
            .set_notification_when_checkpointed(
                0,
                "count",
                Arc::new(move |_path: &str, outcome: &CheckpointOutcome| {
                    assert_eq!(outcome.mode, CheckpointMode::Passive);
                    fired.fetch_add(1, Ordering::SeqCst);
                }),
            )
            .unwrap();
    }
    handle
        .set_notification_when_will_checkpoint(0, "allow", Arc::new(|_path: &str| true))
        .unwrap();

    commit_rows(&mut handle, 1100);

    assert!(fired.load(Ordering::SeqCst) >= 1);
}

#[test]
fn ignored_checkpoint_failure_is_not_a_veto() {
    let (_dir, mut handle) = wal_handle();
    let fired = Arc::new(AtomicUsize::new(0));
    {
        let fired = Arc::clone(&fired);
        handle
            .set_notification_when_checkpointed(
                0,
                "count",
                Arc::new(move |_path: &str, _outcome: &CheckpointOutcome| {
                    fired.fetch_add(1, Ordering::SeqCst);
                }),
            )
            .unwrap();
    }

    // The engine refuses to checkpoint under this connection's own write
    // transaction.
    handle.begin_nested_transaction().unwrap();
    handle.execute("INSERT INTO t VALUES (1)").unwrap();
    let err = handle
        .checkpoint(CheckpointMode::Passive)
        .expect_err("checkpoint inside a write transaction fails");
    assert!(err.record().is_some());

    let outcome = handle
        .ignoring(Ignorable::Any)
        .checkpoint(CheckpointMode::Passive)
        .unwrap()
        .expect("an ignored failure is still an outcome");
    assert!(outcome.busy);
    assert_eq!(outcome.mode, CheckpointMode::Passive);
    assert_eq!(fired.load(Ordering::SeqCst), 0);

    handle.rollback_nested_transaction();
}

// ---- Tracing ----

#[test]
fn performance_trace_reports_statement() {
    let (_dir, mut handle) = wal_handle();
    let infos: Arc<Mutex<Vec<PerformanceInfo>>> = Arc::new(Mutex::new(Vec::new()));
    {
        let infos = Arc::clone(&infos);
        handle
            .set_notification_when_performance_traced(
                0,
                "perf",
                Arc::new(move |info: &PerformanceInfo| infos.lock().unwrap().push(info.clone())),
            )
            .unwrap();
    }

    handle.execute("INSERT INTO t VALUES (1)").unwrap();
    let infos = infos.lock().unwrap();
    let insert = infos
        .iter()
        .find(|info| info.sql == "INSERT INTO t VALUES (1)")
        .expect("insert was profiled");
    assert!(insert.vm_steps > 0);
}

#[test]
fn panicking_observer_does_not_break_the_handle() {
    let (_dir, mut handle) = wal_handle();
    handle
        .set_notification_when_sql_traced(0, "boom", Arc::new(|_sql: &str| panic!("observer failure")))
        .unwrap();
    handle.execute("INSERT INTO t VALUES (1)").unwrap();
    assert_eq!(handle.get_values("SELECT v FROM t", 0).unwrap().len(), 1);
}

// ---- Purge ----

#[test]
fn close_purges_every_observer() {
    let (_dir, mut handle) = wal_handle();
    let _seen = committed_pages(&mut handle);
    handle
        .set_notification_when_will_checkpoint(0, "deny", Arc::new(|_path: &str| false))
        .unwrap();
    handle.close();
    handle.open().unwrap();
    assert!(handle.notification_names(HookKind::Committed).is_empty());
    assert!(handle.notification_names(HookKind::WillCheckpoint).is_empty());
    assert!(handle.checkpoint(CheckpointMode::Passive).unwrap().is_some());
}
