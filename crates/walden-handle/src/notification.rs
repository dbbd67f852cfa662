// SPDX-FileCopyrightText: 2026 Walden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-handle notification registry.
//!
//! Five independent hook kinds map a name to an ordered callback. Registering
//! the first observer of a kind installs the matching engine hook; removing
//! the last one uninstalls it, so an idle handle pays nothing.
//!
//! Observers run in ascending `order`; ties keep registration order.
//! Re-registering a name replaces the previous entry.

use std::ffi::{c_char, c_int, c_uint, c_void};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::ptr;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use rusqlite::ffi;
use tracing::{debug, error, warn};
use walden_core::CheckpointMode;

use crate::raw;

/// `SQLITE_TRACE_STMT`
const TRACE_STMT: c_uint = 0x01;
/// `SQLITE_TRACE_PROFILE`
const TRACE_PROFILE: c_uint = 0x02;
/// `SQLITE_STMTSTATUS_VM_STEP`
const STMTSTATUS_VM_STEP: c_int = 4;
/// Engine default for `sqlite3_wal_autocheckpoint`.
const DEFAULT_AUTOCHECKPOINT_FRAMES: c_int = 1000;

/// Timing of one finished statement.
#[derive(Debug, Clone, PartialEq)]
pub struct PerformanceInfo {
    pub sql: String,
    pub elapsed: Duration,
    /// Virtual machine steps the statement took.
    pub vm_steps: i32,
}

/// Result of a checkpoint pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckpointOutcome {
    pub mode: CheckpointMode,
    /// Frames in the log, or -1 when the database is not in WAL mode.
    pub log_frames: i32,
    /// Frames copied back into the database, or -1 when not in WAL mode.
    pub checkpointed_frames: i32,
    /// The pass did not complete: a reader or writer held it up, or the
    /// failure was ignored through the error mask.
    pub busy: bool,
}

pub type SqlTracedNotification = Arc<dyn Fn(&str) + Send + Sync>;
pub type PerformanceTracedNotification = Arc<dyn Fn(&PerformanceInfo) + Send + Sync>;
/// Receives the database path and the pages committed since the last commit.
pub type CommittedNotification = Arc<dyn Fn(&str, u32) + Send + Sync>;
/// Returns `false` to veto a checkpoint of the given path.
pub type WillCheckpointNotification = Arc<dyn Fn(&str) -> bool + Send + Sync>;
pub type CheckpointedNotification = Arc<dyn Fn(&str, &CheckpointOutcome) + Send + Sync>;

struct Observer<F> {
    name: String,
    order: i32,
    sequence: u64,
    callback: F,
}

/// Name-keyed observers kept sorted by `(order, sequence)`.
struct Observers<F> {
    entries: Vec<Observer<F>>,
    next_sequence: u64,
}

impl<F> Default for Observers<F> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            next_sequence: 0,
        }
    }
}

impl<F: Clone> Observers<F> {
    fn set(&mut self, order: i32, name: &str, callback: F) {
        self.unset(name);
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        let at = self
            .entries
            .partition_point(|entry| (entry.order, entry.sequence) <= (order, sequence));
        self.entries.insert(
            at,
            Observer {
                name: name.to_string(),
                order,
                sequence,
                callback,
            },
        );
    }

    fn unset(&mut self, name: &str) -> bool {
        match self.entries.iter().position(|entry| entry.name == name) {
            Some(index) => {
                self.entries.remove(index);
                true
            }
            None => false,
        }
    }

    /// Snapshot so callbacks run without the registry lock held.
    fn callbacks(&self) -> Vec<F> {
        self.entries.iter().map(|entry| entry.callback.clone()).collect()
    }

    fn names(&self) -> Vec<String> {
        self.entries.iter().map(|entry| entry.name.clone()).collect()
    }

    fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn clear(&mut self) {
        self.entries.clear();
    }
}

#[derive(Default)]
struct Observed {
    sql_traced: Observers<SqlTracedNotification>,
    performance_traced: Observers<PerformanceTracedNotification>,
    committed: Observers<CommittedNotification>,
    will_checkpoint: Observers<WillCheckpointNotification>,
    checkpointed: Observers<CheckpointedNotification>,
}

/// Hook kinds, used for listing registered names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookKind {
    SqlTraced,
    PerformanceTraced,
    Committed,
    WillCheckpoint,
    Checkpointed,
}

/// State shared with the engine callbacks through a raw context pointer.
struct NotificationHub {
    path: String,
    observed: Mutex<Observed>,
    /// Log size at the last commit this connection observed.
    wal_frames: AtomicI32,
}

impl NotificationHub {
    fn lock(&self) -> MutexGuard<'_, Observed> {
        self.observed
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn dispatch_sql_traced(&self, sql: &str) {
        let callbacks = self.lock().sql_traced.callbacks();
        let sql = raw::redact_key_pragma(sql);
        for callback in callbacks {
            callback(&sql);
        }
    }

    fn dispatch_performance_traced(&self, info: &PerformanceInfo) {
        let callbacks = self.lock().performance_traced.callbacks();
        for callback in callbacks {
            callback(info);
        }
    }

    /// The WAL hook reports the whole log size; observers get the growth
    /// since the previous commit, or the full size after the log restarted.
    fn dispatch_wal_committed(&self, frames: i32) {
        let previous = self.wal_frames.swap(frames, Ordering::AcqRel);
        let pages = if frames >= previous {
            frames - previous
        } else {
            frames
        };
        let pages = u32::try_from(pages).unwrap_or(0);
        let callbacks = self.lock().committed.callbacks();
        for callback in callbacks {
            callback(&self.path, pages);
        }
    }

    /// Every observer is asked in order; the first `false` vetoes.
    fn dispatch_will_checkpoint(&self) -> bool {
        let callbacks = self.lock().will_checkpoint.callbacks();
        callbacks.iter().all(|callback| callback(&self.path))
    }

    /// After a pass that drained the log the next writer restarts it, so the
    /// next commit's log size is entirely new pages.
    fn note_checkpoint(&self, outcome: &CheckpointOutcome) {
        let drained = !outcome.busy
            && (outcome.checkpointed_frames == outcome.log_frames
                || matches!(
                    outcome.mode,
                    CheckpointMode::Restart | CheckpointMode::Truncate
                ));
        if drained {
            self.wal_frames.store(0, Ordering::Release);
        }
    }

    /// Stands in for the engine's autocheckpoint, which our WAL hook replaces,
    /// so that will-checkpoint observers can veto it.
    fn auto_checkpoint(&self, db: *mut ffi::sqlite3, schema: *const c_char, frames: c_int) {
        if frames < DEFAULT_AUTOCHECKPOINT_FRAMES {
            return;
        }
        if !self.dispatch_will_checkpoint() {
            debug!(path = %self.path, frames, "autocheckpoint vetoed");
            return;
        }
        let mut log_frames = -1;
        let mut checkpointed_frames = -1;
        // SAFETY: the engine calls the WAL hook with a live connection and
        // schema name, outside of any write transaction.
        let rc = unsafe {
            ffi::sqlite3_wal_checkpoint_v2(
                db,
                schema,
                CheckpointMode::Passive.as_raw(),
                &mut log_frames,
                &mut checkpointed_frames,
            )
        };
        if rc != ffi::SQLITE_OK && rc != ffi::SQLITE_BUSY {
            warn!(path = %self.path, rc, "autocheckpoint failed");
            return;
        }
        let outcome = CheckpointOutcome {
            mode: CheckpointMode::Passive,
            log_frames,
            checkpointed_frames,
            busy: rc == ffi::SQLITE_BUSY,
        };
        debug!(path = %self.path, log_frames, checkpointed_frames, "autocheckpoint finished");
        self.note_checkpoint(&outcome);
        self.dispatch_checkpointed(&outcome);
    }

    fn dispatch_checkpointed(&self, outcome: &CheckpointOutcome) {
        let callbacks = self.lock().checkpointed.callbacks();
        for callback in callbacks {
            callback(&self.path, outcome);
        }
    }
}

/// The registry owned by one handle.
pub(crate) struct Notification {
    hub: Arc<NotificationHub>,
    trace_mask: c_uint,
    wal_hooked: bool,
}

impl Notification {
    pub(crate) fn new(path: &str) -> Self {
        Self {
            hub: Arc::new(NotificationHub {
                path: path.to_string(),
                observed: Mutex::new(Observed::default()),
                wal_frames: AtomicI32::new(0),
            }),
            trace_mask: 0,
            wal_hooked: false,
        }
    }

    pub(crate) fn set_sql_traced(
        &mut self,
        db: *mut ffi::sqlite3,
        order: i32,
        name: &str,
        callback: SqlTracedNotification,
    ) {
        self.hub.lock().sql_traced.set(order, name, callback);
        self.sync(db);
    }

    pub(crate) fn set_performance_traced(
        &mut self,
        db: *mut ffi::sqlite3,
        order: i32,
        name: &str,
        callback: PerformanceTracedNotification,
    ) {
        self.hub.lock().performance_traced.set(order, name, callback);
        self.sync(db);
    }

    pub(crate) fn set_committed(
        &mut self,
        db: *mut ffi::sqlite3,
        order: i32,
        name: &str,
        callback: CommittedNotification,
    ) {
        self.hub.lock().committed.set(order, name, callback);
        self.sync(db);
    }

    /// A will-checkpoint observer also takes over the engine's autocheckpoint
    /// so that it can veto it.
    pub(crate) fn set_will_checkpoint(
        &mut self,
        db: *mut ffi::sqlite3,
        order: i32,
        name: &str,
        callback: WillCheckpointNotification,
    ) {
        self.hub.lock().will_checkpoint.set(order, name, callback);
        self.sync(db);
    }

    pub(crate) fn set_checkpointed(
        &mut self,
        order: i32,
        name: &str,
        callback: CheckpointedNotification,
    ) {
        self.hub.lock().checkpointed.set(order, name, callback);
    }

    pub(crate) fn unset(&mut self, db: *mut ffi::sqlite3, kind: HookKind, name: &str) -> bool {
        let removed = {
            let mut observed = self.hub.lock();
            match kind {
                HookKind::SqlTraced => observed.sql_traced.unset(name),
                HookKind::PerformanceTraced => observed.performance_traced.unset(name),
                HookKind::Committed => observed.committed.unset(name),
                HookKind::WillCheckpoint => observed.will_checkpoint.unset(name),
                HookKind::Checkpointed => observed.checkpointed.unset(name),
            }
        };
        if removed {
            self.sync(db);
        }
        removed
    }

    pub(crate) fn names(&self, kind: HookKind) -> Vec<String> {
        let observed = self.hub.lock();
        match kind {
            HookKind::SqlTraced => observed.sql_traced.names(),
            HookKind::PerformanceTraced => observed.performance_traced.names(),
            HookKind::Committed => observed.committed.names(),
            HookKind::WillCheckpoint => observed.will_checkpoint.names(),
            HookKind::Checkpointed => observed.checkpointed.names(),
        }
    }

    pub(crate) fn will_checkpoint(&self) -> bool {
        self.hub.dispatch_will_checkpoint()
    }

    /// Record a finished pass and tell the checkpointed observers.
    pub(crate) fn checkpointed(&self, outcome: &CheckpointOutcome) {
        self.hub.note_checkpoint(outcome);
        self.hub.dispatch_checkpointed(outcome);
    }

    /// Drop every observer and detach the engine hooks.
    pub(crate) fn purge(&mut self, db: *mut ffi::sqlite3) {
        {
            let mut observed = self.hub.lock();
            observed.sql_traced.clear();
            observed.performance_traced.clear();
            observed.committed.clear();
            observed.will_checkpoint.clear();
            observed.checkpointed.clear();
        }
        self.hub.wal_frames.store(0, Ordering::Release);
        if db.is_null() {
            self.trace_mask = 0;
            self.wal_hooked = false;
        } else {
            self.install_trace(db, 0);
            self.install_wal_hook(db, false, false);
        }
    }

    /// Bring the engine hooks in line with the registered observers.
    fn sync(&mut self, db: *mut ffi::sqlite3) {
        if db.is_null() {
            return;
        }
        let (mask, wants_wal) = {
            let observed = self.hub.lock();
            let mut mask = 0;
            if !observed.sql_traced.is_empty() {
                mask |= TRACE_STMT;
            }
            if !observed.performance_traced.is_empty() {
                mask |= TRACE_PROFILE;
            }
            let wants_wal =
                !observed.committed.is_empty() || !observed.will_checkpoint.is_empty();
            (mask, wants_wal)
        };
        if mask != self.trace_mask {
            self.install_trace(db, mask);
        }
        if wants_wal != self.wal_hooked {
            self.install_wal_hook(db, wants_wal, true);
        }
    }

    fn install_trace(&mut self, db: *mut ffi::sqlite3, mask: c_uint) {
        let rc = if mask == 0 {
            // SAFETY: `db` is a live connection; a null callback removes the hook.
            unsafe { ffi::sqlite3_trace_v2(db, 0, None, ptr::null_mut()) }
        } else {
            // SAFETY: the hub outlives the hook: it is owned by this registry,
            // which detaches the hook before the connection closes.
            unsafe { ffi::sqlite3_trace_v2(db, mask, Some(trace_callback), self.context()) }
        };
        if rc != ffi::SQLITE_OK {
            warn!(path = %self.hub.path, rc, "failed to update trace hook");
        }
        self.trace_mask = mask;
    }

    /// Swap the WAL hook. With `restore_autocheckpoint`, removing the hook
    /// hands checkpointing back to the engine's default policy.
    fn install_wal_hook(&mut self, db: *mut ffi::sqlite3, enable: bool, restore_autocheckpoint: bool) {
        if enable {
            self.hub.wal_frames.store(0, Ordering::Release);
            // SAFETY: same lifetime argument as the trace hook.
            unsafe { ffi::sqlite3_wal_hook(db, Some(wal_callback), self.context()) };
        } else if self.wal_hooked {
            // SAFETY: `db` is live; restoring the default autocheckpoint
            // replaces our hook as the engine documents.
            unsafe {
                if restore_autocheckpoint {
                    ffi::sqlite3_wal_autocheckpoint(db, DEFAULT_AUTOCHECKPOINT_FRAMES);
                } else {
                    ffi::sqlite3_wal_hook(db, None, ptr::null_mut());
                }
            }
        }
        self.wal_hooked = enable;
    }

    fn context(&self) -> *mut c_void {
        Arc::as_ptr(&self.hub) as *mut c_void
    }
}

unsafe extern "C" fn trace_callback(
    kind: c_uint,
    context: *mut c_void,
    p: *mut c_void,
    x: *mut c_void,
) -> c_int {
    let outcome = catch_unwind(AssertUnwindSafe(|| {
        // SAFETY: `context` is the hub pointer registered with the hook.
        let hub = unsafe { &*(context as *const NotificationHub) };
        match kind {
            TRACE_STMT => {
                // For statement events `x` is the unexpanded SQL text.
                if let Some(sql) = unsafe { raw::text(x as *const c_char) } {
                    hub.dispatch_sql_traced(&sql);
                }
            }
            TRACE_PROFILE => {
                let stmt = p as *mut ffi::sqlite3_stmt;
                // SAFETY: for profile events `p` is the statement and `x`
                // points to the elapsed nanoseconds.
                let (sql, nanos, vm_steps) = unsafe {
                    (
                        raw::text(ffi::sqlite3_sql(stmt)).unwrap_or_default(),
                        *(x as *const i64),
                        ffi::sqlite3_stmt_status(stmt, STMTSTATUS_VM_STEP, 0),
                    )
                };
                let info = PerformanceInfo {
                    sql: raw::redact_key_pragma(&sql).into_owned(),
                    elapsed: Duration::from_nanos(u64::try_from(nanos).unwrap_or(0)),
                    vm_steps,
                };
                hub.dispatch_performance_traced(&info);
            }
            _ => {}
        }
    }));
    if outcome.is_err() {
        error!("trace observer panicked");
    }
    0
}

unsafe extern "C" fn wal_callback(
    context: *mut c_void,
    db: *mut ffi::sqlite3,
    schema: *const c_char,
    frames: c_int,
) -> c_int {
    let outcome = catch_unwind(AssertUnwindSafe(|| {
        // SAFETY: `context` is the hub pointer registered with the hook.
        let hub = unsafe { &*(context as *const NotificationHub) };
        hub.dispatch_wal_committed(frames);
        hub.auto_checkpoint(db, schema, frames);
    }));
    if outcome.is_err() {
        error!("WAL observer panicked");
    }
    ffi::SQLITE_OK
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    fn recorder() -> (Arc<StdMutex<Vec<String>>>, impl Fn(&str) -> SqlTracedNotification) {
        let log = Arc::new(StdMutex::new(Vec::new()));
        let make = {
            let log = Arc::clone(&log);
            move |tag: &str| -> SqlTracedNotification {
                let log = Arc::clone(&log);
                let tag = tag.to_string();
                Arc::new(move |_sql: &str| log.lock().unwrap().push(tag.clone()))
            }
        };
        (log, make)
    }

    #[test]
    fn observers_run_by_order_then_registration() {
        let (log, make) = recorder();
        let mut notification = Notification::new("/tmp/a.db");
        let db = ptr::null_mut();
        notification.set_sql_traced(db, 5, "late", make("late"));
        notification.set_sql_traced(db, -1, "early", make("early"));
        notification.set_sql_traced(db, 5, "late-second", make("late-second"));

        notification.hub.dispatch_sql_traced("SELECT 1");
        assert_eq!(*log.lock().unwrap(), vec!["early", "late", "late-second"]);
    }

    #[test]
    fn re_registering_a_name_replaces_it() {
        let (log, make) = recorder();
        let mut notification = Notification::new("/tmp/a.db");
        let db = ptr::null_mut();
        notification.set_sql_traced(db, 0, "one", make("first"));
        notification.set_sql_traced(db, 0, "one", make("second"));

        notification.hub.dispatch_sql_traced("SELECT 1");
        assert_eq!(*log.lock().unwrap(), vec!["second"]);
        assert_eq!(notification.names(HookKind::SqlTraced), vec!["one"]);
    }

    #[test]
    fn first_veto_stops_the_chain() {
        let asked = Arc::new(StdMutex::new(Vec::new()));
        let mut notification = Notification::new("/tmp/a.db");
        for (order, name, answer) in [(0, "yes", true), (1, "no", false), (2, "never", true)] {
            let asked = Arc::clone(&asked);
            notification.set_will_checkpoint(
                ptr::null_mut(),
                order,
                name,
                Arc::new(move |_path: &str| {
                    asked.lock().unwrap().push(name);
                    answer
                }),
            );
        }

        assert!(!notification.will_checkpoint());
        assert_eq!(*asked.lock().unwrap(), vec!["yes", "no"]);
    }

    #[test]
    fn empty_registry_allows_checkpoints() {
        let notification = Notification::new("/tmp/a.db");
        assert!(notification.will_checkpoint());
    }

    #[test]
    fn committed_pages_are_log_growth() {
        let seen = Arc::new(StdMutex::new(Vec::new()));
        let mut notification = Notification::new("/tmp/a.db");
        {
            let seen = Arc::clone(&seen);
            notification.set_committed(
                ptr::null_mut(),
                0,
                "pages",
                Arc::new(move |path: &str, pages: u32| {
                    seen.lock().unwrap().push((path.to_string(), pages))
                }),
            );
        }

        notification.hub.dispatch_wal_committed(3);
        notification.hub.dispatch_wal_committed(10);
        // Log restarted after a checkpoint.
        notification.hub.dispatch_wal_committed(2);

        let pages: Vec<u32> = seen.lock().unwrap().iter().map(|(_, pages)| *pages).collect();
        assert_eq!(pages, vec![3, 7, 2]);
        assert_eq!(seen.lock().unwrap()[0].0, "/tmp/a.db");
    }

    #[test]
    fn drained_checkpoint_restarts_page_count() {
        let seen = Arc::new(StdMutex::new(Vec::new()));
        let mut notification = Notification::new("/tmp/a.db");
        {
            let seen = Arc::clone(&seen);
            notification.set_committed(
                ptr::null_mut(),
                0,
                "pages",
                Arc::new(move |_path: &str, pages: u32| seen.lock().unwrap().push(pages)),
            );
        }
        let outcome = |mode, log_frames, checkpointed_frames, busy| CheckpointOutcome {
            mode,
            log_frames,
            checkpointed_frames,
            busy,
        };

        notification.hub.dispatch_wal_committed(200);
        notification.checkpointed(&outcome(CheckpointMode::Truncate, 200, 200, false));
        // The restarted log is smaller than before but still all new.
        notification.hub.dispatch_wal_committed(250);
        // A busy pass leaves the log in place.
        notification.checkpointed(&outcome(CheckpointMode::Passive, 250, 100, true));
        notification.hub.dispatch_wal_committed(260);
        notification.checkpointed(&outcome(CheckpointMode::Passive, 260, 260, false));
        notification.hub.dispatch_wal_committed(5);

        assert_eq!(*seen.lock().unwrap(), vec![200, 250, 10, 5]);
    }

    #[test]
    fn unset_reports_whether_a_name_was_removed() {
        let (_log, make) = recorder();
        let mut notification = Notification::new("/tmp/a.db");
        notification.set_sql_traced(ptr::null_mut(), 0, "x", make("x"));
        assert!(notification.unset(ptr::null_mut(), HookKind::SqlTraced, "x"));
        assert!(!notification.unset(ptr::null_mut(), HookKind::SqlTraced, "x"));
    }

    #[test]
    fn purge_clears_every_kind() {
        let (_log, make) = recorder();
        let mut notification = Notification::new("/tmp/a.db");
        notification.set_sql_traced(ptr::null_mut(), 0, "x", make("x"));
        notification.set_will_checkpoint(ptr::null_mut(), 0, "veto", Arc::new(|_path: &str| false));
        notification.purge(ptr::null_mut());
        assert!(notification.names(HookKind::SqlTraced).is_empty());
        assert!(notification.will_checkpoint());
    }

    #[test]
    fn key_pragmas_are_redacted_before_observers() {
        let seen = Arc::new(StdMutex::new(Vec::new()));
        let mut notification = Notification::new("/tmp/a.db");
        {
            let seen = Arc::clone(&seen);
            notification.set_sql_traced(
                ptr::null_mut(),
                0,
                "capture",
                Arc::new(move |sql: &str| seen.lock().unwrap().push(sql.to_string())),
            );
        }
        notification.hub.dispatch_sql_traced("PRAGMA key = 'secret'");
        assert_eq!(*seen.lock().unwrap(), vec![raw::REDACTED_KEY_PRAGMA]);
    }
}
