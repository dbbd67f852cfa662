// SPDX-FileCopyrightText: 2026 Walden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The connection aggregate.
//!
//! A [`Handle`] is the only place that talks to the engine. It owns the
//! native connection, the statement pool, the savepoint stack, the error
//! classifier and the notification registry, and tears all of them down in a
//! fixed order on close.

use std::collections::BTreeSet;
use std::ffi::c_int;
use std::ops::{Deref, DerefMut};
use std::ptr;
use std::sync::{Arc, Mutex, MutexGuard};

/// `rusqlite::ffi` plus `sqlite3_close_v2`, which the pre-generated
/// bindings for the bundled SQLCipher build omit even though the symbol is
/// compiled into the library.
mod ffi {
    pub use rusqlite::ffi::*;

    unsafe extern "C" {
        pub fn sqlite3_close_v2(db: *mut sqlite3) -> std::ffi::c_int;
    }
}
use tracing::{debug, warn};
use walden_core::{CheckpointMode, ErrorRecord, WaldenError};
use zeroize::Zeroizing;

use crate::classifier::{ErrorClassifier, Ignorable};
use crate::configs::HandleConfig;
use crate::engine;
use crate::notification::{
    CheckpointOutcome, CheckpointedNotification, CommittedNotification, HookKind, Notification,
    PerformanceTracedNotification, SqlTracedNotification, WillCheckpointNotification,
};
use crate::pool::{StatementId, StatementPool};
use crate::raw;
use crate::statement::{Step, StatementRef};
use crate::transaction::{SavepointStack, DEFAULT_SAVEPOINT_PREFIX};

pub const SHM_SUFFIX: &str = "-shm";
pub const WAL_SUFFIX: &str = "-wal";
pub const JOURNAL_SUFFIX: &str = "-journal";

/// `SQLITE_DBCONFIG_NO_CKPT_ON_CLOSE`
const DBCONFIG_NO_CKPT_ON_CLOSE: c_int = 1006;
/// Name of the will-checkpoint veto installed while closing.
const CLOSE_VETO: &str = "close";
/// Stands in for SQL text that carries key material.
const CIPHER_KEY_LABEL: &str = "PRAGMA key";

struct RawConnection(*mut ffi::sqlite3);

// SAFETY: the pointer is only handed to `sqlite3_interrupt`, which the engine
// documents as safe to call from any thread while the connection is open,
// and the slot is nulled under its mutex before the connection closes.
unsafe impl Send for RawConnection {}

/// Interrupts the running engine call of a handle from another thread.
///
/// Becomes a no-op once the handle closes.
#[derive(Clone)]
pub struct InterruptHandle {
    slot: Arc<Mutex<RawConnection>>,
}

impl InterruptHandle {
    pub fn interrupt(&self) {
        let slot = lock_slot(&self.slot);
        if !slot.0.is_null() {
            // SAFETY: non-null only while the connection is open; close
            // clears the slot under the same lock first.
            unsafe { ffi::sqlite3_interrupt(slot.0) };
        }
    }
}

impl std::fmt::Debug for InterruptHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterruptHandle").finish_non_exhaustive()
    }
}

fn lock_slot(slot: &Mutex<RawConnection>) -> MutexGuard<'_, RawConnection> {
    slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// One connection to one database file.
pub struct Handle {
    path: String,
    raw: *mut ffi::sqlite3,
    interrupt_slot: Arc<Mutex<RawConnection>>,
    classifier: ErrorClassifier,
    statements: StatementPool,
    pub(crate) savepoints: SavepointStack,
    notification: Notification,
}

// SAFETY: a handle owns its connection and every statement prepared on it;
// moving all of them to another thread together is allowed by the engine.
// The handle is not `Sync`, so no two threads use the connection at once.
unsafe impl Send for Handle {}

impl std::fmt::Debug for Handle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handle")
            .field("path", &self.path)
            .field("opened", &self.is_opened())
            .field("nested_level", &self.savepoints.depth())
            .field("statements", &self.statements.len())
            .finish()
    }
}

impl Handle {
    pub fn new(path: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            notification: Notification::new(&path),
            path,
            raw: ptr::null_mut(),
            interrupt_slot: Arc::new(Mutex::new(RawConnection(ptr::null_mut()))),
            classifier: ErrorClassifier::new(),
            statements: StatementPool::default(),
            savepoints: SavepointStack::new(DEFAULT_SAVEPOINT_PREFIX),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Change the database path. Ignored with a warning once opened.
    pub fn set_path(&mut self, path: impl Into<String>) {
        let path = path.into();
        if self.is_opened() {
            warn!(path = %self.path, requested = %path, "path cannot change on an opened handle");
            return;
        }
        self.notification = Notification::new(&path);
        self.path = path;
    }

    pub fn shm_path(&self) -> String {
        format!("{}{SHM_SUFFIX}", self.path)
    }

    pub fn wal_path(&self) -> String {
        format!("{}{WAL_SUFFIX}", self.path)
    }

    pub fn journal_path(&self) -> String {
        format!("{}{JOURNAL_SUFFIX}", self.path)
    }

    // -- lifecycle -------------------------------------------------------

    pub fn open(&mut self) -> Result<(), WaldenError> {
        if self.is_opened() {
            return Ok(());
        }
        engine::mark_in_use();
        let c_path = raw::c_string(&self.path)?;
        let mut db = ptr::null_mut();
        let flags = ffi::SQLITE_OPEN_READWRITE | ffi::SQLITE_OPEN_CREATE;
        // SAFETY: `c_path` is NUL-terminated and `db` is a valid out-pointer.
        let rc = unsafe { ffi::sqlite3_open_v2(c_path.as_ptr(), &mut db, flags, ptr::null()) };
        if rc != ffi::SQLITE_OK {
            let failure = raw::engine_failure(db, rc);
            if !db.is_null() {
                // SAFETY: the engine allocates a connection even on most
                // open failures; it must still be released.
                unsafe { ffi::sqlite3_close_v2(db) };
            }
            return self.classifier.classify(failure, &self.path, None);
        }
        self.raw = db;
        lock_slot(&self.interrupt_slot).0 = db;
        debug!(path = %self.path, "handle opened");
        Ok(())
    }

    pub fn is_opened(&self) -> bool {
        !self.raw.is_null()
    }

    /// Close the connection. Always completes; safe to call repeatedly.
    ///
    /// Statements still prepared are finalized and an open transaction is
    /// rolled back, each with a warning. A built-in will-checkpoint veto
    /// keeps the engine from checkpointing while the connection closes.
    pub fn close(&mut self) {
        if self.raw.is_null() {
            return;
        }
        self.finalize_statements();

        let depth = self.savepoints.depth();
        if depth != 0 || self.is_in_transaction() {
            warn!(path = %self.path, depth, "transaction still open at close, rolling back");
            self.rollback_transaction();
        }

        self.notification.purge(self.raw);
        // A null connection keeps the WAL hook detached after the purge.
        self.notification.set_will_checkpoint(
            ptr::null_mut(),
            i32::MIN,
            CLOSE_VETO,
            Arc::new(|_path: &str| false),
        );
        if !self.notification.will_checkpoint() {
            // SAFETY: `raw` is live; the option takes an int and an out-pointer.
            unsafe {
                ffi::sqlite3_db_config(
                    self.raw,
                    DBCONFIG_NO_CKPT_ON_CLOSE,
                    1 as c_int,
                    ptr::null_mut::<c_int>(),
                )
            };
        }

        lock_slot(&self.interrupt_slot).0 = ptr::null_mut();
        // SAFETY: every statement was finalized above and the hooks detached;
        // the pointer is not used again.
        let rc = unsafe { ffi::sqlite3_close_v2(self.raw) };
        if rc != ffi::SQLITE_OK {
            warn!(path = %self.path, rc, "engine reported a failure while closing");
        }
        self.raw = ptr::null_mut();
        self.notification.purge(ptr::null_mut());
        debug!(path = %self.path, "handle closed");
    }

    // -- direct execution ------------------------------------------------

    /// Run one SQL text without parameters.
    pub fn execute(&mut self, sql: &str) -> Result<(), WaldenError> {
        self.execute_as(sql, sql)
    }

    /// Run `sql`, reporting failures against `label`.
    fn execute_as(&mut self, sql: &str, label: &str) -> Result<(), WaldenError> {
        let db = self.opened()?;
        let c_sql = raw::c_string(sql)?;
        // SAFETY: `db` is live and `c_sql` is NUL-terminated.
        let rc = unsafe {
            ffi::sqlite3_exec(db, c_sql.as_ptr(), None, ptr::null_mut(), ptr::null_mut())
        };
        if rc == ffi::SQLITE_OK {
            Ok(())
        } else {
            self.fail(rc, Some(label))
        }
    }

    pub fn last_inserted_row_id(&self) -> Result<i64, WaldenError> {
        let db = self.opened()?;
        // SAFETY: `db` is live.
        Ok(unsafe { ffi::sqlite3_last_insert_rowid(db) })
    }

    /// Rows changed by the most recent statement.
    pub fn changes(&self) -> Result<i32, WaldenError> {
        let db = self.opened()?;
        // SAFETY: `db` is live.
        Ok(unsafe { ffi::sqlite3_changes(db) })
    }

    pub fn is_readonly(&self) -> Result<bool, WaldenError> {
        let db = self.opened()?;
        // SAFETY: `db` is live and the schema name is NUL-terminated.
        Ok(unsafe { ffi::sqlite3_db_readonly(db, c"main".as_ptr()) } == 1)
    }

    /// Whether the engine has left autocommit mode. False when closed.
    pub fn is_in_transaction(&self) -> bool {
        // SAFETY: `raw` is live when non-null.
        !self.raw.is_null() && unsafe { ffi::sqlite3_get_autocommit(self.raw) } == 0
    }

    pub fn result_code(&self) -> Result<i32, WaldenError> {
        let db = self.opened()?;
        // SAFETY: `db` is live.
        Ok(unsafe { ffi::sqlite3_errcode(db) })
    }

    pub fn extended_error_code(&self) -> Result<i32, WaldenError> {
        let db = self.opened()?;
        // SAFETY: `db` is live.
        Ok(unsafe { ffi::sqlite3_extended_errcode(db) })
    }

    pub fn error_message(&self) -> Result<String, WaldenError> {
        let db = self.opened()?;
        // SAFETY: `db` is live; the message is copied before the next call.
        Ok(unsafe { raw::text(ffi::sqlite3_errmsg(db)) }.unwrap_or_default())
    }

    pub fn interrupt(&self) {
        self.interrupt_handle().interrupt();
    }

    pub fn interrupt_handle(&self) -> InterruptHandle {
        InterruptHandle {
            slot: Arc::clone(&self.interrupt_slot),
        }
    }

    // -- error classification --------------------------------------------

    /// Treat failures matching `mask` as expected until the scope drops.
    ///
    /// The previous mask is restored on every exit path.
    pub fn ignoring(&mut self, mask: Ignorable) -> IgnoreScope<'_> {
        let previous = self.classifier.replace(mask);
        IgnoreScope {
            handle: self,
            previous,
        }
    }

    pub fn mark_error_as_ignorable(&mut self, code: i32) {
        self.classifier.mark_ignorable(code);
    }

    pub fn mark_error_as_unignorable(&mut self) {
        self.classifier.mark_unignorable();
    }

    /// The most recent classified failure on this handle.
    pub fn last_error(&self) -> Option<&ErrorRecord> {
        self.classifier.last_error()
    }

    fn fail(&mut self, rc: c_int, sql: Option<&str>) -> Result<(), WaldenError> {
        let failure = raw::engine_failure(self.raw, rc);
        self.classifier.classify(failure, &self.path, sql)
    }

    fn opened(&self) -> Result<*mut ffi::sqlite3, WaldenError> {
        if self.raw.is_null() {
            Err(WaldenError::NotOpened {
                path: self.path.clone(),
            })
        } else {
            Ok(self.raw)
        }
    }

    // -- statements ------------------------------------------------------

    pub fn get_statement(&mut self) -> StatementId {
        self.statements.acquire()
    }

    pub fn statement(&mut self, id: StatementId) -> Option<StatementRef<'_>> {
        let statement = self.statements.get_mut(id)?;
        Some(StatementRef::new(
            statement,
            self.raw,
            &self.path,
            &mut self.classifier,
        ))
    }

    /// Drop a statement from the pool, finalizing it.
    pub fn return_statement(&mut self, id: StatementId) {
        self.statements.release(id);
    }

    pub fn statement_count(&self) -> usize {
        self.statements.len()
    }

    fn finalize_statements(&mut self) {
        let leaked = self.statements.finalize_all(&self.path);
        if leaked > 0 {
            warn!(path = %self.path, leaked, "statements left prepared by callers were finalized");
        }
    }

    /// Run `body` on a fresh pooled statement and return it to the pool
    /// afterwards, whatever the outcome.
    fn with_statement<T>(
        &mut self,
        body: impl FnOnce(&mut StatementRef<'_>) -> Result<T, WaldenError>,
    ) -> Result<T, WaldenError> {
        let id = self.get_statement();
        let result = match self.statement(id) {
            Some(mut statement) => body(&mut statement),
            None => Err(WaldenError::NotPrepared),
        };
        self.return_statement(id);
        result
    }

    // -- schema probes ---------------------------------------------------

    /// Whether `table` exists. A missing table is an expected answer, not
    /// an error.
    pub fn table_exists(&mut self, table: &str) -> Result<bool, WaldenError> {
        let sql = format!("SELECT 1 FROM {} LIMIT 0", raw::quote_identifier(table));
        let mut scope = self.ignoring(Ignorable::Code(ffi::SQLITE_ERROR));
        scope.with_statement(|statement| {
            statement.prepare(&sql)?;
            if !statement.is_prepared() {
                return Ok(false);
            }
            statement.step()?;
            Ok(true)
        })
    }

    /// Column names of `schema.table`; empty when the table does not exist.
    pub fn get_columns(&mut self, schema: &str, table: &str) -> Result<BTreeSet<String>, WaldenError> {
        let sql = format!(
            "PRAGMA {}.table_info({})",
            raw::quote_identifier(schema),
            raw::quote_literal(table)
        );
        self.get_values(&sql, 1)
    }

    /// Text of column `index` across every row `sql` returns.
    pub fn get_values(&mut self, sql: &str, index: usize) -> Result<BTreeSet<String>, WaldenError> {
        self.with_statement(|statement| {
            statement.prepare(sql)?;
            if !statement.is_prepared() {
                return Err(WaldenError::NotPrepared);
            }
            let mut values = BTreeSet::new();
            while statement.step()? == Step::Row {
                values.insert(statement.get_text(index));
            }
            Ok(values)
        })
    }

    // -- cipher ----------------------------------------------------------

    /// Key an encrypted database. 32- and 48-byte keys are raw keys (with
    /// and without salt); anything else is a UTF-8 passphrase.
    pub fn set_cipher_key(&mut self, key: &[u8]) -> Result<(), WaldenError> {
        if key.is_empty() {
            return Err(WaldenError::InvalidArgument("cipher key is empty".into()));
        }
        let sql = match key.len() {
            32 | 48 => Zeroizing::new(format!(
                "PRAGMA key = \"x'{}'\"",
                Zeroizing::new(hex::encode(key)).as_str()
            )),
            _ => {
                let passphrase = std::str::from_utf8(key).map_err(|_| {
                    WaldenError::InvalidArgument("cipher passphrase is not UTF-8".into())
                })?;
                Zeroizing::new(format!("PRAGMA key = {}", raw::quote_literal(passphrase)))
            }
        };
        self.execute_as(&sql, CIPHER_KEY_LABEL)
    }

    // -- configs ---------------------------------------------------------

    pub fn install(&mut self, config: &dyn HandleConfig) -> Result<(), WaldenError> {
        debug!(path = %self.path, config = config.name(), "installing config");
        config.invoke(self)
    }

    pub fn uninstall(&mut self, config: &dyn HandleConfig) -> Result<(), WaldenError> {
        debug!(path = %self.path, config = config.name(), "uninstalling config");
        config.uninvoke(self)
    }

    // -- notifications ---------------------------------------------------

    pub fn set_notification_when_sql_traced(
        &mut self,
        order: i32,
        name: &str,
        callback: SqlTracedNotification,
    ) -> Result<(), WaldenError> {
        let db = self.opened()?;
        self.notification.set_sql_traced(db, order, name, callback);
        Ok(())
    }

    pub fn set_notification_when_performance_traced(
        &mut self,
        order: i32,
        name: &str,
        callback: PerformanceTracedNotification,
    ) -> Result<(), WaldenError> {
        let db = self.opened()?;
        self.notification
            .set_performance_traced(db, order, name, callback);
        Ok(())
    }

    /// Observe real commits. Page counts are only reported in WAL mode.
    pub fn set_notification_when_committed(
        &mut self,
        order: i32,
        name: &str,
        callback: CommittedNotification,
    ) -> Result<(), WaldenError> {
        let db = self.opened()?;
        self.notification.set_committed(db, order, name, callback);
        Ok(())
    }

    pub fn set_notification_when_will_checkpoint(
        &mut self,
        order: i32,
        name: &str,
        callback: WillCheckpointNotification,
    ) -> Result<(), WaldenError> {
        let db = self.opened()?;
        self.notification.set_will_checkpoint(db, order, name, callback);
        Ok(())
    }

    pub fn set_notification_when_checkpointed(
        &mut self,
        order: i32,
        name: &str,
        callback: CheckpointedNotification,
    ) -> Result<(), WaldenError> {
        self.opened()?;
        self.notification.set_checkpointed(order, name, callback);
        Ok(())
    }

    /// Remove a named observer. Returns whether one was registered.
    pub fn unset_notification(&mut self, kind: HookKind, name: &str) -> Result<bool, WaldenError> {
        let db = self.opened()?;
        Ok(self.notification.unset(db, kind, name))
    }

    /// Registered observer names of one kind, in call order.
    pub fn notification_names(&self, kind: HookKind) -> Vec<String> {
        self.notification.names(kind)
    }

    // -- checkpoint ------------------------------------------------------

    /// Fold the write-ahead log back into the database.
    ///
    /// Returns `Ok(None)` only when a will-checkpoint observer vetoed the
    /// pass. A failure ignored through the error mask comes back as a busy
    /// outcome and is not reported to checkpointed observers.
    pub fn checkpoint(&mut self, mode: CheckpointMode) -> Result<Option<CheckpointOutcome>, WaldenError> {
        let db = self.opened()?;
        if !self.notification.will_checkpoint() {
            debug!(path = %self.path, %mode, "checkpoint vetoed");
            return Ok(None);
        }
        let mut log_frames: c_int = -1;
        let mut checkpointed_frames: c_int = -1;
        // SAFETY: `db` is live; a null schema checkpoints every attached database.
        let rc = unsafe {
            ffi::sqlite3_wal_checkpoint_v2(
                db,
                ptr::null(),
                mode.as_raw(),
                &mut log_frames,
                &mut checkpointed_frames,
            )
        };
        if rc != ffi::SQLITE_OK && rc != ffi::SQLITE_BUSY {
            self.fail(rc, None)?;
            return Ok(Some(CheckpointOutcome {
                mode,
                log_frames,
                checkpointed_frames,
                busy: true,
            }));
        }
        let outcome = CheckpointOutcome {
            mode,
            log_frames,
            checkpointed_frames,
            busy: rc == ffi::SQLITE_BUSY,
        };
        debug!(
            path = %self.path,
            %mode,
            log_frames,
            checkpointed_frames,
            busy = outcome.busy,
            "checkpoint finished"
        );
        self.notification.checkpointed(&outcome);
        Ok(Some(outcome))
    }
}

impl Drop for Handle {
    fn drop(&mut self) {
        self.close();
    }
}

/// Restores the handle's previous ignorable mask when dropped.
pub struct IgnoreScope<'a> {
    handle: &'a mut Handle,
    previous: Ignorable,
}

impl Deref for IgnoreScope<'_> {
    type Target = Handle;

    fn deref(&self) -> &Handle {
        self.handle
    }
}

impl DerefMut for IgnoreScope<'_> {
    fn deref_mut(&mut self) -> &mut Handle {
        self.handle
    }
}

impl Drop for IgnoreScope<'_> {
    fn drop(&mut self) {
        self.handle.classifier.replace(self.previous);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    fn memory() -> Handle {
        let mut handle = Handle::new(":memory:");
        handle.open().expect("in-memory database opens");
        handle
    }

    #[test]
    fn suffixes_follow_engine_convention() {
        let handle = Handle::new("/data/app.db");
        assert_eq!(handle.wal_path(), "/data/app.db-wal");
        assert_eq!(handle.shm_path(), "/data/app.db-shm");
        assert_eq!(handle.journal_path(), "/data/app.db-journal");
    }

    #[test]
    fn open_and_close_are_idempotent() {
        let mut handle = memory();
        handle.open().unwrap();
        assert!(handle.is_opened());
        handle.close();
        handle.close();
        assert!(!handle.is_opened());
    }

    #[test]
    fn accessors_need_an_open_handle() {
        let handle = Handle::new(":memory:");
        assert!(matches!(handle.changes(), Err(WaldenError::NotOpened { .. })));
        assert!(matches!(handle.is_readonly(), Err(WaldenError::NotOpened { .. })));
        assert!(!handle.is_in_transaction());
    }

    #[test]
    fn set_path_is_ignored_once_opened() {
        let mut handle = memory();
        handle.set_path("/elsewhere.db");
        assert_eq!(handle.path(), ":memory:");
        handle.close();
        handle.set_path("/elsewhere.db");
        assert_eq!(handle.path(), "/elsewhere.db");
    }

    #[test]
    fn ignore_scope_restores_previous_mask() {
        let mut handle = memory();
        handle.mark_error_as_ignorable(ffi::SQLITE_CONSTRAINT);
        {
            let scope = handle.ignoring(Ignorable::Any);
            assert_eq!(scope.classifier.mask(), Ignorable::Any);
        }
        assert_eq!(handle.classifier.mask(), Ignorable::Code(ffi::SQLITE_CONSTRAINT));
    }

    #[test]
    fn execute_failure_carries_sql_and_path() {
        let mut handle = memory();
        let err = handle.execute("SELEKT 1").unwrap_err();
        let record = err.record().expect("engine failure");
        assert_eq!(record.code, ffi::SQLITE_ERROR);
        assert_eq!(record.sql(), Some("SELEKT 1"));
        assert_eq!(record.path(), Some(":memory:"));
    }

    #[test]
    fn cipher_key_text_never_reaches_error_records() {
        let mut handle = memory();
        // A passphrase containing an interior quote still produces valid SQL;
        // whatever the engine reports, the key must not appear in the record.
        let _ = handle.set_cipher_key(b"it's secret");
        if let Some(record) = handle.last_error() {
            assert_eq!(record.sql(), Some(CIPHER_KEY_LABEL));
        }
    }

    #[test]
    fn empty_cipher_key_is_rejected() {
        let mut handle = memory();
        assert!(matches!(
            handle.set_cipher_key(b""),
            Err(WaldenError::InvalidArgument(_))
        ));
    }

    #[test]
    #[traced_test]
    fn close_finalizes_leaked_statements_with_warning() {
        let mut handle = memory();
        let id = handle.get_statement();
        handle.statement(id).unwrap().prepare("SELECT 1").unwrap();
        handle.close();
        assert!(!handle.is_opened());
        assert!(logs_contain("statement still prepared at close"));
    }

    #[test]
    #[traced_test]
    fn close_rolls_back_open_transaction_with_warning() {
        let mut handle = memory();
        handle.execute("CREATE TABLE t(v)").unwrap();
        handle.begin_nested_transaction().unwrap();
        handle.begin_nested_transaction().unwrap();
        handle.close();
        assert!(!handle.is_opened());
        assert!(logs_contain("transaction still open at close"));
    }

    #[test]
    fn interrupt_handle_outlives_close() {
        let mut handle = memory();
        let interrupt = handle.interrupt_handle();
        handle.close();
        interrupt.interrupt();
    }

    #[test]
    fn registration_needs_an_open_handle() {
        let mut handle = Handle::new(":memory:");
        let result = handle.set_notification_when_will_checkpoint(0, "x", Arc::new(|_path: &str| true));
        assert!(matches!(result, Err(WaldenError::NotOpened { .. })));
        assert!(matches!(
            handle.unset_notification(HookKind::WillCheckpoint, "x"),
            Err(WaldenError::NotOpened { .. })
        ));
    }
}
