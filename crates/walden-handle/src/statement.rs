// SPDX-FileCopyrightText: 2026 Walden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Prepared statements owned by a handle.
//!
//! A [`HandleStatement`] lives in its handle's pool and is reached through a
//! [`StatementRef`], which borrows the handle's connection and error
//! classifier alongside the statement so failures are classified the same
//! way as handle-level failures.

use std::ffi::{c_char, c_int, c_void};
use std::ops::{Deref, DerefMut};
use std::ptr;

use rusqlite::ffi;
use tracing::trace;
use walden_core::WaldenError;

use crate::classifier::ErrorClassifier;
use crate::raw;

/// Outcome of one `step`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// A result row is available.
    Row,
    /// The statement ran to completion.
    Done,
}

/// Storage class of a result column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    Float,
    Text,
    Blob,
    Null,
}

/// An owned column or parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Integer(i64),
    Float(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl Value {
    pub fn column_type(&self) -> ColumnType {
        match self {
            Value::Null => ColumnType::Null,
            Value::Integer(_) => ColumnType::Integer,
            Value::Float(_) => ColumnType::Float,
            Value::Text(_) => ColumnType::Text,
            Value::Blob(_) => ColumnType::Blob,
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Integer(i64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Value::Blob(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

/// One compiled statement.
///
/// Getters read the current row and return zero values when nothing is
/// prepared. Dropping the statement finalizes it.
pub struct HandleStatement {
    raw: *mut ffi::sqlite3_stmt,
    sql: Option<String>,
    done: bool,
}

impl std::fmt::Debug for HandleStatement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandleStatement")
            .field("sql", &self.sql)
            .field("prepared", &self.is_prepared())
            .field("done", &self.done)
            .finish()
    }
}

impl HandleStatement {
    pub(crate) fn new() -> Self {
        Self {
            raw: ptr::null_mut(),
            sql: None,
            done: false,
        }
    }

    pub fn is_prepared(&self) -> bool {
        !self.raw.is_null()
    }

    /// SQL of the prepared statement.
    pub fn sql(&self) -> Option<&str> {
        self.sql.as_deref()
    }

    /// Whether the last `step` reported completion.
    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn is_readonly(&self) -> bool {
        // SAFETY: `raw` is a live statement when non-null.
        self.is_prepared() && unsafe { ffi::sqlite3_stmt_readonly(self.raw) } != 0
    }

    /// Finalize the statement; a no-op when nothing is prepared.
    pub fn finalize(&mut self) {
        if self.raw.is_null() {
            return;
        }
        // SAFETY: `raw` is live and is nulled right after, so it is
        // finalized exactly once.
        unsafe { ffi::sqlite3_finalize(self.raw) };
        self.raw = ptr::null_mut();
        self.sql = None;
        self.done = false;
    }

    /// Rewind to before the first row. Bindings are kept.
    pub fn reset(&mut self) {
        if self.is_prepared() {
            // SAFETY: `raw` is a live statement.
            unsafe { ffi::sqlite3_reset(self.raw) };
        }
        self.done = false;
    }

    pub fn column_count(&self) -> usize {
        if !self.is_prepared() {
            return 0;
        }
        // SAFETY: `raw` is a live statement.
        let count = unsafe { ffi::sqlite3_column_count(self.raw) };
        usize::try_from(count).unwrap_or(0)
    }

    pub fn column_name(&self, index: usize) -> Option<String> {
        if !self.is_prepared() {
            return None;
        }
        // SAFETY: `raw` is live; the name is copied before any other call.
        unsafe { raw::text(ffi::sqlite3_column_name(self.raw, raw::c_index(index))) }
    }

    pub fn column_type(&self, index: usize) -> ColumnType {
        if !self.is_prepared() {
            return ColumnType::Null;
        }
        // SAFETY: `raw` is a live statement.
        match unsafe { ffi::sqlite3_column_type(self.raw, raw::c_index(index)) } {
            ffi::SQLITE_INTEGER => ColumnType::Integer,
            ffi::SQLITE_FLOAT => ColumnType::Float,
            ffi::SQLITE_TEXT => ColumnType::Text,
            ffi::SQLITE_BLOB => ColumnType::Blob,
            _ => ColumnType::Null,
        }
    }

    pub fn get_integer32(&self, index: usize) -> i32 {
        if !self.is_prepared() {
            return 0;
        }
        // SAFETY: `raw` is a live statement.
        unsafe { ffi::sqlite3_column_int(self.raw, raw::c_index(index)) }
    }

    pub fn get_integer64(&self, index: usize) -> i64 {
        if !self.is_prepared() {
            return 0;
        }
        // SAFETY: `raw` is a live statement.
        unsafe { ffi::sqlite3_column_int64(self.raw, raw::c_index(index)) }
    }

    pub fn get_double(&self, index: usize) -> f64 {
        if !self.is_prepared() {
            return 0.0;
        }
        // SAFETY: `raw` is a live statement.
        unsafe { ffi::sqlite3_column_double(self.raw, raw::c_index(index)) }
    }

    /// Column text; invalid UTF-8 is replaced.
    pub fn get_text(&self, index: usize) -> String {
        String::from_utf8_lossy(self.column_bytes(index, true)).into_owned()
    }

    pub fn get_blob(&self, index: usize) -> Vec<u8> {
        self.column_bytes(index, false).to_vec()
    }

    pub fn get_value(&self, index: usize) -> Value {
        match self.column_type(index) {
            ColumnType::Integer => Value::Integer(self.get_integer64(index)),
            ColumnType::Float => Value::Float(self.get_double(index)),
            ColumnType::Text => Value::Text(self.get_text(index)),
            ColumnType::Blob => Value::Blob(self.get_blob(index)),
            ColumnType::Null => Value::Null,
        }
    }

    /// Borrow the raw column bytes; valid until the next step or reset.
    fn column_bytes(&self, index: usize, as_text: bool) -> &[u8] {
        if !self.is_prepared() {
            return &[];
        }
        let index = raw::c_index(index);
        // SAFETY: `raw` is live. The text/blob accessor runs before
        // `sqlite3_column_bytes`, as the engine requires, and the buffer stays
        // valid while `self` is borrowed because stepping needs `&mut self`.
        unsafe {
            let data = if as_text {
                ffi::sqlite3_column_text(self.raw, index) as *const u8
            } else {
                ffi::sqlite3_column_blob(self.raw, index) as *const u8
            };
            if data.is_null() {
                return &[];
            }
            let len = usize::try_from(ffi::sqlite3_column_bytes(self.raw, index)).unwrap_or(0);
            std::slice::from_raw_parts(data, len)
        }
    }
}

impl Drop for HandleStatement {
    fn drop(&mut self) {
        self.finalize();
    }
}

/// A statement together with the handle state it reports failures to.
pub struct StatementRef<'a> {
    statement: &'a mut HandleStatement,
    db: *mut ffi::sqlite3,
    path: &'a str,
    classifier: &'a mut ErrorClassifier,
}

impl<'a> StatementRef<'a> {
    pub(crate) fn new(
        statement: &'a mut HandleStatement,
        db: *mut ffi::sqlite3,
        path: &'a str,
        classifier: &'a mut ErrorClassifier,
    ) -> Self {
        Self {
            statement,
            db,
            path,
            classifier,
        }
    }

    /// Compile `sql`, replacing whatever was prepared before.
    ///
    /// When the failure is covered by the handle's ignorable mask this
    /// returns `Ok(())` and the statement stays unprepared.
    pub fn prepare(&mut self, sql: &str) -> Result<(), WaldenError> {
        if self.db.is_null() {
            return Err(WaldenError::NotOpened {
                path: self.path.to_string(),
            });
        }
        self.statement.finalize();
        let len = raw::c_len(sql.len())?;
        let mut stmt = ptr::null_mut();
        // SAFETY: `db` is live; the SQL buffer and its length describe valid
        // UTF-8 that outlives the call.
        let rc = unsafe {
            ffi::sqlite3_prepare_v2(
                self.db,
                sql.as_ptr() as *const c_char,
                len,
                &mut stmt,
                ptr::null_mut(),
            )
        };
        if rc != ffi::SQLITE_OK {
            if !stmt.is_null() {
                // SAFETY: a partially prepared statement is still ours to free.
                unsafe { ffi::sqlite3_finalize(stmt) };
            }
            return self.fail(rc, Some(sql));
        }
        trace!(path = self.path, sql, "statement prepared");
        self.statement.raw = stmt;
        self.statement.sql = Some(sql.to_string());
        self.statement.done = false;
        Ok(())
    }

    /// Advance to the next row.
    ///
    /// An ignored failure reports [`Step::Done`].
    pub fn step(&mut self) -> Result<Step, WaldenError> {
        let stmt = self.prepared()?;
        // SAFETY: `stmt` is a live statement on a live connection.
        let rc = unsafe { ffi::sqlite3_step(stmt) };
        match rc {
            ffi::SQLITE_ROW => {
                self.statement.done = false;
                Ok(Step::Row)
            }
            ffi::SQLITE_DONE => {
                self.statement.done = true;
                Ok(Step::Done)
            }
            _ => {
                let sql = self.statement.sql.clone();
                self.fail(rc, sql.as_deref())?;
                self.statement.done = true;
                Ok(Step::Done)
            }
        }
    }

    pub fn bind_null(&mut self, index: usize) -> Result<(), WaldenError> {
        let stmt = self.prepared()?;
        // SAFETY: `stmt` is live.
        let rc = unsafe { ffi::sqlite3_bind_null(stmt, raw::c_index(index)) };
        self.check_bind(rc)
    }

    pub fn bind_integer32(&mut self, value: i32, index: usize) -> Result<(), WaldenError> {
        let stmt = self.prepared()?;
        // SAFETY: `stmt` is live.
        let rc = unsafe { ffi::sqlite3_bind_int(stmt, raw::c_index(index), value) };
        self.check_bind(rc)
    }

    pub fn bind_integer64(&mut self, value: i64, index: usize) -> Result<(), WaldenError> {
        let stmt = self.prepared()?;
        // SAFETY: `stmt` is live.
        let rc = unsafe { ffi::sqlite3_bind_int64(stmt, raw::c_index(index), value) };
        self.check_bind(rc)
    }

    pub fn bind_double(&mut self, value: f64, index: usize) -> Result<(), WaldenError> {
        let stmt = self.prepared()?;
        // SAFETY: `stmt` is live.
        let rc = unsafe { ffi::sqlite3_bind_double(stmt, raw::c_index(index), value) };
        self.check_bind(rc)
    }

    pub fn bind_text(&mut self, value: &str, index: usize) -> Result<(), WaldenError> {
        let stmt = self.prepared()?;
        let len = raw::c_len(value.len())?;
        // SAFETY: `stmt` is live; the engine copies the text (SQLITE_TRANSIENT).
        let rc = unsafe {
            ffi::sqlite3_bind_text(
                stmt,
                raw::c_index(index),
                value.as_ptr() as *const c_char,
                len,
                ffi::SQLITE_TRANSIENT(),
            )
        };
        self.check_bind(rc)
    }

    pub fn bind_blob(&mut self, value: &[u8], index: usize) -> Result<(), WaldenError> {
        let stmt = self.prepared()?;
        let len = raw::c_len(value.len())?;
        let index = raw::c_index(index);
        // SAFETY: `stmt` is live; the engine copies the bytes (SQLITE_TRANSIENT).
        let rc = unsafe {
            if value.is_empty() {
                ffi::sqlite3_bind_zeroblob(stmt, index, 0)
            } else {
                ffi::sqlite3_bind_blob(
                    stmt,
                    index,
                    value.as_ptr() as *const c_void,
                    len,
                    ffi::SQLITE_TRANSIENT(),
                )
            }
        };
        self.check_bind(rc)
    }

    pub fn bind(&mut self, value: &Value, index: usize) -> Result<(), WaldenError> {
        match value {
            Value::Null => self.bind_null(index),
            Value::Integer(v) => self.bind_integer64(*v, index),
            Value::Float(v) => self.bind_double(*v, index),
            Value::Text(v) => self.bind_text(v, index),
            Value::Blob(v) => self.bind_blob(v, index),
        }
    }

    fn prepared(&self) -> Result<*mut ffi::sqlite3_stmt, WaldenError> {
        if self.statement.is_prepared() {
            Ok(self.statement.raw)
        } else {
            Err(WaldenError::NotPrepared)
        }
    }

    fn check_bind(&mut self, rc: c_int) -> Result<(), WaldenError> {
        if rc == ffi::SQLITE_OK {
            return Ok(());
        }
        let sql = self.statement.sql.clone();
        self.fail(rc, sql.as_deref())
    }

    fn fail(&mut self, rc: c_int, sql: Option<&str>) -> Result<(), WaldenError> {
        let failure = raw::engine_failure(self.db, rc);
        self.classifier.classify(failure, self.path, sql)
    }
}

impl Deref for StatementRef<'_> {
    type Target = HandleStatement;

    fn deref(&self) -> &HandleStatement {
        self.statement
    }
}

impl DerefMut for StatementRef<'_> {
    fn deref_mut(&mut self) -> &mut HandleStatement {
        self.statement
    }
}
