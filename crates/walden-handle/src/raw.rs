// SPDX-FileCopyrightText: 2026 Walden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Small helpers around the engine's C API.

use std::borrow::Cow;
use std::ffi::{c_char, c_int, CStr, CString};

use rusqlite::ffi;
use walden_core::WaldenError;

use crate::classifier::EngineFailure;

/// Read the failure details the engine attached to `db` after `rc`.
///
/// The extended code is not meaningful for misuse errors and is skipped.
pub(crate) fn engine_failure(db: *mut ffi::sqlite3, rc: c_int) -> EngineFailure {
    if db.is_null() {
        return EngineFailure {
            code: rc,
            extended_code: None,
            message: Some(ffi::code_to_str(rc).to_string()),
        };
    }
    let extended_code = if rc != ffi::SQLITE_MISUSE {
        // SAFETY: `db` is a live connection owned by the caller.
        Some(unsafe { ffi::sqlite3_extended_errcode(db) })
    } else {
        None
    };
    // SAFETY: `db` is live; the message pointer is valid until the next API call.
    let message = unsafe { text(ffi::sqlite3_errmsg(db)) };
    EngineFailure {
        code: rc,
        extended_code,
        message,
    }
}

/// Copy a NUL-terminated engine string.
///
/// # Safety
/// `ptr` must be null or point to a NUL-terminated string that stays valid
/// for the duration of the call.
pub(crate) unsafe fn text(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        None
    } else {
        Some(unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned())
    }
}

pub(crate) fn c_string(value: &str) -> Result<CString, WaldenError> {
    CString::new(value)
        .map_err(|_| WaldenError::InvalidArgument(format!("interior NUL byte in {value:?}")))
}

pub(crate) fn c_len(len: usize) -> Result<c_int, WaldenError> {
    c_int::try_from(len)
        .map_err(|_| WaldenError::InvalidArgument(format!("{len} bytes exceeds engine limit")))
}

/// Engine column/parameter index; out-of-range values read as NULL.
pub(crate) fn c_index(index: usize) -> c_int {
    c_int::try_from(index).unwrap_or(c_int::MAX)
}

/// Double-quoted SQL identifier.
pub(crate) fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Single-quoted SQL string literal.
pub(crate) fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Hide key material in `PRAGMA key` / `PRAGMA rekey` text before it reaches a log.
pub(crate) fn redact_key_pragma(sql: &str) -> Cow<'_, str> {
    let normalized: String = sql
        .trim_start()
        .chars()
        .take(16)
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_ascii_lowercase();
    if normalized.starts_with("pragmakey") || normalized.starts_with("pragmarekey") {
        Cow::Borrowed(REDACTED_KEY_PRAGMA)
    } else {
        Cow::Borrowed(sql)
    }
}

pub(crate) const REDACTED_KEY_PRAGMA: &str = "PRAGMA key = <redacted>";
