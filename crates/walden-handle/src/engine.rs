// SPDX-FileCopyrightText: 2026 Walden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Process-wide engine setup.
//!
//! The engine only accepts global configuration before its first connection
//! opens, so [`configure_engine`] runs at most once and must precede every
//! [`Handle::open`](crate::Handle::open).

use std::ffi::{c_char, c_int, c_void};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::ptr;
use std::sync::Mutex;

use rusqlite::ffi;
use tracing::{debug, info, warn};
use walden_config::model::EngineConfig;
use walden_core::WaldenError;

use crate::raw;

/// Global engine settings applied once per process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOptions {
    /// Run the engine in multi-thread mode: connections are not shared
    /// across threads, so the engine skips its per-connection mutexes.
    pub multithread: bool,
    /// Default and maximum memory-map size in bytes.
    pub mmap_size: Option<(i64, i64)>,
    /// Turn the engine's memory statistics on or off.
    pub memory_status: Option<bool>,
    /// Forward engine log lines to `tracing`.
    pub forward_log: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            multithread: true,
            mmap_size: None,
            memory_status: None,
            forward_log: true,
        }
    }
}

impl From<&EngineConfig> for EngineOptions {
    fn from(config: &EngineConfig) -> Self {
        Self {
            multithread: config.multithread,
            mmap_size: config.mmap_default_size.zip(config.mmap_max_size),
            memory_status: config.memory_status,
            forward_log: config.forward_log,
        }
    }
}

struct EngineState {
    configured: bool,
    in_use: bool,
}

static ENGINE: Mutex<EngineState> = Mutex::new(EngineState {
    configured: false,
    in_use: false,
});

fn state() -> std::sync::MutexGuard<'static, EngineState> {
    ENGINE.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Apply global engine settings.
///
/// Fails with [`WaldenError::EngineSetup`] when called a second time or
/// after any handle has been opened in this process.
pub fn configure_engine(options: &EngineOptions) -> Result<(), WaldenError> {
    let mut state = state();
    if state.configured {
        return Err(WaldenError::EngineSetup("engine is already configured".into()));
    }
    if state.in_use {
        return Err(WaldenError::EngineSetup(
            "engine must be configured before the first handle opens".into(),
        ));
    }

    if options.multithread {
        // SAFETY: no connection has been opened yet.
        let rc = unsafe { ffi::sqlite3_config(ffi::SQLITE_CONFIG_MULTITHREAD) };
        check(rc, "multithread")?;
    }
    if let Some((default_size, max_size)) = options.mmap_size {
        // SAFETY: as above; both arguments are 64-bit as the option expects.
        let rc = unsafe {
            ffi::sqlite3_config(
                ffi::SQLITE_CONFIG_MMAP_SIZE,
                default_size as ffi::sqlite3_int64,
                max_size as ffi::sqlite3_int64,
            )
        };
        check(rc, "mmap size")?;
    }
    if let Some(enabled) = options.memory_status {
        // SAFETY: as above.
        let rc = unsafe { ffi::sqlite3_config(ffi::SQLITE_CONFIG_MEMSTATUS, c_int::from(enabled)) };
        check(rc, "memory status")?;
    }
    if options.forward_log {
        // SAFETY: as above; the callback only touches `tracing`.
        let rc = unsafe {
            ffi::sqlite3_config(
                ffi::SQLITE_CONFIG_LOG,
                log_callback as unsafe extern "C" fn(*mut c_void, c_int, *const c_char),
                ptr::null_mut::<c_void>(),
            )
        };
        check(rc, "log forwarding")?;
    }

    state.configured = true;
    info!(
        multithread = options.multithread,
        mmap = ?options.mmap_size,
        memory_status = ?options.memory_status,
        forward_log = options.forward_log,
        "engine configured"
    );
    Ok(())
}

/// Record that a connection exists; later setup attempts are refused.
pub(crate) fn mark_in_use() {
    state().in_use = true;
}

fn check(rc: c_int, option: &str) -> Result<(), WaldenError> {
    if rc == ffi::SQLITE_OK {
        Ok(())
    } else {
        Err(WaldenError::EngineSetup(format!(
            "failed to apply {option}: {}",
            ffi::code_to_str(rc)
        )))
    }
}

unsafe extern "C" fn log_callback(_context: *mut c_void, code: c_int, message: *const c_char) {
    let _ = catch_unwind(AssertUnwindSafe(|| {
        // SAFETY: the engine passes a NUL-terminated message valid for this call.
        let message = unsafe { raw::text(message) }.unwrap_or_default();
        match code & 0xff {
            ffi::SQLITE_WARNING => warn!(target: "walden::sqlite", code, "{message}"),
            ffi::SQLITE_NOTICE => info!(target: "walden::sqlite", code, "{message}"),
            _ => debug!(target: "walden::sqlite", code, "{message}"),
        }
    }));
}
