// SPDX-FileCopyrightText: 2026 Walden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Connection handles for the Walden layer.
//!
//! A [`Handle`] wraps one SQLite connection and coordinates what happens
//! around every statement on it:
//! - nested transactions, mapped onto savepoints below one real transaction;
//! - an ordered registry of named observers for traces, commits and
//!   checkpoints, where will-checkpoint observers can veto;
//! - classification of engine failures into hard errors and expected
//!   outcomes, with every failure reported to [`walden_core::Notifier`].
//!
//! ```no_run
//! use walden_handle::Handle;
//!
//! let mut handle = Handle::new("/tmp/app.db");
//! handle.open()?;
//! handle.begin_nested_transaction()?;
//! handle.execute("CREATE TABLE IF NOT EXISTS kv(k TEXT PRIMARY KEY, v BLOB)")?;
//! handle.commit_or_rollback_nested_transaction()?;
//! assert!(handle.table_exists("kv")?);
//! # Ok::<(), walden_core::WaldenError>(())
//! ```

pub mod classifier;
pub mod configs;
pub mod engine;
pub mod handle;
pub mod notification;
pub mod pool;
mod raw;
pub mod statement;
pub mod transaction;

pub use classifier::{ErrorClassifier, Ignorable};
pub use configs::{BasicConfig, CipherConfig, HandleConfig, TraceConfig};
pub use engine::{configure_engine, EngineOptions};
pub use handle::{Handle, IgnoreScope, InterruptHandle, JOURNAL_SUFFIX, SHM_SUFFIX, WAL_SUFFIX};
pub use notification::{
    CheckpointOutcome, CheckpointedNotification, CommittedNotification, HookKind,
    PerformanceInfo, PerformanceTracedNotification, SqlTracedNotification,
    WillCheckpointNotification,
};
pub use pool::StatementId;
pub use statement::{ColumnType, HandleStatement, Step, StatementRef, Value};
pub use transaction::DEFAULT_SAVEPOINT_PREFIX;
