// SPDX-FileCopyrightText: 2026 Walden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Walden connection layer.

use thiserror::Error;

use crate::record::ErrorRecord;

/// The primary error type returned by handles, statements, and configs.
#[derive(Debug, Error)]
pub enum WaldenError {
    /// The engine reported a failure that was not marked as ignorable.
    #[error("sqlite error: {0}")]
    Sqlite(Box<ErrorRecord>),

    /// The operation needs an opened handle.
    #[error("handle is not opened: {path}")]
    NotOpened { path: String },

    /// The statement was used before a successful `prepare`.
    #[error("statement is not prepared")]
    NotPrepared,

    /// An argument cannot be passed to the engine (interior NUL, oversized text).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Process-wide engine setup was attempted twice or too late.
    #[error("engine setup error: {0}")]
    EngineSetup(String),

    /// The configuration could not be loaded or validated.
    #[error("configuration error: {0}")]
    Config(String),
}

impl WaldenError {
    /// Returns the classified record when this error came from the engine.
    pub fn record(&self) -> Option<&ErrorRecord> {
        match self {
            WaldenError::Sqlite(record) => Some(record),
            _ => None,
        }
    }

    /// Returns the engine result code when this error came from the engine.
    pub fn code(&self) -> Option<i32> {
        self.record().map(|record| record.code)
    }
}

impl From<ErrorRecord> for WaldenError {
    fn from(record: ErrorRecord) -> Self {
        WaldenError::Sqlite(Box::new(record))
    }
}
