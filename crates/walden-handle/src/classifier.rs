// SPDX-FileCopyrightText: 2026 Walden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Decides whether an engine failure is a hard error or an expected outcome.
//!
//! A handle carries one [`Ignorable`] mask. Call sites that expect a
//! particular failure (probing for a table, compensating a failed commit)
//! widen the mask for exactly one operation through
//! [`Handle::ignoring`](crate::Handle::ignoring); everything else fails hard.

use walden_core::{ErrorRecord, Level, Notifier, WaldenError, INFO_PATH, INFO_SQL};

/// Which failure codes the next engine calls should treat as expected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Ignorable {
    /// Every failure is a hard error.
    #[default]
    Nothing,
    /// Failures with this primary result code are expected.
    Code(i32),
    /// Every failure is expected.
    Any,
}

impl Ignorable {
    /// Whether a failure with `code` is covered by this mask.
    pub fn covers(self, code: i32) -> bool {
        match self {
            Ignorable::Nothing => false,
            Ignorable::Code(ignored) => ignored == code,
            Ignorable::Any => true,
        }
    }
}

/// What the engine reported about one failing call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineFailure {
    pub code: i32,
    pub extended_code: Option<i32>,
    pub message: Option<String>,
}

/// The per-handle ignorable mask plus the last classified record.
#[derive(Debug, Default)]
pub struct ErrorClassifier {
    mask: Ignorable,
    last: Option<ErrorRecord>,
}

impl ErrorClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mask(&self) -> Ignorable {
        self.mask
    }

    /// Install `mask` and return the one it replaced.
    pub fn replace(&mut self, mask: Ignorable) -> Ignorable {
        std::mem::replace(&mut self.mask, mask)
    }

    pub fn mark_ignorable(&mut self, code: i32) {
        self.mask = Ignorable::Code(code);
    }

    pub fn mark_unignorable(&mut self) {
        self.mask = Ignorable::Nothing;
    }

    /// The most recent classified record, ignored or not.
    pub fn last_error(&self) -> Option<&ErrorRecord> {
        self.last.as_ref()
    }

    /// Classify one failure and report it to the process-wide notifier.
    ///
    /// Returns `Ok(())` when the mask covers the code, so the call site can
    /// carry on with its "expected" branch.
    pub fn classify(
        &mut self,
        failure: EngineFailure,
        path: &str,
        sql: Option<&str>,
    ) -> Result<(), WaldenError> {
        let level = if self.mask.covers(failure.code) {
            Level::Ignore
        } else {
            Level::Error
        };

        let mut record = ErrorRecord::new(failure.code)
            .with_level(level)
            .with_extended_code(failure.extended_code)
            .with_message(failure.message)
            .with_info(INFO_PATH, path);
        if let Some(sql) = sql {
            record.set_info(INFO_SQL, sql);
        }

        Notifier::shared().notify(&record);
        self.last = Some(record.clone());

        match level {
            Level::Ignore => Ok(()),
            Level::Error => Err(WaldenError::from(record)),
        }
    }
}
