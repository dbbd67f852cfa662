// SPDX-FileCopyrightText: 2026 Walden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Flat and nested transactions.
//!
//! The outermost level is a real `BEGIN IMMEDIATE` transaction; every level
//! below it is a named savepoint. Savepoint names carry a token that is never
//! reused on the same handle, so a name always refers to exactly one frame.

use tracing::{debug, warn};
use walden_core::WaldenError;

use crate::classifier::Ignorable;
use crate::handle::Handle;

/// Prefix of savepoint names unless the handle is told otherwise.
pub const DEFAULT_SAVEPOINT_PREFIX: &str = "walden_savepoint_";

#[derive(Debug)]
pub(crate) struct SavepointStack {
    prefix: String,
    frames: Vec<String>,
    next_token: u64,
}

impl SavepointStack {
    pub(crate) fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            frames: Vec::new(),
            next_token: 0,
        }
    }

    pub(crate) fn push(&mut self) -> String {
        let name = format!("{}{}", self.prefix, self.next_token);
        self.next_token += 1;
        self.frames.push(name.clone());
        name
    }

    pub(crate) fn pop(&mut self) -> Option<String> {
        self.frames.pop()
    }

    pub(crate) fn depth(&self) -> usize {
        self.frames.len()
    }

    pub(crate) fn clear(&mut self) {
        self.frames.clear();
    }

    pub(crate) fn set_prefix(&mut self, prefix: &str) {
        self.prefix = prefix.to_string();
    }
}

fn is_identifier(prefix: &str) -> bool {
    let mut chars = prefix.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl Handle {
    /// Savepoints open below the outermost transaction.
    pub fn nested_level(&self) -> usize {
        self.savepoints.depth()
    }

    /// Change the savepoint name prefix. Only allowed with no savepoint open.
    pub fn set_savepoint_prefix(&mut self, prefix: &str) -> Result<(), WaldenError> {
        if !is_identifier(prefix) {
            return Err(WaldenError::InvalidArgument(format!(
                "savepoint prefix {prefix:?} is not an identifier"
            )));
        }
        if self.savepoints.depth() != 0 {
            return Err(WaldenError::InvalidArgument(
                "savepoint prefix cannot change while savepoints are open".into(),
            ));
        }
        self.savepoints.set_prefix(prefix);
        Ok(())
    }

    /// Start a write transaction, taking the write lock immediately.
    pub fn begin_transaction(&mut self) -> Result<(), WaldenError> {
        if self.savepoints.depth() != 0 {
            warn!(
                path = %self.path(),
                depth = self.savepoints.depth(),
                "discarding savepoints left over from an ended transaction"
            );
            self.savepoints.clear();
        }
        self.execute("BEGIN IMMEDIATE")
    }

    /// Commit the whole transaction, discarding any open savepoints.
    ///
    /// A failed commit is rolled back before the error is returned.
    pub fn commit_or_rollback_transaction(&mut self) -> Result<(), WaldenError> {
        self.savepoints.clear();
        match self.execute("COMMIT") {
            Ok(()) => Ok(()),
            Err(err) => {
                let mut scope = self.ignoring(Ignorable::Any);
                if let Err(rollback) = scope.execute("ROLLBACK") {
                    debug!(error = %rollback, "rollback after failed commit did not run");
                }
                Err(err)
            }
        }
    }

    /// Roll back the whole transaction. Failures are reported to the
    /// notifier as ignored and never returned.
    pub fn rollback_transaction(&mut self) {
        self.savepoints.clear();
        let mut scope = self.ignoring(Ignorable::Any);
        if let Err(err) = scope.execute("ROLLBACK") {
            debug!(error = %err, "rollback did not run");
        }
    }

    /// Open a transaction level: a real transaction when none is active,
    /// otherwise a savepoint.
    pub fn begin_nested_transaction(&mut self) -> Result<(), WaldenError> {
        if !self.is_in_transaction() {
            return self.begin_transaction();
        }
        let name = self.savepoints.push();
        let result = self.execute(&format!("SAVEPOINT {name}"));
        if result.is_err() {
            self.savepoints.pop();
        }
        result
    }

    /// Close the innermost level, keeping its work.
    ///
    /// At the outermost level this commits. A savepoint that cannot be
    /// released is rolled back to, its level is gone either way, and the
    /// release error is returned.
    pub fn commit_or_rollback_nested_transaction(&mut self) -> Result<(), WaldenError> {
        let Some(name) = self.savepoints.pop() else {
            return self.commit_or_rollback_transaction();
        };
        match self.execute(&format!("RELEASE {name}")) {
            Ok(()) => Ok(()),
            Err(err) => {
                let mut scope = self.ignoring(Ignorable::Any);
                if let Err(rollback) = scope.execute(&format!("ROLLBACK TO {name}")) {
                    debug!(error = %rollback, savepoint = %name, "rollback to savepoint did not run");
                }
                Err(err)
            }
        }
    }

    /// Undo the innermost level. Never fails.
    pub fn rollback_nested_transaction(&mut self) {
        let Some(name) = self.savepoints.pop() else {
            self.rollback_transaction();
            return;
        };
        let mut scope = self.ignoring(Ignorable::Any);
        if let Err(err) = scope.execute(&format!("ROLLBACK TO {name}")) {
            debug!(error = %err, savepoint = %name, "rollback to savepoint did not run");
        }
    }
}
