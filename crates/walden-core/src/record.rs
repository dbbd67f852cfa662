// SPDX-FileCopyrightText: 2026 Walden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Classified engine failures.
//!
//! Every failure code returned by the engine is turned into an
//! [`ErrorRecord`] before anything else happens to it. The record carries
//! the severity decided by the handle's ignorable-error mask and enough
//! context (path, SQL text) to be useful in a log line on its own.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Info key holding the database path.
pub const INFO_PATH: &str = "Path";

/// Info key holding the offending SQL text.
pub const INFO_SQL: &str = "SQL";

/// Severity of a classified failure.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Level {
    /// The code was whitelisted by the caller; the operation reports success.
    Ignore,
    /// The operation failed.
    Error,
}

/// A classified engine failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub level: Level,
    /// Primary result code.
    pub code: i32,
    /// Extended result code, absent for misuse errors.
    pub extended_code: Option<i32>,
    /// Engine-provided message.
    pub message: Option<String>,
    /// Free-form context, ordered by key.
    pub infos: BTreeMap<String, String>,
}

impl ErrorRecord {
    /// Create an `Error`-level record for the given result code.
    pub fn new(code: i32) -> Self {
        Self {
            level: Level::Error,
            code,
            extended_code: None,
            message: None,
            infos: BTreeMap::new(),
        }
    }

    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    pub fn with_extended_code(mut self, extended_code: Option<i32>) -> Self {
        self.extended_code = extended_code;
        self
    }

    pub fn with_message(mut self, message: Option<String>) -> Self {
        self.message = message;
        self
    }

    pub fn with_info(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_info(key, value);
        self
    }

    pub fn set_info(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.infos.insert(key.into(), value.into());
    }

    pub fn info(&self, key: &str) -> Option<&str> {
        self.infos.get(key).map(String::as_str)
    }

    pub fn path(&self) -> Option<&str> {
        self.info(INFO_PATH)
    }

    pub fn sql(&self) -> Option<&str> {
        self.info(INFO_SQL)
    }

    pub fn is_ignored(&self) -> bool {
        self.level == Level::Ignore
    }
}

impl fmt::Display for ErrorRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] code {}", self.level, self.code)?;
        if let Some(extended) = self.extended_code {
            write!(f, " (extended {extended})")?;
        }
        if let Some(message) = &self.message {
            write!(f, ": {message}")?;
        }
        for (key, value) in &self.infos {
            write!(f, ", {key}: {value}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_code_message_and_infos() {
        let record = ErrorRecord::new(1)
            .with_extended_code(Some(1))
            .with_message(Some("no such table: t".into()))
            .with_info(INFO_PATH, "/tmp/x.db")
            .with_info(INFO_SQL, "SELECT 1 FROM t");

        let text = record.to_string();
        assert!(text.starts_with("[error] code 1 (extended 1): no such table: t"));
        assert!(text.contains("Path: /tmp/x.db"));
        assert!(text.contains("SQL: SELECT 1 FROM t"));
    }

    #[test]
    fn new_record_defaults_to_error_level() {
        let record = ErrorRecord::new(5);
        assert_eq!(record.level, Level::Error);
        assert!(!record.is_ignored());
        assert!(record.path().is_none());
        assert!(record.sql().is_none());
    }

    #[test]
    fn set_info_replaces_existing_value() {
        let mut record = ErrorRecord::new(1).with_info(INFO_PATH, "a.db");
        record.set_info(INFO_PATH, "b.db");
        assert_eq!(record.path(), Some("b.db"));
        assert_eq!(record.infos.len(), 1);
    }
}
