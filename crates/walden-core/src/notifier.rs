// SPDX-FileCopyrightText: 2026 Walden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Process-wide sink for classified errors.
//!
//! Suppression only changes what the caller sees. Every record, ignored or
//! not, is logged, counted, and handed to the registered observers here.

use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use tracing::{debug, error};

use crate::record::{ErrorRecord, Level};

/// Callback receiving every classified record.
pub type ErrorObserver = Arc<dyn Fn(&ErrorRecord) + Send + Sync>;

static SHARED: OnceLock<Notifier> = OnceLock::new();

/// Named fan-out of error records.
#[derive(Default)]
pub struct Notifier {
    observers: RwLock<BTreeMap<String, ErrorObserver>>,
}

impl std::fmt::Debug for Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let observers = self
            .observers
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("Notifier")
            .field("observers", &observers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Notifier {
    /// Create a standalone notifier. Handles always report to [`Notifier::shared`].
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide notifier.
    pub fn shared() -> &'static Notifier {
        SHARED.get_or_init(Notifier::new)
    }

    /// Register or replace the observer stored under `name`.
    pub fn set_observer(&self, name: impl Into<String>, observer: ErrorObserver) {
        self.observers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.into(), observer);
    }

    /// Remove the observer stored under `name`. Returns whether one existed.
    pub fn unset_observer(&self, name: &str) -> bool {
        self.observers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name)
            .is_some()
    }

    /// Log, count, and fan out one record.
    pub fn notify(&self, record: &ErrorRecord) {
        match record.level {
            Level::Error => error!(
                code = record.code,
                extended_code = ?record.extended_code,
                message = record.message.as_deref().unwrap_or_default(),
                path = record.path().unwrap_or_default(),
                sql = record.sql().unwrap_or_default(),
                "sqlite error"
            ),
            Level::Ignore => debug!(
                code = record.code,
                extended_code = ?record.extended_code,
                message = record.message.as_deref().unwrap_or_default(),
                path = record.path().unwrap_or_default(),
                sql = record.sql().unwrap_or_default(),
                "sqlite error ignored"
            ),
        }
        metrics::counter!("walden_errors_total", "level" => record.level.to_string())
            .increment(1);

        // Observers may register or unregister from inside the callback.
        let observers: Vec<ErrorObserver> = self
            .observers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        for observer in observers {
            observer(record);
        }
    }
}
