// SPDX-FileCopyrightText: 2026 Walden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Journal mode and durability pragmas.

use walden_config::model::ConnectionConfig;
use walden_core::{SynchronousMode, WaldenError};

use super::HandleConfig;
use crate::handle::Handle;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicConfig {
    pub wal_mode: bool,
    pub synchronous: SynchronousMode,
}

impl Default for BasicConfig {
    fn default() -> Self {
        Self {
            wal_mode: true,
            synchronous: SynchronousMode::Normal,
        }
    }
}

impl From<&ConnectionConfig> for BasicConfig {
    fn from(config: &ConnectionConfig) -> Self {
        Self {
            wal_mode: config.wal_mode,
            synchronous: config.synchronous,
        }
    }
}

impl HandleConfig for BasicConfig {
    fn name(&self) -> &str {
        "walden.basic"
    }

    fn invoke(&self, handle: &mut Handle) -> Result<(), WaldenError> {
        if self.wal_mode {
            handle.execute("PRAGMA journal_mode=WAL")?;
        }
        handle.execute(&format!("PRAGMA synchronous={}", self.synchronous))
    }
}
