// SPDX-FileCopyrightText: 2026 Walden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Enums shared between the configuration layer and the handle layer.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Write-ahead-log checkpoint mode, mirroring `SQLITE_CHECKPOINT_*`.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum CheckpointMode {
    /// Checkpoint as many frames as possible without waiting for readers or writers.
    #[default]
    Passive,
    /// Wait for writers, then checkpoint every frame.
    Full,
    /// Like `Full`, then wait for readers so the next writer restarts the log.
    Restart,
    /// Like `Restart`, then truncate the log file to zero bytes.
    Truncate,
}

impl CheckpointMode {
    /// The engine's numeric mode.
    pub fn as_raw(self) -> i32 {
        match self {
            CheckpointMode::Passive => 0,
            CheckpointMode::Full => 1,
            CheckpointMode::Restart => 2,
            CheckpointMode::Truncate => 3,
        }
    }
}

/// `PRAGMA synchronous` level.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "UPPERCASE")]
#[serde(rename_all = "lowercase")]
pub enum SynchronousMode {
    Off,
    #[default]
    Normal,
    Full,
    Extra,
}
