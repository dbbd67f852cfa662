// SPDX-FileCopyrightText: 2026 Walden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Walden connection layer.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use walden_core::{CheckpointMode, SynchronousMode};

/// Top-level Walden configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WaldenConfig {
    /// Log output settings.
    #[serde(default)]
    pub log: LogConfig,

    /// Process-wide engine settings, applied once before the first open.
    #[serde(default)]
    pub engine: EngineConfig,

    /// Per-connection settings.
    #[serde(default)]
    pub connection: ConnectionConfig,

    /// Checkpoint scheduling settings.
    #[serde(default)]
    pub checkpoint: CheckpointConfig,
}

/// Log output configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LogConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Process-wide engine configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// Put the engine in multi-thread mode (one connection per thread, no shared handles).
    #[serde(default = "default_true")]
    pub multithread: bool,

    /// Default memory-map size in bytes. Must be set together with `mmap_max_size`.
    #[serde(default)]
    pub mmap_default_size: Option<i64>,

    /// Hard memory-map size limit in bytes.
    #[serde(default)]
    pub mmap_max_size: Option<i64>,

    /// Enable or disable engine memory accounting. `None` keeps the engine default.
    #[serde(default)]
    pub memory_status: Option<bool>,

    /// Forward the engine's own log messages to `tracing`.
    #[serde(default = "default_true")]
    pub forward_log: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            multithread: true,
            mmap_default_size: None,
            mmap_max_size: None,
            memory_status: None,
            forward_log: true,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Per-connection configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ConnectionConfig {
    /// Switch the database to write-ahead logging on open.
    #[serde(default = "default_true")]
    pub wal_mode: bool,

    /// `PRAGMA synchronous` level applied on open.
    #[serde(default)]
    pub synchronous: SynchronousMode,

    /// Prefix for nested-transaction savepoint names.
    #[serde(default = "default_savepoint_prefix")]
    pub savepoint_prefix: String,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            wal_mode: true,
            synchronous: SynchronousMode::default(),
            savepoint_prefix: default_savepoint_prefix(),
        }
    }
}

fn default_savepoint_prefix() -> String {
    "walden_savepoint_".to_string()
}

/// Checkpoint scheduling configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CheckpointConfig {
    /// Install the checkpoint policy on every connection.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Mode used when a scheduled checkpoint runs.
    #[serde(default)]
    pub mode: CheckpointMode,

    /// Accumulated pages at which a checkpoint becomes critical.
    #[serde(default = "default_frames_threshold_for_critical")]
    pub frames_threshold_for_critical: u32,

    /// Delay before a critical checkpoint, in seconds.
    #[serde(default = "default_delay_for_critical_secs")]
    pub delay_for_critical_secs: f64,

    /// Delay before a non-critical checkpoint, in seconds.
    #[serde(default = "default_delay_for_non_critical_secs")]
    pub delay_for_non_critical_secs: f64,
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            mode: CheckpointMode::default(),
            frames_threshold_for_critical: default_frames_threshold_for_critical(),
            delay_for_critical_secs: default_delay_for_critical_secs(),
            delay_for_non_critical_secs: default_delay_for_non_critical_secs(),
        }
    }
}

impl CheckpointConfig {
    /// Critical delay as a `Duration`. Invalid values collapse to zero; run validation first.
    pub fn delay_for_critical(&self) -> Duration {
        Duration::try_from_secs_f64(self.delay_for_critical_secs).unwrap_or_default()
    }

    /// Non-critical delay as a `Duration`. Invalid values collapse to zero; run validation first.
    pub fn delay_for_non_critical(&self) -> Duration {
        Duration::try_from_secs_f64(self.delay_for_non_critical_secs).unwrap_or_default()
    }
}

fn default_frames_threshold_for_critical() -> u32 {
    100
}

fn default_delay_for_critical_secs() -> f64 {
    1.0
}

fn default_delay_for_non_critical_secs() -> f64 {
    10.0
}
