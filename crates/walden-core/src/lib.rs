// SPDX-FileCopyrightText: 2026 Walden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Walden connection layer.
//!
//! This crate provides the error type shared by every Walden crate, the
//! [`ErrorRecord`] that describes a classified engine failure, and the
//! process-wide [`Notifier`] sink every record is reported to.

pub mod error;
pub mod notifier;
pub mod record;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::WaldenError;
pub use notifier::{ErrorObserver, Notifier};
pub use record::{ErrorRecord, Level, INFO_PATH, INFO_SQL};
pub use types::{CheckpointMode, SynchronousMode};
