// SPDX-FileCopyrightText: 2026 Walden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Write-ahead-log checkpoint scheduling for Walden handles.
//!
//! [`CheckpointPolicy`] is installed on a handle like any other
//! [`HandleConfig`](walden_handle::HandleConfig). It listens to commits,
//! keeps a per-path page tally in a shared [`CheckpointQueue`], and asks the
//! queue for a checkpoint after a short delay once the tally reaches the
//! critical threshold, or after a long delay otherwise.

pub mod policy;
pub mod queue;

pub use policy::{CheckpointPolicy, CheckpointSettings, Urgency};
pub use queue::{CheckpointQueue, Pending, ScheduledCheckpoints};
