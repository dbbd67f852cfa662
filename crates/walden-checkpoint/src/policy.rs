// SPDX-FileCopyrightText: 2026 Walden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Decides how urgently a database needs a checkpoint after each commit.
//!
//! Checkpointing is I/O heavy and must not run inside the commit that
//! triggered it, so the policy only enqueues a request. Small commits keep
//! pushing the request out by the long delay, coalescing into one
//! checkpoint; once the unflushed tally reaches the threshold the request is
//! pulled in to the short delay.

use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use strum::{Display, IntoStaticStr};
use tracing::{debug, info};
use uuid::Uuid;
use walden_config::model::CheckpointConfig;
use walden_core::WaldenError;
use walden_handle::{Handle, HandleConfig, HookKind};

use crate::queue::CheckpointQueue;

/// Observers registered at this order run before default-order ones.
const COMMITTED_ORDER: i32 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum Urgency {
    Critical,
    NonCritical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckpointSettings {
    pub frames_threshold_for_critical: u32,
    pub delay_for_critical: Duration,
    pub delay_for_non_critical: Duration,
}

impl Default for CheckpointSettings {
    fn default() -> Self {
        Self {
            frames_threshold_for_critical: 100,
            delay_for_critical: Duration::from_secs(1),
            delay_for_non_critical: Duration::from_secs(10),
        }
    }
}

impl From<&CheckpointConfig> for CheckpointSettings {
    fn from(config: &CheckpointConfig) -> Self {
        Self {
            frames_threshold_for_critical: config.frames_threshold_for_critical,
            delay_for_critical: config.delay_for_critical(),
            delay_for_non_critical: config.delay_for_non_critical(),
        }
    }
}

struct Decider {
    queue: Arc<dyn CheckpointQueue>,
    settings: CheckpointSettings,
}

impl Decider {
    fn on_committed(&self, path: &str, pages: u32) -> Urgency {
        let tally = self.queue.accumulate(path, pages);
        let (urgency, delay) = if tally >= u64::from(self.settings.frames_threshold_for_critical) {
            (Urgency::Critical, self.settings.delay_for_critical)
        } else {
            (Urgency::NonCritical, self.settings.delay_for_non_critical)
        };
        self.queue.put(path, delay);

        let label: &'static str = urgency.into();
        counter!("walden_checkpoint_requests_total", "urgency" => label).increment(1);
        debug!(path, pages, tally, %urgency, delay_ms = delay.as_millis() as u64, "checkpoint requested");
        urgency
    }
}

/// Connection config that feeds commits into a [`CheckpointQueue`].
pub struct CheckpointPolicy {
    identifier: String,
    decider: Arc<Decider>,
}

impl std::fmt::Debug for CheckpointPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckpointPolicy")
            .field("identifier", &self.identifier)
            .field("settings", &self.decider.settings)
            .finish_non_exhaustive()
    }
}

impl CheckpointPolicy {
    pub fn new(queue: Arc<dyn CheckpointQueue>, settings: CheckpointSettings) -> Self {
        Self {
            identifier: format!("checkpoint-{}", Uuid::new_v4()),
            decider: Arc::new(Decider { queue, settings }),
        }
    }

    /// Unique name of the committed observer this policy registers.
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn settings(&self) -> &CheckpointSettings {
        &self.decider.settings
    }

    /// Record a commit of `pages` on `path` and enqueue a checkpoint.
    pub fn on_committed(&self, path: &str, pages: u32) -> Urgency {
        self.decider.on_committed(path, pages)
    }
}

impl HandleConfig for CheckpointPolicy {
    fn name(&self) -> &str {
        &self.identifier
    }

    fn invoke(&self, handle: &mut Handle) -> Result<(), WaldenError> {
        let decider = Arc::clone(&self.decider);
        handle.set_notification_when_committed(
            COMMITTED_ORDER,
            &self.identifier,
            Arc::new(move |path: &str, pages: u32| {
                decider.on_committed(path, pages);
            }),
        )?;
        info!(path = handle.path(), policy = %self.identifier, "checkpoint policy installed");
        Ok(())
    }

    fn uninvoke(&self, handle: &mut Handle) -> Result<(), WaldenError> {
        handle.unset_notification(HookKind::Committed, &self.identifier)?;
        self.decider.queue.remove(handle.path());
        info!(path = handle.path(), policy = %self.identifier, "checkpoint policy removed");
        Ok(())
    }
}
