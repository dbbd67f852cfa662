// SPDX-FileCopyrightText: 2026 Walden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Routes SQL and performance traces into `tracing` and `metrics`.

use std::sync::Arc;

use metrics::histogram;
use tracing::{debug, trace};
use walden_core::WaldenError;

use super::HandleConfig;
use crate::handle::Handle;
use crate::notification::{HookKind, PerformanceInfo};

/// Runs after application observers registered at the default order.
const TRACE_ORDER: i32 = i32::MAX;

#[derive(Debug, Clone, Copy, Default)]
pub struct TraceConfig;

impl HandleConfig for TraceConfig {
    fn name(&self) -> &str {
        "walden.trace"
    }

    fn invoke(&self, handle: &mut Handle) -> Result<(), WaldenError> {
        let path = handle.path().to_string();
        handle.set_notification_when_sql_traced(
            TRACE_ORDER,
            self.name(),
            Arc::new({
                let path = path.clone();
                move |sql: &str| trace!(path = %path, sql, "statement")
            }),
        )?;
        handle.set_notification_when_performance_traced(
            TRACE_ORDER,
            self.name(),
            Arc::new(move |info: &PerformanceInfo| {
                histogram!("walden_statement_duration_seconds").record(info.elapsed.as_secs_f64());
                debug!(
                    path = %path,
                    sql = %info.sql,
                    elapsed_ms = info.elapsed.as_secs_f64() * 1000.0,
                    vm_steps = info.vm_steps,
                    "statement finished"
                );
            }),
        )
    }

    fn uninvoke(&self, handle: &mut Handle) -> Result<(), WaldenError> {
        handle.unset_notification(HookKind::SqlTraced, self.name())?;
        handle.unset_notification(HookKind::PerformanceTraced, self.name())?;
        Ok(())
    }
}
