// SPDX-FileCopyrightText: 2026 Walden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! One configured connection for the lifetime of a CLI command.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{debug, info, warn};
use walden_checkpoint::{
    CheckpointPolicy, CheckpointQueue, CheckpointSettings, ScheduledCheckpoints,
};
use walden_config::WaldenConfig;
use walden_core::{CheckpointMode, WaldenError};
use walden_handle::{
    BasicConfig, CheckpointOutcome, CipherConfig, Handle, StatementId, Step, TraceConfig, Value,
};

/// Rows produced by one statement.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct QueryOutput {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
    pub changes: i32,
}

pub struct Session {
    handle: Handle,
    queue: Arc<ScheduledCheckpoints>,
    policy: Option<CheckpointPolicy>,
    mode: CheckpointMode,
}

impl Session {
    /// Open `path` and install the configured connection behaviour.
    ///
    /// A cipher key, when given, is applied before anything touches the file.
    pub fn open(
        path: &str,
        config: &WaldenConfig,
        key: Option<Vec<u8>>,
    ) -> Result<Self, WaldenError> {
        let mut handle = Handle::new(path);
        handle.open()?;
        if let Some(key) = key {
            handle.install(&CipherConfig::new(key))?;
        }
        handle.set_savepoint_prefix(&config.connection.savepoint_prefix)?;
        handle.install(&BasicConfig::from(&config.connection))?;
        handle.install(&TraceConfig)?;

        let queue = Arc::new(ScheduledCheckpoints::new());
        let policy = if config.checkpoint.enabled {
            let policy = CheckpointPolicy::new(
                queue.clone(),
                CheckpointSettings::from(&config.checkpoint),
            );
            handle.install(&policy)?;
            Some(policy)
        } else {
            None
        };

        info!(path, checkpoint_policy = policy.is_some(), "session opened");
        Ok(Self {
            handle,
            queue,
            policy,
            mode: config.checkpoint.mode,
        })
    }

    pub fn handle(&mut self) -> &mut Handle {
        &mut self.handle
    }

    /// Run one statement inside a nested transaction and collect its rows.
    pub fn execute(&mut self, sql: &str) -> Result<QueryOutput, WaldenError> {
        self.handle.begin_nested_transaction()?;
        let id = self.handle.get_statement();
        let result = query(&mut self.handle, id, sql);
        self.handle.return_statement(id);

        match result {
            Ok((mut output, readonly)) => {
                if !readonly {
                    output.changes = self.handle.changes()?;
                }
                self.handle.commit_or_rollback_nested_transaction()?;
                Ok(output)
            }
            Err(err) => {
                self.handle.rollback_nested_transaction();
                Err(err)
            }
        }
    }

    /// Column names of `table`, or `None` when it does not exist.
    pub fn probe(&mut self, table: &str) -> Result<Option<BTreeSet<String>>, WaldenError> {
        if !self.handle.table_exists(table)? {
            return Ok(None);
        }
        self.handle.get_columns("main", table).map(Some)
    }

    pub fn checkpoint(
        &mut self,
        mode: Option<CheckpointMode>,
    ) -> Result<Option<CheckpointOutcome>, WaldenError> {
        let mode = mode.unwrap_or(self.mode);
        let outcome = self.handle.checkpoint(mode)?;
        // The explicit pass covers whatever the policy had scheduled.
        self.queue.remove(self.handle.path());
        Ok(outcome)
    }

    /// Run every checkpoint the policy scheduled, due or not.
    pub fn flush(&mut self) -> Result<usize, WaldenError> {
        let mut ran = 0;
        for path in self.queue.drain() {
            if path != self.handle.path() {
                warn!(path = %path, "checkpoint scheduled for a foreign path, skipping");
                continue;
            }
            self.handle.checkpoint(self.mode)?;
            ran += 1;
        }
        debug!(path = self.handle.path(), ran, "scheduled checkpoints flushed");
        Ok(ran)
    }

    /// Flush scheduled checkpoints, remove the policy and close the handle.
    pub fn close(mut self) -> Result<usize, WaldenError> {
        let ran = self.flush()?;
        if let Some(policy) = self.policy.take() {
            self.handle.uninstall(&policy)?;
        }
        self.handle.close();
        Ok(ran)
    }
}

fn query(
    handle: &mut Handle,
    id: StatementId,
    sql: &str,
) -> Result<(QueryOutput, bool), WaldenError> {
    let mut statement = handle.statement(id).ok_or(WaldenError::NotPrepared)?;
    statement.prepare(sql)?;

    let columns: Vec<String> = (0..statement.column_count())
        .map(|index| statement.column_name(index).unwrap_or_default())
        .collect();
    let mut rows = Vec::new();
    while let Step::Row = statement.step()? {
        rows.push((0..columns.len()).map(|index| statement.get_value(index)).collect());
    }
    let readonly = statement.is_readonly();
    statement.finalize();

    let output = QueryOutput {
        columns,
        rows,
        changes: 0,
    };
    Ok((output, readonly))
}

/// Render one value for terminal output.
pub fn render_value(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Integer(v) => v.to_string(),
        Value::Float(v) => v.to_string(),
        Value::Text(v) => v.clone(),
        Value::Blob(v) => format!("x'{}'", hex::encode(v)),
    }
}
