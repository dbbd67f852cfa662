// SPDX-FileCopyrightText: 2026 Walden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Statements handed out by a handle and still owned by it.

use std::collections::BTreeMap;

use tracing::warn;

use crate::statement::HandleStatement;

/// Identifies one pooled statement for the lifetime of its handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StatementId(u64);

#[derive(Debug, Default)]
pub(crate) struct StatementPool {
    statements: BTreeMap<StatementId, HandleStatement>,
    next_id: u64,
}

impl StatementPool {
    pub(crate) fn acquire(&mut self) -> StatementId {
        let id = StatementId(self.next_id);
        self.next_id += 1;
        self.statements.insert(id, HandleStatement::new());
        id
    }

    /// Remove and finalize a statement. Unknown ids are ignored.
    pub(crate) fn release(&mut self, id: StatementId) -> bool {
        self.statements.remove(&id).is_some()
    }

    pub(crate) fn get_mut(&mut self, id: StatementId) -> Option<&mut HandleStatement> {
        self.statements.get_mut(&id)
    }

    pub(crate) fn len(&self) -> usize {
        self.statements.len()
    }

    /// Finalize everything still prepared before the connection closes.
    ///
    /// Returns how many statements were left prepared by their callers.
    pub(crate) fn finalize_all(&mut self, path: &str) -> usize {
        let mut leaked = 0;
        for statement in self.statements.values_mut() {
            if statement.is_prepared() {
                warn!(
                    path,
                    sql = statement.sql().unwrap_or_default(),
                    "statement still prepared at close, finalizing"
                );
                leaked += 1;
            }
            statement.finalize();
        }
        leaked
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_never_reused() {
        let mut pool = StatementPool::default();
        let first = pool.acquire();
        assert!(pool.release(first));
        let second = pool.acquire();
        assert_ne!(first, second);
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn releasing_unknown_id_is_harmless() {
        let mut pool = StatementPool::default();
        let id = pool.acquire();
        assert!(pool.release(id));
        assert!(!pool.release(id));
        assert!(pool.get_mut(id).is_none());
    }

    #[test]
    fn finalize_all_counts_only_prepared_statements() {
        let mut pool = StatementPool::default();
        pool.acquire();
        pool.acquire();
        assert_eq!(pool.finalize_all("/tmp/a.db"), 0);
        assert_eq!(pool.len(), 2);
    }
}
