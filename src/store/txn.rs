//! Explicit scoped transactions (spec §9 design note: "ambient
//! transactions" replaced by a primitive every storage function must be
//! handed).
//!
//! A write transaction works on a private clone of the kernel graph;
//! the clone is read-your-writes within its own scope (any read through
//! the same `Txn` sees prior writes in the same scope) and is swapped
//! back into the store only on `commit`. Dropping a `Txn` without
//! committing discards the clone, which is the rollback path. A
//! read-only transaction borrows the store directly and never attempts
//! a commit (spec §9: no read-only commit-failure suppression is
//! needed because none is attempted).

use super::graph::Graph;

/// A write transaction: exclusive access to a private copy of the
/// kernel graph, swapped back on `commit`.
pub struct WriteTxn<'a> {
    target: &'a mut Graph,
    working: Graph,
    committed: bool,
}

impl<'a> WriteTxn<'a> {
    pub(super) fn new(target: &'a mut Graph) -> Self {
        let working = target.clone();
        WriteTxn {
            target,
            working,
            committed: false,
        }
    }

    /// Mutable access to the in-progress graph.
    pub fn graph_mut(&mut self) -> &mut Graph {
        &mut self.working
    }

    /// Read-only access to the in-progress graph (read-your-writes).
    pub fn graph(&self) -> &Graph {
        &self.working
    }

    /// Commit: atomically replace the store's graph with this
    /// transaction's working copy.
    pub fn commit(mut self) {
        std::mem::swap(self.target, &mut self.working);
        self.committed = true;
    }
}

impl<'a> Drop for WriteTxn<'a> {
    fn drop(&mut self) {
        if !self.committed {
            crate::logging::debug!("write transaction dropped without commit; rolled back");
        }
    }
}
