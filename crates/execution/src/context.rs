use std::sync::atomic::{AtomicBool, Ordering};

use lattice_store::{GraphStore, WriteTx};

use crate::pool::RecordPool;
use crate::procedures::ProcedureRegistry;
use crate::{ExecError, ExecResult};

/// Which transaction a query runs under.
///
/// Read-only queries hold the shared guard (via `&GraphStore`); write queries
/// hold the exclusive [`WriteTx`], which routes mutations through its undo
/// log.
pub enum TxHandle<'a> {
    Read(&'a GraphStore),
    Write(&'a mut WriteTx),
}

/// Mutation counters reported alongside a result set.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct QueryStats {
    pub nodes_created: u64,
    pub edges_created: u64,
    pub nodes_deleted: u64,
    pub edges_deleted: u64,
    pub properties_set: u64,
}

/// Everything one plan execution needs, passed explicitly to every operator
/// call — there is no ambient global state.
pub struct ExecCtx<'a> {
    tx: TxHandle<'a>,
    pub pool: &'a RecordPool,
    pub procedures: &'a ProcedureRegistry,
    cancel: &'a AtomicBool,
    pub stats: QueryStats,
}

impl<'a> ExecCtx<'a> {
    pub fn new(
        tx: TxHandle<'a>,
        pool: &'a RecordPool,
        procedures: &'a ProcedureRegistry,
        cancel: &'a AtomicBool,
    ) -> Self {
        Self {
            tx,
            pool,
            procedures,
            cancel,
            stats: QueryStats::default(),
        }
    }

    /// Read access to the graph, whichever transaction kind is active.
    pub fn store(&self) -> &GraphStore {
        match &self.tx {
            TxHandle::Read(store) => store,
            TxHandle::Write(tx) => &**tx,
        }
    }

    /// The write transaction, or [`ExecError::ReadOnly`] when the query was
    /// started under the shared lock.
    pub fn write(&mut self) -> ExecResult<&mut WriteTx> {
        match &mut self.tx {
            TxHandle::Write(tx) => Ok(tx),
            TxHandle::Read(_) => Err(ExecError::ReadOnly),
        }
    }

    /// Cooperative cancellation, checked at the top of each operator's
    /// consume loop. Tripping it is not an error: operators drain their
    /// records back to the pool and report end-of-stream.
    pub fn cancelled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }
}
