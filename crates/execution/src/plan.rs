use std::sync::atomic::AtomicBool;

use lattice_primitives::SlotId;

use crate::context::{ExecCtx, QueryStats, TxHandle};
use crate::op::PhysicalOp;
use crate::pool::RecordPool;
use crate::procedures::ProcedureRegistry;
use crate::record::Record;
use crate::ExecResult;

/// A compiled query: the template operator tree plus the record layout.
///
/// The template is never executed directly. Each call to
/// [`execute`](Self::execute) clones it, so iterator positions and frontier
/// batches cannot bleed between runs — a plan can be cached and executed
/// concurrently from several threads, each under its own transaction.
pub struct ExecutionPlan {
    root: Box<dyn PhysicalOp>,
    width: usize,
    projection: Vec<SlotId>,
}

impl ExecutionPlan {
    pub fn new(root: Box<dyn PhysicalOp>, width: usize, projection: Vec<SlotId>) -> Self {
        Self {
            root,
            width,
            projection,
        }
    }

    /// Slots, in output order, the caller should project into result rows.
    pub fn projection(&self) -> &[SlotId] {
        &self.projection
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Runs the plan to completion under the given transaction, returning
    /// the produced records and the mutation counters.
    ///
    /// Cancellation (`cancel` flipped from another thread) ends the stream
    /// cleanly: whatever was produced so far is returned without an error.
    pub fn execute(
        &self,
        tx: TxHandle<'_>,
        procedures: &ProcedureRegistry,
        cancel: &AtomicBool,
    ) -> ExecResult<(Vec<Record>, QueryStats)> {
        let mut root = self.root.clone();
        let pool = RecordPool::new(self.width);
        let mut ctx = ExecCtx::new(tx, &pool, procedures, cancel);
        root.init(&mut ctx)?;
        let mut records = Vec::new();
        while let Some(rec) = root.consume(&mut ctx)? {
            records.push(rec);
        }
        log::debug!("plan produced {} records", records.len());
        Ok((records, ctx.stats))
    }
}

impl Clone for ExecutionPlan {
    fn clone(&self) -> Self {
        Self {
            root: self.root.clone(),
            width: self.width,
            projection: self.projection.clone(),
        }
    }
}
