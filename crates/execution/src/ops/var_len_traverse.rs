use std::collections::VecDeque;

use lattice_algebra::AlgebraicExpression;
use lattice_primitives::{NodeId, SlotId};
use lattice_sparse::SparseMatrix;

use super::build_frontier;
use crate::context::ExecCtx;
use crate::op::PhysicalOp;
use crate::record::Record;
use crate::{ExecResult, TRAVERSE_BATCH_SIZE};

/// Variable-length traversal: walks the relation operand `min..=max` times,
/// emitting the union of the frontiers in range.
///
/// The emitted-set bitmap (rows = batched sources) both deduplicates the
/// union — a destination reachable at several hop counts binds once per
/// source — and caps the work of cyclic walks, while the hop bound keeps the
/// outer loop finite.
pub struct VarLenTraverse {
    child: Box<dyn PhysicalOp>,
    expr: AlgebraicExpression,
    min_hops: u32,
    max_hops: u32,
    src_slot: SlotId,
    dest_slot: SlotId,
    batch: Vec<Record>,
    pending: VecDeque<(usize, u64)>,
}

impl VarLenTraverse {
    pub fn new(
        child: Box<dyn PhysicalOp>,
        expr: AlgebraicExpression,
        min_hops: u32,
        max_hops: u32,
        src_slot: SlotId,
        dest_slot: SlotId,
    ) -> Self {
        debug_assert!(min_hops <= max_hops);
        Self {
            child,
            expr,
            min_hops,
            max_hops,
            src_slot,
            dest_slot,
            batch: Vec::new(),
            pending: VecDeque::new(),
        }
    }

    fn drain(&mut self, ctx: &ExecCtx<'_>) {
        for rec in self.batch.drain(..) {
            ctx.pool.give_back(rec);
        }
        self.pending.clear();
    }

    /// Runs the hop loop for the current batch and queues every emission.
    fn expand_batch(&mut self, ctx: &ExecCtx<'_>) -> ExecResult<()> {
        let store = ctx.store();
        let dim = store.dim();
        let nrows = self.batch.len() as u64;

        let mut frontier = build_frontier(&self.batch, self.src_slot, dim)?;
        let mut emitted = SparseMatrix::new(nrows, dim);

        if self.min_hops == 0 {
            // Zero hops reaches the source itself.
            for (row, col) in frontier.iter() {
                emitted.set_element(row, col)?;
                self.pending.push_back((row as usize, col));
            }
        }

        for hop in 1..=self.max_hops {
            let mut next = SparseMatrix::new(nrows, dim);
            self.expr.evaluate(&frontier, &mut next, store)?;
            if next.is_empty() {
                break;
            }
            if hop >= self.min_hops {
                for (row, col) in next.iter() {
                    if !emitted.extract_element(row, col)? {
                        emitted.set_element(row, col)?;
                        self.pending.push_back((row as usize, col));
                    }
                }
            }
            frontier = next;
        }
        Ok(())
    }
}

impl PhysicalOp for VarLenTraverse {
    fn name(&self) -> &'static str {
        "VarLenTraverse"
    }

    fn init(&mut self, ctx: &mut ExecCtx<'_>) -> ExecResult<()> {
        self.child.init(ctx)
    }

    fn consume(&mut self, ctx: &mut ExecCtx<'_>) -> ExecResult<Option<Record>> {
        loop {
            if ctx.cancelled() {
                self.drain(ctx);
                return Ok(None);
            }

            if let Some((row, col)) = self.pending.pop_front() {
                let mut rec = ctx.pool.lease_clone(&self.batch[row]);
                rec.set_node(self.dest_slot, NodeId(col));
                return Ok(Some(rec));
            }

            for rec in self.batch.drain(..) {
                ctx.pool.give_back(rec);
            }
            while self.batch.len() < TRAVERSE_BATCH_SIZE {
                match self.child.consume(ctx)? {
                    Some(rec) => self.batch.push(rec),
                    None => break,
                }
            }
            if self.batch.is_empty() {
                return Ok(None);
            }
            self.expand_batch(ctx)?;
        }
    }

    fn reset(&mut self) {
        self.batch.clear();
        self.pending.clear();
        self.child.reset();
    }

    fn boxed_clone(&self) -> Box<dyn PhysicalOp> {
        Box::new(Self::new(
            self.child.boxed_clone(),
            self.expr.clone(),
            self.min_hops,
            self.max_hops,
            self.src_slot,
            self.dest_slot,
        ))
    }
}
