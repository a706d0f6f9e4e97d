use std::collections::VecDeque;

use lattice_algebra::AlgebraicExpression;
use lattice_primitives::{EdgeId, SlotId};
use lattice_sparse::SparseMatrix;

use super::build_frontier;
use super::cond_traverse::edges_for_cell;
use crate::context::ExecCtx;
use crate::op::PhysicalOp;
use crate::record::Record;
use crate::{ExecResult, TRAVERSE_BATCH_SIZE};

/// Traversal into an already-bound destination.
///
/// Same frontier batching and expression evaluation as `CondTraverse`, but
/// instead of iterating every non-zero of the result, each batched record is
/// accepted or rejected by probing the single `(row, bound destination)`
/// cell.
pub struct ExpandInto {
    child: Box<dyn PhysicalOp>,
    expr: AlgebraicExpression,
    src_slot: SlotId,
    dest_slot: SlotId,
    edge_slot: Option<SlotId>,
    batch: Vec<Record>,
    pending: VecDeque<(usize, Option<EdgeId>)>,
}

impl ExpandInto {
    pub fn new(
        child: Box<dyn PhysicalOp>,
        expr: AlgebraicExpression,
        src_slot: SlotId,
        dest_slot: SlotId,
        edge_slot: Option<SlotId>,
    ) -> Self {
        Self {
            child,
            expr,
            src_slot,
            dest_slot,
            edge_slot,
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
}

impl PhysicalOp for ExpandInto {
    fn name(&self) -> &'static str {
        "ExpandInto"
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

            if let Some((row, edge)) = self.pending.pop_front() {
                let mut rec = ctx.pool.lease_clone(&self.batch[row]);
                if let (Some(slot), Some(edge)) = (self.edge_slot, edge) {
                    rec.set_edge(slot, edge);
                }
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

            let store = ctx.store();
            let f = build_frontier(&self.batch, self.src_slot, store.dim())?;
            let mut result = SparseMatrix::new(f.nrows(), store.dim());
            self.expr.evaluate(&f, &mut result, store)?;

            for (row, rec) in self.batch.iter().enumerate() {
                let dst = rec.node(self.dest_slot)?;
                if !result.extract_element(row as u64, dst.0)? {
                    continue;
                }
                if self.edge_slot.is_none() {
                    self.pending.push_back((row, None));
                    continue;
                }
                let src = rec.node(self.src_slot)?;
                for edge in edges_for_cell(store, &self.expr, src, dst) {
                    self.pending.push_back((row, Some(edge)));
                }
            }
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
            self.src_slot,
            self.dest_slot,
            self.edge_slot,
        ))
    }
}
