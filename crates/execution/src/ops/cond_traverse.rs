use std::collections::VecDeque;

use lattice_algebra::AlgebraicExpression;
use lattice_primitives::{EdgeId, NodeId, RelTypeId, SlotId};
use lattice_sparse::SparseMatrix;
use lattice_store::GraphStore;
use smallvec::SmallVec;

use super::build_frontier;
use crate::context::ExecCtx;
use crate::op::PhysicalOp;
use crate::record::Record;
use crate::{ExecResult, TRAVERSE_BATCH_SIZE};

/// Conditional traversal: expands each upstream source node to every
/// destination reachable through the algebraic expression.
///
/// Sources accumulate into a frontier of up to [`TRAVERSE_BATCH_SIZE`] rows;
/// one expression evaluation then answers the whole batch, and the non-zeros
/// of the result matrix are emitted one record at a time — row indexes the
/// batched source record, column is the destination node.
///
/// When the pattern names the edge, each result cell is expanded through the
/// store's side table into one record per distinct edge id (the boolean
/// matrix collapses multi-edges; the side table restores them).
pub struct CondTraverse {
    child: Box<dyn PhysicalOp>,
    expr: AlgebraicExpression,
    src_slot: SlotId,
    dest_slot: SlotId,
    edge_slot: Option<SlotId>,
    batch: Vec<Record>,
    pending: VecDeque<(usize, u64, Option<EdgeId>)>,
}

impl CondTraverse {
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

    /// Queues the emissions for one result matrix.
    fn enqueue_result(&mut self, result: &SparseMatrix, store: &GraphStore) -> ExecResult<()> {
        let edge_bound = self.edge_slot.is_some();
        for (row, col) in result.iter() {
            let row_idx = row as usize;
            if !edge_bound {
                self.pending.push_back((row_idx, col, None));
                continue;
            }
            let src = self.batch[row_idx].node(self.src_slot)?;
            let dst = NodeId(col);
            for edge in edges_for_cell(store, &self.expr, src, dst) {
                self.pending.push_back((row_idx, col, Some(edge)));
            }
        }
        Ok(())
    }
}

/// The distinct edge ids behind one matched cell, honoring the expression's
/// relation types and orientation.
pub(crate) fn edges_for_cell(
    store: &GraphStore,
    expr: &AlgebraicExpression,
    src: NodeId,
    dst: NodeId,
) -> SmallVec<[EdgeId; 1]> {
    let Some(rel_op) = expr.edge_relation() else {
        return SmallVec::new();
    };
    // A transposed operand walked the reverse matrix: the physical edge runs
    // destination to source.
    let (from, to) = if rel_op.transposed { (dst, src) } else { (src, dst) };
    let mut rels: SmallVec<[RelTypeId; 2]> = rel_op.rels.clone();
    if rels.is_empty() {
        rels.extend(store.rel_types().map(|(id, _)| id));
    }
    let mut out = SmallVec::new();
    for rel in rels {
        out.extend_from_slice(store.edges_between(from, to, rel));
    }
    out
}

impl PhysicalOp for CondTraverse {
    fn name(&self) -> &'static str {
        "CondTraverse"
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

            if let Some((row, col, edge)) = self.pending.pop_front() {
                let mut rec = ctx.pool.lease_clone(&self.batch[row]);
                rec.set_node(self.dest_slot, NodeId(col));
                if let (Some(slot), Some(edge)) = (self.edge_slot, edge) {
                    rec.set_edge(slot, edge);
                }
                return Ok(Some(rec));
            }

            // Current batch exhausted: recycle it and pull the next.
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
            self.enqueue_result(&result, store)?;
            // An all-miss batch just loops around to pull more sources.
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
