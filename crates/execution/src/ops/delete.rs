use lattice_primitives::SlotId;

use crate::context::ExecCtx;
use crate::op::PhysicalOp;
use crate::record::{Entry, Record};
use crate::ExecResult;

/// Deletes the entities bound at the given slots.
///
/// Edges go first, then nodes; node deletion cascades to incident edges, so
/// an edge bound in the same record may already be gone by the time its slot
/// comes up — deletions of already-deleted entities are skipped, not errors.
pub struct Delete {
    child: Box<dyn PhysicalOp>,
    node_slots: Vec<SlotId>,
    edge_slots: Vec<SlotId>,
}

impl Delete {
    pub fn new(child: Box<dyn PhysicalOp>, node_slots: Vec<SlotId>, edge_slots: Vec<SlotId>) -> Self {
        Self {
            child,
            node_slots,
            edge_slots,
        }
    }
}

impl PhysicalOp for Delete {
    fn name(&self) -> &'static str {
        "Delete"
    }

    fn init(&mut self, ctx: &mut ExecCtx<'_>) -> ExecResult<()> {
        ctx.write()?;
        self.child.init(ctx)
    }

    fn consume(&mut self, ctx: &mut ExecCtx<'_>) -> ExecResult<Option<Record>> {
        if ctx.cancelled() {
            return Ok(None);
        }
        let Some(rec) = self.child.consume(ctx)? else {
            return Ok(None);
        };
        for &slot in &self.edge_slots {
            if let Entry::Edge(edge) = *rec.get(slot) {
                if ctx.store().is_edge(edge) {
                    ctx.write()?.delete_edge(edge)?;
                    ctx.stats.edges_deleted += 1;
                }
            }
        }
        for &slot in &self.node_slots {
            if let Entry::Node(node) = *rec.get(slot) {
                if ctx.store().is_node(node) {
                    let cascaded = ctx.write()?.delete_node(node)?;
                    ctx.stats.nodes_deleted += 1;
                    ctx.stats.edges_deleted += cascaded as u64;
                }
            }
        }
        Ok(Some(rec))
    }

    fn reset(&mut self) {
        self.child.reset();
    }

    fn boxed_clone(&self) -> Box<dyn PhysicalOp> {
        Box::new(Self::new(
            self.child.boxed_clone(),
            self.node_slots.clone(),
            self.edge_slots.clone(),
        ))
    }
}
