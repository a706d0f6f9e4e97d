use lattice_primitives::{LabelId, NodeId, SlotId};

use crate::context::ExecCtx;
use crate::op::PhysicalOp;
use crate::record::Record;
use crate::ExecResult;

/// Emits one record per live node.
#[derive(Clone)]
pub struct AllNodeScan {
    slot: SlotId,
    ids: Vec<NodeId>,
    pos: usize,
}

impl AllNodeScan {
    pub fn new(slot: SlotId) -> Self {
        Self {
            slot,
            ids: Vec::new(),
            pos: 0,
        }
    }
}

impl PhysicalOp for AllNodeScan {
    fn name(&self) -> &'static str {
        "AllNodeScan"
    }

    fn init(&mut self, ctx: &mut ExecCtx<'_>) -> ExecResult<()> {
        // The id list is pinned at init; the snapshot is stable under the
        // graph lock, and a write query mutating mid-scan sees its own
        // consistent starting population.
        self.ids = ctx.store().nodes().collect();
        self.pos = 0;
        Ok(())
    }

    fn consume(&mut self, ctx: &mut ExecCtx<'_>) -> ExecResult<Option<Record>> {
        if ctx.cancelled() {
            return Ok(None);
        }
        let Some(&id) = self.ids.get(self.pos) else {
            return Ok(None);
        };
        self.pos += 1;
        let mut rec = ctx.pool.lease();
        rec.set_node(self.slot, id);
        Ok(Some(rec))
    }

    fn reset(&mut self) {
        self.ids.clear();
        self.pos = 0;
    }

    fn boxed_clone(&self) -> Box<dyn PhysicalOp> {
        Box::new(Self::new(self.slot))
    }
}

/// Emits one record per node carrying a label, off the label matrix
/// diagonal. The degenerate leading operand of a traversal: the scan *is*
/// the label filter, which is why the planner strips the matching diagonal
/// from the expression it feeds.
#[derive(Clone)]
pub struct LabelScan {
    slot: SlotId,
    label: LabelId,
    ids: Vec<NodeId>,
    pos: usize,
}

impl LabelScan {
    pub fn new(slot: SlotId, label: LabelId) -> Self {
        Self {
            slot,
            label,
            ids: Vec::new(),
            pos: 0,
        }
    }

    pub fn label(&self) -> LabelId {
        self.label
    }
}

impl PhysicalOp for LabelScan {
    fn name(&self) -> &'static str {
        "LabelScan"
    }

    fn init(&mut self, ctx: &mut ExecCtx<'_>) -> ExecResult<()> {
        self.ids = ctx.store().nodes_with_label(self.label)?.collect();
        self.pos = 0;
        Ok(())
    }

    fn consume(&mut self, ctx: &mut ExecCtx<'_>) -> ExecResult<Option<Record>> {
        if ctx.cancelled() {
            return Ok(None);
        }
        let Some(&id) = self.ids.get(self.pos) else {
            return Ok(None);
        };
        self.pos += 1;
        let mut rec = ctx.pool.lease();
        rec.set_node(self.slot, id);
        Ok(Some(rec))
    }

    fn reset(&mut self) {
        self.ids.clear();
        self.pos = 0;
    }

    fn boxed_clone(&self) -> Box<dyn PhysicalOp> {
        Box::new(Self::new(self.slot, self.label))
    }
}
