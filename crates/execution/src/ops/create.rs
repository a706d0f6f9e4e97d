use lattice_primitives::{AttrId, LabelId, RelTypeId, SlotId};
use lattice_store::{AttributeSet, Value};

use crate::context::ExecCtx;
use crate::op::PhysicalOp;
use crate::record::Record;
use crate::ExecResult;

/// A node the query creates, bound into `slot`.
#[derive(Debug, Clone)]
pub struct NodeBlueprint {
    pub slot: SlotId,
    pub label: Option<LabelId>,
    pub attrs: Vec<(AttrId, Value)>,
}

/// An edge the query creates between two bound nodes.
#[derive(Debug, Clone)]
pub struct EdgeBlueprint {
    pub slot: Option<SlotId>,
    pub src_slot: SlotId,
    pub dst_slot: SlotId,
    pub rel: RelTypeId,
    pub attrs: Vec<(AttrId, Value)>,
}

/// Creates nodes and edges through the write transaction.
///
/// Standalone `CREATE` emits one record carrying the new bindings; under a
/// child (`MATCH … CREATE`) it applies the blueprints once per upstream
/// record and forwards it with the new bindings added.
pub struct Create {
    child: Option<Box<dyn PhysicalOp>>,
    nodes: Vec<NodeBlueprint>,
    edges: Vec<EdgeBlueprint>,
    exhausted: bool,
}

impl Create {
    pub fn new(
        child: Option<Box<dyn PhysicalOp>>,
        nodes: Vec<NodeBlueprint>,
        edges: Vec<EdgeBlueprint>,
    ) -> Self {
        Self {
            child,
            nodes,
            edges,
            exhausted: false,
        }
    }

    fn apply(&self, rec: &mut Record, ctx: &mut ExecCtx<'_>) -> ExecResult<()> {
        for bp in &self.nodes {
            let attrs: AttributeSet = bp.attrs.iter().cloned().collect();
            let props = attrs.len() as u64;
            let id = ctx.write()?.create_node(bp.label, attrs)?;
            rec.set_node(bp.slot, id);
            ctx.stats.nodes_created += 1;
            ctx.stats.properties_set += props;
        }
        for bp in &self.edges {
            let src = rec.node(bp.src_slot)?;
            let dst = rec.node(bp.dst_slot)?;
            let attrs: AttributeSet = bp.attrs.iter().cloned().collect();
            let props = attrs.len() as u64;
            let id = ctx.write()?.create_edge(src, dst, bp.rel, attrs)?;
            if let Some(slot) = bp.slot {
                rec.set_edge(slot, id);
            }
            ctx.stats.edges_created += 1;
            ctx.stats.properties_set += props;
        }
        Ok(())
    }
}

impl PhysicalOp for Create {
    fn name(&self) -> &'static str {
        "Create"
    }

    fn init(&mut self, ctx: &mut ExecCtx<'_>) -> ExecResult<()> {
        // Fail read-only queries before producing anything.
        ctx.write()?;
        crate::op::init_child(&mut self.child, ctx)
    }

    fn consume(&mut self, ctx: &mut ExecCtx<'_>) -> ExecResult<Option<Record>> {
        if ctx.cancelled() {
            return Ok(None);
        }
        let mut rec = match &mut self.child {
            None => {
                if self.exhausted {
                    return Ok(None);
                }
                self.exhausted = true;
                ctx.pool.lease()
            }
            Some(child) => match child.consume(ctx)? {
                Some(rec) => rec,
                None => return Ok(None),
            },
        };
        self.apply(&mut rec, ctx)?;
        Ok(Some(rec))
    }

    fn reset(&mut self) {
        self.exhausted = false;
        if let Some(child) = &mut self.child {
            child.reset();
        }
    }

    fn boxed_clone(&self) -> Box<dyn PhysicalOp> {
        Box::new(Self::new(
            self.child.as_ref().map(|c| c.boxed_clone()),
            self.nodes.clone(),
            self.edges.clone(),
        ))
    }
}
