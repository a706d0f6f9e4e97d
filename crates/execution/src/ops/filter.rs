use std::cmp::Ordering;

use lattice_primitives::{AttrId, SlotId};
use lattice_store::{GraphStore, Value};

use crate::context::ExecCtx;
use crate::op::PhysicalOp;
use crate::record::{Entry, Record};
use crate::ExecResult;

/// One side of a comparison.
#[derive(Debug, Clone)]
pub enum FilterValue {
    Const(Value),
    /// A scalar slot (procedure yield, unwound value).
    Slot(SlotId),
    /// An attribute of the node bound at `slot`.
    NodeAttr { slot: SlotId, attr: AttrId },
    /// An attribute of the edge bound at `slot`.
    EdgeAttr { slot: SlotId, attr: AttrId },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

/// `lhs op rhs` over attribute/scalar values. Incomparable operands (type
/// mismatch, missing attribute, null) never match.
#[derive(Debug, Clone)]
pub struct Predicate {
    pub lhs: FilterValue,
    pub op: CmpOp,
    pub rhs: FilterValue,
}

impl FilterValue {
    fn resolve(&self, rec: &Record, store: &GraphStore) -> ExecResult<Value> {
        Ok(match self {
            FilterValue::Const(v) => v.clone(),
            FilterValue::Slot(slot) => match rec.get(*slot) {
                Entry::Scalar(v) => v.clone(),
                _ => Value::Null,
            },
            FilterValue::NodeAttr { slot, attr } => {
                let node = rec.node(*slot)?;
                store.node_attr(node, *attr).cloned().unwrap_or(Value::Null)
            }
            FilterValue::EdgeAttr { slot, attr } => {
                let edge = rec.edge(*slot)?;
                store.edge_attr(edge, *attr).cloned().unwrap_or(Value::Null)
            }
        })
    }
}

impl Predicate {
    fn matches(&self, rec: &Record, store: &GraphStore) -> ExecResult<bool> {
        let lhs = self.lhs.resolve(rec, store)?;
        let rhs = self.rhs.resolve(rec, store)?;
        let Some(ord) = lhs.compare(&rhs) else {
            return Ok(false);
        };
        Ok(match self.op {
            CmpOp::Eq => ord == Ordering::Equal,
            CmpOp::Ne => ord != Ordering::Equal,
            CmpOp::Lt => ord == Ordering::Less,
            CmpOp::Le => ord != Ordering::Greater,
            CmpOp::Gt => ord == Ordering::Greater,
            CmpOp::Ge => ord != Ordering::Less,
        })
    }
}

/// Passes through records satisfying every predicate (conjunction).
pub struct Filter {
    child: Box<dyn PhysicalOp>,
    predicates: Vec<Predicate>,
}

impl Filter {
    pub fn new(child: Box<dyn PhysicalOp>, predicates: Vec<Predicate>) -> Self {
        Self { child, predicates }
    }
}

impl PhysicalOp for Filter {
    fn name(&self) -> &'static str {
        "Filter"
    }

    fn init(&mut self, ctx: &mut ExecCtx<'_>) -> ExecResult<()> {
        self.child.init(ctx)
    }

    fn consume(&mut self, ctx: &mut ExecCtx<'_>) -> ExecResult<Option<Record>> {
        loop {
            if ctx.cancelled() {
                return Ok(None);
            }
            let Some(rec) = self.child.consume(ctx)? else {
                return Ok(None);
            };
            let mut keep = true;
            for pred in &self.predicates {
                if !pred.matches(&rec, ctx.store())? {
                    keep = false;
                    break;
                }
            }
            if keep {
                return Ok(Some(rec));
            }
            ctx.pool.give_back(rec);
        }
    }

    fn reset(&mut self) {
        self.child.reset();
    }

    fn boxed_clone(&self) -> Box<dyn PhysicalOp> {
        Box::new(Self::new(self.child.boxed_clone(), self.predicates.clone()))
    }
}
