//! The operators.
//!
//! Scans source records from matrices; traversals feed batched frontiers
//! through algebraic expressions; the write operators drive graph-store
//! mutations; `Filter` and `ProcCall` round out what a plan can express.

mod cond_traverse;
mod create;
mod delete;
mod expand_into;
mod filter;
mod proc_call;
mod scan;
mod var_len_traverse;

pub use cond_traverse::CondTraverse;
pub use create::{Create, EdgeBlueprint, NodeBlueprint};
pub use delete::Delete;
pub use expand_into::ExpandInto;
pub use filter::{CmpOp, Filter, FilterValue, Predicate};
pub use proc_call::ProcCall;
pub use scan::{AllNodeScan, LabelScan};
pub use var_len_traverse::VarLenTraverse;

use lattice_primitives::SlotId;
use lattice_sparse::SparseMatrix;

use crate::record::Record;
use crate::ExecResult;

/// Builds the frontier matrix for a batch: `F[k, src_k] = 1` for the node
/// bound at `src_slot` of the k-th batched record.
pub(crate) fn build_frontier(
    batch: &[Record],
    src_slot: SlotId,
    dim: u64,
) -> ExecResult<SparseMatrix> {
    let mut f = SparseMatrix::new(batch.len() as u64, dim);
    for (row, rec) in batch.iter().enumerate() {
        f.set_element(row as u64, rec.node(src_slot)?.0)?;
    }
    Ok(f)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use lattice_algebra::{AlgebraicExpression, Operand, RelationOperand};
    use lattice_primitives::{NodeId, RelTypeId};
    use lattice_store::{AttributeSet, GraphStore, Locking, Value};
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::context::{ExecCtx, TxHandle};
    use crate::op::PhysicalOp;
    use crate::pool::RecordPool;
    use crate::procedures::ProcedureRegistry;

    /// R = {(0,1),(1,2),(1,3)}, labels X = {0}.
    fn fixture() -> Locking {
        let db = Locking::new(GraphStore::new());
        let mut tx = db.begin_write();
        let x = tx.add_label("X");
        let r = tx.add_rel_type("R");
        let n0 = tx.create_node(Some(x), AttributeSet::default()).unwrap();
        let n1 = tx.create_node(None, AttributeSet::default()).unwrap();
        let n2 = tx.create_node(None, AttributeSet::default()).unwrap();
        let n3 = tx.create_node(None, AttributeSet::default()).unwrap();
        tx.create_edge(n0, n1, r, AttributeSet::default()).unwrap();
        tx.create_edge(n1, n2, r, AttributeSet::default()).unwrap();
        tx.create_edge(n1, n3, r, AttributeSet::default()).unwrap();
        tx.commit().unwrap();
        db
    }

    fn hop_expr(rel: u32) -> AlgebraicExpression {
        let mut expr = AlgebraicExpression::new("n", "m");
        expr.push(Operand::Relation(RelationOperand {
            rels: [RelTypeId(rel)].into_iter().collect(),
            transposed: false,
        }));
        expr
    }

    fn run(
        root: &mut dyn PhysicalOp,
        db: &Locking,
        width: usize,
    ) -> Vec<Record> {
        let tx = db.begin_read();
        let pool = RecordPool::new(width);
        let procedures = ProcedureRegistry::default();
        let cancel = AtomicBool::new(false);
        let mut ctx = ExecCtx::new(TxHandle::Read(&tx), &pool, &procedures, &cancel);
        root.init(&mut ctx).unwrap();
        let mut out = Vec::new();
        while let Some(rec) = root.consume(&mut ctx).unwrap() {
            out.push(rec);
        }
        out
    }

    fn dests(records: &[Record], slot: SlotId) -> Vec<u64> {
        let mut ids: Vec<u64> = records.iter().map(|r| r.node(slot).unwrap().0).collect();
        ids.sort_unstable();
        ids
    }

    #[test]
    fn traverse_expands_scanned_sources() {
        let db = fixture();
        let scan = Box::new(LabelScan::new(SlotId(0), lattice_primitives::LabelId(0)));
        let mut op = CondTraverse::new(scan, hop_expr(0), SlotId(0), SlotId(1), None);
        let records = run(&mut op, &db, 2);
        assert_eq!(dests(&records, SlotId(1)), vec![1]);
        assert_eq!(records[0].node(SlotId(0)).unwrap(), NodeId(0));
    }

    #[test]
    fn traverse_binds_every_multi_edge() {
        let db = fixture();
        {
            let mut tx = db.begin_write();
            let r = tx.rel_type_id("R").unwrap();
            tx.create_edge(NodeId(0), NodeId(1), r, AttributeSet::default()).unwrap();
            tx.commit().unwrap();
        }
        let scan = Box::new(LabelScan::new(SlotId(0), lattice_primitives::LabelId(0)));
        let mut expr = hop_expr(0);
        expr.edge = Some("e".into());
        let mut op = CondTraverse::new(scan, expr, SlotId(0), SlotId(1), Some(SlotId(2)));
        let records = run(&mut op, &db, 3);
        // One record per distinct edge id, node bindings repeated.
        assert_eq!(records.len(), 2);
        let mut edges: Vec<u64> = records.iter().map(|r| r.edge(SlotId(2)).unwrap().0).collect();
        edges.sort_unstable();
        assert_eq!(edges, vec![0, 3]);
        assert_eq!(dests(&records, SlotId(1)), vec![1, 1]);
    }

    #[test]
    fn expand_into_probes_the_bound_cell() {
        let db = fixture();
        // Upstream records arrive with both endpoints already bound.
        struct Fixed {
            ids: Vec<(u64, u64)>,
            pos: usize,
        }
        impl PhysicalOp for Fixed {
            fn name(&self) -> &'static str {
                "Fixed"
            }
            fn consume(&mut self, ctx: &mut ExecCtx<'_>) -> ExecResult<Option<Record>> {
                let Some(&(src, dst)) = self.ids.get(self.pos) else {
                    return Ok(None);
                };
                self.pos += 1;
                let mut rec = ctx.pool.lease();
                rec.set_node(SlotId(0), NodeId(src));
                rec.set_node(SlotId(1), NodeId(dst));
                Ok(Some(rec))
            }
            fn reset(&mut self) {
                self.pos = 0;
            }
            fn boxed_clone(&self) -> Box<dyn PhysicalOp> {
                Box::new(Fixed {
                    ids: self.ids.clone(),
                    pos: 0,
                })
            }
        }
        let child = Box::new(Fixed {
            ids: vec![(0, 2), (1, 2), (2, 2), (3, 2)],
            pos: 0,
        });
        let mut op = ExpandInto::new(child, hop_expr(0), SlotId(0), SlotId(1), None);
        let records = run(&mut op, &db, 2);
        // Only 1 -R-> 2 holds.
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].node(SlotId(0)).unwrap(), NodeId(1));
    }

    #[test]
    fn var_len_hop_windows() {
        // R = {(0,1),(1,2),(1,3)}, walking from node 0.
        let db = fixture();
        let cases = [
            ((2, 2), vec![2, 3]),
            ((1, 1), vec![1]),
            ((1, 3), vec![1, 2, 3]),
        ];
        for ((min, max), expected) in cases {
            let scan = Box::new(LabelScan::new(SlotId(0), lattice_primitives::LabelId(0)));
            let mut op = VarLenTraverse::new(scan, hop_expr(0), min, max, SlotId(0), SlotId(1));
            let records = run(&mut op, &db, 2);
            assert_eq!(dests(&records, SlotId(1)), expected, "hops {min}..{max}");
        }
    }

    #[test]
    fn var_len_closure_matches_power_union() {
        // The 1..k closure equals the union of the hop powers, exercised
        // over a cyclic graph.
        let db = Locking::new(GraphStore::new());
        {
            let mut tx = db.begin_write();
            let x = tx.add_label("X");
            let r = tx.add_rel_type("R");
            let n0 = tx.create_node(Some(x), AttributeSet::default()).unwrap();
            let n1 = tx.create_node(None, AttributeSet::default()).unwrap();
            let n2 = tx.create_node(None, AttributeSet::default()).unwrap();
            tx.create_edge(n0, n1, r, AttributeSet::default()).unwrap();
            tx.create_edge(n1, n2, r, AttributeSet::default()).unwrap();
            tx.create_edge(n2, n0, r, AttributeSet::default()).unwrap();
            tx.commit().unwrap();
        }
        let scan = Box::new(LabelScan::new(SlotId(0), lattice_primitives::LabelId(0)));
        let mut op = VarLenTraverse::new(scan, hop_expr(0), 1, 3, SlotId(0), SlotId(1));
        let records = run(&mut op, &db, 2);
        // Hops from 0: {1}, {2}, {0} — the union covers the whole cycle.
        assert_eq!(dests(&records, SlotId(1)), vec![0, 1, 2]);
    }

    #[test]
    fn filter_compares_attributes() {
        let db = fixture();
        let age = {
            let mut tx = db.begin_write();
            let age = tx.add_attr("age");
            tx.set_node_attr(NodeId(1), age, Value::Int(30)).unwrap();
            tx.set_node_attr(NodeId(2), age, Value::Int(20)).unwrap();
            tx.commit().unwrap();
            age
        };
        let scan = Box::new(AllNodeScan::new(SlotId(0)));
        let mut op = Filter::new(
            scan,
            vec![Predicate {
                lhs: FilterValue::NodeAttr {
                    slot: SlotId(0),
                    attr: age,
                },
                op: CmpOp::Ge,
                rhs: FilterValue::Const(Value::Int(25)),
            }],
        );
        let records = run(&mut op, &db, 1);
        // Nodes without the attribute are incomparable and filtered out.
        assert_eq!(dests(&records, SlotId(0)), vec![1]);
    }

    #[test]
    fn create_and_delete_drive_the_write_tx() {
        let db = fixture();
        {
            let mut tx = db.begin_write();
            let r = tx.rel_type_id("R").unwrap();
            let pool = RecordPool::new(2);
            let procedures = ProcedureRegistry::default();
            let cancel = AtomicBool::new(false);
            let mut ctx = ExecCtx::new(TxHandle::Write(&mut tx), &pool, &procedures, &cancel);

            let mut create = Create::new(
                None,
                vec![
                    NodeBlueprint {
                        slot: SlotId(0),
                        label: None,
                        attrs: vec![],
                    },
                    NodeBlueprint {
                        slot: SlotId(1),
                        label: None,
                        attrs: vec![],
                    },
                ],
                vec![EdgeBlueprint {
                    slot: None,
                    src_slot: SlotId(0),
                    dst_slot: SlotId(1),
                    rel: r,
                    attrs: vec![],
                }],
            );
            create.init(&mut ctx).unwrap();
            assert!(create.consume(&mut ctx).unwrap().is_some());
            assert!(create.consume(&mut ctx).unwrap().is_none());
            assert_eq!(ctx.stats.nodes_created, 2);
            assert_eq!(ctx.stats.edges_created, 1);
            tx.commit().unwrap();
        }
        assert_eq!(db.begin_read().node_count(), 6);

        {
            let mut tx = db.begin_write();
            let pool = RecordPool::new(1);
            let procedures = ProcedureRegistry::default();
            let cancel = AtomicBool::new(false);
            let mut ctx = ExecCtx::new(TxHandle::Write(&mut tx), &pool, &procedures, &cancel);

            let scan = Box::new(AllNodeScan::new(SlotId(0)));
            let mut del = Delete::new(scan, vec![SlotId(0)], vec![]);
            del.init(&mut ctx).unwrap();
            while del.consume(&mut ctx).unwrap().is_some() {}
            assert_eq!(ctx.stats.nodes_deleted, 6);
            assert_eq!(ctx.stats.edges_deleted, 4);
            tx.commit().unwrap();
        }
        let tx = db.begin_read();
        assert_eq!(tx.node_count(), 0);
        assert_eq!(tx.edge_count(), 0);
    }

    #[test]
    fn write_ops_reject_read_transactions() {
        let db = fixture();
        let tx = db.begin_read();
        let pool = RecordPool::new(1);
        let procedures = ProcedureRegistry::default();
        let cancel = AtomicBool::new(false);
        let mut ctx = ExecCtx::new(TxHandle::Read(&tx), &pool, &procedures, &cancel);
        let mut create = Create::new(None, vec![], vec![]);
        assert!(matches!(create.init(&mut ctx), Err(crate::ExecError::ReadOnly)));
    }

    #[test]
    fn cancellation_ends_the_stream_cleanly() {
        let db = fixture();
        let tx = db.begin_read();
        let pool = RecordPool::new(2);
        let procedures = ProcedureRegistry::default();
        let cancel = AtomicBool::new(false);
        let mut ctx = ExecCtx::new(TxHandle::Read(&tx), &pool, &procedures, &cancel);

        let scan = Box::new(AllNodeScan::new(SlotId(0)));
        let mut op = CondTraverse::new(scan, hop_expr(0), SlotId(0), SlotId(1), None);
        op.init(&mut ctx).unwrap();
        let first = op.consume(&mut ctx).unwrap().unwrap();
        ctx.pool.give_back(first);

        cancel.store(true, Ordering::Relaxed);
        assert!(op.consume(&mut ctx).unwrap().is_none());
        // Batched source records went back to the pool on the way out.
        assert!(ctx.pool.idle() > 0);
    }
}
