use lattice_matrix::delta_mxm;
use lattice_primitives::{LabelId, RelTypeId};
use lattice_sparse::{Descriptor, SparseMatrix, ops};
use lattice_store::GraphStore;
use smallvec::SmallVec;

use crate::Result;

/// A relation-matrix operand: one or more relationship types (unioned), read
/// against or along the pattern direction.
///
/// Transposition never runs at evaluation time: the store maintains the
/// reverse adjacency as its own delta matrix, so a transposed operand just
/// resolves to that matrix instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationOperand {
    /// Empty means every registered relationship type.
    pub rels: SmallVec<[RelTypeId; 2]>,
    pub transposed: bool,
}

/// One multiplicand in an algebraic expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    /// A label matrix used as a diagonal filter.
    Label(LabelId),
    /// A relation adjacency matrix.
    Relation(RelationOperand),
}

/// An ordered product of matrices representing one traversal segment.
///
/// Evaluating the expression with a frontier `F` computes
/// `F · op₀ · op₁ · …` where each multiplication is a delta multiply, so the
/// result reflects pending additions and deletions without synchronizing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlgebraicExpression {
    operands: Vec<Operand>,
    /// Alias of the node the frontier rows are bound to.
    pub src: Box<str>,
    /// Alias of the node the result columns bind.
    pub dest: Box<str>,
    /// Alias to bind matched edge ids to, when the pattern names the edge.
    pub edge: Option<Box<str>>,
    /// Hop bounds for a variable-length segment.
    pub var_len: Option<(u32, u32)>,
}

impl AlgebraicExpression {
    pub fn new(src: impl Into<Box<str>>, dest: impl Into<Box<str>>) -> Self {
        let (src, dest) = (src.into(), dest.into());
        Self {
            operands: Vec::new(),
            src,
            dest,
            edge: None,
            var_len: None,
        }
    }

    pub fn operands(&self) -> &[Operand] {
        &self.operands
    }

    pub fn push(&mut self, operand: Operand) {
        // Collapse immediately repeated diagonal filters; applying the same
        // label twice is a no-op.
        if self.operands.last() == Some(&operand) && matches!(operand, Operand::Label(_)) {
            return;
        }
        self.operands.push(operand);
    }

    /// The label of a leading diagonal operand, if the expression starts
    /// with one.
    pub fn leading_label(&self) -> Option<LabelId> {
        match self.operands.first() {
            Some(Operand::Label(label)) => Some(*label),
            _ => None,
        }
    }

    /// Drops the leading diagonal operand when it filters by `label`.
    ///
    /// Used when the operator feeding this expression already produces a
    /// frontier restricted to `label`, making the filter redundant.
    pub fn strip_leading_label(&mut self, label: LabelId) -> bool {
        if self.leading_label() == Some(label) {
            self.operands.remove(0);
            true
        } else {
            false
        }
    }

    /// The relation operand of a single-hop expression, used for edge-id
    /// binding.
    pub fn edge_relation(&self) -> Option<&RelationOperand> {
        let mut rels = self.operands.iter().filter_map(|op| match op {
            Operand::Relation(rel) => Some(rel),
            Operand::Label(_) => None,
        });
        let first = rels.next()?;
        rels.next().is_none().then_some(first)
    }

    /// Reverses the traversal direction by transposing the whole expression:
    /// the operand product reverses, every relation operand flips, and the
    /// source and destination bindings swap. Diagonal label operands are
    /// symmetric and pass through unchanged.
    pub fn swap_source_dest(&mut self) {
        self.operands.reverse();
        for op in &mut self.operands {
            if let Operand::Relation(rel) = op {
                rel.transposed = !rel.transposed;
            }
        }
        std::mem::swap(&mut self.src, &mut self.dest);
    }

    /// `out = F · self`, folding the frontier through each operand left to
    /// right. `out` must be `F.nrows() × store.dim()`.
    pub fn evaluate(&self, f: &SparseMatrix, out: &mut SparseMatrix, store: &GraphStore) -> Result<()> {
        let nrows = f.nrows();
        let dim = store.dim();
        let mut cur = f.clone();
        let mut next = SparseMatrix::new(nrows, dim);
        for operand in &self.operands {
            Self::multiply_operand(&mut next, &cur, operand, store)?;
            std::mem::swap(&mut cur, &mut next);
            if cur.is_empty() {
                break;
            }
        }
        *out = cur;
        Ok(())
    }

    fn multiply_operand(
        out: &mut SparseMatrix,
        f: &SparseMatrix,
        operand: &Operand,
        store: &GraphStore,
    ) -> Result<()> {
        match operand {
            Operand::Label(label) => {
                delta_mxm(out, f, store.label_matrix(*label)?, Descriptor::default())?;
            }
            Operand::Relation(rel_op) => Self::multiply_relation(out, f, rel_op, store)?,
        }
        Ok(())
    }

    fn multiply_relation(
        out: &mut SparseMatrix,
        f: &SparseMatrix,
        rel_op: &RelationOperand,
        store: &GraphStore,
    ) -> Result<()> {
        let mut rels: SmallVec<[RelTypeId; 2]> = rel_op.rels.clone();
        if rels.is_empty() {
            rels.extend(store.rel_types().map(|(id, _)| id));
        }

        match rels.split_first() {
            None => {
                // No relationship types registered at all: nothing matches.
                *out = SparseMatrix::new(f.nrows(), store.dim());
            }
            Some((&first, rest)) => {
                delta_mxm(out, f, relation_matrix(store, first, rel_op.transposed)?, Descriptor::default())?;
                // A multi-type edge is the union over its types.
                let mut hop = SparseMatrix::new(f.nrows(), store.dim());
                let mut acc = SparseMatrix::new(f.nrows(), store.dim());
                for &rel in rest {
                    delta_mxm(&mut hop, f, relation_matrix(store, rel, rel_op.transposed)?, Descriptor::default())?;
                    ops::e_wise_add(&mut acc, None, out, &hop, Descriptor::default())?;
                    std::mem::swap(out, &mut acc);
                }
            }
        }
        Ok(())
    }
}

/// Resolves a relation operand to its matrix: transposition picks the
/// store's reverse adjacency instead of transposing anything.
pub fn relation_matrix(
    store: &GraphStore,
    rel: RelTypeId,
    transposed: bool,
) -> Result<&lattice_matrix::DeltaMatrix> {
    let pair = store.relation(rel)?;
    Ok(if transposed { &pair.reverse } else { &pair.forward })
}

#[cfg(test)]
mod tests {
    use lattice_primitives::NodeId;
    use lattice_store::AttributeSet;
    use pretty_assertions::assert_eq;

    use super::*;

    /// 0 -a-> 1 -a-> 2, 1 -b-> 2, labels X = {0}, Y = {2}.
    fn fixture() -> GraphStore {
        let mut g = GraphStore::new();
        let x = g.add_label("X");
        let y = g.add_label("Y");
        let a = g.add_rel_type("a");
        let b = g.add_rel_type("b");
        let n0 = g.create_node(Some(x), AttributeSet::default()).unwrap().id;
        let n1 = g.create_node(None, AttributeSet::default()).unwrap().id;
        let n2 = g.create_node(Some(y), AttributeSet::default()).unwrap().id;
        g.create_edge(n0, n1, a, AttributeSet::default()).unwrap();
        g.create_edge(n1, n2, a, AttributeSet::default()).unwrap();
        g.create_edge(n1, n2, b, AttributeSet::default()).unwrap();
        g.synchronize_all().unwrap();
        g
    }

    fn frontier(store: &GraphStore, sources: &[NodeId]) -> SparseMatrix {
        let mut f = SparseMatrix::new(sources.len() as u64, store.dim());
        for (row, src) in sources.iter().enumerate() {
            f.set_element(row as u64, src.0).unwrap();
        }
        f
    }

    fn rel(rels: &[RelTypeId], transposed: bool) -> Operand {
        Operand::Relation(RelationOperand {
            rels: rels.iter().copied().collect(),
            transposed,
        })
    }

    fn destinations(out: &SparseMatrix) -> Vec<u64> {
        out.iter().map(|(_, col)| col).collect()
    }

    #[test]
    fn evaluate_folds_left_to_right() {
        let g = fixture();
        let a = g.rel_type_id("a").unwrap();
        let b = g.rel_type_id("b").unwrap();
        let y = g.label_id("Y").unwrap();

        let mut expr = AlgebraicExpression::new("n", "m");
        expr.push(rel(&[a], false));
        expr.push(rel(&[b], false));
        expr.push(Operand::Label(y));

        let mut out = SparseMatrix::new(1, g.dim());
        expr.evaluate(&frontier(&g, &[NodeId(0)]), &mut out, &g).unwrap();
        assert_eq!(destinations(&out), vec![2]);
    }

    #[test]
    fn transposed_operand_walks_edges_backwards() {
        let g = fixture();
        let a = g.rel_type_id("a").unwrap();
        let mut expr = AlgebraicExpression::new("n", "m");
        expr.push(rel(&[a], true));

        let mut out = SparseMatrix::new(1, g.dim());
        expr.evaluate(&frontier(&g, &[NodeId(2)]), &mut out, &g).unwrap();
        assert_eq!(destinations(&out), vec![1]);
    }

    #[test]
    fn multi_type_operand_unions_matrices() {
        let g = fixture();
        let a = g.rel_type_id("a").unwrap();
        let b = g.rel_type_id("b").unwrap();
        let mut expr = AlgebraicExpression::new("n", "m");
        expr.push(rel(&[a, b], false));

        let mut out = SparseMatrix::new(1, g.dim());
        expr.evaluate(&frontier(&g, &[NodeId(1)]), &mut out, &g).unwrap();
        assert_eq!(destinations(&out), vec![2]);

        // Any-type operand (empty set) matches the same here.
        let mut any = AlgebraicExpression::new("n", "m");
        any.push(rel(&[], false));
        let mut out2 = SparseMatrix::new(1, g.dim());
        any.evaluate(&frontier(&g, &[NodeId(1)]), &mut out2, &g).unwrap();
        assert_eq!(out2, out);
    }

    #[test]
    fn swap_source_dest_transposes_the_whole_expression() {
        let g = fixture();
        let a = g.rel_type_id("a").unwrap();
        let b = g.rel_type_id("b").unwrap();
        let y = g.label_id("Y").unwrap();

        let mut expr = AlgebraicExpression::new("n", "m");
        expr.push(rel(&[a], false));
        expr.push(rel(&[b], false));
        expr.push(Operand::Label(y));
        expr.swap_source_dest();

        assert_eq!(expr.src, "m".into());
        assert_eq!(expr.dest, "n".into());
        assert_eq!(
            expr.operands(),
            &[
                Operand::Label(y),
                rel(&[b], true),
                rel(&[a], true),
            ]
        );

        // Walking back from node 2 lands on node 0.
        let mut out = SparseMatrix::new(1, g.dim());
        expr.evaluate(&frontier(&g, &[NodeId(2)]), &mut out, &g).unwrap();
        assert_eq!(destinations(&out), vec![0]);
    }

    #[test]
    fn strip_leading_label_only_matches_its_label() {
        let g = fixture();
        let x = g.label_id("X").unwrap();
        let y = g.label_id("Y").unwrap();
        let a = g.rel_type_id("a").unwrap();

        let mut expr = AlgebraicExpression::new("n", "m");
        expr.push(Operand::Label(x));
        expr.push(rel(&[a], false));
        assert!(!expr.strip_leading_label(y));
        assert!(expr.strip_leading_label(x));
        assert_eq!(expr.operands().len(), 1);
    }

    #[test]
    fn repeated_diagonal_filters_collapse() {
        let x = LabelId(0);
        let mut expr = AlgebraicExpression::new("n", "m");
        expr.push(Operand::Label(x));
        expr.push(Operand::Label(x));
        assert_eq!(expr.operands().len(), 1);
    }
}
