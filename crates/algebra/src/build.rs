//! Compiling a pattern path into algebraic expressions.
//!
//! A path becomes one expression per *traversal segment*. Segments break at
//! nodes another part of the query references (their bindings must surface in
//! records), and around edges that need individual treatment: named edges
//! (their ids must be bound per hop) and variable-length edges (their
//! evaluation loops). Anonymous interior hops fuse into a single product, so
//! `(:X)-[]->()-[]->(:Y)` costs one expression, not two.

use lattice_data_structures::map::HashSet;

use crate::expression::{AlgebraicExpression, Operand, RelationOperand};
use crate::query_graph::QueryGraph;
use crate::{AlgebraError, Result};

/// Builds the expressions for `path`.
///
/// `bound` holds the aliases referenced outside the path itself (returned,
/// filtered on, shared with other paths); their nodes become segment
/// boundaries. `pinned` holds the aliases an earlier clause already bound
/// into records. The traversal entry point is chosen here: when the far
/// endpoint is pinned (its frontier is already known) or carries the cheaper
/// label filter, the whole path is reversed so evaluation starts there.
pub fn build_path(
    mut path: QueryGraph,
    bound: &HashSet<Box<str>>,
    pinned: &HashSet<Box<str>>,
) -> Result<Vec<AlgebraicExpression>> {
    if path.edges.is_empty() {
        return Err(AlgebraError::EmptyPath);
    }
    debug_assert_eq!(path.nodes.len(), path.edges.len() + 1);

    if should_reverse(&path, pinned) {
        log::trace!("reversing path to start at `{}`", path.nodes.last().unwrap().alias);
        path.reverse();
    }

    let mut exprs: Vec<AlgebraicExpression> = Vec::new();
    let mut segment_start = 0usize;
    let edge_count = path.edges.len();

    // Whether the next segment must re-apply its source node's diagonal
    // filters. True at the head of the path and right after a
    // variable-length segment (whose hop loop cannot carry endpoint
    // filters); false elsewhere, because the previous segment's destination
    // filters already restricted the frontier.
    let needs_src_labels =
        |exprs: &Vec<AlgebraicExpression>| exprs.last().is_none_or(|e| e.var_len.is_some());

    for i in 0..edge_count {
        let standalone = path.edges[i].alias.is_some() || path.edges[i].range.is_some();
        if standalone {
            if segment_start < i {
                let apply = needs_src_labels(&exprs);
                exprs.push(fused_segment(&path, segment_start, i, apply));
            }
            if path.edges[i].range.is_some() {
                if needs_src_labels(&exprs) && !path.nodes[i].labels.is_empty() {
                    exprs.push(label_filter_segment(&path, i));
                }
                exprs.push(var_len_segment(&path, i));
            } else {
                let apply = needs_src_labels(&exprs);
                exprs.push(edge_segment(&path, i, apply));
            }
            segment_start = i + 1;
            continue;
        }
        if bound.contains(path.nodes[i + 1].alias.as_ref()) {
            let apply = needs_src_labels(&exprs);
            exprs.push(fused_segment(&path, segment_start, i + 1, apply));
            segment_start = i + 1;
        }
    }
    if segment_start < edge_count {
        let apply = needs_src_labels(&exprs);
        exprs.push(fused_segment(&path, segment_start, edge_count, apply));
    } else if needs_src_labels(&exprs) && !path.nodes[edge_count].labels.is_empty() {
        // The path ended on a variable-length hop into a labeled node; the
        // filter runs as its own diagonal-only segment.
        exprs.push(label_filter_segment(&path, edge_count));
    }
    Ok(exprs)
}

/// Whether starting from the far endpoint is cheaper. Pinned endpoints win
/// outright (their frontier is a handful of rows); otherwise the endpoint
/// with the smaller label filter wins.
fn should_reverse(path: &QueryGraph, pinned: &HashSet<Box<str>>) -> bool {
    let last = path.nodes.len() - 1;
    let first_bound = pinned.contains(path.nodes[0].alias.as_ref());
    let last_bound = pinned.contains(path.nodes[last].alias.as_ref());
    match (first_bound, last_bound) {
        (true, _) => false,
        (false, true) => true,
        (false, false) => path.endpoint_score(last) < path.endpoint_score(0),
    }
}

/// Expression for the anonymous hops `edges[from..to]`, fused into one
/// product.
fn fused_segment(path: &QueryGraph, from: usize, to: usize, src_labels: bool) -> AlgebraicExpression {
    let mut expr = AlgebraicExpression::new(
        path.nodes[from].alias.clone(),
        path.nodes[to].alias.clone(),
    );
    if src_labels {
        push_labels(&mut expr, path, from);
    }
    for k in from..to {
        expr.push(Operand::Relation(relation_operand(path, k)));
        push_labels(&mut expr, path, k + 1);
    }
    expr
}

/// Expression for a single named edge: it stands alone so the traversal can
/// bind each distinct edge id.
fn edge_segment(path: &QueryGraph, i: usize, src_labels: bool) -> AlgebraicExpression {
    let mut expr = fused_segment(path, i, i + 1, src_labels);
    expr.edge = path.edges[i].alias.clone();
    expr
}

/// Expression for a variable-length edge: one relation operand the operator
/// applies `min..=max` times. Endpoint diagonal filters stay outside the hop
/// loop, in neighboring segments or a [`label_filter_segment`].
fn var_len_segment(path: &QueryGraph, i: usize) -> AlgebraicExpression {
    let mut expr = AlgebraicExpression::new(
        path.nodes[i].alias.clone(),
        path.nodes[i + 1].alias.clone(),
    );
    expr.var_len = path.edges[i].range;
    expr.push(Operand::Relation(relation_operand(path, i)));
    expr
}

/// A diagonal-only expression filtering the node at `idx` by its labels.
/// Source and destination are the same binding; evaluation either keeps or
/// drops each frontier row.
fn label_filter_segment(path: &QueryGraph, idx: usize) -> AlgebraicExpression {
    let alias = path.nodes[idx].alias.clone();
    let mut expr = AlgebraicExpression::new(alias.clone(), alias);
    push_labels(&mut expr, path, idx);
    expr
}

fn push_labels(expr: &mut AlgebraicExpression, path: &QueryGraph, node: usize) {
    for &label in &path.nodes[node].labels {
        expr.push(Operand::Label(label));
    }
}

fn relation_operand(path: &QueryGraph, edge: usize) -> RelationOperand {
    let e = &path.edges[edge];
    RelationOperand {
        rels: e.rel_types.clone(),
        transposed: matches!(e.direction, crate::Direction::Incoming),
    }
}
