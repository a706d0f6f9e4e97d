//! latticedb — a property-graph engine over sparse boolean matrices.
//!
//! Graphs are stored as one delta matrix per label and per relationship type
//! (plus a reverse adjacency per type); query patterns compile into algebraic
//! expressions whose evaluation is a chain of masked sparse multiplications.
//! This crate is the glue: the consumed query AST, the planner that turns it
//! into an execution plan, the procedure registry, and the produced
//! result-set protocol.

pub mod ast;
mod error;
mod planner;
mod procedures;
mod protocol;

use std::sync::atomic::AtomicBool;

use lattice_execution::{Entry, ProfileReport, ProfileSheet, QueryStats, Record, TxHandle};
use lattice_store::GraphStore;

use planner::{OutputSource, PlanEnv, PreparedQuery, plan_query};

pub use error::{Error, Result};
pub use lattice_execution::{OpProfile, Procedure, ProcedureRegistry};
pub use lattice_primitives::{AttrId, EdgeId, LabelId, NodeId, RelTypeId};
pub use lattice_store::{AttributeSet, Locking, Value};
pub use protocol::{Column, ColumnKind, ResultCell, ResultSet};

/// Per-process engine context: the graph behind its lock plus the procedure
/// registry. Passed explicitly wherever it is needed; the engine keeps no
/// global state.
pub struct Context {
    graph: Locking,
    procedures: ProcedureRegistry,
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl Context {
    pub fn new() -> Self {
        Self {
            graph: Locking::new(GraphStore::new()),
            procedures: procedures::builtin_registry(),
        }
    }

    pub fn graph(&self) -> &Locking {
        &self.graph
    }

    /// Registers additional procedures beyond the built-ins.
    pub fn procedures_mut(&mut self) -> &mut ProcedureRegistry {
        &mut self.procedures
    }

    /// Plans and runs one query to completion.
    pub fn query(&self, query: &ast::Query) -> Result<ResultSet> {
        self.query_with_cancel(query, &AtomicBool::new(false))
    }

    /// [`query`](Self::query) with a cooperative cancellation flag. Tripping
    /// the flag ends the stream cleanly; whatever was produced up to that
    /// point is returned.
    pub fn query_with_cancel(&self, query: &ast::Query, cancel: &AtomicBool) -> Result<ResultSet> {
        if query.is_write() {
            // Exclusive lock for the whole transaction; pending deltas fold
            // into the committed matrices at commit.
            let mut tx = self.graph.begin_write();
            let mut env = PlanEnv::Write(&mut tx);
            let prepared = plan_query(query, &mut env, None)?;
            let (records, stats) = match &prepared.plan {
                Some(plan) => plan.execute(TxHandle::Write(&mut tx), &self.procedures, cancel)?,
                None => (Vec::new(), QueryStats::default()),
            };
            let result = materialize(&tx, &prepared, &records, stats);
            tx.commit()?;
            Ok(result)
        } else {
            // Shared lock: the snapshot is stable for the whole query.
            let tx = self.graph.begin_read();
            let mut env = PlanEnv::Read(&tx);
            let prepared = plan_query(query, &mut env, None)?;
            let (records, stats) = match &prepared.plan {
                Some(plan) => plan.execute(TxHandle::Read(&tx), &self.procedures, cancel)?,
                None => (Vec::new(), QueryStats::default()),
            };
            Ok(materialize(&tx, &prepared, &records, stats))
        }
    }

    /// Runs a read-only query with every operator wrapped in a timing shim,
    /// returning the per-operator profile alongside the results.
    pub fn profile(&self, query: &ast::Query) -> Result<(ResultSet, ProfileReport)> {
        if query.is_write() {
            return Err(Error::Unsupported("profiling a write query"));
        }
        let cancel = AtomicBool::new(false);
        let sheet = ProfileSheet::default();
        let tx = self.graph.begin_read();
        let mut env = PlanEnv::Read(&tx);
        let prepared = plan_query(query, &mut env, Some(sheet.clone()))?;
        let (records, stats) = match &prepared.plan {
            Some(plan) => plan.execute(TxHandle::Read(&tx), &self.procedures, &cancel)?,
            None => (Vec::new(), QueryStats::default()),
        };
        let result = materialize(&tx, &prepared, &records, stats);
        Ok((result, sheet.finalize()))
    }
}

/// Projects raw records into the client-protocol result set.
fn materialize(
    store: &GraphStore,
    prepared: &PreparedQuery,
    records: &[Record],
    stats: QueryStats,
) -> ResultSet {
    if prepared.projections.is_empty() {
        // No RETURN clause: the stream carries only side effects and stats.
        return ResultSet {
            columns: Vec::new(),
            rows: Vec::new(),
            stats,
        };
    }
    let rows = records
        .iter()
        .map(|rec| {
            prepared
                .projections
                .iter()
                .map(|proj| {
                    let entry = rec.get(proj.slot);
                    match proj.source {
                        OutputSource::Entity => match entry {
                            Entry::Node(id) => ResultCell::Node(*id),
                            Entry::Edge(id) => ResultCell::Edge(*id),
                            Entry::Scalar(value) => ResultCell::Scalar(value.clone()),
                            Entry::Unresolved => ResultCell::Null,
                        },
                        OutputSource::NodeProp(attr) => match (entry, attr) {
                            (Entry::Node(id), Some(attr)) => store
                                .node_attr(*id, attr)
                                .cloned()
                                .map(ResultCell::Scalar)
                                .unwrap_or(ResultCell::Null),
                            _ => ResultCell::Null,
                        },
                        OutputSource::EdgeProp(attr) => match (entry, attr) {
                            (Entry::Edge(id), Some(attr)) => store
                                .edge_attr(*id, attr)
                                .cloned()
                                .map(ResultCell::Scalar)
                                .unwrap_or(ResultCell::Null),
                            _ => ResultCell::Null,
                        },
                    }
                })
                .collect()
        })
        .collect();
    ResultSet {
        columns: prepared.columns.clone(),
        rows,
        stats,
    }
}
