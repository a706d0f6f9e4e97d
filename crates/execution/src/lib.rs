//! The query engine.
//!
//! An execution plan is a tree of pull-based operators. The root's
//! `consume()` drives its child, which drives its own child, down to a scan;
//! every call either returns one [`Record`] or signals end-of-stream with
//! `None`. Records are fixed-width slot arrays leased from a per-plan pool.
//!
//! Planning produces a *template* tree; each execution runs on a clone so
//! that operator state (frontier batches, matrix iterators) never bleeds
//! between concurrent executions of the same plan.

mod context;
mod error;
mod op;
mod plan;
mod pool;
mod procedures;
mod profile;
mod record;

pub mod ops;

pub use context::{ExecCtx, QueryStats, TxHandle};
pub use error::{ExecError, ExecResult};
pub use op::PhysicalOp;
pub use plan::ExecutionPlan;
pub use pool::RecordPool;
pub use procedures::{Procedure, ProcedureRegistry};
pub use profile::{OpProfile, ProfileOp, ProfileReport, ProfileSheet};
pub use record::{Entry, Record};

/// Rows batched into one traversal frontier before evaluating the algebraic
/// expression. Small enough to keep the frontier hypersparse, large enough to
/// amortize the multiply.
pub const TRAVERSE_BATCH_SIZE: usize = 16;
