//! Traversal algebra.
//!
//! A matched path pattern compiles into a small number of
//! [`AlgebraicExpression`]s: ordered products of label matrices (diagonal
//! filters) and relation matrices (possibly transposed), evaluated by feeding
//! a frontier matrix through delta multiplications left to right. The
//! traversal operators own the frontier batching; this crate owns what gets
//! multiplied, in which order, and which matrix each operand resolves to.

mod build;
mod expression;
mod query_graph;

pub use build::build_path;
pub use expression::{AlgebraicExpression, Operand, RelationOperand, relation_matrix};
pub use query_graph::{Direction, QueryGraph, QueryEdge, QueryNode};

use thiserror::Error;

pub type Result<T> = core::result::Result<T, AlgebraError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AlgebraError {
    #[error("pattern path has no edges")]
    EmptyPath,
    #[error(transparent)]
    Store(#[from] lattice_store::StoreError),
}

impl From<lattice_matrix::DeltaError> for AlgebraError {
    fn from(err: lattice_matrix::DeltaError) -> Self {
        AlgebraError::Store(err.into())
    }
}

impl From<lattice_sparse::SparseError> for AlgebraError {
    fn from(err: lattice_sparse::SparseError) -> Self {
        AlgebraError::Store(lattice_store::StoreError::from(err))
    }
}
