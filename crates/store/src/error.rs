use lattice_primitives::{EdgeId, LabelId, NodeId, RelTypeId};
use thiserror::Error;

pub type Result<T> = core::result::Result<T, StoreError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("node {0} not found")]
    NodeNotFound(NodeId),
    #[error("edge {0} not found")]
    EdgeNotFound(EdgeId),
    #[error("label {0} not registered")]
    LabelNotFound(LabelId),
    #[error("relationship type {0} not registered")]
    RelTypeNotFound(RelTypeId),
    #[error(transparent)]
    Delta(#[from] lattice_matrix::DeltaError),
}

impl From<lattice_sparse::SparseError> for StoreError {
    fn from(err: lattice_sparse::SparseError) -> Self {
        StoreError::Delta(err.into())
    }
}
