use lattice_primitives::SlotId;
use thiserror::Error;

pub type ExecResult<T> = core::result::Result<T, ExecError>;

#[derive(Error, Debug)]
pub enum ExecError {
    #[error("record slot {0} does not hold a node")]
    NotANode(SlotId),
    #[error("record slot {0} does not hold an edge")]
    NotAnEdge(SlotId),
    #[error("procedure `{0}` not registered")]
    UnknownProcedure(Box<str>),
    #[error("procedure `{name}` expects {expected} arguments, got {got}")]
    ProcedureArity {
        name: Box<str>,
        expected: usize,
        got: usize,
    },
    #[error("write operator in a read-only query")]
    ReadOnly,
    #[error(transparent)]
    Algebra(#[from] lattice_algebra::AlgebraError),
    #[error(transparent)]
    Store(#[from] lattice_store::StoreError),
}

impl From<lattice_sparse::SparseError> for ExecError {
    fn from(err: lattice_sparse::SparseError) -> Self {
        ExecError::Store(err.into())
    }
}

impl From<lattice_matrix::DeltaError> for ExecError {
    fn from(err: lattice_matrix::DeltaError) -> Self {
        ExecError::Store(err.into())
    }
}
