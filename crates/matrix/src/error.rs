use thiserror::Error;

pub type Result<T> = core::result::Result<T, DeltaError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeltaError {
    #[error(transparent)]
    Sparse(#[from] lattice_sparse::SparseError),
}
