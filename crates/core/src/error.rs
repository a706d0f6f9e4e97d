use thiserror::Error;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("unknown alias `{0}`")]
    UnknownAlias(Box<str>),
    #[error("alias `{0}` is bound twice with different kinds")]
    AliasKindMismatch(Box<str>),
    #[error("unsupported query shape: {0}")]
    Unsupported(&'static str),
    #[error(transparent)]
    Store(#[from] lattice_store::StoreError),
    #[error(transparent)]
    Algebra(#[from] lattice_algebra::AlgebraError),
    #[error(transparent)]
    Exec(#[from] lattice_execution::ExecError),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<lattice_matrix::DeltaError> for Error {
    fn from(err: lattice_matrix::DeltaError) -> Self {
        Error::Store(err.into())
    }
}

impl From<lattice_sparse::SparseError> for Error {
    fn from(err: lattice_sparse::SparseError) -> Self {
        Error::Store(err.into())
    }
}
