use thiserror::Error;

pub type Result<T> = core::result::Result<T, SparseError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SparseError {
    #[error("index ({row}, {col}) out of bounds for {nrows}x{ncols} matrix")]
    IndexOutOfBounds {
        row: u64,
        col: u64,
        nrows: u64,
        ncols: u64,
    },
    #[error("{op}: inner dimensions differ: left is {left_nrows}x{left_ncols}, right is {right_nrows}x{right_ncols}")]
    InnerDimensionMismatch {
        op: &'static str,
        left_nrows: u64,
        left_ncols: u64,
        right_nrows: u64,
        right_ncols: u64,
    },
    #[error("{op}: output must be {nrows}x{ncols}, got {got_nrows}x{got_ncols}")]
    OutputDimensionMismatch {
        op: &'static str,
        nrows: u64,
        ncols: u64,
        got_nrows: u64,
        got_ncols: u64,
    },
    #[error("{op}: mask must be {nrows}x{ncols}, got {got_nrows}x{got_ncols}")]
    MaskDimensionMismatch {
        op: &'static str,
        nrows: u64,
        ncols: u64,
        got_nrows: u64,
        got_ncols: u64,
    },
}
