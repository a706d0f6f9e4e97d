//! Sparse boolean matrix substrate.
//!
//! Every matrix in the engine is a *pattern*: a set of `(row, col)` cells.
//! There are no stored values — multiplication runs over the any-pair boolean
//! semiring (a result cell is present iff any `(a[i,k], b[k,j])` pair is),
//! and element-wise add/mult are pattern union/intersection.
//!
//! The API follows the shape of standard sparse-matrix libraries: an opaque
//! matrix handle, `mxm`/`e_wise_add`/`e_wise_mult`/`transpose`/`extract`
//! kernels taking an optional structural mask and a [`Descriptor`], and a
//! `wait` operation. Writes here apply eagerly, so `wait` completes
//! trivially; it is kept so callers can state *where* completion is required,
//! which is load-bearing for substrates that defer work.

mod error;
mod iter;
mod matrix;
pub mod ops;

pub use error::{Result, SparseError};
pub use iter::{MatrixIter, RowIter};
pub use matrix::SparseMatrix;

use bitflags::bitflags;

bitflags! {
    /// Modifies how a kernel treats its mask, output, and first input.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Descriptor: u8 {
        /// Use the mask's structure (cell presence). Boolean patterns have no
        /// values, so this is implied; accepted for contract parity.
        const STRUCTURE = 1 << 0;
        /// Complement the mask: a cell is writable iff *absent* from the mask.
        const COMPLEMENT = 1 << 1;
        /// Clear the output before writing results through the mask.
        const REPLACE = 1 << 2;
        /// Transpose the first input operand before the operation.
        const TRANSPOSE_FIRST = 1 << 3;
    }
}

impl Descriptor {
    /// Replace + structural complement mask. The shape used to subtract a
    /// deletion pattern from a freshly computed product.
    pub const RSC: Self = Self::REPLACE.union(Self::STRUCTURE).union(Self::COMPLEMENT);

    /// [`Self::RSC`] with the first input transposed. Combined with
    /// [`ops::transpose`] this copies the input unchanged through the mask.
    pub const RSCT0: Self = Self::RSC.union(Self::TRANSPOSE_FIRST);
}
