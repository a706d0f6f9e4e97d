//! Delta matrices.
//!
//! A [`DeltaMatrix`] presents one logical boolean adjacency matrix backed by
//! three sparse matrices: the committed state `M`, pending additions `M⁺`,
//! and pending deletions `M⁻`. Writes touch only `M⁺`/`M⁻`, so a reader
//! holding the committed view observes a stable past state no matter how many
//! writes have queued up behind it. [`synchronize`](DeltaMatrix::synchronize)
//! folds the pending matrices into `M` and empties them.
//!
//! [`delta_mxm`] multiplies a frontier against the *logical* matrix
//! `(M ∪ M⁺) \ M⁻` without ever materializing it, which keeps the per-query
//! cost proportional to the (small) pending patterns rather than the full
//! adjacency.

mod delta_matrix;
mod error;
mod iter;
mod mxm;

pub use delta_matrix::{ClearOutcome, DeltaMatrix, SetOutcome};
pub use error::{DeltaError, Result};
pub use iter::DeltaIter;
pub use mxm::delta_mxm;
