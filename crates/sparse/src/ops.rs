//! Pattern kernels over the any-pair boolean semiring.
//!
//! All kernels write into a caller-allocated output matrix whose dimensions
//! must already match the operation, and accept an optional structural mask
//! plus a [`Descriptor`]. Mask semantics follow the substrate contract:
//!
//! - no mask: the output is fully replaced by the result;
//! - mask + [`Descriptor::REPLACE`]: the output is cleared, then result cells
//!   permitted by the mask are written;
//! - mask without `REPLACE`: output cells permitted by the mask are replaced
//!   by the result's (deleted when the result has none there); cells the mask
//!   blocks are left untouched.
//!
//! [`Descriptor::COMPLEMENT`] inverts what the mask permits.

use itertools::Itertools as _;
use smallvec::SmallVec;

use crate::matrix::RowVec;
use crate::{Descriptor, Result, SparseError, SparseMatrix};

/// `C<mask> = A · B` over the any-pair boolean semiring: `C[i,j]` is present
/// iff some `k` has both `A[i,k]` and `B[k,j]`.
///
/// [`Descriptor::TRANSPOSE_FIRST`] multiplies `Aᵀ · B` instead.
pub fn mxm(
    c: &mut SparseMatrix,
    mask: Option<&SparseMatrix>,
    a: &SparseMatrix,
    b: &SparseMatrix,
    desc: Descriptor,
) -> Result<()> {
    let a_t;
    let a_eff = if desc.contains(Descriptor::TRANSPOSE_FIRST) {
        a_t = transposed(a);
        &a_t
    } else {
        a
    };
    if a_eff.ncols() != b.nrows() {
        return Err(SparseError::InnerDimensionMismatch {
            op: "mxm",
            left_nrows: a_eff.nrows(),
            left_ncols: a_eff.ncols(),
            right_nrows: b.nrows(),
            right_ncols: b.ncols(),
        });
    }
    check_output("mxm", c, a_eff.nrows(), b.ncols())?;

    let mut result = SparseMatrix::new(a_eff.nrows(), b.ncols());
    let mut scratch: Vec<u64> = Vec::new();
    for (&i, a_cols) in &a_eff.rows {
        scratch.clear();
        for &k in a_cols {
            scratch.extend(b.row(k));
        }
        scratch.sort_unstable();
        scratch.dedup();
        result.insert_row_unchecked(i, SmallVec::from_slice(&scratch));
    }
    apply_result(c, result, mask, desc)
}

/// `C<mask> = A ∪ B` (pattern union).
pub fn e_wise_add(
    c: &mut SparseMatrix,
    mask: Option<&SparseMatrix>,
    a: &SparseMatrix,
    b: &SparseMatrix,
    desc: Descriptor,
) -> Result<()> {
    check_same_dims("e_wise_add", a, b)?;
    check_output("e_wise_add", c, a.nrows(), a.ncols())?;

    let mut result = SparseMatrix::new(a.nrows(), a.ncols());
    for &row in a.rows.keys().chain(b.rows.keys()) {
        if result.rows.contains_key(&row) {
            continue;
        }
        let merged: RowVec = itertools::merge(a.row(row), b.row(row)).dedup().collect();
        result.insert_row_unchecked(row, merged);
    }
    apply_result(c, result, mask, desc)
}

/// `C<mask> = A ∩ B` (pattern intersection).
pub fn e_wise_mult(
    c: &mut SparseMatrix,
    mask: Option<&SparseMatrix>,
    a: &SparseMatrix,
    b: &SparseMatrix,
    desc: Descriptor,
) -> Result<()> {
    check_same_dims("e_wise_mult", a, b)?;
    check_output("e_wise_mult", c, a.nrows(), a.ncols())?;

    let mut result = SparseMatrix::new(a.nrows(), a.ncols());
    for (&row, a_cols) in &a.rows {
        let both: RowVec = a_cols
            .iter()
            .copied()
            .filter(|&col| b.contains(row, col))
            .collect();
        result.insert_row_unchecked(row, both);
    }
    apply_result(c, result, mask, desc)
}

/// `C<mask> = Aᵀ`.
///
/// With [`Descriptor::TRANSPOSE_FIRST`] the input is pre-transposed and the
/// two transposes cancel: `C<mask> = A`. That mode is how a masked identity
/// assignment is expressed, e.g. stripping a deletion pattern out of `A` via
/// a complemented mask.
pub fn transpose(
    c: &mut SparseMatrix,
    mask: Option<&SparseMatrix>,
    a: &SparseMatrix,
    desc: Descriptor,
) -> Result<()> {
    let result = if desc.contains(Descriptor::TRANSPOSE_FIRST) {
        a.clone()
    } else {
        transposed(a)
    };
    check_output("transpose", c, result.nrows(), result.ncols())?;
    apply_result(c, result, mask, desc)
}

/// `C[i,j] = A[rows[i], cols[j]]` — extracts a submatrix.
pub fn extract(c: &mut SparseMatrix, a: &SparseMatrix, rows: &[u64], cols: &[u64]) -> Result<()> {
    check_output("extract", c, rows.len() as u64, cols.len() as u64)?;
    for &row in rows {
        if row >= a.nrows() {
            return Err(SparseError::IndexOutOfBounds {
                row,
                col: 0,
                nrows: a.nrows(),
                ncols: a.ncols(),
            });
        }
    }
    c.clear();
    for (ci, &ar) in rows.iter().enumerate() {
        let picked: RowVec = cols
            .iter()
            .enumerate()
            .filter(|&(_, &ac)| ac < a.ncols() && a.contains(ar, ac))
            .map(|(cj, _)| cj as u64)
            .collect();
        c.insert_row_unchecked(ci as u64, picked);
    }
    Ok(())
}

fn transposed(a: &SparseMatrix) -> SparseMatrix {
    let mut t = SparseMatrix::new(a.ncols(), a.nrows());
    for (row, col) in a.iter() {
        // Bounds hold by construction.
        let _ = t.set_element(col, row);
    }
    t
}

fn check_same_dims(op: &'static str, a: &SparseMatrix, b: &SparseMatrix) -> Result<()> {
    if a.nrows() != b.nrows() || a.ncols() != b.ncols() {
        return Err(SparseError::InnerDimensionMismatch {
            op,
            left_nrows: a.nrows(),
            left_ncols: a.ncols(),
            right_nrows: b.nrows(),
            right_ncols: b.ncols(),
        });
    }
    Ok(())
}

fn check_output(op: &'static str, c: &SparseMatrix, nrows: u64, ncols: u64) -> Result<()> {
    if c.nrows() != nrows || c.ncols() != ncols {
        return Err(SparseError::OutputDimensionMismatch {
            op,
            nrows,
            ncols,
            got_nrows: c.nrows(),
            got_ncols: c.ncols(),
        });
    }
    Ok(())
}

fn apply_result(
    c: &mut SparseMatrix,
    result: SparseMatrix,
    mask: Option<&SparseMatrix>,
    desc: Descriptor,
) -> Result<()> {
    let Some(mask) = mask else {
        *c = result;
        return Ok(());
    };
    if mask.nrows() != c.nrows() || mask.ncols() != c.ncols() {
        return Err(SparseError::MaskDimensionMismatch {
            op: "mask",
            nrows: c.nrows(),
            ncols: c.ncols(),
            got_nrows: mask.nrows(),
            got_ncols: mask.ncols(),
        });
    }
    let complement = desc.contains(Descriptor::COMPLEMENT);
    let permitted = |row, col| mask.contains(row, col) != complement;

    if desc.contains(Descriptor::REPLACE) {
        c.clear();
    } else {
        let stale: Vec<(u64, u64)> = c.iter().filter(|&(i, j)| permitted(i, j)).collect();
        for (i, j) in stale {
            c.remove_element(i, j)?;
        }
    }
    for (i, j) in result.iter() {
        if permitted(i, j) {
            c.set_element(i, j)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn m(nrows: u64, ncols: u64, cells: &[(u64, u64)]) -> SparseMatrix {
        let mut m = SparseMatrix::new(nrows, ncols);
        for &(i, j) in cells {
            m.set_element(i, j).unwrap();
        }
        m
    }

    #[test]
    fn mxm_any_pair() {
        // Path 0->1->2: squaring the adjacency reaches 0->2.
        let a = m(3, 3, &[(0, 1), (1, 2)]);
        let mut c = SparseMatrix::new(3, 3);
        mxm(&mut c, None, &a, &a, Descriptor::default()).unwrap();
        assert_eq!(c, m(3, 3, &[(0, 2)]));
    }

    #[test]
    fn mxm_rejects_bad_dims() {
        let a = m(2, 3, &[]);
        let b = m(2, 2, &[]);
        let mut c = SparseMatrix::new(2, 2);
        assert!(matches!(
            mxm(&mut c, None, &a, &b, Descriptor::default()),
            Err(SparseError::InnerDimensionMismatch { .. })
        ));
    }

    #[test]
    fn mxm_transpose_first() {
        let f = m(4, 2, &[(3, 0)]);
        let r = m(4, 4, &[(3, 1)]);
        // Fᵀ (2x4) times R: row 0 of the output picks up node 3's edges.
        let mut c = SparseMatrix::new(2, 4);
        mxm(&mut c, None, &f, &r, Descriptor::TRANSPOSE_FIRST).unwrap();
        assert_eq!(c, m(2, 4, &[(0, 1)]));
    }

    #[test]
    fn e_wise_add_unions_patterns() {
        let a = m(2, 2, &[(0, 0), (1, 1)]);
        let b = m(2, 2, &[(0, 0), (0, 1)]);
        let mut c = SparseMatrix::new(2, 2);
        e_wise_add(&mut c, None, &a, &b, Descriptor::default()).unwrap();
        assert_eq!(c, m(2, 2, &[(0, 0), (0, 1), (1, 1)]));
    }

    #[test]
    fn e_wise_mult_intersects_patterns() {
        let a = m(2, 2, &[(0, 0), (1, 0), (1, 1)]);
        let b = m(2, 2, &[(1, 0), (0, 1)]);
        let mut c = SparseMatrix::new(2, 2);
        e_wise_mult(&mut c, None, &a, &b, Descriptor::default()).unwrap();
        assert_eq!(c, m(2, 2, &[(1, 0)]));
    }

    #[test]
    fn complement_mask_with_replace_subtracts() {
        let sum = m(2, 4, &[(0, 1), (0, 2), (1, 3)]);
        let minus = m(2, 4, &[(0, 2)]);
        let mut c = m(2, 4, &[(1, 0)]);
        // C<¬minus, replace> = sum: the (0,2) cell is stripped and the old
        // (1,0) cell does not survive the replace.
        e_wise_add(&mut c, Some(&minus), &sum, &SparseMatrix::new(2, 4), Descriptor::RSC).unwrap();
        assert_eq!(c, m(2, 4, &[(0, 1), (1, 3)]));
    }

    #[test]
    fn masked_identity_via_double_transpose() {
        let a = m(2, 2, &[(0, 0), (0, 1), (1, 0)]);
        let n = m(2, 2, &[(0, 1)]);
        let mut c = SparseMatrix::new(2, 2);
        transpose(&mut c, Some(&n), &a, Descriptor::RSCT0).unwrap();
        assert_eq!(c, m(2, 2, &[(0, 0), (1, 0)]));
    }

    #[test]
    fn unmasked_kernels_fully_replace_output() {
        let a = m(2, 2, &[(0, 0)]);
        let b = m(2, 2, &[(1, 1)]);
        let mut c = m(2, 2, &[(0, 1), (1, 0)]);
        e_wise_add(&mut c, None, &a, &b, Descriptor::default()).unwrap();
        assert_eq!(c, m(2, 2, &[(0, 0), (1, 1)]));
    }

    #[test]
    fn mask_without_replace_keeps_blocked_cells() {
        let result = m(2, 2, &[(0, 0)]);
        let mask = m(2, 2, &[(0, 0), (0, 1)]);
        let mut c = m(2, 2, &[(0, 1), (1, 1)]);
        // (0,1) is permitted by the mask and absent from the result: deleted.
        // (1,1) is blocked by the mask: kept.
        e_wise_add(
            &mut c,
            Some(&mask),
            &result,
            &SparseMatrix::new(2, 2),
            Descriptor::STRUCTURE,
        )
        .unwrap();
        assert_eq!(c, m(2, 2, &[(0, 0), (1, 1)]));
    }

    #[test]
    fn extract_submatrix() {
        let a = m(4, 4, &[(0, 1), (2, 3), (3, 0)]);
        let mut c = SparseMatrix::new(2, 2);
        extract(&mut c, &a, &[2, 3], &[3, 0]).unwrap();
        assert_eq!(c, m(2, 2, &[(0, 0), (1, 1)]));
    }

    #[test]
    fn transpose_plain() {
        let a = m(2, 3, &[(0, 2), (1, 0)]);
        let mut c = SparseMatrix::new(3, 2);
        transpose(&mut c, None, &a, Descriptor::default()).unwrap();
        assert_eq!(c, m(3, 2, &[(2, 0), (0, 1)]));
    }
}

#[cfg(test)]
mod proptests {
    use proptest::collection::vec;
    use proptest::prelude::*;

    use super::*;

    const DIM: u64 = 8;

    fn cells() -> impl Strategy<Value = Vec<(u64, u64)>> {
        vec((0..DIM, 0..DIM), 0..24)
    }

    fn build(cells: &[(u64, u64)]) -> SparseMatrix {
        let mut m = SparseMatrix::new(DIM, DIM);
        for &(i, j) in cells {
            m.set_element(i, j).unwrap();
        }
        m
    }

    fn dense_product(a: &SparseMatrix, b: &SparseMatrix) -> SparseMatrix {
        let mut c = SparseMatrix::new(DIM, DIM);
        for i in 0..DIM {
            for j in 0..DIM {
                if (0..DIM).any(|k| a.contains(i, k) && b.contains(k, j)) {
                    c.set_element(i, j).unwrap();
                }
            }
        }
        c
    }

    proptest! {
        #[test]
        fn mxm_matches_dense_reference(a in cells(), b in cells()) {
            let (a, b) = (build(&a), build(&b));
            let mut c = SparseMatrix::new(DIM, DIM);
            mxm(&mut c, None, &a, &b, Descriptor::default()).unwrap();
            prop_assert_eq!(c, dense_product(&a, &b));
        }

        #[test]
        fn add_then_mult_roundtrip(a in cells(), b in cells()) {
            let (a, b) = (build(&a), build(&b));
            let mut union = SparseMatrix::new(DIM, DIM);
            e_wise_add(&mut union, None, &a, &b, Descriptor::default()).unwrap();
            let mut back = SparseMatrix::new(DIM, DIM);
            // A ∩ (A ∪ B) = A
            e_wise_mult(&mut back, None, &a, &union, Descriptor::default()).unwrap();
            prop_assert_eq!(back, a);
        }
    }
}
