use lattice_sparse::{Descriptor, SparseMatrix, ops};

use crate::{DeltaMatrix, Result};

/// `Out = F · (M ∪ M⁺) \ M⁻` without materializing the combined matrix.
///
/// The committed product is computed first; the (typically tiny) pending
/// patterns are then folded in as separate products:
///
/// 1. `Out ← F · M`
/// 2. `P ← F · M⁺` when `M⁺` is non-empty
/// 3. `N ← F · M⁻` when `M⁻` is non-empty
/// 4. `Out ← (Out ⊕ P)` under the complement of `N`'s structure, fused into
///    one masked element-wise add; a lone `N` is applied as a masked identity
///    transpose instead.
///
/// Deletions are applied after additions, so a deletion landing in a row that
/// `P` also touches is still subtracted, matching the logical identity.
/// Only `M⁺`/`M⁻` ever need their pending work completed; `M` is read as-is,
/// which is what makes the committed view cheap to share with readers.
pub fn delta_mxm(
    out: &mut SparseMatrix,
    f: &SparseMatrix,
    delta: &DeltaMatrix,
    desc: Descriptor,
) -> Result<()> {
    // An empty frontier produces an empty result; skip the kernels entirely.
    if f.nvals() == 0 {
        out.clear();
        return Ok(());
    }

    ops::mxm(out, None, f, delta.read_view(), desc)?;

    let nrows = out.nrows();
    let ncols = out.ncols();

    let mut p = SparseMatrix::new(nrows, ncols);
    if !delta.additions().is_empty() {
        ops::mxm(&mut p, None, f, delta.additions(), desc)?;
    }
    let mut n = SparseMatrix::new(nrows, ncols);
    if !delta.deletions().is_empty() {
        ops::mxm(&mut n, None, f, delta.deletions(), desc)?;
    }

    if !p.is_empty() {
        let prev = std::mem::replace(out, SparseMatrix::new(nrows, ncols));
        let (mask, combine_desc) = if n.is_empty() {
            (None, Descriptor::default())
        } else {
            (Some(&n), Descriptor::RSC)
        };
        ops::e_wise_add(out, mask, &p, &prev, combine_desc)?;
    } else if !n.is_empty() {
        let prev = std::mem::replace(out, SparseMatrix::new(nrows, ncols));
        ops::transpose(out, Some(&n), &prev, Descriptor::RSCT0)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delta(dim: u64, m: &[(u64, u64)], plus: &[(u64, u64)], minus: &[(u64, u64)]) -> DeltaMatrix {
        let mut d = DeltaMatrix::new(dim);
        for &(i, j) in m {
            d.set(i, j).unwrap();
        }
        d.synchronize().unwrap();
        for &(i, j) in plus {
            d.set(i, j).unwrap();
        }
        for &(i, j) in minus {
            d.clear(i, j).unwrap();
        }
        d
    }

    fn frontier(dim: u64, sources: &[u64]) -> SparseMatrix {
        let mut f = SparseMatrix::new(sources.len() as u64, dim);
        for (row, &src) in sources.iter().enumerate() {
            f.set_element(row as u64, src).unwrap();
        }
        f
    }

    fn reached(out: &SparseMatrix) -> Vec<u64> {
        out.iter().map(|(_, col)| col).collect()
    }

    #[test]
    fn additions_are_visible_through_delta_multiply() {
        // M = {(0,1),(1,2)}, M⁺ = {(2,3)}; hops from node 0.
        let d = delta(4, &[(0, 1), (1, 2)], &[(2, 3)], &[]);
        let mut out = SparseMatrix::new(1, 4);

        delta_mxm(&mut out, &frontier(4, &[0]), &d, Descriptor::default()).unwrap();
        assert_eq!(reached(&out), vec![1]);

        let hop1 = out.clone();
        delta_mxm(&mut out, &hop1, &d, Descriptor::default()).unwrap();
        assert_eq!(reached(&out), vec![2]);

        let hop2 = out.clone();
        delta_mxm(&mut out, &hop2, &d, Descriptor::default()).unwrap();
        assert_eq!(reached(&out), vec![3]);
    }

    #[test]
    fn deletions_are_subtracted() {
        // M = {(0,1),(1,2),(0,2)}, M⁻ = {(0,2)}; one hop from node 0.
        let d = delta(4, &[(0, 1), (1, 2), (0, 2)], &[], &[(0, 2)]);
        let mut out = SparseMatrix::new(1, 4);
        delta_mxm(&mut out, &frontier(4, &[0]), &d, Descriptor::default()).unwrap();
        assert_eq!(reached(&out), vec![1]);
    }

    #[test]
    fn deletion_applies_after_addition_in_same_row() {
        // Node 0 commits edges to 1 and 2, deletes the edge to 2, and adds an
        // edge to 3: additions and deletions both touch frontier row 0.
        let d = delta(4, &[(0, 1), (0, 2)], &[(0, 3)], &[(0, 2)]);
        let mut out = SparseMatrix::new(1, 4);
        delta_mxm(&mut out, &frontier(4, &[0]), &d, Descriptor::default()).unwrap();
        assert_eq!(reached(&out), vec![1, 3]);
    }

    #[test]
    fn empty_frontier_short_circuits() {
        let d = delta(4, &[(0, 1)], &[], &[]);
        let mut out = frontier(4, &[2]);
        delta_mxm(&mut out, &SparseMatrix::new(1, 4), &d, Descriptor::default()).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn batched_frontier_keeps_rows_separate() {
        let d = delta(4, &[(0, 1), (2, 3)], &[], &[]);
        let mut out = SparseMatrix::new(2, 4);
        delta_mxm(&mut out, &frontier(4, &[0, 2]), &d, Descriptor::default()).unwrap();
        let cells: Vec<_> = out.iter().collect();
        assert_eq!(cells, vec![(0, 1), (1, 3)]);
    }
}
