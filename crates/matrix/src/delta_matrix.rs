use lattice_sparse::{Descriptor, SparseMatrix, ops};

use crate::Result;
use crate::iter::DeltaIter;

/// What a [`DeltaMatrix::set`] actually did, so a transaction can undo it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOutcome {
    /// The cell was pending deletion; the deletion was cancelled.
    Undeleted,
    /// The cell is already present in the logical matrix. No change.
    AlreadyPresent,
    /// The cell was recorded as a pending addition.
    Added,
}

/// What a [`DeltaMatrix::clear`] actually did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearOutcome {
    /// The cell was a pending addition; the addition was cancelled.
    Unadded,
    /// The cell is committed; a pending deletion was recorded.
    Deleted,
    /// The cell is absent from the logical matrix. No change.
    Absent,
}

/// One logical boolean matrix as the triple `(M, M⁺, M⁻)`.
///
/// Invariants, maintained by every mutation:
///   - all three matrices share the same (square) dimensions;
///   - `M⁻ ⊆ M`: deletions reference only committed cells;
///   - `M⁺ ∩ M = ∅`: additions are new cells only;
///   - `M⁺ ∩ M⁻ = ∅`: an addition and a deletion of the same cell cancel.
#[derive(Debug, Clone, Default)]
pub struct DeltaMatrix {
    m: SparseMatrix,
    plus: SparseMatrix,
    minus: SparseMatrix,
}

impl DeltaMatrix {
    pub fn new(dim: u64) -> Self {
        Self {
            m: SparseMatrix::new(dim, dim),
            plus: SparseMatrix::new(dim, dim),
            minus: SparseMatrix::new(dim, dim),
        }
    }

    pub fn dim(&self) -> u64 {
        self.m.nrows()
    }

    /// The committed matrix `M`, untouched by pending writes.
    ///
    /// Stable for as long as the caller prevents `synchronize` from running —
    /// in the engine, for as long as the graph read lock is held.
    pub fn read_view(&self) -> &SparseMatrix {
        &self.m
    }

    /// Pending additions `M⁺`.
    pub fn additions(&self) -> &SparseMatrix {
        &self.plus
    }

    /// Pending deletions `M⁻`.
    pub fn deletions(&self) -> &SparseMatrix {
        &self.minus
    }

    /// Logical cell count: `nvals(M) + nvals(M⁺) − nvals(M⁻)`.
    pub fn nvals(&self) -> u64 {
        self.m.nvals() + self.plus.nvals() - self.minus.nvals()
    }

    /// True iff any additions or deletions are pending (`Dirty` state).
    pub fn pending(&self) -> bool {
        self.plus.nvals() + self.minus.nvals() > 0
    }

    /// Whether `(row, col)` is present in the logical matrix.
    pub fn contains(&self, row: u64, col: u64) -> Result<bool> {
        if self.plus.extract_element(row, col)? {
            return Ok(true);
        }
        Ok(self.m.extract_element(row, col)? && !self.minus.extract_element(row, col)?)
    }

    /// Sets `(row, col)` in the logical matrix.
    pub fn set(&mut self, row: u64, col: u64) -> Result<SetOutcome> {
        let outcome = if self.minus.remove_element(row, col)? {
            SetOutcome::Undeleted
        } else if self.m.extract_element(row, col)? || !self.plus.set_element(row, col)? {
            SetOutcome::AlreadyPresent
        } else {
            SetOutcome::Added
        };
        self.plus.wait();
        self.minus.wait();
        self.check_invariants(row, col);
        Ok(outcome)
    }

    /// Clears `(row, col)` from the logical matrix.
    pub fn clear(&mut self, row: u64, col: u64) -> Result<ClearOutcome> {
        let outcome = if self.plus.remove_element(row, col)? {
            ClearOutcome::Unadded
        } else if self.m.extract_element(row, col)? && self.minus.set_element(row, col)? {
            ClearOutcome::Deleted
        } else {
            ClearOutcome::Absent
        };
        self.plus.wait();
        self.minus.wait();
        self.check_invariants(row, col);
        Ok(outcome)
    }

    /// Reverts a prior [`set`](Self::set) given its reported outcome.
    pub fn undo_set(&mut self, row: u64, col: u64, outcome: SetOutcome) -> Result<()> {
        match outcome {
            SetOutcome::Undeleted => {
                self.minus.set_element(row, col)?;
            }
            SetOutcome::AlreadyPresent => {}
            SetOutcome::Added => {
                self.plus.remove_element(row, col)?;
            }
        }
        self.check_invariants(row, col);
        Ok(())
    }

    /// Reverts a prior [`clear`](Self::clear) given its reported outcome.
    pub fn undo_clear(&mut self, row: u64, col: u64, outcome: ClearOutcome) -> Result<()> {
        match outcome {
            ClearOutcome::Unadded => {
                self.plus.set_element(row, col)?;
            }
            ClearOutcome::Deleted => {
                self.minus.remove_element(row, col)?;
            }
            ClearOutcome::Absent => {}
        }
        self.check_invariants(row, col);
        Ok(())
    }

    /// Widens all three matrices to `dim`. Never shrinks.
    pub fn resize(&mut self, dim: u64) {
        if dim <= self.dim() {
            return;
        }
        self.m.resize(dim, dim);
        self.plus.resize(dim, dim);
        self.minus.resize(dim, dim);
    }

    /// Folds `M⁺` and `M⁻` into `M` and empties them: `M ← (M ∪ M⁺) \ M⁻`.
    ///
    /// Idempotent. On failure the pending matrices are retained, so the
    /// matrix stays `Dirty` and valid and a later writer may retry.
    pub fn synchronize(&mut self) -> Result<()> {
        if !self.pending() {
            return Ok(());
        }
        log::trace!(
            "synchronize: folding {} additions, {} deletions into {} committed cells",
            self.plus.nvals(),
            self.minus.nvals(),
            self.m.nvals()
        );
        let dim = self.dim();
        let mut folded = SparseMatrix::new(dim, dim);
        ops::e_wise_add(&mut folded, Some(&self.minus), &self.m, &self.plus, Descriptor::RSC)?;
        self.m = folded;
        self.m.wait();
        self.plus.clear();
        self.minus.clear();
        Ok(())
    }

    /// Iterates the non-zeros of the logical matrix: committed cells minus
    /// pending deletions, then pending additions.
    pub fn iter(&self) -> DeltaIter<'_> {
        DeltaIter::new(self)
    }

    /// Occupied columns of one logical row: the committed row with pending
    /// deletions filtered out, followed by pending additions.
    pub fn row(&self, row: u64) -> impl Iterator<Item = u64> + '_ {
        let minus = &self.minus;
        self.m
            .row(row)
            .filter(move |&col| !minus.extract_element(row, col).unwrap_or(false))
            .chain(self.plus.row(row))
    }

    #[inline]
    fn check_invariants(&self, row: u64, col: u64) {
        // Cheap single-cell checks only; full-pattern containment is checked
        // by tests. Debug builds treat a violation as unrecoverable.
        if cfg!(debug_assertions) {
            let has = |m: &SparseMatrix| m.extract_element(row, col).unwrap_or(false);
            assert!(
                !(has(&self.plus) && has(&self.m)),
                "addition of committed cell ({row}, {col})"
            );
            assert!(
                !(has(&self.plus) && has(&self.minus)),
                "cell ({row}, {col}) both added and deleted"
            );
            assert!(
                !has(&self.minus) || has(&self.m),
                "deletion of uncommitted cell ({row}, {col})"
            );
        }
    }
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

    #[test]
    fn set_routes_to_the_right_matrix() {
        let mut d = delta(4, &[(0, 1)], &[], &[]);
        // Committed cell: no-op.
        assert_eq!(d.set(0, 1).unwrap(), SetOutcome::AlreadyPresent);
        // Fresh cell: pending addition.
        assert_eq!(d.set(2, 3).unwrap(), SetOutcome::Added);
        assert_eq!(d.additions().nvals(), 1);
        // Deleted committed cell: undelete; the additions are untouched.
        d.clear(0, 1).unwrap();
        let before = d.nvals();
        assert_eq!(d.set(0, 1).unwrap(), SetOutcome::Undeleted);
        assert_eq!(d.additions().nvals(), 1);
        assert_eq!(d.deletions().nvals(), 0);
        assert_eq!(d.nvals(), before + 1);
    }

    #[test]
    fn clear_routes_to_the_right_matrix() {
        let mut d = delta(4, &[(0, 1)], &[(2, 3)], &[]);
        // Pending addition: cancelled outright.
        assert_eq!(d.clear(2, 3).unwrap(), ClearOutcome::Unadded);
        assert_eq!(d.additions().nvals(), 0);
        // Committed cell: pending deletion.
        assert_eq!(d.clear(0, 1).unwrap(), ClearOutcome::Deleted);
        assert_eq!(d.deletions().nvals(), 1);
        // Absent cell: no-op.
        assert_eq!(d.clear(3, 3).unwrap(), ClearOutcome::Absent);
        assert_eq!(d.nvals(), 0);
    }

    #[test]
    fn round_trip_restores_prior_state() {
        // Fresh cell.
        let mut d = delta(4, &[(1, 2)], &[], &[]);
        let snapshot = (d.nvals(), d.pending());
        d.set(0, 3).unwrap();
        d.clear(0, 3).unwrap();
        assert_eq!((d.nvals(), d.pending()), snapshot);
        // Committed cell.
        d.clear(1, 2).unwrap();
        d.set(1, 2).unwrap();
        assert_eq!((d.nvals(), d.pending()), snapshot);
    }

    #[test]
    fn independent_sets_commute() {
        let mut a = delta(4, &[(0, 0)], &[], &[]);
        let mut b = delta(4, &[(0, 0)], &[], &[]);
        a.set(1, 1).unwrap();
        a.set(2, 2).unwrap();
        b.set(2, 2).unwrap();
        b.set(1, 1).unwrap();
        assert_eq!(a.read_view(), b.read_view());
        assert_eq!(a.additions(), b.additions());
        assert_eq!(a.deletions(), b.deletions());
    }

    #[test]
    fn synchronize_is_idempotent() {
        let mut once = delta(4, &[(0, 1), (1, 2)], &[(2, 3)], &[(0, 1)]);
        once.synchronize().unwrap();
        let mut twice = once.clone();
        twice.synchronize().unwrap();
        assert_eq!(once.read_view(), twice.read_view());
        assert!(!twice.pending());
        assert!(once.read_view().extract_element(2, 3).unwrap());
        assert!(!once.read_view().extract_element(0, 1).unwrap());
    }

    #[test]
    fn read_view_is_stable_under_writes() {
        // The committed view never moves until synchronize folds it.
        let d = delta(4, &[(0, 1), (1, 2)], &[], &[]);
        let snapshot = d.read_view().clone();
        let mut d = d;
        d.set(3, 0).unwrap();
        d.clear(0, 1).unwrap();
        assert_eq!(d.read_view(), &snapshot);
        d.synchronize().unwrap();
        assert_ne!(d.read_view(), &snapshot);
    }

    #[test]
    fn undo_restores_pending_sets() {
        let mut d = delta(4, &[(0, 1)], &[], &[]);
        let o = d.set(2, 2).unwrap();
        d.undo_set(2, 2, o).unwrap();
        assert!(!d.pending());

        let o = d.clear(0, 1).unwrap();
        d.undo_clear(0, 1, o).unwrap();
        assert!(!d.pending());
        assert!(d.contains(0, 1).unwrap());

        // Undo of an undelete restores the pending deletion.
        d.clear(0, 1).unwrap();
        let o = d.set(0, 1).unwrap();
        assert_eq!(o, SetOutcome::Undeleted);
        d.undo_set(0, 1, o).unwrap();
        assert!(!d.contains(0, 1).unwrap());
        assert_eq!(d.deletions().nvals(), 1);
    }

    #[test]
    fn resize_widens_and_never_shrinks() {
        let mut d = delta(4, &[(3, 3)], &[], &[]);
        d.resize(8);
        assert_eq!(d.dim(), 8);
        d.set(7, 7).unwrap();
        d.resize(2);
        assert_eq!(d.dim(), 8);
        assert!(d.contains(3, 3).unwrap());
    }

    #[test]
    fn logical_iter_merges_all_three() {
        let d = delta(4, &[(0, 1), (1, 2)], &[(2, 3)], &[(1, 2)]);
        let cells: Vec<_> = d.iter().collect();
        assert_eq!(cells, vec![(0, 1), (2, 3)]);
    }
}
