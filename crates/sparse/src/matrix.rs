use std::collections::BTreeMap;

use smallvec::SmallVec;

use crate::iter::{MatrixIter, RowIter};
use crate::{Result, SparseError};

/// Columns of one row, sorted ascending. Most rows in adjacency matrices hold
/// a handful of entries, so they stay inline.
pub(crate) type RowVec = SmallVec<[u64; 4]>;

/// A sparse boolean pattern matrix.
///
/// Stored row-major: an ordered map from row index to the sorted list of
/// occupied columns. Rows with no entries are not stored, so memory tracks
/// `nvals`, not the dimensions — dimensions only bound the index space.
#[derive(Debug, Clone, Default)]
pub struct SparseMatrix {
    nrows: u64,
    ncols: u64,
    nvals: u64,
    pub(crate) rows: BTreeMap<u64, RowVec>,
}

impl SparseMatrix {
    pub fn new(nrows: u64, ncols: u64) -> Self {
        Self {
            nrows,
            ncols,
            nvals: 0,
            rows: BTreeMap::new(),
        }
    }

    pub fn nrows(&self) -> u64 {
        self.nrows
    }

    pub fn ncols(&self) -> u64 {
        self.ncols
    }

    /// Number of stored cells.
    pub fn nvals(&self) -> u64 {
        self.nvals
    }

    pub fn is_empty(&self) -> bool {
        self.nvals == 0
    }

    fn check_bounds(&self, row: u64, col: u64) -> Result<()> {
        if row >= self.nrows || col >= self.ncols {
            return Err(SparseError::IndexOutOfBounds {
                row,
                col,
                nrows: self.nrows,
                ncols: self.ncols,
            });
        }
        Ok(())
    }

    /// Sets `(row, col)`. Returns `true` if the cell was newly created.
    pub fn set_element(&mut self, row: u64, col: u64) -> Result<bool> {
        self.check_bounds(row, col)?;
        let cols = self.rows.entry(row).or_default();
        match cols.binary_search(&col) {
            Ok(_) => Ok(false),
            Err(pos) => {
                cols.insert(pos, col);
                self.nvals += 1;
                Ok(true)
            }
        }
    }

    /// Removes `(row, col)`. Returns `true` if the cell was present.
    pub fn remove_element(&mut self, row: u64, col: u64) -> Result<bool> {
        self.check_bounds(row, col)?;
        let Some(cols) = self.rows.get_mut(&row) else {
            return Ok(false);
        };
        match cols.binary_search(&col) {
            Ok(pos) => {
                cols.remove(pos);
                if cols.is_empty() {
                    self.rows.remove(&row);
                }
                self.nvals -= 1;
                Ok(true)
            }
            Err(_) => Ok(false),
        }
    }

    /// Whether `(row, col)` is present. Out-of-bounds coordinates are an
    /// error, not an absent cell.
    pub fn extract_element(&self, row: u64, col: u64) -> Result<bool> {
        self.check_bounds(row, col)?;
        Ok(self.contains(row, col))
    }

    pub(crate) fn contains(&self, row: u64, col: u64) -> bool {
        self.rows
            .get(&row)
            .is_some_and(|cols| cols.binary_search(&col).is_ok())
    }

    /// Drops every stored cell, keeping the dimensions.
    pub fn clear(&mut self) {
        self.rows.clear();
        self.nvals = 0;
    }

    /// Changes the dimensions. Growing is free; shrinking drops cells that
    /// fall outside the new bounds.
    pub fn resize(&mut self, nrows: u64, ncols: u64) {
        if nrows < self.nrows {
            self.rows.retain(|&row, _| row < nrows);
        }
        if ncols < self.ncols {
            for cols in self.rows.values_mut() {
                let keep = cols.partition_point(|&c| c < ncols);
                cols.truncate(keep);
            }
            self.rows.retain(|_, cols| !cols.is_empty());
        }
        if nrows < self.nrows || ncols < self.ncols {
            self.nvals = self.rows.values().map(|c| c.len() as u64).sum();
        }
        self.nrows = nrows;
        self.ncols = ncols;
    }

    /// Forces completion of pending work.
    ///
    /// Mutations apply eagerly in this substrate, so there is never pending
    /// work; the operation exists so call sites can mark the points where a
    /// deferring substrate would have to flush.
    pub fn wait(&mut self) {}

    /// Row-major iterator over stored `(row, col)` cells.
    pub fn iter(&self) -> MatrixIter<'_> {
        MatrixIter::new(self)
    }

    /// Iterator over the occupied columns of `row`, ascending.
    pub fn row(&self, row: u64) -> RowIter<'_> {
        RowIter::new(self.rows.get(&row).map(|c| c.as_slice()).unwrap_or(&[]))
    }

    pub(crate) fn insert_row_unchecked(&mut self, row: u64, cols: RowVec) {
        debug_assert!(cols.windows(2).all(|w| w[0] < w[1]));
        if cols.is_empty() {
            return;
        }
        self.nvals += cols.len() as u64;
        self.rows.insert(row, cols);
    }
}

/// Pattern equality: same dimensions, same cells.
impl PartialEq for SparseMatrix {
    fn eq(&self, other: &Self) -> bool {
        self.nrows == other.nrows
            && self.ncols == other.ncols
            && self.nvals == other.nvals
            && self.rows == other.rows
    }
}

impl Eq for SparseMatrix {}

impl FromIterator<(u64, u64)> for SparseMatrix {
    /// Builds a matrix just large enough to hold the given cells. Intended
    /// for tests; real call sites size matrices from the graph's capacity.
    fn from_iter<T: IntoIterator<Item = (u64, u64)>>(iter: T) -> Self {
        let cells: Vec<_> = iter.into_iter().collect();
        let nrows = cells.iter().map(|&(r, _)| r + 1).max().unwrap_or(0);
        let ncols = cells.iter().map(|&(_, c)| c + 1).max().unwrap_or(0);
        let mut m = Self::new(nrows, ncols);
        for (r, c) in cells {
            m.set_element(r, c).unwrap();
        }
        m
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_remove_extract() {
        let mut m = SparseMatrix::new(4, 4);
        assert!(m.set_element(1, 2).unwrap());
        assert!(!m.set_element(1, 2).unwrap());
        assert_eq!(m.nvals(), 1);
        assert!(m.extract_element(1, 2).unwrap());
        assert!(!m.extract_element(2, 1).unwrap());
        assert!(m.remove_element(1, 2).unwrap());
        assert!(!m.remove_element(1, 2).unwrap());
        assert_eq!(m.nvals(), 0);
    }

    #[test]
    fn bounds_are_checked() {
        let mut m = SparseMatrix::new(2, 3);
        assert!(matches!(
            m.set_element(2, 0),
            Err(SparseError::IndexOutOfBounds { .. })
        ));
        assert!(matches!(
            m.extract_element(0, 3),
            Err(SparseError::IndexOutOfBounds { .. })
        ));
    }

    #[test]
    fn iteration_is_row_major() {
        let m: SparseMatrix = [(2, 0), (0, 1), (0, 3), (1, 2)].into_iter().collect();
        let cells: Vec<_> = m.iter().collect();
        assert_eq!(cells, vec![(0, 1), (0, 3), (1, 2), (2, 0)]);
    }

    #[test]
    fn resize_shrink_drops_cells() {
        let mut m: SparseMatrix = [(0, 0), (1, 4), (3, 1)].into_iter().collect();
        m.resize(2, 2);
        assert_eq!(m.nvals(), 1);
        assert!(m.extract_element(0, 0).unwrap());
        m.resize(8, 8);
        assert_eq!(m.nvals(), 1);
        assert!(!m.extract_element(3, 1).unwrap());
    }

    #[test]
    fn row_iterator_yields_sorted_cols() {
        let m: SparseMatrix = [(1, 3), (1, 0), (1, 2)].into_iter().collect();
        let cols: Vec<_> = m.row(1).collect();
        assert_eq!(cols, vec![0, 2, 3]);
        assert_eq!(m.row(0).count(), 0);
    }
}
