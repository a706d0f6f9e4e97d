use lattice_sparse::MatrixIter;

use crate::DeltaMatrix;

/// Non-zero iterator over the logical matrix `(M ∪ M⁺) \ M⁻`.
///
/// Two stages: committed cells with pending deletions filtered out, then the
/// pending additions. The addition stage needs no filtering because a cell is
/// never in both `M⁺` and `M⁻`.
pub struct DeltaIter<'a> {
    delta: &'a DeltaMatrix,
    stage: Stage<'a>,
}

enum Stage<'a> {
    Committed { iter: MatrixIter<'a> },
    Additions { iter: MatrixIter<'a> },
}

impl<'a> DeltaIter<'a> {
    pub(crate) fn new(delta: &'a DeltaMatrix) -> Self {
        Self {
            delta,
            stage: Stage::Committed {
                iter: delta.read_view().iter(),
            },
        }
    }
}

impl Iterator for DeltaIter<'_> {
    type Item = (u64, u64);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match &mut self.stage {
                Stage::Committed { iter } => {
                    let deletions = self.delta.deletions();
                    if let Some((row, col)) =
                        iter.find(|&(row, col)| !deletions.extract_element(row, col).unwrap_or(false))
                    {
                        return Some((row, col));
                    }
                    self.stage = Stage::Additions {
                        iter: self.delta.additions().iter(),
                    };
                }
                Stage::Additions { iter } => return iter.next(),
            }
        }
    }
}
