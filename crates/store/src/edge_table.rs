use lattice_data_structures::map::HashMap;
use lattice_primitives::{EdgeId, NodeId, RelTypeId};
use smallvec::SmallVec;

/// Where an edge attaches: endpoints and relationship type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeInfo {
    pub src: NodeId,
    pub dst: NodeId,
    pub rel: RelTypeId,
}

type CellKey = (u64, u64, u32);

/// Identity side table for multi-edges.
///
/// A relation matrix cell is a single boolean no matter how many edges of
/// that type connect the pair; this table maps each occupied cell back to the
/// distinct edge ids it represents. The matrix bit and the table entry are
/// kept in lockstep: the bit is set iff the entry is non-empty.
#[derive(Debug, Default, Clone)]
pub struct EdgeTable {
    cells: HashMap<CellKey, SmallVec<[EdgeId; 1]>>,
}

impl EdgeTable {
    fn key(src: NodeId, dst: NodeId, rel: RelTypeId) -> CellKey {
        (src.0, dst.0, rel.0)
    }

    /// Records `edge` under its cell. Returns `true` when this is the first
    /// edge for the cell (the caller must set the matrix bit).
    pub fn insert(&mut self, src: NodeId, dst: NodeId, rel: RelTypeId, edge: EdgeId) -> bool {
        let ids = self.cells.entry(Self::key(src, dst, rel)).or_default();
        debug_assert!(!ids.contains(&edge));
        ids.push(edge);
        ids.len() == 1
    }

    /// Removes `edge` from its cell. Returns `true` when the cell became
    /// empty (the caller must clear the matrix bit).
    pub fn remove(&mut self, src: NodeId, dst: NodeId, rel: RelTypeId, edge: EdgeId) -> bool {
        let key = Self::key(src, dst, rel);
        let Some(ids) = self.cells.get_mut(&key) else {
            return false;
        };
        if let Some(pos) = ids.iter().position(|&id| id == edge) {
            ids.remove(pos);
        }
        if ids.is_empty() {
            self.cells.remove(&key);
            true
        } else {
            false
        }
    }

    /// The distinct edge ids collapsed into one adjacency cell.
    pub fn edges(&self, src: NodeId, dst: NodeId, rel: RelTypeId) -> &[EdgeId] {
        self.cells
            .get(&Self::key(src, dst, rel))
            .map(|ids| ids.as_slice())
            .unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multi_edges_share_a_cell() {
        let mut t = EdgeTable::default();
        let (a, b, r) = (NodeId(1), NodeId(2), RelTypeId(0));
        assert!(t.insert(a, b, r, EdgeId(10)));
        assert!(!t.insert(a, b, r, EdgeId(11)));
        assert_eq!(t.edges(a, b, r), &[EdgeId(10), EdgeId(11)]);
        assert!(!t.remove(a, b, r, EdgeId(10)));
        assert!(t.remove(a, b, r, EdgeId(11)));
        assert!(t.edges(a, b, r).is_empty());
    }
}
