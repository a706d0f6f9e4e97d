use lattice_primitives::{EdgeId, NodeId, SlotId};
use lattice_store::Value;

use crate::{ExecError, ExecResult};

/// One tagged slot of a record.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Entry {
    /// Nothing bound yet. Slots start here and return here when the record
    /// goes back to the pool.
    #[default]
    Unresolved,
    Node(NodeId),
    Edge(EdgeId),
    Scalar(Value),
}

/// A fixed-width tuple of bindings flowing through the operator pipeline.
///
/// Width is decided once, at plan-build time, when aliases are assigned
/// slots; operators address entries by [`SlotId`] only.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    entries: Box<[Entry]>,
}

impl Record {
    pub(crate) fn new(width: usize) -> Self {
        Self {
            entries: vec![Entry::Unresolved; width].into_boxed_slice(),
        }
    }

    pub fn width(&self) -> usize {
        self.entries.len()
    }

    pub fn get(&self, slot: SlotId) -> &Entry {
        &self.entries[slot.idx()]
    }

    pub fn set(&mut self, slot: SlotId, entry: Entry) {
        self.entries[slot.idx()] = entry;
    }

    pub fn set_node(&mut self, slot: SlotId, node: NodeId) {
        self.set(slot, Entry::Node(node));
    }

    pub fn set_edge(&mut self, slot: SlotId, edge: EdgeId) {
        self.set(slot, Entry::Edge(edge));
    }

    pub fn set_scalar(&mut self, slot: SlotId, value: Value) {
        self.set(slot, Entry::Scalar(value));
    }

    /// The node bound at `slot`, or an error if the slot holds anything else.
    pub fn node(&self, slot: SlotId) -> ExecResult<NodeId> {
        match self.get(slot) {
            Entry::Node(id) => Ok(*id),
            _ => Err(ExecError::NotANode(slot)),
        }
    }

    pub fn edge(&self, slot: SlotId) -> ExecResult<EdgeId> {
        match self.get(slot) {
            Entry::Edge(id) => Ok(*id),
            _ => Err(ExecError::NotAnEdge(slot)),
        }
    }

    /// Copies every entry of `src` into this record. Both records must come
    /// from the same plan (same width).
    pub fn copy_from(&mut self, src: &Record) {
        debug_assert_eq!(self.width(), src.width());
        self.entries.clone_from_slice(&src.entries);
    }

    pub(crate) fn reset(&mut self) {
        for entry in &mut self.entries {
            *entry = Entry::Unresolved;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_accessors_check_the_tag() {
        let mut rec = Record::new(2);
        rec.set_node(SlotId(0), NodeId(5));
        assert_eq!(rec.node(SlotId(0)).unwrap(), NodeId(5));
        assert!(matches!(rec.edge(SlotId(0)), Err(ExecError::NotAnEdge(_))));
        assert!(matches!(rec.node(SlotId(1)), Err(ExecError::NotANode(_))));
    }

    #[test]
    fn copy_from_clones_all_slots() {
        let mut a = Record::new(2);
        a.set_scalar(SlotId(1), Value::Int(3));
        let mut b = Record::new(2);
        b.copy_from(&a);
        assert_eq!(a, b);
    }
}
