//! Identifier newtypes shared by every layer of the engine.
//!
//! Graph entities are addressed by dense integer ids: nodes and edges by
//! 64-bit ids that double as matrix coordinates, labels and relation types by
//! 32-bit registry indices. Keeping them as distinct types stops a node id
//! from being used where a matrix dimension or a record slot is expected.

use std::fmt;

/// Asserts that `$ty` is `$size` bytes in `static_assert_size!($ty, $size)`.
///
/// # Example
///
/// ```ignore
/// static_assert_size!(u32, 4);
/// ```
#[macro_export]
macro_rules! static_assert_size {
    ($ty:ty, $size:expr) => {
        const _: [(); $size] = [(); ::core::mem::size_of::<$ty>()];
    };
}

macro_rules! entity_id {
    ($(#[$doc:meta])* $name:ident($prim:ty)) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
        pub struct $name(pub $prim);

        impl $name {
            pub const fn idx(self) -> usize {
                self.0 as usize
            }
        }

        impl From<$prim> for $name {
            fn from(id: $prim) -> Self {
                Self(id)
            }
        }

        impl From<$name> for $prim {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }

        impl nohash_hasher::IsEnabled for $name {}
    };
}

entity_id! {
    /// A graph node. Doubles as the row/column index of the node in every
    /// label and relation matrix.
    NodeId(u64)
}

entity_id! {
    /// A graph edge. Edge ids are never stored in matrices; the graph store's
    /// side table maps `(src, dst, rel)` cells to the edge ids they collapse.
    EdgeId(u64)
}

entity_id! {
    /// Index of a label in the graph's label registry.
    LabelId(u32)
}

entity_id! {
    /// Index of a relationship type in the graph's relation registry.
    RelTypeId(u32)
}

entity_id! {
    /// Index of an attribute key in the graph's attribute registry.
    AttrId(u32)
}

entity_id! {
    /// Position of an entry in a [`Record`](../lattice-execution), assigned
    /// once at plan-build time.
    SlotId(u32)
}

static_assert_size!(NodeId, 8);
static_assert_size!(LabelId, 4);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_round_trip() {
        let n = NodeId::from(42u64);
        assert_eq!(n.idx(), 42);
        assert_eq!(u64::from(n), 42);
        assert_eq!(n.to_string(), "42");
    }

    #[test]
    fn ids_are_ordered() {
        assert!(LabelId(1) < LabelId(2));
        assert_eq!(RelTypeId::default(), RelTypeId(0));
    }
}
