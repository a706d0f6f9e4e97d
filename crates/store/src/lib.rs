//! The graph store.
//!
//! Owns everything a graph is made of: the label and relation-type
//! registries, the per-label and per-relation delta matrices (forward and
//! reverse adjacency per relation type), the node/edge id allocators,
//! attribute tables, and the side table that maps a boolean adjacency cell to
//! the identities of the edges it collapses.
//!
//! The store itself is a plain struct; concurrency lives in [`Locking`],
//! which wraps it in a single read-write lock. Readers hold the shared lock
//! for the duration of one query and observe a stable state; a writer holds
//! the exclusive lock, applies mutations (recorded in an undo log for
//! rollback), and synchronizes dirty matrices when it commits.

mod allocator;
mod attributes;
mod datastore;
mod edge_table;
mod error;
mod graph;
mod registry;
mod value;

pub use allocator::IdAllocator;
pub use attributes::AttributeSet;
pub use datastore::{Locking, ReadTx, WriteTx};
pub use edge_table::{EdgeInfo, EdgeTable};
pub use error::{Result, StoreError};
pub use graph::{GraphStore, RelationPair};
pub use registry::NameRegistry;
pub use value::Value;
