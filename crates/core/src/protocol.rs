//! The record-stream schema handed to clients.

use lattice_execution::QueryStats;
use lattice_primitives::{EdgeId, NodeId};
use lattice_store::Value;

/// What a result column carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Scalar,
    Node,
    Edge,
    Path,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: Box<str>,
    pub kind: ColumnKind,
}

/// One cell of a result row.
#[derive(Debug, Clone, PartialEq)]
pub enum ResultCell {
    Null,
    Node(NodeId),
    Edge(EdgeId),
    Scalar(Value),
}

/// An ordered, fully materialized record stream.
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    pub columns: Vec<Column>,
    pub rows: Vec<Vec<ResultCell>>,
    pub stats: QueryStats,
}

impl ResultSet {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The cells of one column, in row order. Panics if `name` is not a
    /// column; intended for tests and tooling.
    pub fn column(&self, name: &str) -> Vec<&ResultCell> {
        let idx = self
            .columns
            .iter()
            .position(|c| &*c.name == name)
            .unwrap_or_else(|| panic!("no column named `{name}`"));
        self.rows.iter().map(|row| &row[idx]).collect()
    }
}
