//! The query AST this engine consumes.
//!
//! Parsing Cypher text is a separate component; these types are the contract
//! it produces. Everything is by name — labels, relationship types, and
//! attribute keys resolve to registry ids during planning.

use lattice_store::Value;

pub use lattice_execution::ops::CmpOp;

/// `(alias:Label {key: value, …})`
#[derive(Debug, Clone, Default)]
pub struct NodePattern {
    pub alias: Option<Box<str>>,
    pub labels: Vec<Box<str>>,
    /// Inline property equality constraints.
    pub props: Vec<(Box<str>, Value)>,
}

/// Which way a relationship pattern points, in path order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PatternDirection {
    #[default]
    Outgoing,
    Incoming,
}

/// `-[alias:TYPE {key: value} *min..max]->`
#[derive(Debug, Clone, Default)]
pub struct RelPattern {
    pub alias: Option<Box<str>>,
    /// Empty means any relationship type.
    pub types: Vec<Box<str>>,
    pub direction: PatternDirection,
    /// Variable-length bounds.
    pub range: Option<(u32, u32)>,
    /// Inline property equality constraints.
    pub props: Vec<(Box<str>, Value)>,
}

/// One linear pattern: `nodes[i] -rels[i]- nodes[i+1]`.
#[derive(Debug, Clone, Default)]
pub struct PatternPath {
    pub nodes: Vec<NodePattern>,
    pub rels: Vec<RelPattern>,
}

/// A `WHERE`-style property comparison: `alias.key op value`.
#[derive(Debug, Clone)]
pub struct PropertyFilter {
    pub alias: Box<str>,
    pub key: Box<str>,
    pub op: CmpOp,
    pub value: Value,
}

/// What one `RETURN` item projects.
#[derive(Debug, Clone)]
pub enum ReturnExpr {
    /// The bound entity itself.
    Alias(Box<str>),
    /// One attribute of a bound entity.
    Property { alias: Box<str>, key: Box<str> },
}

#[derive(Debug, Clone)]
pub struct ReturnItem {
    pub expr: ReturnExpr,
    /// Column name in the result schema.
    pub name: Box<str>,
}

#[derive(Debug, Clone)]
pub enum Clause {
    Match {
        path: PatternPath,
        filters: Vec<PropertyFilter>,
    },
    Create {
        path: PatternPath,
    },
    Delete {
        aliases: Vec<Box<str>>,
    },
    Call {
        procedure: Box<str>,
        args: Vec<Value>,
        /// Aliases the yields bind to, in the procedure's yield order.
        yields: Vec<Box<str>>,
    },
    Return {
        items: Vec<ReturnItem>,
    },
}

/// A full query: an ordered clause list.
#[derive(Debug, Clone, Default)]
pub struct Query {
    pub clauses: Vec<Clause>,
}

impl Query {
    /// Whether execution requires the exclusive lock.
    pub fn is_write(&self) -> bool {
        self.clauses
            .iter()
            .any(|c| matches!(c, Clause::Create { .. } | Clause::Delete { .. }))
    }
}
