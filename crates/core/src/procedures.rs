//! Built-in procedures.

use std::sync::Arc;

use lattice_execution::{ExecResult, Procedure, ProcedureRegistry};
use lattice_store::{GraphStore, Value};

/// `CALL db.labels()` — every registered label name.
struct DbLabels;

impl Procedure for DbLabels {
    fn name(&self) -> &str {
        "db.labels"
    }

    fn arg_count(&self) -> usize {
        0
    }

    fn yields(&self) -> &[&str] {
        &["label"]
    }

    fn invoke(&self, store: &GraphStore, _args: &[Value]) -> ExecResult<Vec<Vec<Value>>> {
        Ok(store
            .labels()
            .map(|(_, name)| vec![Value::from(name)])
            .collect())
    }
}

/// `CALL db.relationshipTypes()` — every registered relationship type name.
struct DbRelationshipTypes;

impl Procedure for DbRelationshipTypes {
    fn name(&self) -> &str {
        "db.relationshipTypes"
    }

    fn arg_count(&self) -> usize {
        0
    }

    fn yields(&self) -> &[&str] {
        &["relationshipType"]
    }

    fn invoke(&self, store: &GraphStore, _args: &[Value]) -> ExecResult<Vec<Vec<Value>>> {
        Ok(store
            .rel_types()
            .map(|(_, name)| vec![Value::from(name)])
            .collect())
    }
}

/// The registry a fresh [`Context`](crate::Context) starts with.
pub fn builtin_registry() -> ProcedureRegistry {
    let mut registry = ProcedureRegistry::default();
    registry.register(Arc::new(DbLabels));
    registry.register(Arc::new(DbRelationshipTypes));
    registry
}
