use std::sync::Arc;

use lattice_data_structures::map::HashMap;
use lattice_store::{GraphStore, Value};

use crate::{ExecError, ExecResult};

/// A callable procedure with a declared argument and yield shape.
///
/// Procedures are read-only: they see the graph under whatever lock the
/// calling query holds and produce rows of scalar yields.
pub trait Procedure: Send + Sync {
    fn name(&self) -> &str;

    /// Number of arguments `invoke` expects.
    fn arg_count(&self) -> usize;

    /// Names of the yielded columns, in emission order.
    fn yields(&self) -> &[&str];

    fn invoke(&self, store: &GraphStore, args: &[Value]) -> ExecResult<Vec<Vec<Value>>>;
}

/// Name → procedure map consulted by `CALL` operators.
#[derive(Default, Clone)]
pub struct ProcedureRegistry {
    procs: HashMap<Box<str>, Arc<dyn Procedure>>,
}

impl ProcedureRegistry {
    pub fn register(&mut self, proc: Arc<dyn Procedure>) {
        self.procs.insert(proc.name().into(), proc);
    }

    pub fn get(&self, name: &str) -> ExecResult<&Arc<dyn Procedure>> {
        self.procs
            .get(name)
            .ok_or_else(|| ExecError::UnknownProcedure(name.into()))
    }

    /// Resolves and arity-checks in one step.
    pub fn resolve(&self, name: &str, arg_count: usize) -> ExecResult<Arc<dyn Procedure>> {
        let proc = self.get(name)?;
        if proc.arg_count() != arg_count {
            return Err(ExecError::ProcedureArity {
                name: name.into(),
                expected: proc.arg_count(),
                got: arg_count,
            });
        }
        Ok(Arc::clone(proc))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Nop;

    impl Procedure for Nop {
        fn name(&self) -> &str {
            "test.nop"
        }

        fn arg_count(&self) -> usize {
            1
        }

        fn yields(&self) -> &[&str] {
            &["value"]
        }

        fn invoke(&self, _store: &GraphStore, args: &[Value]) -> ExecResult<Vec<Vec<Value>>> {
            Ok(vec![vec![args[0].clone()]])
        }
    }

    #[test]
    fn resolve_checks_name_and_arity() {
        let mut reg = ProcedureRegistry::default();
        reg.register(Arc::new(Nop));
        assert!(reg.resolve("test.nop", 1).is_ok());
        assert!(matches!(
            reg.resolve("test.nop", 2),
            Err(ExecError::ProcedureArity { .. })
        ));
        assert!(matches!(
            reg.resolve("missing", 0),
            Err(ExecError::UnknownProcedure(_))
        ));
    }
}
