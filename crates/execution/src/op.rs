use crate::context::ExecCtx;
use crate::record::Record;
use crate::ExecResult;

/// One operator of an execution plan.
///
/// Lifecycle: `init` once per execution, then `consume` until it returns
/// `None` (end-of-stream), `reset` to rewind a subtree for re-execution
/// (apply semantics), and `boxed_clone` to stamp an execution tree out of the
/// plan template. Dropping the operator frees it.
pub trait PhysicalOp: Send {
    /// Operator name as shown in plan listings and profiles.
    fn name(&self) -> &'static str;

    /// Called once before the first `consume` of an execution.
    fn init(&mut self, ctx: &mut ExecCtx<'_>) -> ExecResult<()> {
        let _ = ctx;
        Ok(())
    }

    /// Produces the next record, pulling from children as needed.
    fn consume(&mut self, ctx: &mut ExecCtx<'_>) -> ExecResult<Option<Record>>;

    /// Rewinds the operator (and its children) to the pre-`init` state.
    fn reset(&mut self);

    /// Clones the operator tree. Only build-time parameters survive the
    /// clone; runtime state (batches, iterators) starts fresh.
    fn boxed_clone(&self) -> Box<dyn PhysicalOp>;
}

impl Clone for Box<dyn PhysicalOp> {
    fn clone(&self) -> Self {
        self.boxed_clone()
    }
}

/// `init` for an optional child.
pub(crate) fn init_child(
    child: &mut Option<Box<dyn PhysicalOp>>,
    ctx: &mut ExecCtx<'_>,
) -> ExecResult<()> {
    match child {
        Some(op) => op.init(ctx),
        None => Ok(()),
    }
}
