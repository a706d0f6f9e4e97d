use std::collections::VecDeque;
use std::sync::Arc;

use lattice_primitives::SlotId;
use lattice_store::Value;

use crate::context::ExecCtx;
use crate::op::PhysicalOp;
use crate::procedures::Procedure;
use crate::record::Record;
use crate::ExecResult;

/// Invokes a registered procedure and projects its yields into record slots.
///
/// Standalone `CALL` runs the procedure once; under a child it runs once per
/// upstream record, emitting the cartesian product of the record with the
/// procedure's rows.
pub struct ProcCall {
    child: Option<Box<dyn PhysicalOp>>,
    name: Box<str>,
    args: Vec<Value>,
    yield_slots: Vec<SlotId>,
    proc: Option<Arc<dyn Procedure>>,
    rows: VecDeque<Vec<Value>>,
    current: Option<Record>,
    exhausted: bool,
}

impl ProcCall {
    pub fn new(
        child: Option<Box<dyn PhysicalOp>>,
        name: impl Into<Box<str>>,
        args: Vec<Value>,
        yield_slots: Vec<SlotId>,
    ) -> Self {
        Self {
            child,
            name: name.into(),
            args,
            yield_slots,
            proc: None,
            rows: VecDeque::new(),
            current: None,
            exhausted: false,
        }
    }

    fn invoke(&mut self, ctx: &ExecCtx<'_>) -> ExecResult<()> {
        let proc = Arc::clone(self.proc.as_ref().expect("init resolves the procedure"));
        self.rows = proc.invoke(ctx.store(), &self.args)?.into();
        Ok(())
    }
}

impl PhysicalOp for ProcCall {
    fn name(&self) -> &'static str {
        "ProcCall"
    }

    fn init(&mut self, ctx: &mut ExecCtx<'_>) -> ExecResult<()> {
        // Resolve eagerly: an unknown procedure fails the query before any
        // record is produced.
        self.proc = Some(ctx.procedures.resolve(&self.name, self.args.len())?);
        crate::op::init_child(&mut self.child, ctx)
    }

    fn consume(&mut self, ctx: &mut ExecCtx<'_>) -> ExecResult<Option<Record>> {
        loop {
            if ctx.cancelled() {
                if let Some(rec) = self.current.take() {
                    ctx.pool.give_back(rec);
                }
                return Ok(None);
            }

            if let Some(row) = self.rows.pop_front() {
                let mut rec = match &self.current {
                    Some(upstream) => ctx.pool.lease_clone(upstream),
                    None => ctx.pool.lease(),
                };
                for (&slot, value) in self.yield_slots.iter().zip(row) {
                    rec.set_scalar(slot, value);
                }
                return Ok(Some(rec));
            }

            if self.child.is_none() {
                if self.exhausted {
                    return Ok(None);
                }
                self.exhausted = true;
                self.invoke(ctx)?;
                continue;
            }
            let upstream = self.child.as_mut().expect("checked above").consume(ctx)?;
            match upstream {
                Some(rec) => {
                    if let Some(prev) = self.current.replace(rec) {
                        ctx.pool.give_back(prev);
                    }
                    self.invoke(ctx)?;
                }
                None => {
                    if let Some(prev) = self.current.take() {
                        ctx.pool.give_back(prev);
                    }
                    return Ok(None);
                }
            }
        }
    }

    fn reset(&mut self) {
        self.rows.clear();
        self.current = None;
        self.exhausted = false;
        if let Some(child) = &mut self.child {
            child.reset();
        }
    }

    fn boxed_clone(&self) -> Box<dyn PhysicalOp> {
        Box::new(Self::new(
            self.child.as_ref().map(|c| c.boxed_clone()),
            self.name.clone(),
            self.args.clone(),
            self.yield_slots.clone(),
        ))
    }
}
