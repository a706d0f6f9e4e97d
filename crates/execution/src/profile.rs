use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::context::ExecCtx;
use crate::op::PhysicalOp;
use crate::record::Record;
use crate::ExecResult;

#[derive(Debug, Default)]
struct SheetEntry {
    name: &'static str,
    calls: u64,
    total: Duration,
    children: Vec<usize>,
}

/// Shared accumulator for a profiled execution.
///
/// The planner interposes one [`ProfileOp`] per operator when profiling is
/// requested; every shim records its total `consume` time here, and
/// [`finalize`](Self::finalize) subtracts each operator's children to get
/// exclusive times.
#[derive(Debug, Default, Clone)]
pub struct ProfileSheet {
    entries: Arc<Mutex<Vec<SheetEntry>>>,
}

impl ProfileSheet {
    /// Registers an operator; `children` are the sheet indices of the
    /// operators it pulls from.
    pub fn add(&self, name: &'static str, children: Vec<usize>) -> usize {
        let mut entries = self.entries.lock();
        entries.push(SheetEntry {
            name,
            children,
            ..Default::default()
        });
        entries.len() - 1
    }

    fn record(&self, idx: usize, elapsed: Duration) {
        let mut entries = self.entries.lock();
        let entry = &mut entries[idx];
        entry.calls += 1;
        entry.total += elapsed;
    }

    pub fn finalize(&self) -> ProfileReport {
        let entries = self.entries.lock();
        let ops = entries
            .iter()
            .map(|e| {
                let child_total: Duration = e.children.iter().map(|&c| entries[c].total).sum();
                OpProfile {
                    name: e.name,
                    calls: e.calls,
                    total: e.total,
                    exclusive: e.total.saturating_sub(child_total),
                }
            })
            .collect();
        ProfileReport { ops }
    }
}

/// Per-operator timings of one profiled execution.
#[derive(Debug, Clone)]
pub struct ProfileReport {
    pub ops: Vec<OpProfile>,
}

#[derive(Debug, Clone)]
pub struct OpProfile {
    pub name: &'static str,
    pub calls: u64,
    /// Wall time inside `consume`, children included.
    pub total: Duration,
    /// Wall time net of children.
    pub exclusive: Duration,
}

/// Timing shim around one operator.
pub struct ProfileOp {
    inner: Box<dyn PhysicalOp>,
    idx: usize,
    sheet: ProfileSheet,
}

impl ProfileOp {
    pub fn new(inner: Box<dyn PhysicalOp>, idx: usize, sheet: ProfileSheet) -> Self {
        Self { inner, idx, sheet }
    }
}

impl PhysicalOp for ProfileOp {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    fn init(&mut self, ctx: &mut ExecCtx<'_>) -> ExecResult<()> {
        self.inner.init(ctx)
    }

    fn consume(&mut self, ctx: &mut ExecCtx<'_>) -> ExecResult<Option<Record>> {
        let start = Instant::now();
        let result = self.inner.consume(ctx);
        self.sheet.record(self.idx, start.elapsed());
        result
    }

    fn reset(&mut self) {
        self.inner.reset();
    }

    fn boxed_clone(&self) -> Box<dyn PhysicalOp> {
        Box::new(Self::new(self.inner.boxed_clone(), self.idx, self.sheet.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exclusive_time_subtracts_children() {
        let sheet = ProfileSheet::default();
        let child = sheet.add("Scan", vec![]);
        let parent = sheet.add("Traverse", vec![child]);
        sheet.record(child, Duration::from_millis(30));
        sheet.record(parent, Duration::from_millis(50));

        let report = sheet.finalize();
        assert_eq!(report.ops[parent].exclusive, Duration::from_millis(20));
        assert_eq!(report.ops[parent].total, Duration::from_millis(50));
        assert_eq!(report.ops[child].calls, 1);
    }
}
