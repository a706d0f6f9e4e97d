use crossbeam_queue::SegQueue;

use crate::record::Record;

/// Per-plan record pool.
///
/// Records cycle between the pool and the operator pipeline instead of being
/// reallocated per row. Only the worker running the plan touches the pool,
/// but the queue is lock-free so leases need no `&mut` plumbing through the
/// operator tree.
#[derive(Debug, Default)]
pub struct RecordPool {
    free: SegQueue<Record>,
    width: usize,
}

impl RecordPool {
    pub fn new(width: usize) -> Self {
        Self {
            free: SegQueue::new(),
            width,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Leases a record with every slot unresolved.
    pub fn lease(&self) -> Record {
        self.free.pop().unwrap_or_else(|| Record::new(self.width))
    }

    /// Leases a record initialized as a copy of `src`.
    pub fn lease_clone(&self, src: &Record) -> Record {
        let mut rec = self.lease();
        rec.copy_from(src);
        rec
    }

    /// Returns a record to the pool.
    pub fn give_back(&self, mut record: Record) {
        debug_assert_eq!(record.width(), self.width);
        record.reset();
        self.free.push(record);
    }

    /// Records currently parked in the pool.
    pub fn idle(&self) -> usize {
        self.free.len()
    }
}
