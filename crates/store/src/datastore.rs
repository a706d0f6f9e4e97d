use std::ops::Deref;
use std::sync::Arc;
use std::time::Instant;

use lattice_primitives::{AttrId, EdgeId, LabelId, NodeId, RelTypeId};
use parking_lot::RwLock;
use parking_lot::lock_api::{ArcRwLockReadGuard, ArcRwLockWriteGuard};

use crate::attributes::AttributeSet;
use crate::graph::{CreatedEdge, CreatedNode, DeletedEdge, DeletedNode, GraphStore};
use crate::value::Value;
use crate::{EdgeInfo, Result};

// Type aliases for lock guards
type SharedReadGuard<T> = ArcRwLockReadGuard<parking_lot::RawRwLock, T>;
type SharedWriteGuard<T> = ArcRwLockWriteGuard<parking_lot::RawRwLock, T>;

/// The graph behind its lock.
///
/// One read-write lock covers the whole graph. Readers share it for the
/// duration of one query; because no writer can run concurrently, everything
/// a reader observes — including matrices with pending deltas — is stable.
/// Writers take it exclusively, mutate through [`WriteTx`] (which keeps an
/// undo log), and fold pending deltas into the committed matrices on commit.
#[derive(Clone, Default)]
pub struct Locking {
    state: Arc<RwLock<GraphStore>>,
}

impl Locking {
    pub fn new(store: GraphStore) -> Self {
        Self {
            state: Arc::new(RwLock::new(store)),
        }
    }

    /// Takes the shared lock. The returned transaction is a stable snapshot
    /// for as long as it lives.
    pub fn begin_read(&self) -> ReadTx {
        let start = Instant::now();
        let guard = self.state.read_arc();
        log::trace!("read tx began (lock wait: {:?})", start.elapsed());
        ReadTx { guard }
    }

    /// Takes the exclusive lock. Updates apply in issue order; the resulting
    /// state after commit matches sequential application.
    pub fn begin_write(&self) -> WriteTx {
        let start = Instant::now();
        let mut guard = self.state.write_arc();
        log::trace!("write tx began (lock wait: {:?})", start.elapsed());
        if guard.pending() {
            // A prior writer's synchronize did not complete; fold its deltas
            // before this transaction starts logging its own.
            if let Err(err) = guard.synchronize_all() {
                log::warn!("deferred synchronize still failing: {err}");
            }
        }
        WriteTx {
            guard,
            undo: Vec::new(),
            finished: false,
        }
    }
}

/// A read transaction: shared guard over the graph.
pub struct ReadTx {
    guard: SharedReadGuard<GraphStore>,
}

impl Deref for ReadTx {
    type Target = GraphStore;

    fn deref(&self) -> &GraphStore {
        &self.guard
    }
}

enum Undo {
    CreateNode(CreatedNode),
    DeleteNode(DeletedNode),
    CreateEdge(CreatedEdge, EdgeInfo),
    DeleteEdge(DeletedEdge),
    NodeAttr { id: NodeId, attr: AttrId, prev: Value },
    EdgeAttr { id: EdgeId, attr: AttrId, prev: Value },
}

/// A write transaction: exclusive guard plus an undo log.
///
/// Every mutation is applied to the delta matrices immediately and its
/// outcome pushed onto the undo log. [`commit`](Self::commit) synchronizes
/// all dirty matrices; dropping the transaction un-committed replays the log
/// in reverse, restoring the pre-transaction pending sets exactly.
pub struct WriteTx {
    guard: SharedWriteGuard<GraphStore>,
    undo: Vec<Undo>,
    finished: bool,
}

impl Deref for WriteTx {
    type Target = GraphStore;

    fn deref(&self) -> &GraphStore {
        &self.guard
    }
}

impl WriteTx {
    pub fn add_label(&mut self, name: &str) -> LabelId {
        // Registries are append-only; a rolled-back label simply stays
        // registered with an empty matrix.
        self.guard.add_label(name)
    }

    pub fn add_rel_type(&mut self, name: &str) -> RelTypeId {
        self.guard.add_rel_type(name)
    }

    pub fn add_attr(&mut self, name: &str) -> AttrId {
        self.guard.add_attr(name)
    }

    pub fn create_node(&mut self, label: Option<LabelId>, attrs: AttributeSet) -> Result<NodeId> {
        let created = self.guard.create_node(label, attrs)?;
        let id = created.id;
        self.undo.push(Undo::CreateNode(created));
        Ok(id)
    }

    /// Deletes the node and its incident edges; returns how many edges the
    /// cascade removed.
    pub fn delete_node(&mut self, id: NodeId) -> Result<usize> {
        let deleted = self.guard.delete_node(id)?;
        let cascaded = deleted.edges.len();
        self.undo.push(Undo::DeleteNode(deleted));
        Ok(cascaded)
    }

    pub fn create_edge(
        &mut self,
        src: NodeId,
        dst: NodeId,
        rel: RelTypeId,
        attrs: AttributeSet,
    ) -> Result<EdgeId> {
        let created = self.guard.create_edge(src, dst, rel, attrs)?;
        let id = created.id;
        self.undo.push(Undo::CreateEdge(created, EdgeInfo { src, dst, rel }));
        Ok(id)
    }

    pub fn delete_edge(&mut self, id: EdgeId) -> Result<()> {
        let deleted = self.guard.delete_edge(id)?;
        self.undo.push(Undo::DeleteEdge(deleted));
        Ok(())
    }

    pub fn set_node_attr(&mut self, id: NodeId, attr: AttrId, value: Value) -> Result<()> {
        let prev = self.guard.set_node_attr(id, attr, value)?.unwrap_or(Value::Null);
        self.undo.push(Undo::NodeAttr { id, attr, prev });
        Ok(())
    }

    pub fn set_edge_attr(&mut self, id: EdgeId, attr: AttrId, value: Value) -> Result<()> {
        let prev = self.guard.set_edge_attr(id, attr, value)?.unwrap_or(Value::Null);
        self.undo.push(Undo::EdgeAttr { id, attr, prev });
        Ok(())
    }

    /// Commits: folds every dirty matrix into its committed state.
    ///
    /// On failure the graph is still valid — matrices that did not
    /// synchronize stay `Dirty` with the transaction's writes pending, and a
    /// later writer may retry the fold.
    pub fn commit(mut self) -> Result<()> {
        self.guard.synchronize_all()?;
        self.undo.clear();
        self.finished = true;
        log::trace!("write tx committed");
        Ok(())
    }

    /// Discards the transaction's writes by replaying the undo log in
    /// reverse.
    pub fn rollback(mut self) {
        self.rollback_inner();
        self.finished = true;
    }

    fn rollback_inner(&mut self) {
        let entries = self.undo.len();
        for undo in std::mem::take(&mut self.undo).into_iter().rev() {
            // Undo operations only touch state this transaction created, so
            // they cannot fail; a failure here means the log is corrupt.
            let result = match undo {
                Undo::CreateNode(created) => self.guard.undo_create_node(&created),
                Undo::DeleteNode(deleted) => self.guard.undo_delete_node(&deleted),
                Undo::CreateEdge(created, info) => self.guard.undo_create_edge(&created, info),
                Undo::DeleteEdge(deleted) => self.guard.undo_delete_edge(&deleted),
                Undo::NodeAttr { id, attr, prev } => {
                    self.guard.set_node_attr(id, attr, prev).map(|_| ())
                }
                Undo::EdgeAttr { id, attr, prev } => {
                    self.guard.set_edge_attr(id, attr, prev).map(|_| ())
                }
            };
            if let Err(err) = result {
                log::error!("rollback entry failed: {err}");
                debug_assert!(false, "rollback entry failed: {err}");
            }
        }
        if entries > 0 {
            log::trace!("write tx rolled back {entries} operations");
        }
    }
}

impl Drop for WriteTx {
    fn drop(&mut self) {
        if !self.finished {
            self.rollback_inner();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> Locking {
        let db = Locking::new(GraphStore::new());
        let mut tx = db.begin_write();
        let r = tx.add_rel_type("R");
        let a = tx.create_node(None, AttributeSet::default()).unwrap();
        let b = tx.create_node(None, AttributeSet::default()).unwrap();
        let c = tx.create_node(None, AttributeSet::default()).unwrap();
        let d = tx.create_node(None, AttributeSet::default()).unwrap();
        let _ = d;
        tx.create_edge(a, b, r, AttributeSet::default()).unwrap();
        tx.create_edge(b, c, r, AttributeSet::default()).unwrap();
        tx.commit().unwrap();
        db
    }

    fn committed_cells(tx: &ReadTx) -> Vec<(u64, u64)> {
        let rel = tx.rel_type_id("R").unwrap();
        tx.relation(rel).unwrap().forward.read_view().iter().collect()
    }

    #[test]
    fn snapshots_straddle_a_write_transaction() {
        // A reader before the write sees the old committed state; a
        // reader after commit sees the new one.
        let db = seeded();
        {
            let before = db.begin_read();
            assert_eq!(committed_cells(&before), vec![(0, 1), (1, 2)]);
        }
        {
            let mut tx = db.begin_write();
            let r = tx.rel_type_id("R").unwrap();
            tx.create_edge(NodeId(3), NodeId(0), r, AttributeSet::default()).unwrap();
            let victim = tx.edges_between(NodeId(0), NodeId(1), r)[0];
            tx.delete_edge(victim).unwrap();
            tx.commit().unwrap();
        }
        let after = db.begin_read();
        assert_eq!(committed_cells(&after), vec![(1, 2), (3, 0)]);
    }

    #[test]
    fn writers_block_until_readers_finish() {
        let db = seeded();
        let reader = db.begin_read();
        let snapshot = committed_cells(&reader);

        let db2 = db.clone();
        let writer = std::thread::spawn(move || {
            let mut tx = db2.begin_write();
            let r = tx.rel_type_id("R").unwrap();
            tx.create_edge(NodeId(2), NodeId(3), r, AttributeSet::default()).unwrap();
            tx.commit().unwrap();
        });

        // The writer is parked on the lock; our snapshot cannot move.
        std::thread::sleep(std::time::Duration::from_millis(20));
        assert_eq!(committed_cells(&reader), snapshot);

        drop(reader);
        writer.join().unwrap();
        let after = db.begin_read();
        assert_eq!(committed_cells(&after).len(), snapshot.len() + 1);
    }

    #[test]
    fn dropping_a_write_tx_rolls_back() {
        let db = seeded();
        {
            let mut tx = db.begin_write();
            let r = tx.rel_type_id("R").unwrap();
            let n = tx.create_node(None, AttributeSet::default()).unwrap();
            tx.create_edge(n, NodeId(0), r, AttributeSet::default()).unwrap();
            tx.delete_edge(tx.edges_between(NodeId(1), NodeId(2), r)[0]).unwrap();
            // No commit.
        }
        let tx = db.begin_read();
        assert_eq!(committed_cells(&tx), vec![(0, 1), (1, 2)]);
        assert_eq!(tx.node_count(), 4);
        assert!(!tx.pending());
    }

    #[test]
    fn rollback_restores_deleted_subgraph() {
        let db = seeded();
        {
            let mut tx = db.begin_write();
            tx.delete_node(NodeId(1)).unwrap();
            assert_eq!(tx.node_count(), 3);
            tx.rollback();
        }
        let tx = db.begin_read();
        assert_eq!(tx.node_count(), 4);
        assert_eq!(tx.edge_count(), 2);
        assert_eq!(committed_cells(&tx), vec![(0, 1), (1, 2)]);
    }

    #[test]
    fn attribute_writes_roll_back_to_previous_values() {
        let db = seeded();
        let age = {
            let mut tx = db.begin_write();
            let age = tx.add_attr("age");
            tx.set_node_attr(NodeId(0), age, Value::Int(1)).unwrap();
            tx.commit().unwrap();
            age
        };
        {
            let mut tx = db.begin_write();
            tx.set_node_attr(NodeId(0), age, Value::Int(2)).unwrap();
            tx.rollback();
        }
        let tx = db.begin_read();
        assert_eq!(tx.node_attr(NodeId(0), age), Some(&Value::Int(1)));
    }
}
