use lattice_data_structures::map::IntMap;
use lattice_matrix::{ClearOutcome, DeltaMatrix, SetOutcome};
use lattice_primitives::{AttrId, EdgeId, LabelId, NodeId, RelTypeId};

use crate::allocator::IdAllocator;
use crate::attributes::AttributeSet;
use crate::edge_table::{EdgeInfo, EdgeTable};
use crate::registry::NameRegistry;
use crate::value::Value;
use crate::{Result, StoreError};

/// Matrices never start smaller than this; saves a burst of tiny regrows
/// while the first nodes trickle in.
const MIN_DIM: u64 = 16;

/// Forward and reverse adjacency for one relationship type.
///
/// The reverse matrix is not derived on demand: it is a second delta matrix
/// updated in the same operation as the forward one, so traversal against the
/// pattern direction is as cheap as along it.
#[derive(Debug, Default)]
pub struct RelationPair {
    pub forward: DeltaMatrix,
    pub reverse: DeltaMatrix,
}

/// Outcome of a node creation, sufficient to undo it.
#[derive(Debug, Clone, Copy)]
pub struct CreatedNode {
    pub id: NodeId,
    pub label_set: Option<(LabelId, SetOutcome)>,
}

/// Outcome of an edge creation, sufficient to undo it.
#[derive(Debug, Clone, Copy)]
pub struct CreatedEdge {
    pub id: EdgeId,
    pub fwd: SetOutcome,
    pub rev: SetOutcome,
}

/// Outcome of an edge deletion, sufficient to undo it.
#[derive(Debug, Clone)]
pub struct DeletedEdge {
    pub id: EdgeId,
    pub info: EdgeInfo,
    pub attrs: AttributeSet,
    /// Matrix clears happen only when the last edge leaves its cell.
    pub cleared: Option<(ClearOutcome, ClearOutcome)>,
}

/// Outcome of a node deletion, including the cascade of incident edges.
#[derive(Debug, Clone)]
pub struct DeletedNode {
    pub id: NodeId,
    pub label: Option<(LabelId, ClearOutcome)>,
    pub attrs: AttributeSet,
    pub edges: Vec<DeletedEdge>,
}

/// One property graph: registries, matrices, attributes, identities.
///
/// Every matrix shares the same dimension, which is always at least the
/// highest live node id plus one; growth happens here, explicitly, before any
/// `set` can touch an out-of-range index.
#[derive(Debug, Default)]
pub struct GraphStore {
    dim: u64,
    node_alloc: IdAllocator,
    edge_alloc: IdAllocator,
    labels: NameRegistry,
    rel_types: NameRegistry,
    attrs: NameRegistry,
    label_matrices: Vec<DeltaMatrix>,
    relations: Vec<RelationPair>,
    node_label: IntMap<NodeId, LabelId>,
    node_attrs: IntMap<NodeId, AttributeSet>,
    edge_info: IntMap<EdgeId, EdgeInfo>,
    edge_attrs: IntMap<EdgeId, AttributeSet>,
    edge_table: EdgeTable,
}

impl GraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current matrix dimension (node-id capacity).
    pub fn dim(&self) -> u64 {
        self.dim
    }

    pub fn node_count(&self) -> u64 {
        self.node_alloc.live_count()
    }

    pub fn edge_count(&self) -> u64 {
        self.edge_alloc.live_count()
    }

    // ------------------------------------------------------------------
    // Registries
    // ------------------------------------------------------------------

    /// Registers `name` as a label, lazily creating its matrix.
    pub fn add_label(&mut self, name: &str) -> LabelId {
        let (id, fresh) = self.labels.get_or_register(name);
        if fresh {
            log::debug!("registered label `{name}` as {id}");
            self.label_matrices.push(DeltaMatrix::new(self.dim));
        }
        LabelId(id)
    }

    /// Registers `name` as a relationship type, lazily creating its
    /// forward/reverse matrix pair.
    pub fn add_rel_type(&mut self, name: &str) -> RelTypeId {
        let (id, fresh) = self.rel_types.get_or_register(name);
        if fresh {
            log::debug!("registered relationship type `{name}` as {id}");
            let mut pair = RelationPair::default();
            pair.forward.resize(self.dim);
            pair.reverse.resize(self.dim);
            self.relations.push(pair);
        }
        RelTypeId(id)
    }

    pub fn add_attr(&mut self, name: &str) -> AttrId {
        AttrId(self.attrs.get_or_register(name).0)
    }

    pub fn label_id(&self, name: &str) -> Option<LabelId> {
        self.labels.id(name).map(LabelId)
    }

    pub fn rel_type_id(&self, name: &str) -> Option<RelTypeId> {
        self.rel_types.id(name).map(RelTypeId)
    }

    pub fn attr_id(&self, name: &str) -> Option<AttrId> {
        self.attrs.id(name).map(AttrId)
    }

    pub fn label_name(&self, label: LabelId) -> Option<&str> {
        self.labels.name(label.0)
    }

    pub fn rel_type_name(&self, rel: RelTypeId) -> Option<&str> {
        self.rel_types.name(rel.0)
    }

    pub fn attr_name(&self, attr: AttrId) -> Option<&str> {
        self.attrs.name(attr.0)
    }

    pub fn labels(&self) -> impl Iterator<Item = (LabelId, &str)> {
        self.labels.iter().map(|(id, name)| (LabelId(id), name))
    }

    pub fn rel_types(&self) -> impl Iterator<Item = (RelTypeId, &str)> {
        self.rel_types.iter().map(|(id, name)| (RelTypeId(id), name))
    }

    // ------------------------------------------------------------------
    // Matrices
    // ------------------------------------------------------------------

    pub fn label_matrix(&self, label: LabelId) -> Result<&DeltaMatrix> {
        self.label_matrices
            .get(label.idx())
            .ok_or(StoreError::LabelNotFound(label))
    }

    pub fn relation(&self, rel: RelTypeId) -> Result<&RelationPair> {
        self.relations
            .get(rel.idx())
            .ok_or(StoreError::RelTypeNotFound(rel))
    }

    /// Widens every matrix so that ids below `required` are addressable.
    /// Growth is explicit: no `set` may run ahead of it.
    pub fn grow(&mut self, required: u64) {
        if required <= self.dim {
            return;
        }
        let dim = required.next_power_of_two().max(MIN_DIM);
        log::trace!("growing matrices from {} to {dim}", self.dim);
        for m in &mut self.label_matrices {
            m.resize(dim);
        }
        for pair in &mut self.relations {
            pair.forward.resize(dim);
            pair.reverse.resize(dim);
        }
        self.dim = dim;
    }

    // ------------------------------------------------------------------
    // Nodes
    // ------------------------------------------------------------------

    pub fn is_node(&self, id: NodeId) -> bool {
        self.node_alloc.is_live(id.0)
    }

    fn ensure_node(&self, id: NodeId) -> Result<()> {
        if self.is_node(id) {
            Ok(())
        } else {
            Err(StoreError::NodeNotFound(id))
        }
    }

    /// Live node ids, ascending.
    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.node_alloc.iter_live().map(NodeId)
    }

    /// Live node ids carrying `label`, via the label matrix diagonal.
    pub fn nodes_with_label(&self, label: LabelId) -> Result<impl Iterator<Item = NodeId> + '_> {
        let matrix = self.label_matrix(label)?;
        Ok(matrix.iter().filter(|(i, j)| i == j).map(|(i, _)| NodeId(i)))
    }

    pub fn node_label(&self, id: NodeId) -> Option<LabelId> {
        self.node_label.get(&id).copied()
    }

    pub fn create_node(&mut self, label: Option<LabelId>, attrs: AttributeSet) -> Result<CreatedNode> {
        if let Some(label) = label {
            // Validate before allocating so failure leaves no trace.
            self.label_matrix(label)?;
        }
        let id = NodeId(self.node_alloc.allocate());
        self.grow(id.0 + 1);
        let label_set = match label {
            Some(label) => {
                let outcome = self.label_matrices[label.idx()].set(id.0, id.0)?;
                self.node_label.insert(id, label);
                Some((label, outcome))
            }
            None => None,
        };
        if !attrs.is_empty() {
            self.node_attrs.insert(id, attrs);
        }
        Ok(CreatedNode { id, label_set })
    }

    pub fn delete_node(&mut self, id: NodeId) -> Result<DeletedNode> {
        self.ensure_node(id)?;

        // Dangling edges go in the same operation: collect every incident
        // edge id from the adjacency rows, then cascade.
        let mut incident: Vec<EdgeId> = Vec::new();
        for (t, pair) in self.relations.iter().enumerate() {
            let rel = RelTypeId(t as u32);
            for dst in pair.forward.row(id.0) {
                incident.extend_from_slice(self.edge_table.edges(id, NodeId(dst), rel));
            }
            for src in pair.reverse.row(id.0) {
                if src == id.0 {
                    continue; // self-loop, already collected above
                }
                incident.extend_from_slice(self.edge_table.edges(NodeId(src), id, rel));
            }
        }
        let mut edges = Vec::with_capacity(incident.len());
        for edge in incident {
            edges.push(self.delete_edge(edge)?);
        }

        let label = match self.node_label.remove(&id) {
            Some(label) => {
                let outcome = self.label_matrices[label.idx()].clear(id.0, id.0)?;
                Some((label, outcome))
            }
            None => None,
        };
        let attrs = self.node_attrs.remove(&id).unwrap_or_default();
        self.node_alloc.release(id.0);
        Ok(DeletedNode { id, label, attrs, edges })
    }

    pub fn node_attrs(&self, id: NodeId) -> Option<&AttributeSet> {
        self.node_attrs.get(&id)
    }

    pub fn node_attr(&self, id: NodeId, attr: AttrId) -> Option<&Value> {
        self.node_attrs.get(&id)?.get(attr)
    }

    /// Sets a node attribute, returning the previous value for undo.
    pub fn set_node_attr(&mut self, id: NodeId, attr: AttrId, value: Value) -> Result<Option<Value>> {
        self.ensure_node(id)?;
        Ok(self.node_attrs.entry(id).or_default().set(attr, value))
    }

    // ------------------------------------------------------------------
    // Edges
    // ------------------------------------------------------------------

    pub fn is_edge(&self, id: EdgeId) -> bool {
        self.edge_info.contains_key(&id)
    }

    pub fn edge_info(&self, id: EdgeId) -> Result<EdgeInfo> {
        self.edge_info
            .get(&id)
            .copied()
            .ok_or(StoreError::EdgeNotFound(id))
    }

    /// The distinct edges collapsed into the `(src, dst, rel)` cell.
    pub fn edges_between(&self, src: NodeId, dst: NodeId, rel: RelTypeId) -> &[EdgeId] {
        self.edge_table.edges(src, dst, rel)
    }

    pub fn create_edge(
        &mut self,
        src: NodeId,
        dst: NodeId,
        rel: RelTypeId,
        attrs: AttributeSet,
    ) -> Result<CreatedEdge> {
        self.ensure_node(src)?;
        self.ensure_node(dst)?;
        self.relation(rel)?;

        let id = EdgeId(self.edge_alloc.allocate());
        let pair = &mut self.relations[rel.idx()];
        let fwd = pair.forward.set(src.0, dst.0)?;
        let rev = match pair.reverse.set(dst.0, src.0) {
            Ok(rev) => rev,
            Err(err) => {
                // The pair moves together or not at all.
                pair.forward.undo_set(src.0, dst.0, fwd)?;
                self.edge_alloc.release(id.0);
                return Err(err.into());
            }
        };
        self.edge_table.insert(src, dst, rel, id);
        self.edge_info.insert(id, EdgeInfo { src, dst, rel });
        if !attrs.is_empty() {
            self.edge_attrs.insert(id, attrs);
        }
        Ok(CreatedEdge { id, fwd, rev })
    }

    pub fn delete_edge(&mut self, id: EdgeId) -> Result<DeletedEdge> {
        let info = self.edge_info(id)?;
        let EdgeInfo { src, dst, rel } = info;
        let last_in_cell = self.edge_table.remove(src, dst, rel, id);
        let cleared = if last_in_cell {
            let pair = &mut self.relations[rel.idx()];
            let fwd = pair.forward.clear(src.0, dst.0)?;
            let rev = pair.reverse.clear(dst.0, src.0)?;
            Some((fwd, rev))
        } else {
            None
        };
        self.edge_info.remove(&id);
        let attrs = self.edge_attrs.remove(&id).unwrap_or_default();
        self.edge_alloc.release(id.0);
        Ok(DeletedEdge { id, info, attrs, cleared })
    }

    pub fn edge_attrs(&self, id: EdgeId) -> Option<&AttributeSet> {
        self.edge_attrs.get(&id)
    }

    pub fn edge_attr(&self, id: EdgeId, attr: AttrId) -> Option<&Value> {
        self.edge_attrs.get(&id)?.get(attr)
    }

    pub fn set_edge_attr(&mut self, id: EdgeId, attr: AttrId, value: Value) -> Result<Option<Value>> {
        self.edge_info(id)?;
        Ok(self.edge_attrs.entry(id).or_default().set(attr, value))
    }

    // ------------------------------------------------------------------
    // Synchronization
    // ------------------------------------------------------------------

    /// True iff any matrix holds pending additions or deletions.
    pub fn pending(&self) -> bool {
        self.label_matrices.iter().any(DeltaMatrix::pending)
            || self
                .relations
                .iter()
                .any(|pair| pair.forward.pending() || pair.reverse.pending())
    }

    /// Folds the pending state of every dirty matrix into its committed
    /// matrix. Matrices already clean are skipped.
    pub fn synchronize_all(&mut self) -> Result<()> {
        let mut synced = 0usize;
        for m in &mut self.label_matrices {
            if m.pending() {
                m.synchronize()?;
                synced += 1;
            }
        }
        for pair in &mut self.relations {
            if pair.forward.pending() {
                pair.forward.synchronize()?;
                synced += 1;
            }
            if pair.reverse.pending() {
                pair.reverse.synchronize()?;
                synced += 1;
            }
        }
        if synced > 0 {
            log::debug!("synchronized {synced} dirty matrices");
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Undo support (used by WriteTx rollback)
    // ------------------------------------------------------------------

    pub(crate) fn undo_create_node(&mut self, created: &CreatedNode) -> Result<()> {
        if let Some((label, outcome)) = created.label_set {
            self.label_matrices[label.idx()].undo_set(created.id.0, created.id.0, outcome)?;
            self.node_label.remove(&created.id);
        }
        self.node_attrs.remove(&created.id);
        self.node_alloc.release(created.id.0);
        Ok(())
    }

    pub(crate) fn undo_delete_node(&mut self, deleted: &DeletedNode) -> Result<()> {
        self.node_alloc.reclaim(deleted.id.0);
        if !deleted.attrs.is_empty() {
            self.node_attrs.insert(deleted.id, deleted.attrs.clone());
        }
        if let Some((label, outcome)) = deleted.label {
            self.label_matrices[label.idx()].undo_clear(deleted.id.0, deleted.id.0, outcome)?;
            self.node_label.insert(deleted.id, label);
        }
        // Cascaded edge deletions are undone most-recent-first.
        for edge in deleted.edges.iter().rev() {
            self.undo_delete_edge(edge)?;
        }
        Ok(())
    }

    pub(crate) fn undo_create_edge(&mut self, created: &CreatedEdge, info: EdgeInfo) -> Result<()> {
        let EdgeInfo { src, dst, rel } = info;
        let pair = &mut self.relations[rel.idx()];
        pair.forward.undo_set(src.0, dst.0, created.fwd)?;
        pair.reverse.undo_set(dst.0, src.0, created.rev)?;
        self.edge_table.remove(src, dst, rel, created.id);
        self.edge_info.remove(&created.id);
        self.edge_attrs.remove(&created.id);
        self.edge_alloc.release(created.id.0);
        Ok(())
    }

    pub(crate) fn undo_delete_edge(&mut self, deleted: &DeletedEdge) -> Result<()> {
        let EdgeInfo { src, dst, rel } = deleted.info;
        self.edge_alloc.reclaim(deleted.id.0);
        if let Some((fwd, rev)) = deleted.cleared {
            let pair = &mut self.relations[rel.idx()];
            pair.forward.undo_clear(src.0, dst.0, fwd)?;
            pair.reverse.undo_clear(dst.0, src.0, rev)?;
        }
        self.edge_table.insert(src, dst, rel, deleted.id);
        self.edge_info.insert(deleted.id, deleted.info);
        if !deleted.attrs.is_empty() {
            self.edge_attrs.insert(deleted.id, deleted.attrs.clone());
        }
        Ok(())
    }
}
