//! AST → query graph → algebraic expressions → operator tree.
//!
//! Planning assigns every alias a record slot (the record map), converts each
//! `MATCH` path into expressions via the traversal algebra, and wires the
//! operator chain: a scan for the entry point, one traversal operator per
//! expression, filters, write operators, and the output projection.

use lattice_algebra::{AlgebraicExpression, Direction, QueryEdge, QueryGraph, QueryNode, build_path};
use lattice_data_structures::map::{Entry as MapEntry, HashMap, HashSet};
use lattice_execution::ops::{
    AllNodeScan, CondTraverse, Create, Delete, EdgeBlueprint, ExpandInto, Filter, FilterValue,
    LabelScan, NodeBlueprint, Predicate, ProcCall, VarLenTraverse,
};
use lattice_execution::{ExecutionPlan, PhysicalOp, ProfileOp, ProfileSheet};
use lattice_primitives::{AttrId, SlotId};
use lattice_store::{GraphStore, WriteTx};
use smallvec::SmallVec;

use crate::ast::{
    Clause, NodePattern, PatternDirection, PatternPath, PropertyFilter, Query, ReturnExpr,
    ReturnItem,
};
use crate::protocol::{Column, ColumnKind};
use crate::{Error, Result};

/// Name resolution environment. Write queries may register new labels,
/// relationship types, and attribute keys while planning `CREATE` clauses;
/// `MATCH` resolution is always read-only — matching an unknown name means
/// matching nothing, never registering it.
pub(crate) enum PlanEnv<'a> {
    Read(&'a GraphStore),
    Write(&'a mut WriteTx),
}

impl PlanEnv<'_> {
    fn store(&self) -> &GraphStore {
        match self {
            PlanEnv::Read(store) => store,
            PlanEnv::Write(tx) => &**tx,
        }
    }

    fn write(&mut self) -> Result<&mut WriteTx> {
        match self {
            PlanEnv::Write(tx) => Ok(tx),
            PlanEnv::Read(_) => Err(Error::Unsupported("write clause in a read-only plan")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AliasKind {
    Node,
    Edge,
    Scalar,
}

impl AliasKind {
    fn column_kind(self) -> ColumnKind {
        match self {
            AliasKind::Node => ColumnKind::Node,
            AliasKind::Edge => ColumnKind::Edge,
            AliasKind::Scalar => ColumnKind::Scalar,
        }
    }
}

/// The record map: aliases to slots, assigned once at plan-build time.
#[derive(Default)]
struct SlotMap {
    slots: HashMap<Box<str>, (SlotId, AliasKind)>,
    order: u32,
    anon: u32,
}

impl SlotMap {
    fn intern(&mut self, alias: &str, kind: AliasKind) -> Result<SlotId> {
        match self.slots.entry(alias.into()) {
            MapEntry::Occupied(e) => {
                let (slot, existing) = *e.get();
                if existing != kind {
                    return Err(Error::AliasKindMismatch(alias.into()));
                }
                Ok(slot)
            }
            MapEntry::Vacant(e) => {
                let slot = SlotId(self.order);
                self.order += 1;
                e.insert((slot, kind));
                Ok(slot)
            }
        }
    }

    fn get(&self, alias: &str) -> Option<(SlotId, AliasKind)> {
        self.slots.get(alias).copied()
    }

    fn fresh_anon(&mut self) -> Box<str> {
        let alias = format!("@anon_{}", self.anon);
        self.anon += 1;
        alias.into()
    }

    fn width(&self) -> usize {
        self.order as usize
    }
}

/// Where one output column reads from.
#[derive(Debug, Clone, Copy)]
pub(crate) enum OutputSource {
    /// The bound entity itself.
    Entity,
    /// An attribute of the bound node. `None` means the key was never
    /// registered: the column is all nulls.
    NodeProp(Option<AttrId>),
    /// An attribute of the bound edge.
    EdgeProp(Option<AttrId>),
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct OutputProjection {
    pub slot: SlotId,
    pub source: OutputSource,
}

/// A planned query, ready to execute.
pub(crate) struct PreparedQuery {
    /// `None` when planning proved the result empty (unknown label,
    /// unsatisfiable filter) or the query has no operators.
    pub plan: Option<ExecutionPlan>,
    pub projections: Vec<OutputProjection>,
    pub columns: Vec<Column>,
}

struct Planner<'e, 'a> {
    env: &'e mut PlanEnv<'a>,
    slots: SlotMap,
    /// Aliases bound by the operator chain built so far.
    produced: HashSet<Box<str>>,
    root: Option<Box<dyn PhysicalOp>>,
    /// Planning proved the match empty; no operators are needed.
    empty: bool,
    projections: Vec<OutputProjection>,
    columns: Vec<Column>,
    /// When profiling, every operator gets a timing shim wired to this sheet.
    sheet: Option<ProfileSheet>,
    last_profiled: Option<usize>,
}

pub(crate) fn plan_query(
    query: &Query,
    env: &mut PlanEnv<'_>,
    sheet: Option<ProfileSheet>,
) -> Result<PreparedQuery> {
    let referenced = collect_referenced(query);
    let mut planner = Planner {
        env,
        slots: SlotMap::default(),
        produced: HashSet::default(),
        root: None,
        empty: false,
        projections: Vec::new(),
        columns: Vec::new(),
        sheet,
        last_profiled: None,
    };

    for clause in &query.clauses {
        match clause {
            Clause::Match { path, filters } => planner.plan_match(path, filters, &referenced)?,
            Clause::Create { path } => planner.plan_create(path)?,
            Clause::Delete { aliases } => planner.plan_delete(aliases)?,
            Clause::Call {
                procedure,
                args,
                yields,
            } => planner.plan_call(procedure, args, yields)?,
            Clause::Return { items } => planner.plan_return(items)?,
        }
    }

    let projection_slots = planner.projections.iter().map(|p| p.slot).collect();
    let plan = match (planner.empty, planner.root) {
        (false, Some(root)) => Some(ExecutionPlan::new(root, planner.slots.width(), projection_slots)),
        _ => None,
    };
    log::debug!(
        "planned query: {} slots, {} columns, plan: {}",
        planner.slots.width(),
        planner.columns.len(),
        plan.is_some()
    );
    Ok(PreparedQuery {
        plan,
        projections: planner.projections,
        columns: planner.columns,
    })
}

/// Aliases referenced outside their own pattern path: these must surface in
/// records, so they become traversal-segment boundaries.
fn collect_referenced(query: &Query) -> HashSet<Box<str>> {
    let mut refs = HashSet::default();
    for clause in &query.clauses {
        match clause {
            Clause::Return { items } => {
                for item in items {
                    match &item.expr {
                        ReturnExpr::Alias(alias) => refs.insert(alias.clone()),
                        ReturnExpr::Property { alias, .. } => refs.insert(alias.clone()),
                    };
                }
            }
            Clause::Delete { aliases } => refs.extend(aliases.iter().cloned()),
            Clause::Match { filters, .. } => {
                refs.extend(filters.iter().map(|f| f.alias.clone()));
            }
            Clause::Create { path } => {
                // A created edge endpoint naming a matched node references it.
                refs.extend(path.nodes.iter().filter_map(|n| n.alias.clone()));
            }
            Clause::Call { .. } => {}
        }
    }
    refs
}

impl Planner<'_, '_> {
    fn plan_match(
        &mut self,
        path: &PatternPath,
        filters: &[PropertyFilter],
        referenced: &HashSet<Box<str>>,
    ) -> Result<()> {
        // Name the anonymous nodes so slots and expressions can address them.
        let aliases: Vec<Box<str>> = path
            .nodes
            .iter()
            .map(|n| n.alias.clone().unwrap_or_else(|| self.slots.fresh_anon()))
            .collect();

        let mut qg = QueryGraph::default();
        for (pattern, alias) in path.nodes.iter().zip(&aliases) {
            let mut labels = SmallVec::new();
            for name in &pattern.labels {
                match self.env.store().label_id(name) {
                    Some(id) => {
                        if !labels.contains(&id) {
                            labels.push(id);
                        }
                    }
                    // Unknown label: nothing can match.
                    None => self.empty = true,
                }
            }
            qg.nodes.push(QueryNode {
                alias: alias.clone(),
                labels,
            });
        }
        let mut edge_aliases = Vec::with_capacity(path.rels.len());
        for rel in &path.rels {
            let mut rel_types = SmallVec::new();
            for name in &rel.types {
                match self.env.store().rel_type_id(name) {
                    Some(id) => rel_types.push(id),
                    None => self.empty = true,
                }
            }
            // Inline props force the edge into a record slot; name it.
            let alias = match (&rel.alias, rel.props.is_empty()) {
                (Some(alias), _) => Some(alias.clone()),
                (None, false) => Some(self.slots.fresh_anon()),
                (None, true) => None,
            };
            edge_aliases.push(alias.clone());
            qg.edges.push(QueryEdge {
                alias,
                rel_types,
                direction: match rel.direction {
                    PatternDirection::Outgoing => Direction::Outgoing,
                    PatternDirection::Incoming => Direction::Incoming,
                },
                range: rel.range,
            });
        }

        // Inline property constraints become filter predicates; their
        // entities must therefore surface in records.
        let mut predicates = Vec::new();
        for (pattern, alias) in path.nodes.iter().zip(&aliases) {
            for (key, value) in &pattern.props {
                predicates.push((alias.clone(), key.clone(), crate::ast::CmpOp::Eq, value.clone()));
            }
        }
        for (rel, alias) in path.rels.iter().zip(&edge_aliases) {
            for (key, value) in &rel.props {
                let alias = alias.as_ref().expect("prop-bearing edges are named above");
                predicates.push((alias.clone(), key.clone(), crate::ast::CmpOp::Eq, value.clone()));
            }
        }
        for filter in filters {
            predicates.push((
                filter.alias.clone(),
                filter.key.clone(),
                filter.op,
                filter.value.clone(),
            ));
        }

        if self.empty {
            // Still intern the aliases so RETURN can name them.
            for alias in &aliases {
                self.slots.intern(alias, AliasKind::Node)?;
            }
            for alias in edge_aliases.iter().flatten() {
                self.slots.intern(alias, AliasKind::Edge)?;
            }
            return Ok(());
        }

        let filtered: HashSet<Box<str>> = predicates.iter().map(|(a, ..)| a.clone()).collect();
        if path.rels.is_empty() {
            self.plan_single_node_match(&qg)?;
        } else {
            self.plan_path_match(qg, &aliases, &filtered, referenced)?;
        }

        if !predicates.is_empty() {
            let preds = self.build_predicates(&predicates)?;
            match preds {
                Some(preds) => {
                    let child = self.take_root()?;
                    self.install_root(Box::new(Filter::new(child, preds)));
                }
                // A predicate over an unregistered key matches nothing.
                None => self.empty = true,
            }
        }
        Ok(())
    }

    fn plan_single_node_match(&mut self, qg: &QueryGraph) -> Result<()> {
        let node = &qg.nodes[0];
        if self.produced.contains(&node.alias) {
            return Err(Error::Unsupported("re-matching a bound alias"));
        }
        if self.root.is_some() {
            return Err(Error::Unsupported("cartesian product between patterns"));
        }
        let slot = self.slots.intern(&node.alias, AliasKind::Node)?;
        let scan: Box<dyn PhysicalOp> = match node.labels.split_first() {
            None => Box::new(AllNodeScan::new(slot)),
            Some((&label, rest)) => {
                if !rest.is_empty() {
                    // Nodes carry one label; two distinct filters match nothing.
                    self.empty = true;
                }
                Box::new(LabelScan::new(slot, label))
            }
        };
        self.install_root(scan);
        self.produced.insert(node.alias.clone());
        Ok(())
    }

    fn plan_path_match(
        &mut self,
        qg: QueryGraph,
        aliases: &[Box<str>],
        filtered: &HashSet<Box<str>>,
        referenced: &HashSet<Box<str>>,
    ) -> Result<()> {
        // Segment boundaries: referenced and filtered aliases, plus any
        // alias appearing twice in this path (the second visit closes a
        // cycle), plus everything an earlier clause already bound.
        let mut bound: HashSet<Box<str>> = referenced.clone();
        bound.extend(filtered.iter().cloned());
        let mut seen: HashSet<&str> = HashSet::default();
        for alias in aliases {
            if !seen.insert(alias.as_ref()) {
                bound.insert(alias.clone());
            }
        }
        let pinned: HashSet<Box<str>> = self.produced.iter().cloned().collect();
        bound.extend(pinned.iter().cloned());

        let mut exprs = build_path(qg, &bound, &pinned)?;

        // Entry point: a scan, unless a previous clause already bound the
        // source alias.
        let first = &mut exprs[0];
        let src_alias = first.src.clone();
        if self.root.is_some() {
            if !self.produced.contains(&src_alias) {
                return Err(Error::Unsupported("cartesian product between patterns"));
            }
        } else {
            let slot = self.slots.intern(&src_alias, AliasKind::Node)?;
            let scan: Box<dyn PhysicalOp> = match first.leading_label() {
                Some(label) => {
                    first.strip_leading_label(label);
                    Box::new(LabelScan::new(slot, label))
                }
                None => Box::new(AllNodeScan::new(slot)),
            };
            self.install_root(scan);
            self.produced.insert(src_alias);
        }

        for expr in exprs {
            // Stripping the scan's label can leave a diagonal-only head
            // expression empty; an empty product is the identity.
            if expr.operands().is_empty() {
                continue;
            }
            self.push_traversal(expr)?;
        }
        Ok(())
    }

    fn push_traversal(&mut self, expr: AlgebraicExpression) -> Result<()> {
        let src_slot = self
            .slots
            .get(&expr.src)
            .ok_or_else(|| Error::UnknownAlias(expr.src.clone()))?
            .0;
        let dest_known = self.produced.contains(&expr.dest);
        let dest_slot = self.slots.intern(&expr.dest, AliasKind::Node)?;
        let edge_slot = match &expr.edge {
            Some(alias) => Some(self.slots.intern(alias, AliasKind::Edge)?),
            None => None,
        };
        let child = self.take_root()?;

        let op: Box<dyn PhysicalOp> = if let Some((min, max)) = expr.var_len {
            Box::new(VarLenTraverse::new(child, expr.clone(), min, max, src_slot, dest_slot))
        } else if dest_known {
            Box::new(ExpandInto::new(child, expr.clone(), src_slot, dest_slot, edge_slot))
        } else {
            Box::new(CondTraverse::new(child, expr.clone(), src_slot, dest_slot, edge_slot))
        };
        self.produced.insert(expr.dest.clone());
        self.install_root(op);
        Ok(())
    }

    /// Builds runtime predicates; `None` when some key can never match.
    fn build_predicates(
        &mut self,
        predicates: &[(Box<str>, Box<str>, crate::ast::CmpOp, lattice_store::Value)],
    ) -> Result<Option<Vec<Predicate>>> {
        let mut out = Vec::with_capacity(predicates.len());
        for (alias, key, op, value) in predicates {
            let (slot, kind) = self
                .slots
                .get(alias)
                .ok_or_else(|| Error::UnknownAlias(alias.clone()))?;
            let Some(attr) = self.env.store().attr_id(key) else {
                return Ok(None);
            };
            let lhs = match kind {
                AliasKind::Node => FilterValue::NodeAttr { slot, attr },
                AliasKind::Edge => FilterValue::EdgeAttr { slot, attr },
                AliasKind::Scalar => FilterValue::Slot(slot),
            };
            out.push(Predicate {
                lhs,
                op: *op,
                rhs: FilterValue::Const(value.clone()),
            });
        }
        Ok(Some(out))
    }

    fn plan_create(&mut self, path: &PatternPath) -> Result<()> {
        let mut node_bps = Vec::new();
        let mut edge_bps = Vec::new();
        let mut aliases = Vec::with_capacity(path.nodes.len());

        for pattern in &path.nodes {
            let alias = pattern
                .alias
                .clone()
                .unwrap_or_else(|| self.slots.fresh_anon());
            let slot = self.slots.intern(&alias, AliasKind::Node)?;
            if !self.produced.contains(&alias) {
                node_bps.push(self.node_blueprint(pattern, slot)?);
                self.produced.insert(alias.clone());
            }
            aliases.push(alias);
        }
        for (i, rel) in path.rels.iter().enumerate() {
            if rel.range.is_some() {
                return Err(Error::Unsupported("variable-length CREATE"));
            }
            let [type_name] = rel.types.as_slice() else {
                return Err(Error::Unsupported("CREATE edge needs exactly one type"));
            };
            let rel_id = self.env.write()?.add_rel_type(type_name);
            let slot = match &rel.alias {
                Some(alias) => {
                    let slot = self.slots.intern(alias, AliasKind::Edge)?;
                    self.produced.insert(alias.clone());
                    Some(slot)
                }
                None => None,
            };
            let (src_idx, dst_idx) = match rel.direction {
                PatternDirection::Outgoing => (i, i + 1),
                PatternDirection::Incoming => (i + 1, i),
            };
            let attrs = self.register_attrs(&rel.props)?;
            edge_bps.push(EdgeBlueprint {
                slot,
                src_slot: self.slots.get(&aliases[src_idx]).expect("interned above").0,
                dst_slot: self.slots.get(&aliases[dst_idx]).expect("interned above").0,
                rel: rel_id,
                attrs,
            });
        }

        let child = self.root.take();
        self.install_root(Box::new(Create::new(child, node_bps, edge_bps)));
        Ok(())
    }

    fn node_blueprint(&mut self, pattern: &NodePattern, slot: SlotId) -> Result<NodeBlueprint> {
        let label = match pattern.labels.as_slice() {
            [] => None,
            [name] => Some(self.env.write()?.add_label(name)),
            _ => return Err(Error::Unsupported("CREATE node with multiple labels")),
        };
        let attrs = self.register_attrs(&pattern.props)?;
        Ok(NodeBlueprint { slot, label, attrs })
    }

    fn register_attrs(
        &mut self,
        props: &[(Box<str>, lattice_store::Value)],
    ) -> Result<Vec<(AttrId, lattice_store::Value)>> {
        props
            .iter()
            .map(|(key, value)| Ok((self.env.write()?.add_attr(key), value.clone())))
            .collect()
    }

    fn plan_delete(&mut self, aliases: &[Box<str>]) -> Result<()> {
        let mut node_slots = Vec::new();
        let mut edge_slots = Vec::new();
        for alias in aliases {
            let (slot, kind) = self
                .slots
                .get(alias)
                .ok_or_else(|| Error::UnknownAlias(alias.clone()))?;
            match kind {
                AliasKind::Node => node_slots.push(slot),
                AliasKind::Edge => edge_slots.push(slot),
                AliasKind::Scalar => return Err(Error::Unsupported("DELETE of a scalar")),
            }
        }
        let child = self.take_root()?;
        self.install_root(Box::new(Delete::new(child, node_slots, edge_slots)));
        Ok(())
    }

    fn plan_call(&mut self, procedure: &str, args: &[lattice_store::Value], yields: &[Box<str>]) -> Result<()> {
        let mut yield_slots = Vec::with_capacity(yields.len());
        for alias in yields {
            yield_slots.push(self.slots.intern(alias, AliasKind::Scalar)?);
            self.produced.insert(alias.clone());
        }
        let child = self.root.take();
        self.install_root(Box::new(ProcCall::new(
            child,
            procedure,
            args.to_vec(),
            yield_slots,
        )));
        Ok(())
    }

    fn plan_return(&mut self, items: &[ReturnItem]) -> Result<()> {
        for item in items {
            let (alias, source_of) = match &item.expr {
                ReturnExpr::Alias(alias) => (alias, None),
                ReturnExpr::Property { alias, key } => (alias, Some(key)),
            };
            let (slot, kind) = self
                .slots
                .get(alias)
                .ok_or_else(|| Error::UnknownAlias(alias.clone()))?;
            let (source, column_kind) = match source_of {
                None => (OutputSource::Entity, kind.column_kind()),
                Some(key) => {
                    let attr = self.env.store().attr_id(key);
                    let source = match kind {
                        AliasKind::Node => OutputSource::NodeProp(attr),
                        AliasKind::Edge => OutputSource::EdgeProp(attr),
                        AliasKind::Scalar => {
                            return Err(Error::Unsupported("property access on a scalar"));
                        }
                    };
                    (source, ColumnKind::Scalar)
                }
            };
            self.projections.push(OutputProjection { slot, source });
            self.columns.push(Column {
                name: item.name.clone(),
                kind: column_kind,
            });
        }
        Ok(())
    }

    fn take_root(&mut self) -> Result<Box<dyn PhysicalOp>> {
        self.root
            .take()
            .ok_or(Error::Unsupported("clause requires an upstream pattern"))
    }

    /// Installs `op` as the chain root, interposing the profiling shim when a
    /// sheet was requested. The chain is linear, so the previous root is the
    /// new operator's only child.
    fn install_root(&mut self, op: Box<dyn PhysicalOp>) {
        match &self.sheet {
            None => self.root = Some(op),
            Some(sheet) => {
                let children = self.last_profiled.into_iter().collect();
                let idx = sheet.add(op.name(), children);
                self.last_profiled = Some(idx);
                self.root = Some(Box::new(ProfileOp::new(op, idx, sheet.clone())));
            }
        }
    }
}
