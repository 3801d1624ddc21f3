//! The graph model: a containment tree of cells plus edge terminals.
//!
//! Containment is stored as a petgraph `StableDiGraph` (parent → child)
//! with an explicit child order per parent, since paint order follows
//! child order. Every mutation is recorded as a [`Change`]; changes are
//! delivered to listeners when the outermost update closes, so a gesture
//! that touches many cells is observed as one step.

use crate::geometry::Geometry;
use crate::id::CellId;
use crate::style::{Style, StyleError};
use petgraph::graph::NodeIndex;
use petgraph::stable_graph::StableDiGraph;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::ops::{Deref, DerefMut};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    #[error("unknown cell `{0}`")]
    UnknownCell(CellId),
    #[error("cell `{0}` is not an edge")]
    NotAnEdge(CellId),
    #[error("cell id `{0}` is already in use")]
    DuplicateId(CellId),
    #[error("cannot move `{cell}` into its own descendant `{parent}`")]
    CyclicParent { cell: CellId, parent: CellId },
    #[error(transparent)]
    Style(#[from] StyleError),
}

// ─── Cells ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CellKind {
    Root,
    Layer,
    Vertex,
    Edge,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    pub id: CellId,
    pub kind: CellKind,
    /// Label text. Rendered as markup when the style has `html=1`.
    pub value: Option<String>,
    pub style: Style,
    pub geometry: Option<Geometry>,
    pub source: Option<CellId>,
    pub target: Option<CellId>,
    pub collapsed: bool,
    pub visible: bool,
    pub connectable: bool,
}

impl Cell {
    pub fn new(id: CellId, kind: CellKind) -> Self {
        Self {
            id,
            kind,
            value: None,
            style: Style::new(),
            geometry: None,
            source: None,
            target: None,
            collapsed: false,
            visible: true,
            connectable: kind == CellKind::Vertex,
        }
    }

    pub fn is_vertex(&self) -> bool {
        self.kind == CellKind::Vertex
    }

    pub fn is_edge(&self) -> bool {
        self.kind == CellKind::Edge
    }

    pub fn terminal(&self, source: bool) -> Option<CellId> {
        if source { self.source } else { self.target }
    }
}

// ─── Changes ─────────────────────────────────────────────────────────────

/// One recorded mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    ChildAdded { cell: CellId, parent: CellId },
    ChildRemoved { cell: CellId, parent: CellId },
    Geometry { cell: CellId },
    Style { cell: CellId },
    Value { cell: CellId },
    Terminal { edge: CellId, source: bool, terminal: Option<CellId> },
    Collapsed { cell: CellId, collapsed: bool },
}

impl Change {
    pub fn cell(&self) -> CellId {
        match self {
            Change::ChildAdded { cell, .. }
            | Change::ChildRemoved { cell, .. }
            | Change::Geometry { cell }
            | Change::Style { cell }
            | Change::Value { cell }
            | Change::Collapsed { cell, .. } => *cell,
            Change::Terminal { edge, .. } => *edge,
        }
    }
}

type Listener = Box<dyn FnMut(&[Change])>;

// ─── Graph Model ─────────────────────────────────────────────────────────

pub struct GraphModel {
    graph: StableDiGraph<Cell, ()>,
    id_index: HashMap<CellId, NodeIndex>,
    child_order: HashMap<NodeIndex, Vec<NodeIndex>>,
    root: NodeIndex,
    default_parent: CellId,
    update_level: usize,
    pending: Vec<Change>,
    listeners: Vec<Listener>,
}

impl std::fmt::Debug for GraphModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphModel")
            .field("cells", &self.id_index.len())
            .field("update_level", &self.update_level)
            .finish()
    }
}

impl Default for GraphModel {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphModel {
    /// A model with a root cell `0` and one default layer `1`.
    pub fn new() -> Self {
        let mut graph = StableDiGraph::new();
        let root_id = CellId::intern("0");
        let root = graph.add_node(Cell::new(root_id, CellKind::Root));
        let layer_id = CellId::intern("1");
        let layer = graph.add_node(Cell::new(layer_id, CellKind::Layer));
        graph.add_edge(root, layer, ());

        let mut id_index = HashMap::new();
        id_index.insert(root_id, root);
        id_index.insert(layer_id, layer);
        let mut child_order = HashMap::new();
        child_order.insert(root, vec![layer]);

        Self {
            graph,
            id_index,
            child_order,
            root,
            default_parent: layer_id,
            update_level: 0,
            pending: Vec::new(),
            listeners: Vec::new(),
        }
    }

    pub fn root(&self) -> CellId {
        self.graph[self.root].id
    }

    pub fn default_parent(&self) -> CellId {
        self.default_parent
    }

    // ─── Transactions ────────────────────────────────────────────────────

    /// Open an update. The returned guard closes it on drop, including
    /// on early return and unwinding.
    pub fn begin_update(&mut self) -> UpdateGuard<'_> {
        self.update_level += 1;
        UpdateGuard { model: self }
    }

    /// Close one update level. Closing the outermost level delivers the
    /// pending changes to listeners.
    pub fn end_update(&mut self) {
        if self.update_level == 0 {
            log::warn!("end_update without matching begin_update");
            return;
        }
        self.update_level -= 1;
        if self.update_level == 0 {
            self.flush();
        }
    }

    /// Run `f` inside one update.
    pub fn update<R>(&mut self, f: impl FnOnce(&mut GraphModel) -> R) -> R {
        let mut guard = self.begin_update();
        f(&mut guard)
    }

    pub fn update_level(&self) -> usize {
        self.update_level
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&[Change]) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    fn record(&mut self, change: Change) {
        self.pending.push(change);
        if self.update_level == 0 {
            self.flush();
        }
    }

    fn flush(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let changes = std::mem::take(&mut self.pending);
        log::debug!("model update closed with {} change(s)", changes.len());
        for listener in &mut self.listeners {
            listener(&changes);
        }
    }

    // ─── Queries ─────────────────────────────────────────────────────────

    fn index(&self, id: CellId) -> Result<NodeIndex, ModelError> {
        self.id_index
            .get(&id)
            .copied()
            .ok_or(ModelError::UnknownCell(id))
    }

    pub fn contains(&self, id: CellId) -> bool {
        self.id_index.contains_key(&id)
    }

    pub fn get(&self, id: CellId) -> Option<&Cell> {
        self.id_index.get(&id).map(|&idx| &self.graph[idx])
    }

    pub fn is_vertex(&self, id: CellId) -> bool {
        self.get(id).is_some_and(Cell::is_vertex)
    }

    pub fn is_edge(&self, id: CellId) -> bool {
        self.get(id).is_some_and(Cell::is_edge)
    }

    pub fn geometry(&self, id: CellId) -> Option<&Geometry> {
        self.get(id).and_then(|c| c.geometry.as_ref())
    }

    pub fn style(&self, id: CellId) -> Option<&Style> {
        self.get(id).map(|c| &c.style)
    }

    pub fn terminal(&self, edge: CellId, source: bool) -> Option<CellId> {
        self.get(edge).and_then(|c| c.terminal(source))
    }

    pub fn parent(&self, id: CellId) -> Option<CellId> {
        let idx = *self.id_index.get(&id)?;
        self.graph
            .neighbors_directed(idx, petgraph::Direction::Incoming)
            .next()
            .map(|p| self.graph[p].id)
    }

    /// Children in paint order (first child paints first).
    pub fn children(&self, id: CellId) -> Vec<CellId> {
        self.id_index
            .get(&id)
            .and_then(|idx| self.child_order.get(idx))
            .map(|order| order.iter().map(|&c| self.graph[c].id).collect())
            .unwrap_or_default()
    }

    pub fn child_count(&self, id: CellId) -> usize {
        self.id_index
            .get(&id)
            .and_then(|idx| self.child_order.get(idx))
            .map_or(0, Vec::len)
    }

    /// Position of `id` among its siblings.
    pub fn child_index(&self, id: CellId) -> Option<usize> {
        let idx = *self.id_index.get(&id)?;
        let parent = self
            .graph
            .neighbors_directed(idx, petgraph::Direction::Incoming)
            .next()?;
        self.child_order.get(&parent)?.iter().position(|&c| c == idx)
    }

    pub fn is_ancestor(&self, ancestor: CellId, descendant: CellId) -> bool {
        let mut current = Some(descendant);
        while let Some(c) = current {
            if c == ancestor {
                return true;
            }
            current = self.parent(c);
        }
        false
    }

    /// `id` and all its descendants in depth-first paint order.
    pub fn descendants(&self, id: CellId) -> Vec<CellId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(c) = stack.pop() {
            if !self.contains(c) {
                continue;
            }
            out.push(c);
            let mut kids = self.children(c);
            kids.reverse();
            stack.extend(kids);
        }
        out
    }

    /// Edges whose source or target is `id`.
    pub fn edges_of(&self, id: CellId) -> Vec<CellId> {
        self.descendants(self.root())
            .into_iter()
            .filter(|&c| {
                self.get(c)
                    .is_some_and(|cell| cell.is_edge() && (cell.source == Some(id) || cell.target == Some(id)))
            })
            .collect()
    }

    // ─── Mutations ───────────────────────────────────────────────────────

    /// Insert `cell` under `parent` at `index` (appended if `None`).
    pub fn add_cell(
        &mut self,
        parent: CellId,
        cell: Cell,
        index: Option<usize>,
    ) -> Result<CellId, ModelError> {
        let parent_idx = self.index(parent)?;
        let id = cell.id;
        if self.id_index.contains_key(&id) {
            return Err(ModelError::DuplicateId(id));
        }
        let idx = self.graph.add_node(cell);
        self.graph.add_edge(parent_idx, idx, ());
        self.id_index.insert(id, idx);
        let order = self.child_order.entry(parent_idx).or_default();
        let at = index.unwrap_or(order.len()).min(order.len());
        order.insert(at, idx);
        self.record(Change::ChildAdded { cell: id, parent });
        Ok(id)
    }

    pub fn add_vertex(
        &mut self,
        parent: CellId,
        id: Option<&str>,
        value: Option<&str>,
        geometry: Geometry,
        style: &str,
    ) -> Result<CellId, ModelError> {
        let id = id.map_or_else(|| CellId::with_prefix("vertex"), CellId::intern);
        let mut cell = Cell::new(id, CellKind::Vertex);
        cell.value = value.map(str::to_string);
        cell.geometry = Some(geometry);
        cell.style = Style::parse(style)?;
        self.add_cell(parent, cell, None)
    }

    pub fn add_edge(
        &mut self,
        parent: CellId,
        id: Option<&str>,
        value: Option<&str>,
        source: Option<CellId>,
        target: Option<CellId>,
        style: &str,
    ) -> Result<CellId, ModelError> {
        for t in [source, target].into_iter().flatten() {
            self.index(t)?;
        }
        let id = id.map_or_else(|| CellId::with_prefix("edge"), CellId::intern);
        let mut cell = Cell::new(id, CellKind::Edge);
        cell.value = value.map(str::to_string);
        cell.geometry = Some(Geometry::edge());
        cell.style = Style::parse(style)?;
        cell.source = source;
        cell.target = target;
        self.add_cell(parent, cell, None)
    }

    /// Remove a cell and its subtree. Edges left pointing at a removed
    /// terminal are disconnected.
    pub fn remove_cell(&mut self, id: CellId) -> Result<Cell, ModelError> {
        let idx = self.index(id)?;
        let parent = self.parent(id).unwrap_or_else(|| self.root());
        let subtree = self.descendants(id);
        let mut guard = self.begin_update();
        for edge in guard.descendants(guard.root()) {
            if subtree.contains(&edge) {
                continue;
            }
            for source in [true, false] {
                if guard.terminal(edge, source).is_some_and(|t| subtree.contains(&t)) {
                    guard.set_terminal(edge, None, source)?;
                }
            }
        }
        let model = &mut *guard;
        if let Some(parent_idx) = model.id_index.get(&parent).copied()
            && let Some(order) = model.child_order.get_mut(&parent_idx)
        {
            order.retain(|&c| c != idx);
        }
        let mut removed = None;
        for c in subtree.iter().rev() {
            if let Some(ci) = model.id_index.remove(c) {
                model.child_order.remove(&ci);
                let cell = model.graph.remove_node(ci);
                if *c == id {
                    removed = cell;
                }
            }
        }
        model.record(Change::ChildRemoved { cell: id, parent });
        removed.ok_or(ModelError::UnknownCell(id))
    }

    /// Move `id` under `parent` at `index`.
    pub fn move_cell(
        &mut self,
        id: CellId,
        parent: CellId,
        index: Option<usize>,
    ) -> Result<(), ModelError> {
        let idx = self.index(id)?;
        let parent_idx = self.index(parent)?;
        if self.is_ancestor(id, parent) {
            return Err(ModelError::CyclicParent { cell: id, parent });
        }
        if let Some(old) = self
            .graph
            .neighbors_directed(idx, petgraph::Direction::Incoming)
            .next()
        {
            if let Some(e) = self.graph.find_edge(old, idx) {
                self.graph.remove_edge(e);
            }
            if let Some(order) = self.child_order.get_mut(&old) {
                order.retain(|&c| c != idx);
            }
        }
        self.graph.add_edge(parent_idx, idx, ());
        let order = self.child_order.entry(parent_idx).or_default();
        let at = index.unwrap_or(order.len()).min(order.len());
        order.insert(at, idx);
        self.record(Change::ChildAdded { cell: id, parent });
        Ok(())
    }

    pub fn set_geometry(&mut self, id: CellId, geometry: Geometry) -> Result<(), ModelError> {
        let idx = self.index(id)?;
        self.graph[idx].geometry = Some(geometry);
        self.record(Change::Geometry { cell: id });
        Ok(())
    }

    pub fn set_style(&mut self, id: CellId, style: Style) -> Result<(), ModelError> {
        let idx = self.index(id)?;
        self.graph[idx].style = style;
        self.record(Change::Style { cell: id });
        Ok(())
    }

    /// Set a single style key, leaving the rest of the style untouched.
    pub fn set_style_value(
        &mut self,
        id: CellId,
        key: &str,
        value: impl ToString,
    ) -> Result<(), ModelError> {
        let idx = self.index(id)?;
        self.graph[idx].style.set(key, value);
        self.record(Change::Style { cell: id });
        Ok(())
    }

    pub fn set_value(&mut self, id: CellId, value: Option<String>) -> Result<(), ModelError> {
        let idx = self.index(id)?;
        self.graph[idx].value = value;
        self.record(Change::Value { cell: id });
        Ok(())
    }

    pub fn set_terminal(
        &mut self,
        edge: CellId,
        terminal: Option<CellId>,
        source: bool,
    ) -> Result<(), ModelError> {
        let idx = self.index(edge)?;
        if !self.graph[idx].is_edge() {
            return Err(ModelError::NotAnEdge(edge));
        }
        if let Some(t) = terminal {
            self.index(t)?;
        }
        let cell = &mut self.graph[idx];
        if source {
            cell.source = terminal;
        } else {
            cell.target = terminal;
        }
        self.record(Change::Terminal {
            edge,
            source,
            terminal,
        });
        Ok(())
    }

    pub fn set_collapsed(&mut self, id: CellId, collapsed: bool) -> Result<(), ModelError> {
        let idx = self.index(id)?;
        self.graph[idx].collapsed = collapsed;
        self.record(Change::Collapsed { cell: id, collapsed });
        Ok(())
    }

    /// Copy of a cell under a fresh id, without children.
    pub fn clone_cell(&self, id: CellId) -> Result<Cell, ModelError> {
        let idx = self.index(id)?;
        let mut cell = self.graph[idx].clone();
        let prefix = if cell.is_edge() { "edge" } else { "vertex" };
        cell.id = CellId::with_prefix(prefix);
        Ok(cell)
    }
}

// ─── Update guard ────────────────────────────────────────────────────────

/// Open model update. Derefs to the model; dropping it ends the update.
pub struct UpdateGuard<'a> {
    model: &'a mut GraphModel,
}

impl Deref for UpdateGuard<'_> {
    type Target = GraphModel;

    fn deref(&self) -> &GraphModel {
        self.model
    }
}

impl DerefMut for UpdateGuard<'_> {
    fn deref_mut(&mut self) -> &mut GraphModel {
        self.model
    }
}

impl Drop for UpdateGuard<'_> {
    fn drop(&mut self) {
        self.model.end_update();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::Bounds;
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn model_with_two() -> (GraphModel, CellId, CellId, CellId) {
        let mut m = GraphModel::new();
        let p = m.default_parent();
        let a = m
            .add_vertex(p, Some("ma"), Some("A"), Geometry::vertex(0.0, 0.0, 80.0, 30.0), "")
            .unwrap();
        let b = m
            .add_vertex(p, Some("mb"), Some("B"), Geometry::vertex(200.0, 0.0, 80.0, 30.0), "")
            .unwrap();
        let e = m
            .add_edge(p, Some("mab"), None, Some(a), Some(b), "")
            .unwrap();
        (m, a, b, e)
    }

    #[test]
    fn children_follow_insertion_order() {
        let (m, a, b, e) = model_with_two();
        assert_eq!(m.children(m.default_parent()), vec![a, b, e]);
        assert_eq!(m.child_index(b), Some(1));
        assert_eq!(m.edges_of(a), vec![e]);
    }

    #[test]
    fn nested_updates_deliver_once() {
        let (mut m, a, b, _) = model_with_two();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        m.subscribe(move |changes| sink.borrow_mut().push(changes.len()));

        m.update(|m| {
            m.set_geometry(a, Geometry::vertex(1.0, 1.0, 10.0, 10.0)).unwrap();
            m.update(|m| m.set_style_value(b, "rotation", 45).unwrap());
            assert_eq!(m.update_level(), 1);
        });
        assert_eq!(*seen.borrow(), vec![2]);
        assert_eq!(m.update_level(), 0);
    }

    #[test]
    fn update_closes_on_error_path() {
        let (mut m, a, _, _) = model_with_two();
        let result: Result<(), ModelError> = m.update(|m| {
            m.set_geometry(a, Geometry::vertex(0.0, 0.0, 1.0, 1.0))?;
            m.set_geometry(CellId::intern("missing"), Geometry::default())?;
            Ok(())
        });
        assert!(matches!(result, Err(ModelError::UnknownCell(_))));
        assert_eq!(m.update_level(), 0);
    }

    #[test]
    fn update_closes_on_panic() {
        let (mut m, a, _, _) = model_with_two();
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            m.update(|m| {
                m.set_style_value(a, "rotation", 10).unwrap();
                panic!("mutation body failed");
            })
        }));
        assert!(outcome.is_err());
        assert_eq!(m.update_level(), 0);
    }

    #[test]
    fn remove_disconnects_edges() {
        let (mut m, a, _, e) = model_with_two();
        let removed = m.remove_cell(a).unwrap();
        assert_eq!(removed.id, a);
        assert!(!m.contains(a));
        assert_eq!(m.terminal(e, true), None);
    }

    #[test]
    fn move_into_descendant_is_rejected() {
        let (mut m, a, b, _) = model_with_two();
        m.move_cell(b, a, None).unwrap();
        assert_eq!(m.parent(b), Some(a));
        assert!(matches!(
            m.move_cell(a, b, None),
            Err(ModelError::CyclicParent { .. })
        ));
    }

    #[test]
    fn set_terminal_requires_edge() {
        let (mut m, a, b, _) = model_with_two();
        assert_eq!(m.set_terminal(a, Some(b), true), Err(ModelError::NotAnEdge(a)));
        assert_eq!(
            m.geometry(a).map(|g| g.bounds),
            Some(Bounds::new(0.0, 0.0, 80.0, 30.0))
        );
    }
}
