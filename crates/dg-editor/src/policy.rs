//! Cell permissions and connection rules.
//!
//! Handlers never read permission styles directly; they ask a
//! [`GraphHandlerPolicy`]. The trait's provided methods are the stock
//! rules. [`EditorPolicy`] is the diagram editor's customization:
//! nothing is locked, only containers fold, touch pointers get a wider
//! tolerance, and every vertex offers fixed connection points.

use crate::constraint::ConnectionConstraint;
use crate::input::PointerKind;
use dg_core::style::keys;
use dg_core::{CellId, CellState, GraphConfig, GraphModel, GraphView, Point, Style};
use std::fmt;

/// Outcome of validating a connection.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ValidationError {
    /// The connection is allowed.
    #[default]
    None,
    /// Not allowed and already obvious; nothing is shown to the user.
    Blocked,
    /// Not allowed; the message explains why.
    Message(String),
}

impl ValidationError {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Text to surface, if any.
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Message(m) if !m.is_empty() => Some(m),
            _ => None,
        }
    }
}

/// Read access to everything a permission check may look at.
#[derive(Clone, Copy)]
pub struct CellScope<'a> {
    pub model: &'a GraphModel,
    pub view: &'a GraphView,
    pub config: &'a GraphConfig,
}

impl<'a> CellScope<'a> {
    pub fn new(model: &'a GraphModel, view: &'a GraphView, config: &'a GraphConfig) -> Self {
        Self {
            model,
            view,
            config,
        }
    }

    /// Resolved style when the cell has a state, its own style otherwise.
    pub fn style(&self, cell: CellId) -> Option<&'a Style> {
        self.view
            .state(cell)
            .map(|s| &s.style)
            .or_else(|| self.model.style(cell))
    }

    pub fn flag(&self, cell: CellId, key: &str, default: bool) -> bool {
        self.style(cell).map_or(default, |s| s.get_bool(key, default))
    }

    pub fn is_swimlane(&self, cell: CellId) -> bool {
        self.style(cell)
            .and_then(|s| s.get(keys::SHAPE))
            .is_some_and(|shape| shape == "swimlane")
    }
}

impl fmt::Debug for CellScope<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CellScope").finish_non_exhaustive()
    }
}

/// Permission queries used by the handlers and the renderer.
pub trait GraphHandlerPolicy: fmt::Debug {
    fn is_cell_locked(&self, scope: CellScope<'_>, cell: CellId) -> bool {
        scope.flag(cell, keys::LOCKED, false)
    }

    fn is_cell_movable(&self, scope: CellScope<'_>, cell: CellId) -> bool {
        !self.is_cell_locked(scope, cell) && scope.flag(cell, keys::MOVABLE, true)
    }

    fn is_cell_resizable(&self, scope: CellScope<'_>, cell: CellId) -> bool {
        scope.model.is_vertex(cell)
            && !self.is_cell_locked(scope, cell)
            && scope.flag(cell, keys::RESIZABLE, true)
    }

    fn is_cell_rotatable(&self, scope: CellScope<'_>, cell: CellId) -> bool {
        scope.model.is_vertex(cell)
            && !self.is_cell_locked(scope, cell)
            && scope.flag(cell, keys::ROTATABLE, true)
    }

    /// Edge labels move; vertex labels stay put.
    fn is_label_movable(&self, scope: CellScope<'_>, cell: CellId) -> bool {
        !self.is_cell_locked(scope, cell) && scope.model.is_edge(cell)
    }

    fn is_cell_bendable(&self, scope: CellScope<'_>, cell: CellId) -> bool {
        !self.is_cell_locked(scope, cell) && scope.flag(cell, keys::BENDABLE, true)
    }

    /// Whether `edge` may be detached from `terminal` at the given end.
    fn is_cell_disconnectable(
        &self,
        scope: CellScope<'_>,
        edge: CellId,
        _terminal: CellId,
        _source: bool,
    ) -> bool {
        !self.is_cell_locked(scope, edge)
    }

    /// Whether a dangling end of `edge` may be dragged.
    fn is_terminal_point_movable(&self, _scope: CellScope<'_>, _edge: CellId, _source: bool) -> bool {
        true
    }

    fn is_cell_connectable(&self, scope: CellScope<'_>, cell: CellId) -> bool {
        scope.model.get(cell).is_some_and(|c| c.connectable) && scope.flag(cell, keys::CONNECTABLE, true)
    }

    fn is_container(&self, scope: CellScope<'_>, cell: CellId) -> bool {
        scope.is_swimlane(cell)
    }

    fn is_cell_foldable(&self, scope: CellScope<'_>, cell: CellId) -> bool {
        scope.config.folding_enabled
            && scope.model.child_count(cell) > 0
            && scope.flag(cell, keys::FOLDABLE, true)
    }

    /// Pixels a pointer must travel before a press becomes a drag.
    fn tolerance(&self, config: &GraphConfig, _pointer: PointerKind) -> f64 {
        config.tolerance
    }

    /// Validate connecting `edge` between `source` and `target`.
    fn validate_edge(
        &self,
        scope: CellScope<'_>,
        edge: CellId,
        source: Option<CellId>,
        target: Option<CellId>,
    ) -> ValidationError {
        if !scope.config.allow_dangling_edges && (source.is_none() || target.is_none()) {
            return ValidationError::Blocked;
        }
        for t in [source, target].into_iter().flatten() {
            if t == edge || !self.is_cell_connectable(scope, t) {
                return ValidationError::Blocked;
            }
        }
        ValidationError::None
    }

    /// Fixed connection points offered by a terminal.
    fn connection_constraints(
        &self,
        _scope: CellScope<'_>,
        _state: &CellState,
        _source: bool,
    ) -> Vec<ConnectionConstraint> {
        Vec::new()
    }
}

/// The stock rules.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultPolicy;

impl GraphHandlerPolicy for DefaultPolicy {}

// ─── Editor policy ──────────────────────────────────────────────────────

/// Touch pointers need a wider slop.
const TOUCH_TOLERANCE: f64 = 12.0;

#[derive(Debug, Clone)]
pub struct EditorPolicy {
    constraints: Vec<ConnectionConstraint>,
}

impl Default for EditorPolicy {
    fn default() -> Self {
        // Quarter points on each side plus the corners.
        let mut constraints = Vec::new();
        for f in [0.0, 0.25, 0.5, 0.75, 1.0] {
            constraints.push(ConnectionConstraint::fixed(f, 0.0));
            constraints.push(ConnectionConstraint::fixed(f, 1.0));
            if f != 0.0 && f != 1.0 {
                constraints.push(ConnectionConstraint::fixed(0.0, f));
                constraints.push(ConnectionConstraint::fixed(1.0, f));
            }
        }
        Self { constraints }
    }
}

impl EditorPolicy {
    pub fn with_constraints(points: &[Point]) -> Self {
        Self {
            constraints: points
                .iter()
                .map(|p| ConnectionConstraint::fixed(p.x, p.y))
                .collect(),
        }
    }
}

impl GraphHandlerPolicy for EditorPolicy {
    fn is_cell_locked(&self, _scope: CellScope<'_>, _cell: CellId) -> bool {
        false
    }

    fn is_container(&self, scope: CellScope<'_>, cell: CellId) -> bool {
        scope.is_swimlane(cell) || scope.flag(cell, keys::CONTAINER, false)
    }

    fn is_cell_foldable(&self, scope: CellScope<'_>, cell: CellId) -> bool {
        scope.config.folding_enabled
            && self.is_container(scope, cell)
            && scope.flag(cell, keys::COLLAPSIBLE, true)
    }

    fn tolerance(&self, config: &GraphConfig, pointer: PointerKind) -> f64 {
        match pointer {
            PointerKind::Mouse => config.tolerance,
            PointerKind::Touch | PointerKind::Pen => config.tolerance.max(TOUCH_TOLERANCE),
        }
    }

    fn connection_constraints(
        &self,
        scope: CellScope<'_>,
        state: &CellState,
        _source: bool,
    ) -> Vec<ConnectionConstraint> {
        if state.is_vertex() && self.is_cell_connectable(scope, state.cell) {
            self.constraints.clone()
        } else {
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dg_core::Geometry;
    use pretty_assertions::assert_eq;

    fn model() -> (GraphModel, CellId, CellId, CellId) {
        let mut m = GraphModel::new();
        let p = m.default_parent();
        let lane = m
            .add_vertex(p, None, None, Geometry::vertex(0.0, 0.0, 100.0, 100.0), "shape=swimlane")
            .unwrap();
        let boxed = m
            .add_vertex(p, None, None, Geometry::vertex(0.0, 0.0, 10.0, 10.0), "container=1;collapsible=0")
            .unwrap();
        let locked = m
            .add_vertex(lane, None, None, Geometry::vertex(0.0, 0.0, 10.0, 10.0), "locked=1")
            .unwrap();
        (m, lane, boxed, locked)
    }

    #[test]
    fn default_policy_reads_style_flags() {
        let (m, lane, _, locked) = model();
        let view = GraphView::default();
        let config = GraphConfig::default();
        let scope = CellScope::new(&m, &view, &config);
        let p = DefaultPolicy;
        assert!(p.is_cell_resizable(scope, lane));
        assert!(!p.is_cell_resizable(scope, locked));
        assert!(!p.is_cell_movable(scope, locked));
        assert!(p.is_cell_foldable(scope, lane));
        assert!(!p.is_label_movable(scope, lane));
    }

    #[test]
    fn editor_policy_folds_containers_only() {
        let (m, lane, boxed, locked) = model();
        let view = GraphView::default();
        let config = GraphConfig::default();
        let scope = CellScope::new(&m, &view, &config);
        let p = EditorPolicy::default();
        assert!(p.is_cell_foldable(scope, lane));
        // container=1 but collapsible=0
        assert!(p.is_container(scope, boxed));
        assert!(!p.is_cell_foldable(scope, boxed));
        assert!(p.is_cell_movable(scope, locked));
        assert_eq!(p.tolerance(&config, PointerKind::Touch), 12.0);
        assert_eq!(p.tolerance(&config, PointerKind::Mouse), 4.0);
    }

    #[test]
    fn dangling_connections_are_blocked_when_disallowed() {
        let (m, lane, _, _) = model();
        let view = GraphView::default();
        let config = GraphConfig {
            allow_dangling_edges: false,
            ..GraphConfig::default()
        };
        let scope = CellScope::new(&m, &view, &config);
        let e = CellId::intern("policy-edge");
        assert_eq!(
            DefaultPolicy.validate_edge(scope, e, Some(lane), None),
            ValidationError::Blocked
        );
        assert!(DefaultPolicy.validate_edge(scope, e, Some(lane), Some(lane)).is_valid());
    }

    #[test]
    fn empty_messages_are_not_surfaced() {
        assert_eq!(ValidationError::Message(String::new()).message(), None);
        assert_eq!(ValidationError::Message("no".into()).message(), Some("no"));
        assert_eq!(ValidationError::Blocked.message(), None);
    }
}
