//! View states: per-cell absolute geometry and resolved style.
//!
//! The view turns model-space geometry into screen space using the
//! current scale and translate. States are rebuilt by [`GraphView::validate`]
//! and read by the renderer and the handlers; handlers may temporarily
//! overwrite a state's bounds for live previews.

use crate::geom::{Bounds, Point, Vec2};
use crate::id::CellId;
use crate::model::{CellKind, GraphModel};
use crate::style::{Style, Stylesheet, keys};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub struct CellState {
    pub cell: CellId,
    pub kind: CellKind,
    /// Resolved style (defaults, named styles, inline overrides).
    pub style: Style,
    /// Absolute screen bounds. For edges, the hull of `absolute_points`.
    pub bounds: Bounds,
    /// Unscaled model-space origin, used to place relative children.
    pub origin: Point,
    /// Routed points of an edge, terminals included.
    pub absolute_points: Vec<Point>,
    /// Scaled label offset. For edges this is the label center.
    pub absolute_offset: Point,
    pub value: Option<String>,
    pub source: Option<CellId>,
    pub target: Option<CellId>,
    pub parent: Option<CellId>,
}

impl CellState {
    pub fn is_edge(&self) -> bool {
        self.kind == CellKind::Edge
    }

    pub fn is_vertex(&self) -> bool {
        self.kind == CellKind::Vertex
    }

    pub fn center(&self) -> Point {
        self.bounds.center()
    }

    pub fn terminal(&self, source: bool) -> Option<CellId> {
        if source { self.source } else { self.target }
    }

    /// Recompute `bounds` from `absolute_points`.
    pub fn update_bounds_from_points(&mut self) {
        if let Some(b) = Bounds::from_points(&self.absolute_points) {
            self.bounds = b;
        }
    }
}

// ─── Graph View ──────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct GraphView {
    pub scale: f64,
    pub translate: Vec2,
    stylesheet: Arc<Stylesheet>,
    states: HashMap<CellId, CellState>,
    order: Vec<CellId>,
    dirty: bool,
}

impl Default for GraphView {
    fn default() -> Self {
        Self::new(Arc::new(Stylesheet::default()))
    }
}

impl GraphView {
    pub fn new(stylesheet: Arc<Stylesheet>) -> Self {
        Self {
            scale: 1.0,
            translate: Vec2::ZERO,
            stylesheet,
            states: HashMap::new(),
            order: Vec::new(),
            dirty: true,
        }
    }

    pub fn stylesheet(&self) -> &Stylesheet {
        &self.stylesheet
    }

    pub fn state(&self, id: CellId) -> Option<&CellState> {
        self.states.get(&id)
    }

    pub fn state_mut(&mut self, id: CellId) -> Option<&mut CellState> {
        self.states.get_mut(&id)
    }

    /// Visible states in paint order.
    pub fn states(&self) -> impl Iterator<Item = &CellState> {
        self.order.iter().filter_map(|id| self.states.get(id))
    }

    /// Topmost state whose bounds contain `p`, optionally skipping one cell.
    pub fn state_at(&self, p: Point, skip: Option<CellId>) -> Option<&CellState> {
        self.order
            .iter()
            .rev()
            .filter(|id| Some(**id) != skip)
            .filter_map(|id| self.states.get(id))
            .find(|s| s.is_vertex() && s.bounds.contains(p))
    }

    /// Screen point → model point relative to `parent`'s origin.
    pub fn to_model(&self, p: Point, parent: Option<CellId>) -> Point {
        let origin = parent
            .and_then(|id| self.states.get(&id))
            .map_or(Point::ZERO, |s| s.origin);
        Point::new(
            p.x / self.scale - self.translate.x - origin.x,
            p.y / self.scale - self.translate.y - origin.y,
        )
    }

    /// Model point relative to `origin` → screen point.
    pub fn to_screen(&self, p: Point, origin: Point) -> Point {
        Point::new(
            (p.x + origin.x + self.translate.x) * self.scale,
            (p.y + origin.y + self.translate.y) * self.scale,
        )
    }

    /// Mark the states stale; the next [`GraphView::revalidate`] rebuilds them.
    pub fn invalidate(&mut self) {
        self.dirty = true;
    }

    pub fn is_valid(&self) -> bool {
        !self.dirty
    }

    /// Rebuild only if something invalidated the view. Returns whether it did.
    pub fn revalidate(&mut self, model: &GraphModel) -> bool {
        if !self.dirty {
            return false;
        }
        self.validate(model);
        true
    }

    /// Rebuild every state from the model.
    pub fn validate(&mut self, model: &GraphModel) {
        self.dirty = false;
        self.states.clear();
        self.order.clear();
        let root = model.root();
        let mut edges = Vec::new();
        self.validate_cell(model, root, Point::ZERO, None, &mut edges);
        for edge in edges {
            self.validate_edge(model, edge);
        }
        log::trace!("view validated: {} state(s)", self.states.len());
    }

    fn validate_cell(
        &mut self,
        model: &GraphModel,
        id: CellId,
        parent_origin: Point,
        parent_state: Option<(CellId, Bounds)>,
        edges: &mut Vec<CellId>,
    ) {
        let Some(cell) = model.get(id) else {
            return;
        };
        if !cell.visible {
            return;
        }
        let mut origin = parent_origin;
        let mut next_parent = parent_state;
        match cell.kind {
            CellKind::Root | CellKind::Layer => {}
            CellKind::Edge => {
                // Placeholder keeps paint order; points are filled in
                // once every vertex has a state.
                self.order.push(id);
                edges.push(id);
            }
            CellKind::Vertex => {
                let Some(geo) = cell.geometry.as_ref() else {
                    return;
                };
                if geo.relative
                    && let Some((_, pb)) = parent_state
                {
                    origin.x += geo.bounds.x * pb.width / self.scale;
                    origin.y += geo.bounds.y * pb.height / self.scale;
                } else {
                    origin.x += geo.bounds.x;
                    origin.y += geo.bounds.y;
                }
                let offset = geo.offset.unwrap_or(Point::ZERO);
                let bounds = Bounds::new(
                    (origin.x + self.translate.x) * self.scale,
                    (origin.y + self.translate.y) * self.scale,
                    geo.bounds.width * self.scale,
                    geo.bounds.height * self.scale,
                );
                let style = self.resolve_style(&cell.style, false);
                self.order.push(id);
                self.states.insert(
                    id,
                    CellState {
                        cell: id,
                        kind: cell.kind,
                        style,
                        bounds,
                        origin,
                        absolute_points: Vec::new(),
                        absolute_offset: Point::new(offset.x * self.scale, offset.y * self.scale),
                        value: cell.value.clone(),
                        source: None,
                        target: None,
                        parent: parent_state.map(|(p, _)| p),
                    },
                );
                next_parent = Some((id, bounds));
                if cell.collapsed {
                    return;
                }
            }
        }
        let child_origin = if cell.kind == CellKind::Vertex {
            origin
        } else {
            parent_origin
        };
        for child in model.children(id) {
            self.validate_cell(model, child, child_origin, next_parent, edges);
        }
    }

    fn resolve_style(&self, style: &Style, is_edge: bool) -> Style {
        self.stylesheet.resolve(style, is_edge).unwrap_or_else(|e| {
            log::warn!("{e}; falling back to inline style");
            let mut out = if is_edge {
                self.stylesheet.default_edge.clone()
            } else {
                self.stylesheet.default_vertex.clone()
            };
            out.merge(style);
            out
        })
    }

    /// Compute routed points for one edge from its terminals and control
    /// points. Edges with an unresolvable end get no state.
    pub fn validate_edge(&mut self, model: &GraphModel, id: CellId) {
        let Some(cell) = model.get(id) else {
            return;
        };
        let geo = cell.geometry.clone().unwrap_or_default();
        let parent = model.parent(id);
        let origin = parent
            .and_then(|p| self.states.get(&p))
            .map_or(Point::ZERO, |s| s.origin);

        let mut points: Vec<Point> = geo
            .points
            .iter()
            .map(|p| self.to_screen(*p, origin))
            .collect();

        let source_bounds = cell.source.and_then(|t| self.states.get(&t)).map(|s| s.bounds);
        let target_bounds = cell.target.and_then(|t| self.states.get(&t)).map(|s| s.bounds);

        let fixed_source = geo.source_point.map(|p| self.to_screen(p, origin));
        let fixed_target = geo.target_point.map(|p| self.to_screen(p, origin));

        let source_hint = points
            .first()
            .copied()
            .or(target_bounds.map(|b| b.center()))
            .or(fixed_target);
        let target_hint = points
            .last()
            .copied()
            .or(source_bounds.map(|b| b.center()))
            .or(fixed_source);

        let style = self.resolve_style(&cell.style, true);
        let start = match (source_bounds, fixed_source) {
            (Some(b), _) => Some(
                constrained_point(&b, &style, true)
                    .unwrap_or_else(|| perimeter_point(&b, source_hint)),
            ),
            (None, p) => p,
        };
        let end = match (target_bounds, fixed_target) {
            (Some(b), _) => Some(
                constrained_point(&b, &style, false)
                    .unwrap_or_else(|| perimeter_point(&b, target_hint)),
            ),
            (None, p) => p,
        };
        let (Some(start), Some(end)) = (start, end) else {
            log::debug!("edge {id} has a dangling end without a terminal point");
            self.order.retain(|c| *c != id);
            return;
        };
        points.insert(0, start);
        points.push(end);

        let label = route_midpoint(&points);
        let offset = geo.offset.unwrap_or(Point::ZERO);
        let bounds = Bounds::from_points(&points).unwrap_or_default();
        self.states.insert(
            id,
            CellState {
                cell: id,
                kind: CellKind::Edge,
                style,
                bounds,
                origin,
                absolute_points: points,
                absolute_offset: Point::new(
                    label.x + offset.x * self.scale,
                    label.y + offset.y * self.scale,
                ),
                value: cell.value.clone(),
                source: cell.source,
                target: cell.target,
                parent,
            },
        );
    }
}

/// Fixed connection point stored in an edge style (`exitX`/`exitY` for
/// the source, `entryX`/`entryY` for the target) as fractions of `b`.
pub fn constrained_point(b: &Bounds, style: &Style, source: bool) -> Option<Point> {
    let (kx, ky) = if source {
        (keys::EXIT_X, keys::EXIT_Y)
    } else {
        (keys::ENTRY_X, keys::ENTRY_Y)
    };
    let fx = style.get(kx)?.parse::<f64>().ok()?;
    let fy = style.get(ky)?.parse::<f64>().ok()?;
    Some(Point::new(b.x + fx * b.width, b.y + fy * b.height))
}

/// Point where the ray from the center of `b` toward `next` leaves the
/// rectangle. The center itself if there is no direction.
pub fn perimeter_point(b: &Bounds, next: Option<Point>) -> Point {
    let c = b.center();
    let Some(next) = next else {
        return c;
    };
    let d = next - c;
    if d.x == 0.0 && d.y == 0.0 {
        return c;
    }
    let hw = b.width / 2.0;
    let hh = b.height / 2.0;
    let tx = if d.x != 0.0 { hw / d.x.abs() } else { f64::INFINITY };
    let ty = if d.y != 0.0 { hh / d.y.abs() } else { f64::INFINITY };
    let t = tx.min(ty);
    c + d * t
}

/// Point halfway along the polyline length.
pub fn route_midpoint(points: &[Point]) -> Point {
    let total: f64 = points.windows(2).map(|w| (w[1] - w[0]).hypot()).sum();
    if total == 0.0 {
        return points.first().copied().unwrap_or(Point::ZERO);
    }
    let mut remaining = total / 2.0;
    for w in points.windows(2) {
        let len = (w[1] - w[0]).hypot();
        if remaining <= len {
            return w[0] + (w[1] - w[0]) * (remaining / len);
        }
        remaining -= len;
    }
    points.last().copied().unwrap_or(Point::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Geometry;
    use pretty_assertions::assert_eq;

    #[test]
    fn vertex_state_is_scaled_and_translated() {
        let mut model = GraphModel::new();
        let v = model
            .add_vertex(model.default_parent(), None, None, Geometry::vertex(20.0, 20.0, 80.0, 40.0), "")
            .unwrap();
        let mut view = GraphView::default();
        view.scale = 2.0;
        view.translate = Vec2::new(5.0, 0.0);
        view.validate(&model);
        let s = view.state(v).unwrap();
        assert_eq!(s.bounds, Bounds::new(50.0, 40.0, 160.0, 80.0));
        assert_eq!(s.style.get("shape"), Some("rectangle"));
    }

    #[test]
    fn children_are_offset_by_parent_origin() {
        let mut model = GraphModel::new();
        let p = model
            .add_vertex(model.default_parent(), None, None, Geometry::vertex(100.0, 100.0, 200.0, 200.0), "")
            .unwrap();
        let c = model
            .add_vertex(p, None, None, Geometry::vertex(10.0, 10.0, 20.0, 20.0), "")
            .unwrap();
        let mut view = GraphView::default();
        view.validate(&model);
        assert_eq!(view.state(c).unwrap().bounds, Bounds::new(110.0, 110.0, 20.0, 20.0));
        assert_eq!(view.to_model(Point::new(130.0, 130.0), Some(p)), Point::new(30.0, 30.0));
    }

    #[test]
    fn edge_points_start_on_perimeters() {
        let mut model = GraphModel::new();
        let parent = model.default_parent();
        let a = model
            .add_vertex(parent, None, None, Geometry::vertex(0.0, 0.0, 40.0, 40.0), "")
            .unwrap();
        let b = model
            .add_vertex(parent, None, None, Geometry::vertex(200.0, 0.0, 40.0, 40.0), "")
            .unwrap();
        let e = model.add_edge(parent, None, None, Some(a), Some(b), "").unwrap();
        let mut view = GraphView::default();
        view.validate(&model);
        let s = view.state(e).unwrap();
        assert_eq!(s.absolute_points, vec![Point::new(40.0, 20.0), Point::new(200.0, 20.0)]);
        assert_eq!(s.absolute_offset, Point::new(120.0, 20.0));
    }

    #[test]
    fn exit_constraint_pins_the_source_end() {
        let mut model = GraphModel::new();
        let parent = model.default_parent();
        let a = model
            .add_vertex(parent, None, None, Geometry::vertex(0.0, 0.0, 40.0, 40.0), "")
            .unwrap();
        let b = model
            .add_vertex(parent, None, None, Geometry::vertex(200.0, 0.0, 40.0, 40.0), "")
            .unwrap();
        let e = model
            .add_edge(parent, None, None, Some(a), Some(b), "exitX=0.5;exitY=1")
            .unwrap();
        let mut view = GraphView::default();
        view.validate(&model);
        let s = view.state(e).unwrap();
        assert_eq!(s.absolute_points[0], Point::new(20.0, 40.0));
    }

    #[test]
    fn fully_dangling_edge_has_no_state() {
        let mut model = GraphModel::new();
        let e = model
            .add_edge(model.default_parent(), None, None, None, None, "")
            .unwrap();
        let mut view = GraphView::default();
        view.validate(&model);
        assert!(view.state(e).is_none());
        assert_eq!(view.states().count(), 0);
    }
}
