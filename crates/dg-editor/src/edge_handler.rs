//! Waypoint, terminal, and label handles for one selected edge.
//!
//! Dragging an end reconnects the edge: a [`CellMarker`] highlights the
//! terminal under the pointer and a [`ConstraintHandler`] offers its
//! fixed connection points. Dragging a waypoint moves it; shift-click
//! adds or removes waypoints when enabled. Nothing reaches the model
//! until the pointer is released.

use crate::constraint::{ConnectionConstraint, ConstraintHandler};
use crate::graph::{Graph, connect_terminal};
use crate::handle::{EdgeHandle, PreviewLayer, color, handle_bounds, hit};
use crate::hint::CoordinateHint;
use crate::input::GraphMouseEvent;
use crate::marker::CellMarker;
use crate::policy::{CellScope, GraphHandlerPolicy, ValidationError};
use dg_core::config::HandleConfig;
use dg_core::view::{perimeter_point, route_midpoint};
use dg_core::{CellId, CellState, ModelError, Point};
use dg_render::export::label_text;
use dg_render::shape::{Painter, Shape, ShapeKind};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub enum EdgeGesture {
    Idle,
    Armed {
        handle: EdgeHandle,
        start: Point,
    },
    DraggingLabel {
        start: Point,
        label: Point,
    },
    DraggingTerminal {
        source: bool,
        start: Point,
        /// Terminal the end would attach to.
        terminal: Option<CellId>,
        constraint: Option<ConnectionConstraint>,
        error: ValidationError,
    },
    DraggingPoint {
        index: usize,
        start: Point,
        /// Waypoints in model coordinates with the dragged one replaced.
        points: Vec<Point>,
    },
}

/// What a released gesture committed.
#[derive(Debug, Clone, PartialEq)]
pub enum EdgeChange {
    /// New label offset in model units.
    LabelMoved(Point),
    /// The edge (or its clone) was attached to a terminal.
    Connected(CellId),
    /// A dangling end moved to this model point.
    TerminalMoved(Point),
    PointsChanged(Vec<Point>),
    /// Validation refused the connection with a message.
    Rejected(String),
    /// Validation refused the connection silently.
    Blocked,
    Unchanged,
}

#[derive(Debug)]
pub struct EdgeHandler {
    cell: CellId,
    /// Screen points of the route, terminals included.
    abspoints: Vec<Point>,
    gesture: EdgeGesture,
    preview: Option<Shape>,
    /// One slot per route point; interior slots are empty when the edge
    /// is not bendable.
    bends: Vec<Option<Shape>>,
    /// `abspoints[1]` is a midway handle with no waypoint behind it.
    virtual_bend: bool,
    label_handle: Option<Shape>,
    label_visible: bool,
    marker: Option<CellMarker>,
    constraint_handler: Option<ConstraintHandler>,
    hint: CoordinateHint,
}

/// Fill for the handle at `index` of a route with `last` as its final
/// index. Connected ends that may be detached get the connect color;
/// ends that must stay put are locked.
fn fill_for(
    scope: CellScope<'_>,
    policy: &dyn GraphHandlerPolicy,
    hc: &HandleConfig,
    edge: CellId,
    index: usize,
    last: usize,
) -> String {
    if index != 0 && index != last {
        return hc.handle_fill_color.clone();
    }
    let source = index == 0;
    match scope.model.terminal(edge, source) {
        Some(t) if !policy.is_cell_disconnectable(scope, edge, t, source) => hc.locked_handle_fill_color.clone(),
        None if !policy.is_terminal_point_movable(scope, edge, source) => hc.locked_handle_fill_color.clone(),
        Some(_) => hc.connect_handle_fill_color.clone(),
        None => hc.handle_fill_color.clone(),
    }
}

/// Route points that get handles. A bendable edge without waypoints
/// gets a virtual bend midway between its ends.
fn handle_points(graph: &Graph, state: &CellState, bendable: bool) -> (Vec<Point>, bool) {
    let mut points = state.absolute_points.clone();
    let no_waypoints = graph
        .model
        .geometry(state.cell)
        .is_none_or(|g| g.points.is_empty());
    if let [p0, pe] = points[..]
        && bendable
        && no_waypoints
        && graph.config().edges.virtual_bend
    {
        points.insert(1, Point::new(p0.x + (pe.x - p0.x) / 2.0, p0.y + (pe.y - p0.y) / 2.0));
        return (points, true);
    }
    (points, false)
}

fn paint_route(layer: &mut PreviewLayer<'_>, preview: &mut Option<Shape>, points: &[Point], stroke: &str) {
    if let Some(shape) = preview {
        shape.points = points.to_vec();
        shape.stroke = color(stroke);
        layer.repaint(shape);
    }
}

impl EdgeHandler {
    /// Handles for `edge`, or `None` if it has no edge state.
    pub fn new(graph: &mut Graph, edge: CellId) -> Option<Self> {
        let state = graph.view.state(edge).filter(|s| s.is_edge())?.clone();
        let hc = graph.config().handles.clone();
        let ec = graph.config().edges.clone();
        let scope = graph.scope();
        let policy = graph.policy();
        let bendable = policy.is_cell_bendable(scope, edge);
        let (abspoints, virtual_bend) = handle_points(graph, &state, bendable);
        let last = abspoints.len().saturating_sub(1);
        let label_visible = label_text(&state).is_some() && policy.is_label_movable(scope, edge);
        let fills: Vec<Option<String>> = (0..abspoints.len())
            .map(|i| {
                let terminal = i == 0 || i == last;
                (terminal || bendable).then(|| fill_for(scope, policy, &hc, edge, i, last))
            })
            .collect();

        let mut parts = graph.parts();
        let mut preview = Shape::new(Painter::Builtin(ShapeKind::Polyline), Arc::clone(parts.layer.defaults))
            .with_points(abspoints.clone());
        preview.stroke = color(&ec.selection_color);
        preview.stroke_width = ec.selection_stroke_width;
        preview.dashed = ec.selection_dashed;
        preview.pointer_events = false;
        parts.layer.show(&mut preview);

        let mut bends: Vec<Option<Shape>> = abspoints
            .iter()
            .zip(fills)
            .map(|(p, fill)| {
                fill.map(|f| {
                    parts.layer.rectangle(
                        handle_bounds(*p, hc.handle_size),
                        color(&f),
                        color(&hc.handle_stroke_color),
                    )
                })
            })
            .collect();

        let mut label = parts.layer.rectangle(
            handle_bounds(state.absolute_offset, hc.label_handle_size),
            color(&hc.label_handle_fill_color),
            color(&hc.handle_stroke_color),
        );
        label.visible = label_visible;
        parts.layer.repaint(&mut label);

        // A virtual bend under the label handle is drawn slightly larger.
        if virtual_bend
            && label_visible
            && let Some(Some(bend)) = bends.get_mut(1)
            && bend.bounds.intersects(&label.bounds)
        {
            bend.bounds = handle_bounds(bend.bounds.center(), bend.bounds.width + 3.0);
            parts.layer.repaint(bend);
        }

        log::debug!("edge handler for {edge} with {} points", abspoints.len());
        Some(Self {
            cell: edge,
            abspoints,
            gesture: EdgeGesture::Idle,
            preview: Some(preview),
            bends,
            virtual_bend,
            label_handle: Some(label),
            label_visible,
            marker: Some(CellMarker::new(ec.valid_color, ec.invalid_color)),
            constraint_handler: Some(ConstraintHandler::new()),
            hint: CoordinateHint::new(),
        })
    }

    pub fn cell(&self) -> CellId {
        self.cell
    }

    pub fn gesture(&self) -> &EdgeGesture {
        &self.gesture
    }

    pub fn is_idle(&self) -> bool {
        self.gesture == EdgeGesture::Idle
    }

    /// Route as currently previewed, in screen coordinates.
    pub fn abspoints(&self) -> &[Point] {
        &self.abspoints
    }

    pub fn hint(&self) -> &CoordinateHint {
        &self.hint
    }

    pub fn marker(&self) -> Option<&CellMarker> {
        self.marker.as_ref()
    }

    pub fn constraint_handler(&self) -> Option<&ConstraintHandler> {
        self.constraint_handler.as_ref()
    }

    /// Painted route preview.
    pub fn preview(&self) -> Option<&Shape> {
        self.preview.as_ref()
    }

    pub fn bend(&self, index: usize) -> Option<&Shape> {
        self.bends.get(index).and_then(Option::as_ref)
    }

    pub fn is_label_visible(&self) -> bool {
        self.label_visible
    }

    /// Whether the interior handle stands in for a missing waypoint.
    pub fn has_virtual_bend(&self) -> bool {
        self.virtual_bend
    }

    fn last_index(&self) -> usize {
        self.abspoints.len().saturating_sub(1)
    }

    fn is_terminal_index(&self, index: usize) -> bool {
        index == 0 || index == self.last_index()
    }

    /// Fill color for the handle at `index`.
    pub fn handle_fill_color(&self, graph: &Graph, index: usize) -> String {
        fill_for(
            graph.scope(),
            graph.policy(),
            &graph.config().handles,
            self.cell,
            index,
            self.last_index(),
        )
    }

    /// Handle under `p`. Among several bends the nearest center wins;
    /// the label handle only when no bend is hit.
    pub fn handle_at(&self, p: Point, tolerance: f64) -> Option<EdgeHandle> {
        let bend = self
            .bends
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.as_ref().map(|s| (i, s)))
            .filter(|(_, s)| hit(&s.bounds, p, tolerance))
            .map(|(i, s)| {
                let c = s.bounds.center();
                (i, (c.x - p.x).powi(2) + (c.y - p.y).powi(2))
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(i, _)| EdgeHandle::Point(i));
        bend.or_else(|| {
            self.label_handle
                .as_ref()
                .filter(|s| self.label_visible && hit(&s.bounds, p, tolerance))
                .map(|_| EdgeHandle::Label)
        })
    }

    // ─── Events ─────────────────────────────────────────────────────────

    pub fn mouse_down(&mut self, graph: &mut Graph, me: &mut GraphMouseEvent) {
        if me.is_consumed() {
            return;
        }
        let tolerance = if me.is_touch_or_pen() {
            graph.tolerance(me.pointer)
        } else {
            0.0
        };
        let ec = graph.config().edges.clone();
        match self.handle_at(me.point, tolerance) {
            Some(EdgeHandle::Point(index)) if ec.remove_enabled && me.modifiers.shift => {
                if let Err(e) = self.remove_point(graph, index) {
                    log::warn!("removing waypoint {index} failed: {e}");
                }
                me.consume();
            }
            Some(handle) => {
                let movable =
                    handle != EdgeHandle::Label || graph.policy().is_label_movable(graph.scope(), self.cell);
                if movable {
                    self.start(graph, me.point, handle);
                }
                me.consume();
            }
            None if ec.add_enabled && me.modifiers.shift && me.cell == Some(self.cell) => {
                let grid = graph.is_grid_enabled(me);
                if let Err(e) = self.add_point(graph, me.point, grid) {
                    log::warn!("adding waypoint failed: {e}");
                }
                me.consume();
            }
            None => {}
        }
    }

    /// Arm `handle` with the press at `p`. Ends arm only if they may be
    /// detached, or moved when dangling. Returns whether it armed.
    pub fn start(&mut self, graph: &mut Graph, p: Point, handle: EdgeHandle) -> bool {
        let allowed = match handle {
            EdgeHandle::Point(i) if self.is_terminal_index(i) => {
                let source = i == 0;
                let scope = graph.scope();
                let policy = graph.policy();
                match graph.model.terminal(self.cell, source) {
                    Some(t) => policy.is_cell_disconnectable(scope, self.cell, t, source),
                    None => policy.is_terminal_point_movable(scope, self.cell, source),
                }
            }
            _ => true,
        };
        if allowed {
            self.gesture = EdgeGesture::Armed { handle, start: p };
            log::debug!("armed {handle:?} on {}", self.cell);
        }
        allowed
    }

    fn active_handle(&self) -> Option<(EdgeHandle, Point)> {
        match &self.gesture {
            EdgeGesture::Idle => None,
            EdgeGesture::Armed { handle, start } => Some((*handle, *start)),
            EdgeGesture::DraggingLabel { start, .. } => Some((EdgeHandle::Label, *start)),
            EdgeGesture::DraggingTerminal { source, start, .. } => {
                let index = if *source { 0 } else { self.last_index() };
                Some((EdgeHandle::Point(index), *start))
            }
            EdgeGesture::DraggingPoint { index, start, .. } => Some((EdgeHandle::Point(*index), *start)),
        }
    }

    /// Pointer position for the active handle: pulled onto terminal and
    /// bend centers within half a grid cell when snapping to terminals
    /// (the first candidate in range wins each axis), then onto the grid
    /// on each axis that was not pulled.
    pub fn point_for_event(&self, graph: &Graph, me: &GraphMouseEvent) -> Point {
        let view = &graph.view;
        let scale = view.scale;
        let tr = view.translate;
        let cfg = graph.config();
        let mut p = me.point;
        let (mut snapped_x, mut snapped_y) = (false, false);

        let tt = cfg.graph.grid_size * scale / 2.0;
        if cfg.edges.snap_to_terminals && tt > 0.0 {
            let index = match self.active_handle() {
                Some((EdgeHandle::Point(i), _)) => Some(i),
                _ => None,
            };
            let terminals = [true, false]
                .into_iter()
                .filter_map(|source| graph.model.terminal(self.cell, source))
                .filter_map(|t| view.state(t))
                .map(|s| s.center());
            let bends = self
                .bends
                .iter()
                .enumerate()
                .filter(|(i, b)| Some(*i) != index && b.is_some())
                .filter_map(|(i, _)| self.abspoints.get(i).copied());
            for c in terminals.chain(bends) {
                if !snapped_x && (c.x - me.point.x).abs() < tt {
                    p.x = c.x;
                    snapped_x = true;
                }
                if !snapped_y && (c.y - me.point.y).abs() < tt {
                    p.y = c.y;
                    snapped_y = true;
                }
            }
        }

        if graph.is_grid_enabled(me) {
            if !snapped_x {
                p.x = (graph.snap(p.x / scale - tr.x) + tr.x) * scale;
            }
            if !snapped_y {
                p.y = (graph.snap(p.y / scale - tr.y) + tr.y) * scale;
            }
        }
        p
    }

    /// Screen point to a rounded model point relative to the edge's
    /// parent, optionally snapped first.
    pub fn convert_point(&self, graph: &Graph, p: Point, grid: bool) -> Point {
        let p = if grid {
            Point::new(graph.snap(p.x), graph.snap(p.y))
        } else {
            p
        };
        let q = graph.view.to_model(p, graph.model.parent(self.cell));
        Point::new(q.x.round(), q.y.round())
    }

    /// Model waypoints with the one behind handle `index` moved to the
    /// screen point `p`. An edge without waypoints gets `p` as its first.
    pub fn preview_points(&self, graph: &Graph, p: Point, index: usize) -> Vec<Point> {
        let pt = self.convert_point(graph, p, false);
        let mut points = graph
            .model
            .geometry(self.cell)
            .map(|g| g.points.clone())
            .unwrap_or_default();
        if points.is_empty() {
            return vec![pt];
        }
        if let Some(slot) = index.checked_sub(1).and_then(|i| points.get_mut(i)) {
            *slot = pt;
        }
        points
    }

    pub fn mouse_move(&mut self, graph: &mut Graph, me: &mut GraphMouseEvent) {
        if me.is_consumed() {
            return;
        }
        let Some((handle, start)) = self.active_handle() else {
            if self.handle_at(me.point, 0.0).is_some() {
                me.consume();
            }
            return;
        };
        if matches!(self.gesture, EdgeGesture::Armed { .. }) && me.is_touch_or_pen() {
            let tol = graph.tolerance(me.pointer);
            if (me.point.x - start.x).abs() < tol && (me.point.y - start.y).abs() < tol {
                me.consume();
                return;
            }
        }

        let point = self.point_for_event(graph, me);
        match handle {
            EdgeHandle::Label => self.drag_label(graph, start, point),
            EdgeHandle::Point(i) if self.is_terminal_index(i) => self.drag_terminal(graph, me, start, i == 0, point),
            EdgeHandle::Point(i) => self.drag_point(graph, start, i, point),
        }
        log::trace!("edge drag {:?}", self.gesture);
        me.consume();
    }

    fn drag_label(&mut self, graph: &mut Graph, start: Point, label: Point) {
        self.gesture = EdgeGesture::DraggingLabel { start, label };
        let mut parts = graph.parts();
        if let Some(shape) = &mut self.label_handle {
            shape.bounds = handle_bounds(label, shape.bounds.width);
            parts.layer.repaint(shape);
        }
    }

    fn drag_point(&mut self, graph: &mut Graph, start: Point, index: usize, point: Point) {
        let points = self.preview_points(graph, point, index);
        let model_point = self.convert_point(graph, point, false);
        if let Some(p) = self.abspoints.get_mut(index) {
            *p = point;
        }
        self.gesture = EdgeGesture::DraggingPoint { index, start, points };
        let stroke = graph.config().edges.selection_color.clone();
        let mut parts = graph.parts();
        paint_route(&mut parts.layer, &mut self.preview, &self.abspoints, &stroke);
        if let Some(Some(bend)) = self.bends.get_mut(index) {
            bend.bounds = handle_bounds(point, bend.bounds.width);
            parts.layer.repaint(bend);
        }
        let text = format!("{}, {}", model_point.x, model_point.y);
        self.hint.show(&mut parts.layer, parts.clock, text, point);
    }

    fn drag_terminal(&mut self, graph: &mut Graph, me: &GraphMouseEvent, start: Point, source: bool, point: Point) {
        let edge = self.cell;
        let tolerance = graph.tolerance(me.pointer);
        let allow_dangling = graph.config().graph.allow_dangling_edges;
        let (valid_color, invalid_color) = {
            let ec = &graph.config().edges;
            (ec.valid_color.clone(), ec.invalid_color.clone())
        };
        let index = if source { 0 } else { self.last_index() };
        let neighbor = if source {
            self.abspoints.get(1)
        } else {
            index.checked_sub(1).and_then(|i| self.abspoints.get(i))
        }
        .copied();

        let hover = me
            .cell
            .filter(|c| *c != edge)
            .and_then(|c| graph.view.state(c))
            .filter(|s| s.is_vertex())
            .or_else(|| graph.view.state_at(point, Some(edge)))
            .map(|s| s.cell);
        let mut probe = me.clone();
        probe.point = point;
        probe.cell = hover;

        let mut parts = graph.parts();
        let (Some(ch), Some(marker)) = (self.constraint_handler.as_mut(), self.marker.as_mut()) else {
            return;
        };
        ch.update(parts.scope, parts.policy, &mut parts.layer, &probe, source, tolerance);
        let focus = ch.current_focus().filter(|_| ch.has_focus());
        let candidate = hover.or(focus);
        let other = parts.scope.model.terminal(edge, !source);
        let error = match candidate {
            Some(c) => {
                let (s, t) = if source { (Some(c), other) } else { (other, Some(c)) };
                parts.policy.validate_edge(parts.scope, edge, s, t)
            }
            None if allow_dangling => ValidationError::None,
            None => ValidationError::Blocked,
        };
        let hover_state = hover.and_then(|c| parts.scope.view.state(c));
        marker.process(&mut parts.layer, hover_state, error.is_valid());
        if ch.has_focus() {
            marker.reset(&mut parts.layer);
        }
        let terminal = focus.or_else(|| marker.valid_state());
        let constraint = if ch.has_focus() { ch.current_constraint() } else { None };

        let end = match terminal.and_then(|t| parts.scope.view.state(t)) {
            Some(ts) => ch
                .current_point()
                .filter(|_| ch.has_focus())
                .unwrap_or_else(|| perimeter_point(&ts.bounds, neighbor)),
            None => point,
        };
        if let Some(p) = self.abspoints.get_mut(index) {
            *p = end;
        }
        let stroke = if error.is_valid() { valid_color } else { invalid_color };
        paint_route(&mut parts.layer, &mut self.preview, &self.abspoints, &stroke);
        if let Some(Some(bend)) = self.bends.get_mut(index) {
            bend.bounds = handle_bounds(end, bend.bounds.width);
            parts.layer.repaint(bend);
        }

        self.gesture = EdgeGesture::DraggingTerminal {
            source,
            start,
            terminal,
            constraint,
            error,
        };
    }

    /// Commit the gesture. A release where the press happened, or one
    /// that never left the armed state, changes nothing.
    pub fn mouse_up(&mut self, graph: &mut Graph, me: &mut GraphMouseEvent) -> Result<EdgeChange, ModelError> {
        if me.is_consumed() {
            return Ok(EdgeChange::Unchanged);
        }
        let Some((_, start)) = self.active_handle() else {
            return Ok(EdgeChange::Unchanged);
        };
        let gesture = self.gesture.clone();
        let result = if me.point == start {
            Ok(EdgeChange::Unchanged)
        } else {
            self.commit(graph, me, gesture)
        };
        self.reset(graph);
        me.consume();
        result
    }

    fn commit(
        &mut self,
        graph: &mut Graph,
        me: &GraphMouseEvent,
        gesture: EdgeGesture,
    ) -> Result<EdgeChange, ModelError> {
        match gesture {
            EdgeGesture::DraggingTerminal { error, .. } if !error.is_valid() => match error.message() {
                Some(m) => {
                    let m = m.to_string();
                    graph.alert(m.clone());
                    Ok(EdgeChange::Rejected(m))
                }
                None => Ok(EdgeChange::Blocked),
            },
            EdgeGesture::DraggingLabel { label, .. } => Ok(EdgeChange::LabelMoved(self.move_label(graph, label)?)),
            EdgeGesture::DraggingTerminal {
                source,
                terminal: Some(t),
                constraint,
                ..
            } => {
                let clone = me.modifiers.is_clone() && graph.config().edges.clone_enabled;
                let edge = self.connect(graph, t, source, clone, constraint)?;
                Ok(EdgeChange::Connected(edge))
            }
            EdgeGesture::DraggingTerminal { source, .. } if graph.config().graph.allow_dangling_edges => {
                let index = if source { 0 } else { self.last_index() };
                let Some(end) = self.abspoints.get(index).copied() else {
                    return Ok(EdgeChange::Unchanged);
                };
                let p = self.change_terminal_point(graph, end, source)?;
                Ok(EdgeChange::TerminalMoved(p))
            }
            EdgeGesture::DraggingPoint { points, .. } => {
                self.change_points(graph, points.clone())?;
                Ok(EdgeChange::PointsChanged(points))
            }
            EdgeGesture::DraggingTerminal { .. } | EdgeGesture::Idle | EdgeGesture::Armed { .. } => {
                Ok(EdgeChange::Unchanged)
            }
        }
    }

    // ─── Model changes ──────────────────────────────────────────────────

    /// Move the label to screen point `label`. Returns the stored offset.
    pub fn move_label(&mut self, graph: &mut Graph, label: Point) -> Result<Point, ModelError> {
        let Some(state) = graph.view.state(self.cell) else {
            return Ok(Point::ZERO);
        };
        let mid = route_midpoint(&state.absolute_points);
        let scale = graph.view.scale;
        let offset = Point::new(
            ((label.x - mid.x) / scale).round(),
            ((label.y - mid.y) / scale).round(),
        );
        {
            let mut model = graph.model.begin_update();
            if let Some(mut geo) = model.geometry(self.cell).cloned() {
                geo.offset = Some(offset);
                model.set_geometry(self.cell, geo)?;
            }
        }
        graph.refresh();
        Ok(offset)
    }

    /// Attach one end to `terminal` in a single update. With `clone`, a
    /// copy is attached instead and keeps the other end's terminal.
    /// Returns the edge that was connected.
    pub fn connect(
        &mut self,
        graph: &mut Graph,
        terminal: CellId,
        source: bool,
        clone: bool,
        constraint: Option<ConnectionConstraint>,
    ) -> Result<CellId, ModelError> {
        let constraint = constraint.unwrap_or_else(ConnectionConstraint::floating);
        let mut edge = self.cell;
        {
            let mut model = graph.model.begin_update();
            if clone {
                let parent = model.parent(edge).unwrap_or_else(|| model.default_parent());
                let other = model.terminal(edge, !source);
                let copy = model.clone_cell(edge)?;
                edge = model.add_cell(parent, copy, None)?;
                connect_terminal(&mut model, edge, other, !source, None)?;
            }
            connect_terminal(&mut model, edge, Some(terminal), source, Some(constraint))?;
        }
        log::debug!("connected {edge} to {terminal}");
        graph.refresh();
        Ok(edge)
    }

    /// Detach one end and pin it at screen point `p`. Returns the model
    /// point stored in the geometry.
    pub fn change_terminal_point(&mut self, graph: &mut Graph, p: Point, source: bool) -> Result<Point, ModelError> {
        let pt = graph.view.to_model(p, graph.model.parent(self.cell));
        {
            let mut model = graph.model.begin_update();
            if let Some(mut geo) = model.geometry(self.cell).cloned() {
                geo.set_terminal_point(Some(pt), source);
                model.set_geometry(self.cell, geo)?;
            }
            connect_terminal(
                &mut model,
                self.cell,
                None,
                source,
                Some(ConnectionConstraint::floating()),
            )?;
        }
        graph.refresh();
        Ok(pt)
    }

    pub fn change_points(&mut self, graph: &mut Graph, points: Vec<Point>) -> Result<(), ModelError> {
        {
            let mut model = graph.model.begin_update();
            if let Some(mut geo) = model.geometry(self.cell).cloned() {
                geo.points = points;
                model.set_geometry(self.cell, geo)?;
            }
        }
        graph.refresh();
        Ok(())
    }

    /// Insert a waypoint at screen point `p` on the nearest segment and
    /// rebuild the handles.
    pub fn add_point(&mut self, graph: &mut Graph, p: Point, grid: bool) -> Result<(), ModelError> {
        let Some(state) = graph.view.state(self.cell) else {
            return Ok(());
        };
        let index = dg_core::geom::nearest_segment(&state.absolute_points, p);
        let pt = self.convert_point(graph, p, grid);
        let Some(mut geo) = graph.model.geometry(self.cell).cloned() else {
            return Ok(());
        };
        let at = index.min(geo.points.len());
        geo.points.insert(at, pt);
        {
            let mut model = graph.model.begin_update();
            model.set_geometry(self.cell, geo)?;
        }
        graph.refresh();
        self.rebuild(graph);
        Ok(())
    }

    /// Drop the waypoint behind handle `index`. Ends are never removed.
    pub fn remove_point(&mut self, graph: &mut Graph, index: usize) -> Result<(), ModelError> {
        if index == 0 || index >= self.last_index() {
            return Ok(());
        }
        let Some(mut geo) = graph.model.geometry(self.cell).cloned() else {
            return Ok(());
        };
        if index - 1 >= geo.points.len() {
            return Ok(());
        }
        geo.points.remove(index - 1);
        {
            let mut model = graph.model.begin_update();
            model.set_geometry(self.cell, geo)?;
        }
        graph.refresh();
        self.rebuild(graph);
        Ok(())
    }

    /// Replace every shape after the route changed its point count.
    fn rebuild(&mut self, graph: &mut Graph) {
        self.destroy(graph);
        if let Some(fresh) = Self::new(graph, self.cell) {
            *self = fresh;
        }
    }

    // ─── Lifecycle ──────────────────────────────────────────────────────

    /// Back to idle: forget the drag and show the real route again.
    pub fn reset(&mut self, graph: &mut Graph) {
        self.gesture = EdgeGesture::Idle;
        {
            let mut parts = graph.parts();
            if let Some(m) = &mut self.marker {
                m.reset(&mut parts.layer);
            }
            if let Some(ch) = &mut self.constraint_handler {
                ch.reset(&mut parts.layer);
            }
            self.hint.hide(&mut parts.layer);
        }
        self.redraw(graph);
        log::debug!("edge handler reset");
    }

    /// Move the route preview and handles onto the current state.
    pub fn redraw(&mut self, graph: &mut Graph) {
        let Some(state) = graph.view.state(self.cell).cloned() else {
            return;
        };
        let bendable = graph.policy().is_cell_bendable(graph.scope(), self.cell);
        let (abspoints, virtual_bend) = handle_points(graph, &state, bendable);
        if abspoints.len() != self.bends.len() {
            self.rebuild(graph);
            return;
        }
        self.abspoints = abspoints;
        self.virtual_bend = virtual_bend;
        let stroke = graph.config().edges.selection_color.clone();
        let fills: Vec<String> = (0..self.abspoints.len())
            .map(|i| self.handle_fill_color(graph, i))
            .collect();
        let mut parts = graph.parts();
        paint_route(&mut parts.layer, &mut self.preview, &self.abspoints, &stroke);
        for ((bend, p), fill) in self.bends.iter_mut().zip(&self.abspoints).zip(fills) {
            if let Some(b) = bend {
                b.bounds = handle_bounds(*p, b.bounds.width);
                b.fill = color(&fill);
                parts.layer.repaint(b);
            }
        }
        if let Some(label) = &mut self.label_handle {
            label.bounds = handle_bounds(state.absolute_offset, label.bounds.width);
            label.visible = self.label_visible;
            parts.layer.repaint(label);
        }
    }

    /// Hide the hint once its delay elapsed.
    pub fn poll_hint(&mut self, graph: &mut Graph) -> bool {
        let mut parts = graph.parts();
        self.hint.poll(&mut parts.layer, parts.clock)
    }

    /// Release every shape and helper. Safe mid-gesture and twice.
    pub fn destroy(&mut self, graph: &mut Graph) {
        self.gesture = EdgeGesture::Idle;
        let mut parts = graph.parts();
        if let Some(mut m) = self.marker.take() {
            m.destroy(&mut parts.layer);
        }
        if let Some(mut ch) = self.constraint_handler.take() {
            ch.destroy(&mut parts.layer);
        }
        parts.layer.remove(self.preview.take());
        parts.layer.remove(self.label_handle.take());
        for b in self.bends.drain(..) {
            parts.layer.remove(b);
        }
        self.hint.hide(&mut parts.layer);
    }
}
