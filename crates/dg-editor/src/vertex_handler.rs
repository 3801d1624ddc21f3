//! Resize, rotate, and label handles for one selected vertex.
//!
//! A press on a handle arms it; moving past the pointer tolerance starts
//! the drag, which only touches preview shapes (and, with live preview,
//! the painted cell). Releasing commits the change to the model in one
//! update.

use crate::graph::Graph;
use crate::handle::{PreviewLayer, VertexHandle, color, handle_bounds};
use crate::hint::CoordinateHint;
use crate::input::GraphMouseEvent;
use dg_core::geom::{rotate_point, snap};
use dg_core::style::{keys, normalize_degrees};
use dg_core::{Bounds, CellId, CellState, GraphModel, GraphView, ModelError, Point, Vec2};
use dg_render::shape::Shape;

// ─── Sizing ─────────────────────────────────────────────────────────────

/// How a sizer drag turns into new bounds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnionOptions {
    /// Grid size when snapping is on.
    pub grid: Option<f64>,
    pub scale: f64,
    pub translate: Vec2,
    /// Keep the aspect ratio of the input bounds.
    pub constrained: bool,
    /// Only the bottom-right corner moves.
    pub single_sizer: bool,
    /// Lower bound for width and height.
    pub min_size: Option<(f64, f64)>,
}

impl Default for UnionOptions {
    fn default() -> Self {
        Self {
            grid: None,
            scale: 1.0,
            translate: Vec2::ZERO,
            constrained: false,
            single_sizer: false,
            min_size: None,
        }
    }
}

fn snap_scaled(v: f64, opts: &UnionOptions) -> f64 {
    match opts.grid {
        Some(g) => snap(v / opts.scale, g) * opts.scale,
        None => v,
    }
}

/// Bounds after dragging sizer `index` by `(dx, dy)`.
///
/// Rows: index < 3 moves the top edge, index > 4 the bottom edge.
/// Columns: 0, 3, 5 move the left edge, 2, 4, 7 the right edge. Each
/// moved edge snaps on its own. Dragging past the opposite edge flips.
pub fn union(bounds: &Bounds, dx: f64, dy: f64, index: usize, opts: &UnionOptions) -> Bounds {
    if opts.single_sizer {
        let x = snap_scaled(bounds.x + bounds.width + dx, opts);
        let y = snap_scaled(bounds.y + bounds.height + dy, opts);
        let mut rect = Bounds::new(bounds.x, bounds.y, 0.0, 0.0);
        rect.add(&Bounds::new(x, y, 0.0, 0.0));
        return clamp_min(rect, opts);
    }

    let tr = opts.translate;
    let mut left = bounds.x - tr.x * opts.scale;
    let mut right = left + bounds.width;
    let mut top = bounds.y - tr.y * opts.scale;
    let mut bottom = top + bounds.height;

    if index > 4 {
        bottom = snap_scaled(bottom + dy, opts);
    } else if index < 3 {
        top = snap_scaled(top + dy, opts);
    }
    if matches!(index, 0 | 3 | 5) {
        left = snap_scaled(left + dx, opts);
    } else if matches!(index, 2 | 4 | 7) {
        right = snap_scaled(right + dx, opts);
    }

    let mut width = right - left;
    let mut height = bottom - top;

    if opts.constrained && bounds.width > 0.0 && bounds.height > 0.0 {
        let aspect = bounds.width / bounds.height;
        if matches!(index, 1 | 2 | 6 | 7) {
            width = height * aspect;
        } else {
            height = width / aspect;
        }
        if index == 0 {
            left = right - width;
            top = bottom - height;
        }
    }

    if width < 0.0 {
        left += width;
        width = width.abs();
    }
    if height < 0.0 {
        top += height;
        height = height.abs();
    }

    clamp_min(
        Bounds::new(left + tr.x * opts.scale, top + tr.y * opts.scale, width, height),
        opts,
    )
}

fn clamp_min(mut b: Bounds, opts: &UnionOptions) -> Bounds {
    if let Some((w, h)) = opts.min_size {
        b.width = b.width.max(w);
        b.height = b.height.max(h);
    }
    b
}

/// Bounds after a sizer drag on a cell rotated by `rotation` degrees.
/// The delta is taken into the cell's own frame, sized there, and the
/// center shift is rotated back out.
pub fn rotated_union(
    bounds: &Bounds,
    delta: Point,
    index: usize,
    rotation: f64,
    opts: &UnionOptions,
) -> Bounds {
    if rotation == 0.0 {
        return union(bounds, delta.x, delta.y, index, opts);
    }
    let (sin, cos) = (-rotation).to_radians().sin_cos();
    let local = rotate_point(delta, cos, sin, Point::ZERO);
    let b = union(bounds, local.x, local.y, index, opts);

    let c0 = bounds.center();
    let c1 = b.center();
    let d = Point::new(c1.x - c0.x, c1.y - c0.y);
    let (sin, cos) = rotation.to_radians().sin_cos();
    let rd = rotate_point(d, cos, sin, Point::ZERO);
    b.translated(rd.x - d.x, rd.y - d.y)
}

// ─── Rotation ───────────────────────────────────────────────────────────

/// Angle of the pointer around `center`, 0 straight up, clockwise
/// positive. With `raster`, the angle snaps to steps that are coarse
/// close to the handle radius and fine further away.
pub fn rotation_angle(center: Point, p: Point, raster: Option<f64>) -> f64 {
    let dx = center.x - p.x;
    let dy = center.y - p.y;
    let mut alpha = if dx != 0.0 {
        (dy / dx).atan().to_degrees() + 90.0
    } else if dy < 0.0 {
        180.0
    } else {
        0.0
    };
    if dx > 0.0 {
        alpha -= 180.0;
    }
    match raster {
        Some(handle_distance) => {
            let dist = ((dx * dx + dy * dy).sqrt() - handle_distance).abs() * 3.0;
            let steps = if dist > 0.0 {
                (80.0 / dist).round().clamp(0.0, 3.0)
            } else {
                3.0
            };
            let step = (5.0 * steps).max(1.0);
            (alpha / step).round() * step
        }
        None => (alpha * 100.0).round() / 100.0,
    }
}

/// Add `delta` degrees to the rotation of `cell`. Non-relative children
/// turn with it about the parent center.
pub fn rotate_cell(
    model: &mut GraphModel,
    view: &GraphView,
    cell: CellId,
    delta: f64,
    parent: Option<CellId>,
) -> Result<(), ModelError> {
    if delta == 0.0 || !(model.is_vertex(cell) || model.is_edge(cell)) {
        return Ok(());
    }
    let mut model = model.begin_update();
    if model.is_vertex(cell) {
        let current = model
            .style(cell)
            .filter(|s| s.contains(keys::ROTATION))
            .or_else(|| view.state(cell).map(|s| &s.style))
            .map_or(0.0, |s| s.rotation());
        model.set_style_value(cell, keys::ROTATION, normalize_degrees(current + delta))?;
    }
    let Some(mut geo) = model.geometry(cell).cloned() else {
        return Ok(());
    };
    if let Some(p) = parent
        && !model.is_edge(p)
        && let Some(pgeo) = model.geometry(p)
    {
        let center = Point::new(pgeo.bounds.width / 2.0, pgeo.bounds.height / 2.0);
        geo.rotate(delta, center);
        model.set_geometry(cell, geo.clone())?;
    }
    if (model.is_vertex(cell) && !geo.relative) || model.is_edge(cell) {
        for child in model.children(cell) {
            rotate_cell(&mut model, view, child, delta, Some(cell))?;
        }
    }
    Ok(())
}

// ─── Handler ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureState {
    Idle,
    Armed { handle: VertexHandle, start: Point },
    DraggingResize { index: usize, start: Point },
    DraggingRotate { start: Point, angle: f64 },
    DraggingLabel { start: Point },
}

/// What a released gesture committed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VertexChange {
    Resized(Bounds),
    Rotated(f64),
    LabelMoved(Point),
    Unchanged,
}

#[derive(Debug)]
pub struct VertexHandler {
    cell: CellId,
    /// Screen bounds shown by the selection border.
    bounds: Bounds,
    gesture: GestureState,
    single_sizer: bool,
    selection_border: Option<Shape>,
    preview: Option<Shape>,
    sizers: Vec<(VertexHandle, Shape)>,
    hint: CoordinateHint,
}

impl VertexHandler {
    /// Handles for `cell`, or `None` if it has no vertex state.
    pub fn new(graph: &mut Graph, cell: CellId) -> Option<Self> {
        let state = graph.view.state(cell).filter(|s| s.is_vertex())?;
        let bounds = state.bounds;
        let hc = graph.config().handles.clone();
        let scope = graph.scope();
        let policy = graph.policy();
        let resizable = policy.is_cell_resizable(scope, cell);
        let rotatable = hc.rotation_enabled && policy.is_cell_rotatable(scope, cell);
        let label_movable = policy.is_label_movable(scope, cell) || hc.manual_label_handle;
        let relative = graph.model.geometry(cell).is_none_or(|g| g.relative);
        let swimlane = scope.is_swimlane(cell);
        let single_sizer = hc.single_sizer
            || bounds.width.min(bounds.height) < hc.single_sizer_threshold;

        let mut kinds = Vec::new();
        if resizable {
            if single_sizer {
                kinds.push(VertexHandle::Sizer(7));
            } else {
                kinds.extend((0..8).map(VertexHandle::Sizer));
            }
        }
        if label_movable && !relative && !swimlane {
            kinds.push(VertexHandle::Label);
        }
        if rotatable {
            kinds.push(VertexHandle::Rotation);
        }

        let mut parts = graph.parts();
        let mut border = parts.layer.rectangle(bounds, None, color(&hc.selection_color));
        border.dashed = hc.selection_dashed;
        border.stroke_width = hc.selection_stroke_width;
        border.pointer_events = false;
        parts.layer.repaint(&mut border);

        let sizers = kinds
            .into_iter()
            .map(|k| {
                let (size, fill) = match k {
                    VertexHandle::Sizer(_) => (hc.handle_size, &hc.handle_fill_color),
                    VertexHandle::Label => (hc.label_handle_size, &hc.label_handle_fill_color),
                    VertexHandle::Rotation => (hc.handle_size, &hc.rotation_handle_fill_color),
                };
                let b = Bounds::new(0.0, 0.0, size, size);
                let shape = parts
                    .layer
                    .rectangle(b, color(fill), color(&hc.handle_stroke_color));
                (k, shape)
            })
            .collect();

        let mut handler = Self {
            cell,
            bounds,
            gesture: GestureState::Idle,
            single_sizer,
            selection_border: Some(border),
            preview: None,
            sizers,
            hint: CoordinateHint::new(),
        };
        handler.redraw(graph);
        log::debug!("vertex handler for {cell}");
        Some(handler)
    }

    pub fn cell(&self) -> CellId {
        self.cell
    }

    pub fn gesture(&self) -> GestureState {
        self.gesture
    }

    pub fn is_idle(&self) -> bool {
        self.gesture == GestureState::Idle
    }

    pub fn selection_bounds(&self) -> Bounds {
        self.bounds
    }

    pub fn hint(&self) -> &CoordinateHint {
        &self.hint
    }

    pub fn handles(&self) -> impl Iterator<Item = VertexHandle> + '_ {
        self.sizers.iter().map(|(k, _)| *k)
    }

    /// Current bounds of a handle shape.
    pub fn handle_bounds(&self, handle: VertexHandle) -> Option<Bounds> {
        self.sizers
            .iter()
            .find(|(k, _)| *k == handle)
            .map(|(_, s)| s.bounds)
    }

    /// Screen position of each handle center for `state`.
    fn handle_position(&self, handle: VertexHandle, state: &CellState, rotation_offset: f64) -> Point {
        let s = &state.bounds;
        let (cx, cy) = (s.x + s.width / 2.0, s.y + s.height / 2.0);
        let (r, b) = (s.x + s.width, s.y + s.height);
        let p = match handle {
            VertexHandle::Sizer(0) => Point::new(s.x, s.y),
            VertexHandle::Sizer(1) => Point::new(cx, s.y),
            VertexHandle::Sizer(2) => Point::new(r, s.y),
            VertexHandle::Sizer(3) => Point::new(s.x, cy),
            VertexHandle::Sizer(4) => Point::new(r, cy),
            VertexHandle::Sizer(5) => Point::new(s.x, b),
            VertexHandle::Sizer(6) => Point::new(cx, b),
            VertexHandle::Sizer(_) => Point::new(r, b),
            VertexHandle::Label => {
                return Point::new(cx + state.absolute_offset.x, cy + state.absolute_offset.y);
            }
            VertexHandle::Rotation => Point::new(cx, s.y - rotation_offset),
        };
        let rotation = state.style.rotation();
        if rotation == 0.0 {
            return p;
        }
        let (sin, cos) = rotation.to_radians().sin_cos();
        rotate_point(p, cos, sin, Point::new(cx, cy))
    }

    /// Handle under `p`. Touch and pen pointers hit within `tolerance`;
    /// among several hits the nearest center wins.
    pub fn handle_at(&self, p: Point, tolerance: f64) -> Option<VertexHandle> {
        self.sizers
            .iter()
            .filter(|(_, s)| crate::handle::hit(&s.bounds, p, tolerance))
            .map(|(k, s)| {
                let c = s.bounds.center();
                (*k, (c.x - p.x).powi(2) + (c.y - p.y).powi(2))
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(k, _)| k)
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
        if let Some(handle) = self.handle_at(me.point, tolerance) {
            self.start(graph, me.point, handle);
            me.consume();
        }
    }

    /// Arm `handle` with the press at `p` and show the preview outline.
    pub fn start(&mut self, graph: &mut Graph, p: Point, handle: VertexHandle) {
        self.gesture = GestureState::Armed { handle, start: p };
        let hc = graph.config().handles.clone();
        let rotation = self.rotation(graph);
        let mut parts = graph.parts();
        if let Some(border) = &mut self.selection_border {
            border.visible = false;
            parts.layer.repaint(border);
        }
        let mut preview = parts.layer.rectangle(self.bounds, None, color(&hc.selection_color));
        preview.dashed = hc.selection_dashed;
        preview.stroke_width = hc.selection_stroke_width;
        preview.pointer_events = false;
        preview.rotation = rotation;
        parts.layer.repaint(&mut preview);
        self.preview = Some(preview);
        log::debug!("armed {handle:?} on {}", self.cell);
    }

    fn rotation(&self, graph: &Graph) -> f64 {
        graph
            .view
            .state(self.cell)
            .map_or(0.0, |s| s.style.rotation())
    }

    pub fn mouse_move(&mut self, graph: &mut Graph, me: &mut GraphMouseEvent) {
        if me.is_consumed() {
            return;
        }
        let gesture = match self.gesture {
            GestureState::Idle => {
                if self.handle_at(me.point, 0.0).is_some() {
                    // Keep the connection highlight off while over a handle.
                    me.consume();
                }
                return;
            }
            GestureState::Armed { handle, start } => {
                if me.is_touch_or_pen() {
                    let tol = graph.tolerance(me.pointer);
                    if (me.point.x - start.x).abs() < tol && (me.point.y - start.y).abs() < tol {
                        me.consume();
                        return;
                    }
                }
                match handle {
                    VertexHandle::Sizer(index) => GestureState::DraggingResize { index, start },
                    VertexHandle::Rotation => GestureState::DraggingRotate {
                        start,
                        angle: self.rotation(graph),
                    },
                    VertexHandle::Label => GestureState::DraggingLabel { start },
                }
            }
            g => g,
        };
        self.gesture = gesture;

        let Some(state) = graph.view.state(self.cell).cloned() else {
            return;
        };
        let scale = graph.view.scale;
        let grid_enabled = graph.is_grid_enabled(me);
        let hc = graph.config().handles.clone();

        match gesture {
            GestureState::DraggingLabel { .. } => {
                let mut p = me.point;
                if grid_enabled {
                    p = Point::new(graph.snap(p.x / scale) * scale, graph.snap(p.y / scale) * scale);
                }
                let mut parts = graph.parts();
                if let Some((_, shape)) = self.sizers.iter_mut().find(|(k, _)| *k == VertexHandle::Label) {
                    shape.bounds = handle_bounds(p, shape.bounds.width);
                    parts.layer.repaint(shape);
                }
            }
            GestureState::DraggingRotate { .. } => {
                let raster = (hc.rotation_raster && grid_enabled)
                    .then(|| state.bounds.height / 2.0 + hc.rotation_handle_offset);
                let angle = rotation_angle(state.center(), me.point, raster);
                self.gesture = GestureState::DraggingRotate {
                    start: me.point,
                    angle,
                };
                let mut parts = graph.parts();
                if let Some(preview) = &mut self.preview {
                    preview.rotation = angle;
                    parts.layer.repaint(preview);
                }
                let text = format!("{}°", normalize_degrees(angle).round());
                self.hint.show(&mut parts.layer, parts.clock, text, me.point);
            }
            GestureState::DraggingResize { index, start } => {
                let delta = Point::new(me.point.x - start.x, me.point.y - start.y);
                let opts = self.union_options(graph, grid_enabled, scale);
                self.bounds = rotated_union(&state.bounds, delta, index, state.style.rotation(), &opts);
                let bounds = self.bounds;
                {
                    let mut parts = graph.parts();
                    if let Some(preview) = &mut self.preview {
                        preview.bounds = bounds;
                        parts.layer.repaint(preview);
                    }
                    let text = format!(
                        "{} x {}",
                        (bounds.width / scale).round(),
                        (bounds.height / scale).round()
                    );
                    self.hint.show(&mut parts.layer, parts.clock, text, me.point);
                }
                if hc.live_preview {
                    graph.preview_bounds(self.cell, bounds);
                }
            }
            GestureState::Idle | GestureState::Armed { .. } => {}
        }
        log::trace!("vertex drag {:?}", self.gesture);
        me.consume();
    }

    fn union_options(&self, graph: &Graph, grid_enabled: bool, scale: f64) -> UnionOptions {
        let cfg = &graph.config().graph;
        UnionOptions {
            grid: grid_enabled.then_some(cfg.grid_size),
            scale,
            translate: graph.view.translate,
            constrained: graph
                .view
                .state(self.cell)
                .is_some_and(|s| s.style.get_bool(keys::ASPECT, false) || s.style.get(keys::ASPECT) == Some("fixed")),
            single_sizer: self.single_sizer,
            min_size: self.min_size(graph, scale),
        }
    }

    /// Smallest size that still covers every non-relative child.
    fn min_size(&self, graph: &Graph, scale: f64) -> Option<(f64, f64)> {
        if !graph.config().graph.constrain_children_on_resize {
            return None;
        }
        let mut extent: Option<(f64, f64)> = None;
        for child in graph.model.children(self.cell) {
            let Some(g) = graph.model.geometry(child).filter(|g| !g.relative) else {
                continue;
            };
            let (w, h) = extent.unwrap_or((0.0, 0.0));
            extent = Some((
                w.max(g.bounds.x + g.bounds.width),
                h.max(g.bounds.y + g.bounds.height),
            ));
        }
        extent.map(|(w, h)| (w * scale, h * scale))
    }

    /// Commit the gesture. Nothing changes when the pointer never left
    /// the armed state.
    pub fn mouse_up(
        &mut self,
        graph: &mut Graph,
        me: &mut GraphMouseEvent,
    ) -> Result<VertexChange, ModelError> {
        if me.is_consumed() || self.is_idle() {
            return Ok(VertexChange::Unchanged);
        }
        let gesture = self.gesture;
        let result = self.commit(graph, me, gesture);
        self.reset(graph);
        me.consume();
        result
    }

    fn commit(
        &mut self,
        graph: &mut Graph,
        me: &GraphMouseEvent,
        gesture: GestureState,
    ) -> Result<VertexChange, ModelError> {
        let scale = graph.view.scale;
        match gesture {
            GestureState::DraggingLabel { start } => {
                let Some(center) = self.handle_bounds(VertexHandle::Label).map(|b| b.center()) else {
                    return Ok(VertexChange::Unchanged);
                };
                let d = Point::new((center.x - start.x) / scale, (center.y - start.y) / scale);
                self.move_label(graph, d)?;
                Ok(VertexChange::LabelMoved(d))
            }
            GestureState::DraggingRotate { angle, .. } => {
                let current = self.rotation(graph);
                let delta = angle - current;
                if delta == 0.0 {
                    return Ok(VertexChange::Unchanged);
                }
                let parent = graph.model.parent(self.cell);
                rotate_cell(&mut graph.model, &graph.view, self.cell, delta, parent)?;
                graph.refresh();
                Ok(VertexChange::Rotated(normalize_degrees(current + delta)))
            }
            GestureState::DraggingResize { index, start } => {
                let Some(geo) = graph.model.geometry(self.cell).cloned() else {
                    return Ok(VertexChange::Unchanged);
                };
                let delta = Point::new((me.point.x - start.x) / scale, (me.point.y - start.y) / scale);
                let mut opts = self.union_options(graph, graph.is_grid_enabled(me), 1.0);
                opts.translate = Vec2::ZERO;
                let rotation = self.rotation(graph);
                let bounds = rotated_union(&geo.bounds, delta, index, rotation, &opts);
                graph.resize_cell(self.cell, bounds)?;
                Ok(VertexChange::Resized(bounds))
            }
            GestureState::Idle | GestureState::Armed { .. } => Ok(VertexChange::Unchanged),
        }
    }

    /// Shift the label offset by `d` model units.
    pub fn move_label(&mut self, graph: &mut Graph, d: Point) -> Result<(), ModelError> {
        {
            let mut model = graph.model.begin_update();
            let Some(mut geo) = model.geometry(self.cell).cloned() else {
                return Ok(());
            };
            let offset = geo.offset.unwrap_or(Point::ZERO);
            geo.offset = Some(Point::new(offset.x + d.x, offset.y + d.y));
            model.set_geometry(self.cell, geo)?;
        }
        graph.refresh();
        Ok(())
    }

    /// Back to idle: drop the preview and show the real bounds again.
    pub fn reset(&mut self, graph: &mut Graph) {
        let was_live = matches!(self.gesture, GestureState::DraggingResize { .. })
            && graph.config().handles.live_preview;
        self.gesture = GestureState::Idle;
        {
            let mut parts = graph.parts();
            parts.layer.remove(self.preview.take());
            self.hint.hide(&mut parts.layer);
            if let Some(border) = &mut self.selection_border {
                border.visible = true;
            }
        }
        if was_live {
            graph.restore_preview(self.cell);
        }
        self.redraw(graph);
        log::debug!("vertex handler reset");
    }

    /// Move handles and border onto the current state.
    pub fn redraw(&mut self, graph: &mut Graph) {
        let Some(state) = graph.view.state(self.cell).cloned() else {
            return;
        };
        let offset = graph.config().handles.rotation_handle_offset;
        self.bounds = state.bounds;
        let positions: Vec<Point> = self
            .sizers
            .iter()
            .map(|(k, _)| self.handle_position(*k, &state, offset))
            .collect();
        let rotation = state.style.rotation();
        let mut parts = graph.parts();
        for ((_, shape), p) in self.sizers.iter_mut().zip(positions) {
            shape.bounds = handle_bounds(p, shape.bounds.width);
            parts.layer.repaint(shape);
        }
        if let Some(border) = &mut self.selection_border {
            border.bounds = self.bounds;
            border.rotation = rotation;
            parts.layer.repaint(border);
        }
    }

    /// Hide the hint once its delay elapsed.
    pub fn poll_hint(&mut self, graph: &mut Graph) -> bool {
        let mut parts = graph.parts();
        self.hint.poll(&mut parts.layer, parts.clock)
    }

    /// Release every shape. Safe mid-gesture and twice.
    pub fn destroy(&mut self, graph: &mut Graph) {
        let live = matches!(self.gesture, GestureState::DraggingResize { .. })
            && graph.config().handles.live_preview;
        self.gesture = GestureState::Idle;
        {
            let mut parts = graph.parts();
            destroy_parts(
                &mut parts.layer,
                &mut self.preview,
                &mut self.selection_border,
                &mut self.sizers,
            );
            self.hint.hide(&mut parts.layer);
        }
        if live {
            graph.restore_preview(self.cell);
        }
    }
}

fn destroy_parts(
    layer: &mut PreviewLayer<'_>,
    preview: &mut Option<Shape>,
    border: &mut Option<Shape>,
    sizers: &mut Vec<(VertexHandle, Shape)>,
) {
    layer.remove(preview.take());
    layer.remove(border.take());
    for (_, s) in sizers.drain(..) {
        layer.remove(Some(s));
    }
}
