//! Cell renderer: binds view states to live shapes in the retained tree.
//!
//! Each rendered cell owns a [`CellVisual`]: the cell's shape, its label,
//! overlay badges, and the fold control. [`CellRenderer::redraw`] only
//! repaints what changed since the last call: style, bounds, points, or
//! scale. Pointer events hitting any of these nodes are resolved back to
//! the cell and re-dispatched as [`GraphMouseEvent`]s.

use crate::input::{GraphMouseEvent, InputEvent};
use crate::overlay::{CellOverlay, ImageRef, control_bounds};
use crate::policy::{CellScope, GraphHandlerPolicy};
use dg_core::style::{color_keywords, keys};
use dg_core::{Bounds, CellId, CellState, Color, Config, GraphModel, GraphView, Style};
use dg_render::export::{ExportHooks, configure_label, label_text};
use dg_render::shape::text::label_bounds;
use dg_render::shape::{Painter, Shape, ShapeKind};
use dg_render::{Document, NodeRef, ShapeRegistry, TextMeasurer};
use smallvec::SmallVec;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Everything a redraw reads, borrowed from the graph for one call.
pub struct RenderContext<'a> {
    pub model: &'a GraphModel,
    pub view: &'a GraphView,
    pub doc: &'a mut Document,
    pub draw_pane: NodeRef,
    pub overlay_pane: NodeRef,
    pub measurer: &'a dyn TextMeasurer,
    pub config: &'a Config,
    pub policy: &'a dyn GraphHandlerPolicy,
    pub overlays: &'a HashMap<CellId, Vec<CellOverlay>>,
}

impl RenderContext<'_> {
    fn scope(&self) -> CellScope<'_> {
        CellScope::new(self.model, self.view, &self.config.graph)
    }
}

/// Live visual parts of one cell.
#[derive(Debug)]
pub struct CellVisual {
    pub shape: Shape,
    pub text: Option<Shape>,
    pub overlays: SmallVec<[Shape; 2]>,
    pub control: Option<Shape>,
    /// Style the shape was last configured with.
    configured: Style,
    /// Position among siblings at the last ordering.
    child_index: Option<usize>,
    control_image: Option<String>,
}

impl CellVisual {
    fn nodes(&self) -> impl Iterator<Item = NodeRef> + '_ {
        self.shape.node().into_iter().chain(self.text.as_ref().and_then(Shape::node))
    }

    fn last_node(&self) -> Option<NodeRef> {
        self.nodes().last()
    }
}

/// Which part of a cell a node belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellPart {
    Shape,
    Text,
    Overlay(usize),
    Control,
}

type Listener = Box<dyn FnMut(&GraphMouseEvent)>;

pub struct CellRenderer {
    registry: Arc<ShapeRegistry>,
    visuals: HashMap<CellId, CellVisual>,
    pub collapsed_image: ImageRef,
    pub expanded_image: ImageRef,
    gesture_in_progress: bool,
    listeners: Vec<Listener>,
}

impl fmt::Debug for CellRenderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CellRenderer")
            .field("visuals", &self.visuals.len())
            .field("gesture_in_progress", &self.gesture_in_progress)
            .finish_non_exhaustive()
    }
}

impl CellRenderer {
    pub fn new(registry: Arc<ShapeRegistry>) -> Self {
        Self {
            registry,
            visuals: HashMap::new(),
            collapsed_image: ImageRef::new("images/collapsed.gif", 9.0, 9.0),
            expanded_image: ImageRef::new("images/expanded.gif", 9.0, 9.0),
            gesture_in_progress: false,
            listeners: Vec::new(),
        }
    }

    pub fn registry(&self) -> &ShapeRegistry {
        &self.registry
    }

    pub fn visual(&self, cell: CellId) -> Option<&CellVisual> {
        self.visuals.get(&cell)
    }

    pub fn visual_mut(&mut self, cell: CellId) -> Option<&mut CellVisual> {
        self.visuals.get_mut(&cell)
    }

    pub fn rendered(&self) -> impl Iterator<Item = CellId> + '_ {
        self.visuals.keys().copied()
    }

    // ─── Shape creation ─────────────────────────────────────────────────

    /// Shape for a state with its style applied and color keywords
    /// resolved. Not yet attached to the tree.
    pub fn create_shape(&self, state: &CellState, model: &GraphModel, view: &GraphView) -> Shape {
        let mut shape = self.registry.create_shape(&state.style, state.is_edge());
        shape.scale = view.scale;
        resolve_colors(&mut shape, state, model, view);
        shape
    }

    /// Create the visual for `state` and attach its shape node.
    pub fn initialize(&mut self, state: &CellState, cx: &mut RenderContext<'_>) -> &mut CellVisual {
        let mut shape = self.create_shape(state, cx.model, cx.view);
        shape.init(cx.doc, cx.draw_pane);
        log::debug!("initialized {} as {:?}", state.cell, shape.kind());
        self.visuals.entry(state.cell).or_insert(CellVisual {
            shape,
            text: None,
            overlays: SmallVec::new(),
            control: None,
            configured: state.style.clone(),
            child_index: None,
            control_image: None,
        })
    }

    // ─── Redraw ─────────────────────────────────────────────────────────

    /// Bring the visual of `state` up to date. Returns whether the shape
    /// was repainted. Label, overlays, and control are skipped when
    /// `rendering` is false.
    pub fn redraw(
        &mut self,
        state: &CellState,
        force: bool,
        rendering: bool,
        cx: &mut RenderContext<'_>,
    ) -> bool {
        let created = !self.visuals.contains_key(&state.cell);
        if created {
            self.initialize(state, cx);
        }
        let force = force || created;

        let index = cx.model.child_index(state.cell);
        let reorder = cx.config.graph.ordered
            && self
                .visuals
                .get(&state.cell)
                .is_some_and(|v| force || v.child_index != index);
        if reorder {
            self.order(state.cell, cx);
        }
        if state.is_edge() && force {
            self.order_edge(state.cell, cx);
        }

        let Some(visual) = self.visuals.get_mut(&state.cell) else {
            return false;
        };
        visual.child_index = index;

        let mut repaint = force;
        if visual.configured != state.style {
            visual.shape.apply(&state.style);
            resolve_colors(&mut visual.shape, state, cx.model, cx.view);
            visual.configured = state.style.clone();
            repaint = true;
            log::trace!("restyled {}", state.cell);
        }

        let scale = cx.view.scale;
        if state.is_edge() {
            if visual.shape.points != state.absolute_points {
                visual.shape.points = state.absolute_points.clone();
                repaint = true;
            }
            visual.shape.stroke_tolerance = cx.config.shapes.stroke_tolerance;
        } else if visual.shape.bounds != state.bounds {
            visual.shape.bounds = state.bounds;
            repaint = true;
        }
        if visual.shape.scale != scale {
            visual.shape.scale = scale;
            repaint = true;
        }

        if repaint {
            visual.shape.redraw(cx.doc, cx.measurer);
            log::trace!("repainted {}", state.cell);
        }

        if rendering {
            self.redraw_label(state, force, cx);
            self.redraw_overlays(state, cx);
            self.redraw_control(state, cx);
        }
        repaint
    }

    /// Create, update, or drop the label shape.
    pub fn redraw_label(&mut self, state: &CellState, force: bool, cx: &mut RenderContext<'_>) {
        let registry = &self.registry;
        let Some(visual) = self.visuals.get_mut(&state.cell) else {
            return;
        };
        if label_text(state).is_none() {
            if let Some(mut text) = visual.text.take() {
                text.destroy(cx.doc);
            }
            return;
        }
        let geometry = cx.model.geometry(state.cell);
        let shape_node = visual.shape.node();
        let text = match &mut visual.text {
            Some(t) => t,
            slot => {
                let mut t = registry.create_text_shape(&state.style);
                let node = t.init(cx.doc, cx.draw_pane);
                // Labels paint directly above their shape.
                let after = shape_node.and_then(|n| cx.doc.next_sibling(n));
                cx.doc.insert_before(cx.draw_pane, node, after);
                slot.insert(t)
            }
        };
        let before = (text.bounds, text.value.clone(), text.scale, text.style.clone());
        configure_label(text, registry, state, geometry, cx.view.scale);
        if let Some(c) = resolve_color(cx.model, cx.view, state.cell, keys::FONT_COLOR) {
            text.style.set(keys::FONT_COLOR, c.to_hex());
        }
        let after = (text.bounds, text.value.clone(), text.scale, text.style.clone());
        if force || before != after || text.bounding_box.is_none() {
            text.redraw(cx.doc, cx.measurer);
        }
    }

    /// Rebuild overlay badges when their count changed, then reposition.
    pub fn redraw_overlays(&mut self, state: &CellState, cx: &mut RenderContext<'_>) {
        let defaults = self.registry.defaults();
        let Some(visual) = self.visuals.get_mut(&state.cell) else {
            return;
        };
        let descriptors = cx.overlays.get(&state.cell).map_or(&[][..], Vec::as_slice);
        if visual.overlays.len() != descriptors.len() {
            for mut o in visual.overlays.drain(..) {
                o.destroy(cx.doc);
            }
            for d in descriptors {
                let mut shape = Shape::new(Painter::Builtin(ShapeKind::Image), defaults.clone());
                shape.image = Some(d.image.src.clone());
                shape.init(cx.doc, cx.overlay_pane);
                if let (Some(node), Some(tip)) = (shape.node(), &d.tooltip) {
                    cx.doc.set_attr(node, "title", tip);
                }
                visual.overlays.push(shape);
            }
        }
        for (shape, d) in visual.overlays.iter_mut().zip(descriptors) {
            let bounds = d.bounds(state, cx.view.scale);
            if shape.bounds != bounds || shape.bounding_box.is_none() {
                shape.bounds = bounds;
                shape.redraw(cx.doc, cx.measurer);
            }
        }
    }

    /// Show the fold icon on foldable cells and drop it elsewhere.
    pub fn redraw_control(&mut self, state: &CellState, cx: &mut RenderContext<'_>) {
        let foldable = cx.config.graph.folding_enabled
            && cx.policy.is_cell_foldable(cx.scope(), state.cell);
        let defaults = self.registry.defaults();
        let Some(visual) = self.visuals.get_mut(&state.cell) else {
            return;
        };
        if !foldable {
            if let Some(mut c) = visual.control.take() {
                c.destroy(cx.doc);
                visual.control_image = None;
            }
            return;
        }
        let collapsed = cx.model.get(state.cell).is_some_and(|c| c.collapsed);
        let image = if collapsed {
            &self.collapsed_image
        } else {
            &self.expanded_image
        };
        if visual.control_image.as_deref() != Some(image.src.as_str())
            && let Some(mut old) = visual.control.take()
        {
            old.destroy(cx.doc);
        }
        let control = match &mut visual.control {
            Some(c) => c,
            slot => {
                let mut c = Shape::new(Painter::Builtin(ShapeKind::Image), defaults.clone());
                c.image = Some(image.src.clone());
                c.init(cx.doc, cx.overlay_pane);
                slot.insert(c)
            }
        };
        visual.control_image = Some(image.src.clone());
        let bounds = control_bounds(
            state,
            image.width,
            image.height,
            cx.view.scale,
            visual.shape.shape_rotation(),
        );
        if control.bounds != bounds || control.bounding_box.is_none() {
            control.bounds = bounds;
            control.redraw(cx.doc, cx.measurer);
        }
    }

    pub fn get_label_bounds(&self, state: &CellState, model: &GraphModel, scale: f64) -> Bounds {
        label_bounds(state, model.geometry(state.cell), scale, self.registry.defaults())
    }

    /// Bounds of the fold control, if the cell shows one.
    pub fn get_control_bounds(&self, state: &CellState, scale: f64) -> Option<Bounds> {
        let visual = self.visuals.get(&state.cell)?;
        let control = visual.control.as_ref()?;
        let image = if control.image.as_deref() == Some(self.collapsed_image.src.as_str()) {
            &self.collapsed_image
        } else {
            &self.expanded_image
        };
        Some(control_bounds(
            state,
            image.width,
            image.height,
            scale,
            visual.shape.shape_rotation(),
        ))
    }

    // ─── Z-order ────────────────────────────────────────────────────────

    /// Move the cell's nodes right after the last node painted for its
    /// previous sibling (or its parent when it is the first child).
    pub fn order(&mut self, cell: CellId, cx: &mut RenderContext<'_>) {
        let Some(visual) = self.visuals.get(&cell) else {
            return;
        };
        let nodes: Vec<NodeRef> = visual.nodes().collect();
        let Some(&first) = nodes.first() else {
            return;
        };
        let anchor = self.previous_node(cell, cx.model);
        let before = match anchor {
            Some(a) => cx.doc.next_sibling(a),
            None => cx.doc.children(cx.draw_pane).first().copied(),
        };
        if before == Some(first) {
            return;
        }
        for n in nodes {
            cx.doc.insert_before(cx.draw_pane, n, before);
        }
    }

    fn previous_node(&self, cell: CellId, model: &GraphModel) -> Option<NodeRef> {
        let parent = model.parent(cell)?;
        let index = model.child_index(cell)?;
        let siblings = model.children(parent);
        for prev in siblings[..index].iter().rev() {
            let last = model
                .descendants(*prev)
                .into_iter()
                .rev()
                .find_map(|c| self.visuals.get(&c).and_then(CellVisual::last_node));
            if last.is_some() {
                return last;
            }
        }
        self.visuals.get(&parent).and_then(CellVisual::last_node)
    }

    /// Edges kept in the background go before the first vertex; edges
    /// kept in the foreground go after everything.
    pub fn order_edge(&mut self, cell: CellId, cx: &mut RenderContext<'_>) {
        let graph = &cx.config.graph;
        if !graph.keep_edges_in_background && !graph.keep_edges_in_foreground {
            return;
        }
        let Some(visual) = self.visuals.get(&cell) else {
            return;
        };
        let nodes: Vec<NodeRef> = visual.nodes().collect();
        let before = if graph.keep_edges_in_background {
            cx.doc.children(cx.draw_pane).iter().copied().find(|n| {
                self.visuals
                    .iter()
                    .any(|(id, v)| cx.model.is_vertex(*id) && v.shape.node() == Some(*n))
            })
        } else {
            None
        };
        for n in nodes {
            cx.doc.insert_before(cx.draw_pane, n, before);
        }
    }

    // ─── Events ─────────────────────────────────────────────────────────

    pub fn add_listener(&mut self, listener: impl FnMut(&GraphMouseEvent) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    pub fn gesture_in_progress(&self) -> bool {
        self.gesture_in_progress
    }

    /// Cell and part owning `node` or one of its ancestors.
    pub fn cell_for_node(&self, doc: &Document, node: NodeRef) -> Option<(CellId, CellPart)> {
        let mut current = Some(node);
        while let Some(n) = current {
            for (id, v) in &self.visuals {
                if v.shape.node() == Some(n) {
                    return Some((*id, CellPart::Shape));
                }
                if v.text.as_ref().and_then(Shape::node) == Some(n) {
                    return Some((*id, CellPart::Text));
                }
                if v.control.as_ref().and_then(Shape::node) == Some(n) {
                    return Some((*id, CellPart::Control));
                }
                if let Some(i) = v.overlays.iter().position(|o| o.node() == Some(n)) {
                    return Some((*id, CellPart::Overlay(i)));
                }
            }
            current = doc.parent(n);
        }
        None
    }

    /// Turn a pointer event on `node` into a graph mouse event and notify
    /// listeners. Events are swallowed while a multi-touch gesture runs.
    pub fn handle_input(
        &mut self,
        doc: &Document,
        view: &GraphView,
        event: &InputEvent,
        node: Option<NodeRef>,
    ) -> Option<GraphMouseEvent> {
        match event {
            InputEvent::GestureStart => {
                self.gesture_in_progress = true;
                return None;
            }
            InputEvent::GestureEnd => {
                self.gesture_in_progress = false;
                return None;
            }
            _ if self.gesture_in_progress => {
                log::trace!("pointer event suppressed during gesture");
                return None;
            }
            _ => {}
        }
        let cell = node
            .and_then(|n| self.cell_for_node(doc, n))
            .map(|(c, _)| c)
            .filter(|c| view.state(*c).is_some());
        let me = GraphMouseEvent::from_input(event, cell)?;
        for l in &mut self.listeners {
            l(&me);
        }
        Some(me)
    }

    // ─── Teardown ───────────────────────────────────────────────────────

    /// Release every node the cell owns.
    pub fn destroy(&mut self, cell: CellId, doc: &mut Document) {
        let Some(mut v) = self.visuals.remove(&cell) else {
            return;
        };
        if let Some(mut t) = v.text.take() {
            t.destroy(doc);
        }
        for mut o in v.overlays.drain(..) {
            o.destroy(doc);
        }
        if let Some(mut c) = v.control.take() {
            c.destroy(doc);
        }
        v.shape.destroy(doc);
        log::debug!("destroyed visual for {cell}");
    }

    /// Redraw every state in paint order and drop visuals whose state
    /// disappeared.
    pub fn render_all(&mut self, cx: &mut RenderContext<'_>) -> usize {
        let stale: Vec<CellId> = self
            .visuals
            .keys()
            .filter(|c| cx.view.state(**c).is_none())
            .copied()
            .collect();
        for c in stale {
            self.destroy(c, cx.doc);
        }
        let view = cx.view;
        let mut repainted = 0;
        for state in view.states() {
            if self.redraw(state, false, true, cx) {
                repainted += 1;
            }
        }
        repainted
    }
}

// ─── Color keywords ─────────────────────────────────────────────────────

const MAX_INHERIT_DEPTH: usize = 32;

/// Color of `key` for `cell`, with `inherit`, `swimlane`, and `indicated`
/// resolved against the view.
pub fn resolve_color(model: &GraphModel, view: &GraphView, cell: CellId, key: &str) -> Option<Color> {
    resolve_color_at(model, view, cell, key, 0)
}

fn style_of<'a>(model: &'a GraphModel, view: &'a GraphView, cell: CellId) -> Option<&'a Style> {
    view.state(cell).map(|s| &s.style).or_else(|| model.style(cell))
}

fn resolve_color_at(
    model: &GraphModel,
    view: &GraphView,
    cell: CellId,
    key: &str,
    depth: usize,
) -> Option<Color> {
    if depth > MAX_INHERIT_DEPTH {
        log::warn!("color keyword cycle at {cell}");
        return None;
    }
    let style = style_of(model, view, cell)?;
    match style.get(key)? {
        color_keywords::INHERIT => {
            let parent = model.parent(cell)?;
            resolve_color_at(model, view, parent, key, depth + 1)
        }
        color_keywords::SWIMLANE => {
            let start = model.terminal(cell, false).unwrap_or(cell);
            let lane = enclosing_swimlane(model, view, start)?;
            let lane_key = if key == keys::STROKE_COLOR {
                keys::STROKE_COLOR
            } else {
                keys::FILL_COLOR
            };
            resolve_color_at(model, view, lane, lane_key, depth + 1)
        }
        color_keywords::INDICATED => style.get_color(keys::INDICATOR_COLOR),
        value => Color::parse(value),
    }
}

/// `cell` itself or its nearest swimlane ancestor.
fn enclosing_swimlane(model: &GraphModel, view: &GraphView, cell: CellId) -> Option<CellId> {
    let mut current = Some(cell);
    while let Some(c) = current {
        if style_of(model, view, c).is_some_and(|s| s.get(keys::SHAPE) == Some("swimlane")) {
            return Some(c);
        }
        current = model.parent(c);
    }
    None
}

fn is_keyword(value: Option<&str>) -> bool {
    matches!(
        value,
        Some(color_keywords::INHERIT | color_keywords::SWIMLANE | color_keywords::INDICATED)
    )
}

/// Replace keyword colors on a styled shape with concrete ones.
pub fn resolve_colors(shape: &mut Shape, state: &CellState, model: &GraphModel, view: &GraphView) {
    let style = &state.style;
    let fields: [(&str, &mut Option<Color>); 4] = [
        (keys::FILL_COLOR, &mut shape.fill),
        (keys::STROKE_COLOR, &mut shape.stroke),
        (keys::GRADIENT_COLOR, &mut shape.gradient),
        (keys::INDICATOR_COLOR, &mut shape.indicator_color),
    ];
    for (key, field) in fields {
        if !is_keyword(style.get(key)) {
            continue;
        }
        *field = resolve_color(model, view, state.cell, key);
    }
}

/// Export hooks that resolve color keywords and paint overlay badges.
pub struct RendererHooks<'a> {
    pub renderer: &'a CellRenderer,
    pub model: &'a GraphModel,
    pub view: &'a GraphView,
    pub overlays: &'a HashMap<CellId, Vec<CellOverlay>>,
}

impl ExportHooks for RendererHooks<'_> {
    fn prepare_shape(&self, state: &CellState, shape: &mut Shape) {
        resolve_colors(shape, state, self.model, self.view);
    }

    fn overlays(&self, state: &CellState, scale: f64) -> Vec<Shape> {
        let Some(list) = self.overlays.get(&state.cell) else {
            return Vec::new();
        };
        list.iter()
            .map(|d| {
                let mut s = Shape::new(
                    Painter::Builtin(ShapeKind::Image),
                    self.renderer.registry.defaults().clone(),
                )
                .with_bounds(d.bounds(state, scale));
                s.image = Some(d.image.src.clone());
                s
            })
            .collect()
    }
}
