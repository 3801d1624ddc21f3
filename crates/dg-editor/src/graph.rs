//! The graph facade: model, view, renderer, and the retained tree, plus
//! the policy and capabilities handlers consult.
//!
//! Handlers borrow the graph mutably for the duration of one event and
//! split it with [`Graph::parts`] when they need read access to the
//! model while drawing previews.

use crate::constraint::ConnectionConstraint;
use crate::handle::PreviewLayer;
use crate::hint::{Clock, SystemClock};
use crate::input::{GraphMouseEvent, InputEvent, MouseEventKind, PointerKind};
use crate::overlay::CellOverlay;
use crate::policy::{CellScope, DefaultPolicy, GraphHandlerPolicy};
use crate::renderer::{CellPart, CellRenderer, RenderContext, RendererHooks};
use dg_core::geom::{self, Bounds};
use dg_core::{CellId, CellState, Config, GraphModel, GraphView, ModelError, Point, Stylesheet};
use dg_render::{ApproximateMeasurer, Canvas2D, Document, ImageExport, NodeRef, ShapeRegistry, TextMeasurer};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

/// What a context click on a cell offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextAction {
    AddWaypoint,
    RemoveWaypoint(usize),
    Ungroup,
    None,
}

/// Split borrows of a graph: read access to the cells, write access to
/// the overlay pane.
pub struct GraphParts<'a> {
    pub scope: CellScope<'a>,
    pub policy: &'a dyn GraphHandlerPolicy,
    pub config: &'a Config,
    pub clock: &'a dyn Clock,
    pub layer: PreviewLayer<'a>,
}

pub struct Graph {
    pub model: GraphModel,
    pub view: GraphView,
    pub renderer: CellRenderer,
    pub doc: Document,
    config: Arc<Config>,
    policy: Box<dyn GraphHandlerPolicy>,
    measurer: Box<dyn TextMeasurer>,
    clock: Box<dyn Clock>,
    overlays: HashMap<CellId, Vec<CellOverlay>>,
    draw_pane: NodeRef,
    overlay_pane: NodeRef,
    alerts: Vec<String>,
}

impl fmt::Debug for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Graph")
            .field("model", &self.model)
            .field("renderer", &self.renderer)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl Graph {
    pub fn new(config: Config) -> Self {
        let registry = ShapeRegistry::new(Arc::new(config.shapes.clone()));
        let mut doc = Document::svg();
        let root = doc.root();
        let draw_pane = doc.create("g");
        doc.append(root, draw_pane);
        let overlay_pane = doc.create("g");
        doc.append(root, overlay_pane);
        Self {
            model: GraphModel::new(),
            view: GraphView::default(),
            renderer: CellRenderer::new(Arc::new(registry)),
            doc,
            config: Arc::new(config),
            policy: Box::new(DefaultPolicy),
            measurer: Box::new(ApproximateMeasurer::default()),
            clock: Box::new(SystemClock::default()),
            overlays: HashMap::new(),
            draw_pane,
            overlay_pane,
            alerts: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_policy(mut self, policy: impl GraphHandlerPolicy + 'static) -> Self {
        self.policy = Box::new(policy);
        self
    }

    #[must_use]
    pub fn with_measurer(mut self, measurer: impl TextMeasurer + 'static) -> Self {
        self.measurer = Box::new(measurer);
        self
    }

    #[must_use]
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Replace the shape registry. Existing visuals keep their shapes.
    #[must_use]
    pub fn with_registry(mut self, registry: ShapeRegistry) -> Self {
        self.renderer = CellRenderer::new(Arc::new(registry));
        self
    }

    #[must_use]
    pub fn with_stylesheet(mut self, stylesheet: Stylesheet) -> Self {
        self.view = GraphView::new(Arc::new(stylesheet));
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn policy(&self) -> &dyn GraphHandlerPolicy {
        &*self.policy
    }

    pub fn clock(&self) -> &dyn Clock {
        &*self.clock
    }

    pub fn draw_pane(&self) -> NodeRef {
        self.draw_pane
    }

    pub fn overlay_pane(&self) -> NodeRef {
        self.overlay_pane
    }

    pub fn scope(&self) -> CellScope<'_> {
        CellScope::new(&self.model, &self.view, &self.config.graph)
    }

    pub fn parts(&mut self) -> GraphParts<'_> {
        GraphParts {
            scope: CellScope::new(&self.model, &self.view, &self.config.graph),
            policy: &*self.policy,
            config: &self.config,
            clock: &*self.clock,
            layer: PreviewLayer {
                doc: &mut self.doc,
                pane: self.overlay_pane,
                measurer: &*self.measurer,
                defaults: self.renderer.registry().defaults(),
            },
        }
    }

    // ─── Rendering ──────────────────────────────────────────────────────

    fn with_render<R>(&mut self, f: impl FnOnce(&mut CellRenderer, &mut RenderContext<'_>) -> R) -> R {
        let mut cx = RenderContext {
            model: &self.model,
            view: &self.view,
            doc: &mut self.doc,
            draw_pane: self.draw_pane,
            overlay_pane: self.overlay_pane,
            measurer: &*self.measurer,
            config: &self.config,
            policy: &*self.policy,
            overlays: &self.overlays,
        };
        f(&mut self.renderer, &mut cx)
    }

    /// Rebuild the view from the model and bring every visual up to date.
    pub fn refresh(&mut self) -> usize {
        self.view.invalidate();
        self.view.revalidate(&self.model);
        self.with_render(|r, cx| r.render_all(cx))
    }

    pub fn redraw_cell(&mut self, cell: CellId, force: bool) -> bool {
        self.with_render(|r, cx| {
            let view = cx.view;
            view.state(cell).is_some_and(|s| r.redraw(s, force, true, cx))
        })
    }

    /// Re-route the edges attached to `cell` or its descendants against
    /// the current states and repaint them.
    pub fn revalidate_edges_of(&mut self, cell: CellId) {
        let mut edges: Vec<CellId> = self
            .model
            .descendants(cell)
            .into_iter()
            .flat_map(|c| self.model.edges_of(c))
            .collect();
        let mut seen = HashSet::new();
        edges.retain(|e| seen.insert(*e));
        for e in edges {
            self.view.validate_edge(&self.model, e);
            self.redraw_cell(e, false);
        }
    }

    /// Paint `bounds` for `cell` and reroute its edges without touching
    /// the model. The states are restored afterwards so only the shapes
    /// show the preview.
    pub fn preview_bounds(&mut self, cell: CellId, bounds: Bounds) {
        let Some(state) = self.view.state_mut(cell) else {
            return;
        };
        let original = std::mem::replace(&mut state.bounds, bounds);
        self.redraw_cell(cell, false);
        let saved: Vec<CellState> = self
            .model
            .descendants(cell)
            .into_iter()
            .flat_map(|c| self.model.edges_of(c))
            .filter_map(|e| self.view.state(e).cloned())
            .collect();
        self.revalidate_edges_of(cell);
        if let Some(s) = self.view.state_mut(cell) {
            s.bounds = original;
        }
        for s in saved {
            if let Some(t) = self.view.state_mut(s.cell) {
                *t = s;
            }
        }
    }

    /// Repaint `cell` and its edges from their real states.
    pub fn restore_preview(&mut self, cell: CellId) {
        self.redraw_cell(cell, true);
        for e in self.model.edges_of(cell) {
            self.redraw_cell(e, true);
        }
    }

    /// Paint every state onto `c`. Returns the number of states painted.
    pub fn export(&self, c: &mut dyn Canvas2D, include_overlays: bool) -> usize {
        let mut export = ImageExport::new(self.renderer.registry());
        export.include_overlays = include_overlays;
        let hooks = RendererHooks {
            renderer: &self.renderer,
            model: &self.model,
            view: &self.view,
            overlays: &self.overlays,
        };
        export.draw_state(&self.model, &self.view, self.model.root(), c, &hooks)
    }

    // ─── Overlays ───────────────────────────────────────────────────────

    pub fn add_overlay(&mut self, cell: CellId, overlay: CellOverlay) {
        self.overlays.entry(cell).or_default().push(overlay);
        self.redraw_cell(cell, false);
    }

    pub fn remove_overlays(&mut self, cell: CellId) -> Vec<CellOverlay> {
        let removed = self.overlays.remove(&cell).unwrap_or_default();
        self.redraw_cell(cell, false);
        removed
    }

    pub fn overlays(&self, cell: CellId) -> &[CellOverlay] {
        self.overlays.get(&cell).map_or(&[], Vec::as_slice)
    }

    // ─── Grid and tolerance ─────────────────────────────────────────────

    pub fn is_grid_enabled(&self, me: &GraphMouseEvent) -> bool {
        self.config.graph.grid_enabled && !me.modifiers.is_grid_disabled()
    }

    pub fn snap(&self, value: f64) -> f64 {
        if self.config.graph.grid_enabled {
            geom::snap(value, self.config.graph.grid_size)
        } else {
            value
        }
    }

    pub fn tolerance(&self, pointer: PointerKind) -> f64 {
        self.policy.tolerance(&self.config.graph, pointer)
    }

    /// Topmost vertex under a screen point.
    pub fn cell_at(&self, p: Point) -> Option<CellId> {
        self.view.state_at(p, None).map(|s| s.cell)
    }

    // ─── Alerts ─────────────────────────────────────────────────────────

    pub fn alert(&mut self, message: impl Into<String>) {
        let message = message.into();
        log::warn!("{message}");
        self.alerts.push(message);
    }

    pub fn take_alerts(&mut self) -> Vec<String> {
        std::mem::take(&mut self.alerts)
    }

    // ─── Transactions ───────────────────────────────────────────────────

    /// Set the model bounds of `cell` in one update.
    pub fn resize_cell(&mut self, cell: CellId, bounds: Bounds) -> Result<(), ModelError> {
        {
            let mut model = self.model.begin_update();
            let mut geo = model
                .geometry(cell)
                .cloned()
                .ok_or(ModelError::UnknownCell(cell))?;
            geo.bounds = bounds;
            model.set_geometry(cell, geo)?;
        }
        log::debug!("resized {cell} to {bounds:?}");
        self.refresh();
        Ok(())
    }

    /// Attach one end of `edge` to `terminal` (or detach with `None`),
    /// storing the connection point in the edge style. No constraint
    /// means a floating connection.
    pub fn connect_cell(
        &mut self,
        edge: CellId,
        terminal: Option<CellId>,
        source: bool,
        constraint: Option<ConnectionConstraint>,
    ) -> Result<(), ModelError> {
        let constraint = constraint.unwrap_or_else(ConnectionConstraint::floating);
        connect_terminal(&mut self.model.begin_update(), edge, terminal, source, Some(constraint))?;
        log::debug!("connected {edge} {} to {terminal:?}", if source { "source" } else { "target" });
        self.refresh();
        Ok(())
    }

    /// Collapse or expand `cell`, swapping in its alternate bounds.
    pub fn fold_cell(&mut self, cell: CellId, collapse: bool) -> Result<(), ModelError> {
        {
            let mut model = self.model.begin_update();
            model.set_collapsed(cell, collapse)?;
            if let Some(mut geo) = model.geometry(cell).cloned()
                && geo.alternate_bounds.is_some()
            {
                geo.swap();
                model.set_geometry(cell, geo)?;
            }
        }
        log::debug!("{} {cell}", if collapse { "collapsed" } else { "expanded" });
        self.refresh();
        Ok(())
    }

    // ─── Events ─────────────────────────────────────────────────────────

    /// Route a raw input event hitting `node`. A press on a fold control
    /// toggles the cell and is consumed.
    pub fn dispatch(&mut self, event: &InputEvent, node: Option<NodeRef>) -> Option<GraphMouseEvent> {
        let mut me = self.renderer.handle_input(&self.doc, &self.view, event, node)?;
        let part = node.and_then(|n| self.renderer.cell_for_node(&self.doc, n));
        if me.kind == MouseEventKind::Down
            && let Some((cell, CellPart::Control)) = part
        {
            let collapsed = self.model.get(cell).is_some_and(|c| c.collapsed);
            if let Err(e) = self.fold_cell(cell, !collapsed) {
                log::warn!("fold failed: {e}");
            }
            me.consume();
        }
        Some(me)
    }

    /// Action offered by a context click at screen point `p` on `cell`.
    pub fn context_action(&self, cell: CellId, p: Point) -> ContextAction {
        let tolerance = self.config.graph.tolerance;
        if let Some(state) = self.view.state(cell).filter(|s| s.is_edge()) {
            let pts = &state.absolute_points;
            let last = pts.len().saturating_sub(1);
            let waypoint = (1..last).find(|&i| {
                let q = pts[i];
                (q.x - p.x).abs() <= tolerance && (q.y - p.y).abs() <= tolerance
            });
            match waypoint {
                Some(i) => ContextAction::RemoveWaypoint(i),
                None => ContextAction::AddWaypoint,
            }
        } else if self.model.is_vertex(cell) && self.model.child_count(cell) > 0 {
            ContextAction::Ungroup
        } else {
            ContextAction::None
        }
    }
}

/// Set one terminal of `edge` inside an open update. `constraint` is
/// written to the edge style when given and left alone otherwise.
pub(crate) fn connect_terminal(
    model: &mut GraphModel,
    edge: CellId,
    terminal: Option<CellId>,
    source: bool,
    constraint: Option<ConnectionConstraint>,
) -> Result<(), ModelError> {
    if let Some(c) = constraint {
        let mut style = model.style(edge).cloned().unwrap_or_default();
        c.apply(&mut style, source);
        model.set_style(edge, style)?;
    }
    model.set_terminal(edge, terminal, source)
}
