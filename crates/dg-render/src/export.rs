//! Static export: replay cell states onto any surface.
//!
//! No nodes are retained and no listeners are installed. Each state is
//! turned into a shape (plus a label shape) and painted directly, so the
//! output of a [`crate::canvas::XmlCanvas`] or [`crate::canvas::SvgCanvas`]
//! matches what the interactive renderer shows.

use crate::canvas::Canvas2D;
use crate::registry::ShapeRegistry;
use crate::shape::text::{label_bounds, text_rotation};
use crate::shape::Shape;
use dg_core::style::keys;
use dg_core::{CellId, CellKind, CellState, Geometry, GraphModel, GraphView};

/// Per-state customization points used while exporting.
pub trait ExportHooks {
    /// Adjust a freshly built shape, e.g. to resolve color keywords.
    fn prepare_shape(&self, _state: &CellState, _shape: &mut Shape) {}

    /// Badge shapes painted on top of the cell when overlays are included.
    fn overlays(&self, _state: &CellState, _scale: f64) -> Vec<Shape> {
        Vec::new()
    }
}

/// Hooks that change nothing and add no overlays.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoHooks;

impl ExportHooks for NoHooks {}

/// Shape for a state at the given view scale, style applied.
pub fn state_shape(registry: &ShapeRegistry, state: &CellState, scale: f64) -> Shape {
    let mut shape = registry.create_shape(&state.style, state.is_edge());
    shape.scale = scale;
    if state.is_edge() {
        shape.points = state.absolute_points.clone();
        shape.update_bounds_from_points();
    } else {
        shape.bounds = state.bounds;
    }
    shape
}

/// Label text of a state, or `None` if it paints no label.
pub fn label_text(state: &CellState) -> Option<&str> {
    let value = state.value.as_deref().filter(|v| !v.is_empty())?;
    if state.style.get_bool(keys::NO_LABEL, false) {
        return None;
    }
    Some(value)
}

/// Label shape for a state, or `None` without a label.
pub fn label_shape(
    registry: &ShapeRegistry,
    state: &CellState,
    geometry: Option<&Geometry>,
    scale: f64,
) -> Option<Shape> {
    label_text(state)?;
    let mut shape = registry.create_text_shape(&state.style);
    configure_label(&mut shape, registry, state, geometry, scale);
    Some(shape)
}

/// Restyle and reposition an existing label shape for `state`.
pub fn configure_label(
    shape: &mut Shape,
    registry: &ShapeRegistry,
    state: &CellState,
    geometry: Option<&Geometry>,
    scale: f64,
) {
    shape.apply(&state.style);
    shape.value = label_text(state).map(str::to_string);
    shape.scale = scale;
    shape.bounds = label_bounds(state, geometry, scale, registry.defaults());
    shape.rotation = if state.is_vertex() {
        text_rotation(&state.style)
    } else {
        0.0
    };
    // The label paints text only.
    shape.fill = None;
    shape.gradient = None;
    shape.stroke = None;
    shape.shadow = false;
}

pub struct ImageExport<'a> {
    registry: &'a ShapeRegistry,
    pub include_overlays: bool,
}

impl<'a> ImageExport<'a> {
    pub fn new(registry: &'a ShapeRegistry) -> Self {
        Self {
            registry,
            include_overlays: false,
        }
    }

    /// Paint `root` and its descendants depth-first, then their overlays
    /// in a second pass. Returns the number of states painted.
    pub fn draw_state(
        &self,
        model: &GraphModel,
        view: &GraphView,
        root: CellId,
        c: &mut dyn Canvas2D,
        hooks: &dyn ExportHooks,
    ) -> usize {
        let mut painted = 0;
        self.visit(model, view, root, &mut |state| {
            self.draw_cell_state(model, view.scale, state, c, hooks);
            painted += 1;
        });
        if self.include_overlays {
            self.visit(model, view, root, &mut |state| {
                for overlay in hooks.overlays(state, view.scale) {
                    overlay.paint(c);
                }
            });
        }
        log::debug!("exported {painted} states");
        painted
    }

    /// Pre-order walk. A vertex or edge without a state hides its subtree;
    /// the root and layers have no state and are walked through.
    fn visit(
        &self,
        model: &GraphModel,
        view: &GraphView,
        id: CellId,
        visitor: &mut dyn FnMut(&CellState),
    ) {
        match view.state(id) {
            Some(state) => visitor(state),
            None => {
                let structural = model
                    .get(id)
                    .is_some_and(|c| matches!(c.kind, CellKind::Root | CellKind::Layer));
                if !structural {
                    return;
                }
            }
        }
        for child in model.children(id) {
            self.visit(model, view, child, visitor);
        }
    }

    fn draw_cell_state(
        &self,
        model: &GraphModel,
        scale: f64,
        state: &CellState,
        c: &mut dyn Canvas2D,
        hooks: &dyn ExportHooks,
    ) {
        let mut shape = state_shape(self.registry, state, scale);
        hooks.prepare_shape(state, &mut shape);
        if shape.visible && shape.check_bounds() {
            c.save();
            shape.paint(c);
            c.restore();
        } else {
            log::trace!("skipping {} with bounds {:?}", state.cell, shape.bounds);
        }

        if let Some(label) = label_shape(self.registry, state, model.geometry(state.cell), scale) {
            c.save();
            label.paint(c);
            c.restore();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dg_core::{Bounds, Point, Style};
    use pretty_assertions::assert_eq;

    fn state(kind: CellKind, style: &str, value: Option<&str>) -> CellState {
        CellState {
            cell: CellId::intern("s"),
            kind,
            style: Style::parse(style).unwrap(),
            bounds: Bounds::new(10.0, 20.0, 80.0, 40.0),
            origin: Point::ZERO,
            absolute_points: vec![Point::new(0.0, 0.0), Point::new(50.0, 0.0)],
            absolute_offset: Point::new(25.0, 0.0),
            value: value.map(str::to_string),
            source: None,
            target: None,
            parent: None,
        }
    }

    #[test]
    fn edge_shapes_take_route_points() {
        let r = ShapeRegistry::default();
        let s = state_shape(&r, &state(CellKind::Edge, "", None), 2.0);
        assert_eq!(s.points.len(), 2);
        assert_eq!(s.bounds, Bounds::new(0.0, 0.0, 50.0, 0.0));
        assert_eq!(s.scale, 2.0);
        let v = state_shape(&r, &state(CellKind::Vertex, "shape=ellipse", None), 1.0);
        assert_eq!(v.bounds, Bounds::new(10.0, 20.0, 80.0, 40.0));
        assert!(v.points.is_empty());
    }

    #[test]
    fn labels_are_skipped_when_empty_or_disabled() {
        let r = ShapeRegistry::default();
        assert!(label_shape(&r, &state(CellKind::Vertex, "", None), None, 1.0).is_none());
        assert!(label_shape(&r, &state(CellKind::Vertex, "", Some("")), None, 1.0).is_none());
        assert!(
            label_shape(&r, &state(CellKind::Vertex, "noLabel=1", Some("a")), None, 1.0).is_none()
        );
        let l = label_shape(&r, &state(CellKind::Vertex, "fillColor=#FF0000", Some("a")), None, 1.0)
            .unwrap();
        assert!(l.fill.is_none());
        assert!(l.check_bounds());
    }
}
