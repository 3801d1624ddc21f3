//! Fixed connection points and the handler that shows them while an
//! edge end is dragged over a terminal.

use crate::handle::{PreviewLayer, color, tolerance_rect};
use crate::input::GraphMouseEvent;
use crate::overlay::ImageRef;
use crate::policy::{CellScope, GraphHandlerPolicy};
use dg_core::style::keys;
use dg_core::{Bounds, CellId, Point, Style};
use dg_render::shape::Shape;

/// A connection point as fractions of the terminal bounds, or a
/// floating connection when `point` is `None`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConnectionConstraint {
    pub point: Option<Point>,
}

impl ConnectionConstraint {
    pub fn fixed(x: f64, y: f64) -> Self {
        Self {
            point: Some(Point::new(x, y)),
        }
    }

    pub fn floating() -> Self {
        Self { point: None }
    }

    /// Absolute position on `bounds`, `None` when floating.
    pub fn point_on(&self, bounds: &Bounds) -> Option<Point> {
        self.point
            .map(|f| Point::new(bounds.x + f.x * bounds.width, bounds.y + f.y * bounds.height))
    }

    /// Write this constraint into an edge style for the given end.
    pub fn apply(&self, style: &mut Style, source: bool) {
        let (kx, ky) = if source {
            (keys::EXIT_X, keys::EXIT_Y)
        } else {
            (keys::ENTRY_X, keys::ENTRY_Y)
        };
        match self.point {
            Some(p) => {
                style.set(kx, p.x);
                style.set(ky, p.y);
            }
            None => {
                style.remove(kx);
                style.remove(ky);
            }
        }
    }
}

const HIGHLIGHT_STROKE_WIDTH: f64 = 3.0;
const HIGHLIGHT_GROW: f64 = 3.0;

/// Tracks the terminal under the pointer and its connection points.
#[derive(Debug)]
pub struct ConstraintHandler {
    pub point_image: ImageRef,
    pub highlight_color: String,
    current_focus: Option<CellId>,
    current_focus_area: Option<Bounds>,
    constraints: Vec<ConnectionConstraint>,
    focus_points: Vec<Point>,
    icons: Vec<Shape>,
    highlight: Option<Shape>,
    current_constraint: Option<ConnectionConstraint>,
    current_point: Option<Point>,
}

impl Default for ConstraintHandler {
    fn default() -> Self {
        Self {
            point_image: ImageRef::new("images/point.gif", 5.0, 5.0),
            highlight_color: "#00FF00".to_string(),
            current_focus: None,
            current_focus_area: None,
            constraints: Vec::new(),
            focus_points: Vec::new(),
            icons: Vec::new(),
            highlight: None,
            current_constraint: None,
            current_point: None,
        }
    }
}

impl ConstraintHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Constraint under the pointer after the last update.
    pub fn current_constraint(&self) -> Option<ConnectionConstraint> {
        self.current_constraint
    }

    /// Terminal whose connection points are shown.
    pub fn current_focus(&self) -> Option<CellId> {
        self.current_focus
    }

    pub fn current_point(&self) -> Option<Point> {
        self.current_point
    }

    /// A constraint is under the pointer.
    pub fn has_focus(&self) -> bool {
        self.current_focus.is_some() && self.current_constraint.is_some()
    }

    pub fn icon_count(&self) -> usize {
        self.icons.len()
    }

    /// Follow the pointer: refocus on the terminal under it and pick the
    /// nearest connection point within `tolerance`.
    pub fn update(
        &mut self,
        scope: CellScope<'_>,
        policy: &dyn GraphHandlerPolicy,
        layer: &mut PreviewLayer<'_>,
        me: &GraphMouseEvent,
        source: bool,
        tolerance: f64,
    ) {
        let mouse = tolerance_rect(me.point, tolerance);
        let state = me.cell.and_then(|c| scope.view.state(c)).filter(|s| s.is_vertex());
        let connectable = state.is_some_and(|s| policy.is_cell_connectable(scope, s.cell));

        let outside = self
            .current_focus_area
            .is_none_or(|area| !area.intersects(&mouse));
        if outside || (state.is_some() && self.current_focus.is_some() && connectable) {
            self.current_focus_area = None;
            if state.map(|s| s.cell) != self.current_focus {
                self.current_focus = None;
                self.constraints = state
                    .map(|s| policy.connection_constraints(scope, s, source))
                    .unwrap_or_default();
                layer.remove_all(&mut self.icons);
                self.focus_points.clear();

                match state {
                    Some(s) if !self.constraints.is_empty() => {
                        self.current_focus = Some(s.cell);
                        let mut area = s.bounds;
                        for c in &self.constraints {
                            let Some(p) = c.point_on(&s.bounds) else {
                                continue;
                            };
                            let img = &self.point_image;
                            let b = Bounds::new(
                                (p.x - img.width / 2.0).round(),
                                (p.y - img.height / 2.0).round(),
                                img.width,
                                img.height,
                            );
                            self.icons.push(layer.image(&img.src, b));
                            self.focus_points.push(p);
                            area.add(&b);
                        }
                        self.current_focus_area = Some(area);
                        log::trace!("{} connection points on {}", self.icons.len(), s.cell);
                    }
                    _ => {
                        layer.remove(self.highlight.take());
                    }
                }
            }
        }

        self.current_constraint = None;
        self.current_point = None;
        let focused = state.is_none() || state.map(|s| s.cell) == self.current_focus;
        if !self.icons.is_empty() && focused {
            let mut best: Option<(f64, usize)> = None;
            for (i, icon) in self.icons.iter().enumerate() {
                if !icon.bounds.intersects(&mouse) {
                    continue;
                }
                let c = icon.bounds.center();
                let d = (c.x - me.point.x).powi(2) + (c.y - me.point.y).powi(2);
                if best.is_none_or(|(min, _)| d < min) {
                    best = Some((d, i));
                }
            }
            match best {
                Some((_, i)) => {
                    self.current_constraint = self.constraints.get(i).copied();
                    self.current_point = self.focus_points.get(i).copied();
                    let mut b = self.icons[i].bounds;
                    b.grow(HIGHLIGHT_GROW);
                    match &mut self.highlight {
                        Some(h) => {
                            h.bounds = b;
                            layer.repaint(h);
                        }
                        None => {
                            let mut h = layer.rectangle(b, None, color(&self.highlight_color));
                            h.stroke_width = HIGHLIGHT_STROKE_WIDTH;
                            layer.repaint(&mut h);
                            self.highlight = Some(h);
                        }
                    }
                }
                None => layer.remove(self.highlight.take()),
            }
        } else {
            self.current_focus = None;
            self.current_constraint = None;
        }
    }

    /// Drop icons and highlight and forget the focus.
    pub fn reset(&mut self, layer: &mut PreviewLayer<'_>) {
        layer.remove_all(&mut self.icons);
        layer.remove(self.highlight.take());
        self.focus_points.clear();
        self.constraints.clear();
        self.current_constraint = None;
        self.current_focus_area = None;
        self.current_point = None;
        self.current_focus = None;
    }

    pub fn destroy(&mut self, layer: &mut PreviewLayer<'_>) {
        self.reset(layer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn fixed_constraint_maps_onto_bounds() {
        let c = ConnectionConstraint::fixed(0.5, 1.0);
        assert_eq!(
            c.point_on(&Bounds::new(10.0, 10.0, 40.0, 20.0)),
            Some(Point::new(30.0, 30.0))
        );
        assert_eq!(ConnectionConstraint::floating().point_on(&Bounds::default()), None);
    }

    #[test]
    fn apply_writes_and_clears_style_keys() {
        let mut style = Style::new();
        ConnectionConstraint::fixed(1.0, 0.25).apply(&mut style, false);
        assert_eq!(style.get(keys::ENTRY_X), Some("1"));
        assert_eq!(style.get(keys::ENTRY_Y), Some("0.25"));
        ConnectionConstraint::floating().apply(&mut style, false);
        assert!(style.is_empty());
    }
}
