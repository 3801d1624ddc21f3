//! Highlights the cell under the pointer in a valid or invalid color.

use crate::handle::{PreviewLayer, color};
use dg_core::{CellId, CellState};
use dg_render::shape::Shape;

const HIGHLIGHT_STROKE_WIDTH: f64 = 3.0;

#[derive(Debug)]
pub struct CellMarker {
    pub valid_color: String,
    pub invalid_color: String,
    marked: Option<CellId>,
    valid: Option<CellId>,
    current_color: Option<String>,
    highlight: Option<Shape>,
}

impl CellMarker {
    pub fn new(valid_color: impl Into<String>, invalid_color: impl Into<String>) -> Self {
        Self {
            valid_color: valid_color.into(),
            invalid_color: invalid_color.into(),
            marked: None,
            valid: None,
            current_color: None,
            highlight: None,
        }
    }

    /// Mark `state` in the color matching `valid`, or unmark when there
    /// is no state. Returns the marked cell.
    pub fn process(
        &mut self,
        layer: &mut PreviewLayer<'_>,
        state: Option<&CellState>,
        valid: bool,
    ) -> Option<CellId> {
        self.valid = state.filter(|_| valid).map(|s| s.cell);
        let color = state.map(|_| {
            if valid {
                self.valid_color.clone()
            } else {
                self.invalid_color.clone()
            }
        });
        let cell = state.map(|s| s.cell);
        if cell != self.marked || color != self.current_color {
            self.current_color = color;
            match (state, &self.current_color) {
                (Some(s), Some(c)) => {
                    self.marked = Some(s.cell);
                    self.mark(layer, s, c.clone());
                }
                _ => {
                    self.marked = None;
                    layer.remove(self.highlight.take());
                }
            }
        }
        self.marked
    }

    fn mark(&mut self, layer: &mut PreviewLayer<'_>, state: &CellState, c: String) {
        let bounds = state.bounds;
        match &mut self.highlight {
            Some(h) => {
                h.bounds = bounds;
                h.stroke = color(&c);
                layer.repaint(h);
            }
            None => {
                let mut h = layer.rectangle(bounds, None, color(&c));
                h.stroke_width = HIGHLIGHT_STROKE_WIDTH;
                layer.repaint(&mut h);
                self.highlight = Some(h);
            }
        }
    }

    pub fn marked(&self) -> Option<CellId> {
        self.marked
    }

    /// The marked cell if it passed validation.
    pub fn valid_state(&self) -> Option<CellId> {
        self.valid
    }

    pub fn has_valid_state(&self) -> bool {
        self.valid.is_some()
    }

    pub fn highlight(&self) -> Option<&Shape> {
        self.highlight.as_ref()
    }

    pub fn reset(&mut self, layer: &mut PreviewLayer<'_>) {
        self.marked = None;
        self.valid = None;
        self.current_color = None;
        layer.remove(self.highlight.take());
    }

    pub fn destroy(&mut self, layer: &mut PreviewLayer<'_>) {
        self.reset(layer);
    }
}
