//! Transient coordinate hint shown while dragging.
//!
//! Every move reschedules the hide deadline; the hint disappears once
//! the pointer has rested for [`HINT_DELAY_MS`]. Time comes from an
//! injected [`Clock`] so tests can step it.

use crate::handle::PreviewLayer;
use dg_core::{Bounds, Point};
use dg_render::shape::{Painter, Shape, ShapeKind};
use std::cell::Cell;
use std::sync::Arc;
use std::time::Instant;

pub const HINT_DELAY_MS: u64 = 500;

/// Monotonic milliseconds.
pub trait Clock {
    fn now_ms(&self) -> u64;
}

#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    start: Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        u64::try_from(self.start.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<u64>,
}

impl ManualClock {
    pub fn advance(&self, ms: u64) {
        self.now.set(self.now.get().saturating_add(ms));
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.get()
    }
}

impl<C: Clock + ?Sized> Clock for std::rc::Rc<C> {
    fn now_ms(&self) -> u64 {
        (**self).now_ms()
    }
}

const HINT_OFFSET: f64 = 16.0;

#[derive(Debug, Default)]
pub struct CoordinateHint {
    text: Option<String>,
    deadline: Option<u64>,
    shape: Option<Shape>,
}

impl CoordinateHint {
    pub fn new() -> Self {
        Self::default()
    }

    /// Show `text` near `at` and push the hide deadline out.
    pub fn show(&mut self, layer: &mut PreviewLayer<'_>, clock: &dyn Clock, text: String, at: Point) {
        let bounds = Bounds::new(at.x + HINT_OFFSET, at.y + HINT_OFFSET, 0.0, 0.0);
        match &mut self.shape {
            Some(s) => {
                s.bounds = bounds;
                s.value = Some(text.clone());
                layer.repaint(s);
            }
            None => {
                let mut s = Shape::new(Painter::Builtin(ShapeKind::Text), Arc::clone(layer.defaults))
                    .with_bounds(bounds);
                s.value = Some(text.clone());
                layer.show(&mut s);
                self.shape = Some(s);
            }
        }
        self.text = Some(text);
        self.deadline = Some(clock.now_ms().saturating_add(HINT_DELAY_MS));
    }

    /// Hide once the deadline passed. Returns whether it hid now.
    pub fn poll(&mut self, layer: &mut PreviewLayer<'_>, clock: &dyn Clock) -> bool {
        match self.deadline {
            Some(d) if clock.now_ms() >= d => {
                self.hide(layer);
                true
            }
            _ => false,
        }
    }

    pub fn hide(&mut self, layer: &mut PreviewLayer<'_>) {
        self.deadline = None;
        self.text = None;
        layer.remove(self.shape.take());
    }

    pub fn is_visible(&self) -> bool {
        self.text.is_some()
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dg_core::ShapeDefaults;
    use dg_render::{ApproximateMeasurer, Document};

    #[test]
    fn moves_reschedule_the_deadline() {
        let mut doc = Document::svg();
        let pane = doc.root();
        let measurer = ApproximateMeasurer::default();
        let defaults = Arc::new(ShapeDefaults::default());
        let mut layer = PreviewLayer {
            doc: &mut doc,
            pane,
            measurer: &measurer,
            defaults: &defaults,
        };
        let clock = ManualClock::default();
        let mut hint = CoordinateHint::new();

        hint.show(&mut layer, &clock, "10, 10".into(), Point::ZERO);
        clock.advance(400);
        hint.show(&mut layer, &clock, "20, 10".into(), Point::ZERO);
        clock.advance(400);
        assert!(!hint.poll(&mut layer, &clock));
        assert_eq!(hint.text(), Some("20, 10"));
        clock.advance(100);
        assert!(hint.poll(&mut layer, &clock));
        assert!(!hint.is_visible());
    }
}
