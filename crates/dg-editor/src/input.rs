//! Input abstraction layer.
//!
//! Normalizes mouse, touch, and pen events into a unified `InputEvent`
//! enum. The renderer resolves the cell under the pointer and hands the
//! handlers a [`GraphMouseEvent`].

use dg_core::{CellId, Point};

/// Device that produced a pointer event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PointerKind {
    #[default]
    Mouse,
    Touch,
    Pen,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        shift: false,
        ctrl: false,
        alt: false,
        meta: false,
    };

    pub fn shift() -> Self {
        Self {
            shift: true,
            ..Self::NONE
        }
    }

    pub fn ctrl() -> Self {
        Self {
            ctrl: true,
            ..Self::NONE
        }
    }

    /// Ctrl or Cmd: clone on connect.
    pub fn is_clone(&self) -> bool {
        self.ctrl || self.meta
    }

    /// Alt disables grid snapping for the gesture.
    pub fn is_grid_disabled(&self) -> bool {
        self.alt
    }
}

/// A normalized input event from any pointing device.
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    /// Pointer pressed (mouse down, touch start, pen contact).
    PointerDown {
        x: f64,
        y: f64,
        pointer: PointerKind,
        modifiers: Modifiers,
    },

    PointerMove {
        x: f64,
        y: f64,
        pointer: PointerKind,
        modifiers: Modifiers,
    },

    PointerUp {
        x: f64,
        y: f64,
        pointer: PointerKind,
        modifiers: Modifiers,
    },

    DoubleClick {
        x: f64,
        y: f64,
        pointer: PointerKind,
        modifiers: Modifiers,
    },

    /// Second finger down: a pinch or rotate gesture begins.
    GestureStart,

    GestureEnd,

    Key { key: String, modifiers: Modifiers },
}

impl InputEvent {
    pub fn mouse_down(x: f64, y: f64) -> Self {
        Self::PointerDown {
            x,
            y,
            pointer: PointerKind::Mouse,
            modifiers: Modifiers::NONE,
        }
    }

    pub fn mouse_move(x: f64, y: f64) -> Self {
        Self::PointerMove {
            x,
            y,
            pointer: PointerKind::Mouse,
            modifiers: Modifiers::NONE,
        }
    }

    pub fn mouse_up(x: f64, y: f64) -> Self {
        Self::PointerUp {
            x,
            y,
            pointer: PointerKind::Mouse,
            modifiers: Modifiers::NONE,
        }
    }

    /// Same event reported by another device.
    #[must_use]
    pub fn with_pointer(mut self, kind: PointerKind) -> Self {
        match &mut self {
            Self::PointerDown { pointer, .. }
            | Self::PointerMove { pointer, .. }
            | Self::PointerUp { pointer, .. }
            | Self::DoubleClick { pointer, .. } => *pointer = kind,
            _ => {}
        }
        self
    }

    #[must_use]
    pub fn with_modifiers(mut self, m: Modifiers) -> Self {
        match &mut self {
            Self::PointerDown { modifiers, .. }
            | Self::PointerMove { modifiers, .. }
            | Self::PointerUp { modifiers, .. }
            | Self::DoubleClick { modifiers, .. }
            | Self::Key { modifiers, .. } => *modifiers = m,
            _ => {}
        }
        self
    }

    /// Extract position if this is a pointer event.
    pub fn position(&self) -> Option<Point> {
        match self {
            Self::PointerDown { x, y, .. }
            | Self::PointerMove { x, y, .. }
            | Self::PointerUp { x, y, .. }
            | Self::DoubleClick { x, y, .. } => Some(Point::new(*x, *y)),
            _ => None,
        }
    }
}

// ─── Graph mouse events ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseEventKind {
    Down,
    Move,
    Up,
    DoubleClick,
}

/// A pointer event resolved against the view: the cell under the
/// pointer (if any) and a consumed flag handlers set to stop further
/// processing, e.g. rubber-band selection under a handle.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphMouseEvent {
    pub kind: MouseEventKind,
    pub point: Point,
    pub pointer: PointerKind,
    pub modifiers: Modifiers,
    pub cell: Option<CellId>,
    consumed: bool,
}

impl GraphMouseEvent {
    pub fn new(kind: MouseEventKind, point: Point) -> Self {
        Self {
            kind,
            point,
            pointer: PointerKind::Mouse,
            modifiers: Modifiers::NONE,
            cell: None,
            consumed: false,
        }
    }

    /// Convert a pointer event. `None` for keys and gestures.
    pub fn from_input(event: &InputEvent, cell: Option<CellId>) -> Option<Self> {
        let (kind, x, y, pointer, modifiers) = match event {
            InputEvent::PointerDown {
                x,
                y,
                pointer,
                modifiers,
            } => (MouseEventKind::Down, x, y, pointer, modifiers),
            InputEvent::PointerMove {
                x,
                y,
                pointer,
                modifiers,
            } => (MouseEventKind::Move, x, y, pointer, modifiers),
            InputEvent::PointerUp {
                x,
                y,
                pointer,
                modifiers,
            } => (MouseEventKind::Up, x, y, pointer, modifiers),
            InputEvent::DoubleClick {
                x,
                y,
                pointer,
                modifiers,
            } => (MouseEventKind::DoubleClick, x, y, pointer, modifiers),
            _ => return None,
        };
        Some(Self {
            kind,
            point: Point::new(*x, *y),
            pointer: *pointer,
            modifiers: *modifiers,
            cell,
            consumed: false,
        })
    }

    #[must_use]
    pub fn with_cell(mut self, cell: CellId) -> Self {
        self.cell = Some(cell);
        self
    }

    #[must_use]
    pub fn with_pointer(mut self, pointer: PointerKind) -> Self {
        self.pointer = pointer;
        self
    }

    #[must_use]
    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    pub fn consume(&mut self) {
        self.consumed = true;
    }

    pub fn is_consumed(&self) -> bool {
        self.consumed
    }

    /// Touch and pen pointers must travel past the tolerance before a
    /// press turns into a drag.
    pub fn is_touch_or_pen(&self) -> bool {
        matches!(self.pointer, PointerKind::Touch | PointerKind::Pen)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn pointer_events_convert_with_cell() {
        let cell = CellId::intern("hit");
        let ev = InputEvent::mouse_down(3.0, 4.0).with_pointer(PointerKind::Pen);
        let me = GraphMouseEvent::from_input(&ev, Some(cell)).unwrap();
        assert_eq!(me.kind, MouseEventKind::Down);
        assert_eq!(me.point, Point::new(3.0, 4.0));
        assert_eq!(me.cell, Some(cell));
        assert!(me.is_touch_or_pen());
        assert!(!me.is_consumed());
    }

    #[test]
    fn gestures_and_keys_have_no_position() {
        assert!(InputEvent::GestureStart.position().is_none());
        let key = InputEvent::Key {
            key: "Escape".into(),
            modifiers: Modifiers::NONE,
        };
        assert!(GraphMouseEvent::from_input(&key, None).is_none());
    }

    #[test]
    fn consume_sticks() {
        let mut me = GraphMouseEvent::new(MouseEventKind::Move, Point::ZERO);
        me.consume();
        assert!(me.is_consumed());
    }
}
