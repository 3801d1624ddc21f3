pub mod constraint;
pub mod edge_handler;
pub mod graph;
pub mod handle;
pub mod hint;
pub mod input;
pub mod marker;
pub mod overlay;
pub mod policy;
pub mod renderer;
pub mod vertex_handler;

pub use constraint::{ConnectionConstraint, ConstraintHandler};
pub use edge_handler::{EdgeChange, EdgeGesture, EdgeHandler};
pub use graph::{ContextAction, Graph, GraphParts};
pub use handle::{EdgeHandle, PreviewLayer, VertexHandle};
pub use hint::{Clock, CoordinateHint, HINT_DELAY_MS, ManualClock, SystemClock};
pub use input::{GraphMouseEvent, InputEvent, Modifiers, MouseEventKind, PointerKind};
pub use marker::CellMarker;
pub use overlay::{CellOverlay, ImageRef};
pub use policy::{CellScope, DefaultPolicy, EditorPolicy, GraphHandlerPolicy, ValidationError};
pub use renderer::{CellPart, CellRenderer, CellVisual, RenderContext};
pub use vertex_handler::{GestureState, UnionOptions, VertexChange, VertexHandler};
