pub mod color;
pub mod config;
pub mod geom;
pub mod geometry;
pub mod id;
pub mod model;
pub mod style;
pub mod view;

pub use color::Color;
pub use config::{Config, EdgeHandleConfig, GraphConfig, HandleConfig, ShapeDefaults};
pub use geom::{Bounds, Point, Vec2};
pub use geometry::Geometry;
pub use id::CellId;
pub use model::{Cell, CellKind, Change, GraphModel, ModelError, UpdateGuard};
pub use style::{Direction, Style, StyleError, Stylesheet, keys};
pub use view::{CellState, GraphView};
