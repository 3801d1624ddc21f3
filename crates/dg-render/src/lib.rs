pub mod canvas;
pub mod export;
pub mod gradient;
pub mod markup;
pub mod registry;
pub mod shape;
pub mod text;

pub use canvas::{Canvas2D, HtmlCanvas, SvgCanvas, TextOptions, VmlCanvas, XmlCanvas};
pub use export::{ExportHooks, ImageExport, NoHooks};
pub use gradient::GradientKey;
pub use markup::{Document, NodeRef};
pub use registry::{RegistryError, ShapeRegistry};
pub use shape::stencil::{Stencil, StencilOp};
pub use shape::{Painter, Shape, ShapeKind, ShapePainter};
pub use text::{ApproximateMeasurer, TextMeasurer};
