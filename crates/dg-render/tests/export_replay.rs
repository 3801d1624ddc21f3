//! Integration tests: static export over a validated view.

use dg_core::{CellId, Geometry, GraphModel, GraphView, ShapeDefaults, Style};
use dg_render::export::{ExportHooks, ImageExport, NoHooks};
use dg_render::markup::Document;
use dg_render::shape::{Painter, Shape, ShapeKind};
use dg_render::text::ApproximateMeasurer;
use dg_render::{ShapeRegistry, SvgCanvas, XmlCanvas};
use pretty_assertions::assert_eq;
use std::sync::Arc;

fn diagram() -> (GraphModel, GraphView, CellId) {
    let mut model = GraphModel::new();
    let parent = model.default_parent();
    let (a, b) = model.update(|m| {
        let a = m
            .add_vertex(parent, Some("a"), Some("A"), Geometry::vertex(20.0, 20.0, 80.0, 40.0), "")
            .unwrap();
        let b = m
            .add_vertex(parent, Some("b"), Some("B"), Geometry::vertex(200.0, 20.0, 80.0, 40.0), "")
            .unwrap();
        m.add_vertex(a, Some("inner"), Some("I"), Geometry::vertex(5.0, 5.0, 10.0, 10.0), "")
            .unwrap();
        m.add_edge(parent, Some("e"), None, Some(a), Some(b), "").unwrap();
        (a, b)
    });
    let _ = b;
    let mut view = GraphView::default();
    view.validate(&model);
    (model, view, a)
}

#[test]
fn export_paints_states_depth_first() {
    let _ = env_logger::builder().is_test(true).try_init();
    let (model, view, _) = diagram();
    let registry = ShapeRegistry::default();
    let mut doc = Document::new("output");
    let root = doc.root();
    let mut c = XmlCanvas::new(&mut doc, root, &ShapeDefaults::default());

    let painted = ImageExport::new(&registry).draw_state(&model, &view, model.root(), &mut c, &NoHooks);
    assert_eq!(painted, 4);

    let calls = c.calls();
    let texts: Vec<usize> = calls
        .iter()
        .enumerate()
        .filter(|(_, t)| *t == "text")
        .map(|(i, _)| i)
        .collect();
    // a, inner, b carry labels; the edge does not.
    assert_eq!(texts.len(), 3);
    let first_rect = calls.iter().position(|t| t == "rect").unwrap();
    assert!(first_rect < texts[0]);
    let last_move = calls.iter().rposition(|t| t == "move").unwrap();
    assert!(last_move > texts[2]);
    assert_eq!(calls.iter().filter(|t| *t == "save").count(), calls.iter().filter(|t| *t == "restore").count());
}

#[test]
fn collapsed_children_are_not_exported() {
    let (mut model, _, a) = diagram();
    model.set_collapsed(a, true).unwrap();
    let mut view = GraphView::default();
    view.validate(&model);

    let registry = ShapeRegistry::default();
    let mut doc = Document::new("output");
    let root = doc.root();
    let mut c = XmlCanvas::new(&mut doc, root, &ShapeDefaults::default());
    let painted = ImageExport::new(&registry).draw_state(&model, &view, model.root(), &mut c, &NoHooks);
    assert_eq!(painted, 3);
}

#[derive(Debug)]
struct Badges;

impl ExportHooks for Badges {
    fn prepare_shape(&self, _state: &dg_core::CellState, shape: &mut Shape) {
        shape.fill = None;
    }

    fn overlays(&self, state: &dg_core::CellState, _scale: f64) -> Vec<Shape> {
        if !state.is_vertex() {
            return Vec::new();
        }
        let b = state.bounds;
        let mut badge = Shape::new(
            Painter::Builtin(ShapeKind::Ellipse),
            Arc::new(ShapeDefaults::default()),
        )
        .with_bounds(dg_core::Bounds::new(b.x + b.width - 8.0, b.y - 8.0, 16.0, 16.0));
        badge.apply(&Style::parse("fillColor=#FF0000").unwrap());
        vec![badge]
    }
}

#[test]
fn overlays_are_painted_after_every_cell() {
    let (model, view, _) = diagram();
    let registry = ShapeRegistry::default();
    let mut doc = Document::new("output");
    let root = doc.root();
    let mut c = XmlCanvas::new(&mut doc, root, &ShapeDefaults::default());
    let mut export = ImageExport::new(&registry);
    export.include_overlays = true;
    export.draw_state(&model, &view, model.root(), &mut c, &Badges);

    let calls = c.calls();
    let ellipses: Vec<usize> = calls
        .iter()
        .enumerate()
        .filter(|(_, t)| *t == "ellipse")
        .map(|(i, _)| i)
        .collect();
    assert_eq!(ellipses.len(), 3);
    let last_text = calls.iter().rposition(|t| t == "text").unwrap();
    assert!(ellipses[0] > last_text);
}

#[test]
fn svg_export_writes_shapes_and_labels() {
    let (model, view, _) = diagram();
    let registry = ShapeRegistry::default();
    let measurer = ApproximateMeasurer::default();
    let defaults = ShapeDefaults::default();
    let mut doc = Document::svg();
    let root = doc.root();
    {
        let mut c = SvgCanvas::new(&mut doc, root, &measurer, &defaults);
        ImageExport::new(&registry).draw_state(&model, &view, model.root(), &mut c, &NoHooks);
    }
    let markup = doc.to_markup();
    assert!(markup.contains("<rect"));
    assert!(markup.contains(">A</text>"));
    assert!(markup.contains("<path"));
}
