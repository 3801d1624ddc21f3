//! Integration tests: cell renderer lifecycle, paint order, color
//! keywords, input dispatch, and context actions on a live graph.

use dg_core::style::keys;
use dg_core::{CellId, Color, Geometry, Point, ShapeDefaults};
use dg_editor::renderer::resolve_color;
use dg_editor::{CellOverlay, CellPart, ContextAction, Graph, ImageRef, InputEvent};
use dg_render::{Document, XmlCanvas};
use pretty_assertions::assert_eq;
use std::cell::Cell;
use std::rc::Rc;

fn init_logs() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn vertex(graph: &mut Graph, parent: CellId, x: f64, y: f64, style: &str) -> CellId {
    graph
        .model
        .add_vertex(parent, None, None, Geometry::vertex(x, y, 40.0, 40.0), style)
        .unwrap()
}

fn position(graph: &Graph, cell: CellId) -> usize {
    let node = graph.renderer.visual(cell).unwrap().shape.node().unwrap();
    graph
        .doc
        .children(graph.draw_pane())
        .iter()
        .position(|n| *n == node)
        .unwrap()
}

// ─── Lifecycle ──────────────────────────────────────────────────────────

#[test]
fn removed_cells_lose_their_nodes() {
    init_logs();
    let mut graph = Graph::default();
    let p = graph.model.default_parent();
    let v = graph
        .model
        .add_vertex(p, None, Some("hello"), Geometry::vertex(0.0, 0.0, 80.0, 30.0), "")
        .unwrap();
    assert_eq!(graph.refresh(), 1);

    let visual = graph.renderer.visual(v).unwrap();
    let shape = visual.shape.node().unwrap();
    let text = visual.text.as_ref().and_then(|t| t.node()).unwrap();
    assert!(graph.doc.contains(shape) && graph.doc.contains(text));

    graph.model.remove_cell(v).unwrap();
    graph.refresh();
    assert!(graph.renderer.visual(v).is_none());
    assert!(!graph.doc.contains(shape));
    assert!(!graph.doc.contains(text));
}

#[test]
fn unchanged_states_are_not_repainted() {
    let mut graph = Graph::default();
    let p = graph.model.default_parent();
    let v = vertex(&mut graph, p, 0.0, 0.0, "");
    assert_eq!(graph.refresh(), 1);
    assert_eq!(graph.refresh(), 0);

    graph.model.set_style_value(v, keys::FILL_COLOR, "#FF0000").unwrap();
    assert_eq!(graph.refresh(), 1);
    assert_eq!(
        graph.renderer.visual(v).unwrap().shape.fill,
        Color::parse("#FF0000")
    );
}

#[test]
fn paint_order_follows_the_model() {
    let mut graph = Graph::default();
    let p = graph.model.default_parent();
    let first = vertex(&mut graph, p, 0.0, 0.0, "");
    let second = vertex(&mut graph, p, 50.0, 0.0, "");
    graph.refresh();
    assert!(position(&graph, first) < position(&graph, second));

    let front = graph
        .model
        .add_cell(p, dg_core::Cell::new(CellId::intern("front"), dg_core::CellKind::Vertex), Some(0))
        .unwrap();
    graph
        .model
        .set_geometry(front, Geometry::vertex(0.0, 50.0, 40.0, 40.0))
        .unwrap();
    graph.refresh();
    assert!(position(&graph, front) < position(&graph, first));
}

#[test]
fn overlays_are_drawn_and_removed() {
    let mut graph = Graph::default();
    let p = graph.model.default_parent();
    let v = vertex(&mut graph, p, 0.0, 0.0, "");
    graph.refresh();

    let badge = CellOverlay::new(ImageRef::new("images/warning.gif", 16.0, 16.0)).with_tooltip("check me");
    graph.add_overlay(v, badge);
    let node = graph.renderer.visual(v).unwrap().overlays[0].node().unwrap();
    assert_eq!(
        graph.renderer.cell_for_node(&graph.doc, node),
        Some((v, CellPart::Overlay(0)))
    );

    assert_eq!(graph.remove_overlays(v).len(), 1);
    assert!(graph.renderer.visual(v).unwrap().overlays.is_empty());
    assert!(!graph.doc.contains(node));
}

// ─── Color keywords ─────────────────────────────────────────────────────

#[test]
fn keywords_resolve_against_parents_and_swimlanes() {
    let mut graph = Graph::default();
    let p = graph.model.default_parent();
    let lane = graph
        .model
        .add_vertex(
            p,
            None,
            None,
            Geometry::vertex(0.0, 0.0, 200.0, 200.0),
            "shape=swimlane;fillColor=#FF0000;strokeColor=#00FF00",
        )
        .unwrap();
    let child = vertex(&mut graph, lane, 10.0, 30.0, "fillColor=swimlane;strokeColor=inherit");
    let marked = vertex(&mut graph, p, 300.0, 0.0, "fillColor=indicated;indicatorColor=#0000FF");
    graph.refresh();

    assert_eq!(
        resolve_color(&graph.model, &graph.view, child, keys::FILL_COLOR),
        Color::parse("#FF0000")
    );
    assert_eq!(
        resolve_color(&graph.model, &graph.view, child, keys::STROKE_COLOR),
        Color::parse("#00FF00")
    );
    assert_eq!(
        resolve_color(&graph.model, &graph.view, marked, keys::FILL_COLOR),
        Color::parse("#0000FF")
    );
    // The painted shape carries the resolved colors.
    assert_eq!(
        graph.renderer.visual(child).unwrap().shape.fill,
        Color::parse("#FF0000")
    );
}

// ─── Input ──────────────────────────────────────────────────────────────

#[test]
fn pointer_events_are_swallowed_during_gestures() {
    let mut graph = Graph::default();
    let p = graph.model.default_parent();
    let v = vertex(&mut graph, p, 0.0, 0.0, "");
    graph.refresh();
    let seen = Rc::new(Cell::new(0));
    let counter = Rc::clone(&seen);
    graph.renderer.add_listener(move |_| counter.set(counter.get() + 1));
    let node = graph.renderer.visual(v).and_then(|vis| vis.shape.node());

    assert!(graph.dispatch(&InputEvent::GestureStart, None).is_none());
    assert!(graph.dispatch(&InputEvent::mouse_down(10.0, 10.0), node).is_none());
    assert!(graph.renderer.gesture_in_progress());
    assert!(graph.dispatch(&InputEvent::GestureEnd, None).is_none());

    let me = graph.dispatch(&InputEvent::mouse_down(10.0, 10.0), node).unwrap();
    assert_eq!(me.cell, Some(v));
    assert_eq!(seen.get(), 1);
}

#[test]
fn pressing_the_fold_control_toggles_the_group() {
    init_logs();
    let mut graph = Graph::default();
    let p = graph.model.default_parent();
    let group = graph
        .model
        .add_vertex(p, None, None, Geometry::vertex(0.0, 0.0, 200.0, 100.0), "")
        .unwrap();
    let child = vertex(&mut graph, group, 10.0, 10.0, "");
    graph.refresh();

    let control = graph.renderer.visual(group).unwrap().control.as_ref().unwrap();
    let node = control.node().unwrap();
    let at = control.bounds.center();
    let me = graph
        .dispatch(&InputEvent::mouse_down(at.x, at.y), Some(node))
        .unwrap();

    assert!(me.is_consumed());
    assert!(graph.model.get(group).unwrap().collapsed);
    assert!(graph.view.state(child).is_none());
    assert!(graph.renderer.visual(child).is_none());
}

// ─── Context actions ────────────────────────────────────────────────────

#[test]
fn context_actions_depend_on_what_was_clicked() {
    let mut graph = Graph::default();
    let p = graph.model.default_parent();
    let a = vertex(&mut graph, p, 0.0, 0.0, "");
    let b = vertex(&mut graph, p, 300.0, 0.0, "");
    let group = vertex(&mut graph, p, 0.0, 200.0, "");
    vertex(&mut graph, group, 5.0, 5.0, "");
    let edge = graph.model.add_edge(p, None, None, Some(a), Some(b), "").unwrap();
    graph
        .model
        .set_geometry(edge, Geometry::edge().with_points(vec![Point::new(150.0, 100.0)]))
        .unwrap();
    graph.refresh();

    assert_eq!(
        graph.context_action(edge, Point::new(152.0, 98.0)),
        ContextAction::RemoveWaypoint(1)
    );
    assert_eq!(
        graph.context_action(edge, Point::new(90.0, 60.0)),
        ContextAction::AddWaypoint
    );
    assert_eq!(graph.context_action(group, Point::ZERO), ContextAction::Ungroup);
    assert_eq!(graph.context_action(a, Point::ZERO), ContextAction::None);
}

// ─── Export ─────────────────────────────────────────────────────────────

#[test]
fn export_paints_every_visible_state() {
    let mut graph = Graph::default();
    let p = graph.model.default_parent();
    let a = vertex(&mut graph, p, 0.0, 0.0, "");
    let b = vertex(&mut graph, p, 100.0, 0.0, "");
    graph.model.add_edge(p, None, None, Some(a), Some(b), "").unwrap();
    graph.refresh();

    let mut doc = Document::new("xml");
    let root = doc.root();
    let mut canvas = XmlCanvas::new(&mut doc, root, &ShapeDefaults::default());
    assert_eq!(graph.export(&mut canvas, false), 3);
}
