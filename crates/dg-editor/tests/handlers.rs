//! Integration tests: vertex and edge handler gestures end to end.
//!
//! Each test drives a handler with down/move/up events against a live
//! graph and checks what reached the model, what the user was told,
//! and that the update closed cleanly.

use dg_core::style::keys;
use dg_core::{CellId, Config, Geometry, Point};
use dg_editor::vertex_handler::rotate_cell;
use dg_editor::{
    CellScope, EdgeChange, EdgeGesture, EdgeHandle, EdgeHandler, GestureState, Graph, GraphHandlerPolicy,
    GraphMouseEvent, ManualClock, Modifiers, MouseEventKind, PointerKind, ValidationError, VertexChange,
    VertexHandle, VertexHandler,
};
use pretty_assertions::assert_eq;
use std::cell::Cell;
use std::rc::Rc;

fn init_logs() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn me(kind: MouseEventKind, x: f64, y: f64) -> GraphMouseEvent {
    GraphMouseEvent::new(kind, Point::new(x, y))
}

fn down(x: f64, y: f64) -> GraphMouseEvent {
    me(MouseEventKind::Down, x, y)
}

fn drag(x: f64, y: f64) -> GraphMouseEvent {
    me(MouseEventKind::Move, x, y)
}

fn up(x: f64, y: f64) -> GraphMouseEvent {
    me(MouseEventKind::Up, x, y)
}

/// Counts listener flushes on the model.
fn count_flushes(graph: &mut Graph) -> Rc<Cell<usize>> {
    let flushes = Rc::new(Cell::new(0));
    let counter = Rc::clone(&flushes);
    graph.model.subscribe(move |_| counter.set(counter.get() + 1));
    flushes
}

// ─── Vertex handler ─────────────────────────────────────────────────────

fn graph_with_box(graph: Graph) -> (Graph, CellId) {
    let mut graph = graph;
    let p = graph.model.default_parent();
    let v = graph
        .model
        .add_vertex(p, None, None, Geometry::vertex(20.0, 20.0, 80.0, 40.0), "")
        .unwrap();
    graph.refresh();
    (graph, v)
}

#[test]
fn bottom_right_resize_commits_in_one_update() {
    init_logs();
    let (mut graph, v) = graph_with_box(Graph::default());
    let flushes = count_flushes(&mut graph);
    let mut h = VertexHandler::new(&mut graph, v).unwrap();

    let mut e = down(100.0, 60.0);
    h.mouse_down(&mut graph, &mut e);
    assert!(e.is_consumed());

    h.mouse_move(&mut graph, &mut drag(110.0, 70.0));
    // The model is untouched until release.
    assert_eq!(graph.model.geometry(v).unwrap().bounds.width, 80.0);
    assert_eq!(flushes.get(), 0);

    let change = h.mouse_up(&mut graph, &mut up(110.0, 70.0)).unwrap();
    assert_eq!(change, VertexChange::Resized(dg_core::Bounds::new(20.0, 20.0, 90.0, 50.0)));
    assert_eq!(
        graph.model.geometry(v).unwrap().bounds,
        dg_core::Bounds::new(20.0, 20.0, 90.0, 50.0)
    );
    assert_eq!(graph.model.update_level(), 0);
    assert_eq!(flushes.get(), 1);
    assert!(h.is_idle());
    // Handles follow the new state.
    let se = h.handle_bounds(VertexHandle::Sizer(7)).unwrap().center();
    assert!((se.x - 110.5).abs() < 1.0 && (se.y - 70.5).abs() < 1.0, "{se:?}");
}

#[test]
fn press_and_release_in_place_changes_nothing() {
    let (mut graph, v) = graph_with_box(Graph::default());
    let flushes = count_flushes(&mut graph);
    let mut h = VertexHandler::new(&mut graph, v).unwrap();
    h.mouse_down(&mut graph, &mut down(100.0, 60.0));
    let change = h.mouse_up(&mut graph, &mut up(100.0, 60.0)).unwrap();
    assert_eq!(change, VertexChange::Unchanged);
    assert_eq!(flushes.get(), 0);
}

#[test]
fn resize_hint_hides_after_the_pointer_rests() {
    let clock = Rc::new(ManualClock::default());
    let (mut graph, v) = graph_with_box(Graph::default().with_clock(Rc::clone(&clock)));
    let mut h = VertexHandler::new(&mut graph, v).unwrap();

    h.mouse_down(&mut graph, &mut down(100.0, 60.0));
    h.mouse_move(&mut graph, &mut drag(110.0, 70.0));
    assert_eq!(h.hint().text(), Some("90 x 50"));

    clock.advance(300);
    h.mouse_move(&mut graph, &mut drag(120.0, 70.0));
    clock.advance(300);
    assert!(!h.poll_hint(&mut graph));
    assert_eq!(h.hint().text(), Some("100 x 50"));
    clock.advance(200);
    assert!(h.poll_hint(&mut graph));
    assert!(!h.hint().is_visible());
}

#[test]
fn rotation_handle_turns_the_cell() {
    let (mut graph, v) = graph_with_box(Graph::default());
    let mut h = VertexHandler::new(&mut graph, v).unwrap();

    // Handle sits above the top edge, center is (60, 40).
    let mut press = down(60.0, 4.0);
    h.mouse_down(&mut graph, &mut press);
    assert!(press.is_consumed());
    assert!(matches!(
        h.gesture(),
        GestureState::Armed {
            handle: VertexHandle::Rotation,
            ..
        }
    ));
    h.mouse_move(&mut graph, &mut drag(200.0, 40.0));
    let change = h.mouse_up(&mut graph, &mut up(200.0, 40.0)).unwrap();

    assert_eq!(change, VertexChange::Rotated(90.0));
    assert!((graph.model.style(v).unwrap().rotation() - 90.0).abs() < 0.01);
    assert_eq!(graph.model.update_level(), 0);
}

#[test]
fn rotation_raster_follows_grid_snapping() {
    // 7 degrees off vertical, right on the handle radius (h/2 + 16).
    let (sin, cos) = 7f64.to_radians().sin_cos();
    let near = Point::new(60.0 + 36.0 * sin, 40.0 - 36.0 * cos);

    let (mut graph, v) = graph_with_box(Graph::default());
    let mut h = VertexHandler::new(&mut graph, v).unwrap();
    h.mouse_down(&mut graph, &mut down(60.0, 4.0));
    h.mouse_move(&mut graph, &mut drag(near.x, near.y));
    let change = h.mouse_up(&mut graph, &mut up(near.x, near.y)).unwrap();
    assert_eq!(change, VertexChange::Unchanged);

    let alt = Modifiers {
        alt: true,
        ..Modifiers::NONE
    };
    h.mouse_down(&mut graph, &mut down(60.0, 4.0));
    h.mouse_move(&mut graph, &mut drag(near.x, near.y).with_modifiers(alt));
    let change = h
        .mouse_up(&mut graph, &mut up(near.x, near.y).with_modifiers(alt))
        .unwrap();
    let VertexChange::Rotated(angle) = change else {
        panic!("expected a rotation, got {change:?}");
    };
    assert!((angle - 7.0).abs() < 0.01, "{angle}");
}

#[test]
fn label_handle_moves_the_label_offset() {
    let mut config = Config::default();
    config.handles.manual_label_handle = true;
    let (mut graph, v) = graph_with_box(Graph::new(config));
    let mut h = VertexHandler::new(&mut graph, v).unwrap();
    assert!(h.handles().any(|k| k == VertexHandle::Label));

    h.mouse_down(&mut graph, &mut down(60.0, 40.0));
    h.mouse_move(&mut graph, &mut drag(60.0, 70.0));
    assert!(matches!(h.gesture(), GestureState::DraggingLabel { .. }));
    assert_eq!(graph.model.geometry(v).unwrap().offset, None);
    let change = h.mouse_up(&mut graph, &mut up(60.0, 70.0)).unwrap();

    assert_eq!(change, VertexChange::LabelMoved(Point::new(0.0, 30.0)));
    assert_eq!(graph.model.geometry(v).unwrap().offset, Some(Point::new(0.0, 30.0)));
}

#[test]
fn touch_moves_inside_tolerance_stay_armed() {
    let (mut graph, v) = graph_with_box(Graph::default());
    let flushes = count_flushes(&mut graph);
    let mut h = VertexHandler::new(&mut graph, v).unwrap();

    h.mouse_down(&mut graph, &mut down(100.0, 60.0).with_pointer(PointerKind::Touch));
    let mut wobble = drag(103.0, 60.0).with_pointer(PointerKind::Touch);
    h.mouse_move(&mut graph, &mut wobble);
    assert!(wobble.is_consumed());
    assert_eq!(
        h.gesture(),
        GestureState::Armed {
            handle: VertexHandle::Sizer(7),
            start: Point::new(100.0, 60.0),
        }
    );

    let change = h
        .mouse_up(&mut graph, &mut up(103.0, 60.0).with_pointer(PointerKind::Touch))
        .unwrap();
    assert_eq!(change, VertexChange::Unchanged);
    assert_eq!(flushes.get(), 0);
    assert!(h.is_idle());
}

#[test]
fn live_preview_paints_without_touching_the_model() {
    let mut config = Config::default();
    config.handles.live_preview = true;
    let (mut graph, v) = graph_with_box(Graph::new(config));
    let flushes = count_flushes(&mut graph);
    let mut h = VertexHandler::new(&mut graph, v).unwrap();

    h.mouse_down(&mut graph, &mut down(100.0, 60.0));
    h.mouse_move(&mut graph, &mut drag(110.0, 70.0));
    let grown = dg_core::Bounds::new(20.0, 20.0, 90.0, 50.0);
    let original = dg_core::Bounds::new(20.0, 20.0, 80.0, 40.0);
    assert_eq!(graph.renderer.visual(v).unwrap().shape.bounds, grown);
    assert_eq!(graph.view.state(v).unwrap().bounds, original);
    assert_eq!(graph.model.geometry(v).unwrap().bounds, original);
    assert_eq!(flushes.get(), 0);

    let change = h.mouse_up(&mut graph, &mut up(110.0, 70.0)).unwrap();
    assert_eq!(change, VertexChange::Resized(grown));
    assert_eq!(graph.model.geometry(v).unwrap().bounds, grown);
    assert_eq!(graph.renderer.visual(v).unwrap().shape.bounds, grown);
}

#[test]
fn rotation_round_trip_restores_children() {
    init_logs();
    let mut graph = Graph::default();
    let p = graph.model.default_parent();
    let group = graph
        .model
        .add_vertex(p, None, None, Geometry::vertex(0.0, 0.0, 100.0, 100.0), "")
        .unwrap();
    let child = graph
        .model
        .add_vertex(group, None, None, Geometry::vertex(10.0, 10.0, 20.0, 20.0), "")
        .unwrap();
    graph.refresh();
    let before = graph.model.geometry(child).unwrap().bounds;

    rotate_cell(&mut graph.model, &graph.view, group, 30.0, Some(p)).unwrap();
    assert_eq!(graph.model.update_level(), 0);
    let style = graph.model.style(group).unwrap();
    assert!((style.rotation() - 30.0).abs() < 0.01);
    let turned = graph.model.geometry(child).unwrap().bounds;
    assert!((turned.x - before.x).abs() > 1.0);

    rotate_cell(&mut graph.model, &graph.view, group, -30.0, Some(p)).unwrap();
    assert!(graph.model.style(group).unwrap().rotation().abs() < 0.01);
    let after = graph.model.geometry(child).unwrap().bounds;
    assert!((after.x - before.x).abs() < 0.01);
    assert!((after.y - before.y).abs() < 0.01);
    let child_rotation = graph.model.style(child).unwrap().get_number(keys::ROTATION, 0.0);
    assert!(child_rotation.abs() < 0.01 || (child_rotation - 360.0).abs() < 0.01);
}

// ─── Edge handler ───────────────────────────────────────────────────────

struct Diagram {
    graph: Graph,
    a: CellId,
    b: CellId,
    c: CellId,
    edge: CellId,
}

fn diagram(graph: Graph, points: Vec<Point>, label: Option<&str>) -> Diagram {
    let mut graph = graph;
    let p = graph.model.default_parent();
    let a = graph
        .model
        .add_vertex(p, None, None, Geometry::vertex(0.0, 0.0, 40.0, 40.0), "")
        .unwrap();
    let b = graph
        .model
        .add_vertex(p, None, None, Geometry::vertex(300.0, 0.0, 40.0, 40.0), "")
        .unwrap();
    let c = graph
        .model
        .add_vertex(p, None, None, Geometry::vertex(300.0, 200.0, 40.0, 40.0), "")
        .unwrap();
    let edge = graph.model.add_edge(p, None, label, Some(a), Some(b), "").unwrap();
    graph
        .model
        .set_geometry(edge, Geometry::edge().with_points(points))
        .unwrap();
    graph.refresh();
    Diagram { graph, a, b, c, edge }
}

#[test]
fn interior_drag_snaps_to_the_grid() {
    init_logs();
    let Diagram { mut graph, edge, .. } = diagram(Graph::default(), vec![Point::new(100.0, 100.0)], None);
    let flushes = count_flushes(&mut graph);
    let mut h = EdgeHandler::new(&mut graph, edge).unwrap();

    h.mouse_down(&mut graph, &mut down(100.0, 100.0));
    h.mouse_move(&mut graph, &mut drag(148.0, 83.0));
    assert_eq!(h.hint().text(), Some("150, 80"));
    let change = h.mouse_up(&mut graph, &mut up(148.0, 83.0)).unwrap();

    assert_eq!(change, EdgeChange::PointsChanged(vec![Point::new(150.0, 80.0)]));
    assert_eq!(graph.model.geometry(edge).unwrap().points, vec![Point::new(150.0, 80.0)]);
    assert_eq!(graph.model.update_level(), 0);
    assert_eq!(flushes.get(), 1);
    assert!(h.is_idle());
}

#[test]
fn dragging_the_middle_of_a_straight_edge_adds_a_waypoint() {
    let Diagram {
        mut graph, a, b, edge, ..
    } = diagram(Graph::default(), Vec::new(), None);
    let flushes = count_flushes(&mut graph);
    let mut h = EdgeHandler::new(&mut graph, edge).unwrap();
    // Ends at (40, 20) and (300, 20), the virtual bend midway.
    assert_eq!(h.abspoints().len(), 3);

    h.mouse_down(&mut graph, &mut down(170.0, 20.0));
    assert_eq!(
        h.gesture(),
        &EdgeGesture::Armed {
            handle: EdgeHandle::Point(1),
            start: Point::new(170.0, 20.0),
        }
    );
    h.mouse_move(&mut graph, &mut drag(148.0, 83.0));
    let change = h.mouse_up(&mut graph, &mut up(148.0, 83.0)).unwrap();

    assert_eq!(change, EdgeChange::PointsChanged(vec![Point::new(150.0, 80.0)]));
    assert_eq!(graph.model.geometry(edge).unwrap().points, vec![Point::new(150.0, 80.0)]);
    assert_eq!(graph.model.terminal(edge, true), Some(a));
    assert_eq!(graph.model.terminal(edge, false), Some(b));
    assert_eq!(flushes.get(), 1);
    // The waypoint is real now.
    assert!(!h.has_virtual_bend());
    assert_eq!(h.abspoints()[1], Point::new(150.0, 80.0));
}

#[test]
fn preview_of_an_edge_without_waypoints_adds_one() {
    let Diagram { mut graph, edge, .. } = diagram(Graph::default(), Vec::new(), None);
    let h = EdgeHandler::new(&mut graph, edge).unwrap();
    assert_eq!(
        h.preview_points(&graph, Point::new(150.0, 80.0), 1),
        vec![Point::new(150.0, 80.0)]
    );
}

#[test]
fn dragging_the_target_onto_another_vertex_reconnects() {
    init_logs();
    let Diagram {
        mut graph, a, c, edge, ..
    } = diagram(Graph::default(), Vec::new(), None);
    let mut h = EdgeHandler::new(&mut graph, edge).unwrap();

    // Target end sits on the left side of b.
    h.mouse_down(&mut graph, &mut down(300.0, 20.0));
    h.mouse_move(&mut graph, &mut drag(320.0, 220.0));
    assert_eq!(h.marker().and_then(|m| m.valid_state()), Some(c));

    let change = h.mouse_up(&mut graph, &mut up(320.0, 220.0)).unwrap();
    assert_eq!(change, EdgeChange::Connected(edge));
    assert_eq!(graph.model.terminal(edge, false), Some(c));
    assert_eq!(graph.model.terminal(edge, true), Some(a));
    assert!(graph.take_alerts().is_empty());
}

#[test]
fn ctrl_release_connects_a_clone() {
    let Diagram {
        mut graph, a, b, c, edge,
    } = diagram(Graph::default(), Vec::new(), None);
    let mut h = EdgeHandler::new(&mut graph, edge).unwrap();

    h.mouse_down(&mut graph, &mut down(300.0, 20.0));
    h.mouse_move(&mut graph, &mut drag(320.0, 220.0));
    let mut release = up(320.0, 220.0).with_modifiers(Modifiers::ctrl());
    let EdgeChange::Connected(copy) = h.mouse_up(&mut graph, &mut release).unwrap() else {
        panic!("expected a connection");
    };

    assert_ne!(copy, edge);
    assert_eq!(graph.model.terminal(copy, true), Some(a));
    assert_eq!(graph.model.terminal(copy, false), Some(c));
    assert_eq!(graph.model.terminal(edge, false), Some(b));
    assert_eq!(graph.model.update_level(), 0);
}

#[test]
fn dangling_release_pins_the_end() {
    let Diagram { mut graph, edge, .. } = diagram(Graph::default(), Vec::new(), None);
    let mut h = EdgeHandler::new(&mut graph, edge).unwrap();

    h.mouse_down(&mut graph, &mut down(300.0, 20.0));
    h.mouse_move(&mut graph, &mut drag(200.0, 300.0));
    let change = h.mouse_up(&mut graph, &mut up(200.0, 300.0)).unwrap();

    assert_eq!(change, EdgeChange::TerminalMoved(Point::new(200.0, 300.0)));
    assert_eq!(graph.model.terminal(edge, false), None);
    assert_eq!(
        graph.model.geometry(edge).unwrap().target_point,
        Some(Point::new(200.0, 300.0))
    );
}

#[test]
fn dangling_release_is_blocked_when_disallowed() {
    let mut config = Config::default();
    config.graph.allow_dangling_edges = false;
    let Diagram { mut graph, b, edge, .. } = diagram(Graph::new(config), Vec::new(), None);
    let mut h = EdgeHandler::new(&mut graph, edge).unwrap();

    h.mouse_down(&mut graph, &mut down(300.0, 20.0));
    h.mouse_move(&mut graph, &mut drag(200.0, 300.0));
    let change = h.mouse_up(&mut graph, &mut up(200.0, 300.0)).unwrap();

    assert_eq!(change, EdgeChange::Blocked);
    assert_eq!(graph.model.terminal(edge, false), Some(b));
    assert!(graph.take_alerts().is_empty());
}

#[derive(Debug)]
struct Refuse(&'static str);

impl GraphHandlerPolicy for Refuse {
    fn validate_edge(
        &self,
        _scope: CellScope<'_>,
        _edge: CellId,
        _source: Option<CellId>,
        _target: Option<CellId>,
    ) -> ValidationError {
        ValidationError::Message(self.0.to_string())
    }
}

#[test]
fn refused_connections_alert_only_with_a_message() {
    for (message, expected, alerts) in [
        ("no loops here", EdgeChange::Rejected("no loops here".into()), vec!["no loops here".to_string()]),
        ("", EdgeChange::Blocked, Vec::new()),
    ] {
        let Diagram {
            mut graph, b, edge, ..
        } = diagram(Graph::default().with_policy(Refuse(message)), Vec::new(), None);
        let flushes = count_flushes(&mut graph);
        let mut h = EdgeHandler::new(&mut graph, edge).unwrap();

        h.mouse_down(&mut graph, &mut down(300.0, 20.0));
        h.mouse_move(&mut graph, &mut drag(320.0, 220.0));
        assert!(h.marker().is_some_and(|m| m.marked().is_some() && !m.has_valid_state()));
        let change = h.mouse_up(&mut graph, &mut up(320.0, 220.0)).unwrap();

        assert_eq!(change, expected);
        assert_eq!(graph.take_alerts(), alerts);
        assert_eq!(graph.model.terminal(edge, false), Some(b));
        assert_eq!(flushes.get(), 0);
    }
}

#[test]
fn label_drag_stores_an_offset() {
    // Without a virtual bend the label handle is the only one midway.
    let mut config = Config::default();
    config.edges.virtual_bend = false;
    let Diagram { mut graph, edge, .. } = diagram(Graph::new(config), Vec::new(), Some("flow"));
    let mut h = EdgeHandler::new(&mut graph, edge).unwrap();
    assert!(h.is_label_visible());

    // Route runs from (40, 20) to (300, 20); the label sits midway.
    h.mouse_down(&mut graph, &mut down(170.0, 20.0));
    h.mouse_move(&mut graph, &mut drag(170.0, 60.0));
    let change = h.mouse_up(&mut graph, &mut up(170.0, 60.0)).unwrap();

    assert_eq!(change, EdgeChange::LabelMoved(Point::new(0.0, 40.0)));
    assert_eq!(graph.model.geometry(edge).unwrap().offset, Some(Point::new(0.0, 40.0)));
}
