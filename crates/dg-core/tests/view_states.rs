//! Integration tests: model edits flowing into view states.

use dg_core::{Geometry, GraphModel, GraphView, Point, Style};
use pretty_assertions::assert_eq;

#[test]
fn children_and_edges_follow_scale_and_translate() {
    let mut model = GraphModel::new();
    let p = model.default_parent();
    let (group, child, e) = model.update(|m| {
        let group = m
            .add_vertex(p, Some("g"), None, Geometry::vertex(100.0, 50.0, 200.0, 100.0), "")
            .unwrap();
        let child = m
            .add_vertex(group, Some("c"), None, Geometry::vertex(10.0, 10.0, 20.0, 20.0), "")
            .unwrap();
        let e = m.add_edge(p, Some("ge"), Some("x"), Some(group), None, "").unwrap();
        let mut geo = Geometry::edge();
        geo.target_point = Some(Point::new(400.0, 100.0));
        m.set_geometry(e, geo).unwrap();
        (group, child, e)
    });

    let mut view = GraphView::default();
    view.scale = 2.0;
    view.translate = dg_core::Vec2::new(5.0, 0.0);
    view.validate(&model);

    let g = view.state(group).unwrap();
    assert_eq!((g.bounds.x, g.bounds.y, g.bounds.width), (210.0, 100.0, 400.0));
    let c = view.state(child).unwrap();
    assert_eq!((c.bounds.x, c.bounds.y, c.bounds.width), (230.0, 120.0, 40.0));
    assert_eq!(c.parent, Some(group));

    let edge = view.state(e).unwrap();
    let end = *edge.absolute_points.last().unwrap();
    assert_eq!(end, Point::new(810.0, 200.0));
    // Leaves the group on its right side.
    assert!((edge.absolute_points[0].x - 610.0).abs() < 0.01);
    assert_eq!(edge.value.as_deref(), Some("x"));

    let back = view.to_model(Point::new(230.0, 120.0), Some(group));
    assert_eq!(back, Point::new(10.0, 10.0));
}

#[test]
fn dangling_edge_without_point_has_no_state() {
    let mut model = GraphModel::new();
    let p = model.default_parent();
    let a = model
        .add_vertex(p, Some("da"), None, Geometry::vertex(0.0, 0.0, 10.0, 10.0), "")
        .unwrap();
    let e = model.add_edge(p, Some("de"), None, Some(a), None, "").unwrap();
    let mut view = GraphView::default();
    view.validate(&model);
    assert!(view.state(a).is_some());
    assert!(view.state(e).is_none());
    assert_eq!(view.states().count(), 1);
}

#[test]
fn inline_style_overrides_defaults() {
    let mut model = GraphModel::new();
    let p = model.default_parent();
    let a = model
        .add_vertex(
            p,
            Some("sa"),
            None,
            Geometry::vertex(0.0, 0.0, 10.0, 10.0),
            "shape=ellipse;fillColor=none",
        )
        .unwrap();
    let mut view = GraphView::default();
    view.validate(&model);
    let style: &Style = &view.state(a).unwrap().style;
    assert_eq!(style.get("shape"), Some("ellipse"));
    assert_eq!(style.get_color("fillColor"), None);
    assert_eq!(style.get("strokeColor"), Some("#6482B9"));
}
