use super::*;
use crate::consts::ERASE_TOLERANCE_PX;

fn stroke(tool: ToolKind, points: Vec<Point>) -> Stroke {
    Stroke {
        id: "s".into(),
        tool,
        points,
        color: "#1f1f1f".into(),
        width: 2.0,
        text: if tool == ToolKind::Text { Some("hello".into()) } else { None },
        user_id: "u".into(),
    }
}

#[test]
fn pencil_hit_is_reflexive_on_every_recorded_point() {
    let points = vec![
        Point::new(0.0, 0.0),
        Point::new(13.5, 7.25),
        Point::new(40.0, 40.0),
        Point::new(-3.0, 12.0),
    ];
    let stroke = stroke(ToolKind::Pencil, points.clone());
    for p in points {
        assert!(stroke_hit(&stroke, p), "click exactly on a recorded point must hit");
    }
}

#[test]
fn pencil_miss_beyond_tolerance() {
    let stroke = stroke(ToolKind::Pencil, vec![Point::new(0.0, 0.0), Point::new(10.0, 0.0)]);
    assert!(!stroke_hit(&stroke, Point::new(10.0 + ERASE_TOLERANCE_PX + 0.1, 0.0)));
    // Both axes must be within tolerance, not just one.
    assert!(!stroke_hit(&stroke, Point::new(5.0, ERASE_TOLERANCE_PX + 0.1)));
}

#[test]
fn rectangle_hits_anywhere_inside_the_expanded_bounds() {
    let rect = stroke(ToolKind::Rectangle, vec![Point::new(10.0, 10.0), Point::new(50.0, 30.0)]);
    assert!(stroke_hit(&rect, Point::new(30.0, 20.0)), "interior");
    assert!(stroke_hit(&rect, Point::new(10.0 - ERASE_TOLERANCE_PX, 10.0)), "expanded edge");
    assert!(!stroke_hit(&rect, Point::new(60.0, 20.0)));

    // Extent points in reverse order describe the same box.
    let reversed = stroke(ToolKind::Rectangle, vec![Point::new(50.0, 30.0), Point::new(10.0, 10.0)]);
    assert!(stroke_hit(&reversed, Point::new(30.0, 20.0)));
}

#[test]
fn diamond_uses_the_same_expanded_bounds() {
    let stroke = stroke(ToolKind::Diamond, vec![Point::new(0.0, 0.0), Point::new(20.0, 20.0)]);
    assert!(stroke_hit(&stroke, Point::new(1.0, 1.0)), "bounding box corner counts");
    assert!(!stroke_hit(&stroke, Point::new(40.0, 40.0)));
}

#[test]
fn circle_hits_only_near_the_arc() {
    // Center (0,0), radius 10.
    let stroke = stroke(ToolKind::Circle, vec![Point::new(0.0, 0.0), Point::new(10.0, 0.0)]);
    assert!(stroke_hit(&stroke, Point::new(0.0, 10.0)), "on the arc");
    assert!(stroke_hit(&stroke, Point::new(10.0 + ERASE_TOLERANCE_PX, 0.0)), "just outside");
    assert!(!stroke_hit(&stroke, Point::new(0.0, 0.0)), "center is not the arc");
    assert!(!stroke_hit(&stroke, Point::new(30.0, 0.0)));
}

#[test]
fn arrow_hits_by_perpendicular_distance() {
    let stroke = stroke(ToolKind::Arrow, vec![Point::new(0.0, 0.0), Point::new(100.0, 0.0)]);
    assert!(stroke_hit(&stroke, Point::new(50.0, ERASE_TOLERANCE_PX)));
    assert!(!stroke_hit(&stroke, Point::new(50.0, ERASE_TOLERANCE_PX + 0.1)));
    // Beyond the endpoints the distance is measured to the endpoint.
    assert!(!stroke_hit(&stroke, Point::new(120.0, 0.0)));
    assert!(stroke_hit(&stroke, Point::new(104.0, 0.0)));
}

#[test]
fn text_hits_inside_its_fixed_box() {
    let stroke = stroke(ToolKind::Text, vec![Point::new(200.0, 100.0), Point::new(200.0, 100.0)]);
    assert!(stroke_hit(&stroke, Point::new(200.0, 100.0)));
    assert!(stroke_hit(&stroke, Point::new(200.0 + 59.0, 100.0 + 15.0)));
    assert!(!stroke_hit(&stroke, Point::new(200.0 + 61.0, 100.0)));
    assert!(!stroke_hit(&stroke, Point::new(200.0, 100.0 + 17.0)));
}

#[test]
fn degenerate_strokes_never_hit() {
    // A shape stroke missing its second extent point has no renderable
    // geometry and is not erasable.
    let stroke = stroke(ToolKind::Rectangle, vec![Point::new(0.0, 0.0)]);
    assert!(!stroke_hit(&stroke, Point::new(0.0, 0.0)));
}

#[test]
fn search_order_is_least_recently_added_first() {
    let older = stroke(ToolKind::Pencil, vec![Point::new(5.0, 5.0)]);
    let mut newer = stroke(ToolKind::Pencil, vec![Point::new(5.0, 5.0)]);
    newer.id = "newer".into();
    let strokes = vec![older, newer];

    assert_eq!(find_hit(&strokes, Point::new(5.0, 5.0)), Some(0));
}

#[test]
fn find_hit_miss_is_none() {
    let strokes = vec![stroke(ToolKind::Pencil, vec![Point::new(0.0, 0.0)])];
    assert_eq!(find_hit(&strokes, Point::new(500.0, 500.0)), None);
}

#[test]
fn segment_distance_handles_zero_length_segments() {
    let d = distance_to_segment(Point::new(3.0, 4.0), Point::new(0.0, 0.0), Point::new(0.0, 0.0));
    assert!((d - 5.0).abs() < 1e-9);
}
