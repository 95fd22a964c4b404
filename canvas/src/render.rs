//! Immediate-mode stroke rendering.
//!
//! Rendering is a pure function of the stroke value: a stroke committed
//! locally and the same stroke received from the relay go through the same
//! routine and produce the same pixels.

use protocol::{Point, Stroke, ToolKind};
use web_sys::CanvasRenderingContext2d;

use crate::consts::{ARROW_HEAD_LEN, TEXT_FONT};

/// Clear a surface.
pub fn clear(ctx: &CanvasRenderingContext2d, width: f64, height: f64) {
    ctx.clear_rect(0.0, 0.0, width, height);
}

/// Draw one stroke onto a 2d context.
pub fn draw_stroke(ctx: &CanvasRenderingContext2d, stroke: &Stroke) {
    if !stroke.has_renderable_geometry() {
        return;
    }
    ctx.set_stroke_style_str(&stroke.color);
    ctx.set_fill_style_str(&stroke.color);
    ctx.set_line_width(stroke.width);
    ctx.set_line_join("round");
    ctx.set_line_cap("round");

    match stroke.tool {
        ToolKind::Pencil => draw_path(ctx, &stroke.points, stroke.width),
        ToolKind::Rectangle => {
            let (origin, size) = bounds(stroke.points[0], stroke.points[1]);
            ctx.stroke_rect(origin.x, origin.y, size.x, size.y);
        }
        ToolKind::Circle => {
            let center = stroke.points[0];
            let rim = stroke.points[1];
            let radius = ((rim.x - center.x).powi(2) + (rim.y - center.y).powi(2)).sqrt();
            ctx.begin_path();
            let _ = ctx.arc(center.x, center.y, radius, 0.0, std::f64::consts::PI * 2.0);
            ctx.stroke();
        }
        ToolKind::Arrow => draw_arrow(ctx, stroke.points[0], stroke.points[1]),
        ToolKind::Diamond => draw_diamond(ctx, stroke.points[0], stroke.points[1]),
        ToolKind::Text => {
            ctx.set_font(TEXT_FONT);
            let text = stroke.text.as_deref().unwrap_or_default();
            let _ = ctx.fill_text(text, stroke.points[0].x, stroke.points[0].y);
        }
        ToolKind::Eraser => {}
    }
}

/// Draw one incremental freehand segment.
pub fn draw_segment(ctx: &CanvasRenderingContext2d, from: Point, to: Point, color: &str, width: f64) {
    ctx.set_stroke_style_str(color);
    ctx.set_line_width(width);
    ctx.set_line_join("round");
    ctx.set_line_cap("round");
    ctx.begin_path();
    ctx.move_to(from.x, from.y);
    ctx.line_to(to.x, to.y);
    ctx.stroke();
}

fn draw_path(ctx: &CanvasRenderingContext2d, points: &[Point], width: f64) {
    if points.len() == 1 {
        // A click with no movement leaves a dot.
        ctx.begin_path();
        let _ = ctx.arc(points[0].x, points[0].y, width / 2.0, 0.0, std::f64::consts::PI * 2.0);
        ctx.fill();
        return;
    }
    ctx.begin_path();
    ctx.move_to(points[0].x, points[0].y);
    for point in &points[1..] {
        ctx.line_to(point.x, point.y);
    }
    ctx.stroke();
}

fn draw_arrow(ctx: &CanvasRenderingContext2d, from: Point, to: Point) {
    ctx.begin_path();
    ctx.move_to(from.x, from.y);
    ctx.line_to(to.x, to.y);

    let angle = (to.y - from.y).atan2(to.x - from.x);
    for wing in [std::f64::consts::FRAC_PI_6, -std::f64::consts::FRAC_PI_6] {
        ctx.move_to(to.x, to.y);
        ctx.line_to(
            to.x - ARROW_HEAD_LEN * (angle - wing).cos(),
            to.y - ARROW_HEAD_LEN * (angle - wing).sin(),
        );
    }
    ctx.stroke();
}

fn draw_diamond(ctx: &CanvasRenderingContext2d, a: Point, b: Point) {
    let (origin, size) = bounds(a, b);
    let cx = origin.x + size.x / 2.0;
    let cy = origin.y + size.y / 2.0;
    ctx.begin_path();
    ctx.move_to(cx, origin.y);
    ctx.line_to(origin.x + size.x, cy);
    ctx.line_to(cx, origin.y + size.y);
    ctx.line_to(origin.x, cy);
    ctx.close_path();
    ctx.stroke();
}

/// Normalize two extent points into an origin and a size.
fn bounds(a: Point, b: Point) -> (Point, Point) {
    let origin = Point::new(a.x.min(b.x), a.y.min(b.y));
    let size = Point::new((a.x - b.x).abs(), (a.y - b.y).abs());
    (origin, size)
}
