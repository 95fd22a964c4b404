//! Pointer state machine and stroke list.
//!
//! `EngineCore` holds everything that doesn't depend on the browser — the
//! active tool, the in-progress point buffer, and the committed stroke
//! list — so the whole input lifecycle is testable off-wasm. Input handlers
//! return an [`Action`] describing what the host must do next: paint a
//! freehand segment, refresh the shape preview, or take a committed or
//! erased stroke out to the socket and the caches.
//!
//! `Engine` wraps the core together with the committed and preview 2d
//! contexts and applies each action's rendering side before handing it to
//! the host.

#[cfg(test)]
#[path = "engine_test.rs"]
mod engine_test;

use protocol::{Point, Stroke, ToolKind};
use uuid::Uuid;
use web_sys::CanvasRenderingContext2d;

use crate::consts::{DEFAULT_COLOR, DEFAULT_WIDTH};
use crate::hit;
use crate::render;

/// What the host must do after an input event.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Draw one incremental freehand segment onto the committed surface.
    Segment { from: Point, to: Point },
    /// Redraw the in-progress shape on the preview surface.
    Preview(Stroke),
    /// A stroke was committed: send it and persist it.
    Committed(Stroke),
    /// A stroke was erased: propagate the removal.
    Erased(Stroke),
}

// =============================================================================
// CORE
// =============================================================================

/// Browser-free engine state.
pub struct EngineCore {
    tool: ToolKind,
    color: String,
    width: f64,
    user_id: String,
    /// Text committed by the next text-tool pointer-down.
    pending_text: String,
    /// In-progress point buffer; first entry is the anchor.
    points: Vec<Point>,
    drawing: bool,
    strokes: Vec<Stroke>,
}

impl EngineCore {
    #[must_use]
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            tool: ToolKind::Pencil,
            color: DEFAULT_COLOR.to_string(),
            width: DEFAULT_WIDTH,
            user_id: user_id.into(),
            pending_text: String::new(),
            points: Vec::new(),
            drawing: false,
            strokes: Vec::new(),
        }
    }

    pub fn set_tool(&mut self, tool: ToolKind) {
        self.tool = tool;
    }

    pub fn set_color(&mut self, color: impl Into<String>) {
        self.color = color.into();
    }

    pub fn set_width(&mut self, width: f64) {
        self.width = width;
    }

    pub fn set_pending_text(&mut self, text: impl Into<String>) {
        self.pending_text = text.into();
    }

    pub fn set_user_id(&mut self, user_id: impl Into<String>) {
        self.user_id = user_id.into();
    }

    /// The committed stroke list, in application order.
    #[must_use]
    pub fn strokes(&self) -> &[Stroke] {
        &self.strokes
    }

    /// Replace the stroke list wholesale (initial load, cache replay).
    pub fn load(&mut self, strokes: Vec<Stroke>) {
        self.strokes = strokes;
    }

    // --- Pointer lifecycle ---

    pub fn pointer_down(&mut self, p: Point) -> Option<Action> {
        match self.tool {
            ToolKind::Eraser => {
                let index = hit::find_hit(&self.strokes, p)?;
                Some(Action::Erased(self.strokes.remove(index)))
            }
            ToolKind::Text => {
                // Text commits on pointer-down; both extent points collapse
                // onto the anchor.
                let stroke = self.assemble(vec![p, p]);
                self.strokes.push(stroke.clone());
                Some(Action::Committed(stroke))
            }
            _ => {
                self.drawing = true;
                self.points = vec![p];
                None
            }
        }
    }

    pub fn pointer_move(&mut self, p: Point) -> Option<Action> {
        if !self.drawing {
            return None;
        }
        match self.tool {
            ToolKind::Pencil => {
                let from = *self.points.last()?;
                self.points.push(p);
                Some(Action::Segment { from, to: p })
            }
            ToolKind::Eraser | ToolKind::Text => None,
            _ => {
                // Anchor stays; the second point tracks the pointer.
                self.points.truncate(1);
                self.points.push(p);
                Some(Action::Preview(self.preview(self.points.clone())))
            }
        }
    }

    pub fn pointer_up(&mut self, p: Point) -> Option<Action> {
        if !self.drawing {
            return None;
        }
        self.drawing = false;
        let points = std::mem::take(&mut self.points);

        let stroke = match self.tool {
            ToolKind::Pencil => self.assemble(points),
            _ => {
                let anchor = *points.first()?;
                let last = points.get(1).copied().unwrap_or(p);
                self.assemble(vec![anchor, last])
            }
        };
        self.strokes.push(stroke.clone());
        Some(Action::Committed(stroke))
    }

    // --- Remote application ---

    /// Apply a stroke received from the relay. Persistence is not
    /// re-entered; the stroke is already durable at its origin.
    pub fn apply_remote(&mut self, stroke: Stroke) {
        self.strokes.push(stroke);
    }

    /// Remove a stroke by id (remote erase). Returns whether it was present.
    pub fn remove_by_id(&mut self, stroke_id: &str) -> bool {
        let Some(index) = self.strokes.iter().position(|s| s.id == stroke_id) else {
            return false;
        };
        self.strokes.remove(index);
        true
    }

    // --- Assembly ---

    fn assemble(&self, points: Vec<Point>) -> Stroke {
        let mut stroke = self.preview(points);
        stroke.id = Uuid::new_v4().to_string();
        stroke
    }

    /// A transient stroke value for preview rendering; no identity yet.
    fn preview(&self, points: Vec<Point>) -> Stroke {
        Stroke {
            id: String::new(),
            tool: self.tool,
            points,
            color: self.color.clone(),
            width: self.width,
            text: (self.tool == ToolKind::Text).then(|| self.pending_text.clone()),
            user_id: self.user_id.clone(),
        }
    }
}

// =============================================================================
// SURFACE-OWNING ENGINE
// =============================================================================

/// The full engine: core state plus the committed and preview contexts.
/// Shape previews draw on the overlay so the committed surface is untouched
/// until commit.
pub struct Engine {
    core: EngineCore,
    committed: CanvasRenderingContext2d,
    preview: CanvasRenderingContext2d,
    width: f64,
    height: f64,
}

impl Engine {
    #[must_use]
    pub fn new(
        committed: CanvasRenderingContext2d,
        preview: CanvasRenderingContext2d,
        width: f64,
        height: f64,
        user_id: impl Into<String>,
    ) -> Self {
        Self { core: EngineCore::new(user_id), committed, preview, width, height }
    }

    // --- Delegated state ---

    pub fn set_tool(&mut self, tool: ToolKind) {
        self.core.set_tool(tool);
    }

    pub fn set_color(&mut self, color: impl Into<String>) {
        self.core.set_color(color);
    }

    pub fn set_width(&mut self, width: f64) {
        self.core.set_width(width);
    }

    pub fn set_pending_text(&mut self, text: impl Into<String>) {
        self.core.set_pending_text(text);
    }

    pub fn set_user_id(&mut self, user_id: impl Into<String>) {
        self.core.set_user_id(user_id);
    }

    #[must_use]
    pub fn strokes(&self) -> &[Stroke] {
        self.core.strokes()
    }

    // --- Input events ---

    pub fn pointer_down(&mut self, x: f64, y: f64) -> Option<Action> {
        let action = self.core.pointer_down(Point::new(x, y));
        self.apply(action.as_ref());
        action
    }

    pub fn pointer_move(&mut self, x: f64, y: f64) -> Option<Action> {
        let action = self.core.pointer_move(Point::new(x, y));
        self.apply(action.as_ref());
        action
    }

    pub fn pointer_up(&mut self, x: f64, y: f64) -> Option<Action> {
        let action = self.core.pointer_up(Point::new(x, y));
        self.apply(action.as_ref());
        action
    }

    fn apply(&self, action: Option<&Action>) {
        match action {
            Some(Action::Segment { from, to }) => {
                render::draw_segment(&self.committed, *from, *to, self.core.color.as_str(), self.core.width);
            }
            Some(Action::Preview(stroke)) => {
                render::clear(&self.preview, self.width, self.height);
                render::draw_stroke(&self.preview, stroke);
            }
            Some(Action::Committed(stroke)) => {
                render::clear(&self.preview, self.width, self.height);
                render::draw_stroke(&self.committed, stroke);
            }
            Some(Action::Erased(_)) => self.redraw_committed(),
            None => {}
        }
    }

    // --- Remote application / redraw ---

    pub fn apply_remote(&mut self, stroke: Stroke) {
        render::draw_stroke(&self.committed, &stroke);
        self.core.apply_remote(stroke);
    }

    pub fn apply_remote_erase(&mut self, stroke_id: &str) {
        if self.core.remove_by_id(stroke_id) {
            self.redraw_committed();
        }
    }

    /// Replace the stroke list and replay every stroke in order.
    pub fn load_and_redraw(&mut self, strokes: Vec<Stroke>) {
        self.core.load(strokes);
        self.redraw_committed();
    }

    /// Adopt new surface dimensions and replay the stroke list.
    pub fn resize(&mut self, width: f64, height: f64) {
        self.width = width;
        self.height = height;
        self.redraw_committed();
    }

    fn redraw_committed(&self) {
        render::clear(&self.committed, self.width, self.height);
        for stroke in self.core.strokes() {
            render::draw_stroke(&self.committed, stroke);
        }
    }
}
