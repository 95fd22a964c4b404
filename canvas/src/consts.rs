//! Shared numeric constants for the canvas crate.

// ── Hit-testing ─────────────────────────────────────────────────

/// Screen-space tolerance in pixels for eraser hit tests.
pub const ERASE_TOLERANCE_PX: f64 = 8.0;

/// Fixed hit box centered on a text stroke's anchor, in pixels.
pub const TEXT_HIT_BOX_WIDTH: f64 = 120.0;
pub const TEXT_HIT_BOX_HEIGHT: f64 = 32.0;

// ── Rendering ───────────────────────────────────────────────────

/// Font for text strokes.
pub const TEXT_FONT: &str = "16px sans-serif";

/// Arrowhead wing length in pixels.
pub const ARROW_HEAD_LEN: f64 = 12.0;

// ── Defaults ────────────────────────────────────────────────────

/// Default stroke color until the host picks one.
pub const DEFAULT_COLOR: &str = "#23ab2b";

/// Default stroke width in pixels.
pub const DEFAULT_WIDTH: f64 = 2.0;
