//! Canvas synchronization engine for the collaborative drawing board.
//!
//! This crate is compiled to WebAssembly and runs in the browser. It turns
//! raw pointer input into the typed stroke model, applies strokes
//! optimistically to the committed surface, hit-tests strokes for the
//! non-destructive eraser, and replays stroke lists for full redraws. The
//! host layer (the `client` crate) wires DOM events in and carries the
//! resulting [`engine::Action`]s out to the socket and the caches.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`engine`] | Pointer state machine: testable [`engine::EngineCore`] plus the surface-owning [`engine::Engine`] |
//! | [`hit`] | Kind-specific eraser hit-testing |
//! | [`render`] | Immediate-mode stroke rendering onto 2d contexts |
//! | [`consts`] | Shared numeric constants (tolerances, text box, fonts) |

pub mod consts;
pub mod engine;
pub mod hit;
pub mod render;
