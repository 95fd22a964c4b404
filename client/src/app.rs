//! Application wiring: engine ↔ socket ↔ caches.
//!
//! LIFECYCLE
//! =========
//! 1. Resolve a credential (supplied token, or a guest grant from the relay)
//! 2. Paint the on-device cache so a reload never starts blank
//! 3. Connect the socket; the `connection_ready` frame supplies our stamped
//!    user id and the auth summary
//! 4. Authenticated sessions then fetch the durable stroke list, replay it,
//!    and clear the on-device cache
//! 5. Pointer input flows through the engine; committed and erased strokes
//!    fan out to the socket, the cache, and (when authenticated) the
//!    durable store

use std::cell::RefCell;
use std::rc::Rc;

use canvas::engine::{Action, Engine};
use protocol::{Body, Envelope, ToolKind};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;
use web_sys::{CanvasRenderingContext2d, Document, HtmlCanvasElement, PointerEvent, Window};

use crate::cache;
use crate::store;
use crate::ws::{self, ConnectionStatus, WsEvent, WsSender};

thread_local! {
    /// The running application, reachable from the exported tool setters.
    static APP: RefCell<Option<Rc<RefCell<App>>>> = const { RefCell::new(None) };
}

fn now_ms() -> i64 {
    js_sys::Date::now() as i64
}

// =============================================================================
// APP STATE
// =============================================================================

struct App {
    engine: Engine,
    room_id: String,
    /// Our stamped user id, learned from the `connection_ready` frame.
    user_id: String,
    authenticated: bool,
    sender: Option<Rc<WsSender>>,
}

/// Work the event handler defers until its borrow is released.
enum FollowUp {
    FetchDurable,
}

impl App {
    /// Carry a committed or erased stroke out to the socket and the caches.
    fn handle_action(&self, action: Action) {
        match action {
            Action::Committed(stroke) => {
                let envelope =
                    Envelope::new(&self.room_id, &self.user_id, now_ms(), Body::Draw(stroke.clone()));
                if let Some(sender) = &self.sender {
                    sender.send(&envelope);
                }
                cache::push(&self.room_id, &stroke);
                if self.authenticated {
                    store::schedule_save(self.room_id.clone(), stroke);
                }
            }
            Action::Erased(stroke) => {
                let envelope = Envelope::new(
                    &self.room_id,
                    &self.user_id,
                    now_ms(),
                    Body::Erase { stroke_id: stroke.id.clone() },
                );
                if let Some(sender) = &self.sender {
                    sender.send(&envelope);
                }
                cache::remove(&self.room_id, &stroke.id);
                if self.authenticated {
                    store::request_delete(self.room_id.clone(), stroke.id);
                }
            }
            // Painting already happened inside the engine.
            Action::Segment { .. } | Action::Preview(_) => {}
        }
    }

    fn handle_envelope(&mut self, envelope: Envelope) -> Option<FollowUp> {
        match envelope.body {
            Body::ConnectionReady(info) => {
                self.user_id = envelope.user_id;
                self.authenticated = info.is_authenticated;
                self.engine.set_user_id(self.user_id.clone());
                log::info!(
                    "connection ready: connection={} owner={} guest={}",
                    info.connection_id,
                    info.is_owner,
                    info.is_guest
                );
                info.is_authenticated.then_some(FollowUp::FetchDurable)
            }
            Body::Draw(stroke) => {
                // Our own echoes are already on the canvas.
                if envelope.user_id != self.user_id {
                    self.engine.apply_remote(stroke);
                }
                None
            }
            Body::Erase { stroke_id } => {
                if envelope.user_id != self.user_id {
                    self.engine.apply_remote_erase(&stroke_id);
                }
                None
            }
            Body::VideoSession => {
                // The call surface itself lives outside this crate; the
                // announcement just tells it to appear.
                log::info!("video session announced for room {}", self.room_id);
                None
            }
            Body::Signal(payload) => {
                log::debug!("signaling payload from {} relayed to call surface", payload.from);
                None
            }
        }
    }
}

// =============================================================================
// BOOT
// =============================================================================

pub async fn boot(room_id: String, token: Option<String>) -> Result<(), JsValue> {
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
    let document = window.document().ok_or_else(|| JsValue::from_str("no document"))?;

    // An absent token acquires a guest grant; a failed acquisition still
    // connects (the relay mints a guest identity server-side).
    let token = match token {
        Some(token) => Some(token),
        None => match store::fetch_guest_token().await {
            Ok(grant) => {
                log::info!("joining as guest {}", grant.guest_id);
                Some(grant.token)
            }
            Err(error) => {
                log::warn!("guest token unavailable ({error}); connecting without one");
                None
            }
        },
    };

    let committed_el = canvas_element(&document, "board")?;
    let preview_el = canvas_element(&document, "board-preview")?;
    let (width, height) = viewport_size(&window);
    size_canvas(&committed_el, width, height);
    size_canvas(&preview_el, width, height);

    let engine = Engine::new(
        context_of(&committed_el)?,
        context_of(&preview_el)?,
        width,
        height,
        String::new(),
    );

    let app = Rc::new(RefCell::new(App {
        engine,
        room_id: room_id.clone(),
        user_id: String::new(),
        authenticated: false,
        sender: None,
    }));
    APP.with(|slot| *slot.borrow_mut() = Some(app.clone()));

    // Survive reloads: the cached list paints before the socket answers.
    app.borrow_mut().engine.load_and_redraw(cache::load(&room_id));

    set_status(&document, ConnectionStatus::Connecting);
    let url = ws::relay_url(&window.location(), &room_id, token.as_deref());
    let sender = ws::connect(&url, {
        let app = app.clone();
        let document = document.clone();
        move |event| match event {
            WsEvent::Status(status) => set_status(&document, status),
            WsEvent::Message(envelope) => {
                let follow_up = app.borrow_mut().handle_envelope(envelope);
                if let Some(FollowUp::FetchDurable) = follow_up {
                    fetch_durable(app.clone());
                }
            }
        }
    })?;
    app.borrow_mut().sender = Some(sender);

    install_pointer_handlers(&preview_el, &app)?;
    install_resize_handler(&window, &committed_el, &preview_el, &app)?;

    Ok(())
}

/// Replace the canvas with the authoritative durable list, then drop the
/// on-device cache for this room.
fn fetch_durable(app: Rc<RefCell<App>>) {
    spawn_local(async move {
        let room_id = app.borrow().room_id.clone();
        match store::fetch_strokes(&room_id).await {
            Ok(strokes) => {
                app.borrow_mut().engine.load_and_redraw(strokes);
                cache::clear(&room_id);
            }
            Err(error) => {
                log::warn!("durable stroke fetch failed ({error}); keeping cached strokes");
            }
        }
    });
}

// =============================================================================
// EXPORTED CONTROLS
// =============================================================================

/// Switch the active tool. Called by the surrounding page's toolbar.
pub fn select_tool(name: &str) -> bool {
    let Some(tool) = tool_from_name(name) else {
        log::warn!("unknown tool {name:?}");
        return false;
    };
    with_app(|app| app.engine.set_tool(tool))
}

pub fn select_color(color: &str) -> bool {
    with_app(|app| app.engine.set_color(color))
}

pub fn select_width(width: f64) -> bool {
    with_app(|app| app.engine.set_width(width))
}

pub fn set_pending_text(text: &str) -> bool {
    with_app(|app| app.engine.set_pending_text(text))
}

fn with_app(f: impl FnOnce(&mut App)) -> bool {
    APP.with(|slot| match slot.borrow().as_ref() {
        Some(app) => {
            f(&mut app.borrow_mut());
            true
        }
        None => false,
    })
}

fn tool_from_name(name: &str) -> Option<ToolKind> {
    match name {
        "pencil" => Some(ToolKind::Pencil),
        "rectangle" => Some(ToolKind::Rectangle),
        "circle" => Some(ToolKind::Circle),
        "arrow" => Some(ToolKind::Arrow),
        "diamond" => Some(ToolKind::Diamond),
        "text" => Some(ToolKind::Text),
        "eraser" => Some(ToolKind::Eraser),
        _ => None,
    }
}

// =============================================================================
// DOM WIRING
// =============================================================================

fn canvas_element(document: &Document, id: &str) -> Result<HtmlCanvasElement, JsValue> {
    document
        .get_element_by_id(id)
        .ok_or_else(|| JsValue::from_str(&format!("missing #{id} canvas")))?
        .dyn_into::<HtmlCanvasElement>()
        .map_err(|_| JsValue::from_str(&format!("#{id} is not a canvas")))
}

fn context_of(canvas: &HtmlCanvasElement) -> Result<CanvasRenderingContext2d, JsValue> {
    canvas
        .get_context("2d")?
        .ok_or_else(|| JsValue::from_str("2d context unavailable"))?
        .dyn_into::<CanvasRenderingContext2d>()
        .map_err(|_| JsValue::from_str("2d context has unexpected type"))
}

fn viewport_size(window: &Window) -> (f64, f64) {
    let width = window.inner_width().ok().and_then(|v| v.as_f64()).unwrap_or(800.0);
    let height = window.inner_height().ok().and_then(|v| v.as_f64()).unwrap_or(600.0);
    (width, height)
}

fn size_canvas(canvas: &HtmlCanvasElement, width: f64, height: f64) {
    canvas.set_width(width as u32);
    canvas.set_height(height as u32);
}

fn set_status(document: &Document, status: ConnectionStatus) {
    if let Some(element) = document.get_element_by_id("status") {
        element.set_text_content(Some(status.label()));
        let _ = element.set_attribute("data-status", status.label());
    }
}

fn install_pointer_handlers(
    surface: &HtmlCanvasElement,
    app: &Rc<RefCell<App>>,
) -> Result<(), JsValue> {
    let handlers: [(&str, fn(&mut Engine, f64, f64) -> Option<Action>); 3] = [
        ("pointerdown", Engine::pointer_down),
        ("pointermove", Engine::pointer_move),
        ("pointerup", Engine::pointer_up),
    ];

    for (event_name, handler) in handlers {
        let app = app.clone();
        let closure = Closure::<dyn FnMut(PointerEvent)>::new(move |event: PointerEvent| {
            let x = f64::from(event.offset_x());
            let y = f64::from(event.offset_y());
            let mut app = app.borrow_mut();
            if let Some(action) = handler(&mut app.engine, x, y) {
                app.handle_action(action);
            }
        });
        surface.add_event_listener_with_callback(event_name, closure.as_ref().unchecked_ref())?;
        closure.forget();
    }
    Ok(())
}

fn install_resize_handler(
    window: &Window,
    committed: &HtmlCanvasElement,
    preview: &HtmlCanvasElement,
    app: &Rc<RefCell<App>>,
) -> Result<(), JsValue> {
    let app = app.clone();
    let committed = committed.clone();
    let preview = preview.clone();
    let window_for_closure = window.clone();
    let closure = Closure::<dyn FnMut(web_sys::Event)>::new(move |_| {
        let (width, height) = viewport_size(&window_for_closure);
        size_canvas(&committed, width, height);
        size_canvas(&preview, width, height);
        app.borrow_mut().engine.resize(width, height);
    });
    window.add_event_listener_with_callback("resize", closure.as_ref().unchecked_ref())?;
    closure.forget();
    Ok(())
}
