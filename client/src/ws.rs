//! WebSocket lifecycle and the connection status machine.
//!
//! The socket is callback-driven: each browser event is translated into a
//! [`WsEvent`] and handed to a single host closure. Undecodable frames are
//! dropped with a log line and never reach the host — the boundary
//! validates payload shapes before anything dispatches on them.

use std::cell::RefCell;
use std::rc::Rc;

use protocol::Envelope;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{CloseEvent, Event, MessageEvent, WebSocket};

/// Connection state machine surfaced to the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Connecting,
    Open,
    Closed,
    Error,
}

impl ConnectionStatus {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Closed => "closed",
            Self::Error => "error",
        }
    }
}

#[derive(Debug)]
pub enum WsEvent {
    Status(ConnectionStatus),
    Message(Envelope),
}

/// Sending half of the connection.
pub struct WsSender {
    socket: WebSocket,
}

impl WsSender {
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.socket.ready_state() == WebSocket::OPEN
    }

    pub fn send(&self, envelope: &Envelope) {
        if !self.is_open() {
            log::warn!("dropping outbound envelope: socket not open");
            return;
        }
        match envelope.encode() {
            Ok(text) => {
                let _ = self.socket.send_with_str(&text);
            }
            Err(error) => log::warn!("failed to encode outbound envelope: {error}"),
        }
    }
}

/// Open the relay socket and wire browser events into `on_event`.
///
/// # Errors
///
/// Returns the browser error when the socket cannot be constructed.
pub fn connect(
    url: &str,
    on_event: impl 'static + FnMut(WsEvent),
) -> Result<Rc<WsSender>, JsValue> {
    let socket = WebSocket::new(url)?;
    let sender = Rc::new(WsSender { socket: socket.clone() });
    let on_event = Rc::new(RefCell::new(on_event));

    {
        let on_event = on_event.clone();
        let onopen = Closure::<dyn FnMut(Event)>::new(move |_| {
            on_event.borrow_mut()(WsEvent::Status(ConnectionStatus::Open));
        });
        socket.set_onopen(Some(onopen.as_ref().unchecked_ref()));
        onopen.forget();
    }

    {
        let on_event = on_event.clone();
        let onclose = Closure::<dyn FnMut(CloseEvent)>::new(move |event: CloseEvent| {
            log::info!("socket closed: code={} reason={:?}", event.code(), event.reason());
            on_event.borrow_mut()(WsEvent::Status(ConnectionStatus::Closed));
        });
        socket.set_onclose(Some(onclose.as_ref().unchecked_ref()));
        onclose.forget();
    }

    {
        let on_event = on_event.clone();
        let onerror = Closure::<dyn FnMut(Event)>::new(move |_| {
            on_event.borrow_mut()(WsEvent::Status(ConnectionStatus::Error));
        });
        socket.set_onerror(Some(onerror.as_ref().unchecked_ref()));
        onerror.forget();
    }

    {
        let on_event = on_event.clone();
        let onmessage = Closure::<dyn FnMut(MessageEvent)>::new(move |event: MessageEvent| {
            let Some(text) = event.data().as_string() else {
                log::warn!("ignoring non-text frame");
                return;
            };
            match Envelope::decode(&text) {
                Ok(envelope) => on_event.borrow_mut()(WsEvent::Message(envelope)),
                Err(error) => log::warn!("malformed frame dropped: {error}"),
            }
        });
        socket.set_onmessage(Some(onmessage.as_ref().unchecked_ref()));
        onmessage.forget();
    }

    Ok(sender)
}

/// Relay endpoint for a room, derived from the page origin.
#[must_use]
pub fn relay_url(location: &web_sys::Location, room_id: &str, token: Option<&str>) -> String {
    let scheme = match location.protocol().as_deref() {
        Ok("https:") => "wss",
        _ => "ws",
    };
    let host = location.host().unwrap_or_else(|_| "localhost:8080".into());
    match token {
        Some(token) => format!("{scheme}://{host}/api/ws?roomId={room_id}&token={token}"),
        None => format!("{scheme}://{host}/api/ws?roomId={room_id}"),
    }
}
