//! WASM WebSocket client using `web-sys::WebSocket`.
//!
//! - `web-sys::WebSocket` + `wasm-bindgen` closures
//! - Fixed-delay reconnection, at most one reconnect scheduled at a time
//! - Callback-based event system (`on_event: impl Fn(WsEvent)`)

use std::cell::RefCell;

use gloo_timers::callback::Timeout;
use wasm_bindgen::prelude::*;
use web_sys::{CloseEvent, ErrorEvent, MessageEvent, WebSocket};

use crate::ws::{decode_frame, ConnectionState, WsConfig, WsEvent};

thread_local! {
    static WS: RefCell<Option<WebSocket>> = RefCell::new(None);
    static CONFIG: RefCell<Option<WsConfig>> = RefCell::new(None);
    static ON_EVENT: RefCell<Option<Box<dyn Fn(WsEvent)>>> = RefCell::new(None);
    static RECONNECT_TIMEOUT: RefCell<Option<Timeout>> = RefCell::new(None);
    static RECONNECT_SCHEDULED: RefCell<bool> = RefCell::new(false);
}

/// WASM WebSocket client — unit struct with static methods.
///
/// All state lives in `thread_local!` statics (WASM is single-threaded).
/// The consumer provides an `on_event` callback that receives `WsEvent`s
/// for connection lifecycle and decoded quote pushes.
pub struct WsClient;

impl WsClient {
    /// Initialize and connect the feed.
    pub fn connect(config: WsConfig, on_event: impl Fn(WsEvent) + 'static) {
        CONFIG.with(|c| *c.borrow_mut() = Some(config));
        ON_EVENT.with(|cb| *cb.borrow_mut() = Some(Box::new(on_event)));
        Self::do_connect();
    }

    /// Close the feed, cancel any pending reconnect and drop the callback.
    pub fn disconnect() {
        Self::cleanup_connection();
        Self::cancel_reconnect();
        ON_EVENT.with(|cb| *cb.borrow_mut() = None);
        CONFIG.with(|c| *c.borrow_mut() = None);
    }

    /// Force a fresh connection attempt, skipping any pending delay.
    pub fn restart_connection() {
        if Self::connection_state() == ConnectionState::Connecting {
            tracing::info!("Already connecting, skipping restart");
            return;
        }

        tracing::info!("Manual reconnection requested");
        Self::cleanup_connection();
        Self::cancel_reconnect();
        Self::do_connect();
    }

    pub fn is_connected() -> bool {
        Self::connection_state().is_open()
    }

    pub fn connection_state() -> ConnectionState {
        WS.with(|ws| {
            ws.try_borrow()
                .ok()
                .and_then(|ws_ref| ws_ref.as_ref().map(|w| ConnectionState::from(w.ready_state())))
                .unwrap_or(ConnectionState::Closed)
        })
    }

    // ── Internal ──────────────────────────────────────────────────────────

    fn emit(event: WsEvent) {
        ON_EVENT.with(|cb| {
            if let Ok(cb_ref) = cb.try_borrow() {
                if let Some(f) = cb_ref.as_ref() {
                    f(event);
                }
            }
        });
    }

    fn config() -> Option<WsConfig> {
        CONFIG.with(|c| c.borrow().clone())
    }

    fn do_connect() {
        if matches!(
            Self::connection_state(),
            ConnectionState::Connecting | ConnectionState::Open
        ) {
            tracing::info!("Already connected or connecting, skipping");
            return;
        }

        let Some(config) = Self::config() else {
            tracing::debug!("Feed disconnected, not connecting");
            return;
        };

        tracing::info!(url = %config.url, "Opening quote feed");
        match WebSocket::new(&config.url) {
            Err(err) => {
                let msg = extract_js_error(&err);
                tracing::error!("Failed to create WebSocket: {}", msg);
                Self::emit(WsEvent::Error(format!("Failed to create WebSocket: {}", msg)));
                Self::emit(WsEvent::Disconnected {
                    code: None,
                    reason: msg,
                });
                Self::schedule_reconnect();
            }
            Ok(ws) => Self::setup_connection(ws),
        }
    }

    fn setup_connection(ws: WebSocket) {
        let onopen = Closure::<dyn FnMut()>::new(move || {
            tracing::info!("Quote feed connected");
            Self::cancel_reconnect();
            Self::emit(WsEvent::Connected);
        });
        ws.set_onopen(Some(onopen.as_ref().unchecked_ref()));
        onopen.forget();

        let onmessage = Closure::<dyn FnMut(_)>::new(move |e: MessageEvent| {
            let Ok(txt) = e.data().dyn_into::<js_sys::JsString>() else {
                return;
            };
            let txt: String = txt.into();
            match decode_frame(&txt) {
                Ok(update) => Self::emit(WsEvent::Message(update)),
                Err(err) => {
                    tracing::warn!("Dropping undecodable quote frame: {} (raw: {})", err, txt);
                    Self::emit(WsEvent::Error(err.to_string()));
                }
            }
        });
        ws.set_onmessage(Some(onmessage.as_ref().unchecked_ref()));
        onmessage.forget();

        let onerror = Closure::<dyn FnMut(_)>::new(move |e: ErrorEvent| {
            let msg = extract_js_error(&e.error());
            tracing::error!("WebSocket error: {}", msg);
            Self::emit(WsEvent::Error(msg));
        });
        ws.set_onerror(Some(onerror.as_ref().unchecked_ref()));
        onerror.forget();

        let onclose = Closure::<dyn FnMut(_)>::new(move |e: CloseEvent| {
            let code = e.code();
            let reason = e.reason();
            tracing::info!(code, %reason, "Quote feed closed");

            Self::cleanup_connection();
            Self::emit(WsEvent::Disconnected {
                code: Some(code),
                reason,
            });
            Self::schedule_reconnect();
        });
        ws.set_onclose(Some(onclose.as_ref().unchecked_ref()));
        onclose.forget();

        WS.with(|ws_cell| {
            if let Ok(mut ws_ref) = ws_cell.try_borrow_mut() {
                *ws_ref = Some(ws);
            } else {
                tracing::error!("Could not store WebSocket - cell already borrowed");
            }
        });
    }

    // ── Reconnection ──────────────────────────────────────────────────────

    fn schedule_reconnect() {
        let Some(config) = Self::config() else {
            return;
        };
        if !config.reconnect {
            return;
        }

        let already_scheduled = RECONNECT_SCHEDULED.with(|s| {
            s.try_borrow_mut()
                .map(|mut flag| std::mem::replace(&mut *flag, true))
                .unwrap_or(true)
        });
        if already_scheduled {
            tracing::info!("Reconnect already scheduled, skipping");
            return;
        }

        let delay = u32::try_from(config.reconnect_delay_ms).unwrap_or(u32::MAX);
        tracing::info!("Reconnecting to quote feed in {}ms", delay);

        RECONNECT_TIMEOUT.with(|timeout| {
            if let Ok(mut timeout_ref) = timeout.try_borrow_mut() {
                *timeout_ref = Some(Timeout::new(delay, || {
                    RECONNECT_SCHEDULED.with(|s| {
                        let _ = s.try_borrow_mut().map(|mut f| *f = false);
                    });
                    RECONNECT_TIMEOUT.with(|t| {
                        if let Ok(mut t) = t.try_borrow_mut() {
                            // Already fired; forget instead of cancelling.
                            if let Some(fired) = t.take() {
                                fired.forget();
                            }
                        }
                    });
                    WsClient::do_connect();
                }));
            }
        });
    }

    fn cancel_reconnect() {
        RECONNECT_TIMEOUT.with(|timeout| {
            if let Ok(mut timeout_ref) = timeout.try_borrow_mut() {
                timeout_ref.take();
            }
        });
        RECONNECT_SCHEDULED.with(|s| {
            let _ = s.try_borrow_mut().map(|mut f| *f = false);
        });
    }

    // ── Connection cleanup ────────────────────────────────────────────────

    fn cleanup_connection() {
        WS.with(|ws| {
            if let Ok(mut ws_ref) = ws.try_borrow_mut() {
                if let Some(w) = ws_ref.take() {
                    w.set_onopen(None);
                    w.set_onmessage(None);
                    w.set_onerror(None);
                    w.set_onclose(None);

                    if matches!(
                        ConnectionState::from(w.ready_state()),
                        ConnectionState::Open | ConnectionState::Connecting
                    ) {
                        let _ = w.close();
                    }
                }
            }
        });
    }
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn extract_js_error(err: &JsValue) -> String {
    if let Some(error) = err.dyn_ref::<js_sys::Error>() {
        let name = error.name().as_string().unwrap_or_else(|| "Error".to_string());
        let message = error.message().as_string().unwrap_or_default();
        return if message.is_empty() {
            name
        } else {
            format!("{}: {}", name, message)
        };
    }

    if let Ok(json_str) = js_sys::JSON::stringify(err) {
        if let Some(s) = json_str.as_string() {
            if !s.is_empty() && s != "null" && s != "undefined" {
                return s;
            }
        }
    }

    if let Some(s) = err.as_string() {
        if !s.is_empty() {
            return s;
        }
    }

    if err.is_undefined() || err.is_null() {
        return "unknown error".to_string();
    }

    "Unknown WebSocket error".to_string()
}
