//! Browser entry point: builds the session on a threepipe viewer and wires
//! page events into it.

mod threepipe;

use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::time::Duration;

use anyhow::{anyhow, Result};
use gloo_events::EventListener;
use js_sys::{Function, Promise};
use serde_json::Value;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::{future_to_promise, spawn_local};
use web_sys::{window, MessageEvent};

use crate::autorotate::ResumeTicket;
use crate::config::ViewerConfig;
use crate::engine::RenderEngine;
use crate::error::ViewerError;
use crate::session::{LoadOutcome, SessionManager};

pub use threepipe::{ThreepipeEngine, ThreepipeRig};

#[wasm_bindgen(start)]
pub fn bootstrap() {
    console_error_panic_hook::set_once();
    let _ = wasm_logger::init(wasm_logger::Config::default());
}

/// Starts a viewer on the page. `config_json` takes precedence over
/// `preset`; with neither the transparent preset is used.
#[wasm_bindgen]
pub async fn start_viewer(
    preset: Option<String>,
    config_json: Option<String>,
) -> Result<WebViewer, JsValue> {
    let config = match (config_json, preset) {
        (Some(text), _) => ViewerConfig::from_json(&text).map_err(to_js)?,
        (None, Some(name)) => ViewerConfig::preset(&name)
            .ok_or_else(|| JsValue::from_str(&format!("unknown preset '{name}'")))?,
        (None, None) => ViewerConfig::transparent(),
    };
    let session = SessionManager::initialize(config, ThreepipeEngine::create)
        .await
        .map_err(to_js)?;

    let state = Rc::new(ViewerState {
        session,
        resume_timer: RefCell::new(None),
        listeners: RefCell::new(Vec::new()),
        interaction_callback: RefCell::new(None),
    });
    state.attach().map_err(|err| JsValue::from_str(&err.to_string()))?;
    log::info!("Viewer ready on '{}'", state.session.config().canvas_id);
    Ok(WebViewer { inner: state })
}

#[wasm_bindgen]
pub struct WebViewer {
    inner: Rc<ViewerState>,
}

#[wasm_bindgen]
impl WebViewer {
    /// Shows the registry model stored under `key`.
    #[wasm_bindgen(js_name = switchModel)]
    pub fn switch_model(&self, key: String) -> Promise {
        let state = Rc::clone(&self.inner);
        future_to_promise(async move {
            let outcome = state.session.switch_model(&key).await.map_err(to_js)?;
            Ok(outcome_to_js(&outcome))
        })
    }

    #[wasm_bindgen(js_name = loadModelFromUrl)]
    pub fn load_model_from_url(&self, url: String, label: String) -> Promise {
        let state = Rc::clone(&self.inner);
        future_to_promise(async move {
            let outcome = state
                .session
                .load_model_from_url(&url, &label)
                .await
                .map_err(to_js)?;
            Ok(outcome_to_js(&outcome))
        })
    }

    #[wasm_bindgen(getter, js_name = currentModel)]
    pub fn current_model(&self) -> Option<String> {
        self.inner.session.state().current_model
    }

    pub fn shutdown(&self) {
        self.inner.shutdown();
    }
}

struct ViewerState {
    session: SessionManager<ThreepipeEngine>,
    resume_timer: RefCell<Option<ResumeTimer>>,
    listeners: RefCell<Vec<EventListener>>,
    interaction_callback: RefCell<Option<Closure<dyn FnMut()>>>,
}

impl ViewerState {
    fn attach(self: &Rc<Self>) -> Result<()> {
        let window = window().ok_or_else(|| anyhow!("window not available"))?;
        let mut listeners = self.listeners.borrow_mut();

        if self.session.config().accept_host_messages {
            let weak = Rc::downgrade(self);
            listeners.push(EventListener::new(&window, "message", move |event| {
                if let Some(event) = event.dyn_ref::<MessageEvent>() {
                    dispatch_message(&weak, event);
                }
            }));
        }

        let weak = Rc::downgrade(self);
        listeners.push(EventListener::new(&window, "pagehide", move |_| {
            if let Some(state) = weak.upgrade() {
                state.shutdown();
            }
        }));

        let weak = Rc::downgrade(self);
        let callback = Closure::wrap(Box::new(move || {
            if let Some(state) = weak.upgrade() {
                state.interaction_started();
            }
        }) as Box<dyn FnMut()>);
        self.session
            .engine()
            .camera_rig()
            .on_interaction_start(callback.as_ref().unchecked_ref())?;
        *self.interaction_callback.borrow_mut() = Some(callback);
        Ok(())
    }

    fn interaction_started(self: &Rc<Self>) {
        let ticket = match self.session.notify_interaction_start(now()) {
            Ok(ticket) => ticket,
            Err(err) => {
                log::error!("failed to pause auto-rotate: {err}");
                return;
            }
        };
        let weak = Rc::downgrade(self);
        let delay = self.session.config().camera.resume_delay_ms;
        let delay = i32::try_from(delay).unwrap_or(i32::MAX);
        // Only one resume may be armed; dropping the old timer clears it.
        self.resume_timer.borrow_mut().take();
        match ResumeTimer::schedule(delay, move || {
            if let Some(state) = weak.upgrade() {
                state.resume(ticket);
            }
        }) {
            Ok(timer) => *self.resume_timer.borrow_mut() = Some(timer),
            Err(err) => log::error!("failed to arm auto-rotate resume: {err}"),
        }
    }

    fn resume(&self, ticket: ResumeTicket) {
        if let Err(err) = self.session.resume_auto_rotate(ticket) {
            log::error!("failed to resume auto-rotate: {err}");
        }
    }

    /// Detaches every page hook and releases the current model. Safe to call
    /// more than once.
    fn shutdown(&self) {
        self.resume_timer.borrow_mut().take();
        self.listeners.borrow_mut().clear();
        let callback = self.interaction_callback.borrow_mut().take();
        if let Some(callback) = callback {
            let function: &Function = callback.as_ref().unchecked_ref();
            if let Err(err) = self
                .session
                .engine()
                .camera_rig()
                .remove_interaction_listener(function)
            {
                log::warn!("failed to detach orbit listener: {err}");
            }
        }
        self.session.shutdown();
    }
}

impl Drop for ViewerState {
    // The orbit controls keep a reference to the interaction closure; it
    // must be removed there before the closure is freed.
    fn drop(&mut self) {
        if self.interaction_callback.get_mut().is_some() {
            self.shutdown();
        }
    }
}

/// Pending `setTimeout` that is cleared when dropped.
struct ResumeTimer {
    handle: i32,
    _callback: Closure<dyn FnMut()>,
}

impl ResumeTimer {
    fn schedule(delay_ms: i32, callback: impl FnMut() + 'static) -> Result<Self> {
        let window = window().ok_or_else(|| anyhow!("window not available"))?;
        let callback = Closure::wrap(Box::new(callback) as Box<dyn FnMut()>);
        let handle = window
            .set_timeout_with_callback_and_timeout_and_arguments_0(
                callback.as_ref().unchecked_ref(),
                delay_ms,
            )
            .map_err(|err| anyhow!("setTimeout failed: {err:?}"))?;
        Ok(Self {
            handle,
            _callback: callback,
        })
    }
}

impl Drop for ResumeTimer {
    fn drop(&mut self) {
        if let Some(window) = window() {
            window.clear_timeout_with_handle(self.handle);
        }
    }
}

fn dispatch_message(weak: &Weak<ViewerState>, event: &MessageEvent) {
    let message = match message_value(&event.data()) {
        Ok(message) => message,
        Err(err) => {
            log::debug!("ignoring host message: {err}");
            return;
        }
    };
    let weak = weak.clone();
    spawn_local(async move {
        let Some(state) = weak.upgrade() else {
            return;
        };
        match state.session.handle_host_message(&message).await {
            Ok(Some(outcome)) => log::debug!("host message handled: {outcome:?}"),
            Ok(None) => {}
            Err(err) => log::error!("host message failed: {err}"),
        }
    });
}

fn message_value(data: &JsValue) -> Result<Value> {
    let text = js_sys::JSON::stringify(data).map_err(threepipe::js_err)?;
    let text = text
        .as_string()
        .ok_or_else(|| anyhow!("message data is not serializable"))?;
    Ok(serde_json::from_str(&text)?)
}

fn outcome_to_js(outcome: &LoadOutcome) -> JsValue {
    match outcome {
        LoadOutcome::Installed { label, .. } => JsValue::from_str(label),
        LoadOutcome::Superseded { .. } => JsValue::NULL,
    }
}

fn to_js(err: ViewerError) -> JsValue {
    JsValue::from_str(&err.to_string())
}

fn now() -> Duration {
    let millis = window()
        .and_then(|win| win.performance())
        .map(|performance| performance.now())
        .unwrap_or_default();
    Duration::from_secs_f64(millis.max(0.0) / 1000.0)
}
