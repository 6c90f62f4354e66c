//! Browser backend: binds every host trait to `web-sys` and exports `start`.
//!
//! Compiled only for `wasm32` with the `web` feature. Everything runs on the
//! page's single thread; the monitor loop is driven by `spawn_local`.

use std::cell::Cell;
use std::rc::Rc;

use async_trait::async_trait;
use js_sys::{Function, Promise, Reflect};
use tracing::error;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::{spawn_local, JsFuture};
use web_sys::{
    CanvasRenderingContext2d, CssStyleDeclaration, Element, EventTarget, HtmlCanvasElement,
    HtmlElement, Storage, VisibilityState, Window,
};

use crate::benchmark::{Canvas2d, CanvasFactory, EnvironmentProbe, HardwareProbe};
use crate::clock::{FrameScheduler, SystemClock};
use crate::config::EngineConfig;
use crate::dom::{ComputedStyle, Document, NodeId, Rect, StyleProperty};
use crate::engine::{AdaptiveRenderer, Host};
use crate::errors::{BenchmarkError, DomError, EngineError, StorageError};
use crate::page::PageSignals;
use crate::storage::KeyValueStore;

fn js_message(value: &JsValue) -> String {
    value
        .as_string()
        .or_else(|| {
            value
                .dyn_ref::<js_sys::Error>()
                .map(|e| String::from(e.message()))
        })
        .unwrap_or_else(|| format!("{value:?}"))
}

fn browser_window() -> Result<Window, EngineError> {
    web_sys::window().ok_or_else(|| EngineError::Host("no global window".into()))
}

/// Resolves on the next `event` fired at `target`.
async fn next_event(target: &EventTarget, event: &str) {
    let mut listener: Option<Function> = None;
    let promise = Promise::new(&mut |resolve, _reject| {
        let _ = target.add_event_listener_with_callback(event, &resolve);
        listener = Some(resolve);
    });
    let _ = JsFuture::from(promise).await;
    if let Some(listener) = listener {
        let _ = target.remove_event_listener_with_callback(event, &listener);
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Document
// ────────────────────────────────────────────────────────────────────────────

pub struct WebDocument {
    window: Window,
    document: web_sys::Document,
    elements: Vec<Element>,
}

impl WebDocument {
    pub fn new(window: Window) -> Result<Self, EngineError> {
        let document = window
            .document()
            .ok_or_else(|| EngineError::Host("window has no document".into()))?;
        Ok(Self {
            window,
            document,
            elements: Vec::new(),
        })
    }

    fn element(&self, node: NodeId) -> Result<&Element, DomError> {
        self.elements
            .get(node.0)
            .filter(|element| element.is_connected())
            .ok_or(DomError::Detached(node.0))
    }

    fn inline_declarations(&self, node: NodeId) -> Result<CssStyleDeclaration, DomError> {
        self.element(node)?
            .dyn_ref::<HtmlElement>()
            .map(HtmlElement::style)
            .ok_or_else(|| DomError::Style(format!("element {} has no inline style", node.0)))
    }
}

/// Property names written for one logical property, prefixed variants included.
fn css_names(property: StyleProperty) -> &'static [&'static str] {
    match property {
        StyleProperty::BackdropFilter => &["backdrop-filter", "-webkit-backdrop-filter"],
        StyleProperty::Filter => &["filter"],
        StyleProperty::BoxShadow => &["box-shadow"],
        StyleProperty::Transform => &["transform"],
        StyleProperty::Animation => &["animation"],
        StyleProperty::AnimationDuration => &["animation-duration"],
        StyleProperty::Transition => &["transition"],
        StyleProperty::BackgroundColor => &["background-color"],
        StyleProperty::Border => &["border"],
    }
}

/// Computed values come back empty for properties the engine does not know.
fn or_default(value: String, fallback: &str) -> String {
    if value.is_empty() {
        fallback.to_string()
    } else {
        value
    }
}

impl Document for WebDocument {
    fn candidates(&mut self) -> Vec<NodeId> {
        self.elements.clear();
        let Ok(list) = self.document.query_selector_all("body *") else {
            return Vec::new();
        };
        for i in 0..list.length() {
            if let Some(element) = list.get(i).and_then(|node| node.dyn_into::<Element>().ok()) {
                self.elements.push(element);
            }
        }
        (0..self.elements.len()).map(NodeId).collect()
    }

    fn computed_style(&self, node: NodeId) -> Result<ComputedStyle, DomError> {
        let element = self.element(node)?;
        let style = self
            .window
            .get_computed_style(element)
            .map_err(|e| DomError::Style(js_message(&e)))?
            .ok_or_else(|| DomError::Style("no computed style".into()))?;
        let read = |name: &str| style.get_property_value(name).unwrap_or_default();

        let mut backdrop_filter = read("backdrop-filter");
        if backdrop_filter.is_empty() || backdrop_filter == "none" {
            backdrop_filter = read("-webkit-backdrop-filter");
        }
        let defaults = ComputedStyle::default();
        Ok(ComputedStyle {
            backdrop_filter: or_default(backdrop_filter, &defaults.backdrop_filter),
            filter: or_default(read("filter"), &defaults.filter),
            box_shadow: or_default(read("box-shadow"), &defaults.box_shadow),
            transform: or_default(read("transform"), &defaults.transform),
            animation_name: or_default(read("animation-name"), &defaults.animation_name),
            animation_duration: or_default(read("animation-duration"), &defaults.animation_duration),
            transition_duration: or_default(
                read("transition-duration"),
                &defaults.transition_duration,
            ),
            background_color: or_default(read("background-color"), &defaults.background_color),
        })
    }

    fn bounding_rect(&self, node: NodeId) -> Result<Rect, DomError> {
        let rect = self.element(node)?.get_bounding_client_rect();
        Ok(Rect::new(rect.x(), rect.y(), rect.width(), rect.height()))
    }

    fn viewport(&self) -> Rect {
        let dimension = |value: Result<JsValue, JsValue>| {
            value.ok().and_then(|v| v.as_f64()).unwrap_or(0.0)
        };
        Rect::new(
            0.0,
            0.0,
            dimension(self.window.inner_width()),
            dimension(self.window.inner_height()),
        )
    }

    fn inline_style(
        &self,
        node: NodeId,
        property: StyleProperty,
    ) -> Result<Option<String>, DomError> {
        let style = self.inline_declarations(node)?;
        let value = style
            .get_property_value(property.css_name())
            .map_err(|e| DomError::Style(js_message(&e)))?;
        Ok(Some(value).filter(|v| !v.is_empty()))
    }

    fn set_inline_style(
        &mut self,
        node: NodeId,
        property: StyleProperty,
        value: Option<&str>,
    ) -> Result<(), DomError> {
        let style = self.inline_declarations(node)?;
        for name in css_names(property) {
            let result = match value {
                Some(value) => style.set_property(name, value),
                None => style.remove_property(name).map(|_| ()),
            };
            result.map_err(|e| DomError::Style(js_message(&e)))?;
        }
        Ok(())
    }

    fn set_class(&mut self, node: NodeId, class: &str, enabled: bool) -> Result<(), DomError> {
        self.element(node)?
            .class_list()
            .toggle_with_force(class, enabled)
            .map(|_| ())
            .map_err(|e| DomError::Style(js_message(&e)))
    }

    fn root_classes(&self) -> Vec<String> {
        let Some(root) = self.document.document_element() else {
            return Vec::new();
        };
        let list = root.class_list();
        (0..list.length()).filter_map(|i| list.item(i)).collect()
    }

    fn set_root_class(&mut self, class: &str, enabled: bool) {
        if let Some(root) = self.document.document_element() {
            let _ = root.class_list().toggle_with_force(class, enabled);
        }
    }

    fn has_stylesheet(&self, id: &str) -> bool {
        self.document.get_element_by_id(id).is_some()
    }

    fn inject_stylesheet(&mut self, id: &str, css: &str) -> Result<(), DomError> {
        let to_dom_error = |e: JsValue| DomError::Stylesheet(js_message(&e));
        let head = self
            .document
            .head()
            .ok_or_else(|| DomError::Stylesheet("document has no <head>".into()))?;
        let style = self.document.create_element("style").map_err(to_dom_error)?;
        style.set_id(id);
        style.set_text_content(Some(css));
        head.append_child(&style).map_err(to_dom_error)?;
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Frames, canvas, storage, hardware, page
// ────────────────────────────────────────────────────────────────────────────

pub struct WebFrames {
    window: Window,
}

#[async_trait(?Send)]
impl FrameScheduler for WebFrames {
    async fn next_frame(&self) -> f64 {
        let promise = Promise::new(&mut |resolve, _reject| {
            let callback = Closure::once_into_js(move |timestamp: f64| {
                let _ = resolve.call1(&JsValue::NULL, &JsValue::from_f64(timestamp));
            });
            let _ = self
                .window
                .request_animation_frame(callback.unchecked_ref::<Function>());
        });
        match JsFuture::from(promise).await {
            Ok(timestamp) => timestamp.as_f64().unwrap_or_else(|| self.now_ms()),
            Err(_) => self.now_ms(),
        }
    }

    fn now_ms(&self) -> f64 {
        self.window
            .performance()
            .map(|performance| performance.now())
            .unwrap_or_else(js_sys::Date::now)
    }
    async fn sleep_ms(&self, ms: f64) {
        let promise = Promise::new(&mut |resolve, _reject| {
            let _ = self
                .window
                .set_timeout_with_callback_and_timeout_and_arguments_0(&resolve, ms.max(0.0) as i32);
        });
        let _ = JsFuture::from(promise).await;
    }
}

pub struct WebCanvas {
    context: CanvasRenderingContext2d,
}

impl Canvas2d for WebCanvas {
    fn fill_rect(&mut self, color: &str, x: f64, y: f64, width: f64, height: f64) {
        #[allow(deprecated)]
        self.context.set_fill_style(&JsValue::from_str(color));
        self.context.fill_rect(x, y, width, height);
    }
}

pub struct WebCanvasFactory {
    document: web_sys::Document,
}

impl CanvasFactory for WebCanvasFactory {
    fn create_canvas(&self, width: u32, height: u32) -> Result<Box<dyn Canvas2d>, BenchmarkError> {
        let canvas = self
            .document
            .create_element("canvas")
            .ok()
            .and_then(|element| element.dyn_into::<HtmlCanvasElement>().ok())
            .ok_or(BenchmarkError::CanvasUnavailable)?;
        canvas.set_width(width);
        canvas.set_height(height);
        let context = canvas
            .get_context("2d")
            .ok()
            .flatten()
            .and_then(|context| context.dyn_into::<CanvasRenderingContext2d>().ok())
            .ok_or(BenchmarkError::ContextUnavailable)?;
        Ok(Box::new(WebCanvas { context }))
    }
}

/// `localStorage`, resolved on every call: access can start throwing at any
/// time (privacy mode, policy changes).
pub struct LocalStorageStore {
    window: Window,
}

impl LocalStorageStore {
    fn storage(&self) -> Result<Storage, StorageError> {
        self.window
            .local_storage()
            .map_err(|e| StorageError::Unavailable(js_message(&e)))?
            .ok_or_else(|| StorageError::Unavailable("localStorage disabled".into()))
    }
}

impl KeyValueStore for LocalStorageStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.storage()?
            .get_item(key)
            .map_err(|e| StorageError::Unavailable(js_message(&e)))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.storage()?.set_item(key, value).map_err(|e| {
            let message = js_message(&e);
            if message.contains("Quota") {
                StorageError::QuotaExceeded
            } else {
                StorageError::Unavailable(message)
            }
        })
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.storage()?
            .remove_item(key)
            .map_err(|e| StorageError::Unavailable(js_message(&e)))
    }
}

pub struct WebHardware {
    window: Window,
}

impl HardwareProbe for WebHardware {
    fn device_memory_gb(&self) -> Option<f64> {
        Reflect::get(&self.window.navigator(), &JsValue::from_str("deviceMemory"))
            .ok()
            .and_then(|value| value.as_f64())
    }

    fn logical_cores(&self) -> Option<u32> {
        let cores = self.window.navigator().hardware_concurrency();
        (cores.is_finite() && cores >= 1.0).then_some(cores as u32)
    }
}

pub struct WebPage {
    document: web_sys::Document,
}

#[async_trait(?Send)]
impl PageSignals for WebPage {
    async fn wait_ready(&self) {
        if self.document.ready_state() == "loading" {
            next_event(&self.document, "DOMContentLoaded").await;
        }
    }

    fn is_visible(&self) -> bool {
        self.document.visibility_state() == VisibilityState::Visible
    }

    async fn wait_until_visible(&self) {
        while !self.is_visible() {
            next_event(&self.document, "visibilitychange").await;
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Entry point
// ────────────────────────────────────────────────────────────────────────────

thread_local! {
    static STARTED: Cell<bool> = const { Cell::new(false) };
}

fn build_engine(config: EngineConfig) -> Result<AdaptiveRenderer, EngineError> {
    let window = browser_window()?;
    let document = WebDocument::new(window.clone())?;
    let dom = document.document.clone();

    let frames: Rc<dyn FrameScheduler> = Rc::new(WebFrames {
        window: window.clone(),
    });
    let probe = EnvironmentProbe::new(
        Rc::clone(&frames),
        Box::new(WebCanvasFactory {
            document: dom.clone(),
        }),
        Box::new(WebHardware {
            window: window.clone(),
        }),
        config.clone(),
    );
    let host = Host {
        document: Box::new(document),
        frames,
        storage: Box::new(LocalStorageStore { window }),
        clock: Box::new(SystemClock),
        page: Rc::new(WebPage { document: dom }),
    };
    Ok(AdaptiveRenderer::new(config, host, Box::new(probe)))
}

/// Boots the engine and keeps the fallback monitor running for the life of
/// the page. `config_json` is an optional partial `EngineConfig`; malformed
/// JSON falls back to defaults. Never throws into the page. Calling it again
/// after a successful start is a no-op.
#[wasm_bindgen(js_name = startAdaptiveRender)]
pub fn start(config_json: Option<String>) {
    if STARTED.with(Cell::get) {
        return;
    }

    let config = config_json
        .as_deref()
        .map(EngineConfig::from_json_or_default)
        .unwrap_or_default();
    let mut engine = match build_engine(config) {
        Ok(engine) => engine,
        Err(e) => {
            error!(error = %e, "Adaptive render could not attach to the page");
            return;
        }
    };
    STARTED.with(|started| started.set(true));

    spawn_local(async move {
        engine.run_fallback_loop().await;
    });
}
