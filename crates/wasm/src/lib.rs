#![deny(unsafe_code)]
//! Browser host for the starfield.
//!
//! Binds a `<canvas>` and the element it overlays, forwards mouse and window
//! events to the field, and ticks it on every animation frame:
//!
//! ```js
//! const field = Starfield.start("hero-canvas", "hero", 42, "{}");
//! // later
//! field?.stop();
//! ```

mod canvas;

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use starfield_core::{Field, FieldConfig, FieldError};
use thiserror::Error;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{Document, Event, EventTarget, HtmlCanvasElement, HtmlElement, MouseEvent, Window};

pub use canvas::{CanvasSurface, ElementContainer};

type SharedField = Rc<RefCell<Field<ElementContainer, CanvasSurface>>>;
type FrameCallback = Rc<RefCell<Option<Closure<dyn FnMut()>>>>;

/// Reasons the field declined to start.
#[derive(Debug, Error)]
enum StartError {
    #[error(transparent)]
    Field(#[from] FieldError),
    #[error("invalid params JSON: {0}")]
    Params(String),
    #[error("browser API unavailable: {0}")]
    Browser(String),
}

impl From<JsValue> for StartError {
    fn from(e: JsValue) -> Self {
        StartError::Browser(format!("{e:?}"))
    }
}

/// An event listener that stays attached until removed.
struct Listener {
    target: EventTarget,
    kind: &'static str,
    callback: Closure<dyn FnMut(Event)>,
}

impl Listener {
    fn attach(
        target: &EventTarget,
        kind: &'static str,
        handler: impl FnMut(Event) + 'static,
    ) -> Result<Self, JsValue> {
        let callback = Closure::wrap(Box::new(handler) as Box<dyn FnMut(Event)>);
        target.add_event_listener_with_callback(kind, callback.as_ref().unchecked_ref())?;
        Ok(Self {
            target: target.clone(),
            kind,
            callback,
        })
    }

    fn detach(self) {
        let result = self
            .target
            .remove_event_listener_with_callback(self.kind, self.callback.as_ref().unchecked_ref());
        if let Err(e) = result {
            log::warn!("removing {} listener failed: {e:?}", self.kind);
        }
    }
}

/// A running starfield. Dropping it, or calling [`stop`](Starfield::stop),
/// ends the animation loop and detaches every listener.
#[wasm_bindgen]
pub struct Starfield {
    field: SharedField,
    window: Window,
    listeners: Vec<Listener>,
    frame: FrameCallback,
    request: Rc<Cell<Option<i32>>>,
}

#[wasm_bindgen]
impl Starfield {
    /// Starts a field over `container_id` drawing into `canvas_id`.
    ///
    /// Returns `undefined` when either element is missing, `params` is not a
    /// valid field configuration, or the browser refuses a 2D context. The
    /// reason is logged to the console.
    pub fn start(canvas_id: &str, container_id: &str, seed: u32, params: &str) -> Option<Starfield> {
        init_logging();
        match Self::try_start(canvas_id, container_id, seed, params) {
            Ok(starfield) => Some(starfield),
            Err(e) => {
                log::warn!("starfield not started: {e}");
                None
            }
        }
    }

    /// Ends the loop and detaches listeners. Safe to call more than once.
    pub fn stop(&mut self) {
        if let Some(id) = self.request.take() {
            if let Err(e) = self.window.cancel_animation_frame(id) {
                log::warn!("cancelling animation frame failed: {e:?}");
            }
        }
        self.frame.borrow_mut().take();
        for listener in self.listeners.drain(..) {
            listener.detach();
        }
    }

    /// Whether the animation loop is still scheduled.
    #[wasm_bindgen(getter)]
    pub fn running(&self) -> bool {
        self.frame.borrow().is_some()
    }

    #[wasm_bindgen(getter)]
    pub fn frames(&self) -> f64 {
        self.field.borrow().frame_count() as f64
    }

    #[wasm_bindgen(getter)]
    pub fn particles(&self) -> usize {
        self.field.borrow().particles().len()
    }
}

impl Starfield {
    fn try_start(
        canvas_id: &str,
        container_id: &str,
        seed: u32,
        params: &str,
    ) -> Result<Starfield, StartError> {
        let window = web_sys::window().ok_or_else(|| StartError::Browser("no window".into()))?;
        let document = window
            .document()
            .ok_or_else(|| StartError::Browser("no document".into()))?;

        let config = parse_config(params)?;
        let surface = element::<HtmlCanvasElement>(&document, canvas_id)
            .map(CanvasSurface::new)
            .transpose()?;
        let container = element::<HtmlElement>(&document, container_id).map(ElementContainer::new);
        let field = Field::initialize(container, surface, config, u64::from(seed))?;
        let field: SharedField = Rc::new(RefCell::new(field));

        let target: EventTarget = field.borrow().container().element().clone().into();
        let listeners = vec![
            Listener::attach(&target, "mousemove", {
                let field = field.clone();
                move |event| {
                    if let Some((x, y)) = local_position(&field, &event) {
                        field.borrow_mut().handle_pointer_move(x, y);
                    }
                }
            })?,
            Listener::attach(&target, "mouseleave", {
                let field = field.clone();
                move |_| field.borrow_mut().handle_pointer_leave()
            })?,
            Listener::attach(&target, "click", {
                let field = field.clone();
                move |event| {
                    if let Some((x, y)) = local_position(&field, &event) {
                        let report = field.borrow_mut().handle_click(x, y);
                        log::debug!("click kicked {} particles", report.kicked);
                    }
                }
            })?,
            Listener::attach(window.as_ref(), "resize", {
                let field = field.clone();
                move |_| field.borrow_mut().handle_resize()
            })?,
        ];

        let mut starfield = Starfield {
            field,
            window,
            listeners,
            frame: Rc::new(RefCell::new(None)),
            request: Rc::new(Cell::new(None)),
        };
        starfield.animate()?;
        log::info!("starfield started");
        Ok(starfield)
    }

    /// Installs the self-rescheduling frame callback and requests the first
    /// frame.
    fn animate(&mut self) -> Result<(), JsValue> {
        let field = self.field.clone();
        let window = self.window.clone();
        let frame = self.frame.clone();
        let request = self.request.clone();
        let tick = Closure::wrap(Box::new(move || {
            request.set(None);
            field.borrow_mut().tick();
            if let Some(callback) = frame.borrow().as_ref() {
                match window.request_animation_frame(callback.as_ref().unchecked_ref()) {
                    Ok(id) => request.set(Some(id)),
                    Err(e) => log::error!("requestAnimationFrame failed: {e:?}"),
                }
            }
        }) as Box<dyn FnMut()>);
        let id = self.window.request_animation_frame(tick.as_ref().unchecked_ref())?;
        self.request.set(Some(id));
        *self.frame.borrow_mut() = Some(tick);
        Ok(())
    }
}

impl Drop for Starfield {
    fn drop(&mut self) {
        self.stop();
    }
}

fn init_logging() {
    console_error_panic_hook::set_once();
    console_log::init_with_level(log::Level::Info).ok();
}

fn parse_config(params: &str) -> Result<FieldConfig, StartError> {
    let params = if params.trim().is_empty() { "{}" } else { params };
    let value: serde_json::Value =
        serde_json::from_str(params).map_err(|e| StartError::Params(e.to_string()))?;
    Ok(FieldConfig::from_json_validated(&value)?)
}

fn element<T: JsCast>(document: &Document, id: &str) -> Option<T> {
    document.get_element_by_id(id)?.dyn_into::<T>().ok()
}

/// Client coordinates of a mouse event, relative to the container's box.
fn local_position(field: &SharedField, event: &Event) -> Option<(f64, f64)> {
    let event = event.dyn_ref::<MouseEvent>()?;
    let rect = field.borrow().container().element().get_bounding_client_rect();
    Some((
        f64::from(event.client_x()) - rect.left(),
        f64::from(event.client_y()) - rect.top(),
    ))
}
