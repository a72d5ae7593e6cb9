//! Binds [`Page`] to a real browser document through `web-sys`.
//!
//! Element handles are kept in an arena so behaviors keep working with
//! plain [`NodeId`]s. Listener closures live as long as the page.

use std::cell::RefCell;
use std::rc::Rc;

use js_sys::{Array, Reflect};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{
    AddEventListenerOptions, Document, Element, HtmlFormElement, HtmlInputElement,
    HtmlTextAreaElement, IntersectionObserver, IntersectionObserverEntry,
    IntersectionObserverInit, NodeList, Window,
};

use crate::config::SiteConfig;
use crate::page::{
    Event, EventHandler, EventKind, EventTarget, IntersectionCallback, IntersectionEntry,
    IntersectionOptions, ListenerId, ListenerOptions, NodeId, ObserverId, Page, Rect,
    ScrollBehavior, ScrollToOptions, TimerCallback, TimerId,
};
use crate::{Error, Result};

struct Inner {
    window: Window,
    document: Document,
    nodes: Vec<Element>,
    observers: Vec<IntersectionObserver>,
    next_listener_id: usize,
}

#[derive(Clone)]
pub struct WebPage {
    inner: Rc<RefCell<Inner>>,
}

fn js_error(context: &str, err: JsValue) -> Error {
    Error::Runtime(format!("{context}: {err:?}"))
}

impl WebPage {
    pub fn new() -> Result<Self> {
        let window =
            web_sys::window().ok_or_else(|| Error::Runtime("no global window".into()))?;
        let document = window
            .document()
            .ok_or_else(|| Error::Runtime("window has no document".into()))?;
        Ok(Self {
            inner: Rc::new(RefCell::new(Inner {
                window,
                document,
                nodes: Vec::new(),
                observers: Vec::new(),
                next_listener_id: 0,
            })),
        })
    }

    fn register(&self, element: Element) -> NodeId {
        let mut inner = self.inner.borrow_mut();
        if let Some(pos) = inner.nodes.iter().position(|known| *known == element) {
            return NodeId(pos);
        }
        inner.nodes.push(element);
        NodeId(inner.nodes.len() - 1)
    }

    fn element(&self, node: NodeId) -> Result<Element> {
        self.inner
            .borrow()
            .nodes
            .get(node.0)
            .cloned()
            .ok_or_else(|| Error::Runtime(format!("unknown node handle {}", node.0)))
    }

    fn register_list(&self, list: NodeList) -> Vec<NodeId> {
        (0..list.length())
            .filter_map(|index| list.item(index))
            .filter_map(|node| node.dyn_into::<Element>().ok())
            .map(|element| self.register(element))
            .collect()
    }

    fn js_target(&self, target: EventTarget) -> Result<web_sys::EventTarget> {
        Ok(match target {
            EventTarget::Window => self.inner.borrow().window.clone().into(),
            EventTarget::Document => self.inner.borrow().document.clone().into(),
            EventTarget::Node(node) => self.element(node)?.into(),
        })
    }
}

impl Page for WebPage {
    fn query_selector_all(&self, selector: &str) -> Result<Vec<NodeId>> {
        let document = self.inner.borrow().document.clone();
        let list = document
            .query_selector_all(selector)
            .map_err(|_| Error::UnsupportedSelector(selector.into()))?;
        Ok(self.register_list(list))
    }

    fn query_selector_all_in(&self, scope: NodeId, selector: &str) -> Result<Vec<NodeId>> {
        let list = self
            .element(scope)?
            .query_selector_all(selector)
            .map_err(|_| Error::UnsupportedSelector(selector.into()))?;
        Ok(self.register_list(list))
    }

    fn class_add(&mut self, node: NodeId, class_name: &str) -> Result<()> {
        self.element(node)?
            .class_list()
            .add_1(class_name)
            .map_err(|err| js_error("classList.add", err))
    }

    fn class_remove(&mut self, node: NodeId, class_name: &str) -> Result<()> {
        self.element(node)?
            .class_list()
            .remove_1(class_name)
            .map_err(|err| js_error("classList.remove", err))
    }

    fn class_contains(&self, node: NodeId, class_name: &str) -> Result<bool> {
        Ok(self.element(node)?.class_list().contains(class_name))
    }

    fn attribute(&self, node: NodeId, name: &str) -> Result<Option<String>> {
        Ok(self.element(node)?.get_attribute(name))
    }

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) -> Result<()> {
        self.element(node)?
            .set_attribute(name, value)
            .map_err(|err| js_error("setAttribute", err))
    }

    fn value(&self, node: NodeId) -> Result<String> {
        let element = self.element(node)?;
        if let Some(input) = element.dyn_ref::<HtmlInputElement>() {
            return Ok(input.value());
        }
        if let Some(textarea) = element.dyn_ref::<HtmlTextAreaElement>() {
            return Ok(textarea.value());
        }
        let value = Reflect::get(&element, &JsValue::from_str("value"))
            .map_err(|err| js_error("value", err))?;
        Ok(value.as_string().unwrap_or_default())
    }

    fn text_content(&self, node: NodeId) -> Result<String> {
        Ok(self.element(node)?.text_content().unwrap_or_default())
    }

    fn set_text_content(&mut self, node: NodeId, text: &str) -> Result<()> {
        self.element(node)?.set_text_content(Some(text));
        Ok(())
    }

    fn create_element(&mut self, tag_name: &str) -> Result<NodeId> {
        let document = self.inner.borrow().document.clone();
        let element = document
            .create_element(tag_name)
            .map_err(|err| js_error("createElement", err))?;
        Ok(self.register(element))
    }

    fn insert_after(&mut self, anchor: NodeId, node: NodeId) -> Result<()> {
        let element = self.element(node)?;
        self.element(anchor)?
            .insert_adjacent_element("afterend", &element)
            .map_err(|err| js_error("insertAdjacentElement", err))?;
        Ok(())
    }

    fn reset_form(&mut self, form: NodeId) -> Result<()> {
        let element = self.element(form)?;
        let form = element
            .dyn_ref::<HtmlFormElement>()
            .ok_or_else(|| Error::Runtime("reset target is not a form".into()))?;
        form.reset();
        Ok(())
    }

    fn bounding_client_rect(&self, node: NodeId) -> Result<Rect> {
        let rect = self.element(node)?.get_bounding_client_rect();
        Ok(Rect {
            top: rect.top(),
            height: rect.height(),
        })
    }

    fn scroll_y(&self) -> f64 {
        self.inner.borrow().window.scroll_y().unwrap_or(0.0)
    }

    fn inner_height(&self) -> f64 {
        self.inner
            .borrow()
            .window
            .inner_height()
            .ok()
            .and_then(|height| height.as_f64())
            .unwrap_or(0.0)
    }

    fn document_is_loading(&self) -> bool {
        self.inner.borrow().document.ready_state() == "loading"
    }

    fn scroll_to(&mut self, options: ScrollToOptions) -> Result<()> {
        let js_options = web_sys::ScrollToOptions::new();
        js_options.set_top(options.top);
        js_options.set_behavior(match options.behavior {
            ScrollBehavior::Auto => web_sys::ScrollBehavior::Auto,
            ScrollBehavior::Smooth => web_sys::ScrollBehavior::Smooth,
        });
        self.inner
            .borrow()
            .window
            .scroll_to_with_scroll_to_options(&js_options);
        Ok(())
    }

    fn add_event_listener(
        &mut self,
        target: EventTarget,
        kind: EventKind,
        options: ListenerOptions,
        handler: EventHandler,
    ) -> Result<ListenerId> {
        let js_target = self.js_target(target)?;
        let page = self.clone();
        let closure = Closure::<dyn FnMut(web_sys::Event)>::new(move |js_event: web_sys::Event| {
            let mut page = page.clone();
            let mut event = Event::new(kind, target).with_passive(options.passive);
            let result = match handler.try_borrow_mut() {
                Ok(mut handler) => (&mut *handler)(&mut page, &mut event),
                Err(_) => Err(Error::Runtime("re-entrant listener".into())),
            };
            if event.default_prevented() {
                js_event.prevent_default();
            }
            if let Err(err) = result {
                tracing::error!(event = kind.as_str(), %err, "listener failed");
            }
        });

        let js_options = AddEventListenerOptions::new();
        js_options.set_passive(options.passive);
        js_target
            .add_event_listener_with_callback_and_add_event_listener_options(
                kind.as_str(),
                closure.as_ref().unchecked_ref(),
                &js_options,
            )
            .map_err(|err| js_error("addEventListener", err))?;
        closure.forget();

        let mut inner = self.inner.borrow_mut();
        let id = ListenerId(inner.next_listener_id);
        inner.next_listener_id += 1;
        Ok(id)
    }

    fn set_timeout(&mut self, delay_ms: i64, callback: TimerCallback) -> Result<TimerId> {
        let page = self.clone();
        let closure = Closure::once_into_js(move || {
            let mut page = page;
            if let Err(err) = callback(&mut page) {
                tracing::error!(%err, "timer callback failed");
            }
        });
        let delay = i32::try_from(delay_ms.max(0)).unwrap_or(i32::MAX);
        let window = self.inner.borrow().window.clone();
        let handle = window
            .set_timeout_with_callback_and_timeout_and_arguments_0(
                closure.unchecked_ref(),
                delay,
            )
            .map_err(|err| js_error("setTimeout", err))?;
        Ok(TimerId(i64::from(handle)))
    }

    fn clear_timeout(&mut self, timer: TimerId) {
        if let Ok(handle) = i32::try_from(timer.0) {
            self.inner.borrow().window.clear_timeout_with_handle(handle);
        }
    }

    fn supports_intersection_observer(&self) -> bool {
        let window = self.inner.borrow().window.clone();
        Reflect::has(&window, &JsValue::from_str("IntersectionObserver")).unwrap_or(false)
    }

    fn create_intersection_observer(
        &mut self,
        options: IntersectionOptions,
        callback: IntersectionCallback,
    ) -> Result<ObserverId> {
        let id = ObserverId(self.inner.borrow().observers.len());
        let page = self.clone();
        let closure = Closure::<dyn FnMut(Array, IntersectionObserver)>::new(
            move |js_entries: Array, _observer: IntersectionObserver| {
                let mut page = page.clone();
                let entries = js_entries
                    .iter()
                    .filter_map(|value| value.dyn_into::<IntersectionObserverEntry>().ok())
                    .map(|entry| IntersectionEntry {
                        target: page.register(entry.target()),
                        is_intersecting: entry.is_intersecting(),
                        ratio: entry.intersection_ratio(),
                    })
                    .collect::<Vec<_>>();
                let result = match callback.try_borrow_mut() {
                    Ok(mut callback) => (&mut *callback)(&mut page, &entries, id),
                    Err(_) => Err(Error::Runtime("re-entrant intersection callback".into())),
                };
                if let Err(err) = result {
                    tracing::error!(%err, "intersection callback failed");
                }
            },
        );

        let init = IntersectionObserverInit::new();
        init.set_threshold(&JsValue::from_f64(options.threshold));
        init.set_root_margin(&options.root_margin_css());
        let observer =
            IntersectionObserver::new_with_options(closure.as_ref().unchecked_ref(), &init)
                .map_err(|err| js_error("IntersectionObserver", err))?;
        closure.forget();

        self.inner.borrow_mut().observers.push(observer);
        Ok(id)
    }

    fn observe(&mut self, observer: ObserverId, node: NodeId) -> Result<()> {
        let element = self.element(node)?;
        let inner = self.inner.borrow();
        let observer = inner
            .observers
            .get(observer.0)
            .ok_or_else(|| Error::Runtime(format!("unknown observer {}", observer.0)))?;
        observer.observe(&element);
        Ok(())
    }

    fn unobserve(&mut self, observer: ObserverId, node: NodeId) -> Result<()> {
        let element = self.element(node)?;
        let inner = self.inner.borrow();
        let observer = inner
            .observers
            .get(observer.0)
            .ok_or_else(|| Error::Runtime(format!("unknown observer {}", observer.0)))?;
        observer.unobserve(&element);
        Ok(())
    }
}

/// Entry point when loaded as a wasm module: installs every behavior with
/// the default configuration. Module instantiation is asynchronous, so this
/// often runs after `DOMContentLoaded`; `install` then attaches right away.
#[wasm_bindgen(start)]
pub fn start() -> std::result::Result<(), JsValue> {
    let mut page = WebPage::new().map_err(|err| JsValue::from_str(&err.to_string()))?;
    crate::install(&mut page, SiteConfig::default(), None)
        .map_err(|err| JsValue::from_str(&err.to_string()))?;
    Ok(())
}
