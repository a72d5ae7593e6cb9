//! The capability surface behaviors are written against.
//!
//! A [`Page`] is anything that can answer selector queries, mutate element
//! state, report the viewport, run timers and deliver events. [`crate::Harness`]
//! implements it in memory for tests; the `web` feature binds it to a real
//! browser document.

use std::cell::RefCell;
use std::rc::Rc;

use crate::Result;

/// Opaque element handle issued by a [`Page`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(pub(crate) i64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(pub(crate) usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub(crate) usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventTarget {
    Window,
    Document,
    Node(NodeId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    DomContentLoaded,
    Scroll,
    Resize,
    Click,
    Submit,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DomContentLoaded => "DOMContentLoaded",
            Self::Scroll => "scroll",
            Self::Resize => "resize",
            Self::Click => "click",
            Self::Submit => "submit",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "DOMContentLoaded" => Some(Self::DomContentLoaded),
            "scroll" => Some(Self::Scroll),
            "resize" => Some(Self::Resize),
            "click" => Some(Self::Click),
            "submit" => Some(Self::Submit),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListenerOptions {
    pub passive: bool,
}

impl ListenerOptions {
    pub fn passive() -> Self {
        Self { passive: true }
    }
}

/// Event as seen by a single listener invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub kind: EventKind,
    pub target: EventTarget,
    passive: bool,
    default_prevented: bool,
}

impl Event {
    pub fn new(kind: EventKind, target: EventTarget) -> Self {
        Self {
            kind,
            target,
            passive: false,
            default_prevented: false,
        }
    }

    pub(crate) fn with_passive(mut self, passive: bool) -> Self {
        self.passive = passive;
        self
    }

    /// No effect while a passive listener is running.
    pub fn prevent_default(&mut self) {
        if !self.passive {
            self.default_prevented = true;
        }
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented
    }

    pub fn is_passive(&self) -> bool {
        self.passive
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScrollBehavior {
    #[default]
    Auto,
    Smooth,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollToOptions {
    pub top: f64,
    pub behavior: ScrollBehavior,
}

/// Viewport-relative vertical extent of an element.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub top: f64,
    pub height: f64,
}

impl Rect {
    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntersectionOptions {
    /// Minimum visible fraction of the target.
    pub threshold: f64,
    /// Signed fraction of viewport height added to the bottom edge of the
    /// root; negative values shrink the trigger region.
    pub root_margin_bottom: f64,
}

impl IntersectionOptions {
    /// Bottom edge of the trigger region in viewport coordinates.
    pub fn root_bottom(&self, viewport_height: f64) -> f64 {
        viewport_height * (1.0 + self.root_margin_bottom)
    }

    /// Fraction of `rect` inside the margin-adjusted viewport.
    pub fn ratio(&self, rect: Rect, viewport_height: f64) -> f64 {
        let root_bottom = self.root_bottom(viewport_height);
        if rect.height <= 0.0 {
            return if rect.top >= 0.0 && rect.top <= root_bottom {
                1.0
            } else {
                0.0
            };
        }
        let visible = rect.bottom().min(root_bottom) - rect.top.max(0.0);
        (visible / rect.height).clamp(0.0, 1.0)
    }

    pub fn is_intersecting(&self, rect: Rect, viewport_height: f64) -> bool {
        let ratio = self.ratio(rect, viewport_height);
        if self.threshold > 0.0 {
            ratio >= self.threshold
        } else {
            ratio > 0.0
        }
    }

    /// CSS `rootMargin` form, e.g. `0px 0px -8% 0px`.
    pub fn root_margin_css(&self) -> String {
        let percent = self.root_margin_bottom * 100.0;
        format!("0px 0px {}% 0px", format_percent(percent))
    }
}

fn format_percent(value: f64) -> String {
    let rounded = (value * 1000.0).round() / 1000.0;
    if rounded.fract() == 0.0 {
        format!("{}", rounded as i64)
    } else {
        format!("{rounded}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntersectionEntry {
    pub target: NodeId,
    pub is_intersecting: bool,
    pub ratio: f64,
}

pub type EventHandler = Rc<RefCell<dyn FnMut(&mut dyn Page, &mut Event) -> Result<()>>>;
pub type TimerCallback = Box<dyn FnOnce(&mut dyn Page) -> Result<()>>;
pub type IntersectionCallback =
    Rc<RefCell<dyn FnMut(&mut dyn Page, &[IntersectionEntry], ObserverId) -> Result<()>>>;

pub fn event_handler<F>(handler: F) -> EventHandler
where
    F: FnMut(&mut dyn Page, &mut Event) -> Result<()> + 'static,
{
    Rc::new(RefCell::new(handler))
}

pub fn intersection_callback<F>(callback: F) -> IntersectionCallback
where
    F: FnMut(&mut dyn Page, &[IntersectionEntry], ObserverId) -> Result<()> + 'static,
{
    Rc::new(RefCell::new(callback))
}

pub trait Page {
    fn query_selector(&self, selector: &str) -> Result<Option<NodeId>> {
        Ok(self.query_selector_all(selector)?.into_iter().next())
    }
    fn query_selector_all(&self, selector: &str) -> Result<Vec<NodeId>>;
    fn query_selector_in(&self, scope: NodeId, selector: &str) -> Result<Option<NodeId>> {
        Ok(self.query_selector_all_in(scope, selector)?.into_iter().next())
    }
    fn query_selector_all_in(&self, scope: NodeId, selector: &str) -> Result<Vec<NodeId>>;

    fn class_add(&mut self, node: NodeId, class_name: &str) -> Result<()>;
    fn class_remove(&mut self, node: NodeId, class_name: &str) -> Result<()>;
    fn class_contains(&self, node: NodeId, class_name: &str) -> Result<bool>;
    fn attribute(&self, node: NodeId, name: &str) -> Result<Option<String>>;
    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) -> Result<()>;
    /// Current value of a form control.
    fn value(&self, node: NodeId) -> Result<String>;
    fn text_content(&self, node: NodeId) -> Result<String>;
    fn set_text_content(&mut self, node: NodeId, text: &str) -> Result<()>;
    /// Creates a detached element.
    fn create_element(&mut self, tag_name: &str) -> Result<NodeId>;
    /// Moves `node` to directly follow `anchor`.
    fn insert_after(&mut self, anchor: NodeId, node: NodeId) -> Result<()>;
    /// Restores every control in the form to its default value.
    fn reset_form(&mut self, form: NodeId) -> Result<()>;
    fn bounding_client_rect(&self, node: NodeId) -> Result<Rect>;

    fn scroll_y(&self) -> f64;
    fn inner_height(&self) -> f64;
    /// True until the document has been parsed (`readyState == "loading"`).
    fn document_is_loading(&self) -> bool;
    fn scroll_to(&mut self, options: ScrollToOptions) -> Result<()>;

    fn add_event_listener(
        &mut self,
        target: EventTarget,
        kind: EventKind,
        options: ListenerOptions,
        handler: EventHandler,
    ) -> Result<ListenerId>;

    fn set_timeout(&mut self, delay_ms: i64, callback: TimerCallback) -> Result<TimerId>;
    /// Unknown or already fired ids are ignored.
    fn clear_timeout(&mut self, timer: TimerId);

    fn supports_intersection_observer(&self) -> bool;
    fn create_intersection_observer(
        &mut self,
        options: IntersectionOptions,
        callback: IntersectionCallback,
    ) -> Result<ObserverId>;
    fn observe(&mut self, observer: ObserverId, node: NodeId) -> Result<()>;
    fn unobserve(&mut self, observer: ObserverId, node: NodeId) -> Result<()>;
}
