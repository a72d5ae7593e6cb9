use std::collections::{HashMap, HashSet};
use std::error::Error as StdError;
use std::fmt;

mod dom;
mod harness;
mod html;
mod selector;
mod site;

pub mod behaviors;
pub mod config;
pub mod page;

#[cfg(feature = "web")]
pub mod web;

pub use behaviors::{ContactFormValidator, ScrollReveal, ScrollTopButton, StatusMessage};
pub use config::{ContactFormConfig, RevealConfig, ScrollTopConfig, SiteConfig};
pub use harness::{Harness, PendingTimer};
pub use page::{
    Event, EventHandler, EventKind, EventTarget, IntersectionCallback, IntersectionEntry,
    IntersectionOptions, ListenerId, ListenerOptions, NodeId, ObserverId, Page, Rect,
    ScrollBehavior, ScrollToOptions, TimerCallback, TimerId,
};
pub use site::{Site, install};

use dom::Dom;
use selector::{
    SelectorAttrCondition, SelectorCombinator, SelectorPart, SelectorPseudoClass, SelectorStep,
    parse_selector_groups,
};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    HtmlParse(String),
    UnsupportedSelector(String),
    SelectorNotFound(String),
    TypeMismatch {
        selector: String,
        expected: String,
        actual: String,
    },
    AssertionFailed {
        selector: String,
        expected: String,
        actual: String,
        dom_snippet: String,
    },
    Runtime(String),
    Config(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HtmlParse(msg) => write!(f, "html parse error: {msg}"),
            Self::UnsupportedSelector(selector) => write!(f, "unsupported selector: {selector}"),
            Self::SelectorNotFound(selector) => write!(f, "selector not found: {selector}"),
            Self::TypeMismatch {
                selector,
                expected,
                actual,
            } => write!(
                f,
                "type mismatch for {selector}: expected {expected}, actual {actual}"
            ),
            Self::AssertionFailed {
                selector,
                expected,
                actual,
                dom_snippet,
            } => write!(
                f,
                "assertion failed for {selector}: expected {expected}, actual {actual}, snippet {dom_snippet}"
            ),
            Self::Runtime(msg) => write!(f, "runtime error: {msg}"),
            Self::Config(msg) => write!(f, "config error: {msg}"),
        }
    }
}

impl StdError for Error {}

fn truncate_chars(value: &str, max_chars: usize) -> String {
    let mut chars = value.chars();
    let mut out = String::new();
    for _ in 0..max_chars {
        let Some(ch) = chars.next() else {
            return out;
        };
        out.push(ch);
    }
    if chars.next().is_some() {
        out.push_str("...");
    }
    out
}

#[cfg(test)]
mod tests;
