use std::rc::Rc;

use tracing::trace;

use crate::config::ScrollTopConfig;
use crate::page::{
    EventKind, EventTarget, ListenerOptions, NodeId, Page, ScrollBehavior, ScrollToOptions,
    event_handler,
};
use crate::Result;

#[derive(Debug)]
pub struct ScrollTopButton {
    button: NodeId,
    config: ScrollTopConfig,
}

impl ScrollTopButton {
    pub fn attach(page: &mut dyn Page, config: &ScrollTopConfig) -> Result<Option<Rc<Self>>> {
        let Some(button) = page.query_selector(&config.selector)? else {
            return Ok(None);
        };
        let top_button = Rc::new(Self {
            button,
            config: config.clone(),
        });

        page.add_event_listener(
            EventTarget::Node(button),
            EventKind::Click,
            ListenerOptions::default(),
            event_handler(|page, event| {
                event.prevent_default();
                page.scroll_to(ScrollToOptions {
                    top: 0.0,
                    behavior: ScrollBehavior::Smooth,
                })
            }),
        )?;

        top_button.toggle(page)?;
        let state = Rc::clone(&top_button);
        page.add_event_listener(
            EventTarget::Window,
            EventKind::Scroll,
            ListenerOptions::passive(),
            event_handler(move |page, _event| state.toggle(page)),
        )?;
        Ok(Some(top_button))
    }

    pub fn button(&self) -> NodeId {
        self.button
    }

    /// Syncs the hide marker with the current scroll offset.
    pub fn toggle(&self, page: &mut dyn Page) -> Result<()> {
        let scroll_y = page.scroll_y();
        trace!(scroll_y, "top button toggle");
        if should_show_top_button(scroll_y, self.config.threshold) {
            page.class_remove(self.button, &self.config.hide_class)
        } else {
            page.class_add(self.button, &self.config.hide_class)
        }
    }
}

pub fn should_show_top_button(scroll_y: f64, threshold: f64) -> bool {
    scroll_y > threshold
}
