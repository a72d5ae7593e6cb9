use std::rc::Rc;

use tracing::debug;

use crate::config::RevealConfig;
use crate::page::{
    EventKind, EventTarget, ListenerOptions, NodeId, ObserverId, Page, event_handler,
    intersection_callback,
};
use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealMode {
    Observer(ObserverId),
    /// No intersection observation available; checks run on scroll and resize.
    Polling,
}

/// Fades marked elements in the first time they enter the viewport.
#[derive(Debug)]
pub struct ScrollReveal {
    targets: Vec<NodeId>,
    config: RevealConfig,
    mode: RevealMode,
}

impl ScrollReveal {
    /// Returns `Ok(None)` without touching the page when nothing is marked.
    pub fn attach(page: &mut dyn Page, config: &RevealConfig) -> Result<Option<Rc<Self>>> {
        let targets = page.query_selector_all(&config.selector)?;
        if targets.is_empty() {
            return Ok(None);
        }
        debug!(count = targets.len(), "fade targets");

        for target in &targets {
            page.class_add(*target, &config.hidden_class)?;
        }

        if page.supports_intersection_observer() {
            let hidden_class = config.hidden_class.clone();
            let revealed_class = config.revealed_class.clone();
            let callback = intersection_callback(move |page, entries, observer| {
                for entry in entries.iter().filter(|entry| entry.is_intersecting) {
                    debug!(node = ?entry.target, ratio = entry.ratio, "reveal");
                    reveal_node(page, entry.target, &hidden_class, &revealed_class)?;
                    page.unobserve(observer, entry.target)?;
                }
                Ok(())
            });
            let observer =
                page.create_intersection_observer(config.intersection_options(), callback)?;
            for target in &targets {
                page.observe(observer, *target)?;
            }
            return Ok(Some(Rc::new(Self {
                targets,
                config: config.clone(),
                mode: RevealMode::Observer(observer),
            })));
        }

        let reveal = Rc::new(Self {
            targets,
            config: config.clone(),
            mode: RevealMode::Polling,
        });
        reveal.check(page)?;

        let state = Rc::clone(&reveal);
        let check = event_handler(move |page, _event| state.check(page));
        page.add_event_listener(
            EventTarget::Window,
            EventKind::Scroll,
            ListenerOptions::passive(),
            Rc::clone(&check),
        )?;
        page.add_event_listener(
            EventTarget::Window,
            EventKind::Resize,
            ListenerOptions::default(),
            check,
        )?;
        Ok(Some(reveal))
    }

    pub fn targets(&self) -> &[NodeId] {
        &self.targets
    }

    pub fn mode(&self) -> RevealMode {
        self.mode
    }

    pub fn is_revealed(&self, page: &dyn Page, node: NodeId) -> Result<bool> {
        page.class_contains(node, &self.config.revealed_class)
    }

    /// Idempotent.
    pub fn reveal(&self, page: &mut dyn Page, node: NodeId) -> Result<()> {
        reveal_node(
            page,
            node,
            &self.config.hidden_class,
            &self.config.revealed_class,
        )
    }

    /// Polling pass: reveals every unrevealed target whose top edge is above
    /// the configured fraction of the viewport.
    pub fn check(&self, page: &mut dyn Page) -> Result<()> {
        let inner_height = page.inner_height();
        for target in &self.targets {
            if self.is_revealed(page, *target)? {
                continue;
            }
            let rect = page.bounding_client_rect(*target)?;
            if fallback_should_reveal(
                rect.top,
                inner_height,
                self.config.fallback_viewport_fraction,
            ) {
                debug!(node = ?target, top = rect.top, "reveal (polling)");
                self.reveal(page, *target)?;
            }
        }
        Ok(())
    }
}

pub fn fallback_should_reveal(top: f64, inner_height: f64, fraction: f64) -> bool {
    top < inner_height * fraction
}

fn reveal_node(
    page: &mut dyn Page,
    node: NodeId,
    hidden_class: &str,
    revealed_class: &str,
) -> Result<()> {
    page.class_add(node, revealed_class)?;
    page.class_remove(node, hidden_class)
}
