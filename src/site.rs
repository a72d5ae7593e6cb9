use std::cell::RefCell;
use std::rc::Rc;

use tracing::{debug, warn};

use crate::behaviors::{ContactFormValidator, ScrollReveal, ScrollTopButton};
use crate::config::SiteConfig;
use crate::page::{EventKind, EventTarget, ListenerId, ListenerOptions, Page, event_handler};
use crate::{Error, Result};

/// The behaviors attached to one page. Any of them may be absent.
#[derive(Debug, Default)]
pub struct Site {
    pub reveal: Option<Rc<ScrollReveal>>,
    pub contact_form: Option<Rc<RefCell<ContactFormValidator>>>,
    pub scroll_top: Option<Rc<ScrollTopButton>>,
    /// Attach failures, one per behavior that was skipped because of them.
    pub errors: Vec<Error>,
}

impl Site {
    /// Attaches each behavior on its own. A behavior that fails to attach is
    /// logged and left out; the others still attach.
    pub fn setup(page: &mut dyn Page, config: &SiteConfig) -> Self {
        let mut errors = Vec::new();
        let reveal = attached(
            "reveal",
            ScrollReveal::attach(page, &config.reveal),
            &mut errors,
        );
        let contact_form = attached(
            "contact_form",
            ContactFormValidator::attach(page, &config.contact_form),
            &mut errors,
        );
        let scroll_top = attached(
            "scroll_top",
            ScrollTopButton::attach(page, &config.scroll_top),
            &mut errors,
        );
        let site = Self {
            reveal,
            contact_form,
            scroll_top,
            errors,
        };
        debug!(
            reveal = site.reveal.is_some(),
            contact_form = site.contact_form.is_some(),
            scroll_top = site.scroll_top.is_some(),
            failed = site.errors.len(),
            "site attached"
        );
        site
    }
}

fn attached<T>(behavior: &str, result: Result<Option<T>>, errors: &mut Vec<Error>) -> Option<T> {
    match result {
        Ok(found) => found,
        Err(err) => {
            warn!(behavior, error = %err, "behavior failed to attach");
            errors.push(err);
            None
        }
    }
}

/// Runs [`Site::setup`] once the document has been parsed. While the
/// document is still loading this registers a `DOMContentLoaded` listener
/// and returns its id; otherwise setup runs immediately and `None` is
/// returned. The attached site is handed to `on_ready` when given.
pub fn install(
    page: &mut dyn Page,
    config: SiteConfig,
    on_ready: Option<Box<dyn FnOnce(Site)>>,
) -> Result<Option<ListenerId>> {
    config.validate()?;
    if !page.document_is_loading() {
        debug!("document already parsed, attaching now");
        ready(page, &config, on_ready);
        return Ok(None);
    }

    let mut pending = Some((config, on_ready));
    let id = page.add_event_listener(
        EventTarget::Document,
        EventKind::DomContentLoaded,
        ListenerOptions::default(),
        event_handler(move |page, _event| {
            if let Some((config, on_ready)) = pending.take() {
                ready(page, &config, on_ready);
            }
            Ok(())
        }),
    )?;
    Ok(Some(id))
}

fn ready(page: &mut dyn Page, config: &SiteConfig, on_ready: Option<Box<dyn FnOnce(Site)>>) {
    let site = Site::setup(page, config);
    if let Some(on_ready) = on_ready {
        on_ready(site);
    }
}
