use std::cell::RefCell;
use std::rc::Rc;

use tracing::debug;

use crate::config::ContactFormConfig;
use crate::page::{
    Event, EventKind, EventTarget, ListenerOptions, NodeId, Page, TimerId, event_handler,
};
use crate::selector::quote_attr_value;
use crate::Result;

/// Transient status line under the submit button.
#[derive(Debug)]
pub struct StatusMessage {
    node: NodeId,
    shown_class: String,
    error_class: String,
    hide_delay_ms: i64,
    hide_timer: Option<TimerId>,
}

impl StatusMessage {
    /// Reuses the form's existing message element, or creates one right
    /// after the submit button.
    pub fn materialize(
        page: &mut dyn Page,
        form: NodeId,
        submit_button: NodeId,
        config: &ContactFormConfig,
    ) -> Result<Self> {
        let existing = page.query_selector_in(form, &format!(".{}", config.message_class))?;
        let node = match existing {
            Some(node) => node,
            None => {
                let node = page.create_element("div")?;
                page.set_attribute(node, "class", &config.message_class)?;
                page.insert_after(submit_button, node)?;
                node
            }
        };
        Ok(Self {
            node,
            shown_class: config.message_shown_class.clone(),
            error_class: config.message_error_class.clone(),
            hide_delay_ms: config.hide_delay_ms,
            hide_timer: None,
        })
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn pending_hide(&self) -> Option<TimerId> {
        self.hide_timer
    }

    /// Shows `text` and restarts the auto-hide delay.
    pub fn show(&mut self, page: &mut dyn Page, text: &str, is_error: bool) -> Result<()> {
        page.set_text_content(self.node, text)?;
        page.class_add(self.node, &self.shown_class)?;
        if is_error {
            page.class_add(self.node, &self.error_class)?;
        } else {
            page.class_remove(self.node, &self.error_class)?;
        }

        if let Some(timer) = self.hide_timer.take() {
            page.clear_timeout(timer);
        }
        let node = self.node;
        let shown_class = self.shown_class.clone();
        let timer = page.set_timeout(
            self.hide_delay_ms,
            Box::new(move |page: &mut dyn Page| page.class_remove(node, &shown_class)),
        )?;
        self.hide_timer = Some(timer);
        Ok(())
    }
}

/// Result of checking the required prefix of a form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationOutcome {
    pub checked: Vec<NodeId>,
    pub empty: Vec<NodeId>,
}

impl ValidationOutcome {
    pub fn is_valid(&self) -> bool {
        self.empty.is_empty()
    }
}

#[derive(Debug)]
pub struct ContactFormValidator {
    form: NodeId,
    submit_button: NodeId,
    message: StatusMessage,
    config: ContactFormConfig,
}

impl ContactFormValidator {
    /// Returns `Ok(None)` when there is no form or the form has no button.
    pub fn attach(
        page: &mut dyn Page,
        config: &ContactFormConfig,
    ) -> Result<Option<Rc<RefCell<Self>>>> {
        let Some(form) = page.query_selector(&config.form_selector)? else {
            return Ok(None);
        };
        let submit_button = match page.query_selector_in(form, &config.submit_selector)? {
            Some(button) => button,
            None => match page.query_selector_in(form, &config.submit_fallback_selector)? {
                Some(button) => button,
                None => return Ok(None),
            },
        };

        let message = StatusMessage::materialize(page, form, submit_button, config)?;
        let validator = Rc::new(RefCell::new(Self {
            form,
            submit_button,
            message,
            config: config.clone(),
        }));

        let state = Rc::clone(&validator);
        page.add_event_listener(
            EventTarget::Node(form),
            EventKind::Submit,
            ListenerOptions::default(),
            event_handler(move |page, event| state.borrow_mut().handle_submit(page, event)),
        )?;
        Ok(Some(validator))
    }

    pub fn form(&self) -> NodeId {
        self.form
    }

    pub fn submit_button(&self) -> NodeId {
        self.submit_button
    }

    pub fn message(&self) -> &StatusMessage {
        &self.message
    }

    /// Editable fields in document order, hidden and button inputs excluded.
    pub fn fields(&self, page: &dyn Page) -> Result<Vec<NodeId>> {
        page.query_selector_all_in(self.form, &self.config.field_selector)
    }

    pub fn validate(&self, page: &dyn Page) -> Result<ValidationOutcome> {
        let mut checked = self.fields(page)?;
        checked.truncate(self.config.required_prefix);

        let mut empty = Vec::new();
        for field in &checked {
            if page.value(*field)?.trim().is_empty() {
                empty.push(*field);
            }
        }
        Ok(ValidationOutcome { checked, empty })
    }

    pub fn handle_submit(&mut self, page: &mut dyn Page, event: &mut Event) -> Result<()> {
        event.prevent_default();

        let outcome = self.validate(page)?;
        if !outcome.is_valid() {
            debug!(empty = outcome.empty.len(), "contact form rejected");
            self.mark_errors(page, &outcome.empty)?;
            let text = self.config.missing_fields_text.clone();
            return self.message.show(page, &text, true);
        }

        debug!("contact form accepted");
        self.clear_errors(page)?;
        let text = self.config.sent_text.clone();
        self.message.show(page, &text, false)?;
        page.reset_form(self.form)
    }

    /// Removes every error marker inside the form.
    pub fn clear_errors(&self, page: &mut dyn Page) -> Result<()> {
        for class_name in [
            &self.config.input_error_class,
            &self.config.label_error_class,
        ] {
            for node in page.query_selector_all_in(self.form, &format!(".{class_name}"))? {
                page.class_remove(node, class_name)?;
            }
        }
        Ok(())
    }

    pub fn mark_errors(&self, page: &mut dyn Page, fields: &[NodeId]) -> Result<()> {
        self.clear_errors(page)?;
        for field in fields {
            page.class_add(*field, &self.config.input_error_class)?;
            let Some(id) = page.attribute(*field, "id")? else {
                continue;
            };
            if id.is_empty() {
                continue;
            }
            let selector = format!("label[for={}]", quote_attr_value(&id));
            if let Some(label) = page.query_selector_in(self.form, &selector)? {
                page.class_add(label, &self.config.label_error_class)?;
            }
        }
        Ok(())
    }
}
