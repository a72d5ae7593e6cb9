//! Selectors, class names, thresholds and texts used by the behaviors.
//!
//! Every struct deserializes with field-level defaults, so a JSON document
//! only needs to name what it overrides:
//!
//! ```
//! let config = page_behaviors::SiteConfig::from_json(r#"{"scroll_top":{"threshold":500}}"#)?;
//! assert_eq!(config.scroll_top.threshold, 500.0);
//! assert_eq!(config.reveal.selector, ".fade-on-scroll");
//! # Ok::<(), page_behaviors::Error>(())
//! ```

use serde::Deserialize;

use crate::page::IntersectionOptions;
use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    pub reveal: RevealConfig,
    pub contact_form: ContactFormConfig,
    pub scroll_top: ScrollTopConfig,
}

impl SiteConfig {
    pub fn from_json(src: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(src).map_err(|err| Error::Config(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.reveal.validate()?;
        self.contact_form.validate()?;
        self.scroll_top.validate()
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RevealConfig {
    pub selector: String,
    pub hidden_class: String,
    pub revealed_class: String,
    /// Visible fraction of an element that triggers the reveal.
    pub threshold: f64,
    /// Bottom root margin as a fraction of the viewport height.
    pub root_margin_bottom: f64,
    /// Polling fallback: reveal once the element top is above this
    /// fraction of the viewport height.
    pub fallback_viewport_fraction: f64,
}

impl Default for RevealConfig {
    fn default() -> Self {
        Self {
            selector: ".fade-on-scroll".into(),
            hidden_class: "fade-hidden".into(),
            revealed_class: "fade-in".into(),
            threshold: 0.12,
            root_margin_bottom: -0.08,
            fallback_viewport_fraction: 0.92,
        }
    }
}

impl RevealConfig {
    pub fn intersection_options(&self) -> IntersectionOptions {
        IntersectionOptions {
            threshold: self.threshold,
            root_margin_bottom: self.root_margin_bottom,
        }
    }

    fn validate(&self) -> Result<()> {
        require_non_empty("reveal.selector", &self.selector)?;
        require_class_name("reveal.hidden_class", &self.hidden_class)?;
        require_class_name("reveal.revealed_class", &self.revealed_class)?;
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(Error::Config(format!(
                "reveal.threshold must be within [0, 1], got {}",
                self.threshold
            )));
        }
        if !(-1.0..=1.0).contains(&self.root_margin_bottom) {
            return Err(Error::Config(format!(
                "reveal.root_margin_bottom must be within [-1, 1], got {}",
                self.root_margin_bottom
            )));
        }
        if !(self.fallback_viewport_fraction > 0.0 && self.fallback_viewport_fraction <= 1.0) {
            return Err(Error::Config(format!(
                "reveal.fallback_viewport_fraction must be within (0, 1], got {}",
                self.fallback_viewport_fraction
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ContactFormConfig {
    pub form_selector: String,
    pub submit_selector: String,
    pub submit_fallback_selector: String,
    pub field_selector: String,
    /// Number of leading fields that must be non-empty.
    pub required_prefix: usize,
    pub input_error_class: String,
    pub label_error_class: String,
    pub message_class: String,
    pub message_shown_class: String,
    pub message_error_class: String,
    pub missing_fields_text: String,
    pub sent_text: String,
    pub hide_delay_ms: i64,
}

impl Default for ContactFormConfig {
    fn default() -> Self {
        Self {
            form_selector: ".contact-section form".into(),
            submit_selector: r#"button[type="submit"]"#.into(),
            submit_fallback_selector: "button".into(),
            field_selector: r#"input:not([type="hidden"]):not([type="submit"]):not([type="button"]), textarea"#.into(),
            required_prefix: 3,
            input_error_class: "input-error".into(),
            label_error_class: "label-error".into(),
            message_class: "sent-message".into(),
            message_shown_class: "show".into(),
            message_error_class: "error".into(),
            missing_fields_text: "Please fill out all required fields".into(),
            sent_text: "Message sent!".into(),
            hide_delay_ms: 3500,
        }
    }
}

impl ContactFormConfig {
    fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("contact_form.form_selector", &self.form_selector),
            ("contact_form.submit_selector", &self.submit_selector),
            (
                "contact_form.submit_fallback_selector",
                &self.submit_fallback_selector,
            ),
            ("contact_form.field_selector", &self.field_selector),
        ] {
            require_non_empty(name, value)?;
        }
        for (name, value) in [
            ("contact_form.input_error_class", &self.input_error_class),
            ("contact_form.label_error_class", &self.label_error_class),
            ("contact_form.message_class", &self.message_class),
            ("contact_form.message_shown_class", &self.message_shown_class),
            ("contact_form.message_error_class", &self.message_error_class),
        ] {
            require_class_name(name, value)?;
        }
        if self.hide_delay_ms < 0 {
            return Err(Error::Config(format!(
                "contact_form.hide_delay_ms must be non-negative, got {}",
                self.hide_delay_ms
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScrollTopConfig {
    pub selector: String,
    pub hide_class: String,
    /// The button shows only when the scroll offset is strictly above this.
    pub threshold: f64,
}

impl Default for ScrollTopConfig {
    fn default() -> Self {
        Self {
            selector: ".top-button".into(),
            hide_class: "hide".into(),
            threshold: 300.0,
        }
    }
}

impl ScrollTopConfig {
    fn validate(&self) -> Result<()> {
        require_non_empty("scroll_top.selector", &self.selector)?;
        require_class_name("scroll_top.hide_class", &self.hide_class)?;
        if !self.threshold.is_finite() || self.threshold < 0.0 {
            return Err(Error::Config(format!(
                "scroll_top.threshold must be a non-negative number, got {}",
                self.threshold
            )));
        }
        Ok(())
    }
}

fn require_non_empty(name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::Config(format!("{name} must not be empty")));
    }
    Ok(())
}

/// A single class token, as `classList.add` accepts it.
fn require_class_name(name: &str, value: &str) -> Result<()> {
    require_non_empty(name, value)?;
    if value.chars().any(|c| c.is_ascii_whitespace()) {
        return Err(Error::Config(format!(
            "{name} must be a single class name, got {value:?}"
        )));
    }
    Ok(())
}
