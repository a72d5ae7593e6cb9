//! The three page behaviors. Each one attaches independently, owns only the
//! element handles it looked up, and registers its own listeners.

mod contact_form;
mod scroll_reveal;
mod scroll_top;

pub use contact_form::{ContactFormValidator, StatusMessage, ValidationOutcome};
pub use scroll_reveal::{RevealMode, ScrollReveal, fallback_should_reveal};
pub use scroll_top::{ScrollTopButton, should_show_top_button};
