use super::*;

use std::cell::RefCell;
use std::rc::Rc;

mod selector_engine_and_dom_tree;

const LANDING_PAGE_HTML: &str = r##"
    <header id="page-top"><h1>Studio</h1></header>
    <section id="hero" class="hero fade-on-scroll">Hero</section>
    <section id="about" class="fade-on-scroll">About</section>
    <section id="work" class="fade-on-scroll">Work</section>
    <section class="contact-section">
      <form id="contact" action="/contact" method="post">
        <label for="name">Name</label>
        <input id="name" name="name">
        <label for="email">Email</label>
        <input id="email" name="email" type="email">
        <label for="message">Message</label>
        <textarea id="message" name="message"></textarea>
        <input type="hidden" name="token" value="abc123">
        <label for="company">Company</label>
        <input id="company" name="company">
        <button type="submit" id="send">Send</button>
      </form>
    </section>
    <a href="#page-top" class="top-button hide" id="top">Top</a>
"##;

type SiteSlot = Rc<RefCell<Option<Site>>>;

fn install_site(h: &mut Harness, config: SiteConfig) -> Result<SiteSlot> {
    let slot: SiteSlot = Rc::new(RefCell::new(None));
    let ready = Rc::clone(&slot);
    install(
        h,
        config,
        Some(Box::new(move |site: Site| {
            *ready.borrow_mut() = Some(site);
        })),
    )?;
    Ok(slot)
}

/// Landing page with the hero on screen and the other sections below the fold.
fn landing_page() -> Result<(Harness, SiteSlot)> {
    let mut h = Harness::from_html(LANDING_PAGE_HTML)?;
    h.set_viewport_height(800.0)?;
    h.set_layout("#hero", 0.0, 600.0)?;
    h.set_layout("#about", 1000.0, 500.0)?;
    h.set_layout("#work", 2000.0, 500.0)?;
    let slot = install_site(&mut h, SiteConfig::default())?;
    Ok((h, slot))
}
