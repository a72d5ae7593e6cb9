use std::cell::RefCell;
use std::rc::Rc;

use page_behaviors::{
    EventKind, EventTarget, Harness, Page, ScrollBehavior, Site, SiteConfig, install,
};

const STUDIO_HTML: &str = r##"
<!DOCTYPE html>
<html>
<head><title>Studio</title><style>.fade-hidden { opacity: 0 }</style></head>
<body>
  <nav id="page-top"><a href="#work">Work</a></nav>
  <main>
    <section id="intro" class="fade-on-scroll"><h1>We build things</h1></section>
    <section id="services" class="fade-on-scroll"><h2>Services</h2></section>
    <section id="work" class="fade-on-scroll"><h2>Selected work</h2></section>
    <section class="contact-section">
      <h2>Say hello</h2>
      <form action="/contact" method="post">
        <input type="hidden" name="csrf" value="t0k3n">
        <label for="contact-name">Name</label>
        <input id="contact-name" name="name" placeholder="Your name">
        <label for="contact-email">Email</label>
        <input id="contact-email" name="email" type="email">
        <input type="button" value="Clear" id="clear">
        <label for="contact-body">Message</label>
        <textarea id="contact-body" name="body"></textarea>
        <label for="contact-budget">Budget</label>
        <input id="contact-budget" name="budget">
        <button type="submit">Send message</button>
      </form>
    </section>
  </main>
  <a href="#page-top" class="top-button" aria-label="Back to top">&uarr;</a>
</body>
</html>
"##;

fn studio_page(observer: bool) -> page_behaviors::Result<(Harness, Rc<RefCell<Option<Site>>>)> {
    let mut harness = Harness::from_html(STUDIO_HTML)?;
    harness.set_intersection_observer_supported(observer);
    harness.set_viewport_height(900.0)?;
    harness.set_layout("#intro", 80.0, 700.0)?;
    harness.set_layout("#services", 1100.0, 600.0)?;
    harness.set_layout("#work", 1900.0, 1200.0)?;
    harness.set_layout(".contact-section", 3300.0, 800.0)?;

    let slot: Rc<RefCell<Option<Site>>> = Rc::new(RefCell::new(None));
    let ready = Rc::clone(&slot);
    install(
        &mut harness,
        SiteConfig::default(),
        Some(Box::new(move |site: Site| *ready.borrow_mut() = Some(site))),
    )?;
    harness.load()?;
    Ok((harness, slot))
}

#[test]
fn visitor_reads_the_page_and_sends_a_message() -> page_behaviors::Result<()> {
    let (mut h, slot) = studio_page(true)?;
    assert!(slot.borrow().as_ref().is_some_and(|site| site.contact_form.is_some()));

    h.assert_class("#intro", "fade-in", true)?;
    h.assert_class("#services", "fade-hidden", true)?;
    h.assert_class(".top-button", "hide", true)?;

    h.scroll_to_y(600.0)?;
    h.assert_class("#services", "fade-in", true)?;
    h.assert_class(".top-button", "hide", false)?;

    h.scroll_to_y(1600.0)?;
    h.assert_class("#work", "fade-in", true)?;

    h.scroll_to_y(3000.0)?;
    h.type_text("#contact-name", "Grace")?;
    h.type_text("#contact-body", "Let's talk")?;
    h.click("button")?;

    // Email is the second editable field, so it blocks the submission.
    h.assert_text(".sent-message", "Please fill out all required fields")?;
    h.assert_class("#contact-email", "input-error", true)?;
    h.assert_class(r#"label[for="contact-email"]"#, "label-error", true)?;
    h.assert_class("#contact-name", "input-error", false)?;
    h.assert_value("#contact-name", "Grace")?;

    h.advance_time(1000)?;
    h.type_text("#contact-email", "grace@example.com")?;
    h.click("button")?;
    h.assert_text(".sent-message", "Message sent!")?;
    h.assert_class(".sent-message", "error", false)?;
    h.assert_class("#contact-email", "input-error", false)?;
    h.assert_value("#contact-name", "")?;
    h.assert_value("#contact-body", "")?;
    h.assert_value(r#"input[name="csrf"]"#, "t0k3n")?;
    assert_eq!(h.native_submission_count(), 0);

    h.advance_time(3499)?;
    h.assert_class(".sent-message", "show", true)?;
    h.advance_time(1)?;
    h.assert_class(".sent-message", "show", false)?;

    h.click(".top-button")?;
    assert_eq!(h.scroll_y(), 0.0);
    assert_eq!(
        h.scroll_requests().last().map(|request| request.behavior),
        Some(ScrollBehavior::Smooth)
    );
    h.assert_class(".top-button", "hide", true)?;
    assert!(h.navigations().is_empty());

    for section in ["#intro", "#services", "#work"] {
        h.assert_class(section, "fade-in", true)?;
    }
    Ok(())
}

#[test]
fn older_browser_gets_the_same_page_through_polling() -> page_behaviors::Result<()> {
    let (mut h, _slot) = studio_page(false)?;
    assert_eq!(h.observed_count(), 0);
    assert_eq!(h.listener_count(EventTarget::Window, EventKind::Scroll), 2);
    assert_eq!(h.listener_count(EventTarget::Window, EventKind::Resize), 1);

    h.assert_class("#intro", "fade-in", true)?;
    h.assert_class("#services", "fade-hidden", true)?;
    h.scroll_to_y(600.0)?;
    h.assert_class("#services", "fade-in", true)?;
    h.assert_class("#work", "fade-hidden", true)?;
    h.scroll_to_y(1200.0)?;
    h.assert_class("#work", "fade-in", true)?;
    Ok(())
}

#[test]
fn status_message_lands_between_button_and_form_end() -> page_behaviors::Result<()> {
    let (mut h, _slot) = studio_page(true)?;
    h.click("button")?;
    let dump = h.dump_dom(".contact-section form")?;
    assert!(
        dump.ends_with(
            r#"<button type="submit">Send message</button><div class="sent-message show error">Please fill out all required fields</div>
      </form>"#
        ),
        "{dump}"
    );
    Ok(())
}

#[test]
fn nav_links_are_untouched() -> page_behaviors::Result<()> {
    let (mut h, _slot) = studio_page(true)?;
    h.click(r##"nav a[href="#work"]"##)?;
    assert_eq!(h.navigations(), ["#work".to_string()]);
    Ok(())
}
