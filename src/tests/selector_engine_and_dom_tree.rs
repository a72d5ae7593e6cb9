use super::*;
use crate::html::parse_html;

const FORM_HTML: &str = r#"
    <form id="f">
      <input id="text">
      <input id="hidden" type="hidden" value="h">
      <input id="submit" type="SUBMIT" value="Go">
      <input id="plain-button" type="button">
      <input id="mail" type="email">
      <textarea id="area">draft</textarea>
      <select id="choice"></select>
      <button type="submit" id="send">Send</button>
    </form>
"#;

fn ids(dom: &Dom, nodes: &[NodeId]) -> Vec<String> {
    nodes
        .iter()
        .map(|node| dom.attr(*node, "id").unwrap_or_default())
        .collect()
}

#[test]
fn field_selector_skips_hidden_and_button_inputs() -> Result<()> {
    let dom = parse_html(FORM_HTML)?;
    let fields = dom.query_selector_all(&ContactFormConfig::default().field_selector)?;
    assert_eq!(ids(&dom, &fields), ["text", "mail", "area"]);
    Ok(())
}

#[test]
fn comma_groups_keep_document_order_without_duplicates() -> Result<()> {
    let dom = parse_html(FORM_HTML)?;
    let nodes = dom.query_selector_all("textarea, #text, input#text, button")?;
    assert_eq!(ids(&dom, &nodes), ["text", "area", "send"]);
    Ok(())
}

#[test]
fn attribute_equality_and_presence() -> Result<()> {
    let dom = parse_html(
        r#"<label for="name">Name</label><label for="email">Email</label><label>None</label>"#,
    )?;
    let label = dom.query_selector(r#"label[for="email"]"#)?;
    assert_eq!(label.map(|node| dom.text_content(node)), Some("Email".into()));
    assert_eq!(dom.query_selector_all("label[for]")?.len(), 2);
    assert_eq!(dom.query_selector_all("label:not([for])")?.len(), 1);
    assert!(dom.query_selector("label[for=phone]")?.is_none());
    Ok(())
}

#[test]
fn quoted_values_round_trip_through_selectors() -> Result<()> {
    let dom = parse_html(r#"<label for='we"ird\id'>x</label>"#)?;
    let selector = format!(
        "label[for={}]",
        crate::selector::quote_attr_value(r#"we"ird\id"#)
    );
    assert!(dom.query_selector(&selector)?.is_some());
    Ok(())
}

#[test]
fn descendant_and_child_combinators() -> Result<()> {
    let dom = parse_html(
        r#"<section class="contact-section"><div><form id="nested"></form></div></section>
           <form id="outside"></form>"#,
    )?;
    let nested = dom.query_selector_all(".contact-section form")?;
    assert_eq!(ids(&dom, &nested), ["nested"]);
    assert!(dom.query_selector(".contact-section > form")?.is_none());
    assert_eq!(dom.query_selector_all("div > form")?.len(), 1);
    Ok(())
}

#[test]
fn sibling_combinators_and_malformed_selectors_are_rejected() -> Result<()> {
    let dom = parse_html("<p></p>")?;
    for selector in ["a + b", "a ~ b", "", "p[", "p:hover", "> p", "p,", ":not(p"] {
        match dom.query_selector_all(selector) {
            Err(Error::UnsupportedSelector(_)) => {}
            other => panic!("expected unsupported selector for {selector:?}, got {other:?}"),
        }
    }
    Ok(())
}

#[test]
fn scoped_queries_exclude_the_scope_itself() -> Result<()> {
    let dom = parse_html(r#"<div class="box" id="outer"><div class="box" id="inner"></div></div>"#)?;
    let outer = dom.query_selector("#outer")?.expect("outer");
    let found = dom.query_selector_all_from(outer, ".box")?;
    assert_eq!(ids(&dom, &found), ["inner"]);
    Ok(())
}

#[test]
fn textarea_and_input_values_reset_to_markup_defaults() -> Result<()> {
    let mut dom = parse_html(FORM_HTML)?;
    let area = dom.query_selector("#area")?.expect("area");
    let hidden = dom.query_selector("#hidden")?.expect("hidden");
    let text = dom.query_selector("#text")?.expect("text");
    assert_eq!(dom.value(area)?, "draft");

    dom.set_value(area, "edited")?;
    dom.set_value(text, "typed")?;
    let form = dom.query_selector("#f")?.expect("form");
    dom.reset_form(form)?;

    assert_eq!(dom.value(area)?, "draft");
    assert_eq!(dom.value(text)?, "");
    assert_eq!(dom.value(hidden)?, "h");

    match dom.reset_form(area) {
        Err(Error::Runtime(_)) => {}
        other => panic!("expected runtime error, got {other:?}"),
    }
    Ok(())
}

#[test]
fn insert_after_places_detached_node_next_to_anchor() -> Result<()> {
    let mut dom = parse_html(r#"<form><button id="b">Go</button><span id="tail"></span></form>"#)?;
    let button = dom.query_selector("#b")?.expect("button");
    let note = dom.create_detached_element("div".into());
    assert!(!dom.is_connected(note));
    dom.set_attr(note, "class", "sent-message")?;

    dom.insert_after(button, note)?;

    assert!(dom.is_connected(note));
    let form = dom.query_selector("form")?.expect("form");
    assert_eq!(
        dom.dump_node(form),
        r#"<form><button id="b">Go</button><div class="sent-message"></div><span id="tail"></span></form>"#
    );
    Ok(())
}

#[test]
fn class_list_operations_keep_tokens_unique() -> Result<()> {
    let mut dom = parse_html(r#"<p id="p" class="  a   b a "></p>"#)?;
    let p = dom.query_selector("#p")?.expect("p");
    dom.class_add(p, "b")?;
    dom.class_add(p, "c")?;
    dom.class_remove(p, "a")?;
    assert!(!dom.class_contains(p, "a")?);
    assert!(dom.class_contains(p, "b")?);
    assert!(dom.class_contains(p, "c")?);
    assert_eq!(dom.attr(p, "class"), Some("b c".into()));
    Ok(())
}

#[test]
fn markup_parsing_decodes_entities_and_skips_comments() -> Result<()> {
    let dom = parse_html(
        "<!DOCTYPE html><!-- header --><p id=\"t\">Fish &amp; chips &#8593; &unknown; &#x41;</p>\
         <script>if (a < b) { x(); }</script><br><input disabled id=\"d\">",
    )?;
    let p = dom.query_selector("#t")?.expect("paragraph");
    assert_eq!(dom.text_content(p), "Fish & chips \u{2191} &unknown; A");
    let script = dom.query_selector("script")?.expect("script");
    assert_eq!(dom.text_content(script), "if (a < b) { x(); }");
    let input = dom.query_selector("#d")?.expect("input");
    assert_eq!(dom.attr(input, "disabled"), Some(String::new()));
    assert_eq!(dom.dump_node(input), r#"<input disabled="" id="d">"#);
    Ok(())
}

#[test]
fn checkable_inputs_without_value_read_as_on() -> Result<()> {
    let mut dom = parse_html(
        r#"<form id="f"><input type="checkbox" id="c"><input type="RADIO" id="r">
           <input type="checkbox" id="v" value="yes"><input id="t"></form>"#,
    )?;
    let node = |dom: &Dom, selector: &str| dom.query_selector(selector).map(|n| n.expect(selector));
    let (checkbox, radio) = (node(&dom, "#c")?, node(&dom, "#r")?);
    let (valued, text) = (node(&dom, "#v")?, node(&dom, "#t")?);
    assert_eq!(dom.value(checkbox)?, "on");
    assert_eq!(dom.value(radio)?, "on");
    assert_eq!(dom.value(valued)?, "yes");
    assert_eq!(dom.value(text)?, "");

    dom.set_value(checkbox, "agree")?;
    assert_eq!(dom.value(checkbox)?, "agree");
    assert_eq!(dom.attr(checkbox, "value"), Some("agree".into()));
    let form = node(&dom, "#f")?;
    dom.reset_form(form)?;
    assert_eq!(dom.value(checkbox)?, "agree");
    Ok(())
}

#[test]
fn stray_end_tags_and_odd_attributes_parse_like_a_browser() -> Result<()> {
    let dom = parse_html(
        "<div id=outer></span><p id=a class=x>text</p><img id=logo src=/logo.png/>\
         <p id=\"dup\" id=\"second\" TITLE='Hi'>x</P></div><b id=after></b>",
    )?;
    let outer = dom.query_selector("#outer")?.expect("outer");
    let after = dom.query_selector("#after")?.expect("after");
    assert_eq!(dom.parent(after), Some(dom.root));
    assert_eq!(dom.query_selector_all_from(outer, "p")?.len(), 2);

    let a = dom.query_selector("#a")?.expect("paragraph");
    assert_eq!(dom.attr(a, "class"), Some("x".into()));
    assert_eq!(dom.text_content(a), "text");
    let logo = dom.query_selector("#logo")?.expect("image");
    assert_eq!(dom.attr(logo, "src"), Some("/logo.png".into()));
    assert_eq!(dom.parent(logo), Some(outer));

    let dup = dom.query_selector("#dup")?.expect("first id wins");
    assert_eq!(dom.attr(dup, "title"), Some("Hi".into()));
    assert!(dom.query_selector("#second")?.is_none());
    Ok(())
}

#[test]
fn malformed_markup_is_rejected() {
    for html in ["<!-- never closed", "<div", "<script>forever", "<>"] {
        match parse_html(html) {
            Err(Error::HtmlParse(_)) => {}
            other => panic!("expected html parse error for {html:?}, got {other:?}"),
        }
    }
}

#[test]
fn unknown_handles_are_errors_not_panics() -> Result<()> {
    let h = Harness::from_html("<p></p>")?;
    let bogus = NodeId(10_000);
    match h.class_contains(bogus, "x") {
        Err(Error::Runtime(msg)) => assert!(msg.contains("unknown node handle")),
        other => panic!("expected runtime error, got {other:?}"),
    }
    Ok(())
}

#[test]
fn truncate_chars_marks_cut_text() {
    assert_eq!(truncate_chars("abcdef", 3), "abc...");
    assert_eq!(truncate_chars("abc", 3), "abc");
    assert_eq!(truncate_chars("äöü", 2), "äö...");
}
