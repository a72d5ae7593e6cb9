use page_behaviors::{Harness, Page, SiteConfig, install};
use proptest::collection::vec;
use proptest::prelude::*;
use proptest::test_runner::{FileFailurePersistence, TestCaseError, TestCaseResult};

const PAGE_PROPTEST_REGRESSION_FILE: &str =
    "tests/proptest-regressions/page_action_property_test.txt";
const DEFAULT_PAGE_PROPTEST_CASES: u32 = 128;

const PAGE_HTML: &str = r##"
<header id="page-top"></header>
<section id="one" class="fade-on-scroll">One</section>
<section id="two" class="fade-on-scroll">Two</section>
<section id="three" class="fade-on-scroll">Three</section>
<div class="contact-section">
  <form id="contact">
    <label for="name">Name</label><input id="name">
    <label for="email">Email</label><input id="email" type="email">
    <label for="message">Message</label><textarea id="message"></textarea>
    <button type="submit" id="send">Send</button>
  </form>
</div>
<a href="#page-top" class="top-button" id="top">Top</a>
"##;

const FADE_TARGETS: [&str; 3] = ["#one", "#two", "#three"];
const FIELDS: [&str; 3] = ["#name", "#email", "#message"];

#[derive(Clone, Debug)]
enum PageAction {
    ScrollTo(f64),
    Resize(f64),
    TypeText(usize, String),
    ClickSend,
    ClickTop,
    AdvanceTime(i64),
}

fn page_proptest_cases() -> u32 {
    std::env::var("PAGE_BEHAVIORS_PROPTEST_CASES")
        .ok()
        .and_then(|raw| raw.parse::<u32>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(DEFAULT_PAGE_PROPTEST_CASES)
}

fn text_strategy() -> BoxedStrategy<String> {
    vec(
        prop_oneof![Just('a'), Just('z'), Just('@'), Just(' '), Just('\t')],
        0..=6,
    )
    .prop_map(|chars| chars.into_iter().collect())
    .boxed()
}

fn page_action_strategy() -> BoxedStrategy<PageAction> {
    prop_oneof![
        5 => (0u32..4000).prop_map(|y| PageAction::ScrollTo(f64::from(y))),
        1 => (200u32..2400).prop_map(|h| PageAction::Resize(f64::from(h))),
        3 => (0usize..FIELDS.len(), text_strategy())
            .prop_map(|(field, text)| PageAction::TypeText(field, text)),
        2 => Just(PageAction::ClickSend),
        1 => Just(PageAction::ClickTop),
        2 => (0i64..5000).prop_map(PageAction::AdvanceTime),
    ]
    .boxed()
}

fn run_action(harness: &mut Harness, action: &PageAction) -> page_behaviors::Result<()> {
    match action {
        PageAction::ScrollTo(y) => harness.scroll_to_y(*y),
        PageAction::Resize(height) => harness.resize(*height),
        PageAction::TypeText(field, text) => harness.type_text(FIELDS[*field], text),
        PageAction::ClickSend => harness.click("#send"),
        PageAction::ClickTop => harness.click("#top"),
        PageAction::AdvanceTime(ms) => harness.advance_time(*ms),
    }
}

fn fail(err: page_behaviors::Error) -> TestCaseError {
    TestCaseError::fail(format!("{err:?}"))
}

fn landing_page(observer_supported: bool) -> page_behaviors::Result<Harness> {
    let mut harness = Harness::from_html(PAGE_HTML)?;
    harness.set_intersection_observer_supported(observer_supported);
    harness.set_viewport_height(800.0)?;
    harness.set_layout("#one", 0.0, 700.0)?;
    harness.set_layout("#two", 1200.0, 400.0)?;
    harness.set_layout("#three", 2600.0, 900.0)?;
    install(&mut harness, SiteConfig::default(), None)?;
    harness.load()?;
    Ok(harness)
}

fn assert_page_invariants(
    observer_supported: bool,
    actions: &[PageAction],
) -> TestCaseResult {
    let mut harness = landing_page(observer_supported).map_err(fail)?;
    let mut revealed = [false; FADE_TARGETS.len()];

    for (step, action) in actions.iter().enumerate() {
        let outcome = run_action(&mut harness, action);
        prop_assert!(
            outcome.is_ok(),
            "action failed at step {step}: {action:?}, error={outcome:?}, actions={actions:?}"
        );

        for (index, selector) in FADE_TARGETS.iter().enumerate() {
            let shown = harness.has_class(selector, "fade-in").map_err(fail)?;
            let hidden = harness.has_class(selector, "fade-hidden").map_err(fail)?;
            prop_assert!(shown != hidden, "{selector} is both or neither at step {step}");
            prop_assert!(
                shown || !revealed[index],
                "{selector} faded out again at step {step}: {action:?}"
            );
            revealed[index] = shown;
        }

        let button_hidden = harness.has_class("#top", "hide").map_err(fail)?;
        prop_assert_eq!(button_hidden, harness.scroll_y() <= 300.0);

        prop_assert_eq!(harness.query_selector_all(".sent-message").map_err(fail)?.len(), 1);
        let message_shown = harness.has_class(".sent-message", "show").map_err(fail)?;
        prop_assert_eq!(message_shown, !harness.pending_timers().is_empty());
        prop_assert!(harness.pending_timers().len() <= 1);

        prop_assert_eq!(harness.native_submission_count(), 0);
        prop_assert!(harness.navigations().is_empty());
    }

    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: page_proptest_cases(),
        failure_persistence: Some(Box::new(
            FileFailurePersistence::Direct(PAGE_PROPTEST_REGRESSION_FILE),
        )),
        .. ProptestConfig::default()
    })]

    #[test]
    fn page_actions_keep_behavior_invariants(
        observer_supported in any::<bool>(),
        actions in vec(page_action_strategy(), 1..=24),
    ) {
        assert_page_invariants(observer_supported, &actions)?;
    }

    #[test]
    fn submission_outcome_depends_only_on_first_three_fields(
        values in vec(text_strategy(), FIELDS.len()),
    ) {
        let mut harness = landing_page(true).map_err(fail)?;
        for (selector, value) in FIELDS.iter().zip(&values) {
            harness.type_text(selector, value).map_err(fail)?;
        }
        harness.click("#send").map_err(fail)?;

        let valid = values.iter().all(|value| !value.trim().is_empty());
        let expected = if valid {
            "Message sent!"
        } else {
            "Please fill out all required fields"
        };
        harness.assert_text(".sent-message", expected).map_err(fail)?;
        prop_assert_eq!(harness.has_class(".sent-message", "error").map_err(fail)?, !valid);
        for (selector, value) in FIELDS.iter().zip(&values) {
            let marked = harness.has_class(selector, "input-error").map_err(fail)?;
            prop_assert_eq!(marked, value.trim().is_empty());
        }
    }

    #[test]
    fn top_button_tracks_strict_threshold(y in 0u32..2000) {
        let mut harness = landing_page(true).map_err(fail)?;
        harness.scroll_to_y(f64::from(y)).map_err(fail)?;
        prop_assert_eq!(harness.has_class("#top", "hide").map_err(fail)?, y <= 300);
        prop_assert_eq!(
            page_behaviors::behaviors::should_show_top_button(f64::from(y), 300.0),
            y > 300
        );
    }

    #[test]
    fn fallback_predicate_matches_viewport_fraction(
        top in -2000i32..4000,
        height in 100u32..3000,
    ) {
        let top = f64::from(top);
        let height = f64::from(height);
        let limit = height * 0.92;
        prop_assume!((top - limit).abs() > 1e-6);
        prop_assert_eq!(
            page_behaviors::behaviors::fallback_should_reveal(top, height, 0.92),
            top < limit
        );
    }
}
