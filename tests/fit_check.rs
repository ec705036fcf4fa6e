mod common;

use std::cell::{Cell, RefCell};

use article_flow::{
    BlockInstance, Breakpoint, FontMeasurer, FontMetrics, HeightPolicy, Measurer, NoOverflow,
    SectionGeometry, compute_layout, find_font_file, sanitize_style_signature, style_signature,
};
use common::*;

/// Oracle double: fixed verdict, records how it was consulted.
struct Probe {
    overflow: bool,
    calls: Cell<usize>,
    seen_signature: RefCell<Option<String>>,
    seen_cap: Cell<Option<f32>>,
}

impl Probe {
    fn answering(overflow: bool) -> Self {
        Probe {
            overflow,
            calls: Cell::new(0),
            seen_signature: RefCell::new(None),
            seen_cap: Cell::new(None),
        }
    }
}

impl Measurer for Probe {
    fn measure_overflow(
        &self,
        _text: &str,
        style_signature: &str,
        max_height_px: Option<f32>,
    ) -> bool {
        self.calls.set(self.calls.get() + 1);
        *self.seen_signature.borrow_mut() = Some(style_signature.to_string());
        self.seen_cap.set(max_height_px);
        self.overflow
    }
}

fn excerpt_of<'a>(instance: &BlockInstance, text: &'a str) -> &'a str {
    match instance {
        BlockInstance::Text {
            start_char,
            end_char,
            ..
        } => &text[*start_char..*end_char],
        other => panic!("expected text instance, got {other:?}"),
    }
}

#[test]
fn measurer_not_consulted_without_height_cap() {
    let text = "One two. Three four. Five six.";
    let probe = Probe::answering(true);
    // No maxHeightPx on the policy, no fixed geometry height.
    let input = input(
        template(&["fullTextBand"]),
        catalog(vec![section(
            "fullTextBand",
            vec![flow_block("body", text_policy(6))],
        )]),
        text,
        Breakpoint::Desktop,
    );

    let layout = compute_layout(&input, Some(&probe));

    assert_eq!(probe.calls.get(), 0);
    assert_eq!(excerpt_of(&layout.flow[0], text), text);
}

#[test]
fn overflow_causes_exactly_one_trim_without_recheck() {
    let text = "One two. Three four. Five six.";
    let probe = Probe::answering(true);
    let mut policy = text_policy(6);
    policy.max_height_px = Some(100.0);
    let input = input(
        template(&["fullTextBand"]),
        catalog(vec![section("fullTextBand", vec![flow_block("body", policy)])]),
        text,
        Breakpoint::Desktop,
    );

    let layout = compute_layout(&input, Some(&probe));

    // One measurement; the trimmed slice is accepted as-is.
    assert_eq!(probe.calls.get(), 1);
    assert_eq!(probe.seen_cap.get(), Some(100.0));
    assert_eq!(excerpt_of(&layout.flow[0], text), "One two. Three four.");
}

#[test]
fn single_sentence_slice_survives_overflow_untrimmed() {
    let text = "no terminators here at all just words";
    let probe = Probe::answering(true);
    let mut policy = text_policy(7);
    policy.max_height_px = Some(10.0);
    let input = input(
        template(&["fullTextBand"]),
        catalog(vec![section("fullTextBand", vec![flow_block("body", policy)])]),
        text,
        Breakpoint::Desktop,
    );

    let layout = compute_layout(&input, Some(&probe));

    assert_eq!(probe.calls.get(), 1);
    assert_eq!(excerpt_of(&layout.flow[0], text), text);
}

#[test]
fn fitting_slice_is_left_alone() {
    let text = "One two. Three four. Five six.";
    let probe = Probe::answering(false);
    let mut policy = text_policy(6);
    policy.max_height_px = Some(400.0);
    let input = input(
        template(&["fullTextBand"]),
        catalog(vec![section("fullTextBand", vec![flow_block("body", policy)])]),
        text,
        Breakpoint::Desktop,
    );

    let layout = compute_layout(&input, Some(&probe));

    assert_eq!(probe.calls.get(), 1);
    assert_eq!(excerpt_of(&layout.flow[0], text), text);
}

#[test]
fn signature_reaches_the_oracle_sanitized() {
    let text = words(20);
    let probe = Probe::answering(false);
    let mut policy = text_policy(10);
    policy.max_height_px = Some(100.0);
    let sec = section("two column!", vec![flow_block("body.main", policy)]);
    let input = input(
        template(&["two column!"]),
        catalog(vec![sec]),
        &text,
        Breakpoint::Mobile,
    );

    compute_layout(&input, Some(&probe));

    let seen = probe.seen_signature.borrow().clone().expect("oracle consulted");
    assert_eq!(seen, "two_column_-body_main-mobile");
    assert!(seen.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    assert_eq!(
        seen,
        style_signature("two column!", "body.main", Breakpoint::Mobile)
    );
}

#[test]
fn sanitizer_replaces_everything_outside_the_safe_set() {
    assert_eq!(sanitize_style_signature("hero#1:img.main"), "hero_1_img_main");
    assert_eq!(sanitize_style_signature("ok-as_is42"), "ok-as_is42");
}

#[test]
fn cap_falls_back_to_fixed_section_height() {
    let text = words(20);
    let probe = Probe::answering(false);
    let mut sec = section("hero", vec![flow_block("body", text_policy(10))]);
    sec.geometry.insert(
        Breakpoint::Desktop,
        SectionGeometry {
            columns: 1,
            gap_px: 0.0,
            height: HeightPolicy::Fixed(320.0),
        },
    );
    let input = input(
        template(&["hero"]),
        catalog(vec![sec]),
        &text,
        Breakpoint::Desktop,
    );

    compute_layout(&input, Some(&probe));

    assert_eq!(probe.calls.get(), 1);
    assert_eq!(probe.seen_cap.get(), Some(320.0));
}

#[test]
fn geometry_for_other_breakpoints_gives_no_cap() {
    let text = words(20);
    let probe = Probe::answering(true);
    let mut sec = section("hero", vec![flow_block("body", text_policy(10))]);
    sec.geometry.insert(
        Breakpoint::Desktop,
        SectionGeometry {
            columns: 1,
            gap_px: 0.0,
            height: HeightPolicy::Fixed(320.0),
        },
    );
    // Laying out for mobile, where no geometry is declared.
    let input = input(
        template(&["hero"]),
        catalog(vec![sec]),
        &text,
        Breakpoint::Mobile,
    );

    compute_layout(&input, Some(&probe));

    assert_eq!(probe.calls.get(), 0);
}

#[test]
fn policy_cap_wins_over_geometry() {
    let text = words(20);
    let probe = Probe::answering(false);
    let mut policy = text_policy(10);
    policy.max_height_px = Some(90.0);
    let mut sec = section("hero", vec![flow_block("body", policy)]);
    sec.geometry.insert(
        Breakpoint::Desktop,
        SectionGeometry {
            columns: 1,
            gap_px: 0.0,
            height: HeightPolicy::Fixed(320.0),
        },
    );
    let input = input(
        template(&["hero"]),
        catalog(vec![sec]),
        &text,
        Breakpoint::Desktop,
    );

    compute_layout(&input, Some(&probe));

    assert_eq!(probe.seen_cap.get(), Some(90.0));
}

#[test]
fn no_overflow_stub_never_trims() {
    let text = "One two. Three four. Five six.";
    let mut policy = text_policy(6);
    policy.max_height_px = Some(1.0);
    let input = input(
        template(&["fullTextBand"]),
        catalog(vec![section("fullTextBand", vec![flow_block("body", policy)])]),
        text,
        Breakpoint::Desktop,
    );

    let layout = compute_layout(&input, Some(&NoOverflow));

    assert_eq!(excerpt_of(&layout.flow[0], text), text);
}

/// Exercises the font-backed measurer against whatever system font is
/// available; skips quietly on machines without one.
#[test]
fn font_measurer_wraps_against_real_metrics() {
    let candidates = [
        "DejaVu Sans",
        "Liberation Sans",
        "Liberation Serif",
        "FreeSans",
        "Arial",
        "Helvetica",
        "Noto Sans",
    ];
    let Some(family) = candidates
        .iter()
        .find(|family| find_font_file(family).is_some())
    else {
        eprintln!("no known system font found, skipping");
        return;
    };

    let metrics = FontMetrics::load_family(family).expect("font matched by scan");
    assert!(metrics.line_height(16.0) > 0.0);
    assert_eq!(metrics.wrap_line_count("short", 16.0, 640.0), 1);
    let long = words(200);
    assert!(metrics.wrap_line_count(&long, 16.0, 200.0) > 5);

    let measurer = FontMeasurer::new(metrics);
    assert!(!measurer.measure_overflow(&long, "any", None));
    assert!(measurer.measure_overflow(&long, "any", Some(10.0)));
    assert!(!measurer.measure_overflow("short", "any", Some(10_000.0)));
}
