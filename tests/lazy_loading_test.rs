use lazyview::test_utils::test_helpers::{CallbackRecorder, PageBuilder, Recorded};
use lazyview::simulated::ElementSpec;
use lazyview::{Breakpoint, Host, LazyLoader, LifecycleState, Options, Rect, Signal, SignalTarget};
use std::time::Duration;

#[test]
fn test_start_loads_only_the_visible_image() {
    let (mut doc, ids) = PageBuilder::new(1024.0, 768.0)
        .image_at(100.0, "first.png")
        .image_at(3000.0, "second.png")
        .image_at(6000.0, "third.png")
        .build();

    let lazy = LazyLoader::start(&mut doc, Options::default());

    assert_eq!(lazy.registry().len(), 2);
    assert!(lazy.is_active());
    assert_eq!(doc.probed_urls(), ["first.png"]);
    assert!(lazy.registry().contains(&ids[1]));
    assert!(lazy.registry().contains(&ids[2]));
}

#[test]
fn test_last_candidate_scrolled_into_view_tears_down() {
    let (mut doc, ids) = PageBuilder::new(1024.0, 768.0)
        .image_at(3000.0, "far.png")
        .build();

    let mut lazy = LazyLoader::start(&mut doc, Options::default());
    assert_eq!(lazy.registry().len(), 1);
    assert_eq!(doc.bound_signals().len(), 2);

    doc.scroll_window_to(0.0, 2500.0);
    let summary = lazy
        .on_scroll(&mut doc, &SignalTarget::Window)
        .expect("first scroll is never throttled");

    assert_eq!(summary.loaded, 1);
    assert_eq!(lazy.registry().len(), 0);
    assert_eq!(lazy.state(), LifecycleState::Inactive);
    assert!(doc.bound_signals().is_empty());

    doc.pump_probes();
    assert!(doc.has_class(&ids[0], "b-loaded"));
    assert_eq!(doc.src(&ids[0]).as_deref(), Some("far.png"));
}

#[test]
fn test_page_with_nothing_to_load_tears_down_immediately() {
    let (mut doc, _) = PageBuilder::new(1024.0, 768.0).build();
    let lazy = LazyLoader::start(&mut doc, Options::default());

    assert_eq!(lazy.state(), LifecycleState::Inactive);
    assert!(doc.bound_signals().is_empty());
}

#[test]
fn test_empty_selector_degrades_to_teardown() {
    let (mut doc, _) = PageBuilder::new(1024.0, 768.0)
        .image_at(0.0, "a.png")
        .build();
    let options = Options {
        selector: String::new(),
        ..Options::default()
    };

    let lazy = LazyLoader::start(&mut doc, options);
    assert!(!lazy.is_active());
    assert!(doc.probed_urls().is_empty());
}

#[test]
fn test_missing_source_reports_error_once() {
    let (mut doc, ids) = PageBuilder::new(1024.0, 768.0)
        .element(
            ElementSpec::new("img")
                .class("b-lazy")
                .rect(Rect::from_origin_size(0.0, 0.0, 100.0, 100.0)),
        )
        .build();
    let recorder = CallbackRecorder::new();

    let lazy = LazyLoader::with_callbacks(&mut doc, Options::default(), recorder.callbacks());

    assert_eq!(recorder.errors_for(ids[0]), vec!["missing"]);
    let error_classes = doc
        .classes(&ids[0])
        .into_iter()
        .filter(|class| class == "b-error")
        .count();
    assert_eq!(error_classes, 1);
    assert!(!lazy.is_active());
}

#[test]
fn test_manual_load_then_scan_prunes_without_reloading() {
    let (mut doc, ids) = PageBuilder::new(1024.0, 768.0)
        .image_at(0.0, "top.png")
        .image_at(5000.0, "bottom.png")
        .image_at(9000.0, "footer.png")
        .build();
    let recorder = CallbackRecorder::new();
    let mut lazy =
        LazyLoader::with_callbacks(&mut doc, Options::default(), recorder.callbacks());

    lazy.load(&mut doc, &ids[1], true);
    doc.pump_probes();
    assert!(doc.has_class(&ids[1], "b-loaded"));
    assert_eq!(lazy.registry().len(), 2);

    doc.advance(Duration::from_millis(100));
    let summary = lazy.on_scroll(&mut doc, &SignalTarget::Window).unwrap();

    assert_eq!(summary.pruned, 1);
    assert_eq!(summary.loaded, 0);
    assert_eq!(lazy.registry().len(), 1);
    assert!(recorder.errors_for(ids[1]).is_empty());
    assert_eq!(doc.probed_urls(), ["top.png", "bottom.png"]);
}

#[test]
fn test_load_many_ignores_lifecycle_state() {
    let (mut doc, ids) = PageBuilder::new(1024.0, 768.0)
        .image_at(4000.0, "a.png")
        .image_at(8000.0, "b.png")
        .build();
    let mut lazy = LazyLoader::start(&mut doc, Options::default());
    lazy.destroy(&mut doc);

    lazy.load_all(&mut doc, &ids, true);
    assert_eq!(doc.probed_urls(), ["a.png", "b.png"]);
}

#[test]
fn test_burst_of_scroll_signals_validates_once() {
    let (mut doc, _) = PageBuilder::new(1024.0, 768.0)
        .image_at(2000.0, "a.png")
        .image_at(2500.0, "b.png")
        .image_at(20000.0, "c.png")
        .build();
    let mut lazy = LazyLoader::start(&mut doc, Options::default());

    let mut passes = 0;
    for step in 1..=20 {
        doc.advance(Duration::from_millis(1));
        doc.scroll_window_to(0.0, step as f64 * 100.0);
        if lazy.on_scroll(&mut doc, &SignalTarget::Window).is_some() {
            passes += 1;
        }
    }

    assert_eq!(passes, 1);
    // Only the first scroll position (100) was validated
    assert_eq!(lazy.registry().len(), 3);

    doc.advance(Duration::from_millis(25));
    lazy.on_scroll(&mut doc, &SignalTarget::Window);
    assert_eq!(lazy.registry().len(), 1);
}

#[test]
fn test_resize_grows_viewport() {
    let (mut doc, _) = PageBuilder::new(1024.0, 768.0)
        .image_at(1200.0, "a.png")
        .build();
    let mut lazy = LazyLoader::start(&mut doc, Options::default());
    assert_eq!(lazy.registry().len(), 1);

    doc.resize_viewport(1024.0, 1200.0);
    lazy.on_resize(&mut doc);

    assert!(!lazy.is_active());
    assert_eq!(doc.probed_urls(), ["a.png"]);
}

#[test]
fn test_destroy_twice_matches_destroy_once() {
    let (mut doc, _) = PageBuilder::new(1024.0, 768.0)
        .image_at(5000.0, "a.png")
        .build();
    let mut lazy = LazyLoader::start(&mut doc, Options::default());

    lazy.destroy(&mut doc);
    let after_once = (doc.unbind_calls(), doc.bound_signals().len(), lazy.state());
    lazy.destroy(&mut doc);
    let after_twice = (doc.unbind_calls(), doc.bound_signals().len(), lazy.state());

    assert_eq!(after_once, after_twice);
    assert!(lazy.registry().is_empty());
}

#[test]
fn test_high_density_source_selection() {
    let (mut doc, _) = PageBuilder::new(1024.0, 768.0)
        .pixel_ratio(2.0)
        .image_at(0.0, "a.png|b.png")
        .image_at(10.0, "single.png")
        .build();
    LazyLoader::start(&mut doc, Options::default());
    assert_eq!(doc.probed_urls(), ["b.png", "single.png"]);

    let (mut doc, _) = PageBuilder::new(1024.0, 768.0)
        .image_at(0.0, "a.png|b.png")
        .build();
    LazyLoader::start(&mut doc, Options::default());
    assert_eq!(doc.probed_urls(), ["a.png"]);
}

#[test]
fn test_breakpoint_overrides_attribute_on_small_screen() {
    let (mut doc, ids) = PageBuilder::new(480.0, 800.0)
        .screen_width(480.0)
        .element(
            ElementSpec::new("img")
                .class("b-lazy")
                .attr("data-src", "desktop.png")
                .attr("data-src-small", "mobile.png")
                .rect(Rect::from_origin_size(0.0, 0.0, 100.0, 100.0)),
        )
        .build();
    let options = Options {
        breakpoints: vec![Breakpoint {
            width: 600.0,
            src: "data-src-small".to_string(),
        }],
        ..Options::default()
    };

    let lazy = LazyLoader::start(&mut doc, options);

    assert_eq!(lazy.src_attribute(), "data-src-small");
    assert_eq!(doc.probed_urls(), ["mobile.png"]);
    assert!(doc.attribute(&ids[0], "data-src").is_none());
    assert!(doc.attribute(&ids[0], "data-src-small").is_none());
}

#[test]
fn test_container_scroll_drives_validation() {
    let (mut doc, ids) = PageBuilder::new(1024.0, 768.0)
        .element(
            ElementSpec::new("div")
                .id("carousel")
                .class("carousel")
                .rect(Rect::from_origin_size(0.0, 0.0, 1024.0, 300.0)),
        )
        .build();
    let carousel = ids[0];
    doc.add_element(
        ElementSpec::new("img")
            .class("b-lazy")
            .attr("data-src", "slide.png")
            .in_container(carousel)
            .rect(Rect::from_origin_size(3000.0, 0.0, 1024.0, 300.0)),
    );
    let options = Options {
        container: Some(".carousel".to_string()),
        ..Options::default()
    };

    let mut lazy = LazyLoader::start(&mut doc, options);
    let container = SignalTarget::Element(carousel);
    assert!(doc.is_bound(&Signal::Scroll(container.clone())));
    assert_eq!(lazy.containers(), [carousel]);
    assert_eq!(lazy.registry().len(), 1);

    doc.scroll_element_to(&carousel, 2100.0, 0.0);
    lazy.on_scroll(&mut doc, &container);

    assert!(!lazy.is_active());
    assert!(!doc.is_bound(&Signal::Scroll(container)));
    assert_eq!(doc.probed_urls(), ["slide.png"]);
}

#[test]
fn test_invalid_source_marks_error_after_probe() {
    let (mut doc, ids) = PageBuilder::new(1024.0, 768.0)
        .image_at(0.0, "broken.png")
        .build();
    doc.fail_url("broken.png");
    let recorder = CallbackRecorder::new();

    let _lazy = LazyLoader::with_callbacks(&mut doc, Options::default(), recorder.callbacks());
    assert!(recorder.events().is_empty());

    doc.pump_probes();
    assert_eq!(recorder.events(), vec![Recorded::Error(ids[0], "invalid")]);
    assert!(doc.has_class(&ids[0], "b-error"));
    assert_eq!(recorder.successes(), 0);
}

#[test]
fn test_independent_instances_do_not_share_state() {
    let (mut doc, ids) = PageBuilder::new(1024.0, 768.0)
        .image_at(0.0, "a.png")
        .element(
            ElementSpec::new("div")
                .class("hero")
                .attr("data-bg", "bg.jpg")
                .rect(Rect::from_origin_size(0.0, 5000.0, 1024.0, 400.0)),
        )
        .build();

    let images = LazyLoader::start(&mut doc, Options::default());
    let heroes = LazyLoader::start(
        &mut doc,
        Options {
            selector: ".hero".to_string(),
            src: "data-bg".to_string(),
            offset: 0.0,
            ..Options::default()
        },
    );

    assert!(!images.is_active());
    assert!(heroes.is_active());
    assert_eq!(images.viewport().rect().top, -100.0);
    assert_eq!(heroes.viewport().rect().top, 0.0);
    assert!(heroes.registry().contains(&ids[1]));
}

#[test]
fn test_zero_validate_delay_still_throttles() {
    let (mut doc, _) = PageBuilder::new(1024.0, 768.0)
        .image_at(5000.0, "a.png")
        .build();
    let options = Options {
        validate_delay_ms: 0,
        ..Options::default()
    };
    let mut lazy = LazyLoader::start(&mut doc, options);

    let executed = (0..5)
        .filter(|_| lazy.on_scroll(&mut doc, &SignalTarget::Window).is_some())
        .count();
    assert_eq!(executed, 1);
}
