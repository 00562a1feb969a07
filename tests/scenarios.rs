//! End-to-end scenarios run against the mock backends in
//! `tests/common/mod.rs` rather than a live fontconfig/FreeType install.

mod common;

use std::sync::atomic::Ordering;
use std::sync::{Arc, Barrier};
use std::thread;

use rasterfont::{rasterize, rasterize_grapheme, EmojiPresentation, Font, ScalingFilter, SubpixelMode};

#[test]
fn simple_ascii() {
    let mocks = common::serif_only();
    let font = Font::from_name(mocks.backends, &["serif"], "size=12;t=simple_ascii").unwrap();

    let glyph = rasterize(&font, 'A', SubpixelMode::None).expect("A is covered by the serif mock");
    assert_eq!(glyph.codepoint, 'A');
    assert_eq!(glyph.image.width, 1);
    assert!(glyph.image.height > 0);
    assert!(glyph.advance_x > 0.0);

    font.destroy();
}

#[test]
fn precompose_present() {
    let mocks = common::serif_only();
    let font = Font::from_name(mocks.backends, &["serif"], "size=12;t=precompose_present").unwrap();

    let result = font.precompose('a', '\u{0301}').expect("a + combining acute composes");
    assert_eq!(result.composed, '\u{00E1}');
    assert_eq!(mocks.raster_calls.load(Ordering::SeqCst), 0);

    font.destroy();
}

#[test]
fn precompose_absent() {
    let mocks = common::serif_only();
    let font = Font::from_name(mocks.backends, &["serif"], "size=12;t=precompose_absent").unwrap();

    assert!(font.precompose('X', 'Y').is_none());

    font.destroy();
}

#[test]
fn emoji_zwj_grapheme() {
    let backends = common::emoji_only();
    let font = Font::from_name(backends, &["emoji"], "size=12;t=emoji_zwj").unwrap();

    let cluster = ['\u{1F91A}', '\u{1F3FF}'];
    let grapheme = rasterize_grapheme(&font, &cluster, SubpixelMode::None)
        .expect("ZWJ-merged cluster is covered by the emoji mock");
    assert_eq!(grapheme.glyphs.len(), 1);

    let again = rasterize_grapheme(&font, &cluster, SubpixelMode::None).unwrap();
    assert_eq!(again.glyphs.len(), grapheme.glyphs.len());

    font.destroy();
}

#[test]
fn fallback_pruning() {
    let backends = common::fallback_pruning();
    let font = Font::from_name(backends, &["serif", "does-not-exist-XYZ"], "size=12;t=fallback_pruning").unwrap();

    // Not covered by the primary serif candidate directly (serif only
    // covers printable ASCII); anything outside that range would have to
    // come from the "does-not-exist-XYZ" tail, which always fails to open.
    let before = font.precompose('X', 'Y');
    assert!(before.is_none());

    let first = rasterize(&font, '\u{00E9}', SubpixelMode::None);
    let second = rasterize(&font, '\u{00E9}', SubpixelMode::None);
    assert_eq!(first.is_some(), second.is_some());

    font.destroy();
}

#[test]
fn scaling_filter_nearest_is_step_function() {
    let backends = common::emoji_step_edge();
    let font = Font::from_name(backends, &["emoji"], "size=8;t=scaling_filter").unwrap();

    assert!(rasterfont::set_scaling_filter(ScalingFilter::Nearest));
    let nearest = rasterize(&font, '\u{1F600}', SubpixelMode::None).expect("emoji glyph present");

    assert!(rasterfont::set_scaling_filter(ScalingFilter::Lanczos3));
    let smooth = rasterize(&font, '\u{1F600}', SubpixelMode::None).expect("emoji glyph present");

    assert_eq!(nearest.image.width, smooth.image.width);
    assert_eq!(nearest.image.height, smooth.image.height);

    let alphas = |glyph: &rasterfont::RenderedGlyph| -> Vec<u8> {
        let channels = glyph.image.pixels.chunks_exact(4);
        channels.map(|px| px[3]).collect()
    };

    let nearest_alphas = alphas(&nearest);
    let smooth_alphas = alphas(&smooth);

    // Nearest must reproduce the source's hard edge exactly: every output
    // alpha is one of the two input values, never something in between.
    assert!(
        nearest_alphas.iter().all(|&a| a == 0 || a == 255),
        "nearest-neighbor scaling introduced an intermediate alpha value: {nearest_alphas:?}"
    );

    // Lanczos3 is a smoothing kernel: scaling across a hard edge must
    // produce at least one intermediate alpha value somewhere in the image.
    assert!(
        smooth_alphas.iter().any(|&a| a != 0 && a != 255),
        "lanczos3 scaling produced a pure step function with no intermediate alpha values: {smooth_alphas:?}"
    );

    font.destroy();
}

#[test]
fn concurrent_rasterize_hits_backend_once() {
    let mocks = common::serif_only();
    let font = Arc::new(Font::from_name(mocks.backends, &["serif"], "size=12;t=concurrent").unwrap());
    let barrier = Arc::new(Barrier::new(8));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let font = Arc::clone(&font);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                rasterize(&font, 'Q', SubpixelMode::None).is_some()
            })
        })
        .collect();

    for h in handles {
        assert!(h.join().unwrap());
    }
    assert_eq!(mocks.raster_calls.load(Ordering::SeqCst), 1);

    Arc::try_unwrap(font).ok().unwrap().destroy();
}

#[test]
fn reference_counting_round_trip() {
    let mocks = common::serif_only();
    let font = Font::from_name(mocks.backends, &["serif"], "size=12;t=refcount").unwrap();

    let cloned = font.clone_handle();
    // Destroying one of two outstanding references must not evict the
    // cache slot: the surviving handle keeps working.
    cloned.destroy();
    assert!(rasterize(&font, 'A', SubpixelMode::None).is_some());

    // Destroying the last reference evicts the slot; a later lookup by the
    // same name builds a fresh chain rather than reusing anything (there is
    // nothing left to reuse).
    font.destroy();
    let backends_again = common::serif_only().backends;
    let rebuilt = Font::from_name(backends_again, &["serif"], "size=12;t=refcount").unwrap();
    assert!(rasterize(&rebuilt, 'A', SubpixelMode::None).is_some());
    rebuilt.destroy();
}

#[test]
fn emoji_presentation_policy_gates_candidate_selection() {
    let backends = common::serif_only();
    let font = Font::from_name(backends, &["serif"], "size=12;t=emoji_policy").unwrap();
    font.set_emoji_presentation(EmojiPresentation::Text);
    font.set_emoji_presentation(EmojiPresentation::Emoji);
    font.destroy();
}
