//! The text-run pipeline (C8): segment an arbitrary string into graphemes,
//! group consecutive ones sharing font + script, shape each group, and
//! concatenate. Never cached.

use crate::backend::script_is_rtl;
use crate::font::Font;
use crate::glyph::{rasterize_glyph_index, RenderedGlyph};
use crate::grapheme::{cluster_presentation_requirements, eligible, select_candidate};
use crate::pattern::SubpixelMode;

/// An unsegmented shaped text run: the caller owns and destroys this
/// directly; it does not live in any cache.
pub struct TextRun {
    pub glyphs: Vec<RenderedGlyph>,
    /// Byte offset into the original input string for each glyph, parallel
    /// to `glyphs`.
    pub cluster_indices: Vec<usize>,
}

struct PartialRun<'a> {
    candidate_idx: usize,
    script: unicode_script::Script,
    start: usize,
    text: &'a str,
}

/// Picks a candidate for one grapheme, by the same rule the grapheme
/// pipeline uses.
fn pick_candidate_for_grapheme(
    candidates: &mut [crate::candidate::FallbackCandidate],
    backends: &crate::backend::Backends,
    policy: crate::emoji::EmojiPresentation,
    grapheme: &[char],
) -> usize {
    let (require_emoji_lang, forbid_emoji_lang) = cluster_presentation_requirements(grapheme, policy);
    let chosen = select_candidate(candidates, backends, grapheme, require_emoji_lang, forbid_emoji_lang)
        .or_else(|| select_candidate(candidates, backends, grapheme, false, false));
    match chosen {
        Some(idx) => idx,
        None => {
            candidates[0].ensure_instantiated(backends);
            0
        },
    }
}

/// The text-run pipeline (C8). Returns `None` if any partial run fails to
/// shape or rasterize: a text run with an irrecoverable error returns null
/// for the whole run, never a partial one.
pub fn rasterize_text_run(font: &Font, text: &str, subpixel: SubpixelMode) -> Option<TextRun> {
    if text.is_empty() {
        return Some(TextRun { glyphs: Vec::new(), cluster_indices: Vec::new() });
    }

    let backends = font.backends().clone();
    let mut primary = font.primary().lock();
    let policy = primary.emoji_presentation;

    // Step 1: segment into graphemes.
    let segments = backends.segmenter.segment(text);

    // Step 2-3: pick a candidate + script per grapheme, then group
    // consecutive graphemes sharing both.
    let mut runs: Vec<PartialRun> = Vec::new();
    for (offset, grapheme) in segments {
        let chars: Vec<char> = grapheme.chars().collect();
        let candidate_idx = pick_candidate_for_grapheme(&mut primary.candidates, &backends, policy, &chars);
        let instance = primary.candidates[candidate_idx]
            .instance()
            .expect("pick_candidate_for_grapheme always leaves a live candidate selected");
        let script = instance.shaper_instance.guess_script(grapheme);

        match runs.last_mut() {
            Some(last) if last.candidate_idx == candidate_idx && last.script == script => {
                last.text = &text[last.start..offset + grapheme.len()];
            },
            _ => runs.push(PartialRun { candidate_idx, script, start: offset, text: grapheme }),
        }
    }

    let rtl_runs: Vec<bool> = runs.iter().map(|run| script_is_rtl(run.script)).collect();

    let want_subpixel = subpixel.is_lcd();
    let mut glyphs = Vec::new();
    let mut cluster_indices = Vec::new();

    // Step 4: shape each partial run, step 5: concatenate.
    for (i, run) in runs.iter().enumerate() {
        let rtl = rtl_runs[i];
        let instance = primary.candidates[run.candidate_idx]
            .instance()
            .expect("the candidate selected for this run was instantiated in the grouping pass above");
        let shaped = instance.shaper_instance.shape(run.text, rtl, run.script, &instance.features);
        if shaped.is_empty() {
            return None;
        }

        if !rtl && shaped.windows(2).any(|w| w[1].cluster < w[0].cluster) {
            log::warn!("text run: shaped output for a partial run was not in left-to-right cluster order; keeping shaper order as-is");
        }

        let fixup = instance.pixel_fixup;
        let mut run_glyphs = Vec::with_capacity(shaped.len());
        let mut run_indices = Vec::with_capacity(shaped.len());
        for shaped_glyph in &shaped {
            let absolute_offset = run.start + shaped_glyph.cluster as usize;
            let tag_char = text[absolute_offset..].chars().next()?;
            let mut rendered =
                rasterize_glyph_index(instance, &backends, shaped_glyph.glyph_id, tag_char, want_subpixel).ok()?;
            rendered.x += (shaped_glyph.x_offset * fixup).round() as i32;
            rendered.y += (shaped_glyph.y_offset * fixup).round() as i32;
            rendered.advance_x = shaped_glyph.x_advance * fixup;
            rendered.advance_y = shaped_glyph.y_advance * fixup;
            run_glyphs.push(rendered);
            run_indices.push(absolute_offset);
        }

        // RTL partial runs come back from the shaper in visual (right-to-left)
        // glyph order already; reverse them so the run's glyph vector stays in
        // logical left-to-right storage order like every LTR run.
        if rtl {
            run_glyphs.reverse();
            run_indices.reverse();
        }
        glyphs.extend(run_glyphs);
        cluster_indices.extend(run_indices);
    }

    Some(TextRun { glyphs, cluster_indices })
}
