//! The grapheme pipeline (C7): shape one pre-segmented grapheme cluster
//! with a single selected fallback candidate.

use unicode_width::UnicodeWidthChar;

use crate::backend::{script_is_rtl, Backends};
use crate::cache::{CacheEntry, GraphemeKey};
use crate::candidate::FallbackCandidate;
use crate::emoji::{self, EmojiPresentation};
use crate::font::Font;
use crate::glyph::{rasterize_glyph_index, RenderedGlyph};
use crate::pattern::SubpixelMode;

/// A positioned, shaped grapheme cluster.
#[derive(Clone, Debug)]
pub struct PositionedGrapheme {
    pub cols: i32,
    pub glyphs: Vec<RenderedGlyph>,
}

const ZWJ: char = '\u{200D}';
const VS_EMOJI: char = '\u{FE0F}';
const VS_TEXT: char = '\u{FE0E}';

fn is_presentation_selector(c: char) -> bool {
    c == VS_EMOJI || c == VS_TEXT
}

/// Whole-cluster presentation requirements : whether some
/// codepoint in the cluster demands the chosen candidate carry the emoji
/// language tag (`require_emoji_lang`) or demands that it not
/// (`forbid_emoji_lang`).
pub(crate) fn cluster_presentation_requirements(cluster: &[char], policy: EmojiPresentation) -> (bool, bool) {
    let mut require_emoji_lang = false;
    let mut forbid_emoji_lang = false;
    for (i, &c) in cluster.iter().enumerate() {
        if c == ZWJ {
            continue;
        }
        if c == VS_EMOJI {
            require_emoji_lang = true;
            continue;
        }
        if c == VS_TEXT {
            forbid_emoji_lang = true;
            continue;
        }
        let followed_by_selector = cluster.get(i + 1).copied().is_some_and(is_presentation_selector);
        if !followed_by_selector && emoji::is_emoji(c) {
            let (force_text, force_emoji) = emoji::force_flags(c, policy);
            forbid_emoji_lang |= force_text;
            require_emoji_lang |= force_emoji;
        }
    }
    (require_emoji_lang, forbid_emoji_lang)
}

pub(crate) fn eligible(
    candidate: &FallbackCandidate,
    cluster: &[char],
    require_emoji_lang: bool,
    forbid_emoji_lang: bool,
) -> bool {
    if candidate.is_dead() {
        return false;
    }
    for &c in cluster {
        if c == ZWJ || is_presentation_selector(c) {
            continue;
        }
        if !candidate.covers(c) {
            return false;
        }
    }
    let has_lang = candidate.has_emoji_lang();
    !(require_emoji_lang && !has_lang) && !(forbid_emoji_lang && has_lang)
}

pub(crate) fn select_candidate(
    candidates: &mut [FallbackCandidate],
    backends: &Backends,
    cluster: &[char],
    require_emoji_lang: bool,
    forbid_emoji_lang: bool,
) -> Option<usize> {
    for i in 0..candidates.len() {
        if !eligible(&candidates[i], cluster, require_emoji_lang, forbid_emoji_lang) {
            continue;
        }
        if !candidates[i].ensure_instantiated(backends) {
            continue;
        }
        return Some(i);
    }
    None
}

fn column_count(cluster: &[char]) -> i32 {
    let sum: i32 = cluster.iter().map(|c| c.width().unwrap_or(0) as i32).sum();
    let selector_floor = if cluster.contains(&VS_EMOJI) { 2 } else { 0 };
    sum.max(selector_floor)
}

fn shape_and_rasterize(
    instance: &crate::instance::FontInstance,
    backends: &Backends,
    cluster: &[char],
    subpixel: SubpixelMode,
) -> Option<Vec<RenderedGlyph>> {
    let text: String = cluster.iter().collect();
    let script = instance.shaper_instance.guess_script(&text);
    let rtl = script_is_rtl(script);
    let shaped = instance.shaper_instance.shape(&text, rtl, script, &instance.features);
    if shaped.is_empty() {
        return None;
    }
    let fixup = instance.pixel_fixup;
    let mut glyphs = Vec::with_capacity(shaped.len());
    for shaped_glyph in &shaped {
        let tag_char = text[shaped_glyph.cluster as usize..]
            .chars()
            .next()
            .unwrap_or_else(|| cluster[0]);
        let mut rendered =
            rasterize_glyph_index(instance, backends, shaped_glyph.glyph_id, tag_char, subpixel.is_lcd()).ok()?;
        rendered.x += (shaped_glyph.x_offset * fixup).round() as i32;
        rendered.y += (shaped_glyph.y_offset * fixup).round() as i32;
        rendered.advance_x = shaped_glyph.x_advance * fixup;
        rendered.advance_y = shaped_glyph.y_advance * fixup;
        glyphs.push(rendered);
    }
    Some(glyphs)
}

/// The grapheme pipeline (C7).
pub fn rasterize_grapheme(font: &Font, cluster: &[char], subpixel: SubpixelMode) -> Option<PositionedGrapheme> {
    let key = GraphemeKey::new(cluster, subpixel);
    if let Some(entry) = font.grapheme_cache().get(&key) {
        return entry.as_option().cloned();
    }

    let mut primary = font.primary().lock();
    let backends = font.backends().clone();
    let result = font.grapheme_cache().get_or_insert_with(key, || {
        let policy = primary.emoji_presentation;
        let (require_emoji_lang, forbid_emoji_lang) = cluster_presentation_requirements(cluster, policy);
        let mut chosen =
            select_candidate(&mut primary.candidates, &backends, cluster, require_emoji_lang, forbid_emoji_lang);
        if chosen.is_none() && (require_emoji_lang || forbid_emoji_lang) {
            chosen = select_candidate(&mut primary.candidates, &backends, cluster, false, false);
        }
        let candidate_idx = chosen.unwrap_or(0);
        if chosen.is_none() {
            primary.candidates[0].ensure_instantiated(&backends);
        }
        let instance = primary.candidates[candidate_idx]
            .instance()
            .expect("selected or primary candidate is always live at this point");

        match shape_and_rasterize(instance, &backends, cluster, subpixel) {
            Some(glyphs) => CacheEntry::Valid(PositionedGrapheme { cols: column_count(cluster), glyphs }),
            None => CacheEntry::Negative,
        }
    });

    result.as_option().cloned()
}
