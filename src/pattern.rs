//! The font database's output type and the small value
//! types it is built from.
//!
//! A [`Pattern`] is deliberately a plain, backend-agnostic value type rather
//! than a wrapper around a live `FcPattern*`: the font-database backend
//! (`platform::fontconfig`) materializes one by walking the matched
//! `FcPattern` once and copying out everything the rest of the crate needs.
//! This keeps every later stage (C2, C3, C6...) free of FFI lifetimes, at the
//! cost of that one upfront copy per candidate - cheap next to a glyph
//! rasterization.

use std::path::PathBuf;

use smallvec::SmallVec;

/// Subpixel layout, used both as the font database's per-pattern
/// recommendation and as the caller-facing request parameter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SubpixelMode {
    Default,
    None,
    HorizontalRgb,
    HorizontalBgr,
    VerticalRgb,
    VerticalBgr,
}

impl SubpixelMode {
    pub fn is_lcd(self) -> bool {
        matches!(
            self,
            SubpixelMode::HorizontalRgb
                | SubpixelMode::HorizontalBgr
                | SubpixelMode::VerticalRgb
                | SubpixelMode::VerticalBgr
        )
    }

    pub fn is_vertical(self) -> bool {
        matches!(self, SubpixelMode::VerticalRgb | SubpixelMode::VerticalBgr)
    }

    pub fn is_bgr(self) -> bool {
        matches!(self, SubpixelMode::HorizontalBgr | SubpixelMode::VerticalBgr)
    }

    /// Pack into the 3-bit field used by [`crate::cache::GlyphKey`].
    pub(crate) fn bits(self) -> u32 {
        match self {
            SubpixelMode::Default => 0,
            SubpixelMode::None => 1,
            SubpixelMode::HorizontalRgb => 2,
            SubpixelMode::HorizontalBgr => 3,
            SubpixelMode::VerticalRgb => 4,
            SubpixelMode::VerticalBgr => 5,
        }
    }
}

/// Hinting style, mirroring fontconfig's `FC_HINT_STYLE` values.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HintStyle {
    None,
    Slight,
    Medium,
    Full,
}

/// LCD filter kind, mirroring FreeType's `FT_LcdFilter`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LcdFilter {
    None,
    Default,
    Light,
    Legacy,
}

/// A single OpenType feature setting (tag + value), as consumed by the
/// shaper. The instance-level list is capped at 32
/// entries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OpenTypeFeature {
    pub tag: [u8; 4],
    pub value: u32,
}

pub const MAX_FEATURES: usize = 32;

/// A compact, sorted set of covered codepoints. Built once by the font
/// database backend (materialized from `FcCharSet` page iteration; see
/// `platform::fontconfig`) and then queried purely in-process.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CharSet {
    /// Sorted, non-overlapping, inclusive `(start, end)` codepoint ranges.
    ranges: Vec<(u32, u32)>,
}

impl CharSet {
    pub fn from_codepoints(mut codepoints: Vec<u32>) -> Self {
        codepoints.sort_unstable();
        codepoints.dedup();
        let mut ranges: Vec<(u32, u32)> = Vec::new();
        for cp in codepoints {
            if let Some(last) = ranges.last_mut() {
                if cp == last.1 + 1 {
                    last.1 = cp;
                    continue;
                }
            }
            ranges.push((cp, cp));
        }
        CharSet { ranges }
    }

    pub fn from_ranges(ranges: Vec<(u32, u32)>) -> Self {
        CharSet { ranges }
    }

    pub fn contains(&self, codepoint: char) -> bool {
        let cp = codepoint as u32;
        self.ranges
            .binary_search_by(|&(start, end)| {
                if cp < start {
                    std::cmp::Ordering::Greater
                } else if cp > end {
                    std::cmp::Ordering::Less
                } else {
                    std::cmp::Ordering::Equal
                }
            })
            .is_ok()
    }

    pub fn contains_all(&self, codepoints: impl IntoIterator<Item = char>) -> bool {
        codepoints.into_iter().all(|c| self.contains(c))
    }
}

/// A set of BCP-47-ish language tags a font claims to cover.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LangSet {
    tags: std::collections::HashSet<String>,
}

/// The well-known tag fontconfig uses to mark a font as an emoji font
///.
pub const EMOJI_LANGUAGE_TAG: &str = "und-zsye";

impl LangSet {
    pub fn from_tags(tags: impl IntoIterator<Item = String>) -> Self {
        LangSet {
            tags: tags.into_iter().map(|t| t.to_ascii_lowercase()).collect(),
        }
    }

    pub fn has(&self, tag: &str) -> bool {
        self.tags.contains(&tag.to_ascii_lowercase())
    }

    pub fn is_emoji_font(&self) -> bool {
        self.has(EMOJI_LANGUAGE_TAG)
    }
}

/// A fully-resolved font description : the output of the
/// font database's `parse_name` -> `substitute` -> `sort` -> `render_prepare`
/// pipeline.
#[derive(Clone, Debug)]
pub struct Pattern {
    pub family_name: String,
    pub file_path: PathBuf,
    pub face_index: i32,
    pub point_size: f64,
    pub pixel_size: f64,
    pub dpi: f64,
    pub hinting: bool,
    pub hint_style: HintStyle,
    pub antialias: bool,
    pub rgba: SubpixelMode,
    pub lcd_filter: LcdFilter,
    pub embedded_bitmap: bool,
    pub autohint: bool,
    pub embolden: bool,
    pub matrix: Option<[[f64; 2]; 2]>,
    pub features: SmallVec<[OpenTypeFeature; 8]>,
    pub color: bool,
    pub outline: bool,
    pub scalable: bool,
    pub charset: CharSet,
    pub langset: LangSet,
    /// Explicit pixel-size fixup factor, if the database already computed
    /// one. `None` means "derive it".
    pub pixel_fixup: Option<f64>,
}

impl Pattern {
    /// The requested pixel size computed from `point_size` and `dpi` when no
    /// pixel size was set directly.
    pub fn effective_pixel_size(&self) -> f64 {
        if self.pixel_size > 0.0 {
            self.pixel_size
        } else {
            self.point_size * self.dpi / 72.0
        }
    }
}
