//! Trait boundaries for the four external services this crate depends on:
//! the font database, the rasterization backend, the text shaper, and the
//! grapheme segmenter.
//!
//! Keeping these as `dyn`-safe traits (rather than hard-wiring fontconfig /
//! FreeType / HarfBuzz calls throughout the pipeline modules) is what makes
//! C3-C11 unit-testable without a live font install: `src/test_support.rs`
//! and `tests/common/mod.rs` provide synthetic implementations of all four,
//! and the integration tests run against those.

use std::path::Path;

use unicode_script::Script;

use crate::error::Result;
use crate::pattern::{LcdFilter, OpenTypeFeature, Pattern};

/// Bits of `FT_LOAD_*` this crate actually needs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LoadFlags {
    pub no_hinting: bool,
    pub monochrome: bool,
    pub force_autohint: bool,
    pub color: bool,
    pub no_bitmap: bool,
    pub target: HintTarget,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum HintTarget {
    #[default]
    Normal,
    Light,
    Mono,
}

/// Render-mode selector passed to `render_loaded_glyph`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderMode {
    Normal,
    Light,
    Mono,
    Lcd,
    LcdVertical,
}

/// The five raw bitmap formats a rasterization backend can hand back
/// , before the C1 pixel-format adapter normalizes them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelMode {
    Mono,
    Gray,
    LcdHorizontal,
    LcdVertical,
    Bgra,
}

/// A raw glyph bitmap as the rasterization backend rendered it, plus the
/// placement/advance the backend reports for it.
#[derive(Clone, Debug)]
pub struct GlyphBitmap {
    pub mode: PixelMode,
    pub width: u32,
    pub height: u32,
    /// Row stride in bytes; may be negative for bottom-up bitmaps, though
    /// FreeType bitmaps in practice are always top-down (positive pitch).
    pub pitch: i32,
    pub buffer: Vec<u8>,
    /// Horizontal bearing of the bitmap's left edge from the pen, in pixels.
    pub bitmap_left: i32,
    /// Vertical bearing of the bitmap's top edge from the baseline, in pixels.
    pub bitmap_top: i32,
    pub advance_x: f64,
    pub advance_y: f64,
}

/// Raw, unfixed-up face metrics.
#[derive(Clone, Copy, Debug, Default)]
pub struct FaceMetricsRaw {
    pub ascent: f64,
    pub descent: f64,
    pub height: f64,
    pub max_advance: f64,
    pub underline_position: f64,
    pub underline_thickness: f64,
    pub strikeout_position: Option<f64>,
    pub strikeout_thickness: Option<f64>,
    pub y_ppem: u32,
}

/// A single opened face, as handed back by [`Rasterizer::open_face`].
///
/// Implementations serialize their own internal mutable state (FreeType's
/// `FT_Face` is not safe to call concurrently); this crate additionally
/// serializes all calls through it behind the owning `Font`'s primary lock
///.
pub trait RasterFace: Send + Sync {
    fn is_scalable(&self) -> bool;
    fn is_color(&self) -> bool;
    fn has_fixed_sizes(&self) -> bool;
    fn glyph_index(&self, codepoint: char) -> Option<u32>;
    fn set_pixel_size(&self, size: f64) -> Result<()>;
    fn set_transform(&self, matrix: [[f64; 2]; 2]);
    fn load_glyph(&self, glyph_index: u32, flags: LoadFlags) -> Result<()>;
    /// Apply the embolden filter to the glyph slot last loaded by
    /// `load_glyph`. Outline glyphs only;
    /// a no-op on bitmap glyphs.
    fn embolden_loaded_glyph(&self);
    fn render_loaded_glyph(&self, mode: RenderMode) -> Result<GlyphBitmap>;
    fn kerning(&self, left_glyph: u32, right_glyph: u32) -> (f64, f64);
    fn metrics(&self) -> FaceMetricsRaw;
    /// Raw sfnt table bytes for `tag` (big-endian four-char code, e.g.
    /// `*b"cmap"`), if present. Feeds HarfBuzz's `hb_face_create_for_tables`
    /// , so the shaper never needs its
    /// own FreeType binding to read tables.
    fn font_table(&self, tag: [u8; 4]) -> Option<Vec<u8>>;
}

/// The rasterization backend as a whole : opens faces and
/// owns the process-global LCD-filter capability/state.
pub trait Rasterizer: Send + Sync {
    fn open_face(&self, path: &Path, face_index: i32) -> Result<Box<dyn RasterFace>>;
    /// Detected once at init : whether the backend
    /// supports `set_lcd_filter` at all on this build.
    fn supports_lcd_filter(&self) -> bool;
    /// Set the process-wide LCD filter under the backend's global lock for
    /// the duration of one render.
    fn set_lcd_filter(&self, filter: LcdFilter) -> bool;
}

/// One shaped glyph, as produced by [`ShaperInstance::shape`].
#[derive(Clone, Copy, Debug)]
pub struct ShapedGlyph {
    pub glyph_id: u32,
    /// Byte offset of the source cluster within the shaped text.
    pub cluster: u32,
    pub x_advance: f64,
    pub y_advance: f64,
    pub x_offset: f64,
    pub y_offset: f64,
}

/// A shaping handle bound to one `FontInstance`.
pub trait ShaperInstance: Send + Sync {
    fn shape(
        &self,
        text: &str,
        rtl: bool,
        script: Script,
        features: &[OpenTypeFeature],
    ) -> Vec<ShapedGlyph>;
    fn guess_script(&self, text: &str) -> Script;
}

/// The text shaper service , optional at the protocol level
/// but a hard dependency of this crate (HarfBuzz via `harfbuzz-sys`).
pub trait Shaper: Send + Sync {
    fn create_instance(&self, face: &dyn RasterFace, point_size: f64) -> Box<dyn ShaperInstance>;
}

/// Scripts whose default direction is right-to-left. Drives
/// `ShaperInstance::shape`'s `rtl` parameter for both the grapheme (C7) and
/// text-run (C8) pipelines; a script missing here is assumed LTR.
pub(crate) fn script_is_rtl(script: Script) -> bool {
    matches!(
        script,
        Script::Arabic
            | Script::Hebrew
            | Script::Syriac
            | Script::Thaana
            | Script::Nko
            | Script::Mandaic
            | Script::Samaritan
            | Script::Adlam
            | Script::Psalter_Pahlavi
            | Script::Manichaean
            | Script::Old_South_Arabian
            | Script::Old_North_Arabian
            | Script::Avestan
            | Script::Imperial_Aramaic
            | Script::Inscriptional_Pahlavi
            | Script::Inscriptional_Parthian
            | Script::Phoenician
            | Script::Hatran
            | Script::Old_Hungarian
    )
}

/// The grapheme segmenter service , used by the text-run
/// pipeline.
pub trait GraphemeSegmenter: Send + Sync {
    /// Returns `(byte_offset, grapheme_slice)` pairs covering all of `text`.
    fn segment<'a>(&self, text: &'a str) -> Vec<(usize, &'a str)>;
}

/// The default segmenter, backed by `unicode-segmentation`.
#[derive(Default)]
pub struct UnicodeSegmentationSegmenter;

impl GraphemeSegmenter for UnicodeSegmentationSegmenter {
    fn segment<'a>(&self, text: &'a str) -> Vec<(usize, &'a str)> {
        use unicode_segmentation::UnicodeSegmentation;
        text.grapheme_indices(true).collect()
    }
}

/// Bundles the four backends a [`crate::font::Font`] is constructed with.
/// Grouping them avoids a four-parameter constructor everywhere a font gets
/// built (tests in particular construct many fonts against the same mocks).
#[derive(Clone)]
pub struct Backends {
    pub database: std::sync::Arc<dyn FontDatabase>,
    pub rasterizer: std::sync::Arc<dyn Rasterizer>,
    pub shaper: std::sync::Arc<dyn Shaper>,
    pub segmenter: std::sync::Arc<dyn GraphemeSegmenter>,
}

/// The font database service. `resolve` folds fontconfig's
/// `FcNameParse` -> `FcConfigSubstitute` -> `FcDefaultSubstitute` -> `FcFontSort`
/// -> `FcFontRenderPrepare` pipeline into one call returning fully-prepared,
/// already-sorted candidate [`Pattern`]s ; this crate has
/// no external caller that needs the unprepared intermediate pattern, so the
/// two-phase match/render-prepare split fontconfig exposes is an
/// implementation detail of `platform::fontconfig::FontconfigDatabase` rather
/// than part of this trait (recorded in DESIGN.md).
pub trait FontDatabase: Send + Sync {
    fn resolve(&self, name: &str, attributes: &str) -> Result<Vec<Pattern>>;
}
