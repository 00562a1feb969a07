//! rasterfont: font loading, rasterization, and text shaping, built around
//! a process-wide font-object cache and a glyph/grapheme cache per font.
//! Linux-only: the production backends (`platform`) bind fontconfig,
//! FreeType, and HarfBuzz, all behind `cfg(unix)`.

mod backend;
mod cache;
mod candidate;
mod emoji;
mod error;
mod font;
mod font_cache;
mod glyph;
mod grapheme;
mod instance;
mod lifecycle;
mod pattern;
mod precompose;
mod scaling;
mod textrun;

#[cfg(unix)]
pub mod platform;

#[cfg(test)]
mod test_support;

pub use backend::{
    Backends, FaceMetricsRaw, FontDatabase, GlyphBitmap, HintTarget, LoadFlags, PixelMode,
    RasterFace, Rasterizer, RenderMode, Shaper, ShaperInstance, ShapedGlyph,
    GraphemeSegmenter, UnicodeSegmentationSegmenter,
};
pub use emoji::EmojiPresentation;
pub use error::{RasterfontError, Result};
pub use font::Font;
pub use glyph::{rasterize, PixelFormat, PixelImage, RenderedGlyph};
pub use grapheme::{rasterize_grapheme, PositionedGrapheme};
pub use instance::Metrics;
pub use lifecycle::{capabilities, init, set_scaling_filter, shutdown, Capabilities, ScalingFilter};
pub use pattern::{
    CharSet, HintStyle, LangSet, LcdFilter, OpenTypeFeature, Pattern, SubpixelMode,
    EMOJI_LANGUAGE_TAG, MAX_FEATURES,
};
pub use precompose::{precompose, PrecomposeResult};
pub use textrun::{rasterize_text_run, TextRun};
