//! Production backend implementations wiring the traits in [`crate::backend`]
//! to fontconfig, FreeType, and HarfBuzz. Linux-only, matching
//! the `[target.'cfg(unix)'.dependencies]` split in `Cargo.toml`.

#[cfg(unix)]
pub mod fontconfig;
#[cfg(unix)]
pub mod freetype;
#[cfg(unix)]
pub mod harfbuzz;

/// The production [`crate::backend::Backends`] bundle. Most callers want
/// this rather than constructing the three backends by hand.
#[cfg(unix)]
pub fn backends() -> crate::backend::Backends {
    crate::backend::Backends {
        database: std::sync::Arc::new(fontconfig::FontconfigDatabase::new()),
        rasterizer: std::sync::Arc::new(freetype::FreeTypeRasterizer::new()),
        shaper: std::sync::Arc::new(harfbuzz::HarfbuzzShaper),
        segmenter: std::sync::Arc::new(crate::backend::UnicodeSegmentationSegmenter),
    }
}
