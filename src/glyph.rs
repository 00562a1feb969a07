//! The pixel-format adapter (C1) and the glyph pipeline (C6).

use unicode_width::UnicodeWidthChar;

use crate::backend::{Backends, GlyphBitmap, PixelMode, RenderMode};
use crate::cache::GlyphKey;
use crate::emoji;
use crate::error::Result;
use crate::font::Font;
use crate::instance::FontInstance;
use crate::pattern::SubpixelMode;
use crate::scaling;

/// The four uniform pixel formats this crate ever hands back.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelFormat {
    A1,
    A8,
    X8R8G8B8,
    A8R8G8B8,
}

#[derive(Clone, Debug)]
pub struct PixelImage {
    pub format: PixelFormat,
    pub width: u32,
    pub height: u32,
    pub stride: u32,
    pub pixels: Vec<u8>,
}

/// A positioned pixel image.
#[derive(Clone, Debug)]
pub struct RenderedGlyph {
    pub image: PixelImage,
    pub x: i32,
    pub y: i32,
    pub advance_x: f64,
    pub advance_y: f64,
    pub codepoint: char,
    pub cols: i32,
    pub font_name: Option<String>,
    /// `false` marks a negative cache entry.
    pub valid: bool,
}

/// C1: normalize one of the five raw bitmap formats into a uniform image
///.
fn adapt(bitmap: &GlyphBitmap, bgr: bool) -> PixelImage {
    match bitmap.mode {
        PixelMode::Mono => adapt_mono(bitmap),
        PixelMode::Gray => adapt_gray(bitmap),
        PixelMode::LcdHorizontal => adapt_lcd_horizontal(bitmap, bgr),
        PixelMode::LcdVertical => adapt_lcd_vertical(bitmap, bgr),
        PixelMode::Bgra => adapt_bgra(bitmap),
    }
}

fn row(bitmap: &GlyphBitmap, y: u32) -> &[u8] {
    let pitch = bitmap.pitch.unsigned_abs() as usize;
    let start = y as usize * pitch;
    &bitmap.buffer[start..start + pitch]
}

fn adapt_mono(bitmap: &GlyphBitmap) -> PixelImage {
    let stride = bitmap.width.div_ceil(8);
    let mut pixels = Vec::with_capacity((stride * bitmap.height) as usize);
    for y in 0..bitmap.height {
        let src = row(bitmap, y);
        for x in 0..stride {
            // Endian-corrected: the rasterizer packs bits MSB-first; this
            // crate's A1 consumer contract expects LSB-first byte order.
            pixels.push(src.get(x as usize).copied().unwrap_or(0).reverse_bits());
        }
    }
    PixelImage { format: PixelFormat::A1, width: bitmap.width, height: bitmap.height, stride, pixels }
}

fn adapt_gray(bitmap: &GlyphBitmap) -> PixelImage {
    let stride = bitmap.width;
    let mut pixels = Vec::with_capacity((stride * bitmap.height) as usize);
    for y in 0..bitmap.height {
        let src = row(bitmap, y);
        pixels.extend_from_slice(&src[..bitmap.width as usize]);
    }
    PixelImage { format: PixelFormat::A8, width: bitmap.width, height: bitmap.height, stride, pixels }
}

fn adapt_lcd_horizontal(bitmap: &GlyphBitmap, bgr: bool) -> PixelImage {
    let logical_width = bitmap.width / 3;
    let stride = logical_width * 4;
    let mut pixels = Vec::with_capacity((stride * bitmap.height) as usize);
    for y in 0..bitmap.height {
        let src = row(bitmap, y);
        for x in 0..logical_width {
            let base = (x * 3) as usize;
            let (c0, c1, c2) = (src[base], src[base + 1], src[base + 2]);
            let (r, g, b) = if bgr { (c2, c1, c0) } else { (c0, c1, c2) };
            pixels.extend_from_slice(&[b, g, r, 0xFF]);
        }
    }
    PixelImage { format: PixelFormat::X8R8G8B8, width: logical_width, height: bitmap.height, stride, pixels }
}

fn adapt_lcd_vertical(bitmap: &GlyphBitmap, bgr: bool) -> PixelImage {
    let logical_height = bitmap.height / 3;
    let stride = bitmap.width * 4;
    let mut pixels = Vec::with_capacity((stride * logical_height) as usize);
    for y in 0..logical_height {
        let (r0, r1, r2) = (row(bitmap, y * 3), row(bitmap, y * 3 + 1), row(bitmap, y * 3 + 2));
        for x in 0..bitmap.width as usize {
            let (c0, c1, c2) = (r0[x], r1[x], r2[x]);
            let (r, g, b) = if bgr { (c2, c1, c0) } else { (c0, c1, c2) };
            pixels.extend_from_slice(&[b, g, r, 0xFF]);
        }
    }
    PixelImage { format: PixelFormat::X8R8G8B8, width: bitmap.width, height: logical_height, stride, pixels }
}

fn adapt_bgra(bitmap: &GlyphBitmap) -> PixelImage {
    // FreeType's BGRA bitmaps are already premultiplied, and the BGRA byte
    // order is exactly the little-endian memory layout of A8R8G8B8 (as a
    // 0xAARRGGBB word): B,G,R,A. No repacking needed beyond stripping pitch
    // padding.
    let stride = bitmap.width * 4;
    let mut pixels = Vec::with_capacity((stride * bitmap.height) as usize);
    for y in 0..bitmap.height {
        let src = row(bitmap, y);
        pixels.extend_from_slice(&src[..stride as usize]);
    }
    PixelImage { format: PixelFormat::A8R8G8B8, width: bitmap.width, height: bitmap.height, stride, pixels }
}

/// Index Rasterization , given an already-resolved
/// glyph index. Used directly by the grapheme/text-run pipelines, which get
/// their indices from the shaper; the codepoint-driven glyph pipeline below
/// calls it after step 1 resolves the index itself.
pub(crate) fn rasterize_glyph_index(
    instance: &FontInstance,
    backends: &Backends,
    glyph_index: u32,
    codepoint_tag: char,
    want_subpixel: bool,
) -> Result<RenderedGlyph> {
    instance.face.load_glyph(glyph_index, instance.load_flags)?;
    if instance.embolden {
        instance.face.embolden_loaded_glyph();
    }

    let render_mode = instance.render_mode_for_request(want_subpixel);
    if backends.rasterizer.supports_lcd_filter()
        && matches!(render_mode, RenderMode::Lcd | RenderMode::LcdVertical)
    {
        backends.rasterizer.set_lcd_filter(instance.lcd_filter);
    }

    let bitmap = instance.face.render_loaded_glyph(render_mode)?;
    let mut image = adapt(&bitmap, instance.bgr);

    let fixup = instance.pixel_fixup;
    let (x, y, advance_x, advance_y) = if (fixup - 1.0).abs() > f64::EPSILON {
        if matches!(image.format, PixelFormat::A8R8G8B8) {
            image = scaling::resample(&image, fixup);
        }
        (
            (bitmap.bitmap_left as f64 * fixup).round() as i32,
            (bitmap.bitmap_top as f64 * fixup).round() as i32,
            bitmap.advance_x * fixup,
            bitmap.advance_y * fixup,
        )
    } else {
        (bitmap.bitmap_left, bitmap.bitmap_top, bitmap.advance_x, bitmap.advance_y)
    };

    Ok(RenderedGlyph {
        image,
        x,
        y,
        advance_x,
        advance_y,
        codepoint: codepoint_tag,
        cols: codepoint_tag.width().unwrap_or(0) as i32,
        font_name: None,
        valid: true,
    })
}

fn rasterize_by_codepoint(
    instance: &FontInstance,
    backends: &Backends,
    codepoint: char,
    want_subpixel: bool,
) -> Result<RenderedGlyph> {
    // Step 1: with OpenType features configured, route through the shaper
    // so feature substitutions apply to the cmap lookup itself.
    let glyph_index = if !instance.features.is_empty() {
        instance
            .shaper_instance
            .shape(&codepoint.to_string(), false, instance.shaper_instance.guess_script(&codepoint.to_string()), &instance.features)
            .first()
            .map(|g| g.glyph_id)
    } else {
        instance.face.glyph_index(codepoint)
    };
    let glyph_index = glyph_index.filter(|idx| *idx != 0).ok_or_else(|| {
        crate::error::RasterfontError::GlyphRasterization(format!("no glyph for U+{:04X}", codepoint as u32))
    })?;
    rasterize_glyph_index(instance, backends, glyph_index, codepoint, want_subpixel)
}

/// Walk the fallback chain for one codepoint , honoring
/// emoji presentation enforcement. Returns the index of the candidate used,
/// or `None` if the walk produced nothing (caller falls back to primary).
fn walk_chain(
    candidates: &mut [crate::candidate::FallbackCandidate],
    backends: &Backends,
    codepoint: char,
    enforce_presentation: bool,
    force_text: bool,
    force_emoji: bool,
) -> Option<usize> {
    for i in 0..candidates.len() {
        if candidates[i].is_dead() || !candidates[i].covers(codepoint) {
            continue;
        }
        if enforce_presentation {
            let has_lang_emoji = candidates[i].has_emoji_lang();
            if (force_text && has_lang_emoji) || (force_emoji && !has_lang_emoji) {
                continue;
            }
        }
        if !candidates[i].ensure_instantiated(backends) {
            continue;
        }
        return Some(i);
    }
    None
}

/// The glyph pipeline (C6): `rasterize(font, codepoint, subpixel)`. Returns
/// `None` for a cached-negative or irrecoverable miss.
pub fn rasterize(font: &Font, codepoint: char, subpixel: SubpixelMode) -> Option<RenderedGlyph> {
    let key = GlyphKey::new(codepoint, subpixel);
    if let Some(entry) = font.glyph_cache().get(&key) {
        return entry.as_option().cloned();
    }

    let mut primary = font.primary().lock();
    let backends = font.backends().clone();
    let result = font.glyph_cache().get_or_insert_with(key, || {
        let is_emoji = emoji::is_emoji(codepoint);
        let mut enforce_presentation = is_emoji;
        let (mut force_text, mut force_emoji) = if is_emoji {
            emoji::force_flags(codepoint, primary.emoji_presentation)
        } else {
            (false, false)
        };

        let mut chosen =
            walk_chain(&mut primary.candidates, &backends, codepoint, enforce_presentation, force_text, force_emoji);
        if chosen.is_none() && enforce_presentation {
            enforce_presentation = false;
            force_text = false;
            force_emoji = false;
            chosen = walk_chain(&mut primary.candidates, &backends, codepoint, false, force_text, force_emoji);
        }

        let want_subpixel = subpixel.is_lcd();
        let rendered = match chosen {
            Some(idx) => {
                let instance = primary.candidates[idx].instance().expect("just ensured instantiated");
                rasterize_by_codepoint(instance, &backends, codepoint, want_subpixel)
            },
            None => {
                let instance = primary.candidates[0].instance().expect("primary always live");
                rasterize_by_codepoint(instance, &backends, codepoint, want_subpixel)
            },
        };

        match rendered {
            Ok(glyph) => crate::cache::CacheEntry::Valid(glyph),
            Err(_) => crate::cache::CacheEntry::Negative,
        }
    });

    result.as_option().cloned()
}
