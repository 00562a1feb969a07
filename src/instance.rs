//! The font-instance factory (C2): turns a resolved [`Pattern`] into an
//! opened face plus derived load/render flags and metrics.

use std::sync::Arc;

use log::debug;
use smallvec::SmallVec;

use crate::backend::{
    Backends, HintTarget, LoadFlags, RasterFace, RenderMode, ShaperInstance,
};
use crate::error::{RasterfontError, Result};
use crate::pattern::{HintStyle, LcdFilter, OpenTypeFeature, Pattern, SubpixelMode, MAX_FEATURES};

/// Derived font metrics , already adjusted by the
/// pixel-size fixup factor.
#[derive(Clone, Copy, Debug, Default)]
pub struct Metrics {
    pub ascent: f64,
    pub descent: f64,
    pub height: f64,
    pub max_advance_x: f64,
    pub max_advance_y: f64,
    pub underline_position: f64,
    pub underline_thickness: f64,
    pub strikeout_position: f64,
    pub strikeout_thickness: f64,
    pub antialias: bool,
    pub subpixel: SubpixelMode,
}

/// One instantiated font : an opened face plus
/// everything derived from the pattern that's needed to rasterize and
/// shape with it.
pub struct FontInstance {
    pub(crate) face: Box<dyn RasterFace>,
    pub(crate) shaper_instance: Box<dyn ShaperInstance>,
    pub(crate) load_flags: LoadFlags,
    pub(crate) render_mode_normal: RenderMode,
    pub(crate) render_mode_subpixel: Option<RenderMode>,
    pub(crate) lcd_filter: LcdFilter,
    pub(crate) color: bool,
    pub(crate) embolden: bool,
    pub(crate) bgr: bool,
    /// `requested_pixel_size / face_y_ppem` for bitmap-strike fonts, 1.0
    /// otherwise.
    pub(crate) pixel_fixup: f64,
    pub(crate) pixel_fixup_estimated: bool,
    pub(crate) features: SmallVec<[OpenTypeFeature; 8]>,
    pub metrics: Metrics,
}

fn render_mode_for(target: HintTarget, subpixel: SubpixelMode) -> (RenderMode, Option<RenderMode>) {
    let normal = match target {
        HintTarget::Mono => RenderMode::Mono,
        HintTarget::Light => RenderMode::Light,
        HintTarget::Normal => RenderMode::Normal,
    };
    let subpixel_mode = if subpixel.is_lcd() {
        Some(if subpixel.is_vertical() {
            RenderMode::LcdVertical
        } else {
            RenderMode::Lcd
        })
    } else {
        None
    };
    (normal, subpixel_mode)
}

impl FontInstance {
    /// Build an instance from a resolved pattern.
    ///
    /// `requested_point_size`/`requested_pixel_size` are the *base*
    /// pattern's requested size (pre-render-prepare), used only for the
    /// pixel-size fixup computation in step 5.
    pub(crate) fn new(
        backends: &Backends,
        pattern: &Pattern,
        requested_pixel_size: f64,
    ) -> Result<FontInstance> {
        // Step 1: open under the global backend lock. The Rasterizer trait
        // implementation is responsible for taking that lock internally
        // (platform::freetype::FreeTypeRasterizer does so via the global
        // library handle), matching the "backend face-open is not
        // thread-safe" note.
        let face = backends
            .rasterizer
            .open_face(&pattern.file_path, pattern.face_index)
            .map_err(|e| RasterfontError::Candidate(format!("open_face failed: {e}")))?;

        // Step 2.
        let pixel_size = pattern.effective_pixel_size();
        face.set_pixel_size(pixel_size)
            .map_err(|e| RasterfontError::Candidate(format!("set_pixel_size failed: {e}")))?;

        // Step 3: derive load/render flags.
        let mut load_flags = LoadFlags::default();
        let (render_mode_normal, mut render_mode_subpixel);
        if !pattern.antialias {
            load_flags.monochrome = true;
            render_mode_normal = RenderMode::Mono;
            render_mode_subpixel = None;
        } else if !pattern.hinting || pattern.hint_style == HintStyle::None {
            load_flags.no_hinting = true;
            let (n, s) = render_mode_for(HintTarget::Normal, pattern.rgba);
            render_mode_normal = n;
            render_mode_subpixel = s;
        } else {
            let target = match pattern.hint_style {
                HintStyle::Slight => HintTarget::Light,
                HintStyle::Medium | HintStyle::Full => HintTarget::Normal,
                HintStyle::None => unreachable!("handled above"),
            };
            load_flags.target = target;
            let (n, s) = render_mode_for(target, pattern.rgba);
            render_mode_normal = n;
            render_mode_subpixel = s;
        }
        if !pattern.embedded_bitmap && pattern.outline {
            load_flags.no_bitmap = true;
        }
        if pattern.autohint {
            load_flags.force_autohint = true;
        }
        if pattern.color {
            load_flags.color = true;
            render_mode_subpixel = None;
        }

        // Step 4.
        if let Some(matrix) = pattern.matrix {
            face.set_transform(matrix);
        }

        // Step 5: pixel-size fixup for bitmap-strike fonts.
        let (pixel_fixup, pixel_fixup_estimated) = if let Some(explicit) = pattern.pixel_fixup {
            (explicit, false)
        } else if pattern.scalable && !pattern.outline {
            let y_ppem = face.metrics().y_ppem;
            if y_ppem > 0 {
                (requested_pixel_size / y_ppem as f64, true)
            } else {
                (1.0, false)
            }
        } else {
            (1.0, false)
        };

        // Step 6: metrics, fixed up.
        let raw = face.metrics();
        let metrics = Metrics {
            ascent: (raw.ascent * pixel_fixup).ceil(),
            descent: (raw.descent * pixel_fixup).ceil(),
            height: (raw.height * pixel_fixup).ceil(),
            max_advance_x: (raw.max_advance * pixel_fixup).ceil(),
            max_advance_y: (raw.max_advance * pixel_fixup).ceil(),
            underline_position: raw.underline_position * pixel_fixup,
            underline_thickness: raw.underline_thickness * pixel_fixup,
            strikeout_position: raw.strikeout_position.unwrap_or(raw.descent / 2.0) * pixel_fixup,
            strikeout_thickness: raw.strikeout_thickness.unwrap_or(raw.underline_thickness)
                * pixel_fixup,
            antialias: pattern.antialias,
            subpixel: pattern.rgba,
        };

        // Step 7: shaper handle + bounded feature list.
        let shaper_instance = backends.shaper.create_instance(face.as_ref(), pixel_size);
        let mut features = SmallVec::new();
        for feature in pattern.features.iter().take(MAX_FEATURES) {
            features.push(*feature);
        }

        debug!(
            "instantiated font instance: file={:?} pixel_size={pixel_size} fixup={pixel_fixup} estimated={pixel_fixup_estimated}",
            pattern.file_path
        );

        Ok(FontInstance {
            face,
            shaper_instance,
            load_flags,
            render_mode_normal,
            render_mode_subpixel,
            lcd_filter: pattern.lcd_filter,
            color: pattern.color,
            embolden: pattern.embolden,
            bgr: pattern.rgba.is_bgr(),
            pixel_fixup,
            pixel_fixup_estimated,
            features,
            metrics,
        })
    }

    /// Subpixel-or-normal render mode to use for one glyph : color glyphs always force NORMAL.
    pub(crate) fn render_mode_for_request(&self, want_subpixel: bool) -> RenderMode {
        if self.color {
            return RenderMode::Normal;
        }
        if want_subpixel {
            if let Some(mode) = self.render_mode_subpixel {
                return mode;
            }
        }
        self.render_mode_normal
    }
}

/// Shared ownership of a backend bundle, held by every [`FontInstance`]'s
/// owning [`crate::candidate::FallbackCandidate`] so re-instantiation after
/// eviction does not need the caller to replumb the backends.
pub(crate) type SharedBackends = Arc<Backends>;
