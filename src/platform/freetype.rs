//! FreeType-backed [`Rasterizer`]/[`RasterFace`]: a mutex-protected
//! process-global library handle plus a `NonNull`-wrapped safe face
//! wrapper.

use std::ffi::CString;
use std::path::Path;
use std::ptr;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::OnceLock;

use freetype_sys::*;
use parking_lot::Mutex;

use crate::backend::{
    FaceMetricsRaw, GlyphBitmap, LoadFlags, PixelMode, RasterFace, Rasterizer, RenderMode,
};
use crate::error::{RasterfontError, Result};
use crate::pattern::LcdFilter;

static FREETYPE_LIBRARY: OnceLock<Mutex<FT_Library>> = OnceLock::new();
static LCD_FILTER_SUPPORTED: AtomicBool = AtomicBool::new(true);

/// The process-global FreeType library handle. FreeType
/// documents that `FT_New_Face`/`FT_Done_Face` on a shared `FT_Library` must
/// be serialized by a mutex; this is that mutex.
fn library() -> &'static Mutex<FT_Library> {
    FREETYPE_LIBRARY.get_or_init(|| {
        let mut lib: FT_Library = ptr::null_mut();
        let err = unsafe { FT_Init_FreeType(&mut lib) };
        if err != 0 {
            // No realistic recovery from a missing FreeType at process
            // start; every later open_face call observes a null library and
            // fails cleanly instead.
            log::error!("FT_Init_FreeType failed with code {err}");
        }
        Mutex::new(lib)
    })
}

pub struct FreeTypeRasterizer;

impl FreeTypeRasterizer {
    pub fn new() -> Self {
        let _ = library();
        FreeTypeRasterizer
    }
}

impl Default for FreeTypeRasterizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Rasterizer for FreeTypeRasterizer {
    fn open_face(&self, path: &Path, face_index: i32) -> Result<Box<dyn RasterFace>> {
        let lib = library().lock();
        if lib.is_null() {
            return Err(RasterfontError::Candidate("FreeType library not initialized".into()));
        }
        let c_path = CString::new(path.as_os_str().to_string_lossy().into_owned())
            .map_err(|e| RasterfontError::Candidate(format!("invalid font path: {e}")))?;
        let mut face: FT_Face = ptr::null_mut();
        let err = unsafe { FT_New_Face(*lib, c_path.as_ptr(), face_index as FT_Long, &mut face) };
        if err != 0 || face.is_null() {
            return Err(RasterfontError::Candidate(format!(
                "FT_New_Face({path:?}, {face_index}) failed with code {err}"
            )));
        }
        let face = NonNull::new(face).expect("checked non-null above");
        Ok(Box::new(FreeTypeFace { face }))
    }

    fn supports_lcd_filter(&self) -> bool {
        LCD_FILTER_SUPPORTED.load(Ordering::Relaxed)
    }

    fn set_lcd_filter(&self, filter: LcdFilter) -> bool {
        let lib = library().lock();
        if lib.is_null() {
            return false;
        }
        let raw = match filter {
            LcdFilter::None => FT_LcdFilter_FT_LCD_FILTER_NONE,
            LcdFilter::Default => FT_LcdFilter_FT_LCD_FILTER_DEFAULT,
            LcdFilter::Light => FT_LcdFilter_FT_LCD_FILTER_LIGHT,
            LcdFilter::Legacy => FT_LcdFilter_FT_LCD_FILTER_LEGACY,
        };
        let err = unsafe { FT_Library_SetLcdFilter(*lib, raw) };
        let supported = err == 0;
        if !supported {
            LCD_FILTER_SUPPORTED.store(false, Ordering::Relaxed);
        }
        supported
    }
}

/// A safe wrapper around `FT_Face`.
struct FreeTypeFace {
    /// Safety invariant: returned from `FT_New_Face`, not freed before
    /// `Drop::drop` runs.
    face: NonNull<FT_FaceRec>,
}

unsafe impl Send for FreeTypeFace {}
unsafe impl Sync for FreeTypeFace {}

impl Drop for FreeTypeFace {
    fn drop(&mut self) {
        let _lib = library().lock();
        unsafe { FT_Done_Face(self.face.as_ptr()) };
    }
}

fn load_flags_to_raw(flags: LoadFlags) -> FT_Int32 {
    let mut raw = FT_LOAD_DEFAULT as FT_Int32;
    if flags.no_hinting {
        raw |= FT_LOAD_NO_HINTING as FT_Int32;
    }
    if flags.monochrome {
        raw |= FT_LOAD_MONOCHROME as FT_Int32;
    }
    if flags.force_autohint {
        raw |= FT_LOAD_FORCE_AUTOHINT as FT_Int32;
    }
    if flags.color {
        raw |= FT_LOAD_COLOR as FT_Int32;
    }
    if flags.no_bitmap {
        raw |= FT_LOAD_NO_BITMAP as FT_Int32;
    }
    raw |= match flags.target {
        crate::backend::HintTarget::Normal => FT_LOAD_TARGET_NORMAL as FT_Int32,
        crate::backend::HintTarget::Light => FT_LOAD_TARGET_LIGHT as FT_Int32,
        crate::backend::HintTarget::Mono => FT_LOAD_TARGET_MONO as FT_Int32,
    };
    raw
}

fn render_mode_to_raw(mode: RenderMode) -> FT_Render_Mode {
    match mode {
        RenderMode::Normal => FT_Render_Mode_FT_RENDER_MODE_NORMAL,
        RenderMode::Light => FT_Render_Mode_FT_RENDER_MODE_LIGHT,
        RenderMode::Mono => FT_Render_Mode_FT_RENDER_MODE_MONO,
        RenderMode::Lcd => FT_Render_Mode_FT_RENDER_MODE_LCD,
        RenderMode::LcdVertical => FT_Render_Mode_FT_RENDER_MODE_LCD_V,
    }
}

fn pixel_mode_from_raw(mode: u8) -> PixelMode {
    match mode as u32 {
        FT_Pixel_Mode_FT_PIXEL_MODE_MONO => PixelMode::Mono,
        FT_Pixel_Mode_FT_PIXEL_MODE_LCD => PixelMode::LcdHorizontal,
        FT_Pixel_Mode_FT_PIXEL_MODE_LCD_V => PixelMode::LcdVertical,
        FT_Pixel_Mode_FT_PIXEL_MODE_BGRA => PixelMode::Bgra,
        _ => PixelMode::Gray,
    }
}

impl RasterFace for FreeTypeFace {
    fn is_scalable(&self) -> bool {
        unsafe { self.face.as_ref().face_flags as u32 & FT_FACE_FLAG_SCALABLE != 0 }
    }

    fn is_color(&self) -> bool {
        unsafe { self.face.as_ref().face_flags as u32 & FT_FACE_FLAG_COLOR != 0 }
    }

    fn has_fixed_sizes(&self) -> bool {
        unsafe { self.face.as_ref().face_flags as u32 & FT_FACE_FLAG_FIXED_SIZES != 0 }
    }

    fn glyph_index(&self, codepoint: char) -> Option<u32> {
        let idx = unsafe { FT_Get_Char_Index(self.face.as_ptr(), codepoint as FT_ULong) };
        if idx == 0 {
            None
        } else {
            Some(idx)
        }
    }

    fn set_pixel_size(&self, size: f64) -> Result<()> {
        let px = size.round().max(1.0) as FT_UInt;
        let err = unsafe { FT_Set_Pixel_Sizes(self.face.as_ptr(), 0, px) };
        if err != 0 {
            return Err(RasterfontError::Candidate(format!("FT_Set_Pixel_Sizes failed with code {err}")));
        }
        Ok(())
    }

    fn set_transform(&self, matrix: [[f64; 2]; 2]) {
        let to_fixed = |v: f64| (v * 65536.0) as FT_Fixed;
        let mut ft_matrix = FT_Matrix {
            xx: to_fixed(matrix[0][0]),
            xy: to_fixed(matrix[0][1]),
            yx: to_fixed(matrix[1][0]),
            yy: to_fixed(matrix[1][1]),
        };
        unsafe { FT_Set_Transform(self.face.as_ptr(), &mut ft_matrix, ptr::null_mut()) };
    }

    fn load_glyph(&self, glyph_index: u32, flags: LoadFlags) -> Result<()> {
        let err = unsafe {
            FT_Load_Glyph(self.face.as_ptr(), glyph_index as FT_UInt, load_flags_to_raw(flags))
        };
        if err != 0 {
            return Err(RasterfontError::GlyphRasterization(format!(
                "FT_Load_Glyph({glyph_index}) failed with code {err}"
            )));
        }
        Ok(())
    }

    fn embolden_loaded_glyph(&self) {
        unsafe {
            let slot = self.face.as_ref().glyph;
            if !slot.is_null() && (*slot).format == FT_Glyph_Format_FT_GLYPH_FORMAT_OUTLINE {
                FT_Outline_Embolden(&mut (*slot).outline, 1 << 6);
            }
        }
    }

    fn render_loaded_glyph(&self, mode: RenderMode) -> Result<GlyphBitmap> {
        unsafe {
            let slot = self.face.as_ref().glyph;
            if slot.is_null() {
                return Err(RasterfontError::GlyphRasterization("no glyph loaded".into()));
            }
            let err = FT_Render_Glyph(slot, render_mode_to_raw(mode));
            if err != 0 {
                return Err(RasterfontError::GlyphRasterization(format!(
                    "FT_Render_Glyph failed with code {err}"
                )));
            }
            let bitmap = (*slot).bitmap;
            let len = (bitmap.rows as usize) * (bitmap.pitch.unsigned_abs() as usize);
            let buffer = if bitmap.buffer.is_null() || len == 0 {
                Vec::new()
            } else {
                std::slice::from_raw_parts(bitmap.buffer, len).to_vec()
            };
            Ok(GlyphBitmap {
                mode: pixel_mode_from_raw(bitmap.pixel_mode),
                width: bitmap.width,
                height: bitmap.rows,
                pitch: bitmap.pitch,
                buffer,
                bitmap_left: (*slot).bitmap_left,
                bitmap_top: (*slot).bitmap_top,
                advance_x: (*slot).advance.x as f64 / 64.0,
                advance_y: (*slot).advance.y as f64 / 64.0,
            })
        }
    }

    fn kerning(&self, left_glyph: u32, right_glyph: u32) -> (f64, f64) {
        let mut vector = FT_Vector { x: 0, y: 0 };
        let err = unsafe {
            FT_Get_Kerning(
                self.face.as_ptr(),
                left_glyph as FT_UInt,
                right_glyph as FT_UInt,
                FT_Kerning_Mode_FT_KERNING_DEFAULT as FT_UInt,
                &mut vector,
            )
        };
        if err != 0 {
            return (0.0, 0.0);
        }
        (vector.x as f64 / 64.0, vector.y as f64 / 64.0)
    }

    fn metrics(&self) -> FaceMetricsRaw {
        unsafe {
            let rec = self.face.as_ref();
            let size_metrics = (*rec.size).metrics;
            let scale = 1.0 / 64.0;
            FaceMetricsRaw {
                ascent: size_metrics.ascender as f64 * scale,
                descent: -(size_metrics.descender as f64) * scale,
                height: size_metrics.height as f64 * scale,
                max_advance: size_metrics.max_advance as f64 * scale,
                underline_position: rec.underline_position as f64 / rec.units_per_EM.max(1) as f64
                    * size_metrics.y_ppem as f64,
                underline_thickness: rec.underline_thickness as f64 / rec.units_per_EM.max(1) as f64
                    * size_metrics.y_ppem as f64,
                strikeout_position: None,
                strikeout_thickness: None,
                y_ppem: size_metrics.y_ppem as u32,
            }
        }
    }

    fn font_table(&self, tag: [u8; 4]) -> Option<Vec<u8>> {
        let tag_u32 = u32::from_be_bytes(tag) as FT_ULong;
        let mut len: FT_ULong = 0;
        unsafe {
            let err = FT_Load_Sfnt_Table(self.face.as_ptr(), tag_u32, 0, ptr::null_mut(), &mut len);
            if err != 0 || len == 0 {
                return None;
            }
            let mut buf = vec![0u8; len as usize];
            let err = FT_Load_Sfnt_Table(self.face.as_ptr(), tag_u32, 0, buf.as_mut_ptr(), &mut len);
            if err != 0 {
                return None;
            }
            Some(buf)
        }
    }
}
