//! fontconfig-backed [`FontDatabase`] :
//! `FcNameParse` -> `FcConfigSubstitute` -> `FcDefaultSubstitute` ->
//! `FcFontSort` -> `FcFontRenderPrepare`, materialized into plain
//! [`Pattern`] values so nothing downstream touches an `FcPattern*`.

use std::ffi::{CStr, CString};
use std::path::PathBuf;
use std::ptr;
use std::sync::OnceLock;

use fontconfig_sys::*;
use parking_lot::Mutex;
use smallvec::SmallVec;

use crate::backend::FontDatabase;
use crate::error::{RasterfontError, Result};
use crate::pattern::{CharSet, HintStyle, LangSet, LcdFilter, Pattern, SubpixelMode};

static CONFIG: OnceLock<Mutex<*mut FcConfig>> = OnceLock::new();

fn config() -> &'static Mutex<*mut FcConfig> {
    CONFIG.get_or_init(|| {
        let cfg = unsafe { FcInitLoadConfigAndFonts() };
        Mutex::new(cfg)
    })
}

unsafe impl Send for FontconfigDatabase {}
unsafe impl Sync for FontconfigDatabase {}

pub struct FontconfigDatabase;

impl FontconfigDatabase {
    pub fn new() -> Self {
        let _ = config();
        FontconfigDatabase
    }
}

impl Default for FontconfigDatabase {
    fn default() -> Self {
        Self::new()
    }
}

// fontconfig's `FC_*` object names as `&CStr` literals, defined locally
// rather than trusting `fontconfig_sys`'s bindgen representation of the
// `#define FC_FAMILY "family"`-style header constants (which varies by
// bindgen version between `&str`, `&[u8]`, and `&CStr`).
const OBJ_FILE: &CStr = c"file";
const OBJ_FAMILY: &CStr = c"family";
const OBJ_INDEX: &CStr = c"index";
const OBJ_SIZE: &CStr = c"size";
const OBJ_PIXEL_SIZE: &CStr = c"pixelsize";
const OBJ_DPI: &CStr = c"dpi";
const OBJ_HINTING: &CStr = c"hinting";
const OBJ_HINT_STYLE: &CStr = c"hintstyle";
const OBJ_ANTIALIAS: &CStr = c"antialias";
const OBJ_RGBA: &CStr = c"rgba";
const OBJ_LCD_FILTER: &CStr = c"lcdfilter";
const OBJ_EMBEDDED_BITMAP: &CStr = c"embeddedbitmap";
const OBJ_AUTOHINT: &CStr = c"autohint";
const OBJ_EMBOLDEN: &CStr = c"embolden";
const OBJ_MATRIX: &CStr = c"matrix";
const OBJ_COLOR: &CStr = c"color";
const OBJ_OUTLINE: &CStr = c"outline";
const OBJ_SCALABLE: &CStr = c"scalable";
const OBJ_CHARSET: &CStr = c"charset";
const OBJ_LANG: &CStr = c"lang";

fn get_string(pattern: *mut FcPattern, object: &CStr) -> Option<String> {
    unsafe {
        let mut value: *mut FcChar8 = ptr::null_mut();
        let result = FcPatternGetString(pattern, object.as_ptr(), 0, &mut value);
        if result != FcResultMatch || value.is_null() {
            return None;
        }
        Some(CStr::from_ptr(value as *const _).to_string_lossy().into_owned())
    }
}

fn get_double(pattern: *mut FcPattern, object: &CStr, default: f64) -> f64 {
    unsafe {
        let mut value: f64 = 0.0;
        if FcPatternGetDouble(pattern, object.as_ptr(), 0, &mut value) == FcResultMatch {
            value
        } else {
            default
        }
    }
}

fn get_int(pattern: *mut FcPattern, object: &CStr, default: i32) -> i32 {
    unsafe {
        let mut value: std::os::raw::c_int = 0;
        if FcPatternGetInteger(pattern, object.as_ptr(), 0, &mut value) == FcResultMatch {
            value as i32
        } else {
            default
        }
    }
}

fn get_bool(pattern: *mut FcPattern, object: &CStr, default: bool) -> bool {
    unsafe {
        let mut value: FcBool = 0;
        if FcPatternGetBool(pattern, object.as_ptr(), 0, &mut value) == FcResultMatch {
            value != 0
        } else {
            default
        }
    }
}

fn get_matrix(pattern: *mut FcPattern, object: &CStr) -> Option<[[f64; 2]; 2]> {
    unsafe {
        let mut value: *mut FcMatrix = ptr::null_mut();
        if FcPatternGetMatrix(pattern, object.as_ptr(), 0, &mut value) != FcResultMatch || value.is_null() {
            return None;
        }
        let m = *value;
        Some([[m.xx, m.xy], [m.yx, m.yy]])
    }
}

/// Walk an `FcCharSet`'s 256-codepoint pages into a [`CharSet`].
fn extract_charset(pattern: *mut FcPattern) -> CharSet {
    unsafe {
        let mut fcset: *mut FcCharSet = ptr::null_mut();
        if FcPatternGetCharSet(pattern, OBJ_CHARSET.as_ptr(), 0, &mut fcset) != FcResultMatch
            || fcset.is_null()
        {
            return CharSet::default();
        }
        let mut codepoints = Vec::new();
        let mut map = [0u32; 8]; // FC_CHARSET_MAP_SIZE
        let mut next = FcCharSetFirstPage(fcset, map.as_mut_ptr(), ptr::null_mut());
        loop {
            if next == FC_CHARSET_DONE {
                break;
            }
            for (word_idx, &word) in map.iter().enumerate() {
                for bit in 0..32u32 {
                    if word & (1 << bit) != 0 {
                        codepoints.push(next + (word_idx as u32) * 32 + bit);
                    }
                }
            }
            let mut base = next;
            next = FcCharSetNextPage(fcset, map.as_mut_ptr(), &mut base);
        }
        CharSet::from_codepoints(codepoints)
    }
}

fn extract_langset(pattern: *mut FcPattern) -> LangSet {
    unsafe {
        let mut fcls: *mut FcLangSet = ptr::null_mut();
        if FcPatternGetLangSet(pattern, OBJ_LANG.as_ptr(), 0, &mut fcls) != FcResultMatch
            || fcls.is_null()
        {
            return LangSet::default();
        }
        let strs = FcLangSetGetLangs(fcls);
        if strs.is_null() {
            return LangSet::default();
        }
        let list = FcStrListCreate(strs);
        let mut tags = Vec::new();
        loop {
            let s = FcStrListNext(list);
            if s.is_null() {
                break;
            }
            tags.push(CStr::from_ptr(s as *const _).to_string_lossy().into_owned());
        }
        FcStrListDone(list);
        FcStrSetDestroy(strs);
        LangSet::from_tags(tags)
    }
}

fn subpixel_from_rgba(rgba: i32) -> SubpixelMode {
    match rgba {
        x if x == FC_RGBA_RGB as i32 => SubpixelMode::HorizontalRgb,
        x if x == FC_RGBA_BGR as i32 => SubpixelMode::HorizontalBgr,
        x if x == FC_RGBA_VRGB as i32 => SubpixelMode::VerticalRgb,
        x if x == FC_RGBA_VBGR as i32 => SubpixelMode::VerticalBgr,
        x if x == FC_RGBA_NONE as i32 => SubpixelMode::None,
        _ => SubpixelMode::Default,
    }
}

fn hint_style_from_raw(style: i32) -> HintStyle {
    match style {
        x if x == FC_HINT_SLIGHT as i32 => HintStyle::Slight,
        x if x == FC_HINT_MEDIUM as i32 => HintStyle::Medium,
        x if x == FC_HINT_FULL as i32 => HintStyle::Full,
        _ => HintStyle::None,
    }
}

fn lcd_filter_from_raw(filter: i32) -> LcdFilter {
    match filter {
        x if x == FC_LCD_DEFAULT as i32 => LcdFilter::Default,
        x if x == FC_LCD_LIGHT as i32 => LcdFilter::Light,
        x if x == FC_LCD_LEGACY as i32 => LcdFilter::Legacy,
        _ => LcdFilter::None,
    }
}

/// Materialize one render-prepared `FcPattern*` into a [`Pattern`]; this
/// runs after `FcFontRenderPrepare`.
fn materialize(pattern: *mut FcPattern) -> Option<Pattern> {
    let file_path = get_string(pattern, OBJ_FILE)?;
    let family_name = get_string(pattern, OBJ_FAMILY).unwrap_or_default();
    Some(Pattern {
        family_name,
        file_path: PathBuf::from(file_path),
        face_index: get_int(pattern, OBJ_INDEX, 0),
        point_size: get_double(pattern, OBJ_SIZE, 0.0),
        pixel_size: get_double(pattern, OBJ_PIXEL_SIZE, 0.0),
        dpi: get_double(pattern, OBJ_DPI, 75.0),
        hinting: get_bool(pattern, OBJ_HINTING, true),
        hint_style: hint_style_from_raw(get_int(pattern, OBJ_HINT_STYLE, FC_HINT_FULL as i32)),
        antialias: get_bool(pattern, OBJ_ANTIALIAS, true),
        rgba: subpixel_from_rgba(get_int(pattern, OBJ_RGBA, FC_RGBA_UNKNOWN as i32)),
        lcd_filter: lcd_filter_from_raw(get_int(pattern, OBJ_LCD_FILTER, FC_LCD_DEFAULT as i32)),
        embedded_bitmap: get_bool(pattern, OBJ_EMBEDDED_BITMAP, true),
        autohint: get_bool(pattern, OBJ_AUTOHINT, false),
        embolden: get_bool(pattern, OBJ_EMBOLDEN, false),
        matrix: get_matrix(pattern, OBJ_MATRIX),
        features: SmallVec::new(),
        color: get_bool(pattern, OBJ_COLOR, false),
        outline: get_bool(pattern, OBJ_OUTLINE, true),
        scalable: get_bool(pattern, OBJ_SCALABLE, true),
        charset: extract_charset(pattern),
        langset: extract_langset(pattern),
        pixel_fixup: None,
    })
}

impl FontDatabase for FontconfigDatabase {
    fn resolve(&self, name: &str, attributes: &str) -> Result<Vec<Pattern>> {
        let name_str = if attributes.is_empty() { name.to_string() } else { format!("{name}:{attributes}") };
        let c_name = CString::new(name_str)
            .map_err(|e| RasterfontError::Configuration(format!("invalid font name/attributes: {e}")))?;

        let cfg = *config().lock();
        if cfg.is_null() {
            return Err(RasterfontError::Configuration("fontconfig failed to initialize".into()));
        }

        unsafe {
            let pattern = FcNameParse(c_name.as_ptr() as *const FcChar8);
            if pattern.is_null() {
                return Err(RasterfontError::Configuration(format!("FcNameParse failed for {name_str:?}")));
            }
            FcConfigSubstitute(cfg, pattern, FcMatchKind_FcMatchPattern);
            FcDefaultSubstitute(pattern);

            let mut fc_result: FcResult = FcResultMatch;
            let font_set = FcFontSort(cfg, pattern, 1, ptr::null_mut(), &mut fc_result);
            if font_set.is_null() {
                FcPatternDestroy(pattern);
                return Ok(Vec::new());
            }

            let set = &*font_set;
            let mut out = Vec::with_capacity(set.nfont as usize);
            for i in 0..set.nfont {
                let candidate = *set.fonts.offset(i as isize);
                let prepared = FcFontRenderPrepare(cfg, pattern, candidate);
                if prepared.is_null() {
                    continue;
                }
                if let Some(p) = materialize(prepared) {
                    out.push(p);
                }
                FcPatternDestroy(prepared);
            }

            FcFontSetDestroy(font_set);
            FcPatternDestroy(pattern);
            Ok(out)
        }
    }
}

