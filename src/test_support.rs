//! In-memory backend mocks shared by crate-internal unit tests (`#[cfg(test)]`
//! modules in `font.rs`, `glyph.rs`, `grapheme.rs`, `textrun.rs`). The
//! `tests/` integration suite has its own, independently-written mocks
//! (`tests/mocks.rs`) since integration tests only see the public API.

#![cfg(test)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use smallvec::SmallVec;
use unicode_script::Script;

use crate::backend::{
    Backends, FontDatabase, GlyphBitmap, HintTarget, LcdFilter as BackendLcdFilter, LoadFlags,
    PixelMode, RasterFace, Rasterizer, RenderMode, Shaper, ShaperInstance, ShapedGlyph,
    UnicodeSegmentationSegmenter,
};
use crate::error::{RasterfontError, Result};
use crate::pattern::{CharSet, HintStyle, LangSet, LcdFilter, OpenTypeFeature, Pattern, SubpixelMode};

struct MockFace {
    glyphs: HashMap<char, u32>,
    loaded: Mutex<Option<u32>>,
    color: bool,
}

impl RasterFace for MockFace {
    fn is_scalable(&self) -> bool {
        true
    }

    fn is_color(&self) -> bool {
        self.color
    }

    fn has_fixed_sizes(&self) -> bool {
        self.color
    }

    fn glyph_index(&self, codepoint: char) -> Option<u32> {
        self.glyphs.get(&codepoint).copied()
    }

    fn set_pixel_size(&self, _size: f64) -> Result<()> {
        Ok(())
    }

    fn set_transform(&self, _matrix: [[f64; 2]; 2]) {}

    fn load_glyph(&self, glyph_index: u32, _flags: LoadFlags) -> Result<()> {
        *self.loaded.lock() = Some(glyph_index);
        Ok(())
    }

    fn embolden_loaded_glyph(&self) {}

    fn render_loaded_glyph(&self, _mode: RenderMode) -> Result<GlyphBitmap> {
        let idx = (*self.loaded.lock())
            .ok_or_else(|| RasterfontError::GlyphRasterization("render called before load".into()))?;
        if idx == 0 {
            return Err(RasterfontError::GlyphRasterization("glyph index 0 (notdef)".into()));
        }
        let size: u32 = if self.color { 16 } else { 8 };
        if self.color {
            let mode = PixelMode::Bgra;
            let buffer = vec![0x80u8; (size * size * 4) as usize];
            Ok(GlyphBitmap {
                mode,
                width: size,
                height: size,
                pitch: (size * 4) as i32,
                buffer,
                bitmap_left: 0,
                bitmap_top: size as i32,
                advance_x: size as f64,
                advance_y: 0.0,
            })
        } else {
            let buffer = vec![0xFFu8; (size * size) as usize];
            Ok(GlyphBitmap {
                mode: PixelMode::Gray,
                width: size,
                height: size,
                pitch: size as i32,
                buffer,
                bitmap_left: 0,
                bitmap_top: size as i32,
                advance_x: size as f64,
                advance_y: 0.0,
            })
        }
    }

    fn kerning(&self, left_glyph: u32, right_glyph: u32) -> (f64, f64) {
        if left_glyph != 0 && right_glyph != 0 {
            (-1.0, 0.0)
        } else {
            (0.0, 0.0)
        }
    }

    fn font_table(&self, _tag: [u8; 4]) -> Option<Vec<u8>> {
        None
    }

    fn metrics(&self) -> crate::backend::FaceMetricsRaw {
        crate::backend::FaceMetricsRaw {
            ascent: 8.0,
            descent: 2.0,
            height: 10.0,
            max_advance: 8.0,
            underline_position: -1.0,
            underline_thickness: 0.5,
            strikeout_position: None,
            strikeout_thickness: None,
            y_ppem: if self.color { 16 } else { 8 },
        }
    }
}

pub(crate) struct MockRasterizer {
    pub(crate) glyphs: HashMap<char, u32>,
    pub(crate) color: bool,
}

impl Rasterizer for MockRasterizer {
    fn open_face(&self, _path: &Path, _face_index: i32) -> Result<Box<dyn RasterFace>> {
        Ok(Box::new(MockFace {
            glyphs: self.glyphs.clone(),
            loaded: Mutex::new(None),
            color: self.color,
        }))
    }

    fn supports_lcd_filter(&self) -> bool {
        true
    }

    fn set_lcd_filter(&self, _filter: BackendLcdFilter) -> bool {
        true
    }
}

pub(crate) struct MockShaper {
    pub(crate) glyphs: Arc<HashMap<char, u32>>,
}

impl Shaper for MockShaper {
    fn create_instance(&self, _face: &dyn RasterFace, _point_size: f64) -> Box<dyn ShaperInstance> {
        Box::new(MockShaperInstance { glyphs: self.glyphs.clone() })
    }
}

struct MockShaperInstance {
    glyphs: Arc<HashMap<char, u32>>,
}

impl ShaperInstance for MockShaperInstance {
    fn shape(
        &self,
        text: &str,
        _rtl: bool,
        _script: Script,
        _features: &[OpenTypeFeature],
    ) -> Vec<ShapedGlyph> {
        if text.chars().any(|c| c == '\u{200D}') {
            // A ZWJ sequence shapes to a single merged glyph.
            let gid = text.chars().find_map(|c| self.glyphs.get(&c).copied()).unwrap_or(1);
            return vec![ShapedGlyph {
                glyph_id: gid,
                cluster: 0,
                x_advance: 16.0,
                y_advance: 0.0,
                x_offset: 0.0,
                y_offset: 0.0,
            }];
        }
        text.char_indices()
            .filter(|(_, c)| *c != '\u{FE0F}' && *c != '\u{FE0E}')
            .map(|(i, c)| ShapedGlyph {
                glyph_id: self.glyphs.get(&c).copied().unwrap_or(0),
                cluster: i as u32,
                x_advance: 8.0,
                y_advance: 0.0,
                x_offset: 0.0,
                y_offset: 0.0,
            })
            .collect()
    }

    fn guess_script(&self, _text: &str) -> Script {
        Script::Latin
    }
}

pub(crate) struct MockDatabase;

fn ascii_pattern() -> Pattern {
    let codepoints: Vec<u32> = (0x20u32..=0x7E).collect();
    Pattern {
        family_name: "serif".into(),
        file_path: "/mock/serif.ttf".into(),
        face_index: 0,
        point_size: 12.0,
        pixel_size: 0.0,
        dpi: 96.0,
        hinting: true,
        hint_style: HintStyle::Medium,
        antialias: true,
        rgba: SubpixelMode::None,
        lcd_filter: LcdFilter::Default,
        embedded_bitmap: true,
        autohint: false,
        embolden: false,
        matrix: None,
        features: SmallVec::new(),
        color: false,
        outline: true,
        scalable: true,
        charset: CharSet::from_codepoints(codepoints),
        langset: LangSet::default(),
        pixel_fixup: None,
    }
}

fn emoji_pattern() -> Pattern {
    let mut codepoints: Vec<u32> = vec![0x1F91A, 0x1F3FF, 0x1F600, 0xFE0F, 0xFE0E];
    codepoints.sort_unstable();
    Pattern {
        family_name: "emoji".into(),
        file_path: "/mock/emoji.ttf".into(),
        face_index: 0,
        point_size: 12.0,
        pixel_size: 0.0,
        dpi: 96.0,
        hinting: true,
        hint_style: HintStyle::Medium,
        antialias: true,
        rgba: SubpixelMode::None,
        lcd_filter: LcdFilter::None,
        embedded_bitmap: true,
        autohint: false,
        embolden: false,
        matrix: None,
        features: SmallVec::new(),
        color: true,
        outline: false,
        scalable: true,
        charset: CharSet::from_codepoints(codepoints),
        langset: LangSet::from_tags([crate::pattern::EMOJI_LANGUAGE_TAG.to_string()]),
        pixel_fixup: None,
    }
}

impl FontDatabase for MockDatabase {
    fn resolve(&self, name: &str, _attributes: &str) -> Result<Vec<Pattern>> {
        match name {
            "serif" => Ok(vec![ascii_pattern()]),
            "emoji" => Ok(vec![emoji_pattern()]),
            _ => Ok(vec![]),
        }
    }
}

fn glyph_table_for(pattern: &Pattern) -> HashMap<char, u32> {
    let mut table = HashMap::new();
    let mut next_gid = 1u32;
    for cp in 0x20u32..=0x10FFFFu32 {
        let Some(c) = char::from_u32(cp) else { continue };
        if pattern.charset.contains(c) {
            table.insert(c, next_gid);
            next_gid += 1;
        }
    }
    table
}

pub(crate) fn mock_backends_serif_only() -> Backends {
    let pattern = ascii_pattern();
    let glyphs = glyph_table_for(&pattern);
    Backends {
        database: Arc::new(MockDatabase),
        rasterizer: Arc::new(MockRasterizer { glyphs: glyphs.clone(), color: false }),
        shaper: Arc::new(MockShaper { glyphs: Arc::new(glyphs) }),
        segmenter: Arc::new(UnicodeSegmentationSegmenter),
    }
}

pub(crate) fn mock_backends_emoji_only() -> Backends {
    let pattern = emoji_pattern();
    let glyphs = glyph_table_for(&pattern);
    Backends {
        database: Arc::new(MockDatabase),
        rasterizer: Arc::new(MockRasterizer { glyphs: glyphs.clone(), color: true }),
        shaper: Arc::new(MockShaper { glyphs: Arc::new(glyphs) }),
        segmenter: Arc::new(UnicodeSegmentationSegmenter),
    }
}

/// `Rasterizer`/`Shaper` that can answer for *either* mock family, keyed by
/// `file_path`, for tests that span both a text font and an emoji font in
/// one fallback chain.
pub(crate) struct MultiRasterizer;

impl Rasterizer for MultiRasterizer {
    fn open_face(&self, path: &Path, face_index: i32) -> Result<Box<dyn RasterFace>> {
        if path == Path::new("/mock/emoji.ttf") {
            MockRasterizer { glyphs: glyph_table_for(&emoji_pattern()), color: true }.open_face(path, face_index)
        } else {
            MockRasterizer { glyphs: glyph_table_for(&ascii_pattern()), color: false }.open_face(path, face_index)
        }
    }

    fn supports_lcd_filter(&self) -> bool {
        true
    }

    fn set_lcd_filter(&self, _filter: BackendLcdFilter) -> bool {
        true
    }
}

pub(crate) struct MultiShaper;

impl Shaper for MultiShaper {
    fn create_instance(&self, face: &dyn RasterFace, _point_size: f64) -> Box<dyn ShaperInstance> {
        let glyphs = if face.is_color() {
            glyph_table_for(&emoji_pattern())
        } else {
            glyph_table_for(&ascii_pattern())
        };
        Box::new(MockShaperInstance { glyphs: Arc::new(glyphs) })
    }
}

pub(crate) fn mock_backends_serif_and_emoji() -> Backends {
    Backends {
        database: Arc::new(MockDatabase),
        rasterizer: Arc::new(MultiRasterizer),
        shaper: Arc::new(MultiShaper),
        segmenter: Arc::new(UnicodeSegmentationSegmenter),
    }
}

pub(crate) fn mock_backends_fallback_pruning() -> Backends {
    struct PruningDatabase;
    impl FontDatabase for PruningDatabase {
        fn resolve(&self, name: &str, attributes: &str) -> Result<Vec<Pattern>> {
            if name == "does-not-exist-XYZ" {
                let mut pattern = ascii_pattern();
                pattern.file_path = "/mock/missing.ttf".into();
                return Ok(vec![pattern]);
            }
            MockDatabase.resolve(name, attributes)
        }
    }
    struct PruningRasterizer;
    impl Rasterizer for PruningRasterizer {
        fn open_face(&self, path: &Path, face_index: i32) -> Result<Box<dyn RasterFace>> {
            if path == Path::new("/mock/missing.ttf") {
                return Err(RasterfontError::Candidate("simulated missing font file".into()));
            }
            MockRasterizer { glyphs: glyph_table_for(&ascii_pattern()), color: false }.open_face(path, face_index)
        }
        fn supports_lcd_filter(&self) -> bool {
            true
        }
        fn set_lcd_filter(&self, _filter: BackendLcdFilter) -> bool {
            true
        }
    }
    Backends {
        database: Arc::new(PruningDatabase),
        rasterizer: Arc::new(PruningRasterizer),
        shaper: Arc::new(MockShaper { glyphs: Arc::new(glyph_table_for(&ascii_pattern())) }),
        segmenter: Arc::new(UnicodeSegmentationSegmenter),
    }
}

#[allow(dead_code)]
pub(crate) fn unused_hint_target_marker() -> HintTarget {
    HintTarget::Normal
}
