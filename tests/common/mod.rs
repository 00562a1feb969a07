//! Mock `FontDatabase`/`Rasterizer`/`Shaper` implementations for the
//! integration suite, standing in for on-disk test fonts. Independently
//! written from `src/test_support.rs` since integration tests only see the
//! public API, not crate-internal items.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use rasterfont::{
    Backends, CharSet, FaceMetricsRaw, FontDatabase, GlyphBitmap, HintStyle, LangSet, LcdFilter,
    LoadFlags, OpenTypeFeature, Pattern, PixelMode, RasterFace, Rasterizer, RenderMode, Shaper,
    ShaperInstance, ShapedGlyph, SubpixelMode, UnicodeSegmentationSegmenter, EMOJI_LANGUAGE_TAG,
};
use unicode_script::Script;

pub struct MockFace {
    glyphs: HashMap<char, u32>,
    loaded: Mutex<Option<u32>>,
    color: bool,
    raster_calls: Arc<AtomicUsize>,
    /// When set, `render_loaded_glyph` emits a hard vertical two-tone edge
    /// (opaque left half, transparent right half) instead of the uniform
    /// fill every other mock glyph uses, so a scaling filter's behavior at a
    /// hard edge is actually observable in an integration test.
    step_edge: bool,
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

    fn set_pixel_size(&self, _size: f64) -> rasterfont::Result<()> {
        Ok(())
    }

    fn set_transform(&self, _matrix: [[f64; 2]; 2]) {}

    fn load_glyph(&self, glyph_index: u32, _flags: LoadFlags) -> rasterfont::Result<()> {
        *self.loaded.lock().unwrap() = Some(glyph_index);
        Ok(())
    }

    fn embolden_loaded_glyph(&self) {}

    fn render_loaded_glyph(&self, _mode: RenderMode) -> rasterfont::Result<GlyphBitmap> {
        self.raster_calls.fetch_add(1, Ordering::SeqCst);
        let idx = self.loaded.lock().unwrap().ok_or_else(|| {
            rasterfont::RasterfontError::GlyphRasterization("render called before load".into())
        })?;
        if idx == 0 {
            return Err(rasterfont::RasterfontError::GlyphRasterization("notdef".into()));
        }
        let size: u32 = if self.color { 16 } else { 8 };
        let (mode, channels) = if self.color { (PixelMode::Bgra, 4) } else { (PixelMode::Gray, 1) };
        let buffer = if self.step_edge && self.color {
            let mut buf = vec![0u8; (size * size * channels) as usize];
            for y in 0..size {
                for x in 0..size {
                    let i = ((y * size + x) * channels) as usize;
                    if x < size / 2 {
                        buf[i..i + 4].copy_from_slice(&[200, 100, 50, 255]);
                    }
                }
            }
            buf
        } else {
            vec![0x80u8; (size * size * channels) as usize]
        };
        Ok(GlyphBitmap {
            mode,
            width: size,
            height: size,
            pitch: (size * channels) as i32,
            buffer,
            bitmap_left: 0,
            bitmap_top: size as i32,
            advance_x: size as f64,
            advance_y: 0.0,
        })
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

    fn metrics(&self) -> FaceMetricsRaw {
        FaceMetricsRaw {
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

pub struct MockRasterizer {
    pub glyphs: HashMap<char, u32>,
    pub color: bool,
    /// Exposed so the concurrency test can assert exactly one raster call
    /// reached the backend.
    pub raster_calls: Arc<AtomicUsize>,
    step_edge: bool,
}

impl MockRasterizer {
    pub fn new(glyphs: HashMap<char, u32>, color: bool) -> Self {
        MockRasterizer { glyphs, color, raster_calls: Arc::new(AtomicUsize::new(0)), step_edge: false }
    }

    pub fn new_step_edge(glyphs: HashMap<char, u32>) -> Self {
        MockRasterizer { glyphs, color: true, raster_calls: Arc::new(AtomicUsize::new(0)), step_edge: true }
    }
}

impl Rasterizer for MockRasterizer {
    fn open_face(&self, _path: &Path, _face_index: i32) -> rasterfont::Result<Box<dyn RasterFace>> {
        Ok(Box::new(MockFace {
            glyphs: self.glyphs.clone(),
            loaded: Mutex::new(None),
            color: self.color,
            raster_calls: Arc::clone(&self.raster_calls),
            step_edge: self.step_edge,
        }))
    }

    fn supports_lcd_filter(&self) -> bool {
        true
    }

    fn set_lcd_filter(&self, _filter: LcdFilter) -> bool {
        true
    }
}

pub struct MockShaper {
    pub glyphs: Arc<HashMap<char, u32>>,
}

impl Shaper for MockShaper {
    fn create_instance(&self, _face: &dyn RasterFace, _point_size: f64) -> Box<dyn ShaperInstance> {
        Box::new(MockShaperInstance { glyphs: Arc::clone(&self.glyphs) })
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

fn base_pattern(family: &str, file_path: &str) -> Pattern {
    Pattern {
        family_name: family.into(),
        file_path: file_path.into(),
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
        features: Default::default(),
        color: false,
        outline: true,
        scalable: true,
        charset: CharSet::default(),
        langset: LangSet::default(),
        pixel_fixup: None,
    }
}

pub fn ascii_pattern() -> Pattern {
    let mut p = base_pattern("serif", "/mock/serif.ttf");
    p.charset = CharSet::from_codepoints((0x20u32..=0x7E).collect());
    p
}

pub fn emoji_pattern() -> Pattern {
    let mut p = base_pattern("emoji", "/mock/emoji.ttf");
    let mut codepoints = vec![0x1F91A, 0x1F3FF, 0x1F600, 0xFE0F, 0xFE0E];
    codepoints.sort_unstable();
    p.charset = CharSet::from_codepoints(codepoints);
    p.color = true;
    p.outline = false;
    p.lcd_filter = LcdFilter::None;
    p.langset = LangSet::from_tags([EMOJI_LANGUAGE_TAG.to_string()]);
    p
}

pub fn glyph_table_for(pattern: &Pattern) -> HashMap<char, u32> {
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

pub struct MockDatabase;

impl FontDatabase for MockDatabase {
    fn resolve(&self, name: &str, _attributes: &str) -> rasterfont::Result<Vec<Pattern>> {
        match name {
            "serif" => Ok(vec![ascii_pattern()]),
            "emoji" => Ok(vec![emoji_pattern()]),
            _ => Ok(vec![]),
        }
    }
}

/// A counting backend handle, returned alongside `Backends` so a test can
/// assert exactly one raster call reached the backend.
pub struct CountingBackends {
    pub backends: Backends,
    pub raster_calls: Arc<AtomicUsize>,
}

pub fn serif_only() -> CountingBackends {
    let pattern = ascii_pattern();
    let glyphs = glyph_table_for(&pattern);
    let rasterizer = MockRasterizer::new(glyphs.clone(), false);
    let raster_calls = Arc::clone(&rasterizer.raster_calls);
    CountingBackends {
        backends: Backends {
            database: Arc::new(MockDatabase),
            rasterizer: Arc::new(rasterizer),
            shaper: Arc::new(MockShaper { glyphs: Arc::new(glyphs) }),
            segmenter: Arc::new(UnicodeSegmentationSegmenter),
        },
        raster_calls,
    }
}

pub fn emoji_only() -> Backends {
    let pattern = emoji_pattern();
    let glyphs = glyph_table_for(&pattern);
    Backends {
        database: Arc::new(MockDatabase),
        rasterizer: Arc::new(MockRasterizer::new(glyphs.clone(), true)),
        shaper: Arc::new(MockShaper { glyphs: Arc::new(glyphs) }),
        segmenter: Arc::new(UnicodeSegmentationSegmenter),
    }
}

struct StepEdgeDatabase(Pattern);

impl FontDatabase for StepEdgeDatabase {
    fn resolve(&self, _name: &str, _attributes: &str) -> rasterfont::Result<Vec<Pattern>> {
        Ok(vec![self.0.clone()])
    }
}

/// A color font backend whose rendered glyph is a hard vertical two-tone
/// edge with an explicit, large `pixel_fixup`, so scaling-filter tests
/// actually exercise `scaling::resample` instead of the `fixup == 1.0`
/// passthrough the other mock patterns hit.
pub fn emoji_step_edge() -> Backends {
    let mut pattern = emoji_pattern();
    pattern.pixel_fixup = Some(3.0);
    let glyphs = glyph_table_for(&pattern);
    Backends {
        database: Arc::new(StepEdgeDatabase(pattern)),
        rasterizer: Arc::new(MockRasterizer::new_step_edge(glyphs.clone())),
        shaper: Arc::new(MockShaper { glyphs: Arc::new(glyphs) }),
        segmenter: Arc::new(UnicodeSegmentationSegmenter),
    }
}

struct PruningDatabase;

impl FontDatabase for PruningDatabase {
    fn resolve(&self, name: &str, attributes: &str) -> rasterfont::Result<Vec<Pattern>> {
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
    fn open_face(&self, path: &Path, face_index: i32) -> rasterfont::Result<Box<dyn RasterFace>> {
        if path == Path::new("/mock/missing.ttf") {
            return Err(rasterfont::RasterfontError::Candidate("simulated missing font file".into()));
        }
        MockRasterizer::new(glyph_table_for(&ascii_pattern()), false).open_face(path, face_index)
    }

    fn supports_lcd_filter(&self) -> bool {
        true
    }

    fn set_lcd_filter(&self, _filter: LcdFilter) -> bool {
        true
    }
}

pub fn fallback_pruning() -> Backends {
    Backends {
        database: Arc::new(PruningDatabase),
        rasterizer: Arc::new(PruningRasterizer),
        shaper: Arc::new(MockShaper { glyphs: Arc::new(glyph_table_for(&ascii_pattern())) }),
        segmenter: Arc::new(UnicodeSegmentationSegmenter),
    }
}
