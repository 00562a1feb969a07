//! `Font`: the caller-facing handle , its construction via
//! the fallback-chain resolver (C3), and the reference-counted lifecycle
//! that ties into the process-wide font cache (C9).

use std::sync::Arc;

use parking_lot::Mutex;

use crate::backend::Backends;
use crate::cache::{Cache, CacheEntry, GlyphKey, GraphemeKey};
use crate::candidate::FallbackCandidate;
use crate::emoji::EmojiPresentation;
use crate::error::{RasterfontError, Result};
use crate::font_cache::{self, Reservation};
use crate::grapheme::PositionedGrapheme;
use crate::instance::Metrics;
use crate::precompose::{self, PrecomposeResult};

pub(crate) struct FontPrimary {
    pub(crate) candidates: Vec<FallbackCandidate>,
    pub(crate) emoji_presentation: EmojiPresentation,
    refcount: usize,
}

pub(crate) struct FontShared {
    key: u64,
    pub(crate) backends: Backends,
    pub(crate) glyph_cache: Cache<GlyphKey, CacheEntry<crate::glyph::RenderedGlyph>>,
    pub(crate) grapheme_cache: Cache<GraphemeKey, CacheEntry<PositionedGrapheme>>,
    pub(crate) primary: Mutex<FontPrimary>,
}

/// The caller-facing font handle : reference-counted,
/// shared via the process-wide font-object cache.
pub struct Font {
    pub(crate) inner: Arc<FontShared>,
}

/// Resolve a font-database candidate list into a fallback chain.
fn build_chain(backends: &Backends, names: &[String], attributes: &str) -> Result<Vec<FallbackCandidate>> {
    let first_name = names
        .first()
        .ok_or_else(|| RasterfontError::Configuration("font_from_name requires at least one name".into()))?;

    let mut first_name_candidates = backends
        .database
        .resolve(first_name, attributes)
        .map_err(|e| RasterfontError::Configuration(format!("database resolve failed for {first_name:?}: {e}")))?;
    if first_name_candidates.is_empty() {
        return Err(RasterfontError::Configuration(format!(
            "no font-database candidates for {first_name:?}"
        )));
    }

    // Step 4: top candidate of the first name is the primary, instantiated
    // eagerly; failure here is fatal to the whole construction.
    let primary_pattern = first_name_candidates.remove(0);
    let requested_pixel_size = primary_pattern.effective_pixel_size();
    let primary_instance =
        crate::instance::FontInstance::new(backends, &primary_pattern, requested_pixel_size).map_err(|e| {
            RasterfontError::Configuration(format!("primary candidate instantiation failed: {e}"))
        })?;

    let mut chain = vec![FallbackCandidate::new_live(
        primary_pattern,
        requested_pixel_size,
        primary_instance,
    )];

    // Step 5: each subsequent manual name contributes its top candidate,
    // lazily, ahead of the first name's database tail.
    for name in &names[1..] {
        if let Ok(mut candidates) = backends.database.resolve(name, attributes) {
            if !candidates.is_empty() {
                let pattern = candidates.remove(0);
                let size = pattern.effective_pixel_size();
                chain.push(FallbackCandidate::new(pattern, size));
            }
        }
    }

    // Step 6: database fallback tail of the first name, lazy.
    for pattern in first_name_candidates {
        let size = pattern.effective_pixel_size();
        chain.push(FallbackCandidate::new(pattern, size));
    }

    Ok(chain)
}

impl Font {
    /// `font_from_name` : resolve via the process-wide cache,
    /// building a fresh chain only if no reservation for this key exists
    /// yet.
    pub fn from_name(backends: Backends, names: &[&str], attributes: &str) -> Result<Font> {
        crate::lifecycle::log_version_once();
        let names: Vec<String> = names.iter().map(|s| (*s).to_string()).collect();
        let key = font_cache::cache_key(&names, attributes);
        match font_cache::reserve_or_wait(key) {
            Reservation::Existing(Some(font)) => Ok(font),
            Reservation::Existing(None) => Err(RasterfontError::Configuration(format!(
                "a prior construction for {names:?}/{attributes:?} already failed"
            ))),
            Reservation::Creator(handle) => {
                let outcome = build_chain(&backends, &names, attributes).map(|candidates| Font {
                    inner: Arc::new(FontShared {
                        key,
                        backends: backends.clone(),
                        glyph_cache: Cache::default(),
                        grapheme_cache: Cache::default(),
                        primary: Mutex::new(FontPrimary {
                            candidates,
                            emoji_presentation: EmojiPresentation::default(),
                            refcount: 1,
                        }),
                    }),
                });
                match outcome {
                    Ok(font) => match font_cache::publish(key, handle, Some(font)) {
                        Some(font) => Ok(font),
                        None => unreachable!("publish with Some(font) always yields a creator handle"),
                    },
                    Err(err) => {
                        font_cache::publish(key, handle, None);
                        Err(err)
                    },
                }
            },
        }
    }

    /// The public `clone` operation. Bumps the reference count.
    pub fn clone_handle(&self) -> Font {
        self.inner.primary.lock().refcount += 1;
        self.clone_for_cache_storage()
    }

    /// An uncounted `Arc` clone: used only by the font-cache module to keep
    /// a lookup copy in the `PublishedValid` slot, which is bookkeeping and
    /// not a caller-visible reference.
    pub(crate) fn clone_for_cache_storage(&self) -> Font {
        Font { inner: Arc::clone(&self.inner) }
    }

    /// A counted clone handed to a waiter woken by publication. The increment already happened in
    /// [`crate::font_cache::publish`]; this just shares the `Arc`.
    pub(crate) fn clone_for_caller(&self) -> Font {
        self.clone_for_cache_storage()
    }

    pub(crate) fn add_references(&mut self, n: usize) {
        if n > 0 {
            self.inner.primary.lock().refcount += n;
        }
    }

    /// The public `destroy` operation. Decrementing to zero evicts the
    /// slot from the process-wide font cache.
    pub fn destroy(self) {
        let reached_zero = {
            let mut primary = self.inner.primary.lock();
            primary.refcount -= 1;
            primary.refcount == 0
        };
        if reached_zero {
            font_cache::evict(self.inner.key);
        }
    }

    #[cfg(test)]
    pub(crate) fn refcount(&self) -> usize {
        self.inner.primary.lock().refcount
    }

    pub(crate) fn backends(&self) -> &Backends {
        &self.inner.backends
    }

    pub(crate) fn glyph_cache(&self) -> &Cache<GlyphKey, CacheEntry<crate::glyph::RenderedGlyph>> {
        &self.inner.glyph_cache
    }

    pub(crate) fn grapheme_cache(&self) -> &Cache<GraphemeKey, CacheEntry<PositionedGrapheme>> {
        &self.inner.grapheme_cache
    }

    pub(crate) fn primary(&self) -> &Mutex<FontPrimary> {
        &self.inner.primary
    }

    /// Metrics of the primary instance.
    pub fn metrics(&self) -> Metrics {
        let primary = self.inner.primary.lock();
        primary.candidates[0]
            .instance()
            .expect("the primary candidate is always instantiated eagerly and never pruned")
            .metrics
    }

    /// Mutates the field without clearing caches; affects only subsequent
    /// misses.
    pub fn set_emoji_presentation(&self, policy: EmojiPresentation) {
        self.inner.primary.lock().emoji_presentation = policy;
    }

    /// Kerning for a codepoint pair using the primary instance, scaled by
    /// the pixel-size fixup factor.
    pub fn kerning(&self, left: char, right: char) -> (f64, f64) {
        let primary = self.inner.primary.lock();
        let instance = primary.candidates[0]
            .instance()
            .expect("the primary candidate is always instantiated eagerly and never pruned");
        let (Some(left_glyph), Some(right_glyph)) =
            (instance.face.glyph_index(left), instance.face.glyph_index(right))
        else {
            return (0.0, 0.0);
        };
        let (kx, ky) = instance.face.kerning(left_glyph, right_glyph);
        (kx * instance.pixel_fixup, ky * instance.pixel_fixup)
    }

    /// Precompose query : uses the primary candidate's
    /// character set for the coverage flags.
    pub fn precompose(&self, base: char, combining: char) -> Option<PrecomposeResult> {
        let primary = self.inner.primary.lock();
        precompose::precompose(base, combining, &primary.candidates[0].charset)
    }

    /// Builds a new, independent font from this one's fallback chain with
    /// every candidate's point size shifted by `amount` points. Dead
    /// candidates are dropped rather than carried forward; the result is not
    /// registered in the process-wide font cache , a caller
    /// holding the same name/attributes would not get this font back from
    /// [`Font::from_name`].
    pub fn size_adjust(&self, amount: f64) -> Option<Font> {
        let primary = self.inner.primary.lock();
        let mut candidates = Vec::with_capacity(primary.candidates.len());
        for candidate in primary.candidates.iter() {
            if candidate.is_dead() {
                continue;
            }
            let mut pattern = candidate.pattern.clone();
            let size = pattern.point_size + amount;
            if size < 1.0 {
                continue;
            }
            pattern.point_size = size;
            pattern.pixel_size = 0.0;
            let pixel_size = pattern.effective_pixel_size();
            candidates.push(FallbackCandidate::new(pattern, pixel_size));
        }
        if candidates.is_empty() {
            return None;
        }
        if !candidates[0].ensure_instantiated(&self.inner.backends) {
            return None;
        }

        Some(Font {
            inner: Arc::new(FontShared {
                key: 0,
                backends: self.inner.backends.clone(),
                glyph_cache: Cache::default(),
                grapheme_cache: Cache::default(),
                primary: Mutex::new(FontPrimary {
                    candidates,
                    emoji_presentation: primary.emoji_presentation,
                    refcount: 1,
                }),
            }),
        })
    }
}
