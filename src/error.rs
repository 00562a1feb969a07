//! Error kinds for the rasterfont core.

use std::fmt;

/// The library-wide error type.
///
/// Only [`RasterfontError::Configuration`] is ever surfaced as `Err` from the
/// public API. The other variants describe conditions that are handled
/// internally (candidate pruning, negative cache entries, once-per-process
/// warnings) and exist mainly so that internal plumbing has a single type to
/// pass around and log.
#[derive(Debug, Clone)]
pub enum RasterfontError {
    /// The library was not initialized, the backend is unavailable, or a
    /// name resolved to zero font-database candidates. Fatal to the call.
    Configuration(String),
    /// A specific [`crate::candidate::FallbackCandidate`] could not be
    /// instantiated. Non-fatal: the candidate is pruned from the chain.
    Candidate(String),
    /// A specific codepoint/glyph index could not be loaded or rendered.
    /// Recorded as a negative cache entry.
    GlyphRasterization(String),
    /// Allocation failed in a hot path. The operation is aborted without
    /// partially filling any cache.
    Allocation,
    /// A requested feature is not supported by the current backend
    /// configuration (e.g. an SVG glyph with a non-identity transform).
    /// Logged at most once per process per distinct condition.
    UnsupportedFeature(String),
}

impl fmt::Display for RasterfontError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RasterfontError::Configuration(msg) => write!(f, "configuration error: {msg}"),
            RasterfontError::Candidate(msg) => write!(f, "candidate error: {msg}"),
            RasterfontError::GlyphRasterization(msg) => {
                write!(f, "glyph rasterization error: {msg}")
            },
            RasterfontError::Allocation => write!(f, "allocation failure"),
            RasterfontError::UnsupportedFeature(msg) => {
                write!(f, "unsupported feature: {msg}")
            },
        }
    }
}

impl std::error::Error for RasterfontError {}

pub type Result<T> = std::result::Result<T, RasterfontError>;
