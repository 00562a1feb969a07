//! Library lifecycle (C12): backend init/shutdown, logging configuration,
//! capability reporting, and the once-per-process version banner.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::OnceLock;

use bitflags::bitflags;
use log::LevelFilter;

use crate::error::{RasterfontError, Result};
use crate::font_cache;

bitflags! {
    /// Compile-time feature availability.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct Capabilities: u32 {
        const GRAPHEME_SHAPING = 0b001;
        const TEXT_RUN_SHAPING = 0b010;
        const SVG = 0b100;
    }
}

static INITIALIZED: AtomicBool = AtomicBool::new(false);
static VERSION_LOGGED: OnceLock<()> = OnceLock::new();

/// `init(log_colorize, use_syslog, log_level)`. Idempotent for
/// logging configuration; the backend-setup half returns
/// `ConfigurationError::AlreadyInitialized` (modeled here as
/// [`RasterfontError::Configuration`]) on a second call.
pub fn init(log_colorize: bool, use_syslog: bool, log_level: LevelFilter) -> Result<()> {
    configure_logging(log_colorize, use_syslog, log_level);

    if INITIALIZED.swap(true, Ordering::SeqCst) {
        return Err(RasterfontError::Configuration("already initialized".into()));
    }

    // Global backend state (the FreeType library handle, fontconfig's
    // global config) is lazily established by the platform backends on
    // first use rather than here; `init` only flips the idempotency flag
    // and applies logging, matching a library that has no mandatory
    // eager-init backend call of its own.
    Ok(())
}

fn configure_logging(log_colorize: bool, use_syslog: bool, log_level: LevelFilter) {
    log::set_max_level(log_level);
    if use_syslog {
        log::warn!("syslog logging was requested but this build has no syslog backend wired in; falling back to the default logger");
    }
    let _ = log_colorize; // only meaningful to a formatter this crate does not install itself.
}

/// `shutdown()` : drains the process-wide font cache regardless
/// of reference count, then marks the library uninitialized.
pub fn shutdown() {
    font_cache::drain_all();
    INITIALIZED.store(false, Ordering::SeqCst);
}

pub use crate::scaling::{set_scaling_filter, ScalingFilter};

/// `capabilities()` : `GRAPHEME_SHAPING`/
/// `TEXT_RUN_SHAPING` are always set because HarfBuzz shaping is a hard
/// dependency (`harfbuzz-sys` is not optional); `SVG` is always clear
/// because an SVG glyph backend is out of scope.
pub fn capabilities() -> Capabilities {
    Capabilities::GRAPHEME_SHAPING | Capabilities::TEXT_RUN_SHAPING
}

/// Logged at most once per process, on first font construction.
pub(crate) fn log_version_once() {
    VERSION_LOGGED.get_or_init(|| {
        log::info!("rasterfont {}", env!("CARGO_PKG_VERSION"));
    });
}
