//! The fallback chain's element type and its state machine.

use crate::backend::Backends;
use crate::instance::FontInstance;
use crate::pattern::{CharSet, LangSet, Pattern};

/// `Lazy -> Instantiating -> Live | Dead`, one-way.
///
/// `Instantiating` is not a separately-observable state in this
/// implementation: instantiation happens synchronously under the owning
/// `Font`'s primary lock, so no other thread can observe a candidate
/// mid-transition. The type still
/// only allows the three end states `Lazy`/`Live`/`Dead` to keep the
/// one-way transition explicit in the type rather than as a runtime
/// invariant someone could break.
enum CandidateState {
    Lazy,
    Live(FontInstance),
    Dead,
}

/// A single fallback chain member : a resolved pattern plus its
/// coverage sets, with an instance that is materialized on first use.
pub(crate) struct FallbackCandidate {
    pub(crate) pattern: Pattern,
    pub(crate) charset: CharSet,
    pub(crate) langset: LangSet,
    /// The *base* pattern's requested pixel size, carried separately from
    /// `pattern` because `pattern` has already been through render-prepare
    /// and may describe a different (bitmap-strike) size.
    pub(crate) requested_pixel_size: f64,
    state: CandidateState,
}

impl FallbackCandidate {
    pub(crate) fn new(pattern: Pattern, requested_pixel_size: f64) -> Self {
        FallbackCandidate {
            charset: pattern.charset.clone(),
            langset: pattern.langset.clone(),
            pattern,
            requested_pixel_size,
            state: CandidateState::Lazy,
        }
    }

    /// An already-instantiated candidate, used for the primary.
    pub(crate) fn new_live(pattern: Pattern, requested_pixel_size: f64, instance: FontInstance) -> Self {
        FallbackCandidate {
            charset: pattern.charset.clone(),
            langset: pattern.langset.clone(),
            pattern,
            requested_pixel_size,
            state: CandidateState::Live(instance),
        }
    }

    pub(crate) fn is_dead(&self) -> bool {
        matches!(self.state, CandidateState::Dead)
    }

    pub(crate) fn covers(&self, codepoint: char) -> bool {
        self.charset.contains(codepoint)
    }

    pub(crate) fn has_emoji_lang(&self) -> bool {
        self.langset.is_emoji_font()
    }

    pub(crate) fn instance(&self) -> Option<&FontInstance> {
        match &self.state {
            CandidateState::Live(instance) => Some(instance),
            _ => None,
        }
    }

    /// Instantiate if lazy; on failure transitions permanently to `Dead`.
    /// Returns `true` if the candidate is live (already was, or just became
    /// so) after the call.
    pub(crate) fn ensure_instantiated(&mut self, backends: &Backends) -> bool {
        match &self.state {
            CandidateState::Live(_) => true,
            CandidateState::Dead => false,
            CandidateState::Lazy => {
                match FontInstance::new(backends, &self.pattern, self.requested_pixel_size) {
                    Ok(instance) => {
                        self.state = CandidateState::Live(instance);
                        true
                    },
                    Err(_) => {
                        self.state = CandidateState::Dead;
                        false
                    },
                }
            },
        }
    }
}
