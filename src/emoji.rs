//! Emoji presentation policy (C11) and the per-codepoint emoji table it is
//! defined against.
//!
//! A static, sorted table, binary search on codepoint ranges, recommending
//! a default presentation per codepoint. Unicode
//! already publishes exactly that table as the `Emoji_Presentation`
//! property in `emoji-data.txt`; `unicode-properties` (with the `emoji`
//! feature, per Cargo.toml) compiles it into the same kind of sorted-range
//! binary search this crate would otherwise hand-roll, so this module
//! delegates to it rather than duplicating Unicode's own data.

use unicode_properties::emoji::UnicodeEmoji;

/// Per-font override of the per-codepoint default.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EmojiPresentation {
    #[default]
    Default,
    Text,
    Emoji,
}

/// Whether `c` is an emoji codepoint at all (Unicode `Emoji` property).
pub(crate) fn is_emoji(c: char) -> bool {
    c.is_emoji_char()
}

/// The table's default recommendation: emoji-style presentation unless the
/// codepoint defaults to text presentation (e.g. most digits and symbols
/// that are only emoji when followed by U+FE0F).
pub(crate) fn table_recommends_emoji(c: char) -> bool {
    c.is_emoji_presentation()
}

/// Resolves `force_text`/`force_emoji` for one codepoint under a policy.
/// Only meaningful when `is_emoji(c)` is true; callers
/// skip this entirely for non-emoji codepoints.
pub(crate) fn force_flags(c: char, policy: EmojiPresentation) -> (bool, bool) {
    let wants_emoji = match policy {
        EmojiPresentation::Emoji => true,
        EmojiPresentation::Text => false,
        EmojiPresentation::Default => table_recommends_emoji(c),
    };
    (!wants_emoji, wants_emoji)
}
