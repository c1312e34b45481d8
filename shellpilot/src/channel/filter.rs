//! Pre-passes applied to every raw chunk before it is accumulated.

use once_cell::sync::Lazy;
use regex::Regex;

/// Pager continuation banner: dashes, "more" (with optional detail such as a
/// percentage), dashes. Optionally wrapped in carriage returns and the echoed
/// space some devices print after the banner.
static PAGER_BANNER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\r?[ \t]*-{2,}[ \t]*\(?[ \t]*more\b[^\r\n-]*\)?[ \t]*-{2,}[ \t]?\r?")
        .expect("pager banner regex is valid")
});

/// Strip everything outside printable ASCII, keeping the control characters
/// the normalizer understands (`\r`, `\n`, `\t`, backspace, ESC).
pub fn sanitize(raw: &str) -> String {
    raw.chars()
        .filter(|&c| matches!(c, '\r' | '\n' | '\t' | '\x08' | '\x1b' | ' '..='~'))
        .collect()
}

/// Result of [`strip_pager_artifacts`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PagerStrip {
    /// The chunk with every pager banner removed.
    pub chunk: String,

    /// Whether at least one banner was seen.
    pub saw_pager: bool,
}

/// Remove pager continuation banners (`--More--`, ` -- More -- `,
/// `---(more 42%)---`) from a chunk and report whether one was present, so the
/// caller can send the continuation keystroke.
pub fn strip_pager_artifacts(chunk: &str) -> PagerStrip {
    if !PAGER_BANNER.is_match(chunk) {
        return PagerStrip {
            chunk: chunk.to_string(),
            saw_pager: false,
        };
    }

    PagerStrip {
        chunk: PAGER_BANNER.replace_all(chunk, "").into_owned(),
        saw_pager: true,
    }
}
