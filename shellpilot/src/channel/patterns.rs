//! Prompt detection heuristics and prompt pattern compilation.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::PatternError;

/// Symbols that end a shell prompt.
pub const TERMINATORS: [char; 7] = ['#', '>', '$', '%', '→', '❯', '➜'];

/// Lines longer than this are instructional text, not prompts.
pub const MAX_PROMPT_LEN: usize = 80;

/// Default lookback window for tail checks.
pub const DEFAULT_SEARCH_DEPTH: usize = 4096;

/// Regex character class matching any terminator.
const TERMINATOR_CLASS: &str = r"[#>$%→❯➜]";

/// Escape sequence residue left in a prompt literal.
static ESCAPE_RESIDUE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\x1b\[[0-9;?]*[ -/]*[@-~]|\x1b[@-_]?|[\x00-\x08\x0b-\x1f\x7f]")
        .expect("escape residue regex is valid")
});

/// Trait for prompt matching - regex by default, extensible for custom matchers.
pub trait PromptMatcher: Send + Sync {
    /// Returns byte offset where match ends, or None if no match.
    fn find_match(&self, text: &str) -> Option<usize>;

    /// Check if the text matches.
    fn is_match(&self, text: &str) -> bool {
        self.find_match(text).is_some()
    }
}

impl PromptMatcher for Regex {
    fn find_match(&self, text: &str) -> Option<usize> {
        self.find(text).map(|m| m.end())
    }
}

fn is_terminator(c: char) -> bool {
    TERMINATORS.contains(&c)
}

/// Decide whether a single line looks like a shell prompt.
///
/// The trimmed line must be non-empty, end in a terminator, be at most
/// [`MAX_PROMPT_LEN`] characters, and contain fewer than two single quotes and
/// fewer than two double quotes (help text quoting CLI syntax is the usual
/// false positive).
pub fn is_likely_prompt(line: &str) -> bool {
    let line = line.trim();
    let Some(last) = line.chars().last() else {
        return false;
    };

    is_terminator(last)
        && line.chars().count() <= MAX_PROMPT_LEN
        && line.matches('\'').count() < 2
        && line.matches('"').count() < 2
}

/// How a [`PromptPattern`] matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternKind {
    /// Base host token, optional `(...)` mode suffix, terminator.
    Anchored,

    /// Any line ending in a terminator.
    TerminatorOnly,

    /// Caller-supplied regex.
    Custom,
}

/// A compiled prompt pattern derived from an observed prompt literal.
#[derive(Debug, Clone)]
pub struct PromptPattern {
    literal: String,
    base: String,
    terminator: Option<char>,
    kind: PatternKind,
    regex: Regex,
}

impl PromptPattern {
    /// Build a pattern from an observed prompt literal.
    ///
    /// `"host (config)# "` yields a pattern accepting `host# `,
    /// `host(config)# ` and `host (config-if)> `, but not `otherhost# `.
    pub fn build(literal: &str) -> Self {
        let cleaned = ESCAPE_RESIDUE.replace_all(literal, "");
        let cleaned = cleaned.trim_end();

        let Some(terminator) = cleaned.chars().last().filter(|&c| is_terminator(c)) else {
            return Self::terminator_only(cleaned, None);
        };

        let without_terminator = &cleaned[..cleaned.len() - terminator.len_utf8()];
        let base = match without_terminator.find('(') {
            Some(idx) => &without_terminator[..idx],
            None => without_terminator,
        }
        .trim();

        if !base.chars().any(char::is_alphanumeric) {
            return Self::terminator_only(cleaned, Some(terminator));
        }

        let pattern = format!(
            r"(?m)^[ \t]*{}[ \t]*(?:\([^)\r\n]*\))?[ \t]*{}[ \t\r]*$",
            regex::escape(base),
            TERMINATOR_CLASS
        );

        Self {
            literal: cleaned.trim().to_string(),
            base: base.to_string(),
            terminator: Some(terminator),
            kind: PatternKind::Anchored,
            regex: Regex::new(&pattern).expect("escaped prompt regex is valid"),
        }
    }

    /// Generic pattern matching any line that ends in a terminator.
    pub fn any_terminator() -> Self {
        Self::terminator_only("", None)
    }

    fn terminator_only(literal: &str, terminator: Option<char>) -> Self {
        let pattern = format!(r"(?m)^[^\r\n]*{}[ \t\r]*$", TERMINATOR_CLASS);
        Self {
            literal: literal.trim().to_string(),
            base: String::new(),
            terminator,
            kind: PatternKind::TerminatorOnly,
            regex: Regex::new(&pattern).expect("terminator regex is valid"),
        }
    }

    /// Use a caller-supplied regex. A trailing `\s*$` anchor is added unless
    /// the pattern is already anchored at end of line.
    pub fn custom(pattern: &str) -> Result<Self, PatternError> {
        let pattern = if pattern.ends_with('$') {
            format!("(?m){}", pattern)
        } else {
            format!(r"(?m){}[ \t\r]*$", pattern)
        };

        Ok(Self {
            literal: String::new(),
            base: String::new(),
            terminator: None,
            kind: PatternKind::Custom,
            regex: Regex::new(&pattern)?,
        })
    }

    /// The prompt literal this pattern was built from.
    pub fn literal(&self) -> &str {
        &self.literal
    }

    /// The base host token (empty unless [`PatternKind::Anchored`]).
    pub fn base(&self) -> &str {
        &self.base
    }

    /// The terminator of the original literal, if it had one.
    pub fn terminator(&self) -> Option<char> {
        self.terminator
    }

    /// How this pattern matches.
    pub fn kind(&self) -> PatternKind {
        self.kind
    }

    /// The underlying regex.
    pub fn regex(&self) -> &Regex {
        &self.regex
    }

    /// Check whether a single line is this prompt.
    pub fn matches(&self, line: &str) -> bool {
        self.regex.is_match(line)
    }
}

impl PromptMatcher for PromptPattern {
    fn find_match(&self, text: &str) -> Option<usize> {
        self.regex.find_match(text)
    }
}

impl fmt::Display for PromptPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.regex.as_str())
    }
}

/// The last `depth` bytes of `buffer`, moved forward to a char boundary.
pub(crate) fn tail(buffer: &str, depth: usize) -> &str {
    let mut start = buffer.len().saturating_sub(depth);
    while !buffer.is_char_boundary(start) {
        start += 1;
    }
    &buffer[start..]
}

/// Lines of `buffer` from last to first, with `\r` stripped.
fn lines_rev(buffer: &str) -> impl Iterator<Item = &str> {
    buffer.rsplit('\n').map(|line| line.trim_matches('\r'))
}

/// The last line of `buffer` with non-whitespace content.
pub fn last_non_empty_line(buffer: &str) -> Option<&str> {
    lines_rev(buffer).find(|line| !line.trim().is_empty())
}

/// The final, unterminated line of `buffer`, or None if the buffer ends in a
/// line break.
pub fn trailing_line(buffer: &str) -> Option<&str> {
    let line = buffer.rsplit('\n').next()?;
    if line.trim().is_empty() {
        None
    } else {
        Some(line)
    }
}

/// Scan lines from the end of `buffer` and return the first prompt-like one.
pub fn try_detect_prompt(buffer: &str) -> Option<String> {
    lines_rev(buffer)
        .find(|line| is_likely_prompt(line))
        .map(|line| line.trim().to_string())
}

/// Check whether the last non-empty line of `buffer` (within a
/// [`DEFAULT_SEARCH_DEPTH`] lookback) matches `pattern`.
///
/// Only the last line is considered so prompt-like text earlier in the output
/// never ends a command.
pub fn buffer_ends_with_prompt<M: PromptMatcher + ?Sized>(buffer: &str, pattern: &M) -> bool {
    buffer_ends_with_prompt_within(buffer, pattern, DEFAULT_SEARCH_DEPTH)
}

/// [`buffer_ends_with_prompt`] with an explicit lookback window.
pub fn buffer_ends_with_prompt_within<M: PromptMatcher + ?Sized>(
    buffer: &str,
    pattern: &M,
    depth: usize,
) -> bool {
    last_non_empty_line(tail(buffer, depth)).is_some_and(|line| pattern.is_match(line))
}

/// Like [`try_detect_prompt`], but only accept a prompt-like line that the
/// active pattern does not match. Used to notice mode transitions.
pub fn try_detect_different_prompt<M: PromptMatcher + ?Sized>(
    buffer: &str,
    current: &M,
) -> Option<String> {
    lines_rev(buffer)
        .find(|line| is_likely_prompt(line) && !current.is_match(line))
        .map(|line| line.trim().to_string())
}
