//! Channel layer: everything between raw stream text and prompt decisions.
//!
//! This module holds the pure, synchronous parts of the engine: the terminal
//! output normalizer, the sanitize/pager pre-passes, the prompt detector, and
//! the output accumulation buffer.

mod buffer;
mod filter;
mod normalizer;
pub mod patterns;

pub use buffer::OutputBuffer;
pub use filter::{PagerStrip, sanitize, strip_pager_artifacts};
pub use normalizer::{DEFAULT_TAB_SIZE, MAX_COLUMNS, TerminalNormalizer, normalize};
pub use patterns::{
    PatternKind, PromptMatcher, PromptPattern, buffer_ends_with_prompt, is_likely_prompt,
    try_detect_different_prompt, try_detect_prompt,
};
