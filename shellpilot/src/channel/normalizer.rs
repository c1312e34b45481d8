//! Terminal output normalizer.
//!
//! Replays a raw terminal byte stream against a single-line virtual screen and
//! produces the text a human would actually see: carriage returns overwrite
//! in place, backspaces move the cursor, tabs expand to tab stops, and a subset
//! of cursor/erase CSI sequences is applied. Sequence recognition is done by
//! the `vte` state machine; everything it does not hand to us as a recognised
//! action is dropped.
//!
//! Each [`TerminalNormalizer::normalize`] call starts from a fresh parser and
//! an empty line, so an escape sequence split across two calls is not
//! reassembled.

use log::trace;
use vte::{Params, Parser, Perform};

/// Default tab stop width.
pub const DEFAULT_TAB_SIZE: usize = 8;

/// Cursor moves and inserts never pad the line past this column.
pub const MAX_COLUMNS: usize = 4096;

/// Stateless (between calls) terminal output normalizer.
#[derive(Debug, Clone, Copy)]
pub struct TerminalNormalizer {
    tab_size: usize,
}

impl TerminalNormalizer {
    /// Create a normalizer with the given tab stop width.
    ///
    /// A zero width is treated as 1.
    pub fn new(tab_size: usize) -> Self {
        Self {
            tab_size: tab_size.max(1),
        }
    }

    /// Tab stop width.
    pub fn tab_size(&self) -> usize {
        self.tab_size
    }

    /// Normalize raw terminal output into plain text.
    ///
    /// Committed lines are terminated with `\r\n` and have trailing spaces
    /// trimmed; any uncommitted residue is appended as-is without a
    /// terminator.
    pub fn normalize(&self, raw: &str) -> String {
        let mut screen = LineScreen::new(self.tab_size, raw.len());
        let mut parser = Parser::new();
        parser.advance(&mut screen, raw.as_bytes());
        screen.finish()
    }
}

impl Default for TerminalNormalizer {
    fn default() -> Self {
        Self::new(DEFAULT_TAB_SIZE)
    }
}

/// Normalize with the default tab size.
pub fn normalize(raw: &str) -> String {
    TerminalNormalizer::default().normalize(raw)
}

/// Virtual line buffer plus cursor.
///
/// Invariant: `cursor <= line.len()`. Moving the cursor past the end pads the
/// line with spaces.
struct LineScreen {
    line: Vec<char>,
    cursor: usize,
    saved_cursor: Option<usize>,
    tab_size: usize,
    out: String,
}

impl LineScreen {
    fn new(tab_size: usize, capacity: usize) -> Self {
        Self {
            line: Vec::with_capacity(128),
            cursor: 0,
            saved_cursor: None,
            tab_size,
            out: String::with_capacity(capacity),
        }
    }

    fn move_to(&mut self, column: usize) {
        let column = column.min(MAX_COLUMNS.max(self.line.len()));
        if column > self.line.len() {
            self.line.resize(column, ' ');
        }
        self.cursor = column;
    }

    fn put(&mut self, c: char) {
        if self.cursor < self.line.len() {
            self.line[self.cursor] = c;
        } else {
            self.line.push(c);
        }
        self.cursor += 1;
    }

    fn commit_line(&mut self) {
        let end = self
            .line
            .iter()
            .rposition(|&c| c != ' ')
            .map_or(0, |i| i + 1);
        self.out.extend(&self.line[..end]);
        self.out.push_str("\r\n");
        self.line.clear();
        self.cursor = 0;
    }

    fn tab(&mut self) {
        let next = (self.cursor / self.tab_size + 1) * self.tab_size;
        self.move_to(next);
    }

    fn erase_in_line(&mut self, mode: u16) {
        match mode {
            // Cursor to end.
            0 => self.line.truncate(self.cursor),
            // Start through cursor.
            1 => {
                let end = (self.cursor + 1).min(self.line.len());
                self.line[..end].fill(' ');
            }
            // Whole line; the cursor returns home so redrawn content starts clean.
            2 => {
                self.line.clear();
                self.cursor = 0;
            }
            _ => {}
        }
    }

    fn erase_chars(&mut self, n: usize) {
        let end = (self.cursor + n).min(self.line.len());
        self.line[self.cursor..end].fill(' ');
    }

    fn insert_chars(&mut self, n: usize) {
        let n = n.min(MAX_COLUMNS.saturating_sub(self.line.len()));
        let at = self.cursor;
        self.line.splice(at..at, std::iter::repeat_n(' ', n));
    }

    fn delete_chars(&mut self, n: usize) {
        let end = (self.cursor + n).min(self.line.len());
        self.line.drain(self.cursor..end);
    }

    fn finish(mut self) -> String {
        self.out.extend(&self.line);
        self.out
    }
}

/// First value of the `index`th parameter, with 0/absent mapped to `default`.
fn param(params: &Params, index: usize, default: u16) -> u16 {
    params
        .iter()
        .nth(index)
        .and_then(|p| p.first().copied())
        .filter(|&v| v != 0)
        .unwrap_or(default)
}

/// Raw first parameter, where 0 is meaningful (erase modes).
fn mode(params: &Params) -> u16 {
    params
        .iter()
        .next()
        .and_then(|p| p.first().copied())
        .unwrap_or(0)
}

impl Perform for LineScreen {
    fn print(&mut self, c: char) {
        self.put(c);
    }

    fn execute(&mut self, byte: u8) {
        match byte {
            b'\r' => self.cursor = 0,
            b'\n' => self.commit_line(),
            b'\t' => self.tab(),
            0x08 => self.cursor = self.cursor.saturating_sub(1),
            _ => {}
        }
    }

    fn csi_dispatch(&mut self, params: &Params, intermediates: &[u8], ignore: bool, action: char) {
        // Private-mode and malformed sequences carry no text semantics.
        if ignore || !intermediates.is_empty() {
            return;
        }

        match action {
            'K' => self.erase_in_line(mode(params)),
            'X' => self.erase_chars(param(params, 0, 1) as usize),
            'C' => self.move_to(self.cursor + param(params, 0, 1) as usize),
            'D' => self.cursor = self.cursor.saturating_sub(param(params, 0, 1) as usize),
            'G' | '`' => self.move_to(param(params, 0, 1) as usize - 1),
            // Single-line model: only the column survives.
            'H' | 'f' => self.move_to(param(params, 1, 1) as usize - 1),
            '@' => self.insert_chars(param(params, 0, 1) as usize),
            'P' => self.delete_chars(param(params, 0, 1) as usize),
            's' => self.saved_cursor = Some(self.cursor),
            'u' => {
                if let Some(column) = self.saved_cursor {
                    self.move_to(column);
                }
            }
            'm' => {}
            other => trace!("normalizer: ignoring CSI '{}'", other),
        }
    }

    fn esc_dispatch(&mut self, intermediates: &[u8], _ignore: bool, byte: u8) {
        if !intermediates.is_empty() {
            return;
        }
        match byte {
            b'7' => self.saved_cursor = Some(self.cursor),
            b'8' => {
                if let Some(column) = self.saved_cursor {
                    self.move_to(column);
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_unchanged() {
        let text = "show version\r\nCisco IOS XE Software\r\nrouter1#";
        assert_eq!(normalize(text), text);
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn test_carriage_return_overwrites() {
        assert_eq!(normalize("abc\rXY"), "XYc");
    }

    #[test]
    fn test_tab_expansion() {
        assert_eq!(normalize("a\tb"), "a       b");
        assert_eq!(TerminalNormalizer::new(4).normalize("ab\tc"), "ab  c");
    }

    #[test]
    fn test_backspace_moves_without_deleting() {
        assert_eq!(normalize("abc\x08\x08X"), "aXc");
        assert_eq!(normalize("\x08\x08a"), "a");
    }

    #[test]
    fn test_newline_trims_trailing_spaces() {
        assert_eq!(normalize("abc   \nnext"), "abc\r\nnext");
    }

    #[test]
    fn test_erase_whole_line() {
        assert_eq!(normalize("Building configuration\x1b[2Krouter1#"), "router1#");
        assert_eq!(normalize("progress 10%\r\x1b[2Kdone"), "done");
    }

    #[test]
    fn test_erase_to_end_and_to_start() {
        assert_eq!(normalize("abcdef\x1b[3D\x1b[K"), "abc");
        assert_eq!(normalize("abcdef\x1b[3D\x1b[0K"), "abc");
        assert_eq!(normalize("abcdef\x1b[3D\x1b[1K"), "    ef");
    }

    #[test]
    fn test_erase_characters() {
        assert_eq!(normalize("abcdef\r\x1b[2X"), "  cdef");
    }

    #[test]
    fn test_cursor_movement() {
        assert_eq!(normalize("abc\x1b[5CX"), "abc     X");
        assert_eq!(normalize("abcdef\x1b[2DX"), "abcdXf");
        assert_eq!(normalize("abcdef\x1b[2GX"), "aXcdef");
        assert_eq!(normalize("abcdef\x1b[24;3HX"), "abXdef");
    }

    #[test]
    fn test_insert_and_delete_characters() {
        assert_eq!(normalize("abcdef\r\x1b[2C\x1b[2@"), "ab  cdef");
        assert_eq!(normalize("abcdef\r\x1b[1C\x1b[3P"), "aef");
    }

    #[test]
    fn test_large_moves_are_clamped() {
        let out = normalize("a\x1b[65535CX");
        assert_eq!(out.len(), MAX_COLUMNS + 1);
        assert!(out.ends_with('X'));

        let noisy = "\x1b[65535C\x1b[65535@".repeat(100);
        assert!(normalize(&format!("{noisy}X")).len() <= MAX_COLUMNS + 1);
        assert!(normalize("\x1b[65535G\x1b[1;65535H.").len() <= MAX_COLUMNS + 1);
    }

    #[test]
    fn test_save_restore_cursor() {
        assert_eq!(normalize("ab\x1b7cdef\x1b8X"), "abXdef");
        assert_eq!(normalize("ab\x1b[scdef\x1b[uX"), "abXdef");
    }

    #[test]
    fn test_sgr_and_unknown_sequences_ignored() {
        assert_eq!(normalize("\x1b[1;32mgreen\x1b[0m text"), "green text");
        assert_eq!(normalize("a\x1b[?25lb\x1b[?2004hc"), "abc");
        assert_eq!(normalize("a\x1b[2Jb"), "ab");
    }

    #[test]
    fn test_other_controls_dropped() {
        assert_eq!(normalize("a\x07b\x00c"), "abc");
    }

    #[test]
    fn test_pager_redraw_overwrites_banner() {
        let raw = "line1\r\n --More-- \r          \rline2\r\nrouter1#";
        assert_eq!(normalize(raw), "line1\r\nline2\r\nrouter1#");
    }

    #[test]
    fn test_residual_kept_without_terminator() {
        assert_eq!(normalize("out\r\nrouter1# "), "out\r\nrouter1# ");
    }
}
