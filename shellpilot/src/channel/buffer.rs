//! Output accumulation buffer with a bounded tail window.
//!
//! Prompt checks only ever look at the last `search_depth` bytes of the
//! in-flight command's output, so their cost does not grow with the output
//! (full routing tables, `show tech-support`).

use memchr::memchr;

use super::patterns::{DEFAULT_SEARCH_DEPTH, tail};

/// Buffer for accumulating sanitized command output.
#[derive(Debug)]
pub struct OutputBuffer {
    /// The accumulated output.
    buffer: String,

    /// How many bytes from the end prompt checks look at.
    search_depth: usize,
}

impl OutputBuffer {
    /// Create a new buffer with the specified search depth.
    pub fn new(search_depth: usize) -> Self {
        Self {
            buffer: String::with_capacity(4096),
            search_depth,
        }
    }

    /// Append a chunk.
    pub fn push_str(&mut self, chunk: &str) {
        self.buffer.push_str(chunk);
    }

    /// The last `search_depth` bytes, starting at a line boundary.
    ///
    /// When the window cuts a line in half, the partial first line is
    /// dropped so carriage-return redraws in it cannot be misapplied.
    pub fn tail(&self) -> &str {
        let window = tail(&self.buffer, self.search_depth);
        if window.len() == self.buffer.len() {
            return window;
        }
        match memchr(b'\n', window.as_bytes()) {
            Some(pos) => &window[pos + 1..],
            None => window,
        }
    }

    /// Take ownership of the buffer contents and reset.
    pub fn take(&mut self) -> String {
        std::mem::take(&mut self.buffer)
    }

    /// Get the buffer contents.
    pub fn as_str(&self) -> &str {
        &self.buffer
    }

    /// Get the current buffer length in bytes.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Clear the buffer.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    /// Get the search depth setting.
    pub fn search_depth(&self) -> usize {
        self.search_depth
    }
}

impl Default for OutputBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_SEARCH_DEPTH)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_push() {
        let mut buffer = OutputBuffer::new(100);
        buffer.push_str("Hello, ");
        buffer.push_str("world!");
        assert_eq!(buffer.as_str(), "Hello, world!");
        assert_eq!(buffer.len(), 13);
    }

    #[test]
    fn test_tail_whole_buffer_when_short() {
        let mut buffer = OutputBuffer::new(100);
        buffer.push_str("abc\r\nrouter1#");
        assert_eq!(buffer.tail(), "abc\r\nrouter1#");
    }

    #[test]
    fn test_tail_starts_at_line_boundary() {
        let mut buffer = OutputBuffer::new(20);
        buffer.push_str(&"x".repeat(100));
        buffer.push_str("\r\nrouter1#");
        assert_eq!(buffer.tail(), "router1#");
    }

    #[test]
    fn test_tail_without_line_break() {
        let mut buffer = OutputBuffer::new(10);
        buffer.push_str(&"y".repeat(50));
        assert_eq!(buffer.tail(), "y".repeat(10));
    }

    #[test]
    fn test_take_clears_buffer() {
        let mut buffer = OutputBuffer::new(100);
        buffer.push_str("test data");
        assert_eq!(buffer.take(), "test data");
        assert!(buffer.is_empty());
    }
}
