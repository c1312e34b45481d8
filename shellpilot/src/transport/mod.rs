//! Transport layer: the duplex stream a session drives.
//!
//! Connection setup and authentication belong to the caller. A session only
//! needs something it can write text to and poll for text from; adapters are
//! provided for tokio I/O objects ([`IoStream`]) and authenticated russh
//! channels ([`SshChannelStream`]).

mod io;
mod ssh;

pub use io::IoStream;
pub use ssh::SshChannelStream;

use std::future::Future;

use bytes::BytesMut;

use crate::error::Result;

/// Duplex text stream to a remote shell.
///
/// The stream is owned by one session at a time and is never read and
/// written concurrently.
pub trait ShellStream: Send {
    /// Write text to the remote shell.
    fn write(&mut self, text: &str) -> impl Future<Output = Result<()>> + Send;

    /// Flush buffered writes.
    fn flush(&mut self) -> impl Future<Output = Result<()>> + Send;

    /// Non-blocking probe: is there data (or a pending fault) to read?
    fn data_available(&mut self) -> bool;

    /// Read whatever is available.
    ///
    /// Waits until at least one complete character can be decoded; a partial
    /// UTF-8 sequence is held back for the next call.
    /// A fault observed by [`data_available`](Self::data_available) is
    /// returned from here.
    fn read(&mut self) -> impl Future<Output = Result<String>> + Send;
}

/// Bytes at the front of `pending` that can be decoded now. An incomplete
/// trailing sequence is not counted; invalid bytes are (decoded lossily).
fn text_len(pending: &[u8]) -> usize {
    match std::str::from_utf8(pending) {
        Ok(text) => text.len(),
        Err(e) if e.error_len().is_none() => e.valid_up_to(),
        Err(_) => pending.len(),
    }
}

/// Whether [`take_text`] would return something.
pub(crate) fn has_text(pending: &BytesMut) -> bool {
    text_len(pending) > 0
}

/// Split the longest valid UTF-8 prefix off `pending`, leaving an incomplete
/// trailing sequence for the next read.
pub(crate) fn take_text(pending: &mut BytesMut) -> String {
    let valid = text_len(pending);
    let bytes = pending.split_to(valid);
    String::from_utf8_lossy(&bytes).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_text_complete() {
        let mut pending = BytesMut::from(&b"router1#"[..]);
        assert_eq!(take_text(&mut pending), "router1#");
        assert!(pending.is_empty());
    }

    #[test]
    fn test_partial_sequence_is_not_text() {
        let mut pending = BytesMut::from(&b"\xe2"[..]);
        assert!(!has_text(&pending));

        pending.extend_from_slice(b"\x9d\xaf");
        assert!(has_text(&pending));
        assert!(!has_text(&BytesMut::new()));
    }

    #[test]
    fn test_take_text_keeps_partial_sequence() {
        // "❯" is e2 9d af; only the first two bytes have arrived.
        let mut pending = BytesMut::from(&b"~ \xe2\x9d"[..]);
        assert_eq!(take_text(&mut pending), "~ ");
        assert_eq!(&pending[..], b"\xe2\x9d");

        pending.extend_from_slice(b"\xaf");
        assert_eq!(take_text(&mut pending), "❯");
    }

    #[test]
    fn test_take_text_invalid_bytes_lossy() {
        let mut pending = BytesMut::from(&b"a\xffb"[..]);
        assert_eq!(take_text(&mut pending), "a\u{fffd}b");
        assert!(pending.is_empty());
    }
}
