//! [`ShellStream`] over any tokio I/O object.

use bytes::BytesMut;
use futures_util::FutureExt;
use log::trace;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::{ShellStream, has_text, take_text};
use crate::error::{Result, StreamError};

/// Upper bound on bytes pulled by a single availability probe.
const PROBE_LIMIT: usize = 64 * 1024;

/// Adapter turning an `AsyncRead + AsyncWrite` (a raw TCP/telnet socket, a
/// serial port, an in-memory pipe) into a [`ShellStream`].
#[derive(Debug)]
pub struct IoStream<T> {
    io: T,
    pending: BytesMut,
    fault: Option<StreamError>,
    eof: bool,
}

impl<T> IoStream<T>
where
    T: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Wrap an I/O object.
    pub fn new(io: T) -> Self {
        Self {
            io,
            pending: BytesMut::with_capacity(4096),
            fault: None,
            eof: false,
        }
    }

    /// Give the I/O object back.
    pub fn into_inner(self) -> T {
        self.io
    }

    /// Drain everything that can be read without waiting into `pending`.
    fn fill_pending(&mut self) {
        let start = self.pending.len();
        while !self.eof && self.fault.is_none() && self.pending.len() - start < PROBE_LIMIT {
            match self.io.read_buf(&mut self.pending).now_or_never() {
                Some(Ok(0)) => self.eof = true,
                Some(Ok(n)) => trace!("io stream: probed {} bytes", n),
                Some(Err(e)) => self.fault = Some(StreamError::Io(e)),
                None => break,
            }
        }
    }

    fn take_fault(&mut self) -> Option<StreamError> {
        if let Some(fault) = self.fault.take() {
            return Some(fault);
        }
        self.eof.then_some(StreamError::Closed)
    }
}

impl<T> ShellStream for IoStream<T>
where
    T: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn write(&mut self, text: &str) -> Result<()> {
        self.io
            .write_all(text.as_bytes())
            .await
            .map_err(StreamError::Io)?;
        Ok(())
    }

    async fn flush(&mut self) -> Result<()> {
        self.io.flush().await.map_err(StreamError::Io)?;
        Ok(())
    }

    fn data_available(&mut self) -> bool {
        self.fill_pending();
        has_text(&self.pending) || self.fault.is_some() || self.eof
    }

    async fn read(&mut self) -> Result<String> {
        self.fill_pending();
        while !has_text(&self.pending) {
            if let Some(fault) = self.take_fault() {
                return Err(fault.into());
            }
            let n = self
                .io
                .read_buf(&mut self.pending)
                .await
                .map_err(StreamError::Io)?;
            if n == 0 {
                self.eof = true;
            }
        }
        Ok(take_text(&mut self.pending))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_probe_then_read() {
        let mock = tokio_test::io::Builder::new()
            .read(b"router1#")
            .write(b"show clock\n")
            .build();
        let mut stream = IoStream::new(mock);

        assert!(stream.data_available());
        assert_eq!(stream.read().await.unwrap(), "router1#");
        stream.write("show clock\n").await.unwrap();
        stream.flush().await.unwrap();
    }

    #[tokio::test]
    async fn test_peer_close_is_stream_fault() {
        let (client, server) = tokio::io::duplex(64);
        drop(server);
        let mut stream = IoStream::new(client);

        assert!(stream.data_available());
        let err = stream.read().await.unwrap_err();
        assert!(matches!(
            err,
            crate::Error::Stream(StreamError::Closed)
        ));
    }

    #[tokio::test]
    async fn test_no_data_pending() {
        let (client, _server) = tokio::io::duplex(64);
        let mut stream = IoStream::new(client);
        assert!(!stream.data_available());
    }

    #[tokio::test]
    async fn test_partial_sequence_is_not_available() {
        let (client, mut server) = tokio::io::duplex(64);
        let mut stream = IoStream::new(client);

        server.write_all(b"\xe2").await.unwrap();
        assert!(!stream.data_available());
        assert!(!stream.data_available());

        server.write_all(b"\x9d\xaf").await.unwrap();
        assert!(stream.data_available());
        assert_eq!(stream.read().await.unwrap(), "\u{276f}");
    }

    #[tokio::test]
    async fn test_partial_sequence_then_close() {
        let (client, mut server) = tokio::io::duplex(64);
        server.write_all(b"ok\xe2").await.unwrap();
        drop(server);
        let mut stream = IoStream::new(client);

        assert!(stream.data_available());
        assert_eq!(stream.read().await.unwrap(), "ok");
        assert!(stream.data_available());
        assert!(matches!(
            stream.read().await,
            Err(crate::Error::Stream(StreamError::Closed))
        ));
    }

    #[tokio::test]
    async fn test_data_before_close_is_delivered_first() {
        let (client, mut server) = tokio::io::duplex(64);
        server.write_all(b"bye\r\n").await.unwrap();
        drop(server);
        let mut stream = IoStream::new(client);

        assert!(stream.data_available());
        assert_eq!(stream.read().await.unwrap(), "bye\r\n");
        assert!(stream.data_available());
        assert!(stream.read().await.is_err());
    }
}
