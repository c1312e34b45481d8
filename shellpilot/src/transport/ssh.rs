//! [`ShellStream`] over an authenticated russh session channel.

use bytes::BytesMut;
use futures_util::FutureExt;
use log::{debug, trace};
use russh::client::Msg;
use russh::{Channel, ChannelMsg};

use super::{ShellStream, has_text, take_text};
use crate::error::{Result, StreamError};

/// Adapter for a russh channel that already has a PTY and shell.
///
/// Connecting, authenticating and opening the channel are the caller's job;
/// this only moves shell text in and out.
pub struct SshChannelStream {
    channel: Channel<Msg>,
    pending: BytesMut,
    closed: bool,
}

impl SshChannelStream {
    /// Wrap an open shell channel.
    pub fn new(channel: Channel<Msg>) -> Self {
        Self {
            channel,
            pending: BytesMut::with_capacity(4096),
            closed: false,
        }
    }

    /// Give the channel back.
    pub fn into_inner(self) -> Channel<Msg> {
        self.channel
    }

    fn on_message(&mut self, msg: Option<ChannelMsg>) {
        match msg {
            Some(ChannelMsg::Data { data }) => {
                trace!("ssh stream: {} bytes", data.len());
                self.pending.extend_from_slice(&data);
            }
            // stderr is shown on the same terminal.
            Some(ChannelMsg::ExtendedData { data, .. }) => {
                self.pending.extend_from_slice(&data);
            }
            Some(ChannelMsg::Eof) | Some(ChannelMsg::Close) | None => {
                debug!("ssh stream: channel closed");
                self.closed = true;
            }
            Some(other) => trace!("ssh stream: ignoring {:?}", other),
        }
    }

    /// Drain every message that is ready without waiting.
    fn fill_pending(&mut self) {
        while !self.closed {
            match self.channel.wait().now_or_never() {
                Some(msg) => self.on_message(msg),
                None => break,
            }
        }
    }
}

impl ShellStream for SshChannelStream {
    async fn write(&mut self, text: &str) -> Result<()> {
        self.channel
            .data(text.as_bytes())
            .await
            .map_err(StreamError::Ssh)?;
        Ok(())
    }

    async fn flush(&mut self) -> Result<()> {
        // Channel data is handed to the session task on write.
        Ok(())
    }

    fn data_available(&mut self) -> bool {
        self.fill_pending();
        has_text(&self.pending) || self.closed
    }

    async fn read(&mut self) -> Result<String> {
        self.fill_pending();
        while !has_text(&self.pending) {
            if self.closed {
                return Err(StreamError::Closed.into());
            }
            let msg = self.channel.wait().await;
            self.on_message(msg);
        }
        Ok(take_text(&mut self.pending))
    }
}
