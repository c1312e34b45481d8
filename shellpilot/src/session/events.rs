//! Live output and debug events.
//!
//! Every chunk is emitted as soon as it has been sanitized and pager-stripped,
//! independently of being accumulated for the final [`Response`](super::Response).

use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use futures_core::Stream;
use log::debug;
use tokio::sync::mpsc;

/// An event emitted by a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A chunk of output, after sanitize and pager stripping.
    Output(String),

    /// Diagnostic text, only emitted when `SessionConfig::debug` is set.
    Debug {
        /// Time since the session was created.
        elapsed: Duration,
        /// What happened.
        message: String,
    },
}

/// Receiving half of a session's event queue.
///
/// Drain with [`recv`](Self::recv) or use it as a [`Stream`].
#[derive(Debug)]
pub struct SessionEvents {
    rx: mpsc::UnboundedReceiver<SessionEvent>,
}

impl SessionEvents {
    /// Wait for the next event. Returns `None` once the session is dropped
    /// or a newer subscriber replaced this one.
    pub async fn recv(&mut self) -> Option<SessionEvent> {
        self.rx.recv().await
    }

    /// Take an event if one is queued.
    pub fn try_recv(&mut self) -> Option<SessionEvent> {
        self.rx.try_recv().ok()
    }
}

impl Stream for SessionEvents {
    type Item = SessionEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

/// Sending side held by the session.
#[derive(Debug)]
pub(crate) struct EventSink {
    tx: Option<mpsc::UnboundedSender<SessionEvent>>,
    debug: bool,
    created: Instant,
}

impl EventSink {
    pub(crate) fn new(debug: bool) -> Self {
        Self {
            tx: None,
            debug,
            created: Instant::now(),
        }
    }

    /// Replace any existing subscriber.
    pub(crate) fn subscribe(&mut self) -> SessionEvents {
        let (tx, rx) = mpsc::unbounded_channel();
        self.tx = Some(tx);
        SessionEvents { rx }
    }

    fn send(&mut self, event: SessionEvent) {
        if let Some(tx) = &self.tx {
            if tx.send(event).is_err() {
                self.tx = None;
            }
        }
    }

    pub(crate) fn output(&mut self, chunk: &str) {
        if !chunk.is_empty() {
            self.send(SessionEvent::Output(chunk.to_string()));
        }
    }

    /// Log a diagnostic and, in debug mode, emit it as an event.
    pub(crate) fn debug(&mut self, message: impl Into<String>) {
        let message = message.into();
        debug!("{}", message);
        if self.debug {
            let elapsed = self.created.elapsed();
            self.send(SessionEvent::Debug { elapsed, message });
        }
    }
}
