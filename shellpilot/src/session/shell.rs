//! The shell session: owns the stream and runs the read loop.

use std::time::{Duration, Instant};

use log::{debug, trace, warn};
use tokio_util::sync::CancellationToken;

use super::config::SessionConfig;
use super::events::{EventSink, SessionEvents};
use super::read_loop::{ChunkVerdict, IdleAction, ReadLoop};
use super::response::{Completion, Response};
use crate::channel::patterns::{buffer_ends_with_prompt_within, last_non_empty_line, trailing_line};
use crate::channel::{
    OutputBuffer, PagerStrip, PatternKind, PromptPattern, TerminalNormalizer, is_likely_prompt,
    sanitize, strip_pager_artifacts, try_detect_different_prompt, try_detect_prompt,
};
use crate::error::{Result, SessionError};
use crate::transport::ShellStream;

/// What the tail of the accumulated output looks like.
#[derive(Debug, PartialEq, Eq)]
enum TailMatch {
    /// The last non-empty line matches the active pattern.
    Exact(String),

    /// The unterminated final line is prompt-like but does not match.
    Likely(String),

    None,
}

/// Summary of one stream read.
struct ChunkRead {
    len: usize,
    saw_pager: bool,
}

/// An interactive session with one remote shell.
///
/// The session drives a single [`ShellStream`] sequentially; it must not be
/// shared between concurrent callers. Run one session per host.
pub struct ShellSession<S> {
    stream: S,
    config: SessionConfig,
    normalizer: TerminalNormalizer,
    buffer: OutputBuffer,
    prompt: String,
    pattern: PromptPattern,
    pinned_pattern: bool,
    initialized: bool,
    pages: u64,
    cancel: CancellationToken,
    events: EventSink,
}

impl<S: ShellStream> ShellSession<S> {
    /// Create a session with the default configuration.
    pub fn new(stream: S) -> Self {
        Self::from_parts(stream, SessionConfig::default(), CancellationToken::new(), None)
    }

    pub(crate) fn from_parts(
        stream: S,
        config: SessionConfig,
        cancel: CancellationToken,
        pinned: Option<PromptPattern>,
    ) -> Self {
        Self {
            normalizer: TerminalNormalizer::new(config.tab_size),
            buffer: OutputBuffer::new(config.search_depth),
            events: EventSink::new(config.debug),
            pinned_pattern: pinned.is_some(),
            pattern: pinned.unwrap_or_else(PromptPattern::any_terminator),
            stream,
            config,
            prompt: String::new(),
            initialized: false,
            pages: 0,
            cancel,
        }
    }

    /// The current prompt literal (empty before initialization).
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// The active prompt pattern.
    pub fn pattern(&self) -> &PromptPattern {
        &self.pattern
    }

    /// Whether [`initialize`](Self::initialize) has succeeded.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Total pager pages dismissed over the session's lifetime.
    pub fn pages(&self) -> u64 {
        self.pages
    }

    /// The session configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// The stop signal this session honours.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Subscribe to live output (and debug) events, replacing any previous
    /// subscriber.
    pub fn events(&mut self) -> SessionEvents {
        self.events.subscribe()
    }

    /// Hand the stream back to the caller.
    pub fn into_inner(self) -> S {
        self.stream
    }

    /// Coax and detect the initial prompt.
    ///
    /// Writes a blank line, reads until a prompt-like line has been followed
    /// by a quiet period (or the initial prompt timeout), then takes the last
    /// prompt-like line as the prompt. If none is prompt-like, the last
    /// non-empty line is used verbatim.
    pub async fn initialize(&mut self) -> Result<&str> {
        self.events.debug("initialize: sending blank line");
        self.buffer.clear();
        self.write_line("").await?;

        let started = Instant::now();
        let mut last_data = started;
        let mut received = false;
        let mut pending_since: Option<Instant> = None;

        loop {
            if self.cancel.is_cancelled() {
                return Err(SessionError::Cancelled.into());
            }

            let now = Instant::now();
            if let Some(chunk) = self.poll_chunk().await? {
                if chunk.saw_pager {
                    self.dismiss_pager().await?;
                }
                received = true;
                last_data = now;

                let text = self.normalizer.normalize(self.buffer.tail());
                pending_since = trailing_line(&text)
                    .filter(|line| is_likely_prompt(line))
                    .map(|_| now);
            } else {
                let waited = now.saturating_duration_since(started);
                let quiet = pending_since.is_some_and(|since| {
                    now.saturating_duration_since(since) >= self.config.quiet_period
                });
                if quiet {
                    break;
                }
                if waited >= self.config.initial_prompt_timeout {
                    self.events
                        .debug(format!("initialize: no prompt after {:?}", waited));
                    break;
                }
                if received
                    && now.saturating_duration_since(last_data) >= self.config.idle_timeout
                {
                    self.events.debug("initialize: output went idle");
                    break;
                }
            }

            pause(&self.cancel, self.config.poll_interval).await;
        }

        let text = self.normalizer.normalize(&self.buffer.take());
        let literal = match try_detect_prompt(&text) {
            Some(literal) => literal,
            None => last_non_empty_line(&text)
                .map(|line| line.trim().to_string())
                .ok_or(SessionError::NoPrompt(self.config.initial_prompt_timeout))?,
        };

        self.adopt_prompt(&literal);
        self.initialized = true;
        debug!("session initialized with prompt {:?}", self.prompt);
        Ok(&self.prompt)
    }

    /// Send a command and read until its prompt is confirmed.
    ///
    /// Timeouts, the page cap and cancellation end the read loop without an
    /// error; check [`Response::completion`]. Stream faults are returned as
    /// errors.
    pub async fn execute(&mut self, command: &str) -> Result<Response> {
        if !self.initialized {
            return Err(SessionError::NotInitialized.into());
        }

        let start = Instant::now();
        self.buffer.clear();
        self.events.debug(format!("execute: {:?}", command));
        self.write_line(command).await?;

        let mut read_loop = ReadLoop::new(start, &self.config);
        let mut pages = 0u32;

        let completion = loop {
            if self.cancel.is_cancelled() {
                self.events.debug("execute: stop requested");
                break Completion::Cancelled;
            }

            let now = Instant::now();
            if let Some(chunk) = self.poll_chunk().await? {
                if chunk.saw_pager {
                    if pages >= self.config.max_pages {
                        warn!("pager cap of {} pages reached for {:?}", pages, command);
                        break Completion::PageLimit;
                    }
                    pages += 1;
                    self.dismiss_pager().await?;
                    read_loop.on_chunk(now, ChunkVerdict::PagerContinue);
                } else {
                    match self.check_tail() {
                        TailMatch::Exact(literal) => {
                            self.events.debug(format!("prompt matched: {:?}", literal));
                            self.adopt_prompt(&literal);
                            break Completion::Prompt;
                        }
                        TailMatch::Likely(line) => {
                            self.events.debug(format!("potential prompt: {:?}", line));
                            read_loop.on_chunk(now, ChunkVerdict::PotentialPrompt);
                        }
                        TailMatch::None => read_loop.on_chunk(now, ChunkVerdict::AwaitingData),
                    }
                }

                if read_loop.command_expired(now) {
                    break Completion::CommandTimeout;
                }
            } else {
                match read_loop.on_idle(now) {
                    IdleAction::ConfirmPotential => match self.check_tail() {
                        TailMatch::Exact(literal) => {
                            self.adopt_prompt(&literal);
                            break Completion::Prompt;
                        }
                        TailMatch::Likely(line) => {
                            // A terminator-only pattern accepts any prompt-like
                            // line, so the confirmed line is the first real prompt.
                            let literal = if self.pattern.kind() == PatternKind::TerminatorOnly {
                                Some(line)
                            } else {
                                try_detect_different_prompt(&line, &self.pattern)
                            };
                            if let Some(literal) = literal {
                                self.adopt_prompt(&literal);
                            }
                            self.events.debug("potential prompt confirmed after quiet period");
                            break Completion::Prompt;
                        }
                        TailMatch::None => {
                            self.events.debug("potential prompt withdrawn");
                            read_loop.reject_potential();
                        }
                    },
                    IdleAction::FallbackCheck => {
                        if let Some(literal) = self.fallback_prompt() {
                            self.events
                                .debug(format!("fallback prompt check accepted {:?}", literal));
                            if self.pattern.kind() != PatternKind::TerminatorOnly {
                                self.adopt_prompt(&literal);
                            }
                            break Completion::Prompt;
                        }
                    }
                    IdleAction::Finish(completion) => break completion,
                    IdleAction::Wait => {}
                }
            }

            pause(&self.cancel, self.config.poll_interval).await;
        };

        let elapsed = start.elapsed();
        if completion != Completion::Prompt {
            self.events.debug(format!(
                "execute: {} after {:?} with {} bytes buffered",
                completion,
                elapsed,
                self.buffer.len()
            ));
        }

        let result = self.normalizer.normalize(&self.buffer.take());
        let failure_message = self
            .config
            .failure_patterns
            .iter()
            .find(|pattern| result.contains(pattern.as_str()))
            .cloned();

        Ok(Response {
            command: command.to_string(),
            result,
            prompt: self.prompt.clone(),
            elapsed,
            completion,
            pages,
            failure_message,
        })
    }

    async fn write_line(&mut self, text: &str) -> Result<()> {
        let line = format!("{}{}", text, self.config.newline);
        self.stream.write(&line).await?;
        self.stream.flush().await
    }

    async fn dismiss_pager(&mut self) -> Result<()> {
        self.pages += 1;
        self.events.debug(format!("pager seen, continuing (page {})", self.pages));
        self.stream.write(&self.config.pager_continue).await?;
        self.stream.flush().await
    }

    /// Read a chunk if the stream has one. A read that leaves nothing after
    /// sanitizing (noise bytes) counts as no data.
    async fn poll_chunk(&mut self) -> Result<Option<ChunkRead>> {
        if !self.stream.data_available() {
            return Ok(None);
        }
        let chunk = self.read_chunk().await?;
        Ok((chunk.len > 0 || chunk.saw_pager).then_some(chunk))
    }

    /// Read one chunk, sanitize it, strip pager banners, accumulate and emit.
    async fn read_chunk(&mut self) -> Result<ChunkRead> {
        let raw = self.stream.read().await?;
        let PagerStrip { chunk, saw_pager } = strip_pager_artifacts(&sanitize(&raw));
        trace!(
            "chunk: {} raw bytes, {} kept, buffer {} bytes",
            raw.len(),
            chunk.len(),
            self.buffer.len() + chunk.len()
        );

        self.buffer.push_str(&chunk);
        self.events.output(&chunk);

        Ok(ChunkRead {
            len: chunk.len(),
            saw_pager,
        })
    }

    /// Classify the tail. A terminator-only pattern is no stronger than the
    /// heuristic, so it never produces an exact match.
    fn check_tail(&self) -> TailMatch {
        let text = self.normalizer.normalize(self.buffer.tail());

        if self.pattern.kind() != PatternKind::TerminatorOnly
            && buffer_ends_with_prompt_within(&text, &self.pattern, self.config.search_depth)
        {
            if let Some(line) = last_non_empty_line(&text) {
                return TailMatch::Exact(line.trim().to_string());
            }
        }

        match trailing_line(&text) {
            Some(line) if is_likely_prompt(line) => TailMatch::Likely(line.trim().to_string()),
            _ => TailMatch::None,
        }
    }

    fn fallback_prompt(&self) -> Option<String> {
        let text = self.normalizer.normalize(self.buffer.tail());
        last_non_empty_line(&text)
            .filter(|line| is_likely_prompt(line))
            .map(|line| line.trim().to_string())
    }

    /// Take `literal` as the current prompt, rebuilding the pattern if it
    /// changed (mode transitions).
    fn adopt_prompt(&mut self, literal: &str) {
        if literal == self.prompt {
            return;
        }

        if self.prompt.is_empty() {
            debug!("prompt detected: {:?}", literal);
        } else {
            self.events.debug(format!(
                "prompt changed: {:?} -> {:?}",
                self.prompt, literal
            ));
        }

        self.prompt = literal.to_string();
        if !self.pinned_pattern {
            self.pattern = PromptPattern::build(literal);
        }
    }
}

/// Sleep one poll interval, waking early on cancellation.
async fn pause(cancel: &CancellationToken, interval: Duration) {
    tokio::select! {
        _ = cancel.cancelled() => {}
        _ = tokio::time::sleep(interval) => {}
    }
}
