//! Builder for creating shell sessions.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use super::config::SessionConfig;
use super::shell::ShellSession;
use crate::channel::PromptPattern;
use crate::error::Result;
use crate::transport::ShellStream;

/// Builder for constructing shell sessions.
///
/// # Example
///
/// ```rust,no_run
/// use std::time::Duration;
/// use shellpilot::{IoStream, SessionBuilder};
///
/// # async fn example() -> Result<(), shellpilot::Error> {
/// let socket = tokio::net::TcpStream::connect("192.168.1.1:2001")
///     .await
///     .map_err(shellpilot::error::StreamError::Io)?;
///
/// let mut session = SessionBuilder::new()
///     .command_timeout(Duration::from_secs(120))
///     .failure_pattern("% Invalid input")
///     .build(IoStream::new(socket))?;
///
/// session.initialize().await?;
/// let response = session.execute("show version").await?;
/// println!("{}", response.output());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct SessionBuilder {
    config: SessionConfig,
    cancel: Option<CancellationToken>,
    prompt_pattern: Option<String>,
}

impl SessionBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing configuration.
    pub fn config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the connection timeout (carried for the transport layer).
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// Set the per-command timeout.
    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.config.command_timeout = timeout;
        self
    }

    /// Set the no-data timeout.
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.config.idle_timeout = timeout;
        self
    }

    /// Set the poll interval.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.config.poll_interval = interval;
        self
    }

    /// Set the initial prompt timeout.
    pub fn initial_prompt_timeout(mut self, timeout: Duration) -> Self {
        self.config.initial_prompt_timeout = timeout;
        self
    }

    /// Set the quiet period required after a heuristic prompt match.
    pub fn quiet_period(mut self, period: Duration) -> Self {
        self.config.quiet_period = period;
        self
    }

    /// Set the silence after which the fallback prompt check runs.
    pub fn idle_recheck(mut self, period: Duration) -> Self {
        self.config.idle_recheck = period;
        self
    }

    /// Set the pager dismissal cap.
    pub fn max_pages(mut self, pages: u32) -> Self {
        self.config.max_pages = pages;
        self
    }

    /// Set the keystroke that dismisses a pager.
    pub fn pager_continue(mut self, keys: impl Into<String>) -> Self {
        self.config.pager_continue = keys.into();
        self
    }

    /// Set the line terminator written after commands.
    pub fn newline(mut self, newline: impl Into<String>) -> Self {
        self.config.newline = newline.into();
        self
    }

    /// Set the tab stop width.
    pub fn tab_size(mut self, size: usize) -> Self {
        self.config.tab_size = size;
        self
    }

    /// Set the prompt lookback window in bytes.
    pub fn search_depth(mut self, depth: usize) -> Self {
        self.config.search_depth = depth;
        self
    }

    /// Emit debug events.
    pub fn debug(mut self, debug: bool) -> Self {
        self.config.debug = debug;
        self
    }

    /// Add a failure pattern.
    pub fn failure_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.config.failure_patterns.push(pattern.into());
        self
    }

    /// Share a stop signal with the caller.
    pub fn cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Pin the prompt pattern to a regex instead of deriving it from the
    /// detected prompt. Mode changes then update the literal only.
    pub fn prompt_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.prompt_pattern = Some(pattern.into());
        self
    }

    /// Build a session around `stream`.
    ///
    /// This validates the configuration but does not touch the stream; call
    /// `initialize()` on the returned session.
    pub fn build<S: ShellStream>(self, stream: S) -> Result<ShellSession<S>> {
        self.config.validate()?;

        let pinned = match self.prompt_pattern {
            Some(pattern) => Some(PromptPattern::custom(&pattern)?),
            None => None,
        };

        Ok(ShellSession::from_parts(
            stream,
            self.config,
            self.cancel.unwrap_or_default(),
            pinned,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::IoStream;

    #[tokio::test]
    async fn test_build_applies_settings() {
        let (client, _server) = tokio::io::duplex(64);
        let token = CancellationToken::new();

        let session = SessionBuilder::new()
            .command_timeout(Duration::from_secs(5))
            .idle_timeout(Duration::from_secs(2))
            .failure_pattern("% Invalid")
            .cancel_token(token.clone())
            .build(IoStream::new(client))
            .unwrap();

        assert_eq!(session.config().command_timeout, Duration::from_secs(5));
        assert_eq!(session.config().idle_timeout, Duration::from_secs(2));
        assert_eq!(session.config().failure_patterns, vec!["% Invalid".to_string()]);
        assert!(!session.is_initialized());

        token.cancel();
        assert!(session.cancel_token().is_cancelled());
    }

    #[tokio::test]
    async fn test_build_rejects_invalid_config() {
        let (client, _server) = tokio::io::duplex(64);
        let result = SessionBuilder::new()
            .tab_size(0)
            .build(IoStream::new(client));
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_build_with_pinned_pattern() {
        let (client, _server) = tokio::io::duplex(64);
        let session = SessionBuilder::new()
            .prompt_pattern(r"RP/0/RSP0/CPU0:[\w-]+#")
            .build(IoStream::new(client))
            .unwrap();
        assert!(session.pattern().matches("RP/0/RSP0/CPU0:core-1#"));

        let (client, _server) = tokio::io::duplex(64);
        let result = SessionBuilder::new()
            .prompt_pattern("(")
            .build(IoStream::new(client));
        assert!(matches!(result, Err(crate::Error::Pattern(_))));
    }
}
