//! Session configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::channel::DEFAULT_TAB_SIZE;
use crate::channel::patterns::DEFAULT_SEARCH_DEPTH;
use crate::error::{Result, SessionError};

/// Default pager dismissal cap.
pub const DEFAULT_MAX_PAGES: u32 = 50_000;

/// Configuration for a [`ShellSession`](super::ShellSession).
///
/// Durations serialize as integer milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Connection timeout, carried for the transport layer.
    #[serde(with = "millis")]
    pub connect_timeout: Duration,

    /// Overall bound for one command.
    #[serde(with = "millis")]
    pub command_timeout: Duration,

    /// Give up when no data arrives for this long.
    #[serde(with = "millis")]
    pub idle_timeout: Duration,

    /// Sleep between read-loop polls.
    #[serde(with = "millis")]
    pub poll_interval: Duration,

    /// Bound for the initial prompt read.
    #[serde(with = "millis")]
    pub initial_prompt_timeout: Duration,

    /// Silence required after a heuristic prompt match before it is trusted.
    #[serde(with = "millis")]
    pub quiet_period: Duration,

    /// Silence after which a fallback prompt check runs once.
    #[serde(with = "millis")]
    pub idle_recheck: Duration,

    /// Maximum number of pager pages dismissed per command.
    pub max_pages: u32,

    /// Keystroke sent to dismiss a pager.
    pub pager_continue: String,

    /// Line terminator written after each command.
    pub newline: String,

    /// Normalizer tab stop width.
    pub tab_size: usize,

    /// Tail window, in bytes, examined by prompt checks.
    pub search_depth: usize,

    /// Emit [`SessionEvent::Debug`](super::SessionEvent::Debug) events.
    pub debug: bool,

    /// Substrings that mark a command's output as failed.
    pub failure_patterns: Vec<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            command_timeout: Duration::from_secs(60),
            idle_timeout: Duration::from_secs(10),
            poll_interval: Duration::from_millis(50),
            initial_prompt_timeout: Duration::from_secs(30),
            quiet_period: Duration::from_millis(150),
            idle_recheck: Duration::from_secs(1),
            max_pages: DEFAULT_MAX_PAGES,
            pager_continue: " ".to_string(),
            newline: "\n".to_string(),
            tab_size: DEFAULT_TAB_SIZE,
            search_depth: DEFAULT_SEARCH_DEPTH,
            debug: false,
            failure_patterns: Vec::new(),
        }
    }
}

impl SessionConfig {
    /// Reject settings the read loop cannot run with.
    pub fn validate(&self) -> Result<()> {
        let invalid = |message: &str| -> Result<()> {
            Err(SessionError::InvalidConfig {
                message: message.to_string(),
            }
            .into())
        };

        if self.poll_interval.is_zero() {
            return invalid("poll_interval must be greater than zero");
        }
        if self.command_timeout.is_zero() || self.idle_timeout.is_zero() {
            return invalid("command_timeout and idle_timeout must be greater than zero");
        }
        if self.tab_size == 0 {
            return invalid("tab_size must be greater than zero");
        }
        if self.search_depth == 0 {
            return invalid("search_depth must be greater than zero");
        }
        if self.newline.is_empty() {
            return invalid("newline must not be empty");
        }
        Ok(())
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis().min(u64::MAX as u128) as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.command_timeout, Duration::from_secs(60));
        assert_eq!(config.idle_timeout, Duration::from_secs(10));
        assert_eq!(config.poll_interval, Duration::from_millis(50));
        assert_eq!(config.initial_prompt_timeout, Duration::from_secs(30));
        assert_eq!(config.max_pages, 50_000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: SessionConfig =
            serde_json::from_str(r#"{"idle_timeout": 2500, "debug": true}"#).unwrap();
        assert_eq!(config.idle_timeout, Duration::from_millis(2500));
        assert!(config.debug);
        assert_eq!(config.command_timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_serializes_millis() {
        let json = serde_json::to_value(SessionConfig::default()).unwrap();
        assert_eq!(json["poll_interval"], 50);
        assert_eq!(json["quiet_period"], 150);
    }

    #[test]
    fn test_validate_rejects_zero_poll() {
        let config = SessionConfig {
            poll_interval: Duration::ZERO,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
