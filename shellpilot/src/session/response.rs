//! Response type for command execution results.

use std::fmt;
use std::time::Duration;

use crate::channel::patterns::last_non_empty_line;

/// How the read loop for a command ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// The prompt was confirmed.
    Prompt,

    /// The overall command timeout elapsed.
    CommandTimeout,

    /// No data arrived for the idle timeout.
    IdleTimeout,

    /// The pager was dismissed `max_pages` times.
    PageLimit,

    /// The stop signal was observed.
    Cancelled,
}

impl Completion {
    /// Whether the loop stopped because a bound was exceeded.
    pub fn is_timeout(self) -> bool {
        matches!(self, Self::CommandTimeout | Self::IdleTimeout)
    }
}

impl fmt::Display for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Prompt => "prompt",
            Self::CommandTimeout => "command timeout",
            Self::IdleTimeout => "idle timeout",
            Self::PageLimit => "page limit",
            Self::Cancelled => "cancelled",
        };
        f.write_str(text)
    }
}

/// Response from a command execution.
#[derive(Debug, Clone)]
pub struct Response {
    /// The command that was sent.
    pub command: String,

    /// Normalized text between sending the command and the end of the read
    /// loop, including the command echo and the trailing prompt.
    pub result: String,

    /// The session prompt when the command finished.
    pub prompt: String,

    /// Time taken to execute the command.
    pub elapsed: Duration,

    /// How the read loop ended.
    pub completion: Completion,

    /// Number of pager pages dismissed.
    pub pages: u32,

    /// The configured failure pattern found in the result, if any.
    pub failure_message: Option<String>,
}

impl Response {
    /// Whether the prompt was confirmed and no failure pattern matched.
    pub fn is_success(&self) -> bool {
        self.completion == Completion::Prompt && self.failure_message.is_none()
    }

    /// Whether the command ended on a soft timeout.
    pub fn timed_out(&self) -> bool {
        self.completion.is_timeout()
    }

    /// The result with the command echo and the trailing prompt line removed.
    pub fn output(&self) -> &str {
        let command = self.command.trim();
        let mut output = self.result.as_str();

        if let Some(first_break) = output.find('\n') {
            if !command.is_empty() && output[..first_break].trim_end().ends_with(command) {
                output = &output[first_break + 1..];
            }
        }

        if self.completion == Completion::Prompt {
            if let Some(prompt_line) = last_non_empty_line(output) {
                if let Some(pos) = output.rfind(prompt_line) {
                    output = &output[..pos];
                }
            }
        }

        output.trim_end_matches(['\r', '\n'])
    }

    /// Get the output lines as an iterator.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.output().lines()
    }

    /// Check if the result contains a substring.
    pub fn contains(&self, pattern: &str) -> bool {
        self.result.contains(pattern)
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.result)
    }
}

/// Responses from a batch, in execution order.
#[derive(Debug, Clone, Default)]
pub struct BatchOutput {
    /// One response per executed command.
    pub responses: Vec<Response>,
}

impl BatchOutput {
    /// All results concatenated.
    pub fn combined(&self) -> String {
        self.responses.iter().map(|r| r.result.as_str()).collect()
    }

    /// Whether every command confirmed its prompt without a failure pattern.
    pub fn is_success(&self) -> bool {
        self.responses.iter().all(Response::is_success)
    }

    /// Whether the batch stopped early on the stop signal.
    pub fn was_cancelled(&self) -> bool {
        self.responses
            .last()
            .is_some_and(|r| r.completion == Completion::Cancelled)
    }
}
