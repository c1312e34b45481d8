//! Error types for shellpilot.
//!
//! Soft failures (command/idle timeouts, cancellation during `execute`) are
//! not errors; they are reported through [`Completion`](crate::session::Completion).

use std::io;
use thiserror::Error;

/// Main error type for shellpilot operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Faults raised by the underlying byte stream
    #[error("Stream error: {0}")]
    Stream(#[from] StreamError),

    /// Session lifecycle errors
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// Pattern compilation errors
    #[error("Pattern error: {0}")]
    Pattern(#[from] PatternError),
}

/// Stream faults. These are propagated to the caller unmodified; the session
/// never retries or reconnects.
#[derive(Error, Debug)]
pub enum StreamError {
    /// I/O error on the underlying stream
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// SSH protocol error on the channel
    #[error("Channel SSH error: {0}")]
    Ssh(#[from] russh::Error),

    /// The remote side closed the stream
    #[error("Stream closed by peer")]
    Closed,
}

/// Session lifecycle errors.
#[derive(Error, Debug)]
pub enum SessionError {
    /// `execute` was called before `initialize`
    #[error("Session not initialized - call initialize() first")]
    NotInitialized,

    /// No prompt could be found, not even a non-empty fallback line
    #[error("No prompt received within {0:?}")]
    NoPrompt(std::time::Duration),

    /// The stop signal fired while initializing
    #[error("Session cancelled")]
    Cancelled,

    /// Invalid configuration in the session builder
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },
}

/// Pattern errors.
#[derive(Error, Debug)]
pub enum PatternError {
    /// Invalid regex pattern
    #[error("Invalid regex pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}

/// Result type alias using shellpilot's Error.
pub type Result<T> = std::result::Result<T, Error>;
