//! # Shellpilot
//!
//! Async engine for driving interactive shells on network devices and
//! servers.
//!
//! Shellpilot sends commands to a remote shell over any duplex stream and
//! decides when each command is finished by recognising the shell prompt in
//! the output, even when that output is full of terminal control sequences.
//!
//! ## Features
//!
//! - Terminal output normalization (carriage returns, backspaces, tabs,
//!   erase-line and cursor-movement escapes) via vte
//! - Prompt detection with a pattern derived from the initial prompt and a
//!   heuristic fallback confirmed by a quiet period
//! - Automatic pager dismissal (`--More--`)
//! - Soft command and idle timeouts, cooperative cancellation
//! - Live output events, batches with `${name}` substitution
//! - Transports for russh channels and tokio I/O objects
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use shellpilot::{IoStream, SessionBuilder};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), shellpilot::Error> {
//!     let socket = tokio::net::TcpStream::connect("192.168.1.1:2001")
//!         .await
//!         .map_err(shellpilot::error::StreamError::Io)?;
//!
//!     let mut session = SessionBuilder::new().build(IoStream::new(socket))?;
//!     let prompt = session.initialize().await?;
//!     println!("connected at {}", prompt);
//!
//!     let response = session.execute("show version").await?;
//!     println!("{}", response.output());
//!     Ok(())
//! }
//! ```

pub mod channel;
pub mod error;
pub mod session;
pub mod transport;

// Re-export main types for convenience
pub use channel::{PromptPattern, TerminalNormalizer, is_likely_prompt, normalize};
pub use error::Error;
pub use session::{
    BatchOutput, Completion, Executor, Response, SessionBuilder, SessionConfig, SessionEvent,
    ShellSession,
};
pub use transport::{IoStream, ShellStream, SshChannelStream};
