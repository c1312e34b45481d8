//! Shell session layer.
//!
//! A [`ShellSession`] owns one [`ShellStream`](crate::transport::ShellStream)
//! and runs the read loop: write a command, accumulate output, dismiss pagers,
//! and stop once the prompt is confirmed or a bound is exceeded.

mod builder;
mod config;
mod events;
mod read_loop;
mod response;
mod shell;
mod vars;

pub use builder::SessionBuilder;
pub use config::{DEFAULT_MAX_PAGES, SessionConfig};
pub use events::{SessionEvent, SessionEvents};
pub use read_loop::{ChunkVerdict, IdleAction, LoopState, ReadLoop};
pub use response::{BatchOutput, Completion, Response};
pub use shell::ShellSession;
pub use vars::{is_skippable_line, substitute_variables};

use std::collections::HashMap;
use std::future::Future;

use log::info;

use crate::error::Result;
use crate::transport::ShellStream;

/// Something that runs commands against a shell and waits for its prompt.
pub trait Executor: Send {
    /// Send a command and wait for the prompt.
    fn execute(&mut self, command: &str) -> impl Future<Output = Result<Response>> + Send;

    /// Run commands in order.
    ///
    /// Blank lines and comments are skipped and `${name}` placeholders are
    /// filled from `variables`. The batch stops early after a cancelled
    /// command; other soft completions (timeouts, page limit) do not stop it.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use std::collections::HashMap;
    /// use shellpilot::session::Executor;
    ///
    /// # async fn example(session: &mut impl Executor) -> Result<(), shellpilot::Error> {
    /// let vars = HashMap::from([("iface".to_string(), "Gi0/1".to_string())]);
    /// let batch = session
    ///     .execute_batch(&["# interfaces", "show interface ${iface}"], &vars)
    ///     .await?;
    /// println!("{}", batch.combined());
    /// # Ok(())
    /// # }
    /// ```
    fn execute_batch(
        &mut self,
        commands: &[&str],
        variables: &HashMap<String, String>,
    ) -> impl Future<Output = Result<BatchOutput>> + Send {
        async move {
            let mut batch = BatchOutput::default();
            for line in commands {
                if is_skippable_line(line) {
                    continue;
                }

                let command = substitute_variables(line.trim(), variables);
                let response = self.execute(&command).await?;
                let cancelled = response.completion == Completion::Cancelled;
                batch.responses.push(response);

                if cancelled {
                    info!("batch stopped after {} commands", batch.responses.len());
                    break;
                }
            }
            Ok(batch)
        }
    }

    /// The prompt the executor currently expects.
    fn current_prompt(&self) -> &str;
}

impl<S: ShellStream> Executor for ShellSession<S> {
    fn execute(&mut self, command: &str) -> impl Future<Output = Result<Response>> + Send {
        ShellSession::execute(self, command)
    }

    fn current_prompt(&self) -> &str {
        self.prompt()
    }
}
