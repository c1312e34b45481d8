//! Read loop state machine.
//!
//! ```text
//! AwaitingData --chunk--> { PagerContinue | PotentialPrompt | AwaitingData | Confirmed }
//! PotentialPrompt --quiet period--> Confirmed | AwaitingData (recheck failed)
//! PotentialPrompt --more data--> re-evaluated from scratch
//! any --bounds exceeded--> CommandTimeout | IdleTimeout
//! ```
//!
//! This type only decides; the session performs the I/O and the prompt
//! checks and reports back.

use std::time::{Duration, Instant};

use super::config::SessionConfig;
use super::response::Completion;

/// Phase of the loop between chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// Waiting for more output.
    AwaitingData,

    /// The tail looked like a prompt at `since`; waiting for the quiet period.
    PotentialPrompt { since: Instant },
}

/// Outcome of processing one chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkVerdict {
    /// A pager banner was dismissed.
    PagerContinue,

    /// The tail is prompt-like but did not match the active pattern.
    PotentialPrompt,

    /// Nothing prompt-like at the tail.
    AwaitingData,
}

/// What the session should do on a poll with no data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdleAction {
    /// Quiet period elapsed: re-check the pending prompt and confirm it.
    ConfirmPotential,

    /// Broader idle period elapsed with nothing pending: one last heuristic check.
    FallbackCheck,

    /// Stop with this completion.
    Finish(Completion),

    /// Keep polling.
    Wait,
}

/// Timing state for one command.
#[derive(Debug)]
pub struct ReadLoop {
    started: Instant,
    last_data: Instant,
    state: LoopState,
    fallback_checked: bool,
    command_timeout: Duration,
    idle_timeout: Duration,
    quiet_period: Duration,
    idle_recheck: Duration,
}

impl ReadLoop {
    /// Start timing a command sent at `started`.
    pub fn new(started: Instant, config: &SessionConfig) -> Self {
        Self {
            started,
            last_data: started,
            state: LoopState::AwaitingData,
            fallback_checked: false,
            command_timeout: config.command_timeout,
            idle_timeout: config.idle_timeout,
            quiet_period: config.quiet_period,
            idle_recheck: config.idle_recheck,
        }
    }

    /// Current phase.
    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Record a processed chunk. New data always cancels a pending prompt;
    /// a prompt-like tail starts a fresh quiet period.
    pub fn on_chunk(&mut self, now: Instant, verdict: ChunkVerdict) {
        self.last_data = now;
        self.fallback_checked = false;
        self.state = match verdict {
            ChunkVerdict::PotentialPrompt => LoopState::PotentialPrompt { since: now },
            ChunkVerdict::PagerContinue | ChunkVerdict::AwaitingData => LoopState::AwaitingData,
        };
    }

    /// The pending prompt did not survive its re-check.
    pub fn reject_potential(&mut self) {
        self.state = LoopState::AwaitingData;
    }

    /// Whether the overall command timeout has elapsed.
    pub fn command_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.started) >= self.command_timeout
    }

    /// Decide what to do on a poll that found no data.
    pub fn on_idle(&mut self, now: Instant) -> IdleAction {
        if let LoopState::PotentialPrompt { since } = self.state {
            if now.saturating_duration_since(since) >= self.quiet_period {
                return IdleAction::ConfirmPotential;
            }
        }

        if self.command_expired(now) {
            return IdleAction::Finish(Completion::CommandTimeout);
        }

        let silent = now.saturating_duration_since(self.last_data);
        if self.state == LoopState::AwaitingData
            && !self.fallback_checked
            && silent >= self.idle_recheck
        {
            self.fallback_checked = true;
            return IdleAction::FallbackCheck;
        }

        if silent >= self.idle_timeout {
            return IdleAction::Finish(Completion::IdleTimeout);
        }

        IdleAction::Wait
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SessionConfig {
        SessionConfig {
            command_timeout: Duration::from_secs(60),
            idle_timeout: Duration::from_secs(10),
            quiet_period: Duration::from_millis(150),
            idle_recheck: Duration::from_secs(1),
            ..Default::default()
        }
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_potential_prompt_confirmed_after_quiet_period() {
        let t0 = Instant::now();
        let mut rl = ReadLoop::new(t0, &config());

        rl.on_chunk(t0 + ms(10), ChunkVerdict::PotentialPrompt);
        assert_eq!(rl.state(), LoopState::PotentialPrompt { since: t0 + ms(10) });
        assert_eq!(rl.on_idle(t0 + ms(100)), IdleAction::Wait);
        assert_eq!(rl.on_idle(t0 + ms(160)), IdleAction::ConfirmPotential);
    }

    #[test]
    fn test_more_data_cancels_potential() {
        let t0 = Instant::now();
        let mut rl = ReadLoop::new(t0, &config());

        rl.on_chunk(t0 + ms(10), ChunkVerdict::PotentialPrompt);
        rl.on_chunk(t0 + ms(100), ChunkVerdict::AwaitingData);
        assert_eq!(rl.state(), LoopState::AwaitingData);
        assert_eq!(rl.on_idle(t0 + ms(300)), IdleAction::Wait);
    }

    #[test]
    fn test_repeated_potential_restarts_quiet_period() {
        let t0 = Instant::now();
        let mut rl = ReadLoop::new(t0, &config());

        rl.on_chunk(t0, ChunkVerdict::PotentialPrompt);
        rl.on_chunk(t0 + ms(100), ChunkVerdict::PotentialPrompt);
        assert_eq!(rl.on_idle(t0 + ms(200)), IdleAction::Wait);
        assert_eq!(rl.on_idle(t0 + ms(250)), IdleAction::ConfirmPotential);
    }

    #[test]
    fn test_fallback_check_runs_once_per_silence() {
        let t0 = Instant::now();
        let mut rl = ReadLoop::new(t0, &config());

        assert_eq!(rl.on_idle(t0 + ms(999)), IdleAction::Wait);
        assert_eq!(rl.on_idle(t0 + ms(1000)), IdleAction::FallbackCheck);
        assert_eq!(rl.on_idle(t0 + ms(1050)), IdleAction::Wait);

        rl.on_chunk(t0 + ms(2000), ChunkVerdict::AwaitingData);
        assert_eq!(rl.on_idle(t0 + ms(3000)), IdleAction::FallbackCheck);
    }

    #[test]
    fn test_idle_timeout() {
        let t0 = Instant::now();
        let mut rl = ReadLoop::new(t0, &config());

        rl.on_chunk(t0 + ms(5), ChunkVerdict::AwaitingData);
        assert_eq!(rl.on_idle(t0 + ms(1100)), IdleAction::FallbackCheck);
        assert_eq!(rl.on_idle(t0 + ms(10_004)), IdleAction::Wait);
        assert_eq!(
            rl.on_idle(t0 + ms(10_005)),
            IdleAction::Finish(Completion::IdleTimeout)
        );
    }

    #[test]
    fn test_command_timeout_despite_steady_data() {
        let t0 = Instant::now();
        let mut rl = ReadLoop::new(t0, &config());

        rl.on_chunk(t0 + ms(59_990), ChunkVerdict::AwaitingData);
        assert!(!rl.command_expired(t0 + ms(59_999)));
        assert!(rl.command_expired(t0 + ms(60_000)));
        assert_eq!(
            rl.on_idle(t0 + ms(60_000)),
            IdleAction::Finish(Completion::CommandTimeout)
        );
    }

    #[test]
    fn test_rejected_potential_returns_to_awaiting() {
        let t0 = Instant::now();
        let mut rl = ReadLoop::new(t0, &config());

        rl.on_chunk(t0, ChunkVerdict::PotentialPrompt);
        assert_eq!(rl.on_idle(t0 + ms(150)), IdleAction::ConfirmPotential);
        rl.reject_potential();
        assert_eq!(rl.state(), LoopState::AwaitingData);
    }

    #[test]
    fn test_pager_continue_resets_idle() {
        let t0 = Instant::now();
        let mut rl = ReadLoop::new(t0, &config());

        rl.on_chunk(t0 + ms(9_000), ChunkVerdict::PagerContinue);
        assert_eq!(rl.state(), LoopState::AwaitingData);
        assert_ne!(
            rl.on_idle(t0 + ms(10_500)),
            IdleAction::Finish(Completion::IdleTimeout)
        );
    }
}
