//! Liveness Watchdog
//!
//! A rolling deadline on the foreground. Every output event pushes the
//! deadline out; if it passes, the watchdog switches to prompting and stays
//! there until the user answers, so a silent session produces exactly one
//! prompt. Only silence is detected: a session that keeps printing is never
//! considered stuck, however slow it is.
//!
//! The watchdog holds no timer of its own. The plugin loop sleeps until
//! [`Watchdog::deadline`] and then calls [`Watchdog::fire`]. Time comes from
//! `tokio::time`, which lets tests pause and advance the clock.

use std::time::Duration;

use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchdogState {
    /// No session to watch
    Disarmed,
    /// Waiting for the deadline
    Armed { deadline: Instant },
    /// Confirmation shown; the timer is paused
    Prompting,
}

#[derive(Debug, Clone)]
pub struct Watchdog {
    threshold: Duration,
    state: WatchdogState,
}

impl Watchdog {
    pub fn new(threshold: Duration) -> Self {
        Self {
            threshold,
            state: WatchdogState::Disarmed,
        }
    }

    pub fn threshold(&self) -> Duration {
        self.threshold
    }

    pub fn state(&self) -> WatchdogState {
        self.state
    }

    pub fn is_prompting(&self) -> bool {
        self.state == WatchdogState::Prompting
    }

    /// Deadline to sleep until, if armed
    pub fn deadline(&self) -> Option<Instant> {
        match self.state {
            WatchdogState::Armed { deadline } => Some(deadline),
            _ => None,
        }
    }

    /// Schedule a fresh deadline for a newly created session. A prompt still
    /// open was about the old session, so it is closed and any later answer
    /// to it is ignored.
    pub fn rearm(&mut self) {
        if self.is_prompting() {
            debug!("Closing watchdog prompt for a replaced session");
        }
        self.state = WatchdogState::Armed {
            deadline: Instant::now() + self.threshold,
        };
    }

    /// Push the deadline out after an output event. Ignored unless armed.
    pub fn reset(&mut self) {
        if let WatchdogState::Armed { .. } = self.state {
            self.state = WatchdogState::Armed {
                deadline: Instant::now() + self.threshold,
            };
        }
    }

    /// Switch to prompting if the deadline has passed. Returns `true` exactly
    /// once per scheduling.
    pub fn fire(&mut self, now: Instant) -> bool {
        match self.state {
            WatchdogState::Armed { deadline } if now >= deadline => {
                warn!(
                    "No output from session for {:?}, asking whether to terminate",
                    self.threshold
                );
                self.state = WatchdogState::Prompting;
                true
            }
            _ => false,
        }
    }

    /// The user answered the prompt, whichever way. The timer restarts from
    /// now.
    pub fn resolve(&mut self) {
        if self.is_prompting() {
            self.state = WatchdogState::Armed {
                deadline: Instant::now() + self.threshold,
            };
        }
    }

    pub fn disarm(&mut self) {
        self.state = WatchdogState::Disarmed;
    }
}
