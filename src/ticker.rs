use std::time::{Duration, Instant};

use crate::clock::{asctime, Clock};
use crate::journal::Journal;
use crate::signal::{Lifecycle, State, Wait, Wake};

/// Time between two records.
pub const LOG_INTERVAL: Duration = Duration::from_secs(1);

/// How the time loop ended.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Halt {
    /// SIGTERM was received and logged.
    Terminated,
    /// The waiter stopped delivering wake-ups. Never expected in practice.
    Lost,
}

/// Writes the current time to the journal once per [`LOG_INTERVAL`], until SIGTERM.
#[derive(Debug)]
pub struct TimeLogger<C> {
    clock: C,
    lifecycle: Lifecycle,
}

impl<C: Clock> TimeLogger<C> {
    pub fn new(clock: C) -> Self {
        TimeLogger {
            clock,
            lifecycle: Lifecycle::new(),
        }
    }

    pub fn run<J: Journal, W: Wait>(&mut self, journal: &mut J, waiter: &mut W) -> Halt {
        loop {
            let now = self.clock.now();
            journal.info(&format!("Current system time is: {}", asctime(&now)));

            let deadline = Instant::now() + LOG_INTERVAL;
            loop {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining == Duration::from_secs(0) {
                    break;
                }
                match waiter.wait(remaining) {
                    Wake::Elapsed => break,
                    Wake::Signal(signal) => {
                        if self.lifecycle.on_signal(signal, journal) == State::Stopping {
                            return Halt::Terminated;
                        }
                    }
                    Wake::Closed => return Halt::Lost,
                }
            }
        }
    }
}
