//!
//! A small stopwatch used to pace node loops.
//!
//! Active nodes perform one unit of work and then wait out the rest of
//! their loop period.  The Timer measures how long the unit of work took
//! so the remaining wait can be computed.
//!

use std::{thread, time::Duration};

use quanta::{Clock, Instant};

/// Stopwatch backed by the quanta high-precision clock.
#[derive(Debug, Clone)]
pub struct Timer {
    /// The quanta clock
    clock: Clock,
    /// The instant the timer was (re)started
    start: Instant,
    /// Whether the timer is currently running
    running: bool,
    /// Time accumulated when the timer was last stopped
    time_passed: Duration,
}

impl Timer {
    /// Create a stopped timer
    pub fn new() -> Self {
        let clock = Clock::new();
        let start = clock.now();
        Self {
            clock,
            start,
            running: false,
            time_passed: Duration::ZERO,
        }
    }

    /// Start the timer from the current instant unless it is already
    /// running.
    pub fn start(&mut self) {
        if !self.running {
            self.reset();
        }
    }

    /// Restart the timer from the current instant.
    pub fn reset(&mut self) {
        self.start = self.clock.now();
        self.time_passed = Duration::ZERO;
        self.running = true;
    }

    /// Stop the timer, freezing the time passed so far.
    pub fn stop(&mut self) {
        if self.running {
            self.time_passed = self.clock.now().duration_since(self.start);
            self.running = false;
        }
    }

    /// Whether the timer is running
    pub fn started(&self) -> bool {
        self.running
    }

    /// Time passed since the timer was started
    pub fn time_passed(&self) -> Duration {
        if self.running {
            self.clock.now().duration_since(self.start)
        } else {
            self.time_passed
        }
    }

    /// Time remaining until the timer reaches `target` (zero if it
    /// already has)
    pub fn time_until(&self, target: Duration) -> Duration {
        target.saturating_sub(self.time_passed())
    }

    /// Sleep the current thread until the timer reaches `target`.
    pub fn sleep_until(&self, target: Duration) {
        let remaining = self.time_until(target);
        if !remaining.is_zero() {
            thread::sleep(remaining);
        }
    }

    /// Whether the timer is running and has reached `target`
    pub fn time_reached(&self, target: Duration) -> bool {
        self.running && self.time_passed() >= target
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}
