//! Wall-clock measurement for jobs and individual operations.

use std::time::{Duration, Instant};

/// A simple wall-clock stopwatch.
///
/// Start it, do the work, stop it. Stopping twice keeps the first stop, so a
/// `Timer` that is read after completion always reports the same duration.
///
/// # Example
///
/// ```rust
/// use binfra_core::Timer;
///
/// let mut timer = Timer::start();
/// // ... work ...
/// let taken = timer.stop();
/// assert_eq!(timer.seconds(), taken.as_secs_f64());
/// ```
#[derive(Debug, Clone)]
pub struct Timer {
    started: Instant,
    stopped: Option<Instant>,
}

impl Timer {
    /// Start a new timer.
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
            stopped: None,
        }
    }

    /// Stop the timer and return the elapsed duration.
    ///
    /// If the timer was already stopped, the original duration is returned.
    pub fn stop(&mut self) -> Duration {
        let stopped = *self.stopped.get_or_insert_with(Instant::now);
        stopped - self.started
    }

    /// Elapsed time: up to the stop point if stopped, otherwise up to now.
    pub fn elapsed(&self) -> Duration {
        match self.stopped {
            Some(stopped) => stopped - self.started,
            None => self.started.elapsed(),
        }
    }

    /// Elapsed time in fractional seconds.
    pub fn seconds(&self) -> f64 {
        self.elapsed().as_secs_f64()
    }

    /// Elapsed time in fractional minutes.
    pub fn minutes(&self) -> f64 {
        self.seconds() / 60.0
    }
}

/// Run a closure and return its result together with the time it took.
pub fn timed<T>(f: impl FnOnce() -> T) -> (T, Duration) {
    let start = Instant::now();
    let result = f();
    (result, start.elapsed())
}
