//! Wall-clock time limiting for single call attempts
//!
//! The limiter races an operation against a deadline: the operation runs on
//! its own thread and the caller waits on a channel for whichever happens
//! first. Time limiting is independent of breaker state; the engine composes
//! the two.

use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

/// Outcome of one time-limited call attempt
#[derive(Debug)]
pub enum LimitedCall<T, E> {
    /// The operation finished before the deadline
    Completed { result: Result<T, E>, duration: f64 },
    /// The deadline elapsed first; the operation was abandoned
    TimedOut { limit_secs: f64 },
    /// The operation panicked instead of returning
    Panicked { duration: f64 },
}

/// Bounds the wall-clock duration of a single call attempt
#[derive(Debug, Clone, Copy)]
pub struct TimeLimiter {
    limit_secs: f64,
}

impl TimeLimiter {
    pub fn new(limit_secs: f64) -> Self {
        Self { limit_secs }
    }

    /// Configured limit in seconds
    pub fn limit_secs(&self) -> f64 {
        self.limit_secs
    }

    /// Run `op`, resolving as `TimedOut` if the deadline elapses first
    ///
    /// Abandonment is best-effort: a timed-out operation keeps running on
    /// its detached thread, and its eventual completion lands in a dead
    /// channel without ever blocking the caller. Durations are measured on
    /// the worker, so recorded outcomes follow completion order.
    pub fn run<T, E, F>(&self, op: F) -> LimitedCall<T, E>
    where
        F: FnOnce() -> Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        let started = Instant::now();

        thread::spawn(move || {
            let result = op();
            let _ = tx.send((result, started.elapsed().as_secs_f64()));
        });

        match rx.recv_timeout(Duration::from_secs_f64(self.limit_secs)) {
            Ok((result, duration)) => LimitedCall::Completed { result, duration },
            Err(mpsc::RecvTimeoutError::Timeout) => LimitedCall::TimedOut {
                limit_secs: self.limit_secs,
            },
            // The worker dropped its sender without sending: the op unwound
            Err(mpsc::RecvTimeoutError::Disconnected) => LimitedCall::Panicked {
                duration: started.elapsed().as_secs_f64(),
            },
        }
    }
}
