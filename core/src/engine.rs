//! Execution engine composing time limiting, circuit breaking and fallback
//!
//! `Engine::run` is the single execution entry point: ask the breaker for
//! permission, run the operation under the policy's time limit, record the
//! classified outcome, and hand any failure to the caller's fallback.

use crate::{
    OutcomeKind,
    circuit::{Breaker, Permission},
    errors::{FailureCause, RunError},
    limiter::{LimitedCall, TimeLimiter},
    registry::Policy,
};
use std::sync::Arc;
use tracing::warn;

/// Executes operations under one named policy
///
/// Engines are cheap handles: every engine obtained from a registry for the
/// same policy name shares one breaker and therefore one failure history.
#[derive(Clone)]
pub struct Engine {
    breaker: Arc<Breaker>,
    limiter: TimeLimiter,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("breaker", &self.breaker.name())
            .field("limiter", &self.limiter)
            .finish()
    }
}

impl Engine {
    /// Standalone engine backed by its own private breaker
    pub fn new(policy: &Policy) -> Self {
        Self::with_breaker(policy.create_breaker())
    }

    pub(crate) fn with_breaker(breaker: Arc<Breaker>) -> Self {
        let limiter = TimeLimiter::new(breaker.config().call_timeout_secs);
        Self { breaker, limiter }
    }

    /// The breaker backing this engine
    pub fn breaker(&self) -> &Breaker {
        &self.breaker
    }

    /// Run `operation` under the policy, falling back on any failure
    ///
    /// Returns the operation's own value when it succeeds in time, the
    /// fallback's value when the operation fails, times out or is rejected,
    /// and an error only when the fallback itself fails. The operation
    /// executes outside the breaker lock and blocks the caller for at most
    /// the policy's call timeout.
    pub fn run<T, E, F, FB>(&self, operation: F, fallback: FB) -> Result<T, RunError<E>>
    where
        F: FnOnce() -> Result<T, E> + Send + 'static,
        FB: FnOnce(FailureCause<E>) -> Result<T, E>,
        T: Send + 'static,
        E: Send + 'static,
    {
        let cause = match self.breaker.acquire() {
            Permission::Rejected { state } => FailureCause::Rejected {
                circuit: self.breaker.name().to_string(),
                state,
            },
            Permission::Admitted => match self.limiter.run(operation) {
                LimitedCall::Completed {
                    result: Ok(value),
                    duration,
                } => {
                    let kind = OutcomeKind::for_success(
                        duration,
                        self.breaker.config().slow_call_duration_secs,
                    );
                    self.breaker.record(kind, duration);
                    return Ok(value);
                }
                LimitedCall::Completed {
                    result: Err(error),
                    duration,
                } => {
                    self.breaker.record(OutcomeKind::Failure, duration);
                    FailureCause::Operation(error)
                }
                LimitedCall::TimedOut { limit_secs } => {
                    self.breaker.record(OutcomeKind::Failure, limit_secs);
                    FailureCause::Timeout { limit_secs }
                }
                LimitedCall::Panicked { duration } => {
                    self.breaker.record(OutcomeKind::Failure, duration);
                    FailureCause::Panicked
                }
            },
        };

        warn!(
            name = %self.breaker.name(),
            cause = cause.label(),
            "operation did not succeed, falling back"
        );

        fallback(cause).map_err(|error| RunError::Fallback {
            circuit: self.breaker.name().to_string(),
            error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PolicyBuilder;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    fn divide(a: i64, b: i64) -> Result<i64, String> {
        if b == 0 {
            return Err(format!("cannot divide {} by {}", a, b));
        }
        Ok(a / b)
    }

    #[test]
    fn test_divide_returns_the_operations_value() {
        let engine = Engine::new(&PolicyBuilder::new("divide").build());

        let result = engine.run(|| divide(10, 2), |_cause| Ok(0));

        assert_eq!(result.unwrap(), 5);
        assert!(engine.breaker().is_closed());
    }

    #[test]
    fn test_divide_by_zero_returns_the_fallback_value() {
        let engine = Engine::new(&PolicyBuilder::new("divide").build());

        let result = engine.run(
            || divide(10, 0),
            |cause| {
                assert!(matches!(cause, FailureCause::Operation(_)));
                Ok(0)
            },
        );

        assert_eq!(result.unwrap(), 0);
        assert!(engine.breaker().is_closed());
    }

    #[test]
    fn test_success_keeps_the_circuit_closed() {
        let engine = Engine::new(
            &PolicyBuilder::new("steady")
                .minimum_calls(2)
                .call_timeout_secs(5.0)
                .build(),
        );

        for i in 0..20 {
            let value = engine.run(move || Ok::<_, String>(i), |_cause| Ok(-1)).unwrap();
            assert_eq!(value, i);
        }

        assert!(engine.breaker().is_closed());
    }

    #[test]
    fn test_always_failing_operation_opens_by_the_fifth_call() {
        let engine = Engine::new(
            &PolicyBuilder::new("faulty")
                .failure_rate_threshold(50.0)
                .minimum_calls(4)
                .sliding_window_size(10)
                .open_wait_secs(60.0)
                .build(),
        );
        let invoked = Arc::new(AtomicUsize::new(0));

        for _ in 0..4 {
            let invoked = Arc::clone(&invoked);
            let result = engine.run(
                move || {
                    invoked.fetch_add(1, Ordering::SeqCst);
                    Err::<bool, _>("Runtime error".to_string())
                },
                |_cause| Ok(false),
            );
            assert!(!result.unwrap());
        }
        assert!(engine.breaker().is_open());
        assert_eq!(invoked.load(Ordering::SeqCst), 4);

        // Fifth call: rejected before the operation is ever invoked
        let counted = Arc::clone(&invoked);
        let result = engine.run(
            move || {
                counted.fetch_add(1, Ordering::SeqCst);
                Err::<bool, _>("Runtime error".to_string())
            },
            |cause| {
                assert!(matches!(cause, FailureCause::Rejected { .. }));
                Ok(false)
            },
        );
        assert!(!result.unwrap());
        assert_eq!(invoked.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn test_blocking_operation_times_out_and_counts_as_failure() {
        let engine = Engine::new(
            &PolicyBuilder::new("slowpoke")
                .call_timeout_secs(0.05)
                .minimum_calls(10)
                .build(),
        );

        let result = engine.run(
            || {
                thread::sleep(Duration::from_millis(250));
                Ok::<_, String>("too late")
            },
            |cause| {
                assert!(matches!(cause, FailureCause::Timeout { .. }));
                Ok("fallback")
            },
        );

        assert_eq!(result.unwrap(), "fallback");

        let log = engine.breaker().outcome_log(10);
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].kind, OutcomeKind::Failure);
    }

    #[test]
    fn test_slow_success_still_returns_its_value() {
        let engine = Engine::new(
            &PolicyBuilder::new("sluggish")
                .slow_call_duration_secs(0.02)
                .call_timeout_secs(5.0)
                .build(),
        );

        let value = engine
            .run(
                || {
                    thread::sleep(Duration::from_millis(60));
                    Ok::<_, String>(7)
                },
                |_cause| Ok(0),
            )
            .unwrap();

        assert_eq!(value, 7);
        let log = engine.breaker().outcome_log(10);
        assert_eq!(log[0].kind, OutcomeKind::Slow);
    }

    #[test]
    fn test_panicking_operation_becomes_a_failure() {
        let engine = Engine::new(
            &PolicyBuilder::new("explosive")
                .call_timeout_secs(5.0)
                .build(),
        );

        let result = engine.run(
            || -> Result<i32, String> { panic!("kaboom") },
            |cause| {
                assert!(matches!(cause, FailureCause::Panicked));
                Ok(-1)
            },
        );

        assert_eq!(result.unwrap(), -1);
        assert_eq!(engine.breaker().outcome_log(10)[0].kind, OutcomeKind::Failure);
    }

    #[test]
    fn test_fallback_failure_propagates() {
        let engine = Engine::new(&PolicyBuilder::new("fatal").build());

        let result: Result<i32, _> = engine.run(
            || Err::<i32, _>("boom".to_string()),
            |_cause| Err("fallback broke too".to_string()),
        );

        match result {
            Err(RunError::Fallback { circuit, error }) => {
                assert_eq!(circuit, "fatal");
                assert_eq!(error, "fallback broke too");
            }
            other => panic!("expected fallback failure, got {:?}", other),
        }
    }

    #[test]
    fn test_recovers_through_half_open_trials() {
        let engine = Engine::new(
            &PolicyBuilder::new("flappy")
                .failure_rate_threshold(50.0)
                .minimum_calls(2)
                .open_wait_secs(0.05)
                .half_open_permits(2)
                .call_timeout_secs(5.0)
                .build(),
        );

        for _ in 0..2 {
            let _ = engine.run(|| Err::<i32, _>("down".to_string()), |_cause| Ok(-1));
        }
        assert!(engine.breaker().is_open());

        thread::sleep(Duration::from_millis(100));
        for _ in 0..2 {
            let value = engine.run(|| Ok::<_, String>(1), |_cause| Ok(-1)).unwrap();
            assert_eq!(value, 1);
        }
        assert!(engine.breaker().is_closed());
    }
}
