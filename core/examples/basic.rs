//! Resilience policy runtime walkthrough
//!
//! Replays the classic demo scenarios against one registry: a guarded
//! divide operation, a faulty service that trips its circuit, and a slow
//! service bounded by the time limiter.

use policy_machines::{FailureCause, PolicyBuilder, PolicyRegistry};
use std::thread;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

fn divide(a: i64, b: i64) -> Result<i64, String> {
    if b == 0 {
        return Err(format!("cannot divide {} by {}", a, b));
    }
    Ok(a / b)
}

fn main() {
    tracing_subscriber::fmt().init();

    let registry = PolicyRegistry::new();

    registry
        .register(PolicyBuilder::new("divide").call_timeout_secs(2.0).build())
        .unwrap();
    registry
        .register(
            PolicyBuilder::new("faulty")
                .failure_rate_threshold(50.0)
                .minimum_calls(4)
                .open_wait_secs(5.0)
                .on_open(|name| println!("🔴 Circuit '{}' opened!", name))
                .on_half_open(|name| println!("🟡 Circuit '{}' half-open, testing...", name))
                .on_close(|name| println!("🟢 Circuit '{}' closed!", name))
                .build(),
        )
        .unwrap();
    registry
        .register(PolicyBuilder::new("time").call_timeout_secs(2.0).build())
        .unwrap();

    println!("=== Divide ===");
    for (a, b) in [(10, 2), (10, 0)] {
        let body = registry
            .run(
                "divide",
                move || divide(a, b).map(|v| format!("{} / {} = {}", a, b, v)),
                move |_cause| Ok(format!("There was an error: cannot divide {} by {}", a, b)),
            )
            .unwrap();
        println!("{}", body);
    }

    println!("\n=== Faulty service ===");
    for attempt in 1..=6 {
        let failed = registry
            .run(
                "faulty",
                || Err::<bool, _>("Runtime error".to_string()),
                |cause| {
                    if matches!(cause, FailureCause::Rejected { .. }) {
                        println!("  (call {} rejected without touching the service)", attempt);
                    }
                    Ok(true)
                },
            )
            .unwrap();
        println!("Attempt {}: did the service fail? {}", attempt, if failed { "YES" } else { "NO" });
    }

    println!("\n=== Time (with and without delay) ===");
    for delay_ms in [0_u64, 3000] {
        let body = registry
            .run(
                "time",
                move || {
                    if delay_ms > 0 {
                        thread::sleep(Duration::from_millis(delay_ms));
                    }
                    let now = SystemTime::now()
                        .duration_since(UNIX_EPOCH)
                        .unwrap_or_default();
                    Ok::<_, String>(format!("{}s since the epoch", now.as_secs()))
                },
                |cause| match cause {
                    FailureCause::Timeout { .. } => {
                        Ok("UNKNOWN (timeout waiting for response)".to_string())
                    }
                    _ => Ok("UNKNOWN".to_string()),
                },
            )
            .unwrap();
        println!("Time is: {}", body);
    }

    println!("\n=== Recovery ===");
    let faulty = registry.engine("faulty").unwrap();
    println!("Faulty circuit state: {}", faulty.breaker().state_name());

    registry.reset("faulty").unwrap();
    println!("State after reset: {}", faulty.breaker().state_name());

    let failed = registry
        .run("faulty", || Ok::<_, String>(false), |_cause| Ok(true))
        .unwrap();
    println!("After recovery: did the service fail? {}", if failed { "YES" } else { "NO" });
}
