//! Basic breaker usage example
//!
//! Run with `RUST_LOG=tripwire=debug cargo run --example basic` to see the
//! breaker's own log events.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use tripwire::{Breaker, BreakerError};

/// Stand-in for a remote call that fails until `healthy_after` calls were made
fn fetch_quote(calls: &AtomicUsize, healthy_after: usize) -> Result<String, String> {
    let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
    if n > healthy_after {
        Ok(format!("quote #{n}: 42.00"))
    } else {
        Err(format!("request #{n}: connection reset"))
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== Breaker Basic Example ===\n");

    let breaker = Breaker::builder("quotes_api")
        .max_requests(1)
        .timeout(Duration::from_secs(1))
        .ready_to_trip(|counts| counts.consecutive_failures >= 3)
        .on_state_change(|name, from, to| println!("breaker '{name}' changed: {from} -> {to}"))
        .build();

    let calls = AtomicUsize::new(0);

    println!("Initial state: {}\n", breaker.state());

    println!("--- Failing upstream ---");
    for _ in 0..4 {
        match breaker.execute(|| fetch_quote(&calls, 3)) {
            Ok(quote) => println!("ok: {quote}"),
            Err(BreakerError::Rejected(rejection)) => println!("rejected: {rejection}"),
            Err(BreakerError::Operation(e)) => println!("failed: {e}"),
        }
    }
    println!("State: {}\n", breaker.state());

    println!("--- Waiting for the open timeout ---");
    thread::sleep(Duration::from_millis(1100));
    println!("State: {}\n", breaker.state());

    println!("--- Probe call ---");
    match breaker.execute(|| fetch_quote(&calls, 3)) {
        Ok(quote) => println!("ok: {quote}"),
        Err(e) => println!("error: {e}"),
    }
    println!("State: {}", breaker.state());
}
