use parking_lot::Mutex;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;
use tripwire::{Breaker, BreakerError, Counts, ManualClock, Rejection, State};

fn failing_call(breaker: &Breaker) -> Result<(), BreakerError<&'static str>> {
    breaker.execute(|| Err("503 Service Unavailable"))
}

#[test]
fn remote_call_scenario() {
    let clock = Arc::new(ManualClock::new());
    let transitions = Arc::new(Mutex::new(Vec::new()));
    let transitions_clone = transitions.clone();

    let breaker = Breaker::builder("remote")
        .max_requests(1)
        .timeout(Duration::from_secs(1))
        .on_state_change(move |_name, from, to| transitions_clone.lock().push((from, to)))
        .clock(clock.clone())
        .build();

    for _ in 0..5 {
        assert_eq!(
            failing_call(&breaker),
            Err(BreakerError::Operation("503 Service Unavailable"))
        );
    }
    assert_eq!(breaker.state(), State::Closed);

    // sixth consecutive failure trips the default predicate
    let _ = failing_call(&breaker);
    assert_eq!(breaker.state(), State::Open);

    let invocations = AtomicUsize::new(0);
    let result = breaker.execute(|| {
        invocations.fetch_add(1, Ordering::SeqCst);
        Ok::<_, &str>("200 OK")
    });
    assert_eq!(result, Err(BreakerError::Rejected(Rejection::Open)));
    assert_eq!(invocations.load(Ordering::SeqCst), 0);

    // probe succeeds and closes the breaker
    clock.advance(Duration::from_millis(1001));
    assert_eq!(breaker.execute(|| Ok::<_, &str>("200 OK")), Ok("200 OK"));
    assert_eq!(breaker.state(), State::Closed);
    assert_eq!(breaker.execute(|| Ok::<_, &str>("200 OK")), Ok("200 OK"));

    // trip again, then fail the probe
    for _ in 0..6 {
        let _ = failing_call(&breaker);
    }
    assert_eq!(breaker.state(), State::Open);
    clock.advance(Duration::from_millis(1001));
    let _ = failing_call(&breaker);
    assert_eq!(breaker.state(), State::Open);

    // the reopened breaker waits a fresh full timeout
    clock.advance(Duration::from_millis(900));
    assert_eq!(breaker.state(), State::Open);
    clock.advance(Duration::from_millis(200));
    assert_eq!(breaker.state(), State::HalfOpen);

    assert_eq!(
        *transitions.lock(),
        vec![
            (State::Closed, State::Open),
            (State::Open, State::HalfOpen),
            (State::HalfOpen, State::Closed),
            (State::Closed, State::Open),
            (State::Open, State::HalfOpen),
            (State::HalfOpen, State::Open),
            (State::Open, State::HalfOpen),
        ]
    );
}

#[test]
fn concurrent_calls_are_all_counted() {
    const CALLERS: usize = 64;

    let breaker = Breaker::builder("fanout").max_requests(u32::MAX).build();

    thread::scope(|scope| {
        for i in 0..CALLERS {
            let breaker = &breaker;
            scope.spawn(move || {
                let result = breaker.execute(|| {
                    thread::sleep(Duration::from_millis(1));
                    Ok::<_, String>(i)
                });
                assert_eq!(result, Ok(i));
            });
        }
    });

    let counts = breaker.counts();
    assert_eq!(counts.requests, CALLERS as u32);
    assert_eq!(counts.successes, CALLERS as u32);
    assert_eq!(counts.failures, 0);
}

#[test]
fn concurrent_failures_open_exactly_once() {
    const CALLERS: usize = 32;

    let opened = Arc::new(AtomicUsize::new(0));
    let opened_clone = opened.clone();

    let breaker = Arc::new(
        Breaker::builder("storm")
            .timeout(Duration::from_secs(60))
            .on_state_change(move |_name, _from, to| {
                if to == State::Open {
                    opened_clone.fetch_add(1, Ordering::SeqCst);
                }
            })
            .build(),
    );

    let handles: Vec<_> = (0..CALLERS)
        .map(|_| {
            let breaker = Arc::clone(&breaker);
            thread::spawn(move || failing_call(&breaker))
        })
        .collect();

    let mut rejected = 0;
    for handle in handles {
        match handle.join().unwrap() {
            Err(BreakerError::Rejected(Rejection::Open)) => rejected += 1,
            Err(BreakerError::Operation(_)) => {}
            other => panic!("unexpected result: {other:?}"),
        }
    }

    assert_eq!(breaker.state(), State::Open);
    assert_eq!(opened.load(Ordering::SeqCst), 1);
    assert!(rejected <= CALLERS - 6, "at least six calls must have run");
    assert_eq!(breaker.counts(), Counts::default());
}

#[test]
fn panic_is_recorded_and_propagated() {
    let breaker = Breaker::builder("panicky")
        .ready_to_trip(|counts| counts.consecutive_failures >= 2)
        .build();

    for attempt in 1..=2 {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            breaker.execute(|| -> Result<(), &'static str> { panic!("handler crashed") })
        }));

        let payload = outcome.expect_err("panic must propagate");
        assert_eq!(payload.downcast_ref::<&str>(), Some(&"handler crashed"));

        if attempt == 1 {
            let counts = breaker.counts();
            assert_eq!(counts.requests, 1);
            assert_eq!(counts.failures, 1);
        }
    }

    assert_eq!(breaker.state(), State::Open);
}

#[test]
fn half_open_probe_quota_under_contention() {
    const CALLERS: usize = 16;

    let clock = Arc::new(ManualClock::new());
    let breaker = Breaker::builder("probes")
        .max_requests(3)
        .timeout(Duration::from_secs(1))
        .ready_to_trip(|counts| counts.consecutive_failures >= 1)
        .clock(clock.clone())
        .build();

    let _ = failing_call(&breaker);
    clock.advance(Duration::from_secs(2));

    let permits = Mutex::new(Vec::new());
    let too_many = AtomicUsize::new(0);

    thread::scope(|scope| {
        for _ in 0..CALLERS {
            scope.spawn(|| match breaker.allow() {
                // hold the permit so no probe settles while others are admitted
                Ok(permit) => permits.lock().push(permit),
                Err(Rejection::TooManyRequests) => {
                    too_many.fetch_add(1, Ordering::SeqCst);
                }
                Err(Rejection::Open) => panic!("breaker should be half-open"),
            });
        }
    });

    let permits = permits.into_inner();
    assert_eq!(permits.len(), 3);
    assert_eq!(too_many.load(Ordering::SeqCst), CALLERS - 3);
    assert_eq!(breaker.state(), State::HalfOpen);

    for permit in permits {
        permit.success();
    }
    assert_eq!(breaker.state(), State::Closed);
}

#[test]
fn open_timeout_with_real_clock() {
    let breaker = Breaker::builder("sleepy")
        .timeout(Duration::from_millis(50))
        .ready_to_trip(|counts| counts.consecutive_failures >= 1)
        .build();

    let _ = failing_call(&breaker);
    assert_eq!(breaker.state(), State::Open);

    thread::sleep(Duration::from_millis(80));

    assert_eq!(breaker.peek(), State::HalfOpen);
    assert_eq!(breaker.execute(|| Ok::<_, &str>(())), Ok(()));
    assert_eq!(breaker.state(), State::Closed);
}
