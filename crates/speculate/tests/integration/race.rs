//! End-to-end races through the public API.

use crate::common::{Recorder, ok, slow_echo};
use speculate::{
    BoxError, Cancellation, FallbackPolicy, Outcome, Predicate, RaceConfig, RaceError, Resolution,
    Speculation, TaskError, race,
};
use std::error::Error as _;
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

fn indices(cancellations: &[Cancellation]) -> Vec<usize> {
    cancellations.iter().map(|c| c.index).collect()
}

#[test]
fn test_predicate_picks_middle_candidate() {
    let recorder = Recorder::new();
    let caller = thread::current().id();

    let report = Speculation::new(
        vec!["a", "b", "c"],
        recorder.outcome(|input: &'static str| ok(format!("outcome({input})"))),
    )
    .run_with_report(Predicate::new(|| ok("b")))
    .unwrap();

    assert_eq!(report.value, "outcome(b)");
    assert_eq!(report.resolution, Resolution::Precomputed { index: 1 });
    assert_eq!(indices(&report.cancellations), vec![0, 2]);

    let calls_for_b = recorder.calls_for(&"b");
    assert_eq!(calls_for_b.len(), 1, "matched outcome runs exactly once");
    assert_ne!(calls_for_b[0].thread, caller, "matched outcome came from the pool");
}

#[test]
fn test_miss_with_fallback_is_computed_fresh_on_caller() {
    let recorder = Recorder::new();
    let caller = thread::current().id();

    let report = Speculation::new(vec![1, 2, 3], recorder.outcome(|x: i32| ok(x * 10)))
        .fallback_on_miss(true)
        .run_with_report(Predicate::new(|| ok(5)))
        .unwrap();

    assert_eq!(report.value, 50);
    assert_eq!(report.resolution, Resolution::Fresh);
    assert_eq!(indices(&report.cancellations), vec![0, 1, 2]);

    let fresh = recorder.calls_for(&5);
    assert_eq!(fresh.len(), 1);
    assert_eq!(fresh[0].thread, caller);
}

#[test]
fn test_miss_without_fallback_exposes_predicate_output() {
    let recorder = Recorder::new();
    let err = Speculation::new(vec![1, 2, 3], recorder.outcome(|x: i32| ok(x * 10)))
        .fallback_on_miss(false)
        .run(Predicate::new(|| ok(5)))
        .unwrap_err();

    assert!(err.is_no_match());
    assert_eq!(err.predicate_output(), Some(&5));
    assert!(recorder.calls_for(&5).is_empty(), "no fresh computation on a failed miss");
}

#[test]
fn test_free_function_with_config_file_values() {
    let config = RaceConfig::from_toml_str("on_miss = \"fail\"").unwrap();
    let err = race(Predicate::new(|| ok(5)), |x: i32| ok(x * 10), vec![1, 2, 3], &config)
        .unwrap_err();
    match err {
        RaceError::NoMatchingOutcome { predicate_output } => assert_eq!(predicate_output, 5),
        other => unreachable!("expected a miss, got {other:?}"),
    }
}

#[test]
fn test_duplicate_candidates_select_earliest() {
    let report = Speculation::new(
        vec!["a", "b", "b", "c"],
        Outcome::new(|input: &'static str| ok(input.len())),
    )
    .run_with_report(Predicate::new(|| ok("b")))
    .unwrap();

    assert_eq!(report.resolution, Resolution::Precomputed { index: 1 });
    assert_eq!(indices(&report.cancellations), vec![0, 2, 3]);
}

#[test]
fn test_empty_candidates_follow_fallback_policy() {
    let recorder = Recorder::new();
    let value = Speculation::new(Vec::new(), recorder.outcome(|x: u8| ok(x + 1)))
        .run(Predicate::new(|| ok(41_u8)))
        .unwrap();
    assert_eq!(value, 42);
    assert_eq!(recorder.calls().len(), 1);

    let err = Speculation::new(Vec::new(), Outcome::new(|x: u8| ok(x + 1)))
        .on_miss(FallbackPolicy::Fail)
        .run(Predicate::new(|| ok(41_u8)))
        .unwrap_err();
    assert_eq!(err.into_predicate_output(), Some(41));
}

#[test]
fn test_predicate_failure_never_awaits_outcomes() {
    let start = Instant::now();
    let err = Speculation::new(
        vec!["a", "b"],
        Outcome::new(slow_echo(Duration::from_secs(2))),
    )
    .run(Predicate::new(|| {
        Err::<&'static str, BoxError>("router unavailable".into())
    }))
    .unwrap_err();

    assert!(start.elapsed() < Duration::from_secs(1));
    assert!(matches!(err, RaceError::PredicateFailed { .. }));
    assert_eq!(err.source().unwrap().to_string(), "router unavailable");
}

#[test]
fn test_predicate_panic_is_predicate_failure() {
    let err = Speculation::new(vec![1_u8, 2], Outcome::new(|x: u8| ok(x)))
        .run(Predicate::new(|| -> Result<u8, BoxError> {
            unreachable!("classifier crashed")
        }))
        .unwrap_err();

    let source = err.source().unwrap();
    let task_error = source.downcast_ref::<TaskError>().unwrap();
    assert!(matches!(task_error, TaskError::Panicked { message } if message.contains("classifier crashed")));
}

#[test]
fn test_matched_outcome_does_not_wait_for_slow_unmatched() {
    let start = Instant::now();
    let value = Speculation::new(
        vec!["slow", "fast"],
        Outcome::new(|input: &'static str| {
            if input == "slow" {
                thread::sleep(Duration::from_secs(2));
            }
            ok(input.to_uppercase())
        }),
    )
    .run(Predicate::new(|| ok("fast")))
    .unwrap();

    assert_eq!(value, "FAST");
    assert!(start.elapsed() < Duration::from_secs(1));
}

#[test]
fn test_running_unmatched_outcome_finishes_after_race() {
    let (started_tx, started_rx) = mpsc::channel::<()>();
    let (release_tx, release_rx) = mpsc::channel::<()>();
    let (finished_tx, finished_rx) = mpsc::channel::<&'static str>();
    let started_tx = std::sync::Mutex::new(started_tx);
    let release_rx = std::sync::Mutex::new(release_rx);
    let finished_tx = std::sync::Mutex::new(finished_tx);

    let outcome = Outcome::new(move |input: &'static str| {
        if input == "a" {
            started_tx.lock().unwrap().send(()).ok();
            release_rx.lock().unwrap().recv().ok();
            finished_tx.lock().unwrap().send(input).ok();
        }
        ok(input)
    });

    let report = Speculation::new(vec!["a", "b"], outcome)
        .max_workers(3)
        .run_with_report(Predicate::new(move || {
            started_rx.recv().ok();
            ok("b")
        }))
        .unwrap();

    assert_eq!(report.value, "b");
    assert_eq!(
        report.cancellations,
        vec![Cancellation {
            index: 0,
            prevented_start: false
        }]
    );

    // The cancelled-but-running task still completes on its own.
    release_tx.send(()).unwrap();
    assert_eq!(
        finished_rx.recv_timeout(Duration::from_secs(5)).unwrap(),
        "a"
    );
}

#[test]
fn test_outcomes_start_in_priority_order_under_saturation() {
    let (seen_tx, seen_rx) = mpsc::channel::<&'static str>();
    let seen_tx = std::sync::Mutex::new(seen_tx);
    let recorder = Recorder::new();

    let outcome = recorder.outcome(move |input: &'static str| {
        seen_tx.lock().unwrap().send(input).ok();
        ok(input)
    });

    let report = Speculation::new(vec!["a", "b", "c", "d"], outcome)
        .max_workers(2)
        .run_with_report(Predicate::new(move || {
            while let Ok(seen) = seen_rx.recv() {
                if seen == "d" {
                    break;
                }
            }
            ok("d")
        }))
        .unwrap();

    assert_eq!(report.value, "d");
    let order: Vec<&str> = recorder.calls().into_iter().map(|call| call.input).collect();
    assert_eq!(order, vec!["a", "b", "c", "d"]);
    assert!(report.cancellations.iter().all(|c| !c.prevented_start));
}

#[test]
fn test_matched_outcome_failure_is_outcome_failed() {
    let err = Speculation::new(
        vec!["primary", "backup"],
        Outcome::new(|input: &'static str| {
            if input == "backup" {
                Err(anyhow::anyhow!("backup quota exhausted"))
            } else {
                Ok(input)
            }
        }),
    )
    .run(Predicate::new(|| ok("backup")))
    .unwrap_err();

    assert_eq!(err.candidate(), Some(&"backup"));
    assert_eq!(err.source().unwrap().to_string(), "backup quota exhausted");
}

#[test]
fn test_races_are_independent() {
    let handles: Vec<_> = (0..4_u32)
        .map(|i| {
            thread::spawn(move || {
                Speculation::new(vec![0, 1, 2, 3], Outcome::new(|x: u32| ok(x * 100)))
                    .run(Predicate::new(move || ok(i)))
                    .unwrap()
            })
        })
        .collect();
    let values: Vec<u32> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(values, vec![0, 100, 200, 300]);
}

#[tokio::test]
async fn test_race_called_on_runtime_thread_completes() {
    let config = RaceConfig::new().with_max_workers(2);
    let precomputed = race(Predicate::new(|| ok(2_u8)), |x: u8| ok(x + 40), vec![1, 2, 3], &config);
    assert_eq!(precomputed.unwrap(), 42);

    let fresh = race(Predicate::new(|| ok(9_u8)), |x: u8| ok(x + 40), vec![1, 2, 3], &config);
    assert_eq!(fresh.unwrap(), 49);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_race_inside_spawn_blocking() {
    let report = tokio::task::spawn_blocking(|| {
        Speculation::new(vec!["a", "b"], Outcome::new(|c: &'static str| ok(c.len())))
            .run_with_report(Predicate::new(|| ok("b")))
    })
    .await
    .unwrap()
    .unwrap();
    assert_eq!(report.resolution, Resolution::Precomputed { index: 1 });
}
