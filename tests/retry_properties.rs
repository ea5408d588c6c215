mod common;

use common::{instant, Calls, Failure, Kind};
use retrier::{
    BuilderHandle, PolicyHandle, RandomFactory, RetryAction, RetryError, RetryPolicy,
    RetryPolicyBuilder, TrackingSleeper, UsageError,
};
use std::time::Duration;

fn tracked(sleeper: &TrackingSleeper) -> RetryPolicyBuilder<Failure> {
    RetryPolicy::builder().with_sleeper(sleeper.clone())
}

#[tokio::test]
async fn unhandled_failures_use_every_attempt() {
    for n in [1usize, 2, 7, 12] {
        let policy = instant().max_attempts(n).unwrap().build();
        let calls = Calls::new();

        let result = policy
            .run(|| {
                let calls = calls.clone();
                async move { Err(Failure::new(Kind::Io, format!("attempt {}", calls.hit()))) }
            })
            .await;

        assert_eq!(calls.count(), n);
        let err = result.unwrap_err();
        let messages: Vec<String> =
            err.failures().unwrap().iter().map(|f| f.message.clone()).collect();
        let expected: Vec<String> = (0..n).map(|i| format!("attempt {}", i)).collect();
        assert_eq!(messages, expected);
    }
}

#[tokio::test]
async fn zero_attempts_yield_empty_aggregate() {
    let policy = instant().max_attempts(0).unwrap().build();
    let calls = Calls::new();

    let result = policy
        .execute(|| {
            let calls = calls.clone();
            async move {
                calls.hit();
                Ok::<_, Failure>("unreachable")
            }
        })
        .await;

    assert_eq!(calls.count(), 0);
    assert!(matches!(result, Err(RetryError::RetryExhausted { attempts: 0, .. })));
}

#[tokio::test]
async fn success_after_failures_sleeps_preceding_delays() {
    // Multiplier 2 from 1s, success on the 5th attempt: 1 + 2 + 4 + 8.
    let sleeper = TrackingSleeper::new();
    let policy = tracked(&sleeper)
        .initial_delay_secs(1.0)
        .unwrap()
        .exponential_backoff(2.0)
        .unwrap()
        .build();
    let calls = Calls::new();

    let result = policy
        .execute(|| {
            let calls = calls.clone();
            async move {
                if calls.hit() < 4 {
                    Err(Failure::new(Kind::Io, "busy"))
                } else {
                    Ok(5)
                }
            }
        })
        .await;

    assert_eq!(result.unwrap(), Some(5));
    assert_eq!(calls.count(), 5);
    assert_eq!(sleeper.total(), Duration::from_secs(15));
}

#[tokio::test]
async fn capped_delays_over_ten_attempts() {
    // 1 + 2 + 4 + 5 * 6
    let sleeper = TrackingSleeper::new();
    let policy = tracked(&sleeper)
        .max_attempts(10)
        .unwrap()
        .initial_delay_secs(1.0)
        .unwrap()
        .max_delay_secs(5.0)
        .unwrap()
        .build();

    let result = policy.run(|| async { Err(Failure::new(Kind::Io, "down")) }).await;

    assert!(result.unwrap_err().is_retry_exhausted());
    assert_eq!(sleeper.calls().len(), 9);
    assert_eq!(sleeper.total(), Duration::from_secs(37));
}

#[tokio::test]
async fn handler_matches_subtypes() {
    let policy = instant().handle(Kind::Io, RetryAction::Stop).build();
    let calls = Calls::new();

    let result = policy
        .execute(|| {
            let calls = calls.clone();
            async move {
                calls.hit();
                Err::<(), _>(Failure::new(Kind::EndOfStream, "eof"))
            }
        })
        .await;

    assert_eq!(result.unwrap(), None);
    assert_eq!(calls.count(), 1);
}

#[tokio::test]
async fn handler_does_not_match_unrelated_kind() {
    let policy = instant().max_attempts(3).unwrap().handle(Kind::Io, RetryAction::Stop).build();

    let result = policy.run(|| async { Err(Failure::new(Kind::InvalidOperation, "bad")) }).await;

    assert_eq!(result.unwrap_err().failures().map(<[_]>::len), Some(3));
}

#[tokio::test]
async fn handler_matches_immediate_cause() {
    let policy = instant().fail_on(Kind::FileNotFound).build();

    let result = policy
        .run(|| async {
            Err(Failure::wrapping(
                Kind::InvalidOperation,
                Failure::new(Kind::FileNotFound, "config.toml"),
            ))
        })
        .await;

    let expected = Failure::new(Kind::FileNotFound, "config.toml");
    assert_eq!(result.unwrap_err().into_inner(), Some(expected));
}

#[tokio::test]
async fn only_the_immediate_cause_is_inspected() {
    let policy = instant().max_attempts(2).unwrap().fail_on(Kind::FileNotFound).build();

    let result = policy
        .run(|| async {
            let root = Failure::new(Kind::FileNotFound, "deep");
            let middle = Failure::wrapping(Kind::InvalidOperation, root);
            Err(Failure::wrapping(Kind::InvalidOperation, middle))
        })
        .await;

    assert!(result.unwrap_err().is_retry_exhausted());
}

#[tokio::test]
async fn stop_ends_regardless_of_remaining_budget() {
    let policy = instant()
        .max_attempts(100)
        .unwrap()
        .handle_with(Kind::Any, |failure: &Failure| {
            if failure.kind == Kind::EndOfStream {
                RetryAction::Stop
            } else {
                RetryAction::Continue
            }
        })
        .build();
    let calls = Calls::new();

    let result = policy
        .execute(|| {
            let calls = calls.clone();
            async move {
                let kind = if calls.hit() == 2 { Kind::EndOfStream } else { Kind::Io };
                Err::<u8, _>(Failure::new(kind, "read"))
            }
        })
        .await;

    assert_eq!(result.unwrap(), None);
    assert_eq!(calls.count(), 3);
}

#[tokio::test]
async fn throw_returns_the_outer_failure_unaggregated() {
    let policy = instant().max_attempts(4).unwrap().fail_on(Kind::Io).build();

    let result = policy
        .run(|| async {
            Err(Failure::wrapping(Kind::EndOfStream, Failure::new(Kind::InvalidOperation, "inner")))
        })
        .await;

    let thrown = result.unwrap_err().into_inner().unwrap();
    assert_eq!(thrown.kind, Kind::EndOfStream);
    assert!(thrown.cause.is_some());
}

#[tokio::test]
async fn registration_order_decides_between_overlapping_handlers() {
    let policy = instant()
        .handle(Kind::Any, RetryAction::Stop)
        .fail_on(Kind::FileNotFound)
        .build();

    let result = policy.run(|| async { Err(Failure::new(Kind::FileNotFound, "x")) }).await;

    assert!(result.is_ok());
}

#[tokio::test]
async fn seeded_stochastic_backoff_is_reproducible() {
    async fn total_delay(seed: u64) -> Duration {
        let sleeper = TrackingSleeper::new();
        let policy = tracked(&sleeper)
            .max_attempts(8)
            .unwrap()
            .initial_delay_secs(1.0)
            .unwrap()
            .max_delay(Duration::from_secs(3600))
            .unwrap()
            .with_random_factory(RandomFactory::seeded(seed))
            .stochastic_backoff(1.5, 2.5)
            .unwrap()
            .build();
        let _ = policy.run(|| async { Err(Failure::new(Kind::Io, "flaky")) }).await;
        sleeper.total()
    }

    let first = total_delay(7).await;
    assert_eq!(first, total_delay(7).await);

    // 1s, then seven growths by a factor in [1.5, 2.5).
    let lower: f64 = (0..7).map(|i| 1.5f64.powi(i)).sum();
    let upper: f64 = (0..7).map(|i| 2.5f64.powi(i)).sum();
    assert!(first.as_secs_f64() >= lower - 1e-6, "{:?} below {}", first, lower);
    assert!(first.as_secs_f64() < upper, "{:?} above {}", first, upper);
}

#[tokio::test]
async fn absent_handles_report_missing_receiver() {
    let builder: Option<RetryPolicyBuilder<Failure>> = None;
    let err = builder.initial_delay_secs(1.0).unwrap_err();
    assert!(err.is_missing_receiver());

    let policy: Option<&RetryPolicy<Failure>> = None;
    let err = policy.run(|| async { Ok(()) }).await.unwrap_err();
    assert_eq!(err.as_usage(), Some(&UsageError::MissingReceiver { operation: "run" }));
}

#[tokio::test]
async fn present_handles_behave_like_direct_calls() {
    let builder = Some(RetryPolicy::<Failure>::builder());
    let policy = builder.max_attempts(2).unwrap().build();
    let handle = Some(&policy);

    let result = handle.execute(|| async { Ok::<_, Failure>("ok") }).await;

    assert_eq!(result.unwrap(), Some("ok"));
}

#[tokio::test]
async fn frozen_policy_is_shared_across_tasks() {
    let policy = instant().max_attempts(3).unwrap().build();
    let mut tasks = Vec::new();
    for i in 0..8u32 {
        let policy = policy.clone();
        tasks.push(tokio::spawn(async move {
            let calls = Calls::new();
            policy
                .execute(move || {
                    let calls = calls.clone();
                    async move {
                        if calls.hit() == 0 {
                            Err(Failure::new(Kind::Io, "first"))
                        } else {
                            Ok(i)
                        }
                    }
                })
                .await
        }));
    }

    for (i, task) in tasks.into_iter().enumerate() {
        assert_eq!(task.await.unwrap().unwrap(), Some(i as u32));
    }
}
