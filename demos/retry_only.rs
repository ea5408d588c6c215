//! Minimal retry-only example: a flaky fetch retried with doubling backoff.
use retrier::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Any,
    Unavailable,
    NotFound,
}

impl FailureKind for Kind {
    fn parent(self) -> Option<Self> {
        match self {
            Kind::Any => None,
            Kind::Unavailable | Kind::NotFound => Some(Kind::Any),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("fetch failed: {0:?}")]
struct FetchError(Kind);

impl Classify for FetchError {
    type Kind = Kind;
    fn kind(&self) -> Kind {
        self.0
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_max_level(tracing::Level::DEBUG).init();

    let policy = RetryPolicy::<FetchError>::builder()
        .max_attempts(5)?
        .initial_delay(Duration::from_millis(100))?
        .max_delay(Duration::from_secs(1))?
        .fail_on(Kind::NotFound)
        .build();

    let calls = AtomicUsize::new(0);
    let body = policy
        .execute(|| {
            let attempt = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                // Replace with your real fallible work
                if attempt < 2 {
                    Err(FetchError(Kind::Unavailable))
                } else {
                    Ok("hello from retry")
                }
            }
        })
        .await?;

    println!("{:?} after {} attempts", body, calls.load(Ordering::SeqCst));
    Ok(())
}
