mod common;

use common::{instant, Calls, Failure, Kind};
use retrier::{RetryAction, RetryError};
use tower::{service_fn, Service, ServiceBuilder, ServiceExt};

fn flaky(failures: usize, calls: Calls) -> impl Service<
    String,
    Response = usize,
    Error = Failure,
    Future = impl std::future::Future<Output = Result<usize, Failure>> + Send + 'static,
> + Clone
       + Send
       + 'static {
    service_fn(move |req: String| {
        let calls = calls.clone();
        async move {
            let attempt = calls.hit();
            if attempt < failures {
                Err(Failure::new(Kind::Io, format!("attempt {}", attempt)))
            } else {
                Ok(req.len())
            }
        }
    })
}

#[tokio::test]
async fn retries_cloned_request_until_success() {
    let calls = Calls::new();
    let policy = instant().max_attempts(4).unwrap().build();
    let svc = ServiceBuilder::new().layer(policy.into_layer()).service(flaky(3, calls.clone()));

    let response = svc.oneshot("hello".to_string()).await.unwrap();

    assert_eq!(response, Some(5));
    assert_eq!(calls.count(), 4);
}

#[tokio::test]
async fn exhaustion_carries_every_service_error() {
    let calls = Calls::new();
    let policy = instant().max_attempts(2).unwrap().build();
    let svc = ServiceBuilder::new().layer(policy.into_layer()).service(flaky(10, calls.clone()));

    let err = svc.oneshot("hello".to_string()).await.unwrap_err();

    match err {
        RetryError::RetryExhausted { attempts, failures } => {
            assert_eq!(attempts, 2);
            assert_eq!(failures[1].message, "attempt 1");
        }
        other => panic!("expected RetryExhausted, got {:?}", other),
    }
}

#[tokio::test]
async fn one_layer_serves_many_requests() {
    let calls = Calls::new();
    let layer = instant().handle(Kind::Io, RetryAction::Continue).build().into_layer();
    let mut svc = ServiceBuilder::new().layer(layer).service(flaky(1, calls.clone()));

    let ready = ServiceExt::<String>::ready(&mut svc).await.unwrap();
    let first = ready.call("a".to_string()).await.unwrap();
    let ready = ServiceExt::<String>::ready(&mut svc).await.unwrap();
    let second = ready.call("abc".to_string()).await.unwrap();

    assert_eq!(first, Some(1));
    assert_eq!(second, Some(3));
    assert_eq!(calls.count(), 3);
}
