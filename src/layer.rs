//! Tower integration.
//!
//! [`RetryLayer`] wraps a service so every request runs under a [`RetryPolicy`]. Each attempt
//! drives a fresh clone of the inner service to readiness and calls it with a clone of the
//! request. A `Stop` decision surfaces as `Ok(None)`.

use crate::error::RetryError;
use crate::policy::Classify;
use crate::retry::RetryPolicy;
use futures::future::BoxFuture;
use futures::TryFutureExt;
use std::fmt;
use std::task::{Context, Poll};
use tower::ServiceExt;
use tower_layer::Layer;
use tower_service::Service;

impl<E: Classify> RetryPolicy<E> {
    /// Turn the policy into a tower layer.
    pub fn into_layer(self) -> RetryLayer<E> {
        RetryLayer { policy: self }
    }
}

/// Tower-native retry layer.
pub struct RetryLayer<E: Classify> {
    policy: RetryPolicy<E>,
}

impl<E: Classify> RetryLayer<E> {
    pub fn new(policy: RetryPolicy<E>) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RetryPolicy<E> {
        &self.policy
    }
}

impl<E: Classify> Clone for RetryLayer<E> {
    fn clone(&self) -> Self {
        Self { policy: self.policy.clone() }
    }
}

impl<E: Classify> fmt::Debug for RetryLayer<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryLayer").field("policy", &self.policy).finish()
    }
}

impl<S, E: Classify> Layer<S> for RetryLayer<E> {
    type Service = RetryService<S, E>;

    fn layer(&self, service: S) -> Self::Service {
        RetryService { inner: service, policy: self.policy.clone() }
    }
}

/// Retry service produced by `RetryLayer`.
pub struct RetryService<S, E: Classify> {
    inner: S,
    policy: RetryPolicy<E>,
}

impl<S: Clone, E: Classify> Clone for RetryService<S, E> {
    fn clone(&self) -> Self {
        Self { inner: self.inner.clone(), policy: self.policy.clone() }
    }
}

impl<S: fmt::Debug, E: Classify> fmt::Debug for RetryService<S, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryService")
            .field("inner", &self.inner)
            .field("policy", &self.policy)
            .finish()
    }
}

impl<S, E, Request> Service<Request> for RetryService<S, E>
where
    Request: Clone + Send + 'static,
    S: Service<Request> + Clone + Send + 'static,
    S::Response: Send + 'static,
    S::Error: Into<E>,
    S::Future: Send + 'static,
    E: Classify + Send + Sync + 'static,
{
    type Response = Option<S::Response>;
    type Error = RetryError<E>;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    // Readiness is awaited per attempt on the cloned service.
    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request) -> Self::Future {
        let policy = self.policy.clone();
        let inner = self.inner.clone();
        Box::pin(async move {
            policy
                .execute(move || inner.clone().oneshot(req.clone()).map_err(Into::into))
                .await
        })
    }
}
