//! Key producers: the capability a key selector has. Synchronous selectors never suspend;
//! suspending selectors are awaited once per element while the key cache is filled, and
//! observe cancellation before every invocation.

use std::future::{ready, Future};

use tokio_util::sync::CancellationToken;

use crate::error::{OrderError, Result};

pub trait KeyProducer<T>: Send + Sync + 'static {
    type Key: Send + Sync + 'static;

    fn produce<'a>(
        &'a self,
        element: &'a T,
        cancel: &'a CancellationToken,
    ) -> impl Future<Output = Result<Self::Key>> + Send + 'a;
}

/// Plain `Fn(&T) -> K` selector.
#[derive(Clone, Copy)]
pub struct SyncKey<F>(pub F);

impl<T, K, F> KeyProducer<T> for SyncKey<F>
where
    T: Sync,
    K: Send + Sync + 'static,
    F: Fn(&T) -> K + Send + Sync + 'static,
{
    type Key = K;

    #[inline(always)]
    fn produce<'a>(
        &'a self,
        element: &'a T,
        _cancel: &'a CancellationToken,
    ) -> impl Future<Output = Result<K>> + Send + 'a {
        ready(Ok((self.0)(element)))
    }
}

/// Suspending selector returning a future of the key.
#[derive(Clone, Copy)]
pub struct AsyncKey<F>(pub F);

impl<T, K, F, Fut> KeyProducer<T> for AsyncKey<F>
where
    T: Sync,
    K: Send + Sync + 'static,
    F: Fn(&T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<K>> + Send,
{
    type Key = K;

    fn produce<'a>(
        &'a self,
        element: &'a T,
        cancel: &'a CancellationToken,
    ) -> impl Future<Output = Result<K>> + Send + 'a {
        async move {
            if cancel.is_cancelled() {
                return Err(OrderError::Cancelled);
            }
            (self.0)(element).await
        }
    }
}

/// Suspending selector that is also handed the evaluation's cancellation token.
#[derive(Clone, Copy)]
pub struct CancellableKey<F>(pub F);

impl<T, K, F, Fut> KeyProducer<T> for CancellableKey<F>
where
    T: Sync,
    K: Send + Sync + 'static,
    F: Fn(&T, CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<K>> + Send,
{
    type Key = K;

    fn produce<'a>(
        &'a self,
        element: &'a T,
        cancel: &'a CancellationToken,
    ) -> impl Future<Output = Result<K>> + Send + 'a {
        async move {
            if cancel.is_cancelled() {
                return Err(OrderError::Cancelled);
            }
            (self.0)(element, cancel.clone()).await
        }
    }
}
