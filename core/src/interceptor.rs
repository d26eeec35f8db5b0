//! Request and response interceptors.
//!
//! # Design
//! An interceptor is a pair of optional async handlers. While a request is
//! in flight the pipeline threads a `Result<T, ClientError>` through every
//! registered interceptor: a success goes to `on_fulfilled`, a failure to
//! `on_rejected`. A missing handler passes the state through untouched, and
//! `on_rejected` never sees a failure raised by its own `on_fulfilled`.
//!
//! Registrations live in an append-only slot list. An id is the slot index,
//! ejecting empties the slot, and slots are never reused, so an id stays
//! valid for exactly as long as its registration does.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use tracing::trace;

use crate::config::RequestConfig;
use crate::error::ClientError;
use crate::response::Response;

type Fulfilled<T> = Arc<dyn Fn(T) -> BoxFuture<'static, Result<T, ClientError>> + Send + Sync>;
type Rejected<T> =
    Arc<dyn Fn(ClientError) -> BoxFuture<'static, Result<T, ClientError>> + Send + Sync>;

/// Handler pair registered for one phase of the pipeline.
pub struct Interceptor<T> {
    on_fulfilled: Option<Fulfilled<T>>,
    on_rejected: Option<Rejected<T>>,
}

impl<T> Clone for Interceptor<T> {
    fn clone(&self) -> Self {
        Self {
            on_fulfilled: self.on_fulfilled.clone(),
            on_rejected: self.on_rejected.clone(),
        }
    }
}

impl<T> Default for Interceptor<T> {
    fn default() -> Self {
        Self {
            on_fulfilled: None,
            on_rejected: None,
        }
    }
}

impl<T> fmt::Debug for Interceptor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interceptor")
            .field("on_fulfilled", &self.on_fulfilled.is_some())
            .field("on_rejected", &self.on_rejected.is_some())
            .finish()
    }
}

impl<T: Send + 'static> Interceptor<T> {
    /// Interceptor that transforms successful values with `on_fulfilled`.
    pub fn new<F, Fut>(on_fulfilled: F) -> Self
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, ClientError>> + Send + 'static,
    {
        Self {
            on_fulfilled: Some(Arc::new(move |value| on_fulfilled(value).boxed())),
            on_rejected: None,
        }
    }

    /// Attach a handler for failures coming from earlier stages. Returning
    /// `Ok` recovers the pipeline.
    #[must_use]
    pub fn on_rejected<F, Fut>(mut self, on_rejected: F) -> Self
    where
        F: Fn(ClientError) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, ClientError>> + Send + 'static,
    {
        self.on_rejected = Some(Arc::new(move |error| on_rejected(error).boxed()));
        self
    }

    pub(crate) async fn apply(&self, state: Result<T, ClientError>) -> Result<T, ClientError> {
        match state {
            Ok(value) => match &self.on_fulfilled {
                Some(handler) => handler(value).await,
                None => Ok(value),
            },
            Err(error) => match &self.on_rejected {
                Some(handler) => handler(error).await,
                None => Err(error),
            },
        }
    }
}

/// Identifier returned when an interceptor is registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InterceptorId(usize);

/// Ordered registrations for one phase.
pub struct InterceptorManager<T> {
    handlers: Vec<Option<Interceptor<T>>>,
}

impl<T> Default for InterceptorManager<T> {
    fn default() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }
}

impl<T> fmt::Debug for InterceptorManager<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterceptorManager")
            .field("registered", &self.len())
            .field("slots", &self.handlers.len())
            .finish()
    }
}

impl<T> InterceptorManager<T> {
    /// Register `interceptor` after every existing registration.
    pub fn add(&mut self, interceptor: Interceptor<T>) -> InterceptorId {
        let id = InterceptorId(self.handlers.len());
        self.handlers.push(Some(interceptor));
        trace!(id = id.0, "interceptor registered");
        id
    }

    /// Remove a registration. Unknown or already ejected ids are ignored.
    pub fn eject(&mut self, id: InterceptorId) {
        if let Some(slot) = self.handlers.get_mut(id.0) {
            if slot.take().is_some() {
                trace!(id = id.0, "interceptor ejected");
            }
        }
    }

    /// Eject every registration. Ids handed out earlier stay retired.
    pub fn clear(&mut self) {
        for slot in &mut self.handlers {
            *slot = None;
        }
    }

    /// Number of live registrations.
    pub fn len(&self) -> usize {
        self.handlers.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Live registrations in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Interceptor<T>> {
        self.handlers.iter().flatten()
    }
}

/// Request-phase and response-phase registrations of one client instance.
#[derive(Debug, Default)]
pub struct Interceptors {
    pub request: InterceptorManager<RequestConfig>,
    pub response: InterceptorManager<Response>,
}
