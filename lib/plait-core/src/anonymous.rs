//! Handlers defined inline as functions.
//!
//! Two shapes are supported:
//! - [`AnonymousHandler`] calls `f(next, request, cancellation)`; the function forwards
//!   explicitly with [`Next::run`].
//! - [`ProceedHandler`] calls `f(proceed)`; [`Proceed`] already holds the request, the
//!   cancellation signal and the next handler, so forwarding is [`Proceed::run`].
//!
//! Both are ordinary handler kinds: the builder registers them with their function as
//! the only extra argument and the active factory constructs them.

use std::future::Future;
use std::sync::Arc;

use bytes::Bytes;
use tokio_util::sync::CancellationToken;

use crate::{
    Arguments, BoxHandler, Construct, Handler, HandlerFuture, Request, Response, Result,
};

/// Function wrapped by [`AnonymousHandler`].
pub type AnonymousFn =
    Arc<dyn Fn(Next, Request<Bytes>, CancellationToken) -> HandlerFuture + Send + Sync>;

/// Function wrapped by [`ProceedHandler`].
pub type ProceedFn = Arc<dyn Fn(Proceed) -> HandlerFuture + Send + Sync>;

/// Erase an async closure into an [`AnonymousFn`].
pub fn anonymous_fn<F, Fut>(f: F) -> AnonymousFn
where
    F: Fn(Next, Request<Bytes>, CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Response<Bytes>>> + Send + 'static,
{
    Arc::new(move |next, request, cancellation| Box::pin(f(next, request, cancellation)))
}

/// Erase an async closure into a [`ProceedFn`].
pub fn proceed_fn<F, Fut>(f: F) -> ProceedFn
where
    F: Fn(Proceed) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Response<Bytes>>> + Send + 'static,
{
    Arc::new(move |proceed| Box::pin(f(proceed)))
}

/// The rest of the pipeline, curried for an anonymous function.
#[derive(Clone)]
pub struct Next {
    handler: BoxHandler,
}

impl Next {
    /// Wrap the next handler.
    #[must_use]
    pub const fn new(handler: BoxHandler) -> Self {
        Self { handler }
    }

    /// Send a request to the rest of the pipeline.
    pub fn run(&self, request: Request<Bytes>, cancellation: CancellationToken) -> HandlerFuture {
        self.handler.send(request, cancellation)
    }
}

impl std::fmt::Debug for Next {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Next").finish_non_exhaustive()
    }
}

/// A pending delegation, bound to the original request and cancellation signal.
pub struct Proceed {
    next: BoxHandler,
    request: Request<Bytes>,
    cancellation: CancellationToken,
}

impl Proceed {
    /// The request that will be forwarded.
    #[must_use]
    pub fn request(&self) -> &Request<Bytes> {
        &self.request
    }

    /// Mutable access to the request before it is forwarded.
    #[must_use]
    pub fn request_mut(&mut self) -> &mut Request<Bytes> {
        &mut self.request
    }

    /// The cancellation signal of this send.
    #[must_use]
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Forward the request to the rest of the pipeline.
    #[must_use]
    pub fn run(self) -> HandlerFuture {
        self.next.send(self.request, self.cancellation)
    }
}

impl std::fmt::Debug for Proceed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Proceed")
            .field("request", &self.request)
            .finish_non_exhaustive()
    }
}

/// Handler adapting an [`AnonymousFn`].
pub struct AnonymousHandler {
    next: Next,
    function: AnonymousFn,
}

impl AnonymousHandler {
    /// Wrap `function` in front of `next`.
    #[must_use]
    pub const fn new(next: BoxHandler, function: AnonymousFn) -> Self {
        Self {
            next: Next::new(next),
            function,
        }
    }
}

impl Handler for AnonymousHandler {
    fn send(&self, request: Request<Bytes>, cancellation: CancellationToken) -> HandlerFuture {
        (self.function)(self.next.clone(), request, cancellation)
    }
}

impl Construct for AnonymousHandler {
    fn construct(arguments: &mut Arguments) -> Result<Self> {
        Ok(Self::new(arguments.next_handler()?, arguments.value()?))
    }
}

/// Handler adapting a [`ProceedFn`].
pub struct ProceedHandler {
    next: BoxHandler,
    function: ProceedFn,
}

impl ProceedHandler {
    /// Wrap `function` in front of `next`.
    #[must_use]
    pub const fn new(next: BoxHandler, function: ProceedFn) -> Self {
        Self { next, function }
    }
}

impl Handler for ProceedHandler {
    fn send(&self, request: Request<Bytes>, cancellation: CancellationToken) -> HandlerFuture {
        (self.function)(Proceed {
            next: Arc::clone(&self.next),
            request,
            cancellation,
        })
    }
}

impl Construct for ProceedHandler {
    fn construct(arguments: &mut Arguments) -> Result<Self> {
        Ok(Self::new(arguments.next_handler()?, arguments.value()?))
    }
}
