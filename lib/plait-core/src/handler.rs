//! The handler contract.
//!
//! A pipeline is a singly linked chain of [`Handler`]s. Every non-terminal handler owns
//! exactly one reference to the next link and decides, per request, whether to delegate
//! to it or to answer on its own. The terminal transport has no next link.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use tokio_util::sync::CancellationToken;

use crate::{Request, Response, Result};

/// Future returned by [`Handler::send`].
pub type HandlerFuture = Pin<Box<dyn Future<Output = Result<Response<Bytes>>> + Send + 'static>>;

/// Shared, type-erased handler. This is the "any handler" type of the pipeline.
pub type BoxHandler = Arc<dyn Handler>;

/// One link of the request pipeline.
///
/// Handlers are shared between concurrent sends, so they must not keep per-request
/// state on `self`: anything that varies per call is derived inside `send`.
///
/// # Example
///
/// ```
/// use plait_core::{BoxHandler, Handler, HandlerFuture, Request};
/// use tokio_util::sync::CancellationToken;
///
/// struct Tag {
///     next: BoxHandler,
/// }
///
/// impl Handler for Tag {
///     fn send(&self, mut request: Request, cancellation: CancellationToken) -> HandlerFuture {
///         request
///             .headers_mut()
///             .insert("x-tag".to_string(), "1".to_string());
///         self.next.send(request, cancellation)
///     }
/// }
/// ```
pub trait Handler: Send + Sync + 'static {
    /// Process a request, optionally delegating to the next handler.
    ///
    /// The cancellation signal must be forwarded unchanged when delegating.
    fn send(&self, request: Request<Bytes>, cancellation: CancellationToken) -> HandlerFuture;
}

impl std::fmt::Debug for dyn Handler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("dyn Handler")
    }
}
