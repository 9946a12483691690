//! Default request header middleware.
//!
//! Adds one header to every request passing through the link. If the request already
//! carries the header, the value is appended to the existing one, comma separated.

use std::sync::Arc;

use bytes::Bytes;
use tokio_util::sync::CancellationToken;

use crate::{
    Arguments, BoxHandler, Construct, Handler, HandlerFuture, Request, Result,
    container::{Inject, Resolver},
};

/// Handler adding a header to every request.
///
/// Constructed from `(next, name, value)`.
///
/// # Example
///
/// ```ignore
/// use plait::Client;
///
/// let client = Client::builder()
///     .use_default_request_header("X-Api-Version", "2")
///     .build()?;
/// ```
#[derive(Debug, Clone)]
pub struct DefaultRequestHeaders {
    next: BoxHandler,
    name: Arc<str>,
    value: Arc<str>,
}

impl DefaultRequestHeaders {
    /// Add `name: value` to requests before handing them to `next`.
    pub fn new(next: BoxHandler, name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            next,
            name: Arc::from(name.into()),
            value: Arc::from(value.into()),
        }
    }

    /// Header name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Header value.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    fn apply(&self, request: &mut Request<Bytes>) {
        let headers = request.headers_mut();
        let existing = headers
            .iter_mut()
            .find(|(name, _)| name.eq_ignore_ascii_case(&self.name));

        match existing {
            Some((_, current)) => {
                current.push_str(", ");
                current.push_str(&self.value);
            }
            None => {
                headers.insert(self.name.to_string(), self.value.to_string());
            }
        }
    }
}

impl Handler for DefaultRequestHeaders {
    fn send(&self, mut request: Request<Bytes>, cancellation: CancellationToken) -> HandlerFuture {
        self.apply(&mut request);
        self.next.send(request, cancellation)
    }
}

impl Construct for DefaultRequestHeaders {
    fn construct(arguments: &mut Arguments) -> Result<Self> {
        let next = arguments.next_handler()?;
        let name: String = arguments.value()?;
        let value: String = arguments.value()?;
        Ok(Self::new(next, name, value))
    }
}

/// Both strings come from the supplied overrides, name first.
impl Inject for DefaultRequestHeaders {
    fn inject(resolver: &mut Resolver<'_>) -> Result<Self> {
        let next = resolver.handler()?;
        let name: String = resolver.get()?;
        let value: String = resolver.get()?;
        Ok(Self::new(next, name, value))
    }
}
