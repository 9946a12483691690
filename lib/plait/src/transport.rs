//! Terminal transports.
//!
//! A transport is the innermost handler of a pipeline: it performs the exchange and has
//! no next handler.
//! - [`HyperTransport`] - real network I/O through hyper-util and rustls
//! - [`ServiceTransport`] - any tower [`Service`], e.g. an in-process stub

use std::collections::HashMap;

use bytes::Bytes;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper_rustls::HttpsConnector;
use hyper_util::{
    client::legacy::{Client, connect::HttpConnector},
    rt::TokioExecutor,
};
use tokio_util::sync::CancellationToken;
use tower::{Service, ServiceExt};
use tracing::debug;

use crate::{
    ClientConfig, Error, Handler, HandlerFuture, Request, RequestParts, Response, Result,
    connector::https_connector,
};

/// Request property carrying the buffer limit of the sending client.
///
/// [`crate::Client`] attaches it to every request; [`HyperTransport`] stops reading a
/// response body once the limit is exceeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseBufferLimit(pub u64);

// ============================================================================
// Hyper Transport
// ============================================================================

/// Transport performing real HTTP exchanges with connection pooling and TLS.
#[derive(Clone)]
pub struct HyperTransport {
    inner: Client<HttpsConnector<HttpConnector>, Full<Bytes>>,
}

impl std::fmt::Debug for HyperTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HyperTransport").finish_non_exhaustive()
    }
}

impl HyperTransport {
    /// Create a transport from the connection settings of `config`.
    #[must_use]
    pub fn new(config: &ClientConfig) -> Self {
        let inner = Client::builder(TokioExecutor::new())
            .pool_idle_timeout(config.pool_idle_timeout)
            .pool_max_idle_per_host(config.pool_idle_per_host)
            .build(https_connector(config));

        Self { inner }
    }

    fn build_hyper_request(request: Request<Bytes>) -> Result<http::Request<Full<Bytes>>> {
        let RequestParts {
            method,
            url,
            headers,
            body,
            extensions,
        } = request.into_parts();

        let mut builder = http::Request::builder()
            .method(http::Method::from(method))
            .uri(url.as_str());

        for (name, value) in &headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let body = body.map_or_else(Full::default, Full::new);
        let mut http_request = builder
            .body(body)
            .map_err(|e| Error::invalid_request(e.to_string()))?;

        *http_request.extensions_mut() = extensions;

        Ok(http_request)
    }

    fn extract_headers(headers: &http::HeaderMap) -> HashMap<String, String> {
        headers
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.to_string(), v.to_string()))
            })
            .collect()
    }

    async fn execute(&self, request: Request<Bytes>) -> Result<Response<Bytes>> {
        let limit = request
            .extensions()
            .get::<ResponseBufferLimit>()
            .map(|limit| limit.0);
        let hyper_request = Self::build_hyper_request(request)?;

        let response = self
            .inner
            .request(hyper_request)
            .await
            .map_err(Self::map_hyper_error)?;

        let status = response.status().as_u16();
        let response_headers = Self::extract_headers(response.headers());

        let body = match limit {
            Some(limit) => {
                let max = usize::try_from(limit).unwrap_or(usize::MAX);
                Limited::new(response.into_body(), max)
                    .collect()
                    .await
                    .map_err(|e| {
                        if e.downcast_ref::<LengthLimitError>().is_some() {
                            Error::ResponseTooLarge { limit }
                        } else {
                            Error::connection(e.to_string())
                        }
                    })?
                    .to_bytes()
            }
            None => response
                .into_body()
                .collect()
                .await
                .map_err(|e| Error::connection(e.to_string()))?
                .to_bytes(),
        };

        Ok(Response::new(status, response_headers, body))
    }

    #[allow(clippy::needless_pass_by_value)]
    fn map_hyper_error(err: hyper_util::client::legacy::Error) -> Error {
        let msg = err.to_string();

        if err.is_connect() {
            return Error::connection(msg);
        }

        if msg.contains("ssl") || msg.contains("tls") || msg.contains("certificate") {
            return Error::tls(msg);
        }

        Error::connection(msg)
    }
}

impl Handler for HyperTransport {
    fn send(&self, request: Request<Bytes>, cancellation: CancellationToken) -> HandlerFuture {
        let transport = self.clone();
        Box::pin(async move {
            tokio::select! {
                () = cancellation.cancelled() => {
                    debug!("transport exchange aborted");
                    Err(Error::Cancelled)
                }
                result = transport.execute(request) => result,
            }
        })
    }
}

// ============================================================================
// Tower Service Transport
// ============================================================================

/// Transport delegating to a tower [`Service`].
///
/// # Example
///
/// ```ignore
/// use plait::{Response, ServiceTransport};
///
/// let stub = ServiceTransport::new(tower::service_fn(|_request| async {
///     Ok::<_, plait::Error>(Response::with_status(200))
/// }));
/// ```
#[derive(Debug, Clone)]
pub struct ServiceTransport<S> {
    service: S,
}

impl<S> ServiceTransport<S> {
    /// Wrap a service.
    pub const fn new(service: S) -> Self {
        Self { service }
    }
}

impl<S> Handler for ServiceTransport<S>
where
    S: Service<Request<Bytes>, Response = Response<Bytes>, Error = Error>
        + Clone
        + Send
        + Sync
        + 'static,
    S::Future: Send,
{
    fn send(&self, request: Request<Bytes>, cancellation: CancellationToken) -> HandlerFuture {
        let service = self.service.clone();
        Box::pin(async move {
            tokio::select! {
                () = cancellation.cancelled() => Err(Error::Cancelled),
                result = service.oneshot(request) => result,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use assert2::{check, let_assert};

    use super::*;
    use crate::Method;

    fn request() -> Request {
        Request::builder(
            Method::Get,
            url::Url::parse("http://test.invalid/").expect("valid URL"),
        )
        .build()
    }

    #[test]
    fn creates_transport_without_io() {
        let transport = HyperTransport::new(&ClientConfig::default());
        check!(format!("{transport:?}").contains("HyperTransport"));
    }

    #[tokio::test]
    async fn service_transport_delegates() {
        let transport = ServiceTransport::new(tower::service_fn(|request: Request| async move {
            let mut response = Response::with_status(200);
            response
                .headers_mut()
                .insert("x-path".to_string(), request.url().path().to_string());
            Ok::<_, Error>(response)
        }));

        let response = transport
            .send(request(), CancellationToken::new())
            .await
            .expect("response");
        check!(response.header("x-path") == Some("/"));
    }

    #[tokio::test]
    async fn service_transport_observes_cancellation() {
        let transport = ServiceTransport::new(tower::service_fn(|_request: Request| async {
            std::future::pending::<()>().await;
            Ok::<_, Error>(Response::with_status(200))
        }));
        let cancellation = CancellationToken::new();
        cancellation.cancel();

        let_assert!(Err(err) = transport.send(request(), cancellation).await);
        check!(err.is_cancelled());
    }
}
