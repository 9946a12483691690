//! Client facade over a built pipeline.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::task::{Context, Poll};
use std::time::Duration;

use bytes::Bytes;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tower_service::Service;
use tracing::{Instrument, info_span, warn};
use url::Url;

use crate::{
    BoxHandler, ClientBuilder, ClientConfig, Error, HandlerFuture, Method, Request, Response,
    Result,
    transport::{HyperTransport, ResponseBufferLimit},
};

/// Request settings read on every send. Changing them affects later sends only.
#[derive(Debug, Clone)]
struct Settings {
    base_address: Option<Url>,
    default_headers: HashMap<String, String>,
    timeout: Duration,
    max_response_buffer_size: u64,
}

impl Settings {
    fn from_config(config: &ClientConfig) -> Self {
        Self {
            base_address: config.base_address.clone(),
            default_headers: config.default_headers.clone(),
            timeout: config.timeout,
            max_response_buffer_size: config.max_response_buffer_size,
        }
    }
}

/// HTTP client sending every request through a pipeline of handlers.
///
/// Cloning is cheap: clones share the pipeline, the settings and the pending-request
/// signal.
///
/// # Example
///
/// ```ignore
/// use plait::Client;
///
/// let client = Client::builder()
///     .base_address("https://api.example.com/v1/".parse()?)
///     .use_default_request_header("Accept", "application/json")
///     .build()?;
///
/// let user: User = client.get("users/42").await?.json()?;
/// ```
#[derive(Clone)]
pub struct Client {
    head: BoxHandler,
    settings: Arc<RwLock<Settings>>,
    pending: Arc<Mutex<CancellationToken>>,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("settings", &self.settings())
            .finish_non_exhaustive()
    }
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}

impl Client {
    /// Create a client with no handlers and the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(ClientConfig::default())
    }

    /// Create a client with no handlers and a custom configuration.
    #[must_use]
    pub fn with_config(config: ClientConfig) -> Self {
        Self::from_parts(Arc::new(HyperTransport::new(&config)), &config)
    }

    /// Create a new client builder.
    #[must_use]
    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }

    pub(crate) fn from_parts(head: BoxHandler, config: &ClientConfig) -> Self {
        Self {
            head,
            settings: Arc::new(RwLock::new(Settings::from_config(config))),
            pending: Arc::new(Mutex::new(CancellationToken::new())),
        }
    }

    fn settings(&self) -> Settings {
        self.settings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn update(&self, f: impl FnOnce(&mut Settings)) {
        let mut settings = self
            .settings
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        f(&mut settings);
    }

    fn pending(&self) -> CancellationToken {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    // ========================================================================
    // Properties
    // ========================================================================

    /// Base address relative paths are resolved against.
    #[must_use]
    pub fn base_address(&self) -> Option<Url> {
        self.settings().base_address
    }

    /// Set or clear the base address.
    pub fn set_base_address(&self, base_address: Option<Url>) {
        self.update(|settings| settings.base_address = base_address);
    }

    /// Client default headers.
    #[must_use]
    pub fn default_headers(&self) -> HashMap<String, String> {
        self.settings().default_headers
    }

    /// Add or replace a client default header.
    pub fn set_default_header(&self, name: impl Into<String>, value: impl Into<String>) {
        let (name, value) = (name.into(), value.into());
        self.update(|settings| {
            settings.default_headers.insert(name, value);
        });
    }

    /// Remove a client default header, returning its value.
    pub fn remove_default_header(&self, name: &str) -> Option<String> {
        let mut removed = None;
        self.update(|settings| removed = settings.default_headers.remove(name));
        removed
    }

    /// Request timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.settings().timeout
    }

    /// Set the request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRequest`] if `timeout` is zero.
    pub fn set_timeout(&self, timeout: Duration) -> Result<()> {
        if timeout.is_zero() {
            return Err(Error::invalid_request("timeout must be greater than zero"));
        }
        self.update(|settings| settings.timeout = timeout);
        Ok(())
    }

    /// Maximum number of bytes buffered from a response body.
    #[must_use]
    pub fn max_response_buffer_size(&self) -> u64 {
        self.settings().max_response_buffer_size
    }

    /// Set the maximum number of bytes buffered from a response body.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRequest`] if `bytes` is zero.
    pub fn set_max_response_buffer_size(&self, bytes: u64) -> Result<()> {
        if bytes == 0 {
            return Err(Error::invalid_request(
                "max response buffer size must be greater than zero",
            ));
        }
        self.update(|settings| settings.max_response_buffer_size = bytes);
        Ok(())
    }

    // ========================================================================
    // Sending
    // ========================================================================

    /// Send a request through the pipeline.
    ///
    /// Client default headers are added unless the request already carries them. The
    /// send fails with [`Error::Cancelled`] when `cancellation` fires or
    /// [`Client::cancel_pending_requests`] is called, and with [`Error::Timeout`] once
    /// the configured timeout elapses.
    ///
    /// # Errors
    ///
    /// Any error produced by a handler or the transport, plus the ones above and
    /// [`Error::ResponseTooLarge`].
    pub async fn send(
        &self,
        mut request: Request<Bytes>,
        cancellation: CancellationToken,
    ) -> Result<Response<Bytes>> {
        let settings = self.settings();
        let pending = self.pending();

        for (name, value) in &settings.default_headers {
            let present = request
                .headers()
                .keys()
                .any(|existing| existing.eq_ignore_ascii_case(name));
            if !present {
                request.headers_mut().insert(name.clone(), value.clone());
            }
        }
        let limit = settings.max_response_buffer_size;
        request
            .extensions_mut()
            .insert(ResponseBufferLimit(limit));

        let span = info_span!("plait.send", method = %request.method(), url = %request.url());
        let result = async {
            if cancellation.is_cancelled() || pending.is_cancelled() {
                warn!("request cancelled before entering the pipeline");
                return Err(Error::Cancelled);
            }
            let token = cancellation.child_token();
            let exchange = self.head.send(request, token.clone());

            tokio::select! {
                biased;

                () = cancellation.cancelled() => {
                    warn!("request cancelled by caller");
                    Err(Error::Cancelled)
                }
                () = pending.cancelled() => {
                    token.cancel();
                    warn!("request cancelled by cancel_pending_requests");
                    Err(Error::Cancelled)
                }
                result = tokio::time::timeout(settings.timeout, exchange) => {
                    result.unwrap_or_else(|_| {
                        token.cancel();
                        let timeout_ms =
                            u64::try_from(settings.timeout.as_millis()).unwrap_or(u64::MAX);
                        warn!(timeout_ms, "request timed out");
                        Err(Error::Timeout)
                    })
                }
            }
        }
        .instrument(span)
        .await;

        let response = result?;
        let length = u64::try_from(response.body().len()).unwrap_or(u64::MAX);
        if length > limit {
            return Err(Error::ResponseTooLarge { limit });
        }

        Ok(response)
    }

    /// Send a request without a caller cancellation signal.
    ///
    /// # Errors
    ///
    /// See [`Client::send`].
    pub async fn execute(&self, request: Request<Bytes>) -> Result<Response<Bytes>> {
        self.send(request, CancellationToken::new()).await
    }

    /// Cancel every send currently in flight on this client and its clones.
    ///
    /// Sends started afterwards are unaffected.
    pub fn cancel_pending_requests(&self) {
        let previous = {
            let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
            std::mem::replace(&mut *pending, CancellationToken::new())
        };
        previous.cancel();
    }

    // ========================================================================
    // Convenience
    // ========================================================================

    /// Resolve `url` against the base address. Absolute URLs are returned as is.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidUrl`] if `url` is relative and no base address is set,
    /// or if it cannot be parsed.
    pub fn resolve_url(&self, url: &str) -> Result<Url> {
        match Url::parse(url) {
            Ok(url) => Ok(url),
            Err(url::ParseError::RelativeUrlWithoutBase) => match self.base_address() {
                Some(base) => Ok(base.join(url)?),
                None => Err(Error::InvalidUrl(url::ParseError::RelativeUrlWithoutBase)),
            },
            Err(e) => Err(Error::InvalidUrl(e)),
        }
    }

    fn request(&self, method: Method, url: &str) -> Result<crate::RequestBuilder<Bytes>> {
        Ok(Request::builder(method, self.resolve_url(url)?))
    }

    /// Send a `GET` request.
    ///
    /// # Errors
    ///
    /// See [`Client::send`] and [`Client::resolve_url`].
    pub async fn get(&self, url: &str) -> Result<Response<Bytes>> {
        let request = self.request(Method::Get, url)?.build();
        self.execute(request).await
    }

    /// Send a `DELETE` request.
    ///
    /// # Errors
    ///
    /// See [`Client::send`] and [`Client::resolve_url`].
    pub async fn delete(&self, url: &str) -> Result<Response<Bytes>> {
        let request = self.request(Method::Delete, url)?.build();
        self.execute(request).await
    }

    /// Send a `POST` request with a raw body.
    ///
    /// # Errors
    ///
    /// See [`Client::send`] and [`Client::resolve_url`].
    pub async fn post(&self, url: &str, body: impl Into<Bytes>) -> Result<Response<Bytes>> {
        let request = self.request(Method::Post, url)?.body(body.into()).build();
        self.execute(request).await
    }

    /// Send a `PUT` request with a raw body.
    ///
    /// # Errors
    ///
    /// See [`Client::send`] and [`Client::resolve_url`].
    pub async fn put(&self, url: &str, body: impl Into<Bytes>) -> Result<Response<Bytes>> {
        let request = self.request(Method::Put, url)?.body(body.into()).build();
        self.execute(request).await
    }

    /// Send a `POST` request with a JSON body.
    ///
    /// # Errors
    ///
    /// Returns [`Error::JsonSerialization`] if `value` cannot be serialized, otherwise
    /// see [`Client::send`].
    pub async fn post_json<T: Serialize>(
        &self,
        url: &str,
        value: &T,
    ) -> Result<Response<Bytes>> {
        let request = self.request(Method::Post, url)?.json(value)?.build();
        self.execute(request).await
    }

    /// Send a `PUT` request with a JSON body.
    ///
    /// # Errors
    ///
    /// Returns [`Error::JsonSerialization`] if `value` cannot be serialized, otherwise
    /// see [`Client::send`].
    pub async fn put_json<T: Serialize>(
        &self,
        url: &str,
        value: &T,
    ) -> Result<Response<Bytes>> {
        let request = self.request(Method::Put, url)?.json(value)?.build();
        self.execute(request).await
    }
}

// ============================================================================
// Tower Service Implementation
// ============================================================================

impl Service<Request<Bytes>> for Client {
    type Response = Response<Bytes>;
    type Error = Error;
    type Future = HandlerFuture;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: Request<Bytes>) -> Self::Future {
        let client = self.clone();
        Box::pin(async move { client.execute(request).await })
    }
}
