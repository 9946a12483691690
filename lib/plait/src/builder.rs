//! Pipeline builder.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use url::Url;

use crate::{
    AnonymousHandler, Argument, BoxHandler, Client, ClientConfigBuilder, Construct,
    ContainerBuilder, DirectFactory, Handler, HandlerFactory, HandlerKind, Next, Proceed,
    ProceedHandler, Request, Response, Result, anonymous_fn,
    middleware::{DefaultRequestHeaders, LogLevel, LoggingHandler},
    proceed_fn,
    transport::HyperTransport,
};

/// A registered handler: its kind and the arguments supplied after `next`.
#[derive(Debug, Clone)]
pub struct HandlerSpec {
    kind: HandlerKind,
    arguments: Vec<Argument>,
}

impl HandlerSpec {
    /// Create a spec.
    pub fn new(kind: HandlerKind, arguments: impl IntoIterator<Item = Argument>) -> Self {
        Self {
            kind,
            arguments: arguments.into_iter().collect(),
        }
    }

    /// Handler kind.
    #[must_use]
    pub const fn kind(&self) -> &HandlerKind {
        &self.kind
    }

    /// Extra arguments, in the order supplied.
    #[must_use]
    pub fn arguments(&self) -> &[Argument] {
        &self.arguments
    }
}

/// Builder for [`Client`].
///
/// Handlers are registered in order: the first registered is the outermost (sees the
/// request first and the response last); the last registered sits next to the
/// transport. Nothing is constructed until [`ClientBuilder::build`].
///
/// # Example
///
/// ```ignore
/// use plait::{Argument, Client};
/// use std::time::Duration;
///
/// let client = Client::builder()
///     .timeout(Duration::from_secs(10))
///     .use_default_request_header("Accept", "application/json")
///     .use_handler::<RetryHandler>([Argument::value(3_u32)])
///     .use_proceed(|proceed| async move {
///         tracing::info!(url = %proceed.request().url(), "outgoing");
///         proceed.run().await
///     })
///     .build()?;
/// ```
pub struct ClientBuilder {
    config: ClientConfigBuilder,
    specs: Vec<HandlerSpec>,
    factory: Arc<dyn HandlerFactory>,
    transport: Option<BoxHandler>,
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self {
            config: ClientConfigBuilder::default(),
            specs: Vec::new(),
            factory: Arc::new(DirectFactory),
            transport: None,
        }
    }
}

impl std::fmt::Debug for ClientBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientBuilder")
            .field("config", &self.config)
            .field("specs", &self.specs)
            .field("custom_transport", &self.transport.is_some())
            .finish_non_exhaustive()
    }
}

impl ClientBuilder {
    // ========================================================================
    // Core Configuration
    // ========================================================================

    /// Set the request timeout, covering the whole pipeline.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config = self.config.timeout(timeout);
        self
    }

    /// Set the connection timeout.
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config = self.config.connect_timeout(timeout);
        self
    }

    /// Set the maximum idle connections per host.
    #[must_use]
    pub fn pool_idle_per_host(mut self, count: usize) -> Self {
        self.config = self.config.pool_idle_per_host(count);
        self
    }

    /// Set the idle connection timeout.
    #[must_use]
    pub fn pool_idle_timeout(mut self, timeout: Duration) -> Self {
        self.config = self.config.pool_idle_timeout(timeout);
        self
    }

    /// Set the base address relative paths are resolved against.
    #[must_use]
    pub fn base_address(mut self, url: Url) -> Self {
        self.config = self.config.base_address(url);
        self
    }

    /// Add a client default header (only set on requests that do not carry it).
    #[must_use]
    pub fn default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.config = self.config.default_header(name, value);
        self
    }

    /// Set the maximum number of bytes buffered from a response body.
    #[must_use]
    pub fn max_response_buffer_size(mut self, bytes: u64) -> Self {
        self.config = self.config.max_response_buffer_size(bytes);
        self
    }

    // ========================================================================
    // Pipeline
    // ========================================================================

    /// Register a handler type with extra construction arguments.
    #[must_use]
    pub fn use_handler<H: Construct>(self, arguments: impl IntoIterator<Item = Argument>) -> Self {
        self.use_kind(HandlerKind::of::<H>(), arguments)
    }

    /// Register a handler kind with extra construction arguments.
    ///
    /// Whether the kind is constructible is only checked by [`ClientBuilder::build`].
    #[must_use]
    pub fn use_kind(mut self, kind: HandlerKind, arguments: impl IntoIterator<Item = Argument>) -> Self {
        self.specs.push(HandlerSpec::new(kind, arguments));
        self
    }

    /// Replace the factory used to construct handlers. The last call wins.
    #[must_use]
    pub fn use_factory(mut self, factory: impl HandlerFactory + 'static) -> Self {
        self.factory = Arc::new(factory);
        self
    }

    /// Construct handlers from a [`crate::ServiceContainer`].
    #[must_use]
    pub fn use_container(self, container: ContainerBuilder) -> Self {
        self.use_factory(container.into_factory())
    }

    /// Register an inline handler that forwards explicitly through [`Next`].
    ///
    /// # Example
    ///
    /// ```ignore
    /// let client = Client::builder()
    ///     .use_fn(|next, mut request, cancellation| async move {
    ///         request.headers_mut().insert("X-Id".into(), "42".into());
    ///         next.run(request, cancellation).await
    ///     })
    ///     .build()?;
    /// ```
    #[must_use]
    pub fn use_fn<F, Fut>(self, f: F) -> Self
    where
        F: Fn(Next, Request<Bytes>, CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response<Bytes>>> + Send + 'static,
    {
        self.use_handler::<AnonymousHandler>([Argument::value(anonymous_fn(f))])
    }

    /// Register an inline handler receiving a pre-bound [`Proceed`].
    #[must_use]
    pub fn use_proceed<F, Fut>(self, f: F) -> Self
    where
        F: Fn(Proceed) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response<Bytes>>> + Send + 'static,
    {
        self.use_handler::<ProceedHandler>([Argument::value(proceed_fn(f))])
    }

    /// Register a [`DefaultRequestHeaders`] link adding `name: value` to every request.
    #[must_use]
    pub fn use_default_request_header(
        self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.use_handler::<DefaultRequestHeaders>([
            Argument::value(name.into()),
            Argument::value(value.into()),
        ])
    }

    /// Register a [`LoggingHandler`] at info level.
    #[must_use]
    pub fn use_logging(self) -> Self {
        self.use_handler::<LoggingHandler>([])
    }

    /// Register a [`LoggingHandler`] at debug level.
    #[must_use]
    pub fn use_debug_logging(self) -> Self {
        self.use_handler::<LoggingHandler>([Argument::value(LogLevel::Debug)])
    }

    /// Replace the terminal transport.
    #[must_use]
    pub fn transport(mut self, transport: impl Handler) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Registered handlers, outermost first.
    #[must_use]
    pub fn specs(&self) -> &[HandlerSpec] {
        &self.specs
    }

    /// Build the client.
    ///
    /// Handlers are constructed innermost first, each receiving the previously built
    /// handler as its first argument.
    ///
    /// # Errors
    ///
    /// Returns the first construction error; no client is produced in that case.
    pub fn build(self) -> Result<Client> {
        let config = self.config.build();
        let mut current = match self.transport {
            Some(transport) => transport,
            None => Arc::new(HyperTransport::new(&config)),
        };

        for (position, spec) in self.specs.into_iter().enumerate().rev() {
            let HandlerSpec { kind, arguments } = spec;
            let arguments = std::iter::once(Argument::Handler(current))
                .chain(arguments)
                .collect();
            current = self.factory.create(&kind, arguments)?;
            debug!(kind = kind.name(), position, "constructed handler");
        }

        info!(
            timeout_ms = u64::try_from(config.timeout.as_millis()).unwrap_or(u64::MAX),
            "client pipeline built"
        );
        Ok(Client::from_parts(current, &config))
    }
}
