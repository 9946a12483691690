//! Request/response logging middleware.
//!
//! This handler logs requests and responses using the `tracing` crate.

use std::time::Instant;

use bytes::Bytes;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, Level, debug, info, span, warn};

use crate::{
    Arguments, BoxHandler, Construct, Handler, HandlerFuture, Request, Result,
    container::{Inject, Resolver},
};

/// Log level for the logging handler.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogLevel {
    /// Log at debug level (request/response details).
    Debug,
    /// Log at info level (summary only).
    #[default]
    Info,
}

/// Handler that logs requests and responses.
///
/// Constructed from `(next)` or `(next, LogLevel)`.
///
/// # Example
///
/// ```ignore
/// use plait::Client;
///
/// let client = Client::builder()
///     .use_debug_logging()
///     .build()?;
/// ```
#[derive(Debug, Clone)]
pub struct LoggingHandler {
    next: BoxHandler,
    level: LogLevel,
}

impl LoggingHandler {
    /// Log at info level in front of `next`.
    #[must_use]
    pub fn new(next: BoxHandler) -> Self {
        Self::with_level(next, LogLevel::Info)
    }

    /// Log at `level` in front of `next`.
    #[must_use]
    pub const fn with_level(next: BoxHandler, level: LogLevel) -> Self {
        Self { next, level }
    }

    /// Configured level.
    #[must_use]
    pub const fn level(&self) -> LogLevel {
        self.level
    }
}

impl Handler for LoggingHandler {
    fn send(&self, request: Request<Bytes>, cancellation: CancellationToken) -> HandlerFuture {
        let method = request.method();
        let url = request.url().to_string();
        let level = self.level;

        let span = span!(Level::INFO, "http_request", %method, %url);

        let next = BoxHandler::clone(&self.next);
        Box::pin(
            async move {
                let start = Instant::now();

                match level {
                    LogLevel::Debug => {
                        debug!(
                            method = %method,
                            url = %url,
                            headers = ?request.headers(),
                            "sending request"
                        );
                    }
                    LogLevel::Info => {
                        info!(method = %method, url = %url, "sending request");
                    }
                }

                let result = next.send(request, cancellation).await;

                // Saturating conversion to u64 (truncates after ~584 million years)
                let elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

                match &result {
                    Ok(response) => {
                        let status = response.status();
                        if response.is_success() {
                            info!(status, elapsed_ms, "request completed");
                        } else {
                            warn!(status, elapsed_ms, "request failed with HTTP error");
                        }
                    }
                    Err(err) => {
                        warn!(error = %err, elapsed_ms, "request failed");
                    }
                }

                result
            }
            .instrument(span),
        )
    }
}

impl Construct for LoggingHandler {
    fn construct(arguments: &mut Arguments) -> Result<Self> {
        let next = arguments.next_handler()?;
        let level = if arguments.is_empty() {
            LogLevel::default()
        } else {
            arguments.value()?
        };
        Ok(Self::with_level(next, level))
    }
}

impl Inject for LoggingHandler {
    fn inject(resolver: &mut Resolver<'_>) -> Result<Self> {
        let next = resolver.handler()?;
        let level = resolver.get_optional::<LogLevel>()?.unwrap_or_default();
        Ok(Self::with_level(next, level))
    }
}
