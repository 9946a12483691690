//! Error types for plait.
//!
//! Errors fall in two families:
//! - construction errors, raised while a pipeline is built
//!   ([`Error::UnsupportedHandlerKind`], [`Error::Construction`], [`Error::Resolution`]);
//! - request errors, raised by a single send ([`Error::is_request_failure`] and
//!   [`Error::Cancelled`]).

use derive_more::{Display, Error, From};

/// Main error type for plait operations.
#[derive(Debug, Display, Error, From)]
pub enum Error {
    /// The construction target is not a handler.
    #[display("{kind} must implement {capability}")]
    #[from(skip)]
    UnsupportedHandlerKind {
        /// Name of the offending kind.
        kind: String,
        /// Capability the kind is required to provide.
        capability: &'static str,
    },

    /// No positional constructor accepts the supplied arguments.
    #[display("cannot construct {kind}: {message}")]
    #[from(skip)]
    Construction {
        /// Name of the handler kind being constructed.
        kind: String,
        /// What went wrong.
        message: String,
    },

    /// A dependency could not be resolved from the container.
    #[display("cannot resolve {kind}: {message}")]
    #[from(skip)]
    Resolution {
        /// Name of the handler kind being resolved.
        kind: String,
        /// What went wrong.
        message: String,
    },

    /// Network/connection errors.
    #[display("connection error: {_0}")]
    #[from(skip)]
    Connection(#[error(not(source))] String),

    /// TLS/SSL errors.
    #[display("TLS error: {_0}")]
    #[from(skip)]
    Tls(#[error(not(source))] String),

    /// Request timeout.
    #[display("request timeout")]
    #[from(skip)]
    Timeout,

    /// The operation was aborted by a cancellation signal.
    #[display("request cancelled")]
    #[from(skip)]
    Cancelled,

    /// Response body exceeds the configured buffer size.
    #[display("response body exceeds the buffer limit of {limit} bytes")]
    #[from(skip)]
    ResponseTooLarge {
        /// Configured limit in bytes.
        limit: u64,
    },

    /// Invalid request configuration.
    #[display("invalid request: {_0}")]
    #[from(skip)]
    InvalidRequest(#[error(not(source))] String),

    /// JSON serialization error.
    #[display("JSON serialization error: {_0}")]
    #[from]
    JsonSerialization(serde_json::Error),

    /// JSON deserialization error with path context.
    #[display("JSON deserialization error at '{path}': {message}")]
    #[from(skip)]
    JsonDeserialization {
        /// JSON path to the error (e.g., "user.address.city").
        path: String,
        /// Error message.
        message: String,
    },

    /// URL parsing error.
    #[display("invalid URL: {_0}")]
    #[from]
    InvalidUrl(url::ParseError),
}

/// Result type alias using [`crate::Error`].
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create an unsupported handler kind error.
    #[must_use]
    pub fn unsupported_handler_kind(kind: impl Into<String>, capability: &'static str) -> Self {
        Self::UnsupportedHandlerKind {
            kind: kind.into(),
            capability,
        }
    }

    /// Create a construction error.
    #[must_use]
    pub fn construction(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Construction {
            kind: kind.into(),
            message: message.into(),
        }
    }

    /// Create a resolution error.
    #[must_use]
    pub fn resolution(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Resolution {
            kind: kind.into(),
            message: message.into(),
        }
    }

    /// Create a connection error.
    #[must_use]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection(message.into())
    }

    /// Create a TLS error.
    #[must_use]
    pub fn tls(message: impl Into<String>) -> Self {
        Self::Tls(message.into())
    }

    /// Create an invalid request error.
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    /// Create a JSON deserialization error with path context.
    #[must_use]
    pub fn json_deserialization(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::JsonDeserialization {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Returns `true` if this is a timeout error.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout)
    }

    /// Returns `true` if this is a connection error.
    #[must_use]
    pub const fn is_connection(&self) -> bool {
        matches!(self, Self::Connection(_))
    }

    /// Returns `true` if the operation was cancelled.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Returns `true` if this error was raised while building a pipeline.
    #[must_use]
    pub const fn is_construction(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedHandlerKind { .. } | Self::Construction { .. } | Self::Resolution { .. }
        )
    }

    /// Returns `true` for transport-level failures of a single request.
    ///
    /// Cancellation is not a request failure.
    #[must_use]
    pub const fn is_request_failure(&self) -> bool {
        matches!(
            self,
            Self::Connection(_)
                | Self::Tls(_)
                | Self::Timeout
                | Self::InvalidRequest(_)
                | Self::InvalidUrl(_)
                | Self::ResponseTooLarge { .. }
        )
    }
}
