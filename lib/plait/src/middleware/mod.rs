//! Handlers bundled with plait.
//!
//! Each handler implements both [`crate::Construct`] (positional arguments, used by the
//! default factory) and [`crate::Inject`] (used by [`crate::ServiceContainer`]), so it can
//! be registered with either strategy.
//!
//! - [`DefaultRequestHeaders`] - Adds a header to every request
//! - [`LoggingHandler`] - Logs requests/responses using `tracing`
//!
//! # Example
//!
//! ```ignore
//! use plait::{Argument, Client, middleware::{LogLevel, LoggingHandler}};
//!
//! let client = Client::builder()
//!     .use_default_request_header("Accept", "application/json")
//!     .use_handler::<LoggingHandler>([Argument::value(LogLevel::Debug)])
//!     .build()?;
//! ```

mod default_headers;
mod logging;

pub use default_headers::DefaultRequestHeaders;
pub use logging::{LogLevel, LoggingHandler};
