//! Composable HTTP client built from an ordered pipeline of request handlers.
//!
//! Handlers are registered on a [`ClientBuilder`] and constructed, innermost first, by a
//! [`HandlerFactory`] when the client is built. Every request then flows through the
//! handlers in registration order before reaching the transport.
//!
//! # Example
//!
//! ```ignore
//! use plait::prelude::*;
//!
//! let client = Client::builder()
//!     .base_address("https://api.example.com/".parse()?)
//!     .use_default_request_header("X-Api-Version", "2")
//!     .use_fn(|next, request, cancellation| async move {
//!         let response = next.run(request, cancellation).await?;
//!         tracing::info!(status = response.status(), "received");
//!         Ok(response)
//!     })
//!     .build()?;
//!
//! let response = client.get("users/42").await?;
//! ```
//!
//! Handlers needing dependencies can be built from a [`ServiceContainer`] instead of
//! positional arguments, see [`ClientBuilder::use_container`].

mod builder;
mod client;
mod config;
mod connector;
mod container;
pub mod middleware;
pub mod prelude;
mod transport;

pub use builder::{ClientBuilder, HandlerSpec};
pub use client::Client;
pub use config::{ClientConfig, ClientConfigBuilder, DEFAULT_MAX_RESPONSE_BUFFER_SIZE};
pub use container::{ContainerBuilder, Inject, Resolver, ServiceContainer};
pub use transport::{HyperTransport, ResponseBufferLimit, ServiceTransport};

// Re-export tower for service composition
pub use tower;

// Re-export core types
pub use plait_core::{
    AnonymousFn, AnonymousHandler, Argument, Arguments, BoxHandler, CancellationToken,
    Construct, Constructor, Container, ContainerFactory, DirectFactory, Error, Extensions,
    HANDLER_CAPABILITY, Handler, HandlerFactory, HandlerFuture, HandlerKind, Method, Next,
    Overrides, Proceed, ProceedFn, ProceedHandler, Request, RequestBuilder, RequestParts,
    Response, Result, Value, anonymous_fn, from_json, proceed_fn, to_json,
};

// Re-export http types for status codes and headers
pub use plait_core::{StatusCode, header};

pub use url;
