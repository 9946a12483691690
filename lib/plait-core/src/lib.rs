//! Core types and traits for the plait handler pipeline.
//!
//! This crate provides the transport-independent pieces:
//! - [`Method`], [`Request`] and [`Response`] - HTTP message types
//! - [`Error`] and [`Result`] - Error handling
//! - [`Handler`] - The contract every pipeline link implements
//! - [`HandlerKind`], [`Argument`] and [`Construct`] - What factories build from
//! - [`HandlerFactory`] - Construction strategies ([`DirectFactory`], [`ContainerFactory`])
//! - [`AnonymousHandler`] and [`ProceedHandler`] - Handlers defined inline as functions

mod anonymous;
mod arguments;
mod error;
mod factory;
mod handler;
mod json;
mod kind;
mod method;
pub mod prelude;
mod request;
mod response;

pub use anonymous::{
    AnonymousFn, AnonymousHandler, Next, Proceed, ProceedFn, ProceedHandler, anonymous_fn,
    proceed_fn,
};
pub use arguments::{Argument, Arguments, Value};
pub use error::{Error, Result};
pub use factory::{Container, ContainerFactory, DirectFactory, HandlerFactory, Overrides};
pub use handler::{BoxHandler, Handler, HandlerFuture};
pub use json::{from_json, to_json};
pub use kind::{Construct, Constructor, HANDLER_CAPABILITY, HandlerKind};
pub use method::Method;
pub use request::{Request, RequestBuilder, RequestParts};
pub use response::Response;

// Re-export http crate types for status codes and headers
pub use http::{Extensions, StatusCode, header};

// Re-export the cancellation signal threaded through every handler
pub use tokio_util::sync::CancellationToken;
