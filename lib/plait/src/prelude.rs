//! Prelude module for convenient imports.
//!
//! This module re-exports the most commonly used types and functions
//! for easy glob importing:
//!
//! ```ignore
//! use plait::prelude::*;
//! ```

pub use crate::{
    Argument, Arguments, BoxHandler, CancellationToken, Client, ClientBuilder, ClientConfig,
    Construct, ContainerBuilder, Error, Handler, HandlerFuture, HandlerKind, Inject, Method,
    Next, Proceed, Request, Response, Result, Resolver, StatusCode, from_json, to_json,
};
pub use serde::{Deserialize, Serialize};
