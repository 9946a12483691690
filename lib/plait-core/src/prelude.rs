//! Prelude module for convenient imports.
//!
//! This module re-exports the most commonly used types and functions
//! for easy glob importing:
//!
//! ```ignore
//! use plait_core::prelude::*;
//! ```

pub use crate::{
    Argument, Arguments, BoxHandler, CancellationToken, Construct, Error, Handler,
    HandlerFactory, HandlerFuture, HandlerKind, Method, Next, Proceed, Request, Response, Result,
};
