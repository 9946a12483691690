//! Handler kinds.
//!
//! A [`HandlerKind`] is the token the builder registers and the factories construct
//! from. It names a type and records what that type can do: nothing, act as a
//! handler, or act as a handler with a positional constructor.

use std::any::TypeId;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::{Arguments, BoxHandler, Error, Handler, Result};

/// Capability every construction target must provide.
pub const HANDLER_CAPABILITY: &str = "Handler";

/// Positional constructor of a handler kind.
pub type Constructor = fn(Arguments) -> Result<BoxHandler>;

/// Handlers constructible from positional [`Arguments`].
///
/// The first argument is the next handler of the pipeline; the builder always passes it.
///
/// # Example
///
/// ```
/// use plait_core::{Arguments, BoxHandler, Construct, Handler, HandlerFuture, Request, Result};
/// use tokio_util::sync::CancellationToken;
///
/// struct Tag {
///     next: BoxHandler,
///     value: String,
/// }
///
/// impl Handler for Tag {
///     fn send(&self, mut request: Request, cancellation: CancellationToken) -> HandlerFuture {
///         request
///             .headers_mut()
///             .insert("x-tag".to_string(), self.value.clone());
///         self.next.send(request, cancellation)
///     }
/// }
///
/// impl Construct for Tag {
///     fn construct(arguments: &mut Arguments) -> Result<Self> {
///         Ok(Self {
///             next: arguments.next_handler()?,
///             value: arguments.value()?,
///         })
///     }
/// }
/// ```
pub trait Construct: Handler + Sized {
    /// Build the handler, consuming its arguments in order.
    ///
    /// Arguments left over after this returns fail the construction.
    fn construct(arguments: &mut Arguments) -> Result<Self>;
}

fn construct_boxed<H: Construct>(mut arguments: Arguments) -> Result<BoxHandler> {
    let handler = H::construct(&mut arguments)?;
    arguments.finish()?;
    Ok(Arc::new(handler))
}

#[derive(Clone, Copy)]
enum Capability {
    None,
    Handler,
    Positional(Constructor),
}

/// Identifies a construction target.
///
/// Two kinds are equal when they name the same type.
#[derive(Clone, Copy)]
pub struct HandlerKind {
    type_id: TypeId,
    name: &'static str,
    capability: Capability,
}

impl HandlerKind {
    /// Kind of a handler with a positional constructor.
    #[must_use]
    pub fn of<H: Construct>() -> Self {
        Self {
            type_id: TypeId::of::<H>(),
            name: std::any::type_name::<H>(),
            capability: Capability::Positional(construct_boxed::<H>),
        }
    }

    /// Kind of a handler without a positional constructor (e.g. container-resolved only).
    #[must_use]
    pub fn handler<H: Handler>() -> Self {
        Self {
            type_id: TypeId::of::<H>(),
            name: std::any::type_name::<H>(),
            capability: Capability::Handler,
        }
    }

    /// Kind of an arbitrary type that is not known to be a handler.
    ///
    /// Constructing it always fails with [`Error::UnsupportedHandlerKind`].
    #[must_use]
    pub fn opaque<T: ?Sized + 'static>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
            capability: Capability::None,
        }
    }

    /// Type name of the kind.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Type id of the kind.
    #[must_use]
    pub const fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Returns `true` if the kind implements [`Handler`].
    #[must_use]
    pub const fn is_handler(&self) -> bool {
        !matches!(self.capability, Capability::None)
    }

    /// Fail unless the kind implements [`Handler`].
    pub fn ensure_handler(&self) -> Result<()> {
        if self.is_handler() {
            return Ok(());
        }
        Err(Error::unsupported_handler_kind(
            self.name,
            HANDLER_CAPABILITY,
        ))
    }

    /// Positional constructor, if the kind has one.
    #[must_use]
    pub const fn constructor(&self) -> Option<Constructor> {
        match self.capability {
            Capability::Positional(constructor) => Some(constructor),
            Capability::None | Capability::Handler => None,
        }
    }
}

impl PartialEq for HandlerKind {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for HandlerKind {}

impl Hash for HandlerKind {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
    }
}

impl std::fmt::Debug for HandlerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let capability = match self.capability {
            Capability::None => "none",
            Capability::Handler => "handler",
            Capability::Positional(_) => "positional",
        };
        f.debug_struct("HandlerKind")
            .field("name", &self.name)
            .field("capability", &capability)
            .finish()
    }
}
