//! Handler construction factories.
//!
//! - [`DirectFactory`] - matches arguments positionally against a kind's [`Construct`] impl
//! - [`ContainerFactory`] - turns arguments into typed [`Overrides`] and delegates to a
//!   [`Container`]
//!
//! [`Construct`]: crate::Construct

use std::any::TypeId;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use tracing::trace;

use crate::{Argument, Arguments, BoxHandler, Error, HandlerKind, Result, Value};

/// Turns a handler kind and its arguments into a handler instance.
///
/// Factories are only used while a pipeline is built; they never perform I/O.
pub trait HandlerFactory: Send + Sync {
    /// Construct a handler of the given kind.
    ///
    /// # Errors
    ///
    /// - [`Error::UnsupportedHandlerKind`] if the kind is not a handler
    /// - [`Error::Construction`] or [`Error::Resolution`] depending on the strategy
    fn create(&self, kind: &HandlerKind, arguments: Vec<Argument>) -> Result<BoxHandler>;
}

impl<F: HandlerFactory + ?Sized> HandlerFactory for Arc<F> {
    fn create(&self, kind: &HandlerKind, arguments: Vec<Argument>) -> Result<BoxHandler> {
        (**self).create(kind, arguments)
    }
}

// ============================================================================
// Direct Strategy
// ============================================================================

/// Default factory: positional construction.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectFactory;

impl HandlerFactory for DirectFactory {
    fn create(&self, kind: &HandlerKind, arguments: Vec<Argument>) -> Result<BoxHandler> {
        kind.ensure_handler()?;

        let constructor = kind.constructor().ok_or_else(|| {
            Error::construction(kind.name(), "no positional constructor is available")
        })?;

        trace!(kind = kind.name(), arguments = arguments.len(), "constructing handler");
        constructor(Arguments::new(kind.name(), arguments))
    }
}

// ============================================================================
// Container-Backed Strategy
// ============================================================================

/// Typed overrides supplied for one container resolution.
///
/// Handler arguments are keyed by the abstract handler type, never by their concrete
/// type. Several overrides of one type are handed out in the order they were supplied.
#[derive(Debug, Default)]
pub struct Overrides {
    handlers: VecDeque<BoxHandler>,
    values: HashMap<TypeId, VecDeque<Value>>,
}

impl Overrides {
    /// Overrides built from construction arguments.
    #[must_use]
    pub fn from_arguments(arguments: impl IntoIterator<Item = Argument>) -> Self {
        let mut overrides = Self::default();
        for argument in arguments {
            match argument {
                Argument::Handler(handler) => overrides.handlers.push_back(handler),
                Argument::Value(value) => overrides
                    .values
                    .entry(value.type_id())
                    .or_default()
                    .push_back(value),
            }
        }
        overrides
    }

    /// Take the next handler override.
    pub fn take_handler(&mut self) -> Option<BoxHandler> {
        self.handlers.pop_front()
    }

    /// Take the next override of type `T`.
    pub fn take<T: Clone + 'static>(&mut self) -> Option<T> {
        self.values
            .get_mut(&TypeId::of::<T>())
            .and_then(VecDeque::pop_front)
            .and_then(|value| value.downcast::<T>())
    }

    /// Number of overrides not taken yet.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len() + self.values.values().map(VecDeque::len).sum::<usize>()
    }

    /// Returns `true` when no override is left.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Dependency container consumed by [`ContainerFactory`].
///
/// The pipeline only needs one operation: resolve a handler kind, preferring the
/// supplied overrides over the container's own registrations.
pub trait Container: Send + Sync {
    /// Resolve a handler of the given kind.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Resolution`] for missing registrations, ambiguous bindings or
    /// dependency cycles.
    fn resolve(&self, kind: &HandlerKind, overrides: Overrides) -> Result<BoxHandler>;
}

impl<C: Container + ?Sized> Container for Arc<C> {
    fn resolve(&self, kind: &HandlerKind, overrides: Overrides) -> Result<BoxHandler> {
        (**self).resolve(kind, overrides)
    }
}

/// Factory resolving handlers from a [`Container`].
#[derive(Debug, Clone)]
pub struct ContainerFactory<C> {
    container: C,
}

impl<C: Container> ContainerFactory<C> {
    /// Create a factory over the given container.
    #[must_use]
    pub const fn new(container: C) -> Self {
        Self { container }
    }

    /// The underlying container.
    #[must_use]
    pub const fn container(&self) -> &C {
        &self.container
    }
}

impl<C: Container> HandlerFactory for ContainerFactory<C> {
    fn create(&self, kind: &HandlerKind, arguments: Vec<Argument>) -> Result<BoxHandler> {
        kind.ensure_handler()?;

        let overrides = Overrides::from_arguments(arguments);
        trace!(kind = kind.name(), overrides = overrides.len(), "resolving handler");
        self.container.resolve(kind, overrides)
    }
}

#[cfg(test)]
mod tests {
    use assert2::{check, let_assert};
    use tokio_util::sync::CancellationToken;

    use super::*;
    use crate::{Construct, Handler, HandlerFuture, Request, Response};

    #[derive(Clone)]
    struct Terminal(u16);

    impl Handler for Terminal {
        fn send(&self, _request: Request, _cancellation: CancellationToken) -> HandlerFuture {
            let status = self.0;
            Box::pin(async move { Ok(Response::with_status(status)) })
        }
    }

    struct Labelled {
        next: BoxHandler,
        label: String,
    }

    impl Handler for Labelled {
        fn send(&self, request: Request, cancellation: CancellationToken) -> HandlerFuture {
            let label = self.label.clone();
            let next = Arc::clone(&self.next);
            Box::pin(async move {
                let mut response = next.send(request, cancellation).await?;
                response.headers_mut().insert("x-label".to_string(), label);
                Ok(response)
            })
        }
    }

    impl Construct for Labelled {
        fn construct(arguments: &mut Arguments) -> Result<Self> {
            Ok(Self {
                next: arguments.next_handler()?,
                label: arguments.value()?,
            })
        }
    }

    fn request() -> Request {
        Request::builder(
            crate::Method::Get,
            url::Url::parse("http://test.invalid/").expect("valid URL"),
        )
        .build()
    }

    #[tokio::test]
    async fn direct_factory_constructs_positionally() {
        let handler = DirectFactory
            .create(
                &HandlerKind::of::<Labelled>(),
                vec![
                    Argument::handler(Terminal(204)),
                    Argument::value("first".to_string()),
                ],
            )
            .expect("constructed");

        let response = handler
            .send(request(), CancellationToken::new())
            .await
            .expect("response");
        check!(response.status() == 204);
        check!(response.header("x-label") == Some("first"));
    }

    #[test]
    fn direct_factory_rejects_non_handlers() {
        let result = DirectFactory.create(&HandlerKind::opaque::<String>(), vec![]);

        let_assert!(Err(err) = result);
        check!(err.to_string() == "alloc::string::String must implement Handler");
    }

    #[test]
    fn direct_factory_requires_a_positional_constructor() {
        let result = DirectFactory.create(
            &HandlerKind::handler::<Terminal>(),
            vec![Argument::handler(Terminal(200))],
        );

        let_assert!(Err(Error::Construction { message, .. }) = result);
        check!(message.contains("no positional constructor"));
    }

    #[test]
    fn direct_factory_reports_incompatible_arguments() {
        let result = DirectFactory.create(
            &HandlerKind::of::<Labelled>(),
            vec![Argument::handler(Terminal(200)), Argument::value(7_u64)],
        );

        let_assert!(Err(err) = result);
        check!(err.is_construction());
        check!(err.to_string().contains("Labelled"));
    }

    #[test]
    fn overrides_key_handlers_under_the_abstract_type() {
        let mut overrides = Overrides::from_arguments([
            Argument::handler(Terminal(200)),
            Argument::value("a".to_string()),
            Argument::value("b".to_string()),
            Argument::value(1_u8),
        ]);

        check!(overrides.len() == 4);
        check!(overrides.take::<Terminal>().is_none());
        check!(overrides.take_handler().is_some());
        check!(overrides.take::<String>() == Some("a".to_string()));
        check!(overrides.take::<String>() == Some("b".to_string()));
        check!(overrides.take::<String>().is_none());
        check!(overrides.take::<u8>() == Some(1));
        check!(overrides.is_empty());
    }

    struct FixedContainer;

    impl Container for FixedContainer {
        fn resolve(&self, _kind: &HandlerKind, mut overrides: Overrides) -> Result<BoxHandler> {
            overrides
                .take_handler()
                .ok_or_else(|| Error::resolution("Fixed", "no handler override"))
        }
    }

    #[test]
    fn container_factory_checks_capability_first() {
        let factory = ContainerFactory::new(FixedContainer);

        let result = factory.create(
            &HandlerKind::opaque::<u32>(),
            vec![Argument::handler(Terminal(200))],
        );
        let_assert!(Err(Error::UnsupportedHandlerKind { .. }) = result);

        let result = factory.create(&HandlerKind::handler::<Terminal>(), vec![]);
        let_assert!(Err(Error::Resolution { .. }) = result);
    }
}
