//! Bundled dependency container.
//!
//! [`ServiceContainer`] implements [`Container`] for [`ContainerFactory`]. Handlers are
//! registered by kind and build themselves through [`Inject`], pulling dependencies from
//! a [`Resolver`]: supplied overrides first, then the container's registrations.
//!
//! # Example
//!
//! ```ignore
//! use plait::{Client, ContainerBuilder};
//!
//! let mut container = ContainerBuilder::new();
//! container
//!     .register_handler::<AuditHandler>()
//!     .register_instance(AuditLog::default());
//!
//! let client = Client::builder()
//!     .use_container(container)
//!     .use_handler::<AuditHandler>([])
//!     .build()?;
//! ```

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;

use tracing::trace;

use crate::{
    AnonymousHandler, BoxHandler, Container, ContainerFactory, Error, Handler, HandlerKind,
    Overrides, ProceedHandler, Result, Value,
    middleware::{DefaultRequestHeaders, LoggingHandler},
};

/// Handlers buildable by a [`ServiceContainer`].
///
/// # Example
///
/// ```ignore
/// impl Inject for AuditHandler {
///     fn inject(resolver: &mut Resolver<'_>) -> Result<Self> {
///         Ok(Self {
///             next: resolver.handler()?,
///             log: resolver.get()?,
///         })
///     }
/// }
/// ```
pub trait Inject: Handler + Sized {
    /// Build the handler, resolving each dependency from `resolver`.
    fn inject(resolver: &mut Resolver<'_>) -> Result<Self>;
}

type HandlerInjector = fn(&mut Resolver<'_>) -> Result<BoxHandler>;
type ValueInjector = Arc<dyn Fn(&mut Resolver<'_>) -> Result<Value> + Send + Sync>;

fn inject_boxed<H: Inject>(resolver: &mut Resolver<'_>) -> Result<BoxHandler> {
    Ok(Arc::new(H::inject(resolver)?))
}

#[derive(Clone, Copy)]
struct HandlerRegistration {
    name: &'static str,
    inject: HandlerInjector,
}

#[derive(Clone)]
enum ValueRegistration {
    Instance(Value),
    Factory(ValueInjector),
}

/// Builder for [`ServiceContainer`].
///
/// The built-in handler kinds ([`AnonymousHandler`], [`ProceedHandler`],
/// [`DefaultRequestHeaders`], [`LoggingHandler`]) are registered up front.
#[derive(Clone)]
pub struct ContainerBuilder {
    handlers: HashMap<TypeId, HandlerRegistration>,
    any_handler: Vec<TypeId>,
    values: HashMap<TypeId, Vec<ValueRegistration>>,
}

impl Default for ContainerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ContainerBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContainerBuilder")
            .field("handlers", &self.handlers.len())
            .field("values", &self.values.len())
            .finish()
    }
}

impl ContainerBuilder {
    /// Create a builder with the built-in handler kinds registered.
    #[must_use]
    pub fn new() -> Self {
        let mut builder = Self {
            handlers: HashMap::new(),
            any_handler: Vec::new(),
            values: HashMap::new(),
        };
        builder
            .register_handler::<AnonymousHandler>()
            .register_handler::<ProceedHandler>()
            .register_handler::<DefaultRequestHeaders>()
            .register_handler::<LoggingHandler>();
        builder
    }

    /// Register a handler kind, resolvable by its own type.
    pub fn register_handler<H: Inject>(&mut self) -> &mut Self {
        self.handlers.insert(
            TypeId::of::<H>(),
            HandlerRegistration {
                name: std::any::type_name::<H>(),
                inject: inject_boxed::<H>,
            },
        );
        self
    }

    /// Register a handler kind that also answers requests for "any handler".
    pub fn register_as_handler<H: Inject>(&mut self) -> &mut Self {
        self.register_handler::<H>();
        let id = TypeId::of::<H>();
        if !self.any_handler.contains(&id) {
            self.any_handler.push(id);
        }
        self
    }

    /// Register a fixed instance.
    pub fn register_instance<T: Clone + Send + Sync + 'static>(&mut self, value: T) -> &mut Self {
        self.values
            .entry(TypeId::of::<T>())
            .or_default()
            .push(ValueRegistration::Instance(Value::new(value)));
        self
    }

    /// Register a value built from the container each time it is resolved.
    pub fn register_with<T, F>(&mut self, factory: F) -> &mut Self
    where
        T: Clone + Send + Sync + 'static,
        F: Fn(&mut Resolver<'_>) -> Result<T> + Send + Sync + 'static,
    {
        let injector: ValueInjector =
            Arc::new(move |resolver: &mut Resolver<'_>| factory(resolver).map(Value::new));
        self.values
            .entry(TypeId::of::<T>())
            .or_default()
            .push(ValueRegistration::Factory(injector));
        self
    }

    /// Build the container.
    #[must_use]
    pub fn build(self) -> ServiceContainer {
        ServiceContainer {
            handlers: self.handlers,
            any_handler: self.any_handler,
            values: self.values,
        }
    }

    /// Build the container and wrap it in a factory.
    #[must_use]
    pub fn into_factory(self) -> ContainerFactory<ServiceContainer> {
        ContainerFactory::new(self.build())
    }
}

/// Immutable container produced by [`ContainerBuilder`].
pub struct ServiceContainer {
    handlers: HashMap<TypeId, HandlerRegistration>,
    any_handler: Vec<TypeId>,
    values: HashMap<TypeId, Vec<ValueRegistration>>,
}

impl std::fmt::Debug for ServiceContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceContainer")
            .field("handlers", &self.handlers.len())
            .field("values", &self.values.len())
            .finish()
    }
}

impl ServiceContainer {
    fn resolve_handler_by_id(
        &self,
        id: TypeId,
        name: &'static str,
        overrides: Overrides,
        path: &[TypeId],
    ) -> Result<BoxHandler> {
        let registration = self.handlers.get(&id).ok_or_else(|| {
            Error::resolution(name, "handler kind is not registered in the container")
        })?;

        if path.contains(&id) {
            return Err(Error::resolution(
                registration.name,
                "dependency cycle detected",
            ));
        }

        let mut path = path.to_vec();
        path.push(id);

        trace!(kind = registration.name, depth = path.len(), "injecting handler");
        let mut resolver = Resolver {
            container: self,
            kind: registration.name,
            overrides,
            path,
        };
        (registration.inject)(&mut resolver)
    }
}

impl Container for ServiceContainer {
    fn resolve(&self, kind: &HandlerKind, overrides: Overrides) -> Result<BoxHandler> {
        self.resolve_handler_by_id(kind.type_id(), kind.name(), overrides, &[])
    }
}

/// Dependency lookup for one [`Inject::inject`] call.
pub struct Resolver<'a> {
    container: &'a ServiceContainer,
    kind: &'static str,
    overrides: Overrides,
    path: Vec<TypeId>,
}

impl std::fmt::Debug for Resolver<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("kind", &self.kind)
            .field("overrides", &self.overrides.len())
            .finish_non_exhaustive()
    }
}

impl Resolver<'_> {
    /// Name of the kind being built.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        self.kind
    }

    /// Resolve a parameter typed "any handler".
    ///
    /// A supplied handler always wins over handlers registered in the container.
    pub fn handler(&mut self) -> Result<BoxHandler> {
        if let Some(handler) = self.overrides.take_handler() {
            return Ok(handler);
        }

        let container = self.container;
        match container.any_handler.as_slice() {
            [] => Err(Error::resolution(
                self.kind,
                "no handler override supplied and no handler registered as `dyn Handler`",
            )),
            [id] => container.resolve_handler_by_id(
                *id,
                "dyn Handler",
                Overrides::default(),
                &self.path,
            ),
            many => Err(Error::resolution(
                self.kind,
                format!(
                    "ambiguous `dyn Handler`: {} handlers are registered",
                    many.len()
                ),
            )),
        }
    }

    /// Resolve a value of type `T`.
    pub fn get<T: Clone + Send + Sync + 'static>(&mut self) -> Result<T> {
        if let Some(value) = self.overrides.take::<T>() {
            return Ok(value);
        }

        let name = std::any::type_name::<T>();
        let id = TypeId::of::<T>();
        let container = self.container;
        let registration = match container.values.get(&id).map(Vec::as_slice) {
            None | Some([]) => {
                return Err(Error::resolution(
                    self.kind,
                    format!("no registration for `{name}`"),
                ));
            }
            Some([registration]) => registration.clone(),
            Some(many) => {
                return Err(Error::resolution(
                    self.kind,
                    format!("ambiguous `{name}`: {} registrations", many.len()),
                ));
            }
        };

        let value = match registration {
            ValueRegistration::Instance(value) => value,
            ValueRegistration::Factory(factory) => {
                if self.path.contains(&id) {
                    return Err(Error::resolution(
                        self.kind,
                        format!("dependency cycle detected at `{name}`"),
                    ));
                }
                let mut path = self.path.clone();
                path.push(id);
                let mut nested = Resolver {
                    container,
                    kind: name,
                    overrides: Overrides::default(),
                    path,
                };
                factory(&mut nested)?
            }
        };

        value.downcast::<T>().ok_or_else(|| {
            Error::resolution(self.kind, format!("registration for `{name}` has another type"))
        })
    }

    /// Resolve a value of type `T`, or `None` if nothing provides it.
    ///
    /// Ambiguous registrations and failing factories are still errors.
    pub fn get_optional<T: Clone + Send + Sync + 'static>(&mut self) -> Result<Option<T>> {
        let registered = self
            .container
            .values
            .get(&TypeId::of::<T>())
            .is_some_and(|registrations| !registrations.is_empty());
        if let Some(value) = self.overrides.take::<T>() {
            return Ok(Some(value));
        }
        if !registered {
            return Ok(None);
        }
        self.get::<T>().map(Some)
    }
}

// Built-in handlers

impl Inject for AnonymousHandler {
    fn inject(resolver: &mut Resolver<'_>) -> Result<Self> {
        Ok(Self::new(resolver.handler()?, resolver.get()?))
    }
}

impl Inject for ProceedHandler {
    fn inject(resolver: &mut Resolver<'_>) -> Result<Self> {
        Ok(Self::new(resolver.handler()?, resolver.get()?))
    }
}

#[cfg(test)]
mod tests {
    use assert2::{check, let_assert};

    use super::*;
    use crate::{Argument, CancellationToken, HandlerFactory, HandlerFuture, Method, Request, Response};

    #[derive(Clone, Debug, PartialEq)]
    struct Greeting(String);

    struct Terminal(u16);

    impl Handler for Terminal {
        fn send(&self, _request: Request, _cancellation: CancellationToken) -> HandlerFuture {
            let status = self.0;
            Box::pin(async move { Ok(Response::with_status(status)) })
        }
    }

    impl Inject for Terminal {
        fn inject(_resolver: &mut Resolver<'_>) -> Result<Self> {
            Ok(Self(200))
        }
    }

    struct Greeter {
        next: BoxHandler,
        greeting: Greeting,
    }

    impl Handler for Greeter {
        fn send(&self, request: Request, cancellation: CancellationToken) -> HandlerFuture {
            let greeting = self.greeting.0.clone();
            let next = Arc::clone(&self.next);
            Box::pin(async move {
                let mut response = next.send(request, cancellation).await?;
                response.headers_mut().insert("x-greeting".to_string(), greeting);
                Ok(response)
            })
        }
    }

    impl Inject for Greeter {
        fn inject(resolver: &mut Resolver<'_>) -> Result<Self> {
            Ok(Self {
                next: resolver.handler()?,
                greeting: resolver.get()?,
            })
        }
    }

    fn request() -> Request {
        Request::builder(
            Method::Get,
            url::Url::parse("http://test.invalid/").expect("valid URL"),
        )
        .build()
    }

    #[tokio::test]
    async fn resolves_from_registrations() {
        let mut builder = ContainerBuilder::new();
        builder
            .register_handler::<Greeter>()
            .register_as_handler::<Terminal>()
            .register_instance(Greeting("hello".to_string()));
        let factory = builder.into_factory();

        let handler = factory
            .create(&HandlerKind::handler::<Greeter>(), vec![])
            .expect("resolved");
        let response = handler
            .send(request(), CancellationToken::new())
            .await
            .expect("response");

        check!(response.status() == 200);
        check!(response.header("x-greeting") == Some("hello"));
    }

    #[tokio::test]
    async fn overrides_win_over_registrations() {
        let mut builder = ContainerBuilder::new();
        builder
            .register_handler::<Greeter>()
            .register_as_handler::<Terminal>()
            .register_instance(Greeting("registered".to_string()));
        let factory = builder.into_factory();

        let handler = factory
            .create(
                &HandlerKind::handler::<Greeter>(),
                vec![
                    Argument::handler(Terminal(201)),
                    Argument::value(Greeting("supplied".to_string())),
                ],
            )
            .expect("resolved");
        let response = handler
            .send(request(), CancellationToken::new())
            .await
            .expect("response");

        check!(response.status() == 201);
        check!(response.header("x-greeting") == Some("supplied"));
    }

    #[test]
    fn factories_build_values_from_the_container() {
        let mut builder = ContainerBuilder::new();
        builder
            .register_instance(String::from("world"))
            .register_with(|resolver: &mut Resolver<'_>| {
                let name: String = resolver.get()?;
                Ok(Greeting(format!("hello {name}")))
            });
        let container = builder.build();

        let mut resolver = Resolver {
            container: &container,
            kind: "test",
            overrides: Overrides::default(),
            path: Vec::new(),
        };
        check!(resolver.get::<Greeting>().ok() == Some(Greeting("hello world".to_string())));
        check!(resolver.get_optional::<u64>().ok() == Some(None));
    }

    #[test]
    fn unregistered_kind_fails_to_resolve() {
        let factory = ContainerBuilder::new().into_factory();

        let_assert!(
            Err(Error::Resolution { message, .. }) =
                factory.create(&HandlerKind::handler::<Greeter>(), vec![])
        );
        check!(message.contains("not registered"));
    }

    #[test]
    fn ambiguous_values_fail_to_resolve() {
        let mut builder = ContainerBuilder::new();
        builder
            .register_handler::<Greeter>()
            .register_instance(Greeting("a".to_string()))
            .register_instance(Greeting("b".to_string()));
        let factory = builder.into_factory();

        let_assert!(
            Err(Error::Resolution { message, .. }) = factory.create(
                &HandlerKind::handler::<Greeter>(),
                vec![Argument::handler(Terminal(200))],
            )
        );
        check!(message.contains("ambiguous"));
    }

    #[test]
    fn self_dependent_handler_is_a_cycle() {
        let mut builder = ContainerBuilder::new();
        builder
            .register_as_handler::<Greeter>()
            .register_instance(Greeting("loop".to_string()));
        let factory = builder.into_factory();

        let_assert!(
            Err(Error::Resolution { message, .. }) =
                factory.create(&HandlerKind::handler::<Greeter>(), vec![])
        );
        check!(message.contains("cycle"));
    }
}
