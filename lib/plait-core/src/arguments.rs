//! Construction arguments.
//!
//! An [`Argument`] is either a handler (always the abstract [`BoxHandler`], whatever its
//! concrete type) or an opaque typed value. Positional constructors consume them in
//! order through [`Arguments`].

use std::any::{Any, TypeId};
use std::collections::VecDeque;
use std::sync::Arc;

use crate::{BoxHandler, Error, Handler, Result};

/// A type-erased construction value.
#[derive(Clone)]
pub struct Value {
    type_id: TypeId,
    type_name: &'static str,
    value: Arc<dyn Any + Send + Sync>,
}

impl Value {
    /// Wrap a value.
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            value: Arc::new(value),
        }
    }

    /// Runtime type of the wrapped value.
    #[must_use]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Name of the wrapped value's type.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Clone the wrapped value out if it has type `T`.
    #[must_use]
    pub fn downcast<T: Clone + 'static>(&self) -> Option<T> {
        self.value.downcast_ref::<T>().cloned()
    }
}

impl std::fmt::Debug for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Value").field(&self.type_name).finish()
    }
}

/// One construction argument.
#[derive(Debug, Clone)]
pub enum Argument {
    /// A handler, typed as "any handler".
    Handler(BoxHandler),
    /// Any other value.
    Value(Value),
}

impl Argument {
    /// A handler argument.
    pub fn handler(handler: impl Handler) -> Self {
        Self::Handler(Arc::new(handler))
    }

    /// A value argument.
    ///
    /// A [`BoxHandler`] passed here still becomes [`Argument::Handler`].
    pub fn value<T: Any + Send + Sync>(value: T) -> Self {
        if let Some(handler) = (&value as &dyn Any).downcast_ref::<BoxHandler>() {
            return Self::Handler(Arc::clone(handler));
        }
        Self::Value(Value::new(value))
    }

    /// Name of the argument's type, as seen by constructors.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Handler(_) => "dyn Handler",
            Self::Value(value) => value.type_name(),
        }
    }
}

impl From<BoxHandler> for Argument {
    fn from(handler: BoxHandler) -> Self {
        Self::Handler(handler)
    }
}

/// Positional cursor over the arguments of one construction.
#[derive(Debug)]
pub struct Arguments {
    kind: &'static str,
    items: VecDeque<Argument>,
    position: usize,
}

impl Arguments {
    /// Arguments for constructing `kind`.
    pub fn new(kind: &'static str, items: impl IntoIterator<Item = Argument>) -> Self {
        Self {
            kind,
            items: items.into_iter().collect(),
            position: 0,
        }
    }

    /// Number of arguments not consumed yet.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` when every argument was consumed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Take the next argument as a handler.
    pub fn next_handler(&mut self) -> Result<BoxHandler> {
        match self.take("dyn Handler")? {
            Argument::Handler(handler) => Ok(handler),
            Argument::Value(value) => Err(self.mismatch("dyn Handler", value.type_name())),
        }
    }

    /// Take the next argument as a value of type `T`.
    pub fn value<T: Clone + Send + Sync + 'static>(&mut self) -> Result<T> {
        let expected = std::any::type_name::<T>();
        match self.take(expected)? {
            Argument::Value(value) => value
                .downcast::<T>()
                .ok_or_else(|| self.mismatch(expected, value.type_name())),
            Argument::Handler(_) => Err(self.mismatch(expected, "dyn Handler")),
        }
    }

    /// Check that nothing is left over.
    pub fn finish(self) -> Result<()> {
        if self.items.is_empty() {
            return Ok(());
        }
        let leftover = self
            .items
            .iter()
            .map(Argument::type_name)
            .collect::<Vec<_>>()
            .join(", ");
        Err(Error::construction(
            self.kind,
            format!(
                "no constructor accepts {} arguments (unused: {leftover})",
                self.position + self.items.len()
            ),
        ))
    }

    /// Remaining arguments, in order.
    #[must_use]
    pub fn into_inner(self) -> Vec<Argument> {
        self.items.into()
    }

    fn take(&mut self, expected: &str) -> Result<Argument> {
        let argument = self.items.pop_front().ok_or_else(|| {
            Error::construction(
                self.kind,
                format!("missing argument `{expected}` at position {}", self.position),
            )
        })?;
        self.position += 1;
        Ok(argument)
    }

    fn mismatch(&self, expected: &str, found: &str) -> Error {
        Error::construction(
            self.kind,
            format!(
                "expected `{expected}` at position {}, found `{found}`",
                self.position - 1
            ),
        )
    }
}

#[cfg(test)]
mod tests {
    use assert2::{check, let_assert};

    use super::*;
    use crate::{HandlerFuture, Request, Response};
    use tokio_util::sync::CancellationToken;

    struct Terminal;

    impl Handler for Terminal {
        fn send(&self, _request: Request, _cancellation: CancellationToken) -> HandlerFuture {
            Box::pin(async { Ok(Response::with_status(200)) })
        }
    }

    #[test]
    fn boxed_handler_value_is_a_handler_argument() {
        let handler: BoxHandler = Arc::new(Terminal);
        check!(matches!(Argument::value(handler), Argument::Handler(_)));
        check!(matches!(Argument::handler(Terminal), Argument::Handler(_)));
        check!(matches!(Argument::value(42_u32), Argument::Value(_)));
    }

    #[test]
    fn positional_consumption() {
        let mut arguments = Arguments::new(
            "Sample",
            [
                Argument::handler(Terminal),
                Argument::value("name".to_string()),
                Argument::value(3_u32),
            ],
        );

        check!(arguments.len() == 3);
        check!(arguments.next_handler().is_ok());
        check!(arguments.value::<String>().ok() == Some("name".to_string()));
        check!(arguments.value::<u32>().ok() == Some(3));
        check!(arguments.is_empty());
        check!(arguments.finish().is_ok());
    }

    #[test]
    fn type_mismatch_names_position() {
        let mut arguments = Arguments::new("Sample", [Argument::value(3_u32)]);

        let_assert!(Err(err) = arguments.value::<String>());
        check!(err.is_construction());
        check!(err.to_string().contains("position 0"));
        check!(err.to_string().contains("u32"));
    }

    #[test]
    fn handler_expected_but_value_found() {
        let mut arguments = Arguments::new("Sample", [Argument::value(1_i64)]);

        let_assert!(Err(Error::Construction { kind, .. }) = arguments.next_handler());
        check!(kind == "Sample");
    }

    #[test]
    fn missing_argument() {
        let mut arguments = Arguments::new("Sample", []);

        let_assert!(Err(err) = arguments.value::<u32>());
        check!(err.to_string().contains("missing argument"));
    }

    #[test]
    fn leftovers_fail_finish() {
        let mut arguments = Arguments::new(
            "Sample",
            [Argument::handler(Terminal), Argument::value(1_u8)],
        );
        check!(arguments.next_handler().is_ok());

        let_assert!(Err(err) = arguments.finish());
        check!(err.to_string().contains("no constructor accepts 2 arguments"));
        check!(err.to_string().contains("u8"));
    }
}
