//! Composable boolean predicates over type descriptors.
//!
//! Conventions select the types they apply to with a [`Specification`].
//! The built-in ones cover namespaces, implemented interfaces (matched by
//! generic definition), view models and decorators; closures and the
//! `and`/`or`/`not` combinators cover the rest.

use std::marker::PhantomData;
use std::sync::Arc;

use crate::decoration::Decorator;
use crate::descriptors::{generic_definition, TypeDescriptor, TypeKind};
use crate::error::{ComposeError, ComposeResult};

/// A predicate over `T`.
pub trait Specification<T: ?Sized>: Send + Sync {
    fn is_satisfied_by(&self, candidate: &T) -> bool;

    /// Like [`is_satisfied_by`](Self::is_satisfied_by); an absent candidate
    /// never matches.
    fn matches(&self, candidate: Option<&T>) -> bool {
        candidate.is_some_and(|c| self.is_satisfied_by(c))
    }
}

impl<T: ?Sized, S: Specification<T> + ?Sized> Specification<T> for Box<S> {
    fn is_satisfied_by(&self, candidate: &T) -> bool {
        (**self).is_satisfied_by(candidate)
    }
}

impl<T: ?Sized, S: Specification<T> + ?Sized> Specification<T> for Arc<S> {
    fn is_satisfied_by(&self, candidate: &T) -> bool {
        (**self).is_satisfied_by(candidate)
    }
}

/// Combinators for every specification.
///
/// # Examples
///
/// ```rust
/// use ferrous_compose::{NamespaceSpecification, Specification, SpecificationExt, TypeDescriptor, ViewModelSpecification};
///
/// struct InboxViewModel;
/// let descriptor = TypeDescriptor::builder::<InboxViewModel>()
///     .namespace("app.mail")
///     .name("InboxViewModel")
///     .build();
///
/// let mail = NamespaceSpecification::new("app.mail").unwrap();
/// let spec = mail.and(ViewModelSpecification);
/// assert!(spec.is_satisfied_by(&descriptor));
/// assert!(!spec.clone().not().is_satisfied_by(&descriptor));
/// assert!(!spec.matches(None));
/// ```
pub trait SpecificationExt<T: ?Sized>: Specification<T> + Sized {
    fn and<S: Specification<T>>(self, other: S) -> And<Self, S> {
        And(self, other)
    }

    fn or<S: Specification<T>>(self, other: S) -> Or<Self, S> {
        Or(self, other)
    }

    fn not(self) -> Not<Self> {
        Not(self)
    }
}

impl<T: ?Sized, S: Specification<T>> SpecificationExt<T> for S {}

/// Both specifications hold. Short-circuits.
#[derive(Debug, Clone)]
pub struct And<A, B>(A, B);

impl<T: ?Sized, A: Specification<T>, B: Specification<T>> Specification<T> for And<A, B> {
    fn is_satisfied_by(&self, candidate: &T) -> bool {
        self.0.is_satisfied_by(candidate) && self.1.is_satisfied_by(candidate)
    }
}

/// Either specification holds. Short-circuits.
#[derive(Debug, Clone)]
pub struct Or<A, B>(A, B);

impl<T: ?Sized, A: Specification<T>, B: Specification<T>> Specification<T> for Or<A, B> {
    fn is_satisfied_by(&self, candidate: &T) -> bool {
        self.0.is_satisfied_by(candidate) || self.1.is_satisfied_by(candidate)
    }
}

#[derive(Debug, Clone)]
pub struct Not<A>(A);

impl<T: ?Sized, A: Specification<T>> Specification<T> for Not<A> {
    fn is_satisfied_by(&self, candidate: &T) -> bool {
        !self.0.is_satisfied_by(candidate)
    }
}

/// Closure-backed specification.
pub struct FnSpecification<T: ?Sized, F> {
    predicate: F,
    _marker: PhantomData<fn(&T)>,
}

impl<T: ?Sized, F> FnSpecification<T, F>
where
    F: Fn(&T) -> bool + Send + Sync,
{
    pub fn new(predicate: F) -> Self {
        Self {
            predicate,
            _marker: PhantomData,
        }
    }
}

impl<T: ?Sized, F> Specification<T> for FnSpecification<T, F>
where
    F: Fn(&T) -> bool + Send + Sync,
{
    fn is_satisfied_by(&self, candidate: &T) -> bool {
        (self.predicate)(candidate)
    }
}

/// Types in a namespace or any namespace nested below it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceSpecification {
    namespace: String,
}

impl NamespaceSpecification {
    pub fn new(namespace: impl Into<String>) -> ComposeResult<Self> {
        let namespace = namespace.into();
        if namespace.trim().is_empty() {
            return Err(ComposeError::invalid_argument(
                "namespace",
                "namespace must not be empty",
            ));
        }
        Ok(Self { namespace })
    }

    /// Namespace of `T`'s descriptor.
    pub fn of<T: crate::Composable>() -> ComposeResult<Self> {
        Self::new(T::describe().namespace())
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }
}

impl Specification<TypeDescriptor> for NamespaceSpecification {
    fn is_satisfied_by(&self, candidate: &TypeDescriptor) -> bool {
        candidate
            .namespace()
            .strip_prefix(self.namespace.as_str())
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('.'))
    }
}

/// Types implementing an interface, compared by generic definition.
///
/// `InterfaceSpecification::of::<dyn Handler<()>>()` is satisfied by types
/// implementing `Handler<X>` for any `X`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceSpecification {
    definition: String,
}

impl InterfaceSpecification {
    pub fn of<I: ?Sized + 'static>() -> Self {
        Self {
            definition: generic_definition(std::any::type_name::<I>()),
        }
    }

    /// From an interface path such as `app::Handler`.
    pub fn definition(name: &str) -> ComposeResult<Self> {
        let definition = generic_definition(name);
        if definition.is_empty() {
            return Err(ComposeError::invalid_argument(
                "name",
                "interface name must not be empty",
            ));
        }
        Ok(Self { definition })
    }

    pub fn interface_definition(&self) -> &str {
        &self.definition
    }
}

impl Specification<TypeDescriptor> for InterfaceSpecification {
    fn is_satisfied_by(&self, candidate: &TypeDescriptor) -> bool {
        candidate
            .interfaces()
            .iter()
            .any(|interface| interface.definition() == self.definition)
    }
}

/// Public concrete classes whose name or namespace contains `ViewModel`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ViewModelSpecification;

impl Specification<TypeDescriptor> for ViewModelSpecification {
    fn is_satisfied_by(&self, candidate: &TypeDescriptor) -> bool {
        candidate.kind() == TypeKind::Class
            && candidate.is_public()
            && !candidate.is_abstract()
            && (candidate.name().contains("ViewModel") || candidate.namespace().contains("ViewModel"))
    }
}

/// Types implementing [`Decorator<T>`] for any `T`.
#[derive(Debug, Clone)]
pub struct DecoratorSpecification {
    interface: InterfaceSpecification,
}

impl Default for DecoratorSpecification {
    fn default() -> Self {
        Self {
            interface: InterfaceSpecification::of::<dyn Decorator<()>>(),
        }
    }
}

impl DecoratorSpecification {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Specification<TypeDescriptor> for DecoratorSpecification {
    fn is_satisfied_by(&self, candidate: &TypeDescriptor) -> bool {
        self.interface.is_satisfied_by(candidate)
    }
}
