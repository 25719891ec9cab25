//! Per-request decorators.
//!
//! The composition core only recognizes decorator types (see
//! [`DecoratorSpecification`](crate::DecoratorSpecification)) and exports
//! them under [`DECORATOR_KEY`]. Applying them to requests is up to the
//! adapter layer that owns the request.

use std::any::Any;
use std::sync::Arc;

/// Key decorator exports are registered under by the default conventions.
pub const DECORATOR_KEY: &str = "decorator";

/// Wraps a service for the duration of one request.
///
/// # Examples
///
/// ```rust
/// use ferrous_compose::{ConventionBuilder, Decorator, Lifetime, TypeDescriptor};
/// use std::any::Any;
/// use std::sync::Arc;
///
/// trait Mailbox: Send + Sync {
///     fn unread(&self) -> usize;
/// }
///
/// struct Muted;
/// impl Decorator<dyn Mailbox> for Muted {
///     fn create_per_request_decorator(&self, inner: Arc<dyn Mailbox>, _request: &dyn Any) -> Arc<dyn Mailbox> {
///         inner
///     }
/// }
///
/// let descriptor = TypeDescriptor::builder::<Muted>()
///     .export_as::<dyn Decorator<dyn Mailbox>, _>(|m| m as Arc<dyn Decorator<dyn Mailbox>>)
///     .build();
/// assert!(ConventionBuilder::with_defaults().rules()[0].applies_to(&descriptor));
/// ```
pub trait Decorator<T: ?Sized>: Send + Sync {
    /// Returns the service to use for `request` in place of `inner`.
    fn create_per_request_decorator(&self, inner: Arc<T>, request: &dyn Any) -> Arc<T>;
}
