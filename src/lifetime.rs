//! Part lifetime definitions.

/// Part lifetimes controlling instance sharing
///
/// Decides how many instances of a composed part exist and which
/// composition context caches them.
///
/// # Examples
///
/// ```rust
/// use ferrous_compose::{Catalog, CompositionContainer, ExportProvider, Lifetime, Lookup, ContractKey};
/// use std::sync::Arc;
///
/// struct Clock;
/// struct RequestId(u32);
///
/// let mut catalog = Catalog::new();
/// catalog.add_factory::<Clock, _>(Lifetime::Singleton, None, |_| Ok(Arc::new(Clock)));
/// catalog.add_factory::<RequestId, _>(Lifetime::Scoped, None, |_| Ok(Arc::new(RequestId(7))));
///
/// let container = CompositionContainer::new(catalog);
///
/// // Scoped parts never resolve from the root container.
/// let lookup = container.try_get_export(&ContractKey::of::<RequestId>()).unwrap();
/// assert!(matches!(lookup, Lookup::OutOfScope));
///
/// let scope = container.create_scope().unwrap();
/// let lookup = scope.try_get_export(&ContractKey::of::<RequestId>()).unwrap();
/// assert!(matches!(lookup, Lookup::Found(_)));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Lifetime {
    /// Single instance per root container, shared by every scope
    #[default]
    Singleton,
    /// Single instance per composition scope (one per request or page)
    ///
    /// Requesting a scoped part from the root container crosses the sharing
    /// boundary and is reported as [`Lookup::OutOfScope`](crate::Lookup::OutOfScope).
    Scoped,
    /// New instance per resolution, never cached
    Transient,
}
