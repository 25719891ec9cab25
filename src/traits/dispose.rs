//! Disposal trait for resource cleanup.

/// Trait for synchronous resource disposal.
///
/// Implement this trait for parts that need structured teardown (flushing
/// caches, closing connections). Hooks registered through
/// [`Imports::register_disposer`](crate::Imports::register_disposer) run in
/// LIFO order when the owning container or scope is disposed.
///
/// # Examples
///
/// ```
/// use ferrous_compose::{Catalog, CompositionContainer, ContractKey, Dispose, ExportProvider, Lifetime};
/// use std::sync::atomic::{AtomicBool, Ordering};
/// use std::sync::Arc;
///
/// struct Cache {
///     flushed: AtomicBool,
/// }
///
/// impl Dispose for Cache {
///     fn dispose(&self) {
///         self.flushed.store(true, Ordering::SeqCst);
///     }
/// }
///
/// let mut catalog = Catalog::new();
/// catalog.add_factory::<Cache, _>(Lifetime::Singleton, None, |ctx| {
///     let cache = Arc::new(Cache { flushed: AtomicBool::new(false) });
///     ctx.register_disposer(cache.clone());
///     Ok(cache)
/// });
///
/// let container = CompositionContainer::new(catalog);
/// let cache = container.get_export::<Cache>().unwrap().unwrap();
/// container.dispose();
/// assert!(cache.flushed.load(Ordering::SeqCst));
/// ```
pub trait Dispose: Send + Sync + 'static {
    /// Perform synchronous cleanup of resources.
    fn dispose(&self);
}
