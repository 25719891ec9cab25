//! Catalog module: manual export registrations and assemblies of
//! convention-composed types.

use std::sync::Arc;

use crate::container::ExportContext;
use crate::descriptors::Caster;
use crate::error::ComposeResult;
use crate::key::ContractKey;
use crate::lifetime::Lifetime;
use crate::registration::{erase_export, AnyArc, Part, PartCtor, Registration, Registry};

pub mod assembly;
pub use assembly::{Assembly, Composable};

/// Manual exports a [`CompositionContainer`](crate::CompositionContainer)
/// starts from.
///
/// Registrations are append-only. Several registrations of one contract are
/// all kept in order: the first answers single lookups, all of them answer
/// collection lookups.
pub struct Catalog {
    registry: Registry,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}

impl Catalog {
    pub fn new() -> Self {
        Self {
            registry: Registry::new(),
        }
    }

    /// Registers an existing value as a singleton export of `S`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ferrous_compose::{Catalog, CompositionContainer, ExportProvider};
    /// use std::sync::Arc;
    ///
    /// trait Clock: Send + Sync {
    ///     fn now(&self) -> u64;
    /// }
    /// struct Fixed;
    /// impl Clock for Fixed {
    ///     fn now(&self) -> u64 { 42 }
    /// }
    ///
    /// let mut catalog = Catalog::new();
    /// catalog
    ///     .add_instance::<dyn Clock>(None, Arc::new(Fixed))
    ///     .add_instance::<dyn Clock>(Some("utc"), Arc::new(Fixed));
    ///
    /// let container = CompositionContainer::new(catalog);
    /// assert_eq!(container.get_export::<dyn Clock>().unwrap().unwrap().now(), 42);
    /// assert!(container.get_keyed_export::<dyn Clock>("utc").unwrap().is_some());
    /// ```
    pub fn add_instance<S>(&mut self, key: Option<&str>, value: Arc<S>) -> &mut Self
    where
        S: ?Sized + Send + Sync + 'static,
    {
        let stored = erase_export(value);
        self.insert::<S>(
            key,
            Lifetime::Singleton,
            Arc::new(move |_: &ExportContext<'_>| -> ComposeResult<AnyArc> { Ok(stored.clone()) }),
        )
    }

    /// Registers a factory composing exports of `S` with the given lifetime.
    pub fn add_factory<S, F>(&mut self, lifetime: Lifetime, key: Option<&str>, factory: F) -> &mut Self
    where
        S: ?Sized + Send + Sync + 'static,
        F: Fn(&ExportContext<'_>) -> ComposeResult<Arc<S>> + Send + Sync + 'static,
    {
        self.insert::<S>(
            key,
            lifetime,
            Arc::new(move |ctx: &ExportContext<'_>| factory(ctx).map(erase_export)),
        )
    }

    /// Like [`add_instance`](Self::add_instance), unless `S` already has an
    /// export under the same key. Returns whether the value was added.
    pub fn try_add_instance<S>(&mut self, key: Option<&str>, value: Arc<S>) -> bool
    where
        S: ?Sized + Send + Sync + 'static,
    {
        if self.contains(&Self::contract::<S>(key)) {
            return false;
        }
        self.add_instance(key, value);
        true
    }

    pub fn contains(&self, contract: &ContractKey) -> bool {
        self.registry.contains(contract)
    }

    /// Number of registered parts.
    pub fn len(&self) -> usize {
        self.registry.part_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn into_registry(self) -> Registry {
        self.registry
    }

    fn contract<S: ?Sized + 'static>(key: Option<&str>) -> ContractKey {
        match key {
            Some(key) => ContractKey::keyed::<S>(key),
            None => ContractKey::of::<S>(),
        }
    }

    fn insert<S>(&mut self, key: Option<&str>, lifetime: Lifetime, ctor: PartCtor) -> &mut Self
    where
        S: ?Sized + Send + Sync + 'static,
    {
        let part = Arc::new(Part::new(std::any::type_name::<S>(), lifetime, ctor));
        let identity: Caster = Arc::new(Ok);
        self.registry.insert(
            Self::contract::<S>(key),
            Registration {
                part,
                cast: identity,
            },
        );
        self.registry.note_part();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn try_add_respects_existing_exports() {
        let mut catalog = Catalog::new();
        assert!(catalog.try_add_instance::<u32>(None, Arc::new(1)));
        assert!(!catalog.try_add_instance::<u32>(None, Arc::new(2)));
        assert!(catalog.try_add_instance::<u32>(Some("other"), Arc::new(3)));
        assert_eq!(catalog.len(), 2);
    }

    #[test]
    fn empty_catalog_reports_empty() {
        assert!(Catalog::new().is_empty());
    }
}
