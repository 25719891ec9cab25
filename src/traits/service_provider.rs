//! Service provider traits for adapter-level resolution.

use std::sync::Arc;

use crate::disassembler::ServiceType;
use crate::error::ComposeResult;
use crate::registration::{downcast_export, AnyArc};

/// Result of a provider request.
///
/// Single requests answer `Single(None)` when nothing matches; collection
/// requests answer an empty `Collection`, never an absent one.
#[derive(Debug, Clone)]
pub enum Resolution {
    Single(Option<AnyArc>),
    Collection(Vec<AnyArc>),
}

impl Resolution {
    /// The single value, or the first element of a collection.
    pub fn into_single(self) -> Option<AnyArc> {
        match self {
            Resolution::Single(value) => value,
            Resolution::Collection(values) => values.into_iter().next(),
        }
    }

    /// All values; a single answer becomes a collection of zero or one.
    pub fn into_collection(self) -> Vec<AnyArc> {
        match self {
            Resolution::Single(value) => value.into_iter().collect(),
            Resolution::Collection(values) => values,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Resolution::Single(value) => value.is_none(),
            Resolution::Collection(values) => values.is_empty(),
        }
    }
}

/// Object-safe service lookup by [`ServiceType`].
///
/// Most callers use the typed methods of [`ServiceProviderExt`] instead.
pub trait ServiceProvider: Send + Sync {
    fn get_service(&self, service_type: &ServiceType) -> ComposeResult<Resolution>;
}

/// Service lookup qualified by a key.
pub trait KeyedServiceProvider: ServiceProvider {
    fn get_keyed_service(&self, service_type: &ServiceType, key: &str) -> ComposeResult<Resolution>;
}

/// Typed resolution on top of [`KeyedServiceProvider`].
///
/// # Examples
///
/// ```
/// use ferrous_compose::{CompositionServiceProvider, ServiceOverrides, ServiceProviderExt};
/// use ferrous_compose::{Catalog, CompositionContainer};
/// use std::sync::Arc;
///
/// trait Theme: Send + Sync {
///     fn name(&self) -> &str;
/// }
/// struct Dark;
/// impl Theme for Dark {
///     fn name(&self) -> &str { "dark" }
/// }
///
/// let mut overrides = ServiceOverrides::new();
/// overrides.add::<dyn Theme>(Arc::new(Dark));
///
/// let engine = CompositionContainer::new(Catalog::new());
/// let provider = CompositionServiceProvider::with_overrides(Arc::new(engine), Arc::new(overrides));
///
/// assert_eq!(provider.get::<dyn Theme>().unwrap().unwrap().name(), "dark");
/// assert_eq!(provider.get_all::<dyn Theme>().unwrap().len(), 1);
/// assert!(provider.get_all::<String>().unwrap().is_empty());
/// ```
pub trait ServiceProviderExt: KeyedServiceProvider {
    fn get<S>(&self) -> ComposeResult<Option<Arc<S>>>
    where
        S: ?Sized + Send + Sync + 'static,
    {
        self.get_service(&ServiceType::of::<S>())?
            .into_single()
            .map(downcast_export::<S>)
            .transpose()
    }

    fn get_keyed<S>(&self, key: &str) -> ComposeResult<Option<Arc<S>>>
    where
        S: ?Sized + Send + Sync + 'static,
    {
        self.get_keyed_service(&ServiceType::of::<S>(), key)?
            .into_single()
            .map(downcast_export::<S>)
            .transpose()
    }

    fn get_all<S>(&self) -> ComposeResult<Vec<Arc<S>>>
    where
        S: ?Sized + Send + Sync + 'static,
    {
        self.get_service(&ServiceType::many::<S>())?
            .into_collection()
            .into_iter()
            .map(downcast_export::<S>)
            .collect()
    }

    fn get_all_keyed<S>(&self, key: &str) -> ComposeResult<Vec<Arc<S>>>
    where
        S: ?Sized + Send + Sync + 'static,
    {
        self.get_keyed_service(&ServiceType::many::<S>(), key)?
            .into_collection()
            .into_iter()
            .map(downcast_export::<S>)
            .collect()
    }
}

impl<P: KeyedServiceProvider + ?Sized> ServiceProviderExt for P {}
