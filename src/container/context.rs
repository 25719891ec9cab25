//! Contexts handed to part constructors.
//!
//! [`ExportContext`] is what manual factories receive; [`Imports`] wraps it
//! for convention-composed parts and adds typed setting reads.

use std::any::type_name;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::trace;

use super::{ContainerInner, ExportProvider, Lookup};
use crate::descriptors::{MemberKind, TypeDescriptor};
use crate::error::{ComposeError, ComposeResult};
use crate::key::ContractKey;
use crate::registration::downcast_export;
use crate::setting::{Environment, SettingAttribute, SettingDefault, SettingKey, SettingRequest};
use crate::traits::Dispose;

/// Import surface for part factories.
///
/// Wraps the container or scope the part is being composed in. Optional
/// imports report absence as `None`; required imports fail with
/// [`ComposeError::ImportNotFound`].
pub struct ExportContext<'a> {
    provider: &'a dyn ExportProvider,
    root: &'a ContainerInner,
    importer: &'static str,
}

impl<'a> ExportContext<'a> {
    pub(crate) fn new(
        provider: &'a dyn ExportProvider,
        root: &'a ContainerInner,
        importer: &'static str,
    ) -> Self {
        Self {
            provider,
            root,
            importer,
        }
    }

    /// The provider imports resolve against.
    pub fn provider(&self) -> &dyn ExportProvider {
        self.provider
    }

    /// Environment settings are read for when a marker names none.
    pub fn environment(&self) -> Environment {
        self.root.environment
    }

    pub fn import<S>(&self) -> ComposeResult<Arc<S>>
    where
        S: ?Sized + Send + Sync + 'static,
    {
        self.import_optional::<S>()?
            .ok_or_else(|| self.not_found::<S>())
    }

    pub fn import_optional<S>(&self) -> ComposeResult<Option<Arc<S>>>
    where
        S: ?Sized + Send + Sync + 'static,
    {
        self.lookup::<S>(&ContractKey::of::<S>())
    }

    pub fn import_keyed<S>(&self, key: &str) -> ComposeResult<Arc<S>>
    where
        S: ?Sized + Send + Sync + 'static,
    {
        self.import_keyed_optional::<S>(key)?
            .ok_or_else(|| self.not_found::<S>())
    }

    pub fn import_keyed_optional<S>(&self, key: &str) -> ComposeResult<Option<Arc<S>>>
    where
        S: ?Sized + Send + Sync + 'static,
    {
        if key.is_empty() {
            return Err(ComposeError::invalid_argument("key", "import keys must not be empty"));
        }
        self.lookup::<S>(&ContractKey::keyed::<S>(key))
    }

    /// Every export of `S`, possibly none.
    pub fn import_many<S>(&self) -> ComposeResult<Vec<Arc<S>>>
    where
        S: ?Sized + Send + Sync + 'static,
    {
        self.collect::<S>(&ContractKey::of::<S>())
    }

    pub fn import_many_keyed<S>(&self, key: &str) -> ComposeResult<Vec<Arc<S>>>
    where
        S: ?Sized + Send + Sync + 'static,
    {
        if key.is_empty() {
            return Err(ComposeError::invalid_argument("key", "import keys must not be empty"));
        }
        self.collect::<S>(&ContractKey::keyed::<S>(key))
    }

    /// Disposes `service` together with the container or scope composing it.
    pub fn register_disposer<D: Dispose>(&self, service: Arc<D>) {
        self.provider.push_disposer(Box::new(move || service.dispose()));
    }

    fn lookup<S>(&self, contract: &ContractKey) -> ComposeResult<Option<Arc<S>>>
    where
        S: ?Sized + Send + Sync + 'static,
    {
        match self.provider.try_get_export(contract)? {
            Lookup::Found(value) => downcast_export::<S>(value).map(Some),
            Lookup::Missing => Ok(None),
            Lookup::OutOfScope => {
                trace!(importer = self.importer, contract = %contract, "import is out of scope");
                Ok(None)
            }
        }
    }

    fn collect<S>(&self, contract: &ContractKey) -> ComposeResult<Vec<Arc<S>>>
    where
        S: ?Sized + Send + Sync + 'static,
    {
        self.provider
            .get_exports(contract)?
            .into_iter()
            .map(downcast_export::<S>)
            .collect()
    }

    fn not_found<S: ?Sized>(&self) -> ComposeError {
        ComposeError::ImportNotFound {
            importer: self.importer,
            contract: type_name::<S>(),
        }
    }
}

/// Everything a [`Composable`](crate::Composable) part needs to build itself.
///
/// Setting reads go through the memoized [`SettingAttribute`] of the member:
/// the locator is asked for the attribute's key, the attribute default is
/// used when nothing is found, and a setting without a default is an error.
///
/// # Examples
///
/// ```rust
/// use ferrous_compose::{
///     Assembly, Composable, CompositionContainer, ContainerOptions, ConventionBuilder,
///     ComposeResult, ExportProvider, Imports, Lifetime, MapSettingLocator, SettingMarker,
///     TypeDescriptor, Catalog,
/// };
///
/// struct Mailer {
///     host: String,
///     retries: u32,
/// }
///
/// impl Composable for Mailer {
///     fn describe() -> TypeDescriptor {
///         TypeDescriptor::builder::<Self>()
///             .namespace("app")
///             .name("Mailer")
///             .setting_parameter("host", SettingMarker::new().key("mail:host"))
///             .setting_property("Retries", SettingMarker::new().default_value(2))
///             .exported(Lifetime::Singleton)
///             .build()
///     }
///
///     fn compose(imports: &Imports<'_>) -> ComposeResult<Self> {
///         Ok(Mailer {
///             host: imports.setting("host")?,
///             retries: imports.property("Retries")?,
///         })
///     }
/// }
///
/// let options = ContainerOptions::new()
///     .locator(MapSettingLocator::new().with("mail:host", "smtp.local"));
/// let container = CompositionContainer::with_options(Catalog::new(), options);
/// container
///     .register_assembly(&Assembly::new("app").with::<Mailer>(), &ConventionBuilder::new())
///     .unwrap();
///
/// let mailer = container.get_export::<Mailer>().unwrap().unwrap();
/// assert_eq!(mailer.host, "smtp.local");
/// assert_eq!(mailer.retries, 2);
/// ```
pub struct Imports<'a> {
    context: &'a ExportContext<'a>,
    descriptor: &'a TypeDescriptor,
}

impl<'a> Imports<'a> {
    pub(crate) fn new(context: &'a ExportContext<'a>, descriptor: &'a TypeDescriptor) -> Self {
        Self {
            context,
            descriptor,
        }
    }

    /// Descriptor of the part being composed.
    pub fn descriptor(&self) -> &TypeDescriptor {
        self.descriptor
    }

    pub fn context(&self) -> &ExportContext<'a> {
        self.context
    }

    /// Reads the setting declared on constructor parameter `parameter`.
    pub fn setting<V: DeserializeOwned>(&self, parameter: &str) -> ComposeResult<V> {
        self.read(MemberKind::Parameter, parameter)
    }

    /// Reads the setting declared on property `property`.
    pub fn property<V: DeserializeOwned>(&self, property: &str) -> ComposeResult<V> {
        self.read(MemberKind::Property, property)
    }

    /// The resolved attribute of a setting member.
    pub fn setting_attribute(
        &self,
        kind: MemberKind,
        member: &str,
    ) -> ComposeResult<Arc<SettingAttribute>> {
        self.context
            .root
            .settings
            .attribute(self.descriptor, kind, member)
    }

    pub fn import<S>(&self) -> ComposeResult<Arc<S>>
    where
        S: ?Sized + Send + Sync + 'static,
    {
        self.context.import::<S>()
    }

    pub fn import_optional<S>(&self) -> ComposeResult<Option<Arc<S>>>
    where
        S: ?Sized + Send + Sync + 'static,
    {
        self.context.import_optional::<S>()
    }

    pub fn import_keyed<S>(&self, key: &str) -> ComposeResult<Arc<S>>
    where
        S: ?Sized + Send + Sync + 'static,
    {
        self.context.import_keyed::<S>(key)
    }

    pub fn import_many<S>(&self) -> ComposeResult<Vec<Arc<S>>>
    where
        S: ?Sized + Send + Sync + 'static,
    {
        self.context.import_many::<S>()
    }

    pub fn register_disposer<D: Dispose>(&self, service: Arc<D>) {
        self.context.register_disposer(service);
    }

    fn read<V: DeserializeOwned>(&self, kind: MemberKind, member: &str) -> ComposeResult<V> {
        let attribute = self.setting_attribute(kind, member)?;
        let root = self.context.root;

        let environment = match attribute.environment() {
            Environment::Unspecified => root.environment,
            declared => declared,
        };
        let key = SettingKey::new(attribute.key().to_string(), environment)?;
        let request = SettingRequest {
            key: &key,
            contract_name: attribute.contract_name(),
            expected_type: type_name::<V>(),
        };

        let value: Value = match root.locator.locate(&request) {
            Some(value) => value,
            None => match attribute.default_value() {
                SettingDefault::Value(default) => default.clone(),
                SettingDefault::NullValue => {
                    return Err(ComposeError::MissingSetting {
                        key: key.to_string(),
                        member: format!("{}.{}", self.descriptor.full_name(), member),
                    })
                }
            },
        };

        serde_json::from_value(value).map_err(|err| ComposeError::InvalidSettingValue {
            key: key.to_string(),
            expected: type_name::<V>(),
            message: err.to_string(),
        })
    }
}
