//! Composition engine: the root container, child scopes and the export
//! provider contract both implement.
//!
//! The service provider adapter never talks to a concrete engine; it drives
//! any [`ExportProvider`]. Lookups never fail because an export is absent or
//! out of scope: those outcomes are [`Lookup`] variants, and only genuine
//! defects (recursion, disposed containers, failing parts) are errors.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, trace};

use crate::catalog::{Assembly, Catalog};
use crate::conventions::{ConventionBuilder, PendingOwners, SettingsConventionBuilder};
use crate::error::{ComposeError, ComposeResult};
use crate::internal::{run_hooks, with_circular_guard, DisposeBag};
use crate::key::ContractKey;
use crate::lifetime::Lifetime;
use crate::registration::{downcast_export, AnyArc, Part, Registration, Registry};
use crate::setting::{Environment, NoSettings, SettingLocator};

pub mod context;
pub mod scope;

pub use context::{ExportContext, Imports};
pub use scope::CompositionScope;

/// Outcome of a single export lookup.
#[derive(Debug, Clone)]
pub enum Lookup {
    /// The export value, an erased `Arc<S>` for the requested contract `S`
    Found(AnyArc),
    /// Nothing is registered for the contract
    Missing,
    /// Every export for the contract is scoped, and the lookup ran on the root container
    OutOfScope,
}

impl Lookup {
    pub fn is_found(&self) -> bool {
        matches!(self, Lookup::Found(_))
    }

    pub fn into_found(self) -> Option<AnyArc> {
        match self {
            Lookup::Found(value) => Some(value),
            Lookup::Missing | Lookup::OutOfScope => None,
        }
    }
}

/// Anything exports can be pulled from: the root container or a scope.
///
/// Object-safe so factories and adapters can hold `&dyn ExportProvider`.
/// The typed helpers are only available on concrete providers.
pub trait ExportProvider: Send + Sync {
    /// First export registered for `contract` that this provider can compose.
    ///
    /// Agrees with the first entry of [`get_exports`](Self::get_exports).
    fn try_get_export(&self, contract: &ContractKey) -> ComposeResult<Lookup>;

    /// Every export registered for `contract`, in registration order.
    fn get_exports(&self, contract: &ContractKey) -> ComposeResult<Vec<AnyArc>>;

    /// Registers a cleanup hook with the provider's dispose bag.
    fn push_disposer(&self, hook: Box<dyn FnOnce() + Send>);

    /// Typed single lookup. Missing and out-of-scope exports are `Ok(None)`.
    fn get_export<S>(&self) -> ComposeResult<Option<Arc<S>>>
    where
        S: ?Sized + Send + Sync + 'static,
        Self: Sized,
    {
        match self.try_get_export(&ContractKey::of::<S>())? {
            Lookup::Found(value) => downcast_export::<S>(value).map(Some),
            Lookup::Missing | Lookup::OutOfScope => Ok(None),
        }
    }

    /// Typed keyed lookup.
    fn get_keyed_export<S>(&self, key: &str) -> ComposeResult<Option<Arc<S>>>
    where
        S: ?Sized + Send + Sync + 'static,
        Self: Sized,
    {
        match self.try_get_export(&ContractKey::keyed::<S>(key))? {
            Lookup::Found(value) => downcast_export::<S>(value).map(Some),
            Lookup::Missing | Lookup::OutOfScope => Ok(None),
        }
    }

    /// Typed collection lookup.
    fn get_all_exports<S>(&self) -> ComposeResult<Vec<Arc<S>>>
    where
        S: ?Sized + Send + Sync + 'static,
        Self: Sized,
    {
        self.get_exports(&ContractKey::of::<S>())?
            .into_iter()
            .map(downcast_export::<S>)
            .collect()
    }
}

/// Settings the container supplies to composed parts.
#[derive(Clone)]
pub struct ContainerOptions {
    locator: Arc<dyn SettingLocator>,
    environment: Environment,
}

impl Default for ContainerOptions {
    fn default() -> Self {
        Self {
            locator: Arc::new(NoSettings),
            environment: Environment::Unspecified,
        }
    }
}

impl ContainerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn locator(mut self, locator: impl SettingLocator + 'static) -> Self {
        self.locator = Arc::new(locator);
        self
    }

    pub fn shared_locator(mut self, locator: Arc<dyn SettingLocator>) -> Self {
        self.locator = locator;
        self
    }

    /// Environment applied to settings whose marker names none.
    pub fn environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }
}

pub(crate) struct ContainerInner {
    registry: RwLock<Registry>,
    pub(crate) settings: SettingsConventionBuilder,
    pub(crate) locator: Arc<dyn SettingLocator>,
    pub(crate) environment: Environment,
    disposers: Mutex<DisposeBag>,
    disposed: AtomicBool,
}

impl Drop for ContainerInner {
    fn drop(&mut self) {
        if !self.disposed.swap(true, Ordering::SeqCst) {
            run_hooks(self.disposers.get_mut().drain_reverse());
        }
    }
}

/// Root composition container.
///
/// Owns the export registry, caches singleton parts and hands out
/// [`CompositionScope`]s for scoped parts. Cloning is cheap and every clone
/// shares the same state.
///
/// # Examples
///
/// ```rust
/// use ferrous_compose::{Catalog, CompositionContainer, ExportProvider, Lifetime};
/// use std::sync::Arc;
///
/// trait Greeter: Send + Sync {
///     fn greet(&self) -> String;
/// }
///
/// struct English;
/// impl Greeter for English {
///     fn greet(&self) -> String { "hello".into() }
/// }
///
/// let mut catalog = Catalog::new();
/// catalog.add_instance::<dyn Greeter>(None, Arc::new(English));
/// catalog.add_factory::<String, _>(Lifetime::Transient, None, |ctx| {
///     let greeter = ctx.import::<dyn Greeter>()?;
///     Ok(Arc::new(format!("{}, world", greeter.greet())))
/// });
///
/// let container = CompositionContainer::new(catalog);
/// let message = container.get_export::<String>().unwrap().unwrap();
/// assert_eq!(message.as_str(), "hello, world");
/// ```
#[derive(Clone)]
pub struct CompositionContainer {
    inner: Arc<ContainerInner>,
}

impl CompositionContainer {
    pub fn new(catalog: Catalog) -> Self {
        Self::with_options(catalog, ContainerOptions::default())
    }

    pub fn with_options(catalog: Catalog, options: ContainerOptions) -> Self {
        let registry = catalog.into_registry();
        debug!(
            parts = registry.part_count(),
            environment = %options.environment,
            "building composition container"
        );
        Self {
            inner: Arc::new(ContainerInner {
                registry: RwLock::new(registry),
                settings: SettingsConventionBuilder::new(),
                locator: options.locator,
                environment: options.environment,
                disposers: Mutex::new(DisposeBag::default()),
                disposed: AtomicBool::new(false),
            }),
        }
    }

    /// Creates a child sharing boundary for scoped parts.
    pub fn create_scope(&self) -> ComposeResult<CompositionScope> {
        self.ensure_live()?;
        Ok(CompositionScope::new(self.clone()))
    }

    /// Registers the parts of one assembly.
    ///
    /// Returns `Ok(false)` when an assembly with the same name was already
    /// registered.
    pub fn register_assembly(
        &self,
        assembly: &Assembly,
        conventions: &ConventionBuilder,
    ) -> ComposeResult<bool> {
        self.register_assemblies(std::slice::from_ref(assembly), conventions)
            .map(|registered| registered == 1)
    }

    /// Registers several assemblies as one unit, skipping known names.
    ///
    /// Either every new assembly is registered or, on error, none is: parts
    /// and setting contract ownership are staged and published together.
    /// Returns how many assemblies were added.
    pub fn register_assemblies(
        &self,
        assemblies: &[Assembly],
        conventions: &ConventionBuilder,
    ) -> ComposeResult<usize> {
        self.ensure_live()?;

        let mut registry = self.inner.registry.write();
        let mut staged = Registry::new();
        let mut owners = PendingOwners::new();

        for assembly in assemblies {
            if registry.has_assembly(assembly.name()) || staged.has_assembly(assembly.name()) {
                debug!(assembly = assembly.name(), "assembly already registered");
                continue;
            }
            assembly.stage(conventions, &self.inner.settings, &mut owners, &mut staged)?;
            staged.record_assembly(assembly.name());
        }

        let added = staged.assembly_names().count();
        if added > 0 {
            debug!(
                assemblies = added,
                parts = staged.part_count(),
                "registered assemblies"
            );
        }
        self.inner.settings.commit(owners);
        registry.merge(staged);
        Ok(added)
    }

    pub fn has_assembly(&self, name: &str) -> bool {
        self.inner.registry.read().has_assembly(name)
    }

    pub fn assembly_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .inner
            .registry
            .read()
            .assembly_names()
            .map(str::to_string)
            .collect();
        names.sort();
        names
    }

    pub fn contains(&self, contract: &ContractKey) -> bool {
        self.inner.registry.read().contains(contract)
    }

    /// Number of registrations for `contract`.
    pub fn export_count(&self, contract: &ContractKey) -> usize {
        self.inner.registry.read().get(contract).len()
    }

    /// Every registered contract with its registration count.
    pub fn contracts(&self) -> Vec<(ContractKey, usize)> {
        self.inner
            .registry
            .read()
            .contracts()
            .map(|(contract, count)| (contract.clone(), count))
            .collect()
    }

    pub fn part_count(&self) -> usize {
        self.inner.registry.read().part_count()
    }

    /// The memoized setting attributes of every composed type.
    pub fn settings(&self) -> &SettingsConventionBuilder {
        &self.inner.settings
    }

    pub fn environment(&self) -> Environment {
        self.inner.environment
    }

    /// Runs dispose hooks in LIFO order. Later lookups fail with `Disposed`.
    pub fn dispose(&self) {
        if self.inner.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        let hooks = self.inner.disposers.lock().drain_reverse();
        debug!(hooks = hooks.len(), "disposing composition container");
        run_hooks(hooks);
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::SeqCst)
    }

    pub(crate) fn ensure_live(&self) -> ComposeResult<()> {
        if self.is_disposed() {
            Err(ComposeError::Disposed("composition container"))
        } else {
            Ok(())
        }
    }

    pub(crate) fn registration(&self, contract: &ContractKey) -> Option<Registration> {
        self.inner.registry.read().first(contract).cloned()
    }

    pub(crate) fn registrations(&self, contract: &ContractKey) -> Vec<Registration> {
        self.inner.registry.read().get(contract).to_vec()
    }

    #[cfg(test)]
    pub(crate) fn pending_disposers(&self) -> usize {
        self.inner.disposers.lock().len()
    }

    /// Singleton instance of `part`, composed against the root on first use.
    pub(crate) fn shared_instance(&self, part: &Part) -> ComposeResult<AnyArc> {
        if let Some(instance) = part.singleton.get() {
            return Ok(instance.clone());
        }
        with_circular_guard(part.id, part.type_name, || {
            part.singleton
                .get_or_try_init(|| self.build(part, self))
                .cloned()
        })
    }

    /// Fresh instance of `part` whose imports resolve against `provider`.
    pub(crate) fn construct(
        &self,
        part: &Part,
        provider: &dyn ExportProvider,
    ) -> ComposeResult<AnyArc> {
        with_circular_guard(part.id, part.type_name, || self.build(part, provider))
    }

    fn build(&self, part: &Part, provider: &dyn ExportProvider) -> ComposeResult<AnyArc> {
        trace!(part = part.type_name, lifetime = ?part.lifetime, "composing part");
        let context = ExportContext::new(provider, &self.inner, part.type_name);
        (part.ctor)(&context)
    }

    fn instantiate(&self, registration: &Registration) -> ComposeResult<AnyArc> {
        let instance = match registration.part.lifetime {
            Lifetime::Singleton => self.shared_instance(&registration.part)?,
            Lifetime::Transient => self.construct(&registration.part, self)?,
            Lifetime::Scoped => return Err(ComposeError::InvalidOperation("scoped part on root")),
        };
        (registration.cast)(instance)
    }
}

impl ExportProvider for CompositionContainer {
    fn try_get_export(&self, contract: &ContractKey) -> ComposeResult<Lookup> {
        self.ensure_live()?;
        // Scoped registrations are invisible here, as in `get_exports`.
        let composable = {
            let registry = self.inner.registry.read();
            let registrations = registry.get(contract);
            if registrations.is_empty() {
                return Ok(Lookup::Missing);
            }
            registrations
                .iter()
                .find(|registration| registration.part.lifetime != Lifetime::Scoped)
                .cloned()
        };

        match composable {
            Some(registration) => self.instantiate(&registration).map(Lookup::Found),
            None => {
                #[cfg(debug_assertions)]
                debug!(contract = %contract, "scoped export requested from the root container");
                Ok(Lookup::OutOfScope)
            }
        }
    }

    fn get_exports(&self, contract: &ContractKey) -> ComposeResult<Vec<AnyArc>> {
        self.ensure_live()?;
        let mut exports = Vec::new();
        for registration in self.registrations(contract) {
            if registration.part.lifetime == Lifetime::Scoped {
                #[cfg(debug_assertions)]
                debug!(
                    contract = %contract,
                    part = registration.part.type_name,
                    "skipping scoped export on the root container"
                );
                continue;
            }
            exports.push(self.instantiate(&registration)?);
        }
        Ok(exports)
    }

    fn push_disposer(&self, hook: Box<dyn FnOnce() + Send>) {
        self.inner.disposers.lock().push(hook);
    }
}

impl std::fmt::Debug for CompositionContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositionContainer")
            .field("parts", &self.part_count())
            .field("assemblies", &self.assembly_names())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
