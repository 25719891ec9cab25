//! Application host: configuration, startup, scoped child hosts and
//! disposal around one composition engine.
//!
//! A root [`Host`] owns the [`CompositionContainer`]. Each child host owns
//! a [`CompositionScope`] of that container, created on first use. Every
//! host is a [`ServiceProvider`], answering with itself, its overrides and
//! its engine or scope, in that order.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::catalog::{Assembly, Catalog};
use crate::container::{CompositionContainer, CompositionScope, ContainerOptions, ExportProvider};
use crate::continuation::ContinuationRegistry;
use crate::conventions::ConventionBuilder;
use crate::disassembler::ServiceType;
use crate::error::{ComposeError, ComposeResult};
use crate::provider::{CompositionServiceProvider, SelfExport, ServiceOverrides};
use crate::setting::{Environment, SettingLocator};
use crate::traits::{KeyedServiceProvider, Resolution, ServiceProvider};

pub mod activity;
pub mod ambient;
pub mod unit_of_work;

pub use activity::{Activity, ActivityId};
pub use unit_of_work::{UnitOfWork, UnitOfWorkProvider};

use activity::ActivitySet;
use unit_of_work::ExportedUnitOfWorkProvider;

/// Lifecycle of a host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostState {
    Unconfigured,
    Configured,
    Running,
    Disposed,
}

type ConventionCallback = Box<dyn FnOnce(&mut ConventionBuilder) + Send>;

/// Configures a root [`Host`].
///
/// # Examples
///
/// ```rust
/// use ferrous_compose::{Host, HostState, MapSettingLocator, ServiceProviderExt};
/// use std::sync::Arc;
///
/// let host = Host::builder()
///     .setting_locator(MapSettingLocator::new().with("app:title", "Inbox"))
///     .service::<String>(Arc::new("override".to_string()))
///     .conventions(|c| {
///         c.for_type::<u32>().export_self();
///     })
///     .build();
///
/// assert_eq!(host.state(), HostState::Configured);
/// assert_eq!(host.get::<String>().unwrap().unwrap().as_str(), "override");
/// ```
pub struct HostBuilder {
    convention_callbacks: Vec<ConventionCallback>,
    default_conventions: bool,
    options: ContainerOptions,
    catalog: Catalog,
    overrides: ServiceOverrides,
    activities: ActivitySet,
    unit_of_work: Option<Arc<dyn UnitOfWorkProvider>>,
}

impl Default for HostBuilder {
    fn default() -> Self {
        Self {
            convention_callbacks: Vec::new(),
            default_conventions: true,
            options: ContainerOptions::default(),
            catalog: Catalog::new(),
            overrides: ServiceOverrides::new(),
            activities: ActivitySet::default(),
            unit_of_work: None,
        }
    }
}

impl HostBuilder {
    /// Records a callback applied to the convention builder at build time.
    pub fn conventions<F>(mut self, configure: F) -> Self
    where
        F: FnOnce(&mut ConventionBuilder) + Send + 'static,
    {
        self.convention_callbacks.push(Box::new(configure));
        self
    }

    /// Starts from an empty convention builder instead of the defaults.
    pub fn without_default_conventions(mut self) -> Self {
        self.default_conventions = false;
        self
    }

    pub fn setting_locator(mut self, locator: impl SettingLocator + 'static) -> Self {
        self.options = self.options.locator(locator);
        self
    }

    pub fn shared_setting_locator(mut self, locator: Arc<dyn SettingLocator>) -> Self {
        self.options = self.options.shared_locator(locator);
        self
    }

    pub fn environment(mut self, environment: Environment) -> Self {
        self.options = self.options.environment(environment);
        self
    }

    /// Adds manual exports to the engine's catalog.
    pub fn catalog<F: FnOnce(&mut Catalog)>(mut self, configure: F) -> Self {
        configure(&mut self.catalog);
        self
    }

    /// A service answered before the engine is consulted.
    pub fn service<S>(mut self, service: Arc<S>) -> Self
    where
        S: ?Sized + Send + Sync + 'static,
    {
        self.overrides.add::<S>(service);
        self
    }

    pub fn keyed_service<S>(mut self, key: impl Into<String>, service: Arc<S>) -> Self
    where
        S: ?Sized + Send + Sync + 'static,
    {
        self.overrides.add_keyed::<S>(key, service);
        self
    }

    /// Adds a startup activity. Only the first activity of a type is kept.
    pub fn activity<A: Activity>(mut self, activity: A) -> Self {
        self.activities.push(activity);
        self
    }

    pub fn unit_of_work_provider(mut self, provider: Arc<dyn UnitOfWorkProvider>) -> Self {
        self.unit_of_work = Some(provider);
        self
    }

    pub fn build(self) -> Host {
        self.finish(HostState::Configured)
    }

    fn finish(self, state: HostState) -> Host {
        let mut conventions = if self.default_conventions {
            ConventionBuilder::with_defaults()
        } else {
            ConventionBuilder::new()
        };
        for configure in self.convention_callbacks {
            configure(&mut conventions);
        }

        debug!(
            rules = conventions.len(),
            activities = self.activities.len(),
            overrides = self.overrides.len(),
            ?state,
            "building host"
        );

        let root = RootHost {
            engine: CompositionContainer::with_options(self.catalog, self.options),
            conventions,
            activities: self.activities,
            unit_of_work: self
                .unit_of_work
                .map(OnceCell::with_value)
                .unwrap_or_default(),
        };

        Host::from_inner(Arc::new(HostInner {
            state: Mutex::new(state),
            overrides: Arc::new(self.overrides),
            continuations: Arc::new(ContinuationRegistry::new()),
            live_children: AtomicUsize::new(0),
            provider: OnceCell::new(),
            node: HostNode::Root(root),
        }))
    }
}

struct RootHost {
    engine: CompositionContainer,
    conventions: ConventionBuilder,
    activities: ActivitySet,
    unit_of_work: OnceCell<Arc<dyn UnitOfWorkProvider>>,
}

struct ChildHost {
    parent: Host,
    scope: OnceCell<CompositionScope>,
}

enum HostNode {
    Root(RootHost),
    Child(ChildHost),
}

pub(crate) struct HostInner {
    state: Mutex<HostState>,
    overrides: Arc<ServiceOverrides>,
    continuations: Arc<ContinuationRegistry>,
    live_children: AtomicUsize,
    provider: OnceCell<CompositionServiceProvider>,
    node: HostNode,
}

impl HostInner {
    fn dispose(&self) {
        {
            let mut state = self.state.lock();
            if *state == HostState::Disposed {
                return;
            }
            *state = HostState::Disposed;
        }

        match &self.node {
            HostNode::Root(root) => {
                info!(children = self.live_children.load(Ordering::SeqCst), "disposing host");
                root.engine.dispose();
            }
            HostNode::Child(child) => {
                if let Some(scope) = child.scope.get() {
                    scope.dispose();
                }
                child.parent.inner.live_children.fetch_sub(1, Ordering::SeqCst);
                debug!("disposed child host");
            }
        }
    }
}

impl Drop for HostInner {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// Handle to a root or child host. Clones share the host.
///
/// # Examples
///
/// ```rust
/// use ferrous_compose::{ComposeError, Host, HostState};
///
/// let host = Host::new();
/// assert_eq!(host.state(), HostState::Unconfigured);
///
/// let child = host.create_child().unwrap();
/// assert_eq!(host.live_children(), 1);
/// child.dispose();
/// child.dispose();
/// assert_eq!(host.live_children(), 0);
///
/// host.dispose();
/// assert_eq!(host.create_child().unwrap_err(), ComposeError::Disposed("host"));
/// ```
#[derive(Clone)]
pub struct Host {
    pub(crate) inner: Arc<HostInner>,
}

impl Default for Host {
    fn default() -> Self {
        Self::new()
    }
}

impl Host {
    /// Unconfigured root host with the default conventions.
    pub fn new() -> Self {
        HostBuilder::default().finish(HostState::Unconfigured)
    }

    pub fn builder() -> HostBuilder {
        HostBuilder::default()
    }

    pub(crate) fn from_inner(inner: Arc<HostInner>) -> Self {
        Self { inner }
    }

    pub fn state(&self) -> HostState {
        *self.inner.state.lock()
    }

    pub fn is_disposed(&self) -> bool {
        self.state() == HostState::Disposed
    }

    pub fn is_root(&self) -> bool {
        matches!(self.inner.node, HostNode::Root(_))
    }

    pub fn parent(&self) -> Option<&Host> {
        match &self.inner.node {
            HostNode::Root(_) => None,
            HostNode::Child(child) => Some(&child.parent),
        }
    }

    /// Whether two handles refer to the same host.
    pub fn same_host(&self, other: &Host) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Registers `assemblies`, installs the ambient host, runs pending
    /// activities and installs the default unit-of-work provider.
    ///
    /// Assemblies already registered, or repeated in `assemblies`, are
    /// skipped. Only root hosts run.
    pub fn run(&self, assemblies: &[Assembly]) -> ComposeResult<()> {
        self.ensure_live()?;
        let HostNode::Root(root) = &self.inner.node else {
            return Err(ComposeError::InvalidOperation("only a root host can run"));
        };

        let added = root.engine.register_assemblies(assemblies, &root.conventions)?;
        info!(requested = assemblies.len(), added, "host assemblies registered");

        if ambient::try_install(self) {
            debug!("host is the ambient service provider");
        }

        let executed = root.activities.run(self)?;
        debug!(executed, "activities finished");

        if root.unit_of_work.get().is_none() {
            let default: Arc<dyn UnitOfWorkProvider> =
                Arc::new(ExportedUnitOfWorkProvider::new(root.engine.clone()));
            let _ = root.unit_of_work.set(default);
        }

        let mut state = self.inner.state.lock();
        if *state == HostState::Disposed {
            return Err(ComposeError::Disposed("host"));
        }
        *state = HostState::Running;
        Ok(())
    }

    /// Child host with its own composition scope.
    pub fn create_child(&self) -> ComposeResult<Host> {
        self.ensure_live()?;
        let state = match self.state() {
            HostState::Running => HostState::Running,
            _ => HostState::Configured,
        };
        self.inner.live_children.fetch_add(1, Ordering::SeqCst);
        debug!("creating child host");

        Ok(Host::from_inner(Arc::new(HostInner {
            state: Mutex::new(state),
            overrides: self.inner.overrides.clone(),
            continuations: self.inner.continuations.clone(),
            live_children: AtomicUsize::new(0),
            provider: OnceCell::new(),
            node: HostNode::Child(ChildHost {
                parent: self.clone(),
                scope: OnceCell::new(),
            }),
        })))
    }

    /// Number of child hosts created from this host and not yet disposed.
    pub fn live_children(&self) -> usize {
        self.inner.live_children.load(Ordering::SeqCst)
    }

    /// Disposes the host's scope or engine. Idempotent.
    pub fn dispose(&self) {
        self.inner.dispose();
    }

    /// The root composition engine.
    pub fn engine(&self) -> &CompositionContainer {
        &self.root().engine
    }

    /// The child's scope, created on first call. `None` for root hosts.
    pub fn scope(&self) -> ComposeResult<Option<CompositionScope>> {
        self.ensure_live()?;
        match &self.inner.node {
            HostNode::Root(_) => Ok(None),
            HostNode::Child(child) => self.child_scope(child).cloned().map(Some),
        }
    }

    pub fn conventions(&self) -> &ConventionBuilder {
        &self.root().conventions
    }

    pub fn continuations(&self) -> &ContinuationRegistry {
        &self.inner.continuations
    }

    /// The configured or default unit-of-work provider, once the host ran.
    pub fn unit_of_work_provider(&self) -> Option<Arc<dyn UnitOfWorkProvider>> {
        self.root().unit_of_work.get().cloned()
    }

    pub fn is_activity_executed<A: Activity>(&self) -> bool {
        self.root().activities.is_executed(&ActivityId::of::<A>())
    }

    fn ensure_live(&self) -> ComposeResult<()> {
        if self.is_disposed() {
            Err(ComposeError::Disposed("host"))
        } else {
            Ok(())
        }
    }

    fn root(&self) -> &RootHost {
        let mut inner = &self.inner;
        loop {
            match &inner.node {
                HostNode::Root(root) => return root,
                HostNode::Child(child) => inner = &child.parent.inner,
            }
        }
    }

    fn child_scope<'a>(&self, child: &'a ChildHost) -> ComposeResult<&'a CompositionScope> {
        child.scope.get_or_try_init(|| {
            debug!("creating child host scope");
            self.root().engine.create_scope()
        })
    }

    fn provider(&self) -> ComposeResult<&CompositionServiceProvider> {
        self.inner.provider.get_or_try_init(|| {
            let engine: Arc<dyn ExportProvider> = match &self.inner.node {
                HostNode::Root(root) => Arc::new(root.engine.clone()),
                HostNode::Child(child) => Arc::new(self.child_scope(child)?.clone()),
            };
            Ok(CompositionServiceProvider::from_parts(
                self.self_exports(),
                self.inner.overrides.clone(),
                engine,
            ))
        })
    }

    fn self_exports(&self) -> Vec<SelfExport> {
        let weak = Arc::downgrade(&self.inner);
        let host = move || weak.upgrade().map(Host::from_inner);

        let as_provider = host.clone();
        let as_keyed = host.clone();
        let as_host = host.clone();
        let as_engine = host.clone();
        let as_scope = host.clone();
        let as_registry = host;

        vec![
            SelfExport::new::<dyn ServiceProvider, _>(move || {
                as_provider().map(|h| Arc::new(h) as Arc<dyn ServiceProvider>)
            }),
            SelfExport::new::<dyn KeyedServiceProvider, _>(move || {
                as_keyed().map(|h| Arc::new(h) as Arc<dyn KeyedServiceProvider>)
            }),
            SelfExport::new::<Host, _>(move || as_host().map(Arc::new)),
            SelfExport::new::<CompositionContainer, _>(move || {
                as_engine().map(|h| Arc::new(h.engine().clone()))
            }),
            SelfExport::new::<CompositionScope, _>(move || {
                let host = as_scope()?;
                match &host.inner.node {
                    HostNode::Root(_) => None,
                    HostNode::Child(child) => child.scope.get().cloned().map(Arc::new),
                }
            }),
            SelfExport::new::<ContinuationRegistry, _>(move || {
                as_registry().map(|h| h.inner.continuations.clone())
            }),
        ]
    }

    fn resolve(&self, service_type: &ServiceType, key: Option<&str>) -> ComposeResult<Resolution> {
        self.ensure_live()?;
        self.provider()?.resolve(service_type, key)
    }
}

impl ServiceProvider for Host {
    fn get_service(&self, service_type: &ServiceType) -> ComposeResult<Resolution> {
        self.resolve(service_type, None)
    }
}

impl KeyedServiceProvider for Host {
    fn get_keyed_service(&self, service_type: &ServiceType, key: &str) -> ComposeResult<Resolution> {
        self.resolve(service_type, Some(key))
    }
}

impl fmt::Debug for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Host")
            .field("state", &self.state())
            .field("root", &self.is_root())
            .field("live_children", &self.live_children())
            .finish()
    }
}
