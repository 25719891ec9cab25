//! Composition scopes: the sharing boundary for scoped parts.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use super::{CompositionContainer, ExportProvider, Lookup};
use crate::error::{ComposeError, ComposeResult};
use crate::internal::{run_hooks, DisposeBag};
use crate::key::ContractKey;
use crate::lifetime::Lifetime;
use crate::registration::{AnyArc, Part, PartId, Registration};

/// Child composition context created by
/// [`CompositionContainer::create_scope`].
///
/// - **Singleton**: composed and cached by the root, shared by all scopes
/// - **Scoped**: composed and cached by this scope
/// - **Transient**: composed on every lookup, imports resolved from this scope
///
/// Clones share the same scope.
///
/// # Examples
///
/// ```
/// use ferrous_compose::{Catalog, CompositionContainer, ExportProvider, Lifetime};
/// use std::sync::atomic::{AtomicU32, Ordering};
/// use std::sync::Arc;
///
/// struct Connection(u32);
///
/// let counter = Arc::new(AtomicU32::new(0));
/// let seen = counter.clone();
/// let mut catalog = Catalog::new();
/// catalog.add_factory::<Connection, _>(Lifetime::Scoped, None, move |_| {
///     Ok(Arc::new(Connection(seen.fetch_add(1, Ordering::SeqCst))))
/// });
///
/// let container = CompositionContainer::new(catalog);
/// let first = container.create_scope().unwrap();
/// let second = container.create_scope().unwrap();
///
/// let a = first.get_export::<Connection>().unwrap().unwrap();
/// let b = first.get_export::<Connection>().unwrap().unwrap();
/// let c = second.get_export::<Connection>().unwrap().unwrap();
/// assert!(Arc::ptr_eq(&a, &b));
/// assert!(!Arc::ptr_eq(&a, &c));
/// ```
#[derive(Clone)]
pub struct CompositionScope {
    inner: Arc<ScopeInner>,
}

struct ScopeInner {
    root: CompositionContainer,
    instances: Mutex<HashMap<PartId, AnyArc>>,
    disposers: Mutex<DisposeBag>,
    disposed: AtomicBool,
}

impl Drop for ScopeInner {
    fn drop(&mut self) {
        if !self.disposed.swap(true, Ordering::SeqCst) {
            run_hooks(self.disposers.get_mut().drain_reverse());
        }
    }
}

impl CompositionScope {
    pub(crate) fn new(root: CompositionContainer) -> Self {
        Self {
            inner: Arc::new(ScopeInner {
                root,
                instances: Mutex::new(HashMap::new()),
                disposers: Mutex::new(DisposeBag::default()),
                disposed: AtomicBool::new(false),
            }),
        }
    }

    /// The root container this scope was created from.
    pub fn root(&self) -> &CompositionContainer {
        &self.inner.root
    }

    /// Runs this scope's dispose hooks in LIFO order. Idempotent.
    pub fn dispose(&self) {
        if self.inner.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        let hooks = self.inner.disposers.lock().drain_reverse();
        debug!(hooks = hooks.len(), "disposing composition scope");
        self.inner.instances.lock().clear();
        run_hooks(hooks);
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::SeqCst)
    }

    /// Whether two handles refer to the same scope.
    pub fn same_scope(&self, other: &CompositionScope) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    fn ensure_live(&self) -> ComposeResult<()> {
        if self.is_disposed() {
            return Err(ComposeError::Disposed("composition scope"));
        }
        self.inner.root.ensure_live()
    }

    fn scoped_instance(&self, part: &Part) -> ComposeResult<AnyArc> {
        if let Some(instance) = self.inner.instances.lock().get(&part.id) {
            return Ok(instance.clone());
        }

        // Composed without the lock; a racing thread's instance wins.
        let created = self.inner.root.construct(part, self)?;
        let mut instances = self.inner.instances.lock();
        Ok(instances.entry(part.id).or_insert(created).clone())
    }

    fn instantiate(&self, registration: &Registration) -> ComposeResult<AnyArc> {
        let part = &registration.part;
        let instance = match part.lifetime {
            Lifetime::Singleton => self.inner.root.shared_instance(part)?,
            Lifetime::Scoped => self.scoped_instance(part)?,
            Lifetime::Transient => self.inner.root.construct(part, self)?,
        };
        (registration.cast)(instance)
    }
}

impl ExportProvider for CompositionScope {
    fn try_get_export(&self, contract: &ContractKey) -> ComposeResult<Lookup> {
        self.ensure_live()?;
        match self.inner.root.registration(contract) {
            Some(registration) => self.instantiate(&registration).map(Lookup::Found),
            None => Ok(Lookup::Missing),
        }
    }

    fn get_exports(&self, contract: &ContractKey) -> ComposeResult<Vec<AnyArc>> {
        self.ensure_live()?;
        self.inner
            .root
            .registrations(contract)
            .iter()
            .map(|registration| self.instantiate(registration))
            .collect()
    }

    fn push_disposer(&self, hook: Box<dyn FnOnce() + Send>) {
        self.inner.disposers.lock().push(hook);
    }
}

impl std::fmt::Debug for CompositionScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositionScope")
            .field("cached", &self.inner.instances.lock().len())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
