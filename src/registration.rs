//! Part and export registration types.

use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use once_cell::sync::OnceCell;

use crate::container::ExportContext;
use crate::descriptors::Caster;
use crate::error::{ComposeError, ComposeResult};
use crate::key::ContractKey;
use crate::lifetime::Lifetime;

// Type-erased Arc for storage
pub type AnyArc = Arc<dyn Any + Send + Sync>;

pub(crate) type PartCtor =
    Arc<dyn for<'a> Fn(&ExportContext<'a>) -> ComposeResult<AnyArc> + Send + Sync>;

/// Recovers a typed export from its erased `Arc<Arc<S>>` form.
pub(crate) fn downcast_export<S>(value: AnyArc) -> ComposeResult<Arc<S>>
where
    S: ?Sized + Send + Sync + 'static,
{
    value
        .downcast::<Arc<S>>()
        .map(|export| (*export).clone())
        .map_err(|_| ComposeError::TypeMismatch(std::any::type_name::<S>()))
}

/// Erases a typed export into the form [`downcast_export`] reads.
pub(crate) fn erase_export<S>(value: Arc<S>) -> AnyArc
where
    S: ?Sized + Send + Sync + 'static,
{
    Arc::new(value)
}

static NEXT_PART_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a part; scopes cache instances by it and the
/// composition stack detects recursion with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct PartId(u64);

impl PartId {
    pub(crate) fn next() -> Self {
        PartId(NEXT_PART_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// A unit of composition: one constructor, one lifetime, one shared instance
/// slot, possibly exported under several contracts.
pub(crate) struct Part {
    pub(crate) id: PartId,
    pub(crate) type_name: &'static str,
    pub(crate) lifetime: Lifetime,
    pub(crate) ctor: PartCtor,
    /// Singleton cache - OnceCell for lock-free access after initialization
    pub(crate) singleton: OnceCell<AnyArc>,
}

impl Part {
    pub(crate) fn new(type_name: &'static str, lifetime: Lifetime, ctor: PartCtor) -> Self {
        Self {
            id: PartId::next(),
            type_name,
            lifetime,
            ctor,
            singleton: OnceCell::new(),
        }
    }
}

/// One contract a part is exported under.
#[derive(Clone)]
pub(crate) struct Registration {
    pub(crate) part: Arc<Part>,
    pub(crate) cast: Caster,
}

/// Export registry holding all registrations
///
/// Registrations for one contract keep their registration order; the first
/// one answers single lookups.
#[derive(Default)]
pub(crate) struct Registry {
    exports: HashMap<ContractKey, Vec<Registration>>,
    /// Names of assemblies whose types were already registered
    assemblies: HashSet<String>,
    part_count: usize,
}

impl Registry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, contract: ContractKey, registration: Registration) {
        self.exports.entry(contract).or_default().push(registration);
    }

    pub(crate) fn note_part(&mut self) {
        self.part_count += 1;
    }

    #[inline]
    pub(crate) fn get(&self, contract: &ContractKey) -> &[Registration] {
        self.exports.get(contract).map(Vec::as_slice).unwrap_or(&[])
    }

    pub(crate) fn first(&self, contract: &ContractKey) -> Option<&Registration> {
        self.get(contract).first()
    }

    pub(crate) fn contains(&self, contract: &ContractKey) -> bool {
        !self.get(contract).is_empty()
    }

    pub(crate) fn has_assembly(&self, name: &str) -> bool {
        self.assemblies.contains(name)
    }

    /// Returns `false` if the assembly was already recorded.
    pub(crate) fn record_assembly(&mut self, name: &str) -> bool {
        self.assemblies.insert(name.to_string())
    }

    pub(crate) fn assembly_names(&self) -> impl Iterator<Item = &str> {
        self.assemblies.iter().map(String::as_str)
    }

    pub(crate) fn contracts(&self) -> impl Iterator<Item = (&ContractKey, usize)> {
        self.exports.iter().map(|(k, regs)| (k, regs.len()))
    }

    pub(crate) fn part_count(&self) -> usize {
        self.part_count
    }

    pub(crate) fn merge(&mut self, other: Registry) {
        for (contract, registrations) in other.exports {
            self.exports.entry(contract).or_default().extend(registrations);
        }
        self.assemblies.extend(other.assemblies);
        self.part_count += other.part_count;
    }
}
