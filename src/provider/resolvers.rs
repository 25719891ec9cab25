//! Resolution strategies of the service provider adapter.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;

use crate::container::{ExportProvider, Lookup};
use crate::disassembler::ServiceRequest;
use crate::error::ComposeResult;
use crate::key::ContractKey;
use crate::registration::{erase_export, AnyArc};

/// One strategy in the provider's resolution chain.
pub trait ServiceResolver: Send + Sync {
    /// First match for a single request, if this strategy has one.
    fn resolve(&self, request: &ServiceRequest, contract: &ContractKey) -> ComposeResult<Option<AnyArc>>;

    /// Appends every match of this strategy.
    fn resolve_all(
        &self,
        request: &ServiceRequest,
        contract: &ContractKey,
        into: &mut Vec<AnyArc>,
    ) -> ComposeResult<()>;
}

type SelfFactory = Arc<dyn Fn() -> Option<AnyArc> + Send + Sync>;

/// A service the provider answers with itself (or with something it owns).
#[derive(Clone)]
pub struct SelfExport {
    id: TypeId,
    produce: SelfFactory,
}

impl SelfExport {
    pub fn new<S, F>(produce: F) -> Self
    where
        S: ?Sized + Send + Sync + 'static,
        F: Fn() -> Option<Arc<S>> + Send + Sync + 'static,
    {
        Self {
            id: TypeId::of::<S>(),
            produce: Arc::new(move || produce().map(erase_export)),
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.id
    }
}

/// Answers unkeyed requests for the provider's own service types.
pub struct SelfExportResolver {
    exports: Vec<SelfExport>,
}

impl SelfExportResolver {
    pub fn new(exports: Vec<SelfExport>) -> Self {
        Self { exports }
    }

    fn find(&self, request: &ServiceRequest, contract: &ContractKey) -> Option<AnyArc> {
        if request.key.is_some() {
            return None;
        }
        self.exports
            .iter()
            .find(|export| export.id == contract.type_id())
            .and_then(|export| (export.produce)())
    }
}

impl ServiceResolver for SelfExportResolver {
    fn resolve(&self, request: &ServiceRequest, contract: &ContractKey) -> ComposeResult<Option<AnyArc>> {
        Ok(self.find(request, contract))
    }

    fn resolve_all(
        &self,
        request: &ServiceRequest,
        contract: &ContractKey,
        into: &mut Vec<AnyArc>,
    ) -> ComposeResult<()> {
        into.extend(self.find(request, contract));
        Ok(())
    }
}

/// Manually registered services that take precedence over the engine.
///
/// Built at configuration time and read-only afterwards.
#[derive(Default, Clone)]
pub struct ServiceOverrides {
    entries: HashMap<ContractKey, Vec<AnyArc>>,
}

impl ServiceOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<S>(&mut self, service: Arc<S>) -> &mut Self
    where
        S: ?Sized + Send + Sync + 'static,
    {
        self.insert(ContractKey::of::<S>(), service)
    }

    pub fn add_keyed<S>(&mut self, key: impl Into<String>, service: Arc<S>) -> &mut Self
    where
        S: ?Sized + Send + Sync + 'static,
    {
        self.insert(ContractKey::keyed::<S>(key), service)
    }

    pub fn get(&self, contract: &ContractKey) -> &[AnyArc] {
        self.entries.get(contract).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of overridden contracts.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn insert<S>(&mut self, contract: ContractKey, service: Arc<S>) -> &mut Self
    where
        S: ?Sized + Send + Sync + 'static,
    {
        self.entries.entry(contract).or_default().push(erase_export(service));
        self
    }
}

pub struct OverrideResolver {
    overrides: Arc<ServiceOverrides>,
}

impl OverrideResolver {
    pub fn new(overrides: Arc<ServiceOverrides>) -> Self {
        Self { overrides }
    }
}

impl ServiceResolver for OverrideResolver {
    fn resolve(&self, _request: &ServiceRequest, contract: &ContractKey) -> ComposeResult<Option<AnyArc>> {
        Ok(self.overrides.get(contract).first().cloned())
    }

    fn resolve_all(
        &self,
        _request: &ServiceRequest,
        contract: &ContractKey,
        into: &mut Vec<AnyArc>,
    ) -> ComposeResult<()> {
        into.extend(self.overrides.get(contract).iter().cloned());
        Ok(())
    }
}

/// Delegates to the composition engine.
pub struct EngineResolver {
    engine: Arc<dyn ExportProvider>,
}

impl EngineResolver {
    pub fn new(engine: Arc<dyn ExportProvider>) -> Self {
        Self { engine }
    }
}

impl ServiceResolver for EngineResolver {
    fn resolve(&self, _request: &ServiceRequest, contract: &ContractKey) -> ComposeResult<Option<AnyArc>> {
        match self.engine.try_get_export(contract)? {
            Lookup::Found(value) => Ok(Some(value)),
            Lookup::Missing => Ok(None),
            Lookup::OutOfScope => {
                #[cfg(debug_assertions)]
                tracing::debug!(contract = %contract, "export is outside this provider's scope");
                Ok(None)
            }
        }
    }

    fn resolve_all(
        &self,
        _request: &ServiceRequest,
        contract: &ContractKey,
        into: &mut Vec<AnyArc>,
    ) -> ComposeResult<()> {
        into.extend(self.engine.get_exports(contract)?);
        Ok(())
    }
}
