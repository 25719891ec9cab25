//! Service provider adapter over the composition engine.
//!
//! [`CompositionServiceProvider`] answers [`ServiceProvider`] requests with
//! a fixed chain of strategies: the provider's own service types first,
//! then manual overrides, then the engine. Single requests stop at the first
//! strategy that answers; collection requests gather from all of them in
//! order, so the first element of a collection is the single answer.

use std::sync::{Arc, Weak};

use tracing::trace;

use crate::container::ExportProvider;
use crate::disassembler::{ServiceType, ServiceTypeDisassembler};
use crate::error::ComposeResult;
use crate::traits::{KeyedServiceProvider, Resolution, ServiceProvider};

pub mod resolvers;
pub use resolvers::{
    EngineResolver, OverrideResolver, SelfExport, SelfExportResolver, ServiceOverrides,
    ServiceResolver,
};

/// Strategy-chain service provider.
pub struct CompositionServiceProvider {
    resolvers: Vec<Box<dyn ServiceResolver>>,
    disassembler: ServiceTypeDisassembler,
}

impl CompositionServiceProvider {
    /// Standalone provider over `engine` that exports itself as
    /// `dyn ServiceProvider` and `dyn KeyedServiceProvider`.
    pub fn new(engine: Arc<dyn ExportProvider>) -> Arc<Self> {
        Self::with_overrides(engine, Arc::new(ServiceOverrides::new()))
    }

    pub fn with_overrides(
        engine: Arc<dyn ExportProvider>,
        overrides: Arc<ServiceOverrides>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|this: &Weak<Self>| {
            let as_provider = this.clone();
            let as_keyed = this.clone();
            let exports = vec![
                SelfExport::new::<dyn ServiceProvider, _>(move || {
                    as_provider
                        .upgrade()
                        .map(|p| p as Arc<dyn ServiceProvider>)
                }),
                SelfExport::new::<dyn KeyedServiceProvider, _>(move || {
                    as_keyed
                        .upgrade()
                        .map(|p| p as Arc<dyn KeyedServiceProvider>)
                }),
            ];
            Self::from_parts(exports, overrides, engine)
        })
    }

    /// Provider whose self exports are supplied by an owner such as a host.
    pub fn from_parts(
        self_exports: Vec<SelfExport>,
        overrides: Arc<ServiceOverrides>,
        engine: Arc<dyn ExportProvider>,
    ) -> Self {
        Self::from_resolvers(vec![
            Box::new(SelfExportResolver::new(self_exports)),
            Box::new(OverrideResolver::new(overrides)),
            Box::new(EngineResolver::new(engine)),
        ])
    }

    /// Provider over an arbitrary resolver chain, evaluated in order.
    pub fn from_resolvers(resolvers: Vec<Box<dyn ServiceResolver>>) -> Self {
        Self {
            resolvers,
            disassembler: ServiceTypeDisassembler,
        }
    }

    pub fn resolve(&self, service_type: &ServiceType, key: Option<&str>) -> ComposeResult<Resolution> {
        let request = self.disassembler.disassemble(service_type, key)?;
        let Some(contract) = request.contract() else {
            trace!(service = %service_type, "malformed service type never matches");
            return Ok(if service_type.is_collection_wrapper() {
                Resolution::Collection(Vec::new())
            } else {
                Resolution::Single(None)
            });
        };

        if request.is_collection {
            let mut values = Vec::new();
            for resolver in &self.resolvers {
                resolver.resolve_all(&request, &contract, &mut values)?;
            }
            return Ok(Resolution::Collection(values));
        }

        for resolver in &self.resolvers {
            if let Some(value) = resolver.resolve(&request, &contract)? {
                return Ok(Resolution::Single(Some(value)));
            }
        }
        Ok(Resolution::Single(None))
    }
}

impl ServiceProvider for CompositionServiceProvider {
    fn get_service(&self, service_type: &ServiceType) -> ComposeResult<Resolution> {
        self.resolve(service_type, None)
    }
}

impl KeyedServiceProvider for CompositionServiceProvider {
    fn get_keyed_service(&self, service_type: &ServiceType, key: &str) -> ComposeResult<Resolution> {
        self.resolve(service_type, Some(key))
    }
}
