//! Unit-of-work contracts.

use std::any::type_name;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use tracing::debug;

use crate::container::{CompositionContainer, ExportProvider};
use crate::error::{ComposeError, ComposeResult};

/// A transactional batch of work.
pub trait UnitOfWork: Send + Sync {
    fn commit(&self) -> ComposeResult<()>;

    fn rollback(&self) {}
}

/// Creates units of work.
pub trait UnitOfWorkProvider: Send + Sync {
    fn create(&self) -> ComposeResult<Arc<dyn UnitOfWork>>;
}

/// Default provider: the first `dyn UnitOfWorkProvider` exported by the
/// engine, looked up on first use.
pub(crate) struct ExportedUnitOfWorkProvider {
    engine: CompositionContainer,
    resolved: OnceCell<Arc<dyn UnitOfWorkProvider>>,
}

impl ExportedUnitOfWorkProvider {
    pub(crate) fn new(engine: CompositionContainer) -> Self {
        Self {
            engine,
            resolved: OnceCell::new(),
        }
    }

    fn provider(&self) -> ComposeResult<&Arc<dyn UnitOfWorkProvider>> {
        self.resolved.get_or_try_init(|| {
            let exported = self.engine.get_export::<dyn UnitOfWorkProvider>()?;
            debug!(found = exported.is_some(), "resolving exported unit-of-work provider");
            exported.ok_or(ComposeError::ImportNotFound {
                importer: type_name::<Self>(),
                contract: type_name::<dyn UnitOfWorkProvider>(),
            })
        })
    }
}

impl UnitOfWorkProvider for ExportedUnitOfWorkProvider {
    fn create(&self) -> ComposeResult<Arc<dyn UnitOfWork>> {
        self.provider()?.create()
    }
}
