//! Core traits shared by the engine and the provider adapter.

mod dispose;
mod service_provider;

pub use dispose::Dispose;
pub use service_provider::{KeyedServiceProvider, Resolution, ServiceProvider, ServiceProviderExt};
