//! # ferrous-compose
//!
//! Settings-aware composition for Rust applications: convention-driven part
//! registration, typed setting injection, a service provider adapter over
//! the composition engine, and a host with scoped child hosts, startup
//! activities and disposal.
//!
//! ## Features
//!
//! - **Conventions**: export types by namespace, interface or custom predicate
//! - **Settings**: constructor parameters and properties read from a pluggable
//!   [`SettingLocator`], with deterministic keys and defaults
//! - **Lifetimes**: Singleton, Scoped and Transient parts
//! - **Explicit lookups**: misses and scope-boundary violations are values, not errors
//! - **Hosts**: ordered startup activities, child scopes, idempotent disposal
//!
//! ## Quick Start
//!
//! ```rust
//! use ferrous_compose::{
//!     Assembly, Composable, ComposeResult, Host, Imports, Lifetime, MapSettingLocator,
//!     ServiceProviderExt, SettingMarker, TypeDescriptor,
//! };
//! use std::sync::Arc;
//!
//! trait Greeter: Send + Sync {
//!     fn greet(&self) -> String;
//! }
//!
//! struct Polite {
//!     name: String,
//! }
//!
//! impl Greeter for Polite {
//!     fn greet(&self) -> String {
//!         format!("Good morning, {}", self.name)
//!     }
//! }
//!
//! impl Composable for Polite {
//!     fn describe() -> TypeDescriptor {
//!         TypeDescriptor::builder::<Self>()
//!             .namespace("app.greeting")
//!             .name("Polite")
//!             .export_as::<dyn Greeter, _>(|p| p as Arc<dyn Greeter>)
//!             .setting_parameter("name", SettingMarker::new())
//!             .exported_with_interfaces(Lifetime::Singleton)
//!             .build()
//!     }
//!
//!     fn compose(imports: &Imports<'_>) -> ComposeResult<Self> {
//!         Ok(Polite { name: imports.setting("name")? })
//!     }
//! }
//!
//! let host = Host::builder()
//!     .setting_locator(MapSettingLocator::new().with("app.greeting.Polite:name", "Ada"))
//!     .build();
//! host.run(&[Assembly::new("greeting").with::<Polite>()]).unwrap();
//!
//! let greeter = host.get::<dyn Greeter>().unwrap().unwrap();
//! assert_eq!(greeter.greet(), "Good morning, Ada");
//! ```
//!
//! ## Scopes
//!
//! Child hosts own a composition scope. Scoped parts are shared inside one
//! child and never resolve from the root, where they look absent.
//!
//! ```rust
//! use ferrous_compose::{Host, Lifetime, ServiceProviderExt};
//! use std::sync::Arc;
//!
//! struct Session;
//!
//! let host = Host::builder()
//!     .catalog(|c| {
//!         c.add_factory::<Session, _>(Lifetime::Scoped, None, |_| Ok(Arc::new(Session)));
//!     })
//!     .build();
//!
//! assert!(host.get::<Session>().unwrap().is_none());
//!
//! let page = host.create_child().unwrap();
//! let a = page.get::<Session>().unwrap().unwrap();
//! let b = page.get::<Session>().unwrap().unwrap();
//! assert!(Arc::ptr_eq(&a, &b));
//! ```

pub mod catalog;
pub mod container;
pub mod continuation;
pub mod conventions;
pub mod decoration;
pub mod descriptors;
pub mod disassembler;
pub mod error;
pub mod host;
pub mod key;
pub mod lifetime;
pub mod provider;
pub mod setting;
pub mod specification;
pub mod traits;

#[cfg(feature = "config")]
pub mod config;

// Internal modules
mod internal;
mod registration;

pub use catalog::{Assembly, Catalog, Composable};
pub use container::{
    CompositionContainer, CompositionScope, ContainerOptions, ExportContext, ExportProvider,
    Imports, Lookup,
};
pub use continuation::{ContinuationKey, ContinuationRegistry};
pub use conventions::{ConventionBuilder, ConventionRule, SettingsConventionBuilder};
pub use decoration::{Decorator, DECORATOR_KEY};
pub use descriptors::{
    ExplicitExport, InterfaceRef, MemberKind, ParameterInfo, PropertyInfo, TypeBuilder,
    TypeDescriptor, TypeKind,
};
pub use disassembler::{ServiceRequest, ServiceType, ServiceTypeDisassembler};
pub use error::{ComposeError, ComposeResult};
pub use host::{ambient, Activity, ActivityId, Host, HostBuilder, HostState, UnitOfWork, UnitOfWorkProvider};
pub use key::ContractKey;
pub use lifetime::Lifetime;
pub use provider::{CompositionServiceProvider, SelfExport, ServiceOverrides, ServiceResolver};
pub use registration::AnyArc;
pub use setting::{
    Environment, MapSettingLocator, NoSettings, SettingAttribute, SettingDefault, SettingKey,
    SettingLocator, SettingMarker, SettingRequest,
};
pub use specification::{
    DecoratorSpecification, FnSpecification, InterfaceSpecification, NamespaceSpecification,
    Specification, SpecificationExt, ViewModelSpecification,
};
pub use traits::{Dispose, KeyedServiceProvider, Resolution, ServiceProvider, ServiceProviderExt};

#[cfg(feature = "config")]
pub use config::{CompositeSettingLocator, EnvironmentSettingLocator, JsonSettingLocator};
