//! Convention builders.
//!
//! [`ConventionBuilder`] decides which described types are exported, under
//! which contracts and with which lifetime. [`SettingsConventionBuilder`]
//! decides how their setting members are named and defaulted.

use std::fmt;
use std::sync::Arc;

use crate::decoration::DECORATOR_KEY;
use crate::descriptors::TypeDescriptor;
use crate::lifetime::Lifetime;
use crate::specification::{
    DecoratorSpecification, FnSpecification, Specification, ViewModelSpecification,
};

pub mod settings;
pub use settings::{contract_name_for, SettingsConventionBuilder};
pub(crate) use settings::PendingOwners;

/// One export a rule (or the type itself) asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PlannedExport {
    pub(crate) lifetime: Lifetime,
    pub(crate) key: Option<String>,
    pub(crate) export_self: bool,
    pub(crate) export_interfaces: bool,
}

/// An export rule applied to every type its specification selects.
///
/// A rule that chooses neither [`export_self`](Self::export_self) nor
/// [`export_interfaces`](Self::export_interfaces) exports the type as itself.
pub struct ConventionRule {
    specification: Arc<dyn Specification<TypeDescriptor>>,
    export_self: bool,
    export_interfaces: bool,
    lifetime: Lifetime,
    key: Option<String>,
}

impl ConventionRule {
    fn new(specification: Arc<dyn Specification<TypeDescriptor>>) -> Self {
        Self {
            specification,
            export_self: false,
            export_interfaces: false,
            lifetime: Lifetime::default(),
            key: None,
        }
    }

    pub fn export_self(&mut self) -> &mut Self {
        self.export_self = true;
        self
    }

    /// Exports the type under every interface its descriptor can cast to.
    pub fn export_interfaces(&mut self) -> &mut Self {
        self.export_interfaces = true;
        self
    }

    pub fn lifetime(&mut self, lifetime: Lifetime) -> &mut Self {
        self.lifetime = lifetime;
        self
    }

    pub fn singleton(&mut self) -> &mut Self {
        self.lifetime(Lifetime::Singleton)
    }

    pub fn scoped(&mut self) -> &mut Self {
        self.lifetime(Lifetime::Scoped)
    }

    pub fn transient(&mut self) -> &mut Self {
        self.lifetime(Lifetime::Transient)
    }

    pub fn keyed(&mut self, key: impl Into<String>) -> &mut Self {
        self.key = Some(key.into());
        self
    }

    pub fn applies_to(&self, descriptor: &TypeDescriptor) -> bool {
        self.specification.is_satisfied_by(descriptor)
    }

    fn planned(&self) -> PlannedExport {
        let export_self = self.export_self || !self.export_interfaces;
        PlannedExport {
            lifetime: self.lifetime,
            key: self.key.clone(),
            export_self,
            export_interfaces: self.export_interfaces,
        }
    }
}

impl fmt::Debug for ConventionRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConventionRule")
            .field("export_self", &self.export_self)
            .field("export_interfaces", &self.export_interfaces)
            .field("lifetime", &self.lifetime)
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

/// Ordered export rules.
///
/// A type gets one part per matching rule, plus one for an export it
/// declares itself. Contracts already claimed by an earlier rule for the
/// same type are not registered twice.
///
/// # Examples
///
/// ```rust
/// use ferrous_compose::{ConventionBuilder, NamespaceSpecification};
///
/// let mut conventions = ConventionBuilder::with_defaults();
/// conventions
///     .for_types_matching(NamespaceSpecification::new("app.services").unwrap())
///     .export_interfaces()
///     .singleton();
///
/// assert_eq!(conventions.len(), 3);
/// ```
#[derive(Debug, Default)]
pub struct ConventionBuilder {
    rules: Vec<ConventionRule>,
}

impl ConventionBuilder {
    /// No rules: only types that declare their own export are exported.
    pub fn new() -> Self {
        Self::default()
    }

    /// Decorators exported as their interfaces under [`DECORATOR_KEY`], and
    /// view models exported as themselves, transient.
    pub fn with_defaults() -> Self {
        let mut builder = Self::new();
        builder
            .for_types_matching(DecoratorSpecification::new())
            .export_interfaces()
            .keyed(DECORATOR_KEY)
            .singleton();
        builder
            .for_types_matching(ViewModelSpecification)
            .export_self()
            .transient();
        builder
    }

    pub fn for_types_matching<S>(&mut self, specification: S) -> &mut ConventionRule
    where
        S: Specification<TypeDescriptor> + 'static,
    {
        self.rules.push(ConventionRule::new(Arc::new(specification)));
        let last = self.rules.len() - 1;
        &mut self.rules[last]
    }

    /// Rule for one concrete type.
    pub fn for_type<T: 'static>(&mut self) -> &mut ConventionRule {
        let id = std::any::TypeId::of::<T>();
        self.for_types_matching(FnSpecification::new(move |d: &TypeDescriptor| {
            d.type_id() == id
        }))
    }

    pub fn rules(&self) -> &[ConventionRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Exports for `descriptor`, explicit export first, duplicates removed.
    pub(crate) fn plan(&self, descriptor: &TypeDescriptor) -> Vec<PlannedExport> {
        let explicit = descriptor.explicit_export().map(|export| PlannedExport {
            lifetime: export.lifetime,
            key: export.key.clone(),
            export_self: true,
            export_interfaces: export.interfaces,
        });

        let mut plans: Vec<PlannedExport> = Vec::new();
        let ruled = self
            .rules
            .iter()
            .filter(|rule| rule.applies_to(descriptor))
            .map(ConventionRule::planned);
        for plan in explicit.into_iter().chain(ruled) {
            if !plans.contains(&plan) {
                plans.push(plan);
            }
        }
        plans
    }
}
