//! Assemblies: named groups of composable types.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::container::{ExportContext, Imports};
use crate::conventions::{ConventionBuilder, PendingOwners, SettingsConventionBuilder};
use crate::descriptors::TypeDescriptor;
use crate::error::ComposeResult;
use crate::key::ContractKey;
use crate::registration::{AnyArc, Part, PartCtor, Registration, Registry};

/// A type the composition engine can build from conventions.
///
/// `describe` publishes the metadata conventions match against; `compose`
/// builds an instance from imports and settings.
pub trait Composable: Sized + Send + Sync + 'static {
    fn describe() -> TypeDescriptor;

    fn compose(imports: &Imports<'_>) -> ComposeResult<Self>;
}

type ComposeFn = Arc<dyn for<'a> Fn(&Imports<'a>) -> ComposeResult<AnyArc> + Send + Sync>;

#[derive(Clone)]
struct AssemblyType {
    descriptor: Arc<TypeDescriptor>,
    compose: ComposeFn,
}

/// Named unit of composable types.
///
/// The name is the registration identity: registering a second assembly
/// with a known name is a no-op.
#[derive(Clone)]
pub struct Assembly {
    name: String,
    types: Vec<AssemblyType>,
}

impl Assembly {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            types: Vec::new(),
        }
    }

    /// Adds `T` to the assembly.
    pub fn with<T: Composable>(mut self) -> Self {
        self.add::<T>();
        self
    }

    pub fn add<T: Composable>(&mut self) -> &mut Self {
        let compose: ComposeFn = Arc::new(|imports: &Imports<'_>| -> ComposeResult<AnyArc> {
            T::compose(imports).map(|part| Arc::new(part) as AnyArc)
        });
        self.types.push(AssemblyType {
            descriptor: Arc::new(T::describe()),
            compose,
        });
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn types(&self) -> impl Iterator<Item = &TypeDescriptor> {
        self.types.iter().map(|t| t.descriptor.as_ref())
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Plans exports for every type and stages the resulting parts.
    ///
    /// Setting contract ownership goes to `owners`; nothing shared changes.
    pub(crate) fn stage(
        &self,
        conventions: &ConventionBuilder,
        settings: &SettingsConventionBuilder,
        owners: &mut PendingOwners,
        registry: &mut Registry,
    ) -> ComposeResult<()> {
        for assembly_type in &self.types {
            let descriptor = &assembly_type.descriptor;
            if descriptor.is_abstract() {
                trace!(part = descriptor.type_name(), "abstract type is never composed");
                continue;
            }

            let plans = conventions.plan(descriptor);
            if plans.is_empty() {
                trace!(part = descriptor.type_name(), "no convention exports the type");
                continue;
            }

            settings.stage(descriptor, owners)?;

            let mut exported: HashSet<ContractKey> = HashSet::new();
            for plan in plans {
                let mut contracts = Vec::new();
                if plan.export_self {
                    let contract = ContractKey::from_parts(
                        descriptor.type_id(),
                        descriptor.type_name(),
                        plan.key.clone(),
                    );
                    contracts.push((contract, descriptor.self_cast.clone()));
                }
                if plan.export_interfaces {
                    for export in &descriptor.exports {
                        let contract = ContractKey::from_parts(
                            export.interface.type_id(),
                            export.interface.name(),
                            plan.key.clone(),
                        );
                        contracts.push((contract, export.cast.clone()));
                    }
                }
                contracts.retain(|(contract, _)| exported.insert(contract.clone()));
                if contracts.is_empty() {
                    continue;
                }

                let part = Arc::new(Part::new(
                    descriptor.type_name(),
                    plan.lifetime,
                    part_ctor(assembly_type),
                ));
                debug!(
                    assembly = %self.name,
                    part = descriptor.type_name(),
                    lifetime = ?plan.lifetime,
                    contracts = contracts.len(),
                    "staging part"
                );
                for (contract, cast) in contracts {
                    registry.insert(
                        contract,
                        Registration {
                            part: part.clone(),
                            cast,
                        },
                    );
                }
                registry.note_part();
            }
        }
        Ok(())
    }
}

fn part_ctor(assembly_type: &AssemblyType) -> PartCtor {
    let descriptor = assembly_type.descriptor.clone();
    let compose = assembly_type.compose.clone();
    Arc::new(move |ctx: &ExportContext<'_>| -> ComposeResult<AnyArc> {
        let imports = Imports::new(ctx, &descriptor);
        compose(&imports)
    })
}

impl fmt::Debug for Assembly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Assembly")
            .field("name", &self.name)
            .field(
                "types",
                &self.types().map(TypeDescriptor::full_name).collect::<Vec<_>>(),
            )
            .finish()
    }
}
