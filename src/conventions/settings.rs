//! Settings convention builder.
//!
//! Turns the [`SettingMarker`]s on a type's constructor parameters and
//! properties into resolved [`SettingAttribute`]s. One attribute exists per
//! member: the first request synthesizes it, later requests get the same
//! `Arc`.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde_json::Value;
use tracing::trace;

use crate::descriptors::{MemberKind, ParameterInfo, PropertyInfo, TypeDescriptor};
use crate::error::{ComposeError, ComposeResult};
use crate::setting::{SettingAttribute, SettingDefault, SettingMarker};

// One descriptor per (type, full name): renamed descriptors of one Rust
// type synthesize their own attributes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct MemberId {
    type_id: TypeId,
    full_name: String,
    kind: MemberKind,
    member: String,
}

impl MemberId {
    fn new(descriptor: &TypeDescriptor, kind: MemberKind, member: &str) -> Self {
        Self {
            type_id: descriptor.type_id(),
            full_name: descriptor.full_name(),
            kind,
            member: member.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
struct ContractOwner {
    member: MemberId,
    display: String,
}

/// Contract ownership claimed by a registration batch that has not been
/// committed yet.
#[derive(Debug, Default)]
pub(crate) struct PendingOwners {
    owners: HashMap<String, ContractOwner>,
}

impl PendingOwners {
    pub(crate) fn new() -> Self {
        Self::default()
    }
}

/// Contract name synthesized for `member` of the type named `full_name`.
///
/// ```rust
/// use ferrous_compose::conventions::contract_name_for;
///
/// assert_eq!(contract_name_for("N.S.StubObject", "RetryCount"), "N.S.StubObject:RetryCount");
/// ```
pub fn contract_name_for(full_name: &str, member: &str) -> String {
    format!("{full_name}:{member}")
}

/// Synthesizes and memoizes setting attributes.
///
/// Safe to share between threads. Two different members that synthesize
/// the same contract name are a configuration error reported by
/// [`register`](Self::register).
#[derive(Default)]
pub struct SettingsConventionBuilder {
    attributes: DashMap<MemberId, Arc<SettingAttribute>>,
    owners: DashMap<String, ContractOwner>,
}

impl SettingsConventionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attribute of a setting parameter, or `None` when the parameter is
    /// not a setting.
    pub fn attribute_for_parameter(
        &self,
        descriptor: &TypeDescriptor,
        parameter: &ParameterInfo,
    ) -> Option<Arc<SettingAttribute>> {
        let marker = parameter.setting()?;
        Some(self.memoized(
            descriptor,
            MemberKind::Parameter,
            parameter.name(),
            marker,
            parameter.literal_default(),
        ))
    }

    /// Attribute of a setting property, or `None` when the property is not
    /// a setting.
    pub fn attribute_for_property(
        &self,
        descriptor: &TypeDescriptor,
        property: &PropertyInfo,
    ) -> Option<Arc<SettingAttribute>> {
        let marker = property.setting()?;
        Some(self.memoized(descriptor, MemberKind::Property, property.name(), marker, None))
    }

    /// Attribute of the named setting member.
    pub fn attribute(
        &self,
        descriptor: &TypeDescriptor,
        kind: MemberKind,
        member: &str,
    ) -> ComposeResult<Arc<SettingAttribute>> {
        let attribute = match kind {
            MemberKind::Parameter => descriptor
                .parameter(member)
                .and_then(|p| self.attribute_for_parameter(descriptor, p)),
            MemberKind::Property => descriptor
                .property(member)
                .and_then(|p| self.attribute_for_property(descriptor, p)),
        };
        attribute.ok_or_else(|| ComposeError::UnknownSetting {
            type_name: descriptor.full_name(),
            member: member.to_string(),
        })
    }

    /// Every setting attribute of a type, parameters first.
    pub fn settings_for(&self, descriptor: &TypeDescriptor) -> Vec<Arc<SettingAttribute>> {
        let parameters = descriptor
            .parameters()
            .iter()
            .filter_map(|p| self.attribute_for_parameter(descriptor, p));
        let properties = descriptor
            .properties()
            .iter()
            .filter_map(|p| self.attribute_for_property(descriptor, p));
        parameters.chain(properties).collect()
    }

    /// Synthesizes every setting of a type and records contract ownership.
    ///
    /// Registering the same type again is a no-op.
    pub fn register(&self, descriptor: &TypeDescriptor) -> ComposeResult<Vec<Arc<SettingAttribute>>> {
        let mut registered = Vec::new();
        for (attribute, owner) in self.claims(descriptor)? {
            match self.owners.entry(attribute.contract_name().to_string()) {
                Entry::Occupied(existing) if existing.get().member != owner.member => {
                    return Err(duplicate(&attribute, existing.get(), owner));
                }
                Entry::Occupied(_) => {}
                Entry::Vacant(slot) => {
                    slot.insert(owner);
                }
            }
            registered.push(attribute);
        }
        Ok(registered)
    }

    /// Like [`register`](Self::register), but ownership goes to `pending`
    /// and only becomes visible to other registrations on
    /// [`commit`](Self::commit).
    pub(crate) fn stage(
        &self,
        descriptor: &TypeDescriptor,
        pending: &mut PendingOwners,
    ) -> ComposeResult<Vec<Arc<SettingAttribute>>> {
        let mut registered = Vec::new();
        for (attribute, owner) in self.claims(descriptor)? {
            let contract = attribute.contract_name();
            let existing = self
                .owners
                .get(contract)
                .map(|entry| entry.value().clone())
                .or_else(|| pending.owners.get(contract).cloned());
            match existing {
                Some(existing) if existing.member != owner.member => {
                    return Err(duplicate(&attribute, &existing, owner));
                }
                Some(_) => {}
                None => {
                    pending.owners.insert(contract.to_string(), owner);
                }
            }
            registered.push(attribute);
        }
        Ok(registered)
    }

    /// Publishes ownership staged by a successful batch.
    pub(crate) fn commit(&self, pending: PendingOwners) {
        for (contract, owner) in pending.owners {
            self.owners.entry(contract).or_insert(owner);
        }
    }

    /// Number of setting contracts with a registered owner.
    pub fn owned_contracts(&self) -> usize {
        self.owners.len()
    }

    fn claims(
        &self,
        descriptor: &TypeDescriptor,
    ) -> ComposeResult<Vec<(Arc<SettingAttribute>, ContractOwner)>> {
        let members = descriptor
            .parameters()
            .iter()
            .filter(|p| p.setting().is_some())
            .map(|p| (MemberKind::Parameter, p.name()))
            .chain(
                descriptor
                    .properties()
                    .iter()
                    .filter(|p| p.setting().is_some())
                    .map(|p| (MemberKind::Property, p.name())),
            );

        members
            .map(|(kind, member)| {
                let attribute = self.attribute(descriptor, kind, member)?;
                let owner = ContractOwner {
                    member: MemberId::new(descriptor, kind, member),
                    display: format!("{} {}.{}", kind, descriptor.full_name(), member),
                };
                Ok((attribute, owner))
            })
            .collect()
    }

    /// Number of memoized attributes.
    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    fn memoized(
        &self,
        descriptor: &TypeDescriptor,
        kind: MemberKind,
        member: &str,
        marker: &SettingMarker,
        literal_default: Option<&Value>,
    ) -> Arc<SettingAttribute> {
        let id = MemberId::new(descriptor, kind, member);
        if let Some(existing) = self.attributes.get(&id) {
            return existing.value().clone();
        }

        let synthesized = Arc::new(synthesize(descriptor, member, marker, literal_default));
        self.attributes.entry(id).or_insert(synthesized).value().clone()
    }
}

fn duplicate(attribute: &SettingAttribute, first: &ContractOwner, second: ContractOwner) -> ComposeError {
    ComposeError::DuplicateSettingContract {
        contract: attribute.contract_name().to_string(),
        first: first.display.clone(),
        second: second.display,
    }
}

/// Builds the attribute of one member. Pure: equal inputs give equal output.
pub(crate) fn synthesize(
    descriptor: &TypeDescriptor,
    member: &str,
    marker: &SettingMarker,
    literal_default: Option<&Value>,
) -> SettingAttribute {
    let derived = contract_name_for(&descriptor.full_name(), member);
    let key = marker.explicit_key().map(str::to_string).unwrap_or_else(|| derived.clone());
    let contract_name = marker
        .explicit_contract_name()
        .map(str::to_string)
        .unwrap_or(derived);

    // Attribute default wins over the parameter's literal default.
    let default = match marker.declared_default().or(literal_default) {
        Some(value) => SettingDefault::Value(value.clone()),
        None => SettingDefault::NullValue,
    };

    trace!(
        part = descriptor.type_name(),
        member,
        key = %key,
        "synthesized setting attribute"
    );
    SettingAttribute::new(key, contract_name, marker.declared_environment(), default)
}
