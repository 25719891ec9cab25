//! Type descriptors: the metadata composition conventions inspect.
//!
//! Rust has no runtime reflection, so every composable type describes itself
//! once through [`TypeDescriptor::builder`]. Specifications match against the
//! descriptor, the settings convention builder reads its members, and the
//! container uses its casters to export a part under interface contracts.

use std::any::TypeId;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::error::{ComposeError, ComposeResult};
use crate::lifetime::Lifetime;
use crate::registration::AnyArc;
use crate::setting::SettingMarker;

/// Converts a part instance (`Arc<T>` erased) into an export value
/// (`Arc<Arc<S>>` erased).
pub(crate) type Caster = Arc<dyn Fn(AnyArc) -> ComposeResult<AnyArc> + Send + Sync>;

/// Broad category of a described type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Class,
    Interface,
    Value,
}

/// Kind of member a setting is declared on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MemberKind {
    Parameter,
    Property,
}

impl fmt::Display for MemberKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemberKind::Parameter => f.write_str("parameter"),
            MemberKind::Property => f.write_str("property"),
        }
    }
}

/// Reference to an interface (trait object type) a type implements.
///
/// The *generic definition* is the interface name with its generic
/// arguments removed, so `dyn app::Decorator<app::Mail>` and
/// `dyn app::Decorator<app::Sms>` share the definition `app::Decorator`.
///
/// # Examples
///
/// ```rust
/// use ferrous_compose::InterfaceRef;
///
/// trait Handler<M>: Send + Sync {}
/// struct Ping;
///
/// let closed = InterfaceRef::of::<dyn Handler<Ping>>();
/// let open = InterfaceRef::of::<dyn Handler<()>>();
///
/// assert!(closed.is_generic());
/// assert_ne!(closed.type_id(), open.type_id());
/// assert_eq!(closed.definition(), open.definition());
/// assert!(closed.definition().ends_with("Handler"));
/// ```
#[derive(Debug, Clone)]
pub struct InterfaceRef {
    id: TypeId,
    name: &'static str,
    definition: String,
}

impl InterfaceRef {
    pub fn of<I: ?Sized + 'static>() -> Self {
        let name = std::any::type_name::<I>();
        Self {
            id: TypeId::of::<I>(),
            name,
            definition: generic_definition(name),
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn definition(&self) -> &str {
        &self.definition
    }

    pub fn is_generic(&self) -> bool {
        self.name.contains('<')
    }
}

/// Strips `dyn `, auto-trait bounds and generic arguments from a type name.
pub(crate) fn generic_definition(name: &str) -> String {
    let name = name.trim();
    let name = name.strip_prefix("dyn ").unwrap_or(name);
    let end = name
        .find('<')
        .into_iter()
        .chain(name.find(" +"))
        .min()
        .unwrap_or(name.len());
    name[..end].trim().to_string()
}

/// Splits a Rust path (`a::b::C<X>`) into a dotted namespace and a name.
fn split_type_name(type_name: &str) -> (String, String) {
    let generic_start = type_name.find('<').unwrap_or(type_name.len());
    match type_name[..generic_start].rfind("::") {
        Some(pos) => (
            type_name[..pos].replace("::", "."),
            type_name[pos + 2..].to_string(),
        ),
        None => (String::new(), type_name.to_string()),
    }
}

/// A constructor parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterInfo {
    name: String,
    setting: Option<SettingMarker>,
    literal_default: Option<Value>,
}

impl ParameterInfo {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn setting(&self) -> Option<&SettingMarker> {
        self.setting.as_ref()
    }

    /// Language-level default of the parameter, if it declares one.
    pub fn literal_default(&self) -> Option<&Value> {
        self.literal_default.as_ref()
    }
}

/// A settable property.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyInfo {
    name: String,
    setting: Option<SettingMarker>,
}

impl PropertyInfo {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn setting(&self) -> Option<&SettingMarker> {
        self.setting.as_ref()
    }
}

/// Export declared by the type itself rather than by a convention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExplicitExport {
    pub lifetime: Lifetime,
    pub key: Option<String>,
    pub interfaces: bool,
}

#[derive(Clone)]
pub(crate) struct InterfaceExport {
    pub(crate) interface: InterfaceRef,
    pub(crate) cast: Caster,
}

/// Metadata describing one composable type.
#[derive(Clone)]
pub struct TypeDescriptor {
    id: TypeId,
    type_name: &'static str,
    namespace: String,
    name: String,
    kind: TypeKind,
    is_public: bool,
    is_abstract: bool,
    interfaces: Vec<InterfaceRef>,
    parameters: Vec<ParameterInfo>,
    properties: Vec<PropertyInfo>,
    explicit_export: Option<ExplicitExport>,
    pub(crate) self_cast: Caster,
    pub(crate) exports: Vec<InterfaceExport>,
}

impl TypeDescriptor {
    /// Starts describing `T`. Namespace and name default to the Rust path of `T`.
    pub fn builder<T: Send + Sync + 'static>() -> TypeBuilder<T> {
        TypeBuilder::new()
    }

    pub fn type_id(&self) -> TypeId {
        self.id
    }

    /// Rust type name, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// `namespace.name`, or just `name` in the root namespace.
    pub fn full_name(&self) -> String {
        if self.namespace.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.namespace, self.name)
        }
    }

    pub fn kind(&self) -> TypeKind {
        self.kind
    }

    pub fn is_public(&self) -> bool {
        self.is_public
    }

    pub fn is_abstract(&self) -> bool {
        self.is_abstract
    }

    pub fn interfaces(&self) -> &[InterfaceRef] {
        &self.interfaces
    }

    pub fn parameters(&self) -> &[ParameterInfo] {
        &self.parameters
    }

    pub fn properties(&self) -> &[PropertyInfo] {
        &self.properties
    }

    pub fn parameter(&self, name: &str) -> Option<&ParameterInfo> {
        self.parameters.iter().find(|p| p.name == name)
    }

    pub fn property(&self, name: &str) -> Option<&PropertyInfo> {
        self.properties.iter().find(|p| p.name == name)
    }

    pub fn explicit_export(&self) -> Option<&ExplicitExport> {
        self.explicit_export.as_ref()
    }

    /// Interfaces this type can be exported as.
    pub fn exportable_interfaces(&self) -> impl Iterator<Item = &InterfaceRef> {
        self.exports.iter().map(|e| &e.interface)
    }
}

impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDescriptor")
            .field("full_name", &self.full_name())
            .field("kind", &self.kind)
            .field("is_public", &self.is_public)
            .field("is_abstract", &self.is_abstract)
            .field("interfaces", &self.interfaces)
            .field("parameters", &self.parameters)
            .field("properties", &self.properties)
            .field("explicit_export", &self.explicit_export)
            .finish()
    }
}

/// Fluent builder for a [`TypeDescriptor`].
///
/// # Examples
///
/// ```rust
/// use ferrous_compose::{Lifetime, SettingMarker, TypeDescriptor};
/// use std::sync::Arc;
///
/// trait Notifier: Send + Sync {}
/// struct MailNotifier;
/// impl Notifier for MailNotifier {}
///
/// let descriptor = TypeDescriptor::builder::<MailNotifier>()
///     .namespace("app.mail")
///     .name("MailNotifier")
///     .export_as::<dyn Notifier, _>(|n| n as Arc<dyn Notifier>)
///     .setting_parameter("host", SettingMarker::new())
///     .setting_parameter_with_default("tls", SettingMarker::new(), true)
///     .setting_property("RetryCount", SettingMarker::new().default_value(3))
///     .exported(Lifetime::Singleton)
///     .build();
///
/// assert_eq!(descriptor.full_name(), "app.mail.MailNotifier");
/// assert_eq!(descriptor.interfaces().len(), 1);
/// assert_eq!(descriptor.parameter("tls").unwrap().literal_default(), Some(&serde_json::json!(true)));
/// ```
pub struct TypeBuilder<T> {
    descriptor: TypeDescriptor,
    _marker: std::marker::PhantomData<fn() -> T>,
}

impl<T: Send + Sync + 'static> TypeBuilder<T> {
    fn new() -> Self {
        let type_name = std::any::type_name::<T>();
        let (namespace, name) = split_type_name(type_name);
        let self_cast: Caster = Arc::new(|part: AnyArc| {
            let concrete = part
                .downcast::<T>()
                .map_err(|_| ComposeError::TypeMismatch(std::any::type_name::<T>()))?;
            Ok(Arc::new(concrete) as AnyArc)
        });
        Self {
            descriptor: TypeDescriptor {
                id: TypeId::of::<T>(),
                type_name,
                namespace,
                name,
                kind: TypeKind::Class,
                is_public: true,
                is_abstract: false,
                interfaces: Vec::new(),
                parameters: Vec::new(),
                properties: Vec::new(),
                explicit_export: None,
                self_cast,
                exports: Vec::new(),
            },
            _marker: std::marker::PhantomData,
        }
    }

    /// Dotted namespace, e.g. `app.shell.views`.
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.descriptor.namespace = namespace.into();
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.descriptor.name = name.into();
        self
    }

    pub fn kind(mut self, kind: TypeKind) -> Self {
        self.descriptor.kind = kind;
        self
    }

    pub fn private(mut self) -> Self {
        self.descriptor.is_public = false;
        self
    }

    pub fn abstract_type(mut self) -> Self {
        self.descriptor.is_abstract = true;
        self
    }

    /// Records an implemented interface without making it exportable.
    pub fn implements<I: ?Sized + 'static>(mut self) -> Self {
        self.push_interface(InterfaceRef::of::<I>());
        self
    }

    /// Records an implemented interface and how to view a part as it.
    pub fn export_as<I, F>(mut self, cast: F) -> Self
    where
        I: ?Sized + Send + Sync + 'static,
        F: Fn(Arc<T>) -> Arc<I> + Send + Sync + 'static,
    {
        let interface = InterfaceRef::of::<I>();
        self.push_interface(interface.clone());
        let cast: Caster = Arc::new(move |part: AnyArc| {
            let concrete = part
                .downcast::<T>()
                .map_err(|_| ComposeError::TypeMismatch(std::any::type_name::<T>()))?;
            Ok(Arc::new(cast(concrete)) as AnyArc)
        });
        self.descriptor
            .exports
            .retain(|e| e.interface.type_id() != interface.type_id());
        self.descriptor.exports.push(InterfaceExport { interface, cast });
        self
    }

    fn push_interface(&mut self, interface: InterfaceRef) {
        if !self
            .descriptor
            .interfaces
            .iter()
            .any(|i| i.type_id() == interface.type_id())
        {
            self.descriptor.interfaces.push(interface);
        }
    }

    /// A constructor parameter that is not a setting.
    pub fn parameter(mut self, name: impl Into<String>) -> Self {
        self.descriptor.parameters.push(ParameterInfo {
            name: name.into(),
            setting: None,
            literal_default: None,
        });
        self
    }

    /// A constructor parameter populated from a setting.
    pub fn setting_parameter(mut self, name: impl Into<String>, marker: SettingMarker) -> Self {
        self.descriptor.parameters.push(ParameterInfo {
            name: name.into(),
            setting: Some(marker),
            literal_default: None,
        });
        self
    }

    /// A setting parameter that also declares a language-level default.
    pub fn setting_parameter_with_default(
        mut self,
        name: impl Into<String>,
        marker: SettingMarker,
        literal_default: impl Into<Value>,
    ) -> Self {
        self.descriptor.parameters.push(ParameterInfo {
            name: name.into(),
            setting: Some(marker),
            literal_default: Some(literal_default.into()),
        });
        self
    }

    /// A property populated from a setting.
    pub fn setting_property(mut self, name: impl Into<String>, marker: SettingMarker) -> Self {
        self.descriptor.properties.push(PropertyInfo {
            name: name.into(),
            setting: Some(marker),
        });
        self
    }

    /// A property that is not a setting.
    pub fn property(mut self, name: impl Into<String>) -> Self {
        self.descriptor.properties.push(PropertyInfo {
            name: name.into(),
            setting: None,
        });
        self
    }

    /// Exports the type as itself regardless of conventions.
    pub fn exported(mut self, lifetime: Lifetime) -> Self {
        self.descriptor.explicit_export = Some(ExplicitExport {
            lifetime,
            key: None,
            interfaces: false,
        });
        self
    }

    /// Exports the type as itself and as every exportable interface.
    pub fn exported_with_interfaces(mut self, lifetime: Lifetime) -> Self {
        self.descriptor.explicit_export = Some(ExplicitExport {
            lifetime,
            key: None,
            interfaces: true,
        });
        self
    }

    /// Like [`exported_with_interfaces`](Self::exported_with_interfaces) under a key.
    pub fn exported_keyed(mut self, lifetime: Lifetime, key: impl Into<String>) -> Self {
        self.descriptor.explicit_export = Some(ExplicitExport {
            lifetime,
            key: Some(key.into()),
            interfaces: true,
        });
        self
    }

    pub fn build(self) -> TypeDescriptor {
        self.descriptor
    }
}
