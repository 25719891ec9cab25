//! Contract keys for export storage and lookup.

use std::any::TypeId;
use std::fmt;

/// Key for export storage and lookup.
///
/// A contract is the type an export satisfies (a concrete type or a trait
/// object such as `dyn Logger`) plus an optional string qualifier. Keyed and
/// unkeyed exports of the same type never collide.
///
/// # Examples
///
/// ```rust
/// use ferrous_compose::ContractKey;
///
/// trait Logger: Send + Sync {}
///
/// let unkeyed = ContractKey::of::<dyn Logger>();
/// let keyed = ContractKey::keyed::<dyn Logger>("audit");
///
/// assert_ne!(unkeyed, keyed);
/// assert_eq!(keyed.key(), Some("audit"));
/// assert!(unkeyed.display_name().contains("Logger"));
/// assert_eq!(keyed.unkeyed(), unkeyed);
/// ```
#[derive(Clone)]
pub struct ContractKey {
    id: TypeId,
    name: &'static str,
    key: Option<String>,
}

impl ContractKey {
    /// Unkeyed contract for `S`.
    #[inline]
    pub fn of<S: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<S>(),
            name: std::any::type_name::<S>(),
            key: None,
        }
    }

    /// Keyed contract for `S`.
    pub fn keyed<S: ?Sized + 'static>(key: impl Into<String>) -> Self {
        Self {
            key: Some(key.into()),
            ..Self::of::<S>()
        }
    }

    pub(crate) fn from_parts(id: TypeId, name: &'static str, key: Option<String>) -> Self {
        Self { id, name, key }
    }

    /// TypeId of the contract type.
    pub fn type_id(&self) -> TypeId {
        self.id
    }

    /// Rust type name of the contract type, for diagnostics.
    pub fn display_name(&self) -> &'static str {
        self.name
    }

    /// The qualifier, or `None` for unkeyed contracts.
    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    /// Same contract type without the qualifier.
    pub fn unkeyed(&self) -> Self {
        Self {
            id: self.id,
            name: self.name,
            key: None,
        }
    }
}

// Equality ignores the diagnostic name; TypeId already identifies the type.
impl PartialEq for ContractKey {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.key == other.key
    }
}

impl Eq for ContractKey {}

impl std::hash::Hash for ContractKey {
    #[inline]
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
        self.key.hash(state);
    }
}

impl fmt::Debug for ContractKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.key {
            Some(key) => write!(f, "{}[{}]", self.name, key),
            None => f.write_str(self.name),
        }
    }
}

impl fmt::Display for ContractKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
