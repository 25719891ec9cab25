//! Service-type disassembly.
//!
//! A resolution request names a [`ServiceType`]: either a single service
//! or a collection wrapper around one. The disassembler splits it into the
//! element contract and a collection flag.

use std::any::TypeId;
use std::fmt;

use crate::error::{ComposeError, ComposeResult};
use crate::key::ContractKey;

/// Token naming the requested service shape.
///
/// # Examples
///
/// ```rust
/// use ferrous_compose::{ServiceType, ServiceTypeDisassembler};
///
/// trait Plugin: Send + Sync {}
///
/// let request = ServiceTypeDisassembler
///     .disassemble(&ServiceType::many::<dyn Plugin>(), None)
///     .unwrap();
/// assert!(request.is_collection);
/// assert_eq!(request.element, ServiceType::of::<dyn Plugin>());
///
/// let nested = ServiceType::many_of(ServiceType::many::<dyn Plugin>());
/// let request = ServiceTypeDisassembler.disassemble(&nested, None).unwrap();
/// assert!(!request.is_collection);
/// assert!(request.contract().is_none());
/// ```
#[derive(Clone, PartialEq, Eq, Hash)]
pub enum ServiceType {
    Single { id: TypeId, name: &'static str },
    Many(Box<ServiceType>),
}

impl ServiceType {
    pub fn of<S: ?Sized + 'static>() -> Self {
        ServiceType::Single {
            id: TypeId::of::<S>(),
            name: std::any::type_name::<S>(),
        }
    }

    /// Collection of `S`.
    pub fn many<S: ?Sized + 'static>() -> Self {
        ServiceType::Many(Box::new(Self::of::<S>()))
    }

    /// Collection of an arbitrary element token.
    pub fn many_of(element: ServiceType) -> Self {
        ServiceType::Many(Box::new(element))
    }

    pub fn is_collection_wrapper(&self) -> bool {
        matches!(self, ServiceType::Many(_))
    }

    /// Contract of a single service token; `None` for wrappers.
    pub fn contract(&self, key: Option<&str>) -> Option<ContractKey> {
        match self {
            ServiceType::Single { id, name } => Some(ContractKey::from_parts(
                *id,
                name,
                key.map(str::to_string),
            )),
            ServiceType::Many(_) => None,
        }
    }
}

impl fmt::Debug for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceType::Single { name, .. } => f.write_str(name),
            ServiceType::Many(element) => write!(f, "Many<{element:?}>"),
        }
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A disassembled request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceRequest {
    pub is_collection: bool,
    /// Never a collection wrapper when `is_collection` holds.
    pub element: ServiceType,
    pub key: Option<String>,
}

impl ServiceRequest {
    /// Contract the element resolves under; `None` for malformed tokens.
    pub fn contract(&self) -> Option<ContractKey> {
        self.element.contract(self.key.as_deref())
    }
}

/// Splits service tokens into [`ServiceRequest`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct ServiceTypeDisassembler;

impl ServiceTypeDisassembler {
    /// Fails only for an empty key; absence of a key is `None`.
    pub fn disassemble(
        &self,
        service_type: &ServiceType,
        key: Option<&str>,
    ) -> ComposeResult<ServiceRequest> {
        if key.is_some_and(str::is_empty) {
            return Err(ComposeError::invalid_argument(
                "key",
                "service keys must not be empty",
            ));
        }

        let (is_collection, element) = match service_type {
            ServiceType::Many(element) if !element.is_collection_wrapper() => {
                (true, element.as_ref().clone())
            }
            other => (false, other.clone()),
        };

        Ok(ServiceRequest {
            is_collection,
            element,
            key: key.map(str::to_string),
        })
    }
}
