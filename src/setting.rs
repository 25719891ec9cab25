//! Setting keys, setting markers and resolved setting attributes.
//!
//! A *setting* is a constructor parameter or property whose value comes from
//! an external configuration source instead of from another export. Parts
//! declare settings with a [`SettingMarker`]; the
//! [`SettingsConventionBuilder`](crate::SettingsConventionBuilder) turns each
//! marker into a fully resolved [`SettingAttribute`]; a [`SettingLocator`]
//! supplies the values at composition time.

use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ComposeError, ComposeResult};

/// Deployment environment a setting applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum Environment {
    #[default]
    Unspecified,
    Development,
    Testing,
    Staging,
    Production,
    Demonstration,
}

impl Environment {
    pub const ALL: [Environment; 6] = [
        Environment::Unspecified,
        Environment::Development,
        Environment::Testing,
        Environment::Staging,
        Environment::Production,
        Environment::Demonstration,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Unspecified => "Unspecified",
            Environment::Development => "Development",
            Environment::Testing => "Testing",
            Environment::Staging => "Staging",
            Environment::Production => "Production",
            Environment::Demonstration => "Demonstration",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = ComposeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Environment::ALL
            .into_iter()
            .find(|env| env.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or(ComposeError::invalid_argument("environment", "unknown environment name"))
    }
}

/// Name of a setting qualified by the environment it applies to.
///
/// Equality, ordering and hashing are structural over `(name, environment)`.
///
/// # Examples
///
/// ```rust
/// use ferrous_compose::{Environment, SettingKey};
///
/// let key = SettingKey::new("smtp:host", Environment::Production).unwrap();
/// assert_eq!(key.to_string(), "smtp:host[Production]");
/// assert_eq!(key, SettingKey::new("smtp:host", Environment::Production).unwrap());
/// assert_ne!(key, SettingKey::new("smtp:host", Environment::Staging).unwrap());
///
/// assert!(SettingKey::new("", Environment::Testing).is_err());
/// assert!(SettingKey::EMPTY.is_empty());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SettingKey {
    name: Cow<'static, str>,
    environment: Environment,
}

impl SettingKey {
    /// The canonical zero value.
    pub const EMPTY: SettingKey = SettingKey {
        name: Cow::Borrowed(""),
        environment: Environment::Unspecified,
    };

    pub fn new(name: impl Into<Cow<'static, str>>, environment: Environment) -> ComposeResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ComposeError::invalid_argument("name", "setting names must not be empty"));
        }
        Ok(Self { name, environment })
    }

    /// Key for the unspecified environment.
    pub fn unqualified(name: impl Into<Cow<'static, str>>) -> ComposeResult<Self> {
        Self::new(name, Environment::Unspecified)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn environment(&self) -> Environment {
        self.environment
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_empty()
    }

    /// Same name in another environment.
    pub fn with_environment(&self, environment: Environment) -> Self {
        Self {
            name: self.name.clone(),
            environment,
        }
    }
}

impl Default for SettingKey {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl fmt::Display for SettingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.name, self.environment)
    }
}

/// Marks a constructor parameter or property as a setting.
///
/// Every field is optional. An unnamed marker gets its key and contract
/// name derived from the declaring type and member name.
///
/// # Examples
///
/// ```rust
/// use ferrous_compose::{Environment, SettingMarker};
///
/// let marker = SettingMarker::new()
///     .key("mail:retries")
///     .environment(Environment::Staging)
///     .default_value(3);
///
/// assert_eq!(marker.explicit_key(), Some("mail:retries"));
/// assert_eq!(marker.declared_default(), Some(&serde_json::json!(3)));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettingMarker {
    key: Option<String>,
    contract_name: Option<String>,
    environment: Environment,
    default: Option<Value>,
}

impl SettingMarker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Externally visible configuration key.
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Contract name used inside the composition engine.
    pub fn contract_name(mut self, contract_name: impl Into<String>) -> Self {
        self.contract_name = Some(contract_name.into());
        self
    }

    pub fn environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    /// Attribute-declared default. Wins over a parameter's literal default.
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn explicit_key(&self) -> Option<&str> {
        self.key.as_deref().filter(|k| !k.is_empty())
    }

    pub fn explicit_contract_name(&self) -> Option<&str> {
        self.contract_name.as_deref().filter(|c| !c.is_empty())
    }

    pub fn declared_environment(&self) -> Environment {
        self.environment
    }

    pub fn declared_default(&self) -> Option<&Value> {
        self.default.as_ref()
    }
}

/// Default value of a resolved setting.
///
/// `NullValue` means "no default": the setting is required. It is distinct
/// from `Value(Value::Null)`, a default that is literally null.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum SettingDefault {
    #[default]
    NullValue,
    Value(Value),
}

impl SettingDefault {
    pub fn is_specified(&self) -> bool {
        matches!(self, SettingDefault::Value(_))
    }

    pub fn value(&self) -> Option<&Value> {
        match self {
            SettingDefault::NullValue => None,
            SettingDefault::Value(v) => Some(v),
        }
    }
}

/// A fully resolved setting descriptor.
///
/// Produced once per member by the settings convention builder. `key` and
/// `contract_name` are never empty.
#[derive(Debug, Clone, PartialEq)]
pub struct SettingAttribute {
    key: String,
    contract_name: String,
    environment: Environment,
    default: SettingDefault,
}

impl SettingAttribute {
    pub(crate) fn new(
        key: String,
        contract_name: String,
        environment: Environment,
        default: SettingDefault,
    ) -> Self {
        debug_assert!(!key.is_empty() && !contract_name.is_empty());
        Self {
            key,
            contract_name,
            environment,
            default,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn contract_name(&self) -> &str {
        &self.contract_name
    }

    pub fn environment(&self) -> Environment {
        self.environment
    }

    pub fn default_value(&self) -> &SettingDefault {
        &self.default
    }

    pub fn setting_key(&self) -> SettingKey {
        SettingKey {
            name: Cow::Owned(self.key.clone()),
            environment: self.environment,
        }
    }
}

/// What a [`SettingLocator`] is asked for.
#[derive(Debug, Clone, Copy)]
pub struct SettingRequest<'a> {
    pub key: &'a SettingKey,
    pub contract_name: &'a str,
    /// Rust type name the value will be read as.
    pub expected_type: &'static str,
}

/// External source of setting values.
///
/// The composition core never reads files or the environment itself; the
/// hosting environment supplies a locator. Any `Fn(&str) -> Option<Value>`
/// over the key name is a locator.
///
/// # Examples
///
/// ```rust
/// use ferrous_compose::{MapSettingLocator, SettingKey, SettingLocator, SettingRequest};
/// use serde_json::json;
///
/// let locator = MapSettingLocator::new().with("app:title", json!("Inbox"));
/// let key = SettingKey::unqualified("app:title").unwrap();
/// let request = SettingRequest { key: &key, contract_name: "app:title", expected_type: "String" };
/// assert_eq!(locator.locate(&request), Some(json!("Inbox")));
///
/// let from_fn = |name: &str| (name == "app:title").then(|| json!("Drafts"));
/// assert_eq!(from_fn.locate(&request), Some(json!("Drafts")));
/// ```
pub trait SettingLocator: Send + Sync {
    fn locate(&self, request: &SettingRequest<'_>) -> Option<Value>;
}

impl<F> SettingLocator for F
where
    F: Fn(&str) -> Option<Value> + Send + Sync,
{
    fn locate(&self, request: &SettingRequest<'_>) -> Option<Value> {
        self(request.key.name())
    }
}

/// Locator that never finds anything; every setting falls back to its default.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoSettings;

impl SettingLocator for NoSettings {
    fn locate(&self, _request: &SettingRequest<'_>) -> Option<Value> {
        None
    }
}

/// In-memory locator keyed by setting name.
///
/// Environment-specific entries take precedence over unqualified ones.
#[derive(Debug, Default, Clone)]
pub struct MapSettingLocator {
    values: HashMap<SettingKey, Value>,
}

impl MapSettingLocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an unqualified value. Empty names are ignored.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, Environment::Unspecified, value);
        self
    }

    pub fn with_environment(
        mut self,
        name: impl Into<String>,
        environment: Environment,
        value: impl Into<Value>,
    ) -> Self {
        self.insert(name, environment, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, environment: Environment, value: impl Into<Value>) {
        if let Ok(key) = SettingKey::new(name.into(), environment) {
            self.values.insert(key, value.into());
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl SettingLocator for MapSettingLocator {
    fn locate(&self, request: &SettingRequest<'_>) -> Option<Value> {
        self.values
            .get(request.key)
            .or_else(|| {
                self.values
                    .get(&request.key.with_environment(Environment::Unspecified))
            })
            .cloned()
    }
}
