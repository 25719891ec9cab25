//! Setting sources backed by the process environment and JSON files.
//!
//! These locators are the bridge from deployment configuration to the
//! [`SettingLocator`] the composition core consumes. Environment-qualified
//! entries are tried before unqualified ones.

use std::env;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::{ComposeError, ComposeResult};
use crate::setting::{Environment, SettingKey, SettingLocator, SettingRequest};

/// Reads settings from environment variables.
///
/// `mail:host` becomes `MAIL_HOST` (or `APP_MAIL_HOST` with prefix `app`).
/// For a key in the `Production` environment, `MAIL_HOST__PRODUCTION` is
/// tried first. Values parse as integer, float, bool, then string.
#[derive(Debug, Default, Clone)]
pub struct EnvironmentSettingLocator {
    prefix: Option<String>,
}

impl EnvironmentSettingLocator {
    pub fn new() -> Self {
        Self { prefix: None }
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: Some(prefix.into()),
        }
    }

    /// Variable name for a setting name, without environment suffix.
    pub fn variable_name(&self, name: &str) -> String {
        let body: String = name
            .chars()
            .map(|c| match c {
                ':' | '.' | '-' | ' ' => '_',
                c => c.to_ascii_uppercase(),
            })
            .collect();
        match &self.prefix {
            Some(prefix) => format!("{}_{}", prefix.to_uppercase(), body),
            None => body,
        }
    }

    fn candidates(&self, key: &SettingKey) -> Vec<String> {
        let base = self.variable_name(key.name());
        match key.environment() {
            Environment::Unspecified => vec![base],
            environment => vec![
                format!("{}__{}", base, environment.as_str().to_uppercase()),
                base,
            ],
        }
    }
}

fn parse_scalar(raw: String) -> Value {
    if let Ok(int) = raw.parse::<i64>() {
        Value::from(int)
    } else if let Ok(float) = raw.parse::<f64>() {
        Value::from(float)
    } else if let Ok(boolean) = raw.parse::<bool>() {
        Value::from(boolean)
    } else {
        Value::String(raw)
    }
}

impl SettingLocator for EnvironmentSettingLocator {
    fn locate(&self, request: &SettingRequest<'_>) -> Option<Value> {
        self.candidates(request.key)
            .into_iter()
            .find_map(|name| env::var(name).ok())
            .map(parse_scalar)
    }
}

/// Reads settings from a JSON object file, loaded on first use.
///
/// A key is looked up as a top-level property first (`"mail:host"`), then
/// as a path through nested objects split at `:` (`{"mail": {"host": ..}}`).
/// Environment-qualified properties (`"mail:host[Production]"`) win.
///
/// A file that cannot be loaded on first use is not retried until
/// [`reload`](Self::reload) is called.
#[derive(Debug)]
pub struct JsonSettingLocator {
    path: Option<PathBuf>,
    document: RwLock<Option<Map<String, Value>>>,
    unavailable: AtomicBool,
}

impl JsonSettingLocator {
    /// Locator over the file at `path`. Nothing is read until first lookup.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: Some(path.as_ref().to_path_buf()),
            document: RwLock::new(None),
            unavailable: AtomicBool::new(false),
        }
    }

    /// Locator over JSON text.
    pub fn from_json(json: &str) -> ComposeResult<Self> {
        let document = parse_document(json)?;
        Ok(Self {
            path: None,
            document: RwLock::new(Some(document)),
            unavailable: AtomicBool::new(false),
        })
    }

    /// Re-reads the file.
    pub fn reload(&self) -> ComposeResult<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let content = std::fs::read_to_string(path).map_err(|err| {
            ComposeError::Configuration(format!("cannot read {}: {err}", path.display()))
        })?;
        let document = parse_document(&content)?;
        debug!(path = %path.display(), entries = document.len(), "loaded settings file");
        *self.document.write() = Some(document);
        self.unavailable.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn ensure_loaded(&self) {
        if self.unavailable.load(Ordering::SeqCst) || self.document.read().is_some() {
            return;
        }
        if let Err(err) = self.reload() {
            if !self.unavailable.swap(true, Ordering::SeqCst) {
                warn!(error = %err, "settings file unavailable");
            }
        }
    }

    fn find(document: &Map<String, Value>, name: &str) -> Option<Value> {
        if let Some(value) = document.get(name) {
            return Some(value.clone());
        }
        let mut segments = name.split(':');
        let first = document.get(segments.next()?)?;
        segments
            .try_fold(first, |node, segment| node.get(segment))
            .cloned()
    }
}

fn parse_document(json: &str) -> ComposeResult<Map<String, Value>> {
    match serde_json::from_str::<Value>(json) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(ComposeError::Configuration(
            "settings document must be a JSON object".to_string(),
        )),
        Err(err) => Err(ComposeError::Configuration(format!("invalid settings JSON: {err}"))),
    }
}

impl SettingLocator for JsonSettingLocator {
    fn locate(&self, request: &SettingRequest<'_>) -> Option<Value> {
        self.ensure_loaded();
        let guard = self.document.read();
        let document = guard.as_ref()?;
        let key = request.key;
        if key.environment() != Environment::Unspecified {
            let qualified = format!("{}[{}]", key.name(), key.environment());
            if let Some(value) = document.get(&qualified) {
                return Some(value.clone());
            }
        }
        Self::find(document, key.name())
    }
}

/// Asks several locators in order; the first hit wins.
#[derive(Default)]
pub struct CompositeSettingLocator {
    sources: Vec<Box<dyn SettingLocator>>,
}

impl CompositeSettingLocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, source: impl SettingLocator + 'static) -> Self {
        self.sources.push(Box::new(source));
        self
    }

    pub fn push(&mut self, source: Box<dyn SettingLocator>) {
        self.sources.push(source);
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

impl SettingLocator for CompositeSettingLocator {
    fn locate(&self, request: &SettingRequest<'_>) -> Option<Value> {
        self.sources.iter().find_map(|source| source.locate(request))
    }
}

impl std::fmt::Debug for CompositeSettingLocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositeSettingLocator")
            .field("sources", &format!("{} sources", self.sources.len()))
            .finish()
    }
}
