//! Error types for composition, configuration and host lifecycle.

use thiserror::Error;

/// Composition errors
///
/// Represents the failure conditions of configuring conventions, composing
/// parts, running a [`Host`](crate::Host) or using one after disposal.
///
/// Resolution misses are *not* errors: single lookups report `Ok(None)` and
/// collection lookups report an empty vector. Everything below is either an
/// invalid call, a configuration defect or a use-after-dispose.
///
/// # Examples
///
/// ```rust
/// use ferrous_compose::ComposeError;
///
/// let cycle = ComposeError::ActivityCycle(vec![
///     "app::LoadTheme".to_string(),
///     "app::LoadFonts".to_string(),
///     "app::LoadTheme".to_string(),
/// ]);
/// assert_eq!(
///     cycle.to_string(),
///     "Activity dependency cycle: app::LoadTheme -> app::LoadFonts -> app::LoadTheme"
/// );
///
/// let disposed = ComposeError::Disposed("host");
/// assert_eq!(disposed.to_string(), "Use of disposed host");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ComposeError {
    /// A required argument was empty or otherwise unusable
    #[error("Invalid argument `{argument}`: {reason}")]
    InvalidArgument {
        argument: &'static str,
        reason: &'static str,
    },
    /// The host, scope or container was already disposed
    #[error("Use of disposed {0}")]
    Disposed(&'static str),
    /// The operation is not valid for this object
    #[error("Invalid operation: {0}")]
    InvalidOperation(&'static str),
    /// Activities depend on each other in a cycle (includes path)
    #[error("Activity dependency cycle: {}", .0.join(" -> "))]
    ActivityCycle(Vec<String>),
    /// An activity depends on an activity type that was never registered
    #[error("Activity {activity} depends on unregistered activity {dependency}")]
    MissingActivityDependency {
        activity: &'static str,
        dependency: &'static str,
    },
    /// An activity failed while executing
    #[error("Activity {activity} failed: {message}")]
    Activity {
        activity: &'static str,
        message: String,
    },
    /// Two distinct members synthesize the same setting contract name
    #[error("Setting contract `{contract}` is claimed by both {first} and {second}")]
    DuplicateSettingContract {
        contract: String,
        first: String,
        second: String,
    },
    /// A setting without a default had no externally supplied value
    #[error("No value for required setting `{key}` ({member})")]
    MissingSetting { key: String, member: String },
    /// A setting value could not be read as the requested type
    #[error("Setting `{key}` could not be read as {expected}: {message}")]
    InvalidSettingValue {
        key: String,
        expected: &'static str,
        message: String,
    },
    /// A part asked for a setting member it never declared
    #[error("{type_name} declares no setting member `{member}`")]
    UnknownSetting { type_name: String, member: String },
    /// A required import of a part could not be satisfied
    #[error("Import {contract} required by {importer} not found")]
    ImportNotFound {
        importer: &'static str,
        contract: &'static str,
    },
    /// Circular composition detected (includes path)
    #[error("Circular composition: {}", .0.join(" -> "))]
    Circular(Vec<&'static str>),
    /// Maximum composition depth exceeded
    #[error("Max composition depth {0} exceeded")]
    DepthExceeded(usize),
    /// Type downcast failed
    #[error("Type mismatch for: {0}")]
    TypeMismatch(&'static str),
    /// A setting source could not be loaded
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl ComposeError {
    pub(crate) fn invalid_argument(argument: &'static str, reason: &'static str) -> Self {
        ComposeError::InvalidArgument { argument, reason }
    }

    /// True for errors raised while configuring (as opposed to resolving).
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            ComposeError::ActivityCycle(_)
                | ComposeError::MissingActivityDependency { .. }
                | ComposeError::DuplicateSettingContract { .. }
                | ComposeError::Configuration(_)
        )
    }
}

/// Result type for composition operations
///
/// A convenience alias for `Result<T, ComposeError>` used throughout the crate.
pub type ComposeResult<T> = Result<T, ComposeError>;
