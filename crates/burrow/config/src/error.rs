//! Error types for profile loading and resolution.

use thiserror::Error;

/// Errors that can occur while loading and resolving profiles.
///
/// A missing profile is not an error: lookups return `Ok(None)` and the
/// caller decides whether "nothing to do" is acceptable.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A profile declares a parent that does not exist in the store.
    #[error("error in profile '{profile}': parent profile '{parent}' not found")]
    UnknownParent { profile: String, parent: String },

    /// A profile inheritance chain loops back onto itself.
    #[error("error in profile '{profile}': inheritance cycle: {chain}")]
    InheritanceCycle { profile: String, chain: String },

    /// Raw configuration data cannot be coerced into the declared types.
    #[error("cannot decode profile '{key}': {message}")]
    Decode { key: String, message: String },
}

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;
