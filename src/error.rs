//! Error types for model schemas and instances

use thiserror::Error;

/// Result type for model operations
pub type Result<T> = std::result::Result<T, ModelError>;

/// Model schema and instance errors
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Top-level shape property name conflicts with Model API: '{key}'")]
    ReservedName { key: String },

    #[error("Already initialized at '{path}'. Create a separate schema for a different model.")]
    AlreadyInitialized { path: String },

    #[error("Not initialized at '{path}'. Not usable without a model.")]
    NotInitialized { path: String },

    #[error("No field registered at index {index} (model has {len} fields)")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Unknown member: '{path}'")]
    UnknownMember { path: String },

    #[error("'{path}' is a nested object, not a field")]
    NotAField { path: String },

    #[error("'{path}' is a field, not a nested object")]
    NotAnObject { path: String },

    #[error("Type mismatch at '{path}': expected {expected}, found {found}")]
    TypeMismatch {
        path: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("Config error: {0}")]
    Config(#[from] config_crate::ConfigError),
}

/// Display form of a dotted path, naming the root explicitly
pub(crate) fn display_path(path: &str) -> String {
    if path.is_empty() {
        "<root>".to_string()
    } else {
        path.to_string()
    }
}
