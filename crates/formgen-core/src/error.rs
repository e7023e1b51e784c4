//! Core error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    /// The file is not a CRD/XRD (or Terraform module) this tool understands.
    /// Callers skip the definition and keep going.
    #[error("{path} is not supported: {reason}")]
    NotSupported { path: String, reason: String },

    #[error("Path expression '{path}' does not match any node in the template")]
    PathNotFound { path: String },

    #[error("Path expression '{path}' matches {count} nodes, expected exactly one")]
    AmbiguousPath { path: String, count: usize },

    #[error("Path expression '{path}' points at a {found}, expected a mapping")]
    PathNotMapping { path: String, found: String },

    #[error("Invalid path expression '{path}': {message}")]
    InvalidPath { path: String, message: String },

    #[error("Default value of variable '{name}' is not a map")]
    TypeDefaultMismatch { name: String },

    #[error("Failed to parse {path}: {message}")]
    HclParse { path: String, message: String },

    #[error("Invalid template: {message}")]
    InvalidTemplate { message: String },

    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Could not find any Terraform modules in {path}")]
    NoModules { path: String },

    #[error("Failed to process {path}: {source}")]
    Definition {
        path: String,
        #[source]
        source: Box<CoreError>,
    },

    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to walk directory: {0}")]
    Walk(#[from] walkdir::Error),
}

impl CoreError {
    /// Shorthand for a `NotSupported` error
    pub fn not_supported(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::NotSupported {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Attach the definition being processed to an error
    pub fn in_definition(self, path: impl Into<String>) -> Self {
        Self::Definition {
            path: path.into(),
            source: Box::new(self),
        }
    }

    /// Whether this error only means "skip this definition"
    pub fn is_not_supported(&self) -> bool {
        match self {
            Self::NotSupported { .. } => true,
            Self::Definition { source, .. } => source.is_not_supported(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
