//! CLI error type and its mapping to exit codes

use formgen_core::CoreError;
use miette::Diagnostic;
use thiserror::Error;

use crate::exit_codes;

#[derive(Error, Debug, Diagnostic, Clone)]
pub enum CliError {
    /// Inputs or configuration rejected up front
    #[error("Validation failed: {message}")]
    #[diagnostic(code(formgen::cli::validation))]
    Validation {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Template could not be loaded or merged into
    #[error("Template error: {message}")]
    #[diagnostic(code(formgen::cli::template))]
    Template {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// A definition could not be processed
    #[error("Definition error: {message}")]
    #[diagnostic(code(formgen::cli::definition))]
    Definition {
        message: String,
        #[help]
        help: Option<String>,
    },

    #[error("IO error: {message}")]
    #[diagnostic(code(formgen::cli::io))]
    Io { message: String },

    #[error("{message}")]
    #[diagnostic(code(formgen::cli::error))]
    Other { message: String },
}

impl CliError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Validation { .. } => exit_codes::VALIDATION_ERROR,
            CliError::Template { .. } => exit_codes::TEMPLATE_ERROR,
            CliError::Definition { .. } => exit_codes::DEFINITION_ERROR,
            CliError::Io { .. } => exit_codes::IO_ERROR,
            CliError::Other { .. } => exit_codes::ERROR,
        }
    }

    pub fn validation(message: impl Into<String>, help: Option<&str>) -> Self {
        Self::Validation {
            message: message.into(),
            help: help.map(str::to_string),
        }
    }

    pub fn template(message: impl Into<String>, help: Option<&str>) -> Self {
        Self::Template {
            message: message.into(),
            help: help.map(str::to_string),
        }
    }

    pub fn definition(message: impl Into<String>, help: Option<&str>) -> Self {
        Self::Definition {
            message: message.into(),
            help: help.map(str::to_string),
        }
    }
}

/// The innermost error, past any definition context
fn root_cause(err: &CoreError) -> &CoreError {
    match err {
        CoreError::Definition { source, .. } => root_cause(source),
        other => other,
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        let message = err.to_string();
        match root_cause(&err) {
            CoreError::InvalidConfig { .. } => CliError::validation(
                message,
                Some("set the input/output directories and either --template-path or --raw"),
            ),
            CoreError::InvalidPath { .. } => CliError::validation(
                message,
                Some("use a path such as .spec.parameters[0]"),
            ),
            CoreError::PathNotFound { .. }
            | CoreError::AmbiguousPath { .. }
            | CoreError::PathNotMapping { .. } => CliError::template(
                message,
                Some("--insert-at must select exactly one mapping in the template"),
            ),
            CoreError::InvalidTemplate { .. } => CliError::template(message, None),
            CoreError::NotSupported { .. }
            | CoreError::TypeDefaultMismatch { .. }
            | CoreError::HclParse { .. }
            | CoreError::NoModules { .. } => CliError::definition(message, None),
            CoreError::Io(_) | CoreError::Walk(_) => CliError::Io { message },
            _ => CliError::Other { message },
        }
    }
}

pub type Result<T> = std::result::Result<T, CliError>;
