//! Terraform modules
//!
//! A module is a directory holding `*.tf` / `*.tf.json` files. Only its
//! `variable` declarations are read; nothing is evaluated.

mod module;
mod parser;

pub use module::{TerraformModule, discover_modules, is_module_dir, load_module};
pub use parser::{parse_value, parse_variables};

use serde_json::Value as JsonValue;

/// An input variable declared by a module
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Variable {
    pub name: String,
    /// Raw type expression, empty when undeclared
    pub type_expr: String,
    pub description: String,
    /// Literal default; non-literal expressions are kept as source text
    pub default: Option<JsonValue>,
    /// No `default` attribute was given
    pub required: bool,
}
