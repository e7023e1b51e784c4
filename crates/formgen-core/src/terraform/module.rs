//! Module loading, discovery and extraction

use serde_json::Value as JsonValue;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use super::Variable;
use super::parser::parse_variables;
use crate::error::{CoreError, Result};
use crate::field::FieldBuilder;
use crate::resource::ResourceSchema;
use crate::types::TypeDescriptor;

/// A loaded Terraform module
#[derive(Debug, Clone)]
pub struct TerraformModule {
    pub path: PathBuf,
    pub variables: Vec<Variable>,
}

impl TerraformModule {
    /// Base name of the module directory
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    /// Build the resource schema of this module's variables
    ///
    /// A module without variables is `NotSupported`.
    pub fn to_schema(&self, builder: &FieldBuilder) -> Result<ResourceSchema> {
        if self.variables.is_empty() {
            return Err(CoreError::not_supported(
                self.path.display().to_string(),
                "module does not have variables",
            ));
        }

        let mut schema = ResourceSchema::new(self.name());
        for variable in &self.variables {
            let descriptor = TypeDescriptor::parse(&variable.type_expr);
            let field = builder.build(
                &variable.name,
                &descriptor,
                Some(variable.description.as_str()),
                variable.default.as_ref(),
            )?;
            schema.insert(variable.name.clone(), field);
            if variable.required {
                schema.require(&variable.name);
            }
        }
        Ok(schema)
    }
}

fn is_tf_file(path: &Path) -> bool {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy())
        .unwrap_or_default();
    name.ends_with(".tf") || name.ends_with(".tf.json")
}

/// Whether `dir` directly contains a `.tf` or `.tf.json` file
pub fn is_module_dir(dir: &Path) -> bool {
    let Ok(entries) = fs::read_dir(dir) else {
        return false;
    };
    entries
        .filter_map(|e| e.ok())
        .any(|e| e.path().is_file() && is_tf_file(&e.path()))
}

/// Load every variable declared in the module at `dir`
///
/// Files are read in name order.
pub fn load_module(dir: &Path) -> Result<TerraformModule> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file() && is_tf_file(p))
        .collect();
    files.sort();

    let mut variables = Vec::new();
    for file in &files {
        let content = fs::read_to_string(file)?;
        let origin = file.display().to_string();
        if origin.ends_with(".tf.json") {
            variables.extend(json_variables(&content, &origin)?);
        } else {
            variables.extend(parse_variables(&content, &origin)?);
        }
    }

    tracing::debug!(
        module = %dir.display(),
        files = files.len(),
        variables = variables.len(),
        "loaded terraform module"
    );

    Ok(TerraformModule {
        path: dir.to_path_buf(),
        variables,
    })
}

/// Variables of a JSON-syntax module file
fn json_variables(content: &str, origin: &str) -> Result<Vec<Variable>> {
    let doc: JsonValue = serde_json::from_str(content).map_err(|e| CoreError::HclParse {
        path: origin.to_string(),
        message: e.to_string(),
    })?;

    // `variable` is either one object of blocks or a list of such objects
    let blocks: Vec<&serde_json::Map<String, JsonValue>> = match doc.get("variable") {
        Some(JsonValue::Object(map)) => vec![map],
        Some(JsonValue::Array(items)) => items.iter().filter_map(JsonValue::as_object).collect(),
        _ => Vec::new(),
    };

    let mut variables = Vec::new();
    for block in blocks {
        for (name, body) in block {
            let text = |key: &str| {
                body.get(key)
                    .and_then(JsonValue::as_str)
                    .unwrap_or_default()
                    .to_string()
            };
            let default = body.get("default");
            variables.push(Variable {
                name: name.clone(),
                type_expr: text("type"),
                description: text("description"),
                default: default.filter(|d| !d.is_null()).cloned(),
                required: default.is_none(),
            });
        }
    }
    Ok(variables)
}

/// Find module directories under `root`, at most `depth` levels down
///
/// The search does not descend into a module once found.
pub fn discover_modules(root: &Path, depth: usize) -> Result<Vec<PathBuf>> {
    let mut modules = Vec::new();
    let mut walker = WalkDir::new(root)
        .max_depth(depth)
        .sort_by_file_name()
        .into_iter();

    while let Some(entry) = walker.next() {
        let entry = entry?;
        if !entry.file_type().is_dir() {
            continue;
        }
        if is_module_dir(entry.path()) {
            modules.push(entry.path().to_path_buf());
            walker.skip_current_dir();
        }
    }

    if modules.is_empty() {
        return Err(CoreError::NoModules {
            path: root.display().to_string(),
        });
    }
    Ok(modules)
}
