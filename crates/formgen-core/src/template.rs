//! Path-addressed template merging
//!
//! A [`Template`] is a scaffolding-template document. Generated fields are
//! merged into the single mapping node selected by a [`PathExpr`]:
//!
//! - `properties` is deep-merged, generated keys win on conflict
//! - `required` is appended to (duplicates kept) when non-empty
//! - `dependencies` is deep-merged when supplied
//!
//! Everything else in the document is left untouched.

use serde_json::{Map, Value as JsonValue, json};
use std::path::Path;

use crate::error::{CoreError, Result};
use crate::field::{FieldType, ParamField};
use crate::path::PathExpr;
use crate::resource::ResourceSchema;
use crate::value::{self, kind_name};

/// Generated content to merge at one node
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldSet {
    pub properties: Map<String, JsonValue>,
    pub required: Vec<String>,
    pub dependencies: Option<Map<String, JsonValue>>,
}

impl FieldSet {
    /// Properties and required names of a synthesized resource
    pub fn from_schema(schema: &ResourceSchema) -> Result<Self> {
        Ok(Self {
            properties: schema.properties_value()?,
            required: schema.required.clone(),
            dependencies: None,
        })
    }
}

/// Where and what to merge
#[derive(Debug, Clone)]
pub struct MergeRequest {
    pub path: PathExpr,
    pub fields: FieldSet,
}

impl MergeRequest {
    pub fn new(path: PathExpr, fields: FieldSet) -> Self {
        Self { path, fields }
    }
}

/// Metadata stamped onto generated templates
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateMetadata {
    pub name: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
}

impl TemplateMetadata {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.title.is_none() && self.description.is_none()
    }
}

/// A template document
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    doc: JsonValue,
}

impl Template {
    /// Load a YAML template from disk
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let doc = value::from_yaml_str(&content).map_err(|e| CoreError::InvalidTemplate {
            message: format!("{}: {}", path.display(), e),
        })?;
        Ok(Self { doc })
    }

    /// Parse a YAML template
    pub fn from_yaml(content: &str) -> Result<Self> {
        Ok(Self {
            doc: value::from_yaml_str(content)?,
        })
    }

    pub fn from_value(doc: JsonValue) -> Self {
        Self { doc }
    }

    pub fn as_value(&self) -> &JsonValue {
        &self.doc
    }

    /// Merge generated fields at the node addressed by the request
    pub fn merge(&mut self, request: &MergeRequest) -> Result<()> {
        let node = request.path.resolve_mut(&mut self.doc)?;
        let fields = &request.fields;

        merge_object_key(node, "properties", &fields.properties)?;

        if let Some(dependencies) = &fields.dependencies {
            merge_object_key(node, "dependencies", dependencies)?;
        }

        if !fields.required.is_empty() {
            let required = node
                .entry("required")
                .or_insert_with(|| JsonValue::Array(Vec::new()));
            if required.is_null() {
                *required = JsonValue::Array(Vec::new());
            }
            let found = kind_name(required);
            let list = required
                .as_array_mut()
                .ok_or_else(|| CoreError::InvalidTemplate {
                    message: format!(
                        "'required' at {} is a {}, expected a sequence",
                        request.path, found
                    ),
                })?;
            list.extend(fields.required.iter().cloned().map(JsonValue::String));
        }

        Ok(())
    }

    /// Set `metadata.name`, `metadata.title` and `metadata.description`
    pub fn apply_metadata(&mut self, metadata: &TemplateMetadata) -> Result<()> {
        if metadata.is_empty() {
            return Ok(());
        }

        let found = kind_name(&self.doc);
        let root = self
            .doc
            .as_object_mut()
            .ok_or_else(|| CoreError::InvalidTemplate {
                message: format!("template root is a {}, expected a mapping", found),
            })?;
        let node = root
            .entry("metadata")
            .or_insert_with(|| JsonValue::Object(Map::new()));
        let found = kind_name(node);
        let node = node
            .as_object_mut()
            .ok_or_else(|| CoreError::InvalidTemplate {
                message: format!("'metadata' is a {}, expected a mapping", found),
            })?;

        let entries = [
            ("name", &metadata.name),
            ("title", &metadata.title),
            ("description", &metadata.description),
        ];
        for (key, value) in entries {
            if let Some(value) = value {
                node.insert(key.to_string(), JsonValue::String(value.clone()));
            }
        }
        Ok(())
    }

    /// Write the document as YAML
    pub fn write(&self, path: &Path) -> Result<()> {
        value::write_yaml_file(path, &self.doc)
    }
}

/// Deep-merge `overlay` into the mapping stored under `key`
fn merge_object_key(
    node: &mut Map<String, JsonValue>,
    key: &str,
    overlay: &Map<String, JsonValue>,
) -> Result<()> {
    let target = node
        .entry(key)
        .or_insert_with(|| JsonValue::Object(Map::new()));
    if target.is_null() {
        *target = JsonValue::Object(Map::new());
    }
    if !target.is_object() {
        return Err(CoreError::InvalidTemplate {
            message: format!("'{}' is a {}, expected a mapping", key, kind_name(target)),
        });
    }
    deep_merge(target, &JsonValue::Object(overlay.clone()));
    Ok(())
}

/// Recursive merge; `overlay` wins, mappings merge key by key
pub fn deep_merge(base: &mut JsonValue, overlay: &JsonValue) {
    match (base, overlay) {
        (JsonValue::Object(base_map), JsonValue::Object(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                match base_map.get_mut(key) {
                    Some(base_value) => deep_merge(base_value, overlay_value),
                    None => {
                        base_map.insert(key.clone(), overlay_value.clone());
                    }
                }
            }
        }
        (base, overlay) => {
            *base = overlay.clone();
        }
    }
}

/// Directory (relative to the output root) holding collapsed resource files
pub const RESOURCES_DIR: &str = "resources";

/// The `oneOf` selector over every collapsed resource file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollapsedAggregate {
    files: Vec<String>,
}

impl CollapsedAggregate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a written resource file, by path or file name
    ///
    /// Returns false when the file was already recorded.
    pub fn push(&mut self, file: impl AsRef<Path>) -> bool {
        let Some(name) = file.as_ref().file_name() else {
            return false;
        };
        let name = name.to_string_lossy().into_owned();
        if self.files.contains(&name) {
            return false;
        }
        self.files.push(name);
        true
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// File stems, in the order they were recorded
    pub fn stems(&self) -> Vec<String> {
        self.files.iter().map(|f| file_stem(f)).collect()
    }

    /// The `resources` selector and its `oneOf` dependencies
    pub fn field_set(&self) -> Result<FieldSet> {
        let one_of: Vec<JsonValue> = self
            .files
            .iter()
            .map(|f| json!({ "$yaml": format!("{}/{}", RESOURCES_DIR, f) }))
            .collect();

        let selector = ParamField::new(FieldType::String)
            .with_enum(self.stems().into_iter().map(JsonValue::String).collect());
        let mut properties = Map::new();
        properties.insert("resources".to_string(), selector.to_value()?);

        let mut dependencies = Map::new();
        dependencies.insert("resources".to_string(), json!({ "oneOf": one_of }));

        Ok(FieldSet {
            properties,
            required: Vec::new(),
            dependencies: Some(dependencies),
        })
    }

    /// Document of one collapsed resource file
    ///
    /// `{properties, required}` plus a `resources` discriminator naming the
    /// file, so that each `oneOf` branch selects itself.
    pub fn resource_document(schema: &ResourceSchema) -> Result<JsonValue> {
        let mut properties = schema.properties_value()?;
        properties.insert(
            "resources".to_string(),
            json!({ "enum": [file_stem(&schema.file_name())] }),
        );
        Ok(json!({
            "properties": properties,
            "required": schema.required,
        }))
    }
}

fn file_stem(file: &str) -> String {
    Path::new(file)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| file.to_string())
}
