//! Synthesized per-resource schema

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Map, Value as JsonValue, json};

use crate::error::Result;
use crate::field::ParamField;

/// A property of a synthesized resource
///
/// Most properties are built [`ParamField`]s. The CRD `config` wrapper keeps
/// the source OpenAPI tree as-is, with only its title injected.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SchemaNode {
    Field(ParamField),
    OpenApi(JsonValue),
}

impl From<ParamField> for SchemaNode {
    fn from(field: ParamField) -> Self {
        Self::Field(field)
    }
}

impl SchemaNode {
    /// The built field, if this node is one
    pub fn as_field(&self) -> Option<&ParamField> {
        match self {
            Self::Field(f) => Some(f),
            Self::OpenApi(_) => None,
        }
    }
}

/// The schema synthesized for one CRD/XRD or one Terraform module
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceSchema {
    /// Claim kind, `{group}.{kind}`, or the module directory name
    pub resource_name: String,
    pub properties: IndexMap<String, SchemaNode>,
    /// Always a subset of `properties` keys
    pub required: Vec<String>,
}

impl ResourceSchema {
    pub fn new(resource_name: impl Into<String>) -> Self {
        Self {
            resource_name: resource_name.into(),
            properties: IndexMap::new(),
            required: Vec::new(),
        }
    }

    /// Add a property
    pub fn insert(&mut self, name: impl Into<String>, node: impl Into<SchemaNode>) {
        self.properties.insert(name.into(), node.into());
    }

    /// Mark an existing property as required; unknown names are ignored
    pub fn require(&mut self, name: &str) {
        if self.properties.contains_key(name) && !self.required.iter().any(|r| r == name) {
            self.required.push(name.to_string());
        }
    }

    /// Output file name: `{lowercase(resource_name)}.yaml`
    pub fn file_name(&self) -> String {
        format!("{}.yaml", self.resource_name.to_lowercase())
    }

    /// The properties as a generic map
    pub fn properties_value(&self) -> Result<Map<String, JsonValue>> {
        let mut map = Map::with_capacity(self.properties.len());
        for (name, node) in &self.properties {
            map.insert(name.clone(), serde_json::to_value(node)?);
        }
        Ok(map)
    }

    /// The bare `{properties, required}` document
    pub fn to_document(&self) -> Result<JsonValue> {
        Ok(json!({
            "properties": self.properties_value()?,
            "required": self.required,
        }))
    }
}
