//! Normalized parameter fields
//!
//! [`ParamField`] is the schema node emitted into templates. It covers the
//! subset of JSON Schema that template form renderers understand: `type`,
//! `title`, `description`, `default`, `items`, `properties`,
//! `additionalProperties`, `enum` and `uniqueItems`.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::{CoreError, Result};
use crate::types::{Primitive, TypeDescriptor};
use crate::value::normalize_integers;

/// Field types of the output schema dialect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    #[default]
    String,
    Number,
    Boolean,
    Array,
    Object,
}

impl From<Primitive> for FieldType {
    fn from(p: Primitive) -> Self {
        match p {
            Primitive::String => Self::String,
            Primitive::Number => Self::Number,
            Primitive::Boolean => Self::Boolean,
        }
    }
}

/// Value type of an open-ended object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdditionalProperties {
    #[serde(rename = "type")]
    pub field_type: FieldType,
}

/// A single parameter schema node
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParamField {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(rename = "type")]
    pub field_type: FieldType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Copied verbatim from the source, integers normalized to 64-bit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<JsonValue>,

    #[serde(default, rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<JsonValue>>,

    /// Element schema when `type` is `array`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<ParamField>>,

    /// Named members when `type` is `object`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<IndexMap<String, ParamField>>,

    /// Homogeneous value type when `type` is an open-ended `object`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_properties: Option<AdditionalProperties>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unique_items: Option<bool>,
}

impl ParamField {
    /// Create a bare field of the given type
    pub fn new(field_type: FieldType) -> Self {
        Self {
            field_type,
            ..Default::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_default(mut self, default: JsonValue) -> Self {
        self.default = Some(normalize_integers(default));
        self
    }

    pub fn with_items(mut self, items: ParamField) -> Self {
        self.items = Some(Box::new(items));
        self
    }

    pub fn with_enum(mut self, values: Vec<JsonValue>) -> Self {
        self.enum_values = Some(values);
        self
    }

    /// Serialize into a generic tree
    pub fn to_value(&self) -> Result<JsonValue> {
        Ok(serde_json::to_value(self)?)
    }
}

/// Convert a type descriptor (plus metadata) into a parameter field
///
/// Nested element and value types get synthetic names derived from `name`:
/// `<name>-a` for array items and `<name>-n` for the single member carrying a
/// non-primitive map/object value type. Downstream templates rely on these
/// names.
pub fn build(
    name: &str,
    descriptor: &TypeDescriptor,
    description: Option<&str>,
    default: Option<&JsonValue>,
) -> ParamField {
    let description = description
        .filter(|d| !d.is_empty())
        .map(str::to_string);
    let default = default
        .filter(|d| !d.is_null())
        .cloned()
        .map(normalize_integers);

    match descriptor {
        TypeDescriptor::Primitive(p) => ParamField {
            field_type: (*p).into(),
            description,
            default,
            ..Default::default()
        },
        TypeDescriptor::List { element, unique } => ParamField {
            field_type: FieldType::Array,
            description,
            default,
            items: Some(Box::new(build(&format!("{name}-a"), element, None, None))),
            unique_items: unique.then_some(true),
            ..Default::default()
        },
        TypeDescriptor::Map { value_type } | TypeDescriptor::Object { value_type } => {
            let mut field = ParamField {
                title: Some(name.to_string()),
                field_type: FieldType::Object,
                description,
                ..Default::default()
            };
            match value_type.as_primitive() {
                Some(p) => {
                    field.additional_properties = Some(AdditionalProperties {
                        field_type: p.into(),
                    });
                }
                None => {
                    let member = format!("{name}-n");
                    let nested = build(&member, value_type, None, None);
                    field.properties = Some(IndexMap::from([(member, nested)]));
                }
            }
            field
        }
    }
}

/// Field builder with optional default-driven property inference
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldBuilder {
    infer_object_defaults: bool,
}

impl FieldBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Turn a map/object variable's default keys into named properties
    ///
    /// Only applies to primitive value types with a non-empty map default.
    /// The inferred properties replace `additionalProperties`.
    pub fn infer_object_defaults(mut self, enabled: bool) -> Self {
        self.infer_object_defaults = enabled;
        self
    }

    /// Build a field, applying default inference when enabled
    pub fn build(
        &self,
        name: &str,
        descriptor: &TypeDescriptor,
        description: Option<&str>,
        default: Option<&JsonValue>,
    ) -> Result<ParamField> {
        let mut field = build(name, descriptor, description, default);

        if self.infer_object_defaults {
            if let Some(properties) = infer_default_properties(name, descriptor, default)? {
                field.additional_properties = None;
                field.properties = Some(properties);
            }
        }

        Ok(field)
    }
}

fn infer_default_properties(
    name: &str,
    descriptor: &TypeDescriptor,
    default: Option<&JsonValue>,
) -> Result<Option<IndexMap<String, ParamField>>> {
    let value_type = match descriptor {
        TypeDescriptor::Map { value_type } | TypeDescriptor::Object { value_type }
            if value_type.is_primitive() =>
        {
            value_type
        }
        _ => return Ok(None),
    };

    let default = match default {
        Some(d) if !d.is_null() => d,
        _ => return Ok(None),
    };

    let map = default.as_object().ok_or_else(|| CoreError::TypeDefaultMismatch {
        name: name.to_string(),
    })?;
    if map.is_empty() {
        return Ok(None);
    }

    Ok(Some(
        map.iter()
            .map(|(key, value)| (key.clone(), build(key, value_type, None, Some(value))))
            .collect(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn build_expr(name: &str, expr: &str) -> ParamField {
        build(name, &TypeDescriptor::parse(expr), None, None)
    }

    #[test]
    fn test_primitive_with_metadata() {
        let field = build(
            "region",
            &TypeDescriptor::parse("string"),
            Some("AWS region"),
            Some(&json!("us-east-1")),
        );
        assert_eq!(field.field_type, FieldType::String);
        assert_eq!(field.description.as_deref(), Some("AWS region"));
        assert_eq!(field.default, Some(json!("us-east-1")));
        assert!(field.title.is_none());
    }

    #[test]
    fn test_empty_description_and_null_default_are_omitted() {
        let field = build("x", &TypeDescriptor::parse("bool"), Some(""), Some(&JsonValue::Null));
        assert_eq!(
            field.to_value().unwrap(),
            json!({"type": "boolean"})
        );
    }

    #[test]
    fn test_set_is_unique_list() {
        let set = build_expr("zones", "set(string)");
        assert_eq!(set.field_type, FieldType::Array);
        assert_eq!(set.unique_items, Some(true));
        assert_eq!(set.items.as_ref().unwrap().field_type, FieldType::String);

        let list = build_expr("zones", "list(string)");
        assert_eq!(list.unique_items, None);
        assert!(!list.to_value().unwrap().as_object().unwrap().contains_key("uniqueItems"));
    }

    #[test]
    fn test_map_of_primitive_uses_additional_properties() {
        let field = build_expr("tags", "map(string)");
        assert_eq!(
            field.to_value().unwrap(),
            json!({
                "title": "tags",
                "type": "object",
                "additionalProperties": {"type": "string"}
            })
        );
        assert!(field.properties.is_none());
    }

    #[test]
    fn test_map_of_list_nests_under_synthetic_member() {
        let field = build_expr("groups", "map(list(number))");
        assert_eq!(
            field.to_value().unwrap(),
            json!({
                "title": "groups",
                "type": "object",
                "properties": {
                    "groups-n": {
                        "type": "array",
                        "items": {"type": "number"}
                    }
                }
            })
        );
    }

    #[test]
    fn test_list_of_map_names_items() {
        let field = build_expr("rules", "list(map(bool))");
        let items = field.items.unwrap();
        assert_eq!(items.title.as_deref(), Some("rules-a"));
        assert_eq!(
            items.additional_properties,
            Some(AdditionalProperties {
                field_type: FieldType::Boolean
            })
        );
    }

    #[test]
    fn test_object_of_object() {
        let field = build_expr("cfg", "object(object(string))");
        let member = &field.properties.as_ref().unwrap()["cfg-n"];
        assert_eq!(member.title.as_deref(), Some("cfg-n"));
        assert_eq!(member.field_type, FieldType::Object);
    }

    #[test]
    fn test_array_keeps_default_map_drops_it() {
        let list = build(
            "ports",
            &TypeDescriptor::parse("list(number)"),
            None,
            Some(&json!([80, 443])),
        );
        assert_eq!(list.default, Some(json!([80, 443])));

        let map = build(
            "tags",
            &TypeDescriptor::parse("map(string)"),
            None,
            Some(&json!({"team": "core"})),
        );
        assert!(map.default.is_none());
    }

    #[test]
    fn test_infer_object_defaults() {
        let builder = FieldBuilder::new().infer_object_defaults(true);
        let field = builder
            .build(
                "tags",
                &TypeDescriptor::parse("map(string)"),
                None,
                Some(&json!({"team": "core", "env": "dev"})),
            )
            .unwrap();

        assert!(field.additional_properties.is_none());
        let properties = field.properties.unwrap();
        assert_eq!(properties.keys().collect::<Vec<_>>(), ["team", "env"]);
        assert_eq!(properties["team"].default, Some(json!("core")));
        assert_eq!(properties["team"].field_type, FieldType::String);
    }

    #[test]
    fn test_infer_object_defaults_rejects_non_map_default() {
        let builder = FieldBuilder::new().infer_object_defaults(true);
        let err = builder
            .build(
                "tags",
                &TypeDescriptor::parse("map(string)"),
                None,
                Some(&json!(["a"])),
            )
            .unwrap_err();
        assert!(matches!(err, CoreError::TypeDefaultMismatch { name } if name == "tags"));
    }

    #[test]
    fn test_inference_disabled_ignores_default_shape() {
        let field = FieldBuilder::new()
            .build(
                "tags",
                &TypeDescriptor::parse("map(string)"),
                None,
                Some(&json!("not a map")),
            )
            .unwrap();
        assert!(field.additional_properties.is_some());
    }
}
