//! Generic document trees
//!
//! Every document (CRDs, templates, generated output) is handled as a
//! `serde_json::Value` with ordered maps. YAML is decoded into
//! `serde_yaml::Value` first and converted explicitly, so that integers come
//! out with a single 64-bit width and non-string keys are stringified.

use serde::Deserialize;
use serde_json::{Map, Number, Value as JsonValue};
use serde_yaml::Value as YamlValue;
use std::fs;
use std::path::Path;

use crate::error::Result;

/// Parse a YAML (or JSON) string into a generic tree
pub fn from_yaml_str(content: &str) -> Result<JsonValue> {
    let yaml: YamlValue = serde_yaml::from_str(content)?;
    yaml_to_json(yaml)
}

/// Each document of a `---` separated YAML stream, decoded lazily
pub fn yaml_documents(content: &str) -> impl Iterator<Item = Result<JsonValue>> + '_ {
    serde_yaml::Deserializer::from_str(content)
        .map(|document| yaml_to_json(YamlValue::deserialize(document)?))
}

/// Read and parse a YAML (or JSON) file into a generic tree
pub fn read_yaml_file(path: &Path) -> Result<JsonValue> {
    let content = fs::read_to_string(path)?;
    from_yaml_str(&content)
}

/// Convert a decoded YAML value into a generic tree
pub fn yaml_to_json(value: YamlValue) -> Result<JsonValue> {
    Ok(match value {
        YamlValue::Null => JsonValue::Null,
        YamlValue::Bool(b) => JsonValue::Bool(b),
        YamlValue::Number(n) => yaml_number(&n),
        YamlValue::String(s) => JsonValue::String(s),
        YamlValue::Sequence(seq) => JsonValue::Array(
            seq.into_iter()
                .map(yaml_to_json)
                .collect::<Result<Vec<_>>>()?,
        ),
        YamlValue::Mapping(mapping) => {
            let mut map = Map::with_capacity(mapping.len());
            for (key, value) in mapping {
                map.insert(mapping_key(key)?, yaml_to_json(value)?);
            }
            JsonValue::Object(map)
        }
        YamlValue::Tagged(tagged) => yaml_to_json(tagged.value)?,
    })
}

fn yaml_number(n: &serde_yaml::Number) -> JsonValue {
    if let Some(i) = n.as_i64() {
        JsonValue::Number(i.into())
    } else if let Some(u) = n.as_u64() {
        JsonValue::Number(u.into())
    } else {
        n.as_f64()
            .and_then(Number::from_f64)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null)
    }
}

fn mapping_key(key: YamlValue) -> Result<String> {
    Ok(match key {
        YamlValue::String(s) => s,
        YamlValue::Bool(b) => b.to_string(),
        YamlValue::Number(n) => n.to_string(),
        YamlValue::Null => "null".to_string(),
        other => serde_yaml::to_string(&other)?.trim_end().to_string(),
    })
}

/// Re-encode every integer in a tree as a 64-bit signed number where it fits
///
/// Trees built by other decoders (JSON files, HCL literals) go through this
/// before being emitted, recursively through maps and sequences.
pub fn normalize_integers(value: JsonValue) -> JsonValue {
    match value {
        JsonValue::Number(n) => match n.as_i64() {
            Some(i) => JsonValue::Number(i.into()),
            None => JsonValue::Number(n),
        },
        JsonValue::Array(items) => {
            JsonValue::Array(items.into_iter().map(normalize_integers).collect())
        }
        JsonValue::Object(map) => JsonValue::Object(
            map.into_iter()
                .map(|(k, v)| (k, normalize_integers(v)))
                .collect(),
        ),
        other => other,
    }
}

/// Human readable name of a node's kind, used in error messages
pub fn kind_name(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "sequence",
        JsonValue::Object(_) => "mapping",
    }
}

/// Serialize a tree as YAML
pub fn to_yaml_string(value: &JsonValue) -> Result<String> {
    Ok(serde_yaml::to_string(value)?)
}

/// Write a tree as a YAML file, creating parent directories as needed
pub fn write_yaml_file(path: &Path, value: &JsonValue) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, to_yaml_string(value)?)?;
    Ok(())
}
