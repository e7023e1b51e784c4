//! Path expressions addressing a node of a template document
//!
//! A small jq-style subset: `.`, `.field`, `."quoted key"`, `[n]` (negative
//! counts from the end) and `[]` (every element). An expression may match
//! any number of nodes; merging requires exactly one.

use pest::Parser;
use pest_derive::Parser;
use serde_json::{Map, Value as JsonValue};
use std::fmt;

use crate::error::{CoreError, Result};
use crate::value::kind_name;

#[derive(Parser)]
#[grammar = "path.pest"]
struct PathParser;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Step {
    Field(String),
    Index(i64),
    Iterate,
}

/// One hop of a concrete location
#[derive(Debug, Clone, PartialEq, Eq)]
enum Hop {
    Key(String),
    Position(usize),
}

/// A parsed path expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathExpr {
    source: String,
    steps: Vec<Step>,
}

impl PathExpr {
    /// Parse an expression such as `.spec.parameters[0]`
    pub fn parse(expr: &str) -> Result<Self> {
        let invalid = |message: String| CoreError::InvalidPath {
            path: expr.to_string(),
            message,
        };

        let path = PathParser::parse(Rule::path, expr)
            .map_err(|e| invalid(e.variant.message().to_string()))?
            .next()
            .ok_or_else(|| invalid("empty expression".to_string()))?;

        let mut steps = Vec::new();
        for pair in path.into_inner() {
            match pair.as_rule() {
                Rule::field => {
                    let key = pair
                        .into_inner()
                        .next()
                        .map(|p| p.as_str().to_string())
                        .unwrap_or_default();
                    steps.push(Step::Field(key));
                }
                Rule::index => {
                    let text = pair
                        .into_inner()
                        .next()
                        .map(|p| p.as_str())
                        .unwrap_or_default();
                    let index = text
                        .parse::<i64>()
                        .map_err(|e| invalid(format!("bad index '{}': {}", text, e)))?;
                    steps.push(Step::Index(index));
                }
                Rule::iterate => steps.push(Step::Iterate),
                _ => {}
            }
        }

        Ok(Self {
            source: expr.to_string(),
            steps,
        })
    }

    /// The expression text as given
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Resolve to the single mapping node the expression addresses
    pub fn resolve_mut<'a>(
        &self,
        doc: &'a mut JsonValue,
    ) -> Result<&'a mut Map<String, JsonValue>> {
        let mut locations = self.locate(doc);
        let location = match locations.len() {
            0 => {
                return Err(CoreError::PathNotFound {
                    path: self.source.clone(),
                });
            }
            1 => locations.remove(0),
            count => {
                return Err(CoreError::AmbiguousPath {
                    path: self.source.clone(),
                    count,
                });
            }
        };

        let mut node = doc;
        for hop in &location {
            node = match (hop, node) {
                (Hop::Key(key), JsonValue::Object(map)) => map.get_mut(key),
                (Hop::Position(i), JsonValue::Array(items)) => items.get_mut(*i),
                _ => None,
            }
            .ok_or_else(|| CoreError::PathNotFound {
                path: self.source.clone(),
            })?;
        }

        let found = kind_name(node);
        node.as_object_mut().ok_or_else(|| CoreError::PathNotMapping {
            path: self.source.clone(),
            found: found.to_string(),
        })
    }

    /// Every concrete location the expression matches
    fn locate(&self, doc: &JsonValue) -> Vec<Vec<Hop>> {
        let mut current: Vec<(Vec<Hop>, &JsonValue)> = vec![(Vec::new(), doc)];

        for step in &self.steps {
            let mut next = Vec::new();
            for (location, node) in current {
                match (step, node) {
                    (Step::Field(key), JsonValue::Object(map)) => {
                        if let Some(child) = map.get(key) {
                            next.push((extend(&location, Hop::Key(key.clone())), child));
                        }
                    }
                    (Step::Index(index), JsonValue::Array(items)) => {
                        if let Some(i) = absolute_index(*index, items.len()) {
                            next.push((extend(&location, Hop::Position(i)), &items[i]));
                        }
                    }
                    (Step::Iterate, JsonValue::Array(items)) => {
                        for (i, child) in items.iter().enumerate() {
                            next.push((extend(&location, Hop::Position(i)), child));
                        }
                    }
                    (Step::Iterate, JsonValue::Object(map)) => {
                        for (key, child) in map {
                            next.push((extend(&location, Hop::Key(key.clone())), child));
                        }
                    }
                    _ => {}
                }
            }
            current = next;
        }

        current.into_iter().map(|(location, _)| location).collect()
    }
}

impl fmt::Display for PathExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn extend(location: &[Hop], hop: Hop) -> Vec<Hop> {
    let mut extended = location.to_vec();
    extended.push(hop);
    extended
}

fn absolute_index(index: i64, len: usize) -> Option<usize> {
    let len = i64::try_from(len).ok()?;
    let resolved = if index < 0 { len + index } else { index };
    if (0..len).contains(&resolved) {
        usize::try_from(resolved).ok()
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn template() -> JsonValue {
        json!({
            "spec": {
                "parameters": [
                    {"title": "first", "properties": {}},
                    {"title": "second"}
                ],
                "weird-key": {"a": 1},
                "owner": "team"
            }
        })
    }

    #[test]
    fn test_parse_forms() {
        assert!(PathExpr::parse(".").is_ok());
        assert!(PathExpr::parse(".spec.parameters[0]").is_ok());
        assert!(PathExpr::parse(".spec.parameters.[1]").is_ok());
        assert!(PathExpr::parse(".spec.\"weird-key\"").is_ok());
        assert!(PathExpr::parse(".spec.parameters[]").is_ok());
        assert!(PathExpr::parse(".spec.parameters[-1]").is_ok());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        for bad in ["", "spec", ".spec[", ".spec..x", ". spec", ".[a]"] {
            let err = PathExpr::parse(bad).unwrap_err();
            assert!(matches!(err, CoreError::InvalidPath { .. }), "{bad}");
        }
    }

    #[test]
    fn test_resolve_index() {
        let mut doc = template();
        let node = PathExpr::parse(".spec.parameters[0]")
            .unwrap()
            .resolve_mut(&mut doc)
            .unwrap();
        assert_eq!(node["title"], "first");

        let node = PathExpr::parse(".spec.parameters[-1]")
            .unwrap()
            .resolve_mut(&mut doc)
            .unwrap();
        assert_eq!(node["title"], "second");
    }

    #[test]
    fn test_resolve_root_and_quoted() {
        let mut doc = template();
        let root = PathExpr::parse(".").unwrap().resolve_mut(&mut doc).unwrap();
        assert!(root.contains_key("spec"));

        let node = PathExpr::parse(".spec.\"weird-key\"")
            .unwrap()
            .resolve_mut(&mut doc)
            .unwrap();
        assert_eq!(node["a"], 1);
    }

    #[test]
    fn test_not_found() {
        let mut doc = template();
        for expr in [".spec.missing", ".spec.parameters[5]", ".spec.owner.deeper"] {
            let err = PathExpr::parse(expr).unwrap().resolve_mut(&mut doc).unwrap_err();
            assert!(matches!(err, CoreError::PathNotFound { .. }), "{expr}");
        }
    }

    #[test]
    fn test_iterate_is_ambiguous() {
        let mut doc = template();
        let expr = PathExpr::parse(".spec.parameters[]").unwrap();
        assert_eq!(expr.locate(&doc).len(), 2);

        let err = expr.resolve_mut(&mut doc).unwrap_err();
        assert!(matches!(err, CoreError::AmbiguousPath { count: 2, .. }));
    }

    #[test]
    fn test_non_mapping_target() {
        let mut doc = template();
        let err = PathExpr::parse(".spec.owner")
            .unwrap()
            .resolve_mut(&mut doc)
            .unwrap_err();
        assert!(matches!(err, CoreError::PathNotMapping { found, .. } if found == "string"));
    }
}
