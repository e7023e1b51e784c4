//! HCL variable parser
//!
//! Parses `.tf` sources with pest and collects `variable` blocks. Attribute
//! expressions are kept as source text; `default` and `description` are
//! decoded when they are literals.

use pest::Parser;
use pest::iterators::Pair;
use pest_derive::Parser;
use serde_json::{Map, Number, Value as JsonValue};

use super::Variable;
use crate::error::{CoreError, Result};

#[derive(Parser)]
#[grammar = "terraform/hcl.pest"]
struct HclParser;

/// Collect the `variable` blocks of an HCL source, in declaration order
pub fn parse_variables(source: &str, origin: &str) -> Result<Vec<Variable>> {
    let file = HclParser::parse(Rule::file, source)
        .map_err(|e| CoreError::HclParse {
            path: origin.to_string(),
            message: e.to_string(),
        })?
        .next()
        .ok_or_else(|| CoreError::HclParse {
            path: origin.to_string(),
            message: "empty parse tree".to_string(),
        })?;

    let mut variables = Vec::new();
    for item in file.into_inner() {
        if item.as_rule() != Rule::block {
            continue;
        }
        if let Some(variable) = variable_block(item) {
            variables.push(variable);
        }
    }
    Ok(variables)
}

fn variable_block(block: Pair<'_, Rule>) -> Option<Variable> {
    let mut inner = block.into_inner();
    let block_type = inner.next()?;
    if block_type.as_str() != "variable" {
        return None;
    }

    let mut name = None;
    let mut variable = Variable::default();
    let mut has_default = false;

    for pair in inner {
        match pair.as_rule() {
            Rule::string_lit | Rule::identifier if name.is_none() => {
                name = Some(label_text(&pair));
            }
            Rule::attribute => {
                let mut parts = pair.into_inner();
                let (Some(key), Some(expr)) = (parts.next(), parts.next()) else {
                    continue;
                };
                let raw = expr.as_str().trim();
                match key.as_str() {
                    "type" => variable.type_expr = type_text(raw),
                    "description" => {
                        variable.description = match parse_value(raw) {
                            Some(JsonValue::String(s)) => s,
                            _ => raw.to_string(),
                        };
                    }
                    "default" => {
                        has_default = true;
                        let value = parse_value(raw)
                            .unwrap_or_else(|| JsonValue::String(raw.to_string()));
                        variable.default = (!value.is_null()).then_some(value);
                    }
                    _ => {}
                }
            }
            _ => {}
        }
    }

    variable.name = name?;
    variable.required = !has_default;
    Some(variable)
}

fn label_text(pair: &Pair<'_, Rule>) -> String {
    match pair.as_rule() {
        Rule::string_lit => pair
            .clone()
            .into_inner()
            .next()
            .map(|p| unescape(p.as_str()))
            .unwrap_or_default(),
        _ => pair.as_str().to_string(),
    }
}

/// Type expression text; legacy quoted types (`"string"`) are unquoted
fn type_text(raw: &str) -> String {
    match parse_value(raw) {
        Some(JsonValue::String(s)) => s,
        _ => raw.to_string(),
    }
}

/// Decode a literal expression into a generic tree
///
/// Returns `None` for anything that is not a literal (references, function
/// calls, operators).
pub fn parse_value(text: &str) -> Option<JsonValue> {
    let document = HclParser::parse(Rule::value_document, text).ok()?.next()?;
    let value = document
        .into_inner()
        .find(|p| p.as_rule() != Rule::EOI)?;
    Some(convert_value(value))
}

fn convert_value(pair: Pair<'_, Rule>) -> JsonValue {
    match pair.as_rule() {
        Rule::null_lit => JsonValue::Null,
        Rule::bool_lit => JsonValue::Bool(pair.as_str() == "true"),
        Rule::number => convert_number(pair.as_str()),
        Rule::string_lit => JsonValue::String(label_text(&pair)),
        Rule::heredoc => JsonValue::String(heredoc_text(pair)),
        Rule::tuple => JsonValue::Array(pair.into_inner().map(convert_value).collect()),
        Rule::object => {
            let mut map = Map::new();
            for item in pair.into_inner() {
                let mut parts = item.into_inner();
                if let (Some(key), Some(value)) = (parts.next(), parts.next()) {
                    map.insert(label_text(&key), convert_value(value));
                }
            }
            JsonValue::Object(map)
        }
        _ => JsonValue::String(pair.as_str().to_string()),
    }
}

fn convert_number(text: &str) -> JsonValue {
    if let Ok(i) = text.parse::<i64>() {
        return JsonValue::Number(i.into());
    }
    text.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(JsonValue::Number)
        .unwrap_or_else(|| JsonValue::String(text.to_string()))
}

fn heredoc_text(pair: Pair<'_, Rule>) -> String {
    let mut strip = false;
    let mut body = "";
    for part in pair.into_inner() {
        match part.as_rule() {
            Rule::heredoc_strip => strip = true,
            Rule::heredoc_body => body = part.as_str(),
            _ => {}
        }
    }
    if !strip {
        return body.to_string();
    }

    let indent = body
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.len() - line.trim_start().len())
        .min()
        .unwrap_or(0);

    body.split_inclusive('\n')
        .map(|line| {
            let cut = line
                .char_indices()
                .take_while(|(i, c)| *i < indent && (*c == ' ' || *c == '\t'))
                .count();
            &line[cut..]
        })
        .collect()
}

/// Resolve HCL string escapes; template sequences stay as written
fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(decoded) => out.push(decoded),
                    None => {
                        out.push_str("\\u");
                        out.push_str(&hex);
                    }
                }
            }
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const VARIABLES_TF: &str = r#"
# Inputs
variable "region" {
  type        = string
  description = "AWS region"
  default     = "us-east-1"
}

variable "name" {
  type = string
}

variable "tags" {
  type = map(string)
  default = {
    team = "core"
    "cost-center" = 42
  }
}

/* legacy syntax */
variable "zones" {
  type    = "list"
  default = ["a", "b",]
}

variable "nullable" { default = null }

variable "computed" {
  type    = list(object({
    name = string
    port = number
  }))
  default = local.defaults // not a literal

  validation {
    condition     = length(var.computed) > 0
    error_message = "Need at least one entry, got ${length(var.computed)}."
  }
}

resource "aws_s3_bucket" "this" {
  bucket = "${var.name}-bucket"
  tags   = merge(var.tags, { "Name" = var.name })
}
"#;

    #[test]
    fn test_parse_variables() {
        let vars = parse_variables(VARIABLES_TF, "variables.tf").unwrap();
        let names: Vec<&str> = vars.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, ["region", "name", "tags", "zones", "nullable", "computed"]);

        let region = &vars[0];
        assert_eq!(region.type_expr, "string");
        assert_eq!(region.description, "AWS region");
        assert_eq!(region.default, Some(json!("us-east-1")));
        assert!(!region.required);

        assert!(vars[1].required);
        assert!(vars[1].default.is_none());

        assert_eq!(vars[2].type_expr, "map(string)");
        assert_eq!(vars[2].default, Some(json!({"team": "core", "cost-center": 42})));

        assert_eq!(vars[3].type_expr, "list");
        assert_eq!(vars[3].default, Some(json!(["a", "b"])));

        assert!(!vars[4].required);
        assert!(vars[4].default.is_none());
        assert_eq!(vars[4].type_expr, "");

        assert!(vars[5].type_expr.starts_with("list(object({"));
        assert_eq!(vars[5].default, Some(json!("local.defaults")));
    }

    #[test]
    fn test_heredoc_description() {
        let source = "variable \"x\" {\n  description = <<-EOT\n    First line\n      indented\n    EOT\n}\n";
        let vars = parse_variables(source, "x.tf").unwrap();
        assert_eq!(vars[0].description, "First line\n  indented\n");
    }

    #[test]
    fn test_parse_error_names_file() {
        let err = parse_variables("variable \"x\" {\n  type = \n", "broken.tf").unwrap_err();
        assert!(matches!(err, CoreError::HclParse { path, .. } if path == "broken.tf"));
    }

    #[test]
    fn test_parse_value_literals() {
        assert_eq!(parse_value("true"), Some(json!(true)));
        assert_eq!(parse_value("-3"), Some(json!(-3)));
        assert_eq!(parse_value("1.5"), Some(json!(1.5)));
        assert_eq!(parse_value("\"a\\\"b\""), Some(json!("a\"b")));
        assert_eq!(
            parse_value("{ a = [1, 2], b: { c = null } }"),
            Some(json!({"a": [1, 2], "b": {"c": null}}))
        );
        assert_eq!(parse_value("var.x"), None);
        assert_eq!(parse_value("upper(\"x\")"), None);
    }
}
