//! Terraform type expressions
//!
//! Parses type strings such as `list(map(string))` into a [`TypeDescriptor`].
//! Parsing is total: anything that is not recognized becomes a string
//! primitive.
//!
//! Only the outermost wrapper of each level is unwrapped. A literal
//! `object({a = string, b = number})` is not destructured into named members:
//! its interior `{a=string,b=number}` is treated as a single nested type
//! expression, which then falls back to `string`.

use std::fmt;

/// Primitive Terraform types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    String,
    Number,
    Boolean,
}

impl Primitive {
    /// Name of the primitive in the output schema dialect
    pub fn schema_type(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
        }
    }
}

/// Structured form of a type expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeDescriptor {
    Primitive(Primitive),
    /// `list(T)`, or `set(T)` with `unique` set
    List {
        element: Box<TypeDescriptor>,
        unique: bool,
    },
    /// `map(T)`
    Map { value_type: Box<TypeDescriptor> },
    /// `object(T)`, interior kept as one nested type expression
    Object { value_type: Box<TypeDescriptor> },
}

impl TypeDescriptor {
    /// Parse a type expression; never fails
    pub fn parse(expr: &str) -> Self {
        let cleaned: String = expr.chars().filter(|c| !c.is_whitespace()).collect();
        Self::parse_cleaned(&cleaned)
    }

    fn parse_cleaned(s: &str) -> Self {
        match s {
            "string" => return Self::Primitive(Primitive::String),
            "number" => return Self::Primitive(Primitive::Number),
            "bool" => return Self::Primitive(Primitive::Boolean),
            _ => {}
        }

        if let Some(inner) = unwrap_call(s, "list(") {
            return Self::List {
                element: Box::new(Self::parse_cleaned(inner)),
                unique: false,
            };
        }
        if let Some(inner) = unwrap_call(s, "set(") {
            return Self::List {
                element: Box::new(Self::parse_cleaned(inner)),
                unique: true,
            };
        }
        if let Some(inner) = unwrap_call(s, "map(") {
            return Self::Map {
                value_type: Box::new(Self::parse_cleaned(inner)),
            };
        }
        if let Some(inner) = unwrap_call(s, "object(") {
            return Self::Object {
                value_type: Box::new(Self::parse_cleaned(inner)),
            };
        }

        Self::Primitive(Primitive::String)
    }

    /// Whether this descriptor is a primitive
    pub fn is_primitive(&self) -> bool {
        matches!(self, Self::Primitive(_))
    }

    /// The primitive kind, if any
    pub fn as_primitive(&self) -> Option<Primitive> {
        match self {
            Self::Primitive(p) => Some(*p),
            _ => None,
        }
    }

    /// Name of the descriptor's type in the output schema dialect
    pub fn schema_type(&self) -> &'static str {
        match self {
            Self::Primitive(p) => p.schema_type(),
            Self::List { .. } => "array",
            Self::Map { .. } | Self::Object { .. } => "object",
        }
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primitive(Primitive::String) => write!(f, "string"),
            Self::Primitive(Primitive::Number) => write!(f, "number"),
            Self::Primitive(Primitive::Boolean) => write!(f, "bool"),
            Self::List {
                element,
                unique: false,
            } => write!(f, "list({})", element),
            Self::List {
                element,
                unique: true,
            } => write!(f, "set({})", element),
            Self::Map { value_type } => write!(f, "map({})", value_type),
            Self::Object { value_type } => write!(f, "object({})", value_type),
        }
    }
}

/// Strip `prefix` and one trailing `)` (if present)
fn unwrap_call<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    s.strip_prefix(prefix)
        .map(|rest| rest.strip_suffix(')').unwrap_or(rest))
}
