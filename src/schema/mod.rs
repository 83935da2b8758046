//! Settings declarations
//!
//! A `Schema` is an ordered list of field declarations. Each declaration needs
//! a default value, an explicit kind, or both; `Schema::resolve` checks all of
//! them before any argument or file is looked at.

use crate::coerce::conform;
use crate::domain::{FieldKind, ScalarKind, Value};
use crate::error::{HypersError, Result};
use std::collections::HashSet;

/// Field names that would collide with built-in or reserved flags.
const RESERVED_NAMES: &[&str] = &["f", "help"];

/// One field as written by the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDecl {
    name: String,
    default: Option<Value>,
    kind: Option<FieldKind>,
    help: Option<String>,
    internal: bool,
}

impl FieldDecl {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), default: None, kind: None, help: None, internal: false }
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn kind(mut self, kind: FieldKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    /// Keep the field off the command line and out of the report. It may stay
    /// unset until the program fills it in with `Settings::set`.
    pub fn internal(mut self) -> Self {
        self.internal = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// A validated field with a known kind.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub kind: FieldKind,
    /// `None` for a typed field without default; it must be set by a later layer.
    pub default: Option<Value>,
    pub help: Option<String>,
    /// Not exposed as a flag, not reported, never required.
    pub internal: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    fields: Vec<FieldDecl>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a field whose kind is inferred from its default.
    pub fn field(self, name: impl Into<String>, default: impl Into<Value>) -> Self {
        self.declare(FieldDecl::new(name).default_value(default))
    }

    /// Declare a field with an explicit kind and no default.
    pub fn typed(self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.declare(FieldDecl::new(name).kind(kind))
    }

    pub fn declare(mut self, decl: FieldDecl) -> Self {
        self.fields.push(decl);
        self
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Validate every declaration and return the typed fields in order.
    pub fn resolve(&self) -> Result<Vec<Field>> {
        let mut seen = HashSet::new();
        let mut resolved = Vec::with_capacity(self.fields.len());

        for decl in &self.fields {
            validate_name(&decl.name)?;
            if !seen.insert(decl.name.as_str()) {
                return Err(HypersError::declaration(&decl.name, "declared more than once"));
            }

            let inferred = decl.default.as_ref().map(|d| infer_kind(&decl.name, d)).transpose()?;
            let kind = match (decl.kind, inferred) {
                (Some(kind), _) => kind,
                (None, Some(kind)) => kind,
                (None, None) => {
                    return Err(HypersError::declaration(
                        &decl.name,
                        "no default value and no type annotation",
                    ))
                }
            };

            let default = match &decl.default {
                Some(value) => Some(conform(kind, value.clone()).map_err(|reason| {
                    HypersError::declaration(&decl.name, format!("default does not match: {reason}"))
                })?),
                None => None,
            };

            resolved.push(Field {
                name: decl.name.clone(),
                kind,
                default,
                help: decl.help.clone(),
                internal: decl.internal,
            });
        }

        Ok(resolved)
    }
}

fn validate_name(name: &str) -> Result<()> {
    let reason = if name.is_empty() {
        Some("name is empty")
    } else if name.starts_with('_') {
        Some("names starting with `_` are private")
    } else if name.starts_with('-') {
        Some("name cannot start with `-`")
    } else if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
        Some("name may only contain ASCII letters, digits, `_` and `-`")
    } else if RESERVED_NAMES.contains(&name) {
        Some("name is reserved")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(HypersError::declaration(name, reason)),
        None => Ok(()),
    }
}

/// Infer a field kind from a default value.
///
/// Lists take the kind of their first element; mixing ints and floats gives
/// floats, any other mix is a declaration error.
pub fn infer_kind(name: &str, default: &Value) -> Result<FieldKind> {
    let items = match default {
        Value::List(items) => items,
        scalar => {
            return Ok(FieldKind::Scalar(scalar.scalar_kind().unwrap_or(ScalarKind::Str)));
        }
    };

    let mut element: Option<ScalarKind> = None;
    for item in items {
        let Some(kind) = item.scalar_kind() else {
            return Err(HypersError::declaration(name, "nested lists are not supported"));
        };
        element = match (element, kind) {
            (None, k) => Some(k),
            (Some(a), b) if a == b => Some(a),
            (Some(ScalarKind::Int), ScalarKind::Float) | (Some(ScalarKind::Float), ScalarKind::Int) => {
                Some(ScalarKind::Float)
            }
            (Some(a), b) => {
                return Err(HypersError::declaration(
                    name,
                    format!("list default mixes {a} and {b} elements"),
                ))
            }
        };
    }

    Ok(FieldKind::List(element))
}
