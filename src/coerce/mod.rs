//! Type coercion for raw string tokens
//!
//! Generic coercion tries, in order: boolean, integer, float, string. A token
//! containing a comma becomes a list whose pieces are coerced independently.
//! Field-directed parsing (`parse_for_kind`) narrows that to the declared type,
//! and `conform` applies the same rules to values that are already typed (config
//! files).

use crate::domain::{FieldKind, ScalarKind, Value};

const TRUE_TOKENS: &[&str] = &["yes", "true", "t", "y"];
const FALSE_TOKENS: &[&str] = &["no", "false", "f", "n"];

/// Strict boolean recognizer. Returns `None` for anything outside the ten
/// accepted (case-insensitive) spellings.
pub fn coerce_bool(token: &str) -> Option<bool> {
    let lower = token.to_ascii_lowercase();
    if TRUE_TOKENS.contains(&lower.as_str()) {
        Some(true)
    } else if FALSE_TOKENS.contains(&lower.as_str()) {
        Some(false)
    } else {
        None
    }
}

/// Coerce a single token without list splitting. Never fails: a token that
/// is not a bool, int or float stays a string.
pub fn coerce_scalar(token: &str) -> Value {
    if let Some(b) = coerce_bool(token) {
        return Value::Bool(b);
    }
    let trimmed = token.trim();
    if let Ok(i) = trimmed.parse::<i64>() {
        return Value::Int(i);
    }
    if let Ok(f) = trimmed.parse::<f64>() {
        return Value::Float(f);
    }
    Value::Str(token.to_string())
}

/// Generic coercion: comma-containing tokens become lists.
pub fn coerce(raw: &str) -> Value {
    if raw.contains(',') {
        Value::List(split_list(raw).into_iter().map(coerce_scalar).collect())
    } else {
        coerce_scalar(raw)
    }
}

/// Split a comma-separated token, trimming whitespace and dropping empty pieces.
pub fn split_list(raw: &str) -> Vec<&str> {
    raw.split(',').map(str::trim).filter(|piece| !piece.is_empty()).collect()
}

/// Parse a command-line token for a field of the given kind.
///
/// On failure returns the expected type description.
pub fn parse_for_kind(kind: FieldKind, raw: &str) -> Result<Value, String> {
    match kind {
        FieldKind::Scalar(scalar) => parse_scalar(scalar, raw),
        FieldKind::List(element) => split_list(raw)
            .into_iter()
            .map(|piece| match element {
                Some(scalar) => parse_scalar(scalar, piece),
                None => Ok(coerce_scalar(piece)),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Value::List)
            .map_err(|_| kind.to_string()),
    }
}

fn parse_scalar(kind: ScalarKind, raw: &str) -> Result<Value, String> {
    match kind {
        ScalarKind::Bool => {
            coerce_bool(raw).map(Value::Bool).ok_or_else(|| {
                format!("bool (one of {})", [TRUE_TOKENS, FALSE_TOKENS].concat().join(", "))
            })
        }
        ScalarKind::Str => Ok(Value::Str(raw.to_string())),
        ScalarKind::Int | ScalarKind::Float => {
            // Booleans win in generic coercion, but "1"/"0" never parse as one.
            let coerced = match coerce_scalar(raw) {
                Value::Bool(_) => Value::Str(raw.to_string()),
                other => other,
            };
            conform_scalar(kind, coerced).ok_or_else(|| kind.to_string())
        }
    }
}

/// Fit an already-typed value to a field kind.
///
/// Ints widen to floats and a scalar given for a list field becomes a
/// one-element list. On failure returns a short description of the mismatch.
pub fn conform(kind: FieldKind, value: Value) -> Result<Value, String> {
    match kind {
        FieldKind::Scalar(scalar) => {
            let found = describe(&value);
            conform_scalar(scalar, value)
                .ok_or_else(|| format!("expected {scalar}, found {found}"))
        }
        FieldKind::List(element) => {
            let items = match value {
                Value::List(items) => items,
                scalar => vec![scalar],
            };
            items
                .into_iter()
                .map(|item| {
                    if !item.is_scalar() {
                        return Err(format!("expected {kind}, found a nested list"));
                    }
                    match element {
                        Some(scalar) => {
                            let found = describe(&item);
                            conform_scalar(scalar, item).ok_or_else(|| {
                                format!("expected {kind}, found an element of type {found}")
                            })
                        }
                        None => Ok(item),
                    }
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Value::List)
        }
    }
}

fn conform_scalar(kind: ScalarKind, value: Value) -> Option<Value> {
    match (kind, value) {
        (ScalarKind::Bool, v @ Value::Bool(_)) => Some(v),
        (ScalarKind::Int, v @ Value::Int(_)) => Some(v),
        (ScalarKind::Float, v @ Value::Float(_)) => Some(v),
        (ScalarKind::Float, Value::Int(i)) => Some(Value::Float(i as f64)),
        (ScalarKind::Str, v @ Value::Str(_)) => Some(v),
        _ => None,
    }
}

fn describe(value: &Value) -> String {
    match value.scalar_kind() {
        Some(kind) => kind.to_string(),
        None => "list".to_string(),
    }
}
