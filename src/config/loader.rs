//! Config file loading

use crate::domain::Value;
use crate::error::{HypersError, Result};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

use super::python::eval_python_config;

/// Extensions recognised as config files when no other set is configured.
pub const DEFAULT_CONFIG_EXTENSIONS: &[&str] = &["py", "toml", "yaml", "yml"];

const FLAG_PREFIX: &str = "--";

/// A parsed config file.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigDocument {
    pub path: PathBuf,
    /// Hex SHA-256 of the raw file bytes.
    pub digest: String,
    /// Public top-level bindings in file order.
    pub bindings: Vec<(String, Value)>,
}

/// Read a config file into its public name/value bindings.
pub fn read_config(path: &Path) -> Result<Vec<(String, Value)>> {
    load_document(path).map(|doc| doc.bindings)
}

pub fn load_document(path: &Path) -> Result<ConfigDocument> {
    if path.to_string_lossy().contains(FLAG_PREFIX) {
        return Err(HypersError::config_file(path, "path looks like a command-line flag"));
    }
    if !path.exists() {
        return Err(HypersError::config_file(path, "file does not exist"));
    }
    if !path.is_file() {
        return Err(HypersError::config_file(path, "not a regular file"));
    }

    let bytes = fs::read(path)
        .map_err(|e| HypersError::config_file(path, format!("failed reading file: {e}")))?;
    let digest = format!("{:x}", Sha256::digest(&bytes));
    let content = String::from_utf8(bytes)
        .map_err(|e| HypersError::config_file(path, format!("invalid UTF-8: {e}")))?;

    let ext = extension_of(path).unwrap_or_default();
    let parsed = match ext.as_str() {
        "py" => eval_python_config(&content, &path.to_string_lossy()),
        "toml" => parse_toml_config(&content),
        "yaml" | "yml" => parse_yaml_config(&content),
        other => Err(format!("unsupported config extension '.{other}'")),
    };
    let bindings = parsed.map_err(|reason| HypersError::config_file(path, reason))?;

    let bindings: Vec<_> = bindings.into_iter().filter(|(name, _)| !name.starts_with('_')).collect();
    tracing::debug!("Read {} bindings from {}", bindings.len(), path.display());

    Ok(ConfigDocument { path: path.to_path_buf(), digest, bindings })
}

/// Whether a positional token names a config file by its extension.
pub fn is_config_path(token: &str, extensions: &[String]) -> bool {
    extension_of(Path::new(token))
        .map(|ext| extensions.iter().any(|e| e.eq_ignore_ascii_case(&ext)))
        .unwrap_or(false)
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase)
}

fn parse_toml_config(content: &str) -> std::result::Result<Vec<(String, Value)>, String> {
    let table: toml::Table =
        toml::from_str(content).map_err(|e| format!("invalid TOML syntax: {e}"))?;

    table
        .into_iter()
        .map(|(name, value)| {
            let value = toml_to_value(value).map_err(|reason| format!("`{name}`: {reason}"))?;
            Ok((name, value))
        })
        .collect()
}

fn toml_to_value(value: toml::Value) -> std::result::Result<Value, String> {
    match value {
        toml::Value::String(s) => Ok(Value::Str(s)),
        toml::Value::Integer(i) => Ok(Value::Int(i)),
        toml::Value::Float(f) => Ok(Value::Float(f)),
        toml::Value::Boolean(b) => Ok(Value::Bool(b)),
        toml::Value::Datetime(dt) => Ok(Value::Str(dt.to_string())),
        toml::Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                toml::Value::Array(_) | toml::Value::Table(_) => {
                    Err("lists may only contain scalars".to_string())
                }
                scalar => toml_to_value(scalar),
            })
            .collect::<std::result::Result<Vec<_>, _>>()
            .map(Value::List),
        toml::Value::Table(_) => Err("nested tables are not supported".to_string()),
    }
}

fn parse_yaml_config(content: &str) -> std::result::Result<Vec<(String, Value)>, String> {
    let raw: serde_yaml::Value =
        serde_yaml::from_str(content).map_err(|e| format!("invalid YAML syntax: {e}"))?;

    let mapping = match raw {
        serde_yaml::Value::Mapping(mapping) => mapping,
        // An empty document sets nothing.
        serde_yaml::Value::Null => return Ok(Vec::new()),
        _ => return Err("top level must be a mapping".to_string()),
    };

    mapping
        .into_iter()
        .map(|(key, value)| {
            let serde_yaml::Value::String(name) = key else {
                return Err("keys must be strings".to_string());
            };
            let value = yaml_to_value(value).map_err(|reason| format!("`{name}`: {reason}"))?;
            Ok((name, value))
        })
        .collect()
}

fn yaml_to_value(value: serde_yaml::Value) -> std::result::Result<Value, String> {
    match value {
        serde_yaml::Value::String(s) => Ok(Value::Str(s)),
        serde_yaml::Value::Bool(b) => Ok(Value::Bool(b)),
        serde_yaml::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(Value::Int(i))
            } else if let Some(f) = n.as_f64() {
                Ok(Value::Float(f))
            } else {
                Err(format!("number {n} is out of range"))
            }
        }
        serde_yaml::Value::Sequence(items) => items
            .into_iter()
            .map(|item| match item {
                serde_yaml::Value::Sequence(_) | serde_yaml::Value::Mapping(_) => {
                    Err("lists may only contain scalars".to_string())
                }
                scalar => yaml_to_value(scalar),
            })
            .collect::<std::result::Result<Vec<_>, _>>()
            .map(Value::List),
        serde_yaml::Value::Null => Err("null is not a supported value".to_string()),
        serde_yaml::Value::Mapping(_) => Err("nested mappings are not supported".to_string()),
        serde_yaml::Value::Tagged(_) => Err("tagged values are not supported".to_string()),
    }
}
