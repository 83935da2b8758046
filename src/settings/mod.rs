//! The merged settings object and its provenance record

use crate::coerce::conform;
use crate::domain::{FieldKind, Origin, Value};
use crate::error::{HypersError, Result};
use crate::render::{render_report, ReportOptions};
use crate::schema::Field;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value as JsonValue};
use std::fmt;
use std::path::PathBuf;

/// A config file that contributed to the settings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfigSource {
    pub path: PathBuf,
    /// SHA-256 digest of the raw file bytes
    pub digest: String,
    /// Declared fields this file set, in file order.
    pub fields: Vec<String>,
}

/// Where the final values came from.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Provenance {
    /// Config files in the order they were applied.
    pub config_sources: Vec<ConfigSource>,
    /// Fields explicitly passed on the command line.
    pub command_line: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Entry {
    pub(crate) field: Field,
    pub(crate) value: Option<Value>,
    pub(crate) origin: Origin,
}

impl Entry {
    pub(crate) fn new(field: Field) -> Self {
        let (value, origin) = match &field.default {
            Some(default) => (Some(default.clone()), Origin::Default),
            None => (None, Origin::Unset),
        };
        Self { field, value, origin }
    }

    /// Record a value from a later layer.
    pub(crate) fn assign(&mut self, value: Value, origin: Origin) {
        debug_assert!(origin >= self.origin, "{} cannot regress from {} to {origin}", self.field.name, self.origin);
        self.value = Some(value);
        self.origin = origin;
    }
}

/// Settings built from defaults, config files and command-line overrides.
#[derive(Debug, Clone)]
pub struct Settings {
    pub(crate) entries: Vec<Entry>,
    pub(crate) provenance: Provenance,
    pub(crate) positionals: Vec<String>,
    pub(crate) unknown_args: Vec<String>,
    pub(crate) help: String,
}

impl Settings {
    fn entry(&self, name: &str) -> Option<&Entry> {
        self.entries.iter().find(|e| e.field.name == name)
    }

    fn entry_mut(&mut self, name: &str) -> Result<&mut Entry> {
        self.entries
            .iter_mut()
            .find(|e| e.field.name == name)
            .ok_or_else(|| HypersError::UnknownKey { field: name.to_string() })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entry(name).is_some()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entry(name).and_then(|e| e.value.as_ref())
    }

    pub fn origin(&self, name: &str) -> Option<Origin> {
        self.entry(name).map(|e| e.origin)
    }

    pub fn kind(&self, name: &str) -> Option<FieldKind> {
        self.entry(name).map(|e| e.field.kind)
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(Value::as_bool)
    }

    pub fn get_int(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(Value::as_int)
    }

    pub fn get_float(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(Value::as_float)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    pub fn get_list(&self, name: &str) -> Option<&[Value]> {
        self.get(name).and_then(Value::as_list)
    }

    /// Overwrite a field after construction. The value must fit the field's
    /// kind; the recorded origin does not change.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<()> {
        let entry = self.entry_mut(name)?;
        let kind = entry.field.kind;
        let value = value.into();
        let token = value.to_raw();
        let value = conform(kind, value).map_err(|_| HypersError::TypeCoercion {
            field: name.to_string(),
            token,
            expected: kind.to_string(),
        })?;
        entry.value = Some(value);
        Ok(())
    }

    /// Apply every key of a flat JSON object through `set`.
    pub fn update(&mut self, values: &Map<String, JsonValue>) -> Result<()> {
        for (name, json) in values {
            let value = json_to_value(json).ok_or_else(|| HypersError::TypeCoercion {
                field: name.clone(),
                token: json.to_string(),
                expected: "a scalar or a list of scalars".to_string(),
            })?;
            self.set(name, value)?;
        }
        Ok(())
    }

    /// Fields in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&Value>, Origin)> {
        self.entries.iter().map(|e| (e.field.name.as_str(), e.value.as_ref(), e.origin))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.field.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Flat JSON object of the current values, e.g. for experiment trackers.
    pub fn to_json(&self) -> JsonValue {
        let map = self
            .entries
            .iter()
            .filter_map(|e| {
                let value = e.value.as_ref()?;
                Some((e.field.name.clone(), serde_json::to_value(value).ok()?))
            })
            .collect::<Map<_, _>>();
        JsonValue::Object(map)
    }

    /// Deserialize the current values into a caller-defined struct.
    pub fn extract<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_value(self.to_json())?)
    }

    pub fn provenance(&self) -> &Provenance {
        &self.provenance
    }

    /// Provenance as JSON: config files with their digests, then command-line fields.
    pub fn provenance_json(&self) -> Result<JsonValue> {
        Ok(serde_json::to_value(&self.provenance)?)
    }

    /// Positional arguments left over after config files were picked out.
    pub fn positionals(&self) -> &[String] {
        &self.positionals
    }

    pub fn unknown_args(&self) -> &[String] {
        &self.unknown_args
    }

    /// Help text of the generated command-line surface.
    pub fn help(&self) -> &str {
        &self.help
    }

    /// Provenance report, coloured when the terminal supports it.
    pub fn report(&self) -> String {
        render_report(self, &ReportOptions::detect())
    }
}

impl fmt::Display for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.report())
    }
}

fn json_to_value(json: &JsonValue) -> Option<Value> {
    match json {
        JsonValue::Bool(b) => Some(Value::Bool(*b)),
        JsonValue::Number(n) => n.as_i64().map(Value::Int).or_else(|| n.as_f64().map(Value::Float)),
        JsonValue::String(s) => Some(Value::Str(s.clone())),
        JsonValue::Array(items) => items
            .iter()
            .map(|item| match item {
                JsonValue::Array(_) => None,
                scalar => json_to_value(scalar),
            })
            .collect::<Option<Vec<_>>>()
            .map(Value::List),
        JsonValue::Null | JsonValue::Object(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Schema;
    use serde::Deserialize;
    use serde_json::json;

    fn settings() -> Settings {
        let fields = Schema::new()
            .field("lr", 0.001)
            .field("epochs", 10)
            .field("cuda", false)
            .field("tags", vec!["example"])
            .resolve()
            .expect("schema");
        Settings {
            entries: fields.into_iter().map(Entry::new).collect(),
            provenance: Provenance::default(),
            positionals: Vec::new(),
            unknown_args: Vec::new(),
            help: String::new(),
        }
    }

    #[test]
    fn typed_getters() {
        let s = settings();
        assert_eq!(s.get_float("lr"), Some(0.001));
        assert_eq!(s.get_int("epochs"), Some(10));
        assert_eq!(s.get_bool("cuda"), Some(false));
        assert_eq!(s.get_list("tags"), Some(&[Value::from("example")][..]));
        assert_eq!(s.get_str("epochs"), None);
        assert_eq!(s.get("missing"), None);
    }

    #[test]
    fn set_checks_kind_and_keeps_origin() {
        let mut s = settings();
        s.set("epochs", 30).expect("set");
        assert_eq!(s.get_int("epochs"), Some(30));
        assert_eq!(s.origin("epochs"), Some(Origin::Default));

        assert!(matches!(s.set("epochs", "thirty"), Err(HypersError::TypeCoercion { .. })));
        assert!(matches!(s.set("missing", 1), Err(HypersError::UnknownKey { .. })));
    }

    #[test]
    fn update_from_json_object() {
        let mut s = settings();
        let values = json!({"lr": 0.1, "tags": ["a", "b"]});
        s.update(values.as_object().expect("object")).expect("update");
        assert_eq!(s.get_float("lr"), Some(0.1));
        assert_eq!(s.get("tags"), Some(&Value::from(vec!["a", "b"])));
    }

    #[test]
    fn to_json_is_flat() {
        let s = settings();
        assert_eq!(
            s.to_json(),
            json!({"lr": 0.001, "epochs": 10, "cuda": false, "tags": ["example"]})
        );
    }

    #[test]
    fn extract_into_struct() {
        #[derive(Deserialize)]
        struct Args {
            lr: f64,
            epochs: u32,
            tags: Vec<String>,
        }

        let args: Args = settings().extract().expect("extract");
        assert_eq!(args.lr, 0.001);
        assert_eq!(args.epochs, 10);
        assert_eq!(args.tags, vec!["example"]);
    }

    #[test]
    fn provenance_serializes_digests() {
        let mut s = settings();
        s.provenance = Provenance {
            config_sources: vec![ConfigSource {
                path: PathBuf::from("params.toml"),
                digest: "ab".repeat(32),
                fields: vec!["lr".to_string()],
            }],
            command_line: vec!["epochs".to_string()],
        };

        assert_eq!(
            s.provenance_json().expect("json"),
            json!({
                "config_sources": [{"path": "params.toml", "digest": "ab".repeat(32), "fields": ["lr"]}],
                "command_line": ["epochs"],
            })
        );
    }

    #[test]
    fn iteration_follows_declaration_order() {
        let names: Vec<_> = settings().names().map(str::to_string).collect();
        assert_eq!(names, vec!["lr", "epochs", "cuda", "tags"]);
    }
}
