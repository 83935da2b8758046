//! Precedence merge: defaults, then config files, then command line
//!
//! Every field starts at its default. Config files named among the positional
//! arguments are applied in order, later files winning. Fields passed on the
//! command line are applied last. Each assignment records the layer that made
//! it, even when the value equals what was already there.

use crate::args::{ArgSurface, ParsedArgs};
use crate::coerce::conform;
use crate::domain::Origin;
use crate::error::{HypersError, Result};
use crate::schema::Schema;
use crate::settings::{ConfigSource, Entry, Provenance, Settings};

use super::loader::{is_config_path, load_document, DEFAULT_CONFIG_EXTENSIONS};

/// Builds a `Settings` from a schema and an argument vector.
pub struct Loader<'a> {
    schema: &'a Schema,
    strict: bool,
    read_config_files: bool,
    config_extensions: Vec<String>,
}

impl<'a> Loader<'a> {
    pub fn new(schema: &'a Schema) -> Self {
        Self {
            schema,
            strict: false,
            read_config_files: true,
            config_extensions: DEFAULT_CONFIG_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
        }
    }

    /// Fail on config keys that are not declared fields instead of skipping them.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Disable the config-file layer entirely (e.g. inside notebook kernels).
    pub fn read_config_files(mut self, read: bool) -> Self {
        self.read_config_files = read;
        self
    }

    /// Extensions (without the dot) that mark a positional as a config file.
    pub fn config_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config_extensions = extensions
            .into_iter()
            .map(|e| e.into().trim_start_matches('.').to_ascii_lowercase())
            .collect();
        self
    }

    /// Load from the current process arguments.
    pub fn load(self) -> Result<Settings> {
        self.load_from(std::env::args())
    }

    /// Load from an explicit argument vector whose first element is the program name.
    pub fn load_from<I, T>(self, args: I) -> Result<Settings>
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        // Declarations are checked before any argument is looked at.
        let fields = self.schema.resolve()?;

        let mut args = args.into_iter().map(Into::into).peekable();
        let bin_name = args
            .peek()
            .map(|arg0| program_name(arg0))
            .unwrap_or_else(|| env!("CARGO_PKG_NAME").to_string());

        let surface = ArgSurface::build(&bin_name, &fields);
        let ParsedArgs { overrides, positionals, unknown, reserved } = surface.parse(args)?;
        if !reserved.is_empty() {
            tracing::debug!("Filtered reserved arguments: {}", reserved.join(" "));
        }
        if !unknown.is_empty() {
            tracing::warn!("Ignoring unrecognized arguments: {}", unknown.join(" "));
        }

        let mut entries: Vec<Entry> = fields.into_iter().map(Entry::new).collect();
        let mut provenance = Provenance::default();

        let (config_paths, rest): (Vec<String>, Vec<String>) = positionals
            .into_iter()
            .partition(|p| self.read_config_files && is_config_path(p, &self.config_extensions));

        for path in &config_paths {
            let source = self.apply_config_file(path, &mut entries)?;
            provenance.config_sources.push(source);
        }

        for (name, value) in overrides {
            let Some(entry) = entries.iter_mut().find(|e| e.field.name == name) else {
                continue;
            };
            tracing::debug!("{} = {} (command line)", name, value);
            entry.assign(value, Origin::CommandLine);
            provenance.command_line.push(name);
        }

        let missing = entries.iter().find(|e| e.origin == Origin::Unset && !e.field.internal);
        if let Some(unset) = missing {
            return Err(HypersError::MissingValue { field: unset.field.name.clone() });
        }

        tracing::info!(
            "Loaded {} settings ({} config files, {} command-line overrides)",
            entries.len(),
            provenance.config_sources.len(),
            provenance.command_line.len()
        );

        Ok(Settings {
            entries,
            provenance,
            positionals: rest,
            unknown_args: unknown,
            help: surface.render_help(),
        })
    }

    fn apply_config_file(&self, path: &str, entries: &mut [Entry]) -> Result<ConfigSource> {
        let doc = load_document(std::path::Path::new(path))?;
        let mut applied = Vec::new();

        for (name, value) in doc.bindings {
            let Some(entry) = entries.iter_mut().find(|e| e.field.name == name) else {
                if self.strict {
                    return Err(HypersError::UnknownField { field: name, source_path: doc.path });
                }
                tracing::warn!("{} sets `{}`, which is not a declared field; ignoring", path, name);
                continue;
            };

            let value = conform(entry.field.kind, value).map_err(|reason| {
                HypersError::config_file(&doc.path, format!("`{name}`: {reason}"))
            })?;
            tracing::debug!("{} = {} (from {})", name, value, path);
            entry.assign(value, Origin::Config);
            if !applied.contains(&name) {
                applied.push(name);
            }
        }

        tracing::debug!("Applied {} fields from {} (sha256 {})", applied.len(), path, doc.digest);
        Ok(ConfigSource { path: doc.path, digest: doc.digest, fields: applied })
    }
}

fn program_name(arg0: &str) -> String {
    std::path::Path::new(arg0)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(arg0)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FieldKind, Value};
    use crate::schema::FieldDecl;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn schema() -> Schema {
        Schema::new()
            .field("lr", 0.001)
            .field("epochs", 10)
            .field("tags", vec!["example"])
            .field("cuda", false)
    }

    fn write(tmp: &TempDir, name: &str, content: &str) -> String {
        let path = tmp.path().join(name);
        fs::write(&path, content).expect("write");
        path.to_string_lossy().to_string()
    }

    fn load(schema: &Schema, args: &[&str]) -> Result<Settings> {
        Loader::new(schema).load_from(std::iter::once("train").chain(args.iter().copied()))
    }

    #[test]
    fn defaults_only() {
        let s = load(&schema(), &[]).expect("load");
        for (name, _, origin) in s.iter() {
            assert_eq!(origin, Origin::Default, "{name}");
        }
        assert_eq!(s.get_float("lr"), Some(0.001));
        assert!(s.provenance().config_sources.is_empty());
    }

    #[test]
    fn config_then_command_line_scenario() {
        let tmp = TempDir::new().expect("tmp");
        let config = write(&tmp, "params.py", "lr = 0.01\n");

        let s = load(&schema(), &[config.as_str(), "--epochs=20", "--tags=cat,dog"]).expect("load");

        assert_eq!(s.get("lr"), Some(&Value::Float(0.01)));
        assert_eq!(s.origin("lr"), Some(Origin::Config));
        assert_eq!(s.get("epochs"), Some(&Value::Int(20)));
        assert_eq!(s.origin("epochs"), Some(Origin::CommandLine));
        assert_eq!(s.get("tags"), Some(&Value::from(vec!["cat", "dog"])));
        assert_eq!(s.origin("tags"), Some(Origin::CommandLine));
        assert_eq!(s.origin("cuda"), Some(Origin::Default));
        assert_eq!(s.provenance().command_line, vec!["epochs", "tags"]);
    }

    #[test]
    fn later_config_file_wins() {
        let tmp = TempDir::new().expect("tmp");
        let first = write(&tmp, "a.toml", "lr = 0.1\nepochs = 5\n");
        let second = write(&tmp, "b.yaml", "lr: 0.2\n");

        let s = load(&schema(), &[first.as_str(), second.as_str()]).expect("load");

        assert_eq!(s.get_float("lr"), Some(0.2));
        assert_eq!(s.get_int("epochs"), Some(5));
        let sources = &s.provenance().config_sources;
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0].path, PathBuf::from(&first));
        assert_eq!(sources[1].fields, vec!["lr"]);
    }

    #[test]
    fn command_line_beats_config() {
        let tmp = TempDir::new().expect("tmp");
        let config = write(&tmp, "a.toml", "epochs = 5\n");

        let s = load(&schema(), &["--epochs=7", config.as_str()]).expect("load");

        assert_eq!(s.get_int("epochs"), Some(7));
        assert_eq!(s.origin("epochs"), Some(Origin::CommandLine));
    }

    #[test]
    fn value_equal_to_default_still_records_layer() {
        let tmp = TempDir::new().expect("tmp");
        let config = write(&tmp, "a.toml", "lr = 0.001\n");

        let s = load(&schema(), &[config.as_str(), "--epochs=10"]).expect("load");

        assert_eq!(s.origin("lr"), Some(Origin::Config));
        assert_eq!(s.origin("epochs"), Some(Origin::CommandLine));
    }

    #[test]
    fn undeclared_config_keys_are_skipped_by_default() {
        let tmp = TempDir::new().expect("tmp");
        let config = write(&tmp, "a.toml", "use_dropout = true\nseed = 1\nepochs = 3\n");

        let s = load(&schema(), &[config.as_str()]).expect("load");

        assert!(!s.contains("use_dropout"));
        assert_eq!(s.provenance().config_sources[0].fields, vec!["epochs"]);
    }

    #[test]
    fn undeclared_config_keys_fail_in_strict_mode() {
        let tmp = TempDir::new().expect("tmp");
        let config = write(&tmp, "a.toml", "use_dropout = true\n");

        let err = Loader::new(&schema())
            .strict(true)
            .load_from(["train", config.as_str()])
            .unwrap_err();
        assert!(matches!(err, HypersError::UnknownField { ref field, .. } if field == "use_dropout"));
    }

    #[test]
    fn missing_config_file_names_path() {
        let err = load(&schema(), &["nowhere/params.toml"]).unwrap_err();
        match err {
            HypersError::ConfigFile { path, .. } => assert_eq!(path, PathBuf::from("nowhere/params.toml")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn config_value_of_wrong_type_is_rejected() {
        let tmp = TempDir::new().expect("tmp");
        let config = write(&tmp, "a.toml", "epochs = 'many'\n");

        let err = load(&schema(), &[config.as_str()]).unwrap_err();
        assert!(err.to_string().contains("`epochs`"));
        assert!(err.to_string().contains("a.toml"));
    }

    #[test]
    fn untyped_declaration_fails_before_parsing() {
        let schema = schema().declare(FieldDecl::new("model"));
        // Would be a coercion error if arguments were parsed first.
        let err = load(&schema, &["--cuda=maybe", "missing.toml"]).unwrap_err();
        assert!(matches!(err, HypersError::Declaration { .. }));
    }

    #[test]
    fn strict_bool_on_command_line() {
        let err = load(&schema(), &["--cuda=maybe"]).unwrap_err();
        assert!(matches!(err, HypersError::TypeCoercion { .. }));

        let s = load(&schema(), &["--cuda=Y"]).expect("load");
        assert_eq!(s.get_bool("cuda"), Some(true));
    }

    #[test]
    fn required_field_must_be_supplied() {
        let schema = schema().typed("data_dir", FieldKind::STR);

        let err = load(&schema, &[]).unwrap_err();
        assert!(matches!(err, HypersError::MissingValue { ref field } if field == "data_dir"));

        let s = load(&schema, &["--data_dir=/data"]).expect("load");
        assert_eq!(s.get_str("data_dir"), Some("/data"));
    }

    #[test]
    fn config_layer_can_be_disabled() {
        let s = Loader::new(&schema())
            .read_config_files(false)
            .load_from(["train", "missing.toml"])
            .expect("load");
        assert!(s.provenance().config_sources.is_empty());
        assert_eq!(s.positionals(), ["missing.toml"]);
    }

    #[test]
    fn custom_extensions() {
        let tmp = TempDir::new().expect("tmp");
        let config = write(&tmp, "a.toml", "epochs = 5\n");

        let s = Loader::new(&schema())
            .config_extensions([".py"])
            .load_from(["train", config.as_str()])
            .expect("load");
        assert_eq!(s.get_int("epochs"), Some(10));
        assert_eq!(s.positionals(), [config]);
    }

    #[test]
    fn unknown_and_reserved_arguments_are_kept_aside() {
        let s = load(&schema(), &["--f=/tmp/kernel.json", "--use_dropout=true", "notes.txt"])
            .expect("load");
        assert_eq!(s.unknown_args(), ["--use_dropout=true"]);
        assert_eq!(s.positionals(), ["notes.txt"]);
        assert!(s.provenance().command_line.is_empty());
    }

    #[test]
    fn internal_fields_may_stay_unset() {
        let schema = schema().declare(FieldDecl::new("best_loss").kind(FieldKind::FLOAT).internal());

        let mut s = load(&schema, &["--best_loss=0.2"]).expect("load");
        assert_eq!(s.get("best_loss"), None);
        assert_eq!(s.origin("best_loss"), Some(Origin::Unset));
        assert_eq!(s.unknown_args(), ["--best_loss=0.2"]);
        assert!(!s.help().contains("best_loss"));

        s.set("best_loss", 0.2).expect("set");
        assert_eq!(s.get_float("best_loss"), Some(0.2));
    }

    #[test]
    fn help_text_lists_declared_flags() {
        let s = load(&schema(), &[]).expect("load");
        assert!(s.help().contains("--epochs"));
        assert!(s.help().contains("default: 0.001"));
    }

    #[test]
    fn config_source_keeps_file_order() {
        let tmp = TempDir::new().expect("tmp");
        let config = write(&tmp, "b.toml", "tags = ['x']
epochs = 4
lr = 0.5
");

        let s = load(&schema(), &[config.as_str()]).expect("load");
        let source = &s.provenance().config_sources[0];
        assert_eq!(source.fields, vec!["tags", "epochs", "lr"]);
        assert_eq!(source.digest.len(), 64);
    }
}
