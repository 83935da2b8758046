//! Command-line argument surface generated from a schema
//!
//! Every declared field gets a `--<name>` flag. The raw argument vector is
//! first split into tokens that belong to declared flags, positionals (which
//! may name config files), unknown flags and reserved control tokens. Only the
//! declared-flag tokens are handed to clap, so unknown flags never fail the
//! parse and long flags are never matched by prefix.

use crate::coerce::parse_for_kind;
use crate::domain::{FieldKind, Value};
use crate::error::{HypersError, Result};
use crate::schema::Field;
use clap::{Arg, ArgAction, Command};

/// Reserved control flag (kernel connection file passed by notebook hosts).
pub const RESERVED_FLAG: &str = "--f";

/// Whether a token is the reserved control flag, alone or with `=value`.
pub fn is_reserved(token: &str) -> bool {
    token == RESERVED_FLAG || token.starts_with("--f=")
}

/// Outcome of parsing an argument vector against the surface.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedArgs {
    /// Explicitly passed fields with their coerced values, in first-seen order.
    pub overrides: Vec<(String, Value)>,
    /// Non-flag tokens, in order.
    pub positionals: Vec<String>,
    /// Flags that match no declared field.
    pub unknown: Vec<String>,
    /// Reserved control tokens, filtered out of override extraction.
    pub reserved: Vec<String>,
}

impl ParsedArgs {
    pub fn override_names(&self) -> impl Iterator<Item = &str> {
        self.overrides.iter().map(|(name, _)| name.as_str())
    }
}

pub struct ArgSurface {
    command: Command,
    fields: Vec<(String, FieldKind)>,
}

impl ArgSurface {
    pub fn build(bin_name: &str, fields: &[Field]) -> Self {
        let mut command = Command::new(bin_name.to_string())
            .no_binary_name(false)
            .args_override_self(true)
            .infer_long_args(false)
            .disable_version_flag(true)
            .about("Positional arguments ending in a config extension are read as config files.");

        let exposed: Vec<&Field> = fields.iter().filter(|f| !f.internal).collect();
        for field in &exposed {
            command = command.arg(field_arg(field));
        }

        Self {
            command,
            fields: exposed.iter().map(|f| (f.name.clone(), f.kind)).collect(),
        }
    }

    pub fn render_help(&self) -> String {
        self.command.clone().render_long_help().to_string()
    }

    fn kind_of(&self, name: &str) -> Option<FieldKind> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, kind)| *kind)
    }

    /// Parse a full argument vector; the first element is the program name.
    pub fn parse<I, T>(&self, args: I) -> Result<ParsedArgs>
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let mut raw = args.into_iter().map(Into::into);
        let bin = raw.next().unwrap_or_else(|| self.command.get_name().to_string());
        let tokens: Vec<String> = raw.collect();

        let mut parsed = ParsedArgs::default();
        let mut known = vec![bin];
        let mut explicit: Vec<String> = Vec::new();

        let mut i = 0;
        while i < tokens.len() {
            let token = &tokens[i];
            i += 1;

            if token == "--" {
                parsed.positionals.extend(tokens[i..].iter().cloned());
                break;
            }
            if is_reserved(token) {
                parsed.reserved.push(token.clone());
                continue;
            }
            if token == "-h" || token == "--help" {
                known.push(token.clone());
                continue;
            }

            let Some(body) = token.strip_prefix("--") else {
                if token.starts_with('-') && token.len() > 1 && token.parse::<f64>().is_err() {
                    parsed.unknown.push(token.clone());
                } else {
                    parsed.positionals.push(token.clone());
                }
                continue;
            };

            let (name, inline) = match body.split_once('=') {
                Some((name, value)) => (name, Some(value)),
                None => (body, None),
            };
            let Some(kind) = self.kind_of(name) else {
                parsed.unknown.push(token.clone());
                continue;
            };

            if !explicit.iter().any(|n| n == name) {
                explicit.push(name.to_string());
            }

            // Normalise to `--name=value` so values starting with `-` reach clap intact.
            match inline {
                Some(_) => known.push(token.clone()),
                None if kind.is_bool() => match tokens.get(i) {
                    Some(next) if crate::coerce::coerce_bool(next).is_some() => {
                        known.push(format!("--{name}={next}"));
                        i += 1;
                    }
                    _ => known.push(format!("--{name}=true")),
                },
                None => match tokens.get(i) {
                    Some(next) => {
                        known.push(format!("--{name}={next}"));
                        i += 1;
                    }
                    None => known.push(token.clone()),
                },
            }
        }

        let matches = self.command.clone().try_get_matches_from(known)?;

        for name in explicit {
            let Some(raw) = matches.get_one::<String>(&name) else {
                continue;
            };
            let kind = self.kind_of(&name).unwrap_or(FieldKind::STR);
            let value = parse_for_kind(kind, raw).map_err(|expected| HypersError::TypeCoercion {
                field: name.clone(),
                token: raw.clone(),
                expected,
            })?;
            parsed.overrides.push((name, value));
        }

        if !parsed.unknown.is_empty() {
            tracing::debug!("Ignoring unknown arguments: {}", parsed.unknown.join(" "));
        }

        Ok(parsed)
    }
}

fn field_arg(field: &Field) -> Arg {
    let default = field.default.as_ref().map_or_else(|| "required".to_string(), |d| format!("default: {d}"));
    let help = match &field.help {
        Some(help) => format!("{help} [{}, {default}]", field.kind),
        None => format!("[{}, {default}]", field.kind),
    };

    Arg::new(field.name.clone())
        .long(field.name.clone())
        .value_name(field.kind.value_name())
        .num_args(1)
        .allow_hyphen_values(true)
        .action(ArgAction::Set)
        .help(help)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ScalarKind;
    use crate::schema::{FieldDecl, Schema};

    fn surface() -> ArgSurface {
        let fields = Schema::new()
            .field("lr", 0.001)
            .field("lr_decay", 0.5)
            .field("epochs", 10)
            .field("cuda", false)
            .field("loss", "adam")
            .field("tags", vec!["example"])
            .resolve()
            .expect("schema");
        ArgSurface::build("train", &fields)
    }

    fn parse(args: &[&str]) -> Result<ParsedArgs> {
        surface().parse(std::iter::once("train").chain(args.iter().copied()))
    }

    #[test]
    fn parses_equals_and_separate_values() {
        let parsed = parse(&["--epochs=20", "--loss", "sgd"]).expect("parse");
        assert_eq!(
            parsed.overrides,
            vec![("epochs".to_string(), Value::Int(20)), ("loss".to_string(), Value::from("sgd"))]
        );
    }

    #[test]
    fn list_fields_split_on_commas() {
        let parsed = parse(&["--tags=cat,dog"]).expect("parse");
        assert_eq!(parsed.overrides, vec![("tags".to_string(), Value::from(vec!["cat", "dog"]))]);
    }

    #[test]
    fn override_equal_to_default_is_still_explicit() {
        let parsed = parse(&["--epochs=10"]).expect("parse");
        assert_eq!(parsed.override_names().collect::<Vec<_>>(), vec!["epochs"]);
    }

    #[test]
    fn bool_fields_are_strict() {
        let err = parse(&["--cuda=maybe"]).unwrap_err();
        match err {
            HypersError::TypeCoercion { field, token, .. } => {
                assert_eq!(field, "cuda");
                assert_eq!(token, "maybe");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn bare_bool_flag_means_true() {
        let parsed = parse(&["--cuda", "params.toml"]).expect("parse");
        assert_eq!(parsed.overrides, vec![("cuda".to_string(), Value::Bool(true))]);
        assert_eq!(parsed.positionals, vec!["params.toml"]);

        let parsed = parse(&["--cuda", "no"]).expect("parse");
        assert_eq!(parsed.overrides, vec![("cuda".to_string(), Value::Bool(false))]);
    }

    #[test]
    fn negative_numbers_are_values() {
        let parsed = parse(&["--lr", "-0.5"]).expect("parse");
        assert_eq!(parsed.overrides, vec![("lr".to_string(), Value::Float(-0.5))]);
    }

    #[test]
    fn last_occurrence_wins() {
        let parsed = parse(&["--epochs=1", "--epochs=2"]).expect("parse");
        assert_eq!(parsed.overrides, vec![("epochs".to_string(), Value::Int(2))]);
    }

    #[test]
    fn unknown_flags_are_tolerated() {
        let parsed = parse(&["--use_dropout=true", "-x", "--epochs=3"]).expect("parse");
        assert_eq!(parsed.unknown, vec!["--use_dropout=true", "-x"]);
        assert_eq!(parsed.overrides, vec![("epochs".to_string(), Value::Int(3))]);
    }

    #[test]
    fn prefixes_are_not_abbreviations() {
        let parsed = parse(&["--lr_d=0.1", "--epo=3"]).expect("parse");
        assert!(parsed.overrides.is_empty());
        assert_eq!(parsed.unknown.len(), 2);
    }

    #[test]
    fn similar_names_do_not_collide() {
        let parsed = parse(&["--lr_decay=0.9"]).expect("parse");
        assert_eq!(parsed.overrides, vec![("lr_decay".to_string(), Value::Float(0.9))]);
    }

    #[test]
    fn reserved_control_tokens_are_filtered() {
        let parsed = parse(&["--f=/run/kernel-1.json", "--f"]).expect("parse");
        assert!(parsed.overrides.is_empty());
        assert_eq!(parsed.reserved, vec!["--f=/run/kernel-1.json", "--f"]);
    }

    #[test]
    fn double_dash_ends_flag_parsing() {
        let parsed = parse(&["--", "--epochs=3", "a.toml"]).expect("parse");
        assert!(parsed.overrides.is_empty());
        assert_eq!(parsed.positionals, vec!["--epochs=3", "a.toml"]);
    }

    #[test]
    fn missing_value_is_a_cli_error() {
        assert!(matches!(parse(&["--epochs"]), Err(HypersError::Cli(_))));
    }

    #[test]
    fn help_lists_every_field() {
        let help = surface().render_help();
        assert!(help.contains("--lr_decay"));
        assert!(help.contains("--tags"));
        assert!(help.contains("default: adam"));
    }

    #[test]
    fn help_flag_surfaces_as_display_help() {
        match parse(&["--help"]) {
            Err(HypersError::Cli(e)) => assert_eq!(e.kind(), clap::error::ErrorKind::DisplayHelp),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn internal_fields_have_no_flag() {
        let fields = Schema::new()
            .field("epochs", 10)
            .declare(FieldDecl::new("best_loss").kind(FieldKind::FLOAT).internal())
            .resolve()
            .expect("schema");
        let surface = ArgSurface::build("train", &fields);

        assert!(!surface.render_help().contains("best_loss"));
        let parsed = surface.parse(["train", "--best_loss=0.3", "--epochs=2"]).expect("parse");
        assert_eq!(parsed.unknown, vec!["--best_loss=0.3"]);
        assert_eq!(parsed.overrides, vec![("epochs".to_string(), Value::Int(2))]);
    }

    #[test]
    fn list_kind_survives_into_surface() {
        let s = surface();
        assert_eq!(s.kind_of("tags"), Some(FieldKind::List(Some(ScalarKind::Str))));
    }
}
