//! Core data types shared across the crate

use serde::Serialize;
use std::fmt;

pub mod value;

pub use value::{FieldKind, ScalarKind, Value};

/// Which layer last set a field.
///
/// Variants are ordered by precedence; a field only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    Unset,
    Default,
    Config,
    CommandLine,
}

impl Origin {
    pub fn as_str(self) -> &'static str {
        match self {
            Origin::Unset => "unset",
            Origin::Default => "default",
            Origin::Config => "config",
            Origin::CommandLine => "command_line",
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
