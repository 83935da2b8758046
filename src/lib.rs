//! hypers: hyperparameter loading for experiment scripts
//!
//! Settings are declared once as a [`Schema`] of named defaults. Loading
//! merges three layers in order (declared defaults, config files named on the
//! command line, then `--name=value` overrides) and remembers which layer set
//! each field, so the final values can be printed with their provenance.
//!
//! ```no_run
//! use hypers::{Loader, Schema};
//!
//! let schema = Schema::new()
//!     .field("lr", 0.001)
//!     .field("epochs", 10)
//!     .field("tags", vec!["example"]);
//!
//! let args = Loader::new(&schema).load()?;
//! print!("{args}");
//! let epochs = args.get_int("epochs").unwrap_or_default();
//! # let _ = epochs;
//! # Ok::<(), hypers::HypersError>(())
//! ```

pub mod args;
pub mod coerce;
pub mod config;
pub mod domain;
pub mod error;
pub mod render;
pub mod schema;
pub mod settings;

pub use args::{ArgSurface, ParsedArgs};
pub use coerce::{coerce, coerce_bool};
pub use config::{read_config, Loader};
pub use domain::{FieldKind, Origin, ScalarKind, Value};
pub use error::{HypersError, Result};
pub use render::{render_report, ReportOptions};
pub use schema::{Field, FieldDecl, Schema};
pub use settings::{ConfigSource, Provenance, Settings};
