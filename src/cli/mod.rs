//! Command-line entry point for the example training script
//!
//! The argument surface is generated from the schema below, so every field can
//! be overridden with `--<name>=<value>` and config files are passed as
//! positionals.

use anyhow::Result;
use hypers::{FieldDecl, FieldKind, HypersError, Loader, Schema};
use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Hyperparameters and paths of the example training script.
pub fn example_schema() -> Schema {
    Schema::new()
        // paths
        .declare(FieldDecl::new("home_dir").default_value(".").help("Base directory for relative paths"))
        .field("output_dir", ".")
        .field("artifact_dir", "./artifacts/")
        .field("tags", vec!["example"])
        // relative to home_dir
        .field("data_dir", "/data")
        .field("some_file", "/assets/example.csv")
        // hyper params
        .declare(FieldDecl::new("lr").default_value(0.001).help("Learning rate"))
        .field("loss", "adam")
        // training settings
        .field("epochs", 10)
        .field("seed", 0)
        .declare(FieldDecl::new("cuda").default_value(false).help("Train on the GPU"))
        .field("layers", vec![1, 2, 3])
        // filled in by the training loop
        .declare(FieldDecl::new("best_loss").kind(FieldKind::FLOAT).internal())
}

pub fn run() -> Result<()> {
    // The argument vector belongs to the schema, so logging is configured
    // through RUST_LOG only.
    let filter = EnvFilter::builder().with_default_directive(Level::WARN.into()).from_env_lossy();
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init();

    let schema = example_schema();
    let settings = match Loader::new(&schema).load() {
        Ok(settings) => settings,
        // --help and malformed flags: let clap print and pick the exit code.
        Err(HypersError::Cli(e)) => e.exit(),
        Err(e) => return Err(e.into()),
    };

    print!("{}", settings.report());
    Ok(())
}
