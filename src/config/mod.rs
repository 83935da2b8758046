//! Configuration loading and merging
//!
//! Handles loading from config files and command-line arguments with proper
//! precedence (CLI > File > Defaults).

pub mod loader;
pub mod merge;
mod python;

pub use loader::{is_config_path, load_document, read_config, ConfigDocument, DEFAULT_CONFIG_EXTENSIONS};
pub use merge::Loader;
pub use python::eval_python_config;
