//! Parsing and validation of `sheaf.toml` bundle configuration files.
//!
//! This crate reads the configuration file and produces a strongly-typed
//! [`SheafConfig`]: the site layout, combine switches, block list and the
//! ordered list of bundle definitions.

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod types;

pub use error::ConfigError;
pub use loader::{load_config, load_config_file, load_config_from_str, CONFIG_FILE};
pub use types::*;
