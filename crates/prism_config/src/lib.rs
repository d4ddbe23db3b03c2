//! Parsing and validation of `prism.toml` export configuration files.
//!
//! This crate reads the configuration file and produces a strongly-typed
//! [`ExportConfig`] describing where caches live, which component types act
//! as markers, what the stripper keeps, and how geometry is exported.

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod types;

pub use error::ConfigError;
pub use loader::{load_config, load_config_from_str, CONFIG_FILE};
pub use types::*;
