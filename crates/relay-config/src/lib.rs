//! Configuration of the relay service.
//!
//! Values come from an optional TOML file with `${VAR}` substitution and are
//! then overridden by `RELAYER_`-prefixed environment variables.

use thiserror::Error;

pub mod loader;
pub mod types;

pub use loader::ConfigLoader;
pub use types::*;

#[derive(Error, Debug)]
pub enum ConfigError {
	#[error("File not found: {0}")]
	FileNotFound(String),

	#[error("Parse error: {0}")]
	ParseError(String),

	#[error("Validation error: {0}")]
	ValidationError(String),

	#[error("Environment variable not found: {0}")]
	EnvVarNotFound(String),

	#[error("Missing required setting: {0}")]
	Missing(String),

	#[error("IO error: {0}")]
	IoError(#[from] std::io::Error),
}

impl From<relay_types::ValidationError> for ConfigError {
	fn from(error: relay_types::ValidationError) -> Self {
		Self::ValidationError(error.to_string())
	}
}
