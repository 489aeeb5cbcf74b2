//! Configuration loading from files and environment.

use crate::types::{NetworkMode, RelayConfig, RelayConfigSchema};
use crate::ConfigError;
use relay_types::ConfigSchema;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

const ENV_PREFIX: &str = "RELAYER_";

/// Configuration loader with environment variable substitution
pub struct ConfigLoader {
	file_path: Option<String>,
	/// Replaces the process environment when set.
	vars: Option<HashMap<String, String>>,
}

impl Default for ConfigLoader {
	fn default() -> Self {
		Self::new()
	}
}

impl ConfigLoader {
	pub fn new() -> Self {
		Self {
			file_path: None,
			vars: None,
		}
	}

	pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
		self.file_path = Some(path.as_ref().to_string_lossy().to_string());
		self
	}

	/// Reads variables from `vars` instead of the process environment.
	pub fn with_vars(mut self, vars: HashMap<String, String>) -> Self {
		self.vars = Some(vars);
		self
	}

	/// Loads the file if one was given, otherwise starts from defaults, then
	/// applies environment overrides and validates the result.
	pub async fn load(&self) -> Result<RelayConfig, ConfigError> {
		let mut config = match &self.file_path {
			Some(file_path) => self.load_from_file(file_path).await?,
			None => RelayConfig::default(),
		};

		self.apply_env_overrides(&mut config)?;
		self.validate_config(&config)?;

		Ok(config)
	}

	async fn load_from_file(&self, file_path: &str) -> Result<RelayConfig, ConfigError> {
		if !Path::new(file_path).exists() {
			return Err(ConfigError::FileNotFound(file_path.to_string()));
		}
		info!("Loading configuration from {}", file_path);
		let content = tokio::fs::read_to_string(file_path).await?;
		self.parse(&content)
	}

	/// Parses TOML content after substitution and schema validation.
	pub fn parse(&self, content: &str) -> Result<RelayConfig, ConfigError> {
		let substituted = self.substitute_env_vars(content)?;

		let raw: toml::Value =
			toml::from_str(&substituted).map_err(|e| ConfigError::ParseError(e.to_string()))?;
		RelayConfigSchema.validate(&raw)?;

		toml::from_str(&substituted).map_err(|e| ConfigError::ParseError(e.to_string()))
	}

	fn var(&self, name: &str) -> Option<String> {
		match &self.vars {
			Some(vars) => vars.get(name).cloned(),
			None => std::env::var(name).ok(),
		}
	}

	fn prefixed(&self, name: &str) -> Option<String> {
		self.var(&format!("{}{}", ENV_PREFIX, name))
			.filter(|value| !value.trim().is_empty())
	}

	/// Replaces `${VAR_NAME}` patterns. Comment lines are left untouched.
	fn substitute_env_vars(&self, content: &str) -> Result<String, ConfigError> {
		let re = regex::Regex::new(r"\$\{([^}]+)\}")
			.map_err(|e| ConfigError::ParseError(e.to_string()))?;

		let mut lines = Vec::new();
		for line in content.lines() {
			if line.trim_start().starts_with('#') {
				lines.push(line.to_string());
				continue;
			}

			let mut result = line.to_string();
			for cap in re.captures_iter(line) {
				let full_match = &cap[0];
				let var_name = &cap[1];

				let value = self
					.var(var_name)
					.ok_or_else(|| ConfigError::EnvVarNotFound(var_name.to_string()))?;

				result = result.replace(full_match, &value);
			}
			lines.push(result);
		}

		Ok(lines.join("\n"))
	}

	fn apply_env_overrides(&self, config: &mut RelayConfig) -> Result<(), ConfigError> {
		if let Some(key) = self.prefixed("PRIVATE_KEY") {
			debug!("Overriding operator key from environment");
			config.operator.private_key = Some(key);
		}

		if let Some(url) = self.prefixed("RPC_URL") {
			debug!("Overriding RPC URL from environment");
			config.network.rpc_url = Some(url);
		}

		if let Some(address) = self.prefixed("FORWARDER_ADDRESS") {
			debug!("Overriding forwarder address from environment");
			config.network.forwarder_address = Some(address);
		}

		if let Some(chain_id) = self.prefixed("CHAIN_ID") {
			config.network.chain_id = Some(chain_id.trim().parse().map_err(|e| {
				ConfigError::ValidationError(format!("Invalid chain id: {}", e))
			})?);
		}

		if let Some(mode) = self.prefixed("MODE") {
			config.network.mode = match mode.trim() {
				"rpc" => NetworkMode::Rpc,
				"local" => NetworkMode::Local,
				other => {
					return Err(ConfigError::ValidationError(format!(
						"Invalid network mode '{}'",
						other
					)))
				}
			};
		}

		if let Some(host) = self.prefixed("HOST") {
			config.service.host = host;
		}

		if let Some(port) = self.prefixed("PORT") {
			config.service.port = port
				.trim()
				.parse()
				.map_err(|e| ConfigError::ValidationError(format!("Invalid HTTP port: {}", e)))?;
		}

		if let Some(log_level) = self.prefixed("LOG_LEVEL") {
			config.service.log_level = log_level;
		}

		Ok(())
	}

	/// Checks cross-field constraints. Missing credentials are not an error
	/// here: the service starts unconfigured and reports it per request.
	fn validate_config(&self, config: &RelayConfig) -> Result<(), ConfigError> {
		if config.service.port == 0 {
			return Err(ConfigError::ValidationError(
				"HTTP port must be non-zero".to_string(),
			));
		}

		if let Some(key) = &config.operator.private_key {
			if !key.trim().starts_with("0x") {
				return Err(ConfigError::ValidationError(
					"Private key must start with 0x".to_string(),
				));
			}
		}

		if !matches!(
			config.local.reimbursement_policy.as_str(),
			"best_effort" | "strict"
		) {
			return Err(ConfigError::ValidationError(format!(
				"Unknown reimbursement policy '{}'",
				config.local.reimbursement_policy
			)));
		}

		Ok(())
	}
}
