//! Configuration types for the relay service.

use crate::ConfigError;
use alloy::primitives::Address;
use relay_types::{ConfigSchema, Field, FieldType, Schema, ValidationError};
use serde::{Deserialize, Serialize};

/// Complete relay configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RelayConfig {
	/// HTTP listener settings
	#[serde(default)]
	pub service: ServiceConfig,
	/// Where the forwarder lives and how transactions are confirmed
	#[serde(default)]
	pub network: NetworkConfig,
	/// Funded operator identity
	#[serde(default)]
	pub operator: OperatorConfig,
	/// Genesis of the in-process ledger, used when `network.mode = "local"`
	#[serde(default)]
	pub local: LocalLedgerConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceConfig {
	#[serde(default = "default_host")]
	pub host: String,
	#[serde(default = "default_port")]
	pub port: u16,
	#[serde(default = "default_log_level")]
	pub log_level: String,
}

impl Default for ServiceConfig {
	fn default() -> Self {
		Self {
			host: default_host(),
			port: default_port(),
			log_level: default_log_level(),
		}
	}
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkMode {
	/// Submit through a JSON-RPC endpoint to deployed contracts.
	#[default]
	Rpc,
	/// Run the contracts in process.
	Local,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NetworkConfig {
	#[serde(default)]
	pub mode: NetworkMode,
	pub rpc_url: Option<String>,
	pub chain_id: Option<u64>,
	pub forwarder_address: Option<String>,
	/// Blocks to wait on top of the inclusion block
	#[serde(default = "default_confirmations")]
	pub confirmations: u64,
	#[serde(default = "default_confirmation_timeout")]
	pub confirmation_timeout_secs: u64,
	#[serde(default = "default_poll_interval")]
	pub poll_interval_ms: u64,
	/// Gas limit of relay transactions
	#[serde(default = "default_gas_limit")]
	pub gas_limit: u64,
}

impl Default for NetworkConfig {
	fn default() -> Self {
		Self {
			mode: NetworkMode::default(),
			rpc_url: None,
			chain_id: None,
			forwarder_address: None,
			confirmations: default_confirmations(),
			confirmation_timeout_secs: default_confirmation_timeout(),
			poll_interval_ms: default_poll_interval(),
			gas_limit: default_gas_limit(),
		}
	}
}

#[derive(Clone, Default, Deserialize, Serialize)]
pub struct OperatorConfig {
	pub private_key: Option<String>,
}

impl std::fmt::Debug for OperatorConfig {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("OperatorConfig")
			.field("private_key", &self.private_key.as_ref().map(|_| "<redacted>"))
			.finish()
	}
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LocalLedgerConfig {
	#[serde(default = "default_local_chain_id")]
	pub chain_id: u64,
	/// Projected-gas cap of the authorizer
	#[serde(default = "default_max_gas")]
	pub max_gas: u64,
	/// `best_effort` or `strict`
	#[serde(default = "default_reimbursement_policy")]
	pub reimbursement_policy: String,
	/// Initial authorizer funding pool, in whole ether
	#[serde(default = "default_funding_eth")]
	pub funding_eth: u64,
	/// Initial operator balance, in whole ether
	#[serde(default = "default_operator_balance_eth")]
	pub operator_balance_eth: u64,
}

impl Default for LocalLedgerConfig {
	fn default() -> Self {
		Self {
			chain_id: default_local_chain_id(),
			max_gas: default_max_gas(),
			reimbursement_policy: default_reimbursement_policy(),
			funding_eth: default_funding_eth(),
			operator_balance_eth: default_operator_balance_eth(),
		}
	}
}

fn default_host() -> String {
	"0.0.0.0".to_string()
}

fn default_port() -> u16 {
	3000
}

fn default_log_level() -> String {
	"info".to_string()
}

fn default_confirmations() -> u64 {
	1
}

fn default_confirmation_timeout() -> u64 {
	120
}

fn default_poll_interval() -> u64 {
	1_000
}

fn default_gas_limit() -> u64 {
	1_000_000
}

fn default_local_chain_id() -> u64 {
	31337
}

fn default_max_gas() -> u64 {
	500_000
}

fn default_reimbursement_policy() -> String {
	"best_effort".to_string()
}

fn default_funding_eth() -> u64 {
	10
}

fn default_operator_balance_eth() -> u64 {
	100
}

/// Everything needed to submit relays to a deployed forwarder.
#[derive(Clone)]
pub struct OperatorCredentials {
	pub private_key: String,
	pub rpc_url: String,
	pub chain_id: u64,
	pub forwarder: Address,
}

impl std::fmt::Debug for OperatorCredentials {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("OperatorCredentials")
			.field("rpc_url", &self.rpc_url)
			.field("chain_id", &self.chain_id)
			.field("forwarder", &self.forwarder)
			.finish_non_exhaustive()
	}
}

impl RelayConfig {
	/// Operator key, present in every mode.
	pub fn operator_key(&self) -> Result<&str, ConfigError> {
		self.operator
			.private_key
			.as_deref()
			.filter(|key| !key.trim().is_empty())
			.ok_or_else(|| ConfigError::Missing("RELAYER_PRIVATE_KEY".to_string()))
	}

	/// Credentials for JSON-RPC mode. Each missing value is reported by the
	/// environment variable that provides it.
	pub fn operator_credentials(&self) -> Result<OperatorCredentials, ConfigError> {
		let private_key = self.operator_key()?.to_string();
		let rpc_url = self
			.network
			.rpc_url
			.clone()
			.filter(|url| !url.trim().is_empty())
			.ok_or_else(|| ConfigError::Missing("RELAYER_RPC_URL".to_string()))?;
		let forwarder = self
			.network
			.forwarder_address
			.as_deref()
			.filter(|address| !address.trim().is_empty())
			.ok_or_else(|| ConfigError::Missing("RELAYER_FORWARDER_ADDRESS".to_string()))?
			.parse::<Address>()
			.map_err(|e| ConfigError::ValidationError(format!("Invalid forwarder address: {}", e)))?;
		let chain_id = self
			.network
			.chain_id
			.ok_or_else(|| ConfigError::Missing("RELAYER_CHAIN_ID".to_string()))?;

		Ok(OperatorCredentials {
			private_key,
			rpc_url,
			chain_id,
			forwarder,
		})
	}
}

/// Schema of the raw configuration file.
pub struct RelayConfigSchema;

impl ConfigSchema for RelayConfigSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let service = Schema::new(vec![
			Field::optional("host", FieldType::String),
			Field::optional(
				"port",
				FieldType::Integer {
					min: Some(1),
					max: Some(65535),
				},
			),
			Field::optional("log_level", FieldType::String),
		]);

		let network = Schema::new(vec![
			Field::optional("mode", FieldType::OneOf(&["rpc", "local"])),
			Field::optional("rpc_url", FieldType::String).with_validator(|value| {
				match value.as_str() {
					Some(url) if url.starts_with("http://") || url.starts_with("https://") => Ok(()),
					_ => Err("RPC URL must start with http:// or https://".to_string()),
				}
			}),
			Field::optional(
				"chain_id",
				FieldType::Integer {
					min: Some(1),
					max: None,
				},
			),
			Field::optional("forwarder_address", FieldType::Address),
			Field::optional(
				"confirmations",
				FieldType::Integer {
					min: Some(0),
					max: Some(64),
				},
			),
			Field::optional(
				"confirmation_timeout_secs",
				FieldType::Integer {
					min: Some(1),
					max: Some(3600),
				},
			),
			Field::optional(
				"poll_interval_ms",
				FieldType::Integer {
					min: Some(10),
					max: None,
				},
			),
			Field::optional(
				"gas_limit",
				FieldType::Integer {
					min: Some(21_000),
					max: None,
				},
			),
		]);

		let operator = Schema::new(vec![Field::optional(
			"private_key",
			FieldType::Hex { len: Some(32) },
		)]);

		let local = Schema::new(vec![
			Field::optional(
				"chain_id",
				FieldType::Integer {
					min: Some(1),
					max: None,
				},
			),
			Field::optional(
				"max_gas",
				FieldType::Integer {
					min: Some(0),
					max: None,
				},
			),
			Field::optional(
				"reimbursement_policy",
				FieldType::OneOf(&["best_effort", "strict"]),
			),
			Field::optional(
				"funding_eth",
				FieldType::Integer {
					min: Some(0),
					max: None,
				},
			),
			Field::optional(
				"operator_balance_eth",
				FieldType::Integer {
					min: Some(0),
					max: None,
				},
			),
		]);

		Schema::new(vec![
			Field::optional("service", FieldType::Table(service)),
			Field::optional("network", FieldType::Table(network)),
			Field::optional("operator", FieldType::Table(operator)),
			Field::optional("local", FieldType::Table(local)),
		])
		.validate(config)
	}
}
