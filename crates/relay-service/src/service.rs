//! The relay submission pipeline.
//!
//! A submission is validated, checked against the service clock, simulated
//! against the forwarder and only then sent. Nothing is retried: a client that
//! loses a nonce race refetches the nonce and signs again.

use crate::error::RelayError;
use alloy::primitives::{Address, U256};
use alloy::signers::local::PrivateKeySigner;
use relay_config::{ConfigError, NetworkMode, RelayConfig};
use relay_contracts::{GenesisConfig, Ledger, ReimbursementPolicy};
use relay_delivery::{
	AlloyDelivery, AlloyDeliverySettings, Clock, DeliveryService, LocalDelivery,
};
use relay_types::{
	recover_signer, NonceResponse, RelayRequest, RelaySubmission, RelaySuccess,
	ValidatedSubmission, ValidationError,
};
use std::sync::Arc;
use std::time::Duration;

/// How many consumed forwarder nonces are checked for a submission that
/// leaves out `nonce`.
const NONCE_LOOKBACK: u64 = 16;

pub struct RelayService {
	delivery: Option<DeliveryService>,
	clock: Clock,
}

impl RelayService {
	/// A service without delivery answers every relay with a configuration
	/// error instead of refusing to start.
	pub fn new(delivery: Option<DeliveryService>) -> Self {
		Self {
			delivery,
			clock: Arc::new(system_time),
		}
	}

	pub fn with_clock(mut self, clock: Clock) -> Self {
		self.clock = clock;
		self
	}

	pub fn is_configured(&self) -> bool {
		self.delivery.is_some()
	}

	fn delivery(&self) -> Result<&DeliveryService, RelayError> {
		self.delivery.as_ref().ok_or_else(|| {
			RelayError::Configuration(
				"operator key or forwarder address is not configured".to_string(),
			)
		})
	}

	/// Relays one signed request and waits for its receipt.
	pub async fn submit(&self, submission: &RelaySubmission) -> Result<RelaySuccess, RelayError> {
		let validated = submission.validate()?;

		let now = (self.clock)();
		if validated.deadline < U256::from(now) {
			return Err(RelayError::Expired {
				deadline: validated.deadline.saturating_to(),
				now,
			});
		}

		let delivery = self.delivery()?;
		let nonce = match validated.nonce {
			Some(nonce) => nonce,
			None => signed_nonce(delivery, &validated).await?,
		};

		let request = RelayRequest {
			account: validated.account,
			encoded_call: validated.encoded_call,
			nonce: U256::from(nonce),
			deadline: validated.deadline,
			signature: validated.signature,
		};

		tracing::info!(
			account = %request.account,
			nonce,
			deadline = %request.deadline,
			"Relaying request"
		);

		delivery.simulate(&request).await?;
		let receipt = delivery.deliver(&request).await?;

		Ok(RelaySuccess {
			success: true,
			transaction_hash: receipt.hash.to_string(),
			receipt,
		})
	}

	/// Forwarder nonce of `address`.
	pub async fn nonce(&self, address: &str) -> Result<NonceResponse, RelayError> {
		let account = address.trim().parse::<Address>().map_err(|e| {
			RelayError::Validation(ValidationError::InvalidValue {
				field: "address".to_string(),
				message: e.to_string(),
			})
		})?;
		let nonce = self.delivery()?.forwarder_nonce(account).await?;

		Ok(NonceResponse {
			address: format!("{:#x}", account),
			nonce,
		})
	}
}

/// Finds the forwarder nonce a submission without one was signed with.
///
/// The current nonce is tried first, then up to [`NONCE_LOOKBACK`] consumed
/// ones, so that a replayed envelope is reported as a stale nonce rather than
/// a bad signature. Falls back to the current nonce when none recovers.
async fn signed_nonce(
	delivery: &DeliveryService,
	submission: &ValidatedSubmission,
) -> Result<u64, RelayError> {
	let current = delivery.forwarder_nonce(submission.account).await?;
	let domain = delivery.forwarder_domain();
	let signed_with = |nonce: u64| {
		let digest = RelayRequest::signing_hash(
			submission.account,
			&submission.encoded_call,
			U256::from(nonce),
			submission.deadline,
			&domain,
		);
		recover_signer(digest, &submission.signature)
			.map(|signer| signer == submission.account)
			.unwrap_or(false)
	};

	if signed_with(current) {
		return Ok(current);
	}
	let consumed = (current.saturating_sub(NONCE_LOOKBACK)..current)
		.rev()
		.find(|nonce| signed_with(*nonce));
	if let Some(nonce) = consumed {
		tracing::debug!(
			account = %submission.account,
			nonce,
			current,
			"Submission was signed for a consumed nonce"
		);
	}
	Ok(consumed.unwrap_or(current))
}

fn system_time() -> u64 {
	chrono::Utc::now().timestamp().max(0) as u64
}

fn eth(amount: u64) -> U256 {
	U256::from(amount) * U256::from(10u64).pow(U256::from(18))
}

/// Builds the delivery backend described by `config`.
///
/// Missing operator settings yield `Ok(None)` so the service can still start
/// and report itself unconfigured. Settings that are present but unusable are
/// an error.
pub fn build_delivery(config: &RelayConfig) -> Result<Option<DeliveryService>, RelayError> {
	match config.network.mode {
		NetworkMode::Rpc => build_rpc_delivery(config),
		NetworkMode::Local => build_local_delivery(config),
	}
}

fn build_rpc_delivery(config: &RelayConfig) -> Result<Option<DeliveryService>, RelayError> {
	let credentials = match config.operator_credentials() {
		Ok(credentials) => credentials,
		Err(ConfigError::Missing(setting)) => {
			tracing::warn!(setting = %setting, "Relayer is not configured");
			return Ok(None);
		}
		Err(e) => return Err(RelayError::Configuration(e.to_string())),
	};

	let signer = parse_signer(&credentials.private_key)?;
	let settings = AlloyDeliverySettings {
		gas_limit: config.network.gas_limit,
		confirmation_timeout: Duration::from_secs(config.network.confirmation_timeout_secs),
		poll_interval: Duration::from_millis(config.network.poll_interval_ms),
	};
	let delivery = AlloyDelivery::new(
		&credentials.rpc_url,
		credentials.chain_id,
		signer,
		credentials.forwarder,
		settings,
	)?;

	tracing::info!(
		chain_id = credentials.chain_id,
		forwarder = %credentials.forwarder,
		"Using JSON-RPC delivery"
	);
	Ok(Some(DeliveryService::new(
		Box::new(delivery),
		config.network.confirmations,
	)))
}

fn build_local_delivery(config: &RelayConfig) -> Result<Option<DeliveryService>, RelayError> {
	let key = match config.operator_key() {
		Ok(key) => key,
		Err(e) => {
			tracing::warn!(error = %e, "Relayer is not configured");
			return Ok(None);
		}
	};
	let operator = parse_signer(key)?.address();
	let policy = config
		.local
		.reimbursement_policy
		.parse::<ReimbursementPolicy>()
		.map_err(RelayError::Configuration)?;

	let ledger = Ledger::genesis(GenesisConfig {
		chain_id: config.local.chain_id,
		owner: operator,
		timestamp: system_time(),
		max_gas: config.local.max_gas,
		reimbursement_policy: policy,
		funding: eth(config.local.funding_eth),
		prefunded: vec![(operator, eth(config.local.operator_balance_eth))],
		..GenesisConfig::default()
	});
	let delivery = LocalDelivery::new(ledger, operator, config.network.gas_limit).with_system_clock();

	tracing::info!(operator = %operator, "Using in-process ledger");
	Ok(Some(DeliveryService::new(Box::new(delivery), 1)))
}

fn parse_signer(key: &str) -> Result<PrivateKeySigner, RelayError> {
	key.trim()
		.parse::<PrivateKeySigner>()
		.map_err(|e| RelayError::Configuration(format!("Invalid operator key: {}", e)))
}
