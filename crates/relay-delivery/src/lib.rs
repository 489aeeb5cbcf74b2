//! Submission of relay requests to the forwarder.
//!
//! A [`DeliveryInterface`] knows how to read the forwarder nonce, dry-run a
//! relay, send it and wait for its receipt. Two backends exist: JSON-RPC via
//! alloy for deployed contracts, and the in-process ledger.

use alloy::primitives::Address;
use alloy::sol_types::Eip712Domain;
use async_trait::async_trait;
use relay_types::{
	forwarder_domain, ContractError, RelayRequest, TransactionHash, TransactionReceipt,
};
use thiserror::Error;

pub mod implementations {
	pub mod evm {
		pub mod alloy;
	}
	pub mod local;
}

pub use implementations::evm::alloy::{AlloyDelivery, AlloyDeliverySettings};
pub use implementations::local::{Clock, LocalDelivery};

#[derive(Debug, Error)]
pub enum DeliveryError {
	/// The forwarder call reverts. `raw` is the node's error text.
	#[error("Execution reverted: {error}")]
	Reverted { error: ContractError, raw: String },
	#[error("Network error: {0}")]
	Network(String),
	#[error("Invalid configuration: {0}")]
	InvalidConfig(String),
	#[error("Timed out waiting for confirmation of {0}")]
	Timeout(String),
	#[error("Transaction {0} reverted on chain")]
	FailedOnChain(TransactionHash),
}

#[async_trait]
pub trait DeliveryInterface: Send + Sync {
	fn chain_id(&self) -> u64;

	/// Address of the forwarder relays are sent to.
	fn forwarder(&self) -> Address;

	/// Current forwarder nonce of `account`.
	async fn forwarder_nonce(&self, account: Address) -> Result<u64, DeliveryError>;

	/// Executes the relay without committing it.
	async fn simulate(&self, request: &RelayRequest) -> Result<(), DeliveryError>;

	async fn submit(&self, request: &RelayRequest) -> Result<TransactionHash, DeliveryError>;

	async fn wait_for_confirmation(
		&self,
		hash: &TransactionHash,
		confirmations: u64,
	) -> Result<TransactionReceipt, DeliveryError>;
}

pub struct DeliveryService {
	backend: Box<dyn DeliveryInterface>,
	confirmations: u64,
}

impl DeliveryService {
	pub fn new(backend: Box<dyn DeliveryInterface>, confirmations: u64) -> Self {
		Self {
			backend,
			confirmations,
		}
	}

	pub fn forwarder(&self) -> Address {
		self.backend.forwarder()
	}

	/// Typed-data domain relay envelopes are signed under.
	pub fn forwarder_domain(&self) -> Eip712Domain {
		forwarder_domain(self.backend.chain_id(), self.backend.forwarder())
	}

	pub async fn forwarder_nonce(&self, account: Address) -> Result<u64, DeliveryError> {
		self.backend.forwarder_nonce(account).await
	}

	pub async fn simulate(&self, request: &RelayRequest) -> Result<(), DeliveryError> {
		self.backend.simulate(request).await
	}

	/// Sends the relay and waits for its receipt. A receipt with a failed
	/// status is returned as [`DeliveryError::FailedOnChain`].
	pub async fn deliver(&self, request: &RelayRequest) -> Result<TransactionReceipt, DeliveryError> {
		let hash = self.backend.submit(request).await?;
		let receipt = self
			.backend
			.wait_for_confirmation(&hash, self.confirmations)
			.await?;

		if !receipt.success {
			tracing::warn!(tx_hash = %hash.short(), "Relay transaction reverted on chain");
			return Err(DeliveryError::FailedOnChain(hash));
		}
		tracing::info!(
			tx_hash = %hash.short(),
			block = receipt.block_number,
			gas_used = receipt.gas_used,
			"Relay confirmed"
		);
		Ok(receipt)
	}
}
