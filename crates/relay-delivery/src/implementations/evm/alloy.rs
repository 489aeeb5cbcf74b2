//! JSON-RPC delivery using alloy.
//!
//! Relays are dry-run with `eth_call` before being signed by the operator
//! wallet and broadcast. Revert data returned by the node is decoded into the
//! contract error taxonomy so callers can tell a stale nonce from a bad
//! signature.

use crate::{DeliveryError, DeliveryInterface};
use alloy::network::{EthereumWallet, TransactionBuilder};
use alloy::primitives::{Address, Bytes};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::Signer;
use alloy::sol_types::SolCall;
use alloy::transports::http::reqwest::Url;
use alloy::transports::TransportError;
use async_trait::async_trait;
use relay_types::abi::IRelayForwarder;
use relay_types::{ContractError, RelayRequest, TransactionHash, TransactionReceipt};
use std::time::Duration;

/// Tunables of the confirmation loop.
#[derive(Debug, Clone)]
pub struct AlloyDeliverySettings {
	pub gas_limit: u64,
	pub confirmation_timeout: Duration,
	pub poll_interval: Duration,
}

impl Default for AlloyDeliverySettings {
	fn default() -> Self {
		Self {
			gas_limit: 1_000_000,
			confirmation_timeout: Duration::from_secs(120),
			poll_interval: Duration::from_secs(1),
		}
	}
}

/// Delivers relays to a deployed forwarder.
pub struct AlloyDelivery {
	provider: DynProvider,
	chain_id: u64,
	forwarder: Address,
	operator: Address,
	settings: AlloyDeliverySettings,
}

impl AlloyDelivery {
	pub fn new(
		rpc_url: &str,
		chain_id: u64,
		signer: PrivateKeySigner,
		forwarder: Address,
		settings: AlloyDeliverySettings,
	) -> Result<Self, DeliveryError> {
		let url: Url = rpc_url
			.parse()
			.map_err(|e| DeliveryError::InvalidConfig(format!("Invalid RPC URL: {}", e)))?;

		let signer = signer.with_chain_id(Some(chain_id));
		let operator = signer.address();
		let provider = ProviderBuilder::new()
			.wallet(EthereumWallet::from(signer))
			.connect_http(url)
			.erased();

		Ok(Self {
			provider,
			chain_id,
			forwarder,
			operator,
			settings,
		})
	}

	fn relay_transaction(&self, request: &RelayRequest) -> TransactionRequest {
		TransactionRequest::default()
			.with_from(self.operator)
			.with_to(self.forwarder)
			.with_input(request.to_call())
			.with_gas_limit(self.settings.gas_limit)
	}

	async fn eth_call(&self, tx: TransactionRequest) -> Result<Bytes, DeliveryError> {
		self.provider
			.call(tx)
			.await
			.map_err(|e| classify("eth_call failed", e))
	}
}

/// Splits node errors into contract reverts and transport failures.
fn classify(context: &str, error: TransportError) -> DeliveryError {
	match error.as_error_resp().and_then(|payload| payload.as_revert_data()) {
		Some(data) => DeliveryError::Reverted {
			error: ContractError::from_revert_data(&data),
			raw: error.to_string(),
		},
		None => DeliveryError::Network(format!("{}: {}", context, error)),
	}
}

#[async_trait]
impl DeliveryInterface for AlloyDelivery {
	fn chain_id(&self) -> u64 {
		self.chain_id
	}

	fn forwarder(&self) -> Address {
		self.forwarder
	}

	async fn forwarder_nonce(&self, account: Address) -> Result<u64, DeliveryError> {
		let call = IRelayForwarder::getNonceCall { account };
		let tx = TransactionRequest::default()
			.with_to(self.forwarder)
			.with_input(call.abi_encode());
		let output = self.eth_call(tx).await?;
		let nonce = IRelayForwarder::getNonceCall::abi_decode_returns(&output)
			.map_err(|e| DeliveryError::Network(format!("Malformed getNonce result: {}", e)))?;
		Ok(nonce.saturating_to())
	}

	async fn simulate(&self, request: &RelayRequest) -> Result<(), DeliveryError> {
		self.eth_call(self.relay_transaction(request)).await?;
		tracing::debug!(account = %request.account, nonce = %request.nonce, "Simulation passed");
		Ok(())
	}

	async fn submit(&self, request: &RelayRequest) -> Result<TransactionHash, DeliveryError> {
		let pending = self
			.provider
			.send_transaction(self.relay_transaction(request))
			.await
			.map_err(|e| classify("Failed to send transaction", e))?;

		let hash = TransactionHash(*pending.tx_hash());
		tracing::info!(tx_hash = %hash.short(), "Submitted relay transaction");
		Ok(hash)
	}

	async fn wait_for_confirmation(
		&self,
		hash: &TransactionHash,
		confirmations: u64,
	) -> Result<TransactionReceipt, DeliveryError> {
		let max_wait_time = self.settings.confirmation_timeout;
		let start_time = tokio::time::Instant::now();

		tracing::info!(
			tx_hash = %hash.short(),
			"Waiting for {} confirmations (timeout: {}s)",
			confirmations,
			max_wait_time.as_secs()
		);

		loop {
			if start_time.elapsed() > max_wait_time {
				return Err(DeliveryError::Timeout(hash.to_string()));
			}

			let receipt = match self.provider.get_transaction_receipt(hash.0).await {
				Ok(Some(receipt)) => receipt,
				Ok(None) => {
					tokio::time::sleep(self.settings.poll_interval).await;
					continue;
				}
				Err(e) => {
					return Err(DeliveryError::Network(format!(
						"Failed to get receipt: {}",
						e
					)));
				}
			};

			let current_block = self.provider.get_block_number().await.map_err(|e| {
				DeliveryError::Network(format!("Failed to get block number: {}", e))
			})?;

			let tx_block = receipt.block_number.unwrap_or(0);
			// The inclusion block counts as the first confirmation.
			let current_confirmations = current_block.saturating_sub(tx_block) + 1;

			if current_confirmations >= confirmations {
				return Ok(TransactionReceipt {
					hash: TransactionHash(receipt.transaction_hash),
					block_number: tx_block,
					gas_used: receipt.gas_used,
					success: receipt.status(),
				});
			}

			tracing::debug!(
				"Waiting for {} more confirmations...",
				confirmations.saturating_sub(current_confirmations)
			);
			tokio::time::sleep(self.settings.poll_interval).await;
		}
	}
}
