//! Delivery into the in-process ledger.
//!
//! Used by the service's `local` network mode and by tests. The ledger has
//! instant finality: a transaction is confirmed as soon as it is applied.

use crate::{DeliveryError, DeliveryInterface};
use alloy::primitives::Address;
use async_trait::async_trait;
use relay_contracts::{Ledger, LedgerError, LedgerTransaction};
use relay_types::{RelayRequest, TransactionHash, TransactionReceipt};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Source of the current unix time.
pub type Clock = Arc<dyn Fn() -> u64 + Send + Sync>;

pub struct LocalDelivery {
	ledger: Arc<RwLock<Ledger>>,
	chain_id: u64,
	forwarder: Address,
	operator: Address,
	gas_limit: u64,
	clock: Option<Clock>,
}

impl LocalDelivery {
	/// Relays are sent from `operator`, which pays their gas.
	pub fn new(ledger: Ledger, operator: Address, gas_limit: u64) -> Self {
		Self {
			chain_id: ledger.chain_id(),
			forwarder: ledger.forwarder_address(),
			ledger: Arc::new(RwLock::new(ledger)),
			operator,
			gas_limit,
			clock: None,
		}
	}

	/// Moves the ledger clock forward to `clock` before every call.
	pub fn with_clock(mut self, clock: Clock) -> Self {
		self.clock = Some(clock);
		self
	}

	/// Follows wall-clock time.
	pub fn with_system_clock(self) -> Self {
		self.with_clock(Arc::new(|| chrono::Utc::now().timestamp().max(0) as u64))
	}

	/// Shared handle to the ledger.
	pub fn ledger(&self) -> Arc<RwLock<Ledger>> {
		self.ledger.clone()
	}

	async fn sync_clock(&self) {
		let Some(clock) = &self.clock else {
			return;
		};
		let now = clock();
		let mut ledger = self.ledger.write().await;
		if now > ledger.timestamp() {
			ledger.set_timestamp(now);
		}
	}

	fn relay_transaction(&self, request: &RelayRequest) -> LedgerTransaction {
		LedgerTransaction::call(self.operator, self.forwarder, request.to_call(), self.gas_limit)
	}
}

#[async_trait]
impl DeliveryInterface for LocalDelivery {
	fn chain_id(&self) -> u64 {
		self.chain_id
	}

	fn forwarder(&self) -> Address {
		self.forwarder
	}

	async fn forwarder_nonce(&self, account: Address) -> Result<u64, DeliveryError> {
		Ok(self.ledger.read().await.forwarder().nonce(&account))
	}

	async fn simulate(&self, request: &RelayRequest) -> Result<(), DeliveryError> {
		self.sync_clock().await;
		let tx = self.relay_transaction(request);
		self.ledger
			.read()
			.await
			.simulate(&tx)
			.map(|_| ())
			.map_err(|error| DeliveryError::Reverted {
				raw: format!(
					"execution reverted: {} (data: 0x{})",
					error,
					hex::encode(error.to_revert_data())
				),
				error,
			})
	}

	async fn submit(&self, request: &RelayRequest) -> Result<TransactionHash, DeliveryError> {
		self.sync_clock().await;
		let tx = self.relay_transaction(request);
		let receipt = self
			.ledger
			.write()
			.await
			.transact(tx)
			.map_err(|e| match e {
				LedgerError::InsufficientBalance { .. } => {
					DeliveryError::Network(format!("Operator cannot pay for gas: {}", e))
				}
				LedgerError::IntrinsicGasTooLow { .. } => DeliveryError::InvalidConfig(e.to_string()),
			})?;

		let hash = TransactionHash(receipt.hash);
		tracing::info!(tx_hash = %hash.short(), block = receipt.block_number, "Applied relay transaction");
		Ok(hash)
	}

	async fn wait_for_confirmation(
		&self,
		hash: &TransactionHash,
		_confirmations: u64,
	) -> Result<TransactionReceipt, DeliveryError> {
		let ledger = self.ledger.read().await;
		let receipt = ledger
			.receipt(&hash.0)
			.ok_or_else(|| DeliveryError::Network(format!("Unknown transaction {}", hash)))?;

		Ok(TransactionReceipt {
			hash: *hash,
			block_number: receipt.block_number,
			gas_used: receipt.gas_used,
			success: receipt.success,
		})
	}
}
