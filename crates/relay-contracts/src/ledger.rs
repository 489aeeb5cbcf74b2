//! In-process ledger hosting the relay contracts.
//!
//! Transactions are applied one at a time against a [`WorldState`]. A failing
//! transaction restores the snapshot taken before it ran, so a reverted nested
//! call never leaves a consumed nonce or a half-written job behind. The sender
//! still pays for the gas it burned.

use crate::authorizer::{MetaTxAuthorizer, ReimbursementPolicy, DEFAULT_MAX_GAS};
use crate::forwarder::RelayForwarder;
use crate::gas::{self, GasMeter};
use crate::job_board::JobBoard;
use crate::{Balances, BlockEnv, CallFrame, Contract, LedgerEvent};
use alloy::primitives::{keccak256, Address, Bytes, B256, U256};
use relay_types::ContractError;
use std::collections::HashMap;
use thiserror::Error;

/// Reasons a transaction is refused before execution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
	#[error("Insufficient balance for gas and value: required {required}, available {available}")]
	InsufficientBalance { required: U256, available: U256 },
	#[error("Intrinsic gas {required} exceeds gas limit {limit}")]
	IntrinsicGasTooLow { required: u64, limit: u64 },
}

/// A call from an externally owned account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerTransaction {
	pub from: Address,
	pub to: Address,
	pub input: Bytes,
	pub value: U256,
	pub gas_limit: u64,
}

impl LedgerTransaction {
	pub fn call(from: Address, to: Address, input: impl Into<Bytes>, gas_limit: u64) -> Self {
		Self {
			from,
			to,
			input: input.into(),
			value: U256::ZERO,
			gas_limit,
		}
	}

	pub fn with_value(mut self, value: U256) -> Self {
		self.value = value;
		self
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerReceipt {
	pub hash: B256,
	pub block_number: u64,
	pub timestamp: u64,
	pub gas_used: u64,
	pub success: bool,
	pub output: Bytes,
	/// Set when the transaction reverted.
	pub revert: Option<ContractError>,
	/// Empty for reverted transactions.
	pub events: Vec<LedgerEvent>,
}

/// All contract storage and native balances.
#[derive(Debug, Clone)]
pub struct WorldState {
	pub job_board: JobBoard,
	pub authorizer: MetaTxAuthorizer,
	pub forwarder: RelayForwarder,
	pub balances: Balances,
}

#[derive(Debug, Clone)]
pub struct GenesisConfig {
	pub chain_id: u64,
	/// Deployer and owner of all three contracts.
	pub owner: Address,
	pub timestamp: u64,
	pub gas_price: u128,
	pub max_gas: u64,
	pub reimbursement_policy: ReimbursementPolicy,
	/// Initial authorizer funding pool.
	pub funding: U256,
	pub prefunded: Vec<(Address, U256)>,
}

impl Default for GenesisConfig {
	fn default() -> Self {
		Self {
			chain_id: 31337,
			owner: Address::ZERO,
			timestamp: 1_700_000_000,
			gas_price: 1_000_000_000,
			max_gas: DEFAULT_MAX_GAS,
			reimbursement_policy: ReimbursementPolicy::BestEffort,
			funding: U256::ZERO,
			prefunded: Vec::new(),
		}
	}
}

pub struct Ledger {
	state: WorldState,
	chain_id: u64,
	block_number: u64,
	timestamp: u64,
	gas_price: u128,
	sender_nonces: HashMap<Address, u64>,
	receipts: HashMap<B256, LedgerReceipt>,
}

impl Ledger {
	/// Deploys the job board, authorizer and forwarder from `config.owner`.
	///
	/// The board trusts the authorizer and the authorizer accepts the forwarder
	/// as a sponsor, so relays work without further setup.
	pub fn genesis(config: GenesisConfig) -> Self {
		let owner = config.owner;
		let mut job_board = JobBoard::new(owner.create(0), owner);
		let mut authorizer = MetaTxAuthorizer::new(owner.create(1), owner, config.chain_id);
		let forwarder = RelayForwarder::new(owner.create(2), owner, config.chain_id);

		job_board.trust_forwarder(authorizer.address());
		authorizer.whitelist_sponsor(forwarder.address());
		authorizer.configure(config.max_gas, config.reimbursement_policy);

		let mut balances = Balances::default();
		balances.credit(authorizer.address(), config.funding);
		for (account, amount) in config.prefunded {
			balances.credit(account, amount);
		}

		tracing::info!(
			chain_id = config.chain_id,
			job_board = %job_board.address(),
			authorizer = %authorizer.address(),
			forwarder = %forwarder.address(),
			"Deployed relay contracts"
		);

		Self {
			state: WorldState {
				job_board,
				authorizer,
				forwarder,
				balances,
			},
			chain_id: config.chain_id,
			block_number: 0,
			timestamp: config.timestamp,
			gas_price: config.gas_price,
			sender_nonces: HashMap::new(),
			receipts: HashMap::new(),
		}
	}

	pub fn chain_id(&self) -> u64 {
		self.chain_id
	}

	pub fn block_number(&self) -> u64 {
		self.block_number
	}

	pub fn timestamp(&self) -> u64 {
		self.timestamp
	}

	pub fn gas_price(&self) -> u128 {
		self.gas_price
	}

	pub fn set_timestamp(&mut self, timestamp: u64) {
		self.timestamp = timestamp;
	}

	pub fn advance_time(&mut self, seconds: u64) {
		self.timestamp = self.timestamp.saturating_add(seconds);
	}

	pub fn state(&self) -> &WorldState {
		&self.state
	}

	pub fn job_board(&self) -> &JobBoard {
		&self.state.job_board
	}

	pub fn authorizer(&self) -> &MetaTxAuthorizer {
		&self.state.authorizer
	}

	pub fn forwarder(&self) -> &RelayForwarder {
		&self.state.forwarder
	}

	pub fn job_board_address(&self) -> Address {
		self.state.job_board.address()
	}

	pub fn authorizer_address(&self) -> Address {
		self.state.authorizer.address()
	}

	pub fn forwarder_address(&self) -> Address {
		self.state.forwarder.address()
	}

	pub fn balance_of(&self, account: &Address) -> U256 {
		self.state.balances.balance_of(account)
	}

	/// Balance the authorizer reimburses sponsors from.
	pub fn funding_pool(&self) -> U256 {
		self.balance_of(&self.authorizer_address())
	}

	/// Mints native balance to `account`.
	pub fn fund(&mut self, account: Address, amount: U256) {
		self.state.balances.credit(account, amount);
	}

	pub fn receipt(&self, hash: &B256) -> Option<&LedgerReceipt> {
		self.receipts.get(hash)
	}

	/// Executes `tx` in a new block, committing its effects only on success.
	pub fn transact(&mut self, tx: LedgerTransaction) -> Result<LedgerReceipt, LedgerError> {
		let intrinsic = gas::intrinsic_gas(&tx.input);
		if intrinsic > tx.gas_limit {
			return Err(LedgerError::IntrinsicGasTooLow {
				required: intrinsic,
				limit: tx.gas_limit,
			});
		}
		let gas_price = U256::from(self.gas_price);
		let required = U256::from(tx.gas_limit)
			.saturating_mul(gas_price)
			.saturating_add(tx.value);
		let available = self.balance_of(&tx.from);
		if available < required {
			return Err(LedgerError::InsufficientBalance {
				required,
				available,
			});
		}

		let sender_nonce = self.sender_nonces.entry(tx.from).or_insert(0);
		let hash = transaction_hash(&tx, *sender_nonce);
		*sender_nonce += 1;
		self.block_number += 1;
		let env = self.env();

		let snapshot = self.state.clone();
		let mut meter = GasMeter::new(tx.gas_limit);
		let mut events = Vec::new();
		let outcome = execute(&mut self.state, env, &tx, &mut meter, &mut events);
		if outcome.is_err() {
			self.state = snapshot;
			events.clear();
		}

		let gas_used = meter.used();
		self.state
			.balances
			.debit(tx.from, U256::from(gas_used) * gas_price)
			.map_err(|_| LedgerError::InsufficientBalance {
				required,
				available,
			})?;

		let receipt = match outcome {
			Ok(output) => LedgerReceipt {
				hash,
				block_number: env.number,
				timestamp: env.timestamp,
				gas_used,
				success: true,
				output,
				revert: None,
				events,
			},
			Err(error) => {
				tracing::debug!(
					tx_hash = %hash,
					error = %error,
					"Transaction reverted"
				);
				LedgerReceipt {
					hash,
					block_number: env.number,
					timestamp: env.timestamp,
					gas_used,
					success: false,
					output: error.to_revert_data(),
					revert: Some(error),
					events,
				}
			},
		};
		self.receipts.insert(hash, receipt.clone());
		Ok(receipt)
	}

	/// Runs `tx` against a copy of the current state, like `eth_call`.
	pub fn simulate(&self, tx: &LedgerTransaction) -> Result<Bytes, ContractError> {
		let mut state = self.state.clone();
		state.balances.credit(tx.from, tx.value);
		let mut env = self.env();
		env.number += 1;
		let mut meter = GasMeter::new(tx.gas_limit);
		let mut events = Vec::new();
		execute(&mut state, env, tx, &mut meter, &mut events)
	}

	/// Read-only call from the zero address.
	pub fn view(&self, to: Address, input: impl Into<Bytes>) -> Result<Bytes, ContractError> {
		self.simulate(&LedgerTransaction::call(Address::ZERO, to, input, u64::MAX / 2))
	}

	fn env(&self) -> BlockEnv {
		BlockEnv {
			number: self.block_number,
			timestamp: self.timestamp,
			chain_id: self.chain_id,
			gas_price: self.gas_price,
		}
	}
}

fn transaction_hash(tx: &LedgerTransaction, sender_nonce: u64) -> B256 {
	let mut preimage = Vec::with_capacity(48 + tx.input.len());
	preimage.extend_from_slice(tx.from.as_slice());
	preimage.extend_from_slice(&sender_nonce.to_be_bytes());
	preimage.extend_from_slice(tx.to.as_slice());
	preimage.extend_from_slice(&tx.input);
	keccak256(preimage)
}

fn execute(
	state: &mut WorldState,
	env: BlockEnv,
	tx: &LedgerTransaction,
	meter: &mut GasMeter,
	events: &mut Vec<LedgerEvent>,
) -> Result<Bytes, ContractError> {
	meter.charge(gas::intrinsic_gas(&tx.input))?;

	let WorldState {
		job_board,
		authorizer,
		forwarder,
		balances,
	} = state;
	if !tx.value.is_zero() {
		meter.charge(gas::VALUE_TRANSFER)?;
		balances.transfer(tx.from, tx.to, tx.value)?;
	}

	let mut frame = CallFrame {
		env,
		caller: tx.from,
		value: tx.value,
		gas: meter,
		balances,
		events,
	};

	if tx.to == job_board.address() {
		job_board.call(&mut frame, &tx.input)
	} else if tx.to == authorizer.address() {
		authorizer.bind(job_board).call(&mut frame, &tx.input)
	} else if tx.to == forwarder.address() {
		let mut bound = authorizer.bind(job_board);
		forwarder.dispatch(&mut frame, &tx.input, &mut bound)
	} else {
		Ok(Bytes::new())
	}
}
