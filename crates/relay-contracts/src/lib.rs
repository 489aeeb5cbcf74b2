//! On-ledger components of the gasless relay.
//!
//! The job board, the meta-transaction authorizer and the relay forwarder run
//! inside [`Ledger`], an in-process ledger with EVM call semantics: explicit
//! caller identity, block timestamps, metered gas, ABI calldata and revert
//! data, and whole-transaction rollback. The same ABI is served by the
//! deployed contracts, so the off-chain service cannot tell the two apart.

use alloy::primitives::{Address, Bytes, U256};
use relay_types::{ActionKind, ContractError};
use std::collections::HashMap;

pub mod authorizer;
pub mod forwarder;
pub mod gas;
pub mod job_board;
pub mod ledger;
pub mod nonce;

#[cfg(test)]
mod tests;

pub use authorizer::{MetaTxAuthorizer, ReimbursementPolicy, SponsorRecord};
pub use forwarder::RelayForwarder;
pub use gas::GasMeter;
pub use job_board::{Application, Job, JobBoard};
pub use ledger::{GenesisConfig, Ledger, LedgerError, LedgerReceipt, LedgerTransaction, WorldState};
pub use nonce::NonceCounters;

/// Block environment visible to contracts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockEnv {
	pub number: u64,
	pub timestamp: u64,
	pub chain_id: u64,
	/// Gas price of the executing transaction.
	pub gas_price: u128,
}

/// Native balances of every account and contract.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Balances {
	accounts: HashMap<Address, U256>,
}

impl Balances {
	pub fn balance_of(&self, account: &Address) -> U256 {
		self.accounts.get(account).copied().unwrap_or_default()
	}

	pub fn credit(&mut self, account: Address, amount: U256) {
		let balance = self.accounts.entry(account).or_default();
		*balance = balance.saturating_add(amount);
	}

	pub fn debit(&mut self, account: Address, amount: U256) -> Result<(), ContractError> {
		let available = self.balance_of(&account);
		if available < amount {
			return Err(ContractError::InsufficientFunds {
				requested: amount,
				available,
			});
		}
		self.accounts.insert(account, available - amount);
		Ok(())
	}

	pub fn transfer(&mut self, from: Address, to: Address, amount: U256) -> Result<(), ContractError> {
		self.debit(from, amount)?;
		self.credit(to, amount);
		Ok(())
	}
}

/// Log entries emitted by the contracts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerEvent {
	JobPosted {
		job_id: u64,
		owner: Address,
	},
	JobEdited {
		job_id: u64,
	},
	JobClosed {
		job_id: u64,
	},
	ApplicationSubmitted {
		job_id: u64,
		application_id: u64,
		applicant: Address,
	},
	TrustedForwarderSet {
		forwarder: Address,
		trusted: bool,
	},
	SponsoredExecution {
		sponsor: Address,
		account: Address,
		action: ActionKind,
		gas_used: u64,
		reimbursed: U256,
	},
	SponsorWhitelisted {
		sponsor: Address,
		enabled: bool,
	},
	EnabledSet {
		enabled: bool,
	},
	MaxGasSet {
		amount: u64,
	},
	ReimbursementPolicySet {
		policy: ReimbursementPolicy,
	},
	Deposited {
		from: Address,
		amount: U256,
	},
	Withdrawn {
		contract: Address,
		to: Address,
		amount: U256,
	},
	RelayExecuted {
		account: Address,
		relayer: Address,
		nonce: u64,
	},
}

/// Execution context of one call.
pub struct CallFrame<'a> {
	pub env: BlockEnv,
	pub caller: Address,
	pub value: U256,
	pub gas: &'a mut GasMeter,
	pub balances: &'a mut Balances,
	pub events: &'a mut Vec<LedgerEvent>,
}

impl CallFrame<'_> {
	/// Frame for a call made by `caller` (the currently executing contract).
	pub fn nested(&mut self, caller: Address) -> Result<CallFrame<'_>, ContractError> {
		self.gas.charge(gas::CALL)?;
		Ok(CallFrame {
			env: self.env,
			caller,
			value: U256::ZERO,
			gas: &mut *self.gas,
			balances: &mut *self.balances,
			events: &mut *self.events,
		})
	}

	pub fn emit(&mut self, event: LedgerEvent) -> Result<(), ContractError> {
		self.gas.charge(gas::LOG)?;
		self.events.push(event);
		Ok(())
	}

	/// Rejects value sent to a non-payable entry point.
	pub fn non_payable(&self) -> Result<(), ContractError> {
		if self.value.is_zero() {
			Ok(())
		} else {
			Err(ContractError::Rejected("function is not payable".to_string()))
		}
	}
}

/// A contract addressable by calldata.
pub trait Contract {
	fn address(&self) -> Address;

	/// Executes `input` and returns the ABI-encoded result.
	fn call(&mut self, frame: &mut CallFrame<'_>, input: &[u8]) -> Result<Bytes, ContractError>;
}

/// Reads the four-byte selector of `input`.
pub(crate) fn selector(input: &[u8]) -> Result<[u8; 4], ContractError> {
	input
		.get(..4)
		.and_then(|s| s.try_into().ok())
		.ok_or_else(|| ContractError::InvalidCalldata("missing function selector".to_string()))
}

pub(crate) fn decode_error(e: alloy::sol_types::Error) -> ContractError {
	ContractError::InvalidCalldata(e.to_string())
}
