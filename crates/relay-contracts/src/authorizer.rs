//! Meta-transaction authorizer.
//!
//! Verifies one action signed by an account under the authorizer domain and
//! performs it on the target on the account's behalf. Only the owner and
//! whitelisted sponsors may submit; sponsors are reimbursed for the gas they
//! spend out of the authorizer's own balance.

use crate::gas;
use crate::nonce::NonceCounters;
use crate::{decode_error, selector, CallFrame, Contract, LedgerEvent};
use alloy::primitives::{Address, Bytes, U256};
use alloy::sol_types::{Eip712Domain, SolCall, SolValue};
use relay_types::abi::IMetaTxAuthorizer;
use relay_types::{
	authorizer_domain, recover_signer, ContractError, SignedAuthorization, UnauthorizedReason,
};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_MAX_GAS: u64 = 500_000;

/// What happens when the funding pool cannot cover a reimbursement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[repr(u8)]
pub enum ReimbursementPolicy {
	/// The action still executes and the sponsor is reimbursed nothing.
	#[default]
	BestEffort = 0,
	/// The whole call fails with `InsufficientFunds`.
	Strict = 1,
}

impl ReimbursementPolicy {
	pub fn from_code(code: u8) -> Option<Self> {
		match code {
			0 => Some(Self::BestEffort),
			1 => Some(Self::Strict),
			_ => None,
		}
	}
}

impl FromStr for ReimbursementPolicy {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"best_effort" => Ok(Self::BestEffort),
			"strict" => Ok(Self::Strict),
			other => Err(format!("unknown reimbursement policy '{}'", other)),
		}
	}
}

impl fmt::Display for ReimbursementPolicy {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::BestEffort => f.write_str("best_effort"),
			Self::Strict => f.write_str("strict"),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SponsorRecord {
	pub address: Address,
	pub whitelisted: bool,
	pub cumulative_gas_spent: u64,
}

impl SponsorRecord {
	fn new(address: Address) -> Self {
		Self {
			address,
			whitelisted: false,
			cumulative_gas_spent: 0,
		}
	}
}

#[derive(Debug, Clone)]
pub struct MetaTxAuthorizer {
	address: Address,
	owner: Address,
	domain: Eip712Domain,
	enabled: bool,
	max_gas: u64,
	policy: ReimbursementPolicy,
	sponsors: HashMap<Address, SponsorRecord>,
	nonces: NonceCounters,
}

impl MetaTxAuthorizer {
	pub fn new(address: Address, owner: Address, chain_id: u64) -> Self {
		Self {
			address,
			owner,
			domain: authorizer_domain(chain_id, address),
			enabled: true,
			max_gas: DEFAULT_MAX_GAS,
			policy: ReimbursementPolicy::default(),
			sponsors: HashMap::new(),
			nonces: NonceCounters::default(),
		}
	}

	pub fn address(&self) -> Address {
		self.address
	}

	pub fn owner(&self) -> Address {
		self.owner
	}

	pub fn domain(&self) -> &Eip712Domain {
		&self.domain
	}

	pub fn nonce(&self, account: &Address) -> u64 {
		self.nonces.current(account)
	}

	pub fn sponsor(&self, address: &Address) -> Option<&SponsorRecord> {
		self.sponsors.get(address)
	}

	pub fn is_enabled(&self) -> bool {
		self.enabled
	}

	pub fn max_gas(&self) -> u64 {
		self.max_gas
	}

	pub fn reimbursement_policy(&self) -> ReimbursementPolicy {
		self.policy
	}

	/// Whitelists a sponsor directly, used when deploying.
	pub fn whitelist_sponsor(&mut self, sponsor: Address) {
		self.sponsors
			.entry(sponsor)
			.or_insert_with(|| SponsorRecord::new(sponsor))
			.whitelisted = true;
	}

	pub fn configure(&mut self, max_gas: u64, policy: ReimbursementPolicy) {
		self.max_gas = max_gas;
		self.policy = policy;
	}

	/// Binds the authorizer to the target it acts on, producing a callable contract.
	pub fn bind<'a>(&'a mut self, target: &'a mut dyn Contract) -> BoundAuthorizer<'a> {
		BoundAuthorizer {
			authorizer: self,
			target,
		}
	}

	fn is_sponsor(&self, caller: &Address) -> bool {
		*caller == self.owner
			|| self
				.sponsors
				.get(caller)
				.map(|record| record.whitelisted)
				.unwrap_or(false)
	}

	fn only_owner(&self, frame: &CallFrame<'_>) -> Result<(), ContractError> {
		if frame.caller == self.owner {
			Ok(())
		} else {
			Err(ContractError::Unauthorized(UnauthorizedReason::NotOwner))
		}
	}

	fn authorize_and_execute(
		&mut self,
		frame: &mut CallFrame<'_>,
		input: &[u8],
		target: &mut dyn Contract,
	) -> Result<Bytes, ContractError> {
		let gas_at_entry = frame.gas.used();
		let sponsor = frame.caller;

		frame.gas.charge(gas::SLOAD)?;
		if !self.enabled {
			return Err(ContractError::Unauthorized(UnauthorizedReason::Disabled));
		}
		frame.gas.charge(gas::SLOAD)?;
		if !self.is_sponsor(&sponsor) {
			return Err(ContractError::Unauthorized(UnauthorizedReason::NotSponsor));
		}

		let SignedAuthorization {
			account,
			action,
			nonce,
			signature,
		} = SignedAuthorization::decode_call(input)?;
		let kind = action.kind();

		frame.gas.charge(gas::ECRECOVER)?;
		let digest = action.signing_hash(account, nonce, &self.domain);
		if recover_signer(digest, &signature)? != account {
			return Err(ContractError::InvalidSignature);
		}
		self.nonces.check(frame.gas, &account, nonce)?;

		let projected = kind.projected_gas();
		if projected > self.max_gas {
			return Err(ContractError::GasLimitExceeded {
				projected,
				cap: self.max_gas,
			});
		}

		let nonce = self.nonces.increment(frame.gas, account)?;
		let result = {
			let mut nested = frame.nested(self.address)?;
			target.call(&mut nested, &action.target_call(account))
		}
		.map_err(ContractError::nested)?;

		frame.gas.charge(gas::SSTORE_RESET)?;
		let gas_used = frame.gas.used() - gas_at_entry;
		let record = self
			.sponsors
			.entry(sponsor)
			.or_insert_with(|| SponsorRecord::new(sponsor));
		record.cumulative_gas_spent = record.cumulative_gas_spent.saturating_add(gas_used);

		let owed = U256::from(gas_used) * U256::from(frame.env.gas_price);
		let reimbursed = match frame.balances.transfer(self.address, sponsor, owed) {
			Ok(()) => owed,
			Err(e) => match self.policy {
				ReimbursementPolicy::BestEffort => {
					tracing::warn!(
						sponsor = %sponsor,
						owed = %owed,
						"Funding pool cannot reimburse sponsor, continuing unreimbursed"
					);
					U256::ZERO
				}
				ReimbursementPolicy::Strict => return Err(e),
			},
		};

		frame.emit(LedgerEvent::SponsoredExecution {
			sponsor,
			account,
			action: kind,
			gas_used,
			reimbursed,
		})?;
		tracing::debug!(
			account = %account,
			nonce,
			action = %kind,
			gas_used,
			"Authorized sponsored action"
		);

		Ok(Bytes::from(result.abi_encode()))
	}

	fn set_sponsor_whitelist(
		&mut self,
		frame: &mut CallFrame<'_>,
		call: IMetaTxAuthorizer::setSponsorWhitelistCall,
	) -> Result<Bytes, ContractError> {
		self.only_owner(frame)?;
		frame.gas.charge(gas::SSTORE_SET)?;
		self.sponsors
			.entry(call.sponsor)
			.or_insert_with(|| SponsorRecord::new(call.sponsor))
			.whitelisted = call.enabled;
		frame.emit(LedgerEvent::SponsorWhitelisted {
			sponsor: call.sponsor,
			enabled: call.enabled,
		})?;
		Ok(Bytes::new())
	}

	fn set_enabled(&mut self, frame: &mut CallFrame<'_>, enabled: bool) -> Result<Bytes, ContractError> {
		self.only_owner(frame)?;
		frame.gas.charge(gas::SSTORE_RESET)?;
		self.enabled = enabled;
		frame.emit(LedgerEvent::EnabledSet { enabled })?;
		Ok(Bytes::new())
	}

	fn set_max_gas(&mut self, frame: &mut CallFrame<'_>, amount: U256) -> Result<Bytes, ContractError> {
		self.only_owner(frame)?;
		frame.gas.charge(gas::SSTORE_RESET)?;
		self.max_gas = amount.saturating_to();
		frame.emit(LedgerEvent::MaxGasSet {
			amount: self.max_gas,
		})?;
		Ok(Bytes::new())
	}

	fn set_reimbursement_policy(
		&mut self,
		frame: &mut CallFrame<'_>,
		code: u8,
	) -> Result<Bytes, ContractError> {
		self.only_owner(frame)?;
		let policy = ReimbursementPolicy::from_code(code).ok_or_else(|| {
			ContractError::InvalidCalldata(format!("unknown reimbursement policy {}", code))
		})?;
		frame.gas.charge(gas::SSTORE_RESET)?;
		self.policy = policy;
		frame.emit(LedgerEvent::ReimbursementPolicySet { policy })?;
		Ok(Bytes::new())
	}

	fn withdraw(&mut self, frame: &mut CallFrame<'_>, amount: U256) -> Result<Bytes, ContractError> {
		self.only_owner(frame)?;
		frame.gas.charge(gas::VALUE_TRANSFER)?;
		frame.balances.transfer(self.address, self.owner, amount)?;
		frame.emit(LedgerEvent::Withdrawn {
			contract: self.address,
			to: self.owner,
			amount,
		})?;
		Ok(Bytes::new())
	}

	fn deposit(&mut self, frame: &mut CallFrame<'_>) -> Result<Bytes, ContractError> {
		let (from, amount) = (frame.caller, frame.value);
		frame.emit(LedgerEvent::Deposited { from, amount })?;
		Ok(Bytes::new())
	}

	fn dispatch(
		&mut self,
		frame: &mut CallFrame<'_>,
		input: &[u8],
		target: &mut dyn Contract,
	) -> Result<Bytes, ContractError> {
		if input.is_empty() {
			return self.deposit(frame);
		}
		let selector = selector(input)?;
		if selector == IMetaTxAuthorizer::depositCall::SELECTOR {
			return self.deposit(frame);
		}
		frame.non_payable()?;

		match selector {
			IMetaTxAuthorizer::authorizeAndExecuteCall::SELECTOR => {
				self.authorize_and_execute(frame, input, target)
			}
			IMetaTxAuthorizer::getNonceCall::SELECTOR => {
				let call = IMetaTxAuthorizer::getNonceCall::abi_decode(input).map_err(decode_error)?;
				frame.gas.charge(gas::SLOAD)?;
				Ok(Bytes::from(
					U256::from(self.nonces.current(&call.account)).abi_encode(),
				))
			}
			IMetaTxAuthorizer::setSponsorWhitelistCall::SELECTOR => {
				let call = IMetaTxAuthorizer::setSponsorWhitelistCall::abi_decode(input)
					.map_err(decode_error)?;
				self.set_sponsor_whitelist(frame, call)
			}
			IMetaTxAuthorizer::setEnabledCall::SELECTOR => {
				let call = IMetaTxAuthorizer::setEnabledCall::abi_decode(input).map_err(decode_error)?;
				self.set_enabled(frame, call.enabled)
			}
			IMetaTxAuthorizer::setMaxGasCall::SELECTOR => {
				let call = IMetaTxAuthorizer::setMaxGasCall::abi_decode(input).map_err(decode_error)?;
				self.set_max_gas(frame, call.amount)
			}
			IMetaTxAuthorizer::setReimbursementPolicyCall::SELECTOR => {
				let call = IMetaTxAuthorizer::setReimbursementPolicyCall::abi_decode(input)
					.map_err(decode_error)?;
				self.set_reimbursement_policy(frame, call.policy)
			}
			IMetaTxAuthorizer::withdrawCall::SELECTOR => {
				let call = IMetaTxAuthorizer::withdrawCall::abi_decode(input).map_err(decode_error)?;
				self.withdraw(frame, call.amount)
			}
			other => Err(ContractError::InvalidCalldata(format!(
				"unknown selector 0x{}",
				hex::encode(other)
			))),
		}
	}
}

/// The authorizer together with the target it forwards to.
pub struct BoundAuthorizer<'a> {
	authorizer: &'a mut MetaTxAuthorizer,
	target: &'a mut dyn Contract,
}

impl Contract for BoundAuthorizer<'_> {
	fn address(&self) -> Address {
		self.authorizer.address
	}

	fn call(&mut self, frame: &mut CallFrame<'_>, input: &[u8]) -> Result<Bytes, ContractError> {
		self.authorizer.dispatch(frame, input, &mut *self.target)
	}
}
