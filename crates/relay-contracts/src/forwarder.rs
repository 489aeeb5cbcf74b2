//! Generic relay forwarder.
//!
//! Verifies the outer envelope of a gasless call under its own domain and
//! nonce space, then hands the wrapped calldata to the authorizer without
//! looking inside it.

use crate::gas;
use crate::nonce::NonceCounters;
use crate::{decode_error, selector, CallFrame, Contract, LedgerEvent};
use alloy::primitives::{Address, Bytes, U256};
use alloy::sol_types::{Eip712Domain, SolCall, SolValue};
use relay_types::abi::IRelayForwarder;
use relay_types::{forwarder_domain, recover_signer, ContractError, RelayRequest, UnauthorizedReason};

#[derive(Debug, Clone)]
pub struct RelayForwarder {
	address: Address,
	owner: Address,
	domain: Eip712Domain,
	nonces: NonceCounters,
}

impl RelayForwarder {
	pub fn new(address: Address, owner: Address, chain_id: u64) -> Self {
		Self {
			address,
			owner,
			domain: forwarder_domain(chain_id, address),
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

	fn execute_relay(
		&mut self,
		frame: &mut CallFrame<'_>,
		request: RelayRequest,
		authorizer: &mut dyn Contract,
	) -> Result<Bytes, ContractError> {
		let now = frame.env.timestamp;
		if request.deadline < U256::from(now) {
			return Err(ContractError::Expired {
				deadline: request.deadline.saturating_to(),
				now,
			});
		}

		frame.gas.charge(gas::ECRECOVER)?;
		let digest = request.digest(&self.domain);
		if recover_signer(digest, &request.signature)? != request.account {
			return Err(ContractError::InvalidSignature);
		}
		self.nonces.check(frame.gas, &request.account, request.nonce)?;
		let nonce = self.nonces.increment(frame.gas, request.account)?;

		let relayer = frame.caller;
		let result = {
			let mut nested = frame.nested(self.address)?;
			authorizer.call(&mut nested, &request.encoded_call)
		}
		.map_err(ContractError::nested)?;

		frame.emit(LedgerEvent::RelayExecuted {
			account: request.account,
			relayer,
			nonce,
		})?;
		tracing::debug!(
			account = %request.account,
			nonce,
			relayer = %relayer,
			"Relayed call"
		);

		Ok(Bytes::from(result.abi_encode()))
	}

	fn withdraw(&mut self, frame: &mut CallFrame<'_>) -> Result<Bytes, ContractError> {
		if frame.caller != self.owner {
			return Err(ContractError::Unauthorized(UnauthorizedReason::NotOwner));
		}
		frame.gas.charge(gas::VALUE_TRANSFER)?;
		let amount = frame.balances.balance_of(&self.address);
		frame.balances.transfer(self.address, self.owner, amount)?;
		frame.emit(LedgerEvent::Withdrawn {
			contract: self.address,
			to: self.owner,
			amount,
		})?;
		Ok(Bytes::new())
	}

	/// Executes `input` against the forwarder, calling into `authorizer` for relays.
	pub fn dispatch(
		&mut self,
		frame: &mut CallFrame<'_>,
		input: &[u8],
		authorizer: &mut dyn Contract,
	) -> Result<Bytes, ContractError> {
		if input.is_empty() {
			return Ok(Bytes::new());
		}
		frame.non_payable()?;
		match selector(input)? {
			IRelayForwarder::executeRelayCall::SELECTOR => {
				let request = RelayRequest::from_call(input)?;
				self.execute_relay(frame, request, authorizer)
			}
			IRelayForwarder::getNonceCall::SELECTOR => {
				let call = IRelayForwarder::getNonceCall::abi_decode(input).map_err(decode_error)?;
				frame.gas.charge(gas::SLOAD)?;
				Ok(Bytes::from(
					U256::from(self.nonces.current(&call.account)).abi_encode(),
				))
			}
			IRelayForwarder::withdrawCall::SELECTOR => self.withdraw(frame),
			other => Err(ContractError::InvalidCalldata(format!(
				"unknown selector 0x{}",
				hex::encode(other)
			))),
		}
	}
}
