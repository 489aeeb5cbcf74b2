//! Per-account replay counters.

use crate::gas::{self, GasMeter};
use alloy::primitives::{Address, U256};
use relay_types::ContractError;
use std::collections::HashMap;

/// One nonce space. Each verifying contract owns its own instance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NonceCounters {
	counters: HashMap<Address, u64>,
}

impl NonceCounters {
	pub fn current(&self, account: &Address) -> u64 {
		self.counters.get(account).copied().unwrap_or(0)
	}

	/// Fails with `StaleNonce` unless `provided` is the stored value.
	pub fn check(
		&self,
		gas: &mut GasMeter,
		account: &Address,
		provided: U256,
	) -> Result<(), ContractError> {
		gas.charge(gas::SLOAD)?;
		let expected = self.current(account);
		if provided != U256::from(expected) {
			return Err(ContractError::StaleNonce {
				expected,
				provided: provided.saturating_to(),
			});
		}
		Ok(())
	}

	/// Advances the counter by one and returns the consumed value.
	pub fn increment(&mut self, gas: &mut GasMeter, account: Address) -> Result<u64, ContractError> {
		let slot = self.counters.entry(account).or_insert(0);
		gas.charge(if *slot == 0 {
			gas::SSTORE_SET
		} else {
			gas::SSTORE_RESET
		})?;
		let consumed = *slot;
		*slot += 1;
		Ok(consumed)
	}
}
