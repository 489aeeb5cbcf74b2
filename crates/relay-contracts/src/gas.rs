//! Per-transaction gas accounting.

use relay_types::ContractError;

pub const TX_BASE: u64 = 21_000;
pub const CALLDATA_ZERO_BYTE: u64 = 4;
pub const CALLDATA_NONZERO_BYTE: u64 = 16;
pub const ECRECOVER: u64 = 3_000;
pub const SLOAD: u64 = 2_100;
/// Writing a previously empty slot.
pub const SSTORE_SET: u64 = 20_000;
/// Overwriting an existing slot.
pub const SSTORE_RESET: u64 = 5_000;
pub const LOG: u64 = 375;
pub const CALL: u64 = 2_600;
pub const VALUE_TRANSFER: u64 = 9_000;

/// Cost of the transaction envelope and its calldata.
pub fn intrinsic_gas(input: &[u8]) -> u64 {
	let data: u64 = input
		.iter()
		.map(|b| {
			if *b == 0 {
				CALLDATA_ZERO_BYTE
			} else {
				CALLDATA_NONZERO_BYTE
			}
		})
		.sum();
	TX_BASE + data
}

/// Storage cost of persisting `len` bytes, one slot per 32-byte word.
pub fn storage_words(len: usize) -> u64 {
	(len as u64).div_ceil(32) * SSTORE_SET
}

#[derive(Debug, Clone)]
pub struct GasMeter {
	limit: u64,
	used: u64,
}

impl GasMeter {
	pub fn new(limit: u64) -> Self {
		Self { limit, used: 0 }
	}

	pub fn charge(&mut self, amount: u64) -> Result<(), ContractError> {
		let used = self.used.saturating_add(amount);
		if used > self.limit {
			self.used = self.limit;
			return Err(ContractError::OutOfGas { limit: self.limit });
		}
		self.used = used;
		Ok(())
	}

	pub fn used(&self) -> u64 {
		self.used
	}

	pub fn limit(&self) -> u64 {
		self.limit
	}

	pub fn remaining(&self) -> u64 {
		self.limit - self.used
	}
}
