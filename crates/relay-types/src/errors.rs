//! Error taxonomy shared by the relay layers.
//!
//! On-ledger failures travel as ABI-encoded Solidity custom errors. The same
//! revert data is produced by the in-process ledger and returned by a JSON-RPC
//! node, so both are decoded through [`ContractError::from_revert_data`].

use crate::abi;
use alloy::primitives::{Bytes, U256};
use alloy::sol_types::{Revert, SolError};
use std::fmt;
use thiserror::Error;

/// Why a caller was refused by an access check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum UnauthorizedReason {
	/// The authorizer's kill switch is off.
	Disabled = 0,
	/// Caller is neither the owner nor a whitelisted sponsor.
	NotSponsor = 1,
	/// Owner-only management call from another account.
	NotOwner = 2,
	/// Target contract called by an address that is neither the actor nor trusted.
	UntrustedForwarder = 3,
}

impl UnauthorizedReason {
	pub fn from_code(code: u8) -> Option<Self> {
		match code {
			0 => Some(Self::Disabled),
			1 => Some(Self::NotSponsor),
			2 => Some(Self::NotOwner),
			3 => Some(Self::UntrustedForwarder),
			_ => None,
		}
	}
}

impl fmt::Display for UnauthorizedReason {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let text = match self {
			Self::Disabled => "relaying is disabled",
			Self::NotSponsor => "caller is not a whitelisted sponsor",
			Self::NotOwner => "caller is not the owner",
			Self::UntrustedForwarder => "caller is not a trusted forwarder",
		};
		f.write_str(text)
	}
}

/// Failure raised by one of the on-ledger components.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContractError {
	#[error("Deadline {deadline} has passed (block time {now})")]
	Expired { deadline: u64, now: u64 },

	#[error("Invalid signature")]
	InvalidSignature,

	#[error("Stale nonce: expected {expected}, got {provided}")]
	StaleNonce { expected: u64, provided: u64 },

	#[error("Unauthorized: {0}")]
	Unauthorized(UnauthorizedReason),

	#[error("Projected gas {projected} exceeds cap {cap}")]
	GasLimitExceeded { projected: u64, cap: u64 },

	#[error("Nested call reverted: {0}")]
	NestedCallReverted(Box<ContractError>),

	#[error("Insufficient funds: requested {requested}, available {available}")]
	InsufficientFunds { requested: U256, available: U256 },

	#[error("Out of gas (limit {limit})")]
	OutOfGas { limit: u64 },

	#[error("Invalid calldata: {0}")]
	InvalidCalldata(String),

	#[error("Rejected: {0}")]
	Rejected(String),

	#[error("Unrecognised revert data: 0x{}", hex::encode(.0))]
	Unknown(Bytes),
}

impl ContractError {
	/// Wraps a failure raised one call level down.
	pub fn nested(inner: ContractError) -> Self {
		Self::NestedCallReverted(Box::new(inner))
	}

	/// The innermost failure, skipping every `NestedCallReverted` wrapper.
	pub fn root_cause(&self) -> &ContractError {
		match self {
			Self::NestedCallReverted(inner) => inner.root_cause(),
			other => other,
		}
	}

	/// Whether the client can recover by refetching the nonce and re-signing.
	pub fn is_retryable(&self) -> bool {
		matches!(
			self.root_cause(),
			Self::Expired { .. } | Self::StaleNonce { .. } | Self::InvalidSignature
		)
	}

	/// ABI-encodes this error as Solidity revert data.
	pub fn to_revert_data(&self) -> Bytes {
		let encoded = match self {
			Self::Expired { deadline, now } => abi::Expired {
				deadline: U256::from(*deadline),
				timestamp: U256::from(*now),
			}
			.abi_encode(),
			Self::InvalidSignature => abi::InvalidSignature {}.abi_encode(),
			Self::StaleNonce { expected, provided } => abi::StaleNonce {
				expected: U256::from(*expected),
				provided: U256::from(*provided),
			}
			.abi_encode(),
			Self::Unauthorized(reason) => abi::Unauthorized {
				reason: *reason as u8,
			}
			.abi_encode(),
			Self::GasLimitExceeded { projected, cap } => abi::GasLimitExceeded {
				projected: U256::from(*projected),
				cap: U256::from(*cap),
			}
			.abi_encode(),
			Self::NestedCallReverted(inner) => abi::NestedCallReverted {
				reason: inner.to_revert_data(),
			}
			.abi_encode(),
			Self::InsufficientFunds {
				requested,
				available,
			} => abi::InsufficientFunds {
				requested: *requested,
				available: *available,
			}
			.abi_encode(),
			Self::OutOfGas { limit } => abi::OutOfGas {
				limit: U256::from(*limit),
			}
			.abi_encode(),
			Self::InvalidCalldata(reason) => abi::InvalidCalldata {
				reason: reason.clone(),
			}
			.abi_encode(),
			Self::Rejected(reason) => abi::Rejected {
				reason: reason.clone(),
			}
			.abi_encode(),
			Self::Unknown(raw) => return raw.clone(),
		};
		Bytes::from(encoded)
	}

	/// Decodes revert data produced by [`ContractError::to_revert_data`].
	///
	/// Plain `Error(string)` reverts map to `Rejected`; anything unrecognised
	/// is kept verbatim as `Unknown`.
	pub fn from_revert_data(data: &[u8]) -> Self {
		if data.len() < 4 {
			return Self::Unknown(Bytes::copy_from_slice(data));
		}
		let selector: [u8; 4] = [data[0], data[1], data[2], data[3]];
		let decoded = match selector {
			abi::Expired::SELECTOR => abi::Expired::abi_decode(data).ok().map(|e| Self::Expired {
				deadline: e.deadline.saturating_to(),
				now: e.timestamp.saturating_to(),
			}),
			abi::InvalidSignature::SELECTOR => Some(Self::InvalidSignature),
			abi::StaleNonce::SELECTOR => abi::StaleNonce::abi_decode(data).ok().map(|e| {
				Self::StaleNonce {
					expected: e.expected.saturating_to(),
					provided: e.provided.saturating_to(),
				}
			}),
			abi::Unauthorized::SELECTOR => abi::Unauthorized::abi_decode(data)
				.ok()
				.and_then(|e| UnauthorizedReason::from_code(e.reason))
				.map(Self::Unauthorized),
			abi::GasLimitExceeded::SELECTOR => abi::GasLimitExceeded::abi_decode(data)
				.ok()
				.map(|e| Self::GasLimitExceeded {
					projected: e.projected.saturating_to(),
					cap: e.cap.saturating_to(),
				}),
			abi::NestedCallReverted::SELECTOR => abi::NestedCallReverted::abi_decode(data)
				.ok()
				.map(|e| Self::nested(Self::from_revert_data(&e.reason))),
			abi::InsufficientFunds::SELECTOR => abi::InsufficientFunds::abi_decode(data)
				.ok()
				.map(|e| Self::InsufficientFunds {
					requested: e.requested,
					available: e.available,
				}),
			abi::OutOfGas::SELECTOR => abi::OutOfGas::abi_decode(data).ok().map(|e| Self::OutOfGas {
				limit: e.limit.saturating_to(),
			}),
			abi::InvalidCalldata::SELECTOR => abi::InvalidCalldata::abi_decode(data)
				.ok()
				.map(|e| Self::InvalidCalldata(e.reason)),
			abi::Rejected::SELECTOR => abi::Rejected::abi_decode(data)
				.ok()
				.map(|e| Self::Rejected(e.reason)),
			Revert::SELECTOR => Revert::abi_decode(data)
				.ok()
				.map(|e| Self::Rejected(e.reason)),
			_ => None,
		};
		decoded.unwrap_or_else(|| Self::Unknown(Bytes::copy_from_slice(data)))
	}
}
