//! Signed payloads for the two verification layers.

use crate::abi::{self, IMetaTxAuthorizer, IRelayForwarder};
use crate::action::{Action, ActionKind};
use crate::errors::ContractError;
use alloy::primitives::{Address, Bytes, B256, U256};
use alloy::sol_types::{Eip712Domain, SolCall, SolStruct};

/// An action signed by the account under the authorizer domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedAuthorization {
	pub account: Address,
	pub action: Action,
	pub nonce: U256,
	pub signature: Bytes,
}

impl SignedAuthorization {
	/// ABI calldata of `authorizeAndExecute` carrying this authorization.
	///
	/// The result is the opaque `encodedCall` wrapped by a relay request.
	pub fn encode_call(&self) -> Bytes {
		let call = IMetaTxAuthorizer::authorizeAndExecuteCall {
			actionKind: self.action.kind().code(),
			account: self.account,
			actionFields: self.action.encode_fields(),
			nonce: self.nonce,
			signature: self.signature.clone(),
		};
		Bytes::from(call.abi_encode())
	}

	/// Parses `authorizeAndExecute` calldata back into an authorization.
	pub fn decode_call(data: &[u8]) -> Result<Self, ContractError> {
		let call = IMetaTxAuthorizer::authorizeAndExecuteCall::abi_decode(data)
			.map_err(|e| ContractError::InvalidCalldata(e.to_string()))?;
		let kind = ActionKind::from_code(call.actionKind).ok_or_else(|| {
			ContractError::InvalidCalldata(format!("unknown action kind {}", call.actionKind))
		})?;
		Ok(Self {
			account: call.account,
			action: Action::decode(kind, &call.actionFields)?,
			nonce: call.nonce,
			signature: call.signature,
		})
	}
}

/// The outer envelope signed under the forwarder domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayRequest {
	pub account: Address,
	pub encoded_call: Bytes,
	pub nonce: U256,
	pub deadline: U256,
	pub signature: Bytes,
}

impl RelayRequest {
	/// Digest the account signs for a relay of `encoded_call`.
	pub fn signing_hash(
		account: Address,
		encoded_call: &Bytes,
		nonce: U256,
		deadline: U256,
		domain: &Eip712Domain,
	) -> B256 {
		abi::ForwardRequest {
			account,
			encodedCall: encoded_call.clone(),
			nonce,
			deadline,
		}
		.eip712_signing_hash(domain)
	}

	pub fn digest(&self, domain: &Eip712Domain) -> B256 {
		Self::signing_hash(
			self.account,
			&self.encoded_call,
			self.nonce,
			self.deadline,
			domain,
		)
	}

	/// ABI calldata of `executeRelay` for this request.
	pub fn to_call(&self) -> Bytes {
		let call = IRelayForwarder::executeRelayCall {
			account: self.account,
			encodedCall: self.encoded_call.clone(),
			nonce: self.nonce,
			deadline: self.deadline,
			signature: self.signature.clone(),
		};
		Bytes::from(call.abi_encode())
	}

	pub fn from_call(data: &[u8]) -> Result<Self, ContractError> {
		let call = IRelayForwarder::executeRelayCall::abi_decode(data)
			.map_err(|e| ContractError::InvalidCalldata(e.to_string()))?;
		Ok(Self {
			account: call.account,
			encoded_call: call.encodedCall,
			nonce: call.nonce,
			deadline: call.deadline,
			signature: call.signature,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::typed_data::forwarder_domain;

	#[test]
	fn test_authorization_calldata_roundtrip() {
		let auth = SignedAuthorization {
			account: Address::repeat_byte(0x42),
			action: Action::edit_job(3, "Senior Rust engineer", 45, "updated"),
			nonce: U256::from(9),
			signature: Bytes::from(vec![1u8; 65]),
		};
		let decoded = SignedAuthorization::decode_call(&auth.encode_call()).unwrap();
		assert_eq!(decoded, auth);
	}

	#[test]
	fn test_unknown_action_kind_is_invalid_calldata() {
		let call = IMetaTxAuthorizer::authorizeAndExecuteCall {
			actionKind: 9,
			account: Address::ZERO,
			actionFields: Bytes::new(),
			nonce: U256::ZERO,
			signature: Bytes::new(),
		};
		let result = SignedAuthorization::decode_call(&call.abi_encode());
		assert!(matches!(result, Err(ContractError::InvalidCalldata(_))));
	}

	#[test]
	fn test_relay_digest_binds_deadline() {
		let domain = forwarder_domain(1, Address::repeat_byte(0xf0));
		let call = Bytes::from(vec![0xab; 8]);
		let account = Address::repeat_byte(0x01);
		assert_ne!(
			RelayRequest::signing_hash(account, &call, U256::ZERO, U256::from(100), &domain),
			RelayRequest::signing_hash(account, &call, U256::ZERO, U256::from(101), &domain)
		);
	}

	#[test]
	fn test_relay_calldata_keeps_full_width_values() {
		let request = RelayRequest {
			account: Address::repeat_byte(0x01),
			encoded_call: Bytes::from(vec![0xab; 8]),
			nonce: U256::from(u64::MAX) + U256::from(1),
			deadline: U256::MAX,
			signature: Bytes::from(vec![1u8; 65]),
		};
		let decoded = RelayRequest::from_call(&request.to_call()).unwrap();
		assert_eq!(decoded, request);
	}
}
