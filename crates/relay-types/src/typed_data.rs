//! EIP-712 domains and signature recovery for the two verification layers.

use crate::errors::ContractError;
use alloy::primitives::{Address, Signature, B256, U256};
use alloy::sol_types::Eip712Domain;

pub const AUTHORIZER_DOMAIN_NAME: &str = "MetaTxAuthorizer";
pub const FORWARDER_DOMAIN_NAME: &str = "RelayForwarder";
pub const DOMAIN_VERSION: &str = "1";

/// Typed-data domain of the meta-transaction authorizer.
pub fn authorizer_domain(chain_id: u64, authorizer: Address) -> Eip712Domain {
	domain(AUTHORIZER_DOMAIN_NAME, chain_id, authorizer)
}

/// Typed-data domain of the relay forwarder.
pub fn forwarder_domain(chain_id: u64, forwarder: Address) -> Eip712Domain {
	domain(FORWARDER_DOMAIN_NAME, chain_id, forwarder)
}

fn domain(name: &'static str, chain_id: u64, verifying_contract: Address) -> Eip712Domain {
	Eip712Domain::new(
		Some(name.into()),
		Some(DOMAIN_VERSION.into()),
		Some(U256::from(chain_id)),
		Some(verifying_contract),
		None,
	)
}

/// Recovers the signer of `digest` from a 65-byte `r || s || v` signature.
///
/// High-s signatures are refused so that a signature has exactly one valid
/// encoding.
pub fn recover_signer(digest: B256, signature: &[u8]) -> Result<Address, ContractError> {
	let signature = Signature::from_raw(signature).map_err(|_| ContractError::InvalidSignature)?;
	if signature.normalize_s().is_some() {
		return Err(ContractError::InvalidSignature);
	}
	signature
		.recover_address_from_prehash(&digest)
		.map_err(|_| ContractError::InvalidSignature)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_domains_differ_per_layer() {
		let contract = Address::repeat_byte(0x11);
		let authorizer = authorizer_domain(1, contract);
		let forwarder = forwarder_domain(1, contract);

		assert_ne!(authorizer.separator(), forwarder.separator());
		assert_ne!(
			authorizer.separator(),
			authorizer_domain(2, contract).separator()
		);
	}

	#[test]
	fn test_recover_rejects_malformed_signature() {
		let result = recover_signer(B256::ZERO, &[0u8; 12]);
		assert_eq!(result, Err(ContractError::InvalidSignature));
	}
}
