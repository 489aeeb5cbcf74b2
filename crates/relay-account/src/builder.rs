//! Client-side construction of gasless calls.

use crate::{AccountError, AccountInterface};
use alloy::primitives::{Address, Bytes, U256};
use relay_types::{
	authorizer_domain, forwarder_domain, Action, RelayRequest, SignedAuthorization,
};

/// Signs both relay layers for one account.
///
/// The authorization is signed under the authorizer domain and encoded as
/// `authorizeAndExecute` calldata; that calldata is then wrapped in a relay
/// envelope signed under the forwarder domain.
pub struct MetaTxBuilder {
	account: Box<dyn AccountInterface>,
	chain_id: u64,
	authorizer: Address,
	forwarder: Address,
}

impl MetaTxBuilder {
	pub fn new(
		account: Box<dyn AccountInterface>,
		chain_id: u64,
		authorizer: Address,
		forwarder: Address,
	) -> Self {
		Self {
			account,
			chain_id,
			authorizer,
			forwarder,
		}
	}

	pub async fn address(&self) -> Result<Address, AccountError> {
		self.account.address().await
	}

	/// Signs `action` with the account's current authorizer nonce.
	pub async fn authorize(
		&self,
		action: Action,
		nonce: u64,
	) -> Result<SignedAuthorization, AccountError> {
		let account = self.account.address().await?;
		let nonce = U256::from(nonce);
		let domain = authorizer_domain(self.chain_id, self.authorizer);
		let digest = action.signing_hash(account, nonce, &domain);
		let signature = self.account.sign_hash(&digest).await?;

		Ok(SignedAuthorization {
			account,
			action,
			nonce,
			signature,
		})
	}

	/// Wraps arbitrary calldata in a forwarder-signed envelope.
	///
	/// `U256::MAX` as deadline never expires.
	pub async fn relay_call(
		&self,
		encoded_call: Bytes,
		nonce: u64,
		deadline: U256,
	) -> Result<RelayRequest, AccountError> {
		let account = self.account.address().await?;
		let nonce = U256::from(nonce);
		let domain = forwarder_domain(self.chain_id, self.forwarder);
		let digest = RelayRequest::signing_hash(account, &encoded_call, nonce, deadline, &domain);
		let signature = self.account.sign_hash(&digest).await?;

		Ok(RelayRequest {
			account,
			encoded_call,
			nonce,
			deadline,
			signature,
		})
	}

	pub async fn relay(
		&self,
		authorization: &SignedAuthorization,
		nonce: u64,
		deadline: U256,
	) -> Result<RelayRequest, AccountError> {
		self.relay_call(authorization.encode_call(), nonce, deadline)
			.await
	}

	/// Signs both layers for `action` in one step.
	pub async fn relay_action(
		&self,
		action: Action,
		authorizer_nonce: u64,
		forwarder_nonce: u64,
		deadline: U256,
	) -> Result<RelayRequest, AccountError> {
		let authorization = self.authorize(action, authorizer_nonce).await?;
		self.relay(&authorization, forwarder_nonce, deadline).await
	}
}
