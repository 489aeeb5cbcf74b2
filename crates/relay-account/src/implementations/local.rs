//! Local private key wallet.
//!
//! Signs typed-data digests with a key held in memory. Used by the signing kit
//! and by tests.

use crate::{AccountError, AccountInterface};
use alloy::primitives::{Address, Bytes, B256};
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::SignerSync;
use async_trait::async_trait;

pub struct LocalWallet {
	signer: PrivateKeySigner,
}

impl LocalWallet {
	/// Creates a wallet from a hex-encoded private key, with or without `0x`.
	pub fn new(private_key_hex: &str) -> Result<Self, AccountError> {
		let signer = private_key_hex
			.trim()
			.parse::<PrivateKeySigner>()
			.map_err(|e| AccountError::InvalidKey(format!("Invalid private key: {}", e)))?;

		Ok(Self { signer })
	}

	pub fn signer_address(&self) -> Address {
		self.signer.address()
	}

	/// Synchronous variant of [`AccountInterface::sign_hash`].
	pub fn sign_digest(&self, hash: &B256) -> Result<Bytes, AccountError> {
		let signature = self
			.signer
			.sign_hash_sync(hash)
			.map_err(|e| AccountError::SigningFailed(format!("Failed to sign digest: {}", e)))?;
		Ok(Bytes::copy_from_slice(&signature.as_bytes()))
	}
}

impl std::fmt::Debug for LocalWallet {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("LocalWallet")
			.field("address", &self.signer.address())
			.finish_non_exhaustive()
	}
}

#[async_trait]
impl AccountInterface for LocalWallet {
	async fn address(&self) -> Result<Address, AccountError> {
		Ok(self.signer.address())
	}

	async fn sign_hash(&self, hash: &B256) -> Result<Bytes, AccountError> {
		self.sign_digest(hash)
	}
}
