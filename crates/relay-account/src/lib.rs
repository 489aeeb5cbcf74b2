//! Signing identities for the relay.
//!
//! An [`AccountInterface`] produces 65-byte signatures over typed-data
//! digests; [`MetaTxBuilder`] uses one to build both layers of a gasless call
//! exactly as a browser wallet would.

use alloy::primitives::{Address, Bytes, B256};
use async_trait::async_trait;
use thiserror::Error;

pub mod builder;

pub mod implementations {
	pub mod local;
}

pub use builder::MetaTxBuilder;
pub use implementations::local::LocalWallet;

#[derive(Debug, Error)]
pub enum AccountError {
	#[error("Signing failed: {0}")]
	SigningFailed(String),
	#[error("Invalid key: {0}")]
	InvalidKey(String),
}

#[async_trait]
pub trait AccountInterface: Send + Sync {
	async fn address(&self) -> Result<Address, AccountError>;

	/// Signs a 32-byte digest without any message prefix.
	async fn sign_hash(&self, hash: &B256) -> Result<Bytes, AccountError>;
}
