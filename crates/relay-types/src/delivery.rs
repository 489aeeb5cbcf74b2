//! Transaction delivery types for the relay.
//!
//! Shared by the JSON-RPC and in-process delivery backends so that the service
//! reports receipts the same way regardless of where the forwarder lives.

use alloy::primitives::B256;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Hash of a submitted transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransactionHash(pub B256);

impl TransactionHash {
	/// Abbreviated form used in log lines.
	pub fn short(&self) -> String {
		truncate_id(&self.to_string())
	}
}

impl fmt::Display for TransactionHash {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{:#x}", self.0)
	}
}

/// Transaction receipt containing execution details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionReceipt {
	#[serde(rename = "transactionHash")]
	pub hash: TransactionHash,
	#[serde(rename = "blockNumber")]
	pub block_number: u64,
	#[serde(rename = "gasUsed")]
	pub gas_used: u64,
	/// Whether the transaction executed successfully.
	pub success: bool,
}

/// Shortens a hex identifier to `0x1234..abcd` for logging.
pub fn truncate_id(id: &str) -> String {
	if id.len() <= 14 {
		return id.to_string();
	}
	format!("{}..{}", &id[..6], &id[id.len() - 4..])
}
