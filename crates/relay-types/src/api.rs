//! HTTP wire types of the relay submission service.
//!
//! Field names follow the browser client (`userAddress`, `callData`, ...).
//! Incoming fields are kept loose so that a malformed body is reported as a
//! validation error with the offending field instead of a generic JSON error.

use crate::delivery::TransactionReceipt;
use crate::request::RelayRequest;
use crate::validation::ValidationError;
use alloy::primitives::{Address, Bytes, U256};
use serde::{Deserialize, Serialize};

/// Length of an `r || s || v` ECDSA signature.
pub const SIGNATURE_LENGTH: usize = 65;

/// Deadline as sent by clients: a JSON number or a decimal string. Strings
/// carry values past `u64`, up to `uint256` max.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DeadlineValue {
	Number(u64),
	Text(String),
}

/// Body of `POST /relay`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RelaySubmission {
	#[serde(rename = "userAddress")]
	pub user_address: Option<String>,
	/// Hex calldata of `authorizeAndExecute`.
	#[serde(rename = "callData")]
	pub call_data: Option<String>,
	pub deadline: Option<DeadlineValue>,
	/// Forwarder-domain signature over the relay envelope.
	#[serde(rename = "relayerSignature")]
	pub relayer_signature: Option<String>,
	/// Forwarder nonce the envelope was signed with. Read from the forwarder
	/// when absent.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub nonce: Option<u64>,
}

/// A submission whose fields are all present and well-formed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedSubmission {
	pub account: Address,
	pub encoded_call: Bytes,
	pub deadline: U256,
	pub signature: Bytes,
	pub nonce: Option<u64>,
}

impl RelaySubmission {
	/// Checks presence and shape of every field.
	pub fn validate(&self) -> Result<ValidatedSubmission, ValidationError> {
		let user_address = required("userAddress", &self.user_address)?;
		let account = user_address
			.parse::<Address>()
			.map_err(|e| invalid("userAddress", e))?;

		let call_data = required("callData", &self.call_data)?;
		let encoded_call = parse_hex("callData", call_data)?;
		if encoded_call.len() < 4 {
			return Err(invalid("callData", "must contain at least a function selector"));
		}

		let deadline = match &self.deadline {
			None => return Err(ValidationError::MissingField("deadline".to_string())),
			Some(DeadlineValue::Number(value)) => U256::from(*value),
			Some(DeadlineValue::Text(text)) => U256::from_str_radix(text.trim(), 10)
				.map_err(|e| invalid("deadline", e))?,
		};

		let signature_hex = required("relayerSignature", &self.relayer_signature)?;
		let signature = parse_hex("relayerSignature", signature_hex)?;
		if signature.len() != SIGNATURE_LENGTH {
			return Err(invalid(
				"relayerSignature",
				format!("expected {} bytes, got {}", SIGNATURE_LENGTH, signature.len()),
			));
		}

		Ok(ValidatedSubmission {
			account,
			encoded_call,
			deadline,
			signature,
			nonce: self.nonce,
		})
	}
}

/// The body a browser client sends for an already-signed relay request.
impl From<&RelayRequest> for RelaySubmission {
	fn from(request: &RelayRequest) -> Self {
		Self {
			user_address: Some(format!("{:#x}", request.account)),
			call_data: Some(format!("0x{}", hex::encode(&request.encoded_call))),
			deadline: Some(match u64::try_from(request.deadline) {
				Ok(value) => DeadlineValue::Number(value),
				Err(_) => DeadlineValue::Text(request.deadline.to_string()),
			}),
			relayer_signature: Some(format!("0x{}", hex::encode(&request.signature))),
			nonce: u64::try_from(request.nonce).ok(),
		}
	}
}

fn required<'a>(field: &str, value: &'a Option<String>) -> Result<&'a str, ValidationError> {
	match value.as_deref().map(str::trim) {
		Some(v) if !v.is_empty() => Ok(v),
		_ => Err(ValidationError::MissingField(field.to_string())),
	}
}

fn parse_hex(field: &str, value: &str) -> Result<Bytes, ValidationError> {
	let digits = value
		.strip_prefix("0x")
		.ok_or_else(|| invalid(field, "must be 0x-prefixed hex"))?;
	hex::decode(digits)
		.map(Bytes::from)
		.map_err(|e| invalid(field, e))
}

fn invalid(field: &str, message: impl ToString) -> ValidationError {
	ValidationError::InvalidValue {
		field: field.to_string(),
		message: message.to_string(),
	}
}

/// Body of a successful `POST /relay`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelaySuccess {
	pub success: bool,
	#[serde(rename = "transactionHash")]
	pub transaction_hash: String,
	pub receipt: TransactionReceipt,
}

/// Error body returned for every non-2xx response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
	/// Short error category shown to end users.
	pub error: String,
	pub details: String,
	/// Raw node or ledger error, only set for simulation failures.
	#[serde(rename = "fullError", skip_serializing_if = "Option::is_none")]
	pub full_error: Option<String>,
	/// Whether refetching the nonce and re-signing can succeed.
	pub retryable: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
	pub status: String,
	pub configured: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NonceResponse {
	pub address: String,
	pub nonce: u64,
}

#[cfg(test)]
mod tests {
	use super::*;

	fn body() -> RelaySubmission {
		RelaySubmission {
			user_address: Some(format!("{:#x}", Address::repeat_byte(0x11))),
			call_data: Some("0xdeadbeef00".to_string()),
			deadline: Some(DeadlineValue::Number(1_700_000_000)),
			relayer_signature: Some(format!("0x{}", "ab".repeat(65))),
			nonce: None,
		}
	}

	#[test]
	fn test_valid_submission() {
		let validated = body().validate().unwrap();
		assert_eq!(validated.account, Address::repeat_byte(0x11));
		assert_eq!(validated.encoded_call.len(), 5);
		assert_eq!(validated.deadline, U256::from(1_700_000_000u64));
		assert_eq!(validated.nonce, None);
	}

	#[test]
	fn test_deadline_accepts_decimal_string() {
		let json = serde_json::json!({
			"userAddress": format!("{:#x}", Address::repeat_byte(0x11)),
			"callData": "0xdeadbeef",
			"deadline": "1700000123",
			"relayerSignature": format!("0x{}", "cd".repeat(65)),
			"nonce": 4
		});
		let submission: RelaySubmission = serde_json::from_value(json).unwrap();
		let validated = submission.validate().unwrap();
		assert_eq!(validated.deadline, U256::from(1_700_000_123u64));
		assert_eq!(validated.nonce, Some(4));
	}

	#[test]
	fn test_deadline_string_beyond_u64() {
		let mut never = body();
		never.deadline = Some(DeadlineValue::Text(U256::MAX.to_string()));
		assert_eq!(never.validate().unwrap().deadline, U256::MAX);

		let mut overflow = body();
		overflow.deadline = Some(DeadlineValue::Text(format!("{}0", U256::MAX)));
		assert!(matches!(
			overflow.validate(),
			Err(ValidationError::InvalidValue { .. })
		));
	}

	#[test]
	fn test_missing_fields_are_named() {
		let mut missing_sig = body();
		missing_sig.relayer_signature = None;
		match missing_sig.validate() {
			Err(ValidationError::MissingField(field)) => assert_eq!(field, "relayerSignature"),
			other => panic!("Expected missing field, got {:?}", other),
		}

		let mut blank_address = body();
		blank_address.user_address = Some("  ".to_string());
		assert!(matches!(
			blank_address.validate(),
			Err(ValidationError::MissingField(_))
		));
	}

	#[test]
	fn test_malformed_fields_are_rejected() {
		let mut bad_address = body();
		bad_address.user_address = Some("0x1234".to_string());
		assert!(matches!(
			bad_address.validate(),
			Err(ValidationError::InvalidValue { .. })
		));

		let mut short_sig = body();
		short_sig.relayer_signature = Some("0xabcd".to_string());
		assert!(matches!(
			short_sig.validate(),
			Err(ValidationError::InvalidValue { .. })
		));

		let mut unprefixed = body();
		unprefixed.call_data = Some("deadbeef".to_string());
		assert!(matches!(
			unprefixed.validate(),
			Err(ValidationError::InvalidValue { .. })
		));

		let mut bad_deadline = body();
		bad_deadline.deadline = Some(DeadlineValue::Text("tomorrow".to_string()));
		assert!(matches!(
			bad_deadline.validate(),
			Err(ValidationError::InvalidValue { .. })
		));
	}
}
