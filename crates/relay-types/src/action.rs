//! Actions a user can authorize through the relay.
//!
//! Each action kind owns its typed-data struct, so the set of fields bound into
//! the signature is decided per variant. Free-text payloads (job description,
//! cover letter) travel in `action_fields` but are not signed.

use crate::abi::{self, IJobBoard};
use crate::errors::ContractError;
use alloy::primitives::{Address, Bytes, B256, U256};
use alloy::sol_types::{Eip712Domain, SolCall, SolStruct, SolValue};
use std::fmt;

/// Closed set of action kinds understood by the authorizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ActionKind {
	PostJob = 0,
	EditJob = 1,
	CloseJob = 2,
	SubmitApplication = 3,
}

impl ActionKind {
	pub fn from_code(code: u8) -> Option<Self> {
		match code {
			0 => Some(Self::PostJob),
			1 => Some(Self::EditJob),
			2 => Some(Self::CloseJob),
			3 => Some(Self::SubmitApplication),
			_ => None,
		}
	}

	pub fn code(self) -> u8 {
		self as u8
	}

	/// Gas the authorizer budgets for the nested target call of this kind.
	///
	/// Compared against the authorizer's cap before any state is touched.
	pub fn projected_gas(self) -> u64 {
		match self {
			Self::PostJob => 180_000,
			Self::EditJob => 90_000,
			Self::CloseJob => 40_000,
			Self::SubmitApplication => 150_000,
		}
	}
}

impl fmt::Display for ActionKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			Self::PostJob => "PostJob",
			Self::EditJob => "EditJob",
			Self::CloseJob => "CloseJob",
			Self::SubmitApplication => "SubmitApplication",
		};
		f.write_str(name)
	}
}

/// A fully-specified action together with its parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
	PostJob(abi::PostJobFields),
	EditJob(abi::EditJobFields),
	CloseJob(abi::CloseJobFields),
	SubmitApplication(abi::SubmitApplicationFields),
}

impl Action {
	pub fn post_job(
		organization: impl Into<String>,
		title: impl Into<String>,
		duration_days: u32,
		description: impl Into<String>,
	) -> Self {
		Self::PostJob(abi::PostJobFields {
			organization: organization.into(),
			title: title.into(),
			durationDays: duration_days,
			description: description.into(),
		})
	}

	pub fn edit_job(
		job_id: u64,
		title: impl Into<String>,
		duration_days: u32,
		description: impl Into<String>,
	) -> Self {
		Self::EditJob(abi::EditJobFields {
			jobId: U256::from(job_id),
			title: title.into(),
			durationDays: duration_days,
			description: description.into(),
		})
	}

	pub fn close_job(job_id: u64) -> Self {
		Self::CloseJob(abi::CloseJobFields {
			jobId: U256::from(job_id),
		})
	}

	pub fn submit_application(
		job_id: u64,
		applicant_name: impl Into<String>,
		cv_digest: B256,
		cover_letter: impl Into<String>,
	) -> Self {
		Self::SubmitApplication(abi::SubmitApplicationFields {
			jobId: U256::from(job_id),
			applicantName: applicant_name.into(),
			cvDigest: cv_digest,
			coverLetter: cover_letter.into(),
		})
	}

	pub fn kind(&self) -> ActionKind {
		match self {
			Self::PostJob(_) => ActionKind::PostJob,
			Self::EditJob(_) => ActionKind::EditJob,
			Self::CloseJob(_) => ActionKind::CloseJob,
			Self::SubmitApplication(_) => ActionKind::SubmitApplication,
		}
	}

	/// ABI-encodes the parameter tuple carried as `actionFields`.
	pub fn encode_fields(&self) -> Bytes {
		let encoded = match self {
			Self::PostJob(fields) => fields.abi_encode(),
			Self::EditJob(fields) => fields.abi_encode(),
			Self::CloseJob(fields) => fields.abi_encode(),
			Self::SubmitApplication(fields) => fields.abi_encode(),
		};
		Bytes::from(encoded)
	}

	/// Decodes `actionFields` for the given kind.
	pub fn decode(kind: ActionKind, fields: &[u8]) -> Result<Self, ContractError> {
		let invalid = |e: alloy::sol_types::Error| {
			ContractError::InvalidCalldata(format!("{} fields: {}", kind, e))
		};
		let action = match kind {
			ActionKind::PostJob => {
				Self::PostJob(<abi::PostJobFields as SolValue>::abi_decode(fields).map_err(invalid)?)
			},
			ActionKind::EditJob => {
				Self::EditJob(<abi::EditJobFields as SolValue>::abi_decode(fields).map_err(invalid)?)
			},
			ActionKind::CloseJob => Self::CloseJob(
				<abi::CloseJobFields as SolValue>::abi_decode(fields).map_err(invalid)?,
			),
			ActionKind::SubmitApplication => Self::SubmitApplication(
				<abi::SubmitApplicationFields as SolValue>::abi_decode(fields).map_err(invalid)?,
			),
		};
		Ok(action)
	}

	/// Typed-data digest of the signed subset of this action.
	pub fn signing_hash(&self, account: Address, nonce: U256, domain: &Eip712Domain) -> B256 {
		match self {
			Self::PostJob(fields) => abi::PostJob {
				account,
				organization: fields.organization.clone(),
				title: fields.title.clone(),
				durationDays: fields.durationDays,
				nonce,
			}
			.eip712_signing_hash(domain),
			Self::EditJob(fields) => abi::EditJob {
				account,
				jobId: fields.jobId,
				title: fields.title.clone(),
				durationDays: fields.durationDays,
				nonce,
			}
			.eip712_signing_hash(domain),
			Self::CloseJob(fields) => abi::CloseJob {
				account,
				jobId: fields.jobId,
				nonce,
			}
			.eip712_signing_hash(domain),
			Self::SubmitApplication(fields) => abi::SubmitApplication {
				account,
				jobId: fields.jobId,
				applicantName: fields.applicantName.clone(),
				cvDigest: fields.cvDigest,
				nonce,
			}
			.eip712_signing_hash(domain),
		}
	}

	/// Calldata of the target entry point that performs this action for `actor`.
	pub fn target_call(&self, actor: Address) -> Bytes {
		let encoded = match self {
			Self::PostJob(f) => IJobBoard::postJobForCall {
				actor,
				organization: f.organization.clone(),
				title: f.title.clone(),
				durationDays: f.durationDays,
				description: f.description.clone(),
			}
			.abi_encode(),
			Self::EditJob(f) => IJobBoard::editJobForCall {
				actor,
				jobId: f.jobId,
				title: f.title.clone(),
				durationDays: f.durationDays,
				description: f.description.clone(),
			}
			.abi_encode(),
			Self::CloseJob(f) => IJobBoard::closeJobForCall {
				actor,
				jobId: f.jobId,
			}
			.abi_encode(),
			Self::SubmitApplication(f) => IJobBoard::submitApplicationForCall {
				actor,
				jobId: f.jobId,
				applicantName: f.applicantName.clone(),
				cvDigest: f.cvDigest,
				coverLetter: f.coverLetter.clone(),
			}
			.abi_encode(),
		};
		Bytes::from(encoded)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::typed_data::authorizer_domain;

	fn domain() -> Eip712Domain {
		authorizer_domain(31337, Address::repeat_byte(0xaa))
	}

	#[test]
	fn test_decode_rejects_fields_of_another_kind() {
		let close = Action::close_job(7).encode_fields();
		let result = Action::decode(ActionKind::PostJob, &close);
		assert!(matches!(result, Err(ContractError::InvalidCalldata(_))));

		let decoded = Action::decode(ActionKind::CloseJob, &close).unwrap();
		assert_eq!(decoded, Action::close_job(7));
	}

	#[test]
	fn test_unsigned_fields_do_not_change_digest() {
		let account = Address::repeat_byte(0x01);
		let short = Action::post_job("Acme", "Rust engineer", 30, "short");
		let long = Action::post_job("Acme", "Rust engineer", 30, "a much longer description");

		assert_eq!(
			short.signing_hash(account, U256::ZERO, &domain()),
			long.signing_hash(account, U256::ZERO, &domain())
		);
		assert_ne!(
			short.signing_hash(account, U256::ZERO, &domain()),
			short.signing_hash(account, U256::from(1), &domain())
		);
	}

	#[test]
	fn test_signed_fields_change_digest() {
		let account = Address::repeat_byte(0x01);
		let a = Action::submit_application(1, "Ada", B256::repeat_byte(1), "hello");
		let b = Action::submit_application(2, "Ada", B256::repeat_byte(1), "hello");
		assert_ne!(
			a.signing_hash(account, U256::ZERO, &domain()),
			b.signing_hash(account, U256::ZERO, &domain())
		);
	}

	#[test]
	fn test_kind_codes() {
		for code in 0u8..4 {
			let kind = ActionKind::from_code(code).unwrap();
			assert_eq!(kind.code(), code);
		}
		assert_eq!(ActionKind::from_code(4), None);
	}
}
