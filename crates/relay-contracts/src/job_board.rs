//! Minimal job board acting as the relay target.
//!
//! Every relayable entry point takes the acting account explicitly and only
//! accepts the call from that account itself or from a trusted forwarder.

use crate::gas;
use crate::{selector, decode_error, CallFrame, Contract, LedgerEvent};
use alloy::primitives::{Address, Bytes, B256, U256};
use alloy::sol_types::{SolCall, SolValue};
use relay_types::abi::IJobBoard;
use relay_types::{ContractError, UnauthorizedReason};
use std::collections::{BTreeMap, HashSet};

const SECONDS_PER_DAY: u64 = 86_400;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
	pub id: u64,
	pub owner: Address,
	pub organization: String,
	pub title: String,
	pub description: String,
	pub duration_days: u32,
	pub posted_at: u64,
	pub expires_at: u64,
	pub open: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Application {
	pub id: u64,
	pub job_id: u64,
	pub applicant: Address,
	pub applicant_name: String,
	pub cv_digest: B256,
	pub cover_letter: String,
	pub submitted_at: u64,
}

#[derive(Debug, Clone)]
pub struct JobBoard {
	address: Address,
	owner: Address,
	trusted_forwarders: HashSet<Address>,
	jobs: BTreeMap<u64, Job>,
	applications: BTreeMap<u64, Application>,
	applied: HashSet<(u64, Address)>,
}

impl JobBoard {
	pub fn new(address: Address, owner: Address) -> Self {
		Self {
			address,
			owner,
			trusted_forwarders: HashSet::new(),
			jobs: BTreeMap::new(),
			applications: BTreeMap::new(),
			applied: HashSet::new(),
		}
	}

	pub fn owner(&self) -> Address {
		self.owner
	}

	pub fn job(&self, id: u64) -> Option<&Job> {
		self.jobs.get(&id)
	}

	pub fn job_count(&self) -> u64 {
		self.jobs.len() as u64
	}

	pub fn applications(&self, job_id: u64) -> impl Iterator<Item = &Application> {
		self.applications
			.values()
			.filter(move |application| application.job_id == job_id)
	}

	/// Grants trust directly, used when deploying.
	pub fn trust_forwarder(&mut self, forwarder: Address) {
		self.trusted_forwarders.insert(forwarder);
	}

	fn authorize_actor(&self, frame: &mut CallFrame<'_>, actor: Address) -> Result<(), ContractError> {
		frame.gas.charge(gas::SLOAD)?;
		if frame.caller == actor || self.trusted_forwarders.contains(&frame.caller) {
			Ok(())
		} else {
			Err(ContractError::Unauthorized(
				UnauthorizedReason::UntrustedForwarder,
			))
		}
	}

	fn owned_open_job(
		&mut self,
		frame: &mut CallFrame<'_>,
		job_id: U256,
		actor: Address,
	) -> Result<&mut Job, ContractError> {
		frame.gas.charge(gas::SLOAD * 2)?;
		let job = job_id
			.try_into()
			.ok()
			.and_then(|id: u64| self.jobs.get_mut(&id))
			.ok_or_else(|| ContractError::Rejected("job not found".to_string()))?;
		if job.owner != actor {
			return Err(ContractError::Rejected("not the job owner".to_string()));
		}
		if !job.open {
			return Err(ContractError::Rejected("job is closed".to_string()));
		}
		Ok(job)
	}

	fn post_job(
		&mut self,
		frame: &mut CallFrame<'_>,
		call: IJobBoard::postJobForCall,
	) -> Result<Bytes, ContractError> {
		self.authorize_actor(frame, call.actor)?;
		if call.title.trim().is_empty() {
			return Err(ContractError::Rejected("title is required".to_string()));
		}
		if call.durationDays == 0 {
			return Err(ContractError::Rejected("duration must be at least one day".to_string()));
		}

		let id = self.job_count() + 1;
		frame.gas.charge(
			gas::SSTORE_SET * 4
				+ gas::storage_words(call.organization.len())
				+ gas::storage_words(call.title.len())
				+ gas::storage_words(call.description.len()),
		)?;
		let posted_at = frame.env.timestamp;
		self.jobs.insert(
			id,
			Job {
				id,
				owner: call.actor,
				organization: call.organization,
				title: call.title,
				description: call.description,
				duration_days: call.durationDays,
				posted_at,
				expires_at: posted_at + u64::from(call.durationDays) * SECONDS_PER_DAY,
				open: true,
			},
		);
		frame.emit(LedgerEvent::JobPosted {
			job_id: id,
			owner: call.actor,
		})?;

		Ok(Bytes::from(U256::from(id).abi_encode()))
	}

	fn edit_job(
		&mut self,
		frame: &mut CallFrame<'_>,
		call: IJobBoard::editJobForCall,
	) -> Result<Bytes, ContractError> {
		self.authorize_actor(frame, call.actor)?;
		if call.title.trim().is_empty() {
			return Err(ContractError::Rejected("title is required".to_string()));
		}
		let timestamp = frame.env.timestamp;
		let job = self.owned_open_job(frame, call.jobId, call.actor)?;
		let cost = gas::SSTORE_RESET * 2
			+ gas::storage_words(call.title.len())
			+ gas::storage_words(call.description.len());
		job.title = call.title;
		job.description = call.description;
		job.duration_days = call.durationDays;
		job.expires_at = timestamp + u64::from(call.durationDays) * SECONDS_PER_DAY;
		let job_id = job.id;

		frame.gas.charge(cost)?;
		frame.emit(LedgerEvent::JobEdited { job_id })?;
		Ok(Bytes::new())
	}

	fn close_job(
		&mut self,
		frame: &mut CallFrame<'_>,
		call: IJobBoard::closeJobForCall,
	) -> Result<Bytes, ContractError> {
		self.authorize_actor(frame, call.actor)?;
		let job = self.owned_open_job(frame, call.jobId, call.actor)?;
		job.open = false;
		let job_id = job.id;

		frame.gas.charge(gas::SSTORE_RESET)?;
		frame.emit(LedgerEvent::JobClosed { job_id })?;
		Ok(Bytes::new())
	}

	fn submit_application(
		&mut self,
		frame: &mut CallFrame<'_>,
		call: IJobBoard::submitApplicationForCall,
	) -> Result<Bytes, ContractError> {
		self.authorize_actor(frame, call.actor)?;
		frame.gas.charge(gas::SLOAD * 2)?;
		let job = call
			.jobId
			.try_into()
			.ok()
			.and_then(|id: u64| self.jobs.get(&id))
			.ok_or_else(|| ContractError::Rejected("job not found".to_string()))?;
		if !job.open {
			return Err(ContractError::Rejected("job is closed".to_string()));
		}
		if frame.env.timestamp > job.expires_at {
			return Err(ContractError::Rejected("job has expired".to_string()));
		}
		if call.applicantName.trim().is_empty() {
			return Err(ContractError::Rejected("applicant name is required".to_string()));
		}
		let job_id = job.id;
		if !self.applied.insert((job_id, call.actor)) {
			return Err(ContractError::Rejected("already applied to this job".to_string()));
		}

		let id = self.applications.len() as u64 + 1;
		frame.gas.charge(
			gas::SSTORE_SET * 4
				+ gas::storage_words(call.applicantName.len())
				+ gas::storage_words(call.coverLetter.len()),
		)?;
		self.applications.insert(
			id,
			Application {
				id,
				job_id,
				applicant: call.actor,
				applicant_name: call.applicantName,
				cv_digest: call.cvDigest,
				cover_letter: call.coverLetter,
				submitted_at: frame.env.timestamp,
			},
		);
		frame.emit(LedgerEvent::ApplicationSubmitted {
			job_id,
			application_id: id,
			applicant: call.actor,
		})?;

		Ok(Bytes::from(U256::from(id).abi_encode()))
	}

	fn set_trusted_forwarder(
		&mut self,
		frame: &mut CallFrame<'_>,
		call: IJobBoard::setTrustedForwarderCall,
	) -> Result<Bytes, ContractError> {
		if frame.caller != self.owner {
			return Err(ContractError::Unauthorized(UnauthorizedReason::NotOwner));
		}
		frame.gas.charge(gas::SSTORE_SET)?;
		if call.trusted {
			self.trusted_forwarders.insert(call.forwarder);
		} else {
			self.trusted_forwarders.remove(&call.forwarder);
		}
		frame.emit(LedgerEvent::TrustedForwarderSet {
			forwarder: call.forwarder,
			trusted: call.trusted,
		})?;
		Ok(Bytes::new())
	}
}

impl Contract for JobBoard {
	fn address(&self) -> Address {
		self.address
	}

	fn call(&mut self, frame: &mut CallFrame<'_>, input: &[u8]) -> Result<Bytes, ContractError> {
		if input.is_empty() {
			return Ok(Bytes::new());
		}
		frame.non_payable()?;
		match selector(input)? {
			IJobBoard::postJobForCall::SELECTOR => {
				let call = IJobBoard::postJobForCall::abi_decode(input).map_err(decode_error)?;
				self.post_job(frame, call)
			}
			IJobBoard::editJobForCall::SELECTOR => {
				let call = IJobBoard::editJobForCall::abi_decode(input).map_err(decode_error)?;
				self.edit_job(frame, call)
			}
			IJobBoard::closeJobForCall::SELECTOR => {
				let call = IJobBoard::closeJobForCall::abi_decode(input).map_err(decode_error)?;
				self.close_job(frame, call)
			}
			IJobBoard::submitApplicationForCall::SELECTOR => {
				let call =
					IJobBoard::submitApplicationForCall::abi_decode(input).map_err(decode_error)?;
				self.submit_application(frame, call)
			}
			IJobBoard::setTrustedForwarderCall::SELECTOR => {
				let call =
					IJobBoard::setTrustedForwarderCall::abi_decode(input).map_err(decode_error)?;
				self.set_trusted_forwarder(frame, call)
			}
			IJobBoard::jobCountCall::SELECTOR => {
				frame.gas.charge(gas::SLOAD)?;
				Ok(Bytes::from(U256::from(self.job_count()).abi_encode()))
			}
			other => Err(ContractError::InvalidCalldata(format!(
				"unknown selector 0x{}",
				hex::encode(other)
			))),
		}
	}
}
