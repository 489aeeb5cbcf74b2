//! End-to-end behaviour of the three contracts on the in-process ledger.

use crate::ledger::{GenesisConfig, Ledger, LedgerReceipt, LedgerTransaction};
use crate::{LedgerEvent, ReimbursementPolicy};
use alloy::primitives::{Address, Bytes, B256, U256};
use alloy::sol_types::SolCall;
use relay_account::LocalWallet;
use relay_types::abi::{IJobBoard, IMetaTxAuthorizer, IRelayForwarder};
use relay_types::{
	authorizer_domain, forwarder_domain, Action, ContractError, RelayRequest,
	SignedAuthorization, UnauthorizedReason,
};

const OWNER_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
const USER_KEY: &str = "0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d";
const RELAYER_KEY: &str = "0x5de4111afa1a4b94908f83103eb1f1706367c2e68ca870fc3fb9a804cdab365a";
const OTHER_KEY: &str = "0x7c852118294e51e653712a81e05800f419141751be58f605c371e15141b007a6";

const GAS_LIMIT: u64 = 2_000_000;

fn eth(amount: u64) -> U256 {
	U256::from(amount) * U256::from(10u64).pow(U256::from(18))
}

struct Fixture {
	ledger: Ledger,
	owner: LocalWallet,
	user: LocalWallet,
	relayer: LocalWallet,
	other: LocalWallet,
}

impl Fixture {
	fn new(policy: ReimbursementPolicy, funding: U256) -> Self {
		let owner = LocalWallet::new(OWNER_KEY).unwrap();
		let user = LocalWallet::new(USER_KEY).unwrap();
		let relayer = LocalWallet::new(RELAYER_KEY).unwrap();
		let other = LocalWallet::new(OTHER_KEY).unwrap();

		let ledger = Ledger::genesis(GenesisConfig {
			owner: owner.signer_address(),
			reimbursement_policy: policy,
			funding,
			prefunded: vec![
				(owner.signer_address(), eth(10)),
				(relayer.signer_address(), eth(10)),
				(other.signer_address(), eth(10)),
				(user.signer_address(), eth(1)),
			],
			..GenesisConfig::default()
		});

		Self {
			ledger,
			owner,
			user,
			relayer,
			other,
		}
	}

	fn funded() -> Self {
		Self::new(ReimbursementPolicy::BestEffort, eth(1))
	}

	fn user(&self) -> Address {
		self.user.signer_address()
	}

	fn now(&self) -> u64 {
		self.ledger.timestamp()
	}

	fn authorize(&self, signer: &LocalWallet, account: Address, action: Action, nonce: u64) -> SignedAuthorization {
		let nonce = U256::from(nonce);
		let digest = action.signing_hash(account, nonce, self.ledger.authorizer().domain());
		SignedAuthorization {
			account,
			action,
			nonce,
			signature: signer.sign_digest(&digest).unwrap(),
		}
	}

	fn wrap(
		&self,
		signer: &LocalWallet,
		account: Address,
		encoded_call: Bytes,
		nonce: u64,
		deadline: u64,
	) -> RelayRequest {
		self.wrap_until(signer, account, encoded_call, nonce, U256::from(deadline))
	}

	fn wrap_until(
		&self,
		signer: &LocalWallet,
		account: Address,
		encoded_call: Bytes,
		nonce: u64,
		deadline: U256,
	) -> RelayRequest {
		let nonce = U256::from(nonce);
		let digest = RelayRequest::signing_hash(
			account,
			&encoded_call,
			nonce,
			deadline,
			self.ledger.forwarder().domain(),
		);
		RelayRequest {
			account,
			encoded_call,
			nonce,
			deadline,
			signature: signer.sign_digest(&digest).unwrap(),
		}
	}

	/// Both layers signed by the user with their current nonces.
	fn user_relay(&self, action: Action) -> RelayRequest {
		let user = self.user();
		let auth = self.authorize(&self.user, user, action, self.ledger.authorizer().nonce(&user));
		self.wrap(
			&self.user,
			user,
			auth.encode_call(),
			self.ledger.forwarder().nonce(&user),
			self.now() + 3600,
		)
	}

	fn send(&mut self, from: Address, to: Address, input: Bytes) -> LedgerReceipt {
		self.ledger
			.transact(LedgerTransaction::call(from, to, input, GAS_LIMIT))
			.unwrap()
	}

	fn submit(&mut self, request: &RelayRequest) -> LedgerReceipt {
		let (relayer, forwarder) = (self.relayer.signer_address(), self.ledger.forwarder_address());
		self.send(relayer, forwarder, request.to_call())
	}

	fn owner_call(&mut self, to: Address, input: Vec<u8>) -> LedgerReceipt {
		let owner = self.owner.signer_address();
		self.send(owner, to, Bytes::from(input))
	}
}

fn revert(receipt: &LedgerReceipt) -> ContractError {
	assert!(!receipt.success, "expected revert, got success");
	receipt.revert.clone().unwrap()
}

fn post_acme() -> Action {
	Action::post_job("Acme", "Engineer", 30, "Build the relay")
}

#[test]
fn test_relayed_post_job_consumes_both_nonces() {
	let mut f = Fixture::funded();
	let user = f.user();
	let request = f.user_relay(post_acme());

	let receipt = f.submit(&request);

	assert!(receipt.success, "{:?}", receipt.revert);
	assert_eq!(f.ledger.authorizer().nonce(&user), 1);
	assert_eq!(f.ledger.forwarder().nonce(&user), 1);
	assert_eq!(f.ledger.job_board().job_count(), 1);
	let job = f.ledger.job_board().job(1).unwrap();
	assert_eq!(job.owner, user);
	assert_eq!(job.organization, "Acme");
	assert_eq!(job.title, "Engineer");
	assert_eq!(job.duration_days, 30);
	assert!(job.open);

	assert!(receipt
		.events
		.contains(&LedgerEvent::JobPosted { job_id: 1, owner: user }));
	assert!(receipt.events.iter().any(|e| matches!(
		e,
		LedgerEvent::RelayExecuted { account, nonce: 0, .. } if *account == user
	)));
}

#[test]
fn test_replayed_relay_is_rejected_without_effect() {
	let mut f = Fixture::funded();
	let user = f.user();
	let request = f.user_relay(post_acme());
	assert!(f.submit(&request).success);

	let replay = f.submit(&request);

	assert_eq!(
		revert(&replay),
		ContractError::StaleNonce {
			expected: 1,
			provided: 0
		}
	);
	assert_eq!(f.ledger.job_board().job_count(), 1);
	assert_eq!(f.ledger.authorizer().nonce(&user), 1);
	assert_eq!(f.ledger.forwarder().nonce(&user), 1);
}

#[test]
fn test_direct_call_from_non_sponsor_is_unauthorized() {
	let mut f = Fixture::funded();
	let user = f.user();
	let auth = f.authorize(&f.user, user, post_acme(), 0);
	let (other, authorizer) = (f.other.signer_address(), f.ledger.authorizer_address());

	let receipt = f.send(other, authorizer, auth.encode_call());

	assert_eq!(
		revert(&receipt),
		ContractError::Unauthorized(UnauthorizedReason::NotSponsor)
	);
	assert_eq!(f.ledger.authorizer().nonce(&user), 0);
	assert_eq!(f.ledger.job_board().job_count(), 0);
	assert!(f.ledger.authorizer().sponsor(&other).is_none());
}

#[test]
fn test_owner_may_sponsor_directly() {
	let mut f = Fixture::funded();
	let user = f.user();
	let auth = f.authorize(&f.user, user, post_acme(), 0);
	let authorizer = f.ledger.authorizer_address();

	let receipt = f.owner_call(authorizer, auth.encode_call().to_vec());

	assert!(receipt.success, "{:?}", receipt.revert);
	assert_eq!(f.ledger.authorizer().nonce(&user), 1);
	assert_eq!(f.ledger.forwarder().nonce(&user), 0);
	let owner = f.owner.signer_address();
	assert!(f.ledger.authorizer().sponsor(&owner).unwrap().cumulative_gas_spent > 0);
}

#[test]
fn test_expired_deadline_is_rejected_before_signature_check() {
	let mut f = Fixture::funded();
	let user = f.user();
	let auth = f.authorize(&f.user, user, post_acme(), 0);
	let request = RelayRequest {
		account: user,
		encoded_call: auth.encode_call(),
		nonce: U256::ZERO,
		deadline: U256::from(f.now() - 10),
		signature: Bytes::from(vec![0u8; 65]),
	};

	let receipt = f.submit(&request);

	assert_eq!(
		revert(&receipt),
		ContractError::Expired {
			deadline: f.now() - 10,
			now: f.now()
		}
	);
	assert_eq!(f.ledger.forwarder().nonce(&user), 0);
}

#[test]
fn test_deadline_boundary() {
	let mut f = Fixture::funded();
	let user = f.user();
	let auth = f.authorize(&f.user, user, post_acme(), 0);
	let now = f.now();

	let late = f.wrap(&f.user, user, auth.encode_call(), 0, now - 1);
	assert!(matches!(revert(&f.submit(&late)), ContractError::Expired { .. }));

	let exact = f.wrap(&f.user, user, auth.encode_call(), 0, now);
	let receipt = f.submit(&exact);
	assert!(receipt.success, "{:?}", receipt.revert);
}

#[test]
fn test_max_uint_deadline_never_expires() {
	let mut f = Fixture::funded();
	let user = f.user();
	let auth = f.authorize(&f.user, user, post_acme(), 0);
	let request = f.wrap_until(&f.user, user, auth.encode_call(), 0, U256::MAX);
	assert_eq!(RelayRequest::from_call(&request.to_call()).unwrap().deadline, U256::MAX);

	let receipt = f.submit(&request);

	assert!(receipt.success, "{:?}", receipt.revert);
	assert_eq!(f.ledger.forwarder().nonce(&user), 1);
	assert_eq!(f.ledger.job_board().job_count(), 1);
}

#[test]
fn test_nonce_beyond_u64_is_stale() {
	let mut f = Fixture::funded();
	let user = f.user();
	let auth = f.authorize(&f.user, user, post_acme(), 0);
	let deadline = U256::from(f.now() + 60);
	let nonce = U256::from(u64::MAX) + U256::from(1);
	let digest = RelayRequest::signing_hash(
		user,
		&auth.encode_call(),
		nonce,
		deadline,
		f.ledger.forwarder().domain(),
	);
	let request = RelayRequest {
		account: user,
		encoded_call: auth.encode_call(),
		nonce,
		deadline,
		signature: f.user.sign_digest(&digest).unwrap(),
	};

	assert!(matches!(
		revert(&f.submit(&request)),
		ContractError::StaleNonce { expected: 0, .. }
	));
}

#[test]
fn test_nonce_must_match_stored_counter() {
	let mut f = Fixture::funded();
	let user = f.user();
	let auth = f.authorize(&f.user, user, post_acme(), 0);
	let deadline = f.now() + 60;

	let ahead = f.wrap(&f.user, user, auth.encode_call(), 1, deadline);
	assert_eq!(
		revert(&f.submit(&ahead)),
		ContractError::StaleNonce {
			expected: 0,
			provided: 1
		}
	);

	// Inner authorization signed for the wrong authorizer nonce.
	let stale_auth = f.authorize(&f.user, user, post_acme(), 3);
	let request = f.wrap(&f.user, user, stale_auth.encode_call(), 0, deadline);
	let error = revert(&f.submit(&request));
	assert_eq!(
		error,
		ContractError::nested(ContractError::StaleNonce {
			expected: 0,
			provided: 3
		})
	);
	assert_eq!(f.ledger.forwarder().nonce(&user), 0);
}

#[test]
fn test_signature_by_another_key_is_invalid() {
	let mut f = Fixture::funded();
	let user = f.user();
	let auth = f.authorize(&f.user, user, post_acme(), 0);
	let forged = f.wrap(&f.other, user, auth.encode_call(), 0, f.now() + 60);
	assert_eq!(revert(&f.submit(&forged)), ContractError::InvalidSignature);

	let forged_auth = f.authorize(&f.other, user, post_acme(), 0);
	let request = f.wrap(&f.user, user, forged_auth.encode_call(), 0, f.now() + 60);
	assert_eq!(
		revert(&f.submit(&request)),
		ContractError::nested(ContractError::InvalidSignature)
	);
	assert_eq!(f.ledger.job_board().job_count(), 0);
}

#[test]
fn test_signatures_do_not_cross_domains() {
	let mut f = Fixture::funded();
	let user = f.user();
	let chain_id = f.ledger.chain_id();
	let deadline = f.now() + 60;

	// Relay envelope signed under the authorizer domain.
	let auth = f.authorize(&f.user, user, post_acme(), 0);
	let encoded_call = auth.encode_call();
	let wrong_domain = RelayRequest::signing_hash(
		user,
		&encoded_call,
		U256::ZERO,
		U256::from(deadline),
		&authorizer_domain(chain_id, f.ledger.authorizer_address()),
	);
	let request = RelayRequest {
		account: user,
		encoded_call,
		nonce: U256::ZERO,
		deadline: U256::from(deadline),
		signature: f.user.sign_digest(&wrong_domain).unwrap(),
	};
	assert_eq!(revert(&f.submit(&request)), ContractError::InvalidSignature);

	// Authorization signed under the forwarder domain.
	let action = post_acme();
	let digest = action.signing_hash(
		user,
		U256::ZERO,
		&forwarder_domain(chain_id, f.ledger.forwarder_address()),
	);
	let auth = SignedAuthorization {
		account: user,
		action,
		nonce: U256::ZERO,
		signature: f.user.sign_digest(&digest).unwrap(),
	};
	let request = f.wrap(&f.user, user, auth.encode_call(), 0, deadline);
	assert_eq!(
		revert(&f.submit(&request)),
		ContractError::nested(ContractError::InvalidSignature)
	);

	assert_eq!(f.ledger.authorizer().nonce(&user), 0);
	assert_eq!(f.ledger.forwarder().nonce(&user), 0);
}

#[test]
fn test_nested_revert_rolls_back_both_nonces() {
	let mut f = Fixture::funded();
	let user = f.user();
	let relayer = f.relayer.signer_address();
	let balance_before = f.ledger.balance_of(&relayer);
	let request = f.user_relay(Action::close_job(42));

	let receipt = f.submit(&request);

	let error = revert(&receipt);
	assert_eq!(
		error.root_cause(),
		&ContractError::Rejected("job not found".to_string())
	);
	assert!(matches!(error, ContractError::NestedCallReverted(_)));
	assert!(receipt.events.is_empty());
	assert_eq!(f.ledger.forwarder().nonce(&user), 0);
	assert_eq!(f.ledger.authorizer().nonce(&user), 0);
	// The relayer still pays for the reverted transaction.
	assert!(f.ledger.balance_of(&relayer) < balance_before);
}

#[test]
fn test_relayed_action_matches_direct_call() {
	let mut relayed = Fixture::funded();
	let request = relayed.user_relay(post_acme());
	assert!(relayed.submit(&request).success);

	let mut direct = Fixture::funded();
	let user = direct.user();
	let board = direct.ledger.job_board_address();
	let call = IJobBoard::postJobForCall {
		actor: user,
		organization: "Acme".to_string(),
		title: "Engineer".to_string(),
		durationDays: 30,
		description: "Build the relay".to_string(),
	};
	let receipt = direct.send(user, board, Bytes::from(call.abi_encode()));
	assert!(receipt.success, "{:?}", receipt.revert);

	assert_eq!(relayed.ledger.job_board().job(1), direct.ledger.job_board().job(1));
}

#[test]
fn test_target_rejects_untrusted_caller() {
	let mut f = Fixture::funded();
	let user = f.user();
	let other = f.other.signer_address();
	let board = f.ledger.job_board_address();
	let call = IJobBoard::postJobForCall {
		actor: user,
		organization: "Acme".to_string(),
		title: "Engineer".to_string(),
		durationDays: 30,
		description: String::new(),
	};

	let receipt = f.send(other, board, Bytes::from(call.abi_encode()));

	assert_eq!(
		revert(&receipt),
		ContractError::Unauthorized(UnauthorizedReason::UntrustedForwarder)
	);
}

#[test]
fn test_reimbursement_goes_to_calling_sponsor() {
	let mut f = Fixture::funded();
	let forwarder = f.ledger.forwarder_address();
	let pool_before = f.ledger.funding_pool();
	let request = f.user_relay(post_acme());

	let receipt = f.submit(&request);

	let (gas_used, reimbursed) = receipt
		.events
		.iter()
		.find_map(|e| match e {
			LedgerEvent::SponsoredExecution {
				gas_used,
				reimbursed,
				..
			} => Some((*gas_used, *reimbursed)),
			_ => None,
		})
		.unwrap();
	let expected = U256::from(gas_used) * U256::from(f.ledger.gas_price());
	assert_eq!(reimbursed, expected);
	assert_eq!(f.ledger.balance_of(&forwarder), expected);
	assert_eq!(f.ledger.funding_pool(), pool_before - expected);
	assert_eq!(
		f.ledger.authorizer().sponsor(&forwarder).unwrap().cumulative_gas_spent,
		gas_used
	);

	// The forwarder owner sweeps collected reimbursements.
	let owner = f.owner.signer_address();
	let owner_before = f.ledger.balance_of(&owner);
	let sweep = f.owner_call(forwarder, IRelayForwarder::withdrawCall {}.abi_encode());
	assert!(sweep.success);
	assert_eq!(f.ledger.balance_of(&forwarder), U256::ZERO);
	let fee = U256::from(sweep.gas_used) * U256::from(f.ledger.gas_price());
	assert_eq!(f.ledger.balance_of(&owner), owner_before + expected - fee);
}

#[test]
fn test_best_effort_executes_without_funds() {
	let mut f = Fixture::new(ReimbursementPolicy::BestEffort, U256::ZERO);
	let request = f.user_relay(post_acme());

	let receipt = f.submit(&request);

	assert!(receipt.success, "{:?}", receipt.revert);
	assert_eq!(f.ledger.job_board().job_count(), 1);
	assert!(receipt.events.iter().any(|e| matches!(
		e,
		LedgerEvent::SponsoredExecution { reimbursed, .. } if reimbursed.is_zero()
	)));
}

#[test]
fn test_strict_policy_fails_without_funds() {
	let mut f = Fixture::new(ReimbursementPolicy::Strict, U256::ZERO);
	let user = f.user();
	let request = f.user_relay(post_acme());

	let error = revert(&f.submit(&request));

	assert!(matches!(
		error.root_cause(),
		ContractError::InsufficientFunds { .. }
	));
	assert_eq!(f.ledger.job_board().job_count(), 0);
	assert_eq!(f.ledger.authorizer().nonce(&user), 0);
}

#[test]
fn test_management_is_owner_only() {
	let mut f = Fixture::funded();
	let authorizer = f.ledger.authorizer_address();
	let other = f.other.signer_address();
	let calls: Vec<Vec<u8>> = vec![
		IMetaTxAuthorizer::setEnabledCall { enabled: false }.abi_encode(),
		IMetaTxAuthorizer::setSponsorWhitelistCall {
			sponsor: other,
			enabled: true,
		}
		.abi_encode(),
		IMetaTxAuthorizer::setMaxGasCall {
			amount: U256::from(1),
		}
		.abi_encode(),
		IMetaTxAuthorizer::setReimbursementPolicyCall { policy: 1 }.abi_encode(),
		IMetaTxAuthorizer::withdrawCall {
			amount: U256::from(1),
		}
		.abi_encode(),
	];

	for input in calls {
		let receipt = f.send(other, authorizer, Bytes::from(input));
		assert_eq!(
			revert(&receipt),
			ContractError::Unauthorized(UnauthorizedReason::NotOwner)
		);
	}
	assert!(f.ledger.authorizer().is_enabled());
	assert_eq!(
		f.ledger.authorizer().reimbursement_policy(),
		ReimbursementPolicy::BestEffort
	);
}

#[test]
fn test_kill_switch_blocks_relays() {
	let mut f = Fixture::funded();
	let user = f.user();
	let authorizer = f.ledger.authorizer_address();
	let disable = IMetaTxAuthorizer::setEnabledCall { enabled: false }.abi_encode();
	assert!(f.owner_call(authorizer, disable).success);

	let request = f.user_relay(post_acme());
	assert_eq!(
		revert(&f.submit(&request)),
		ContractError::nested(ContractError::Unauthorized(UnauthorizedReason::Disabled))
	);
	assert_eq!(f.ledger.forwarder().nonce(&user), 0);

	let enable = IMetaTxAuthorizer::setEnabledCall { enabled: true }.abi_encode();
	assert!(f.owner_call(authorizer, enable).success);
	assert!(f.submit(&request).success);
}

#[test]
fn test_removed_sponsor_is_refused() {
	let mut f = Fixture::funded();
	let authorizer = f.ledger.authorizer_address();
	let forwarder = f.ledger.forwarder_address();
	let remove = IMetaTxAuthorizer::setSponsorWhitelistCall {
		sponsor: forwarder,
		enabled: false,
	}
	.abi_encode();
	assert!(f.owner_call(authorizer, remove).success);

	let request = f.user_relay(post_acme());
	assert_eq!(
		revert(&f.submit(&request)),
		ContractError::nested(ContractError::Unauthorized(UnauthorizedReason::NotSponsor))
	);
}

#[test]
fn test_projected_gas_over_cap_is_refused() {
	let mut f = Fixture::funded();
	let authorizer = f.ledger.authorizer_address();
	let cap = IMetaTxAuthorizer::setMaxGasCall {
		amount: U256::from(100_000),
	}
	.abi_encode();
	assert!(f.owner_call(authorizer, cap).success);

	let request = f.user_relay(post_acme());
	assert_eq!(
		revert(&f.submit(&request)).root_cause(),
		&ContractError::GasLimitExceeded {
			projected: 180_000,
			cap: 100_000
		}
	);

	// Closing a job is budgeted below the cap.
	assert_eq!(f.ledger.authorizer().max_gas(), 100_000);
	assert!(relay_types::ActionKind::CloseJob.projected_gas() < 100_000);
}

#[test]
fn test_withdraw_and_deposit() {
	let mut f = Fixture::funded();
	let authorizer = f.ledger.authorizer_address();

	let too_much = IMetaTxAuthorizer::withdrawCall { amount: eth(2) }.abi_encode();
	assert_eq!(
		revert(&f.owner_call(authorizer, too_much)),
		ContractError::InsufficientFunds {
			requested: eth(2),
			available: eth(1)
		}
	);

	let half = U256::from(500_000_000_000_000_000u64);
	let withdraw = IMetaTxAuthorizer::withdrawCall { amount: half }.abi_encode();
	assert!(f.owner_call(authorizer, withdraw).success);
	assert_eq!(f.ledger.funding_pool(), half);

	let other = f.other.signer_address();
	let deposit = f
		.ledger
		.transact(
			LedgerTransaction::call(
				other,
				authorizer,
				IMetaTxAuthorizer::depositCall {}.abi_encode(),
				GAS_LIMIT,
			)
			.with_value(eth(2)),
		)
		.unwrap();
	assert!(deposit.success);
	assert_eq!(f.ledger.funding_pool(), half + eth(2));
}

#[test]
fn test_out_of_gas_reverts_whole_transaction() {
	let mut f = Fixture::funded();
	let user = f.user();
	let request = f.user_relay(post_acme());
	let (relayer, forwarder) = (f.relayer.signer_address(), f.ledger.forwarder_address());

	let receipt = f
		.ledger
		.transact(LedgerTransaction::call(relayer, forwarder, request.to_call(), 60_000))
		.unwrap();

	assert_eq!(
		revert(&receipt).root_cause(),
		&ContractError::OutOfGas { limit: 60_000 }
	);
	assert_eq!(receipt.gas_used, 60_000);
	assert_eq!(f.ledger.forwarder().nonce(&user), 0);
	assert_eq!(f.ledger.job_board().job_count(), 0);
}

#[test]
fn test_job_lifecycle_through_relay() {
	let mut f = Fixture::funded();
	let user = f.user();
	assert!(f.submit(&f.user_relay(post_acme())).success);

	let edit = f.user_relay(Action::edit_job(1, "Senior Engineer", 45, "Lead the relay"));
	assert!(f.submit(&edit).success);
	let job = f.ledger.job_board().job(1).unwrap();
	assert_eq!(job.title, "Senior Engineer");
	assert_eq!(job.duration_days, 45);

	// Another account applies with its own nonces.
	let applicant = f.other.signer_address();
	let action = Action::submit_application(1, "Ada", B256::repeat_byte(0xcf), "Hello");
	let auth = f.authorize(&f.other, applicant, action.clone(), 0);
	let apply = f.wrap(&f.other, applicant, auth.encode_call(), 0, f.now() + 60);
	assert!(f.submit(&apply).success);
	let applications: Vec<_> = f.ledger.job_board().applications(1).collect();
	assert_eq!(applications.len(), 1);
	assert_eq!(applications[0].applicant, applicant);
	assert_eq!(applications[0].cv_digest, B256::repeat_byte(0xcf));

	// Applying twice is a business rejection surfaced through both layers.
	let auth = f.authorize(&f.other, applicant, action, 1);
	let again = f.wrap(&f.other, applicant, auth.encode_call(), 1, f.now() + 60);
	assert_eq!(
		revert(&f.submit(&again)).root_cause(),
		&ContractError::Rejected("already applied to this job".to_string())
	);

	// Only the owner of the job may close it.
	let auth = f.authorize(&f.other, applicant, Action::close_job(1), 1);
	let hijack = f.wrap(&f.other, applicant, auth.encode_call(), 1, f.now() + 60);
	assert_eq!(
		revert(&f.submit(&hijack)).root_cause(),
		&ContractError::Rejected("not the job owner".to_string())
	);

	assert!(f.submit(&f.user_relay(Action::close_job(1))).success);
	assert!(!f.ledger.job_board().job(1).unwrap().open);
	assert_eq!(f.ledger.authorizer().nonce(&user), 3);
	assert_eq!(f.ledger.forwarder().nonce(&user), 3);
}

#[test]
fn test_views_report_nonces() {
	let mut f = Fixture::funded();
	let user = f.user();
	assert!(f.submit(&f.user_relay(post_acme())).success);

	let forwarder = f.ledger.forwarder_address();
	let output = f
		.ledger
		.view(forwarder, IRelayForwarder::getNonceCall { account: user }.abi_encode())
		.unwrap();
	let nonce = <U256 as alloy::sol_types::SolValue>::abi_decode(&output).unwrap();
	assert_eq!(nonce, U256::from(1));
}

#[test]
fn test_simulation_does_not_commit() {
	let f = Fixture::funded();
	let user = f.user();
	let request = f.user_relay(post_acme());
	let tx = LedgerTransaction::call(
		f.relayer.signer_address(),
		f.ledger.forwarder_address(),
		request.to_call(),
		GAS_LIMIT,
	);

	assert!(f.ledger.simulate(&tx).is_ok());
	assert_eq!(f.ledger.forwarder().nonce(&user), 0);
	assert_eq!(f.ledger.job_board().job_count(), 0);
	assert_eq!(f.ledger.block_number(), 0);
}

#[test]
fn test_extreme_value_and_time_saturate() {
	let mut f = Fixture::funded();
	let relayer = f.relayer.signer_address();
	let tx = LedgerTransaction::call(relayer, f.ledger.forwarder_address(), Bytes::new(), GAS_LIMIT)
		.with_value(U256::MAX);

	match f.ledger.transact(tx) {
		Err(crate::LedgerError::InsufficientBalance { required, .. }) => {
			assert_eq!(required, U256::MAX)
		}
		other => panic!("Expected insufficient balance, got {:?}", other),
	}
	assert_eq!(f.ledger.block_number(), 0);

	f.ledger.advance_time(u64::MAX);
	assert_eq!(f.ledger.timestamp(), u64::MAX);
}
