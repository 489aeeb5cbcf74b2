//! Solidity ABI shared by the on-ledger contracts, the signing kit and the
//! delivery backends.
//!
//! Every byte that crosses a layer boundary (calldata, revert data, typed-data
//! structs) is produced from these definitions, so the in-process ledger and a
//! deployed EVM contract agree on encoding.

use alloy::sol;

sol! {
	/// Relay envelope signed under the forwarder domain.
	#[derive(Debug, PartialEq, Eq)]
	struct ForwardRequest {
		address account;
		bytes encodedCall;
		uint256 nonce;
		uint256 deadline;
	}

	/// Signed subset of a job posting. The description rides along unsigned.
	#[derive(Debug, PartialEq, Eq)]
	struct PostJob {
		address account;
		string organization;
		string title;
		uint32 durationDays;
		uint256 nonce;
	}

	#[derive(Debug, PartialEq, Eq)]
	struct EditJob {
		address account;
		uint256 jobId;
		string title;
		uint32 durationDays;
		uint256 nonce;
	}

	#[derive(Debug, PartialEq, Eq)]
	struct CloseJob {
		address account;
		uint256 jobId;
		uint256 nonce;
	}

	/// Signed subset of an application. The cover letter rides along unsigned.
	#[derive(Debug, PartialEq, Eq)]
	struct SubmitApplication {
		address account;
		uint256 jobId;
		string applicantName;
		bytes32 cvDigest;
		uint256 nonce;
	}

	#[derive(Debug, PartialEq, Eq)]
	struct PostJobFields {
		string organization;
		string title;
		uint32 durationDays;
		string description;
	}

	#[derive(Debug, PartialEq, Eq)]
	struct EditJobFields {
		uint256 jobId;
		string title;
		uint32 durationDays;
		string description;
	}

	#[derive(Debug, PartialEq, Eq)]
	struct CloseJobFields {
		uint256 jobId;
	}

	#[derive(Debug, PartialEq, Eq)]
	struct SubmitApplicationFields {
		uint256 jobId;
		string applicantName;
		bytes32 cvDigest;
		string coverLetter;
	}

	interface IRelayForwarder {
		function executeRelay(address account, bytes encodedCall, uint256 nonce, uint256 deadline, bytes signature) external returns (bytes);
		function getNonce(address account) external view returns (uint256);
		function withdraw() external;
	}

	interface IMetaTxAuthorizer {
		function authorizeAndExecute(uint8 actionKind, address account, bytes actionFields, uint256 nonce, bytes signature) external returns (bytes);
		function getNonce(address account) external view returns (uint256);
		function setSponsorWhitelist(address sponsor, bool enabled) external;
		function setEnabled(bool enabled) external;
		function setMaxGas(uint256 amount) external;
		function setReimbursementPolicy(uint8 policy) external;
		function withdraw(uint256 amount) external;
		function deposit() external payable;
	}

	interface IJobBoard {
		function postJobFor(address actor, string organization, string title, uint32 durationDays, string description) external returns (uint256);
		function editJobFor(address actor, uint256 jobId, string title, uint32 durationDays, string description) external;
		function closeJobFor(address actor, uint256 jobId) external;
		function submitApplicationFor(address actor, uint256 jobId, string applicantName, bytes32 cvDigest, string coverLetter) external returns (uint256);
		function setTrustedForwarder(address forwarder, bool trusted) external;
		function jobCount() external view returns (uint256);
	}

	#[derive(Debug, PartialEq, Eq)]
	error Expired(uint256 deadline, uint256 timestamp);

	#[derive(Debug, PartialEq, Eq)]
	error InvalidSignature();

	#[derive(Debug, PartialEq, Eq)]
	error StaleNonce(uint256 expected, uint256 provided);

	#[derive(Debug, PartialEq, Eq)]
	error Unauthorized(uint8 reason);

	#[derive(Debug, PartialEq, Eq)]
	error GasLimitExceeded(uint256 projected, uint256 cap);

	#[derive(Debug, PartialEq, Eq)]
	error NestedCallReverted(bytes reason);

	#[derive(Debug, PartialEq, Eq)]
	error InsufficientFunds(uint256 requested, uint256 available);

	#[derive(Debug, PartialEq, Eq)]
	error OutOfGas(uint256 limit);

	#[derive(Debug, PartialEq, Eq)]
	error InvalidCalldata(string reason);

	#[derive(Debug, PartialEq, Eq)]
	error Rejected(string reason);
}
