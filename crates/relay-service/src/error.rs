//! Mapping of relay failures onto HTTP responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use relay_delivery::DeliveryError;
use relay_types::{ContractError, ErrorBody, ValidationError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RelayError {
	#[error("Validation error: {0}")]
	Validation(#[from] ValidationError),
	#[error("Deadline {deadline} has passed (now {now})")]
	Expired { deadline: u64, now: u64 },
	/// Operator key, RPC endpoint or forwarder address is missing or unusable.
	#[error("Configuration error: {0}")]
	Configuration(String),
	/// The dry run of `executeRelay` reverted.
	#[error("Simulation failed: {error}")]
	Simulation { error: ContractError, raw: String },
	/// The transaction was mined but reverted, usually after losing a nonce race.
	#[error("Transaction {0} reverted")]
	Reverted(String),
	#[error("Transport error: {0}")]
	Transport(String),
}

impl From<DeliveryError> for RelayError {
	fn from(error: DeliveryError) -> Self {
		match error {
			DeliveryError::Reverted { error, raw } => Self::Simulation { error, raw },
			DeliveryError::FailedOnChain(hash) => Self::Reverted(hash.to_string()),
			DeliveryError::InvalidConfig(message) => Self::Configuration(message),
			DeliveryError::Network(message) => Self::Transport(message),
			DeliveryError::Timeout(hash) => {
				Self::Transport(format!("Timed out waiting for confirmation of {}", hash))
			}
		}
	}
}

impl RelayError {
	pub fn status(&self) -> StatusCode {
		match self {
			Self::Validation(_) | Self::Expired { .. } | Self::Simulation { .. } | Self::Reverted(_) => {
				StatusCode::BAD_REQUEST
			}
			Self::Configuration(_) | Self::Transport(_) => StatusCode::INTERNAL_SERVER_ERROR,
		}
	}

	/// Response body. Configuration and transport details stay in the logs.
	pub fn body(&self) -> ErrorBody {
		let (error, details, full_error, retryable) = match self {
			Self::Validation(e) => ("ValidationError", e.to_string(), None, false),
			Self::Expired { .. } => ("Expired", self.to_string(), None, true),
			Self::Configuration(_) => (
				"ConfigurationError",
				"The relayer is not configured".to_string(),
				None,
				false,
			),
			Self::Simulation { error, raw } => (
				"SimulationFailed",
				error.to_string(),
				Some(raw.clone()),
				error.is_retryable(),
			),
			Self::Reverted(_) => (
				"TransactionReverted",
				format!("{}; refetch the nonce and sign again", self),
				None,
				true,
			),
			Self::Transport(_) => (
				"TransportError",
				"Failed to relay the transaction".to_string(),
				None,
				false,
			),
		};

		ErrorBody {
			error: error.to_string(),
			details,
			full_error,
			retryable,
		}
	}
}

impl IntoResponse for RelayError {
	fn into_response(self) -> Response {
		let status = self.status();
		if status.is_server_error() {
			tracing::error!(error = %self, "Relay request failed");
		} else {
			tracing::warn!(error = %self, "Relay request rejected");
		}
		(status, Json(self.body())).into_response()
	}
}
