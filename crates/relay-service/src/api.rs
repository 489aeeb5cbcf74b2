//! HTTP API of the relayer.

use crate::error::RelayError;
use crate::service::RelayService;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use relay_types::{HealthResponse, NonceResponse, RelaySubmission, RelaySuccess, ValidationError};
use std::future::Future;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

#[derive(Clone)]
struct AppState {
	service: Arc<RelayService>,
}

pub fn router(service: Arc<RelayService>) -> Router {
	Router::new()
		.route("/relay", post(relay))
		.route("/nonce/{address}", get(nonce))
		.route("/health", get(health))
		.with_state(AppState { service })
		.layer(TraceLayer::new_for_http())
		.layer(CorsLayer::permissive())
}

/// Serves the API until `shutdown` resolves.
pub async fn serve(
	service: Arc<RelayService>,
	host: &str,
	port: u16,
	shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
	let listener = tokio::net::TcpListener::bind(format!("{}:{}", host, port)).await?;
	info!("Relay API listening on {}:{}", host, port);

	axum::serve(listener, router(service))
		.with_graceful_shutdown(shutdown)
		.await?;
	Ok(())
}

async fn relay(
	State(state): State<AppState>,
	payload: Result<Json<RelaySubmission>, JsonRejection>,
) -> Result<Json<RelaySuccess>, RelayError> {
	let Json(submission) = payload.map_err(|rejection| {
		RelayError::Validation(ValidationError::DeserializationError(rejection.body_text()))
	})?;
	let success = state.service.submit(&submission).await?;
	info!(tx_hash = %success.receipt.hash.short(), "Relay succeeded");
	Ok(Json(success))
}

async fn nonce(
	State(state): State<AppState>,
	Path(address): Path<String>,
) -> Result<Json<NonceResponse>, RelayError> {
	state.service.nonce(&address).await.map(Json)
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
	Json(HealthResponse {
		status: "ok".to_string(),
		configured: state.service.is_configured(),
	})
}
