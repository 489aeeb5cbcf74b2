use anyhow::{Context, Result};
use clap::Parser;
use relay_config::{ConfigLoader, NetworkMode, RelayConfig};
use relay_service::cli::{Args, Command};
use relay_service::{api, build_delivery, RelayService};
use std::sync::Arc;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
	let args = Args::parse();
	let config = load_config(&args).await?;

	let log_level = args
		.log_level
		.clone()
		.unwrap_or_else(|| config.service.log_level.clone());
	setup_tracing(&log_level);

	match args.command {
		Some(Command::Start) | None => start_service(config).await,
		Some(Command::Validate) => validate_config(config),
	}
}

async fn load_config(args: &Args) -> Result<RelayConfig> {
	let mut loader = ConfigLoader::new();
	if let Some(path) = &args.config {
		loader = loader.with_file(path);
	}
	loader.load().await.context("Failed to load configuration")
}

async fn start_service(config: RelayConfig) -> Result<()> {
	info!("Starting job relayer");

	let delivery = build_delivery(&config).context("Failed to set up delivery")?;
	let service = Arc::new(RelayService::new(delivery));
	if !service.is_configured() {
		info!("Relay requests will fail until the operator is configured");
	}

	api::serve(
		service,
		&config.service.host,
		config.service.port,
		shutdown_signal(),
	)
	.await?;

	info!("Job relayer stopped");
	Ok(())
}

fn validate_config(config: RelayConfig) -> Result<()> {
	info!("Configuration is valid");
	info!("HTTP: {}:{}", config.service.host, config.service.port);
	match config.network.mode {
		NetworkMode::Rpc => match config.operator_credentials() {
			Ok(credentials) => info!(
				chain_id = credentials.chain_id,
				forwarder = %credentials.forwarder,
				"JSON-RPC delivery via {}",
				credentials.rpc_url
			),
			Err(e) => info!("JSON-RPC delivery is not usable yet: {}", e),
		},
		NetworkMode::Local => info!(
			chain_id = config.local.chain_id,
			policy = %config.local.reimbursement_policy,
			"In-process ledger"
		),
	}
	Ok(())
}

fn setup_tracing(log_level: &str) {
	let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

	tracing_subscriber::registry()
		.with(env_filter)
		.with(tracing_subscriber::fmt::layer())
		.init();
}

async fn shutdown_signal() {
	let ctrl_c = async {
		if let Err(e) = signal::ctrl_c().await {
			tracing::error!("Failed to listen for Ctrl+C: {}", e);
			std::future::pending::<()>().await;
		}
	};

	#[cfg(unix)]
	let terminate = async {
		match signal::unix::signal(signal::unix::SignalKind::terminate()) {
			Ok(mut stream) => {
				stream.recv().await;
			}
			Err(e) => {
				tracing::error!("Failed to install SIGTERM handler: {}", e);
				std::future::pending::<()>().await;
			}
		}
	};

	#[cfg(not(unix))]
	let terminate = std::future::pending::<()>();

	tokio::select! {
		_ = ctrl_c => {},
		_ = terminate => {},
	}
	info!("Shutdown signal received");
}
