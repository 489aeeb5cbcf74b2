//! Command-line interface of the relayer binary.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "job-relayer")]
#[command(about = "Gasless meta-transaction relayer for the job board", long_about = None)]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Args {
	/// Path to the TOML configuration file. Without one, settings come from
	/// `RELAYER_*` environment variables only.
	#[arg(short, long, env = "RELAYER_CONFIG")]
	pub config: Option<PathBuf>,

	/// Log level override (trace, debug, info, warn, error)
	#[arg(short, long, env = "RELAYER_LOG_LEVEL")]
	pub log_level: Option<String>,

	#[command(subcommand)]
	pub command: Option<Command>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
	/// Start the relay HTTP service
	Start,
	/// Validate the configuration and exit
	Validate,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_defaults_to_start() {
		let args = Args::try_parse_from(["job-relayer"]).unwrap();
		assert_eq!(args.command, None);
		assert_eq!(args.config, None);
	}

	#[test]
	fn test_validate_with_config() {
		let args =
			Args::try_parse_from(["job-relayer", "--config", "config/relay.toml", "validate"]).unwrap();
		assert_eq!(args.command, Some(Command::Validate));
		assert_eq!(args.config, Some(PathBuf::from("config/relay.toml")));
	}
}
