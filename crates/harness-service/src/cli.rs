//! Command-line interface definitions.

use clap::{Parser, Subcommand};
use harness_types::Network;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "ledger-harness")]
#[command(about = "Reliable ledger submission and token lifecycle test harness", long_about = None)]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Args {
	/// Path to configuration file; defaults to config/<network>.toml
	#[arg(short, long, env = "HARNESS_CONFIG")]
	pub config: Option<PathBuf>,

	/// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
	#[arg(short, long, env = "HARNESS_LOG_LEVEL", default_value = "info")]
	pub log_level: String,

	#[command(subcommand)]
	pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
	/// Run the token lifecycle scenario
	#[command(about = "Issue, authorize, fund, freeze and unfreeze a token, stopping at the first failure")]
	Scenario {
		#[arg(short, long, default_value = "testnet")]
		network: Network,
	},

	/// Run the offer load test
	#[command(about = "Create offers concurrently and report latency statistics")]
	LoadTest {
		#[arg(short, long, default_value = "testnet")]
		network: Network,

		/// Number of offers; overrides load_test.total_offers
		#[arg(long)]
		count: Option<usize>,

		/// Offers in flight at once; overrides load_test.concurrency
		#[arg(long)]
		concurrency: Option<usize>,

		/// Cancel the created offers once the run finishes
		#[arg(long)]
		cancel: bool,
	},

	/// Validate configuration and account book
	#[command(about = "Load and validate the configuration and account book")]
	Validate {
		#[arg(short, long, default_value = "testnet")]
		network: Network,
	},
}

impl Command {
	pub fn network(&self) -> Network {
		match self {
			Self::Scenario { network } | Self::LoadTest { network, .. } | Self::Validate { network } => {
				*network
			}
		}
	}
}

impl Args {
	/// The configuration file to load.
	pub fn config_path(&self) -> PathBuf {
		self.config
			.clone()
			.unwrap_or_else(|| PathBuf::from(format!("config/{}.toml", self.command.network())))
	}
}
