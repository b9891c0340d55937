use anyhow::Result;
use clap::Parser;
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;
mod service;

use cli::{Args, Command};
use service::Harness;

#[tokio::main]
async fn main() -> ExitCode {
	let args = Args::parse();

	// Initialize tracing
	setup_tracing(&args.log_level);

	match run(args).await {
		Ok(()) => ExitCode::SUCCESS,
		Err(e) => {
			error!("{:#}", e);
			ExitCode::from(service::exit_code(&e))
		}
	}
}

async fn run(args: Args) -> Result<()> {
	let config_path = args.config_path();
	let network = args.command.network();

	match args.command {
		Command::Scenario { .. } => {
			let harness = Harness::load(&config_path, network).await?;
			service::run_scenario(harness).await
		}
		Command::LoadTest {
			count,
			concurrency,
			cancel,
			..
		} => {
			let harness = Harness::load(&config_path, network).await?;
			service::run_load_test(harness, count, concurrency, cancel).await
		}
		Command::Validate { .. } => service::validate(&config_path, network).await,
	}
}

fn setup_tracing(log_level: &str) {
	let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

	tracing_subscriber::registry()
		.with(env_filter)
		.with(tracing_subscriber::fmt::layer())
		.init();
}
