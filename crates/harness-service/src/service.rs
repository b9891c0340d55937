//! Wiring for the harness commands.

use anyhow::{Context, Result};
use harness_account::{AccountBook, AccountError};
use harness_config::{ConfigError, ConfigLoader, HarnessConfig, LoadTestConfig};
use harness_core::{
	default_steps, CoreError, LoadTestOptions, LoadTestRunner, ScenarioContext, ScenarioOrchestrator,
};
use harness_delivery::ReliableSubmitter;
use harness_ledger::{JsonRpcClient, LedgerClient};
use harness_storage::{FileStorage, ReportStore};
use harness_types::Network;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Exit code for a failed scenario or a breached load-test threshold.
pub const EXIT_RUN_FAILED: u8 = 1;
/// Exit code for configuration and account book errors.
pub const EXIT_CONFIG: u8 = 2;

/// Everything a command needs, loaded from one configuration file.
pub struct Harness {
	pub config: HarnessConfig,
	pub accounts: AccountBook,
	pub submitter: Arc<ReliableSubmitter>,
	pub store: Arc<ReportStore>,
}

impl Harness {
	pub async fn load(config_path: &Path, network: Network) -> Result<Self> {
		let config = load_config(config_path, network).await?;
		let accounts = load_accounts(&config).await?;

		let client: Arc<dyn LedgerClient> = Arc::new(
			JsonRpcClient::new(
				network,
				config.network.rpc_url(),
				Duration::from_secs(config.network.request_timeout_secs),
			)
			.context("Failed to create ledger client")?,
		);
		let submitter = Arc::new(ReliableSubmitter::from_config(client, &config.submission));
		let store = Arc::new(ReportStore::new(Box::new(FileStorage::new(
			config.reports.directory.clone(),
		))));

		Ok(Self {
			config,
			accounts,
			submitter,
			store,
		})
	}

	pub fn network(&self) -> Network {
		self.config.network.name
	}
}

/// Loads and validates the configuration, which must describe `network`.
pub async fn load_config(path: &Path, network: Network) -> Result<HarnessConfig> {
	info!("Loading configuration from: {}", path.display());

	let config = ConfigLoader::new()
		.with_file(path)
		.load()
		.await
		.context("Failed to load configuration")?;

	if config.network.name != network {
		return Err(ConfigError::ValidationError(format!(
			"{} describes {}, not {}",
			path.display(),
			config.network.name,
			network
		)))
		.context("Configuration does not match the requested network");
	}

	Ok(config)
}

pub async fn load_accounts(config: &HarnessConfig) -> Result<AccountBook> {
	let book = ConfigLoader::load_accounts(&config.accounts.path)
		.await
		.context("Failed to load account book")?;
	AccountBook::from_config(&book).context("Invalid account book")
}

pub async fn run_scenario(harness: Harness) -> Result<()> {
	let network = harness.network();
	let orchestrator = ScenarioOrchestrator::new(network, default_steps(), harness.store.clone());
	let mut ctx = ScenarioContext::new(
		harness.config.scenario.clone(),
		harness.accounts,
		harness.submitter,
	);

	let run = orchestrator.run(&mut ctx).await?;

	info!(
		"Scenario passed: {}/{} steps, report at {}",
		run.report.summary.passed, run.report.summary.total, run.location
	);
	if let Some(id) = &ctx.issuance_id {
		info!("Issuance id: {}", id);
	}
	Ok(())
}

pub async fn run_load_test(
	harness: Harness,
	count: Option<usize>,
	concurrency: Option<usize>,
	cancel: bool,
) -> Result<()> {
	let options = load_test_options(&harness.config.load_test, count, concurrency, cancel)
		.context("Invalid load-test options")?;

	let runner = LoadTestRunner::new(
		harness.network(),
		harness.config.load_test.clone(),
		harness.accounts,
		harness.submitter,
		harness.store,
	);
	let run = runner.run(&options).await?;

	let summary = serde_json::to_string_pretty(&run.report.statistics)
		.context("Failed to render statistics")?;
	println!("{}", summary);
	info!("Load test report at {}", run.location);
	if options.cancel {
		info!("Cancelled {} offers", run.cancelled);
	}
	Ok(())
}

/// Applies command-line overrides to the configured load-test options.
/// Overrides are held to the same limits as the file.
pub fn load_test_options(
	config: &LoadTestConfig,
	count: Option<usize>,
	concurrency: Option<usize>,
	cancel: bool,
) -> Result<LoadTestOptions, ConfigError> {
	let mut options = LoadTestOptions::from_config(config);
	if let Some(count) = count {
		if count == 0 {
			return Err(ConfigError::ValidationError("--count must be at least 1".to_string()));
		}
		options.total_offers = count;
	}
	if let Some(concurrency) = concurrency {
		if concurrency == 0 {
			return Err(ConfigError::ValidationError(
				"--concurrency must be at least 1".to_string(),
			));
		}
		options.concurrency = concurrency;
	}
	options.cancel = cancel;
	Ok(options)
}

pub async fn validate(config_path: &Path, network: Network) -> Result<()> {
	let config = load_config(config_path, network).await?;
	let accounts = load_accounts(&config).await?;

	info!("Configuration is valid");
	info!("Network: {} ({})", config.network.name, config.network.rpc_url());
	info!("Account roles: {}", accounts.len());
	for role in &config.scenario.holders {
		if let Err(e) = accounts.get(role) {
			warn!("Scenario holder is not in the account book: {}", e);
		}
	}
	Ok(())
}

/// Maps a command error to the process exit code.
pub fn exit_code(err: &anyhow::Error) -> u8 {
	let config_error = err.chain().any(|cause| {
		cause.is::<ConfigError>()
			|| cause.is::<AccountError>()
			|| matches!(cause.downcast_ref::<CoreError>(), Some(CoreError::Configuration(_)))
	});
	if config_error {
		EXIT_CONFIG
	} else {
		EXIT_RUN_FAILED
	}
}
