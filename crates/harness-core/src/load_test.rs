//! Offer load test.
//!
//! Creates a batch of expiring offers from the investor accounts, runs them
//! through the batch executor and persists a latency report. Optionally
//! cancels the offers that were created.

use crate::batch::{ConcurrencyBatchExecutor, TaskOutcome};
use crate::error::CoreError;
use crate::scenario::ISSUER_ROLE;
use crate::stats::load_test_statistics;
use chrono::Utc;
use harness_account::{AccountBook, AccountInterface};
use harness_config::LoadTestConfig;
use harness_delivery::ReliableSubmitter;
use harness_storage::{ReportKind, ReportStore};
use harness_types::{
	to_ledger_time, BatchTaskResult, LoadTestReport, LoadTestSettings, Network, TransactionIntent,
};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// Prefix of the roles that place offers.
pub const INVESTOR_PREFIX: &str = "investor";

/// Per-run overrides of the configured load test.
#[derive(Debug, Clone)]
pub struct LoadTestOptions {
	pub total_offers: usize,
	pub concurrency: usize,
	/// Cancel every offer that was created once the batch finishes.
	pub cancel: bool,
}

impl LoadTestOptions {
	pub fn from_config(config: &LoadTestConfig) -> Self {
		Self {
			total_offers: config.total_offers,
			concurrency: config.concurrency,
			cancel: false,
		}
	}
}

/// A finished, persisted load-test run.
#[derive(Debug)]
pub struct LoadTestRun {
	pub report: LoadTestReport,
	pub location: String,
	/// Offers cancelled afterwards. Zero unless cancellation was requested.
	pub cancelled: usize,
}

type OfferTask = (TransactionIntent, Arc<dyn AccountInterface>);

pub struct LoadTestRunner {
	network: Network,
	config: LoadTestConfig,
	accounts: AccountBook,
	submitter: Arc<ReliableSubmitter>,
	store: Arc<ReportStore>,
	run_id: String,
}

impl LoadTestRunner {
	pub fn new(
		network: Network,
		config: LoadTestConfig,
		accounts: AccountBook,
		submitter: Arc<ReliableSubmitter>,
		store: Arc<ReportStore>,
	) -> Self {
		Self {
			network,
			config,
			accounts,
			submitter,
			store,
			run_id: Uuid::new_v4().to_string(),
		}
	}

	pub fn with_run_id(mut self, run_id: impl Into<String>) -> Self {
		self.run_id = run_id.into();
		self
	}

	pub fn run_id(&self) -> &str {
		&self.run_id
	}

	/// Builds one offer per task, assigning investors round-robin.
	fn offer_tasks(&self, total: usize) -> Result<Vec<(String, OfferTask)>, CoreError> {
		let investors = self.accounts.roles_with_prefix(INVESTOR_PREFIX);
		if investors.is_empty() {
			return Err(CoreError::Configuration(format!(
				"account book has no '{}' roles to place offers",
				INVESTOR_PREFIX
			)));
		}
		let investors = investors
			.iter()
			.map(|role| self.accounts.get(role))
			.collect::<Result<Vec<_>, _>>()?;
		let issuer = self.accounts.get(ISSUER_ROLE)?;

		let taker_gets = harness_builder::xrp(&self.config.offer_xrp)?;
		let taker_pays = harness_builder::issued(
			&self.config.currency,
			issuer.address().as_str(),
			&self.config.offer_value,
		)?;
		let expires_at = Utc::now()
			+ chrono::Duration::seconds(self.config.offer_expiration_secs.min(u32::MAX as u64) as i64);
		let expiration = Some(to_ledger_time(expires_at));

		(0..total)
			.map(|i| {
				let account = investors[i % investors.len()].clone();
				let intent = harness_builder::offer_create(
					account.address().as_str(),
					taker_gets.clone(),
					taker_pays.clone(),
					expiration,
				)?;
				Ok::<_, CoreError>((format!("offer-{}", i), (intent, account)))
			})
			.collect()
	}

	/// Runs the load test and persists its report.
	///
	/// Returns `CoreError::FailureThreshold` after persisting when the share
	/// of failed offers exceeds the configured limit.
	pub async fn run(&self, options: &LoadTestOptions) -> Result<LoadTestRun, CoreError> {
		if options.total_offers == 0 {
			return Err(CoreError::Configuration(
				"load test needs at least one offer".to_string(),
			));
		}

		let tasks = self.offer_tasks(options.total_offers)?;
		let executor = ConcurrencyBatchExecutor::new(options.concurrency);

		info!(
			network = %self.network,
			run_id = %self.run_id,
			total = options.total_offers,
			concurrency = executor.concurrency(),
			"Starting load test"
		);

		let submitter = self.submitter.clone();
		let results = executor
			.run(tasks, move |(intent, account): OfferTask| {
				let submitter = submitter.clone();
				async move {
					submitter
						.submit_intent(&intent, account.as_ref())
						.await
						.into_result()
				}
			})
			.await;

		let statistics = load_test_statistics(&results);
		let report = LoadTestReport {
			network: self.network,
			run_id: self.run_id.clone(),
			config: LoadTestSettings {
				total_offers: options.total_offers,
				concurrency: executor.concurrency(),
			},
			results,
			statistics,
		};

		let location = self
			.store
			.save(ReportKind::LoadTest, self.network, &self.run_id, &report)
			.await?;

		let stats = &report.statistics;
		info!(
			successful = stats.successful,
			failed = stats.failed,
			success_rate = %format!("{:.1}%", stats.success_rate),
			avg_ms = %format!("{:.1}", stats.latencies.mean),
			p50_ms = stats.latencies.p50,
			p95_ms = stats.latencies.p95,
			p99_ms = stats.latencies.p99,
			"Load test finished"
		);

		let cancelled = if options.cancel {
			self.cancel_offers(&report.results, &executor).await?
		} else {
			0
		};

		let failure_rate = stats.failed as f64 / stats.total as f64;
		if failure_rate > self.config.max_failure_rate {
			return Err(CoreError::FailureThreshold {
				failed: stats.failed,
				total: stats.total,
				limit: self.config.max_failure_rate,
			});
		}

		Ok(LoadTestRun {
			report,
			location,
			cancelled,
		})
	}

	/// Cancels every created offer whose sequence the ledger reports.
	async fn cancel_offers(
		&self,
		results: &[BatchTaskResult],
		executor: &ConcurrencyBatchExecutor,
	) -> Result<usize, CoreError> {
		let investors = self
			.accounts
			.roles_with_prefix(INVESTOR_PREFIX)
			.iter()
			.map(|role| self.accounts.get(role))
			.collect::<Result<Vec<_>, _>>()?;
		if investors.is_empty() {
			return Ok(0);
		}

		let tasks: Vec<(String, (String, Arc<dyn AccountInterface>))> = results
			.iter()
			.filter(|r| r.success)
			.filter_map(|r| {
				let index: usize = r.id.strip_prefix("offer-")?.parse().ok()?;
				let hash = r.tx_hash.clone()?;
				let account = investors.get(index % investors.len())?.clone();
				Some((r.id.replacen("offer", "cancel", 1), (hash, account)))
			})
			.collect();

		if tasks.is_empty() {
			return Ok(0);
		}
		info!(offers = tasks.len(), "Cancelling created offers");

		let submitter = self.submitter.clone();
		let results = executor
			.run(tasks, move |(hash, account): (String, Arc<dyn AccountInterface>)| {
				cancel_offer(submitter.clone(), hash, account)
			})
			.await;

		for failed in results.iter().filter(|r| !r.success) {
			warn!(
				id = %failed.id,
				"Offer not cancelled: {}",
				failed.error.as_deref().unwrap_or("unknown error")
			);
		}
		Ok(results.iter().filter(|r| r.success).count())
	}
}

/// Looks up a created offer's sequence and cancels it.
async fn cancel_offer(
	submitter: Arc<ReliableSubmitter>,
	hash: String,
	account: Arc<dyn AccountInterface>,
) -> TaskOutcome {
	let tx = submitter
		.client()
		.transaction(&hash)
		.await
		.map_err(|e| format!("lookup of offer {} failed: {}", hash, e))?;
	let sequence = offer_sequence(&tx.raw)
		.ok_or_else(|| format!("ledger reported no sequence for offer {}", hash))?;
	let intent = harness_builder::offer_cancel(account.address().as_str(), sequence)
		.map_err(|e| e.to_string())?;
	submitter
		.submit_intent(&intent, account.as_ref())
		.await
		.into_result()
}

/// Account sequence of a looked-up transaction.
fn offer_sequence(raw: &serde_json::Value) -> Option<u32> {
	["/result/Sequence", "/result/tx_json/Sequence"]
		.iter()
		.find_map(|pointer| raw.pointer(pointer)?.as_u64())
		.and_then(|seq| u32::try_from(seq).ok())
		.filter(|&seq| seq > 0)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::{fake_submitter, FakeLedger};
	use harness_account::LocalWallet;
	use harness_storage::FileStorage;
	use serde_json::json;
	use tempfile::TempDir;

	const ISSUER: &str = "rHb9CJAWyB4rj91VRWn96DkukG4bwdtyTh";
	const INVESTOR_1: &str = "rPT1Sjq2YGrBMTttX4GZHjKu9dyfzbpAYe";
	const INVESTOR_2: &str = "rLHzPsX6oXkzU2qL12kHCH8G8cnZv1rBJh";

	fn accounts(investors: &[&str]) -> AccountBook {
		let mut book = AccountBook::new();
		book.insert(
			ISSUER_ROLE,
			Arc::new(LocalWallet::new(ISSUER, "snoPBrXtMeMyMHUVTgbuqAfg1SUTb").unwrap()),
		);
		for (i, address) in investors.iter().enumerate() {
			book.insert(
				format!("investor-{}", i + 1),
				Arc::new(LocalWallet::new(address, "sEdTM1uX8pu2do5XvTnutH6HsouMaM2").unwrap()),
			);
		}
		book
	}

	fn runner(ledger: Arc<FakeLedger>, book: AccountBook, dir: &TempDir) -> LoadTestRunner {
		let store = Arc::new(ReportStore::new(Box::new(FileStorage::new(
			dir.path().to_path_buf(),
		))));
		LoadTestRunner::new(
			Network::Testnet,
			LoadTestConfig::default(),
			book,
			Arc::new(fake_submitter(ledger)),
			store,
		)
	}

	fn options(total_offers: usize, concurrency: usize, cancel: bool) -> LoadTestOptions {
		LoadTestOptions {
			total_offers,
			concurrency,
			cancel,
		}
	}

	#[tokio::test]
	async fn test_offers_round_robin_and_report() {
		let dir = TempDir::new().unwrap();
		let ledger = Arc::new(FakeLedger::default());
		let runner = runner(ledger.clone(), accounts(&[INVESTOR_1, INVESTOR_2]), &dir)
			.with_run_id("rr");

		let run = runner.run(&options(6, 3, false)).await.unwrap();

		assert_eq!(run.report.results.len(), 6);
		assert_eq!(run.report.statistics.successful, 6);
		assert_eq!(run.report.config.concurrency, 3);
		assert_eq!(run.cancelled, 0);
		assert!(run.location.ends_with("load-test-testnet-rr.json"));

		let submitted = ledger.submitted();
		assert!(submitted.iter().all(|tx| tx["TransactionType"] == "OfferCreate"));
		let from_first = submitted.iter().filter(|tx| tx["Account"] == INVESTOR_1).count();
		assert_eq!(from_first, 3);

		let offer = &submitted[0];
		assert_eq!(offer["TakerGets"], json!("1000000"));
		assert_eq!(offer["TakerPays"]["currency"], "LND");
		assert_eq!(offer["TakerPays"]["issuer"], ISSUER);
		assert_eq!(offer["TakerPays"]["value"], "10");
		let expiration = offer["Expiration"].as_u64().unwrap();
		let now = to_ledger_time(Utc::now()) as u64;
		assert!(expiration > now && expiration <= now + 3600);

		let saved: LoadTestReport = ReportStore::new(Box::new(FileStorage::new(
			dir.path().to_path_buf(),
		)))
		.load(ReportKind::LoadTest, Network::Testnet, "rr")
		.await
		.unwrap();
		assert_eq!(saved.statistics.total, 6);
	}

	#[tokio::test]
	async fn test_failure_threshold_after_persisting() {
		let dir = TempDir::new().unwrap();
		let ledger = Arc::new(FakeLedger::default());
		ledger.reject_submission(1, "tecUNFUNDED_OFFER");
		ledger.reject_submission(2, "tecUNFUNDED_OFFER");
		let runner = runner(ledger, accounts(&[INVESTOR_1]), &dir).with_run_id("breach");

		let err = runner.run(&options(4, 1, false)).await.unwrap_err();

		assert!(matches!(
			err,
			CoreError::FailureThreshold {
				failed: 2,
				total: 4,
				..
			}
		));
		let keys = ReportStore::new(Box::new(FileStorage::new(dir.path().to_path_buf())))
			.list(ReportKind::LoadTest)
			.await
			.unwrap();
		assert_eq!(keys, vec!["load-test-testnet-breach".to_string()]);
	}

	#[tokio::test]
	async fn test_cancel_created_offers() {
		let dir = TempDir::new().unwrap();
		let ledger = Arc::new(FakeLedger::default());
		ledger.reject_submission(2, "tecUNFUNDED_OFFER");
		let mut runner = runner(ledger.clone(), accounts(&[INVESTOR_1, INVESTOR_2]), &dir);
		// One rejected offer out of four stays within the limit.
		runner.config.max_failure_rate = 0.25;

		let run = runner.run(&options(4, 1, true)).await.unwrap();

		assert_eq!(run.report.statistics.failed, 1);
		assert_eq!(run.cancelled, 3);

		let cancels: Vec<_> = ledger
			.submitted()
			.into_iter()
			.filter(|tx| tx["TransactionType"] == "OfferCancel")
			.collect();
		assert_eq!(cancels.len(), 3);
		let mut sequences: Vec<u64> = cancels
			.iter()
			.map(|tx| tx["OfferSequence"].as_u64().unwrap())
			.collect();
		sequences.sort_unstable();
		assert_eq!(sequences, vec![1, 3, 4]);
	}

	#[tokio::test]
	async fn test_requires_investor_roles() {
		let dir = TempDir::new().unwrap();
		let ledger = Arc::new(FakeLedger::default());
		let runner = runner(ledger.clone(), accounts(&[]), &dir);

		let err = runner.run(&options(3, 2, false)).await.unwrap_err();

		assert!(matches!(err, CoreError::Configuration(_)));
		assert!(ledger.submitted().is_empty());
	}

	#[test]
	fn test_offer_sequence_shapes() {
		assert_eq!(offer_sequence(&json!({ "result": { "Sequence": 7 } })), Some(7));
		assert_eq!(
			offer_sequence(&json!({ "result": { "tx_json": { "Sequence": 9 } } })),
			Some(9)
		);
		assert_eq!(offer_sequence(&json!({ "result": { "Sequence": 0 } })), None);
		assert_eq!(offer_sequence(&json!({ "result": {} })), None);
	}
}
