//! Token lifecycle scenario.
//!
//! A scenario is an ordered list of `ScenarioStep`s run fail-fast: the first
//! failing step aborts the run, later steps are never attempted, and the
//! partial report is still finalized and persisted before the error is
//! returned.

use crate::error::CoreError;
use crate::lifecycle::RunLifecycle;
use async_trait::async_trait;
use chrono::Utc;
use harness_account::{AccountBook, AccountInterface};
use harness_config::ScenarioConfig;
use harness_delivery::{extract_issuance_id_with_lookup, lookup_issuance_id, ReliableSubmitter};
use harness_storage::{ReportKind, ReportStore};
use harness_types::{
	Address, Memo, Network, ScenarioReport, ScenarioStepResult, SubmissionOutcome, TokenIdentity,
	TransactionIntent,
};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Role that issues, authorizes, funds and freezes.
pub const ISSUER_ROLE: &str = "issuer";

/// State shared by the steps of one run.
pub struct ScenarioContext {
	pub config: ScenarioConfig,
	pub accounts: AccountBook,
	pub submitter: Arc<ReliableSubmitter>,
	/// Set by the issue step.
	pub issuance_id: Option<String>,
	/// Set by the collateral step.
	pub collateral_issuance_id: Option<String>,
}

impl ScenarioContext {
	pub fn new(
		config: ScenarioConfig,
		accounts: AccountBook,
		submitter: Arc<ReliableSubmitter>,
	) -> Self {
		Self {
			config,
			accounts,
			submitter,
			issuance_id: None,
			collateral_issuance_id: None,
		}
	}

	pub fn issuer(&self) -> Result<Arc<dyn AccountInterface>, CoreError> {
		Ok(self.accounts.get(ISSUER_ROLE)?)
	}

	pub fn holder(&self, role: &str) -> Result<Address, CoreError> {
		Ok(self.accounts.get(role)?.address().clone())
	}

	/// The first configured holder, who is funded and frozen.
	pub fn primary_holder(&self) -> Result<Address, CoreError> {
		let role = self.config.holders.first().ok_or_else(|| {
			CoreError::Configuration("scenario defines no holders".to_string())
		})?;
		self.holder(role)
	}

	pub fn token(&self) -> Result<TokenIdentity, CoreError> {
		self.issuance_id
			.clone()
			.map(|id| TokenIdentity::Issuance { id })
			.ok_or(CoreError::MissingState("issuance id"))
	}

	fn memos(&self) -> Vec<Memo> {
		self.config.memo.iter().map(Memo::text).collect()
	}

	/// Submits an intent and requires it to succeed.
	pub async fn submit(
		&self,
		intent: &TransactionIntent,
		account: &dyn AccountInterface,
	) -> Result<SubmissionOutcome, CoreError> {
		let outcome = self.submitter.submit_intent(intent, account).await;
		if outcome.is_success() {
			Ok(outcome)
		} else {
			Err(CoreError::Submission {
				transaction: intent.transaction_type().to_string(),
				reason: outcome.failure_reason(),
				tx_hash: outcome.tx_hash().map(str::to_string),
			})
		}
	}

	/// Issuance id created by a successful submission, from the validated
	/// response or the transaction's metadata.
	async fn issuance_id_of(&self, outcome: &SubmissionOutcome) -> Result<String, CoreError> {
		let client = self.submitter.client().as_ref();
		if let Some(response) = outcome.response() {
			return Ok(extract_issuance_id_with_lookup(response, client).await?);
		}
		let hash = outcome.tx_hash().ok_or(CoreError::MissingState("transaction hash"))?;
		Ok(lookup_issuance_id(hash, client).await?)
	}
}

/// One named step of a scenario.
#[async_trait]
pub trait ScenarioStep: Send + Sync {
	fn name(&self) -> &str;

	/// Runs the step, returning the hash of its last transaction.
	async fn run(&self, ctx: &mut ScenarioContext) -> Result<Option<String>, CoreError>;
}

pub struct IssueToken;

#[async_trait]
impl ScenarioStep for IssueToken {
	fn name(&self) -> &str {
		"issue-token"
	}

	async fn run(&self, ctx: &mut ScenarioContext) -> Result<Option<String>, CoreError> {
		let issuer = ctx.issuer()?;
		let intent = harness_builder::issuance_create(
			issuer.address().as_str(),
			&ctx.config.currency,
			&ctx.config.supply,
			ctx.config.decimals,
			ctx.config.transferable,
			ctx.memos(),
		)?;

		let outcome = ctx.submit(&intent, issuer.as_ref()).await?;
		let id = ctx.issuance_id_of(&outcome).await?;
		info!(issuance_id = %id, currency = %ctx.config.currency, "Token issued");
		ctx.issuance_id = Some(id);
		Ok(outcome.tx_hash().map(str::to_string))
	}
}

pub struct AuthorizeHolders;

#[async_trait]
impl ScenarioStep for AuthorizeHolders {
	fn name(&self) -> &str {
		"authorize-holders"
	}

	async fn run(&self, ctx: &mut ScenarioContext) -> Result<Option<String>, CoreError> {
		let issuer = ctx.issuer()?;
		let token = ctx.token()?;
		let mut last_hash = None;

		for role in &ctx.config.holders {
			let holder = ctx.holder(role)?;
			let intent = harness_builder::authorize(
				issuer.address().as_str(),
				token.clone(),
				holder.as_str(),
				true,
			)?;
			let outcome = ctx.submit(&intent, issuer.as_ref()).await?;
			info!(holder = %holder, role = %role, "Holder authorized");
			last_hash = outcome.tx_hash().map(str::to_string);
		}

		Ok(last_hash)
	}
}

pub struct FundHolder;

#[async_trait]
impl ScenarioStep for FundHolder {
	fn name(&self) -> &str {
		"fund-holder"
	}

	async fn run(&self, ctx: &mut ScenarioContext) -> Result<Option<String>, CoreError> {
		let issuer = ctx.issuer()?;
		let holder = ctx.primary_holder()?;
		let issuance_id = ctx
			.issuance_id
			.as_deref()
			.ok_or(CoreError::MissingState("issuance id"))?;

		let amount =
			harness_builder::mpt(issuance_id, &ctx.config.fund_amount, ctx.config.decimals)?;
		let intent = harness_builder::payment(
			issuer.address().as_str(),
			holder.as_str(),
			amount,
			ctx.memos(),
		)?;

		let outcome = ctx.submit(&intent, issuer.as_ref()).await?;
		Ok(outcome.tx_hash().map(str::to_string))
	}
}

/// Freezes or unfreezes the primary holder.
pub struct SetHolderFreeze {
	name: &'static str,
	freeze: bool,
}

impl SetHolderFreeze {
	pub fn freeze() -> Self {
		Self {
			name: "freeze-holder",
			freeze: true,
		}
	}

	pub fn unfreeze() -> Self {
		Self {
			name: "unfreeze-holder",
			freeze: false,
		}
	}
}

#[async_trait]
impl ScenarioStep for SetHolderFreeze {
	fn name(&self) -> &str {
		self.name
	}

	async fn run(&self, ctx: &mut ScenarioContext) -> Result<Option<String>, CoreError> {
		let issuer = ctx.issuer()?;
		let holder = ctx.primary_holder()?;
		let intent = harness_builder::freeze(
			issuer.address().as_str(),
			ctx.token()?,
			holder.as_str(),
			self.freeze,
		)?;

		let outcome = ctx.submit(&intent, issuer.as_ref()).await?;
		info!(holder = %holder, frozen = self.freeze, "Holder freeze updated");
		Ok(outcome.tx_hash().map(str::to_string))
	}
}

pub struct IssueCollateralToken;

#[async_trait]
impl ScenarioStep for IssueCollateralToken {
	fn name(&self) -> &str {
		"issue-collateral-token"
	}

	async fn run(&self, ctx: &mut ScenarioContext) -> Result<Option<String>, CoreError> {
		let issuer = ctx.issuer()?;
		let intent = harness_builder::issuance_create(
			issuer.address().as_str(),
			&ctx.config.collateral_currency,
			&ctx.config.collateral_supply,
			ctx.config.decimals,
			ctx.config.transferable,
			ctx.memos(),
		)?;

		let outcome = ctx.submit(&intent, issuer.as_ref()).await?;
		// Nothing later depends on the collateral id, so a missing one is
		// only worth a warning.
		match ctx.issuance_id_of(&outcome).await {
			Ok(id) => {
				info!(issuance_id = %id, "Collateral token issued");
				ctx.collateral_issuance_id = Some(id);
			}
			Err(e) => warn!("Collateral token issued but its id is unknown: {}", e),
		}
		Ok(outcome.tx_hash().map(str::to_string))
	}
}

/// The lifecycle run by the `scenario` command.
pub fn default_steps() -> Vec<Box<dyn ScenarioStep>> {
	vec![
		Box::new(IssueToken),
		Box::new(AuthorizeHolders),
		Box::new(FundHolder),
		Box::new(SetHolderFreeze::freeze()),
		Box::new(IssueCollateralToken),
		Box::new(SetHolderFreeze::unfreeze()),
	]
}

/// A finished, persisted scenario run.
#[derive(Debug)]
pub struct ScenarioRun {
	pub report: ScenarioReport,
	pub location: String,
}

pub struct ScenarioOrchestrator {
	network: Network,
	steps: Vec<Box<dyn ScenarioStep>>,
	store: Arc<ReportStore>,
	run_id: String,
}

impl ScenarioOrchestrator {
	pub fn new(network: Network, steps: Vec<Box<dyn ScenarioStep>>, store: Arc<ReportStore>) -> Self {
		Self {
			network,
			steps,
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

	/// Runs every step in order, stopping at the first failure.
	///
	/// Returns `CoreError::ScenarioAborted` carrying the persisted partial
	/// report when a step fails.
	pub async fn run(&self, ctx: &mut ScenarioContext) -> Result<ScenarioRun, CoreError> {
		let mut lifecycle = RunLifecycle::new();
		let mut report = ScenarioReport::start(self.network, &self.run_id);
		let mut failure = None;

		info!(
			network = %self.network,
			run_id = %self.run_id,
			steps = self.steps.len(),
			"Starting scenario"
		);

		for (index, step) in self.steps.iter().enumerate() {
			let name = step.name().to_string();
			lifecycle.begin_step(index, &name)?;
			info!(step = %name, "[{}/{}] Running step", index + 1, self.steps.len());

			let timestamp = Utc::now();
			let started = Instant::now();
			let result = step.run(ctx).await;
			let duration_ms = started.elapsed().as_millis() as u64;

			match result {
				Ok(tx_hash) => {
					info!(step = %name, duration_ms, tx_hash = tx_hash.as_deref().unwrap_or("-"), "Step passed");
					report.record(ScenarioStepResult {
						step: name,
						success: true,
						tx_hash,
						error: None,
						duration_ms,
						timestamp,
					});
				}
				Err(e) => {
					error!(step = %name, duration_ms, "Step failed: {}", e);
					report.record(ScenarioStepResult {
						step: name.clone(),
						success: false,
						tx_hash: e.tx_hash().map(str::to_string),
						error: Some(e.to_string()),
						duration_ms,
						timestamp,
					});
					lifecycle.abort()?;
					failure = Some((name, e.to_string()));
					break;
				}
			}
		}

		if failure.is_none() {
			lifecycle.complete()?;
		}
		report.finalize();

		let saved = self
			.store
			.save(ReportKind::Scenario, self.network, &self.run_id, &report)
			.await;

		info!(
			total = report.summary.total,
			passed = report.summary.passed,
			failed = report.summary.failed,
			"Scenario finished: {}",
			lifecycle.state()
		);

		match (failure, saved) {
			(Some((step, reason)), saved) => {
				if let Err(e) = saved {
					error!("Failed to persist scenario report: {}", e);
				}
				Err(CoreError::ScenarioAborted {
					step,
					reason,
					report: Box::new(report),
				})
			}
			(None, saved) => Ok(ScenarioRun {
				report,
				location: saved?,
			}),
		}
	}
}
