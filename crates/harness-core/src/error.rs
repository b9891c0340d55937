use harness_account::AccountError;
use harness_builder::BuildError;
use harness_delivery::DeliveryError;
use harness_ledger::LedgerError;
use harness_storage::StorageError;
use harness_types::ScenarioReport;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
	#[error("Configuration error: {0}")]
	Configuration(String),

	#[error("Lifecycle error: {0}")]
	Lifecycle(String),

	#[error("Build error: {0}")]
	Build(#[from] BuildError),

	#[error("Account error: {0}")]
	Account(#[from] AccountError),

	#[error("Delivery error: {0}")]
	Delivery(#[from] DeliveryError),

	#[error("Ledger error: {0}")]
	Ledger(#[from] LedgerError),

	#[error("Storage error: {0}")]
	Storage(#[from] StorageError),

	/// The transaction did not succeed. `tx_hash` is set when it reached
	/// the ledger.
	#[error("{transaction} failed: {reason}")]
	Submission {
		transaction: String,
		reason: String,
		tx_hash: Option<String>,
	},

	#[error("Missing scenario state: {0}")]
	MissingState(&'static str),

	/// A scenario step failed. The report has already been finalized and
	/// persisted.
	#[error("Scenario aborted at step {step}: {reason}")]
	ScenarioAborted {
		step: String,
		reason: String,
		report: Box<ScenarioReport>,
	},

	#[error("{failed} of {total} load-test tasks failed, above the {limit} failure rate limit")]
	FailureThreshold {
		failed: usize,
		total: usize,
		limit: f64,
	},
}

impl CoreError {
	/// Hash of the transaction behind a failed submission, if any.
	pub fn tx_hash(&self) -> Option<&str> {
		match self {
			Self::Submission { tx_hash, .. } => tx_hash.as_deref(),
			_ => None,
		}
	}
}
