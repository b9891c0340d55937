//! Configuration types for the harness.

use harness_types::Network;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// Complete per-network harness configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HarnessConfig {
	/// Target network and endpoint
	pub network: NetworkConfig,
	/// Reliable submission settings
	#[serde(default)]
	pub submission: SubmissionConfig,
	/// Load-test defaults
	#[serde(default)]
	pub load_test: LoadTestConfig,
	/// Token lifecycle scenario parameters
	pub scenario: ScenarioConfig,
	/// Where run reports are written
	#[serde(default)]
	pub reports: ReportsConfig,
	/// Location of the account book
	pub accounts: AccountsConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NetworkConfig {
	pub name: Network,
	/// JSON-RPC endpoint; the network's public endpoint when absent
	pub rpc_url: Option<String>,
	#[serde(default = "default_request_timeout_secs")]
	pub request_timeout_secs: u64,
}

impl NetworkConfig {
	pub fn rpc_url(&self) -> &str {
		self.rpc_url
			.as_deref()
			.unwrap_or_else(|| self.name.default_rpc_url())
	}
}

fn default_request_timeout_secs() -> u64 {
	20
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SubmissionConfig {
	/// Submission attempts before giving up
	pub max_retries: u32,
	/// Delay between validation polls
	pub poll_interval_ms: u64,
	/// Validation polls per attempt
	pub max_polls: u32,
	pub initial_backoff_ms: u64,
	pub max_backoff_ms: u64,
	/// Ledgers past the current one in which a transaction may still apply
	pub last_ledger_offset: u32,
}

impl Default for SubmissionConfig {
	fn default() -> Self {
		Self {
			max_retries: 3,
			poll_interval_ms: 1000,
			max_polls: 20,
			initial_backoff_ms: 500,
			max_backoff_ms: 8000,
			last_ledger_offset: 20,
		}
	}
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoadTestConfig {
	pub total_offers: usize,
	pub concurrency: usize,
	/// Fraction of failed tasks (0.0 to 1.0) above which the run fails
	pub max_failure_rate: f64,
	pub offer_expiration_secs: u64,
	/// Currency code the offers ask for, issued by the issuer role
	pub currency: String,
	/// Native amount each offer gives, in whole units
	pub offer_xrp: String,
	/// Token amount each offer asks for
	pub offer_value: String,
}

impl Default for LoadTestConfig {
	fn default() -> Self {
		Self {
			total_offers: 100,
			concurrency: 10,
			max_failure_rate: 0.1,
			offer_expiration_secs: 3600,
			currency: "LND".to_string(),
			offer_xrp: "1".to_string(),
			offer_value: "10".to_string(),
		}
	}
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScenarioConfig {
	pub currency: String,
	pub decimals: u8,
	/// Maximum supply, in whole tokens
	pub supply: String,
	#[serde(default = "default_true")]
	pub transferable: bool,
	/// Amount paid to the first holder, in whole tokens
	pub fund_amount: String,
	pub collateral_currency: String,
	pub collateral_supply: String,
	/// Account roles that receive authorization
	pub holders: Vec<String>,
	pub memo: Option<String>,
}

fn default_true() -> bool {
	true
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReportsConfig {
	pub directory: PathBuf,
}

impl Default for ReportsConfig {
	fn default() -> Self {
		Self {
			directory: PathBuf::from("./reports"),
		}
	}
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AccountsConfig {
	/// Path to the account book; relative paths resolve against the
	/// configuration file's directory
	pub path: PathBuf,
}

/// Named roles mapped to signing credentials.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AccountBookConfig {
	pub roles: BTreeMap<String, AccountEntry>,
}

#[derive(Clone, Deserialize, Serialize)]
pub struct AccountEntry {
	pub address: String,
	pub seed: String,
}

impl fmt::Debug for AccountEntry {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("AccountEntry")
			.field("address", &self.address)
			.field("seed", &"<redacted>")
			.finish()
	}
}
