//! Ledger fake shared by the runner tests.

use async_trait::async_trait;
use backoff::backoff::Zero;
use harness_delivery::{ReliableSubmitter, SubmissionPolicy};
use harness_ledger::{LedgerClient, LedgerError, LedgerTransaction, SubmitAck};
use harness_types::{Network, SignedPayload};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub fn hash(n: u32) -> String {
	format!("{:064X}", n)
}

/// Accepts and validates every submission unless told otherwise. The n-th
/// submission (1-based) gets hash `hash(n)` and account sequence `n`.
#[derive(Default)]
pub struct FakeLedger {
	submitted: Mutex<Vec<Value>>,
	rejections: Mutex<HashMap<u32, String>>,
	issuance_ids: Mutex<HashMap<String, String>>,
}

impl FakeLedger {
	/// Makes the n-th submission fail with a terminal engine result.
	pub fn reject_submission(&self, n: u32, code: &str) {
		self.rejections.lock().unwrap().insert(n, code.to_string());
	}

	/// Metadata of `hash` will report the given issuance id.
	pub fn set_issuance_id(&self, hash: String, id: &str) {
		self.issuance_ids.lock().unwrap().insert(hash, id.to_string());
	}

	pub fn submitted_types(&self) -> Vec<String> {
		self.submitted
			.lock()
			.unwrap()
			.iter()
			.map(|tx| tx["TransactionType"].as_str().unwrap_or("?").to_string())
			.collect()
	}

	pub fn submitted(&self) -> Vec<Value> {
		self.submitted.lock().unwrap().clone()
	}

	fn sequence_of(hash: &str) -> Option<u32> {
		u32::from_str_radix(hash, 16).ok()
	}
}

#[async_trait]
impl LedgerClient for FakeLedger {
	fn network(&self) -> Network {
		Network::Testnet
	}

	async fn submit(&self, payload: &SignedPayload) -> Result<SubmitAck, LedgerError> {
		let tx_json = payload.tx_json().cloned().unwrap_or(Value::Null);
		let n = {
			let mut submitted = self.submitted.lock().unwrap();
			submitted.push(tx_json);
			submitted.len() as u32
		};

		let code = self
			.rejections
			.lock()
			.unwrap()
			.get(&n)
			.cloned()
			.unwrap_or_else(|| "tesSUCCESS".to_string());

		Ok(SubmitAck {
			engine_result: Some(code),
			engine_result_message: None,
			tx_hash: Some(hash(n)),
			raw: json!({}),
		})
	}

	async fn transaction(&self, tx_hash: &str) -> Result<LedgerTransaction, LedgerError> {
		let n = Self::sequence_of(tx_hash).ok_or_else(|| LedgerError::NotFound(tx_hash.to_string()))?;
		let tx_json = self
			.submitted
			.lock()
			.unwrap()
			.get(n.wrapping_sub(1) as usize)
			.cloned()
			.ok_or_else(|| LedgerError::NotFound(tx_hash.to_string()))?;
		if self.rejections.lock().unwrap().contains_key(&n) {
			return Err(LedgerError::NotFound(tx_hash.to_string()));
		}

		let mut meta = json!({ "TransactionResult": "tesSUCCESS" });
		if let Some(id) = self.issuance_ids.lock().unwrap().get(tx_hash) {
			meta["mpt_issuance_id"] = Value::String(id.clone());
		}

		Ok(LedgerTransaction {
			hash: tx_hash.to_string(),
			validated: true,
			result: Some("tesSUCCESS".to_string()),
			ledger_index: Some(1000 + n),
			raw: json!({
				"result": {
					"hash": tx_hash,
					"Account": tx_json["Account"],
					"Sequence": n,
					"meta": meta,
					"validated": true
				}
			}),
		})
	}

	async fn current_ledger_index(&self) -> Result<u32, LedgerError> {
		Ok(1000)
	}

	async fn validated_ledger_index(&self) -> Result<u32, LedgerError> {
		Ok(999)
	}

	/// The sequence the next submission will be given.
	async fn account_sequence(&self, _account: &str) -> Result<u32, LedgerError> {
		Ok(self.submitted.lock().unwrap().len() as u32 + 1)
	}
}

/// Submitter over `ledger` with no delays.
pub fn fake_submitter(ledger: Arc<FakeLedger>) -> ReliableSubmitter {
	ReliableSubmitter::new(
		ledger,
		SubmissionPolicy {
			max_retries: 3,
			poll_interval: Duration::ZERO,
			max_polls: 2,
			ledger_margin: 20,
		},
	)
	.with_backoff(|| Zero {})
}
