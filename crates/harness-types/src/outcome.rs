//! Submission outcomes and ledger engine result classification.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How the harness should react to an engine result code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineResult {
	/// Applied successfully.
	Success,
	/// Accepted but not yet included; may still apply. Poll for validation.
	Pending,
	/// Not applied for a transient reason; submit again after a delay.
	Retry,
	/// Will never apply. Do not retry.
	TerminalFailure,
}

impl EngineResult {
	/// Classifies a ledger engine result code such as `tesSUCCESS`.
	///
	/// Unknown codes are terminal so that nothing unrecognised is ever
	/// resubmitted.
	pub fn classify(code: &str) -> Self {
		match code {
			"tesSUCCESS" => Self::Success,
			"tefPAST_SEQ" | "tefMAX_LEDGER" => Self::Retry,
			c if c.starts_with("ter") => Self::Pending,
			c if c.starts_with("tel") => Self::Retry,
			_ => Self::TerminalFailure,
		}
	}
}

/// The single, canonical result of a reliable submission.
///
/// A successful outcome always carries a non-empty transaction hash. A failed
/// outcome always carries an error message or an engine result code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionOutcome {
	success: bool,
	tx_hash: Option<String>,
	#[serde(rename = "engineResultCode")]
	engine_result: Option<String>,
	error: Option<String>,
	attempts: u32,
	/// Ledger response for the validated transaction, when one was seen.
	#[serde(skip)]
	response: Option<Value>,
}

impl SubmissionOutcome {
	/// A validated, successfully applied transaction.
	///
	/// Falls back to a failed outcome if the hash is empty, since success
	/// without a hash cannot be confirmed.
	pub fn success(tx_hash: impl Into<String>, engine_result: Option<String>, attempts: u32) -> Self {
		let tx_hash = tx_hash.into();
		if tx_hash.trim().is_empty() {
			return Self::failure(
				engine_result,
				Some("Transaction reported success without a hash".to_string()),
				attempts,
			);
		}
		Self {
			success: true,
			tx_hash: Some(tx_hash),
			engine_result,
			error: None,
			attempts: attempts.max(1),
			response: None,
		}
	}

	/// A definitive failure.
	pub fn failure(engine_result: Option<String>, error: Option<String>, attempts: u32) -> Self {
		let error = match (&engine_result, error) {
			(None, None) => Some("Submission failed without a result code".to_string()),
			(_, error) => error,
		};
		Self {
			success: false,
			tx_hash: None,
			engine_result,
			error,
			attempts: attempts.max(1),
			response: None,
		}
	}

	/// Attaches the hash of a transaction that was applied but failed.
	pub fn with_tx_hash(mut self, tx_hash: Option<String>) -> Self {
		if !self.success {
			self.tx_hash = tx_hash.filter(|h| !h.is_empty());
		}
		self
	}

	/// Attaches the ledger response the outcome was read from.
	pub fn with_response(mut self, response: Value) -> Self {
		self.response = Some(response);
		self
	}

	pub fn response(&self) -> Option<&Value> {
		self.response.as_ref()
	}

	pub fn is_success(&self) -> bool {
		self.success
	}

	pub fn tx_hash(&self) -> Option<&str> {
		self.tx_hash.as_deref()
	}

	pub fn engine_result(&self) -> Option<&str> {
		self.engine_result.as_deref()
	}

	pub fn error(&self) -> Option<&str> {
		self.error.as_deref()
	}

	pub fn attempts(&self) -> u32 {
		self.attempts
	}

	/// A one-line description of why the submission failed.
	pub fn failure_reason(&self) -> String {
		match (&self.engine_result, &self.error) {
			(Some(code), Some(error)) => format!("{}: {}", code, error),
			(Some(code), None) => code.clone(),
			(None, Some(error)) => error.clone(),
			(None, None) => "unknown failure".to_string(),
		}
	}

	/// Converts the outcome into the transaction hash or the failure reason.
	pub fn into_result(self) -> Result<String, String> {
		if self.success {
			self.tx_hash
				.ok_or_else(|| "Transaction reported success without a hash".to_string())
		} else {
			Err(self.failure_reason())
		}
	}
}
