//! Ledger network client boundary.
//!
//! This crate defines the `LedgerClient` capability every component uses to
//! talk to the ledger: submit a signed payload, look a transaction up and read
//! ledger indexes and account sequences. Components receive the client as an
//! `Arc<dyn LedgerClient>` so tests can substitute a scripted fake.
//!
//! # Architecture
//!
//! - `utils`: retry wrapper for read-only requests
//! - `implementations`: concrete clients (JSON-RPC over HTTP)

use async_trait::async_trait;
use harness_types::{Network, SignedPayload};
use serde_json::Value;
use thiserror::Error;

pub mod implementations;
pub mod utils;

pub use implementations::json_rpc::JsonRpcClient;

/// Errors returned by ledger clients.
#[derive(Debug, Error)]
pub enum LedgerError {
	/// The request never produced a response (connection drop, timeout).
	#[error("Transport error: {0}")]
	Transport(String),
	/// The node answered with an error status.
	#[error("RPC error {code}: {message}")]
	Rpc { code: String, message: String },
	/// The ledger does not know the transaction (yet).
	#[error("Transaction {0} not found")]
	NotFound(String),
	/// The response did not have the expected structure.
	#[error("Invalid response: {0}")]
	InvalidResponse(String),
}

impl LedgerError {
	/// Transport failures and an overloaded node may succeed on a later
	/// attempt.
	pub fn is_transient(&self) -> bool {
		match self {
			Self::Transport(_) | Self::NotFound(_) => true,
			Self::Rpc { code, .. } => matches!(
				code.as_str(),
				"tooBusy" | "noCurrent" | "noNetwork" | "slowDown"
			),
			Self::InvalidResponse(_) => false,
		}
	}
}

/// Acknowledgement returned by a single submission.
///
/// The engine result here is preliminary; finality is only known once the
/// transaction appears in a validated ledger.
#[derive(Debug, Clone)]
pub struct SubmitAck {
	pub engine_result: Option<String>,
	pub engine_result_message: Option<String>,
	pub tx_hash: Option<String>,
	/// The untouched response, kept for result extraction.
	pub raw: Value,
}

/// A transaction as currently known to the ledger.
#[derive(Debug, Clone)]
pub struct LedgerTransaction {
	pub hash: String,
	/// True once the transaction is part of a validated ledger.
	pub validated: bool,
	/// Final engine result from the transaction metadata, when available.
	pub result: Option<String>,
	pub ledger_index: Option<u32>,
	/// The untouched response, including metadata.
	pub raw: Value,
}

/// Capability for talking to a ledger network.
#[async_trait]
pub trait LedgerClient: Send + Sync {
	/// The network this client is connected to.
	fn network(&self) -> Network;

	/// Submits a signed payload once. Implementations must not resubmit.
	async fn submit(&self, payload: &SignedPayload) -> Result<SubmitAck, LedgerError>;

	/// Looks up a transaction by hash.
	async fn transaction(&self, hash: &str) -> Result<LedgerTransaction, LedgerError>;

	/// Index of the ledger currently being built.
	async fn current_ledger_index(&self) -> Result<u32, LedgerError>;

	/// Index of the most recent validated ledger.
	async fn validated_ledger_index(&self) -> Result<u32, LedgerError>;

	/// Next sequence number of `account`, including queued transactions.
	async fn account_sequence(&self, account: &str) -> Result<u32, LedgerError>;
}
