//! JSON-RPC ledger client over HTTP.
//!
//! Speaks the node's JSON-RPC dialect: a POST body of
//! `{"method": ..., "params": [{...}]}` answered by `{"result": {...}}`, where
//! errors are reported in-band with `"status": "error"`.

use crate::utils::ReadRetry;
use crate::{LedgerClient, LedgerError, LedgerTransaction, SubmitAck};
use async_trait::async_trait;
use harness_types::{Network, SignedPayload};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info};

/// HTTP JSON-RPC client for a single ledger network.
#[derive(Debug, Clone)]
pub struct JsonRpcClient {
	http: reqwest::Client,
	url: String,
	network: Network,
	read_retry: ReadRetry,
}

impl JsonRpcClient {
	/// Creates a client for the given endpoint.
	pub fn new(
		network: Network,
		url: impl Into<String>,
		timeout: Duration,
	) -> Result<Self, LedgerError> {
		let url = url.into();
		if !(url.starts_with("http://") || url.starts_with("https://")) {
			return Err(LedgerError::Transport(format!(
				"RPC URL must start with http:// or https://, got {}",
				url
			)));
		}

		let http = reqwest::Client::builder()
			.timeout(timeout)
			.build()
			.map_err(|e| LedgerError::Transport(format!("Failed to build HTTP client: {}", e)))?;

		info!("Created JSON-RPC client for {} at {}", network, url);

		Ok(Self {
			http,
			url,
			network,
			read_retry: ReadRetry::new(),
		})
	}

	pub fn with_read_retry(mut self, read_retry: ReadRetry) -> Self {
		self.read_retry = read_retry;
		self
	}

	/// Sends one request and returns the `result` object.
	async fn call(&self, method: &str, params: Value) -> Result<Value, LedgerError> {
		debug!(method, "Sending JSON-RPC request");

		let body = json!({ "method": method, "params": [params] });
		let response = self
			.http
			.post(&self.url)
			.json(&body)
			.send()
			.await
			.map_err(|e| LedgerError::Transport(format!("{} request failed: {}", method, e)))?;

		let status = response.status();
		if status.is_server_error() {
			return Err(LedgerError::Transport(format!(
				"{} returned HTTP {}",
				method, status
			)));
		}

		let payload: Value = response.json().await.map_err(|e| {
			LedgerError::InvalidResponse(format!("{} returned non-JSON body: {}", method, e))
		})?;

		unwrap_result(payload)
	}
}

/// Pulls the `result` object out of a response, mapping in-band errors.
fn unwrap_result(payload: Value) -> Result<Value, LedgerError> {
	let result = payload
		.get("result")
		.cloned()
		.ok_or_else(|| LedgerError::InvalidResponse("missing result field".to_string()))?;

	if result.get("status").and_then(Value::as_str) == Some("error") {
		let code = result
			.get("error")
			.and_then(Value::as_str)
			.unwrap_or("unknown")
			.to_string();
		let message = result
			.get("error_message")
			.or_else(|| result.get("error_exception"))
			.and_then(Value::as_str)
			.unwrap_or_default()
			.to_string();
		return Err(LedgerError::Rpc { code, message });
	}

	Ok(result)
}

/// Builds the `submit` parameters for a payload.
fn submit_params(payload: &SignedPayload) -> Value {
	match payload {
		SignedPayload::Blob(blob) => json!({ "tx_blob": blob }),
		SignedPayload::ServerSigned { tx_json, secret } => json!({
			"tx_json": tx_json,
			"secret": secret,
		}),
	}
}

fn parse_submit(result: Value) -> SubmitAck {
	let text = |key: &str| result.get(key).and_then(Value::as_str).map(str::to_string);

	let engine_result = text("engine_result");
	let engine_result_message = text("engine_result_message");
	let tx_hash = result
		.pointer("/tx_json/hash")
		.and_then(Value::as_str)
		.map(str::to_string);

	SubmitAck {
		engine_result,
		engine_result_message,
		tx_hash,
		raw: json!({ "result": result }),
	}
}

/// Reads a ledger index that nodes report either as a number or a string.
fn ledger_index(value: Option<&Value>) -> Option<u32> {
	let index = match value? {
		Value::Number(n) => n.as_u64(),
		Value::String(s) => s.parse().ok(),
		_ => None,
	};
	index.and_then(|i| u32::try_from(i).ok())
}

fn parse_account_sequence(result: &Value) -> Result<u32, LedgerError> {
	result
		.pointer("/account_data/Sequence")
		.and_then(Value::as_u64)
		.and_then(|s| u32::try_from(s).ok())
		.ok_or_else(|| LedgerError::InvalidResponse("missing account_data.Sequence".to_string()))
}

fn parse_transaction(hash: &str, result: Value) -> LedgerTransaction {
	let validated = result
		.get("validated")
		.and_then(Value::as_bool)
		.unwrap_or(false);
	let outcome = result
		.pointer("/meta/TransactionResult")
		.and_then(Value::as_str)
		.map(str::to_string);
	let ledger_index = ledger_index(result.get("ledger_index"));
	let hash = result
		.get("hash")
		.and_then(Value::as_str)
		.unwrap_or(hash)
		.to_string();

	LedgerTransaction {
		hash,
		validated,
		result: outcome,
		ledger_index,
		raw: json!({ "result": result }),
	}
}

#[async_trait]
impl LedgerClient for JsonRpcClient {
	fn network(&self) -> Network {
		self.network
	}

	async fn submit(&self, payload: &SignedPayload) -> Result<SubmitAck, LedgerError> {
		let result = self.call("submit", submit_params(payload)).await?;
		let ack = parse_submit(result);
		info!(
			engine_result = ack.engine_result.as_deref().unwrap_or("-"),
			tx_hash = ack.tx_hash.as_deref().unwrap_or("-"),
			"Submitted transaction"
		);
		Ok(ack)
	}

	async fn transaction(&self, hash: &str) -> Result<LedgerTransaction, LedgerError> {
		let params = json!({ "transaction": hash, "binary": false });
		let result = self
			.read_retry
			.run("tx lookup", || self.call("tx", params.clone()))
			.await;

		match result {
			Ok(result) => Ok(parse_transaction(hash, result)),
			Err(LedgerError::Rpc { code, .. }) if code == "txnNotFound" => {
				Err(LedgerError::NotFound(hash.to_string()))
			}
			Err(e) => Err(e),
		}
	}

	async fn current_ledger_index(&self) -> Result<u32, LedgerError> {
		let result = self
			.read_retry
			.run("ledger_current", || self.call("ledger_current", json!({})))
			.await?;

		result
			.get("ledger_current_index")
			.and_then(Value::as_u64)
			.and_then(|i| u32::try_from(i).ok())
			.ok_or_else(|| {
				LedgerError::InvalidResponse("missing ledger_current_index".to_string())
			})
	}

	async fn validated_ledger_index(&self) -> Result<u32, LedgerError> {
		let params = json!({ "ledger_index": "validated" });
		let result = self
			.read_retry
			.run("ledger", || self.call("ledger", params.clone()))
			.await?;

		ledger_index(result.get("ledger_index"))
			.ok_or_else(|| LedgerError::InvalidResponse("missing ledger_index".to_string()))
	}

	async fn account_sequence(&self, account: &str) -> Result<u32, LedgerError> {
		let params = json!({ "account": account, "ledger_index": "current" });
		let result = self
			.read_retry
			.run("account_info", || self.call("account_info", params.clone()))
			.await?;

		parse_account_sequence(&result)
	}
}
