//! Report persistence.
//!
//! Run reports are written once, at the end of a run, as JSON documents keyed
//! by `<kind>-<network>-<run id>`. The backend is a byte store behind
//! `StorageInterface`; `ReportStore` adds the typed layer on top.

use async_trait::async_trait;
use harness_types::Network;
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

pub mod implementations;

pub use implementations::file::FileStorage;

#[derive(Debug, Error)]
pub enum StorageError {
	#[error("Not found: {0}")]
	NotFound(String),
	#[error("Serialization error: {0}")]
	Serialization(String),
	#[error("Backend error: {0}")]
	Backend(String),
}

/// Low-level key/value byte storage.
#[async_trait]
pub trait StorageInterface: Send + Sync {
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError>;

	/// Stores `value` under `key`, replacing any previous value. Returns a
	/// human-readable location of the stored value.
	async fn set_bytes(&self, key: &str, value: Vec<u8>) -> Result<String, StorageError>;

	/// Keys starting with `prefix`, sorted.
	async fn keys(&self, prefix: &str) -> Result<Vec<String>, StorageError>;
}

/// Kind of report, used as the key prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
	Scenario,
	LoadTest,
}

impl ReportKind {
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Scenario => "scenario",
			Self::LoadTest => "load-test",
		}
	}
}

pub fn report_key(kind: ReportKind, network: Network, run_id: &str) -> String {
	format!("{}-{}-{}", kind.as_str(), network, run_id)
}

/// Typed report storage.
pub struct ReportStore {
	backend: Box<dyn StorageInterface>,
}

impl ReportStore {
	pub fn new(backend: Box<dyn StorageInterface>) -> Self {
		Self { backend }
	}

	/// Serializes and stores a report, returning where it was written.
	pub async fn save<T: Serialize>(
		&self,
		kind: ReportKind,
		network: Network,
		run_id: &str,
		report: &T,
	) -> Result<String, StorageError> {
		let key = report_key(kind, network, run_id);
		let bytes = serde_json::to_vec_pretty(report)
			.map_err(|e| StorageError::Serialization(e.to_string()))?;
		self.backend.set_bytes(&key, bytes).await
	}

	pub async fn load<T: DeserializeOwned>(
		&self,
		kind: ReportKind,
		network: Network,
		run_id: &str,
	) -> Result<T, StorageError> {
		let bytes = self
			.backend
			.get_bytes(&report_key(kind, network, run_id))
			.await?;
		serde_json::from_slice(&bytes).map_err(|e| StorageError::Serialization(e.to_string()))
	}

	/// Keys of stored reports of one kind.
	pub async fn list(&self, kind: ReportKind) -> Result<Vec<String>, StorageError> {
		self.backend.keys(kind.as_str()).await
	}
}
