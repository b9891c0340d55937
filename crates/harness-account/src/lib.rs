//! Signing accounts for the harness.
//!
//! An account book maps named roles (`issuer`, `investor-1`, ...) to signing
//! accounts. It is loaded once at the start of a run and shared read-only.

use async_trait::async_trait;
use harness_config::AccountBookConfig;
use harness_types::{Address, SignedPayload};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

pub mod implementations;

pub use implementations::local::LocalWallet;

#[derive(Debug, Error)]
pub enum AccountError {
	#[error("Signing failed: {0}")]
	SigningFailed(String),
	#[error("Invalid key: {0}")]
	InvalidKey(String),
	#[error("Unknown account role: {0}")]
	UnknownRole(String),
}

#[async_trait]
pub trait AccountInterface: Send + Sync {
	fn address(&self) -> &Address;
	/// Prepares a transaction for submission under this account's authority.
	async fn sign_transaction(
		&self,
		tx_json: &serde_json::Value,
	) -> Result<SignedPayload, AccountError>;
}

/// Role name to account mapping.
#[derive(Clone, Default)]
pub struct AccountBook {
	accounts: BTreeMap<String, Arc<dyn AccountInterface>>,
}

impl AccountBook {
	pub fn new() -> Self {
		Self::default()
	}

	/// Builds local wallets for every role in the configuration.
	pub fn from_config(config: &AccountBookConfig) -> Result<Self, AccountError> {
		let mut book = Self::new();
		for (role, entry) in &config.roles {
			let wallet = LocalWallet::new(&entry.address, &entry.seed)
				.map_err(|e| AccountError::InvalidKey(format!("role {}: {}", role, e)))?;
			book.insert(role.clone(), Arc::new(wallet));
		}
		info!("Loaded {} account roles", book.accounts.len());
		Ok(book)
	}

	pub fn insert(&mut self, role: impl Into<String>, account: Arc<dyn AccountInterface>) {
		self.accounts.insert(role.into(), account);
	}

	pub fn get(&self, role: &str) -> Result<Arc<dyn AccountInterface>, AccountError> {
		self.accounts
			.get(role)
			.cloned()
			.ok_or_else(|| AccountError::UnknownRole(role.to_string()))
	}

	/// Roles whose name starts with `prefix`, in name order.
	pub fn roles_with_prefix(&self, prefix: &str) -> Vec<String> {
		self.accounts
			.keys()
			.filter(|role| role.starts_with(prefix))
			.cloned()
			.collect()
	}

	pub fn len(&self) -> usize {
		self.accounts.len()
	}

	pub fn is_empty(&self) -> bool {
		self.accounts.is_empty()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use harness_config::AccountEntry;

	fn entry(address: &str, seed: &str) -> AccountEntry {
		AccountEntry {
			address: address.to_string(),
			seed: seed.to_string(),
		}
	}

	#[test]
	fn test_book_from_config() {
		let mut config = AccountBookConfig::default();
		config.roles.insert(
			"issuer".to_string(),
			entry("rHb9CJAWyB4rj91VRWn96DkukG4bwdtyTh", "snoPBrXtMeMyMHUVTgbuqAfg1SUTb"),
		);
		config.roles.insert(
			"investor-2".to_string(),
			entry("rPT1Sjq2YGrBMTttX4GZHjKu9dyfzbpAYe", "sEdTM1uX8pu2do5XvTnutH6HsouMaM2"),
		);
		config.roles.insert(
			"investor-1".to_string(),
			entry("rGWrZyQqhTp9Xu7G5Pkayo7bXjH4k4QYpf", "sEdSKaCy2JT7JaM7v95H9SxkhP9wS2r"),
		);

		let book = AccountBook::from_config(&config).unwrap();
		assert_eq!(book.len(), 3);
		assert_eq!(
			book.get("issuer").unwrap().address().as_str(),
			"rHb9CJAWyB4rj91VRWn96DkukG4bwdtyTh"
		);
		assert_eq!(
			book.roles_with_prefix("investor"),
			vec!["investor-1".to_string(), "investor-2".to_string()]
		);
		assert!(matches!(
			book.get("nobody"),
			Err(AccountError::UnknownRole(_))
		));
	}

	#[test]
	fn test_book_rejects_bad_credentials() {
		let mut config = AccountBookConfig::default();
		config
			.roles
			.insert("issuer".to_string(), entry("not-an-address", "sSeed"));
		assert!(AccountBook::from_config(&config).is_err());
	}
}
