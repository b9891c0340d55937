//! Seed-backed local accounts.
//!
//! The wallet holds the family seed and hands it to the node together with the
//! transaction JSON, so the node signs on submission. Suitable for test
//! networks where the harness controls its own throwaway accounts.

use crate::{AccountError, AccountInterface};
use async_trait::async_trait;
use harness_types::{Address, SignedPayload};
use serde_json::Value;

const BASE58_ALPHABET: &str = "rpshnaf39wBUDNEGHJKLM4PQRST7VWXYZ2bcdeCg65jkm8oFqi1tuvAxyz";

fn is_base58(s: &str) -> bool {
	s.chars().all(|c| BASE58_ALPHABET.contains(c))
}

/// Local account backed by a family seed.
pub struct LocalWallet {
	address: Address,
	seed: String,
}

impl LocalWallet {
	/// Creates a wallet after checking the address and seed encodings.
	pub fn new(address: &str, seed: &str) -> Result<Self, AccountError> {
		let address = address.trim();
		let seed = seed.trim();

		if !address.starts_with('r') || !(25..=35).contains(&address.len()) || !is_base58(address)
		{
			return Err(AccountError::InvalidKey(format!(
				"Invalid account address: {}",
				address
			)));
		}

		if !seed.starts_with('s') || !(25..=35).contains(&seed.len()) || !is_base58(seed) {
			return Err(AccountError::InvalidKey(
				"Seed must be a base58 family seed starting with 's'".to_string(),
			));
		}

		Ok(Self {
			address: Address::new(address),
			seed: seed.to_string(),
		})
	}
}

#[async_trait]
impl AccountInterface for LocalWallet {
	fn address(&self) -> &Address {
		&self.address
	}

	async fn sign_transaction(&self, tx_json: &Value) -> Result<SignedPayload, AccountError> {
		let account = tx_json.get("Account").and_then(Value::as_str);
		if account != Some(self.address.as_str()) {
			return Err(AccountError::SigningFailed(format!(
				"Transaction account {} does not match wallet {}",
				account.unwrap_or("<missing>"),
				self.address
			)));
		}

		Ok(SignedPayload::ServerSigned {
			tx_json: tx_json.clone(),
			secret: self.seed.clone(),
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	const ADDRESS: &str = "rHb9CJAWyB4rj91VRWn96DkukG4bwdtyTh";
	const SEED: &str = "snoPBrXtMeMyMHUVTgbuqAfg1SUTb";

	#[test]
	fn test_wallet_validation() {
		assert!(LocalWallet::new(ADDRESS, SEED).is_ok());
		assert!(LocalWallet::new("xHb9CJAWyB4rj91VRWn96DkukG4bwdtyTh", SEED).is_err());
		assert!(LocalWallet::new(ADDRESS, "not a seed").is_err());
		// '0' is not part of the alphabet.
		assert!(LocalWallet::new("rHb9CJAWyB4rj91VRWn96Dkuk0000000", SEED).is_err());
	}

	#[tokio::test]
	async fn test_sign_attaches_secret() {
		let wallet = LocalWallet::new(ADDRESS, SEED).unwrap();
		let tx = json!({ "TransactionType": "Payment", "Account": ADDRESS });

		match wallet.sign_transaction(&tx).await.unwrap() {
			SignedPayload::ServerSigned { tx_json, secret } => {
				assert_eq!(tx_json, tx);
				assert_eq!(secret, SEED);
			}
			other => panic!("unexpected payload: {:?}", other),
		}
	}

	#[tokio::test]
	async fn test_sign_rejects_foreign_account() {
		let wallet = LocalWallet::new(ADDRESS, SEED).unwrap();
		let tx = json!({ "TransactionType": "Payment", "Account": "rSomeoneElse" });
		assert!(matches!(
			wallet.sign_transaction(&tx).await,
			Err(AccountError::SigningFailed(_))
		));
	}
}
