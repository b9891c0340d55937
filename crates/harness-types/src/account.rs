//! Account-related types for the harness.
//!
//! This module defines ledger addresses and the signed payload handed to the
//! network client for submission.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Ledger account address in its classic base58 form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(pub String);

impl Address {
	pub fn new(address: impl Into<String>) -> Self {
		Self(address.into())
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}

	/// Returns true when no address was supplied.
	pub fn is_empty(&self) -> bool {
		self.0.trim().is_empty()
	}
}

impl fmt::Display for Address {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

/// A transaction ready for submission.
///
/// Pre-signed transactions travel as a serialized blob. Accounts backed by a
/// seed hand the node the transaction JSON and the secret so the node signs
/// on submission, which is how test networks are commonly driven.
#[derive(Clone)]
pub enum SignedPayload {
	Blob(String),
	ServerSigned {
		tx_json: serde_json::Value,
		secret: String,
	},
}

impl SignedPayload {
	/// The transaction JSON, when the payload carries it in clear.
	pub fn tx_json(&self) -> Option<&serde_json::Value> {
		match self {
			Self::Blob(_) => None,
			Self::ServerSigned { tx_json, .. } => Some(tx_json),
		}
	}
}

impl fmt::Debug for SignedPayload {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Blob(blob) => f.debug_tuple("Blob").field(blob).finish(),
			Self::ServerSigned { tx_json, .. } => f
				.debug_struct("ServerSigned")
				.field("tx_json", tx_json)
				.field("secret", &"<redacted>")
				.finish(),
		}
	}
}
