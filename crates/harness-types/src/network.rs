//! Ledger networks the harness can target.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown network '{0}', expected one of: testnet, devnet")]
pub struct UnknownNetwork(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
	Testnet,
	Devnet,
}

impl Network {
	/// Public JSON-RPC endpoint used when the configuration does not name one.
	pub fn default_rpc_url(&self) -> &'static str {
		match self {
			Self::Testnet => "https://s.altnet.rippletest.net:51234",
			Self::Devnet => "https://s.devnet.rippletest.net:51234",
		}
	}

	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Testnet => "testnet",
			Self::Devnet => "devnet",
		}
	}
}

impl fmt::Display for Network {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for Network {
	type Err = UnknownNetwork;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_lowercase().as_str() {
			"testnet" => Ok(Self::Testnet),
			"devnet" => Ok(Self::Devnet),
			other => Err(UnknownNetwork(other.to_string())),
		}
	}
}
