//! Logical ledger operations the harness knows how to submit.
//!
//! A `TransactionIntent` is a validated value object: addresses and token
//! identities are present and every token amount is already expressed in
//! integer base units. Turning an intent into a wire payload is the job of
//! the transaction builder.

use crate::account::Address;
use crate::amount::BaseUnits;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Seconds between the Unix epoch and the ledger epoch (2000-01-01T00:00:00Z).
pub const LEDGER_EPOCH_OFFSET: i64 = 946_684_800;

/// Converts a wall-clock time into ledger epoch seconds.
///
/// Times before the ledger epoch clamp to zero.
pub fn to_ledger_time(time: DateTime<Utc>) -> u32 {
	let seconds = time.timestamp() - LEDGER_EPOCH_OFFSET;
	u32::try_from(seconds.max(0)).unwrap_or(u32::MAX)
}

/// Identity of a fungible token on the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenIdentity {
	/// A currency code issued by an account.
	Currency { code: String, issuer: Address },
	/// An opaque issuance identifier assigned by the ledger.
	Issuance { id: String },
}

impl TokenIdentity {
	pub fn is_complete(&self) -> bool {
		match self {
			Self::Currency { code, issuer } => !code.trim().is_empty() && !issuer.is_empty(),
			Self::Issuance { id } => !id.trim().is_empty(),
		}
	}
}

/// Amount field of a payment or offer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerAmount {
	/// Native currency in drops.
	Drops(BaseUnits),
	/// Trustline-issued currency; `value` is the ledger's decimal notation.
	Issued {
		currency: String,
		issuer: Address,
		value: String,
	},
	/// Issuance-based token in base units.
	Mpt {
		issuance_id: String,
		value: BaseUnits,
	},
}

/// A memo attached to a transaction. Text is hex-encoded on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Memo {
	pub memo_type: Option<String>,
	pub data: String,
}

impl Memo {
	pub fn text(data: impl Into<String>) -> Self {
		Self {
			memo_type: Some("text/plain".to_string()),
			data: data.into(),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuanceCreate {
	pub account: Address,
	pub currency: String,
	pub amount: BaseUnits,
	pub decimals: u8,
	pub transferable: bool,
	pub memos: Vec<Memo>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Authorize {
	pub account: Address,
	pub token: TokenIdentity,
	pub holder: Address,
	pub authorize: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Freeze {
	pub account: Address,
	pub token: TokenIdentity,
	pub holder: Address,
	pub freeze: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clawback {
	pub account: Address,
	pub token: TokenIdentity,
	pub holder: Address,
	pub amount: BaseUnits,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
	pub account: Address,
	pub destination: Address,
	pub amount: LedgerAmount,
	pub memos: Vec<Memo>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferCreate {
	pub account: Address,
	pub taker_gets: LedgerAmount,
	pub taker_pays: LedgerAmount,
	/// Ledger epoch seconds after which the offer is no longer valid.
	pub expiration: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferCancel {
	pub account: Address,
	pub offer_sequence: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustlineSet {
	pub account: Address,
	pub currency: String,
	pub issuer: Address,
	pub limit: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransactionIntent {
	IssuanceCreate(IssuanceCreate),
	Authorize(Authorize),
	Freeze(Freeze),
	Clawback(Clawback),
	Payment(Payment),
	OfferCreate(OfferCreate),
	OfferCancel(OfferCancel),
	TrustlineSet(TrustlineSet),
}

impl TransactionIntent {
	/// The account that signs and pays for the transaction.
	pub fn account(&self) -> &Address {
		match self {
			Self::IssuanceCreate(tx) => &tx.account,
			Self::Authorize(tx) => &tx.account,
			Self::Freeze(tx) => &tx.account,
			Self::Clawback(tx) => &tx.account,
			Self::Payment(tx) => &tx.account,
			Self::OfferCreate(tx) => &tx.account,
			Self::OfferCancel(tx) => &tx.account,
			Self::TrustlineSet(tx) => &tx.account,
		}
	}

	/// Wire name of the ledger transaction type.
	pub fn transaction_type(&self) -> &'static str {
		match self {
			Self::IssuanceCreate(_) => "IssuanceCreate",
			Self::Authorize(_) => "Authorize",
			Self::Freeze(_) => "Freeze",
			Self::Clawback(_) => "Clawback",
			Self::Payment(_) => "Payment",
			Self::OfferCreate(_) => "OfferCreate",
			Self::OfferCancel(_) => "OfferCancel",
			Self::TrustlineSet(_) => "TrustSet",
		}
	}
}

impl fmt::Display for TransactionIntent {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{} from {}", self.transaction_type(), self.account())
	}
}
