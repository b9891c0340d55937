//! Transaction construction.
//!
//! One constructor per ledger operation turns caller input (addresses, token
//! identity, human-entered amounts) into a validated `TransactionIntent`, and
//! `build_payload` renders an intent as the transaction JSON the ledger
//! expects. Nothing here touches the network. Both stages fail closed: a
//! missing identity field or an amount the codec rejects never produces a
//! payload.

use harness_types::{
	to_base_units, Address, AmountError, Authorize, BaseUnits, Clawback, Freeze, IssuanceCreate,
	LedgerAmount, Memo, OfferCancel, OfferCreate, Payment, TokenIdentity, TransactionIntent,
	TrustlineSet,
};
use serde_json::{json, Map, Value};
use thiserror::Error;

/// Decimal places of the native currency (1 unit = 1,000,000 drops).
pub const NATIVE_DECIMALS: u8 = 6;

/// Precision used to check issued-currency values, which the ledger keeps as
/// decimal strings rather than base units.
const ISSUED_VALUE_PRECISION: u8 = 15;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
	#[error("Missing required field: {0}")]
	MissingField(&'static str),
	#[error("Invalid amount for {field}: {source}")]
	InvalidAmount {
		field: &'static str,
		#[source]
		source: AmountError,
	},
	#[error("Invalid value for {field}: {message}")]
	InvalidValue {
		field: &'static str,
		message: String,
	},
}

fn require_address(field: &'static str, value: &str) -> Result<Address, BuildError> {
	let value = value.trim();
	if value.is_empty() {
		return Err(BuildError::MissingField(field));
	}
	Ok(Address::new(value))
}

fn require_text(field: &'static str, value: &str) -> Result<String, BuildError> {
	let value = value.trim();
	if value.is_empty() {
		return Err(BuildError::MissingField(field));
	}
	if value.chars().any(char::is_whitespace) {
		return Err(BuildError::InvalidValue {
			field,
			message: format!("'{}' contains whitespace", value),
		});
	}
	Ok(value.to_string())
}

fn require_token(token: TokenIdentity) -> Result<TokenIdentity, BuildError> {
	match token {
		TokenIdentity::Currency { code, issuer } => Ok(TokenIdentity::Currency {
			code: require_text("Currency", &code)?,
			issuer: require_address("Issuer", issuer.as_str())?,
		}),
		TokenIdentity::Issuance { id } => Ok(TokenIdentity::Issuance {
			id: require_text("MPTokenIssuanceID", &id)?,
		}),
	}
}

fn amount(field: &'static str, value: &str, decimals: u8) -> Result<BaseUnits, BuildError> {
	to_base_units(value, decimals).map_err(|source| BuildError::InvalidAmount { field, source })
}

/// Trustline currencies are three-character codes (other than the native
/// ticker) or 40-character hex codes.
fn require_trust_currency(code: &str) -> Result<String, BuildError> {
	let code = require_text("currency", code)?;
	let standard = code.len() == 3 && code.is_ascii() && code != "XRP";
	let hex_code = code.len() == 40 && code.bytes().all(|b| b.is_ascii_hexdigit());
	if !(standard || hex_code) {
		return Err(BuildError::InvalidValue {
			field: "currency",
			message: format!("'{}' is not a valid currency code", code),
		});
	}
	Ok(code)
}

/// Native currency amount from whole units.
pub fn xrp(value: &str) -> Result<LedgerAmount, BuildError> {
	Ok(LedgerAmount::Drops(amount("Amount", value, NATIVE_DECIMALS)?))
}

/// Issuance-based token amount from a human value.
pub fn mpt(issuance_id: &str, value: &str, decimals: u8) -> Result<LedgerAmount, BuildError> {
	Ok(LedgerAmount::Mpt {
		issuance_id: require_text("mpt_issuance_id", issuance_id)?,
		value: amount("Amount", value, decimals)?,
	})
}

/// Trustline-issued currency amount.
pub fn issued(currency: &str, issuer: &str, value: &str) -> Result<LedgerAmount, BuildError> {
	amount("value", value, ISSUED_VALUE_PRECISION)?;
	Ok(LedgerAmount::Issued {
		currency: require_trust_currency(currency)?,
		issuer: require_address("issuer", issuer)?,
		value: value.trim().replace(',', ""),
	})
}

pub fn issuance_create(
	account: &str,
	currency: &str,
	supply: &str,
	decimals: u8,
	transferable: bool,
	memos: Vec<Memo>,
) -> Result<TransactionIntent, BuildError> {
	Ok(TransactionIntent::IssuanceCreate(IssuanceCreate {
		account: require_address("Account", account)?,
		currency: require_text("Currency", currency)?,
		amount: amount("Amount", supply, decimals)?,
		decimals,
		transferable,
		memos,
	}))
}

pub fn authorize(
	account: &str,
	token: TokenIdentity,
	holder: &str,
	authorize: bool,
) -> Result<TransactionIntent, BuildError> {
	Ok(TransactionIntent::Authorize(Authorize {
		account: require_address("Account", account)?,
		token: require_token(token)?,
		holder: require_address("Holder", holder)?,
		authorize,
	}))
}

pub fn freeze(
	account: &str,
	token: TokenIdentity,
	holder: &str,
	freeze: bool,
) -> Result<TransactionIntent, BuildError> {
	Ok(TransactionIntent::Freeze(Freeze {
		account: require_address("Account", account)?,
		token: require_token(token)?,
		holder: require_address("Holder", holder)?,
		freeze,
	}))
}

pub fn clawback(
	account: &str,
	token: TokenIdentity,
	holder: &str,
	value: &str,
	decimals: u8,
) -> Result<TransactionIntent, BuildError> {
	Ok(TransactionIntent::Clawback(Clawback {
		account: require_address("Account", account)?,
		token: require_token(token)?,
		holder: require_address("Holder", holder)?,
		amount: amount("Amount", value, decimals)?,
	}))
}

pub fn payment(
	account: &str,
	destination: &str,
	amount: LedgerAmount,
	memos: Vec<Memo>,
) -> Result<TransactionIntent, BuildError> {
	Ok(TransactionIntent::Payment(Payment {
		account: require_address("Account", account)?,
		destination: require_address("Destination", destination)?,
		amount,
		memos,
	}))
}

pub fn offer_create(
	account: &str,
	taker_gets: LedgerAmount,
	taker_pays: LedgerAmount,
	expiration: Option<u32>,
) -> Result<TransactionIntent, BuildError> {
	if taker_gets == taker_pays {
		return Err(BuildError::InvalidValue {
			field: "TakerPays",
			message: "an offer must exchange two different amounts".to_string(),
		});
	}
	Ok(TransactionIntent::OfferCreate(OfferCreate {
		account: require_address("Account", account)?,
		taker_gets,
		taker_pays,
		expiration,
	}))
}

pub fn offer_cancel(account: &str, offer_sequence: u32) -> Result<TransactionIntent, BuildError> {
	if offer_sequence == 0 {
		return Err(BuildError::MissingField("OfferSequence"));
	}
	Ok(TransactionIntent::OfferCancel(OfferCancel {
		account: require_address("Account", account)?,
		offer_sequence,
	}))
}

pub fn trustline_set(
	account: &str,
	currency: &str,
	issuer: &str,
	limit: &str,
) -> Result<TransactionIntent, BuildError> {
	amount("LimitAmount", limit, ISSUED_VALUE_PRECISION)?;
	Ok(TransactionIntent::TrustlineSet(TrustlineSet {
		account: require_address("Account", account)?,
		currency: require_trust_currency(currency)?,
		issuer: require_address("Issuer", issuer)?,
		limit: limit.trim().replace(',', ""),
	}))
}

fn amount_json(amount: &LedgerAmount) -> Result<Value, BuildError> {
	match amount {
		LedgerAmount::Drops(drops) => Ok(Value::String(drops.to_string())),
		LedgerAmount::Issued {
			currency,
			issuer,
			value,
		} => Ok(json!({
			"currency": require_text("currency", currency)?,
			"issuer": require_address("issuer", issuer.as_str())?.0,
			"value": value,
		})),
		LedgerAmount::Mpt { issuance_id, value } => Ok(json!({
			"mpt_issuance_id": require_text("mpt_issuance_id", issuance_id)?,
			"value": value.to_string(),
		})),
	}
}

fn memos_json(memos: &[Memo]) -> Value {
	let entries = memos
		.iter()
		.map(|memo| {
			let mut inner = Map::new();
			if let Some(memo_type) = &memo.memo_type {
				inner.insert(
					"MemoType".to_string(),
					Value::String(hex::encode_upper(memo_type)),
				);
			}
			inner.insert(
				"MemoData".to_string(),
				Value::String(hex::encode_upper(&memo.data)),
			);
			json!({ "Memo": inner })
		})
		.collect();
	Value::Array(entries)
}

fn insert_token(tx: &mut Map<String, Value>, token: &TokenIdentity) -> Result<(), BuildError> {
	match require_token(token.clone())? {
		TokenIdentity::Currency { code, .. } => {
			tx.insert("Currency".to_string(), Value::String(code));
		}
		TokenIdentity::Issuance { id } => {
			tx.insert("MPTokenIssuanceID".to_string(), Value::String(id));
		}
	}
	Ok(())
}

/// Renders an intent as ledger transaction JSON.
pub fn build_payload(intent: &TransactionIntent) -> Result<Value, BuildError> {
	let mut tx = Map::new();
	tx.insert(
		"TransactionType".to_string(),
		Value::String(intent.transaction_type().to_string()),
	);
	tx.insert(
		"Account".to_string(),
		Value::String(require_address("Account", intent.account().as_str())?.0),
	);

	match intent {
		TransactionIntent::IssuanceCreate(issue) => {
			tx.insert(
				"Currency".to_string(),
				Value::String(require_text("Currency", &issue.currency)?),
			);
			tx.insert("Amount".to_string(), Value::String(issue.amount.to_string()));
			tx.insert("Decimals".to_string(), json!(issue.decimals));
			tx.insert("Transferable".to_string(), Value::Bool(issue.transferable));
			if !issue.memos.is_empty() {
				tx.insert("Memos".to_string(), memos_json(&issue.memos));
			}
		}
		TransactionIntent::Authorize(auth) => {
			insert_token(&mut tx, &auth.token)?;
			tx.insert(
				"Holder".to_string(),
				Value::String(require_address("Holder", auth.holder.as_str())?.0),
			);
			tx.insert("Authorize".to_string(), Value::Bool(auth.authorize));
		}
		TransactionIntent::Freeze(freeze) => {
			insert_token(&mut tx, &freeze.token)?;
			tx.insert(
				"Holder".to_string(),
				Value::String(require_address("Holder", freeze.holder.as_str())?.0),
			);
			tx.insert("Freeze".to_string(), Value::Bool(freeze.freeze));
		}
		TransactionIntent::Clawback(claw) => {
			insert_token(&mut tx, &claw.token)?;
			tx.insert(
				"Holder".to_string(),
				Value::String(require_address("Holder", claw.holder.as_str())?.0),
			);
			tx.insert("Amount".to_string(), Value::String(claw.amount.to_string()));
		}
		TransactionIntent::Payment(payment) => {
			tx.insert(
				"Destination".to_string(),
				Value::String(require_address("Destination", payment.destination.as_str())?.0),
			);
			tx.insert("Amount".to_string(), amount_json(&payment.amount)?);
			if !payment.memos.is_empty() {
				tx.insert("Memos".to_string(), memos_json(&payment.memos));
			}
		}
		TransactionIntent::OfferCreate(offer) => {
			tx.insert("TakerGets".to_string(), amount_json(&offer.taker_gets)?);
			tx.insert("TakerPays".to_string(), amount_json(&offer.taker_pays)?);
			if let Some(expiration) = offer.expiration {
				tx.insert("Expiration".to_string(), json!(expiration));
			}
		}
		TransactionIntent::OfferCancel(cancel) => {
			tx.insert("OfferSequence".to_string(), json!(cancel.offer_sequence));
		}
		TransactionIntent::TrustlineSet(trust) => {
			tx.insert(
				"LimitAmount".to_string(),
				json!({
					"currency": require_trust_currency(&trust.currency)?,
					"issuer": require_address("Issuer", trust.issuer.as_str())?.0,
					"value": trust.limit,
				}),
			);
		}
	}

	Ok(Value::Object(tx))
}

#[cfg(test)]
mod tests {
	use super::*;

	const ISSUER: &str = "rHb9CJAWyB4rj91VRWn96DkukG4bwdtyTh";
	const HOLDER: &str = "rPT1Sjq2YGrBMTttX4GZHjKu9dyfzbpAYe";
	const ISSUANCE: &str = "00000004A407AF5856CCF3C42619DAA925813FC955C72983";

	fn keys(payload: &Value) -> Vec<String> {
		let mut keys: Vec<String> = payload.as_object().unwrap().keys().cloned().collect();
		keys.sort();
		keys
	}

	#[test]
	fn test_issuance_create_payload() {
		let intent = issuance_create(
			ISSUER,
			"LAND",
			"10,000.50",
			2,
			true,
			vec![Memo::text("land parcel 7")],
		)
		.unwrap();
		let payload = build_payload(&intent).unwrap();

		assert_eq!(
			keys(&payload),
			vec![
				"Account",
				"Amount",
				"Currency",
				"Decimals",
				"Memos",
				"TransactionType",
				"Transferable"
			]
		);
		assert_eq!(payload["TransactionType"], "IssuanceCreate");
		assert_eq!(payload["Amount"], "1000050");
		assert_eq!(payload["Decimals"], 2);
		assert_eq!(payload["Transferable"], true);
		assert_eq!(
			payload["Memos"][0]["Memo"]["MemoData"],
			hex::encode_upper("land parcel 7")
		);
		assert_eq!(
			payload["Memos"][0]["Memo"]["MemoType"],
			hex::encode_upper("text/plain")
		);
	}

	#[test]
	fn test_issuance_create_fails_closed() {
		assert_eq!(
			issuance_create("", "LAND", "100", 2, true, vec![]),
			Err(BuildError::MissingField("Account"))
		);
		assert_eq!(
			issuance_create(ISSUER, " ", "100", 2, true, vec![]),
			Err(BuildError::MissingField("Currency"))
		);
		assert!(matches!(
			issuance_create(ISSUER, "LAND", "100.5", 0, true, vec![]),
			Err(BuildError::InvalidAmount { .. })
		));
		assert!(matches!(
			issuance_create(ISSUER, "LAND", "-1", 2, true, vec![]),
			Err(BuildError::InvalidAmount { .. })
		));
	}

	#[test]
	fn test_authorize_with_issuance_id() {
		let intent = authorize(
			ISSUER,
			TokenIdentity::Issuance {
				id: ISSUANCE.to_string(),
			},
			HOLDER,
			true,
		)
		.unwrap();
		let payload = build_payload(&intent).unwrap();
		assert_eq!(
			keys(&payload),
			vec![
				"Account",
				"Authorize",
				"Holder",
				"MPTokenIssuanceID",
				"TransactionType"
			]
		);
		assert_eq!(payload["MPTokenIssuanceID"], ISSUANCE);
		assert_eq!(payload["Authorize"], true);
	}

	#[test]
	fn test_authorize_requires_holder_and_token() {
		let token = TokenIdentity::Issuance {
			id: ISSUANCE.to_string(),
		};
		assert_eq!(
			authorize(ISSUER, token, "", true),
			Err(BuildError::MissingField("Holder"))
		);
		assert_eq!(
			authorize(
				ISSUER,
				TokenIdentity::Issuance { id: String::new() },
				HOLDER,
				true
			),
			Err(BuildError::MissingField("MPTokenIssuanceID"))
		);
	}

	#[test]
	fn test_freeze_with_currency() {
		let intent = freeze(
			ISSUER,
			TokenIdentity::Currency {
				code: "LAND".to_string(),
				issuer: Address::new(ISSUER),
			},
			HOLDER,
			false,
		)
		.unwrap();
		let payload = build_payload(&intent).unwrap();
		assert_eq!(
			keys(&payload),
			vec!["Account", "Currency", "Freeze", "Holder", "TransactionType"]
		);
		assert_eq!(payload["Freeze"], false);
		assert_eq!(payload["Currency"], "LAND");
	}

	#[test]
	fn test_clawback_truncates_amount() {
		let intent = clawback(
			ISSUER,
			TokenIdentity::Currency {
				code: "LAND".to_string(),
				issuer: Address::new(ISSUER),
			},
			HOLDER,
			"1.005",
			2,
		)
		.unwrap();
		let payload = build_payload(&intent).unwrap();
		assert_eq!(
			keys(&payload),
			vec!["Account", "Amount", "Currency", "Holder", "TransactionType"]
		);
		assert_eq!(payload["Amount"], "100");
	}

	#[test]
	fn test_payment_amount_shapes() {
		let drops = payment(ISSUER, HOLDER, xrp("1.5").unwrap(), vec![]).unwrap();
		let payload = build_payload(&drops).unwrap();
		assert_eq!(payload["Amount"], "1500000");
		assert!(payload.get("Memos").is_none());

		let token = payment(
			ISSUER,
			HOLDER,
			mpt(ISSUANCE, "100", 2).unwrap(),
			vec![Memo::text("funding")],
		)
		.unwrap();
		let payload = build_payload(&token).unwrap();
		assert_eq!(payload["Destination"], HOLDER);
		assert_eq!(payload["Amount"]["mpt_issuance_id"], ISSUANCE);
		assert_eq!(payload["Amount"]["value"], "10000");
		assert!(payload["Memos"].is_array());

		let iou = payment(ISSUER, HOLDER, issued("USD", ISSUER, "12.5").unwrap(), vec![]).unwrap();
		let payload = build_payload(&iou).unwrap();
		assert_eq!(payload["Amount"]["currency"], "USD");
		assert_eq!(payload["Amount"]["issuer"], ISSUER);
		assert_eq!(payload["Amount"]["value"], "12.5");
	}

	#[test]
	fn test_payment_requires_destination() {
		assert_eq!(
			payment(ISSUER, "", xrp("1").unwrap(), vec![]),
			Err(BuildError::MissingField("Destination"))
		);
	}

	#[test]
	fn test_offer_create_payload() {
		let intent = offer_create(
			HOLDER,
			xrp("1").unwrap(),
			issued("LND", ISSUER, "10").unwrap(),
			Some(812_345_678),
		)
		.unwrap();
		let payload = build_payload(&intent).unwrap();
		assert_eq!(
			keys(&payload),
			vec![
				"Account",
				"Expiration",
				"TakerGets",
				"TakerPays",
				"TransactionType"
			]
		);
		assert_eq!(payload["TakerGets"], "1000000");
		assert_eq!(payload["TakerPays"]["currency"], "LND");
		assert_eq!(payload["Expiration"], 812_345_678);

		let no_expiry =
			offer_create(HOLDER, xrp("1").unwrap(), xrp("2").unwrap(), None).unwrap();
		assert!(build_payload(&no_expiry).unwrap().get("Expiration").is_none());
	}

	#[test]
	fn test_offer_cancel_and_trustline() {
		let cancel = build_payload(&offer_cancel(HOLDER, 42).unwrap()).unwrap();
		assert_eq!(
			keys(&cancel),
			vec!["Account", "OfferSequence", "TransactionType"]
		);
		assert_eq!(cancel["OfferSequence"], 42);
		assert!(offer_cancel(HOLDER, 0).is_err());

		let trust = build_payload(&trustline_set(HOLDER, "LND", ISSUER, "1000000").unwrap()).unwrap();
		assert_eq!(trust["TransactionType"], "TrustSet");
		assert_eq!(
			keys(&trust),
			vec!["Account", "LimitAmount", "TransactionType"]
		);
		assert_eq!(trust["LimitAmount"]["value"], "1000000");
	}

	#[test]
	fn test_trust_currency_validation() {
		assert!(issued("XRP", ISSUER, "1").is_err());
		assert!(issued("TOOLONG", ISSUER, "1").is_err());
		assert!(issued("0158415500000000C1F76FF6ECB0BAC600000000", ISSUER, "1").is_ok());
		assert!(issued("USD", "", "1").is_err());
		assert!(issued("USD", ISSUER, "abc").is_err());
	}

	#[test]
	fn test_payload_rejects_tampered_intent() {
		let mut intent = payment(ISSUER, HOLDER, xrp("1").unwrap(), vec![]).unwrap();
		if let TransactionIntent::Payment(p) = &mut intent {
			p.destination = Address::new("");
		}
		assert_eq!(
			build_payload(&intent),
			Err(BuildError::MissingField("Destination"))
		);
	}
}
