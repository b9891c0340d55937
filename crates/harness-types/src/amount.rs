//! Conversion between human-entered decimal amounts and integer base units.
//!
//! Token amounts travel to the ledger as integer strings scaled by the token's
//! declared precision. The conversion is done on the decimal digits directly so
//! that no binary floating-point value ever sits between the user's input and
//! the submitted amount.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors produced when an amount cannot be represented in base units.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountError {
	#[error("Amount is empty")]
	Empty,
	#[error("Amount '{0}' is not a non-negative decimal number")]
	Malformed(String),
	#[error("Amount '{0}' has fractional digits but the token declares zero decimals")]
	FractionalWithoutDecimals(String),
	#[error("Amount {0} does not fit in 64 bits")]
	Overflow(String),
}

/// An integer amount expressed in a token's smallest denomination.
///
/// Stored as a normalized decimal digit string (no sign, no leading zeros
/// except for zero itself) so that arbitrarily large values survive intact.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BaseUnits(String);

impl BaseUnits {
	/// Builds a value from a digit-only string, stripping leading zeros.
	fn from_digits(digits: &str) -> Self {
		let trimmed = digits.trim_start_matches('0');
		if trimmed.is_empty() {
			Self("0".to_string())
		} else {
			Self(trimmed.to_string())
		}
	}

	/// Parses an integer string that is already in base units.
	pub fn parse(value: &str) -> Result<Self, AmountError> {
		let value = value.trim();
		if value.is_empty() {
			return Err(AmountError::Empty);
		}
		if !is_digits(value) {
			return Err(AmountError::Malformed(value.to_string()));
		}
		Ok(Self::from_digits(value))
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}

	pub fn is_zero(&self) -> bool {
		self.0 == "0"
	}

	/// Narrows the value to a `u64`, as required by ledger fields with a
	/// fixed-width representation.
	pub fn to_u64(&self) -> Result<u64, AmountError> {
		self.0
			.parse::<u64>()
			.map_err(|_| AmountError::Overflow(self.0.clone()))
	}
}

impl From<u64> for BaseUnits {
	fn from(value: u64) -> Self {
		Self(value.to_string())
	}
}

impl fmt::Display for BaseUnits {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

fn is_digits(s: &str) -> bool {
	!s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// Converts a human decimal string into base units for a token with
/// `decimals` digits of precision.
///
/// Grouping commas are ignored. The input must otherwise match
/// `^\d+(\.\d+)?$`. With `decimals == 0` any fractional part is rejected,
/// including an all-zero one such as `"1.0"`. Extra fractional digits beyond
/// `decimals` are truncated, never rounded.
pub fn to_base_units(value: &str, decimals: u8) -> Result<BaseUnits, AmountError> {
	let cleaned: String = value.trim().chars().filter(|c| *c != ',').collect();
	if cleaned.is_empty() {
		return Err(AmountError::Empty);
	}

	let (integer, fraction) = match cleaned.split_once('.') {
		Some((integer, fraction)) => (integer, Some(fraction)),
		None => (cleaned.as_str(), None),
	};

	if !is_digits(integer) || fraction.is_some_and(|f| !is_digits(f)) {
		return Err(AmountError::Malformed(value.to_string()));
	}

	if decimals == 0 {
		if fraction.is_some() {
			return Err(AmountError::FractionalWithoutDecimals(value.to_string()));
		}
		return Ok(BaseUnits::from_digits(integer));
	}

	// integer * 10^decimals + fraction, computed by appending exactly
	// `decimals` fractional digits to the integer digits.
	let scale = usize::from(decimals);
	let fraction = fraction.unwrap_or("");
	let mut digits = String::with_capacity(integer.len() + scale);
	digits.push_str(integer);
	if fraction.len() >= scale {
		digits.push_str(&fraction[..scale]);
	} else {
		digits.push_str(fraction);
		digits.extend(std::iter::repeat('0').take(scale - fraction.len()));
	}

	Ok(BaseUnits::from_digits(&digits))
}

/// Renders base units back into a human decimal string with exactly
/// `decimals` fractional digits.
pub fn format_with_decimals(units: &BaseUnits, decimals: u8) -> String {
	let digits = units.as_str();
	let scale = usize::from(decimals);
	if scale == 0 {
		return digits.to_string();
	}

	let padded = if digits.len() <= scale {
		format!("{}{}", "0".repeat(scale - digits.len() + 1), digits)
	} else {
		digits.to_string()
	};
	let split = padded.len() - scale;
	format!("{}.{}", &padded[..split], &padded[split..])
}
