//! Locating transaction hashes and issuance ids in submission responses.
//!
//! Signing adapters and RPC paths nest their results differently. Each known
//! layout is a `ResponseShape`, tried in order. Only when none of them holds
//! the field does the extractor fall back to a depth-bounded search, which
//! accepts a value only under an allow-listed key and only when it has the
//! exact hex length of the field.

use crate::DeliveryError;
use harness_ledger::LedgerClient;
use serde_json::Value;
use std::collections::VecDeque;
use tracing::{debug, warn};

/// Maximum nesting depth visited by the fallback search.
pub const MAX_SEARCH_DEPTH: usize = 8;

/// Known response layouts, in the order they are tried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseShape {
	/// Field at the top level: `{hash}`.
	TopLevel,
	/// JSON-RPC result: `{result: {hash}}`.
	RpcResult,
	/// JSON-RPC submit echo: `{result: {tx_json: {hash}}}`.
	RpcTxJson,
	/// Bare transaction echo: `{tx_json: {hash}}`.
	TxJson,
	/// Adapter envelope: `{response: {hash}}` or `{data: {hash}}`.
	AdapterWrapped,
	/// Adapter envelope around an RPC result.
	DoublyWrapped,
	/// Transaction metadata: `{meta: {..}}` or `{result: {meta: {..}}}`.
	Metadata,
}

impl ResponseShape {
	pub const ALL: [ResponseShape; 7] = [
		ResponseShape::TopLevel,
		ResponseShape::RpcResult,
		ResponseShape::RpcTxJson,
		ResponseShape::TxJson,
		ResponseShape::AdapterWrapped,
		ResponseShape::DoublyWrapped,
		ResponseShape::Metadata,
	];

	/// JSON pointers of the objects that hold the fields for this shape.
	fn containers(&self) -> &'static [&'static str] {
		match self {
			Self::TopLevel => &[""],
			Self::RpcResult => &["/result"],
			Self::RpcTxJson => &["/result/tx_json"],
			Self::TxJson => &["/tx_json"],
			Self::AdapterWrapped => &["/response", "/data"],
			Self::DoublyWrapped => &[
				"/response/result",
				"/data/result",
				"/response/data/result",
				"/response/result/tx_json",
			],
			Self::Metadata => &["/meta", "/result/meta"],
		}
	}
}

/// A field the extractor knows how to find.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
	TxHash,
	IssuanceId,
}

impl Field {
	fn keys(&self) -> &'static [&'static str] {
		match self {
			Self::TxHash => &["hash", "tx_hash", "txHash", "transaction_hash"],
			Self::IssuanceId => &[
				"mpt_issuance_id",
				"MPTokenIssuanceID",
				"issuance_id",
				"issuanceId",
			],
		}
	}

	/// Hex length a value must have to be accepted by the fallback search.
	fn hex_len(&self) -> usize {
		match self {
			Self::TxHash => 64,
			Self::IssuanceId => 48,
		}
	}

	fn matches_pattern(&self, value: &str) -> bool {
		value.len() == self.hex_len() && value.bytes().all(|b| b.is_ascii_hexdigit())
	}

	fn label(&self) -> &'static str {
		match self {
			Self::TxHash => "transaction hash",
			Self::IssuanceId => "issuance id",
		}
	}
}

/// Where a value was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Located {
	Known { shape: ResponseShape, value: String },
	Searched { path: String, value: String },
}

impl Located {
	pub fn value(&self) -> &str {
		match self {
			Self::Known { value, .. } | Self::Searched { value, .. } => value,
		}
	}

	pub fn into_value(self) -> String {
		match self {
			Self::Known { value, .. } | Self::Searched { value, .. } => value,
		}
	}
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
	value
		.and_then(Value::as_str)
		.map(str::trim)
		.filter(|s| !s.is_empty())
}

fn from_known_shapes(response: &Value, field: Field) -> Option<Located> {
	for shape in ResponseShape::ALL {
		for pointer in shape.containers() {
			let Some(container) = response.pointer(pointer).filter(|v| v.is_object()) else {
				continue;
			};
			for key in field.keys() {
				if let Some(value) = non_empty_str(container.get(*key)) {
					return Some(Located::Known {
						shape,
						value: value.to_string(),
					});
				}
			}
		}
	}
	None
}

/// Breadth-first search, so the shallowest match wins. JSON values are trees,
/// so the depth bound alone guarantees termination.
fn search(response: &Value, field: Field) -> Option<Located> {
	let mut queue = VecDeque::from([(String::new(), response, 0usize)]);

	while let Some((path, value, depth)) = queue.pop_front() {
		match value {
			Value::Object(map) => {
				for (key, child) in map {
					let child_path = format!("{}/{}", path, key);
					if field.keys().contains(&key.as_str()) {
						if let Some(s) = child.as_str().filter(|s| field.matches_pattern(s)) {
							return Some(Located::Searched {
								path: child_path,
								value: s.to_string(),
							});
						}
					}
					if depth < MAX_SEARCH_DEPTH {
						queue.push_back((child_path, child, depth + 1));
					}
				}
			}
			Value::Array(items) if depth < MAX_SEARCH_DEPTH => {
				for (i, child) in items.iter().enumerate() {
					queue.push_back((format!("{}/{}", path, i), child, depth + 1));
				}
			}
			_ => {}
		}
	}
	None
}

/// Finds `field` in a response: known shapes first, then the bounded search.
pub fn locate(response: &Value, field: Field) -> Option<Located> {
	let located = from_known_shapes(response, field).or_else(|| search(response, field));
	match &located {
		Some(Located::Known { shape, .. }) => {
			debug!(field = field.label(), ?shape, "Located field in known shape")
		}
		Some(Located::Searched { path, .. }) => {
			debug!(field = field.label(), path = %path, "Located field by search")
		}
		None => warn!(
			field = field.label(),
			shape = %describe_shape(response),
			"Field not found in response"
		),
	}
	located
}

pub fn extract_hash(response: &Value) -> Option<String> {
	locate(response, Field::TxHash).map(Located::into_value)
}

pub fn extract_issuance_id(response: &Value) -> Option<String> {
	locate(response, Field::IssuanceId).map(Located::into_value)
}

/// Finds the issuance id in the response, or failing that in the metadata of
/// the validated transaction the response refers to.
pub async fn extract_issuance_id_with_lookup(
	response: &Value,
	client: &dyn LedgerClient,
) -> Result<String, DeliveryError> {
	if let Some(id) = extract_issuance_id(response) {
		return Ok(id);
	}

	let hash = extract_hash(response).ok_or_else(|| DeliveryError::ExtractionFailed {
		field: Field::TxHash.label(),
		shape: describe_shape(response),
	})?;

	debug!(tx_hash = %hash, "Issuance id absent from response, querying ledger");
	lookup_issuance_id(&hash, client).await
}

/// Reads the issuance id from the metadata of the transaction `hash`.
pub async fn lookup_issuance_id(
	hash: &str,
	client: &dyn LedgerClient,
) -> Result<String, DeliveryError> {
	let tx = client.transaction(hash).await?;

	extract_issuance_id(&tx.raw).ok_or_else(|| DeliveryError::ExtractionFailed {
		field: Field::IssuanceId.label(),
		shape: describe_shape(&tx.raw),
	})
}

/// Compact structural dump of a value for diagnostics. Keys are kept, scalar
/// values are replaced by their type.
pub fn describe_shape(value: &Value) -> String {
	fn walk(value: &Value, depth: usize, out: &mut String) {
		match value {
			Value::Null => out.push_str("null"),
			Value::Bool(_) => out.push_str("bool"),
			Value::Number(_) => out.push_str("num"),
			Value::String(_) => out.push_str("str"),
			Value::Array(items) => {
				out.push('[');
				if depth >= MAX_SEARCH_DEPTH {
					out.push_str("..");
				} else if let Some(first) = items.first() {
					walk(first, depth + 1, out);
					if items.len() > 1 {
						out.push_str(&format!(" x{}", items.len()));
					}
				}
				out.push(']');
			}
			Value::Object(map) => {
				out.push('{');
				if depth >= MAX_SEARCH_DEPTH {
					out.push_str("..");
				} else {
					for (i, (key, child)) in map.iter().enumerate() {
						if i > 0 {
							out.push(',');
						}
						out.push_str(key);
						out.push(':');
						walk(child, depth + 1, out);
					}
				}
				out.push('}');
			}
		}
	}

	let mut out = String::new();
	walk(value, 0, &mut out);
	out
}
