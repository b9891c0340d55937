//! Transaction delivery for the harness.
//!
//! Delivery turns a signed payload into one confirmed outcome. The
//! `ReliableSubmitter` owns the submit, poll and retry cycle, and the
//! `extractor` module finds hashes and issuance ids in whatever shape a
//! response arrives in.

use harness_ledger::LedgerError;
use thiserror::Error;

pub mod extractor;
pub mod submitter;

pub use extractor::{
	describe_shape, extract_hash, extract_issuance_id, extract_issuance_id_with_lookup,
	lookup_issuance_id, Field, Located, ResponseShape,
};
pub use submitter::{ReliableSubmitter, SubmissionPolicy};

#[derive(Debug, Error)]
pub enum DeliveryError {
	/// Nothing that looks like the field was found. `shape` is a key dump of
	/// the response that was searched.
	#[error("No {field} found in response {shape}")]
	ExtractionFailed { field: &'static str, shape: String },
	#[error("Ledger error: {0}")]
	Ledger(#[from] LedgerError),
}
