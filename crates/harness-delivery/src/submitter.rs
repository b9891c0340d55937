//! Reliable submission with validation polling and bounded retries.
//!
//! A submission moves through `Prepared -> Submitted -> Validated` in the
//! happy path. Transient outcomes move it to `Retryable`, which either
//! resubmits after a backoff delay or ends in `ExhaustedRetries` once the
//! attempt budget is spent. Whatever happens, the caller gets exactly one
//! `SubmissionOutcome`.
//!
//! The submitter never lets two copies of one intent apply. Server-signed
//! payloads are pinned to an account sequence and an expiry ledger, so a
//! resend is the same transaction. An accepted transaction is polled, not
//! resent, until it validates or its expiry ledger has passed, and only then
//! is a replacement signed.

use crate::extractor;
use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;
use harness_account::AccountInterface;
use harness_config::SubmissionConfig;
use harness_ledger::{LedgerClient, LedgerError, LedgerTransaction};
use harness_types::{EngineResult, SignedPayload, SubmissionOutcome, TransactionIntent};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

type BackoffFactory = Arc<dyn Fn() -> Box<dyn Backoff + Send> + Send + Sync>;

/// Engine result for a sequence number that is already used.
const PAST_SEQUENCE: &str = "tefPAST_SEQ";

/// Attempt and polling limits for one submission.
#[derive(Debug, Clone)]
pub struct SubmissionPolicy {
	/// Submission attempts, including the first.
	pub max_retries: u32,
	pub poll_interval: Duration,
	/// Validation polls per attempt.
	pub max_polls: u32,
	/// Ledgers past the current one a pinned transaction stays valid for.
	pub ledger_margin: u32,
}

impl SubmissionPolicy {
	pub fn from_config(config: &SubmissionConfig) -> Self {
		Self {
			max_retries: config.max_retries.max(1),
			poll_interval: Duration::from_millis(config.poll_interval_ms),
			max_polls: config.max_polls.max(1),
			ledger_margin: config.last_ledger_offset.max(1),
		}
	}
}

impl Default for SubmissionPolicy {
	fn default() -> Self {
		Self::from_config(&SubmissionConfig::default())
	}
}

#[derive(Debug)]
enum SubmissionState {
	Prepared,
	Submitted {
		attempt: u32,
		hash: String,
		code: Option<String>,
	},
	Retryable {
		attempt: u32,
		reason: String,
		last_code: Option<String>,
		/// The ledger accepted the transaction, so it may still apply.
		accepted: bool,
	},
	Validated(SubmissionOutcome),
	ExhaustedRetries {
		attempts: u32,
		reason: String,
		last_code: Option<String>,
	},
}

/// The transaction being delivered. Every resend of it is the identical
/// transaction, so at most one copy can ever apply.
#[derive(Debug)]
struct Pinned {
	payload: SignedPayload,
	/// Last ledger the transaction can be included in, when known.
	last_ledger: Option<u32>,
	hash: Option<String>,
}

impl Pinned {
	fn unpinned(payload: &SignedPayload) -> Self {
		Self {
			payload: payload.clone(),
			last_ledger: None,
			hash: None,
		}
	}
}

/// What to do with a transaction that has not been validated yet.
#[derive(Debug)]
enum Resolution {
	/// Still able to apply; keep polling.
	Wait(String),
	/// Send the identical transaction again.
	Resend,
	/// It can no longer apply; sign a fresh one.
	Replace,
	Settled(SubmissionOutcome),
}

/// Submits signed payloads and drives each one to a single final outcome.
pub struct ReliableSubmitter {
	client: Arc<dyn LedgerClient>,
	policy: SubmissionPolicy,
	backoff: BackoffFactory,
}

impl ReliableSubmitter {
	/// Creates a submitter with exponential backoff between attempts.
	pub fn new(client: Arc<dyn LedgerClient>, policy: SubmissionPolicy) -> Self {
		Self {
			client,
			policy,
			backoff: Arc::new(|| {
				Box::new(ExponentialBackoff::default()) as Box<dyn Backoff + Send>
			}),
		}
	}

	pub fn from_config(client: Arc<dyn LedgerClient>, config: &SubmissionConfig) -> Self {
		let initial = Duration::from_millis(config.initial_backoff_ms);
		let max = Duration::from_millis(config.max_backoff_ms);

		Self::new(client, SubmissionPolicy::from_config(config)).with_backoff(move || {
			ExponentialBackoff {
				current_interval: initial,
				initial_interval: initial,
				max_interval: max,
				// The attempt budget bounds retries, not wall-clock time.
				max_elapsed_time: None,
				..Default::default()
			}
		})
	}

	/// Replaces the backoff policy. `make` is called once per submission.
	pub fn with_backoff<B, F>(mut self, make: F) -> Self
	where
		B: Backoff + Send + 'static,
		F: Fn() -> B + Send + Sync + 'static,
	{
		self.backoff = Arc::new(move || Box::new(make()) as Box<dyn Backoff + Send>);
		self
	}

	pub fn client(&self) -> &Arc<dyn LedgerClient> {
		&self.client
	}

	pub fn policy(&self) -> &SubmissionPolicy {
		&self.policy
	}

	/// Builds, signs and submits an intent.
	///
	/// Build and signing errors produce a failed outcome without touching the
	/// network.
	pub async fn submit_intent(
		&self,
		intent: &TransactionIntent,
		account: &dyn AccountInterface,
	) -> SubmissionOutcome {
		let tx_json = match harness_builder::build_payload(intent) {
			Ok(tx_json) => tx_json,
			Err(e) => {
				warn!("Refusing to submit invalid {}: {}", intent, e);
				return SubmissionOutcome::failure(
					None,
					Some(format!("Invalid {} transaction: {}", intent.transaction_type(), e)),
					1,
				);
			}
		};

		let signed = match account.sign_transaction(&tx_json).await {
			Ok(signed) => signed,
			Err(e) => {
				warn!("Failed to sign {}: {}", intent, e);
				return SubmissionOutcome::failure(None, Some(e.to_string()), 1);
			}
		};

		self.submit(&signed).await
	}

	/// Submits a signed payload and returns its final outcome.
	///
	/// Server-signed payloads get their `Sequence` and `LastLedgerSequence`
	/// pinned before the first attempt, so resends are the same transaction.
	/// A fresh transaction is only signed once the previous one provably can
	/// no longer apply.
	pub async fn submit(&self, payload: &SignedPayload) -> SubmissionOutcome {
		let mut backoff = (self.backoff)();
		backoff.reset();
		let mut pinned = Pinned::unpinned(payload);
		let mut state = SubmissionState::Prepared;

		loop {
			state = match state {
				SubmissionState::Prepared => match self.pin(payload).await {
					Ok(fresh) => {
						pinned = fresh;
						self.attempt(&mut pinned, 1).await
					}
					Err(e) => {
						warn!("Could not prepare transaction: {}", e);
						SubmissionState::Validated(SubmissionOutcome::failure(
							None,
							Some(format!("Could not prepare transaction: {}", e)),
							1,
						))
					}
				},
				SubmissionState::Submitted {
					attempt,
					hash,
					code,
				} => self.await_validation(attempt, hash, code).await,
				SubmissionState::Retryable {
					attempt,
					reason,
					last_code,
					accepted,
				} => {
					if let Some(hash) = &pinned.hash {
						if let Some(outcome) = self.settled(hash, attempt).await {
							state = SubmissionState::Validated(outcome);
							continue;
						}
					}

					if attempt >= self.policy.max_retries {
						SubmissionState::ExhaustedRetries {
							attempts: attempt,
							reason,
							last_code,
						}
					} else {
						match backoff.next_backoff() {
							Some(delay) => {
								warn!(
									attempt,
									max_retries = self.policy.max_retries,
									"Submission not applied ({}), retrying in {:?}",
									reason,
									delay
								);
								tokio::time::sleep(delay).await;
								self.retry(payload, &mut pinned, attempt + 1, last_code, accepted)
									.await
							}
							None => SubmissionState::ExhaustedRetries {
								attempts: attempt,
								reason: format!("{} (backoff exhausted)", reason),
								last_code,
							},
						}
					}
				}
				SubmissionState::Validated(outcome) => return outcome,
				SubmissionState::ExhaustedRetries {
					attempts,
					reason,
					last_code,
				} => {
					warn!(attempts, "Giving up on submission: {}", reason);
					return SubmissionOutcome::failure(
						last_code,
						Some(format!("Exhausted {} attempts: {}", attempts, reason)),
						attempts,
					)
					.with_tx_hash(pinned.hash);
				}
			};
		}
	}

	/// Fixes the sequence and expiry ledger of a server-signed payload.
	///
	/// A pre-signed blob already has both and is delivered as is.
	async fn pin(&self, payload: &SignedPayload) -> Result<Pinned, String> {
		let SignedPayload::ServerSigned { tx_json, secret } = payload else {
			return Ok(Pinned::unpinned(payload));
		};

		let mut tx_json = tx_json.clone();
		let fields = tx_json
			.as_object_mut()
			.ok_or_else(|| "transaction JSON is not an object".to_string())?;
		let account = fields
			.get("Account")
			.and_then(|a| a.as_str())
			.ok_or_else(|| "transaction has no Account".to_string())?
			.to_string();

		let sequence = self
			.client
			.account_sequence(&account)
			.await
			.map_err(|e| format!("account sequence lookup failed: {}", e))?;
		let current = self
			.client
			.current_ledger_index()
			.await
			.map_err(|e| format!("ledger index lookup failed: {}", e))?;
		let last_ledger = current.saturating_add(self.policy.ledger_margin);

		fields.insert("Sequence".to_string(), json!(sequence));
		fields.insert("LastLedgerSequence".to_string(), json!(last_ledger));
		debug!(%account, sequence, last_ledger, "Pinned transaction");

		Ok(Pinned {
			payload: SignedPayload::ServerSigned {
				tx_json,
				secret: secret.clone(),
			},
			last_ledger: Some(last_ledger),
			hash: None,
		})
	}

	/// Next attempt after a backoff delay.
	async fn retry(
		&self,
		original: &SignedPayload,
		pinned: &mut Pinned,
		attempt: u32,
		last_code: Option<String>,
		accepted: bool,
	) -> SubmissionState {
		match self.resolve(pinned, last_code.as_deref(), accepted, attempt).await {
			Resolution::Settled(outcome) => SubmissionState::Validated(outcome),
			Resolution::Wait(hash) => {
				debug!(tx_hash = %hash, attempt, "Earlier submission may still apply, polling again");
				self.await_validation(attempt, hash, last_code).await
			}
			Resolution::Resend => self.attempt(pinned, attempt).await,
			Resolution::Replace => match self.pin(original).await {
				Ok(fresh) => {
					info!(
						previous = pinned.hash.as_deref().unwrap_or("-"),
						"Previous transaction can no longer apply, submitting a replacement"
					);
					*pinned = fresh;
					self.attempt(pinned, attempt).await
				}
				Err(e) => SubmissionState::Retryable {
					attempt,
					reason: format!("Could not prepare replacement: {}", e),
					last_code,
					accepted: false,
				},
			},
		}
	}

	/// Decides whether the pinned transaction may still apply.
	async fn resolve(
		&self,
		pinned: &Pinned,
		last_code: Option<&str>,
		accepted: bool,
		attempt: u32,
	) -> Resolution {
		// Without a hash nothing can be ruled out; a resend reports the hash.
		let Some(hash) = pinned.hash.clone() else {
			return Resolution::Resend;
		};

		let expired = self.expired(pinned).await;
		let sequence_used = last_code == Some(PAST_SEQUENCE);
		if !expired && !sequence_used {
			return if accepted {
				Resolution::Wait(hash)
			} else {
				Resolution::Resend
			};
		}

		// Looked up after the expiry check: the transaction may sit in the
		// ledger that was just validated.
		let replaceable = matches!(pinned.payload, SignedPayload::ServerSigned { .. });
		match self.client.transaction(&hash).await {
			Ok(tx) if tx.validated => Resolution::Settled(final_outcome(tx, attempt)),
			Ok(_) if !expired => Resolution::Wait(hash),
			Ok(_) | Err(LedgerError::NotFound(_)) if replaceable => Resolution::Replace,
			Ok(_) | Err(LedgerError::NotFound(_)) => Resolution::Resend,
			Err(e) => {
				warn!(tx_hash = %hash, "Lookup before replacing failed: {}", e);
				if accepted {
					Resolution::Wait(hash)
				} else {
					Resolution::Resend
				}
			}
		}
	}

	/// True once a validated ledger is past the pinned expiry ledger.
	async fn expired(&self, pinned: &Pinned) -> bool {
		let Some(last_ledger) = pinned.last_ledger else {
			return false;
		};
		match self.client.validated_ledger_index().await {
			Ok(validated) => validated > last_ledger,
			Err(e) => {
				warn!("Validated ledger lookup failed: {}", e);
				false
			}
		}
	}

	/// One submission, classified by its preliminary engine result.
	async fn attempt(&self, pinned: &mut Pinned, attempt: u32) -> SubmissionState {
		debug!(attempt, "Submitting transaction");

		let ack = match self.client.submit(&pinned.payload).await {
			Ok(ack) => ack,
			Err(e) if e.is_transient() => {
				return SubmissionState::Retryable {
					attempt,
					reason: e.to_string(),
					last_code: None,
					accepted: false,
				};
			}
			Err(e) => {
				return SubmissionState::Validated(
					SubmissionOutcome::failure(None, Some(e.to_string()), attempt)
						.with_tx_hash(pinned.hash.clone()),
				);
			}
		};

		let hash = ack
			.tx_hash
			.clone()
			.or_else(|| extractor::extract_hash(&ack.raw));
		if hash.is_some() {
			pinned.hash = hash.clone();
		}
		let code = ack.engine_result.clone();
		let class = code
			.as_deref()
			.map(EngineResult::classify)
			.unwrap_or(EngineResult::Pending);

		debug!(
			attempt,
			engine_result = code.as_deref().unwrap_or("-"),
			tx_hash = hash.as_deref().unwrap_or("-"),
			?class,
			"Preliminary result"
		);

		match (class, hash) {
			(EngineResult::Success | EngineResult::Pending, Some(hash)) => {
				SubmissionState::Submitted {
					attempt,
					hash,
					code,
				}
			}
			(EngineResult::Success | EngineResult::Pending, None) => {
				// Accepted but untraceable. Resubmitting could apply it twice.
				SubmissionState::Validated(SubmissionOutcome::failure(
					code,
					Some(format!(
						"Submission accepted but no transaction hash found in response {}",
						extractor::describe_shape(&ack.raw)
					)),
					attempt,
				))
			}
			(EngineResult::Retry, _) => SubmissionState::Retryable {
				attempt,
				reason: code.clone().unwrap_or_else(|| "retry".to_string()),
				last_code: code,
				accepted: false,
			},
			(EngineResult::TerminalFailure, hash) => {
				let error = ack
					.engine_result_message
					.clone()
					.or_else(|| Some("Transaction rejected by the ledger".to_string()));
				SubmissionState::Validated(
					SubmissionOutcome::failure(code, error, attempt).with_tx_hash(hash),
				)
			}
		}
	}

	/// Polls until the transaction is in a validated ledger or the poll
	/// budget is spent.
	async fn await_validation(
		&self,
		attempt: u32,
		hash: String,
		code: Option<String>,
	) -> SubmissionState {
		for poll in 1..=self.policy.max_polls {
			tokio::time::sleep(self.policy.poll_interval).await;

			match self.client.transaction(&hash).await {
				Ok(tx) if tx.validated => {
					return SubmissionState::Validated(final_outcome(tx, attempt));
				}
				Ok(_) | Err(LedgerError::NotFound(_)) => {
					debug!(tx_hash = %hash, poll, "Not validated yet");
				}
				Err(e) => {
					warn!(tx_hash = %hash, poll, "Validation lookup failed: {}", e);
				}
			}
		}

		SubmissionState::Retryable {
			attempt,
			reason: format!("{} not validated after {} polls", hash, self.policy.max_polls),
			last_code: code,
			accepted: true,
		}
	}

	/// Final outcome of `hash` if it has reached a validated ledger.
	async fn settled(&self, hash: &str, attempt: u32) -> Option<SubmissionOutcome> {
		match self.client.transaction(hash).await {
			Ok(tx) if tx.validated => {
				info!(tx_hash = %hash, "Earlier submission was validated, not resubmitting");
				Some(final_outcome(tx, attempt))
			}
			_ => None,
		}
	}
}

fn final_outcome(tx: LedgerTransaction, attempt: u32) -> SubmissionOutcome {
	let outcome = match tx.result.as_deref() {
		Some("tesSUCCESS") => {
			info!(tx_hash = %tx.hash, attempt, "Transaction validated");
			SubmissionOutcome::success(tx.hash, tx.result, attempt)
		}
		Some(code) => {
			warn!(tx_hash = %tx.hash, engine_result = code, "Transaction validated with failure");
			let error = format!("Transaction validated with result {}", code);
			SubmissionOutcome::failure(tx.result.clone(), Some(error), attempt)
				.with_tx_hash(Some(tx.hash))
		}
		None => SubmissionOutcome::failure(
			None,
			Some("Validated transaction carries no result".to_string()),
			attempt,
		)
		.with_tx_hash(Some(tx.hash)),
	};
	outcome.with_response(tx.raw)
}
