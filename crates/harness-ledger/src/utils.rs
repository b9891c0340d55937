//! Retry logic for read-only ledger requests.
//!
//! Lookups are safe to repeat, so transport failures are retried with
//! exponential backoff. Submissions never go through this path.

use crate::LedgerError;
use backoff::{backoff::Backoff, ExponentialBackoff};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Retry policy wrapper for idempotent requests.
#[derive(Debug, Clone)]
pub struct ReadRetry {
	backoff: ExponentialBackoff,
	max_retries: u32,
}

impl ReadRetry {
	/// Exponential backoff capped at 30 seconds of total elapsed time.
	pub fn new() -> Self {
		let backoff = ExponentialBackoff {
			max_elapsed_time: Some(Duration::from_secs(30)),
			..Default::default()
		};

		Self {
			backoff,
			max_retries: 3,
		}
	}

	pub fn with_max_retries(mut self, max_retries: u32) -> Self {
		self.max_retries = max_retries;
		self
	}

	pub fn with_backoff(mut self, backoff: ExponentialBackoff) -> Self {
		self.backoff = backoff;
		self
	}

	/// Runs `request` until it succeeds, fails with a non-transport error,
	/// or the retry budget is spent.
	pub async fn run<T, F, Fut>(&self, label: &str, mut request: F) -> Result<T, LedgerError>
	where
		F: FnMut() -> Fut,
		Fut: Future<Output = Result<T, LedgerError>>,
	{
		let mut backoff = self.backoff.clone();
		backoff.reset();
		let mut attempts = 0;

		loop {
			match request().await {
				Ok(value) => return Ok(value),
				Err(e @ LedgerError::Transport(_)) => {
					attempts += 1;

					if attempts > self.max_retries {
						warn!(
							"{} failed after {} attempts, giving up: {}",
							label, self.max_retries, e
						);
						return Err(e);
					}

					match backoff.next_backoff() {
						Some(delay) => {
							warn!(
								"{} failed, attempt {}/{}, retrying in {:?}: {}",
								label, attempts, self.max_retries, delay, e
							);
							tokio::time::sleep(delay).await;
						}
						None => {
							warn!(
								"{} failed, backoff exhausted after {} attempts: {}",
								label, attempts, e
							);
							return Err(e);
						}
					}
				}
				Err(e) => return Err(e),
			}
		}
	}
}

impl Default for ReadRetry {
	fn default() -> Self {
		Self::new()
	}
}
