//! Bounded-concurrency batch execution.
//!
//! A counting semaphore caps the number of workers in flight. Tasks are
//! spawned chunk by chunk, a small multiple of the ceiling at a time, so a
//! very large batch never holds more than one chunk of pending futures.
//! Every task yields exactly one `BatchTaskResult`, including tasks whose
//! worker panics.

use chrono::Utc;
use futures::FutureExt;
use harness_types::BatchTaskResult;
use std::collections::HashSet;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Chunk size as a multiple of the concurrency ceiling.
pub const DEFAULT_CHUNK_FACTOR: usize = 4;

/// What a worker reports: the transaction hash, or why it failed.
pub type TaskOutcome = Result<String, String>;

#[derive(Debug, Clone)]
pub struct ConcurrencyBatchExecutor {
	concurrency: usize,
	chunk_factor: usize,
}

impl ConcurrencyBatchExecutor {
	/// A ceiling of zero is treated as one.
	pub fn new(concurrency: usize) -> Self {
		Self {
			concurrency: concurrency.max(1),
			chunk_factor: DEFAULT_CHUNK_FACTOR,
		}
	}

	pub fn with_chunk_factor(mut self, chunk_factor: usize) -> Self {
		self.chunk_factor = chunk_factor.max(1);
		self
	}

	pub fn concurrency(&self) -> usize {
		self.concurrency
	}

	/// Runs `worker` over every task. Results are in completion order.
	pub async fn run<T, F, Fut>(&self, tasks: Vec<(String, T)>, worker: F) -> Vec<BatchTaskResult>
	where
		T: Send + 'static,
		F: Fn(T) -> Fut + Send + Sync + 'static,
		Fut: Future<Output = TaskOutcome> + Send + 'static,
	{
		let total = tasks.len();
		let chunk_size = self.concurrency.saturating_mul(self.chunk_factor);
		let semaphore = Arc::new(Semaphore::new(self.concurrency));
		let worker = Arc::new(worker);
		let mut results = Vec::with_capacity(total);
		let mut tasks = tasks.into_iter();

		info!(
			total,
			concurrency = self.concurrency,
			chunk_size,
			"Starting batch"
		);

		loop {
			let chunk: Vec<(String, T)> = tasks.by_ref().take(chunk_size).collect();
			if chunk.is_empty() {
				break;
			}

			let mut pending: HashSet<String> = HashSet::with_capacity(chunk.len());
			let mut set = JoinSet::new();

			for (id, input) in chunk {
				pending.insert(id.clone());
				let semaphore = semaphore.clone();
				let worker = worker.clone();

				set.spawn(async move {
					let _permit = match semaphore.acquire_owned().await {
						Ok(permit) => permit,
						Err(_) => return failed(id, "executor shut down".to_string(), 0),
					};

					let timestamp = Utc::now();
					let started = Instant::now();
					let outcome = AssertUnwindSafe(worker(input)).catch_unwind().await;
					let duration_ms = started.elapsed().as_millis() as u64;

					let (success, tx_hash, error) = match outcome {
						Ok(Ok(hash)) => (true, Some(hash), None),
						Ok(Err(error)) => (false, None, Some(error)),
						Err(panic) => (false, None, Some(panic_message(panic))),
					};

					BatchTaskResult {
						id,
						success,
						tx_hash,
						error,
						duration_ms,
						timestamp,
					}
				});
			}

			while let Some(joined) = set.join_next().await {
				match joined {
					Ok(result) => {
						debug!(id = %result.id, success = result.success, "Task finished");
						pending.remove(&result.id);
						results.push(result);
					}
					Err(e) => warn!("Batch task did not complete: {}", e),
				}
			}

			// Tasks lost to cancellation still get a record.
			for id in pending {
				results.push(failed(id, "task did not complete".to_string(), 0));
			}
		}

		let succeeded = results.iter().filter(|r| r.success).count();
		info!(
			total,
			succeeded,
			failed = total - succeeded,
			"Batch finished"
		);
		results
	}
}

fn failed(id: String, error: String, duration_ms: u64) -> BatchTaskResult {
	BatchTaskResult {
		id,
		success: false,
		tx_hash: None,
		error: Some(error),
		duration_ms,
		timestamp: Utc::now(),
	}
}

fn panic_message(panic: Box<dyn std::any::Any + Send>) -> String {
	let detail = panic
		.downcast_ref::<&str>()
		.map(|s| s.to_string())
		.or_else(|| panic.downcast_ref::<String>().cloned())
		.unwrap_or_else(|| "unknown panic".to_string());
	format!("task panicked: {}", detail)
}
