//! Runners for the ledger harness.
//!
//! This crate drives the two harness workloads on top of the reliable
//! submitter: the fail-fast token lifecycle scenario and the concurrent
//! offer load test. Both persist a report for every run, including runs
//! that fail.

pub mod batch;
pub mod error;
pub mod lifecycle;
pub mod load_test;
pub mod scenario;
pub mod stats;

#[cfg(test)]
mod testing;

pub use batch::{ConcurrencyBatchExecutor, TaskOutcome};
pub use error::CoreError;
pub use lifecycle::{RunLifecycle, RunState};
pub use load_test::{LoadTestOptions, LoadTestRun, LoadTestRunner, INVESTOR_PREFIX};
pub use scenario::{
	default_steps, ScenarioContext, ScenarioOrchestrator, ScenarioRun, ScenarioStep, ISSUER_ROLE,
};
pub use stats::{load_test_statistics, summarize};
