//! Result records produced by batch and scenario runs, and the reports that
//! are persisted at the end of each run.

use crate::network::Network;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Result of one task executed by the batch executor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchTaskResult {
	pub id: String,
	pub success: bool,
	pub tx_hash: Option<String>,
	pub error: Option<String>,
	pub duration_ms: u64,
	pub timestamp: DateTime<Utc>,
}

/// Descriptive statistics over a latency sample in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LatencySummary {
	pub min: u64,
	pub max: u64,
	#[serde(rename = "avg")]
	pub mean: f64,
	pub p50: u64,
	pub p95: u64,
	pub p99: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioStepResult {
	pub step: String,
	pub success: bool,
	pub tx_hash: Option<String>,
	pub error: Option<String>,
	pub duration_ms: u64,
	pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ScenarioSummary {
	pub total: usize,
	pub passed: usize,
	pub failed: usize,
}

/// Ordered record of one scenario run.
///
/// Created when the run starts, appended to after every step and finalized
/// once, when the run halts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioReport {
	pub network: Network,
	pub run_id: String,
	pub start_time: DateTime<Utc>,
	pub end_time: Option<DateTime<Utc>>,
	/// Total run duration in milliseconds.
	pub duration: Option<u64>,
	pub results: Vec<ScenarioStepResult>,
	pub summary: ScenarioSummary,
}

impl ScenarioReport {
	pub fn start(network: Network, run_id: impl Into<String>) -> Self {
		Self {
			network,
			run_id: run_id.into(),
			start_time: Utc::now(),
			end_time: None,
			duration: None,
			results: Vec::new(),
			summary: ScenarioSummary::default(),
		}
	}

	pub fn record(&mut self, result: ScenarioStepResult) {
		self.results.push(result);
		self.summary = self.summarize();
	}

	pub fn finalize(&mut self) {
		let end = Utc::now();
		let elapsed = (end - self.start_time).num_milliseconds().max(0);
		self.end_time = Some(end);
		self.duration = Some(elapsed as u64);
		self.summary = self.summarize();
	}

	pub fn is_finalized(&self) -> bool {
		self.end_time.is_some()
	}

	pub fn all_passed(&self) -> bool {
		self.summary.failed == 0
	}

	fn summarize(&self) -> ScenarioSummary {
		let passed = self.results.iter().filter(|r| r.success).count();
		ScenarioSummary {
			total: self.results.len(),
			passed,
			failed: self.results.len() - passed,
		}
	}
}

/// Load-test parameters echoed into the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadTestSettings {
	pub total_offers: usize,
	pub concurrency: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadTestStatistics {
	pub total: usize,
	pub successful: usize,
	pub failed: usize,
	/// Percentage of successful tasks, 0 to 100.
	pub success_rate: f64,
	pub latencies: LatencySummary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadTestReport {
	pub network: Network,
	pub run_id: String,
	pub config: LoadTestSettings,
	pub results: Vec<BatchTaskResult>,
	pub statistics: LoadTestStatistics,
}

#[cfg(test)]
mod tests {
	use super::*;

	fn step(name: &str, success: bool) -> ScenarioStepResult {
		ScenarioStepResult {
			step: name.to_string(),
			success,
			tx_hash: None,
			error: (!success).then(|| "boom".to_string()),
			duration_ms: 5,
			timestamp: Utc::now(),
		}
	}

	#[test]
	fn test_report_summary_tracks_results() {
		let mut report = ScenarioReport::start(Network::Testnet, "run-1");
		report.record(step("issue", true));
		report.record(step("authorize", false));

		assert_eq!(report.summary.total, 2);
		assert_eq!(report.summary.passed, 1);
		assert_eq!(report.summary.failed, 1);
		assert!(!report.all_passed());
		assert!(!report.is_finalized());

		report.finalize();
		assert!(report.is_finalized());
		assert!(report.duration.is_some());
	}

	#[test]
	fn test_report_json_layout() {
		let mut report = ScenarioReport::start(Network::Devnet, "run-2");
		report.record(step("issue", true));
		report.finalize();

		let json = serde_json::to_value(&report).unwrap();
		assert_eq!(json["network"], "devnet");
		assert!(json.get("startTime").is_some());
		assert!(json.get("endTime").is_some());
		assert!(json.get("duration").is_some());
		assert_eq!(json["summary"]["total"], 1);
		assert_eq!(json["results"][0]["durationMs"], 5);
	}

	#[test]
	fn test_latency_summary_uses_avg_on_the_wire() {
		let json = serde_json::to_value(LatencySummary::default()).unwrap();
		assert!(json.get("avg").is_some());
		assert!(json.get("mean").is_none());
	}
}
