//! Latency statistics over batch results.

use harness_types::{BatchTaskResult, LatencySummary, LoadTestStatistics};

/// Nearest-rank percentile of an ascending sample: `sorted[ceil(p/100 * n) - 1]`.
/// Integer arithmetic keeps exact ranks exact.
fn percentile(sorted: &[u64], p: usize) -> u64 {
	let n = sorted.len();
	let rank = (p * n).div_ceil(100);
	sorted[rank.saturating_sub(1).min(n - 1)]
}

/// Summarizes a latency sample. An empty sample yields all zeros.
pub fn summarize(durations: &[u64]) -> LatencySummary {
	if durations.is_empty() {
		return LatencySummary::default();
	}

	let mut sorted = durations.to_vec();
	sorted.sort_unstable();
	let total: u128 = sorted.iter().map(|&d| d as u128).sum();

	LatencySummary {
		min: sorted[0],
		max: sorted[sorted.len() - 1],
		mean: total as f64 / sorted.len() as f64,
		p50: percentile(&sorted, 50),
		p95: percentile(&sorted, 95),
		p99: percentile(&sorted, 99),
	}
}

/// Counts and latency summary for a load-test run. Latencies cover
/// successful tasks only.
pub fn load_test_statistics(results: &[BatchTaskResult]) -> LoadTestStatistics {
	let total = results.len();
	let latencies: Vec<u64> = results
		.iter()
		.filter(|r| r.success)
		.map(|r| r.duration_ms)
		.collect();
	let successful = latencies.len();

	LoadTestStatistics {
		total,
		successful,
		failed: total - successful,
		success_rate: if total == 0 {
			0.0
		} else {
			successful as f64 * 100.0 / total as f64
		},
		latencies: summarize(&latencies),
	}
}
