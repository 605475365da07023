use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;
use crate::parser;
use crate::units::Metric;

/// The `Running 30s test @ url` / `N threads and M connections` preamble.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunHeader {
    pub test_duration: String,
    pub url: String,
    pub threads: Option<u64>,
    pub connections: Option<u64>,
}

/// One row of the `Thread Stats` table: `Avg Stdev Max +/- Stdev`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThreadStats {
    pub average: Metric,
    pub stdev: Metric,
    pub max: Metric,
    pub percent_above_stdev: Metric,
}

/// Latency row, in milliseconds.
pub type LatencyStats = ThreadStats;

/// Req/Sec row, in requests per second per thread.
pub type ThroughputStats = ThreadStats;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PercentileEntry {
    pub percentile: f64,
    pub latency_ms: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistogramBucket {
    pub value_ms: f64,
    pub percentile: f64,
    pub total_count: u64,
    pub inverse_percentile: Metric,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramSummary {
    pub mean_ms: Metric,
    pub stdev_ms: Metric,
    pub max_ms: Metric,
    pub total_count: u64,
    pub bucket_count: u64,
    pub sub_bucket_count: u64,
    pub detailed: Vec<HistogramBucket>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorCounters {
    pub connect: u64,
    pub read: u64,
    pub write: u64,
    pub timeout: u64,
    pub non_2xx_3xx_count: u64,
    /// The bare `Errors: N` line some wrk builds print.
    #[serde(default)]
    pub other: u64,
}

impl ErrorCounters {
    pub fn socket_errors(&self) -> u64 {
        [self.connect, self.read, self.write, self.timeout]
            .into_iter()
            .fold(0, u64::saturating_add)
    }

    pub fn total(&self) -> u64 {
        self.socket_errors()
            .saturating_add(self.non_2xx_3xx_count)
            .saturating_add(self.other)
    }

    pub fn is_clean(&self) -> bool {
        self.total() == 0
    }

    /// `name count` pairs for every non-zero counter, in report order.
    pub fn non_zero(&self) -> Vec<(&'static str, u64)> {
        [
            ("connect", self.connect),
            ("read", self.read),
            ("write", self.write),
            ("timeout", self.timeout),
            ("non-2xx/3xx", self.non_2xx_3xx_count),
            ("other", self.other),
        ]
        .into_iter()
        .filter(|(_, count)| *count > 0)
        .collect()
    }
}

/// The second distribution wrk2 prints with `-U`, measured without
/// correcting for coordinated omission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UncorrectedLatency {
    pub percentiles: Vec<PercentileEntry>,
    pub histogram: Option<HistogramSummary>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RunTotals {
    pub request_count: u64,
    pub duration_seconds: f64,
    pub bytes_read: u64,
    pub requests_per_second: f64,
    pub transfer_bytes_per_second: f64,
}

/// Everything one wrk run reported. Built once by [`BenchmarkOutput::parse`]
/// and read-only afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkOutput {
    header: Option<RunHeader>,
    latency: LatencyStats,
    throughput: ThroughputStats,
    percentiles: Vec<PercentileEntry>,
    histogram: Option<HistogramSummary>,
    uncorrected: Option<UncorrectedLatency>,
    errors: Option<ErrorCounters>,
    totals: RunTotals,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    suite_id: Uuid,
}

impl BenchmarkOutput {
    pub fn parse(
        raw_text: &str,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        suite_id: Uuid,
    ) -> Result<Self> {
        parser::parse(raw_text, start_time, end_time, suite_id)
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        header: Option<RunHeader>,
        latency: LatencyStats,
        throughput: ThroughputStats,
        percentiles: Vec<PercentileEntry>,
        histogram: Option<HistogramSummary>,
        uncorrected: Option<UncorrectedLatency>,
        errors: Option<ErrorCounters>,
        totals: RunTotals,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        suite_id: Uuid,
    ) -> Self {
        Self {
            header,
            latency,
            throughput,
            percentiles,
            histogram,
            uncorrected,
            errors,
            totals,
            start_time,
            end_time,
            suite_id,
        }
    }

    pub fn header(&self) -> Option<&RunHeader> {
        self.header.as_ref()
    }

    pub fn latency(&self) -> &LatencyStats {
        &self.latency
    }

    pub fn throughput(&self) -> &ThroughputStats {
        &self.throughput
    }

    pub fn percentiles(&self) -> &[PercentileEntry] {
        &self.percentiles
    }

    pub fn histogram(&self) -> Option<&HistogramSummary> {
        self.histogram.as_ref()
    }

    /// Present only when the report carries a `-U` uncorrected distribution.
    pub fn uncorrected(&self) -> Option<&UncorrectedLatency> {
        self.uncorrected.as_ref()
    }

    pub fn errors(&self) -> Option<&ErrorCounters> {
        self.errors.as_ref()
    }

    pub fn totals(&self) -> &RunTotals {
        &self.totals
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    pub fn end_time(&self) -> DateTime<Utc> {
        self.end_time
    }

    pub fn suite_id(&self) -> Uuid {
        self.suite_id
    }

    /// Latency reported for `percentile` in the distribution table, if the
    /// table has that checkpoint.
    pub fn latency_at(&self, percentile: f64) -> Option<f64> {
        self.percentiles
            .iter()
            .find(|entry| (entry.percentile - percentile).abs() < 1e-9)
            .map(|entry| entry.latency_ms)
    }

    /// False when a histogram is present and counted a different number of
    /// requests than the footer.
    pub fn counts_consistent(&self) -> bool {
        self.histogram
            .as_ref()
            .is_none_or(|h| h.total_count == self.totals.request_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_totals_saturate() {
        let errors = ErrorCounters {
            connect: u64::MAX,
            read: 1,
            timeout: 20,
            non_2xx_3xx_count: 120,
            ..Default::default()
        };
        assert_eq!(errors.socket_errors(), u64::MAX);
        assert_eq!(errors.total(), u64::MAX);
        assert!(!errors.is_clean());
    }

    #[test]
    fn other_errors_count_towards_total() {
        let errors = ErrorCounters {
            timeout: 2,
            other: 3,
            ..Default::default()
        };
        assert_eq!(errors.socket_errors(), 2);
        assert_eq!(errors.total(), 5);
        assert_eq!(errors.non_zero(), vec![("timeout", 2), ("other", 3)]);
    }
}
