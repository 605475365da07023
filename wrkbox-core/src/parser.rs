use std::fmt;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::classify::{Classified, LineClass, classify};
use crate::error::{Error, Result};
use crate::output::{
    BenchmarkOutput, ErrorCounters, HistogramBucket, HistogramSummary, PercentileEntry, RunHeader,
    RunTotals, ThreadStats, UncorrectedLatency,
};
use crate::units::{
    Dimension, Metric, normalize, parse_count, parse_defined, parse_percent, parse_scalar,
    parse_size_bytes,
};

/// Something worth reporting about the input that did not stop the parse.
#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    UnrecognizedLine { line_number: usize, text: String },
    CountMismatch { request_count: u64, histogram_total: u64 },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::UnrecognizedLine { line_number, text } => {
                write!(f, "line {}: unrecognized output '{}'", line_number, text)
            }
            Diagnostic::CountMismatch {
                request_count,
                histogram_total,
            } => write!(
                f,
                "footer reports {} requests but the histogram counted {}",
                request_count, histogram_total
            ),
        }
    }
}

/// Parses one wrk / wrk2 report. Unrecognized lines are logged and skipped.
pub fn parse(
    raw_text: &str,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    suite_id: Uuid,
) -> Result<BenchmarkOutput> {
    let (output, diagnostics) = parse_with_diagnostics(raw_text, start_time, end_time, suite_id)?;
    for diagnostic in &diagnostics {
        warn!("{}", diagnostic);
    }
    Ok(output)
}

pub fn parse_with_diagnostics(
    raw_text: &str,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    suite_id: Uuid,
) -> Result<(BenchmarkOutput, Vec<Diagnostic>)> {
    let mut builder = OutputBuilder::default();
    for (index, line) in raw_text.lines().enumerate() {
        builder.feed(index + 1, line)?;
    }
    builder.build(start_time, end_time, suite_id)
}

#[derive(Debug, Default)]
struct HistogramFooter {
    mean: Option<Metric>,
    stdev: Option<Metric>,
    max: Option<Metric>,
    total_count: Option<u64>,
    buckets: Option<u64>,
    sub_buckets: Option<u64>,
}

impl HistogramFooter {
    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key.trim() {
            "Mean" => self.mean = Some(parse_scalar(value)?),
            "StdDeviation" => self.stdev = Some(parse_scalar(value)?),
            "Max" => self.max = Some(parse_scalar(value)?),
            "Total count" => self.total_count = Some(parse_count(value)?),
            "Buckets" => self.buckets = Some(parse_count(value)?),
            "SubBuckets" => self.sub_buckets = Some(parse_count(value)?),
            other => debug!("Ignoring histogram statistic '{}'", other),
        }
        Ok(())
    }

    fn is_empty(&self) -> bool {
        self.mean.is_none()
            && self.stdev.is_none()
            && self.max.is_none()
            && self.total_count.is_none()
            && self.buckets.is_none()
            && self.sub_buckets.is_none()
    }

    fn finish(self, detailed: Vec<HistogramBucket>) -> Result<Option<HistogramSummary>> {
        if self.is_empty() {
            if detailed.is_empty() {
                return Ok(None);
            }
            return Err(Error::OutputParse(
                "wrk output: percentile spectrum without histogram footer".to_string(),
            ));
        }
        match (
            self.mean,
            self.stdev,
            self.max,
            self.total_count,
            self.buckets,
            self.sub_buckets,
        ) {
            (
                Some(mean_ms),
                Some(stdev_ms),
                Some(max_ms),
                Some(total_count),
                Some(bucket_count),
                Some(sub_bucket_count),
            ) => Ok(Some(HistogramSummary {
                mean_ms,
                stdev_ms,
                max_ms,
                total_count,
                bucket_count,
                sub_bucket_count,
                detailed,
            })),
            _ => Err(Error::OutputParse(
                "wrk output: truncated histogram footer".to_string(),
            )),
        }
    }
}

/// One `Latency Distribution` block: checkpoint table, detailed spectrum and
/// its `#[...]` footer.
#[derive(Debug, Default)]
struct Distribution {
    percentiles: Vec<PercentileEntry>,
    detailed: Vec<HistogramBucket>,
    footer: HistogramFooter,
}

impl Distribution {
    fn finish(self) -> Result<(Vec<PercentileEntry>, Option<HistogramSummary>)> {
        validate_percentiles(&self.percentiles)?;
        validate_spectrum(&self.detailed)?;
        let histogram = self.footer.finish(self.detailed)?;
        Ok((self.percentiles, histogram))
    }
}

#[derive(Debug, Default)]
struct SocketErrors {
    connect: u64,
    read: u64,
    write: u64,
    timeout: u64,
}

/// Per-section accumulators filled line by line, turned into a
/// [`BenchmarkOutput`] once the whole blob has been seen.
#[derive(Debug, Default)]
struct OutputBuilder {
    run_target: Option<(String, String)>,
    threads: Option<u64>,
    connections: Option<u64>,
    latency: Option<ThreadStats>,
    throughput: Option<ThreadStats>,
    recorded: Distribution,
    uncorrected: Option<Distribution>,
    socket_errors: Option<SocketErrors>,
    non_2xx_3xx: Option<u64>,
    other_errors: Option<u64>,
    totals: Option<(u64, f64, u64)>,
    requests_per_second: Option<f64>,
    transfer_bytes_per_second: Option<f64>,
    diagnostics: Vec<Diagnostic>,
}

fn thread_stats(line: &Classified<'_>, dimension: Dimension) -> Result<ThreadStats> {
    Ok(ThreadStats {
        average: normalize(line.field(1), dimension)?,
        stdev: normalize(line.field(2), dimension)?,
        max: normalize(line.field(3), dimension)?,
        percent_above_stdev: parse_percent(line.field(4))?,
    })
}

impl OutputBuilder {
    // Rows after the `-U` heading belong to the uncorrected block.
    fn distribution(&mut self) -> &mut Distribution {
        match &mut self.uncorrected {
            Some(uncorrected) => uncorrected,
            None => &mut self.recorded,
        }
    }

    fn feed(&mut self, line_number: usize, line: &str) -> Result<()> {
        let c = classify(line);
        match c.class {
            LineClass::Blank | LineClass::Separator | LineClass::SectionHeading => {}
            LineClass::Calibration => debug!("Skipping calibration line: {}", line.trim()),
            LineClass::UncorrectedHeading => {
                debug!("Reading uncorrected latency distribution at line {}", line_number);
                self.uncorrected = Some(Distribution::default());
            }
            LineClass::RunHeader => {
                self.run_target = Some((c.field(1).to_string(), c.field(2).to_string()));
            }
            LineClass::ThreadConfig => {
                self.threads = Some(parse_count(c.field(1))?);
                self.connections = Some(parse_count(c.field(2))?);
            }
            LineClass::SummaryLatency => {
                self.latency = Some(thread_stats(&c, Dimension::Time)?);
            }
            LineClass::SummaryThroughput => {
                self.throughput = Some(thread_stats(&c, Dimension::Scalar)?);
            }
            LineClass::PercentileRow => {
                let entry = PercentileEntry {
                    percentile: parse_defined(c.field(1), Dimension::Scalar)?,
                    latency_ms: parse_defined(c.field(2), Dimension::Time)?,
                };
                self.distribution().percentiles.push(entry);
            }
            LineClass::HistogramDetailRow => {
                let bucket = HistogramBucket {
                    value_ms: parse_defined(c.field(1), Dimension::Scalar)?,
                    percentile: parse_defined(c.field(2), Dimension::Scalar)?,
                    total_count: parse_count(c.field(3))?,
                    inverse_percentile: parse_scalar(c.field(4))?,
                };
                self.distribution().detailed.push(bucket);
            }
            LineClass::HistogramHeaderStat => {
                let footer = &mut self.distribution().footer;
                footer.set(c.field(1), c.field(2))?;
                footer.set(c.field(3), c.field(4))?;
            }
            LineClass::TotalsFooter => {
                let requests = parse_count(c.field(1))?;
                let duration_seconds = parse_defined(c.field(2), Dimension::Time)? / 1_000.0;
                let bytes_read = parse_size_bytes(c.field(3))?.round() as u64;
                self.totals = Some((requests, duration_seconds, bytes_read));
            }
            LineClass::SocketErrors => {
                self.socket_errors = Some(SocketErrors {
                    connect: parse_count(c.field(1))?,
                    read: parse_count(c.field(2))?,
                    write: parse_count(c.field(3))?,
                    timeout: parse_count(c.field(4))?,
                });
            }
            LineClass::Non2xxFooter => self.non_2xx_3xx = Some(parse_count(c.field(1))?),
            LineClass::ErrorsFooter => {
                let count = parse_count(c.field(1))?;
                self.other_errors = Some(self.other_errors.unwrap_or(0).saturating_add(count));
            }
            LineClass::ThroughputFooter => {
                self.requests_per_second = Some(parse_defined(c.field(1), Dimension::Scalar)?);
            }
            LineClass::TransferFooter => {
                self.transfer_bytes_per_second = Some(parse_size_bytes(c.field(1))?);
            }
            LineClass::Unrecognized => self.diagnostics.push(Diagnostic::UnrecognizedLine {
                line_number,
                text: line.trim().to_string(),
            }),
        }
        Ok(())
    }

    fn build(
        mut self,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        suite_id: Uuid,
    ) -> Result<(BenchmarkOutput, Vec<Diagnostic>)> {
        let latency = self.latency.ok_or_else(|| missing("Latency summary"))?;
        let throughput = self.throughput.ok_or_else(|| missing("Req/Sec summary"))?;
        let (request_count, duration_seconds, bytes_read) =
            self.totals.ok_or_else(|| missing("requests footer"))?;
        let requests_per_second = self
            .requests_per_second
            .ok_or_else(|| missing("Requests/sec footer"))?;
        let transfer_bytes_per_second = self
            .transfer_bytes_per_second
            .ok_or_else(|| missing("Transfer/sec footer"))?;
        if duration_seconds <= 0.0 {
            return Err(Error::OutputParse(format!(
                "wrk output: non-positive run duration {}s",
                duration_seconds
            )));
        }

        let (percentiles, histogram) = self.recorded.finish()?;
        let uncorrected = match self.uncorrected {
            Some(distribution) => {
                let (percentiles, histogram) = distribution.finish()?;
                Some(UncorrectedLatency {
                    percentiles,
                    histogram,
                })
            }
            None => None,
        };

        let errors = match (self.socket_errors, self.non_2xx_3xx, self.other_errors) {
            (None, None, None) => None,
            (socket, non_2xx_3xx, other) => {
                let socket = socket.unwrap_or_default();
                Some(ErrorCounters {
                    connect: socket.connect,
                    read: socket.read,
                    write: socket.write,
                    timeout: socket.timeout,
                    non_2xx_3xx_count: non_2xx_3xx.unwrap_or(0),
                    other: other.unwrap_or(0),
                })
            }
        };

        if let Some(h) = &histogram
            && h.total_count != request_count
        {
            self.diagnostics.push(Diagnostic::CountMismatch {
                request_count,
                histogram_total: h.total_count,
            });
        }

        let header = self.run_target.map(|(test_duration, url)| RunHeader {
            test_duration,
            url,
            threads: self.threads,
            connections: self.connections,
        });

        let totals = RunTotals {
            request_count,
            duration_seconds,
            bytes_read,
            requests_per_second,
            transfer_bytes_per_second,
        };

        let output = BenchmarkOutput::new(
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
        );
        Ok((output, self.diagnostics))
    }
}

fn missing(section: &str) -> Error {
    Error::OutputParse(format!("wrk output: missing {}", section))
}

fn validate_percentiles(entries: &[PercentileEntry]) -> Result<()> {
    if let Some(entry) = entries
        .iter()
        .find(|e| !(0.0..=100.0).contains(&e.percentile))
    {
        return Err(Error::OutputParse(format!(
            "wrk output: percentile {} out of range",
            entry.percentile
        )));
    }
    for pair in entries.windows(2) {
        if pair[1].percentile <= pair[0].percentile || pair[1].latency_ms < pair[0].latency_ms {
            return Err(Error::OutputParse(format!(
                "wrk output: latency distribution out of order at {}%",
                pair[1].percentile
            )));
        }
    }
    Ok(())
}

fn validate_spectrum(buckets: &[HistogramBucket]) -> Result<()> {
    if let Some(bucket) = buckets
        .iter()
        .find(|b| !(0.0..=1.0).contains(&b.percentile))
    {
        return Err(Error::OutputParse(format!(
            "wrk output: spectrum percentile {} out of range",
            bucket.percentile
        )));
    }
    if buckets
        .windows(2)
        .any(|pair| pair[1].percentile < pair[0].percentile)
    {
        return Err(Error::OutputParse(
            "wrk output: percentile spectrum out of order".to_string(),
        ));
    }
    Ok(())
}
