use std::fmt;
use std::sync::LazyLock;

use regex::{Captures, Regex};

/// The logical role of one line of wrk / wrk2 output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LineClass {
    Blank,
    Separator,
    RunHeader,
    ThreadConfig,
    Calibration,
    SectionHeading,
    UncorrectedHeading,
    SummaryLatency,
    SummaryThroughput,
    PercentileRow,
    HistogramDetailRow,
    HistogramHeaderStat,
    TotalsFooter,
    SocketErrors,
    Non2xxFooter,
    ErrorsFooter,
    ThroughputFooter,
    TransferFooter,
    Unrecognized,
}

impl LineClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            LineClass::Blank => "blank",
            LineClass::Separator => "separator",
            LineClass::RunHeader => "run-header",
            LineClass::ThreadConfig => "thread-config",
            LineClass::Calibration => "calibration",
            LineClass::SectionHeading => "section-heading",
            LineClass::UncorrectedHeading => "uncorrected-heading",
            LineClass::SummaryLatency => "summary-latency",
            LineClass::SummaryThroughput => "summary-throughput",
            LineClass::PercentileRow => "percentile-row",
            LineClass::HistogramDetailRow => "histogram-detail-row",
            LineClass::HistogramHeaderStat => "histogram-header-stat",
            LineClass::TotalsFooter => "totals-footer",
            LineClass::SocketErrors => "socket-errors",
            LineClass::Non2xxFooter => "non-2xx-footer",
            LineClass::ErrorsFooter => "errors-footer",
            LineClass::ThroughputFooter => "throughput-footer",
            LineClass::TransferFooter => "transfer-footer",
            LineClass::Unrecognized => "unrecognized",
        }
    }

    /// Lines that carry no data and are skipped without a diagnostic.
    pub fn is_decorative(&self) -> bool {
        matches!(
            self,
            LineClass::Blank | LineClass::Separator | LineClass::SectionHeading
        )
    }
}

impl fmt::Display for LineClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// Matched against the trimmed line, in order. Headings come before the
// summary rows because both start with "Latency", and the uncorrected
// heading before the generic one.
const PATTERNS: &[(LineClass, &str)] = &[
    (LineClass::Separator, r"^-{3,}$"),
    (LineClass::RunHeader, r"^Running\s+(\S+)\s+test\s+@\s+(\S+)$"),
    (
        LineClass::ThreadConfig,
        r"^(\d+)\s+threads?\s+and\s+(\d+)\s+connections?$",
    ),
    (LineClass::Calibration, r"^Thread\s+calibration:"),
    (
        LineClass::UncorrectedHeading,
        r"^Latency\s+Distribution\s+\(HdrHistogram\s+-\s+Uncorrected\s+Latency\b.*$",
    ),
    (
        LineClass::SectionHeading,
        r"^(?:Thread\s+Stats\b.*|Latency\s+Distribution\b.*|Detailed\s+Percentile\s+spectrum:?|Value\s+Percentile\s+TotalCount\b.*)$",
    ),
    (
        LineClass::SummaryLatency,
        r"^Latency\s+(\S+)\s+(\S+)\s+(\S+)\s+(\S+%)$",
    ),
    (
        LineClass::SummaryThroughput,
        r"^Req/Sec\s+(\S+)\s+(\S+)\s+(\S+)\s+(\S+%)$",
    ),
    (LineClass::PercentileRow, r"^(\d+(?:\.\d+)?)%\s+(\S+)$"),
    (
        LineClass::HistogramDetailRow,
        r"^(\d+(?:\.\d+)?)\s+(\d+(?:\.\d+)?)\s+(\d+)\s+(\S+)$",
    ),
    (
        LineClass::HistogramHeaderStat,
        r"^#\[\s*([A-Za-z][A-Za-z ]*?)\s*=\s*(\S+?)\s*,\s*([A-Za-z][A-Za-z ]*?)\s*=\s*(\S+?)\s*\]$",
    ),
    (
        LineClass::TotalsFooter,
        r"^(\d+)\s+requests\s+in\s+(\S+),\s+(\S+)\s+read$",
    ),
    (
        LineClass::SocketErrors,
        r"^Socket\s+errors:\s+connect\s+(\d+),\s+read\s+(\d+),\s+write\s+(\d+),\s+timeout\s+(\d+)$",
    ),
    (
        LineClass::Non2xxFooter,
        r"^Non-2xx\s+or\s+3xx\s+responses:\s+(\d+)$",
    ),
    (LineClass::ErrorsFooter, r"^Errors:\s+(\d+)$"),
    (LineClass::ThroughputFooter, r"^Requests/sec:\s+(\S+)$"),
    (LineClass::TransferFooter, r"^Transfer/sec:\s+(\S+)$"),
];

static CLASSIFIER: LazyLock<Classifier> = LazyLock::new(Classifier::new);

/// A classified line together with the fields its pattern captured.
#[derive(Debug)]
pub struct Classified<'a> {
    pub class: LineClass,
    captures: Option<Captures<'a>>,
}

impl<'a> Classified<'a> {
    /// Captured field `index` (1-based), or "" when the pattern had none.
    pub fn field(&self, index: usize) -> &'a str {
        self.captures
            .as_ref()
            .and_then(|cap| cap.get(index))
            .map(|m| m.as_str())
            .unwrap_or("")
    }
}

#[derive(Debug)]
pub struct Classifier {
    matchers: Vec<(LineClass, Regex)>,
}

impl Classifier {
    pub fn new() -> Self {
        let matchers = PATTERNS
            .iter()
            .map(|(class, pattern)| {
                let re = Regex::new(pattern).expect("line pattern compiles");
                (*class, re)
            })
            .collect();
        Self { matchers }
    }

    pub fn classify<'a>(&self, line: &'a str) -> Classified<'a> {
        let line = line.trim();
        if line.is_empty() {
            return Classified {
                class: LineClass::Blank,
                captures: None,
            };
        }
        for (class, re) in &self.matchers {
            if let Some(cap) = re.captures(line) {
                return Classified {
                    class: *class,
                    captures: Some(cap),
                };
            }
        }
        Classified {
            class: LineClass::Unrecognized,
            captures: None,
        }
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new()
    }
}

/// Classifies with the shared, lazily compiled pattern table.
pub fn classify(line: &str) -> Classified<'_> {
    CLASSIFIER.classify(line)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_lines_tolerate_spacing() {
        let c = classify("     Latency     1.32s   417.78ms   1.95s    54.00%");
        assert_eq!(c.class, LineClass::SummaryLatency);
        assert_eq!(c.field(1), "1.32s");
        assert_eq!(c.field(4), "54.00%");

        let c = classify("Latency 161.91ms 150.49ms 876.03ms 95.00%");
        assert_eq!(c.class, LineClass::SummaryLatency);
        assert_eq!(c.field(3), "876.03ms");

        let c = classify("     Req/Sec       -nan      -nan   0.00      0.00%");
        assert_eq!(c.class, LineClass::SummaryThroughput);
        assert_eq!(c.field(1), "-nan");
        assert_eq!(c.field(2), "-nan");
    }

    #[test]
    fn headings_are_not_summary_rows() {
        for line in [
            "   Thread Stats   Avg      Stdev     Max   +/- Stdev",
            "   Latency Distribution (HdrHistogram - Recorded Latency)",
            "  Latency Distribution",
            "   Detailed Percentile spectrum:",
            "        Value   Percentile   TotalCount 1/(1-Percentile)",
        ] {
            let c = classify(line);
            assert_eq!(c.class, LineClass::SectionHeading, "{}", line);
            assert!(c.class.is_decorative());
        }
    }

    #[test]
    fn uncorrected_heading_has_its_own_class() {
        let c = classify(
            "  Latency Distribution (HdrHistogram - Uncorrected Latency (measured without taking delayed starts into account))",
        );
        assert_eq!(c.class, LineClass::UncorrectedHeading);
        assert!(!c.class.is_decorative());
    }

    #[test]
    fn percentile_and_detail_rows() {
        let c = classify("  99.999%    1.95s ");
        assert_eq!(c.class, LineClass::PercentileRow);
        assert_eq!(c.field(1), "99.999");
        assert_eq!(c.field(2), "1.95s");

        let c = classify("     50%    1.00ms");
        assert_eq!(c.class, LineClass::PercentileRow);

        let c = classify("     1946.623     1.000000          100          inf");
        assert_eq!(c.class, LineClass::HistogramDetailRow);
        assert_eq!(c.field(3), "100");
        assert_eq!(c.field(4), "inf");
    }

    #[test]
    fn histogram_footer_pairs() {
        let c = classify(" #[Max     =     1945.600, Total count    =          100]");
        assert_eq!(c.class, LineClass::HistogramHeaderStat);
        assert_eq!(c.field(1), "Max");
        assert_eq!(c.field(2), "1945.600");
        assert_eq!(c.field(3), "Total count");
        assert_eq!(c.field(4), "100");
    }

    #[test]
    fn footers_and_errors() {
        let c = classify("   120 requests in 30.01s, 42.66KB read");
        assert_eq!(c.class, LineClass::TotalsFooter);
        assert_eq!((c.field(1), c.field(2), c.field(3)), ("120", "30.01s", "42.66KB"));

        let c = classify("   Socket errors: connect 0, read 0, write 0, timeout 20");
        assert_eq!(c.class, LineClass::SocketErrors);
        assert_eq!(c.field(4), "20");

        assert_eq!(classify("   Non-2xx or 3xx responses: 120").class, LineClass::Non2xxFooter);

        let c = classify("  Errors: 3");
        assert_eq!(c.class, LineClass::ErrorsFooter);
        assert_eq!(c.field(1), "3");
        assert_eq!(classify(" Requests/sec:      4.00").class, LineClass::ThroughputFooter);
        assert_eq!(classify(" Transfer/sec:      1.42KB").class, LineClass::TransferFooter);
    }

    #[test]
    fn run_metadata_lines() {
        let c = classify(" Running 30s test @ https://foo.org/hello-world");
        assert_eq!(c.class, LineClass::RunHeader);
        assert_eq!(c.field(2), "https://foo.org/hello-world");

        let c = classify("   10 threads and 100 connections");
        assert_eq!(c.class, LineClass::ThreadConfig);
        assert_eq!(c.field(2), "100");

        let c =
            classify("   Thread calibration: mean lat.: 180.088ms, rate sampling interval: 506ms");
        assert_eq!(c.class, LineClass::Calibration);
    }

    #[test]
    fn separators_blanks_and_noise() {
        assert_eq!(classify(" -----------------------").class, LineClass::Separator);
        assert_eq!(classify("    ").class, LineClass::Blank);
        let c = classify("something the tool started printing later");
        assert_eq!(c.class, LineClass::Unrecognized);
        assert!(!c.class.is_decorative());
        assert_eq!(c.field(1), "");
    }
}
